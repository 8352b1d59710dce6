use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{error, info, warn};

use crate::physics::PhysicsWorld;
use crate::state::{Axes, SharedGameState};

const SPAWN_POSITION: [f32; 3] = [0.0, 1.3, 0.0];

#[derive(Debug)]
struct ClientMessage {
    msg_type: String,
    throttle: f32,
    steer: f32,
    handbrake: bool,
}

impl ClientMessage {
    fn from_json(txt: &str) -> Option<Self> {
        let v = serde_json::from_str::<serde_json::Value>(txt).ok()?;

        // handbrake arrives as a bool from pads, as an axis from wheels
        let handbrake = match v.get("handbrake") {
            Some(hb) => hb
                .as_bool()
                .unwrap_or_else(|| hb.as_f64().map(|f| f > 0.5).unwrap_or(false)),
            None => false,
        };

        Some(ClientMessage {
            msg_type: v.get("type")?.as_str()?.to_string(),
            throttle: v.get("throttle").and_then(|x| x.as_f64()).unwrap_or(0.0) as f32,
            steer: v.get("steer").and_then(|x| x.as_f64()).unwrap_or(0.0) as f32,
            handbrake,
        })
    }
}

pub async fn start_websocket_server(
    state: Arc<Mutex<SharedGameState>>,
    physics: Arc<Mutex<PhysicsWorld>>,
) {
    let listener = TcpListener::bind("0.0.0.0:9001")
        .await
        .expect("failed to bind WebSocket port");

    info!("listening on ws://0.0.0.0:9001");

    loop {
        let Ok((raw, peer)) = listener.accept().await else { continue };
        let state_clone = Arc::clone(&state);
        let physics_clone = Arc::clone(&physics);

        tokio::spawn(async move {
            let ws = match accept_async(raw).await {
                Ok(ws) => ws,
                Err(err) => {
                    warn!(%peer, %err, "websocket handshake failed");
                    return;
                }
            };
            let (mut write, mut read) = ws.split();

            // Outgoing snapshot channel for this client.
            let (tx, mut rx) = mpsc::unbounded_channel::<String>();
            {
                let mut game = state_clone.lock().await;
                game.register_client(tx.clone());
            }

            tokio::spawn(async move {
                while let Some(msg) = rx.recv().await {
                    if write.send(Message::Text(msg)).await.is_err() {
                        break;
                    }
                }
            });

            // Entity + kart body, created on connect.
            let player_id = {
                let mut game = state_clone.lock().await;
                let id = game.add_entity();

                let mut phys = physics_clone.lock().await;
                phys.spawn_kart_for_player(id.clone(), SPAWN_POSITION);

                id
            };

            info!(player = %player_id, %peer, "player connected");

            let welcome = format!(r#"{{"type":"welcome","player_id":"{}"}}"#, player_id);
            let _ = tx.send(welcome);

            while let Some(msg) = read.next().await {
                let msg = match msg {
                    Ok(m) => m,
                    Err(_) => break,
                };

                if !msg.is_text() {
                    continue;
                }
                let text = match msg.to_text() {
                    Ok(t) => t,
                    Err(_) => continue,
                };

                if text.contains("\"type\":\"ping\"") {
                    let _ = tx.send("{\"type\":\"pong\"}".into());
                    continue;
                }

                let Some(parsed) = ClientMessage::from_json(text) else { continue };

                if parsed.msg_type == "input" {
                    let axes = Axes {
                        throttle: parsed.throttle,
                        steer: parsed.steer,
                        handbrake: parsed.handbrake,
                    };

                    let mut game = state_clone.lock().await;
                    let tick = game.tick;
                    game.update_input(&player_id, axes, tick);
                } else {
                    error!(player = %player_id, kind = %parsed.msg_type, "unknown message type");
                }
            }

            info!(player = %player_id, "player disconnected");
            let mut game = state_clone.lock().await;
            game.remove_entity(&player_id);
            let mut phys = physics_clone.lock().await;
            phys.remove_kart(&player_id);
        });
    }
}
