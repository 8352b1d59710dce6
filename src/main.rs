mod kart;
mod net;
mod physics;
mod state;

use crate::net::start_websocket_server;
use crate::physics::PhysicsWorld;
use crate::state::SharedGameState;

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{interval, Duration};
use tracing::info;
use tracing_subscriber::EnvFilter;

const TICK_DT: f32 = 1.0 / 60.0;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,kart_server=debug")),
        )
        .init();

    info!("starting kart physics server");

    let state = Arc::new(Mutex::new(SharedGameState::new()));
    let physics = Arc::new(Mutex::new(PhysicsWorld::new()));

    tokio::spawn(start_websocket_server(
        Arc::clone(&state),
        Arc::clone(&physics),
    ));

    // Fixed timestep: ~60 Hz
    let mut ticker = interval(Duration::from_millis(16));

    loop {
        ticker.tick().await;

        let mut phys = physics.lock().await;
        let mut game = state.lock().await;

        // Latch the most recent input per entity before stepping.
        for entity in game.entities.values() {
            if let Some(ref input) = entity.last_input {
                phys.apply_player_input(
                    &entity.id,
                    input.axes.throttle,
                    input.axes.steer,
                    input.axes.handbrake,
                );
            }
        }

        phys.step(TICK_DT);

        game.tick += 1;
        game.broadcast_snapshot(&phys);
    }
}
