use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;
use uuid::Uuid;

use crate::kart::KartTelemetry;
use crate::physics::PhysicsWorld;

/// Driver axes latched per client, read synchronously at tick start.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Axes {
    pub throttle: f32,   // -1..1
    pub steer: f32,      // -1..1
    pub handbrake: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityInput {
    pub tick: u64,
    pub axes: Axes,
}

pub struct Entity {
    pub id: String,
    pub last_input: Option<EntityInput>,
}

#[derive(Serialize)]
pub struct KartSnapshot {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub rot: [f32; 4], // quaternion
    pub telemetry: KartTelemetry,
}

#[derive(Serialize)]
pub struct Snapshot {
    pub tick: u64,
    pub karts: Vec<KartSnapshot>,
}

pub struct SharedGameState {
    pub tick: u64,
    pub clients: Vec<UnboundedSender<String>>,
    pub entities: HashMap<String, Entity>,
}

impl SharedGameState {
    pub fn new() -> Self {
        Self {
            tick: 0,
            clients: Vec::new(),
            entities: HashMap::new(),
        }
    }

    pub fn register_client(&mut self, tx: UnboundedSender<String>) {
        self.clients.push(tx);
    }

    pub fn add_entity(&mut self) -> String {
        let id = Uuid::new_v4().to_string();
        self.entities.insert(
            id.clone(),
            Entity {
                id: id.clone(),
                last_input: None,
            },
        );
        id
    }

    pub fn update_input(&mut self, id: &str, axes: Axes, tick: u64) {
        if let Some(entity) = self.entities.get_mut(id) {
            entity.last_input = Some(EntityInput { tick, axes });
        }
    }

    pub fn remove_entity(&mut self, id: &str) {
        self.entities.remove(id);
        self.clients.retain(|tx| !tx.is_closed());
    }

    /// Build and send a snapshot of every kart (pose + telemetry) to all
    /// connected clients.
    pub fn broadcast_snapshot(&self, physics: &PhysicsWorld) {
        let mut karts = Vec::with_capacity(self.entities.len());

        for entity in self.entities.values() {
            let Some(kart) = physics.karts.get(&entity.id) else { continue };
            let Some(body) = physics.bodies.get(kart.body) else { continue };

            let pos = body.translation();
            let rot = body.rotation();
            karts.push(KartSnapshot {
                id: entity.id.clone(),
                x: pos.x,
                y: pos.y,
                z: pos.z,
                rot: [rot.i, rot.j, rot.k, rot.w],
                telemetry: kart.telemetry.clone(),
            });
        }

        let snapshot = Snapshot {
            tick: self.tick,
            karts,
        };
        let json = match serde_json::to_string(&snapshot) {
            Ok(json) => json,
            Err(err) => {
                warn!(%err, "snapshot serialization failed");
                return;
            }
        };

        for tx in &self.clients {
            let _ = tx.send(json.clone());
        }
    }
}
