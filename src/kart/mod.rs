//! kart - the vehicle dynamics core (engine-agnostic math + rapier probes).

pub mod aero;
pub mod config;
pub mod engine;
pub mod probe;
pub mod suspension;
pub mod telemetry;
pub mod tire;

pub use config::{KartConfig, TorqueCurve};
pub use engine::Engine;
pub use probe::{probe_down, ProbeHit};
pub use suspension::{suspension_step, SuspensionForces, WheelId, WheelRole, WheelState};
pub use telemetry::{KartTelemetry, WheelTelemetry};
pub use tire::{drive_force_per_wheel, solve_tire, TireForces, TireInput};
