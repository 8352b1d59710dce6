// ==============================================================================
// telemetry.rs — PER-TICK TELEMETRY SNAPSHOT (SERVER -> CLIENT)
// ------------------------------------------------------------------------------
// Serializable readouts filled by the physics pass and shipped inside the
// per-tick snapshot. Purely observational; no physics side effects.
// ==============================================================================

use serde::Serialize;

#[derive(Clone, Debug, Serialize, Default)]
pub struct WheelTelemetry {
    pub id: &'static str,     // "FL", "FR", "RL", "RR"
    pub spring_force: f32,    // N
    pub damper_force: f32,    // N
    pub total_force: f32,     // N
    pub compression_pct: f32, // 0..100
    pub ride_height: f32,     // m, long-probe ground clearance
    pub lat_vel: f32,         // m/s lateral slip at the contact
}

#[derive(Clone, Debug, Serialize, Default)]
pub struct KartTelemetry {
    pub speed_ms: f32,           // m/s
    pub rpm: f32,
    pub engine_torque: f32,      // N*m
    pub smoothed_throttle: f32,  // 0..1
    pub rev_limiter_factor: f32, // 0..1

    pub front_axle_fy: f32, // N, lateral force sum over the front axle
    pub rear_axle_fx: f32,  // N, longitudinal force sum over the rear axle

    pub drag_force: f32,          // N
    pub downforce: f32,           // N
    pub ground_effect_force: f32, // N

    pub grounded: bool,
    pub handbrake: bool,

    pub wheels: Vec<WheelTelemetry>,
}
