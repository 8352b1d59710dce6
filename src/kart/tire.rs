// ==============================================================================
// tire.rs — LONGITUDINAL + LATERAL TIRE FORCES (FRICTION-CIRCLE SATURATED)
// ------------------------------------------------------------------------------
// Per wheel, in the wheel's forward/right basis:
//
//     Fx = driveForce - rolling * vLong      (rolling handbrake-scaled on rear)
//     Fy = -lateralStiffness * vLat          (rear stiffness handbrake-overridden)
//
//     limit = mu * Fz
//     |F| > limit  =>  scale Fx, Fy by limit / |F|   (direction preserved)
//
// The lateral law is linear and does not saturate by itself; the friction
// circle is the only cap. Drive force reaches the rear axle only.
//
// This module does not apply forces. The integrator applies the result at the
// wheel contact point along the wheel forward/right axes.
// ==============================================================================

use crate::kart::config::KartConfig;
use crate::kart::suspension::WheelRole;

/// Kinematics + load input for one wheel's tire solve.
#[derive(Copy, Clone, Debug)]
pub struct TireInput {
    pub v_long: f32,       // m/s along wheel forward
    pub v_lat: f32,        // m/s along wheel right
    pub drive_force: f32,  // N, nonzero only for the driven axle
    pub normal_force: f32, // N, from the suspension pass
    pub handbrake: bool,
}

#[derive(Copy, Clone, Debug, Default)]
pub struct TireForces {
    pub fx: f32, // N along wheel forward
    pub fy: f32, // N along wheel right
    pub saturated: bool,
}

pub fn solve_tire(config: &KartConfig, role: WheelRole, input: &TireInput) -> TireForces {
    let rear = matches!(role, WheelRole::RearDrive);

    let mut rolling = config.rolling_resistance;
    if rear && input.handbrake {
        rolling *= config.handbrake_rolling_multiplier;
    }

    let mut fx = -rolling * input.v_long;
    if rear {
        fx += input.drive_force;
    }

    let lateral_stiffness = if rear {
        if input.handbrake {
            config.rear_lateral_stiffness_handbrake
        } else {
            config.rear_lateral_stiffness
        }
    } else {
        config.front_lateral_stiffness
    };

    let mut fy = -lateral_stiffness * input.v_lat;

    let limit = config.friction_coefficient * input.normal_force.max(0.0);
    let magnitude = (fx * fx + fy * fy).sqrt();
    let saturated = magnitude > limit && magnitude > 1e-6;
    if saturated {
        let scale = limit / magnitude;
        fx *= scale;
        fy *= scale;
    }

    TireForces { fx, fy, saturated }
}

/// Drive force reaching ONE rear wheel: engine torque through the gearbox,
/// split evenly across the driven axle, reacted at the contact radius.
/// A degenerate wheel radius short-circuits to zero instead of dividing.
pub fn drive_force_per_wheel(config: &KartConfig, engine_torque: f32, throttle_input: f32) -> f32 {
    if config.wheel_radius <= 1e-4 {
        return 0.0;
    }
    let axle_torque = engine_torque * config.gear_ratio * config.drivetrain_efficiency;
    throttle_input.signum() * (axle_torque * 0.5) / config.wheel_radius
}
