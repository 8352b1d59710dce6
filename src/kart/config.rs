// ==============================================================================
// config.rs — KART CONFIGURATION + TORQUE CURVE
// ------------------------------------------------------------------------------
// Read-only during simulation. A config is fixed for the kart's lifetime and
// may only be swapped between runs, never mid-tick.
// ==============================================================================

use serde::{Deserialize, Serialize};

/// Piecewise-linear torque curve keyed by normalized RPM (rpm / max_rpm, 0..1).
///
/// Points are (rpm_fraction, torque N*m), sorted ascending by fraction.
/// An empty curve means "no calibration data"; the engine falls back to a
/// fixed constant torque in that case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TorqueCurve {
    pub points: Vec<(f32, f32)>,
}

impl TorqueCurve {
    pub fn new(mut points: Vec<(f32, f32)>) -> Self {
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { points }
    }

    pub fn empty() -> Self {
        Self { points: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Sample torque at a normalized RPM fraction. Clamps outside the keyed
    /// range; linear between keys. Returns 0 for an empty curve (callers
    /// short-circuit to the fallback torque before getting here).
    pub fn sample(&self, t: f32) -> f32 {
        let Some(first) = self.points.first() else {
            return 0.0;
        };
        let last = self.points[self.points.len() - 1];

        if t <= first.0 {
            return first.1;
        }
        if t >= last.0 {
            return last.1;
        }

        for pair in self.points.windows(2) {
            let (t0, y0) = pair[0];
            let (t1, y1) = pair[1];
            if t <= t1 {
                let span = (t1 - t0).max(1e-6);
                let s = (t - t0) / span;
                return y0 + (y1 - y0) * s;
            }
        }
        last.1
    }
}

/// Full kart tuning surface. Shared read-only by every component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KartConfig {
    // --- Engine ---
    pub idle_rpm: f32,              // rpm
    pub max_rpm: f32,               // rpm (hard ceiling)
    pub rev_limiter_rpm: f32,       // rpm where torque cut begins
    pub fallback_torque: f32,       // N*m, used when torque_curve is empty
    pub torque_curve: TorqueCurve,  // keyed by rpm / max_rpm
    pub flywheel_inertia: f32,      // kg*m^2
    pub throttle_response: f32,     // throttle units per second
    pub engine_friction_coeff: f32, // N*m per rpm
    pub load_torque_coeff: f32,     // N*m per m/s of forward speed

    // --- Drivetrain ---
    pub gear_ratio: f32,            // engine revs per wheel rev
    pub drivetrain_efficiency: f32, // 0..1
    pub wheel_radius: f32,          // m

    // --- Tires ---
    pub friction_coefficient: f32,          // friction-circle mu
    pub front_lateral_stiffness: f32,       // N per m/s of lateral slip
    pub rear_lateral_stiffness: f32,        // N per m/s of lateral slip
    pub rear_lateral_stiffness_handbrake: f32, // rear override while handbrake held
    pub rolling_resistance: f32,            // N per m/s of longitudinal speed
    pub handbrake_rolling_multiplier: f32,  // rear rolling scale while handbrake held

    // --- Suspension ---
    pub rest_length: f32,      // m (spring neutral)
    pub spring_travel: f32,    // m (travel past rest)
    pub spring_stiffness: f32, // N/m
    pub damper_stiffness: f32, // N*s/m

    // --- Aerodynamics ---
    pub drag_coefficient: f32,      // Cd
    pub frontal_area: f32,          // m^2
    pub air_density: f32,           // kg/m^3
    pub downforce_coefficient: f32, // baseline downforce Cl
    pub wing_area: f32,             // m^2
    pub wing_angle_deg: f32,        // degrees of incidence
    pub lift_coefficient_slope: f32,// Cl per radian of wing angle
    pub ground_effect_factor: f32,  // N*m (force = factor / ride height)
    pub ground_effect_max_dist: f32,// m, probe length for ground effect

    // --- Chassis ---
    pub mass: f32,                      // kg
    pub chassis_half_extents: [f32; 3], // [hx, hy, hz] meters
    pub chassis_com_offset: [f32; 3],   // local offset from collider center
    pub max_steer_angle: f32,           // radians
    pub front_axle_share: f32,          // 0..1 static weight on the front axle
    pub linear_damping: f32,            // rapier body damping
    pub angular_damping: f32,           // rapier body damping

    // --- Ground check / airborne ---
    pub ground_ray_offset: [f32; 3], // local offset of the probe cluster origin
    pub ground_ray_length: f32,      // m
    pub stabilization_gain: f32,     // N*m per radian-ish of midair tilt
}

impl KartConfig {
    /// Baseline open-wheel calibration.
    pub fn f1_prac() -> Self {
        Self {
            idle_rpm: 1000.0,
            max_rpm: 8000.0,
            rev_limiter_rpm: 7500.0,
            fallback_torque: 400.0,
            torque_curve: TorqueCurve::new(vec![
                (0.0, 240.0),
                (0.25, 360.0),
                (0.5, 430.0),
                (0.75, 440.0),
                (0.9, 420.0),
                (1.0, 360.0),
            ]),
            flywheel_inertia: 0.2,
            throttle_response: 5.0,
            engine_friction_coeff: 0.02,
            load_torque_coeff: 5.0,

            gear_ratio: 8.0,
            drivetrain_efficiency: 0.9,
            wheel_radius: 0.3,

            friction_coefficient: 1.0,
            front_lateral_stiffness: 80.0,
            rear_lateral_stiffness: 100.0,
            rear_lateral_stiffness_handbrake: 0.0,
            rolling_resistance: 0.5,
            handbrake_rolling_multiplier: 3.0,

            rest_length: 0.6,
            spring_travel: 0.3,
            spring_stiffness: 20_000.0,
            damper_stiffness: 3_500.0,

            drag_coefficient: 0.5,
            frontal_area: 2.5,
            air_density: 1.225,
            downforce_coefficient: 0.8,
            wing_area: 0.6,
            wing_angle_deg: 10.0,
            lift_coefficient_slope: 0.1,
            ground_effect_factor: 50.0,
            ground_effect_max_dist: 0.3,

            mass: 800.0,
            chassis_half_extents: [0.9, 0.3, 1.9],
            chassis_com_offset: [0.0, -0.15, 0.0],
            max_steer_angle: 30.0_f32.to_radians(),
            front_axle_share: 0.5,
            linear_damping: 0.05,
            angular_damping: 0.5,

            ground_ray_offset: [0.0, 0.5, 0.0],
            ground_ray_length: 1.5,
            stabilization_gain: 1500.0,
        }
    }
}

impl Default for KartConfig {
    fn default() -> Self {
        Self::f1_prac()
    }
}
