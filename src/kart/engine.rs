// ==============================================================================
// engine.rs — ENGINE RPM / TORQUE SIMULATOR
// ------------------------------------------------------------------------------
// Integrates crank RPM from throttle demand and road load:
//
//     driveTorque = curve(rpm / maxRpm) * smoothedThrottle * revLimiter
//     netTorque   = driveTorque - frictionCoeff * rpm - loadCoeff * |v_fwd|
//     rpm        += netTorque * 60 / (2π * I) * dt
//
// The returned torque is the DRIVE torque (what the drivetrain sees), not the
// net torque used for RPM integration.
//
// Invariants:
// - rpm stays in [idle_rpm, max_rpm]
// - smoothed throttle stays in [0, 1] and moves at most throttle_response*dt
//   per tick (rate-limited approach, no overshoot)
// - rev limiter factor: 1 below rev_limiter_rpm, linear to 0 at max_rpm
// ==============================================================================

use crate::kart::config::KartConfig;

#[derive(Debug, Clone)]
pub struct Engine {
    pub rpm: f32,                // crank speed, bounded to [idle_rpm, max_rpm]
    pub smoothed_throttle: f32,  // 0..1, persists across ticks
    pub rev_limiter_factor: f32, // derived each tick, kept for telemetry
    pub current_torque: f32,     // N*m, last drive torque, kept for telemetry
}

impl Engine {
    pub fn new(config: &KartConfig) -> Self {
        Self {
            rpm: config.idle_rpm,
            smoothed_throttle: 0.0,
            rev_limiter_factor: 1.0,
            current_torque: 0.0,
        }
    }

    /// One fixed-step engine tick. Returns the drive torque delivered to the
    /// drivetrain.
    pub fn simulate(
        &mut self,
        config: &KartConfig,
        throttle_input: f32,
        forward_speed: f32,
        dt: f32,
    ) -> f32 {
        let target = throttle_input.clamp(0.0, 1.0);
        self.smoothed_throttle =
            move_towards(self.smoothed_throttle, target, config.throttle_response * dt);

        self.rev_limiter_factor =
            rev_limiter_factor(self.rpm, config.rev_limiter_rpm, config.max_rpm);

        let curve_torque = if config.torque_curve.is_empty() {
            config.fallback_torque
        } else {
            let t = (self.rpm / config.max_rpm.max(1.0)).clamp(0.0, 1.0);
            config.torque_curve.sample(t)
        };

        let drive_torque = curve_torque * self.smoothed_throttle * self.rev_limiter_factor;

        let friction_torque = config.engine_friction_coeff * self.rpm;
        let load_torque = config.load_torque_coeff * forward_speed.abs();
        let net_torque = drive_torque - friction_torque - load_torque;

        // rad/s^2 -> rpm/s
        let rpm_dot = net_torque * 60.0 / (2.0 * std::f32::consts::PI * config.flywheel_inertia.max(1e-4));
        self.rpm = (self.rpm + rpm_dot * dt).clamp(config.idle_rpm, config.max_rpm);

        self.current_torque = drive_torque;
        drive_torque
    }
}

/// Bounded-rate approach toward a target, no overshoot.
#[inline]
fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    let delta = target - current;
    if delta.abs() <= max_delta {
        target
    } else {
        current + delta.signum() * max_delta
    }
}

/// 1.0 below the limiter threshold, linear ramp down to exactly 0.0 at max RPM.
#[inline]
pub fn rev_limiter_factor(rpm: f32, rev_limiter_rpm: f32, max_rpm: f32) -> f32 {
    if rpm <= rev_limiter_rpm {
        return 1.0;
    }
    if rpm >= max_rpm {
        return 0.0;
    }
    let t = (rpm - rev_limiter_rpm) / (max_rpm - rev_limiter_rpm).max(1e-4);
    1.0 - t
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn rpm_stays_bounded_for_arbitrary_throttle_sequences() {
        let cfg = KartConfig::f1_prac();
        let mut engine = Engine::new(&cfg);

        // deterministic but varied throttle / dt / load pattern
        for i in 0..2000 {
            let throttle = ((i * 7) % 11) as f32 / 10.0;
            let speed = ((i * 13) % 40) as f32;
            let dt = if i % 17 == 0 { 0.0 } else { DT };
            engine.simulate(&cfg, throttle, speed, dt);

            assert!(
                engine.rpm >= cfg.idle_rpm && engine.rpm <= cfg.max_rpm,
                "rpm {} escaped [{}, {}] at step {}",
                engine.rpm,
                cfg.idle_rpm,
                cfg.max_rpm,
                i
            );
            assert!(
                (0.0..=1.0).contains(&engine.smoothed_throttle),
                "smoothed throttle {} left [0,1]",
                engine.smoothed_throttle
            );
        }
    }

    #[test]
    fn rev_limiter_is_monotone_and_zero_at_max() {
        let limiter = 7500.0;
        let max = 8000.0;

        assert_eq!(rev_limiter_factor(3000.0, limiter, max), 1.0);
        assert_eq!(rev_limiter_factor(limiter, limiter, max), 1.0);
        assert_eq!(rev_limiter_factor(max, limiter, max), 0.0);
        assert_eq!(rev_limiter_factor(max + 500.0, limiter, max), 0.0);

        let mut prev = 1.0;
        let mut rpm = limiter;
        while rpm <= max {
            let f = rev_limiter_factor(rpm, limiter, max);
            assert!(f <= prev + 1e-6, "factor rose from {prev} to {f} at {rpm} rpm");
            prev = f;
            rpm += 10.0;
        }
    }

    #[test]
    fn full_throttle_rises_monotonically_and_limiter_engages() {
        let cfg = KartConfig::f1_prac();
        let mut engine = Engine::new(&cfg);

        let mut last_rpm = engine.rpm;
        let mut limiter_engaged = false;

        // 2 seconds at full throttle from idle, standing start
        for _ in 0..120 {
            engine.simulate(&cfg, 1.0, 0.0, DT);

            assert!(engine.rpm <= cfg.max_rpm, "rpm {} above max", engine.rpm);
            if engine.rpm < cfg.rev_limiter_rpm {
                assert!(
                    engine.rpm >= last_rpm,
                    "rpm fell from {last_rpm} to {} below the limiter band",
                    engine.rpm
                );
            }
            if engine.rpm > cfg.rev_limiter_rpm {
                assert!(engine.rev_limiter_factor < 1.0);
                limiter_engaged = true;
            }
            last_rpm = engine.rpm;
        }

        assert!(limiter_engaged, "limiter never engaged; rpm ended at {}", engine.rpm);
        assert!(engine.rpm > 7000.0, "expected near-redline rpm, got {}", engine.rpm);
    }

    #[test]
    fn throttle_smoothing_is_rate_limited() {
        let cfg = KartConfig::f1_prac();
        let mut engine = Engine::new(&cfg);

        engine.simulate(&cfg, 1.0, 0.0, DT);
        let expected = cfg.throttle_response * DT;
        assert!(
            (engine.smoothed_throttle - expected).abs() < 1e-5,
            "first-tick throttle {} != response-limited {}",
            engine.smoothed_throttle,
            expected
        );

        // after enough ticks it reaches the target exactly, no overshoot
        for _ in 0..60 {
            engine.simulate(&cfg, 1.0, 0.0, DT);
        }
        assert_eq!(engine.smoothed_throttle, 1.0);
    }

    #[test]
    fn empty_curve_falls_back_to_constant_torque() {
        let mut cfg = KartConfig::f1_prac();
        cfg.torque_curve = crate::kart::config::TorqueCurve::empty();
        let mut engine = Engine::new(&cfg);

        // saturate the throttle filter first
        for _ in 0..120 {
            engine.simulate(&cfg, 1.0, 0.0, DT);
        }
        let torque = engine.current_torque;
        let expected = cfg.fallback_torque * engine.rev_limiter_factor;
        assert!(
            (torque - expected).abs() < 1e-3,
            "fallback torque {torque} != {expected}"
        );
    }

    #[test]
    fn zero_throttle_settles_at_idle() {
        let cfg = KartConfig::f1_prac();
        let mut engine = Engine::new(&cfg);
        engine.rpm = 5000.0;

        for _ in 0..600 {
            engine.simulate(&cfg, 0.0, 0.0, DT);
        }
        assert_eq!(engine.rpm, cfg.idle_rpm, "engine should coast down to idle");
    }
}
