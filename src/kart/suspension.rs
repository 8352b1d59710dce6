// ==============================================================================
// suspension.rs — PER-WHEEL SPRING-DAMPER UNIT
// ------------------------------------------------------------------------------
// Converts a probe distance into a suspension force:
//
//     clamped      = clamp(hitDist - radius, 0, restLength + travel)
//     compression  = restLength - clamped          (negative while extended)
//     rate         = (compression - lastCompression) / dt
//     spring       = stiffness * max(compression, 0)   (a spring cannot pull)
//     damper       = damping * rate
//     total        = max(0, spring + damper)           (never pulls the chassis)
//
// The raw (possibly negative) compression is what persists in lastCompression,
// so the damper rate stays continuous as the wheel crosses its rest length.
// dt = 0 yields rate = 0; stepping twice with identical inputs and dt = 0
// produces identical output.
//
// This module only measures. The integrator applies `total` along the chassis
// local up axis at the probe contact point.
// ==============================================================================

use rapier3d::prelude::{Point, Real};
use serde::Serialize;

use crate::kart::config::KartConfig;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub enum WheelId {
    FL,
    FR,
    RL,
    RR,
}

impl WheelId {
    pub fn as_str(&self) -> &'static str {
        match self {
            WheelId::FL => "FL",
            WheelId::FR => "FR",
            WheelId::RL => "RL",
            WheelId::RR => "RR",
        }
    }
}

/// Front pair steers, rear pair drives. Force computation branches on this
/// role; there is no per-wheel subtype.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub enum WheelRole {
    FrontSteer,
    RearDrive,
}

/// Per-wheel mutable state, owned by the kart and rebuilt nowhere else.
/// Created at spawn, mutated every tick, dropped with the kart.
#[derive(Clone, Debug)]
pub struct WheelState {
    pub id: WheelId,
    pub role: WheelRole,
    pub offset: Point<Real>, // mount position in chassis space

    pub last_compression: f32, // m, persists across ticks for the damper rate
    pub normal_force: f32,     // N, this tick's suspension load
    pub long_force: f32,       // N, this tick's tire Fx
    pub lat_force: f32,        // N, this tick's tire Fy
    pub lat_vel: f32,          // m/s, lateral slip velocity at the contact
    pub ride_height: f32,      // m, telemetry ground clearance

    pub contact_point: Option<Point<Real>>, // world, set by the suspension pass

    // telemetry readouts, rebuilt every tick
    pub spring_force: f32,
    pub damper_force: f32,
    pub total_force: f32,
    pub compression_pct: f32,
}

impl WheelState {
    pub fn new(id: WheelId, role: WheelRole, offset: Point<Real>, static_load: f32) -> Self {
        Self {
            id,
            role,
            offset,
            last_compression: 0.0,
            // seed with the static axle load so the first grounded tire pass
            // never sees a zero friction limit
            normal_force: static_load,
            long_force: 0.0,
            lat_force: 0.0,
            lat_vel: 0.0,
            ride_height: f32::MAX,
            contact_point: None,
            spring_force: 0.0,
            damper_force: 0.0,
            total_force: 0.0,
            compression_pct: 0.0,
        }
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct SuspensionForces {
    pub spring: f32,      // N
    pub damper: f32,      // N
    pub total: f32,       // N, >= 0
    pub compression: f32, // m, raw (may be negative)
}

/// One suspension tick for one wheel. `hit_distance` is the probe distance
/// from the mount along local down, or None when airborne / over a gap.
pub fn suspension_step(
    config: &KartConfig,
    wheel: &mut WheelState,
    hit_distance: Option<f32>,
    dt: f32,
) -> SuspensionForces {
    let max_len = config.rest_length + config.spring_travel;

    let Some(distance) = hit_distance else {
        // Airborne: no force, wheel rides at full extension. lastCompression
        // persists for rate continuity on the next contact.
        wheel.normal_force = 0.0;
        wheel.contact_point = None;
        wheel.spring_force = 0.0;
        wheel.damper_force = 0.0;
        wheel.total_force = 0.0;
        wheel.compression_pct = 0.0;
        return SuspensionForces::default();
    };

    let clamped = (distance - config.wheel_radius).clamp(0.0, max_len);
    let compression = config.rest_length - clamped;

    let rate = if dt > 0.0 {
        (compression - wheel.last_compression) / dt
    } else {
        0.0
    };
    wheel.last_compression = compression;

    let spring = config.spring_stiffness * compression.max(0.0);
    let damper = config.damper_stiffness * rate;
    let total = (spring + damper).max(0.0);

    wheel.normal_force = total;
    wheel.spring_force = spring;
    wheel.damper_force = damper;
    wheel.total_force = total;
    wheel.compression_pct =
        ((max_len - clamped) / (2.0 * config.spring_travel.max(1e-4))).clamp(0.0, 1.0) * 100.0;

    SuspensionForces {
        spring,
        damper,
        total,
        compression,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rapier3d::prelude::point;

    const DT: f32 = 1.0 / 60.0;

    fn test_wheel() -> WheelState {
        WheelState::new(WheelId::FL, WheelRole::FrontSteer, point![-0.8, 0.0, 1.5], 1962.0)
    }

    #[test]
    fn hanging_wheel_produces_no_spring_force() {
        // mount 1 m above flat ground, rest 0.6, travel 0.3, radius 0.3:
        // clamped = clamp(1.0 - 0.3, 0, 0.9) = 0.7, compression = -0.1
        let cfg = KartConfig::f1_prac();
        let mut wheel = test_wheel();

        let f = suspension_step(&cfg, &mut wheel, Some(1.0), DT);

        assert!((f.compression - (-0.1)).abs() < 1e-5, "compression {}", f.compression);
        assert_eq!(f.spring, 0.0, "spring must be clamped to zero while hanging");
        assert_eq!(f.total, 0.0, "suspension must not pull the chassis down");
        assert_eq!(wheel.normal_force, 0.0);
    }

    #[test]
    fn spring_term_never_negative_for_any_extension() {
        let cfg = KartConfig::f1_prac();
        for dist_mm in 900..1250 {
            let dist = dist_mm as f32 / 1000.0;
            let mut wheel = test_wheel();
            let f = suspension_step(&cfg, &mut wheel, Some(dist), DT);
            assert!(f.spring >= 0.0, "spring {} negative at distance {}", f.spring, dist);
            assert!(f.total >= 0.0, "total {} negative at distance {}", f.total, dist);
        }
    }

    #[test]
    fn at_rest_length_damper_alone_decides() {
        // distance 0.9 -> clamped 0.6 -> compression exactly 0
        let cfg = KartConfig::f1_prac();
        let mut wheel = test_wheel();

        let f = suspension_step(&cfg, &mut wheel, Some(0.9), DT);
        assert!(f.compression.abs() < 1e-6);
        assert_eq!(f.spring, 0.0);
        assert_eq!(f.total, 0.0, "zero rate from a zeroed lastCompression");

        // now approach rest from an extended position: positive rate, damper
        // carries the whole force
        let mut wheel = test_wheel();
        wheel.last_compression = -0.05;
        let f = suspension_step(&cfg, &mut wheel, Some(0.9), DT);
        let expected_rate = 0.05 / DT;
        assert!(
            (f.damper - cfg.damper_stiffness * expected_rate).abs() < 1e-2,
            "damper {} for rate {}",
            f.damper,
            expected_rate
        );
        assert!(f.total > 0.0);
        assert_eq!(f.spring, 0.0);
    }

    #[test]
    fn compressed_wheel_pushes_up() {
        let cfg = KartConfig::f1_prac();
        let mut wheel = test_wheel();
        wheel.last_compression = 0.1;

        // distance 0.8 -> clamped 0.5 -> compression 0.1, zero rate
        let f = suspension_step(&cfg, &mut wheel, Some(0.8), DT);
        assert!((f.compression - 0.1).abs() < 1e-6);
        assert!((f.spring - cfg.spring_stiffness * 0.1).abs() < 1e-2);
        assert!((f.total - f.spring).abs() < 1e-2, "no damper force at steady state");
    }

    #[test]
    fn zero_dt_step_is_idempotent() {
        let cfg = KartConfig::f1_prac();
        let mut wheel = test_wheel();
        wheel.last_compression = 0.07;

        let first = suspension_step(&cfg, &mut wheel, Some(0.82), 0.0);
        let second = suspension_step(&cfg, &mut wheel, Some(0.82), 0.0);

        assert_eq!(first.compression, second.compression);
        assert_eq!(first.total, second.total);
        assert_eq!(first.damper, 0.0, "dt = 0 must not produce a damper rate");
    }

    #[test]
    fn airborne_keeps_last_compression_for_continuity() {
        let cfg = KartConfig::f1_prac();
        let mut wheel = test_wheel();

        suspension_step(&cfg, &mut wheel, Some(0.75), DT);
        let stored = wheel.last_compression;
        assert!(stored > 0.0);

        suspension_step(&cfg, &mut wheel, None, DT);
        assert_eq!(wheel.last_compression, stored);
        assert_eq!(wheel.total_force, 0.0);
    }

    #[test]
    fn compression_percentage_matches_travel_window() {
        let cfg = KartConfig::f1_prac();
        let mut wheel = test_wheel();

        // clamped = 0.7, window = 2 * 0.3: (0.9 - 0.7) / 0.6 = 33.3%
        suspension_step(&cfg, &mut wheel, Some(1.0), DT);
        assert!(
            (wheel.compression_pct - 33.333).abs() < 0.1,
            "pct {}",
            wheel.compression_pct
        );

        // fully bottomed out: clamped = 0 -> 100% (clamped by the window)
        let mut wheel = test_wheel();
        suspension_step(&cfg, &mut wheel, Some(0.3), DT);
        assert_eq!(wheel.compression_pct, 100.0);
    }
}
