// ==============================================================================
// aero.rs — DRAG / DOWNFORCE / GROUND EFFECT
// ------------------------------------------------------------------------------
// Pure functions of body speed and ride height:
//
//     drag        = 0.5 * rho * Cd * A * v^2            (opposes velocity)
//     downforce   = 0.5 * rho * Cl_wing * Awing * v^2   (Cl_wing = slope * angle)
//                 + 0.5 * rho * v^2 * Cdown * A * 0.1   (baseline body term)
//     groundFx    = factor / max(h, 0.05)               (underbody suction)
//
// The 0.05 m floor bounds the ground-effect force as ride height approaches
// zero. The integrator applies ground effect only while a downward probe
// within ground_effect_max_dist reports contact, and skips drag below
// 0.1 m/s where the velocity direction is undefined.
// ==============================================================================

use crate::kart::config::KartConfig;

/// Minimum ride height used by the ground-effect term.
pub const GROUND_EFFECT_MIN_HEIGHT: f32 = 0.05;

/// Speed below which drag is not applied (no meaningful velocity direction).
pub const AERO_MIN_SPEED: f32 = 0.1;

#[derive(Copy, Clone, Debug, Default)]
pub struct AeroForces {
    pub drag: f32,          // N
    pub downforce: f32,     // N
    pub ground_effect: f32, // N
}

#[inline]
pub fn drag_force(config: &KartConfig, speed: f32) -> f32 {
    0.5 * config.air_density * config.drag_coefficient * config.frontal_area * speed * speed
}

#[inline]
pub fn downforce(config: &KartConfig, speed: f32) -> f32 {
    let v_sq = speed * speed;
    let cl = config.lift_coefficient_slope * config.wing_angle_deg.to_radians();
    let wing = 0.5 * config.air_density * cl * config.wing_area * v_sq;
    let baseline =
        0.5 * config.air_density * v_sq * config.downforce_coefficient * config.frontal_area * 0.1;
    wing + baseline
}

#[inline]
pub fn ground_effect_force(config: &KartConfig, ride_height: f32) -> f32 {
    config.ground_effect_factor / ride_height.max(GROUND_EFFECT_MIN_HEIGHT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drag_grows_with_the_square_of_speed() {
        let cfg = KartConfig::f1_prac();
        let slow = drag_force(&cfg, 10.0);
        let fast = drag_force(&cfg, 40.0);
        assert!(slow > 0.0);
        assert!(
            (fast / slow - 16.0).abs() < 1e-3,
            "4x speed should give 16x drag, got ratio {}",
            fast / slow
        );
    }

    #[test]
    fn drag_matches_the_quadratic_formula() {
        let cfg = KartConfig::f1_prac();
        let v = 25.0;
        let expected = 0.5 * cfg.air_density * cfg.drag_coefficient * cfg.frontal_area * v * v;
        assert!((drag_force(&cfg, v) - expected).abs() < 1e-3);
    }

    #[test]
    fn downforce_combines_wing_and_baseline_terms() {
        let cfg = KartConfig::f1_prac();
        let v = 30.0;

        let mut no_wing = cfg.clone();
        no_wing.wing_area = 0.0;
        let mut no_baseline = cfg.clone();
        no_baseline.downforce_coefficient = 0.0;

        let total = downforce(&cfg, v);
        let split = downforce(&no_wing, v) + downforce(&no_baseline, v);
        assert!((total - split).abs() < 1e-3, "terms must be additive");
        assert!(total > 0.0);
    }

    #[test]
    fn ground_effect_is_bounded_by_the_height_floor() {
        let cfg = KartConfig::f1_prac();
        let at_floor = ground_effect_force(&cfg, GROUND_EFFECT_MIN_HEIGHT);
        assert_eq!(ground_effect_force(&cfg, 0.0), at_floor);
        assert_eq!(ground_effect_force(&cfg, 0.01), at_floor);
        assert!(ground_effect_force(&cfg, 0.2) < at_floor, "force must shrink with height");
    }

    #[test]
    fn ground_effect_inverse_height() {
        let cfg = KartConfig::f1_prac();
        let near = ground_effect_force(&cfg, 0.1);
        let far = ground_effect_force(&cfg, 0.2);
        assert!((near / far - 2.0).abs() < 1e-3);
    }
}
