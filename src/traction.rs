//! Tire traction model.
//!
//! Two views of the same ceiling. The Coulomb form expresses the limit as
//! a force: rear normal load times a base friction coefficient scaled by
//! the track traction index. The legacy form (CRTF) folds tire geometry
//! and dynamic rear weight into an empirical force curve, converts it to
//! a maximum acceleration, and clamps by reflecting the excess below the
//! ceiling rather than clipping flat. The integrator uses the legacy
//! clamp in strict mode and the flat clip otherwise; both flag slip.

use crate::constants::AX;

/// Rear-axle normal force from total weight and launch load bias.
pub fn normal_force(total_weight_lbf: f64, load_bias: f64) -> f64 {
    total_weight_lbf * load_bias
}

/// Coulomb tractive-force ceiling scaled by the traction index.
pub fn max_tractive_force(normal_lbf: f64, base_mu: f64, traction_index: f64) -> f64 {
    normal_lbf * base_mu * (1.0 + 0.02 * traction_index)
}

/// Clip a force demand to a ceiling. Returns the applied force and a
/// slipping flag; a demand at or below the ceiling passes through
/// untouched. Soft limit, never an error.
pub fn apply_traction_limit(demand_lbf: f64, ceiling_lbf: f64) -> (f64, bool) {
    if demand_lbf > ceiling_lbf {
        (ceiling_lbf, true)
    } else {
        (demand_lbf, false)
    }
}

/// Base traction coefficient from the traction index and track surface
/// temperature effect.
pub fn caxi(traction_index: f64, track_temp_effect: f64) -> f64 {
    (1.0 - (traction_index - 1.0) * 0.01) / track_temp_effect.powf(0.25)
}

/// Legacy traction force curve (lbf) from tire geometry and dynamic rear
/// weight.
pub fn crtf(caxi: f64, tire_dia_in: f64, tire_width_in: f64, dynamic_rwt_lbf: f64) -> f64 {
    caxi * AX
        * tire_dia_in
        * (tire_width_in + 1.0)
        * (0.92 + 0.08 * (dynamic_rwt_lbf / 1900.0).powf(2.15))
}

/// Maximum acceleration (g) from the traction force, tire growth, drag
/// force, and vehicle weight.
pub fn a_max(crtf_lbf: f64, tire_growth: f64, drag_force_lbf: f64, weight_lbf: f64) -> f64 {
    ((crtf_lbf / tire_growth) - drag_force_lbf) / weight_lbf
}

/// Acceleration clamp outcome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClampedAccel {
    pub ags_g: f64,
    pub pqwt: f64,
    pub slipping: bool,
}

/// Legacy acceleration clamp. Above the ceiling the excess is reflected
/// (`2·amax − ags`) and the specific thrust rescaled in proportion;
/// below the floor both are pinned to the floor at the current velocity.
pub fn clamp_acceleration(
    ags_g: f64,
    pqwt: f64,
    a_max_g: f64,
    a_min_g: f64,
    gc: f64,
    vel_fps: f64,
) -> ClampedAccel {
    let mut out = ClampedAccel {
        ags_g,
        pqwt,
        slipping: false,
    };
    if out.ags_g > a_max_g {
        out.slipping = true;
        out.pqwt = out.pqwt * (a_max_g - (out.ags_g - a_max_g)) / out.ags_g;
        out.ags_g = a_max_g - (out.ags_g - a_max_g);
    }
    if out.ags_g < a_min_g {
        out.ags_g = a_min_g;
        out.pqwt = a_min_g * gc * vel_fps;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::GC;

    #[test]
    fn ceiling_scales_with_traction_index() {
        let n = normal_force(2355.0, 0.62);
        let low = max_tractive_force(n, 1.7, 1.0);
        let high = max_tractive_force(n, 1.7, 5.0);
        assert!(high > low);
        assert!((low / (n * 1.7) - 1.02).abs() < 1e-12);
    }

    #[test]
    fn limit_clips_only_above_ceiling() {
        assert_eq!(apply_traction_limit(500.0, 1000.0), (500.0, false));
        assert_eq!(apply_traction_limit(1000.0, 1000.0), (1000.0, false));
        assert_eq!(apply_traction_limit(1500.0, 1000.0), (1000.0, true));
    }

    #[test]
    fn applied_never_exceeds_ceiling() {
        for demand in [0.0, 100.0, 999.9, 1000.0, 5000.0] {
            let (applied, _) = apply_traction_limit(demand, 1000.0);
            assert!(applied <= 1000.0);
        }
    }

    #[test]
    fn caxi_decreases_with_index_and_temp() {
        assert!(caxi(5.0, 1.0) < caxi(1.0, 1.0));
        assert!(caxi(3.0, 1.04) < caxi(3.0, 1.0));
    }

    #[test]
    fn crtf_grows_with_rear_weight() {
        let c = caxi(3.0, 1.0);
        assert!(crtf(c, 32.6, 17.0, 2200.0) > crtf(c, 32.6, 17.0, 1500.0));
    }

    #[test]
    fn reflective_clamp_flags_slip() {
        let out = clamp_acceleration(3.0, 3000.0, 2.5, 0.004, GC, 10.0);
        assert!(out.slipping);
        assert!((out.ags_g - 2.0).abs() < 1e-12); // 2*2.5 - 3.0
        assert!(out.pqwt < 3000.0);
    }

    #[test]
    fn floor_pins_accel_and_thrust() {
        let out = clamp_acceleration(-0.5, -100.0, 2.5, 0.004, GC, 50.0);
        assert!(!out.slipping);
        assert_eq!(out.ags_g, 0.004);
        assert!((out.pqwt - 0.004 * GC * 50.0).abs() < 1e-12);
    }

    #[test]
    fn in_band_accel_untouched() {
        let out = clamp_acceleration(1.5, 1500.0, 2.5, 0.004, GC, 50.0);
        assert_eq!(out.ags_g, 1.5);
        assert_eq!(out.pqwt, 1500.0);
        assert!(!out.slipping);
    }
}
