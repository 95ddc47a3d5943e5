//! Engine power curve and related lookups.

use serde::{Deserialize, Serialize};

use crate::constants::Z6;
use crate::error::SimError;
use crate::f32math;

/// Dyno curve as ascending (RPM, HP) pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerCurve {
    points: Vec<(f64, f64)>,
}

impl PowerCurve {
    /// Build a curve from (RPM, HP) pairs. Requires at least two points
    /// with strictly ascending RPM.
    pub fn from_pairs(points: Vec<(f64, f64)>) -> Result<Self, SimError> {
        if points.len() < 2 {
            return Err(SimError::Validation {
                missing: vec!["engineHP: at least 2 points required".into()],
            });
        }
        for w in points.windows(2) {
            if w[1].0 <= w[0].0 {
                return Err(SimError::Validation {
                    missing: vec![format!(
                        "engineHP: RPM values must be strictly ascending ({} after {})",
                        w[1].0, w[0].0
                    )],
                });
            }
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Linear interpolation in single precision, clamped to the curve
    /// endpoints (the legacy lookup never extrapolates).
    pub fn hp_at(&self, rpm: f64) -> f64 {
        f32math::table_lookup(rpm, &self.points)
    }

    /// Engine torque (lb·ft) at an RPM, from HP·5252/RPM.
    pub fn torque_at(&self, rpm: f64) -> f64 {
        if rpm <= 0.0 {
            return 0.0;
        }
        Z6 * self.hp_at(rpm) / rpm
    }

    /// Peak HP and the RPM where it occurs.
    pub fn peak(&self) -> (f64, f64) {
        self.points
            .iter()
            .copied()
            .fold((0.0, 0.0), |(prpm, php), (rpm, hp)| {
                if hp > php {
                    (rpm, hp)
                } else {
                    (prpm, php)
                }
            })
    }

    pub fn min_rpm(&self) -> f64 {
        self.points[0].0
    }

    pub fn max_rpm(&self) -> f64 {
        self.points[self.points.len() - 1].0
    }
}

/// Rev-limiter power cut: above the limit the ignition is effectively
/// dropped, leaving 5% of curve power to hold RPM.
pub fn apply_rev_limiter(hp: f64, rpm: f64, limiter_rpm: Option<f64>) -> f64 {
    match limiter_rpm {
        Some(limit) if limit > 0.0 && rpm >= limit => hp * 0.05,
        _ => hp,
    }
}

/// Timed throttle stop used in bracket racing: power drops to a fixed
/// percentage during a window, optionally ramping in and out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThrottleStop {
    /// When the stop activates, seconds of simulated time.
    pub activate_time_s: f64,
    /// How long the stop stays active.
    pub duration_s: f64,
    /// Throttle percentage while active, 0-100.
    pub throttle_pct: f64,
    /// Ramp time in and out; zero switches instantly.
    #[serde(default)]
    pub ramp_time_s: f64,
}

/// HP multiplier for a throttle stop at a given time: 1.0 outside the
/// active window, the target fraction inside it, linear across ramps.
pub fn throttle_stop_multiplier(time_s: f64, stop: Option<&ThrottleStop>) -> f64 {
    let Some(stop) = stop else {
        return 1.0;
    };
    let deactivate_time_s = stop.activate_time_s + stop.duration_s;
    if time_s < stop.activate_time_s || time_s >= deactivate_time_s {
        return 1.0;
    }
    let target = stop.throttle_pct / 100.0;
    if stop.ramp_time_s > 0.0 {
        if time_s < stop.activate_time_s + stop.ramp_time_s {
            let progress = (time_s - stop.activate_time_s) / stop.ramp_time_s;
            return 1.0 - (1.0 - target) * progress;
        }
        if time_s > deactivate_time_s - stop.ramp_time_s {
            let progress = (deactivate_time_s - time_s) / stop.ramp_time_s;
            return 1.0 - (1.0 - target) * progress;
        }
    }
    target
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prostock_curve() -> PowerCurve {
        PowerCurve::from_pairs(vec![
            (7000.0, 1078.0),
            (7250.0, 1131.0),
            (7500.0, 1177.0),
            (8750.0, 1300.0),
            (9500.0, 1222.0),
        ])
        .unwrap()
    }

    #[test]
    fn rejects_short_and_unsorted_curves() {
        assert!(PowerCurve::from_pairs(vec![(7000.0, 1000.0)]).is_err());
        assert!(PowerCurve::from_pairs(vec![(7000.0, 1000.0), (7000.0, 1100.0)]).is_err());
        assert!(PowerCurve::from_pairs(vec![(8000.0, 1000.0), (7000.0, 1100.0)]).is_err());
    }

    #[test]
    fn lookup_clamps_to_endpoints() {
        let c = prostock_curve();
        assert_eq!(c.hp_at(5000.0), 1078.0);
        assert_eq!(c.hp_at(12000.0), 1222.0);
    }

    #[test]
    fn lookup_interpolates_between_points() {
        let c = prostock_curve();
        let hp = c.hp_at(7125.0);
        assert!(hp > 1078.0 && hp < 1131.0);
    }

    #[test]
    fn torque_follows_hp_5252() {
        let c = prostock_curve();
        let tq = c.torque_at(8750.0);
        assert!((tq - Z6 * 1300.0 / 8750.0).abs() < 1e-9);
        assert_eq!(c.torque_at(0.0), 0.0);
    }

    #[test]
    fn peak_finds_max_hp() {
        let (rpm, hp) = prostock_curve().peak();
        assert_eq!(rpm, 8750.0);
        assert_eq!(hp, 1300.0);
    }

    #[test]
    fn rev_limiter_cuts_power() {
        assert_eq!(apply_rev_limiter(1000.0, 9600.0, Some(9500.0)), 50.0);
        assert_eq!(apply_rev_limiter(1000.0, 9000.0, Some(9500.0)), 1000.0);
        assert_eq!(apply_rev_limiter(1000.0, 9600.0, None), 1000.0);
    }

    #[test]
    fn throttle_stop_window_is_reduced_power() {
        let stop = ThrottleStop {
            activate_time_s: 1.0,
            duration_s: 2.0,
            throttle_pct: 40.0,
            ramp_time_s: 0.0,
        };
        assert_eq!(throttle_stop_multiplier(0.5, Some(&stop)), 1.0);
        assert_eq!(throttle_stop_multiplier(1.0, Some(&stop)), 0.4);
        assert_eq!(throttle_stop_multiplier(2.5, Some(&stop)), 0.4);
        assert_eq!(throttle_stop_multiplier(3.0, Some(&stop)), 1.0);
        assert_eq!(throttle_stop_multiplier(2.0, None), 1.0);
    }

    #[test]
    fn throttle_stop_ramps_linearly() {
        let stop = ThrottleStop {
            activate_time_s: 1.0,
            duration_s: 2.0,
            throttle_pct: 40.0,
            ramp_time_s: 0.2,
        };
        // Halfway into the ramp-in the cut is half applied
        let half_in = throttle_stop_multiplier(1.1, Some(&stop));
        assert!((half_in - 0.7).abs() < 1e-12);
        // Fully ramped in the middle of the window
        assert_eq!(throttle_stop_multiplier(2.0, Some(&stop)), 0.4);
        // Halfway out of the ramp-out the power is recovering
        let half_out = throttle_stop_multiplier(2.9, Some(&stop));
        assert!((half_out - 0.7).abs() < 1e-12);
    }
}
