//! Canonical, fully-typed run inputs.
//!
//! Field-name normalization (historical spellings, optional fields,
//! missing-field reporting) lives in the fixture adapter in `parity`;
//! the integrator only ever sees these types, already validated.

use serde::{Deserialize, Serialize};

use crate::air::FuelSystem;
use crate::constants::{EIGHTH_FT, QUARTER_FT, TIMESLIP_MARKS_FT};
use crate::coupling::CouplingSpec;
use crate::engine::{PowerCurve, ThrottleStop};
use crate::error::SimError;

/// Race length selector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RaceLength {
    Eighth,
    Quarter,
    /// Arbitrary distance in feet.
    Custom(f64),
}

impl RaceLength {
    pub fn length_ft(&self) -> f64 {
        match self {
            Self::Eighth => EIGHTH_FT,
            Self::Quarter => QUARTER_FT,
            Self::Custom(ft) => *ft,
        }
    }

    /// Timeslip milestones for this length, ending at the finish line.
    pub fn checkpoints_ft(&self) -> Vec<f64> {
        let len = self.length_ft();
        let mut marks: Vec<f64> = TIMESLIP_MARKS_FT
            .iter()
            .copied()
            .filter(|&m| m < len)
            .collect();
        marks.push(len);
        marks
    }
}

/// Rotational inertia of the driveline, split at the coupling and the
/// transmission output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PmiSpec {
    pub engine_flywheel_clutch: f64,
    pub transmission_driveshaft: f64,
    pub tires_wheels_ring_gear: f64,
}

/// Immutable per-run vehicle description. Imperial units throughout:
/// lb, in, ft², RPM, HP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSpec {
    pub weight_lb: f64,
    pub wheelbase_in: f64,
    pub static_front_weight_lb: f64,
    /// Center-of-gravity height above the track.
    pub cg_height_in: f64,
    /// Staging-beam rollout, inches.
    pub rollout_in: f64,
    /// Deep staging: how far forward of the shallow-staged position the
    /// car sits in the beams. Subtracts from the effective rollout.
    #[serde(default)]
    pub deep_stage_in: f64,
    pub tire_diameter_in: f64,
    pub tire_width_in: f64,
    pub frontal_area_ft2: f64,
    pub drag_coeff: f64,
    pub lift_coeff: f64,
    /// Transmission ratios, first gear onward.
    pub gear_ratios: Vec<f64>,
    /// Per-gear efficiencies, same length as `gear_ratios`.
    pub gear_efficiencies: Vec<f64>,
    pub final_drive: f64,
    pub overall_efficiency: f64,
    /// Upshift thresholds; length = gear count − 1.
    pub shift_rpm: Vec<f64>,
    pub coupling: CouplingSpec,
    pub pmi: PmiSpec,
    pub power_curve: PowerCurve,
    pub hp_tq_mult: f64,
    pub fuel: FuelSystem,
    pub motorcycle: bool,
    pub rev_limiter_rpm: Option<f64>,
    /// Timed power reduction for bracket racing; None runs wide open.
    #[serde(default)]
    pub throttle_stop: Option<ThrottleStop>,
}

impl VehicleSpec {
    /// Structural-consistency checks. Reports every problem, not just
    /// the first.
    pub fn validate(&self) -> Result<(), SimError> {
        let mut missing = Vec::new();

        if self.gear_ratios.is_empty() {
            missing.push("vehicle.gearRatios: empty".to_string());
        }
        if self.gear_ratios.len() != self.gear_efficiencies.len() {
            missing.push(format!(
                "vehicle.perGearEff: length {} does not match {} gears",
                self.gear_efficiencies.len(),
                self.gear_ratios.len()
            ));
        }
        if !self.gear_ratios.is_empty()
            && self.shift_rpm.len() != self.gear_ratios.len() - 1
        {
            missing.push(format!(
                "vehicle.shiftRPM: length {} must be gear count − 1 ({})",
                self.shift_rpm.len(),
                self.gear_ratios.len() - 1
            ));
        }
        if self.weight_lb <= 0.0 {
            missing.push("vehicle.weight_lb: must be positive".to_string());
        }
        if self.tire_diameter_in <= 0.0 {
            missing.push("vehicle.tireDiaIn: must be positive".to_string());
        }
        if self.wheelbase_in <= 0.0 {
            missing.push("vehicle.wheelbase_in: must be positive".to_string());
        }
        // Skip when the weight itself is already reported; a bad weight
        // would otherwise cascade into a duplicate entry here
        if self.weight_lb > 0.0
            && (self.static_front_weight_lb < 0.0 || self.static_front_weight_lb >= self.weight_lb)
        {
            missing.push("vehicle.staticFrontWeight_lb: must be in [0, weight)".to_string());
        }
        if self.deep_stage_in < 0.0 {
            missing.push("vehicle.deepStageIn: must be non-negative".to_string());
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(SimError::Validation { missing })
        }
    }

    pub fn gear_count(&self) -> usize {
        self.gear_ratios.len()
    }
}

/// Immutable per-run environment description.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSpec {
    pub elevation_ft: f64,
    pub barometer_in_hg: f64,
    pub temperature_f: f64,
    pub humidity_pct: f64,
    pub wind_mph: f64,
    /// Wind direction relative to the direction of travel; 0° is a pure
    /// headwind.
    pub wind_angle_deg: f64,
    pub track_temp_f: f64,
    pub traction_index: f64,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::coupling::ClutchCoupling;

    /// ProStock reference vehicle used across module tests.
    pub(crate) fn prostock_vehicle() -> VehicleSpec {
        VehicleSpec {
            weight_lb: 2355.0,
            wheelbase_in: 107.0,
            static_front_weight_lb: 895.0,
            cg_height_in: 19.75,
            rollout_in: 9.0,
            deep_stage_in: 0.0,
            tire_diameter_in: 32.6,
            tire_width_in: 17.0,
            frontal_area_ft2: 18.2,
            drag_coeff: 0.240,
            lift_coeff: 0.100,
            gear_ratios: vec![2.60, 1.90, 1.50, 1.20, 1.00],
            gear_efficiencies: vec![0.990, 0.991, 0.992, 0.993, 0.994],
            final_drive: 4.86,
            overall_efficiency: 0.975,
            shift_rpm: vec![9400.0, 9400.0, 9400.0, 9400.0],
            coupling: CouplingSpec::Clutch(ClutchCoupling {
                launch_rpm: 7200.0,
                slip_rpm: 7600.0,
                slippage_factor: 1.004,
                lockup: false,
            }),
            pmi: PmiSpec {
                engine_flywheel_clutch: 3.42,
                transmission_driveshaft: 0.247,
                tires_wheels_ring_gear: 50.8,
            },
            power_curve: PowerCurve::from_pairs(vec![
                (7000.0, 1078.0),
                (7250.0, 1131.0),
                (7500.0, 1177.0),
                (7750.0, 1216.0),
                (8000.0, 1251.0),
                (8250.0, 1274.0),
                (8500.0, 1288.0),
                (8750.0, 1300.0),
                (9000.0, 1297.0),
                (9250.0, 1269.0),
                (9500.0, 1222.0),
            ])
            .unwrap(),
            hp_tq_mult: 1.0,
            fuel: FuelSystem::GasolineCarburetor,
            motorcycle: false,
            rev_limiter_rpm: None,
            throttle_stop: None,
        }
    }

    pub(crate) fn track_env() -> EnvironmentSpec {
        EnvironmentSpec {
            elevation_ft: 32.0,
            barometer_in_hg: 29.92,
            temperature_f: 75.0,
            humidity_pct: 55.0,
            wind_mph: 5.0,
            wind_angle_deg: 135.0,
            track_temp_f: 105.0,
            traction_index: 3.0,
        }
    }

    #[test]
    fn prostock_validates() {
        assert!(prostock_vehicle().validate().is_ok());
        let _ = track_env();
    }

    #[test]
    fn validation_collects_all_problems() {
        let mut v = prostock_vehicle();
        v.gear_efficiencies.pop();
        v.shift_rpm.pop();
        v.weight_lb = 0.0;
        match v.validate() {
            Err(SimError::Validation { missing }) => {
                assert_eq!(missing.len(), 3, "{missing:?}");
                // The static-front check is suppressed while the weight
                // itself is invalid; one problem, one entry
                assert!(!missing.iter().any(|m| m.contains("staticFront")), "{missing:?}");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn static_front_checked_against_valid_weight() {
        let mut v = prostock_vehicle();
        v.static_front_weight_lb = v.weight_lb + 1.0;
        match v.validate() {
            Err(SimError::Validation { missing }) => {
                assert_eq!(missing.len(), 1, "{missing:?}");
                assert!(missing[0].contains("staticFront"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn negative_deep_stage_rejected() {
        let mut v = prostock_vehicle();
        v.deep_stage_in = -1.0;
        assert!(matches!(v.validate(), Err(SimError::Validation { .. })));
    }

    #[test]
    fn race_length_checkpoints() {
        assert_eq!(RaceLength::Quarter.checkpoints_ft(), vec![
            60.0, 330.0, 660.0, 1000.0, 1320.0
        ]);
        assert_eq!(RaceLength::Eighth.checkpoints_ft(), vec![60.0, 330.0, 660.0]);
        let custom = RaceLength::Custom(1000.0).checkpoints_ft();
        assert_eq!(custom, vec![60.0, 330.0, 660.0, 1000.0]);
    }
}
