//! Fixture loading and the regression harness that compares simulated
//! results against recorded reference timeslips.
//!
//! Fixtures are JSON documents with a stable field layout; every field
//! the adapter needs is optional at the serde level so a malformed file
//! produces one exhaustive missing-field report instead of a serde error
//! on the first absence.

use std::path::Path;

use once_cell::sync::Lazy;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::air::FuelSystem;
use crate::coupling::{ClutchCoupling, ConverterCoupling, CouplingSpec};
use crate::engine::{PowerCurve, ThrottleStop};
use crate::error::SimError;
use crate::input::{EnvironmentSpec, PmiSpec, RaceLength, VehicleSpec};
use crate::solver::{simulate, RunResult, SimOptions};

/// Default ET agreement tolerance (s).
pub const DEFAULT_ET_TOL_S: f64 = 0.05;
/// Default trap-speed agreement tolerance (MPH).
pub const DEFAULT_MPH_TOL: f64 = 1.0;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixtureMeta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub strict: Option<bool>,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TargetPair {
    pub et_s: Option<f64>,
    pub mph: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTargets {
    #[serde(default)]
    pub quarter: Option<TargetPair>,
    #[serde(default)]
    pub eighth: Option<TargetPair>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEnv {
    pub elevation_ft: Option<f64>,
    pub barometer_in_hg: Option<f64>,
    pub temperature_f: Option<f64>,
    pub humidity_pct: Option<f64>,
    pub wind_mph: Option<f64>,
    pub wind_angle_deg: Option<f64>,
    pub track_temp_f: Option<f64>,
    pub traction_index: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawVehicle {
    pub weight_lb: Option<f64>,
    pub wheelbase_in: Option<f64>,
    pub static_front_lb: Option<f64>,
    pub cg_height_in: Option<f64>,
    pub rollout_in: Option<f64>,
    #[serde(default)]
    pub deep_stage_in: Option<f64>,
    /// Tire diameter, inches. Either this or `tireRolloutIn` must be
    /// present; the rollout spelling is the tire circumference.
    pub tire_dia_in: Option<f64>,
    pub tire_rollout_in: Option<f64>,
    pub tire_width_in: Option<f64>,
    pub frontal_area_ft2: Option<f64>,
    pub drag_coeff: Option<f64>,
    pub lift_coeff: Option<f64>,
    pub gear_ratios: Option<Vec<f64>>,
    pub per_gear_eff: Option<Vec<f64>>,
    pub final_drive: Option<f64>,
    pub overall_eff: Option<f64>,
    #[serde(rename = "shiftRPM")]
    pub shift_rpm: Option<Vec<f64>>,
    pub clutch: Option<ClutchCoupling>,
    pub converter: Option<ConverterCoupling>,
    #[serde(default)]
    pub motorcycle: Option<bool>,
    #[serde(rename = "revLimiterRPM", default)]
    pub rev_limiter_rpm: Option<f64>,
    #[serde(default)]
    pub throttle_stop: Option<RawThrottleStop>,
}

/// Throttle-stop block of a fixture. Ignored unless `enabled` is true.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RawThrottleStop {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(rename = "activateTime_s")]
    pub activate_time_s: Option<f64>,
    #[serde(rename = "duration_s")]
    pub duration_s: Option<f64>,
    #[serde(rename = "throttlePct")]
    pub throttle_pct: Option<f64>,
    #[serde(rename = "rampTime_s", default)]
    pub ramp_time_s: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFuel {
    pub system: Option<String>,
    pub hp_tq_mult: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPmi {
    pub engine_flywheel_clutch: Option<f64>,
    pub transmission_driveshaft: Option<f64>,
    pub tires_wheels_ring_gear: Option<f64>,
}

/// A fixture file, field for field. The layout is a compatibility
/// contract: existing fixture files must keep loading unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFixture {
    #[serde(default)]
    pub meta: FixtureMeta,
    #[serde(default, rename = "vb6Targets")]
    pub vb6_targets: RawTargets,
    #[serde(default)]
    pub env: RawEnv,
    #[serde(default)]
    pub vehicle: RawVehicle,
    #[serde(default, rename = "engineHP")]
    pub engine_hp: Option<Vec<[f64; 2]>>,
    #[serde(default)]
    pub fuel: RawFuel,
    #[serde(default)]
    pub pmi: RawPmi,
}

impl RawFixture {
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, SimError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn name(&self) -> &str {
        self.meta.name.as_deref().unwrap_or("unnamed")
    }

    /// Convert to validated run inputs. Collects every missing field
    /// before returning so the report reads as a complete checklist.
    pub fn to_spec(&self) -> Result<(VehicleSpec, EnvironmentSpec), SimError> {
        fn need(missing: &mut Vec<String>, path: &str, value: Option<f64>) -> f64 {
            match value {
                Some(v) => v,
                None => {
                    missing.push(path.to_string());
                    0.0
                }
            }
        }
        let mut missing: Vec<String> = Vec::new();

        let env = EnvironmentSpec {
            elevation_ft: need(&mut missing, "env.elevationFt", self.env.elevation_ft),
            barometer_in_hg: need(&mut missing, "env.barometerInHg", self.env.barometer_in_hg),
            temperature_f: need(&mut missing, "env.temperatureF", self.env.temperature_f),
            humidity_pct: need(&mut missing, "env.humidityPct", self.env.humidity_pct),
            wind_mph: self.env.wind_mph.unwrap_or(0.0),
            wind_angle_deg: self.env.wind_angle_deg.unwrap_or(0.0),
            track_temp_f: need(&mut missing, "env.trackTempF", self.env.track_temp_f),
            traction_index: need(&mut missing, "env.tractionIndex", self.env.traction_index),
        };

        let v = &self.vehicle;
        let tire_dia_in = match (v.tire_dia_in, v.tire_rollout_in) {
            (Some(d), _) => d,
            (None, Some(rollout)) => rollout / crate::constants::PI,
            (None, None) => {
                missing.push("vehicle.tireDiaIn (or vehicle.tireRolloutIn)".to_string());
                0.0
            }
        };

        let coupling = match (v.clutch, v.converter) {
            (Some(c), None) => CouplingSpec::Clutch(c),
            (None, Some(c)) => CouplingSpec::Converter(c),
            (Some(_), Some(_)) => {
                missing.push("vehicle: both clutch and converter present".to_string());
                CouplingSpec::Clutch(ClutchCoupling {
                    launch_rpm: 0.0,
                    slip_rpm: 0.0,
                    slippage_factor: 1.0,
                    lockup: false,
                })
            }
            (None, None) => {
                missing.push("vehicle.clutch or vehicle.converter".to_string());
                CouplingSpec::Clutch(ClutchCoupling {
                    launch_rpm: 0.0,
                    slip_rpm: 0.0,
                    slippage_factor: 1.0,
                    lockup: false,
                })
            }
        };

        let fuel = match self.fuel.system.as_deref() {
            Some(label) => match FuelSystem::from_label(label) {
                Some(f) => f,
                None => {
                    missing.push(format!("fuel.system: unknown {label:?}"));
                    FuelSystem::GasolineCarburetor
                }
            },
            None => {
                missing.push("fuel.system".to_string());
                FuelSystem::GasolineCarburetor
            }
        };

        let power_curve = match &self.engine_hp {
            Some(points) if points.len() >= 2 => {
                match PowerCurve::from_pairs(points.iter().map(|p| (p[0], p[1])).collect()) {
                    Ok(c) => Some(c),
                    Err(SimError::Validation { missing: m }) => {
                        missing.extend(m);
                        None
                    }
                    Err(e) => return Err(e),
                }
            }
            _ => {
                missing.push("engineHP: at least 2 [rpm, hp] points".to_string());
                None
            }
        };

        let throttle_stop = match &v.throttle_stop {
            Some(ts) if ts.enabled.unwrap_or(false) => Some(ThrottleStop {
                activate_time_s: need(
                    &mut missing,
                    "vehicle.throttleStop.activateTime_s",
                    ts.activate_time_s,
                ),
                duration_s: need(&mut missing, "vehicle.throttleStop.duration_s", ts.duration_s),
                throttle_pct: need(
                    &mut missing,
                    "vehicle.throttleStop.throttlePct",
                    ts.throttle_pct,
                ),
                ramp_time_s: ts.ramp_time_s.unwrap_or(0.0),
            }),
            _ => None,
        };

        let vehicle = VehicleSpec {
            weight_lb: need(&mut missing, "vehicle.weightLb", v.weight_lb),
            wheelbase_in: need(&mut missing, "vehicle.wheelbaseIn", v.wheelbase_in),
            static_front_weight_lb: need(&mut missing, "vehicle.staticFrontLb", v.static_front_lb),
            cg_height_in: need(&mut missing, "vehicle.cgHeightIn", v.cg_height_in),
            rollout_in: need(&mut missing, "vehicle.rolloutIn", v.rollout_in),
            deep_stage_in: v.deep_stage_in.unwrap_or(0.0),
            tire_diameter_in: tire_dia_in,
            tire_width_in: need(&mut missing, "vehicle.tireWidthIn", v.tire_width_in),
            frontal_area_ft2: need(&mut missing, "vehicle.frontalAreaFt2", v.frontal_area_ft2),
            drag_coeff: need(&mut missing, "vehicle.dragCoeff", v.drag_coeff),
            lift_coeff: need(&mut missing, "vehicle.liftCoeff", v.lift_coeff),
            gear_ratios: v.gear_ratios.clone().unwrap_or_else(|| {
                missing.push("vehicle.gearRatios".to_string());
                Vec::new()
            }),
            gear_efficiencies: v.per_gear_eff.clone().unwrap_or_else(|| {
                missing.push("vehicle.perGearEff".to_string());
                Vec::new()
            }),
            final_drive: need(&mut missing, "vehicle.finalDrive", v.final_drive),
            overall_efficiency: need(&mut missing, "vehicle.overallEff", v.overall_eff),
            shift_rpm: v.shift_rpm.clone().unwrap_or_else(|| {
                missing.push("vehicle.shiftRPM".to_string());
                Vec::new()
            }),
            coupling,
            pmi: PmiSpec {
                engine_flywheel_clutch: need(
                    &mut missing,
                    "pmi.engineFlywheelClutch",
                    self.pmi.engine_flywheel_clutch,
                ),
                transmission_driveshaft: need(
                    &mut missing,
                    "pmi.transmissionDriveshaft",
                    self.pmi.transmission_driveshaft,
                ),
                tires_wheels_ring_gear: need(
                    &mut missing,
                    "pmi.tiresWheelsRingGear",
                    self.pmi.tires_wheels_ring_gear,
                ),
            },
            power_curve: power_curve.unwrap_or_else(|| {
                PowerCurve::from_pairs(vec![(1000.0, 1.0), (2000.0, 1.0)]).unwrap()
            }),
            hp_tq_mult: self.fuel.hp_tq_mult.unwrap_or(1.0),
            fuel,
            motorcycle: v.motorcycle.unwrap_or(false),
            rev_limiter_rpm: v.rev_limiter_rpm,
            throttle_stop,
        };

        if !missing.is_empty() {
            return Err(SimError::Validation { missing });
        }
        vehicle.validate()?;
        Ok((vehicle, env))
    }

    /// Recorded target for a race length, when the fixture carries one.
    pub fn target_for(&self, race: RaceLength) -> Option<TargetPair> {
        match race {
            RaceLength::Quarter => self.vb6_targets.quarter,
            RaceLength::Eighth => self.vb6_targets.eighth,
            RaceLength::Custom(_) => None,
        }
    }
}

/// Agreement tolerances for a parity check.
#[derive(Debug, Clone, Copy)]
pub struct ParityTolerance {
    pub et_s: f64,
    pub mph: f64,
}

impl Default for ParityTolerance {
    fn default() -> Self {
        Self {
            et_s: DEFAULT_ET_TOL_S,
            mph: DEFAULT_MPH_TOL,
        }
    }
}

/// One fixture's parity outcome.
#[derive(Debug, Clone, Serialize)]
pub struct ParityResult {
    pub name: String,
    pub et_s: f64,
    pub mph: f64,
    pub target_et_s: Option<f64>,
    pub target_mph: Option<f64>,
    /// Simulated minus target; None when the fixture has no target.
    pub et_delta_s: Option<f64>,
    pub mph_delta: Option<f64>,
    pub pass: bool,
}

/// Aggregate over a fixture set.
#[derive(Debug, Clone, Serialize)]
pub struct ParityEvaluation {
    pub results: Vec<ParityResult>,
    pub mean_abs_et_s: f64,
    pub mean_abs_mph: f64,
    pub passed: usize,
    pub total: usize,
}

/// Simulate one fixture and compare against its recorded target.
pub fn run_parity(
    fixture: &RawFixture,
    race: RaceLength,
    tol: ParityTolerance,
    opts: &SimOptions,
) -> Result<(ParityResult, RunResult), SimError> {
    let (vehicle, env) = fixture.to_spec()?;
    let mut opts = opts.clone();
    if let Some(strict) = fixture.meta.strict {
        opts.strict = strict;
    }
    let run = simulate(&vehicle, &env, race, &opts)?;

    let target = fixture.target_for(race);
    let (target_et, target_mph) = match target {
        Some(t) => (t.et_s, t.mph),
        None => (None, None),
    };
    let et_delta = target_et.map(|t| run.et_s - t);
    let mph_delta = target_mph.map(|t| run.trap_mph - t);
    let pass = et_delta.map_or(true, |d| d.abs() <= tol.et_s)
        && mph_delta.map_or(true, |d| d.abs() <= tol.mph);

    info!(
        name = fixture.name(),
        et_s = run.et_s,
        mph = run.trap_mph,
        pass,
        "parity run complete"
    );

    let result = ParityResult {
        name: fixture.name().to_string(),
        et_s: run.et_s,
        mph: run.trap_mph,
        target_et_s: target_et,
        target_mph,
        et_delta_s: et_delta,
        mph_delta,
        pass,
    };
    Ok((result, run))
}

/// Run a fixture set in parallel and aggregate. Fixture order is
/// preserved in the results regardless of scheduling.
pub fn evaluate(
    fixtures: &[RawFixture],
    race: RaceLength,
    tol: ParityTolerance,
    opts: &SimOptions,
) -> Result<ParityEvaluation, SimError> {
    let results: Vec<ParityResult> = fixtures
        .par_iter()
        .map(|f| run_parity(f, race, tol, opts).map(|(r, _)| r))
        .collect::<Result<_, _>>()?;

    let with_target: Vec<&ParityResult> = results
        .iter()
        .filter(|r| r.et_delta_s.is_some())
        .collect();
    let n = with_target.len().max(1) as f64;
    let mean_abs_et_s = with_target
        .iter()
        .filter_map(|r| r.et_delta_s)
        .map(f64::abs)
        .sum::<f64>()
        / n;
    let mean_abs_mph = with_target
        .iter()
        .filter_map(|r| r.mph_delta)
        .map(f64::abs)
        .sum::<f64>()
        / n;
    let passed = results.iter().filter(|r| r.pass).count();
    let total = results.len();

    Ok(ParityEvaluation {
        results,
        mean_abs_et_s,
        mean_abs_mph,
        passed,
        total,
    })
}

/// Human-readable summary table.
pub fn format_summary(eval: &ParityEvaluation) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<28} {:>8} {:>8} {:>8} {:>8} {:>6}\n",
        "fixture", "ET", "tgt ET", "MPH", "tgt MPH", "pass"
    ));
    for r in &eval.results {
        let fmt_opt = |v: Option<f64>| match v {
            Some(x) => format!("{x:.2}"),
            None => "-".to_string(),
        };
        out.push_str(&format!(
            "{:<28} {:>8.3} {:>8} {:>8.2} {:>8} {:>6}\n",
            r.name,
            r.et_s,
            fmt_opt(r.target_et_s),
            r.mph,
            fmt_opt(r.target_mph),
            if r.pass { "yes" } else { "NO" }
        ));
    }
    out.push_str(&format!(
        "passed {}/{}  mean |dET| {:.3} s  mean |dMPH| {:.2}\n",
        eval.passed, eval.total, eval.mean_abs_et_s, eval.mean_abs_mph
    ));
    out
}

/// Fixtures compiled into the binary for `parity --builtin`.
pub static BUILTIN_FIXTURES: Lazy<Vec<RawFixture>> = Lazy::new(|| {
    [
        include_str!("../fixtures/pro-stock.json"),
        include_str!("../fixtures/super-gas.json"),
    ]
    .iter()
    .map(|json| RawFixture::from_json(json).expect("builtin fixture must parse"))
    .collect()
});
