//! Drivetrain kinematics: RPM↔speed conversion, wheel force, and the
//! legacy tire growth / squat / slip models.

use crate::constants::PI;
use crate::f32math::{fdiv, fmul};
use crate::input::VehicleSpec;

/// Tire state at a given speed and acceleration. Growth stretches the
/// circumference with speed; squat shrinks it under load.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TireState {
    /// Diameter growth factor (≥ 1 at speed).
    pub growth: f64,
    /// Loaded circumference (ft), including squat.
    pub circumference_ft: f64,
}

/// Tire growth and loaded circumference.
///
/// Growth follows a v^1.6 curve capped by a linear branch; squat removes
/// 0.035 of circumference per g of acceleration.
pub fn tire_state(tire_dia_in: f64, tire_width_in: f64, v_fps: f64, accel_g: f64) -> TireState {
    let tgk = (tire_width_in.powf(1.4) + tire_dia_in - 16.0) / (0.171 * tire_dia_in.powf(1.7));
    let mut growth = 1.0 + tgk * 0.0000135 * v_fps.powf(1.6);
    let linear = 1.0 + tgk * 0.00035 * v_fps;
    if linear < growth {
        growth = linear;
    }
    let squat = growth - 0.035 * accel_g.abs();
    TireState {
        growth,
        circumference_ft: squat * tire_dia_in * PI / 12.0,
    }
}

/// Unloaded tire circumference (ft) at rest.
pub fn static_circumference_ft(tire_dia_in: f64) -> f64 {
    tire_dia_in * PI / 12.0
}

/// Distance-dependent tire slip factor (≥ 1): high at launch, tapering
/// quadratically to 1.02 at the quarter-mile mark.
pub fn tire_slip_factor(dist_ft: f64, traction_index: f64, track_temp_effect: f64) -> f64 {
    let work = 0.005 * (traction_index - 1.0) + 3.0 * (track_temp_effect - 1.0);
    1.02 + work * (1.0 - (dist_ft / 1320.0).powi(2))
}

/// Track-surface temperature effect on traction and slip, 1.0 at 100 °F
/// and capped at 1.04.
pub fn track_temp_effect(track_temp_f: f64) -> f64 {
    let deviation = (100.0 - track_temp_f).abs();
    let k = if track_temp_f > 100.0 { 0.0000025 } else { 0.000002 };
    (1.0 + k * deviation.powf(2.5)).min(1.04)
}

/// Gear ratio for a gear index, clamped to the last valid gear.
pub fn gear_ratio_at(spec: &VehicleSpec, gear_idx: usize) -> f64 {
    let idx = gear_idx.min(spec.gear_ratios.len() - 1);
    spec.gear_ratios[idx]
}

/// Per-gear efficiency for a gear index, clamped like `gear_ratio_at`.
pub fn gear_efficiency_at(spec: &VehicleSpec, gear_idx: usize) -> f64 {
    let idx = gear_idx.min(spec.gear_efficiencies.len() - 1);
    spec.gear_efficiencies[idx]
}

/// Engine RPM from road speed through tire, final drive, gear, and slip.
/// Zero speed yields exactly zero.
pub fn rpm_from_speed(v_fps: f64, gear_idx: usize, spec: &VehicleSpec, slip: f64) -> f64 {
    if v_fps == 0.0 {
        return 0.0;
    }
    let cir = static_circumference_ft(spec.tire_diameter_in);
    let wheel_rpm = fdiv(fmul(v_fps, 60.0), cir);
    let ds = fmul(wheel_rpm, 1.0 + slip);
    fmul(fmul(ds, spec.final_drive), gear_ratio_at(spec, gear_idx))
}

/// Road speed (ft/s) from engine RPM; algebraic inverse of
/// `rpm_from_speed`. Zero RPM yields exactly zero.
pub fn speed_from_rpm(rpm: f64, gear_idx: usize, spec: &VehicleSpec, slip: f64) -> f64 {
    if rpm == 0.0 {
        return 0.0;
    }
    let cir = static_circumference_ft(spec.tire_diameter_in);
    let ds = fdiv(fdiv(rpm, gear_ratio_at(spec, gear_idx)), spec.final_drive);
    let wheel_rpm = fdiv(ds, 1.0 + slip);
    fdiv(fmul(wheel_rpm, cir), 60.0)
}

/// Tractive force (lbf) at the contact patch from engine torque through
/// the gear, final drive, and efficiency chain. Zero torque yields
/// exactly zero.
pub fn wheel_force(torque_lbft: f64, gear_idx: usize, spec: &VehicleSpec) -> f64 {
    if torque_lbft == 0.0 {
        return 0.0;
    }
    let radius_ft = spec.tire_diameter_in / 24.0;
    torque_lbft
        * gear_ratio_at(spec, gear_idx)
        * spec.final_drive
        * gear_efficiency_at(spec, gear_idx)
        * spec.overall_efficiency
        / radius_ft
}
