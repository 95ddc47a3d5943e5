//! Centrifugal clutch plate-force model.
//!
//! A slider clutch carries static spring preload plus centrifugal force
//! from weighted arms. Each arm group contributes a coefficient `cf` such
//! that its plate force is `cf · (rpm / primary_drive)²` less any return
//! spring preload; total plate force is the static force plus the group
//! contributions (each floored at zero). The arm pivot angle depends on
//! ring height, arm depth, and air gap, and is found with the legacy HUNT
//! bracketing iteration. Friction torque capacity follows from disk
//! geometry under a constant-pressure assumption, and the lockup RPM is
//! where capacity first exceeds corrected engine torque in a gear.

use serde::{Deserialize, Serialize};

use crate::constants::{GC, PI};

/// Degrees to radians at legacy PI precision.
const PI180: f64 = PI / 180.0;

/// Unit constant folding grams, inches, and RPM² into lbf:
/// (60/π)² · 6 · 453.6 · gc.
const CF_UNITS: f64 = {
    let a = 60.0 / PI;
    a * a * 6.0 * 453.6 * GC
};

/// Arm geometry reference data for one arm design.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArmGeometry {
    /// Arm weight in grams; negative marks the fixed-pivot option.
    pub arm_weight_g: f64,
    /// Fixed diameter (plate or pivot depending on the pivot option), in.
    pub plate_diameter_in: f64,
    /// Radius from plate to pivot, in.
    pub pivot_radius_in: f64,
    /// Radius from plate to counterweight, in.
    pub weight_radius_in: f64,
    /// Radius from plate to arm center of gravity, in.
    pub arm_cg_radius_in: f64,
    /// Reference ring height for the pivot angle, in.
    pub ref_ring_height_in: f64,
    /// Reference arm depth for the pivot angle, in.
    pub ref_arm_depth_in: f64,
    /// Arm-depth checking diameter; zero disables the depth iteration.
    pub arm_depth_diameter_in: f64,
    /// Orientation angle from plate to pivot, degrees.
    pub ref_angle_deg: f64,
    /// Delta angle from pivot to counterweight, degrees.
    pub weight_angle_deg: f64,
    /// Delta angle from pivot to arm cg, degrees.
    pub arm_cg_angle_deg: f64,
}

/// One installed group of identical arms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArmGroup {
    pub geometry: ArmGeometry,
    pub num_arms: u32,
    /// Counterweight per arm, grams.
    pub counterweight_g: f64,
    /// Installed ring height, in.
    pub ring_height_in: f64,
    /// Installed arm depth, in.
    pub arm_depth_in: f64,
}

/// Friction disk stack.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiskSpec {
    pub num_disks: u32,
    pub outer_diameter_in: f64,
    pub inner_diameter_in: f64,
    /// Effective contact area, percent (80–100).
    pub effective_area_pct: f64,
    /// Friction coefficient of the lining (0.15–0.75).
    pub friction_mu: f64,
}

/// Complete centrifugal clutch description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentrifugalClutch {
    /// Static spring plate force, lbf.
    pub static_force_lbf: f64,
    pub arms: Vec<ArmGroup>,
    pub disk: DiskSpec,
    /// Primary drive ratio between crank and clutch (1 for direct).
    pub primary_drive: f64,
}

/// A group's contribution reduced to a coefficient and a return preload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CentrifugalCoeff {
    pub cf: f64,
    pub return_lbf: f64,
}

/// Legacy HUNT root finder: brackets the root from the error sign and
/// interpolates between the bracket edges, falling back to bisection
/// when the errors coincide.
pub fn hunt<F: Fn(f64) -> f64>(
    initial: f64,
    error_fn: F,
    tolerance: f64,
    max_iterations: usize,
) -> (f64, bool) {
    let mut x = initial;
    let mut xj1 = 0.0;
    let mut xj2 = -2.0;
    let mut xj3 = xj1;
    let mut xj4 = -xj2;

    for _ in 0..max_iterations {
        let er = error_fn(x);
        if er.abs() < tolerance {
            return (x, true);
        }
        if er > 0.0 {
            xj1 = x;
            xj3 = er;
        } else {
            xj2 = x;
            xj4 = er;
        }
        if xj3 != xj4 {
            x = xj1 - xj3 * (xj2 - xj1) / (xj4 - xj3);
        } else {
            x = (xj1 + xj2) / 2.0;
        }
    }
    (x, false)
}

/// Compute a group's centrifugal coefficient at a given air gap.
///
/// The pivot angle is iterated when the installed ring height or arm
/// depth deviates from the reference geometry or an air gap is present.
pub fn centrifugal_coeff(group: &ArmGroup, air_gap_in: f64) -> CentrifugalCoeff {
    let arm = &group.geometry;
    let n_arm = group.num_arms as f64;
    if n_arm <= 0.0 {
        return CentrifugalCoeff {
            cf: 0.0,
            return_lbf: 0.0,
        };
    }

    let mut angle = arm.ref_angle_deg;
    let drnht = arm.ref_ring_height_in - group.ring_height_in;
    let has_arm_depth = arm.arm_depth_diameter_in > 0.0;

    if has_arm_depth || drnht != 0.0 || air_gap_in != 0.0 {
        let adpth = group.arm_depth_in;
        let err = |test_angle: f64| -> f64 {
            let rad = test_angle * PI180;
            let cos_a = rad.cos();
            if has_arm_depth {
                let mut d_plate = arm.plate_diameter_in;
                if arm.arm_weight_g < 0.0 {
                    d_plate += 2.0 * arm.pivot_radius_in * cos_a;
                }
                let length = (d_plate - arm.arm_depth_diameter_in) / 2.0;
                let alr = length / (arm.pivot_radius_in * cos_a);
                let ead = arm.ref_arm_depth_in + (alr - 1.0) * drnht;
                let height =
                    length * rad.tan() + (ead - adpth) - alr * (drnht + air_gap_in);
                length * rad.tan() - height
            } else {
                let height = arm.pivot_radius_in * rad.sin() - (drnht + air_gap_in);
                arm.pivot_radius_in * rad.sin() - height
            }
        };
        let (found, converged) = hunt(angle, err, 0.0005, 15);
        if converged {
            angle = found;
        }
    }

    let rad = angle * PI180;
    let cos_a = rad.cos();
    let denom = arm.pivot_radius_in * cos_a;

    let mut d_plate = arm.plate_diameter_in;
    if arm.arm_weight_g < 0.0 {
        d_plate += 2.0 * denom;
    }

    // Counterweight contribution
    let w_rad = (angle + arm.weight_angle_deg) * PI180;
    let dcw = d_plate - 2.0 * arm.weight_radius_in * w_rad.cos();
    let alr = (arm.weight_radius_in * w_rad.sin()) / denom;
    let mut cf = n_arm * group.counterweight_g * dcw * alr;

    // Arm cg contribution
    let cg_rad = (angle + arm.arm_cg_angle_deg) * PI180;
    let dcg = d_plate - 2.0 * arm.arm_cg_radius_in * cg_rad.cos();
    let cglr = (arm.arm_cg_radius_in * cg_rad.sin()) / denom;
    cf += n_arm * arm.arm_weight_g.abs() * dcg * cglr;

    CentrifugalCoeff {
        cf: cf / CF_UNITS,
        return_lbf: 0.0,
    }
}

impl CentrifugalClutch {
    fn coeffs(&self) -> Vec<CentrifugalCoeff> {
        self.arms
            .iter()
            .map(|g| centrifugal_coeff(g, 0.0))
            .collect()
    }

    /// Total plate force at an engine RPM: static preload plus each
    /// group's centrifugal force less its return preload, floored at
    /// zero per group.
    pub fn plate_force_at(&self, rpm: f64) -> f64 {
        let rev = rpm / self.primary_drive;
        let mut total = self.static_force_lbf;
        for c in self.coeffs() {
            let lbs = c.cf * rev * rev - c.return_lbf;
            if lbs > 0.0 {
                total += lbs;
            }
        }
        total
    }

    /// Total friction surface area, in².
    pub fn friction_area_in2(&self) -> f64 {
        2.0 * self.disk.num_disks as f64
            * (self.disk.effective_area_pct / 100.0)
            * PI
            * (self.disk.outer_diameter_in.powi(2) - self.disk.inner_diameter_in.powi(2))
            / 4.0
    }

    /// Torque-per-pound-of-plate-force constant, ft: constant-pressure
    /// mean radius times surface count times friction coefficient.
    pub fn torque_constant(&self) -> f64 {
        let geom = (self.disk.outer_diameter_in.powi(3) - self.disk.inner_diameter_in.powi(3))
            / (3.0 * (self.disk.outer_diameter_in.powi(2) - self.disk.inner_diameter_in.powi(2)))
            / 12.0;
        2.0 * self.disk.num_disks as f64
            * self.disk.friction_mu
            * geom
            * (self.disk.effective_area_pct / 100.0).powf(0.2)
    }

    /// Friction torque capacity (lb·ft) at an engine RPM.
    pub fn torque_capacity_at(&self, rpm: f64) -> f64 {
        self.torque_constant() * self.plate_force_at(rpm)
    }

    /// Lining pressure (psi) at an engine RPM.
    pub fn friction_psi_at(&self, rpm: f64) -> f64 {
        self.plate_force_at(rpm) / self.friction_area_in2()
    }

    /// RPM at which plate force first reaches `required_lbf`. Plate force
    /// is monotone in RPM, so the quadratic inverts directly; returns
    /// zero when the static force alone suffices, None when no arm group
    /// contributes.
    pub fn lockup_rpm(&self, required_lbf: f64) -> Option<f64> {
        if required_lbf <= self.static_force_lbf {
            return Some(0.0);
        }
        // Return preloads shift each group's engagement point; solve on
        // the combined curve by bracketing then refining with HUNT.
        let total_cf: f64 = self.coeffs().iter().map(|c| c.cf).sum();
        if total_cf <= 0.0 {
            return None;
        }
        let guess = self.primary_drive * ((required_lbf - self.static_force_lbf) / total_cf).sqrt();
        let err = |rpm: f64| self.plate_force_at(rpm) - required_lbf;
        let (rpm, converged) = hunt(guess, err, 0.05, 15);
        if converged && rpm.is_finite() && rpm >= 0.0 {
            Some(rpm)
        } else {
            Some(guess)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_clutch() -> CentrifugalClutch {
        CentrifugalClutch {
            static_force_lbf: 600.0,
            arms: vec![ArmGroup {
                geometry: ArmGeometry {
                    arm_weight_g: 48.0,
                    plate_diameter_in: 10.5,
                    pivot_radius_in: 1.25,
                    weight_radius_in: 2.0,
                    arm_cg_radius_in: 1.4,
                    ref_ring_height_in: 0.2,
                    ref_arm_depth_in: 0.0,
                    arm_depth_diameter_in: 0.0,
                    ref_angle_deg: 12.0,
                    weight_angle_deg: 8.0,
                    arm_cg_angle_deg: 4.0,
                },
                num_arms: 6,
                counterweight_g: 38.0,
                ring_height_in: 0.2,
                arm_depth_in: 0.0,
            }],
            disk: DiskSpec {
                num_disks: 2,
                outer_diameter_in: 10.5,
                inner_diameter_in: 6.25,
                effective_area_pct: 90.0,
                friction_mu: 0.3,
            },
            primary_drive: 1.0,
        }
    }

    #[test]
    fn hunt_finds_simple_root() {
        // decreasing error, positive at the guess: the bracket closes
        let (x, converged) = hunt(0.5, |x| 2.0 - x, 1e-6, 15);
        assert!(converged);
        assert!((x - 2.0).abs() < 1e-6);
    }

    #[test]
    fn hunt_reports_budget_exhaustion() {
        let (_, converged) = hunt(0.5, |x| 2.0 - x, 1e-12, 1);
        assert!(!converged);
    }

    #[test]
    fn plate_force_grows_quadratically() {
        let c = test_clutch();
        let f0 = c.plate_force_at(0.0);
        let f4 = c.plate_force_at(4000.0);
        let f8 = c.plate_force_at(8000.0);
        assert_eq!(f0, 600.0);
        assert!(f4 > f0);
        // centrifugal part scales with rpm²
        assert!(((f8 - f0) / (f4 - f0) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn torque_capacity_tracks_plate_force() {
        let c = test_clutch();
        let k = c.torque_constant();
        assert!(k > 0.0);
        assert!((c.torque_capacity_at(5000.0) - k * c.plate_force_at(5000.0)).abs() < 1e-9);
    }

    #[test]
    fn lockup_rpm_inverts_plate_force() {
        let c = test_clutch();
        let target = c.plate_force_at(7000.0);
        let rpm = c.lockup_rpm(target).unwrap();
        assert!((rpm - 7000.0).abs() < 50.0);
        // static force alone already covers small requirements
        assert_eq!(c.lockup_rpm(100.0), Some(0.0));
    }

    #[test]
    fn no_arms_means_no_lockup_growth() {
        let mut c = test_clutch();
        c.arms.clear();
        assert_eq!(c.plate_force_at(9000.0), 600.0);
        assert_eq!(c.lockup_rpm(1000.0), None);
    }

    #[test]
    fn friction_area_scales_with_disks() {
        let mut c = test_clutch();
        let a2 = c.friction_area_in2();
        c.disk.num_disks = 4;
        assert!((c.friction_area_in2() - 2.0 * a2).abs() < 1e-9);
    }

    #[test]
    fn counterweight_raises_coefficient() {
        let c = test_clutch();
        let base = centrifugal_coeff(&c.arms[0], 0.0);
        let mut heavier = c.arms[0];
        heavier.counterweight_g += 5.0;
        let moved = centrifugal_coeff(&heavier, 0.0);
        assert!(base.cf > 0.0);
        assert!(moved.cf > base.cf);
    }
}
