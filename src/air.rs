//! Environmental model: air density and horsepower correction.
//!
//! The density calculation follows the legacy weather routine: a 6th-order
//! saturation-vapor-pressure polynomial in °F, relative humidity to vapor
//! pressure, barometer plus a lapse-rate elevation correction to ambient
//! pressure, a moist-air gas constant, and the ideal gas law. The native
//! density unit is lbm/ft³ (the drag equations divide by gc downstream);
//! a slug/ft³ view is provided for conventional checks.
//!
//! The horsepower correction factor extends the density model with
//! fuel-system-dependent pressure/temperature exponents and a water-vapor
//! thermal-efficiency estimate.

use serde::{Deserialize, Serialize};

use crate::constants::{
    BSTD, CPS, GC, LAPSE_EXP, LAPSE_RATE, PSTD, RANKINE_OFFSET, RSTD, TSTD, WTAIR, WTH2O,
};

/// Ambient conditions as reported at the track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AirConditions {
    pub elevation_ft: f64,
    pub barometer_in_hg: f64,
    pub temperature_f: f64,
    pub humidity_pct: f64,
}

/// Derived air state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AirSample {
    /// Air density in lbm/ft³ (native legacy unit).
    pub density_lbm_ft3: f64,
    /// Air density in slug/ft³ (density_lbm_ft3 / gc).
    pub density_slug_ft3: f64,
    /// Ambient pressure (psi), after elevation correction.
    pub ambient_psi: f64,
    /// Water vapor partial pressure (psi).
    pub vapor_psi: f64,
    /// Dry-air partial pressure (psi).
    pub dry_air_psi: f64,
    /// Water-to-air mass ratio.
    pub water_air_ratio: f64,
    /// Gas constant for the moist mixture, ft·lbf/(lbm·°R).
    pub gas_constant: f64,
    /// Absolute temperature (°R).
    pub temp_rankine: f64,
}

/// Saturation vapor pressure (psi) at a dry-bulb temperature in °F.
fn saturation_vapor_psi(temp_f: f64) -> f64 {
    CPS[0]
        + CPS[1] * temp_f
        + CPS[2] * temp_f.powi(2)
        + CPS[3] * temp_f.powi(3)
        + CPS[4] * temp_f.powi(4)
        + CPS[5] * temp_f.powi(5)
}

/// Compute the air state from ambient conditions.
///
/// Humidity is clamped to [0, 100]; the domain is otherwise unrestricted.
pub fn air_density(air: &AirConditions) -> AirSample {
    let humidity = air.humidity_pct.clamp(0.0, 100.0);

    let psdry = saturation_vapor_psi(air.temperature_f);
    let pwv = (humidity / 100.0) * psdry;

    // Barometer to psi with lapse-rate elevation correction
    let pamb = (PSTD * air.barometer_in_hg / BSTD)
        * ((TSTD - LAPSE_RATE * air.elevation_ft) / TSTD).powf(LAPSE_EXP);

    let pair = pamb - pwv;
    let war = (pwv * WTH2O) / (pair * WTAIR);
    let rgas = RSTD * ((1.0 / WTAIR) + (war / WTH2O)) / (1.0 + war);

    let temp_r = air.temperature_f + RANKINE_OFFSET;
    // 144 converts psi to lb/ft²
    let rho_lbm = 144.0 * pamb / (rgas * temp_r);

    AirSample {
        density_lbm_ft3: rho_lbm,
        density_slug_ft3: rho_lbm / GC,
        ambient_psi: pamb,
        vapor_psi: pwv,
        dry_air_psi: pair,
        water_air_ratio: war,
        gas_constant: rgas,
        temp_rankine: temp_r,
    }
}

/// Fuel-system classification. The correction exponents differ per fuel
/// and per induction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FuelSystem {
    GasolineCarburetor,
    GasolineInjector,
    MethanolCarburetor,
    MethanolInjector,
    NitromethaneInjector,
    SuperchargedGasoline,
    SuperchargedMethanol,
    SuperchargedNitro,
}

impl FuelSystem {
    /// Parse the label spelling used by fixture files.
    pub fn from_label(label: &str) -> Option<Self> {
        let l = label.trim().to_ascii_uppercase();
        let sys = match l.as_str() {
            "GASOLINE CARBURETOR" | "GAS+CARB" => Self::GasolineCarburetor,
            "GASOLINE INJECTOR" | "GAS+INJECT" => Self::GasolineInjector,
            "METHANOL CARBURETOR" | "METHANOL+CARB" => Self::MethanolCarburetor,
            "METHANOL INJECTOR" | "METHANOL+INJECT" => Self::MethanolInjector,
            "NITROMETHANE INJECTOR" | "NITRO+INJECT" => Self::NitromethaneInjector,
            "SUPERCHARGED GASOLINE" | "GAS+SUPERCHARGED" => Self::SuperchargedGasoline,
            "SUPERCHARGED METHANOL" | "METHANOL+SUPERCHARGED" => Self::SuperchargedMethanol,
            "SUPERCHARGED NITRO" | "NITRO+SUPERCHARGED" => Self::SuperchargedNitro,
            _ => return None,
        };
        Some(sys)
    }

    /// Canonical label, matching the fixture spelling.
    pub fn label(&self) -> &'static str {
        match self {
            Self::GasolineCarburetor => "Gasoline Carburetor",
            Self::GasolineInjector => "Gasoline Injector",
            Self::MethanolCarburetor => "Methanol Carburetor",
            Self::MethanolInjector => "Methanol Injector",
            Self::NitromethaneInjector => "Nitromethane Injector",
            Self::SuperchargedGasoline => "Supercharged Gasoline",
            Self::SuperchargedMethanol => "Supercharged Methanol",
            Self::SuperchargedNitro => "Supercharged Nitro",
        }
    }

    fn is_supercharged(&self) -> bool {
        matches!(
            self,
            Self::SuperchargedGasoline | Self::SuperchargedMethanol | Self::SuperchargedNitro
        )
    }

    fn is_injected(&self) -> bool {
        matches!(
            self,
            Self::GasolineInjector | Self::MethanolInjector | Self::NitromethaneInjector
        )
    }

    /// (pressure exponent, temperature exponent, mechanical loss fraction)
    fn correction_params(&self) -> (f64, f64, f64) {
        let (mut p_exp, mut t_exp, mut mech_loss) = match self {
            Self::GasolineCarburetor | Self::GasolineInjector | Self::SuperchargedGasoline => {
                (1.0, 0.6, 0.15)
            }
            Self::MethanolCarburetor | Self::MethanolInjector | Self::SuperchargedMethanol => {
                (1.0, 0.3, 0.13)
            }
            Self::NitromethaneInjector | Self::SuperchargedNitro => (0.85, 0.5, 0.055),
        };
        if self.is_injected() {
            mech_loss -= 0.005;
        }
        if self.is_supercharged() {
            p_exp = 0.95;
            let dtx = ((1.35 - 1.0) / 1.35) / 0.85;
            p_exp -= dtx * t_exp;
            t_exp += dtx;
            mech_loss *= 0.6;
        }
        (p_exp, t_exp, mech_loss)
    }
}

/// Weather correction outputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeatherReport {
    /// Density altitude (ft), rounded to the foot.
    pub density_altitude_ft: f64,
    /// Divisor applied to the dyno power curve.
    pub hp_correction: f64,
    /// Air density index as a percentage of standard.
    pub density_index: f64,
    /// Pressure ratio (delta).
    pub pressure_ratio: f64,
    /// Temperature ratio (theta).
    pub temperature_ratio: f64,
}

/// Compute density altitude and the horsepower correction factor for a
/// fuel system at the given conditions.
pub fn hp_correction(air: &AirConditions, fuel: FuelSystem) -> WeatherReport {
    let sample = air_density(air);

    let delta = sample.dry_air_psi / PSTD;
    let theta = (air.temperature_f + RANKINE_OFFSET) / TSTD;
    let war = sample.water_air_ratio;

    let rgrs = sample.gas_constant / (RSTD / WTAIR);
    let adi = 100.0 * delta / theta;
    let dens_alt = (TSTD - TSTD * (adi / 100.0).powf(1.0 / (LAPSE_EXP - 1.0))) / LAPSE_RATE;

    let (p_exp, t_exp, mech_loss) = fuel.correction_params();

    // Thermal efficiency loss from water vapor
    let k_war = 1.0 + 2.48 * war.powf(1.5);

    let mut hp_cor = delta.powf(p_exp) / (rgrs.sqrt() * theta.powf(t_exp));
    hp_cor = (1.0 + mech_loss) * k_war / hp_cor - mech_loss;

    WeatherReport {
        density_altitude_ft: dens_alt.round(),
        hp_correction: hp_cor,
        density_index: adi,
        pressure_ratio: delta,
        temperature_ratio: theta,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn std_day() -> AirConditions {
        AirConditions {
            elevation_ft: 0.0,
            barometer_in_hg: 29.92,
            temperature_f: 59.0,
            humidity_pct: 0.0,
        }
    }

    #[test]
    fn standard_day_density() {
        let s = air_density(&std_day());
        assert!((s.density_slug_ft3 - 0.002378).abs() < 2e-5);
        assert!((s.density_lbm_ft3 - 0.0765).abs() < 6e-4);
        assert_eq!(s.vapor_psi, 0.0);
    }

    #[test]
    fn hot_humid_day_is_thinner() {
        let hot = air_density(&AirConditions {
            temperature_f: 95.0,
            humidity_pct: 80.0,
            ..std_day()
        });
        let std = air_density(&std_day());
        assert!(hot.density_lbm_ft3 < std.density_lbm_ft3);
        assert!(hot.vapor_psi > 0.3);
    }

    #[test]
    fn partial_pressures_sum_to_ambient() {
        let s = air_density(&AirConditions {
            temperature_f: 75.0,
            humidity_pct: 55.0,
            ..std_day()
        });
        assert!((s.dry_air_psi + s.vapor_psi - s.ambient_psi).abs() < 1e-12);
    }

    #[test]
    fn elevation_lowers_pressure() {
        let high = air_density(&AirConditions {
            elevation_ft: 5000.0,
            ..std_day()
        });
        let sea = air_density(&std_day());
        assert!(high.ambient_psi < sea.ambient_psi);
        assert!(high.density_lbm_ft3 < sea.density_lbm_ft3);
    }

    #[test]
    fn humidity_clamped() {
        let over = air_density(&AirConditions {
            humidity_pct: 140.0,
            ..std_day()
        });
        let full = air_density(&AirConditions {
            humidity_pct: 100.0,
            ..std_day()
        });
        assert_eq!(over, full);
    }

    #[test]
    fn hp_correction_near_unity_on_standard_day() {
        let report = hp_correction(&std_day(), FuelSystem::GasolineCarburetor);
        assert!((report.hp_correction - 1.0).abs() < 0.02);
        assert!(report.density_altitude_ft.abs() < 100.0);
    }

    #[test]
    fn worse_air_raises_correction() {
        let bad = hp_correction(
            &AirConditions {
                temperature_f: 100.0,
                humidity_pct: 90.0,
                elevation_ft: 2000.0,
                ..std_day()
            },
            FuelSystem::GasolineCarburetor,
        );
        let good = hp_correction(&std_day(), FuelSystem::GasolineCarburetor);
        assert!(bad.hp_correction > good.hp_correction);
    }

    #[test]
    fn fuel_labels_round_trip() {
        for sys in [
            FuelSystem::GasolineCarburetor,
            FuelSystem::MethanolInjector,
            FuelSystem::SuperchargedNitro,
        ] {
            assert_eq!(FuelSystem::from_label(sys.label()), Some(sys));
        }
        assert_eq!(FuelSystem::from_label("diesel"), None);
    }
}
