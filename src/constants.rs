//! Numeric constants carried over from the legacy reference program.
//!
//! Values are kept at the legacy program's precision on purpose; "fixing"
//! them (e.g. replacing PI with the full-precision constant) breaks
//! bit-exact parity.

/// Legacy PI (declared to six decimal places in the reference).
pub const PI: f64 = 3.141593;

/// Gravitational constant, lbm·ft/(lbf·s²).
pub const GC: f64 = 32.174;

/// Hours-per-mile to seconds-per-foot: 3600 / 5280.
pub const Z5: f64 = 3600.0 / 5280.0;

/// HP-to-torque conversion: (60 / 2π) · 550 ≈ 5252.
pub const Z6: f64 = (60.0 / (2.0 * PI)) * 550.0;

/// One horsepower in ft·lbf/s.
pub const HP_TO_FTLBPS: f64 = 550.0;

/// Fahrenheit to Rankine offset.
pub const RANKINE_OFFSET: f64 = 459.67;

// Standard atmosphere, imperial.

/// Standard temperature (°R).
pub const TSTD: f64 = 519.67;
/// Standard pressure (psi).
pub const PSTD: f64 = 14.696;
/// Standard barometer (inHg).
pub const BSTD: f64 = 29.92;
/// Molecular weight of dry air.
pub const WTAIR: f64 = 28.9669;
/// Molecular weight of water.
pub const WTH2O: f64 = 18.016;
/// Universal gas constant, ft·lbf/(lbmol·°R).
pub const RSTD: f64 = 1545.32;

/// Temperature lapse rate used for the elevation pressure correction.
pub const LAPSE_RATE: f64 = 0.00356616;
/// Exponent in the barometric elevation correction.
pub const LAPSE_EXP: f64 = 5.25588;

/// Saturation vapor pressure polynomial coefficients (psi vs °F).
pub const CPS: [f64; 6] = [
    0.0205558,
    0.00118163,
    0.0000154988,
    0.00000040245,
    0.000000000434856,
    0.00000000002096,
];

// Integrator tuning constants.

/// Rolling resistance coefficient at the starting line.
pub const CMU: f64 = 0.025;
/// Rolling resistance reduction over the full quarter mile.
pub const CMUK: f64 = 0.01;
/// Minimum acceleration floor (g).
pub const AMIN: f64 = 0.004;
/// Jerk lower limit (g/s).
pub const JMIN: f64 = -4.0;
/// Jerk upper limit (g/s).
pub const JMAX: f64 = 2.0;
/// Relaxation-factor lower bound in the convergence loop.
pub const K6: f64 = 0.92;
/// Relaxation-factor upper bound in the convergence loop.
pub const K61: f64 = 1.08;
/// Engine PMI deceleration scale, clutch transmissions.
pub const KP21: f64 = 0.15;
/// Engine PMI deceleration scale, converter transmissions.
pub const KP22: f64 = 0.25;
/// Driveline friction factor in the weight-transfer moment arm.
pub const FRCT: f64 = 1.03;
/// Traction coefficient multiplier.
pub const AX: f64 = 10.8;

/// Inner convergence-loop iteration budget per step.
pub const CONVERGENCE_BUDGET: usize = 12;
/// Convergence criterion: relative step-time change, percent.
pub const CONVERGENCE_TOL_PCT: f64 = 0.01;

/// Zero-drive-torque dwell window for a clutch shift (s).
pub const CLUTCH_DWELL_S: f64 = 0.2;
/// Zero-drive-torque dwell window for a converter shift (s).
pub const CONVERTER_DWELL_S: f64 = 0.25;

/// Distance milestones for timeslip reporting (ft).
pub const TIMESLIP_MARKS_FT: [f64; 5] = [60.0, 330.0, 660.0, 1000.0, 1320.0];

/// Quarter-mile length (ft).
pub const QUARTER_FT: f64 = 1320.0;
/// Eighth-mile length (ft).
pub const EIGHTH_FT: f64 = 660.0;
