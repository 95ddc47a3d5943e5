//! # QuarterSim
//!
//! Drag racing simulation engine reproducing a legacy single-precision
//! timeslip model, with a fixture-driven parity harness and step-trace
//! diffing for regression forensics.

// Re-export the main types and functions
pub use engine::{PowerCurve, ThrottleStop};
pub use error::{Result, SimError};
pub use input::{EnvironmentSpec, PmiSpec, RaceLength, VehicleSpec};
pub use parity::{
    evaluate, format_summary, run_parity, ParityEvaluation, ParityResult, ParityTolerance,
    RawFixture, BUILTIN_FIXTURES,
};
pub use solver::{
    simulate, EnergyBreakdown, RunResult, SimOptions, Termination, TimeslipCheckpoint,
};
pub use trace::{first_diff, parse_csv, to_csv, Trace, TraceDiff, TraceRow};

// Module declarations
pub mod air;
pub mod clutch;
pub mod constants;
pub mod coupling;
pub mod drivetrain;
pub mod engine;
mod error;
pub mod f32math;
pub mod input;
pub mod launch;
pub mod parity;
pub mod shift;
pub mod solver;
pub mod trace;
pub mod traction;
