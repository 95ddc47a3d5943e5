//! Error taxonomy for the simulation core.

use thiserror::Error;

use crate::trace::TraceRow;

/// Typed errors surfaced by validation, the integrator, and the parity
/// tooling. Convergence-budget exhaustion is deliberately NOT an error;
/// it is recorded as a warning on the run result.
#[derive(Debug, Error)]
pub enum SimError {
    /// Input failed validation. The list is exhaustive so a caller can
    /// present a complete checklist, not just the first problem.
    #[error("invalid input: {}", missing.join("; "))]
    Validation { missing: Vec<String> },

    /// A tick produced a non-finite velocity, distance, or RPM. The last
    /// valid trace row is attached for forensics.
    #[error("non-finite state at step {step}: {quantity}")]
    NonFinite {
        step: usize,
        quantity: &'static str,
        last_good: Box<TraceRow>,
    },

    #[error("fixture error: {0}")]
    Fixture(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
