//! Rollout geometry: physical distance vs the timing system's view.
//!
//! The ET clock starts only once the car has rolled the staging-beam
//! rollout distance. Physical distance below the rollout offset maps to
//! zero timed distance; beyond it, timed distance trails physical
//! distance by exactly the offset. Deep staging moves the car forward in
//! the beams and shrinks the effective rollout, never below zero.

/// Effective rollout (in) after deep staging.
pub fn effective_rollout_in(rollout_in: f64, deep_stage_in: f64) -> f64 {
    (rollout_in - deep_stage_in).max(0.0)
}

/// Timed distance (ft) for a physical distance and a rollout in inches.
pub fn timed_distance_ft(physical_ft: f64, rollout_in: f64) -> f64 {
    (physical_ft - rollout_in / 12.0).max(0.0)
}

/// True once the car has cleared the rollout offset.
pub fn rollout_complete(physical_ft: f64, rollout_in: f64) -> bool {
    physical_ft >= rollout_in / 12.0
}

/// Time "lost" in the beams: the clock offset between launch and the ET
/// clock start, given the time at which the rollout distance was cleared.
pub fn rollout_time_offset_s(time_at_rollout_s: f64) -> f64 {
    time_at_rollout_s.max(0.0)
}
