//! Gear-shift state machine.
//!
//! Shifts are a two-phase affair: the trigger is latched one tick before
//! the gear index actually changes, so the current step completes on the
//! old gear. The cycle is NORMAL → TRIGGERED → EXECUTING → NORMAL with
//! exactly one gear increment per cycle.

/// Shift phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShiftState {
    #[default]
    Normal,
    Triggered,
    Executing,
}

/// Whether the shift trigger condition is met for the current gear.
///
/// The tolerance band is 10 RPM, widened to 20 RPM when the first gear's
/// threshold is above 8000 RPM (high-RPM combinations cross the band in
/// fewer steps). In strict mode the trigger is a plain `rpm >= threshold`
/// comparison instead of the band.
///
/// Never triggers from the top gear and never without a positive
/// threshold for the current gear.
pub fn should_shift(
    gear_idx: usize,
    n_gears: usize,
    eng_rpm: f64,
    shift_rpm: &[f64],
    strict: bool,
) -> bool {
    if gear_idx + 1 >= n_gears {
        return false;
    }
    let threshold = match shift_rpm.get(gear_idx) {
        Some(&t) if t > 0.0 => t,
        _ => return false,
    };
    if strict {
        return eng_rpm >= threshold;
    }
    let first = shift_rpm.first().copied().unwrap_or(0.0);
    let tol = if first > 8000.0 { 20.0 } else { 10.0 };
    (threshold - eng_rpm).abs() < tol
}

/// Outcome of advancing the machine one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftAdvance {
    pub state: ShiftState,
    /// True exactly once per cycle: increment the gear now.
    pub execute: bool,
}

/// Advance the machine given this tick's trigger condition.
pub fn advance(state: ShiftState, trigger: bool) -> ShiftAdvance {
    match state {
        ShiftState::Normal => ShiftAdvance {
            state: if trigger {
                ShiftState::Triggered
            } else {
                ShiftState::Normal
            },
            execute: false,
        },
        ShiftState::Triggered => ShiftAdvance {
            state: ShiftState::Executing,
            execute: true,
        },
        ShiftState::Executing => ShiftAdvance {
            state: ShiftState::Normal,
            execute: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHIFTS: [f64; 4] = [9400.0, 9400.0, 9400.0, 9400.0];

    #[test]
    fn full_cycle_increments_once() {
        let s0 = ShiftState::Normal;
        let a1 = advance(s0, true);
        assert_eq!(a1.state, ShiftState::Triggered);
        assert!(!a1.execute);

        let a2 = advance(a1.state, false);
        assert_eq!(a2.state, ShiftState::Executing);
        assert!(a2.execute);

        let a3 = advance(a2.state, false);
        assert_eq!(a3.state, ShiftState::Normal);
        assert!(!a3.execute);
    }

    #[test]
    fn no_trigger_stays_normal() {
        let a = advance(ShiftState::Normal, false);
        assert_eq!(a.state, ShiftState::Normal);
        assert!(!a.execute);
    }

    #[test]
    fn never_shifts_from_top_gear() {
        assert!(!should_shift(4, 5, 12000.0, &SHIFTS, true));
        assert!(!should_shift(4, 5, 9400.0, &SHIFTS, false));
    }

    #[test]
    fn requires_positive_threshold() {
        let zeroed = [0.0, 9400.0];
        assert!(!should_shift(0, 3, 9400.0, &zeroed, true));
        assert!(!should_shift(0, 3, 9400.0, &[], true));
    }

    #[test]
    fn strict_mode_uses_at_or_above() {
        assert!(should_shift(0, 5, 9400.0, &SHIFTS, true));
        assert!(should_shift(0, 5, 9700.0, &SHIFTS, true));
        assert!(!should_shift(0, 5, 9399.0, &SHIFTS, true));
    }

    #[test]
    fn tolerant_mode_uses_band() {
        // first threshold 9400 > 8000 → band widens to 20
        assert!(should_shift(0, 5, 9385.0, &SHIFTS, false));
        assert!(!should_shift(0, 5, 9375.0, &SHIFTS, false));

        let low = [7800.0, 7800.0];
        assert!(should_shift(0, 3, 7795.0, &low, false));
        assert!(!should_shift(0, 3, 7785.0, &low, false));
    }
}
