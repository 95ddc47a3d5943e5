//! Single-precision arithmetic contract.
//!
//! The legacy reference program ran on a 32-bit float ("Single") numeric
//! environment. Host arithmetic here is f64, so every primitive on the
//! strict simulation path narrows each operand to f32, performs the
//! operation, and narrows the result again. Chained operations therefore
//! accumulate rounding error exactly as the original did.
//!
//! These are pure functions over `f64`, not a newtype: callers stay in
//! plain `f64` and opt in per operation. NaN and infinity pass through
//! unchanged; non-finite state is caught by the integrator.

/// Narrow a value to f32 precision and widen it back.
#[inline(always)]
pub fn fw(x: f64) -> f64 {
    x as f32 as f64
}

/// Single-precision addition.
#[inline(always)]
pub fn fadd(a: f64, b: f64) -> f64 {
    fw(fw(a) + fw(b))
}

/// Single-precision subtraction.
#[inline(always)]
pub fn fsub(a: f64, b: f64) -> f64 {
    fw(fw(a) - fw(b))
}

/// Single-precision multiplication.
#[inline(always)]
pub fn fmul(a: f64, b: f64) -> f64 {
    fw(fw(a) * fw(b))
}

/// Single-precision division.
#[inline(always)]
pub fn fdiv(a: f64, b: f64) -> f64 {
    fw(fw(a) / fw(b))
}

/// Single-precision square root.
#[inline(always)]
pub fn fsqrt(x: f64) -> f64 {
    fw(fw(x).sqrt())
}

/// Single-precision power.
#[inline(always)]
pub fn fpow(x: f64, y: f64) -> f64 {
    fw(fw(x).powf(fw(y)))
}

/// Single-precision exponential.
#[inline(always)]
pub fn fexp(x: f64) -> f64 {
    fw(fw(x).exp())
}

/// Single-precision natural log.
#[inline(always)]
pub fn fln(x: f64) -> f64 {
    fw(fw(x).ln())
}

/// Single-precision absolute value.
#[inline(always)]
pub fn fabs(x: f64) -> f64 {
    fw(fw(x).abs())
}

/// Single-precision negation.
#[inline(always)]
pub fn fneg(x: f64) -> f64 {
    fw(-fw(x))
}

/// Single-precision clamp. NaN operands fall through the comparisons
/// and return the (narrowed) input unchanged.
#[inline(always)]
pub fn fclamp(x: f64, lo: f64, hi: f64) -> f64 {
    let x = fw(x);
    let lo = fw(lo);
    let hi = fw(hi);
    let y = if x < lo { lo } else { x };
    let y = if y > hi { hi } else { y };
    y
}

/// Round half-to-even ("banker's rounding") at a decimal scale, matching
/// the legacy Round() semantics: the scaled value is narrowed to f32
/// before the tie test.
pub fn round_half_even(x: f64, places: i32) -> f64 {
    let p = 10f64.powi(places);
    let v = fw(x * p);
    let f = v.floor();
    let frac = v - f;
    if frac > 0.5 {
        return (f + 1.0) / p;
    }
    if frac < 0.5 {
        return f / p;
    }
    // Exactly .5: round to even
    if f % 2.0 == 0.0 {
        f / p
    } else {
        (f + 1.0) / p
    }
}

/// Legacy Int(): truncate toward negative infinity.
#[inline(always)]
pub fn int_floor(x: f64) -> f64 {
    fw(x).floor()
}

/// Legacy Fix(): truncate toward zero.
#[inline(always)]
pub fn fix_trunc(x: f64) -> f64 {
    fw(x).trunc()
}

/// Linear interpolation carried out entirely in single precision.
pub fn lerp(x: f64, x0: f64, x1: f64, y0: f64, y1: f64) -> f64 {
    let x = fw(x);
    let x0 = fw(x0);
    let x1 = fw(x1);
    let y0 = fw(y0);
    let y1 = fw(y1);
    if x1 == x0 {
        return y0;
    }
    let t = fdiv(fsub(x, x0), fsub(x1, x0));
    fadd(y0, fmul(t, fsub(y1, y0)))
}

/// Piecewise-linear table lookup in single precision, clamped to the
/// table endpoints. `table` must be sorted ascending in x.
pub fn table_lookup(x: f64, table: &[(f64, f64)]) -> f64 {
    match table.len() {
        0 => 0.0,
        1 => fw(table[0].1),
        _ => {
            let x = fw(x);
            let first = table[0];
            let last = table[table.len() - 1];
            if x <= fw(first.0) {
                return fw(first.1);
            }
            if x >= fw(last.0) {
                return fw(last.1);
            }
            for w in table.windows(2) {
                let (x0, y0) = w[0];
                let (x1, y1) = w[1];
                if x >= fw(x0) && x <= fw(x1) {
                    return lerp(x, x0, x1, y0, y1);
                }
            }
            fw(last.1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrowing_matches_f32() {
        let x = 0.1_f64;
        assert_eq!(fw(x), 0.1_f32 as f64);
        assert_ne!(fw(x), x);
    }

    #[test]
    fn chained_ops_accumulate_f32_error() {
        // 0.1 + 0.2 in f32 differs from the f64 sum
        let s = fadd(0.1, 0.2);
        assert_eq!(s, (0.1_f32 + 0.2_f32) as f64);
        assert_ne!(s, 0.1 + 0.2);
    }

    #[test]
    fn nan_and_inf_pass_through() {
        assert!(fadd(f64::NAN, 1.0).is_nan());
        assert_eq!(fmul(f64::INFINITY, 2.0), f64::INFINITY);
        assert!(fclamp(f64::NAN, 0.0, 1.0).is_nan());
    }

    #[test]
    fn bankers_rounding_ties_to_even() {
        assert_eq!(round_half_even(2.5, 0), 2.0);
        assert_eq!(round_half_even(3.5, 0), 4.0);
        assert_eq!(round_half_even(2.4, 0), 2.0);
        assert_eq!(round_half_even(2.6, 0), 3.0);
        assert_eq!(round_half_even(0.125, 2), 0.12);
    }

    #[test]
    fn int_floors_and_fix_truncates() {
        assert_eq!(int_floor(-1.5), -2.0);
        assert_eq!(fix_trunc(-1.5), -1.0);
        assert_eq!(int_floor(1.5), 1.0);
        assert_eq!(fix_trunc(1.5), 1.0);
    }

    #[test]
    fn clamp_bounds() {
        assert_eq!(fclamp(5.0, 0.0, 1.0), 1.0);
        assert_eq!(fclamp(-5.0, 0.0, 1.0), 0.0);
        assert_eq!(fclamp(0.5, 0.0, 1.0), 0.5_f32 as f64);
    }

    #[test]
    fn table_lookup_clamps_endpoints() {
        let table = [(7000.0, 1078.0), (8750.0, 1300.0), (9500.0, 1222.0)];
        assert_eq!(table_lookup(6000.0, &table), 1078.0);
        assert_eq!(table_lookup(10000.0, &table), 1222.0);
        let mid = table_lookup(7875.0, &table);
        assert!(mid > 1078.0 && mid < 1300.0);
    }

    #[test]
    fn lerp_degenerate_interval() {
        assert_eq!(lerp(5.0, 5.0, 5.0, 1.0, 2.0), 1.0);
    }
}
