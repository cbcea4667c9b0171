//! # Fixed-Point Helpers
//!
//! Floor-rounding integer arithmetic matching the on-chain program's
//! `checked_mul(..).checked_div(..)` sequences. Results that cannot be
//! represented saturate instead of failing: a display value pinned at the
//! maximum is preferable to a blank one.

/// `a * b / c`, rounded down. `None` when `c == 0` or the result exceeds
/// `u128`.
pub fn mul_div_floor(a: u128, b: u128, c: u128) -> Option<u128> {
    if c == 0 {
        return None;
    }
    if let Some(product) = a.checked_mul(b) {
        return Some(product / c);
    }
    // a * b = (q * c + r) * b  =>  a * b / c = q * b + r * b / c
    let q = a / c;
    let r = a % c;
    q.checked_mul(b)?.checked_add(r.checked_mul(b)? / c)
}

/// Saturating variant of [`mul_div_floor`]. Division by zero yields zero.
pub fn mul_div_saturating(a: u128, b: u128, c: u128) -> u128 {
    if c == 0 {
        return 0;
    }
    mul_div_floor(a, b, c).unwrap_or(u128::MAX)
}
