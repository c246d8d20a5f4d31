//! Canonical units and integer helpers.
//!
//! All emission math is integer-only. Intermediate products use `u128`
//! so `amount * weight` can never overflow for `u64` amounts and `u32` weights.

/// Token amount in the mint's smallest unit.
pub type TokenAmount = u64;

/// Unix timestamp in seconds, as reported by the host clock.
pub type UnixTimestamp = i64;

/// Relative share of a single recipient.
pub type ShareWeight = u32;

/// Safe multiplication followed by division using u128 intermediate
/// Returns None if divisor is zero
#[inline]
pub fn mul_div_u128(n: u128, mul: u128, div: u128) -> Option<u128> {
    if div == 0 {
        return None;
    }
    n.checked_mul(mul).map(|product| product / div)
}
