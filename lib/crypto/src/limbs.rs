/*++

Licensed under the Apache-2.0 license.

File Name:

    limbs.rs

Abstract:

    File contains conversions between big integers and vectors of narrow
    limbs, least significant limb first.

--*/

use num_bigint::BigUint;
use num_traits::Zero;

/// Splits `value` into `count` limbs of `width` bits each, least significant
/// limb first. Limbs are right-aligned in the returned words.
///
/// # Panics
///
/// Panics if `width` is 0 or larger than 32, or if `value` does not fit in
/// `count * width` bits.
pub fn to_limbs(value: &BigUint, width: u32, count: usize) -> Vec<u32> {
    assert!(width >= 1 && width <= 32, "limb width must be in 1..=32");
    let mask = BigUint::from((1u64 << width) - 1);
    let mut rest = value.clone();
    let mut result = Vec::with_capacity(count);
    for _ in 0..count {
        let limb = &rest & &mask;
        result.push(limb.iter_u32_digits().next().unwrap_or(0));
        rest >>= width;
    }
    assert!(
        rest.is_zero(),
        "value does not fit in {} limbs of {} bits",
        count,
        width
    );
    result
}

/// Reassembles a big integer from `width`-bit limbs, least significant limb
/// first. Bits of each word above `width` are ignored.
pub fn from_limbs(limbs: &[u32], width: u32) -> BigUint {
    assert!(width >= 1 && width <= 32, "limb width must be in 1..=32");
    let mask = ((1u64 << width) - 1) as u32;
    let mut result = BigUint::zero();
    for &limb in limbs.iter().rev() {
        result <<= width;
        result += limb & mask;
    }
    result
}
