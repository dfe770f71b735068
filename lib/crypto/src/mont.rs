/*++

Licensed under the Apache-2.0 license.

File Name:

    mont.rs

Abstract:

    File contains a software reference for Montgomery-domain modular
    arithmetic over an odd modulus P with radix R = 2^e.

--*/

use num_bigint::BigUint;
use num_traits::{One, Zero};

/// Montgomery arithmetic error
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MontError {
    /// The modulus must be odd for its inverse mod 2^e to exist.
    EvenModulus,

    /// The modulus must leave at least two bits of headroom below the radix
    /// so that products of operands in [0, 2P) reduce back into [0, 2P).
    ModulusTooWide,
}

/// Montgomery arithmetic context for a fixed modulus and radix.
pub struct MontCtx {
    /// Modulus P
    p: BigUint,

    /// Radix exponent; R = 2^e
    e: u32,

    /// R = 2^e
    r: BigUint,

    /// R - 1
    r_mask: BigUint,

    /// P' = -P^-1 mod R
    p_inv_neg: BigUint,
}

impl MontCtx {
    /// Constructs a context for modulus `p` and radix `2^e`.
    ///
    /// # Errors
    ///
    /// * `MontError::EvenModulus` - `p` is even (or zero)
    /// * `MontError::ModulusTooWide` - `p` does not fit in `e - 2` bits
    pub fn new(p: &BigUint, e: u32) -> Result<MontCtx, MontError> {
        if (p & BigUint::one()).is_zero() {
            return Err(MontError::EvenModulus);
        }
        if p.bits() + 2 > u64::from(e) {
            return Err(MontError::ModulusTooWide);
        }
        let r = BigUint::one() << e;
        let r_mask = &r - BigUint::one();
        let p_inv_neg = &r - inv_mod_pow2(p, e);
        Ok(MontCtx {
            p: p.clone(),
            e,
            r,
            r_mask,
            p_inv_neg,
        })
    }

    /// Modulus P
    pub fn p(&self) -> &BigUint {
        &self.p
    }

    /// Radix R = 2^e
    pub fn r(&self) -> &BigUint {
        &self.r
    }

    /// P' = -P^-1 mod R
    pub fn p_prime(&self) -> &BigUint {
        &self.p_inv_neg
    }

    /// Montgomery reduction of `t`: computes `(t + m * P) / R` where
    /// `m = (t mod R) * P' mod R`, which is congruent to `t * R^-1 mod P`.
    ///
    /// No final subtraction is performed; for `t < 4 * P^2` the result is in
    /// `[0, 2P)`, matching what the accelerator datapath produces.
    pub fn redc(&self, t: &BigUint) -> BigUint {
        let m = ((t & &self.r_mask) * &self.p_inv_neg) & &self.r_mask;
        (t + m * &self.p) >> self.e
    }

    /// Fully reduced Montgomery product `a * b * R^-1 mod P` for operands in
    /// `[0, 2P)`.
    pub fn mont_mul(&self, a: &BigUint, b: &BigUint) -> BigUint {
        let t = self.redc(&(a * b));
        if t >= self.p {
            t - &self.p
        } else {
            t
        }
    }

    /// Converts `a` to the Montgomery domain: `a * R mod P`.
    pub fn to_mont(&self, a: &BigUint) -> BigUint {
        (a * &self.r) % &self.p
    }

    /// Converts `a` out of the Montgomery domain: `a * R^-1 mod P`.
    pub fn from_mont(&self, a: &BigUint) -> BigUint {
        let t = self.redc(a);
        if t >= self.p {
            t - &self.p
        } else {
            t
        }
    }
}

/// Computes `p^-1 mod 2^e` for odd `p` by Hensel lifting: if
/// `x == p^-1 mod 2^k` then `x * (2 - p * x) == p^-1 mod 2^2k`.
fn inv_mod_pow2(p: &BigUint, e: u32) -> BigUint {
    let two = BigUint::from(2u32);
    let mut inv = BigUint::one();
    let mut bits = 1u32;
    while bits < e {
        bits = bits.saturating_mul(2).min(e);
        let m = BigUint::one() << bits;
        let t = (p * &inv) % &m;
        let factor = (&m + &two - t) % &m;
        inv = (inv * factor) % &m;
    }
    inv
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const P256_HEX: &[u8] = b"ffffffff00000001000000000000000000000000ffffffffffffffffffffffff";

    fn p256() -> BigUint {
        BigUint::parse_bytes(P256_HEX, 16).unwrap()
    }

    fn rand_below(rng: &mut StdRng, bound: &BigUint) -> BigUint {
        let digits: Vec<u32> = (0..(bound.bits() / 32 + 2)).map(|_| rng.gen()).collect();
        BigUint::new(digits) % bound
    }

    #[test]
    fn test_small_modulus() {
        // 13 * 5 = 65 = 1 mod 64, so 13^-1 = 5 and P' = 64 - 5 = 59.
        let ctx = MontCtx::new(&BigUint::from(13u32), 6).unwrap();
        assert_eq!(*ctx.p_prime(), BigUint::from(59u32));
    }

    #[test]
    fn test_rejects_even_modulus() {
        assert_eq!(
            MontCtx::new(&BigUint::from(12u32), 6).err(),
            Some(MontError::EvenModulus)
        );
        assert_eq!(
            MontCtx::new(&BigUint::zero(), 6).err(),
            Some(MontError::EvenModulus)
        );
    }

    #[test]
    fn test_rejects_wide_modulus() {
        assert_eq!(
            MontCtx::new(&BigUint::from(17u32), 6).err(),
            Some(MontError::ModulusTooWide)
        );
        assert!(MontCtx::new(&BigUint::from(15u32), 6).is_ok());
    }

    #[test]
    fn test_p_prime_identity() {
        let ctx = MontCtx::new(&p256(), 258).unwrap();
        // P * P' == -1 mod R
        assert!(((ctx.p() * ctx.p_prime() + BigUint::one()) % ctx.r()).is_zero());
    }

    #[test]
    fn test_redc_congruence_and_range() {
        let p = p256();
        let ctx = MontCtx::new(&p, 258).unwrap();
        let two_p = &p * 2u32;
        let mut rng = StdRng::seed_from_u64(0xe27);
        for _ in 0..20 {
            let x = rand_below(&mut rng, &two_p);
            let y = rand_below(&mut rng, &two_p);
            let t = ctx.redc(&(&x * &y));
            assert!(t < two_p);
            // t * R == x * y mod P
            assert_eq!((&t * ctx.r()) % &p, (&x * &y) % &p);
        }
    }

    #[test]
    fn test_mont_roundtrip() {
        let p = p256();
        let ctx = MontCtx::new(&p, 258).unwrap();
        let mut rng = StdRng::seed_from_u64(0x1157);
        for _ in 0..20 {
            let a = rand_below(&mut rng, &p);
            assert_eq!(ctx.from_mont(&ctx.to_mont(&a)), a);
        }
    }

    #[test]
    fn test_mont_mul_matches_modular_product() {
        let p = p256();
        let ctx = MontCtx::new(&p, 258).unwrap();
        let mut rng = StdRng::seed_from_u64(0x3a11);
        for _ in 0..20 {
            let x = rand_below(&mut rng, &p);
            let y = rand_below(&mut rng, &p);
            let product = ctx.mont_mul(&ctx.to_mont(&x), &ctx.to_mont(&y));
            assert_eq!(ctx.from_mont(&product), (&x * &y) % &p);
        }
    }
}
