//! Multiplication in the finite fields of characteristic 2 used by the
//! CMAC subkey derivation, the MGM authentication step and the XTS tweak
//! chain. The fields are fixed:
//!
//! - GF(2^64),  f(x) = x^64 + x^4 + x^3 + x + 1 (overflow constant 0x1B)
//! - GF(2^128), f(x) = x^128 + x^7 + x^2 + x + 1 (overflow constant 0x87)
//! - GF(2^256), f(x) = x^256 + x^10 + x^5 + x^2 + 1 (overflow constant 0x425)
//! - GF(2^512), f(x) = x^512 + x^8 + x^5 + x^2 + 1 (overflow constant 0x125)
//!
//! Operands are little-endian within each 64-bit limb; byte-level entry
//! points load and store through `u64::from_le_bytes`, so the mathematical
//! result does not depend on host endianness.
//!
//! Two implementations coexist: a portable shift-and-reduce schoolbook and
//! a carryless-multiply path used when the processor exposes a 64x64->128
//! carryless multiplication. `self_test` cross-checks them over random
//! operands at start-up.

use rand::{thread_rng, Rng};

use crate::error::{CryptoError, Result};

const POLY64: u64 = 0x1B;
const POLY128: u64 = 0x87;
const POLY256: u64 = 0x425;
const POLY512: u64 = 0x125;

/* ------------------------------------------------------------------ */
/*                         portable schoolbook                        */
/* ------------------------------------------------------------------ */

pub fn gf64_mul_portable(x: u64, y: u64) -> u64 {
    let mut z = 0u64;
    let mut s = x;
    let mut t = y;
    for _ in 0..64 {
        if t & 1 != 0 {
            z ^= s;
        }
        t >>= 1;
        let carry = s & 0x8000_0000_0000_0000;
        s <<= 1;
        if carry != 0 {
            s ^= POLY64;
        }
    }
    z
}

pub fn gf128_mul_portable(x: [u64; 2], y: [u64; 2]) -> [u64; 2] {
    let mut z = [0u64; 2];
    let mut s = x;
    for limb in 0..2 {
        let mut t = y[limb];
        for _ in 0..64 {
            if t & 1 != 0 {
                z[0] ^= s[0];
                z[1] ^= s[1];
            }
            t >>= 1;
            let carry = s[1] >> 63;
            s[1] = (s[1] << 1) | (s[0] >> 63);
            s[0] <<= 1;
            if carry != 0 {
                s[0] ^= POLY128;
            }
        }
    }
    z
}

pub fn gf256_mul_portable(x: [u64; 4], y: [u64; 4]) -> [u64; 4] {
    let mut z = [0u64; 4];
    let mut s = x;
    for limb in 0..4 {
        let mut t = y[limb];
        for _ in 0..64 {
            if t & 1 != 0 {
                for i in 0..4 {
                    z[i] ^= s[i];
                }
            }
            t >>= 1;
            let carry = s[3] >> 63;
            s[3] = (s[3] << 1) | (s[2] >> 63);
            s[2] = (s[2] << 1) | (s[1] >> 63);
            s[1] = (s[1] << 1) | (s[0] >> 63);
            s[0] <<= 1;
            if carry != 0 {
                s[0] ^= POLY256;
            }
        }
    }
    z
}

pub fn gf512_mul_portable(x: [u64; 8], y: [u64; 8]) -> [u64; 8] {
    let mut z = [0u64; 8];
    let mut s = x;
    for limb in 0..8 {
        let mut t = y[limb];
        for _ in 0..64 {
            if t & 1 != 0 {
                for i in 0..8 {
                    z[i] ^= s[i];
                }
            }
            t >>= 1;
            let carry = s[7] >> 63;
            for i in (1..8).rev() {
                s[i] = (s[i] << 1) | (s[i - 1] >> 63);
            }
            s[0] <<= 1;
            if carry != 0 {
                s[0] ^= POLY512;
            }
        }
    }
    z
}

/* ------------------------------------------------------------------ */
/*                      carryless multiply path                       */
/* ------------------------------------------------------------------ */

#[cfg(target_arch = "x86_64")]
mod clmul {
    use super::{POLY128, POLY256, POLY512, POLY64};
    use core::arch::x86_64::{
        __m128i, _mm_clmulepi64_si128, _mm_cvtsi128_si64, _mm_set_epi64x, _mm_srli_si128,
    };

    #[inline]
    #[target_feature(enable = "pclmulqdq")]
    unsafe fn mul64(a: u64, b: u64) -> (u64, u64) {
        let am = _mm_set_epi64x(0, a as i64);
        let bm = _mm_set_epi64x(0, b as i64);
        let p: __m128i = _mm_clmulepi64_si128::<0x00>(am, bm);
        let lo = _mm_cvtsi128_si64(p) as u64;
        let hi = _mm_cvtsi128_si64(_mm_srli_si128::<8>(p)) as u64;
        (lo, hi)
    }

    #[target_feature(enable = "pclmulqdq")]
    pub unsafe fn gf64_mul(x: u64, y: u64) -> u64 {
        let (p0, p1) = mul64(x, y);
        let (q0, q1) = mul64(p1, POLY64);
        let (r0, _) = mul64(q1, POLY64);
        p0 ^ q0 ^ r0
    }

    #[target_feature(enable = "pclmulqdq")]
    pub unsafe fn gf128_mul(x: [u64; 2], y: [u64; 2]) -> [u64; 2] {
        let (c0, c1) = mul64(x[0], y[0]);
        let (d0, d1) = mul64(x[1], y[1]);
        let (e0, e1) = mul64(x[0], y[1]);
        let (f0, f1) = mul64(x[1], y[0]);

        let x3 = d1;
        let d = d0 ^ e1 ^ f1 ^ (x3 >> 63) ^ (x3 >> 62) ^ (x3 >> 57);

        let z0 = c0 ^ d ^ (d << 1) ^ (d << 2) ^ (d << 7);
        let z1 = c1
            ^ e0
            ^ f0
            ^ x3
            ^ (x3 << 1)
            ^ (d >> 63)
            ^ (x3 << 2)
            ^ (d >> 62)
            ^ (x3 << 7)
            ^ (d >> 57);
        [z0, z1]
    }

    /// Schoolbook limb product followed by a top-down polynomial fold into
    /// the first `n` limbs of `prod`. The fold relies on the reduction
    /// constants being shorter than 53 bits, so one carryless
    /// multiplication folds a whole limb.
    #[target_feature(enable = "pclmulqdq")]
    unsafe fn mul_folded(x: &[u64], y: &[u64], poly: u64, prod: &mut [u64]) {
        let n = x.len();
        prod.fill(0);
        for i in 0..n {
            for j in 0..n {
                let (lo, hi) = mul64(x[i], y[j]);
                prod[i + j] ^= lo;
                prod[i + j + 1] ^= hi;
            }
        }
        for k in (n..2 * n).rev() {
            let h = prod[k];
            prod[k] = 0;
            let (lo, hi) = mul64(h, poly);
            prod[k - n] ^= lo;
            prod[k - n + 1] ^= hi;
        }
    }

    #[target_feature(enable = "pclmulqdq")]
    pub unsafe fn gf256_mul(x: [u64; 4], y: [u64; 4]) -> [u64; 4] {
        let mut prod = [0u64; 8];
        mul_folded(&x, &y, POLY256, &mut prod);
        prod[..4].try_into().expect("limb count")
    }

    #[target_feature(enable = "pclmulqdq")]
    pub unsafe fn gf512_mul(x: [u64; 8], y: [u64; 8]) -> [u64; 8] {
        let mut prod = [0u64; 16];
        mul_folded(&x, &y, POLY512, &mut prod);
        prod[..8].try_into().expect("limb count")
    }
}

#[cfg(target_arch = "x86_64")]
#[inline]
fn has_clmul() -> bool {
    std::arch::is_x86_feature_detected!("pclmulqdq")
}

/* ------------------------------------------------------------------ */
/*                          dispatch and bytes                        */
/* ------------------------------------------------------------------ */

pub fn gf64_mul(x: u64, y: u64) -> u64 {
    #[cfg(target_arch = "x86_64")]
    if has_clmul() {
        return unsafe { clmul::gf64_mul(x, y) };
    }
    gf64_mul_portable(x, y)
}

pub fn gf128_mul(x: [u64; 2], y: [u64; 2]) -> [u64; 2] {
    #[cfg(target_arch = "x86_64")]
    if has_clmul() {
        return unsafe { clmul::gf128_mul(x, y) };
    }
    gf128_mul_portable(x, y)
}

pub fn gf256_mul(x: [u64; 4], y: [u64; 4]) -> [u64; 4] {
    #[cfg(target_arch = "x86_64")]
    if has_clmul() {
        return unsafe { clmul::gf256_mul(x, y) };
    }
    gf256_mul_portable(x, y)
}

pub fn gf512_mul(x: [u64; 8], y: [u64; 8]) -> [u64; 8] {
    #[cfg(target_arch = "x86_64")]
    if has_clmul() {
        return unsafe { clmul::gf512_mul(x, y) };
    }
    gf512_mul_portable(x, y)
}

pub fn gf64_mul_bytes(x: &[u8; 8], y: &[u8; 8]) -> [u8; 8] {
    gf64_mul(u64::from_le_bytes(*x), u64::from_le_bytes(*y)).to_le_bytes()
}

pub fn gf128_mul_bytes(x: &[u8; 16], y: &[u8; 16]) -> [u8; 16] {
    let a = [
        u64::from_le_bytes(x[..8].try_into().unwrap()),
        u64::from_le_bytes(x[8..].try_into().unwrap()),
    ];
    let b = [
        u64::from_le_bytes(y[..8].try_into().unwrap()),
        u64::from_le_bytes(y[8..].try_into().unwrap()),
    ];
    let z = gf128_mul(a, b);
    let mut out = [0u8; 16];
    out[..8].copy_from_slice(&z[0].to_le_bytes());
    out[8..].copy_from_slice(&z[1].to_le_bytes());
    out
}

/* ------------------------------------------------------------------ */
/*                              self test                             */
/* ------------------------------------------------------------------ */

/// Cross-checks the portable and carryless implementations over 1000
/// random operand pairs in every field. On targets without a carryless
/// multiplier only the portable path exists and the check degenerates to
/// an algebraic identity test (commutativity).
pub fn self_test() -> Result<()> {
    let mut rng = thread_rng();
    for _ in 0..1000 {
        let a: u64 = rng.gen();
        let b: u64 = rng.gen();
        if gf64_mul(a, b) != gf64_mul_portable(a, b) || gf64_mul_portable(a, b) != gf64_mul_portable(b, a) {
            return Err(CryptoError::NotEqualData);
        }

        let a2: [u64; 2] = rng.gen();
        let b2: [u64; 2] = rng.gen();
        if gf128_mul(a2, b2) != gf128_mul_portable(a2, b2)
            || gf128_mul_portable(a2, b2) != gf128_mul_portable(b2, a2)
        {
            return Err(CryptoError::NotEqualData);
        }

        let a4: [u64; 4] = rng.gen();
        let b4: [u64; 4] = rng.gen();
        if gf256_mul(a4, b4) != gf256_mul_portable(a4, b4)
            || gf256_mul_portable(a4, b4) != gf256_mul_portable(b4, a4)
        {
            return Err(CryptoError::NotEqualData);
        }

        let a8: [u64; 8] = rng.gen();
        let b8: [u64; 8] = rng.gen();
        if gf512_mul(a8, b8) != gf512_mul_portable(a8, b8)
            || gf512_mul_portable(a8, b8) != gf512_mul_portable(b8, a8)
        {
            return Err(CryptoError::NotEqualData);
        }
    }
    log::debug!("finite field multiplication cross-check passed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_is_neutral() {
        assert_eq!(gf64_mul_portable(0xdeadbeef_01234567, 1), 0xdeadbeef_01234567);
        assert_eq!(gf128_mul_portable([7, 9], [1, 0]), [7, 9]);
        assert_eq!(gf256_mul_portable([1, 2, 3, 4], [1, 0, 0, 0]), [1, 2, 3, 4]);
        assert_eq!(
            gf512_mul_portable([1, 2, 3, 4, 5, 6, 7, 8], [1, 0, 0, 0, 0, 0, 0, 0]),
            [1, 2, 3, 4, 5, 6, 7, 8]
        );
    }

    #[test]
    fn reduction_constant_64() {
        // x^63 * x = x^64 = x^4 + x^3 + x + 1
        assert_eq!(gf64_mul_portable(1 << 63, 2), POLY64);
    }

    #[test]
    fn reduction_constant_128() {
        assert_eq!(gf128_mul_portable([0, 1 << 63], [2, 0]), [POLY128, 0]);
    }

    #[test]
    fn alpha_doubling_matches_shift() {
        // multiplication by x is a left shift while the degree stays low
        assert_eq!(gf64_mul_portable(0x1234, 2), 0x2468);
        assert_eq!(gf128_mul_portable([0x1234, 0], [2, 0]), [0x2468, 0]);
    }

    #[test]
    fn distributivity_holds() {
        let a = [0x0123_4567_89ab_cdef, 0xfedc_ba98_7654_3210];
        let b = [0x0f0f_0f0f_0f0f_0f0f, 0xf0f0_f0f0_f0f0_f0f0];
        let c = [0xaaaa_5555_aaaa_5555, 0x5555_aaaa_5555_aaaa];
        let bc = [b[0] ^ c[0], b[1] ^ c[1]];
        let left = gf128_mul_portable(a, bc);
        let r1 = gf128_mul_portable(a, b);
        let r2 = gf128_mul_portable(a, c);
        assert_eq!(left, [r1[0] ^ r2[0], r1[1] ^ r2[1]]);
    }

    #[test]
    fn cross_check_passes() {
        assert!(self_test().is_ok());
    }
}
