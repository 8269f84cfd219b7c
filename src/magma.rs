//! The Magma block cipher of GOST R 34.12-2015: a 32-round Feistel network
//! over 64-bit blocks with a 256-bit key and the id-tc26-gost-28147-param-Z
//! substitution box.
//!
//! Blocks and keys follow the library's little-endian convention: an
//! 8-byte block is the standard integer written least significant byte
//! first, and the 32 key bytes are the mirror of the standard notation.
//! The `Openssl` byte order reverses blocks and keys back to the standard
//! text layout.
//!
//! The round function adds the round key modulo 2^32, so the scheduled
//! keys are protected with an additive mask: the schedule stores
//! `k - m (mod 2^32)` next to `m`, and both summands enter the round
//! addition separately. The bare round key never appears in memory.

use rand::{thread_rng, Rng};
use zeroize::Zeroize;

/// S-box of GOST R 34.12-2015 (parameter set id-tc26-gost-28147-param-Z).
const PI: [[u8; 16]; 8] = [
    [0xC, 0x4, 0x6, 0x2, 0xA, 0x5, 0xB, 0x9, 0xE, 0x8, 0xD, 0x7, 0x0, 0x3, 0xF, 0x1],
    [0x6, 0x8, 0x2, 0x3, 0x9, 0xA, 0x5, 0xC, 0x1, 0xE, 0x4, 0x7, 0xB, 0xD, 0x0, 0xF],
    [0xB, 0x3, 0x5, 0x8, 0x2, 0xF, 0xA, 0xD, 0xE, 0x1, 0x7, 0x4, 0xC, 0x9, 0x6, 0x0],
    [0xC, 0x8, 0x2, 0x1, 0xD, 0x4, 0xF, 0x6, 0x7, 0x0, 0xA, 0x5, 0x3, 0xE, 0x9, 0xB],
    [0x7, 0xF, 0x5, 0xA, 0x8, 0x1, 0x6, 0xD, 0x0, 0x9, 0x3, 0xE, 0xB, 0x4, 0x2, 0xC],
    [0x5, 0xD, 0xF, 0x6, 0x9, 0x2, 0xC, 0xA, 0xB, 0x7, 0x8, 0x1, 0x4, 0x3, 0xE, 0x0],
    [0x8, 0xE, 0x2, 0x5, 0x6, 0x9, 0x1, 0xC, 0xF, 0x4, 0xB, 0x0, 0xD, 0xA, 0x3, 0x7],
    [0x1, 0x7, 0xE, 0xD, 0x0, 0x5, 0x8, 0x3, 0x4, 0xF, 0xA, 0x6, 0x9, 0xC, 0xB, 0x2],
];

/// Round key order: K1..K8 three times forward, then K8..K1.
const KEY_ORDER: [usize; 32] = [
    0, 1, 2, 3, 4, 5, 6, 7, 0, 1, 2, 3, 4, 5, 6, 7, 0, 1, 2, 3, 4, 5, 6, 7, 7, 6, 5, 4, 3, 2, 1, 0,
];

/// Additively masked round key material.
pub(crate) struct MagmaSchedule {
    /// `k_i - m_i (mod 2^32)` for the eight key words in standard order.
    keys: [u32; 8],
    masks: [u32; 8],
}

impl MagmaSchedule {
    /// Expands a key given in the library's little-endian layout. Fresh
    /// masks are drawn on every schedule.
    pub fn new(key: &[u8; 32]) -> Self {
        let mut rng = thread_rng();
        let mut keys = [0u32; 8];
        let mut masks = [0u32; 8];
        for i in 0..8 {
            // the standard key word K_{i+1} sits in the mirrored layout as
            // the little-endian word at index 7 - i
            let word = u32::from_le_bytes(key[4 * (7 - i)..4 * (7 - i) + 4].try_into().unwrap());
            let mask: u32 = rng.gen();
            keys[i] = word.wrapping_sub(mask);
            masks[i] = mask;
        }
        Self { keys, masks }
    }

    /// Draws new masks and re-balances the stored differences.
    pub fn remask(&mut self) {
        let mut rng = thread_rng();
        for i in 0..8 {
            let fresh: u32 = rng.gen();
            self.keys[i] = self.keys[i].wrapping_add(self.masks[i]).wrapping_sub(fresh);
            self.masks[i] = fresh;
        }
    }

    #[inline]
    fn round_key_add(&self, index: usize, a: u32) -> u32 {
        a.wrapping_add(self.keys[index]).wrapping_add(self.masks[index])
    }

    /// Encrypts one 64-bit value (the little-endian reading of a block).
    pub fn encrypt_u64(&self, x: u64) -> u64 {
        let mut a1 = (x >> 32) as u32;
        let mut a0 = x as u32;
        for &idx in KEY_ORDER.iter() {
            let t = g(self.round_key_add(idx, a0)) ^ a1;
            a1 = a0;
            a0 = t;
        }
        // the final round keeps the halves in place: joining them swapped
        // undoes the last exchange of the loop
        ((a0 as u64) << 32) | (a1 as u64)
    }

    /// Decrypts one 64-bit value.
    pub fn decrypt_u64(&self, x: u64) -> u64 {
        let mut a1 = (x >> 32) as u32;
        let mut a0 = x as u32;
        for &idx in KEY_ORDER.iter().rev() {
            let t = g(self.round_key_add(idx, a0)) ^ a1;
            a1 = a0;
            a0 = t;
        }
        ((a0 as u64) << 32) | (a1 as u64)
    }
}

impl Drop for MagmaSchedule {
    fn drop(&mut self) {
        let mut rng = thread_rng();
        for i in 0..8 {
            self.keys[i] = rng.gen();
            self.masks[i] = rng.gen();
        }
        self.keys.zeroize();
        self.masks.zeroize();
    }
}

/// The t transformation: nibble-wise substitution.
#[inline]
fn t(a: u32) -> u32 {
    let mut out = 0u32;
    for i in 0..8 {
        let nibble = ((a >> (4 * i)) & 0xF) as usize;
        out |= (PI[i][nibble] as u32) << (4 * i);
    }
    out
}

/// The g transformation: substitution followed by an 11-bit left rotation.
/// The key addition happens in the caller, where the mask summands live.
#[inline]
fn g(a: u32) -> u32 {
    t(a).rotate_left(11)
}

#[cfg(test)]
mod tests {
    use super::*;

    // GOST R 34.12-2015 reference key in the standard text notation.
    const KEY_STD: [u8; 32] = [
        0xff, 0xee, 0xdd, 0xcc, 0xbb, 0xaa, 0x99, 0x88, 0x77, 0x66, 0x55, 0x44, 0x33, 0x22, 0x11,
        0x00, 0xf0, 0xf1, 0xf2, 0xf3, 0xf4, 0xf5, 0xf6, 0xf7, 0xf8, 0xf9, 0xfa, 0xfb, 0xfc, 0xfd,
        0xfe, 0xff,
    ];

    fn mirrored(key: &[u8; 32]) -> [u8; 32] {
        let mut out = [0u8; 32];
        for i in 0..32 {
            out[i] = key[31 - i];
        }
        out
    }

    #[test]
    fn t_transformation_reference() {
        // RFC 8891, key schedule worked example
        assert_eq!(t(0xfdb97531), 0x2a196f34);
        assert_eq!(t(0x2a196f34), 0xebd9f03a);
        assert_eq!(t(0xebd9f03a), 0xb039bb3d);
        assert_eq!(t(0xb039bb3d), 0x68695433);
    }

    #[test]
    fn g_transformation_reference() {
        assert_eq!(g(0x87654321u32.wrapping_add(0xfedcba98)), 0xfdcbc20c);
        assert_eq!(g(0xfdcbc20cu32.wrapping_add(0x87654321)), 0x7e791a4b);
    }

    #[test]
    fn single_block_reference() {
        // RFC 8891: E(fedcba9876543210) = 4ee901e5c2d8ca3d
        let schedule = MagmaSchedule::new(&mirrored(&KEY_STD));
        assert_eq!(schedule.encrypt_u64(0xfedcba9876543210), 0x4ee901e5c2d8ca3d);
        assert_eq!(schedule.decrypt_u64(0x4ee901e5c2d8ca3d), 0xfedcba9876543210);
    }

    #[test]
    fn remask_does_not_change_the_permutation() {
        let mut schedule = MagmaSchedule::new(&mirrored(&KEY_STD));
        let before = schedule.encrypt_u64(0x0123456789abcdef);
        for _ in 0..16 {
            schedule.remask();
        }
        assert_eq!(schedule.encrypt_u64(0x0123456789abcdef), before);
    }
}
