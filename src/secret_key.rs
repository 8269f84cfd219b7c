//! The secret key envelope shared by every keyed algorithm of the library.
//!
//! Key bytes never sit in memory in the clear between operations: the
//! envelope stores the key XOR-combined with a random mask, followed by the
//! mask itself, and a short integrity code over the whole buffer detects
//! corruption and tampering. A resource counter bounds how much work a key
//! is permitted to perform, and destruction overwrites every owned byte
//! with generator output before release.

use chrono::{DateTime, Duration, Local};
use rand::{thread_rng, Rng, RngCore};
use zeroize::Zeroize;

use crate::error::{CryptoError, Result};

/// What the resource counter of a key measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// Remaining number of processed blocks (block ciphers).
    BlockCounter,
    /// Remaining number of invocations (keyed hash functions).
    KeyUsing,
}

/// Usage budget of a secret key together with its validity window.
#[derive(Debug, Clone, Copy)]
pub struct KeyResource {
    pub kind: ResourceKind,
    pub counter: i64,
    pub not_before: DateTime<Local>,
    pub not_after: DateTime<Local>,
}

impl KeyResource {
    pub fn new(kind: ResourceKind, counter: i64) -> Self {
        let now = Local::now();
        Self { kind, counter, not_before: now, not_after: now + Duration::days(365) }
    }
}

/// Modified Fletcher-32 with XOR accumulation, the checksum behind the key
/// integrity code.
pub(crate) fn fletcher32_xor(data: &[u8]) -> u32 {
    let mut out: u32 = 0;
    let mut sb: u32 = 0;
    let cnt = data.len() & !1usize;
    let mut idx = 0;
    while idx < cnt {
        out ^= (data[idx] as u32) | ((data[idx + 1] as u32) << 8);
        sb ^= out;
        sb = if sb & 0x8000 != 0 { (sb << 1) ^ 0x8BB7 } else { sb << 1 };
        idx += 2;
    }
    if idx != data.len() {
        out ^= data[idx] as u32;
        sb ^= out;
        sb = if sb & 0x8000 != 0 { (sb << 1) ^ 0x8BB7 } else { sb << 1 };
    }
    out ^ (sb << 16)
}

/// The masked key container. The buffer holds `key ^ mask` in its first
/// half and `mask` in its second half; the two halves only ever meet inside
/// an [`UnmaskedKey`] guard.
pub struct SecretKey {
    buffer: Vec<u8>,
    key_size: usize,
    icode: u32,
    pub resource: KeyResource,
    key_assigned: bool,
    /// A counter-mode initialization vector is currently loaded and may be
    /// continued with `iv = None`.
    pub(crate) iv_ready: bool,
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretKey")
            .field("key_size", &self.key_size)
            .field("icode", &self.icode)
            .field("resource", &self.resource)
            .field("key_assigned", &self.key_assigned)
            .field("iv_ready", &self.iv_ready)
            .finish()
    }
}

impl SecretKey {
    /// Creates an envelope of the given key length with no material
    /// assigned. The resource is installed when the key value is set.
    pub fn new(key_size: usize) -> Result<Self> {
        if key_size == 0 {
            return Err(CryptoError::ZeroLength);
        }
        Ok(Self {
            buffer: vec![0u8; 2 * key_size],
            key_size,
            icode: 0,
            resource: KeyResource::new(ResourceKind::KeyUsing, 0),
            key_assigned: false,
            iv_ready: false,
        })
    }

    pub fn key_size(&self) -> usize {
        self.key_size
    }

    pub fn is_key_assigned(&self) -> bool {
        self.key_assigned
    }

    /// Assigns key material. Shorter values are zero-padded to the envelope
    /// length; longer values are rejected.
    pub fn set_key(&mut self, value: &[u8]) -> Result<()> {
        if value.is_empty() {
            return Err(CryptoError::ZeroLength);
        }
        if value.len() > self.key_size {
            return Err(CryptoError::WrongLength);
        }
        self.wipe_buffer();
        let mut rng = thread_rng();
        let (key, mask) = self.buffer.split_at_mut(self.key_size);
        rng.fill_bytes(mask);
        key.fill(0);
        key[..value.len()].copy_from_slice(value);
        for (k, m) in key.iter_mut().zip(mask.iter()) {
            *k ^= *m;
        }
        self.key_assigned = true;
        self.iv_ready = false;
        self.set_icode();
        Ok(())
    }

    /// Assigns a random key value of the envelope length.
    pub fn set_key_random(&mut self) -> Result<()> {
        let mut value = vec![0u8; self.key_size];
        thread_rng().fill_bytes(&mut value);
        let result = self.set_key(&value);
        wipe(&mut value);
        result
    }

    /// Replaces the mask with fresh generator output and refreshes the
    /// integrity code. The unmasked key value never materializes.
    pub fn set_mask(&mut self) {
        if !self.key_assigned {
            return;
        }
        let mut rng = thread_rng();
        let (key, mask) = self.buffer.split_at_mut(self.key_size);
        for (k, m) in key.iter_mut().zip(mask.iter_mut()) {
            let fresh: u8 = rng.gen();
            *k ^= *m ^ fresh;
            *m = fresh;
        }
        self.set_icode();
    }

    fn set_icode(&mut self) {
        self.icode = fletcher32_xor(&self.buffer);
    }

    /// Recomputes the integrity code and compares it with the stored value.
    pub fn check_icode(&self) -> bool {
        self.key_assigned && fletcher32_xor(&self.buffer) == self.icode
    }

    /// Verifies the integrity code, failing with `WrongKeyIcode`. Every
    /// operation that is about to unmask calls this first.
    pub fn verify_icode(&self) -> Result<()> {
        if !self.key_assigned {
            return Err(CryptoError::KeyValue);
        }
        if !self.check_icode() {
            return Err(CryptoError::WrongKeyIcode);
        }
        Ok(())
    }

    /// Checks that the resource admits `amount` more units and consumes
    /// them. The counter strictly decreases on every successful operation.
    pub fn decrease_resource(&mut self, amount: i64) -> Result<()> {
        if self.resource.counter < amount {
            return Err(CryptoError::LowKeyResource);
        }
        self.resource.counter -= amount;
        Ok(())
    }

    /// Removes the mask for the duration of one operation. The returned
    /// guard dereferences to the raw key bytes and restores the masked
    /// representation when dropped, so a forgotten re-mask cannot compile
    /// into existence.
    pub fn unmask(&mut self) -> UnmaskedKey<'_> {
        let (key, mask) = self.buffer.split_at_mut(self.key_size);
        for (k, m) in key.iter_mut().zip(mask.iter()) {
            *k ^= *m;
        }
        UnmaskedKey { key: self }
    }

    fn wipe_buffer(&mut self) {
        if !self.buffer.is_empty() {
            thread_rng().fill_bytes(&mut self.buffer);
            self.buffer.zeroize();
        }
        self.icode = 0;
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.wipe_buffer();
        self.key_assigned = false;
    }
}

/// Scoped access to the raw key bytes of a [`SecretKey`]. Re-masks on drop.
pub struct UnmaskedKey<'a> {
    key: &'a mut SecretKey,
}

impl UnmaskedKey<'_> {
    pub fn bytes(&self) -> &[u8] {
        &self.key.buffer[..self.key.key_size]
    }
}

impl core::ops::Deref for UnmaskedKey<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.bytes()
    }
}

impl Drop for UnmaskedKey<'_> {
    fn drop(&mut self) {
        let (key, mask) = self.key.buffer.split_at_mut(self.key.key_size);
        for (k, m) in key.iter_mut().zip(mask.iter()) {
            *k ^= *m;
        }
    }
}

/// Overwrites a buffer with generator output and clears it afterwards.
/// Zero-filling alone is insufficient by library policy.
pub fn wipe(data: &mut [u8]) {
    if data.is_empty() {
        return;
    }
    thread_rng().fill_bytes(data);
    data.zeroize();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmask_restores_the_key() {
        let mut skey = SecretKey::new(32).unwrap();
        skey.set_key(&[0xA5; 32]).unwrap();
        {
            let unmasked = skey.unmask();
            assert_eq!(unmasked.bytes(), &[0xA5; 32]);
        }
        assert!(skey.check_icode());
        let unmasked = skey.unmask();
        assert_eq!(unmasked.bytes(), &[0xA5; 32]);
    }

    #[test]
    fn remasking_preserves_the_key_and_icode() {
        let mut skey = SecretKey::new(16).unwrap();
        skey.set_key(b"0123456789abcdef").unwrap();
        for _ in 0..8 {
            skey.set_mask();
            assert!(skey.check_icode());
        }
        assert_eq!(skey.unmask().bytes(), b"0123456789abcdef");
    }

    #[test]
    fn corruption_is_detected() {
        let mut skey = SecretKey::new(32).unwrap();
        skey.set_key(&[7u8; 32]).unwrap();
        skey.buffer[3] ^= 0x40;
        assert!(!skey.check_icode());
        assert_eq!(skey.verify_icode(), Err(CryptoError::WrongKeyIcode));
    }

    #[test]
    fn short_keys_are_zero_padded() {
        let mut skey = SecretKey::new(64).unwrap();
        skey.set_key(&[0xFF; 16]).unwrap();
        let unmasked = skey.unmask();
        assert_eq!(&unmasked.bytes()[..16], &[0xFF; 16]);
        assert!(unmasked.bytes()[16..].iter().all(|&b| b == 0));
    }

    #[test]
    fn resource_is_monotone() {
        let mut skey = SecretKey::new(32).unwrap();
        skey.set_key(&[1u8; 32]).unwrap();
        skey.resource = KeyResource::new(ResourceKind::BlockCounter, 5);
        assert!(skey.decrease_resource(3).is_ok());
        assert_eq!(skey.resource.counter, 2);
        assert_eq!(skey.decrease_resource(3), Err(CryptoError::LowKeyResource));
        assert_eq!(skey.resource.counter, 2);
    }

    #[test]
    fn unset_key_is_rejected() {
        let skey = SecretKey::new(32).unwrap();
        assert_eq!(skey.verify_icode(), Err(CryptoError::KeyValue));
    }
}
