//! HMAC over the Streebog family (GOST R 34.11-2012, R 50.1.113-2016) and
//! the nested NMAC variant.
//!
//! The key lives in a masked [`SecretKey`] envelope of one hash block (64
//! bytes). `clean` unmasks into a temporary, folds in the 0x36 pad, feeds
//! the inner hash and re-masks before returning; `finalize` repeats the
//! dance with the 0x5C pad for the outer computation. One complete MAC
//! costs two units of the invocation resource.

use digest::Digest;
use streebog::{Streebog256, Streebog512};

use crate::error::{CryptoError, Result};
use crate::oid::{self, Oid};
use crate::options;
use crate::secret_key::{wipe, KeyResource, ResourceKind, SecretKey};

/// Block length of the Streebog compression function in bytes.
pub const HMAC_BLOCK_SIZE: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HmacAlgorithm {
    Streebog256,
    Streebog512,
    /// Inner Streebog-512, outer Streebog-256, 256-bit tag.
    Nmac,
}

#[derive(Debug)]
enum HashState {
    S256(Streebog256),
    S512(Streebog512),
}

impl HashState {
    fn update(&mut self, data: &[u8]) {
        match self {
            HashState::S256(h) => h.update(data),
            HashState::S512(h) => h.update(data),
        }
    }

    fn finish(self) -> Vec<u8> {
        match self {
            HashState::S256(h) => h.finalize().to_vec(),
            HashState::S512(h) => h.finalize().to_vec(),
        }
    }
}

/// A keyed Streebog authenticator.
#[derive(Debug)]
pub struct HmacKey {
    skey: SecretKey,
    algorithm: HmacAlgorithm,
    state: Option<HashState>,
    oid: &'static Oid,
}

impl HmacKey {
    pub fn new_streebog256() -> Result<Self> {
        Self::new(HmacAlgorithm::Streebog256, "hmac-streebog256")
    }

    pub fn new_streebog512() -> Result<Self> {
        Self::new(HmacAlgorithm::Streebog512, "hmac-streebog512")
    }

    pub fn new_nmac() -> Result<Self> {
        Self::new(HmacAlgorithm::Nmac, "nmac-streebog")
    }

    /// Creates a context for the named keyed-hash algorithm.
    pub fn new_by_name(name: &str) -> Result<Self> {
        let entry = oid::find_by_name(name)?;
        if entry.engine != oid::Engine::HmacFunction {
            return Err(CryptoError::OidEngine);
        }
        match entry.names[0] {
            "hmac-streebog256" => Self::new_streebog256(),
            "hmac-streebog512" => Self::new_streebog512(),
            "nmac-streebog" => Self::new_nmac(),
            _ => Err(CryptoError::UnknownOid),
        }
    }

    fn new(algorithm: HmacAlgorithm, name: &str) -> Result<Self> {
        Ok(Self {
            skey: SecretKey::new(HMAC_BLOCK_SIZE)?,
            algorithm,
            state: None,
            oid: oid::find_by_name(name)?,
        })
    }

    pub fn algorithm(&self) -> HmacAlgorithm {
        self.algorithm
    }

    pub fn oid(&self) -> &'static Oid {
        self.oid
    }

    /// Length of the produced authentication code in bytes.
    pub fn tag_size(&self) -> usize {
        match self.algorithm {
            HmacAlgorithm::Streebog256 | HmacAlgorithm::Nmac => 32,
            HmacAlgorithm::Streebog512 => 64,
        }
    }

    pub fn block_size(&self) -> usize {
        HMAC_BLOCK_SIZE
    }

    pub fn resource_counter(&self) -> i64 {
        self.skey.resource.counter
    }

    pub(crate) fn secret_key_mut(&mut self) -> &mut SecretKey {
        &mut self.skey
    }

    fn inner_hash(&self) -> HashState {
        match self.algorithm {
            HmacAlgorithm::Streebog256 => HashState::S256(Streebog256::new()),
            HmacAlgorithm::Streebog512 | HmacAlgorithm::Nmac => {
                HashState::S512(Streebog512::new())
            }
        }
    }

    fn outer_hash(&self) -> HashState {
        match self.algorithm {
            HmacAlgorithm::Streebog256 => HashState::S256(Streebog256::new()),
            HmacAlgorithm::Streebog512 => HashState::S512(Streebog512::new()),
            // the difference to plain HMAC sits in this final compression
            HmacAlgorithm::Nmac => HashState::S256(Streebog256::new()),
        }
    }

    /// Assigns the key value. A value longer than the hash block is
    /// replaced by its digest first; shorter values are zero-padded inside
    /// the envelope. The invocation budget is installed from the options.
    pub fn set_key(&mut self, value: &[u8]) -> Result<()> {
        if value.is_empty() {
            return Err(CryptoError::ZeroLength);
        }
        if value.len() > HMAC_BLOCK_SIZE {
            let mut hasher = self.inner_hash();
            hasher.update(value);
            let mut digest = hasher.finish();
            let result = self.skey.set_key(&digest);
            wipe(&mut digest);
            result?;
        } else {
            self.skey.set_key(value)?;
        }
        self.skey.resource =
            KeyResource::new(ResourceKind::KeyUsing, options::get().hmac_key_count_resource);
        Ok(())
    }

    /// Assigns a random key of one block length.
    pub fn set_key_random(&mut self) -> Result<()> {
        self.skey.set_key_random()?;
        self.skey.resource =
            KeyResource::new(ResourceKind::KeyUsing, options::get().hmac_key_count_resource);
        Ok(())
    }

    /// Starts a new computation: absorbs the 0x36-padded key block into a
    /// fresh inner hash. A complete MAC uses the key twice, so at least
    /// two resource units must remain.
    pub fn clean(&mut self) -> Result<()> {
        self.skey.verify_icode()?;
        if self.skey.resource.counter < 2 {
            return Err(CryptoError::LowKeyResource);
        }

        let mut buffer = [0u8; HMAC_BLOCK_SIZE];
        {
            let unmasked = self.skey.unmask();
            for (b, k) in buffer.iter_mut().zip(unmasked.bytes()) {
                *b = k ^ 0x36;
            }
        }
        let mut hasher = self.inner_hash();
        hasher.update(&buffer);
        wipe(&mut buffer);
        self.state = Some(hasher);

        self.skey.set_mask();
        self.skey.resource.counter -= 1;
        Ok(())
    }

    /// Absorbs the next message fragment; any length is admissible.
    pub fn update(&mut self, data: &[u8]) -> Result<()> {
        match self.state.as_mut() {
            Some(state) => {
                state.update(data);
                Ok(())
            }
            None => Err(CryptoError::WrongBlockCipherFunction),
        }
    }

    /// Absorbs the trailing fragment and completes the outer computation,
    /// returning the full authentication code.
    pub fn finalize(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        let mut state = self.state.take().ok_or(CryptoError::WrongBlockCipherFunction)?;
        self.skey.verify_icode()?;
        state.update(data);
        let mut inner = state.finish();

        let mut buffer = [0u8; HMAC_BLOCK_SIZE];
        {
            let unmasked = self.skey.unmask();
            for (b, k) in buffer.iter_mut().zip(unmasked.bytes()) {
                *b = k ^ 0x5C;
            }
        }
        let mut outer = self.outer_hash();
        outer.update(&buffer);
        wipe(&mut buffer);

        // the outer compression absorbs as many digest bytes as it itself
        // produces, which for the nested variant trims the inner 512-bit
        // value to its first half
        let absorb = match self.algorithm {
            HmacAlgorithm::Streebog512 => 64,
            _ => 32,
        };
        outer.update(&inner[..absorb]);
        wipe(&mut inner);

        self.skey.set_mask();
        self.skey.resource.counter -= 1;
        Ok(outer.finish())
    }

    /// One-shot computation over `data`.
    pub fn hmac(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        self.clean()?;
        self.finalize(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_sizes() {
        assert_eq!(HmacKey::new_streebog256().unwrap().tag_size(), 32);
        assert_eq!(HmacKey::new_streebog512().unwrap().tag_size(), 64);
        assert_eq!(HmacKey::new_nmac().unwrap().tag_size(), 32);
    }

    #[test]
    fn mac_requires_a_key() {
        let mut key = HmacKey::new_streebog256().unwrap();
        assert_eq!(key.hmac(b"abc").unwrap_err(), CryptoError::KeyValue);
    }

    #[test]
    fn update_requires_clean() {
        let mut key = HmacKey::new_streebog256().unwrap();
        key.set_key(&[0u8; 32]).unwrap();
        assert_eq!(key.update(b"abc").unwrap_err(), CryptoError::WrongBlockCipherFunction);
    }

    #[test]
    fn one_mac_costs_two_invocations() {
        let mut key = HmacKey::new_streebog512().unwrap();
        key.set_key(&[3u8; 32]).unwrap();
        let before = key.resource_counter();
        key.hmac(b"message").unwrap();
        assert_eq!(key.resource_counter(), before - 2);
    }

    #[test]
    fn streaming_equals_one_shot() {
        let mut key = HmacKey::new_streebog256().unwrap();
        key.set_key(&[7u8; 32]).unwrap();
        let whole = key.hmac(b"the quick brown fox").unwrap();

        key.clean().unwrap();
        key.update(b"the quick").unwrap();
        key.update(b" brown").unwrap();
        let split = key.finalize(b" fox").unwrap();
        assert_eq!(whole, split);
    }
}
