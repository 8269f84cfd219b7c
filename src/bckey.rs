//! Block cipher keys. A [`BlockCipherKey`] wraps the secret key envelope
//! together with the scheduled round keys of one of the two supported
//! ciphers and the working buffer for mode initialization vectors.
//!
//! The registry of ciphers is closed, so the engine is a tagged variant
//! rather than a table of function pointers.

use crate::error::{CryptoError, Result};
use crate::kuznechik::KuznechikSchedule;
use crate::magma::MagmaSchedule;
use crate::oid::{self, Oid};
use crate::options;
use crate::secret_key::{KeyResource, ResourceKind, SecretKey, wipe};

/// Byte-ordering convention of blocks, keys and initialization vectors.
///
/// `Gost` is the little-endian convention of GOST R 34.12-2015 used by the
/// reference annexes; `Openssl` reverses the bytes of every Kuznechik block
/// and of Magma keys and blocks to match the OpenSSL wire layout. The
/// convention is captured at key construction and can never change while
/// an operation is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherByteOrder {
    Gost,
    Openssl,
}

/// Which of the two block ciphers a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherKind {
    Magma,
    Kuznechik,
}

impl CipherKind {
    pub fn block_size(self) -> usize {
        match self {
            CipherKind::Magma => 8,
            CipherKind::Kuznechik => 16,
        }
    }
}

pub(crate) enum CipherEngine {
    Magma(MagmaSchedule),
    Kuznechik(KuznechikSchedule),
}

/// A secret key of a block cipher together with its scheduled round keys.
pub struct BlockCipherKey {
    pub(crate) skey: SecretKey,
    pub(crate) engine: Option<CipherEngine>,
    kind: CipherKind,
    order: CipherByteOrder,
    pub(crate) ivector: [u8; 64],
    pub(crate) ivector_len: usize,
    /// Rotation position inside a multi-block initialization vector.
    pub(crate) iv_slot: usize,
    oid: &'static Oid,
}

impl std::fmt::Debug for BlockCipherKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockCipherKey")
            .field("skey", &self.skey)
            .field("kind", &self.kind)
            .field("order", &self.order)
            .field("ivector_len", &self.ivector_len)
            .field("iv_slot", &self.iv_slot)
            .field("oid", &self.oid)
            .finish()
    }
}

impl BlockCipherKey {
    /// Creates a Magma key context with no material assigned.
    pub fn new_magma(order: CipherByteOrder) -> Result<Self> {
        Self::new(CipherKind::Magma, order)
    }

    /// Creates a Kuznechik key context with no material assigned.
    pub fn new_kuznechik(order: CipherByteOrder) -> Result<Self> {
        Self::new(CipherKind::Kuznechik, order)
    }

    /// Creates a key context for the named block cipher algorithm.
    pub fn new_by_name(name: &str, order: CipherByteOrder) -> Result<Self> {
        let entry = oid::find_by_name(name)?;
        if entry.engine != oid::Engine::BlockCipher {
            return Err(CryptoError::OidEngine);
        }
        if entry.mode != oid::OidMode::Algorithm {
            return Err(CryptoError::OidMode);
        }
        match entry.names[0] {
            "magma" => Self::new(CipherKind::Magma, order),
            "kuznechik" => Self::new(CipherKind::Kuznechik, order),
            _ => Err(CryptoError::UnknownOid),
        }
    }

    fn new(kind: CipherKind, order: CipherByteOrder) -> Result<Self> {
        let name = match kind {
            CipherKind::Magma => "magma",
            CipherKind::Kuznechik => "kuznechik",
        };
        Ok(Self {
            skey: SecretKey::new(32)?,
            engine: None,
            kind,
            order,
            ivector: [0u8; 64],
            ivector_len: 0,
            iv_slot: 0,
            oid: oid::find_by_name(name)?,
        })
    }

    pub fn kind(&self) -> CipherKind {
        self.kind
    }

    pub fn block_size(&self) -> usize {
        self.kind.block_size()
    }

    pub fn byte_order(&self) -> CipherByteOrder {
        self.order
    }

    pub fn oid(&self) -> &'static Oid {
        self.oid
    }

    pub fn resource_counter(&self) -> i64 {
        self.skey.resource.counter
    }

    /// Assigns the 256-bit key value, schedules the round keys (replacing
    /// any prior schedule) and installs the block-count resource from the
    /// library options.
    ///
    /// Under the `Openssl` convention a Magma key arrives in the standard
    /// text notation and is reversed into the internal layout first.
    pub fn set_key(&mut self, value: &[u8]) -> Result<()> {
        if value.len() != 32 {
            return Err(CryptoError::WrongLength);
        }
        if self.kind == CipherKind::Magma && self.order == CipherByteOrder::Openssl {
            let mut reversed = [0u8; 32];
            for i in 0..32 {
                reversed[i] = value[31 - i];
            }
            self.skey.set_key(&reversed)?;
            wipe(&mut reversed);
        } else {
            self.skey.set_key(value)?;
        }
        self.schedule_keys()?;

        let opts = options::get();
        let budget = match self.kind {
            CipherKind::Magma => opts.magma_cipher_resource,
            CipherKind::Kuznechik => opts.kuznechik_cipher_resource,
        };
        self.skey.resource = KeyResource::new(ResourceKind::BlockCounter, budget);
        Ok(())
    }

    /// Assigns a random key value.
    pub fn set_key_random(&mut self) -> Result<()> {
        self.skey.set_key_random()?;
        self.schedule_keys()?;
        let opts = options::get();
        let budget = match self.kind {
            CipherKind::Magma => opts.magma_cipher_resource,
            CipherKind::Kuznechik => opts.kuznechik_cipher_resource,
        };
        self.skey.resource = KeyResource::new(ResourceKind::BlockCounter, budget);
        Ok(())
    }

    fn schedule_keys(&mut self) -> Result<()> {
        self.skey.verify_icode()?;
        self.engine = None; // drop wipes any prior schedule
        let order = self.order;
        let kind = self.kind;
        let unmasked = self.skey.unmask();
        let mut key: [u8; 32] = unmasked.bytes().try_into().map_err(|_| CryptoError::WrongLength)?;
        drop(unmasked);
        self.engine = Some(match kind {
            CipherKind::Magma => CipherEngine::Magma(MagmaSchedule::new(&key)),
            CipherKind::Kuznechik => CipherEngine::Kuznechik(KuznechikSchedule::new(&key, order)),
        });
        wipe(&mut key);
        Ok(())
    }

    /// Encrypts exactly one block. Resource accounting belongs to the
    /// calling mode, not to the primitive.
    pub(crate) fn encrypt_one(&self, input: &[u8], output: &mut [u8]) {
        match self.engine.as_ref().expect("schedule present") {
            CipherEngine::Magma(schedule) => {
                let block: [u8; 8] = input[..8].try_into().unwrap();
                let x = match self.order {
                    CipherByteOrder::Gost => u64::from_le_bytes(block),
                    CipherByteOrder::Openssl => u64::from_be_bytes(block),
                };
                let y = schedule.encrypt_u64(x);
                output[..8].copy_from_slice(&match self.order {
                    CipherByteOrder::Gost => y.to_le_bytes(),
                    CipherByteOrder::Openssl => y.to_be_bytes(),
                });
            }
            CipherEngine::Kuznechik(schedule) => {
                let block: [u8; 16] = input[..16].try_into().unwrap();
                output[..16].copy_from_slice(&schedule.encrypt_block(&block));
            }
        }
    }

    /// Decrypts exactly one block.
    pub(crate) fn decrypt_one(&self, input: &[u8], output: &mut [u8]) {
        match self.engine.as_ref().expect("schedule present") {
            CipherEngine::Magma(schedule) => {
                let block: [u8; 8] = input[..8].try_into().unwrap();
                let x = match self.order {
                    CipherByteOrder::Gost => u64::from_le_bytes(block),
                    CipherByteOrder::Openssl => u64::from_be_bytes(block),
                };
                let y = schedule.decrypt_u64(x);
                output[..8].copy_from_slice(&match self.order {
                    CipherByteOrder::Gost => y.to_le_bytes(),
                    CipherByteOrder::Openssl => y.to_be_bytes(),
                });
            }
            CipherEngine::Kuznechik(schedule) => {
                let block: [u8; 16] = input[..16].try_into().unwrap();
                output[..16].copy_from_slice(&schedule.decrypt_block(&block));
            }
        }
    }

    /// Mode prologue: the key must be assigned and intact.
    pub(crate) fn verify_usable(&self) -> Result<()> {
        if !self.skey.is_key_assigned() || self.engine.is_none() {
            return Err(CryptoError::KeyValue);
        }
        self.skey.verify_icode()
    }

    /// Mode epilogue: refresh the mask of the master key (the schedule
    /// masks are regenerated with every `set_key`).
    pub(crate) fn remask(&mut self) {
        self.skey.set_mask();
        if let Some(CipherEngine::Magma(schedule)) = self.engine.as_mut() {
            schedule.remask();
        }
    }

    pub(crate) fn clear_ivector(&mut self) {
        wipe(&mut self.ivector);
        self.ivector = [0u8; 64];
        self.ivector_len = 0;
        self.iv_slot = 0;
        self.skey.iv_ready = false;
    }
}

impl Drop for BlockCipherKey {
    fn drop(&mut self) {
        wipe(&mut self.ivector);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unassigned_key_is_unusable() {
        let key = BlockCipherKey::new_kuznechik(CipherByteOrder::Gost).unwrap();
        assert_eq!(key.verify_usable(), Err(CryptoError::KeyValue));
    }

    #[test]
    fn set_key_installs_block_resource() {
        let mut key = BlockCipherKey::new_magma(CipherByteOrder::Gost).unwrap();
        key.set_key(&[0x11; 32]).unwrap();
        assert_eq!(key.resource_counter(), options::get().magma_cipher_resource);
        assert_eq!(key.skey.resource.kind, ResourceKind::BlockCounter);
    }

    #[test]
    fn wrong_key_length_is_rejected() {
        let mut key = BlockCipherKey::new_magma(CipherByteOrder::Gost).unwrap();
        assert_eq!(key.set_key(&[0u8; 16]), Err(CryptoError::WrongLength));
    }

    #[test]
    fn name_lookup_checks_the_engine() {
        assert!(BlockCipherKey::new_by_name("grasshopper", CipherByteOrder::Gost).is_ok());
        assert_eq!(
            BlockCipherKey::new_by_name("streebog256", CipherByteOrder::Gost).unwrap_err(),
            CryptoError::OidEngine
        );
        assert_eq!(
            BlockCipherKey::new_by_name("ctr-magma", CipherByteOrder::Gost).unwrap_err(),
            CryptoError::OidMode
        );
    }
}
