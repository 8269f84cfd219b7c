//! Key derivation: KDF_GOSTR3411_2012_256 (R 50.1.113-2016), the TLSTREE
//! pyramid (R 1323565.1.043-2022) and the sequence generator of
//! R 1323565.1.022-2018.

use byteorder::{BigEndian, ByteOrder as _};

use crate::bckey::{BlockCipherKey, CipherByteOrder};
use crate::error::{CryptoError, Result};
use crate::hmac::HmacKey;
use crate::options;
use crate::secret_key::wipe;

/* ------------------------------------------------------------------ */
/*                               KDF256                               */
/* ------------------------------------------------------------------ */

/// KDF256 over raw key bytes:
/// `K = HMAC256( Kin, 0x01 || label || 0x00 || seed || 0x01 || 0x00 )`.
pub fn derive_kdf256(
    master_key: &[u8],
    label: &[u8],
    seed: &[u8],
) -> Result<[u8; 32]> {
    let mut hmac = HmacKey::new_streebog256()?;
    hmac.set_key(master_key)?;

    hmac.clean()?;
    hmac.update(&[0x01])?;
    if !label.is_empty() {
        hmac.update(label)?;
    }
    hmac.update(&[0x00])?;
    if !seed.is_empty() {
        hmac.update(seed)?;
    }
    let digest = hmac.finalize(&[0x01, 0x00])?;
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..32]);
    Ok(out)
}

/// Access to the raw value of a master key for derivation purposes. The
/// implementations validate the integrity code, unmask for the duration
/// of the callback and leave the key freshly masked.
pub trait KdfMaster {
    fn with_key_value(
        &mut self,
        f: &mut dyn FnMut(&[u8]) -> Result<[u8; 32]>,
    ) -> Result<[u8; 32]>;
}

impl KdfMaster for BlockCipherKey {
    fn with_key_value(
        &mut self,
        f: &mut dyn FnMut(&[u8]) -> Result<[u8; 32]>,
    ) -> Result<[u8; 32]> {
        self.skey.verify_icode()?;
        let result = {
            let unmasked = self.skey.unmask();
            f(unmasked.bytes())
        };
        self.remask();
        result
    }
}

impl KdfMaster for HmacKey {
    fn with_key_value(
        &mut self,
        f: &mut dyn FnMut(&[u8]) -> Result<[u8; 32]>,
    ) -> Result<[u8; 32]> {
        let skey = self.secret_key_mut();
        skey.verify_icode()?;
        let result = {
            let unmasked = skey.unmask();
            f(unmasked.bytes())
        };
        skey.set_mask();
        result
    }
}

/// KDF256 with the master key taken from a key object, which keeps the
/// integrity and masking discipline intact. At least one of `label` and
/// `seed` must be non-empty.
pub fn derive_kdf256_from_key<K: KdfMaster>(
    master: &mut K,
    label: &[u8],
    seed: &[u8],
) -> Result<[u8; 32]> {
    if label.is_empty() && seed.is_empty() {
        return Err(CryptoError::ZeroLength);
    }
    master.with_key_value(&mut |key| derive_kdf256(key, label, seed))
}

/* ------------------------------------------------------------------ */
/*                               TLSTREE                              */
/* ------------------------------------------------------------------ */

/// Named window-mask triples of R 1323565.1.043-2022.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlstreePreset {
    KuznechikMgmS,
    KuznechikMgmL,
    MagmaMgmS,
    MagmaMgmL,
    Libakrypt256,
    Libakrypt4096,
}

struct TlstreeConstants {
    c1: u64,
    c2: u64,
    c3: u64,
}

const TLSTREE_CONSTANTS: [TlstreeConstants; 6] = [
    TlstreeConstants { c1: 0xf800000000000000, c2: 0xfffffff000000000, c3: 0xffffffffffffe000 },
    TlstreeConstants { c1: 0xffe0000000000000, c2: 0xffffffffc0000000, c3: 0xffffffffffffff80 },
    TlstreeConstants { c1: 0xffffffffe0000000, c2: 0xffffffffffff0000, c3: 0xfffffffffffffff8 },
    TlstreeConstants { c1: 0xfffffffffc000000, c2: 0xffffffffffffe000, c3: 0xffffffffffffffff },
    TlstreeConstants { c1: 0xfffffffffffff000, c2: 0xffffffffffffff00, c3: 0xffffffffffffffff },
    TlstreeConstants { c1: 0xffffffffffffff00, c2: 0xfffffffffffffff0, c3: 0xffffffffffffffff },
];

impl TlstreePreset {
    fn constants(self) -> &'static TlstreeConstants {
        &TLSTREE_CONSTANTS[self as usize]
    }
}

/// Cached state of the TLSTREE derivation: the master key and the three
/// intermediate keys, refreshed only when the masked index leaves the
/// window that produced them.
pub struct TlstreeState {
    /// `K_in || K1 || K2 || K3`, 32 bytes each.
    key: [u8; 128],
    key_number: u64,
    preset: TlstreePreset,
    ind1: u64,
    ind2: u64,
    ind3: u64,
}

impl TlstreeState {
    /// Builds the state for the given index, deriving all three levels.
    pub fn new(master_key: &[u8], index: u64, preset: TlstreePreset) -> Result<Self> {
        if master_key.is_empty() {
            return Err(CryptoError::ZeroLength);
        }
        let constants = preset.constants();
        let mut state = Self {
            key: [0u8; 128],
            key_number: index,
            preset,
            ind1: index & constants.c1,
            ind2: index & constants.c2,
            ind3: index & constants.c3,
        };
        let take = master_key.len().min(32);
        state.key[..take].copy_from_slice(&master_key[..take]);

        state.refresh_level(0, state.ind1)?;
        state.refresh_level(1, state.ind2)?;
        state.refresh_level(2, state.ind3)?;
        Ok(state)
    }

    /// Derives level `level + 1` from its parent key and the seed value.
    fn refresh_level(&mut self, level: usize, seed_value: u64) -> Result<()> {
        const LABELS: [&[u8]; 3] = [b"level1", b"level2", b"level3"];
        let seed = seed_value.to_be_bytes();
        let parent: [u8; 32] = self.key[32 * level..32 * level + 32].try_into().unwrap();
        let derived = derive_kdf256(&parent, LABELS[level], &seed)?;
        self.key[32 * (level + 1)..32 * (level + 2)].copy_from_slice(&derived);
        Ok(())
    }

    /// Advances to the next key index, recomputing only those levels
    /// whose masked index changed.
    pub fn next(&mut self) -> Result<()> {
        self.key_number += 1;
        let constants = self.preset.constants();

        let ind1 = self.key_number & constants.c1;
        if ind1 != self.ind1 {
            self.ind1 = ind1;
            self.refresh_level(0, ind1)?;
        }
        let ind2 = self.key_number & constants.c2;
        if ind2 != self.ind2 {
            self.ind2 = ind2;
            self.refresh_level(1, ind2)?;
        }
        let ind3 = self.key_number & constants.c3;
        if ind3 != self.ind3 {
            self.ind3 = ind3;
            self.refresh_level(2, ind3)?;
        }
        Ok(())
    }

    pub fn key_number(&self) -> u64 {
        self.key_number
    }

    /// The derived key of the current index.
    pub fn derived_key(&self) -> &[u8] {
        &self.key[96..128]
    }
}

impl Drop for TlstreeState {
    fn drop(&mut self) {
        wipe(&mut self.key);
    }
}

/// Stateless TLSTREE derivation:
/// `K = Divers3(Divers2(Divers1(Kin, Str8(i & C1)), Str8(i & C2)), Str8(i & C3))`.
pub fn derive_tlstree(master_key: &[u8], index: u64, preset: TlstreePreset) -> Result<[u8; 32]> {
    let state = TlstreeState::new(master_key, index, preset)?;
    let mut out = [0u8; 32];
    out.copy_from_slice(state.derived_key());
    Ok(out)
}

/// TLSTREE with the master key taken from a key object.
pub fn derive_tlstree_from_key<K: KdfMaster>(
    master: &mut K,
    index: u64,
    preset: TlstreePreset,
) -> Result<[u8; 32]> {
    master.with_key_value(&mut |key| derive_tlstree(key, index, preset))
}

/* ------------------------------------------------------------------ */
/*                          kdf state sequence                        */
/* ------------------------------------------------------------------ */

/// Derivation of the intermediate key `K*` from the input key and seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdfIntermediate {
    Nmac = 1,
    Hmac512 = 2,
    Xor = 3,
}

/// The MAC that chains the key sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdfMacFunction {
    CmacMagma = 1,
    CmacKuznechik = 2,
    HmacStreebog256 = 3,
    HmacStreebog512 = 4,
    NmacStreebog = 5,
}

/// The algorithm descriptor: the high nibble names the intermediate-key
/// derivation, the low nibble the chaining MAC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfAlgorithm {
    pub intermediate: KdfIntermediate,
    pub mac: KdfMacFunction,
}

impl KdfAlgorithm {
    pub fn descriptor(self) -> u8 {
        ((self.intermediate as u8) << 4) | self.mac as u8
    }

    pub fn from_descriptor(value: u8) -> Result<Self> {
        let intermediate = match (value >> 4) & 0xF {
            1 => KdfIntermediate::Nmac,
            2 => KdfIntermediate::Hmac512,
            3 => KdfIntermediate::Xor,
            _ => return Err(CryptoError::InvalidValue),
        };
        let mac = match value & 0xF {
            1 => KdfMacFunction::CmacMagma,
            2 => KdfMacFunction::CmacKuznechik,
            3 => KdfMacFunction::HmacStreebog256,
            4 => KdfMacFunction::HmacStreebog512,
            5 => KdfMacFunction::NmacStreebog,
            _ => return Err(CryptoError::InvalidValue),
        };
        Ok(Self { intermediate, mac })
    }
}

#[derive(Debug)]
enum KdfMacKey {
    Cipher(BlockCipherKey),
    Hmac(HmacKey),
}

const KDF_STATE_BUFFER: usize = 160;

/// The sequence generator: emits keying blocks
/// `K_i = MAC( K*, K_{i-1} || i || label || L )` and serves arbitrary
/// caller-chosen lengths from them.
pub struct KdfState {
    algorithm: KdfAlgorithm,
    block_size: usize,
    state_size: usize,
    /// `K_{i-1} || counter(8) || label || L(8)`; the counters are written
    /// big-endian.
    ivbuffer: [u8; KDF_STATE_BUFFER],
    number: u64,
    max: u64,
    key: KdfMacKey,
}

impl std::fmt::Debug for KdfState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KdfState")
            .field("algorithm", &self.algorithm)
            .field("block_size", &self.block_size)
            .field("state_size", &self.state_size)
            .field("number", &self.number)
            .field("max", &self.max)
            .field("key", &self.key)
            .finish()
    }
}

impl KdfState {
    /// Derives the intermediate key and prepares the format string. The
    /// configured maximum of derivable blocks must stay within the global
    /// resource ceiling of the chaining MAC.
    pub fn new(
        key: &[u8],
        algorithm: KdfAlgorithm,
        label: &[u8],
        seed: &[u8],
        iv: &[u8],
        count: u64,
    ) -> Result<Self> {
        if key.is_empty() || seed.is_empty() {
            return Err(CryptoError::ZeroLength);
        }

        // the intermediate key K*
        let mut interkey = [0u8; 32];
        match algorithm.intermediate {
            KdfIntermediate::Nmac => {
                let mut hmac = HmacKey::new_nmac()?;
                hmac.set_key(seed)?;
                let digest = hmac.hmac(key)?;
                interkey.copy_from_slice(&digest[..32]);
            }
            KdfIntermediate::Hmac512 => {
                let mut hmac = HmacKey::new_streebog512()?;
                hmac.set_key(seed)?;
                let digest = hmac.hmac(key)?;
                interkey.copy_from_slice(&digest[..32]);
            }
            KdfIntermediate::Xor => {
                if key.len() != 32 || seed.len() != 32 {
                    return Err(CryptoError::WrongLength);
                }
                for i in 0..32 {
                    interkey[i] = key[i] ^ seed[i];
                }
            }
        }

        let opts = options::get();
        let block_size = match algorithm.mac {
            KdfMacFunction::CmacMagma => 8,
            KdfMacFunction::CmacKuznechik => 16,
            KdfMacFunction::HmacStreebog256 | KdfMacFunction::NmacStreebog => 32,
            KdfMacFunction::HmacStreebog512 => 64,
        };
        // running MAC value + key counter + label + total length field
        let state_size = (block_size + label.len() + 16).min(KDF_STATE_BUFFER);

        let within_budget = match algorithm.mac {
            KdfMacFunction::CmacMagma => count
                .checked_mul(1 + (state_size / block_size) as u64)
                .is_some_and(|v| v <= opts.magma_cipher_resource as u64),
            KdfMacFunction::CmacKuznechik => count
                .checked_mul(1 + (state_size / block_size) as u64)
                .is_some_and(|v| v <= opts.kuznechik_cipher_resource as u64),
            _ => count
                .checked_mul(2)
                .is_some_and(|v| v <= opts.hmac_key_count_resource as u64),
        };
        if !within_budget {
            wipe(&mut interkey);
            return Err(CryptoError::LowKeyResource);
        }

        let mac_key = match algorithm.mac {
            KdfMacFunction::CmacMagma => {
                let mut bkey = BlockCipherKey::new_magma(CipherByteOrder::Gost)?;
                bkey.set_key(&interkey)?;
                KdfMacKey::Cipher(bkey)
            }
            KdfMacFunction::CmacKuznechik => {
                let mut bkey = BlockCipherKey::new_kuznechik(CipherByteOrder::Gost)?;
                bkey.set_key(&interkey)?;
                KdfMacKey::Cipher(bkey)
            }
            KdfMacFunction::HmacStreebog256 => {
                let mut hkey = HmacKey::new_streebog256()?;
                hkey.set_key(&interkey)?;
                KdfMacKey::Hmac(hkey)
            }
            KdfMacFunction::HmacStreebog512 => {
                let mut hkey = HmacKey::new_streebog512()?;
                hkey.set_key(&interkey)?;
                KdfMacKey::Hmac(hkey)
            }
            KdfMacFunction::NmacStreebog => {
                let mut hkey = HmacKey::new_nmac()?;
                hkey.set_key(&interkey)?;
                KdfMacKey::Hmac(hkey)
            }
        };
        wipe(&mut interkey);

        // the format string: K_0 (the caller's vector or zeroes), the key
        // counter, the label and the total length of the output
        let mut ivbuffer = [0u8; KDF_STATE_BUFFER];
        if !iv.is_empty() {
            let take = iv.len().min(block_size);
            ivbuffer[..take].copy_from_slice(&iv[..take]);
        }
        let label_take = label.len().min(KDF_STATE_BUFFER - block_size - 16);
        ivbuffer[block_size + 8..block_size + 8 + label_take]
            .copy_from_slice(&label[..label_take]);
        BigEndian::write_u64(
            &mut ivbuffer[block_size + 8 + label_take..block_size + 16 + label_take],
            count * block_size as u64,
        );

        Ok(Self {
            algorithm,
            block_size,
            state_size,
            ivbuffer,
            number: 0,
            max: count,
            key: mac_key,
        })
    }

    pub fn algorithm(&self) -> KdfAlgorithm {
        self.algorithm
    }

    /// Length of one internal keying block in bytes.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Fills `buffer` with the next portion of the key sequence. The
    /// request may span several internal blocks; the trailing block is
    /// truncated to the remaining length.
    pub fn next(&mut self, buffer: &mut [u8]) -> Result<()> {
        if buffer.is_empty() {
            return Err(CryptoError::ZeroLength);
        }
        let count = buffer.len() / self.block_size;
        let tail = buffer.len() - count * self.block_size;

        if self.number + count as u64 + (tail > 0) as u64 >= self.max {
            return Err(CryptoError::LowKeyResource);
        }
        let stored = BigEndian::read_u64(&self.ivbuffer[self.block_size..self.block_size + 8]);
        if stored != self.number {
            return Err(CryptoError::InvalidValue);
        }

        let mut offset = 0;
        for _ in 0..count {
            self.step()?;
            buffer[offset..offset + self.block_size]
                .copy_from_slice(&self.ivbuffer[..self.block_size]);
            offset += self.block_size;
        }
        if tail > 0 {
            self.step()?;
            buffer[offset..].copy_from_slice(&self.ivbuffer[..tail]);
        }
        Ok(())
    }

    /// One chaining step: bump the counter and overwrite `K_{i-1}` with
    /// `MAC(K*, format)`.
    fn step(&mut self) -> Result<()> {
        self.number += 1;
        BigEndian::write_u64(
            &mut self.ivbuffer[self.block_size..self.block_size + 8],
            self.number,
        );
        let format = self.ivbuffer[..self.state_size].to_vec();
        let block = match &mut self.key {
            KdfMacKey::Cipher(bkey) => bkey.cmac(&format, self.block_size)?,
            KdfMacKey::Hmac(hkey) => hkey.hmac(&format)?,
        };
        self.ivbuffer[..self.block_size].copy_from_slice(&block[..self.block_size]);
        Ok(())
    }
}

impl Drop for KdfState {
    fn drop(&mut self) {
        wipe(&mut self.ivbuffer);
    }
}
