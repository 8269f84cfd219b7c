//! Modes of operation over a block cipher key, following GOST R 34.13-2015.
//!
//! Every mode shares the same discipline: validate lengths, verify the
//! key's integrity code, consume the resource counter by the number of
//! processed blocks, run, and refresh the key mask before returning. On an
//! error path the key is left masked and intact; the contents of the
//! output buffer are unspecified.

use byteorder::{BigEndian, ByteOrder as _, LittleEndian};

use crate::bckey::{BlockCipherKey, CipherByteOrder, CipherKind};
use crate::error::{CryptoError, Result};
use crate::gf2n;
use crate::secret_key::wipe;

impl BlockCipherKey {
    /// Electronic codebook encryption. The input length must be a multiple
    /// of the block size; blocks are processed independently.
    pub fn encrypt_ecb(&mut self, input: &[u8], output: &mut [u8]) -> Result<()> {
        self.ecb(input, output, true)
    }

    /// Electronic codebook decryption.
    pub fn decrypt_ecb(&mut self, input: &[u8], output: &mut [u8]) -> Result<()> {
        self.ecb(input, output, false)
    }

    fn ecb(&mut self, input: &[u8], output: &mut [u8], forward: bool) -> Result<()> {
        let bsize = self.block_size();
        if input.is_empty() {
            return Err(CryptoError::ZeroLength);
        }
        if input.len() % bsize != 0 {
            return Err(CryptoError::WrongBlockCipherLength);
        }
        if output.len() != input.len() {
            return Err(CryptoError::WrongLength);
        }
        self.verify_usable()?;
        let blocks = input.len() / bsize;
        self.skey.decrease_resource(blocks as i64)?;

        for (src, dst) in input.chunks_exact(bsize).zip(output.chunks_exact_mut(bsize)) {
            if forward {
                self.encrypt_one(src, dst);
            } else {
                self.decrypt_one(src, dst);
            }
        }
        self.remask();
        Ok(())
    }

    /// Counter mode. The same function encrypts and decrypts.
    ///
    /// The initialization vector occupies the most significant half of one
    /// block (4 bytes for Magma, 8 for Kuznechik); the other half counts
    /// blocks. Passing `iv = None` continues with the counter value left in
    /// the key by a previous call, which is permitted only while every
    /// fragment processed so far was block-aligned. Processing a
    /// non-aligned tail closes the counter for further use.
    pub fn ctr(&mut self, input: &[u8], output: &mut [u8], iv: Option<&[u8]>) -> Result<()> {
        let bsize = self.block_size();
        if output.len() != input.len() {
            return Err(CryptoError::WrongLength);
        }
        self.verify_usable()?;

        let blocks = input.len() / bsize;
        let tail = input.len() % bsize;
        self.skey.decrease_resource((blocks + (tail > 0) as usize) as i64)?;

        match iv {
            None => {
                if !self.skey.iv_ready {
                    return Err(CryptoError::WrongBlockCipherFunction);
                }
            }
            Some(iv) => {
                let half = bsize >> 1;
                if iv.len() < half {
                    return Err(CryptoError::WrongIvLength);
                }
                self.ivector = [0u8; 64];
                self.ivector_len = bsize;
                // excess bytes of an overlong vector are simply unused
                let offset = match self.byte_order() {
                    CipherByteOrder::Gost => half,
                    CipherByteOrder::Openssl => 0,
                };
                self.ivector[offset..offset + half].copy_from_slice(&iv[..half]);
                self.skey.iv_ready = true;
            }
        }

        let order = self.byte_order();
        let mut gamma = [0u8; 16];
        match self.kind() {
            CipherKind::Magma => {
                let mut x = match order {
                    CipherByteOrder::Gost => LittleEndian::read_u64(&self.ivector[..8]),
                    CipherByteOrder::Openssl => BigEndian::read_u64(&self.ivector[..8]),
                };
                for (src, dst) in input
                    .chunks_exact(8)
                    .zip(output.chunks_exact_mut(8))
                    .take(blocks)
                {
                    let counter_block: [u8; 8] = self.ivector[..8].try_into().unwrap();
                    self.encrypt_one(&counter_block, &mut gamma[..8]);
                    for i in 0..8 {
                        dst[i] = src[i] ^ gamma[i];
                    }
                    x = x.wrapping_add(1);
                    match order {
                        CipherByteOrder::Gost => LittleEndian::write_u64(&mut self.ivector[..8], x),
                        CipherByteOrder::Openssl => BigEndian::write_u64(&mut self.ivector[..8], x),
                    }
                }
            }
            CipherKind::Kuznechik => {
                let mut x = match order {
                    CipherByteOrder::Gost => LittleEndian::read_u64(&self.ivector[..8]),
                    CipherByteOrder::Openssl => BigEndian::read_u64(&self.ivector[8..16]),
                };
                for (src, dst) in input
                    .chunks_exact(16)
                    .zip(output.chunks_exact_mut(16))
                    .take(blocks)
                {
                    let counter_block: [u8; 16] = self.ivector[..16].try_into().unwrap();
                    self.encrypt_one(&counter_block, &mut gamma[..16]);
                    for i in 0..16 {
                        dst[i] = src[i] ^ gamma[i];
                    }
                    // the carry out of the low half is not propagated: the
                    // data volume on one key never reaches 2^64 blocks,
                    // which the resource counter enforces
                    x = x.wrapping_add(1);
                    match order {
                        CipherByteOrder::Gost => LittleEndian::write_u64(&mut self.ivector[..8], x),
                        CipherByteOrder::Openssl => BigEndian::write_u64(&mut self.ivector[8..16], x),
                    }
                }
            }
        }

        if tail > 0 {
            let counter_block: [u8; 16] = self.ivector[..16].try_into().unwrap();
            self.encrypt_one(&counter_block[..bsize], &mut gamma[..bsize]);
            let src = &input[blocks * bsize..];
            let dst = &mut output[blocks * bsize..];
            for i in 0..tail {
                // the trailing bytes are gammed with the most significant
                // bytes of the last counter block; under the reversed
                // convention the leading bytes are used instead, which for
                // Magma does not coincide with what openssl produces
                let gi = match self.byte_order() {
                    CipherByteOrder::Gost => bsize - (tail - i),
                    CipherByteOrder::Openssl => i,
                };
                dst[i] = src[i] ^ gamma[gi];
            }
            self.clear_ivector();
        }

        self.remask();
        Ok(())
    }

    /// Cipher block chaining encryption. The initialization vector may span
    /// several blocks; the chain consumes them in turn before switching to
    /// ciphertext feedback.
    pub fn encrypt_cbc(&mut self, input: &[u8], output: &mut [u8], iv: &[u8]) -> Result<()> {
        let bsize = self.block_size();
        self.check_cbc_arguments(input, output, iv)?;
        let blocks = input.len() / bsize;
        self.skey.decrease_resource(blocks as i64)?;
        self.load_ivector(iv);

        let z = iv.len() / bsize;
        let mut mixed = [0u8; 16];
        for index in 0..blocks {
            let src = &input[index * bsize..(index + 1) * bsize];
            for i in 0..bsize {
                let prev = if index < z {
                    self.ivector[index * bsize + i]
                } else {
                    output[(index - z) * bsize + i]
                };
                mixed[i] = src[i] ^ prev;
            }
            let dst = &mut output[index * bsize..(index + 1) * bsize];
            self.encrypt_one(&mixed[..bsize], dst);
        }
        self.remask();
        Ok(())
    }

    /// Cipher block chaining decryption.
    pub fn decrypt_cbc(&mut self, input: &[u8], output: &mut [u8], iv: &[u8]) -> Result<()> {
        let bsize = self.block_size();
        self.check_cbc_arguments(input, output, iv)?;
        let blocks = input.len() / bsize;
        self.skey.decrease_resource(blocks as i64)?;
        self.load_ivector(iv);

        let z = iv.len() / bsize;
        let mut plain = [0u8; 16];
        for index in 0..blocks {
            let src = &input[index * bsize..(index + 1) * bsize];
            self.decrypt_one(src, &mut plain[..bsize]);
            let dst = &mut output[index * bsize..(index + 1) * bsize];
            for i in 0..bsize {
                let prev = if index < z {
                    self.ivector[index * bsize + i]
                } else {
                    input[(index - z) * bsize + i]
                };
                dst[i] = plain[i] ^ prev;
            }
        }
        self.remask();
        Ok(())
    }

    fn check_cbc_arguments(&self, input: &[u8], output: &[u8], iv: &[u8]) -> Result<()> {
        let bsize = self.block_size();
        if input.is_empty() {
            return Err(CryptoError::ZeroLength);
        }
        if input.len() % bsize != 0 {
            return Err(CryptoError::WrongBlockCipherLength);
        }
        if output.len() != input.len() {
            return Err(CryptoError::WrongLength);
        }
        if iv.len() < bsize || iv.len() % bsize != 0 || iv.len() > self.ivector.len() {
            return Err(CryptoError::WrongIvLength);
        }
        self.verify_usable()
    }

    /// Replaces the working vector. Whatever continuation state another
    /// mode left behind is invalidated.
    fn load_ivector(&mut self, iv: &[u8]) {
        self.ivector = [0u8; 64];
        self.ivector[..iv.len()].copy_from_slice(iv);
        self.ivector_len = iv.len();
        self.iv_slot = 0;
        self.skey.iv_ready = false;
    }

    /// Output feedback mode. Encryption and decryption coincide. The IV may
    /// span several blocks and the keystream cycles through them; `None`
    /// continues a previous block-aligned call, and a trailing fragment
    /// closes the vector for further continuation.
    pub fn ofb(&mut self, input: &[u8], output: &mut [u8], iv: Option<&[u8]>) -> Result<()> {
        self.feedback(input, output, iv, Feedback::Output)
    }

    /// Cipher feedback encryption: the produced ciphertext becomes the next
    /// feedback block.
    pub fn encrypt_cfb(&mut self, input: &[u8], output: &mut [u8], iv: Option<&[u8]>) -> Result<()> {
        self.feedback(input, output, iv, Feedback::CipherEncrypt)
    }

    /// Cipher feedback decryption: the consumed ciphertext (the input)
    /// becomes the next feedback block.
    pub fn decrypt_cfb(&mut self, input: &[u8], output: &mut [u8], iv: Option<&[u8]>) -> Result<()> {
        self.feedback(input, output, iv, Feedback::CipherDecrypt)
    }

    fn feedback(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        iv: Option<&[u8]>,
        kind: Feedback,
    ) -> Result<()> {
        let bsize = self.block_size();
        if output.len() != input.len() {
            return Err(CryptoError::WrongLength);
        }
        self.verify_usable()?;

        let blocks = input.len() / bsize;
        let tail = input.len() % bsize;
        self.skey.decrease_resource((blocks + (tail > 0) as usize) as i64)?;

        match iv {
            None => {
                if !self.skey.iv_ready || self.ivector_len == 0 {
                    return Err(CryptoError::WrongBlockCipherFunction);
                }
            }
            Some(iv) => {
                if iv.is_empty() || iv.len() % bsize != 0 || iv.len() > self.ivector.len() {
                    return Err(CryptoError::WrongIvLength);
                }
                self.load_ivector(iv);
                self.skey.iv_ready = true;
            }
        }

        let z = self.ivector_len / bsize;
        let mut gamma = [0u8; 16];
        for index in 0..blocks {
            let offset = self.iv_slot * bsize;
            let feedback_block: [u8; 16] = {
                let mut tmp = [0u8; 16];
                tmp[..bsize].copy_from_slice(&self.ivector[offset..offset + bsize]);
                tmp
            };
            self.encrypt_one(&feedback_block[..bsize], &mut gamma[..bsize]);
            let src = &input[index * bsize..(index + 1) * bsize];
            let dst = &mut output[index * bsize..(index + 1) * bsize];
            for i in 0..bsize {
                dst[i] = src[i] ^ gamma[i];
            }
            match kind {
                Feedback::Output => self.ivector[offset..offset + bsize].copy_from_slice(&gamma[..bsize]),
                Feedback::CipherEncrypt => self.ivector[offset..offset + bsize].copy_from_slice(dst),
                Feedback::CipherDecrypt => self.ivector[offset..offset + bsize].copy_from_slice(src),
            }
            self.iv_slot += 1;
            if self.iv_slot == z {
                self.iv_slot = 0;
            }
        }

        if tail > 0 {
            let offset = self.iv_slot * bsize;
            let feedback_block: [u8; 16] = {
                let mut tmp = [0u8; 16];
                tmp[..bsize].copy_from_slice(&self.ivector[offset..offset + bsize]);
                tmp
            };
            self.encrypt_one(&feedback_block[..bsize], &mut gamma[..bsize]);
            let src = &input[blocks * bsize..];
            let dst = &mut output[blocks * bsize..];
            for i in 0..tail {
                dst[i] = src[i] ^ gamma[i];
            }
            self.clear_ivector();
        }

        self.remask();
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum Feedback {
    Output,
    CipherEncrypt,
    CipherDecrypt,
}

/// XTS encryption with two independent keys of equal block size: `ekey`
/// encrypts the data units, `tkey` turns the caller's vector into the
/// initial tweak, and consecutive blocks multiply the tweak by the
/// primitive element of the matching field.
pub fn encrypt_xts(
    ekey: &mut BlockCipherKey,
    tkey: &mut BlockCipherKey,
    input: &[u8],
    output: &mut [u8],
    iv: &[u8],
) -> Result<()> {
    xts(ekey, tkey, input, output, iv, true)
}

/// XTS decryption.
pub fn decrypt_xts(
    ekey: &mut BlockCipherKey,
    tkey: &mut BlockCipherKey,
    input: &[u8],
    output: &mut [u8],
    iv: &[u8],
) -> Result<()> {
    xts(ekey, tkey, input, output, iv, false)
}

fn xts(
    ekey: &mut BlockCipherKey,
    tkey: &mut BlockCipherKey,
    input: &[u8],
    output: &mut [u8],
    iv: &[u8],
    forward: bool,
) -> Result<()> {
    let bsize = ekey.block_size();
    if tkey.block_size() != bsize {
        return Err(CryptoError::WrongBlockCipher);
    }
    if input.is_empty() {
        return Err(CryptoError::ZeroLength);
    }
    if input.len() % bsize != 0 {
        return Err(CryptoError::WrongBlockCipherLength);
    }
    if output.len() != input.len() {
        return Err(CryptoError::WrongLength);
    }
    if iv.len() != bsize {
        return Err(CryptoError::WrongIvLength);
    }
    ekey.verify_usable()?;
    tkey.verify_usable()?;

    let blocks = input.len() / bsize;
    ekey.skey.decrease_resource(blocks as i64)?;
    tkey.skey.decrease_resource(1)?;

    let mut tweak = [0u8; 16];
    tkey.encrypt_one(iv, &mut tweak[..bsize]);

    let mut mixed = [0u8; 16];
    for (src, dst) in input.chunks_exact(bsize).zip(output.chunks_exact_mut(bsize)) {
        for i in 0..bsize {
            mixed[i] = src[i] ^ tweak[i];
        }
        if forward {
            ekey.encrypt_one(&mixed[..bsize], dst);
        } else {
            ekey.decrypt_one(&mixed[..bsize], dst);
        }
        for i in 0..bsize {
            dst[i] ^= tweak[i];
        }
        match bsize {
            8 => {
                let t: [u8; 8] = tweak[..8].try_into().unwrap();
                tweak[..8].copy_from_slice(&gf2n::gf64_mul_bytes(&t, &2u64.to_le_bytes()));
            }
            _ => {
                let t: [u8; 16] = tweak;
                let mut alpha = [0u8; 16];
                alpha[0] = 0x02;
                tweak = gf2n::gf128_mul_bytes(&t, &alpha);
            }
        }
    }
    wipe(&mut tweak);
    ekey.remask();
    tkey.remask();
    Ok(())
}
