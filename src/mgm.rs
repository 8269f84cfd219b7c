//! Multilinear Galois Mode, the single-pass authenticated encryption of
//! R 1323565.1.026-2019.
//!
//! Two block-wide counters drive the mode. The authentication counter
//! starts from E(IV with the most significant bit forced to 1) and
//! increments its most significant half once per processed block; the
//! encryption counter starts from E(IV with that bit forced to 0) and
//! increments its least significant half. The tag accumulates
//! E(zcount) · X over GF(2^64) or GF(2^128) for every authenticated
//! block X, absorbs the lengths block and leaves through one more
//! encryption.
//!
//! Encryption and authentication may use one key or two independent keys
//! of the same block size; either role may also be dropped entirely.

use zeroize::Zeroize;

use crate::bckey::BlockCipherKey;
use crate::error::{CryptoError, Result};
use crate::gf2n;

/// Internal state of one MGM computation.
#[derive(Debug)]
pub struct MgmContext {
    sum: [u8; 16],
    ycount: [u8; 16],
    zcount: [u8; 16],
    abitlen: u64,
    pbitlen: u64,
    ad_closed: bool,
    data_closed: bool,
}

/// How an encryption-side call authenticates.
pub enum MgmAuth<'a> {
    /// No authentication, encryption only.
    None,
    /// The encryption key doubles as the authentication key.
    SameKey,
    /// An independent authentication key.
    Key(&'a mut BlockCipherKey),
}

impl MgmContext {
    pub fn new() -> Self {
        Self {
            sum: [0u8; 16],
            ycount: [0u8; 16],
            zcount: [0u8; 16],
            abitlen: 0,
            pbitlen: 0,
            ad_closed: false,
            data_closed: false,
        }
    }

    /// Initializes the authentication counter. The caller's vector is
    /// truncated or zero-extended to one block and its most significant
    /// bit is forced to one before the defining encryption.
    pub fn auth_clean(&mut self, akey: &mut BlockCipherKey, iv: &[u8]) -> Result<()> {
        if iv.is_empty() {
            return Err(CryptoError::ZeroLength);
        }
        akey.verify_usable()?;
        akey.skey.decrease_resource(1)?;
        let bsize = akey.block_size();

        self.abitlen = 0;
        self.pbitlen = 0;
        self.ad_closed = false;
        self.data_closed = false;
        self.sum = [0u8; 16];
        self.zcount = [0u8; 16];

        let mut ivector = [0u8; 16];
        let take = iv.len().min(bsize);
        ivector[..take].copy_from_slice(&iv[..take]);
        ivector[bsize - 1] = (ivector[bsize - 1] & 0x7F) ^ 0x80;
        akey.encrypt_one(&ivector[..bsize], &mut self.zcount[..bsize]);
        ivector.zeroize();
        akey.remask();
        Ok(())
    }

    /// Initializes the encryption counter; the most significant bit of the
    /// vector is forced to zero. The associated-data phase survives, the
    /// plaintext length restarts.
    pub fn enc_clean(&mut self, ekey: &mut BlockCipherKey, iv: &[u8]) -> Result<()> {
        if iv.is_empty() {
            return Err(CryptoError::ZeroLength);
        }
        ekey.verify_usable()?;
        ekey.skey.decrease_resource(1)?;
        let bsize = ekey.block_size();

        self.pbitlen = 0;
        self.data_closed = false;
        self.ycount = [0u8; 16];

        let mut ivector = [0u8; 16];
        let take = iv.len().min(bsize);
        ivector[..take].copy_from_slice(&iv[..take]);
        ivector[bsize - 1] &= 0x7F;
        ekey.encrypt_one(&ivector[..bsize], &mut self.ycount[..bsize]);
        ivector.zeroize();
        ekey.remask();
        Ok(())
    }

    /// One authentication step: fold E(zcount)·X into the running tag and
    /// advance the most significant half of the counter.
    fn astep(&mut self, akey: &BlockCipherKey, data: &[u8]) {
        let bsize = akey.block_size();
        let mut h = [0u8; 16];
        let zin = self.zcount;
        akey.encrypt_one(&zin[..bsize], &mut h[..bsize]);
        if bsize == 16 {
            let block: [u8; 16] = data[..16].try_into().unwrap();
            let product = gf2n::gf128_mul_bytes(&h, &block);
            for i in 0..16 {
                self.sum[i] ^= product[i];
            }
            let high = u64::from_le_bytes(self.zcount[8..16].try_into().unwrap()).wrapping_add(1);
            self.zcount[8..16].copy_from_slice(&high.to_le_bytes());
        } else {
            let hh: [u8; 8] = h[..8].try_into().unwrap();
            let block: [u8; 8] = data[..8].try_into().unwrap();
            let product = gf2n::gf64_mul_bytes(&hh, &block);
            for i in 0..8 {
                self.sum[i] ^= product[i];
            }
            let high = u32::from_le_bytes(self.zcount[4..8].try_into().unwrap()).wrapping_add(1);
            self.zcount[4..8].copy_from_slice(&high.to_le_bytes());
        }
    }

    /// One encryption step: gamma the block with E(ycount) and advance the
    /// least significant half of the counter.
    fn estep(&mut self, ekey: &BlockCipherKey, src: &[u8], dst: &mut [u8]) {
        let bsize = ekey.block_size();
        let mut e = [0u8; 16];
        let yin = self.ycount;
        ekey.encrypt_one(&yin[..bsize], &mut e[..bsize]);
        for i in 0..bsize {
            dst[i] = src[i] ^ e[i];
        }
        if bsize == 16 {
            let low = u64::from_le_bytes(self.ycount[..8].try_into().unwrap()).wrapping_add(1);
            self.ycount[..8].copy_from_slice(&low.to_le_bytes());
        } else {
            let low = u32::from_le_bytes(self.ycount[..4].try_into().unwrap()).wrapping_add(1);
            self.ycount[..4].copy_from_slice(&low.to_le_bytes());
        }
    }

    /// Feeds associated data. May be called repeatedly while each fragment
    /// is block-aligned; the first trailing fragment closes the phase. The
    /// trailing bytes are authenticated high-aligned in a zero block.
    pub fn auth_update(&mut self, akey: &mut BlockCipherKey, adata: &[u8]) -> Result<()> {
        if self.ad_closed {
            return Err(CryptoError::WrongBlockCipherFunction);
        }
        if adata.is_empty() {
            return Ok(());
        }
        akey.verify_usable()?;
        let bsize = akey.block_size();
        let blocks = adata.len() / bsize;
        let tail = adata.len() % bsize;
        akey.skey.decrease_resource((blocks + (tail > 0) as usize) as i64)?;

        self.abitlen += (blocks * bsize * 8) as u64;
        for block in adata.chunks_exact(bsize) {
            self.astep(akey, block);
        }
        if tail > 0 {
            let mut temp = [0u8; 16];
            temp[bsize - tail..bsize].copy_from_slice(&adata[blocks * bsize..]);
            self.astep(akey, &temp[..bsize]);
            self.ad_closed = true;
            self.abitlen += (tail * 8) as u64;
        }
        akey.remask();
        Ok(())
    }

    /// Encrypts the next plaintext fragment, folding the produced
    /// ciphertext into the tag. The first call closes the associated-data
    /// phase; a trailing fragment closes the whole input.
    pub fn enc_update(
        &mut self,
        ekey: &mut BlockCipherKey,
        mut auth: MgmAuth<'_>,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<()> {
        self.ad_closed = true;
        self.xcrypt_update(ekey, &mut auth, input, output, true)
    }

    /// Decrypts the next ciphertext fragment. The tag absorbs the
    /// ciphertext before the plaintext is released.
    pub fn dec_update(
        &mut self,
        ekey: &mut BlockCipherKey,
        mut auth: MgmAuth<'_>,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<()> {
        self.ad_closed = true;
        self.xcrypt_update(ekey, &mut auth, input, output, false)
    }

    fn xcrypt_update(
        &mut self,
        ekey: &mut BlockCipherKey,
        auth: &mut MgmAuth<'_>,
        input: &[u8],
        output: &mut [u8],
        forward: bool,
    ) -> Result<()> {
        if self.data_closed {
            return Err(CryptoError::WrongBlockCipherFunction);
        }
        if input.is_empty() {
            return Ok(());
        }
        if output.len() != input.len() {
            return Err(CryptoError::WrongLength);
        }
        ekey.verify_usable()?;

        let bsize = ekey.block_size();
        let blocks = input.len() / bsize;
        let tail = input.len() % bsize;
        let units = (blocks + (tail > 0) as usize) as i64;

        match auth {
            MgmAuth::None => ekey.skey.decrease_resource(units)?,
            MgmAuth::SameKey => ekey.skey.decrease_resource(2 * units)?,
            MgmAuth::Key(akey) => {
                akey.verify_usable()?;
                if akey.block_size() != bsize {
                    return Err(CryptoError::WrongBlockCipher);
                }
                akey.skey.decrease_resource(units)?;
                ekey.skey.decrease_resource(units)?;
            }
        }

        self.pbitlen += (blocks * bsize * 8) as u64;
        for index in 0..blocks {
            let src = &input[index * bsize..(index + 1) * bsize];
            let dst = &mut output[index * bsize..(index + 1) * bsize];
            if forward {
                self.estep(ekey, src, dst);
                match auth {
                    MgmAuth::None => {}
                    MgmAuth::SameKey => {
                        let cipher: [u8; 16] = pad_block(dst, bsize);
                        self.astep(ekey, &cipher[..bsize]);
                    }
                    MgmAuth::Key(akey) => {
                        let cipher: [u8; 16] = pad_block(dst, bsize);
                        self.astep(akey, &cipher[..bsize]);
                    }
                }
            } else {
                match auth {
                    MgmAuth::None => {}
                    MgmAuth::SameKey => self.astep_owned(ekey, src, bsize),
                    MgmAuth::Key(akey) => self.astep_owned(akey, src, bsize),
                }
                self.estep(ekey, src, dst);
            }
        }

        if tail > 0 {
            let src = &input[blocks * bsize..];
            let dst = &mut output[blocks * bsize..];

            if !forward {
                // authenticate the ciphertext fragment before decrypting
                let mut temp = [0u8; 16];
                temp[bsize - tail..bsize].copy_from_slice(src);
                match auth {
                    MgmAuth::None => {}
                    MgmAuth::SameKey => self.astep(ekey, &temp[..bsize]),
                    MgmAuth::Key(akey) => self.astep(akey, &temp[..bsize]),
                }
            }

            let mut e = [0u8; 16];
            let yin = self.ycount;
            ekey.encrypt_one(&yin[..bsize], &mut e[..bsize]);
            for i in 0..tail {
                dst[i] = src[i] ^ e[bsize - tail + i];
            }

            if forward {
                let mut temp = [0u8; 16];
                temp[bsize - tail..bsize].copy_from_slice(dst);
                match auth {
                    MgmAuth::None => {}
                    MgmAuth::SameKey => self.astep(ekey, &temp[..bsize]),
                    MgmAuth::Key(akey) => self.astep(akey, &temp[..bsize]),
                }
            }

            self.data_closed = true;
            self.pbitlen += (tail * 8) as u64;
        }

        ekey.remask();
        if let MgmAuth::Key(akey) = auth {
            akey.remask();
        }
        Ok(())
    }

    fn astep_owned(&mut self, key: &BlockCipherKey, src: &[u8], bsize: usize) {
        let block = pad_block(src, bsize);
        self.astep(key, &block[..bsize]);
    }

    /// Closes the computation: authenticates the lengths block, encrypts
    /// the accumulated sum and returns the requested number of the most
    /// significant tag bytes.
    pub fn auth_finalize(&mut self, akey: &mut BlockCipherKey, out_len: usize) -> Result<Vec<u8>> {
        if out_len == 0 {
            return Err(CryptoError::ZeroLength);
        }
        akey.verify_usable()?;
        akey.skey.decrease_resource(1)?;
        let bsize = akey.block_size();

        self.data_closed = true;

        let mut temp = [0u8; 16];
        if bsize == 16 {
            temp[..8].copy_from_slice(&self.pbitlen.to_le_bytes());
            temp[8..16].copy_from_slice(&self.abitlen.to_le_bytes());
            self.astep(akey, &temp[..16]);
        } else {
            if self.abitlen > u64::from(u32::MAX) || self.pbitlen > u64::from(u32::MAX) {
                return Err(CryptoError::Overflow);
            }
            temp[..4].copy_from_slice(&(self.pbitlen as u32).to_le_bytes());
            temp[4..8].copy_from_slice(&(self.abitlen as u32).to_le_bytes());
            self.astep(akey, &temp[..8]);
        }

        let fed = self.sum;
        let mut tag_block = [0u8; 16];
        akey.encrypt_one(&fed[..bsize], &mut tag_block[..bsize]);
        self.sum[..bsize].copy_from_slice(&tag_block[..bsize]);

        let take = out_len.min(bsize);
        let offset = if out_len >= bsize { 0 } else { bsize - out_len };
        let tag = self.sum[offset..offset + take].to_vec();
        akey.remask();
        Ok(tag)
    }
}

impl Default for MgmContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MgmContext {
    fn drop(&mut self) {
        self.sum.zeroize();
        self.ycount.zeroize();
        self.zcount.zeroize();
    }
}

#[inline]
fn pad_block(data: &[u8], bsize: usize) -> [u8; 16] {
    let mut block = [0u8; 16];
    block[..bsize].copy_from_slice(&data[..bsize]);
    block
}

/// Checks the MGM length bounds: the associated data, the plaintext and
/// their sum must each fit in half a block of bits.
fn check_mgm_lengths(adata_len: usize, size: usize, bsize: usize) -> Result<()> {
    let aval = (adata_len as u64).checked_mul(8).ok_or(CryptoError::WrongLength)?;
    let pval = (size as u64).checked_mul(8).ok_or(CryptoError::WrongLength)?;
    let total = aval.checked_add(pval).ok_or(CryptoError::WrongLength)?;
    if bsize != 16 {
        let bound = 0x0000_0001_0000_0000u64;
        if aval > bound || pval > bound || total > bound {
            return Err(CryptoError::WrongLength);
        }
    }
    Ok(())
}

/// Key roles of a one-shot MGM call.
pub enum MgmKeys<'a> {
    /// One key both encrypts and authenticates.
    Single(&'a mut BlockCipherKey),
    /// Independent keys of equal block size.
    Pair {
        encryption: &'a mut BlockCipherKey,
        authentication: &'a mut BlockCipherKey,
    },
    /// Encryption without a tag; associated data must be empty.
    EncryptOnly(&'a mut BlockCipherKey),
    /// A tag over associated data only; nothing is encrypted.
    AuthOnly(&'a mut BlockCipherKey),
}

impl MgmKeys<'_> {
    fn block_size(&self) -> usize {
        match self {
            MgmKeys::Single(k) | MgmKeys::EncryptOnly(k) | MgmKeys::AuthOnly(k) => k.block_size(),
            MgmKeys::Pair { encryption, .. } => encryption.block_size(),
        }
    }

    fn check(&self) -> Result<()> {
        if let MgmKeys::Pair { encryption, authentication } = self {
            if encryption.block_size() != authentication.block_size() {
                return Err(CryptoError::NotEqualData);
            }
        }
        Ok(())
    }
}

/// One-shot authenticated encryption. Ciphertext lands in `output`, the
/// tag of `tag_len` bytes is returned (empty for `EncryptOnly`).
pub fn encrypt_mgm(
    keys: MgmKeys<'_>,
    adata: &[u8],
    input: &[u8],
    output: &mut [u8],
    iv: &[u8],
    tag_len: usize,
) -> Result<Vec<u8>> {
    keys.check()?;
    check_mgm_lengths(adata.len(), input.len(), keys.block_size())?;

    let mut ctx = MgmContext::new();
    match keys {
        MgmKeys::AuthOnly(akey) => {
            if !input.is_empty() || !output.is_empty() {
                return Err(CryptoError::WrongLength);
            }
            ctx.auth_clean(akey, iv)?;
            ctx.auth_update(akey, adata)?;
            ctx.auth_finalize(akey, tag_len)
        }
        MgmKeys::EncryptOnly(ekey) => {
            if !adata.is_empty() {
                return Err(CryptoError::WrongLength);
            }
            ctx.enc_clean(ekey, iv)?;
            ctx.enc_update(ekey, MgmAuth::None, input, output)?;
            Ok(Vec::new())
        }
        MgmKeys::Single(key) => {
            ctx.auth_clean(key, iv)?;
            ctx.auth_update(key, adata)?;
            ctx.enc_clean(key, iv)?;
            ctx.enc_update(key, MgmAuth::SameKey, input, output)?;
            ctx.auth_finalize(key, tag_len)
        }
        MgmKeys::Pair { encryption, authentication } => {
            ctx.auth_clean(authentication, iv)?;
            ctx.auth_update(authentication, adata)?;
            ctx.enc_clean(encryption, iv)?;
            ctx.enc_update(encryption, MgmAuth::Key(authentication), input, output)?;
            ctx.auth_finalize(authentication, tag_len)
        }
    }
}

/// One-shot authenticated decryption. The tag is recomputed over the
/// ciphertext before the plaintext is considered released; a mismatch
/// yields `NotEqualData` and the output buffer contents are unspecified.
pub fn decrypt_mgm(
    keys: MgmKeys<'_>,
    adata: &[u8],
    input: &[u8],
    output: &mut [u8],
    iv: &[u8],
    tag: &[u8],
) -> Result<()> {
    keys.check()?;
    check_mgm_lengths(adata.len(), input.len(), keys.block_size())?;

    let mut ctx = MgmContext::new();
    let computed = match keys {
        MgmKeys::AuthOnly(akey) => {
            if !input.is_empty() || !output.is_empty() {
                return Err(CryptoError::WrongLength);
            }
            ctx.auth_clean(akey, iv)?;
            ctx.auth_update(akey, adata)?;
            ctx.auth_finalize(akey, tag.len())?
        }
        MgmKeys::EncryptOnly(ekey) => {
            if !adata.is_empty() {
                return Err(CryptoError::WrongLength);
            }
            ctx.enc_clean(ekey, iv)?;
            ctx.dec_update(ekey, MgmAuth::None, input, output)?;
            return Ok(());
        }
        MgmKeys::Single(key) => {
            ctx.auth_clean(key, iv)?;
            ctx.auth_update(key, adata)?;
            ctx.enc_clean(key, iv)?;
            ctx.dec_update(key, MgmAuth::SameKey, input, output)?;
            ctx.auth_finalize(key, tag.len())?
        }
        MgmKeys::Pair { encryption, authentication } => {
            ctx.auth_clean(authentication, iv)?;
            ctx.auth_update(authentication, adata)?;
            ctx.enc_clean(encryption, iv)?;
            ctx.dec_update(encryption, MgmAuth::Key(authentication), input, output)?;
            ctx.auth_finalize(authentication, tag.len())?
        }
    };

    if tag.is_empty() || computed != tag {
        return Err(CryptoError::NotEqualData);
    }
    Ok(())
}
