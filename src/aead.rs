//! The unified authenticated-encryption interface: MGM and the composites
//! of counter-mode encryption with CMAC, HMAC or NMAC authentication.
//!
//! An [`Aead`] object owns its keys and exposes a one-shot surface and the
//! streaming clean/update/finalize sequence. For the composites the
//! authentication covers the associated data followed by the plaintext;
//! on decryption the plaintext is recovered before the tag is verified,
//! so callers must discard the output whenever `NotEqualData` comes back.

use crate::bckey::{BlockCipherKey, CipherByteOrder, CipherKind};
use crate::cmac::CmacContext;
use crate::error::{CryptoError, Result};
use crate::hmac::HmacKey;
use crate::mac::MacStream;
use crate::mgm::{MgmAuth, MgmContext};
use crate::oid::{self, Oid, OidMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AeadKind {
    Mgm,
    CtrCmac,
    CtrHmac,
}

/// An authenticated-encryption scheme instance with its key material.
#[derive(Debug)]
pub struct Aead {
    oid: &'static Oid,
    kind: AeadKind,
    cipher: CipherKind,
    order: CipherByteOrder,
    encryption_key: Option<BlockCipherKey>,
    auth_cipher_key: Option<BlockCipherKey>,
    auth_hmac_key: Option<HmacKey>,
    mgm: MgmContext,
    cmac: CmacContext,
    stream: MacStream,
    tag_size: usize,
    block_size: usize,
    iv_size: usize,
}

impl Aead {
    /// Creates a scheme instance by any registered name. With
    /// `with_encryption = false` only the authentication half is set up
    /// and the object produces bare integrity codes.
    pub fn new_by_name(
        name: &str,
        with_encryption: bool,
        order: CipherByteOrder,
    ) -> Result<Self> {
        Self::build(oid::find_by_name(name)?, with_encryption, order)
    }

    /// Creates a scheme instance by its dotted identifier.
    pub fn new_by_id(id: &str, with_encryption: bool, order: CipherByteOrder) -> Result<Self> {
        Self::build(oid::find_by_id(id)?, with_encryption, order)
    }

    fn build(entry: &'static Oid, with_encryption: bool, order: CipherByteOrder) -> Result<Self> {
        if entry.mode != OidMode::Aead {
            return Err(CryptoError::OidMode);
        }
        let canonical = entry.names[0];
        let (kind, cipher, hmac) = match canonical {
            "mgm-magma" => (AeadKind::Mgm, CipherKind::Magma, None),
            "mgm-kuznechik" => (AeadKind::Mgm, CipherKind::Kuznechik, None),
            "ctr-cmac-magma" => (AeadKind::CtrCmac, CipherKind::Magma, None),
            "ctr-cmac-kuznechik" => (AeadKind::CtrCmac, CipherKind::Kuznechik, None),
            "ctr-hmac-magma-streebog256" => {
                (AeadKind::CtrHmac, CipherKind::Magma, Some(HmacKey::new_streebog256()?))
            }
            "ctr-hmac-magma-streebog512" => {
                (AeadKind::CtrHmac, CipherKind::Magma, Some(HmacKey::new_streebog512()?))
            }
            "ctr-nmac-magma" => (AeadKind::CtrHmac, CipherKind::Magma, Some(HmacKey::new_nmac()?)),
            "ctr-hmac-kuznechik-streebog256" => {
                (AeadKind::CtrHmac, CipherKind::Kuznechik, Some(HmacKey::new_streebog256()?))
            }
            "ctr-hmac-kuznechik-streebog512" => {
                (AeadKind::CtrHmac, CipherKind::Kuznechik, Some(HmacKey::new_streebog512()?))
            }
            "ctr-nmac-kuznechik" => {
                (AeadKind::CtrHmac, CipherKind::Kuznechik, Some(HmacKey::new_nmac()?))
            }
            _ => return Err(CryptoError::UnknownOid),
        };

        let block_size = cipher.block_size();
        let new_cipher_key = |kind: CipherKind| -> Result<BlockCipherKey> {
            match kind {
                CipherKind::Magma => BlockCipherKey::new_magma(order),
                CipherKind::Kuznechik => BlockCipherKey::new_kuznechik(order),
            }
        };

        let encryption_key = if with_encryption { Some(new_cipher_key(cipher)?) } else { None };
        let auth_cipher_key = match kind {
            AeadKind::Mgm | AeadKind::CtrCmac => Some(new_cipher_key(cipher)?),
            AeadKind::CtrHmac => None,
        };

        let (tag_size, mac_block) = match (kind, &hmac) {
            (AeadKind::CtrHmac, Some(key)) => (key.tag_size(), key.block_size()),
            _ => (block_size, block_size),
        };
        let iv_size = match kind {
            AeadKind::Mgm => block_size,
            _ => {
                if with_encryption {
                    block_size >> 1
                } else {
                    0
                }
            }
        };

        Ok(Self {
            oid: entry,
            kind,
            cipher,
            order,
            encryption_key,
            auth_cipher_key,
            auth_hmac_key: hmac,
            mgm: MgmContext::new(),
            cmac: CmacContext::new(),
            stream: MacStream::new(mac_block)?,
            tag_size,
            block_size,
            iv_size,
        })
    }

    pub fn oid(&self) -> &'static Oid {
        self.oid
    }

    pub fn cipher(&self) -> CipherKind {
        self.cipher
    }

    pub fn byte_order(&self) -> CipherByteOrder {
        self.order
    }

    /// Size of the produced integrity code in bytes.
    pub fn tag_size(&self) -> usize {
        self.tag_size
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Expected length of the initialization vector in bytes.
    pub fn iv_size(&self) -> usize {
        self.iv_size
    }

    /// Assigns the encryption key value.
    pub fn set_encryption_key(&mut self, value: &[u8]) -> Result<()> {
        match self.encryption_key.as_mut() {
            Some(key) => key.set_key(value),
            None => Err(CryptoError::KeyValue),
        }
    }

    /// Assigns the authentication key value.
    pub fn set_authentication_key(&mut self, value: &[u8]) -> Result<()> {
        match self.kind {
            AeadKind::Mgm | AeadKind::CtrCmac => {
                self.auth_cipher_key.as_mut().ok_or(CryptoError::KeyValue)?.set_key(value)
            }
            AeadKind::CtrHmac => {
                self.auth_hmac_key.as_mut().ok_or(CryptoError::KeyValue)?.set_key(value)
            }
        }
    }

    /// Assigns both keys at once.
    pub fn set_keys(&mut self, encryption: &[u8], authentication: &[u8]) -> Result<()> {
        self.set_encryption_key(encryption)?;
        self.set_authentication_key(authentication)
    }

    /// Starts a new computation under the given initialization vector.
    pub fn clean(&mut self, iv: &[u8]) -> Result<()> {
        match self.kind {
            AeadKind::Mgm => {
                let akey = self.auth_cipher_key.as_mut().ok_or(CryptoError::KeyValue)?;
                self.mgm.auth_clean(akey, iv)?;
                if let Some(ekey) = self.encryption_key.as_mut() {
                    self.mgm.enc_clean(ekey, iv)?;
                }
                Ok(())
            }
            AeadKind::CtrCmac => {
                self.cmac.clean();
                self.stream.clean();
                if let Some(ekey) = self.encryption_key.as_mut() {
                    let mut empty = [0u8; 0];
                    ekey.ctr(&[], &mut empty, Some(iv))?;
                }
                Ok(())
            }
            AeadKind::CtrHmac => {
                self.auth_hmac_key.as_mut().ok_or(CryptoError::KeyValue)?.clean()?;
                if let Some(ekey) = self.encryption_key.as_mut() {
                    let mut empty = [0u8; 0];
                    ekey.ctr(&[], &mut empty, Some(iv))?;
                }
                Ok(())
            }
        }
    }

    /// Feeds associated data, which is authenticated but never encrypted.
    pub fn auth_update(&mut self, adata: &[u8]) -> Result<()> {
        match self.kind {
            AeadKind::Mgm => {
                let akey = self.auth_cipher_key.as_mut().ok_or(CryptoError::KeyValue)?;
                self.mgm.auth_update(akey, adata)
            }
            AeadKind::CtrCmac => {
                let key = self.auth_cipher_key.as_mut().ok_or(CryptoError::KeyValue)?;
                let cmac = &mut self.cmac;
                self.stream.update(adata, |chunk| cmac.update(key, chunk))
            }
            AeadKind::CtrHmac => {
                self.auth_hmac_key.as_mut().ok_or(CryptoError::KeyValue)?.update(adata)
            }
        }
    }

    /// Encrypts the next plaintext fragment while extending the tag.
    pub fn encrypt_update(&mut self, input: &[u8], output: &mut [u8]) -> Result<()> {
        let ekey = self.encryption_key.as_mut().ok_or(CryptoError::KeyValue)?;
        match self.kind {
            AeadKind::Mgm => {
                let akey = self.auth_cipher_key.as_mut().ok_or(CryptoError::KeyValue)?;
                self.mgm.enc_update(ekey, MgmAuth::Key(akey), input, output)
            }
            AeadKind::CtrCmac => {
                let akey = self.auth_cipher_key.as_mut().ok_or(CryptoError::KeyValue)?;
                let cmac = &mut self.cmac;
                self.stream.update(input, |chunk| cmac.update(akey, chunk))?;
                ekey.ctr(input, output, None)
            }
            AeadKind::CtrHmac => {
                self.auth_hmac_key.as_mut().ok_or(CryptoError::KeyValue)?.update(input)?;
                ekey.ctr(input, output, None)
            }
        }
    }

    /// Decrypts the next ciphertext fragment; the authenticated plaintext
    /// extends the tag of the composites, the ciphertext that of MGM.
    pub fn decrypt_update(&mut self, input: &[u8], output: &mut [u8]) -> Result<()> {
        let ekey = self.encryption_key.as_mut().ok_or(CryptoError::KeyValue)?;
        match self.kind {
            AeadKind::Mgm => {
                let akey = self.auth_cipher_key.as_mut().ok_or(CryptoError::KeyValue)?;
                self.mgm.dec_update(ekey, MgmAuth::Key(akey), input, output)
            }
            AeadKind::CtrCmac => {
                ekey.ctr(input, output, None)?;
                let akey = self.auth_cipher_key.as_mut().ok_or(CryptoError::KeyValue)?;
                let cmac = &mut self.cmac;
                self.stream.update(output, |chunk| cmac.update(akey, chunk))
            }
            AeadKind::CtrHmac => {
                ekey.ctr(input, output, None)?;
                self.auth_hmac_key.as_mut().ok_or(CryptoError::KeyValue)?.update(output)
            }
        }
    }

    /// Completes the computation and returns `tag_len` bytes of the
    /// integrity code (clamped to the scheme's tag size).
    pub fn finalize(&mut self, tag_len: usize) -> Result<Vec<u8>> {
        if tag_len == 0 {
            return Err(CryptoError::ZeroLength);
        }
        match self.kind {
            AeadKind::Mgm => {
                let akey = self.auth_cipher_key.as_mut().ok_or(CryptoError::KeyValue)?;
                self.mgm.auth_finalize(akey, tag_len)
            }
            AeadKind::CtrCmac => {
                let akey = self.auth_cipher_key.as_mut().ok_or(CryptoError::KeyValue)?;
                let tail = self.stream.tail().to_vec();
                self.cmac.finalize(akey, &tail, tag_len)
            }
            AeadKind::CtrHmac => {
                let hmac = self.auth_hmac_key.as_mut().ok_or(CryptoError::KeyValue)?;
                let mut tag = hmac.finalize(&[])?;
                tag.truncate(tag_len.min(self.tag_size));
                Ok(tag)
            }
        }
    }

    /// One-shot authenticated encryption: authenticates `adata` followed
    /// by the plaintext, encrypts into `output` and returns the tag.
    pub fn encrypt(
        &mut self,
        adata: &[u8],
        input: &[u8],
        output: &mut [u8],
        iv: &[u8],
        tag_len: usize,
    ) -> Result<Vec<u8>> {
        self.clean(iv)?;
        self.auth_update(adata)?;
        if self.encryption_key.is_some() {
            self.encrypt_update(input, output)?;
        } else if !input.is_empty() {
            return Err(CryptoError::WrongLength);
        }
        self.finalize(tag_len)
    }

    /// One-shot authenticated decryption: recovers the plaintext, then
    /// recomputes and verifies the tag over `adata` and the plaintext.
    pub fn decrypt(
        &mut self,
        adata: &[u8],
        input: &[u8],
        output: &mut [u8],
        iv: &[u8],
        tag: &[u8],
    ) -> Result<()> {
        if tag.is_empty() {
            return Err(CryptoError::ZeroLength);
        }
        self.clean(iv)?;
        self.auth_update(adata)?;
        if self.encryption_key.is_some() {
            self.decrypt_update(input, output)?;
        } else if !input.is_empty() {
            return Err(CryptoError::WrongLength);
        }
        let computed = self.finalize(tag.len())?;
        if computed != tag {
            return Err(CryptoError::NotEqualData);
        }
        Ok(())
    }
}
