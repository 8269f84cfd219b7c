//! CMAC (OMAC1) over the block ciphers, per GOST R 34.13-2015.
//!
//! The finalization subkeys are derived from L = E(0) by multiplication
//! with the primitive element of GF(2^64) or GF(2^128): K1 = α·L closes a
//! complete last block, K2 = α²·L closes a padded one. Zero-length
//! messages are accepted and cost one block of key resource.

use crate::bckey::{BlockCipherKey, CipherByteOrder};
use crate::error::{CryptoError, Result};
use crate::gf2n;

/// Multiplies a block-sized value by α in the field of matching size.
fn alpha_mul(block: &mut [u8; 16], bsize: usize) {
    if bsize == 8 {
        let x: [u8; 8] = block[..8].try_into().unwrap();
        block[..8].copy_from_slice(&gf2n::gf64_mul_bytes(&x, &2u64.to_le_bytes()));
    } else {
        let mut alpha = [0u8; 16];
        alpha[0] = 0x02;
        *block = gf2n::gf128_mul_bytes(block, &alpha);
    }
}

/// Derives the finalization subkey for a deferred block of `last_len`
/// bytes and folds it together with that block into `state`.
fn close_last_block(
    key: &BlockCipherKey,
    state: &mut [u8; 16],
    last: &[u8],
    last_len: usize,
) {
    let bsize = key.block_size();
    let reversed = key.byte_order() == CipherByteOrder::Openssl;

    let zero = [0u8; 16];
    let mut akey = [0u8; 16];
    key.encrypt_one(&zero[..bsize], &mut akey[..bsize]);
    if reversed {
        akey[..bsize].reverse();
    }
    alpha_mul(&mut akey, bsize);
    if last_len < bsize {
        alpha_mul(&mut akey, bsize);
        akey[last_len] ^= 0x80;
    }

    if reversed {
        for i in 0..bsize {
            state[i] ^= akey[bsize - 1 - i];
        }
        for i in 0..last_len {
            state[bsize - 1 - i] ^= last[last_len - 1 - i];
        }
    } else {
        for i in 0..bsize {
            state[i] ^= akey[i];
        }
        for i in 0..last_len {
            state[i] ^= last[i];
        }
    }
}

/// Copies the requested number of tag bytes. The `Gost` convention keeps
/// the most significant bytes of the final block, the reversed convention
/// the leading ones; requests above the block size are clamped.
fn truncate_tag(key: &BlockCipherKey, block: &[u8], out_len: usize) -> Vec<u8> {
    let bsize = key.block_size();
    let take = out_len.min(bsize);
    match key.byte_order() {
        CipherByteOrder::Openssl => block[..take].to_vec(),
        CipherByteOrder::Gost => block[bsize - take..bsize].to_vec(),
    }
}

impl BlockCipherKey {
    /// One-shot CMAC over `data`, producing `out_len` tag bytes.
    pub fn cmac(&mut self, data: &[u8], out_len: usize) -> Result<Vec<u8>> {
        if out_len == 0 {
            return Err(CryptoError::ZeroLength);
        }
        self.verify_usable()?;

        let bsize = self.block_size();
        let mut blocks = data.len() / bsize;
        let mut tail = data.len() % bsize;
        self.skey
            .decrease_resource(1.max((blocks + (tail > 0) as usize) as i64))?;

        // the last block always exists, except for empty input
        if tail == 0 && blocks > 0 {
            tail = bsize;
            blocks -= 1;
        }

        let mut state = [0u8; 16];
        let mut chained = [0u8; 16];
        for block in data.chunks_exact(bsize).take(blocks) {
            for i in 0..bsize {
                state[i] ^= block[i];
            }
            let fed = state;
            self.encrypt_one(&fed[..bsize], &mut chained[..bsize]);
            state[..bsize].copy_from_slice(&chained[..bsize]);
        }

        close_last_block(self, &mut state, &data[blocks * bsize..], tail);
        let fed = state;
        self.encrypt_one(&fed[..bsize], &mut chained[..bsize]);

        let tag = truncate_tag(self, &chained[..bsize], out_len);
        self.remask();
        Ok(tag)
    }
}

/// Streaming CMAC computation. `update` accepts block-aligned fragments;
/// the first non-aligned fragment locks the context, after which only
/// `finalize` is permitted. The running value and the deferred last block
/// are explicit fields.
#[derive(Debug)]
pub struct CmacContext {
    state: [u8; 16],
    pending: [u8; 16],
    pending_len: usize,
    finished: bool,
}

impl CmacContext {
    pub fn new() -> Self {
        Self { state: [0u8; 16], pending: [0u8; 16], pending_len: 0, finished: false }
    }

    /// Resets the context for a fresh computation.
    pub fn clean(&mut self) {
        self.state = [0u8; 16];
        self.pending = [0u8; 16];
        self.pending_len = 0;
        self.finished = false;
    }

    fn locked(&self, bsize: usize) -> bool {
        self.finished || (self.pending_len > 0 && self.pending_len < bsize)
    }

    /// Absorbs the next fragment. The final block of the stream is kept
    /// back, because finalization needs it together with the subkeys.
    pub fn update(&mut self, key: &mut BlockCipherKey, data: &[u8]) -> Result<()> {
        key.verify_usable()?;
        let bsize = key.block_size();
        if self.locked(bsize) {
            return Err(CryptoError::WrongBlockCipherFunction);
        }
        if data.is_empty() {
            return Ok(());
        }

        let blocks = data.len() / bsize;
        let tail = data.len() % bsize;

        // one unit per processed block: a flushed deferred block plus all
        // complete blocks of this fragment except the one kept back
        let deferred_flush = (self.pending_len == bsize) as usize;
        let keep_back = (tail == 0) as usize;
        let processed = blocks.saturating_sub(keep_back);
        key.skey.decrease_resource((deferred_flush + processed) as i64)?;

        let mut chained = [0u8; 16];
        if self.pending_len == bsize {
            for i in 0..bsize {
                self.state[i] ^= self.pending[i];
            }
            let fed = self.state;
            key.encrypt_one(&fed[..bsize], &mut chained[..bsize]);
            self.state[..bsize].copy_from_slice(&chained[..bsize]);
            self.pending = [0u8; 16];
            self.pending_len = 0;
        }

        for block in data.chunks_exact(bsize).take(processed) {
            for i in 0..bsize {
                self.state[i] ^= block[i];
            }
            let fed = self.state;
            key.encrypt_one(&fed[..bsize], &mut chained[..bsize]);
            self.state[..bsize].copy_from_slice(&chained[..bsize]);
        }

        self.pending_len = if tail > 0 { tail } else { bsize };
        self.pending = [0u8; 16];
        self.pending[..self.pending_len]
            .copy_from_slice(&data[data.len() - self.pending_len..]);

        key.remask();
        Ok(())
    }

    /// Completes the computation over an optional trailing fragment and
    /// returns `out_len` tag bytes. After a locking non-aligned `update`
    /// the trailing fragment is ignored.
    pub fn finalize(
        &mut self,
        key: &mut BlockCipherKey,
        data: &[u8],
        out_len: usize,
    ) -> Result<Vec<u8>> {
        if out_len == 0 {
            return Err(CryptoError::ZeroLength);
        }
        if self.finished {
            return Err(CryptoError::WrongBlockCipherFunction);
        }
        key.verify_usable()?;
        let bsize = key.block_size();

        if self.pending_len % bsize == 0 && !data.is_empty() {
            self.update(key, data)?;
        }
        key.skey.decrease_resource(1)?;

        let pending = self.pending;
        close_last_block(key, &mut self.state, &pending[..self.pending_len], self.pending_len);
        let mut tag_block = [0u8; 16];
        let fed = self.state;
        key.encrypt_one(&fed[..bsize], &mut tag_block[..bsize]);

        let tag = truncate_tag(key, &tag_block[..bsize], out_len);
        self.finished = true;
        key.remask();
        Ok(tag)
    }
}

impl Default for CmacContext {
    fn default() -> Self {
        Self::new()
    }
}
