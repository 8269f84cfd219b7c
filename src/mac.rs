//! Streaming envelope for iterated compression. A [`MacStream`] absorbs
//! input fragments of arbitrary length and hands only block-aligned chunks
//! to the underlying update operation; whatever residue is left when the
//! caller finalizes goes to the finalization operation as the tail.

use crate::error::{CryptoError, Result};

/// Largest supported block size of an underlying compression function.
pub const MAC_MAX_BLOCK_SIZE: usize = 64;

#[derive(Debug)]
pub struct MacStream {
    data: [u8; MAC_MAX_BLOCK_SIZE],
    length: usize,
    bsize: usize,
}

impl MacStream {
    pub fn new(bsize: usize) -> Result<Self> {
        if bsize == 0 {
            return Err(CryptoError::ZeroLength);
        }
        if bsize > MAC_MAX_BLOCK_SIZE {
            return Err(CryptoError::WrongLength);
        }
        Ok(Self { data: [0u8; MAC_MAX_BLOCK_SIZE], length: 0, bsize })
    }

    pub fn block_size(&self) -> usize {
        self.bsize
    }

    /// Drops any buffered residue.
    pub fn clean(&mut self) {
        self.data = [0u8; MAC_MAX_BLOCK_SIZE];
        self.length = 0;
    }

    /// Absorbs `input`, forwarding complete blocks through `update`.
    pub fn update<F>(&mut self, input: &[u8], mut update: F) -> Result<()>
    where
        F: FnMut(&[u8]) -> Result<()>,
    {
        let mut rest = input;

        // top up an existing residue first
        if self.length != 0 {
            if self.length + rest.len() < self.bsize {
                self.data[self.length..self.length + rest.len()].copy_from_slice(rest);
                self.length += rest.len();
                return Ok(());
            }
            let offset = self.bsize - self.length;
            self.data[self.length..self.bsize].copy_from_slice(&rest[..offset]);
            update(&self.data[..self.bsize])?;
            self.data[..self.bsize].fill(0);
            self.length = 0;
            rest = &rest[offset..];
        }

        if !rest.is_empty() {
            let aligned = (rest.len() / self.bsize) * self.bsize;
            if aligned > 0 {
                update(&rest[..aligned])?;
            }
            if aligned < rest.len() {
                self.length = rest.len() - aligned;
                self.data[..self.length].copy_from_slice(&rest[aligned..]);
            }
        }
        Ok(())
    }

    /// The buffered residue, to be released to the finalization of the
    /// underlying algorithm. The buffer is kept intact, which permits
    /// finalizing the same position in the stream more than once.
    pub fn tail(&self) -> &[u8] {
        &self.data[..self.length]
    }
}
