use std::sync::RwLock;

use crate::error::{CryptoError, Result};

/// Process-wide knobs consulted by the core. The resource values give the
/// default budget installed into a key at the moment its material is
/// assigned: block counts for the block ciphers, invocation counts for HMAC.
///
/// `pbkdf2_iteration_count` is carried for the password-to-key path that
/// lives outside of this crate; the core itself never reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LibraryOptions {
    pub magma_cipher_resource: i64,
    pub kuznechik_cipher_resource: i64,
    pub hmac_key_count_resource: i64,
    pub pbkdf2_iteration_count: i64,
}

impl LibraryOptions {
    pub const fn default_values() -> Self {
        Self {
            magma_cipher_resource: 4_194_304,
            kuznechik_cipher_resource: 4_194_304,
            hmac_key_count_resource: 65_536,
            pbkdf2_iteration_count: 2_000,
        }
    }
}

impl Default for LibraryOptions {
    fn default() -> Self {
        Self::default_values()
    }
}

static OPTIONS: RwLock<LibraryOptions> = RwLock::new(LibraryOptions::default_values());

/// Returns a snapshot of the current option values.
pub fn get() -> LibraryOptions {
    *OPTIONS.read().expect("options lock poisoned")
}

/// Replaces the option values. Every resource budget must stay positive.
pub fn set(options: LibraryOptions) -> Result<()> {
    if options.magma_cipher_resource <= 0
        || options.kuznechik_cipher_resource <= 0
        || options.hmac_key_count_resource <= 0
        || options.pbkdf2_iteration_count <= 0
    {
        return Err(CryptoError::WrongOption);
    }
    *OPTIONS.write().expect("options lock poisoned") = options;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_positive() {
        let opts = get();
        assert!(opts.magma_cipher_resource > 0);
        assert!(opts.kuznechik_cipher_resource > 0);
        assert!(opts.hmac_key_count_resource > 0);
    }

    #[test]
    fn rejects_non_positive_budget() {
        let mut opts = LibraryOptions::default_values();
        opts.hmac_key_count_resource = 0;
        assert_eq!(set(opts), Err(CryptoError::WrongOption));
    }
}
