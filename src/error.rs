use thiserror::Error;

/// Errors produced by the symmetric core. Every fallible operation of the
/// library returns exactly one of these kinds; functions never partially
/// succeed, and a key is always left re-masked on the error path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// A length that must be positive is zero.
    #[error("using data with zero length")]
    ZeroLength,

    /// A length is nonzero but inadmissible for the operation.
    #[error("using data with wrong length")]
    WrongLength,

    /// Input is not divisible by the block size in a mode that requires it.
    #[error("the length of input data is not divided by the block length")]
    WrongBlockCipherLength,

    /// The block size matches no supported cipher.
    #[error("incorrect block size of block cipher key")]
    WrongBlockCipher,

    /// A streaming call was made after the context was closed by a previous
    /// non-aligned fragment or finalization.
    #[error("using a function on a previously closed context")]
    WrongBlockCipherFunction,

    /// The initialization vector violates a mode-specific constraint.
    #[error("incorrect length of initial value")]
    WrongIvLength,

    /// The integrity code of a secret key does not match its contents.
    #[error("incorrect integrity code of secret key value")]
    WrongKeyIcode,

    /// The resource counter of a key would go negative.
    #[error("low resource of secret key")]
    LowKeyResource,

    /// An operation was attempted on a key whose material has not been set.
    #[error("using secret key context with undefined key value")]
    KeyValue,

    /// A configuration value is outside of its declared domain.
    #[error("wrong value of a library option")]
    WrongOption,

    /// Tag verification or a self-test comparison failed.
    #[error("the data are not equal")]
    NotEqualData,

    /// Internal state inconsistency, e.g. counter skew in a kdf state.
    #[error("incorrect internal state value")]
    InvalidValue,

    /// A bit-length counter would exceed its algorithmic maximum.
    #[error("length counter overflow")]
    Overflow,

    /// An identifier resolves to a different algorithm class than requested.
    #[error("using an identifier with wrong engine")]
    OidEngine,

    /// An identifier resolves to a different algorithm mode than requested.
    #[error("using an identifier with wrong mode")]
    OidMode,

    /// The identifier is not present in the registry.
    #[error("unknown algorithm identifier")]
    UnknownOid,
}

pub type Result<T> = core::result::Result<T, CryptoError>;
