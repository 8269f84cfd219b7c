//! The catalog of algorithm identifiers. The registry is closed: every
//! algorithm and mode the library implements is listed here with its dotted
//! object identifier and one or more human-readable names, and nothing can
//! be registered at run time.

use crate::error::{CryptoError, Result};

/// The class of cryptographic mechanism an identifier belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    BlockCipher,
    HashFunction,
    HmacFunction,
}

/// How the mechanism is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OidMode {
    /// A bare algorithm (a cipher, a hash, a keyed hash).
    Algorithm,
    /// An encryption mode of operation over a block cipher.
    Encryption,
    /// A message authentication code.
    Mac,
    /// An authenticated encryption scheme.
    Aead,
}

/// One registry entry: the engine/mode classification, the dotted object
/// identifier and the accepted names (the first name is canonical).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Oid {
    pub engine: Engine,
    pub mode: OidMode,
    pub id: &'static str,
    pub names: &'static [&'static str],
}

/// The complete registry. ACPKM entries are listed for identifier
/// compatibility; the key meshing modes themselves are not part of this
/// library and cannot be instantiated.
pub const REGISTRY: &[Oid] = &[
    Oid { engine: Engine::HashFunction, mode: OidMode::Algorithm,
          id: "1.2.643.7.1.1.2.2", names: &["streebog256", "md_gost12_256"] },
    Oid { engine: Engine::HashFunction, mode: OidMode::Algorithm,
          id: "1.2.643.7.1.1.2.3", names: &["streebog512", "md_gost12_512"] },
    Oid { engine: Engine::HmacFunction, mode: OidMode::Algorithm,
          id: "1.2.643.7.1.1.4.1", names: &["hmac-streebog256", "HMAC-md_gost12_256"] },
    Oid { engine: Engine::HmacFunction, mode: OidMode::Algorithm,
          id: "1.2.643.7.1.1.4.2", names: &["hmac-streebog512", "HMAC-md_gost12_512"] },
    Oid { engine: Engine::HmacFunction, mode: OidMode::Algorithm,
          id: "1.2.643.2.52.1.8.1", names: &["nmac-streebog"] },
    Oid { engine: Engine::BlockCipher, mode: OidMode::Algorithm,
          id: "1.2.643.7.1.1.5.1", names: &["magma"] },
    Oid { engine: Engine::BlockCipher, mode: OidMode::Algorithm,
          id: "1.2.643.7.1.1.5.2", names: &["kuznechik", "kuznyechik", "grasshopper"] },
    Oid { engine: Engine::BlockCipher, mode: OidMode::Encryption,
          id: "1.2.643.2.52.1.5.1.1", names: &["ctr-magma"] },
    Oid { engine: Engine::BlockCipher, mode: OidMode::Encryption,
          id: "1.2.643.2.52.1.5.1.2", names: &["ctr-kuznechik", "ctr-kuznyechik"] },
    Oid { engine: Engine::BlockCipher, mode: OidMode::Encryption,
          id: "1.2.643.2.52.1.5.2.1", names: &["ofb-magma"] },
    Oid { engine: Engine::BlockCipher, mode: OidMode::Encryption,
          id: "1.2.643.2.52.1.5.2.2", names: &["ofb-kuznechik", "ofb-kuznyechik"] },
    Oid { engine: Engine::BlockCipher, mode: OidMode::Encryption,
          id: "1.2.643.2.52.1.5.3.1", names: &["cfb-magma"] },
    Oid { engine: Engine::BlockCipher, mode: OidMode::Encryption,
          id: "1.2.643.2.52.1.5.3.2", names: &["cfb-kuznechik", "cfb-kuznyechik"] },
    Oid { engine: Engine::BlockCipher, mode: OidMode::Encryption,
          id: "1.2.643.2.52.1.5.4.1", names: &["cbc-magma"] },
    Oid { engine: Engine::BlockCipher, mode: OidMode::Encryption,
          id: "1.2.643.2.52.1.5.4.2", names: &["cbc-kuznechik", "cbc-kuznyechik"] },
    Oid { engine: Engine::BlockCipher, mode: OidMode::Encryption,
          id: "1.2.643.2.52.1.5.5.1", names: &["xts-magma"] },
    Oid { engine: Engine::BlockCipher, mode: OidMode::Encryption,
          id: "1.2.643.2.52.1.5.5.2", names: &["xts-kuznechik", "xts-kuznyechik"] },
    Oid { engine: Engine::BlockCipher, mode: OidMode::Encryption,
          id: "1.2.643.7.1.1.5.1.1", names: &["acpkm-magma", "id-gostr3412-2015-magma-ctracpkm"] },
    Oid { engine: Engine::BlockCipher, mode: OidMode::Encryption,
          id: "1.2.643.7.1.1.5.2.1", names: &["acpkm-kuznechik", "id-gostr3412-2015-kuznyechik-ctracpkm"] },
    Oid { engine: Engine::BlockCipher, mode: OidMode::Mac,
          id: "1.2.643.2.52.1.7.1.1", names: &["cmac-magma"] },
    Oid { engine: Engine::BlockCipher, mode: OidMode::Mac,
          id: "1.2.643.2.52.1.7.1.2", names: &["cmac-kuznechik", "cmac-kuznyechik"] },
    Oid { engine: Engine::BlockCipher, mode: OidMode::Aead,
          id: "1.2.643.7.1.1.5.1.3", names: &["mgm-magma"] },
    Oid { engine: Engine::BlockCipher, mode: OidMode::Aead,
          id: "1.2.643.7.1.1.5.2.3", names: &["mgm-kuznechik", "mgm-kuznyechik"] },
    Oid { engine: Engine::BlockCipher, mode: OidMode::Aead,
          id: "1.2.643.2.52.1.6.1.1", names: &["ctr-cmac-magma"] },
    Oid { engine: Engine::BlockCipher, mode: OidMode::Aead,
          id: "1.2.643.2.52.1.6.1.2", names: &["ctr-cmac-kuznechik", "ctr-cmac-kuznyechik"] },
    Oid { engine: Engine::BlockCipher, mode: OidMode::Aead,
          id: "1.2.643.2.52.1.6.2.1.1", names: &["ctr-hmac-magma-streebog256"] },
    Oid { engine: Engine::BlockCipher, mode: OidMode::Aead,
          id: "1.2.643.2.52.1.6.2.1.2", names: &["ctr-hmac-magma-streebog512"] },
    Oid { engine: Engine::BlockCipher, mode: OidMode::Aead,
          id: "1.2.643.2.52.1.6.2.1.3", names: &["ctr-nmac-magma"] },
    Oid { engine: Engine::BlockCipher, mode: OidMode::Aead,
          id: "1.2.643.2.52.1.6.2.2.1", names: &["ctr-hmac-kuznechik-streebog256"] },
    Oid { engine: Engine::BlockCipher, mode: OidMode::Aead,
          id: "1.2.643.2.52.1.6.2.2.2", names: &["ctr-hmac-kuznechik-streebog512"] },
    Oid { engine: Engine::BlockCipher, mode: OidMode::Aead,
          id: "1.2.643.2.52.1.6.2.2.3", names: &["ctr-nmac-kuznechik"] },
];

/// Looks up an entry by any of its names.
pub fn find_by_name(name: &str) -> Result<&'static Oid> {
    REGISTRY
        .iter()
        .find(|oid| oid.names.contains(&name))
        .ok_or(CryptoError::UnknownOid)
}

/// Looks up an entry by its dotted identifier.
pub fn find_by_id(id: &str) -> Result<&'static Oid> {
    REGISTRY
        .iter()
        .find(|oid| oid.id == id)
        .ok_or(CryptoError::UnknownOid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cipher_identifiers_resolve() {
        assert_eq!(find_by_name("magma").unwrap().id, "1.2.643.7.1.1.5.1");
        assert_eq!(find_by_name("grasshopper").unwrap().id, "1.2.643.7.1.1.5.2");
        assert_eq!(find_by_id("1.2.643.7.1.1.5.2.3").unwrap().names[0], "mgm-kuznechik");
    }

    #[test]
    fn unknown_name_is_rejected() {
        assert_eq!(find_by_name("gost89"), Err(CryptoError::UnknownOid));
    }

    #[test]
    fn identifiers_are_unique() {
        for (i, a) in REGISTRY.iter().enumerate() {
            for b in REGISTRY.iter().skip(i + 1) {
                assert_ne!(a.id, b.id);
            }
        }
    }
}
