#[cfg(test)]
pub mod mac_tests {
    use gostcrypt::{BlockCipherKey, CipherByteOrder, CmacContext, CryptoError, HmacKey};

    const KEY: &str = "efcdab89674523011032547698badcfe7766554433221100ffeeddccbbaa9988";
    const OC_KEY: &str = "8899aabbccddeeff0011223344556677fedcba98765432100123456789abcdef";

    const PLAIN: &str = "8899aabbccddeeff00776655443322110affeeccbbaa998877665544332211\
                         00000affeeccbbaa99887766554433221111000affeeccbbaa9988776655443322";
    const OC_PLAIN: &str = "1122334455667700ffeeddccbbaa998800112233445566778899aabbcceeff0a\
                            112233445566778899aabbcceeff0a002233445566778899aabbcceeff0a0011";

    fn bytes(hexstr: &str) -> Vec<u8> {
        hex::decode(hexstr).unwrap()
    }

    fn kuznechik(order: CipherByteOrder) -> BlockCipherKey {
        let mut key = BlockCipherKey::new_kuznechik(order).unwrap();
        key.set_key(&bytes(match order {
            CipherByteOrder::Gost => KEY,
            CipherByteOrder::Openssl => OC_KEY,
        }))
        .unwrap();
        key
    }

    #[test]
    fn kuznechik_cmac_reference() {
        // GOST R 34.13-2015, annex A.1.6
        let mut key = kuznechik(CipherByteOrder::Gost);
        let tag = key.cmac(&bytes(PLAIN), 8).unwrap();
        assert_eq!(tag, bytes("e3fb5960294d6f33"));
        let full = key.cmac(&bytes(PLAIN), 16).unwrap();
        assert_eq!(full, bytes("679c74375bb3de4de3fb5960294d6f33"));
    }

    #[test]
    fn kuznechik_cmac_reference_reversed() {
        let mut key = kuznechik(CipherByteOrder::Openssl);
        let tag = key.cmac(&bytes(OC_PLAIN), 8).unwrap();
        assert_eq!(tag, bytes("336f4d296059fbe3"));
    }

    #[test]
    fn cmac_accepts_empty_input() {
        let mut key = kuznechik(CipherByteOrder::Gost);
        let before = key.resource_counter();
        let one_shot = key.cmac(&[], 16).unwrap();
        assert_eq!(key.resource_counter(), before - 1);

        let mut ctx = CmacContext::new();
        let streamed = ctx.finalize(&mut key, &[], 16).unwrap();
        assert_eq!(one_shot, streamed);
    }

    #[test]
    fn cmac_streaming_equals_one_shot() {
        let data: Vec<u8> = (0u8..255).collect();
        for order in [CipherByteOrder::Gost, CipherByteOrder::Openssl] {
            let mut key = kuznechik(order);
            let bsize = key.block_size();
            for total in [1usize, 15, 16, 17, 31, 32, 33, 48, 57, 64, 100] {
                let message = &data[..total];
                let expected = key.cmac(message, bsize).unwrap();

                // every aligned split point of the message
                let mut split = 0;
                while split <= total {
                    let mut ctx = CmacContext::new();
                    ctx.update(&mut key, &message[..split]).unwrap();
                    let tag = ctx.finalize(&mut key, &message[split..], bsize).unwrap();
                    assert_eq!(tag, expected, "length {total}, split {split}");
                    split += bsize;
                }
            }
        }
    }

    #[test]
    fn cmac_streaming_equals_one_shot_magma() {
        let mut key = BlockCipherKey::new_magma(CipherByteOrder::Gost).unwrap();
        key.set_key(&bytes(KEY)).unwrap();
        let data: Vec<u8> = (0u8..37).collect();
        let expected = key.cmac(&data, 8).unwrap();

        let mut ctx = CmacContext::new();
        ctx.update(&mut key, &data[..8]).unwrap();
        ctx.update(&mut key, &data[8..32]).unwrap();
        let tag = ctx.finalize(&mut key, &data[32..], 8).unwrap();
        assert_eq!(tag, expected);
    }

    #[test]
    fn cmac_context_locks_after_partial_update() {
        let mut key = kuznechik(CipherByteOrder::Gost);
        let mut ctx = CmacContext::new();
        ctx.update(&mut key, &[0u8; 10]).unwrap();
        assert_eq!(
            ctx.update(&mut key, &[0u8; 16]).unwrap_err(),
            CryptoError::WrongBlockCipherFunction
        );
        // finalization over the buffered fragment still succeeds
        assert!(ctx.finalize(&mut key, &[], 16).is_ok());
        assert_eq!(
            ctx.finalize(&mut key, &[], 16).unwrap_err(),
            CryptoError::WrongBlockCipherFunction
        );
    }

    #[test]
    fn cmac_tag_request_is_clamped() {
        let mut key = kuznechik(CipherByteOrder::Gost);
        let tag = key.cmac(b"0123456789abcdef", 64).unwrap();
        assert_eq!(tag.len(), 16);
    }

    #[test]
    fn hmac_streebog256_reference() {
        // R 50.1.113-2016
        let mut key = HmacKey::new_streebog256().unwrap();
        key.set_key(&bytes("000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f"))
            .unwrap();
        let tag = key.hmac(&bytes("0126bdb87800af214341456563780100")).unwrap();
        assert_eq!(
            tag,
            bytes("a1aa5f7de402d7b3d323f2991c8d4534013137010a83754fd0af6d7cd4922ed9")
        );
    }

    #[test]
    fn hmac_streebog512_reference() {
        let mut key = HmacKey::new_streebog512().unwrap();
        key.set_key(&bytes("000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f"))
            .unwrap();
        let tag = key.hmac(&bytes("0126bdb87800af214341456563780100")).unwrap();
        assert_eq!(
            tag,
            bytes(
                "a59bab22ecae19c65fbde6e5f4e9f5d8549d31f037f9df9b905500e171923a77\
                 3d5f1530f2ed7e964cb2eedc29e9ad2f3afe93b2814f79f5000ffc0366c251e6"
            )
        );
    }

    #[test]
    fn nmac_produces_a_short_tag() {
        let mut nmac = HmacKey::new_nmac().unwrap();
        nmac.set_key(&[0x42u8; 32]).unwrap();
        let tag = nmac.hmac(b"nested authentication").unwrap();
        assert_eq!(tag.len(), 32);

        // the nested construction differs from both plain variants
        let mut h256 = HmacKey::new_streebog256().unwrap();
        h256.set_key(&[0x42u8; 32]).unwrap();
        assert_ne!(tag, h256.hmac(b"nested authentication").unwrap());
    }

    #[test]
    fn hmac_streaming_equals_one_shot() {
        let data: Vec<u8> = (0u8..200).collect();
        let mut key = HmacKey::new_streebog512().unwrap();
        key.set_key(&[0x10u8; 64]).unwrap();
        let whole = key.hmac(&data).unwrap();

        for split in [0usize, 1, 63, 64, 65, 128, 199, 200] {
            key.clean().unwrap();
            key.update(&data[..split]).unwrap();
            let tag = key.finalize(&data[split..]).unwrap();
            assert_eq!(tag, whole, "split {split}");
        }
    }

    #[test]
    fn long_hmac_keys_are_hashed_first() {
        let long_key: Vec<u8> = (0u8..100).collect();
        let mut key = HmacKey::new_streebog256().unwrap();
        key.set_key(&long_key).unwrap();
        let tag = key.hmac(b"payload").unwrap();
        assert_eq!(tag.len(), 32);
    }

    #[test]
    fn hmac_factory_checks_the_engine() {
        assert!(HmacKey::new_by_name("nmac-streebog").is_ok());
        assert!(HmacKey::new_by_name("HMAC-md_gost12_256").is_ok());
        assert_eq!(
            HmacKey::new_by_name("magma").unwrap_err(),
            CryptoError::OidEngine
        );
    }

    #[test]
    fn random_hmac_keys_work() {
        let mut key = HmacKey::new_streebog512().unwrap();
        key.set_key_random().unwrap();
        let first = key.hmac(b"same input").unwrap();
        let second = key.hmac(b"same input").unwrap();
        assert_eq!(first, second);
    }
}
