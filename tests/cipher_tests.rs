#[cfg(test)]
pub mod cipher_tests {
    use gostcrypt::modes::{decrypt_xts, encrypt_xts};
    use gostcrypt::{BlockCipherKey, CipherByteOrder, CryptoError};

    // GOST R 34.13-2015 annex A.1 key in the little-endian layout and its
    // mirror for the reversed convention.
    const KEY: &str = "efcdab89674523011032547698badcfe7766554433221100ffeeddccbbaa9988";
    const OC_KEY: &str = "8899aabbccddeeff0011223344556677fedcba98765432100123456789abcdef";

    const PLAIN: &str = "8899aabbccddeeff00776655443322110affeeccbbaa9988776655443322110000\
                         0affeeccbbaa99887766554433221111000affeeccbbaa9988776655443322";
    const OC_PLAIN: &str = "1122334455667700ffeeddccbbaa998800112233445566778899aabbcceeff0a\
                            112233445566778899aabbcceeff0a002233445566778899aabbcceeff0a0011";

    fn bytes(hexstr: &str) -> Vec<u8> {
        hex::decode(hexstr.replace(' ', "")).unwrap()
    }

    fn kuznechik(order: CipherByteOrder) -> BlockCipherKey {
        let mut key = BlockCipherKey::new_kuznechik(order).unwrap();
        let value = match order {
            CipherByteOrder::Gost => bytes(KEY),
            CipherByteOrder::Openssl => bytes(OC_KEY),
        };
        key.set_key(&value).unwrap();
        key
    }

    fn plain(order: CipherByteOrder) -> Vec<u8> {
        match order {
            CipherByteOrder::Gost => bytes(PLAIN),
            CipherByteOrder::Openssl => bytes(OC_PLAIN),
        }
    }

    #[test]
    fn kuznechik_ecb_reference() {
        let expected = bytes(
            "cdedd4b9428d465a3024bcbe909d677f8bd01867d7525428f932006e2c9129b4\
             57b1d43b31a5f5f3ee7c249d5433caf098da8aaac5c4023aebb930e8cd9cb0d0",
        );
        let mut key = kuznechik(CipherByteOrder::Gost);
        let data = plain(CipherByteOrder::Gost);
        let mut out = vec![0u8; data.len()];
        key.encrypt_ecb(&data, &mut out).unwrap();
        assert_eq!(out, expected);
        let mut back = vec![0u8; data.len()];
        key.decrypt_ecb(&out, &mut back).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn kuznechik_ecb_reference_reversed() {
        let expected = bytes(
            "7f679d90bebc24305a468d42b9d4edcdb429912c6e0032f9285452d76718d08b\
             f0ca33549d247ceef3f5a5313bd4b157d0b09ccde830b9eb3a02c4c5aa8ada98",
        );
        let mut key = kuznechik(CipherByteOrder::Openssl);
        let data = plain(CipherByteOrder::Openssl);
        let mut out = vec![0u8; data.len()];
        key.encrypt_ecb(&data, &mut out).unwrap();
        assert_eq!(out, expected);
    }

    #[test]
    fn kuznechik_ctr_reference() {
        let expected = bytes(
            "b8a1bd40a25f7bd5dbd10ec1bed895f1e4de453cb3e43cf35d3ea1f633e7ee85\
             a5a36435f177e8d5d36e35e68be8eaa573babd2058d1c6d1b6ba0cf2b1fa91cb",
        );
        let mut key = kuznechik(CipherByteOrder::Gost);
        let data = plain(CipherByteOrder::Gost);
        let mut out = vec![0u8; data.len()];
        key.ctr(&data, &mut out, Some(&bytes("f0ceab9078563412"))).unwrap();
        assert_eq!(out, expected);

        // the counter keystream decrypts its own output
        let mut back = vec![0u8; out.len()];
        key.ctr(&out, &mut back, Some(&bytes("f0ceab9078563412"))).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn kuznechik_ctr_reference_reversed() {
        let expected = bytes(
            "f195d8bec10ed1dbd57b5fa240bda1b885eee733f6a13e5df33ce4b33c45dee4\
             a5eae88be6356ed3d5e877f13564a3a5cb91fab1f20cbab6d1c6d15820bdba73",
        );
        let mut key = kuznechik(CipherByteOrder::Openssl);
        let data = plain(CipherByteOrder::Openssl);
        let mut out = vec![0u8; data.len()];
        key.ctr(&data, &mut out, Some(&bytes("1234567890abcef0"))).unwrap();
        assert_eq!(out, expected);
    }

    #[test]
    fn ctr_continuation_matches_single_call() {
        let mut key = kuznechik(CipherByteOrder::Gost);
        let data = plain(CipherByteOrder::Gost);
        let iv = bytes("f0ceab9078563412");

        let mut whole = vec![0u8; data.len()];
        key.ctr(&data, &mut whole, Some(&iv)).unwrap();

        let mut pieces = vec![0u8; data.len()];
        key.ctr(&data[..16], &mut pieces[..16], Some(&iv)).unwrap();
        key.ctr(&data[16..32], &mut pieces[16..32], None).unwrap();
        key.ctr(&data[32..], &mut pieces[32..], None).unwrap();
        assert_eq!(pieces, whole);
    }

    #[test]
    fn ctr_tail_closes_the_counter() {
        let mut key = kuznechik(CipherByteOrder::Gost);
        let iv = bytes("f0ceab9078563412");
        let data = [0x5Au8; 20]; // 16 + 4, the tail closes the vector
        let mut out = [0u8; 20];
        key.ctr(&data, &mut out, Some(&iv)).unwrap();
        let mut more = [0u8; 16];
        assert_eq!(
            key.ctr(&[0u8; 16], &mut more, None).unwrap_err(),
            CryptoError::WrongBlockCipherFunction
        );
    }

    #[test]
    fn ctr_round_trip_with_tail() {
        for order in [CipherByteOrder::Gost, CipherByteOrder::Openssl] {
            let mut key = kuznechik(order);
            let iv = [0x21u8; 8];
            let data: Vec<u8> = (0u8..57).collect();
            let mut cipher = vec![0u8; data.len()];
            key.ctr(&data, &mut cipher, Some(&iv)).unwrap();
            let mut back = vec![0u8; data.len()];
            key.ctr(&cipher, &mut back, Some(&iv)).unwrap();
            assert_eq!(back, data);
        }
    }

    #[test]
    fn magma_ctr_round_trip_with_tail() {
        for order in [CipherByteOrder::Gost, CipherByteOrder::Openssl] {
            let mut key = BlockCipherKey::new_magma(order).unwrap();
            key.set_key(&bytes(KEY)).unwrap();
            let iv = [0x7Fu8; 4];
            let data: Vec<u8> = (0u8..45).collect();
            let mut cipher = vec![0u8; data.len()];
            key.ctr(&data, &mut cipher, Some(&iv)).unwrap();
            let mut back = vec![0u8; data.len()];
            key.ctr(&cipher, &mut back, Some(&iv)).unwrap();
            assert_eq!(back, data);
        }
    }

    #[test]
    fn kuznechik_cbc_reference() {
        let iv = bytes(
            "1201f0e5d4c3b2a1f0ceab9078563412191817161514131290897867 56453423",
        );
        let expected = bytes(
            "27cc7d6d3d2ee5904dfa85a0d4729968aca55e8d448e1eafa6ec78b461e62628\
             d0909df4b0e84056e89919e9f1ab7bfe7039b660159a2d1a635c895a06887616",
        );
        let mut key = kuznechik(CipherByteOrder::Gost);
        let data = plain(CipherByteOrder::Gost);
        let mut out = vec![0u8; data.len()];
        key.encrypt_cbc(&data, &mut out, &iv).unwrap();
        assert_eq!(out, expected);

        let mut back = vec![0u8; data.len()];
        key.decrypt_cbc(&expected, &mut back, &iv).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn kuznechik_cbc_reference_reversed() {
        let iv = bytes(
            "1234567890abcef0a1b2c3d4e5f0011223344556677889901213141516171819",
        );
        let expected = bytes(
            "689972d4a085fa4d90e52e3d6d7dcc272826e661b478eca6af1e8e448d5ea5ac\
             fe7babf1e91999e85640e8b0f49d90d0167688065a895c631a2d9a1560b63970",
        );
        let mut key = kuznechik(CipherByteOrder::Openssl);
        let data = plain(CipherByteOrder::Openssl);
        let mut out = vec![0u8; data.len()];
        key.encrypt_cbc(&data, &mut out, &iv).unwrap();
        assert_eq!(out, expected);
    }

    #[test]
    fn kuznechik_ofb_reference() {
        let iv = bytes(
            "1201f0e5d4c3b2a1f0ceab9078563412191817161514131290897867 56453423",
        );
        let expected = bytes(
            "95bd7a895e791fff242b84b1590a8081bf26939d3621b58fb4fa8c04a7475bed\
             138a2810fce70fc8b1b8a03cac57a266503190f6432229a060861366c0bb3e20",
        );
        let mut key = kuznechik(CipherByteOrder::Gost);
        let data = plain(CipherByteOrder::Gost);
        let mut out = vec![0u8; data.len()];
        key.ofb(&data, &mut out, Some(&iv)).unwrap();
        assert_eq!(out, expected);

        // the same keystream restores the plaintext
        let mut back = vec![0u8; data.len()];
        key.ofb(&expected, &mut back, Some(&iv)).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn kuznechik_ofb_reference_reversed() {
        let iv = bytes(
            "1234567890abcef0a1b2c3d4e5f0011223344556677889901213141516171819",
        );
        let expected = bytes(
            "81800a59b1842b24ff1f795e897abd95ed5b47a7048cfab48fb521369d9326bf\
             66a257ac3ca0b8b1c80fe7fc10288a13203ebbc066138660a0292243f6903150",
        );
        let mut key = kuznechik(CipherByteOrder::Openssl);
        let data = plain(CipherByteOrder::Openssl);
        let mut out = vec![0u8; data.len()];
        key.ofb(&data, &mut out, Some(&iv)).unwrap();
        assert_eq!(out, expected);
    }

    #[test]
    fn kuznechik_cfb_reference() {
        let iv = bytes(
            "1201f0e5d4c3b2a1f0ceab9078563412191817161514131290897867 56453423",
        );
        let expected = bytes(
            "95bd7a895e791fff242b84b1590a8081bf26939d3621b58fb4fa8c04a7475bed\
             b538a2974e262d84388dc65ceba8f279d1f4fb44ddd95bc7e62d924ecdbefe4f",
        );
        let mut key = kuznechik(CipherByteOrder::Gost);
        let data = plain(CipherByteOrder::Gost);
        let mut out = vec![0u8; data.len()];
        key.encrypt_cfb(&data, &mut out, Some(&iv)).unwrap();
        assert_eq!(out, expected);

        let mut back = vec![0u8; data.len()];
        key.decrypt_cfb(&expected, &mut back, Some(&iv)).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn kuznechik_cfb_reference_reversed() {
        let iv = bytes(
            "1234567890abcef0a1b2c3d4e5f0011223344556677889901213141516171819",
        );
        let expected = bytes(
            "81800a59b1842b24ff1f795e897abd95ed5b47a7048cfab48fb521369d9326bf\
             79f2a8eb5cc68d38842d264e97a238b54ffebecd4e922de6c75bd9dd44fbf4d1",
        );
        let mut key = kuznechik(CipherByteOrder::Openssl);
        let data = plain(CipherByteOrder::Openssl);
        let mut out = vec![0u8; data.len()];
        key.encrypt_cfb(&data, &mut out, Some(&iv)).unwrap();
        assert_eq!(out, expected);
    }

    #[test]
    fn magma_modes_round_trip() {
        for order in [CipherByteOrder::Gost, CipherByteOrder::Openssl] {
            let mut key = BlockCipherKey::new_magma(order).unwrap();
            key.set_key(&bytes(OC_KEY)).unwrap();
            let data = [0x3Cu8; 48];
            let iv = [0x11u8; 16];

            let mut cipher = [0u8; 48];
            key.encrypt_cbc(&data, &mut cipher, &iv).unwrap();
            let mut back = [0u8; 48];
            key.decrypt_cbc(&cipher, &mut back, &iv).unwrap();
            assert_eq!(back, data);

            key.encrypt_cfb(&data, &mut cipher, Some(&iv)).unwrap();
            key.decrypt_cfb(&cipher, &mut back, Some(&iv)).unwrap();
            assert_eq!(back, data);

            key.ofb(&data, &mut cipher, Some(&iv)).unwrap();
            key.ofb(&cipher, &mut back, Some(&iv)).unwrap();
            assert_eq!(back, data);
        }
    }

    #[test]
    fn ecb_rejects_partial_blocks() {
        let mut key = kuznechik(CipherByteOrder::Gost);
        let mut out = [0u8; 24];
        assert_eq!(
            key.encrypt_ecb(&[0u8; 24], &mut out).unwrap_err(),
            CryptoError::WrongBlockCipherLength
        );
    }

    #[test]
    fn cbc_rejects_bad_vectors() {
        let mut key = kuznechik(CipherByteOrder::Gost);
        let mut out = [0u8; 16];
        assert_eq!(
            key.encrypt_cbc(&[0u8; 16], &mut out, &[0u8; 8]).unwrap_err(),
            CryptoError::WrongIvLength
        );
        assert_eq!(
            key.encrypt_cbc(&[0u8; 16], &mut out, &[0u8; 80]).unwrap_err(),
            CryptoError::WrongIvLength
        );
    }

    #[test]
    fn resource_decreases_by_block_count() {
        let mut key = kuznechik(CipherByteOrder::Gost);
        let before = key.resource_counter();
        let mut out = [0u8; 64];
        key.encrypt_ecb(&[0u8; 64], &mut out).unwrap();
        assert_eq!(key.resource_counter(), before - 4);

        // a trailing fragment costs one extra block
        let mut short = [0u8; 20];
        key.ctr(&[0u8; 20], &mut short, Some(&[1u8; 8])).unwrap();
        assert_eq!(key.resource_counter(), before - 4 - 2);
    }

    #[test]
    fn random_keys_round_trip() {
        let mut key = BlockCipherKey::new_kuznechik(CipherByteOrder::Gost).unwrap();
        key.set_key_random().unwrap();
        let data = [0xE1u8; 32];
        let mut cipher = [0u8; 32];
        key.encrypt_ecb(&data, &mut cipher).unwrap();
        let mut back = [0u8; 32];
        key.decrypt_ecb(&cipher, &mut back).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn repeated_calls_survive_remasking() {
        let mut key = kuznechik(CipherByteOrder::Gost);
        let mut first = [0u8; 16];
        key.encrypt_ecb(&[0x77u8; 16], &mut first).unwrap();
        for _ in 0..10 {
            let mut again = [0u8; 16];
            key.encrypt_ecb(&[0x77u8; 16], &mut again).unwrap();
            assert_eq!(again, first);
        }
    }

    #[test]
    fn xts_round_trip_both_ciphers() {
        for order in [CipherByteOrder::Gost, CipherByteOrder::Openssl] {
            let mut ekey = BlockCipherKey::new_kuznechik(order).unwrap();
            let mut tkey = BlockCipherKey::new_kuznechik(order).unwrap();
            ekey.set_key(&bytes(KEY)).unwrap();
            tkey.set_key(&bytes(OC_KEY)).unwrap();

            let data = [0xA7u8; 64];
            let iv = [0x55u8; 16];
            let mut cipher = [0u8; 64];
            encrypt_xts(&mut ekey, &mut tkey, &data, &mut cipher, &iv).unwrap();
            assert_ne!(cipher, data);
            // consecutive blocks of equal plaintext must differ under the
            // walking tweak
            assert_ne!(cipher[..16], cipher[16..32]);

            let mut back = [0u8; 64];
            decrypt_xts(&mut ekey, &mut tkey, &cipher, &mut back, &iv).unwrap();
            assert_eq!(back, data);
        }

        let mut ekey = BlockCipherKey::new_magma(CipherByteOrder::Gost).unwrap();
        let mut tkey = BlockCipherKey::new_magma(CipherByteOrder::Gost).unwrap();
        ekey.set_key(&bytes(KEY)).unwrap();
        tkey.set_key(&bytes(OC_KEY)).unwrap();
        let data = [0x19u8; 32];
        let mut cipher = [0u8; 32];
        encrypt_xts(&mut ekey, &mut tkey, &data, &mut cipher, &[0u8; 8]).unwrap();
        let mut back = [0u8; 32];
        decrypt_xts(&mut ekey, &mut tkey, &cipher, &mut back, &[0u8; 8]).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn xts_requires_matching_block_sizes() {
        let mut ekey = BlockCipherKey::new_kuznechik(CipherByteOrder::Gost).unwrap();
        let mut tkey = BlockCipherKey::new_magma(CipherByteOrder::Gost).unwrap();
        ekey.set_key(&bytes(KEY)).unwrap();
        tkey.set_key(&bytes(KEY)).unwrap();
        let mut out = [0u8; 16];
        assert_eq!(
            encrypt_xts(&mut ekey, &mut tkey, &[0u8; 16], &mut out, &[0u8; 16]).unwrap_err(),
            CryptoError::WrongBlockCipher
        );
    }
}
