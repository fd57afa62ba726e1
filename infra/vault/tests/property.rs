use proptest::prelude::*;
use shub_vault::{MasterKey, SecureEnvelope};

proptest! {
    #[test]
    fn sealed_bytes_open_to_the_original(
        data in proptest::collection::vec(any::<u8>(), 0..2048),
        aad in "[a-z0-9._:-]{1,40}",
    ) {
        let key = MasterKey::generate().unwrap();
        let env = SecureEnvelope::seal(&key, &data, aad.as_bytes()).unwrap();
        let opened = env.open(&key, aad.as_bytes()).unwrap();
        prop_assert_eq!(opened.as_slice(), data.as_slice());
    }

    #[test]
    fn any_single_bit_flip_in_ciphertext_is_rejected(
        data in proptest::collection::vec(any::<u8>(), 1..256),
        byte in any::<usize>(),
        bit in 0u8..8,
    ) {
        use base64::Engine;
        use base64::engine::general_purpose::STANDARD;

        let key = MasterKey::generate().unwrap();
        let mut env = SecureEnvelope::seal(&key, &data, b"k").unwrap();
        let mut raw = STANDARD.decode(&env.ciphertext).unwrap();
        let idx = byte % raw.len();
        raw[idx] ^= 1 << bit;
        env.ciphertext = STANDARD.encode(raw);

        prop_assert!(env.open(&key, b"k").is_err());
    }
}
