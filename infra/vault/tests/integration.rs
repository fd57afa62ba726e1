pub mod fixtures;

use fixtures::{flip_bit, memory_keys};
use serde_json::json;
use shub_vault::{FileKeystore, KeyManager, Keystore, SecureEnvelope, VaultError};
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_cold_callers_share_one_key() {
    let (keystore, manager) = memory_keys();
    let manager = Arc::new(manager);

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.master_key().await.unwrap().to_base64() })
        })
        .collect();

    let mut keys = Vec::new();
    for handle in handles {
        keys.push(handle.await.unwrap());
    }

    assert!(keys.windows(2).all(|w| *w[0] == *w[1]));
    assert_eq!(keystore.writes(), 1, "key must be generated exactly once");
    assert_eq!(keystore.reads(), 1, "cold callers share one keystore round trip");
}

#[tokio::test]
async fn file_keystore_key_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let first = KeyManager::new(Arc::new(FileKeystore::new(dir.path())));
    let sealed = SecureEnvelope::seal_json(&first.master_key().await.unwrap(), &json!(42), b"k").unwrap();
    drop(first);

    let second = KeyManager::new(Arc::new(FileKeystore::new(dir.path())));
    let key = second.master_key().await.unwrap();
    assert_eq!(sealed.open_json(&key, b"k").unwrap(), json!(42));
}

#[tokio::test]
async fn corrupt_stored_key_is_a_keystore_error() {
    let (keystore, manager) = memory_keys();
    keystore.set(shub_vault::DEFAULT_KEY_SERVICE, shub_vault::DEFAULT_KEY_ACCOUNT, "not-a-key").await.unwrap();

    let err = manager.master_key().await.unwrap_err();
    assert!(matches!(err, VaultError::Keystore { .. }));
}

#[tokio::test]
async fn tampering_with_any_field_is_detected() {
    let (_, manager) = memory_keys();
    let key = manager.master_key().await.unwrap();
    let env = SecureEnvelope::seal_json(&key, &json!({"a": [1, 2, 3]}), b"__secure__:a").unwrap();

    let mut ciphertext = env.clone();
    ciphertext.ciphertext = flip_bit(&env.ciphertext, 0);
    let mut tag = env.clone();
    tag.auth_tag = flip_bit(&env.auth_tag, 5);
    let mut iv = env.clone();
    iv.iv = flip_bit(&env.iv, 11);

    for tampered in [ciphertext, tag, iv] {
        let err = tampered.open_json(&key, b"__secure__:a").unwrap_err();
        assert!(matches!(err, VaultError::Decryption { .. }), "got {err}");
    }
}

#[tokio::test]
async fn envelope_replayed_under_other_key_fails() {
    let (_, manager) = memory_keys();
    let key = manager.master_key().await.unwrap();
    let env = SecureEnvelope::seal_json(&key, &json!("secret"), b"__secure__:auth.token").unwrap();

    assert!(env.open_json(&key, b"__secure__:auth.refresh").is_err());
}
