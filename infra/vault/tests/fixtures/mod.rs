use shub_vault::{KeyManager, MemoryKeystore};
use std::sync::Arc;

/// A key manager over a fresh in-memory keystore, plus the keystore for call counting.
#[must_use]
pub fn memory_keys() -> (Arc<MemoryKeystore>, KeyManager<MemoryKeystore>) {
    let keystore = Arc::new(MemoryKeystore::new());
    (Arc::clone(&keystore), KeyManager::new(keystore))
}

/// Flips one bit of a base64 field and re-encodes it.
#[must_use]
pub fn flip_bit(encoded: &str, byte: usize) -> String {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    let mut raw = STANDARD.decode(encoded).unwrap();
    let idx = byte % raw.len();
    raw[idx] ^= 0x01;
    STANDARD.encode(raw)
}
