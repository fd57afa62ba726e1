use crate::error::VaultError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;

/// The 256-bit secret that seals every secure-store envelope.
///
/// The bytes are wiped when the value is dropped. Share it as `Arc<MasterKey>`: the key
/// is zeroed once the last holder lets go, never while a cipher operation still uses it.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct MasterKey([u8; KEY_LEN]);

impl MasterKey {
    /// Draws a fresh key from the OS RNG.
    pub fn generate() -> Result<Self, VaultError> {
        let mut bytes = [0u8; KEY_LEN];
        getrandom::fill(&mut bytes).map_err(|e| VaultError::Internal {
            message: format!("system RNG unavailable: {e}").into(),
            context: Some("Generating master key".into()),
        })?;
        Ok(Self(bytes))
    }

    #[must_use]
    pub const fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Decodes the keystore representation (standard base64 of 32 bytes).
    pub fn from_base64(encoded: &str) -> Result<Self, VaultError> {
        let decoded = Zeroizing::new(
            STANDARD
                .decode(encoded.trim())
                .map_err(|e| VaultError::keystore(format!("stored key is not base64: {e}")))?,
        );
        let bytes: [u8; KEY_LEN] = decoded.as_slice().try_into().map_err(|_| {
            VaultError::keystore(format!(
                "stored key has {} bytes, expected {KEY_LEN}",
                decoded.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    #[must_use]
    pub fn to_base64(&self) -> Zeroizing<String> {
        Zeroizing::new(STANDARD.encode(self.0))
    }

    pub(crate) const fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey([REDACTED])")
    }
}
