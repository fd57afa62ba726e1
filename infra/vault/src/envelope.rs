use crate::error::{VaultError, VaultErrorExt};
use crate::key::MasterKey;
use aead::inout::InOutBuf;
use aead::{AeadInOut, Key, KeyInit, Nonce, Tag};
use aes_gcm::Aes256Gcm;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use zeroize::Zeroizing;

/// Envelope format written by this crate.
pub const ENVELOPE_VERSION: &str = "v1";
/// AES-GCM nonce length (96-bit).
pub const IV_LEN: usize = 12;
/// AES-GCM tag length (128-bit).
pub const TAG_LEN: usize = 16;

/// One encrypted value as it is persisted in the generic store.
///
/// ```text
/// { "version": "v1", "iv": <b64>, "ciphertext": <b64>, "authTag": <b64>, "updatedAt": <RFC 3339> }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecureEnvelope {
    pub version: String,
    pub iv: String,
    pub ciphertext: String,
    pub auth_tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

fn cipher(key: &MasterKey) -> Result<Aes256Gcm, VaultError> {
    let key = Key::<Aes256Gcm>::try_from(&key.as_bytes()[..]).map_err(|_| VaultError::Internal {
        message: "master key has the wrong length".into(),
        context: None,
    })?;
    Ok(Aes256Gcm::new(&key))
}

fn decode_field(field: &'static str, encoded: &str) -> Result<Vec<u8>, VaultError> {
    STANDARD.decode(encoded).map_err(|e| VaultError::Decryption {
        message: format!("`{field}` is not valid base64: {e}").into(),
        context: None,
    })
}

impl SecureEnvelope {
    /// Encrypts `plaintext` under a fresh random IV, binding `aad` as associated data.
    pub fn seal(key: &MasterKey, plaintext: &[u8], aad: &[u8]) -> Result<Self, VaultError> {
        let mut iv = Nonce::<Aes256Gcm>::default();
        getrandom::fill(&mut iv).map_err(|e| VaultError::Encryption {
            message: format!("system RNG unavailable: {e}").into(),
            context: Some("Generating IV".into()),
        })?;

        let mut buf = plaintext.to_vec();
        let tag = cipher(key)?
            .encrypt_inout_detached(&iv, aad, InOutBuf::from(buf.as_mut_slice()))
            .map_err(|_| VaultError::Encryption {
                message: "AEAD encryption failed".into(),
                context: None,
            })?;

        Ok(Self {
            version: ENVELOPE_VERSION.to_owned(),
            iv: STANDARD.encode(iv),
            ciphertext: STANDARD.encode(&buf),
            auth_tag: STANDARD.encode(tag),
            updated_at: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        })
    }

    /// Decrypts and authenticates the envelope.
    ///
    /// # Errors
    ///
    /// * [`VaultError::InvalidEnvelope`] for an unknown version.
    /// * [`VaultError::Decryption`] for malformed fields, a wrong key, mismatched `aad` or
    ///   any modification of IV, ciphertext or tag.
    pub fn open(&self, key: &MasterKey, aad: &[u8]) -> Result<Zeroizing<Vec<u8>>, VaultError> {
        if self.version != ENVELOPE_VERSION {
            return Err(VaultError::InvalidEnvelope {
                message: "unsupported envelope version".into(),
                context: Some(format!("version={}", self.version).into()),
            });
        }

        let iv = decode_field("iv", &self.iv)?;
        let tag = decode_field("authTag", &self.auth_tag)?;
        let mut buf = Zeroizing::new(decode_field("ciphertext", &self.ciphertext)?);

        let iv = Nonce::<Aes256Gcm>::try_from(iv.as_slice())
            .map_err(|_| VaultError::decryption(format!("iv must be {IV_LEN} bytes")))?;
        let tag = Tag::<Aes256Gcm>::try_from(tag.as_slice())
            .map_err(|_| VaultError::decryption(format!("authTag must be {TAG_LEN} bytes")))?;

        cipher(key)?
            .decrypt_inout_detached(&iv, aad, InOutBuf::from(buf.as_mut_slice()), &tag)
            .map_err(|_| VaultError::Decryption {
                message: "authentication failed".into(),
                context: Some("AEAD tag mismatch".into()),
            })?;

        Ok(buf)
    }

    /// Serializes `value` as JSON and seals it.
    pub fn seal_json(key: &MasterKey, value: &Value, aad: &[u8]) -> Result<Self, VaultError> {
        let plaintext = Zeroizing::new(serde_json::to_vec(value).context("Encoding secure value")?);
        Self::seal(key, &plaintext, aad)
    }

    /// Opens the envelope and parses the plaintext as JSON.
    ///
    /// A plaintext that is not JSON is reported as a decryption failure: the envelope
    /// authenticated, but it was not produced by [`SecureEnvelope::seal_json`].
    pub fn open_json(&self, key: &MasterKey, aad: &[u8]) -> Result<Value, VaultError> {
        let plaintext = self.open(key, aad)?;
        serde_json::from_slice(&plaintext)
            .map_err(|e| VaultError::decryption(format!("decrypted payload is not JSON: {e}")))
    }

    /// Recognizes a stored value as an envelope: an object whose `version`, `iv`,
    /// `ciphertext` and `authTag` are all strings.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let field = |name: &str| object.get(name).and_then(Value::as_str).map(str::to_owned);
        Some(Self {
            version: field("version")?,
            iv: field("iv")?,
            ciphertext: field("ciphertext")?,
            auth_tag: field("authTag")?,
            updated_at: field("updatedAt"),
        })
    }

    pub fn to_value(&self) -> Result<Value, VaultError> {
        serde_json::to_value(self).context("Encoding envelope")
    }
}
