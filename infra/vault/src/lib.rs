//! Key custody and authenticated encryption for the SiteHub secure store.
//!
//! * [`MasterKey`]: a 256-bit secret, wiped from memory on drop.
//! * [`Keystore`]: where the key is kept between runs, addressed by service and account.
//! * [`KeyManager`]: single-flight loading, in-memory caching and release of the key.
//! * [`SecureEnvelope`]: one AES-256-GCM sealed value in its persisted JSON form.
//!
//! ## Envelope Format
//!
//! ```text
//! { "version": "v1", "iv": <12 bytes b64>, "ciphertext": <b64>, "authTag": <16 bytes b64>, "updatedAt": <RFC 3339> }
//! ```
//!
//! Every seal draws a fresh random 96-bit IV. Callers bind the storage key as associated
//! data, so an envelope copied under a different key fails authentication.
//!
//! ## Example
//!
//! ```rust
//! use shub_vault::{KeyManager, MemoryKeystore, SecureEnvelope};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), shub_vault::VaultError> {
//! let keys = KeyManager::new(Arc::new(MemoryKeystore::new()));
//! let key = keys.master_key().await?;
//!
//! let env = SecureEnvelope::seal_json(&key, &serde_json::json!({"token": "t"}), b"__secure__:auth")?;
//! assert_eq!(env.open_json(&key, b"__secure__:auth")?["token"], "t");
//! # Ok(())
//! # }
//! ```

mod envelope;
mod error;
mod key;
mod keystore;
mod manager;

pub use envelope::{ENVELOPE_VERSION, IV_LEN, SecureEnvelope, TAG_LEN};
pub use error::{VaultError, VaultErrorExt};
pub use key::{KEY_LEN, MasterKey};
pub use keystore::{FileKeystore, Keystore, MemoryKeystore};
pub use manager::{DEFAULT_KEY_ACCOUNT, DEFAULT_KEY_SERVICE, KeyManager};
pub use zeroize::Zeroizing;
