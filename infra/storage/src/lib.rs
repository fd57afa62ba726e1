//! Persistent key/value storage for the SiteHub host.
//!
//! A [`Store`] is one JSON object of top-level keys, loaded into memory when opened and
//! mirrored to a single file after every mutation. It is the generic store the secure
//! storage engine writes its envelopes into, and the backing for the renderer's plain
//! `store-*` channels.
//!
//! # Core Features
//!
//! - **Atomic Writes**: unique temporary file + `fsync` + `rename`, so a crash leaves
//!   either the old or the new document on disk ([`write_atomic`]).
//! - **Read-Your-Writes**: mutations hit memory before they are persisted, and persisting
//!   is serialized so the file follows call order.
//! - **Self-Healing**: orphaned temporary files are removed when a store is opened.
//!
//! ```rust
//! use serde_json::json;
//! use shub_storage::{Store, StorageError};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), StorageError> {
//! # let tmp = tempfile::tempdir().unwrap();
//! let store = Store::builder().root(tmp.path()).open().await?;
//! store.set("onboarding.done", json!(true)).await?;
//!
//! let reopened = Store::builder().root(tmp.path()).open().await?;
//! assert_eq!(reopened.get("onboarding.done"), Some(json!(true)));
//! # Ok(())
//! # }
//! ```

mod atomic;
mod builder;
mod engine;
mod error;
mod maintenance;

pub use atomic::write_atomic;
pub use builder::StoreBuilder;
pub use engine::{Document, Store};
pub use error::{StorageError, StorageErrorExt};
pub use maintenance::purge_tmp;
