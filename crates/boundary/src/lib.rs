//! # SiteHub Security Boundary
//!
//! Everything between the sandboxed renderer and the privileged desktop host.
//!
//! * [`validator`]: closed channel allowlist turning raw arguments into a typed [`Request`].
//! * [`Boundary`]: the dispatcher. Validates, audits rejections and runs handlers.
//! * [`SecureStore`]: AES-256-GCM envelopes inside the generic store, with legacy
//!   plaintext migration.
//! * [`csp`]: per-document Content Security Policy and the rotating nonce.
//! * [`AuditTrail`] / [`AuditWriter`]: capped, encrypted security log behind a
//!   single-writer queue.
//! * [`LifecycleCoordinator`]: suspend, resume and quit handshakes with the renderer.
//! * [`desktop`]: drag, export and notification policy.
//!
//! ## Example
//!
//! ```rust,ignore
//! let boundary = Boundary::builder(Store::memory(), Arc::new(MemoryKeystore::new()), host).build()?;
//! boundary.invoke("store-set", &["app.theme".into(), IpcValue::from_wire(json!({"mode": "dark"}))]).await?;
//! ```

pub mod audit;
pub mod config;
pub mod csp;
pub mod desktop;
mod dispatcher;
mod error;
mod host;
mod ids;
pub mod lifecycle;
mod redact;
mod secure_store;
pub mod validator;

pub use audit::{AUDIT_LOG_KEY, AuditDetails, AuditEvent, AuditTrail, AuditWriter};
pub use config::{BoundaryConfig, ConfigError, load_config};
pub use csp::{CspOptions, ResourceType, ResponseHeaders, build_content_security_policy};
pub use desktop::DesktopOutcome;
pub use dispatcher::{Boundary, BoundaryBuilder};
pub use error::{BoundaryError, BoundaryErrorExt};
pub use host::{DialogResult, HostShell};
pub use ids::{SAFE_ALPHABET, event_id};
pub use lifecycle::{
    LIFECYCLE_CHANNEL, LifecycleAction, LifecycleCoordinator, LifecycleOutcome, LifecycleStatus,
    RendererSurface,
};
pub use redact::redact_args;
pub use secure_store::{SECURE_PREFIX, SecureStore, namespaced};
pub use validator::{Channel, IpcValue, Request, ValidationError, validate};
