//! # Content Security Policy
//!
//! Builds the policy string for renderer documents and owns the per-navigation nonce.
//!
//! In production, scripts run only when they carry the current nonce, and styles need
//! either the nonce or one of the known static block hashes. In development the
//! dev-server tooling needs inline scripts and `eval`, so the script directive gets
//! `'unsafe-inline'` and no nonce: browsers ignore `'unsafe-inline'` once a nonce is
//! present in the same directive.

use crate::error::BoundaryError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use strum_macros::{AsRefStr, EnumString};

pub const CSP_HEADER: &str = "Content-Security-Policy";

const NONCE_BYTES: usize = 16;

const DEV_SERVER_ORIGINS: &[&str] = &["http://localhost:*", "http://127.0.0.1:*"];
const DEV_SOCKET_ORIGINS: &[&str] = &["ws://localhost:*", "ws://127.0.0.1:*"];

/// Inline style blocks shipped with the renderer bundle.
pub const STATIC_STYLE_BLOCKS: &[&str] = &[
    "* { -webkit-font-smoothing: antialiased !important; }",
    "html { font-size: 16px !important; }",
    "body { margin: 0 !important; padding: 0 !important; }",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct CspOptions<'a> {
    pub is_development: bool,
    pub nonce: &'a str,
    /// Additional `'sha256-…'` sources for `style-src`, e.g. from configuration.
    pub style_hashes: &'a [String],
}

/// The CSP hash source of an inline block: `'sha256-<base64>'`.
#[must_use]
pub fn style_hash(block: &str) -> String {
    format!("'sha256-{}'", STANDARD.encode(Sha256::digest(block.as_bytes())))
}

/// Builds the policy for one document.
///
/// Directives appear in a fixed order, each source list without duplicates, joined
/// with `; `.
///
/// # Errors
///
/// [`BoundaryError::InvalidArgument`] when `nonce` is empty or blank.
pub fn build_content_security_policy(options: &CspOptions<'_>) -> Result<String, BoundaryError> {
    let nonce = options.nonce.trim();
    if nonce.is_empty() {
        return Err(BoundaryError::invalid_argument("a CSP nonce is required"));
    }
    let nonce_source = format!("'nonce-{nonce}'");

    let mut policy = Policy::default();
    policy.add("default-src", ["'self'"]);

    if options.is_development {
        policy.add("script-src", ["'self'", "'unsafe-inline'", "'unsafe-eval'"]);
        policy.add("script-src", DEV_SERVER_ORIGINS.iter().copied());
        policy.add("style-src", ["'self'", "'unsafe-inline'"]);
        policy.add("connect-src", ["'self'"]);
        policy.add("connect-src", DEV_SERVER_ORIGINS.iter().copied());
        policy.add("connect-src", DEV_SOCKET_ORIGINS.iter().copied());
        policy.add("connect-src", ["https:"]);
    } else {
        policy.add("script-src", ["'self'", nonce_source.as_str()]);
        policy.add("style-src", ["'self'", nonce_source.as_str()]);
        let hashes: Vec<String> = STATIC_STYLE_BLOCKS.iter().map(|b| style_hash(b)).collect();
        policy.add("style-src", hashes.iter().map(String::as_str));
        policy.add("style-src", options.style_hashes.iter().map(String::as_str));
        policy.add("connect-src", ["'self'", "https:"]);
    }

    policy.add("img-src", ["'self'", "data:", "blob:"]);
    policy.add("font-src", ["'self'", "data:"]);
    policy.add("media-src", ["'self'", "blob:"]);
    policy.add("worker-src", ["'self'", "blob:"]);
    policy.add("object-src", ["'none'"]);
    policy.add("frame-src", ["'none'"]);
    policy.add("base-uri", ["'none'"]);
    policy.add("form-action", ["'self'"]);
    policy.add("frame-ancestors", ["'none'"]);

    Ok(policy.render())
}

const DIRECTIVE_ORDER: &[&str] = &[
    "default-src",
    "script-src",
    "style-src",
    "img-src",
    "font-src",
    "connect-src",
    "media-src",
    "worker-src",
    "object-src",
    "frame-src",
    "base-uri",
    "form-action",
    "frame-ancestors",
];

#[derive(Debug, Default)]
struct Policy {
    directives: BTreeMap<usize, Vec<String>>,
}

impl Policy {
    fn add<'s>(&mut self, directive: &str, sources: impl IntoIterator<Item = &'s str>) {
        let Some(slot) = DIRECTIVE_ORDER.iter().position(|d| *d == directive) else {
            return;
        };
        let list = self.directives.entry(slot).or_default();
        for source in sources {
            if !list.iter().any(|s| s == source) {
                list.push(source.to_owned());
            }
        }
    }

    fn render(&self) -> String {
        self.directives
            .iter()
            .map(|(slot, sources)| format!("{} {}", DIRECTIVE_ORDER[*slot], sources.join(" ")))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// A fresh 128-bit nonce, base64-encoded.
///
/// # Errors
///
/// [`BoundaryError::Internal`] when the system RNG is unavailable.
pub fn generate_nonce() -> Result<String, BoundaryError> {
    let mut bytes = [0u8; NONCE_BYTES];
    getrandom::fill(&mut bytes).map_err(|e| BoundaryError::Internal {
        message: format!("system RNG unavailable: {e}").into(),
        context: Some("Generating CSP nonce".into()),
    })?;
    Ok(STANDARD.encode(bytes))
}

/// The nonce of the current document, replaced on every navigation.
#[derive(Debug)]
pub struct NonceCell {
    current: RwLock<String>,
}

impl NonceCell {
    /// # Errors
    /// See [`generate_nonce`].
    pub fn new() -> Result<Self, BoundaryError> {
        Ok(Self { current: RwLock::new(generate_nonce()?) })
    }

    #[must_use]
    pub fn current(&self) -> String {
        self.current.read().clone()
    }

    /// Replaces the nonce and returns the new one. On RNG failure the old nonce is kept.
    ///
    /// # Errors
    /// See [`generate_nonce`].
    pub fn rotate(&self) -> Result<String, BoundaryError> {
        let fresh = generate_nonce()?;
        fresh.clone_into(&mut self.current.write());
        Ok(fresh)
    }
}

/// Resource classes reported by the window system's request interceptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum ResourceType {
    #[strum(serialize = "main-frame", serialize = "mainFrame")]
    MainFrame,
    #[strum(serialize = "sub-frame", serialize = "subFrame")]
    SubFrame,
    Stylesheet,
    Script,
    Image,
    Font,
    Xhr,
    Other,
}

impl ResourceType {
    /// Unknown names map to [`ResourceType::Other`].
    #[must_use]
    pub fn parse(name: &str) -> Self {
        name.parse().unwrap_or(Self::Other)
    }
}

/// Response headers as the window system hands them over: name to values.
pub type ResponseHeaders = BTreeMap<String, Vec<String>>;

/// Documents receive the policy; scripts, styles, images and the rest pass through.
#[must_use]
pub fn is_main_document(resource: ResourceType, url: &str) -> bool {
    matches!(resource, ResourceType::MainFrame | ResourceType::SubFrame) || url.contains("index.html")
}

/// Sets the policy header, replacing any existing one regardless of name case.
pub fn inject_policy(headers: &mut ResponseHeaders, policy: String) {
    headers.retain(|name, _| !name.eq_ignore_ascii_case(CSP_HEADER));
    headers.insert(CSP_HEADER.to_owned(), vec![policy]);
}
