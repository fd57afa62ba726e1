//! # Vault Errors

use std::borrow::Cow;

#[shub_derive::shub_error]
pub enum VaultError {
    #[error("Encryption error{}: {message}", format_context(.context))]
    Encryption { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Wrong key, mismatched associated data or tampered envelope.
    #[error("Decryption error{}: {message}", format_context(.context))]
    Decryption { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The stored value is not a recognizable envelope (unknown version, bad field lengths).
    #[error("Invalid envelope{}: {message}", format_context(.context))]
    InvalidEnvelope { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The OS keystore could not be read or written, or holds an unusable secret.
    #[error("Keystore error{}: {message}", format_context(.context))]
    Keystore { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Serialization error{}: {source}", format_context(.context))]
    Serialization { source: serde_json::Error, context: Option<Cow<'static, str>> },

    #[error("Internal vault error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl VaultError {
    pub(crate) fn keystore(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Keystore { message: message.into(), context: None }
    }

    pub(crate) fn decryption(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Decryption { message: message.into(), context: None }
    }
}
