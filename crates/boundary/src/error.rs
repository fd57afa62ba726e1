//! # Boundary Errors

use shub_storage::StorageError;
use shub_vault::VaultError;
use std::borrow::Cow;

#[shub_derive::shub_error]
pub enum BoundaryError {
    /// The renderer's call failed validation; the message is what the renderer sees.
    #[error("{message}")]
    ValidationRejection { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Serialization error{}: {source}", format_context(.context))]
    Serialization { source: serde_json::Error, context: Option<Cow<'static, str>> },

    /// Tampered, malformed or foreign secure envelope.
    #[error("Decryption error{}: {message}", format_context(.context))]
    Decryption { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Keystore error{}: {message}", format_context(.context))]
    Keystore { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Invalid argument{}: {message}", format_context(.context))]
    InvalidArgument { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Storage error{}: {source}", format_context(.context))]
    Storage { source: StorageError, context: Option<Cow<'static, str>> },

    #[error("I/O error{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    /// The window system or another host collaborator failed.
    #[error("Host error{}: {message}", format_context(.context))]
    Host { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl BoundaryError {
    pub(crate) fn invalid_argument(message: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidArgument { message: message.into(), context: None }
    }

    pub fn host(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Host { message: message.into(), context: None }
    }
}

impl From<VaultError> for BoundaryError {
    fn from(err: VaultError) -> Self {
        match err {
            VaultError::Decryption { message, context } => Self::Decryption { message, context },
            VaultError::InvalidEnvelope { message, context } => {
                Self::Decryption { message: format!("invalid envelope: {message}").into(), context }
            },
            VaultError::Keystore { message, context } => Self::Keystore { message, context },
            VaultError::Serialization { source, context } => Self::Serialization { source, context },
            VaultError::Encryption { message, context } => {
                Self::Internal { message: format!("encryption failed: {message}").into(), context }
            },
            VaultError::Internal { message, context } => Self::Internal { message, context },
        }
    }
}
