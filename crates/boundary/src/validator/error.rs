use std::borrow::Cow;

/// Why a renderer call was refused.
///
/// The rendered message is the rejection reason reported to the renderer and recorded
/// in the audit log, so it carries no decoration.
#[shub_derive::shub_error]
#[derive(Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unsupported channel: {channel}")]
    UnsupportedChannel { channel: String },

    #[error("{message}")]
    Arity { message: Cow<'static, str> },

    #[error("{message}")]
    Invalid { message: Cow<'static, str> },

    /// A string, path, payload or nesting depth over its ceiling.
    #[error("{message}")]
    Oversized { message: Cow<'static, str> },
}

impl ValidationError {
    pub(crate) fn invalid(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Invalid { message: message.into() }
    }

    pub(crate) fn oversized(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Oversized { message: message.into() }
    }

    pub(crate) fn arity(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Arity { message: message.into() }
    }
}
