use shub_derive::shub_error;
use std::borrow::Cow;

#[shub_error]
pub enum DocumentError {
    #[error("Document I/O error{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Document rejected{}: {message}", format_context(.context))]
    Rejected { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn read() -> Result<Vec<u8>, DocumentError> {
    std::fs::read("missing.json").context("Reading document")
}

fn main() {
    let _ = read();
    let err: DocumentError = "boom".into();
    assert_eq!(err.kind(), "Internal");
}
