use shub_derive::shub_error;
use std::borrow::Cow;

#[shub_error]
pub enum ProbeError {
    #[error("Probe I/O error{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Probe parse error{}: {source}", format_context(.context))]
    Parse { source: std::num::ParseIntError, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

#[test]
fn shub_error_ui() {
    let t = trybuild::TestCases::new();
    t.pass("tests/ui/shub_error_pass.rs");
}

#[test]
fn kind_reports_variant_name() {
    let io: ProbeError = std::io::Error::other("disk").into();
    let parse: ProbeError = "x".parse::<u8>().unwrap_err().into();
    let internal: ProbeError = String::from("bad state").into();

    assert_eq!(io.kind(), "Io");
    assert_eq!(parse.kind(), "Parse");
    assert_eq!(internal.kind(), "Internal");
}

#[test]
fn context_is_rendered_in_message() {
    let result: Result<u8, ProbeError> = "nope".parse::<u8>().context("Parsing retry count");
    let err = result.unwrap_err();
    assert!(err.to_string().starts_with("Probe parse error (Parsing retry count): "));

    let bare: ProbeError = "no context".into();
    assert_eq!(bare.to_string(), "Internal error: no context");
}

#[test]
fn context_overrides_existing_error() {
    let result: Result<(), ProbeError> = Err(ProbeError::from("first"));
    let err = result.context("outer").unwrap_err();
    assert_eq!(err.to_string(), "Internal error (outer): first");
}
