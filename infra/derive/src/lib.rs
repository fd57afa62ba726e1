#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros shared by the SiteHub workspace.
//!
//! * [`shub_error`] turns an enum into the workspace error shape (`thiserror` derive,
//!   `...Ext::context`, source conversions and a `kind()` accessor).
//! * [`main`] bootstraps the host process on one of the `shub-runtime` profiles.
//!
//! Examples are `ignore`d here because a proc-macro crate cannot use its own macros;
//! the consuming crates exercise them in their tests.

mod macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, ItemFn, parse_macro_input};

/// Attribute macro to bootstrap the host event loop.
///
/// Transforms an `async fn main` returning a `Result` into a synchronous `fn main` that
/// builds a Tokio runtime from a `shub_runtime::RuntimeConfig` profile and blocks on the
/// original body.
///
/// # Arguments
///
/// * `event_loop` - single-threaded scheduler; every boundary task runs on one thread.
/// * `multi_thread` - work-stealing scheduler for tooling and benchmarks.
/// * `default` - same as `event_loop`.
///
/// # Examples
///
/// ```rust,ignore
/// #[shub_runtime::main(event_loop)]
/// async fn main() -> anyhow::Result<()> {
///     Ok(())
/// }
/// ```
#[proc_macro_attribute]
pub fn main(args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    macros::runtime::expand_main(args.into(), input).into()
}

/// Attribute macro for domain-specific error enums.
///
/// # Features
///
/// * **Automatic Derives**: Injects `#[derive(Debug, thiserror::Error)]` when missing.
/// * **Context Support**: Generates a companion `<Name>Ext` trait that adds `.context()`
///   to `Result<T, Name>` and to `Result<T, Source>` for every source variant.
/// * **Conversions**: `From<Source>` for variants with a `source` field, and
///   `From<&'static str>` / `From<String>` when an `Internal` variant exists.
/// * **Kind**: `kind(&self) -> &'static str` returns the variant name, suitable for
///   structured log fields and audit metadata.
///
/// # Requirements
///
/// 1. The macro must be applied to an **enum** whose variants all have named fields.
/// 2. A `context` field, when present, must be `Option<Cow<'static, str>>`.
/// 3. Variants with a source must also carry a `context` field.
/// 4. One error enum per module: the generated `format_context` helper is module-level.
///
/// # Example
///
/// ```rust,ignore
/// use shub_derive::shub_error;
/// use std::borrow::Cow;
///
/// #[shub_error]
/// pub enum StoreError {
///     #[error("I/O failure{}: {source}", format_context(.context))]
///     Io { source: std::io::Error, context: Option<Cow<'static, str>> },
///
///     #[error("Internal fault{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// fn load() -> Result<Vec<u8>, StoreError> {
///     std::fs::read("store.json").context("Reading store document")
/// }
/// ```
#[proc_macro_attribute]
pub fn shub_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::error::expand_derive(input).into()
}
