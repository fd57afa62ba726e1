use proc_macro2::TokenStream;
use quote::quote;
use syn::{Error, Ident, ItemFn, ReturnType, Type};

const PROFILES: &str = "event_loop, multi_thread, or default";

/// Expands `#[shub_runtime::main]`.
#[must_use]
pub fn expand_main(args: TokenStream, input: ItemFn) -> TokenStream {
    if input.sig.asyncness.is_none() {
        return Error::new_spanned(
            input.sig.fn_token,
            "#[shub_runtime::main] expects an `async fn`",
        )
        .to_compile_error();
    }
    if !input.sig.inputs.is_empty() {
        return Error::new_spanned(&input.sig.inputs, "#[shub_runtime::main] takes no arguments")
            .to_compile_error();
    }
    if !returns_result(&input.sig.output) {
        return Error::new_spanned(
            &input.sig.output,
            "#[shub_runtime::main] requires a `Result` return type",
        )
        .to_compile_error();
    }

    let config = match runtime_config(args) {
        Ok(config) => config,
        Err(err) => return err.to_compile_error(),
    };

    let ItemFn { attrs, vis, sig, block } = input;
    let name = &sig.ident;
    let output = &sig.output;

    quote! {
        #(#attrs)*
        #vis fn #name() #output {
            let runtime = ::shub_runtime::build_runtime_with_config(&#config)?;
            runtime.block_on(async move #block)
        }
    }
}

fn runtime_config(args: TokenStream) -> syn::Result<TokenStream> {
    if args.is_empty() {
        return Ok(quote! { ::shub_runtime::RuntimeConfig::default() });
    }

    let profile: Ident = syn::parse2(args)?;
    match profile.to_string().as_str() {
        "event_loop" => Ok(quote! { ::shub_runtime::RuntimeConfig::event_loop() }),
        "multi_thread" => Ok(quote! { ::shub_runtime::RuntimeConfig::multi_thread() }),
        "default" => Ok(quote! { ::shub_runtime::RuntimeConfig::default() }),
        other => Err(Error::new_spanned(
            &profile,
            format!("unknown runtime profile `{other}`, expected {PROFILES}"),
        )),
    }
}

fn returns_result(output: &ReturnType) -> bool {
    match output {
        ReturnType::Type(_, ty) => match &**ty {
            Type::Path(path) => path.path.segments.last().is_some_and(|s| s.ident == "Result"),
            _ => false,
        },
        ReturnType::Default => false,
    }
}
