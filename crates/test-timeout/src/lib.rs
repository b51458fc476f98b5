//! `#[timeout]` and `#[tokio_timeout_test]` wrap a test body in a watchdog
//! thread. Session tests wait on websocket peers that never time out on their
//! own, so a stuck test must fail rather than block `cargo test` forever.
//!
//! The limit is taken from the attribute (`#[timeout(5)]`), falling back to
//! [`DEFAULT_TIMEOUT_SECS`]. Setting `TEST_TIMEOUT_SECS` at test run time
//! overrides both, which helps on slow CI machines.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Attribute, ItemFn, LitInt};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Async test on a fresh current-thread Tokio runtime, bounded by a timeout.
/// Any `#[tokio::test]` attribute on the function is dropped.
#[proc_macro_attribute]
pub fn tokio_timeout_test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let timeout_secs = match parse_timeout(attr) {
        Ok(secs) => secs,
        Err(err) => return err.to_compile_error().into(),
    };
    let ItemFn {
        attrs,
        vis,
        mut sig,
        block,
    } = parse_macro_input!(item as ItemFn);

    if sig.asyncness.is_none() {
        return syn::Error::new_spanned(&sig.ident, "tokio_timeout_test expects an async fn")
            .to_compile_error()
            .into();
    }
    sig.asyncness = None;

    let attrs = strip_attrs(attrs, &["tokio", "test"]);
    let body = quote! {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("failed to build Tokio runtime");
        runtime.block_on(async {
            tokio::time::timeout(__timeout, async move #block)
                .await
                .expect("test timed out");
        });
    };
    wrap(attrs, vis, sig, timeout_secs, body).into()
}

/// Synchronous test bounded by a timeout. Replaces `#[test]`.
#[proc_macro_attribute]
pub fn timeout(attr: TokenStream, item: TokenStream) -> TokenStream {
    let timeout_secs = match parse_timeout(attr) {
        Ok(secs) => secs,
        Err(err) => return err.to_compile_error().into(),
    };
    let ItemFn {
        attrs,
        vis,
        sig,
        block,
    } = parse_macro_input!(item as ItemFn);

    if sig.asyncness.is_some() {
        return syn::Error::new_spanned(
            &sig.ident,
            "timeout expects a synchronous fn; use tokio_timeout_test for async tests",
        )
        .to_compile_error()
        .into();
    }

    let attrs = strip_attrs(attrs, &["test"]);
    let body = quote! { #block };
    wrap(attrs, vis, sig, timeout_secs, body).into()
}

fn parse_timeout(attr: TokenStream) -> syn::Result<u64> {
    if attr.is_empty() {
        return Ok(DEFAULT_TIMEOUT_SECS);
    }
    let lit: LitInt = syn::parse(attr)?;
    let secs: u64 = lit.base10_parse()?;
    if secs == 0 {
        return Err(syn::Error::new_spanned(lit, "timeout must be greater than zero"));
    }
    Ok(secs)
}

/// Drops attributes whose path is exactly `path` (e.g. `tokio::test`).
fn strip_attrs(attrs: Vec<Attribute>, path: &[&str]) -> Vec<Attribute> {
    attrs
        .into_iter()
        .filter(|attr| {
            let segments: Vec<String> = attr
                .path()
                .segments
                .iter()
                .map(|segment| segment.ident.to_string())
                .collect();
            segments != path
        })
        .collect()
}

fn wrap(
    attrs: Vec<Attribute>,
    vis: syn::Visibility,
    sig: syn::Signature,
    timeout_secs: u64,
    body: TokenStream2,
) -> TokenStream2 {
    quote! {
        #[test]
        #(#attrs)*
        #vis #sig {
            let __timeout = std::time::Duration::from_secs(
                std::env::var("TEST_TIMEOUT_SECS")
                    .ok()
                    .and_then(|value| value.parse::<u64>().ok())
                    .filter(|secs| *secs > 0)
                    .unwrap_or(#timeout_secs),
            );
            let (sender, receiver) = std::sync::mpsc::channel();
            std::thread::spawn(move || {
                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    #body
                }));
                let _ = sender.send(result);
            });
            match receiver.recv_timeout(__timeout) {
                Ok(Ok(())) => {}
                Ok(Err(payload)) => std::panic::resume_unwind(payload),
                Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                    panic!("test timed out after {:?}", __timeout)
                }
                Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                    panic!("test thread exited without reporting a result")
                }
            }
        }
    }
}
