use proc_macro::TokenStream;
use quote::quote_spanned;
use syn::{ItemFn, LitInt, parse_macro_input, spanned::Spanned};

/// Runs the body of a test on its own thread, named after the test, and
/// fails the test if the body does not finish within the given number of
/// milliseconds.
///
/// A thread that hangs is left behind; the driver still reports the
/// failure and moves on to the next test.
#[proc_macro_attribute]
pub fn deadline(attr: TokenStream, item: TokenStream) -> TokenStream {
    let millis = parse_macro_input!(attr as LitInt);
    let mut input_fn = parse_macro_input!(item as ItemFn);
    let block = *input_fn.block;
    *input_fn.block = syn::parse_quote! {
        {
            fn _f() {}
            fn _get_name<T>(_: T) -> &'static str {
                let n = core::any::type_name::<T>();
                &n[..n.len() - 4]
            }
            grading::run_with_deadline(
                _get_name(_f),
                core::time::Duration::from_millis(#millis),
                move || { #block },
            )
        }
    };
    TokenStream::from(quote_spanned! { input_fn.span() =>
        #input_fn
    })
}
