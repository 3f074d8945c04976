use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{Error, FnArg, Ident, ItemFn, Pat, Signature, Type, parse_macro_input};

/// Runs a test against a freshly started default event loop.
///
/// The annotated function takes a single `&tickloop::DefaultLoop`
/// argument. The generated `#[test]` installs the test subscriber, builds
/// and starts a new loop, runs the body, and then requires a clean
/// teardown.
///
/// ```rust,ignore
/// #[tickloop::test]
/// fn fires(event_loop: &tickloop::DefaultLoop) {
///     event_loop.schedule(Duration::from_millis(5), || {});
/// }
/// ```
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);

    expand(attr.into(), input)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}

fn expand(attr: TokenStream2, input: ItemFn) -> syn::Result<TokenStream2> {
    if !attr.is_empty() {
        return Err(Error::new(
            Span::call_site(),
            "#[tickloop::test] does not take arguments",
        ));
    }

    let attrs = &input.attrs;
    let vis = &input.vis;
    let sig = &input.sig;
    let block = &input.block;
    let name = &sig.ident;

    if let Some(asyncness) = sig.asyncness {
        return Err(Error::new_spanned(
            asyncness,
            "#[tickloop::test] functions must not be async",
        ));
    }

    let (binding, ty) = loop_argument(sig)?;

    Ok(quote! {
        #[test]
        #(#attrs)*
        #vis fn #name() {
            ::tickloop::trace::init_tracing();

            let __default = ::tickloop::DefaultLoop::new()
                .expect("failed to create event loop");
            __default
                .event_loop()
                .init()
                .expect("failed to start event loop");

            {
                let #binding: #ty = &__default;
                #block
            }

            __default
                .event_loop()
                .teardown()
                .expect("failed to tear down event loop");
        }
    })
}

/// Extracts the single `name: &DefaultLoop` argument.
fn loop_argument(sig: &Signature) -> syn::Result<(Ident, Type)> {
    if sig.inputs.len() != 1 {
        return Err(Error::new_spanned(
            &sig.inputs,
            "#[tickloop::test] functions take exactly one `&DefaultLoop` argument",
        ));
    }

    let arg = match sig.inputs.first() {
        Some(FnArg::Typed(arg)) => arg,
        Some(other) => {
            return Err(Error::new_spanned(
                other,
                "#[tickloop::test] cannot be used on methods",
            ));
        }
        None => {
            return Err(Error::new_spanned(
                &sig.inputs,
                "#[tickloop::test] functions take exactly one `&DefaultLoop` argument",
            ));
        }
    };

    let binding = match arg.pat.as_ref() {
        Pat::Ident(ident) => ident.ident.clone(),
        other => return Err(Error::new_spanned(other, "expected a plain identifier")),
    };

    if !is_default_loop_ref(&arg.ty) {
        return Err(Error::new_spanned(
            &arg.ty,
            "expected `&DefaultLoop` or `&tickloop::DefaultLoop`",
        ));
    }

    Ok((binding, (*arg.ty).clone()))
}

/// Accepts a shared reference to a path ending in `DefaultLoop`.
fn is_default_loop_ref(ty: &Type) -> bool {
    let Type::Reference(reference) = ty else {
        return false;
    };

    if reference.mutability.is_some() {
        return false;
    }

    match reference.elem.as_ref() {
        Type::Path(path) if path.qself.is_none() => path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "DefaultLoop" && segment.arguments.is_empty()),
        _ => false,
    }
}
