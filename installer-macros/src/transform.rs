use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{FnArg, ItemFn, Receiver};

use crate::emit::emit_flushing_method;

pub(crate) fn transform_method(method: &ItemFn) -> TokenStream2 {
    let sig = &method.sig;

    if sig.asyncness.is_none() {
        return quote! {
            compile_error!("#[emits_properties_changed] only supports async methods");
        };
    }

    let receiver = sig.inputs.iter().find_map(|arg| match arg {
        FnArg::Receiver(receiver) => Some(receiver),
        FnArg::Typed(_) => None,
    });

    match receiver {
        Some(Receiver {
            reference: Some(_),
            mutability: Some(_),
            ..
        }) => emit_flushing_method(method),
        _ => quote! {
            compile_error!("#[emits_properties_changed] requires a &mut self receiver");
        },
    }
}
