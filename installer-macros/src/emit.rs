use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::ItemFn;

pub(crate) fn emit_flushing_method(method: &ItemFn) -> TokenStream2 {
    let attrs = &method.attrs;
    let vis = &method.vis;
    let sig = &method.sig;
    let method_name = &sig.ident;
    let original_block = &method.block;

    let inputs: Vec<_> = sig.inputs.iter().collect();
    let generics = &sig.generics;
    let output = &sig.output;

    quote! {
        #(#attrs)*
        #[allow(clippy::too_many_arguments)]
        #vis async fn #method_name #generics ( #(#inputs),* ) #output {
            let __result = async #original_block.await;

            // The flush runs whether or not the body reported any change.
            self.flush_property_changes();

            __result
        }
    }
}
