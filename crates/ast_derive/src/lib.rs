//! `#[derive(WalkAst)]` for gomorph AST nodes.
//!
//! The generated impl forwards every field to `crate::walk::Walk::walk` in
//! declaration order. Fields that are not child nodes (interned names,
//! comment lists, literal text) are excluded with `#[walk(skip)]`.

use proc_macro::TokenStream;
use quote::{format_ident, quote, quote_spanned};
use syn::{
    parse_macro_input, spanned::Spanned, Attribute, Data, DeriveInput, Field, Fields, Index,
};

#[proc_macro_derive(WalkAst, attributes(walk))]
pub fn derive_walk_ast(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let span = input.span();

    let walk_body = match generate_walk_body(&input.data) {
        Ok(body) => body,
        Err(err) => return err.into_compile_error().into(),
    };

    let expanded = quote_spanned! {span =>
        impl<'ast> crate::walk::Walk<'ast> for #name {
            #[inline]
            #[allow(unused_variables)]
            fn walk<V: crate::walk::Visitor<'ast> + ?Sized>(
                &self,
                a: &'ast crate::ast::AstArena,
                v: &mut V
            ) {
                #walk_body
            }
        }
    };

    expanded.into()
}

/// Returns `Ok(true)` when the field carries `#[walk(skip)]`.
fn is_skipped(attrs: &[Attribute]) -> syn::Result<bool> {
    let mut skip = false;
    for attr in attrs.iter().filter(|a| a.path().is_ident("walk")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                skip = true;
                Ok(())
            } else {
                Err(meta.error("unsupported walk attribute; expected `skip`"))
            }
        })?;
    }
    Ok(skip)
}

fn generate_walk_body(data: &Data) -> syn::Result<proc_macro2::TokenStream> {
    match data {
        Data::Struct(data_struct) => generate_fields_walk(&data_struct.fields),
        Data::Enum(data_enum) => {
            let arms = data_enum
                .variants
                .iter()
                .map(|variant| generate_variant_arm(&variant.ident, &variant.fields))
                .collect::<syn::Result<Vec<_>>>()?;

            Ok(quote! {
                match self {
                    #(#arms)*
                }
            })
        }
        Data::Union(u) => Err(syn::Error::new_spanned(
            u.union_token,
            "WalkAst cannot be derived for unions",
        )),
    }
}

fn generate_fields_walk(fields: &Fields) -> syn::Result<proc_macro2::TokenStream> {
    let mut calls = Vec::new();
    for (i, field) in fields.iter().enumerate() {
        if is_skipped(&field.attrs)? {
            continue;
        }
        let access = match &field.ident {
            Some(ident) => quote! { &self.#ident },
            None => {
                let index = Index::from(i);
                quote! { &self.#index }
            }
        };
        calls.push(quote! { crate::walk::Walk::walk(#access, a, v); });
    }
    Ok(quote! { #(#calls)* })
}

fn binding_for(i: usize, field: &Field) -> syn::Ident {
    match &field.ident {
        Some(ident) => ident.clone(),
        None => format_ident!("f{}", i),
    }
}

fn generate_variant_arm(
    variant_name: &syn::Ident,
    fields: &Fields,
) -> syn::Result<proc_macro2::TokenStream> {
    let mut walked = Vec::new();
    for (i, field) in fields.iter().enumerate() {
        if !is_skipped(&field.attrs)? {
            walked.push(binding_for(i, field));
        }
    }
    let calls = walked
        .iter()
        .map(|var| quote! { crate::walk::Walk::walk(#var, a, v); });

    Ok(match fields {
        Fields::Unit => quote! { Self::#variant_name => {} },
        Fields::Named(_) => quote! {
            Self::#variant_name { #(#walked,)* .. } => {
                #(#calls)*
            }
        },
        Fields::Unnamed(unnamed) => {
            let patterns = (0..unnamed.unnamed.len()).map(|i| {
                let var = format_ident!("f{}", i);
                if walked.contains(&var) {
                    quote! { #var }
                } else {
                    quote! { _ }
                }
            });
            quote! {
                Self::#variant_name(#(#patterns),*) => {
                    #(#calls)*
                }
            }
        }
    })
}
