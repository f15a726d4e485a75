use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields, FieldsNamed, LitStr};

/// Derive macro for implementing `async_htm::IntoProps`
///
/// Every named field becomes a prop, converted with `Into<Value>`. The
/// derive also implements `From<T> for async_htm::Value`, producing a map
/// that can be spread into an element with `...${record}`.
///
/// # Examples
///
/// ```ignore
/// use async_htm::IntoProps;
///
/// #[derive(IntoProps)]
/// struct Link {
///     href: String,
///     #[props(rename = "aria-label")]
///     label: Option<String>,
///     #[props(skip)]
///     visits: u64,
/// }
/// ```
#[proc_macro_derive(IntoProps, attributes(props))]
pub fn derive_into_props(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match generate_into_props_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn generate_into_props_impl(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let data = match &input.data {
        Data::Struct(data) => data,
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "IntoProps can only be derived for structs",
            ))
        }
    };

    let fields = match &data.fields {
        Fields::Named(fields) => fields,
        Fields::Unnamed(_) => {
            return Err(syn::Error::new_spanned(input, "IntoProps requires named fields"))
        }
        Fields::Unit => {
            return Err(syn::Error::new_spanned(
                input,
                "IntoProps cannot be derived for unit structs",
            ))
        }
    };

    let inserts = generate_prop_inserts(fields)?;
    let capacity = inserts.len();

    Ok(quote! {
        impl #impl_generics ::async_htm::IntoProps for #name #ty_generics #where_clause {
            fn into_props(self) -> ::async_htm::Props {
                let mut props = ::async_htm::Props::with_capacity(#capacity);
                #(#inserts)*
                props
            }
        }

        impl #impl_generics ::core::convert::From<#name #ty_generics> for ::async_htm::Value #where_clause {
            fn from(record: #name #ty_generics) -> Self {
                ::async_htm::Value::Object(::async_htm::IntoProps::into_props(record))
            }
        }
    })
}

fn generate_prop_inserts(fields: &FieldsNamed) -> syn::Result<Vec<TokenStream2>> {
    let mut inserts = Vec::new();

    for field in &fields.named {
        let Some(field_name) = field.ident.as_ref() else {
            continue;
        };

        let attrs = parse_field_attributes(&field.attrs)?;
        if attrs.skip {
            continue;
        }

        let prop_name = attrs.rename.unwrap_or_else(|| field_name.to_string());
        inserts.push(quote! {
            props.insert(
                ::std::string::String::from(#prop_name),
                ::core::convert::Into::<::async_htm::Value>::into(self.#field_name),
            );
        });
    }

    Ok(inserts)
}

#[derive(Default)]
struct FieldAttributes {
    skip: bool,
    rename: Option<String>,
}

fn parse_field_attributes(attrs: &[Attribute]) -> syn::Result<FieldAttributes> {
    let mut result = FieldAttributes::default();

    for attr in attrs {
        if !attr.path().is_ident("props") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                result.skip = true;
                Ok(())
            } else if meta.path.is_ident("rename") {
                let value: LitStr = meta.value()?.parse()?;
                result.rename = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("expected `skip` or `rename = \"...\"`"))
            }
        })?;
    }

    Ok(result)
}
