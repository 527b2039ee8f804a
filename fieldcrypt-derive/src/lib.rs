//! Derive macros for `fieldcrypt`.
//!
//! `#[derive(Entity)]` writes the static schema table and the string field
//! accessors the encryption interceptors work through.

#![warn(clippy::pedantic, clippy::nursery)]

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::ext::IdentExt;
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Fields, GenericArgument, Ident, LitStr,
    PathArguments, Type,
};

/// Derives `fieldcrypt::schema::Entity` and `fieldcrypt::schema::Model`.
///
/// # Attributes
///
/// - `#[entity(table = "...")]` on the struct sets the table name
///   (defaults to the snake-cased type name)
/// - `#[entity(column = "...")]` on a field sets its column name
///   (defaults to the field name)
/// - `#[crypto("aes")]` on a `String` or `Option<String>` field encrypts it
///   with the named strategy
///
/// # Example
///
/// ```rust,ignore
/// use fieldcrypt::Entity;
///
/// #[derive(Entity, Default)]
/// #[entity(table = "test_user")]
/// struct User {
///     id: u64,
///     name: String,
///     #[crypto("aes")]
///     email: String,
///     #[crypto("aes")]
///     #[entity(column = "nick_name")]
///     nickname: Option<String>,
/// }
/// ```
#[proc_macro_derive(Entity, attributes(entity, crypto))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input).unwrap_or_else(syn::Error::into_compile_error).into()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    String,
    OptionalString,
    Other,
}

struct FieldSpec {
    ident: Ident,
    name: String,
    column: String,
    kind: Kind,
    crypto: Option<String>,
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            struct_name,
            "Entity can only be derived for structs with named fields",
        ));
    };
    let Fields::Named(named) = &data.fields else {
        return Err(syn::Error::new_spanned(
            struct_name,
            "Entity can only be derived for structs with named fields",
        ));
    };

    let table =
        parse_table(&input.attrs)?.unwrap_or_else(|| to_snake_case(&struct_name.to_string()));
    let fields = named
        .named
        .iter()
        .map(|f| {
            let ident =
                f.ident.clone().ok_or_else(|| syn::Error::new_spanned(f, "unnamed field"))?;
            parse_field(ident, &f.ty, &f.attrs)
        })
        .collect::<syn::Result<Vec<_>>>()?;

    let defs = fields.iter().map(|f| {
        let (name, column) = (&f.name, &f.column);
        let kind = match f.kind {
            Kind::String => quote!(::fieldcrypt::schema::FieldKind::String),
            Kind::OptionalString => quote!(::fieldcrypt::schema::FieldKind::OptionalString),
            Kind::Other => quote!(::fieldcrypt::schema::FieldKind::Other),
        };
        let def = quote!(::fieldcrypt::schema::FieldDef::new(#name, #column, #kind));
        match &f.crypto {
            Some(strategy) => quote!(#def.with_crypto(#strategy)),
            None => def,
        }
    });

    let type_name = struct_name.unraw().to_string();
    let entity_impl = quote! {
        impl #impl_generics ::fieldcrypt::schema::Entity for #struct_name #ty_generics #where_clause {
            const SCHEMA: &'static ::fieldcrypt::schema::Schema = {
                const FIELDS: &[::fieldcrypt::schema::FieldDef] = &[#(#defs),*];
                &::fieldcrypt::schema::Schema::new(
                    ::core::concat!(::core::module_path!(), "::", #type_name),
                    #table,
                    FIELDS,
                )
            };
        }
    };

    let model_impl = expand_model(input, &fields);

    Ok(quote! {
        #entity_impl
        #model_impl
    })
}

fn expand_model(input: &DeriveInput, fields: &[FieldSpec]) -> TokenStream2 {
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let mut get_arms = Vec::new();
    let mut set_arms = Vec::new();
    let mut others = Vec::new();

    for f in fields {
        let (ident, name) = (&f.ident, &f.name);
        match f.kind {
            Kind::String => {
                get_arms.push(quote! {
                    #name => ::core::result::Result::Ok(
                        ::core::option::Option::Some(self.#ident.as_str()),
                    )
                });
                set_arms.push(quote!(#name => self.#ident = value));
            }
            Kind::OptionalString => {
                get_arms.push(quote!(#name => ::core::result::Result::Ok(self.#ident.as_deref())));
                set_arms.push(quote!(#name => self.#ident = ::core::option::Option::Some(value)));
            }
            Kind::Other => others.push(name),
        }
    }

    let not_a_string = if others.is_empty() {
        None
    } else {
        Some(quote! {
            #(#others)|* => return ::core::result::Result::Err(
                ::fieldcrypt::error::FieldAccessError::not_a_string(schema, field),
            ),
        })
    };

    quote! {
        impl #impl_generics ::fieldcrypt::schema::Model for #struct_name #ty_generics #where_clause {
            fn schema(&self) -> &'static ::fieldcrypt::schema::Schema {
                <Self as ::fieldcrypt::schema::Entity>::SCHEMA
            }

            fn get_str(
                &self,
                field: &str,
            ) -> ::core::result::Result<::core::option::Option<&str>, ::fieldcrypt::error::FieldAccessError> {
                let schema = <Self as ::fieldcrypt::schema::Entity>::SCHEMA.name();
                match field {
                    #(#get_arms,)*
                    #not_a_string
                    _ => ::core::result::Result::Err(
                        ::fieldcrypt::error::FieldAccessError::unknown(schema, field),
                    ),
                }
            }

            fn set_str(
                &mut self,
                field: &str,
                value: ::std::string::String,
            ) -> ::core::result::Result<(), ::fieldcrypt::error::FieldAccessError> {
                let schema = <Self as ::fieldcrypt::schema::Entity>::SCHEMA.name();
                match field {
                    #(#set_arms,)*
                    #not_a_string
                    _ => {
                        let _ = value;
                        return ::core::result::Result::Err(
                            ::fieldcrypt::error::FieldAccessError::unknown(schema, field),
                        );
                    }
                }
                ::core::result::Result::Ok(())
            }
        }
    }
}

fn parse_table(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    let mut table = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("entity")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                table = Some(non_empty(meta.value()?.parse()?)?);
                Ok(())
            } else {
                Err(meta.error("unsupported entity attribute, expected `table`"))
            }
        })?;
    }
    Ok(table)
}

fn parse_field(ident: Ident, ty: &Type, attrs: &[Attribute]) -> syn::Result<FieldSpec> {
    let name = ident.unraw().to_string();
    let mut column = None;
    let mut crypto = None;

    for attr in attrs {
        if attr.path().is_ident("entity") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("column") {
                    column = Some(non_empty(meta.value()?.parse()?)?);
                    Ok(())
                } else {
                    Err(meta.error("unsupported entity attribute, expected `column`"))
                }
            })?;
        } else if attr.path().is_ident("crypto") {
            if crypto.is_some() {
                return Err(syn::Error::new_spanned(attr, "duplicate crypto attribute"));
            }
            crypto = Some(non_empty(attr.parse_args()?)?);
        }
    }

    Ok(FieldSpec {
        column: column.unwrap_or_else(|| name.clone()),
        kind: classify(ty),
        ident,
        name,
        crypto,
    })
}

fn non_empty(lit: LitStr) -> syn::Result<String> {
    let value = lit.value();
    if value.is_empty() {
        return Err(syn::Error::new_spanned(lit, "value must not be empty"));
    }
    Ok(value)
}

fn classify(ty: &Type) -> Kind {
    if is_string(ty) {
        return Kind::String;
    }
    match last_segment(ty) {
        Some(seg) if seg.ident == "Option" => match &seg.arguments {
            PathArguments::AngleBracketed(args) => match args.args.first() {
                Some(GenericArgument::Type(inner)) if args.args.len() == 1 && is_string(inner) => {
                    Kind::OptionalString
                }
                _ => Kind::Other,
            },
            _ => Kind::Other,
        },
        _ => Kind::Other,
    }
}

fn is_string(ty: &Type) -> bool {
    last_segment(ty).is_some_and(|seg| seg.ident == "String" && seg.arguments.is_none())
}

fn last_segment(ty: &Type) -> Option<&syn::PathSegment> {
    match ty {
        Type::Path(type_path) if type_path.qself.is_none() => type_path.path.segments.last(),
        _ => None,
    }
}

fn to_snake_case(name: &str) -> String {
    let name = name.strip_prefix("r#").unwrap_or(name);
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c.is_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.extend(c.to_lowercase());
            prev_lower = false;
        } else {
            out.push(c);
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
        }
    }
    out
}
