use proc_macro2::{Ident, Literal, TokenStream as TokenStream2, TokenTree};
use quote::{format_ident, quote};

use crate::parse::{Body, CodecAttr, DefaultAttr, Field, Item, Variant};

pub fn emit(item: &Item) -> TokenStream2 {
    match &item.body {
        Body::Struct(fields) => emit_struct(&item.name, fields),
        Body::Enum(variants) => emit_enum(&item.name, variants),
    }
}

fn emit_struct(name: &Ident, fields: &[Field]) -> TokenStream2 {
    let type_name = name.to_string();

    let takes = fields.iter().enumerate().map(|(index, field)| {
        let field_name = &field.name;
        let ty = &field.ty;
        quote! { #field_name: args.take::<#ty>(#index)? }
    });

    let views = fields.iter().map(|field| {
        let field_name = &field.name;
        quote! { &value.#field_name as &dyn ::core::any::Any }
    });

    let mut helpers = Vec::new();
    let mut shapes = Vec::new();
    for (index, field) in fields.iter().enumerate() {
        let key = field.key();
        let ty = &field.ty;
        let type_ref = match (&field.attrs.deserialize_as, &field.attrs.codec) {
            (Some(concrete), _) => quote! { ::seedling::TypeRef::of::<#concrete>() },
            (None, Some(_)) => quote! { ::seedling::TypeRef::opaque::<#ty>() },
            (None, None) => quote! { ::seedling::TypeRef::of::<#ty>() },
        };
        let mut shape = quote! { ::seedling::FieldShape::new(#key, #type_ref) };

        if let Some(alias) = &field.attrs.rename {
            shape.extend(quote! { .rename(#alias) });
        }
        if field.attrs.skip {
            shape.extend(quote! { .skip() });
        }
        if let Some(default) = &field.attrs.default {
            let default_fn = format_ident!("__default_{}", key);
            let expr = match default {
                DefaultAttr::Trait => quote! { <#ty as ::core::default::Default>::default() },
                DefaultAttr::Expr(expr) => quote! { #expr },
            };
            helpers.push(quote! {
                fn #default_fn() -> ::seedling::Erased {
                    let value: #ty = #expr;
                    ::std::boxed::Box::new(value)
                }
            });
            shape.extend(quote! { .default_with(#default_fn) });
        } else if field.attrs.codec.is_some() && is_option(ty) {
            // opaque types are never optional, so codec fields get their `None` here
            let none_fn = format_ident!("__none_{}", key);
            helpers.push(quote! {
                fn #none_fn() -> ::seedling::Erased {
                    let value: #ty = ::core::option::Option::None;
                    ::std::boxed::Box::new(value)
                }
            });
            shape.extend(quote! { .default_with(#none_fn) });
        }
        if let Some(concrete) = &field.attrs.deserialize_as {
            let convert_fn = format_ident!("__convert_{}", key);
            helpers.push(quote! {
                fn #convert_fn(
                    value: ::seedling::Erased,
                ) -> ::core::result::Result<::seedling::Erased, ::seedling::ArgumentError> {
                    let concrete = value.downcast::<#concrete>().map_err(|_| {
                        ::seedling::ArgumentError::TypeMismatch {
                            type_name: #type_name,
                            index: #index,
                            expected: ::core::any::type_name::<#concrete>(),
                        }
                    })?;
                    let value: #ty = concrete;
                    ::core::result::Result::Ok(::std::boxed::Box::new(value))
                }
            });
            shape.extend(quote! { .convert(#convert_fn) });
        }
        if let Some(codec) = &field.attrs.codec {
            let codec_ref = match codec {
                CodecAttr::Owned(path) => {
                    helpers.push(quote! { __codec_for::<#path, #ty>(); });
                    quote! { ::seedling::CodecRef::of::<#path>() }
                }
                CodecAttr::Shared(path) => {
                    helpers.push(quote! { __codec_for::<#path, #ty>(); });
                    quote! { ::seedling::CodecRef::shared::<#path>() }
                }
            };
            shape.extend(quote! { .codec(#codec_ref) });
        }
        shapes.push(shape);
    }

    quote! {
        #[automatically_derived]
        impl ::seedling::Describe for #name {
            fn shape() -> ::seedling::Shape {
                // a codec's `Value` must be the type of the field it is attached to
                #[allow(dead_code)]
                fn __codec_for<C: ::seedling::ValueCodec<Value = T>, T>() {}

                #[allow(unused_variables)]
                fn __construct(
                    args: &mut ::seedling::Arguments,
                ) -> ::core::result::Result<::seedling::Erased, ::seedling::ArgumentError> {
                    let value = #name { #(#takes,)* };
                    ::core::result::Result::Ok(::std::boxed::Box::new(value))
                }

                #[allow(unused_variables)]
                fn __inspect(
                    value: &dyn ::core::any::Any,
                ) -> ::core::option::Option<::std::vec::Vec<&dyn ::core::any::Any>> {
                    let value = value.downcast_ref::<#name>()?;
                    ::core::option::Option::Some(::std::vec![#(#views),*])
                }

                #(#helpers)*

                ::seedling::Shape::structure(
                    #type_name,
                    ::std::vec![#(#shapes),*],
                    __construct,
                    __inspect,
                )
            }
        }
    }
}

fn emit_enum(name: &Ident, variants: &[Variant]) -> TokenStream2 {
    let type_name = name.to_string();

    let keys: Vec<Literal> = variants
        .iter()
        .map(|variant| match &variant.rename {
            Some(alias) => alias.clone(),
            None => Literal::string(&variant.key()),
        })
        .collect();
    let idents: Vec<&Ident> = variants.iter().map(|variant| &variant.name).collect();

    quote! {
        #[automatically_derived]
        impl ::seedling::Describe for #name {
            fn shape() -> ::seedling::Shape {
                fn __decode(
                    raw: &::seedling::ScalarValue,
                ) -> ::core::result::Result<::seedling::Erased, ::seedling::DecodeError> {
                    let variant = raw.as_str().ok_or(::seedling::DecodeError::Mismatch {
                        expected: "a variant name",
                    })?;
                    let value = match variant {
                        #(#keys => #name::#idents,)*
                        _ => {
                            return ::core::result::Result::Err(
                                ::seedling::DecodeError::UnknownVariant {
                                    type_name: #type_name,
                                    variant: ::std::string::ToString::to_string(variant),
                                },
                            );
                        }
                    };
                    ::core::result::Result::Ok(::std::boxed::Box::new(value))
                }

                fn __encode(
                    value: &dyn ::core::any::Any,
                ) -> ::core::option::Option<::seedling::ScalarValue> {
                    let variant = match value.downcast_ref::<#name>()? {
                        #(#name::#idents => #keys,)*
                    };
                    ::core::option::Option::Some(::seedling::ScalarValue::from(variant))
                }

                ::seedling::Shape::scalar(
                    #type_name,
                    ::seedling::ScalarDef {
                        decode: __decode,
                        encode: __encode,
                    },
                )
            }
        }
    }
}

/// Whether a field type is spelled as `Option<..>` (with or without a path).
fn is_option(ty: &TokenStream2) -> bool {
    let mut last = None;
    for tt in ty.clone() {
        match tt {
            TokenTree::Ident(ident) => last = Some(ident),
            TokenTree::Punct(p) if p.as_char() == '<' => break,
            TokenTree::Punct(_) => {}
            _ => return false,
        }
    }
    last.is_some_and(|ident| ident == "Option")
}

#[cfg(test)]
mod tests {
    use quote::quote;

    use super::*;

    #[test]
    fn option_types_are_recognized() {
        assert!(is_option(&quote!(Option<String>)));
        assert!(is_option(&quote!(::core::option::Option<u8>)));
        assert!(!is_option(&quote!(Vec<Option<u8>>)));
        assert!(!is_option(&quote!(String)));
    }
}
