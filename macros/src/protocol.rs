//! Derives for the wire `Encode` and `Decode` traits.
//!
//! Structs encode their named fields in declaration order. Enums must be
//! fieldless and carry `#[encoding(discriminant = "varint")]`, with an
//! `#[encoding(id = N)]` on every variant.

use darling::{FromDeriveInput, FromField, FromMeta, FromVariant};
use proc_macro2::{Ident, TokenStream};
use quote::quote;
use syn::{spanned::Spanned, Data, DataEnum, DataStruct, DeriveInput, Fields};

/// Field attributes, as written in `#[encoding(...)]`.
#[derive(Default, Debug, FromField)]
#[darling(attributes(encoding), forward_attrs(allow, doc, cfg))]
#[darling(default)]
struct FieldOptions {
    ident: Option<Ident>,
    /// VarInt instead of the type's fixed width.
    varint: bool,
    /// String carried as a JSON chat component.
    text: bool,
    /// Character ceiling of a string, or element ceiling of a list.
    max_length: Option<usize>,
    length_prefix: Option<LengthPrefix>,
}

#[derive(Debug, FromMeta)]
enum LengthPrefix {
    #[darling(rename = "varint")]
    VarInt,
}

#[derive(Debug, FromDeriveInput)]
#[darling(attributes(encoding), forward_attrs(allow, doc, cfg))]
struct EnumOptions {
    discriminant: Discriminant,
}

#[derive(Debug, FromMeta)]
enum Discriminant {
    #[darling(rename = "varint")]
    VarInt,
}

#[derive(Debug, FromVariant)]
#[darling(attributes(encoding), forward_attrs(allow, doc, cfg))]
struct VariantOptions {
    ident: Ident,
    id: i32,
}

/// How a single field goes over the wire.
enum FieldCodec {
    /// The field type's own `Encode`/`Decode`.
    Plain,
    VarInt,
    Text,
    BoundedString(usize),
    List { max: Option<usize> },
}

struct Field {
    ident: Ident,
    codec: FieldCodec,
}

impl Field {
    fn parse(field: &syn::Field) -> syn::Result<Self> {
        let options = FieldOptions::from_field(field)?;
        let ident = options
            .ident
            .clone()
            .ok_or_else(|| syn::Error::new(field.span(), "only named fields are supported"))?;
        let codec = match options {
            FieldOptions {
                length_prefix: Some(LengthPrefix::VarInt),
                varint: false,
                text: false,
                max_length,
                ..
            } => FieldCodec::List { max: max_length },
            FieldOptions {
                varint: true,
                text: false,
                max_length: None,
                length_prefix: None,
                ..
            } => FieldCodec::VarInt,
            FieldOptions {
                text: true,
                varint: false,
                max_length: None,
                length_prefix: None,
                ..
            } => FieldCodec::Text,
            FieldOptions {
                max_length: Some(max),
                varint: false,
                text: false,
                length_prefix: None,
                ..
            } => FieldCodec::BoundedString(max),
            FieldOptions {
                varint: false,
                text: false,
                max_length: None,
                length_prefix: None,
                ..
            } => FieldCodec::Plain,
            _ => {
                return Err(syn::Error::new(
                    field.span(),
                    "conflicting encoding options; `max_length` only combines with `length_prefix`",
                ))
            }
        };
        Ok(Self { ident, codec })
    }

    fn encode(&self) -> TokenStream {
        let ident = &self.ident;
        match self.codec {
            FieldCodec::Plain => quote! {
                crate::protocol::Encode::encode(&self.#ident, encoder)?;
            },
            FieldCodec::VarInt => quote! {
                encoder.write_var_int(::std::convert::Into::<i32>::into(self.#ident));
            },
            FieldCodec::Text => quote! {
                encoder.write_text(&self.#ident)?;
            },
            FieldCodec::BoundedString(max) => quote! {
                encoder.write_string_max(&self.#ident, #max)?;
            },
            FieldCodec::List { .. } => quote! {
                encoder.write_length(self.#ident.len())?;
                for element in &self.#ident {
                    crate::protocol::Encode::encode(element, encoder)?;
                }
            },
        }
    }

    fn decode(&self) -> TokenStream {
        let ident = &self.ident;
        match self.codec {
            FieldCodec::Plain => quote! {
                let #ident = crate::protocol::Decode::decode(decoder)?;
            },
            FieldCodec::VarInt => quote! {
                let #ident = ::std::convert::TryFrom::try_from(decoder.read_var_int()?)?;
            },
            FieldCodec::Text => quote! {
                let #ident = decoder.read_text()?;
            },
            FieldCodec::BoundedString(max) => quote! {
                let #ident = decoder.read_string_max(#max)?.to_owned();
            },
            FieldCodec::List { max } => {
                let max = match max {
                    Some(max) => quote! { #max },
                    None => quote! { usize::MAX },
                };
                quote! {
                    let #ident = {
                        let length = decoder.read_length(#max)?;
                        let mut elements = Vec::with_capacity(length.min(decoder.remaining()));
                        for _ in 0..length {
                            elements.push(crate::protocol::Decode::decode(decoder)?);
                        }
                        elements
                    };
                }
            }
        }
    }
}

fn struct_fields(data: &DataStruct) -> syn::Result<Vec<Field>> {
    match &data.fields {
        Fields::Named(named) => named.named.iter().map(Field::parse).collect(),
        Fields::Unit => Ok(Vec::new()),
        Fields::Unnamed(unnamed) => Err(syn::Error::new_spanned(
            unnamed,
            "tuple structs are unsupported",
        )),
    }
}

fn enum_variants(data: &DataEnum, input: &DeriveInput) -> syn::Result<Vec<VariantOptions>> {
    let EnumOptions {
        discriminant: Discriminant::VarInt,
    } = EnumOptions::from_derive_input(input)?;
    data.variants
        .iter()
        .map(|variant| {
            if !matches!(variant.fields, Fields::Unit) {
                return Err(syn::Error::new_spanned(
                    &variant.fields,
                    "only fieldless variants are supported",
                ));
            }
            Ok(VariantOptions::from_variant(variant)?)
        })
        .collect()
}

pub fn derive_encode_on(input: &DeriveInput) -> syn::Result<TokenStream> {
    let body = match &input.data {
        Data::Struct(data) => {
            let fields = struct_fields(data)?;
            let encode = fields.iter().map(Field::encode);
            quote! {
                #(#encode)*
                Ok(())
            }
        }
        Data::Enum(data) => {
            let arms = enum_variants(data, input)?.into_iter().map(|VariantOptions { ident, id }| {
                quote! { Self::#ident => #id }
            });
            quote! {
                encoder.write_var_int(match self {
                    #(#arms,)*
                });
                Ok(())
            }
        }
        Data::Union(u) => return Err(syn::Error::new_spanned(u.union_token, "unions are unsupported")),
    };

    let ident = &input.ident;
    Ok(quote! {
        impl crate::protocol::Encode for #ident {
            #[allow(unused_variables)]
            fn encode(&self, encoder: &mut crate::protocol::Encoder) -> ::std::result::Result<(), crate::protocol::EncodeError> {
                #body
            }
        }
    })
}

pub fn derive_decode_on(input: &DeriveInput) -> syn::Result<TokenStream> {
    let ident = &input.ident;
    let body = match &input.data {
        Data::Struct(data) => {
            let fields = struct_fields(data)?;
            let decode = fields.iter().map(Field::decode);
            let names = fields.iter().map(|field| &field.ident);
            quote! {
                #(#decode)*
                Ok(Self { #(#names,)* })
            }
        }
        Data::Enum(data) => {
            let arms = enum_variants(data, input)?.into_iter().map(|VariantOptions { ident, id }| {
                quote! { #id => Ok(Self::#ident) }
            });
            let name = ident.to_string();
            quote! {
                match decoder.read_var_int()? {
                    #(#arms,)*
                    ordinal => Err(crate::protocol::DecodeError::UnknownOrdinal { ordinal, name: #name }),
                }
            }
        }
        Data::Union(u) => return Err(syn::Error::new_spanned(u.union_token, "unions are unsupported")),
    };

    Ok(quote! {
        impl crate::protocol::Decode for #ident {
            #[allow(unused_variables)]
            fn decode(decoder: &mut crate::protocol::Decoder) -> ::std::result::Result<Self, crate::protocol::DecodeError> {
                #body
            }
        }
    })
}
