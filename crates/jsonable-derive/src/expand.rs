use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{Data, DataEnum, DeriveInput, Error, Expr, Fields, Ident, LitStr, Result, Type};

use crate::attrs::{variant_value, ContainerAttrs, FieldAttrs, FieldDefault, Role};

pub(crate) fn derive(input: DeriveInput) -> Result<TokenStream> {
    if !input.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &input.generics,
            "#[derive(Jsonable)] does not support generic types",
        ));
    }
    let attrs = ContainerAttrs::parse(&input.attrs)?;
    let ident = &input.ident;

    let parts = match &input.data {
        Data::Struct(data) if attrs.model => model_parts(ident, &data.fields)?,
        Data::Struct(data) => reflect_parts(ident, &data.fields)?,
        Data::Enum(data) => {
            if attrs.record || attrs.model {
                return Err(Error::new_spanned(
                    ident,
                    "enums cannot be `record` or `model`",
                ));
            }
            enum_parts(ident, data)?
        }
        Data::Union(_) => {
            return Err(Error::new_spanned(ident, "unions cannot derive Jsonable"));
        }
    };

    let module = match &attrs.module {
        Some(module) => quote!(#module),
        None => quote!(::core::module_path!()),
    };
    let name = match &attrs.name {
        Some(name) => name.clone(),
        None => LitStr::new(&ident.unraw().to_string(), ident.span()),
    };
    let version = if attrs.record {
        quote!(::core::option::Option::None)
    } else {
        match &attrs.version {
            Some(version) => quote!(::core::option::Option::Some(::std::string::String::from(#version))),
            None => quote! {
                ::core::option::Option::Some(::std::string::String::from(::core::env!("CARGO_PKG_VERSION")))
            },
        }
    };
    let kind = if attrs.record {
        quote!(Record)
    } else if attrs.model {
        quote!(Model)
    } else if matches!(input.data, Data::Enum(_)) {
        quote!(Enum)
    } else {
        quote!(Object)
    };

    let Parts {
        helpers,
        extra_impls,
        to_fields,
        from_fields,
        enum_value,
        from_value,
        schema,
    } = parts;
    let to_fields = match &attrs.to_fields {
        Some(path) => quote!(#path(self)),
        None => to_fields,
    };
    let from_fields = match &attrs.from_fields {
        Some(path) => quote!(#path(fields)),
        None => from_fields,
    };

    let registration = if cfg!(feature = "auto_register") && !attrs.no_register {
        quote! {
            ::jsonable::__private::inventory::submit! {
                ::jsonable::__private::Registration(::jsonable::__private::register::<#ident>)
            }
        }
    } else {
        TokenStream::new()
    };

    Ok(quote! {
        const _: () = {
            #helpers

            impl ::jsonable::Jsonable for #ident {
                fn type_tag(&self) -> ::jsonable::TypeTag {
                    <Self as ::jsonable::JsonableType>::tag()
                }

                fn version(&self) -> ::core::option::Option<::std::string::String> {
                    #version
                }

                fn kind(&self) -> ::jsonable::Kind {
                    ::jsonable::Kind::#kind
                }

                fn to_fields(&self) -> ::jsonable::Result<::jsonable::Fields> {
                    #to_fields
                }

                #enum_value
            }

            impl ::jsonable::JsonableType for #ident {
                fn tag() -> ::jsonable::TypeTag {
                    ::jsonable::TypeTag::new(#module, #name)
                }

                fn from_fields(fields: ::jsonable::Fields) -> ::jsonable::Result<Self> {
                    #from_fields
                }
            }

            impl ::jsonable::ToValue for #ident {
                fn to_value(&self) -> ::jsonable::Value {
                    ::jsonable::Value::Object(::std::sync::Arc::new(::core::clone::Clone::clone(self)))
                }
            }

            impl ::jsonable::FromValue for #ident {
                fn from_value(
                    value: ::jsonable::Value,
                ) -> ::core::result::Result<Self, ::jsonable::Mismatch> {
                    #from_value
                }
            }

            impl ::jsonable::SchemaOf for #ident {
                fn json_schema() -> ::jsonable::__private::Json {
                    #schema
                }
            }

            #extra_impls

            #registration
        };
    })
}

/// Generated pieces that differ per container kind.
struct Parts {
    helpers: TokenStream,
    extra_impls: TokenStream,
    to_fields: TokenStream,
    from_fields: TokenStream,
    enum_value: TokenStream,
    from_value: TokenStream,
    schema: TokenStream,
}

struct Field<'a> {
    ident: &'a Ident,
    ty: &'a Type,
    attrs: FieldAttrs,
    /// Constructor parameter name.
    param: LitStr,
}

fn named_fields(fields: &Fields) -> Result<Vec<Field<'_>>> {
    match fields {
        Fields::Named(named) => named
            .named
            .iter()
            .map(|field| {
                let attrs = FieldAttrs::parse(&field.attrs)?;
                let ident = field
                    .ident
                    .as_ref()
                    .ok_or_else(|| Error::new_spanned(field, "expected a named field"))?;
                let param = match &attrs.param {
                    Some(param) => param.clone(),
                    None => LitStr::new(&ident.unraw().to_string(), ident.span()),
                };
                Ok(Field {
                    ident,
                    ty: &field.ty,
                    attrs,
                    param,
                })
            })
            .collect(),
        Fields::Unit => Ok(Vec::new()),
        Fields::Unnamed(unnamed) => Err(Error::new_spanned(
            unnamed,
            "tuple structs cannot derive Jsonable; use named fields",
        )),
    }
}

fn struct_literal(fields: &Fields, inits: &[TokenStream]) -> TokenStream {
    match fields {
        Fields::Unit => quote!(Self),
        _ => quote!(Self { #(#inits),* }),
    }
}

fn default_value(default: &FieldDefault) -> TokenStream {
    match default {
        FieldDefault::Expr(expr) => quote!(|| #expr),
        _ => quote!(::core::default::Default::default),
    }
}

fn tag_schema() -> TokenStream {
    quote!(::jsonable::__private::tag_schema(&<Self as ::jsonable::JsonableType>::tag()))
}

fn object_from_value() -> TokenStream {
    quote!(::jsonable::__private::object_from_value(value))
}

/// Object and record kinds: the constructor-signature layout.
fn reflect_parts(ident: &Ident, data: &Fields) -> Result<Parts> {
    let fields = named_fields(data)?;
    let mut params = Vec::new();
    let mut attributes = Vec::new();
    let mut inits = Vec::new();

    for field in &fields {
        let member = field.ident;
        let param = &field.param;
        let init = match field.attrs.role {
            Role::Skip => quote!(::core::default::Default::default()),
            Role::VarArgs => quote!(args.var_args()?),
            Role::VarKwargs => quote!(args.var_kwargs()?),
            Role::Param => match &field.attrs.default {
                FieldDefault::None => quote!(args.take(#param)?),
                default => {
                    let default = default_value(default);
                    quote!(args.take_or(#param, #default)?)
                }
            },
        };
        inits.push(quote!(#member: #init));
        if field.attrs.role == Role::Skip {
            continue;
        }

        let constructor = match (field.attrs.role, field.attrs.keyword_only) {
            (Role::VarArgs, _) => quote!(var_args),
            (Role::VarKwargs, _) => quote!(var_kwargs),
            (_, true) => quote!(keyword_only),
            (_, false) => quote!(positional),
        };
        let optional = if field.attrs.has_default() {
            quote!(.optional())
        } else {
            TokenStream::new()
        };
        params.push(quote!(::jsonable::Param::#constructor(#param) #optional));

        let stored = member.unraw().to_string();
        let attribute = if field.attrs.private {
            format!("_{}", stored)
        } else {
            stored
        };
        attributes.push(quote! {
            #attribute => ::core::option::Option::Some(::jsonable::ToValue::to_value(&self.#member))
        });
    }

    let construct = struct_literal(data, &inits);
    let extra_impls = quote! {
        impl ::jsonable::Reflect for #ident {
            fn signature() -> &'static [::jsonable::Param] {
                const SIGNATURE: &[::jsonable::Param] = &[#(#params),*];
                SIGNATURE
            }

            fn attribute(&self, name: &str) -> ::core::option::Option<::jsonable::Value> {
                match name {
                    #(#attributes,)*
                    _ => ::core::option::Option::None,
                }
            }

            #[allow(unused_mut, unused_variables)]
            fn construct(mut args: ::jsonable::Arguments) -> ::jsonable::Result<Self> {
                ::core::result::Result::Ok(#construct)
            }
        }
    };

    Ok(Parts {
        helpers: TokenStream::new(),
        extra_impls,
        to_fields: quote!(::jsonable::reflect::to_fields(self)),
        from_fields: quote!(::jsonable::reflect::from_fields(fields)),
        enum_value: TokenStream::new(),
        from_value: object_from_value(),
        schema: tag_schema(),
    })
}

/// Model kind: declared fields validated one by one.
fn model_parts(ident: &Ident, data: &Fields) -> Result<Parts> {
    let fields = named_fields(data)?;
    let mut inserts = Vec::new();
    let mut inits = Vec::new();
    let mut properties = Vec::new();

    for field in &fields {
        let member = field.ident;
        let name = &field.param;
        let ty = field.ty;
        match field.attrs.role {
            Role::Skip => {
                inits.push(quote!(#member: ::core::default::Default::default()));
                continue;
            }
            Role::VarArgs | Role::VarKwargs => {
                return Err(Error::new_spanned(
                    member,
                    "model fields cannot be variadic",
                ));
            }
            Role::Param => {}
        }
        inserts.push(quote! {
            fields.insert(
                ::std::string::String::from(#name),
                ::jsonable::ToValue::to_value(&self.#member),
            );
        });
        let init = match &field.attrs.default {
            FieldDefault::None => quote!(reader.required(#name)?),
            default => {
                let default = default_value(default);
                quote!(reader.optional(#name, #default)?)
            }
        };
        inits.push(quote!(#member: #init));
        let required = !field.attrs.has_default();
        properties.push(quote! {
            (#name, <#ty as ::jsonable::SchemaOf>::json_schema(), #required)
        });
    }

    let construct = struct_literal(data, &inits);
    let title = LitStr::new(&ident.unraw().to_string(), ident.span());
    Ok(Parts {
        helpers: TokenStream::new(),
        extra_impls: TokenStream::new(),
        to_fields: quote! {
            let mut fields = ::jsonable::Fields::new();
            #(#inserts)*
            ::core::result::Result::Ok(fields)
        },
        from_fields: quote! {
            let class = <Self as ::jsonable::JsonableType>::tag().class;
            #[allow(unused_mut, unused_variables)]
            let mut reader = ::jsonable::__private::FieldReader::new(class, fields);
            ::core::result::Result::Ok(#construct)
        },
        enum_value: TokenStream::new(),
        from_value: object_from_value(),
        schema: quote! {
            let properties: ::std::vec::Vec<(&str, ::jsonable::__private::Json, bool)> =
                ::std::vec![#(#properties),*];
            ::jsonable::__private::model_schema(#title, properties)
        },
    })
}

/// Unit-only enums: each member stands for a raw constant.
fn enum_parts(ident: &Ident, data: &DataEnum) -> Result<Parts> {
    let mut variants = Vec::new();
    let mut values: Vec<Expr> = Vec::new();
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(Error::new_spanned(
                variant,
                "only unit variants can derive Jsonable",
            ));
        }
        let value = match variant_value(&variant.attrs)? {
            Some(value) => value,
            None => {
                let name = LitStr::new(&variant.ident.unraw().to_string(), variant.ident.span());
                syn::parse_quote!(#name)
            }
        };
        variants.push(&variant.ident);
        values.push(value);
    }

    let helpers = quote! {
        fn raw_value(member: &#ident) -> ::jsonable::Value {
            match *member {
                #(#ident::#variants => ::jsonable::ToValue::to_value(&(#values)),)*
            }
        }

        fn from_raw(raw: &::jsonable::Value) -> ::core::option::Option<#ident> {
            #(
                if *raw == ::jsonable::ToValue::to_value(&(#values)) {
                    return ::core::option::Option::Some(#ident::#variants);
                }
            )*
            ::core::option::Option::None
        }
    };

    Ok(Parts {
        helpers,
        extra_impls: TokenStream::new(),
        to_fields: quote! {
            let mut fields = ::jsonable::Fields::new();
            fields.insert(::std::string::String::from("value"), raw_value(self));
            ::core::result::Result::Ok(fields)
        },
        from_fields: quote! {
            let raw = fields.get("value").cloned().unwrap_or_default();
            from_raw(&raw).ok_or_else(|| ::jsonable::Error::IncompatibleConstructor {
                class: <Self as ::jsonable::JsonableType>::tag().class,
                reason: ::std::format!("no member has the value {}", raw.display()),
            })
        },
        enum_value: quote! {
            fn enum_value(&self) -> ::core::option::Option<::jsonable::Value> {
                ::core::option::Option::Some(raw_value(self))
            }
        },
        from_value: quote! {
            if let ::core::option::Option::Some(member) = from_raw(&value) {
                return ::core::result::Result::Ok(member);
            }
            ::jsonable::__private::object_from_value(value)
        },
        schema: tag_schema(),
    })
}
