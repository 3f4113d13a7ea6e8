//! Parsing of `#[jsonable(...)]` attributes.

use proc_macro2::Span;
use syn::{Attribute, Error, Expr, LitStr, Path, Result, Token};

pub(crate) const ATTR: &str = "jsonable";

#[derive(Debug, Default)]
pub(crate) struct ContainerAttrs {
    pub module: Option<LitStr>,
    pub name: Option<LitStr>,
    pub version: Option<LitStr>,
    pub record: bool,
    pub model: bool,
    pub to_fields: Option<Path>,
    pub from_fields: Option<Path>,
    pub no_register: bool,
}

impl ContainerAttrs {
    pub fn parse(attrs: &[Attribute]) -> Result<Self> {
        let mut out = ContainerAttrs::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident(ATTR)) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("module") {
                    out.module = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("name") {
                    out.name = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("version") {
                    out.version = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("record") {
                    out.record = true;
                } else if meta.path.is_ident("model") {
                    out.model = true;
                } else if meta.path.is_ident("to_fields") {
                    let path: LitStr = meta.value()?.parse()?;
                    out.to_fields = Some(path.parse()?);
                } else if meta.path.is_ident("from_fields") {
                    let path: LitStr = meta.value()?.parse()?;
                    out.from_fields = Some(path.parse()?);
                } else if meta.path.is_ident("no_register") {
                    out.no_register = true;
                } else {
                    return Err(meta.error("unknown jsonable container attribute"));
                }
                Ok(())
            })?;
        }
        if out.record && out.model {
            return Err(Error::new(
                Span::call_site(),
                "`record` and `model` are mutually exclusive",
            ));
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Role {
    Param,
    VarArgs,
    VarKwargs,
    Skip,
}

#[derive(Debug)]
pub(crate) enum FieldDefault {
    None,
    Default,
    Expr(Expr),
}

#[derive(Debug)]
pub(crate) struct FieldAttrs {
    pub private: bool,
    pub param: Option<LitStr>,
    pub default: FieldDefault,
    pub keyword_only: bool,
    pub role: Role,
}

impl FieldAttrs {
    pub fn parse(attrs: &[Attribute]) -> Result<Self> {
        let mut out = FieldAttrs {
            private: false,
            param: None,
            default: FieldDefault::None,
            keyword_only: false,
            role: Role::Param,
        };
        for attr in attrs.iter().filter(|a| a.path().is_ident(ATTR)) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("private") {
                    out.private = true;
                } else if meta.path.is_ident("param") {
                    out.param = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("default") {
                    out.default = if meta.input.peek(Token![=]) {
                        FieldDefault::Expr(meta.value()?.parse()?)
                    } else {
                        FieldDefault::Default
                    };
                } else if meta.path.is_ident("keyword_only") {
                    out.keyword_only = true;
                } else if meta.path.is_ident("varargs") {
                    out.role = Role::VarArgs;
                } else if meta.path.is_ident("kwargs") {
                    out.role = Role::VarKwargs;
                } else if meta.path.is_ident("skip") {
                    out.role = Role::Skip;
                } else {
                    return Err(meta.error("unknown jsonable field attribute"));
                }
                Ok(())
            })?;
        }
        Ok(out)
    }

    pub fn has_default(&self) -> bool {
        !matches!(self.default, FieldDefault::None)
    }
}

/// `value = <expr>` on an enum variant.
pub(crate) fn variant_value(attrs: &[Attribute]) -> Result<Option<Expr>> {
    let mut value = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident(ATTR)) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("value") {
                value = Some(meta.value()?.parse()?);
                Ok(())
            } else {
                Err(meta.error("unknown jsonable variant attribute"))
            }
        })?;
    }
    Ok(value)
}
