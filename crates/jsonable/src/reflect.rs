//! Default field layout derived from a type's constructor signature.
//!
//! A participating type describes its constructor as an ordered list of
//! [`Param`]s and exposes its stored attributes by name. `to_fields` then
//! reads one attribute per parameter and `from_fields` binds a mapping back
//! onto the signature by keyword.

use crate::convert::FromValue;
use crate::error::{Error, Result};
use crate::object::JsonableType;
use crate::value::{Fields, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Positional,
    KeywordOnly,
    /// Collects extra positional arguments. Stored as a sequence under
    /// the parameter name.
    VarArgs,
    /// Collects extra keyword arguments. Stored merged into the top level.
    VarKwargs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Param {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
}

impl Param {
    pub const fn positional(name: &'static str) -> Self {
        Param {
            name,
            kind: ParamKind::Positional,
            required: true,
        }
    }

    pub const fn keyword_only(name: &'static str) -> Self {
        Param {
            name,
            kind: ParamKind::KeywordOnly,
            required: true,
        }
    }

    pub const fn var_args(name: &'static str) -> Self {
        Param {
            name,
            kind: ParamKind::VarArgs,
            required: false,
        }
    }

    pub const fn var_kwargs(name: &'static str) -> Self {
        Param {
            name,
            kind: ParamKind::VarKwargs,
            required: false,
        }
    }

    /// Marks the parameter as having a default.
    pub const fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// Constructor signature plus attribute access for the default layout.
pub trait Reflect: JsonableType {
    fn signature() -> &'static [Param];

    /// Reads a stored attribute, `None` when no attribute has that name.
    fn attribute(&self, name: &str) -> Option<Value>;

    fn construct(args: Arguments) -> Result<Self>;
}

/// Keyword arguments bound to a signature, consumed by `construct`.
#[derive(Debug)]
pub struct Arguments {
    class: String,
    values: Fields,
    var_args: Vec<Value>,
    var_kwargs: Fields,
}

impl Arguments {
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Takes a required argument.
    pub fn take<T: FromValue>(&mut self, name: &str) -> Result<T> {
        match self.values.shift_remove(name) {
            Some(value) => self.convert(name, value),
            None => Err(Error::incompatible(
                &self.class,
                format!("missing required argument '{}'", name),
            )),
        }
    }

    /// Takes an argument that has a default.
    pub fn take_or<T: FromValue>(&mut self, name: &str, default: impl FnOnce() -> T) -> Result<T> {
        match self.values.shift_remove(name) {
            Some(value) => self.convert(name, value),
            None => Ok(default()),
        }
    }

    /// Extra positional arguments, converted as a whole sequence.
    pub fn var_args<C: FromValue>(&mut self) -> Result<C> {
        let items = std::mem::take(&mut self.var_args);
        self.convert("*args", Value::Seq(items))
    }

    /// Extra keyword arguments, converted as a whole mapping.
    pub fn var_kwargs<C: FromValue>(&mut self) -> Result<C> {
        let extra = std::mem::take(&mut self.var_kwargs);
        self.convert("**kwargs", Value::Map(extra))
    }

    fn convert<T: FromValue>(&self, name: &str, value: Value) -> Result<T> {
        T::from_value(value).map_err(|err| {
            Error::incompatible(&self.class, format!("argument '{}': {}", name, err))
        })
    }
}

fn lookup<T: Reflect>(obj: &T, name: &str) -> Option<Value> {
    obj.attribute(name)
        .or_else(|| obj.attribute(&format!("_{}", name)))
}

fn variadic_shape(class: &str, name: &str, expected: &str, found: &Value) -> Error {
    Error::unencodable(
        class,
        format!(
            "attribute '{}' must be {}, not {}",
            name,
            expected,
            found.type_name()
        ),
    )
}

/// Default `to_fields`: one entry per constructor parameter.
pub fn to_fields<T: Reflect>(obj: &T) -> Result<Fields> {
    let class = T::tag().class;
    let mut fields = Fields::new();
    let mut var_args = None;
    let mut var_kwargs = None;
    for param in T::signature() {
        match param.kind {
            ParamKind::Positional | ParamKind::KeywordOnly => {
                let value = lookup(obj, param.name).ok_or_else(|| Error::Unreconstructable {
                    class: class.clone(),
                    param: param.name.to_string(),
                })?;
                fields.insert(param.name.to_string(), value);
            }
            ParamKind::VarArgs => {
                let items = match lookup(obj, param.name) {
                    Some(Value::Seq(items) | Value::Tuple(items)) => items,
                    Some(Value::Null) | None => Vec::new(),
                    Some(other) => {
                        return Err(variadic_shape(&class, param.name, "a sequence", &other))
                    }
                };
                var_args = Some((param.name, items));
            }
            ParamKind::VarKwargs => match lookup(obj, param.name) {
                Some(Value::Map(extra)) => var_kwargs = Some(extra),
                Some(Value::Null) | None => {}
                Some(other) => {
                    return Err(variadic_shape(&class, param.name, "a mapping", &other))
                }
            },
        }
    }
    if let Some(extra) = var_kwargs {
        fields.extend(extra);
    }
    if let Some((name, items)) = var_args {
        fields.insert(name.to_string(), Value::Seq(items));
    }
    Ok(fields)
}

/// Default `from_fields`: keyword binding onto the signature.
pub fn from_fields<T: Reflect>(mut fields: Fields) -> Result<T> {
    let class = T::tag().class;
    let signature = T::signature();
    let mut args = Arguments {
        class: class.clone(),
        values: Fields::new(),
        var_args: Vec::new(),
        var_kwargs: Fields::new(),
    };
    for param in signature {
        match param.kind {
            ParamKind::Positional | ParamKind::KeywordOnly => {
                match fields.shift_remove(param.name) {
                    Some(value) => {
                        args.values.insert(param.name.to_string(), value);
                    }
                    None if param.required => {
                        return Err(Error::incompatible(
                            &class,
                            format!("missing required argument '{}'", param.name),
                        ))
                    }
                    None => {}
                }
            }
            ParamKind::VarArgs => match fields.shift_remove(param.name) {
                Some(Value::Seq(items) | Value::Tuple(items)) => args.var_args = items,
                Some(Value::Null) | None => {}
                Some(other) => {
                    return Err(Error::incompatible(
                        &class,
                        format!(
                            "argument '{}' must be a sequence, not {}",
                            param.name,
                            other.type_name()
                        ),
                    ))
                }
            },
            ParamKind::VarKwargs => {}
        }
    }
    if !fields.is_empty() {
        let accepts_kwargs = signature.iter().any(|p| p.kind == ParamKind::VarKwargs);
        if !accepts_kwargs {
            let unexpected = fields.keys().next().cloned().unwrap_or_default();
            return Err(Error::incompatible(
                &class,
                format!("got an unexpected keyword argument '{}'", unexpected),
            ));
        }
        args.var_kwargs = fields;
    }
    T::construct(args)
}
