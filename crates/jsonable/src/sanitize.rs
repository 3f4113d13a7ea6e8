//! Best-effort conversion of arbitrary values into JSON-safe trees.
//!
//! Unlike the encode dispatcher, the sanitizer never fails in non-strict
//! mode: anything without a canonical form is replaced by its display
//! string. Strict mode fails instead.

use std::cell::Cell;
use std::sync::Arc;

use tracing::debug;

use crate::canonical::{Canonical, CanonicalMap};
use crate::encode::{self, tag_map, Encoder, DEFAULT_MAX_DEPTH};
use crate::error::{Error, Result};
use crate::ext::array::{Element, NdArray};
use crate::ext::objectid::ObjectId;
use crate::ext::table::{DataFrame, Series};
use crate::object::{Jsonable, Kind};
use crate::registry::{self, Registry};
use crate::value::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SanitizeOptions {
    /// Fail on values without a canonical form instead of stringifying.
    pub strict: bool,
    /// Pass datetimes, byte strings and object ids through untouched.
    pub allow_bson: bool,
    /// Replace enum members by their raw value.
    pub enum_values: bool,
    /// Emit participating objects as their full tagged mapping.
    pub recursive_msonable: bool,
}

impl SanitizeOptions {
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn allow_bson(mut self, allow_bson: bool) -> Self {
        self.allow_bson = allow_bson;
        self
    }

    pub fn enum_values(mut self, enum_values: bool) -> Self {
        self.enum_values = enum_values;
        self
    }

    pub fn recursive_msonable(mut self, recursive_msonable: bool) -> Self {
        self.recursive_msonable = recursive_msonable;
        self
    }
}

pub struct Sanitizer {
    options: SanitizeOptions,
    registry: Arc<Registry>,
    depth: Cell<usize>,
}

impl Sanitizer {
    pub fn new(options: SanitizeOptions) -> Self {
        Self::with_registry(options, registry::global())
    }

    pub fn with_registry(options: SanitizeOptions, registry: Arc<Registry>) -> Self {
        Self {
            options,
            registry,
            depth: Cell::new(0),
        }
    }

    fn encoder(&self) -> Encoder {
        Encoder::with_registry(self.registry.clone())
    }

    pub fn sanitize(&self, value: &Value) -> Result<Canonical> {
        let depth = self.depth.get();
        if depth >= DEFAULT_MAX_DEPTH {
            return Err(Error::DepthExceeded {
                max_depth: DEFAULT_MAX_DEPTH,
            });
        }
        self.depth.set(depth + 1);
        let result = self.dispatch(value);
        self.depth.set(depth);
        result
    }

    fn dispatch(&self, value: &Value) -> Result<Canonical> {
        let opts = self.options;
        if let Value::Object(obj) = value {
            if obj.kind() == Kind::Enum {
                return match obj.enum_value() {
                    Some(raw) if opts.enum_values => self.sanitize(&raw),
                    _ => self.encoder().encode_object(obj.as_ref()).map(Canonical::Map),
                };
            }
            if opts.recursive_msonable {
                return self.sanitize_object(obj.as_ref());
            }
        }
        if opts.allow_bson {
            match value {
                Value::DateTime(ts) => return Ok(Canonical::DateTime(*ts)),
                Value::Bytes(bytes) => return Ok(Canonical::Bytes(bytes.clone())),
                _ => {}
            }
            if let Some(oid) = value.downcast_ref::<ObjectId>() {
                return Ok(Canonical::ObjectId(*oid));
            }
        }
        match value {
            Value::Seq(items) | Value::Tuple(items) | Value::Set(items) => {
                return items
                    .iter()
                    .map(|item| self.sanitize(item))
                    .collect::<Result<Vec<_>>>()
                    .map(Canonical::Seq);
            }
            Value::Map(map) => {
                let mut out = CanonicalMap::with_capacity(map.len());
                for (key, item) in map {
                    out.insert(key.clone(), self.sanitize(item)?);
                }
                return Ok(Canonical::Map(out));
            }
            Value::Null => return Ok(Canonical::Null),
            Value::Bool(b) => return Ok(Canonical::Bool(*b)),
            Value::Int(i) => return Ok(Canonical::Int(*i)),
            Value::Float(f) => return Ok(Canonical::Float(*f)),
            Value::Str(s) => return Ok(Canonical::Str(s.clone())),
            Value::Path(_) | Value::DateTime(_) | Value::Uuid(_) => {
                return Ok(Canonical::Str(value.display()))
            }
            Value::Callable(c) => {
                if let Ok(cf) = encode::encode_callable(c, &self.encoder()) {
                    return Ok(cf);
                }
            }
            _ => {}
        }
        if let Some(arr) = value.downcast_ref::<NdArray>() {
            return self.sanitize_array(arr);
        }
        if let Some(frame) = value.downcast_ref::<DataFrame>() {
            return frame.to_data(|cell| self.sanitize(cell)).map(Canonical::Map);
        }
        if let Some(series) = value.downcast_ref::<Series>() {
            return series.to_data(|cell| self.sanitize(cell)).map(Canonical::Map);
        }
        if !opts.strict {
            debug!(type_name = %value.type_name(), "coercing value to its display string");
            let text = match value.downcast_ref::<ObjectId>() {
                Some(oid) => oid.to_hex(),
                None => value.display(),
            };
            return Ok(Canonical::Str(text));
        }
        match value {
            Value::Object(obj) => self.sanitize_object(obj.as_ref()),
            other => Err(Error::Unconvertible {
                type_name: other.type_name(),
            }),
        }
    }

    /// Tags plus each field sanitized in turn.
    fn sanitize_object(&self, obj: &dyn Jsonable) -> Result<Canonical> {
        let fields = match obj.to_fields() {
            Ok(fields) => fields,
            Err(err) if !self.options.strict => {
                debug!(error = %err, "coercing object to its display string");
                return Ok(Canonical::Str(obj.display()));
            }
            Err(err) => return Err(err),
        };
        let mut map = tag_map(obj);
        for (key, field) in fields {
            map.insert(key, self.sanitize(&field)?);
        }
        Ok(Canonical::Map(map))
    }

    /// Nested lists without tags. A zero-dimensional array is its element.
    fn sanitize_array(&self, arr: &NdArray) -> Result<Canonical> {
        let strict = self.options.strict;
        arr.nested(&mut |element| match element {
            Element::Bool(b) => Ok(Canonical::Bool(b)),
            Element::Int(i) => Ok(Canonical::Int(i)),
            Element::Float(f) => Ok(Canonical::Float(f)),
            Element::Complex(_) if strict => Err(Error::Unconvertible {
                type_name: "complex".into(),
            }),
            Element::Complex(c) => Ok(Canonical::Str(c.to_string())),
        })
    }
}

/// Sanitizes `value` against the global registry.
pub fn jsanitize(value: &Value, options: SanitizeOptions) -> Result<Canonical> {
    Sanitizer::new(options).sanitize(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ext::array::Complex;

    fn sanitize(value: Value, options: SanitizeOptions) -> Result<Canonical> {
        Sanitizer::with_registry(options, Arc::new(Registry::with_builtins())).sanitize(&value)
    }

    #[derive(Debug, PartialEq)]
    struct Opaque;

    #[test]
    fn unknown_values_become_strings_unless_strict() {
        let value = Value::Seq(vec![Value::foreign(Opaque), Value::Int(1)]);
        let cf = sanitize(value.clone(), SanitizeOptions::default()).unwrap();
        assert_eq!(cf[0], Canonical::from("Opaque"));
        assert_eq!(cf[1], Canonical::Int(1));

        let err = sanitize(value, SanitizeOptions::default().strict(true)).unwrap_err();
        assert!(matches!(err, Error::Unconvertible { ref type_name } if type_name == "Opaque"));
    }

    #[test]
    fn sets_and_tuples_become_sequences() {
        let value = Value::Set(vec![Value::Int(1), Value::Tuple(vec![Value::Int(2)])]);
        let cf = sanitize(value, SanitizeOptions::default()).unwrap();
        assert_eq!(
            cf,
            Canonical::Seq(vec![
                Canonical::Int(1),
                Canonical::Seq(vec![Canonical::Int(2)])
            ])
        );
    }

    #[test]
    fn bson_passthrough() {
        let oid = ObjectId::from_timestamp(7);
        let bson = SanitizeOptions::default().allow_bson(true);
        assert_eq!(
            sanitize(Value::foreign(oid), bson).unwrap(),
            Canonical::ObjectId(oid)
        );
        assert_eq!(
            sanitize(Value::foreign(oid), SanitizeOptions::default()).unwrap(),
            Canonical::Str(oid.to_hex())
        );
        assert_eq!(
            sanitize(Value::Bytes(vec![1]), bson).unwrap(),
            Canonical::Bytes(vec![1])
        );
    }

    #[test]
    fn complex_arrays_degrade_or_fail() {
        let arr = NdArray::from_complex(vec![1], vec![Complex::new(1.0, 2.0)]).unwrap();
        let cf = sanitize(Value::foreign(arr.clone()), SanitizeOptions::default()).unwrap();
        assert_eq!(cf, Canonical::Seq(vec![Canonical::from("(1+2j)")]));
        assert!(sanitize(Value::foreign(arr), SanitizeOptions::default().strict(true)).is_err());
    }

    #[test]
    fn scalar_array_is_its_element() {
        let arr = NdArray::from_i64(vec![], vec![4]).unwrap();
        assert_eq!(
            sanitize(Value::foreign(arr), SanitizeOptions::default().strict(true)).unwrap(),
            Canonical::Int(4)
        );
    }
}
