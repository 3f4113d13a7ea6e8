//! Decode dispatcher: canonical form back to native values.

pub(crate) mod builtin;

use std::cell::Cell;
use std::sync::Arc;

use tracing::trace;

use crate::callable::Callable;
use crate::canonical::{
    is_reserved, Canonical, CanonicalMap, BOUND_KEY, CALLABLE_KEY, CLASS_KEY, MODULE_KEY,
};
use crate::encode::DEFAULT_MAX_DEPTH;
use crate::error::{Error, Result};
use crate::registry::{self, Registry, TypeEntry};
use crate::value::{Fields, Value};

pub struct Decoder {
    registry: Arc<Registry>,
    max_depth: usize,
    depth: Cell<usize>,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    /// Decoder over the global registry snapshot.
    pub fn new() -> Self {
        Self::with_registry(registry::global())
    }

    pub fn with_registry(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            max_depth: DEFAULT_MAX_DEPTH,
            depth: Cell::new(0),
        }
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn decode(&self, cf: &Canonical) -> Result<Value> {
        let depth = self.depth.get();
        if depth >= self.max_depth {
            return Err(Error::DepthExceeded {
                max_depth: self.max_depth,
            });
        }
        self.depth.set(depth + 1);
        let result = self.dispatch(cf);
        self.depth.set(depth);
        result
    }

    fn dispatch(&self, cf: &Canonical) -> Result<Value> {
        Ok(match cf {
            Canonical::Null => Value::Null,
            Canonical::Bool(b) => Value::Bool(*b),
            Canonical::Int(i) => Value::Int(*i),
            Canonical::Float(f) => Value::Float(*f),
            Canonical::Str(s) => Value::Str(s.clone()),
            Canonical::Seq(items) => Value::Seq(
                items
                    .iter()
                    .map(|item| self.decode(item))
                    .collect::<Result<_>>()?,
            ),
            Canonical::Map(map) => return self.decode_map(map),
            Canonical::Bytes(bytes) => Value::Bytes(bytes.clone()),
            Canonical::DateTime(ts) => Value::DateTime(*ts),
            Canonical::ObjectId(oid) => Value::foreign(*oid),
        })
    }

    /// Tagged mappings are reconstructed; anything else stays a mapping
    /// with decoded values.
    pub fn decode_map(&self, map: &CanonicalMap) -> Result<Value> {
        if let Some(Canonical::Str(qualname)) = map.get(CALLABLE_KEY) {
            return self.decode_callable(map, qualname);
        }
        if let (Some(Canonical::Str(module)), Some(Canonical::Str(class))) =
            (map.get(MODULE_KEY), map.get(CLASS_KEY))
        {
            return self.decode_object(map, module, class);
        }
        let mut out = Fields::with_capacity(map.len());
        for (key, value) in map {
            out.insert(key.clone(), self.decode(value)?);
        }
        Ok(Value::Map(out))
    }

    /// Decodes every non-reserved entry.
    pub fn decode_fields(&self, map: &CanonicalMap) -> Result<Fields> {
        let mut fields = Fields::with_capacity(map.len());
        for (key, value) in map.iter().filter(|(k, _)| !is_reserved(k)) {
            fields.insert(key.clone(), self.decode(value)?);
        }
        Ok(fields)
    }

    fn decode_object(&self, map: &CanonicalMap, module: &str, class: &str) -> Result<Value> {
        let (tag, entry) = self.registry.resolve_type(module, class)?;
        trace!(%tag, "reconstructing");
        match entry {
            TypeEntry::Raw(f) => f(map, self),
            TypeEntry::Fields(f) => f(self.decode_fields(map)?),
        }
    }

    fn decode_callable(&self, map: &CanonicalMap, qualname: &str) -> Result<Value> {
        let module = map.get(MODULE_KEY).and_then(Canonical::as_str).unwrap_or("");
        let (tag, target) = self
            .registry
            .resolve_callable(module, qualname)
            .map_err(|_| Error::CallableResolution {
                module: module.to_string(),
                qualname: qualname.to_string(),
            })?;
        let receiver = match map.get(BOUND_KEY) {
            None | Some(Canonical::Null) => None,
            Some(bound) => Some(self.decode(bound)?),
        };
        Ok(Value::Callable(Callable::resolved(
            tag.module, tag.class, target, receiver,
        )))
    }
}

/// Decodes with a decoder over the global registry.
pub fn decode(cf: &Canonical) -> Result<Value> {
    Decoder::new().decode(cf)
}
