//! Encode dispatcher: native values to canonical form.
//!
//! An ordered chain of [`EncodeHandler`]s is consulted for every value; the
//! first handler that recognizes the value produces its canonical form.

mod builtin;
mod object;

use std::cell::Cell;
use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::canonical::{Canonical, CanonicalMap, CLASS_KEY, MODULE_KEY, VERSION_KEY};
use crate::error::{Error, Result};
use crate::object::{Jsonable, Kind};
use crate::registry::{self, Registry};
use crate::value::{Fields, Value};

pub use object::encode_callable;

pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Encodes `value` or declines it by returning `None`.
pub type EncodeFn = fn(&Value, &Encoder) -> Option<Result<Canonical>>;

#[derive(Clone, Copy)]
pub struct EncodeHandler {
    pub name: &'static str,
    pub encode_fn: EncodeFn,
}

impl fmt::Debug for EncodeHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodeHandler").field("name", &self.name).finish()
    }
}

/// The built-in chain, in dispatch order.
pub fn default_handlers() -> Vec<EncodeHandler> {
    let mut handlers = Vec::new();
    handlers.extend(builtin::primitive_handlers());
    handlers.push(object::ENUM);
    handlers.extend(builtin::temporal_handlers());
    handlers.extend(crate::ext::encode_handlers());
    handlers.push(builtin::BYTES);
    handlers.extend(object::handlers());
    handlers
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Pass byte strings through as [`Canonical::Bytes`].
    pub allow_binary: bool,
    pub max_depth: usize,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            allow_binary: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

pub struct Encoder {
    registry: Arc<Registry>,
    handlers: Vec<EncodeHandler>,
    options: EncodeOptions,
    depth: Cell<usize>,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder {
    /// Encoder over the global registry snapshot.
    pub fn new() -> Self {
        Self::with_registry(registry::global())
    }

    pub fn with_registry(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            handlers: default_handlers(),
            options: EncodeOptions::default(),
            depth: Cell::new(0),
        }
    }

    pub fn options(mut self, options: EncodeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn allow_binary(mut self, allow: bool) -> Self {
        self.options.allow_binary = allow;
        self
    }

    /// Consulted before every built-in handler.
    pub fn push_front_handler(mut self, handler: EncodeHandler) -> Self {
        self.handlers.insert(0, handler);
        self
    }

    /// Consulted after every built-in handler.
    pub fn push_handler(mut self, handler: EncodeHandler) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn encode_options(&self) -> &EncodeOptions {
        &self.options
    }

    pub fn encode(&self, value: &Value) -> Result<Canonical> {
        let depth = self.depth.get();
        if depth >= self.options.max_depth {
            return Err(Error::DepthExceeded {
                max_depth: self.options.max_depth,
            });
        }
        self.depth.set(depth + 1);
        let result = self.dispatch(value);
        self.depth.set(depth);
        result
    }

    fn dispatch(&self, value: &Value) -> Result<Canonical> {
        for handler in &self.handlers {
            if let Some(result) = (handler.encode_fn)(value, self) {
                trace!(handler = handler.name, "encode handler matched");
                return result;
            }
        }
        Err(Error::unencodable(
            value.type_name(),
            "no encode handler applies",
        ))
    }

    pub fn encode_seq(&self, items: &[Value]) -> Result<Canonical> {
        items
            .iter()
            .map(|item| self.encode(item))
            .collect::<Result<Vec<_>>>()
            .map(Canonical::Seq)
    }

    pub fn encode_fields(&self, fields: &Fields) -> Result<CanonicalMap> {
        let mut map = CanonicalMap::with_capacity(fields.len());
        for (key, value) in fields {
            map.insert(key.clone(), self.encode(value)?);
        }
        Ok(map)
    }

    /// The tagged mapping of a participating object: `@module`, `@class`,
    /// `@version` (not for records), then its fields.
    pub fn encode_object(&self, obj: &dyn Jsonable) -> Result<CanonicalMap> {
        let fields = obj.to_fields()?;
        let mut map = tag_map(obj);
        map.extend(self.encode_fields(&fields)?);
        Ok(map)
    }
}

pub(crate) fn tag_map(obj: &dyn Jsonable) -> CanonicalMap {
    let tag = obj.type_tag();
    let mut map = CanonicalMap::new();
    map.insert(MODULE_KEY.to_string(), Canonical::Str(tag.module));
    map.insert(CLASS_KEY.to_string(), Canonical::Str(tag.class));
    if obj.kind() != Kind::Record {
        let version = obj.version().map_or(Canonical::Null, Canonical::Str);
        map.insert(VERSION_KEY.to_string(), version);
    }
    map
}

/// A fixed-shape tagged mapping for foreign and built-in types.
pub(crate) fn fixed_shape(
    module: &str,
    class: &str,
    entries: impl IntoIterator<Item = (&'static str, Canonical)>,
) -> Canonical {
    let mut map = CanonicalMap::new();
    map.insert(MODULE_KEY.to_string(), Canonical::Str(module.to_string()));
    map.insert(CLASS_KEY.to_string(), Canonical::Str(class.to_string()));
    for (key, value) in entries {
        map.insert(key.to_string(), value);
    }
    Canonical::Map(map)
}

/// Encodes with the default encoder over the global registry.
pub fn encode(value: &Value) -> Result<Canonical> {
    Encoder::new().encode(value)
}
