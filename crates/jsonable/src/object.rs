//! The serializable capability: traits implemented by participating types.

use std::any::Any;
use std::fmt;
use std::path::Path;

use crate::canonical::{is_reserved, CanonicalMap};
use crate::decode::Decoder;
use crate::encode::Encoder;
use crate::error::{Error, Result};
use crate::persist::{self, SaveOptions};
use crate::text;
use crate::value::{Fields, Value};

/// The `(module, class)` identity pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeTag {
    pub module: String,
    pub class: String,
}

impl TypeTag {
    pub fn new(module: impl Into<String>, class: impl Into<String>) -> Self {
        TypeTag {
            module: module.into(),
            class: class.into(),
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.class)
    }
}

/// Selects the encoder handler family for a participating type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Kind {
    #[default]
    Object,
    /// Plain data record. Encoded without `@version`.
    Record,
    /// Validated model. Decoding ignores unknown keys.
    Model,
    /// Enumeration. Encodes its members as `{"value": raw}`.
    Enum,
}

pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Object-safe side of the capability.
pub trait Jsonable: AsAny + fmt::Debug + Send + Sync {
    fn type_tag(&self) -> TypeTag;

    fn version(&self) -> Option<String> {
        None
    }

    fn kind(&self) -> Kind {
        Kind::Object
    }

    /// The named state needed to reconstruct `self`.
    fn to_fields(&self) -> Result<Fields>;

    /// Raw constant of an enum member.
    fn enum_value(&self) -> Option<Value> {
        None
    }

    fn display(&self) -> String {
        format!("{:?}", self)
    }
}

/// Constructible side of the capability.
pub trait JsonableType: Jsonable + Sized {
    fn tag() -> TypeTag;

    fn from_fields(fields: Fields) -> Result<Self>;

    /// Rebuilds an instance from its canonical mapping. Reserved keys are
    /// ignored and every remaining value is decoded first.
    fn from_canonical(map: &CanonicalMap) -> Result<Self> {
        let decoder = Decoder::new();
        let mut fields = Fields::with_capacity(map.len());
        for (key, value) in map.iter().filter(|(k, _)| !is_reserved(k)) {
            fields.insert(key.clone(), decoder.decode(value)?);
        }
        Self::from_fields(fields)
    }

    /// Strict reader: the decoded text must be this type.
    fn from_json(text: &str) -> Result<Self> {
        let cf = text::from_str(text)?;
        let value = Decoder::new().decode(&cf)?;
        downcast_owned(value)
    }

    fn load(path: impl AsRef<Path>) -> Result<Self> {
        downcast_owned(persist::load(path)?)
    }
}

fn downcast_owned<T: JsonableType>(value: Value) -> Result<T> {
    let found = value.type_name();
    let fields = match value {
        Value::Object(obj) if AsAny::as_any(&*obj).is::<T>() => obj.to_fields()?,
        Value::Map(map) => map,
        _ => {
            return Err(Error::incompatible(
                T::tag().class,
                format!("expected {}, found {}", T::tag(), found),
            ))
        }
    };
    T::from_fields(fields)
}

/// Convenience methods available on every participating value.
pub trait JsonableExt: Jsonable {
    /// The full tagged mapping.
    fn to_canonical(&self) -> Result<CanonicalMap> {
        Encoder::new().encode_object(self.as_dyn())
    }

    /// Strict JSON text; fails when any field cannot be encoded.
    fn to_json(&self) -> Result<String> {
        let map = self.to_canonical()?;
        Ok(text::to_string(
            &crate::Canonical::Map(map),
            &text::TextOptions::default(),
        )?)
    }

    /// Representation-sensitive digest of the canonical mapping.
    fn unsafe_hash(&self) -> Result<String> {
        crate::hash::unsafe_hash(self.as_dyn())
    }

    fn save(&self, path: impl AsRef<Path>, options: &SaveOptions) -> Result<()> {
        let map = self.to_canonical()?;
        persist::save_canonical(&crate::Canonical::Map(map), path, options)
    }

    #[doc(hidden)]
    fn as_dyn(&self) -> &dyn Jsonable;
}

impl<T: Jsonable> JsonableExt for T {
    fn as_dyn(&self) -> &dyn Jsonable {
        self
    }
}

impl JsonableExt for dyn Jsonable {
    fn as_dyn(&self) -> &dyn Jsonable {
        self
    }
}
