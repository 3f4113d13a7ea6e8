//! Tagged JSON serialization for rich object graphs.
//!
//! Values are lowered to a canonical tree of JSON-native data in which every
//! participating object is a mapping tagged with `@module`, `@class` and
//! `@version`. Decoding walks the tree and rebuilds each tagged mapping
//! through the type registered under that identity, consulting a rename
//! table first so payloads written before a type moved still load.
//!
//! # Example
//!
//! ```
//! use jsonable::{Jsonable, JsonableExt, JsonableType};
//!
//! #[derive(Jsonable, Debug, Clone, PartialEq)]
//! #[jsonable(module = "shapes", version = "1.0")]
//! struct Circle {
//!     radius: f64,
//! }
//!
//! let circle = Circle { radius: 2.0 };
//! let text = circle.to_json().unwrap();
//! assert_eq!(
//!     text,
//!     r#"{"@module":"shapes","@class":"Circle","@version":"1.0","radius":2.0}"#
//! );
//! assert_eq!(Circle::from_json(&text).unwrap(), circle);
//! ```

extern crate self as jsonable;

pub mod callable;
pub mod canonical;
pub mod convert;
pub mod decode;
pub mod encode;
pub mod error;
pub mod ext;
pub mod hash;
pub mod model;
pub mod object;
pub mod persist;
pub mod reflect;
pub mod registry;
pub mod sanitize;
pub mod schema;
pub mod settings;
pub mod text;
pub mod value;

pub use callable::{Callable, NativeFn};
pub use canonical::{Canonical, CanonicalMap};
pub use convert::{fields, FromValue, Mismatch, ToValue};
pub use decode::Decoder;
pub use encode::{EncodeHandler, EncodeOptions, Encoder};
pub use error::{Error, ImportReason, Result};
pub use ext::array::{Complex, Dtype, NdArray};
pub use ext::objectid::ObjectId;
pub use ext::table::{DataFrame, Series};
pub use jsonable_derive::Jsonable;
pub use object::{Jsonable, JsonableExt, JsonableType, Kind, TypeTag};
pub use persist::{load, load_as, save, SaveOptions};
pub use reflect::{Arguments, Param, ParamKind, Reflect};
pub use registry::Registry;
pub use sanitize::{jsanitize, SanitizeOptions, Sanitizer};
pub use schema::SchemaOf;
pub use settings::Settings;
pub use text::{TextError, TextOptions};
pub use value::{Fields, Foreign, Timestamp, Value};

/// Encodes `value` with the default handler chain and the global registry.
pub fn encode(value: &Value) -> Result<Canonical> {
    encode::encode(value)
}

/// Decodes a canonical tree against the global registry.
pub fn decode(cf: &Canonical) -> Result<Value> {
    decode::decode(cf)
}

/// Strict JSON text for `value`.
pub fn to_json(value: &Value) -> Result<String> {
    let cf = encode::encode(value)?;
    Ok(text::to_string(&cf, &TextOptions::default())?)
}

/// Parses JSON text and decodes every tagged mapping in it.
pub fn from_json(text: &str) -> Result<Value> {
    let cf = text::from_str(text)?;
    decode::decode(&cf)
}

#[doc(hidden)]
pub mod __private {
    #[cfg(feature = "auto_register")]
    pub use inventory;

    pub use crate::convert::object_from_value;
    pub use crate::model::FieldReader;
    pub use crate::registry::{register, Registration};
    pub use crate::schema::{model_schema, tag_schema};
    pub use serde_json::Value as Json;
}
