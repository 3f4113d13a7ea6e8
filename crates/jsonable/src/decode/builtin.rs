//! Reconstructors for the built-in fixed shapes.

use std::path::PathBuf;

use uuid::Uuid;

use super::Decoder;
use crate::canonical::{Canonical, CanonicalMap};
use crate::error::{Error, Result};
use crate::object::TypeTag;
use crate::registry::Registry;
use crate::value::{Timestamp, Value};

pub(crate) fn register(registry: &mut Registry) {
    registry
        .register_raw(TypeTag::new("datetime", "datetime"), decode_datetime)
        .register_raw(TypeTag::new("uuid", "UUID"), decode_uuid)
        .register_raw(TypeTag::new("pathlib", "Path"), decode_path);
}

/// A required string entry of a fixed-shape mapping.
pub(crate) fn str_entry<'a>(map: &'a CanonicalMap, class: &str, key: &str) -> Result<&'a str> {
    match map.get(key) {
        Some(Canonical::Str(s)) => Ok(s),
        Some(other) => Err(Error::malformed(
            class,
            format!("'{}' must be a string, not {}", key, other.kind_name()),
        )),
        None => Err(Error::malformed(class, format!("missing '{}'", key))),
    }
}

fn decode_datetime(map: &CanonicalMap, _: &Decoder) -> Result<Value> {
    let text = str_entry(map, "datetime", "string")?;
    Timestamp::parse(text)
        .map(Value::DateTime)
        .ok_or_else(|| Error::malformed("datetime", format!("unparseable '{}'", text)))
}

fn decode_uuid(map: &CanonicalMap, _: &Decoder) -> Result<Value> {
    let text = str_entry(map, "UUID", "string")?;
    Uuid::parse_str(text)
        .map(Value::Uuid)
        .map_err(|err| Error::malformed("UUID", err.to_string()))
}

fn decode_path(map: &CanonicalMap, _: &Decoder) -> Result<Value> {
    let text = str_entry(map, "Path", "string")?;
    Ok(Value::Path(PathBuf::from(text)))
}
