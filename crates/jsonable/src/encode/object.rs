//! Handlers for participating types and callables.

use super::{EncodeHandler, Encoder};
use crate::callable::Callable;
use crate::canonical::{Canonical, CanonicalMap, BOUND_KEY, CALLABLE_KEY, MODULE_KEY};
use crate::error::{Error, Result};
use crate::object::Kind;
use crate::value::Value;

pub(super) const ENUM: EncodeHandler = EncodeHandler {
    name: "enum",
    encode_fn: encode_enum,
};

fn encode_enum(value: &Value, enc: &Encoder) -> Option<Result<Canonical>> {
    encode_kind(value, enc, Kind::Enum)
}

pub(super) fn handlers() -> Vec<EncodeHandler> {
    vec![
        EncodeHandler {
            name: "record",
            encode_fn: |value, enc| encode_kind(value, enc, Kind::Record),
        },
        EncodeHandler {
            name: "model",
            encode_fn: |value, enc| encode_kind(value, enc, Kind::Model),
        },
        EncodeHandler {
            name: "callable",
            encode_fn: |value, enc| match value {
                Value::Callable(c) => Some(encode_callable(c, enc)),
                _ => None,
            },
        },
        EncodeHandler {
            name: "object",
            encode_fn: |value, enc| encode_kind(value, enc, Kind::Object),
        },
    ]
}

fn encode_kind(value: &Value, enc: &Encoder, kind: Kind) -> Option<Result<Canonical>> {
    match value {
        Value::Object(obj) if obj.kind() == kind => {
            Some(enc.encode_object(obj.as_ref()).map(Canonical::Map))
        }
        _ => None,
    }
}

/// `{@module, @callable, @bound}`. The pair must be resolvable through the
/// encoder's registry and a bound receiver must itself be encodable.
pub fn encode_callable(callable: &Callable, enc: &Encoder) -> Result<Canonical> {
    if !enc.registry().is_importable(callable.module(), callable.qualname()) {
        return Err(Error::unencodable(
            callable.type_name(),
            format!(
                "'{}.{}' cannot be re-imported",
                callable.module(),
                callable.qualname()
            ),
        ));
    }
    let bound = match callable.receiver() {
        None => Canonical::Null,
        Some(Value::Object(obj)) => Canonical::Map(enc.encode_object(obj.as_ref())?),
        Some(other) => {
            return Err(Error::unencodable(
                callable.type_name(),
                format!(
                    "bound to a receiver of type {} that is not serializable",
                    other.type_name()
                ),
            ))
        }
    };
    let mut map = CanonicalMap::new();
    map.insert(
        MODULE_KEY.to_string(),
        Canonical::Str(callable.module().to_string()),
    );
    map.insert(
        CALLABLE_KEY.to_string(),
        Canonical::Str(callable.qualname().to_string()),
    );
    map.insert(BOUND_KEY.to_string(), bound);
    Ok(Canonical::Map(map))
}
