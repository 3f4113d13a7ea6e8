//! Handlers for primitives, containers and the built-in fixed shapes.

use super::{fixed_shape, EncodeHandler, Encoder};
use crate::canonical::Canonical;
use crate::error::{Error, Result};
use crate::value::Value;

pub(super) fn primitive_handlers() -> Vec<EncodeHandler> {
    vec![EncodeHandler {
        name: "primitive",
        encode_fn: encode_primitive,
    }]
}

pub(super) fn temporal_handlers() -> Vec<EncodeHandler> {
    vec![
        EncodeHandler {
            name: "datetime",
            encode_fn: encode_datetime,
        },
        EncodeHandler {
            name: "uuid",
            encode_fn: encode_uuid,
        },
        EncodeHandler {
            name: "path",
            encode_fn: encode_path,
        },
    ]
}

pub(super) const BYTES: EncodeHandler = EncodeHandler {
    name: "bytes",
    encode_fn: encode_bytes,
};

fn encode_primitive(value: &Value, enc: &Encoder) -> Option<Result<Canonical>> {
    Some(match value {
        Value::Null => Ok(Canonical::Null),
        Value::Bool(b) => Ok(Canonical::Bool(*b)),
        Value::Int(i) => Ok(Canonical::Int(*i)),
        Value::Float(f) => Ok(Canonical::Float(*f)),
        Value::Str(s) => Ok(Canonical::Str(s.clone())),
        Value::Seq(items) | Value::Tuple(items) => enc.encode_seq(items),
        Value::Map(fields) => enc.encode_fields(fields).map(Canonical::Map),
        _ => return None,
    })
}

fn encode_datetime(value: &Value, _: &Encoder) -> Option<Result<Canonical>> {
    let Value::DateTime(ts) = value else {
        return None;
    };
    Some(Ok(fixed_shape(
        "datetime",
        "datetime",
        [("string", Canonical::Str(ts.to_string()))],
    )))
}

fn encode_uuid(value: &Value, _: &Encoder) -> Option<Result<Canonical>> {
    let Value::Uuid(id) = value else {
        return None;
    };
    Some(Ok(fixed_shape(
        "uuid",
        "UUID",
        [("string", Canonical::Str(id.to_string()))],
    )))
}

fn encode_path(value: &Value, _: &Encoder) -> Option<Result<Canonical>> {
    let Value::Path(path) = value else {
        return None;
    };
    let Some(text) = path.to_str() else {
        return Some(Err(Error::unencodable("Path", "path is not valid UTF-8")));
    };
    Some(Ok(fixed_shape(
        "pathlib",
        "Path",
        [("string", Canonical::Str(text.to_owned()))],
    )))
}

fn encode_bytes(value: &Value, enc: &Encoder) -> Option<Result<Canonical>> {
    let Value::Bytes(bytes) = value else {
        return None;
    };
    Some(if enc.encode_options().allow_binary {
        Ok(Canonical::Bytes(bytes.clone()))
    } else {
        Err(Error::unencodable(
            "bytes",
            "binary payloads need allow_binary",
        ))
    })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use super::*;
    use crate::registry::Registry;

    fn encoder() -> Encoder {
        Encoder::with_registry(Arc::new(Registry::with_builtins()))
    }

    #[test]
    fn paths_encode_as_text() {
        let cf = encoder().encode(&Value::Path(PathBuf::from("/tmp/a b"))).unwrap();
        assert_eq!(cf["@module"], Canonical::from("pathlib"));
        assert_eq!(cf["string"], Canonical::from("/tmp/a b"));
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_paths_are_unencodable() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let path = PathBuf::from(OsStr::from_bytes(b"/tmp/\xff"));
        let err = encoder().encode(&Value::Path(path)).unwrap_err();
        assert!(matches!(err, Error::Unencodable { ref type_name, .. } if type_name == "Path"));
    }
}
