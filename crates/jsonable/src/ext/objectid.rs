use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use uuid::Uuid;

use crate::canonical::{Canonical, CanonicalMap};
use crate::decode::builtin::str_entry;
use crate::decode::Decoder;
use crate::encode::{fixed_shape, EncodeHandler, Encoder};
use crate::error::{Error, Result};
use crate::object::TypeTag;
use crate::registry::Registry;
use crate::value::Value;

const MODULE: &str = "bson.objectid";
const CLASS: &str = "ObjectId";

/// A 12-byte document identifier: a big-endian seconds timestamp followed
/// by eight bytes of entropy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    pub fn new() -> Self {
        let secs = Utc::now().timestamp().clamp(0, i64::from(u32::MAX)) as u32;
        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..].copy_from_slice(&Uuid::new_v4().as_bytes()[..8]);
        ObjectId(bytes)
    }

    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        ObjectId(bytes)
    }

    /// Identifier with the given timestamp and zeroed remaining bytes.
    pub fn from_timestamp(secs: u32) -> Self {
        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        ObjectId(bytes)
    }

    pub fn bytes(&self) -> [u8; 12] {
        self.0
    }

    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn parse_str(text: &str) -> Result<Self> {
        let decoded = hex::decode(text).map_err(|err| Error::malformed(CLASS, err.to_string()))?;
        let bytes: [u8; 12] = decoded.try_into().map_err(|v: Vec<u8>| {
            Error::malformed(CLASS, format!("expected 12 bytes, got {}", v.len()))
        })?;
        Ok(ObjectId(bytes))
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_str(s)
    }
}

pub(super) const ENCODE: EncodeHandler = EncodeHandler {
    name: "objectid",
    encode_fn: encode_objectid,
};

fn encode_objectid(value: &Value, _: &Encoder) -> Option<Result<Canonical>> {
    let oid = value.downcast_ref::<ObjectId>()?;
    Some(Ok(fixed_shape(
        MODULE,
        CLASS,
        [("oid", Canonical::Str(oid.to_hex()))],
    )))
}

fn decode_objectid(map: &CanonicalMap, _: &Decoder) -> Result<Value> {
    let oid = ObjectId::parse_str(str_entry(map, CLASS, "oid")?)?;
    Ok(Value::foreign(oid))
}

pub(super) fn register(registry: &mut Registry) {
    registry.register_raw(TypeTag::new(MODULE, CLASS), decode_objectid);
}
