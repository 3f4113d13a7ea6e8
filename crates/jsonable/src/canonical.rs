//! The canonical form: a tree built only from JSON-native shapes.
//!
//! Every encoder output and every decoder input is a [`Canonical`]. Tagged
//! mappings carry their identity in the reserved `@`-prefixed keys below.

use std::fmt;
use std::ops::Index;

use indexmap::IndexMap;
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::ext::objectid::ObjectId;
use crate::object::TypeTag;
use crate::value::Timestamp;

pub const MODULE_KEY: &str = "@module";
pub const CLASS_KEY: &str = "@class";
pub const VERSION_KEY: &str = "@version";
pub const CALLABLE_KEY: &str = "@callable";
pub const BOUND_KEY: &str = "@bound";

pub const RESERVED_KEYS: [&str; 5] = [MODULE_KEY, CLASS_KEY, VERSION_KEY, CALLABLE_KEY, BOUND_KEY];

/// Keys beginning with `@` never reach a type's `from_fields`.
#[inline]
pub fn is_reserved(key: &str) -> bool {
    key.starts_with('@')
}

pub type CanonicalMap = IndexMap<String, Canonical>;

/// A JSON-native value tree.
///
/// `Bytes`, `DateTime` and `ObjectId` are passthrough variants for binary
/// sinks. They appear only when a caller explicitly enables binary
/// passthrough and are rejected by the JSON text writer.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Canonical {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Seq(Vec<Canonical>),
    Map(CanonicalMap),
    Bytes(Vec<u8>),
    DateTime(Timestamp),
    ObjectId(ObjectId),
}

static NULL: Canonical = Canonical::Null;

impl Canonical {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Canonical::Null => "null",
            Canonical::Bool(_) => "bool",
            Canonical::Int(_) => "int",
            Canonical::Float(_) => "float",
            Canonical::Str(_) => "str",
            Canonical::Seq(_) => "list",
            Canonical::Map(_) => "dict",
            Canonical::Bytes(_) => "bytes",
            Canonical::DateTime(_) => "datetime",
            Canonical::ObjectId(_) => "ObjectId",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Canonical::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Canonical::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Canonical::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Integers widen to floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Canonical::Int(i) => Some(*i as f64),
            Canonical::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Canonical::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Canonical]> {
        match self {
            Canonical::Seq(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&CanonicalMap> {
        match self {
            Canonical::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Canonical> {
        self.as_map().and_then(|map| map.get(key))
    }

    /// The `(@module, @class)` pair of a tagged mapping.
    pub fn type_tag(&self) -> Option<TypeTag> {
        let map = self.as_map()?;
        match (map.get(MODULE_KEY), map.get(CLASS_KEY)) {
            (Some(Canonical::Str(module)), Some(Canonical::Str(class))) => {
                Some(TypeTag::new(module.as_str(), class.as_str()))
            }
            _ => None,
        }
    }

    /// True when the tree contains no binary passthrough variant.
    pub fn is_json_native(&self) -> bool {
        match self {
            Canonical::Bytes(_) | Canonical::DateTime(_) | Canonical::ObjectId(_) => false,
            Canonical::Seq(items) => items.iter().all(Canonical::is_json_native),
            Canonical::Map(map) => map.values().all(Canonical::is_json_native),
            _ => true,
        }
    }

    /// Converts to a `serde_json::Value`. Returns `None` for non-finite
    /// floats and passthrough variants, which have no `serde_json` form.
    pub fn to_json_value(&self) -> Option<serde_json::Value> {
        Some(match self {
            Canonical::Null => serde_json::Value::Null,
            Canonical::Bool(b) => serde_json::Value::Bool(*b),
            Canonical::Int(i) => serde_json::Value::from(*i),
            Canonical::Float(f) => serde_json::Value::Number(serde_json::Number::from_f64(*f)?),
            Canonical::Str(s) => serde_json::Value::String(s.clone()),
            Canonical::Seq(items) => serde_json::Value::Array(
                items.iter().map(Canonical::to_json_value).collect::<Option<_>>()?,
            ),
            Canonical::Map(map) => {
                let mut out = serde_json::Map::with_capacity(map.len());
                for (k, v) in map {
                    out.insert(k.clone(), v.to_json_value()?);
                }
                serde_json::Value::Object(out)
            }
            Canonical::Bytes(_) | Canonical::DateTime(_) | Canonical::ObjectId(_) => return None,
        })
    }
}

impl Index<&str> for Canonical {
    type Output = Canonical;

    /// Missing keys and non-mappings index to `Null`.
    fn index(&self, key: &str) -> &Canonical {
        self.get(key).unwrap_or(&NULL)
    }
}

impl Index<usize> for Canonical {
    type Output = Canonical;

    fn index(&self, idx: usize) -> &Canonical {
        self.as_seq().and_then(|items| items.get(idx)).unwrap_or(&NULL)
    }
}

impl From<bool> for Canonical {
    fn from(v: bool) -> Self {
        Canonical::Bool(v)
    }
}

impl From<i64> for Canonical {
    fn from(v: i64) -> Self {
        Canonical::Int(v)
    }
}

impl From<f64> for Canonical {
    fn from(v: f64) -> Self {
        Canonical::Float(v)
    }
}

impl From<&str> for Canonical {
    fn from(v: &str) -> Self {
        Canonical::Str(v.to_string())
    }
}

impl From<String> for Canonical {
    fn from(v: String) -> Self {
        Canonical::Str(v)
    }
}

impl From<Vec<Canonical>> for Canonical {
    fn from(v: Vec<Canonical>) -> Self {
        Canonical::Seq(v)
    }
}

impl From<CanonicalMap> for Canonical {
    fn from(v: CanonicalMap) -> Self {
        Canonical::Map(v)
    }
}

impl From<serde_json::Value> for Canonical {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Canonical::Null,
            serde_json::Value::Bool(b) => Canonical::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Canonical::Int(i)
                } else {
                    Canonical::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Canonical::Str(s),
            serde_json::Value::Array(items) => {
                Canonical::Seq(items.into_iter().map(Canonical::from).collect())
            }
            serde_json::Value::Object(map) => Canonical::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Canonical::from(v)))
                    .collect(),
            ),
        }
    }
}

impl Serialize for Canonical {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Canonical::Null => serializer.serialize_unit(),
            Canonical::Bool(b) => serializer.serialize_bool(*b),
            Canonical::Int(i) => serializer.serialize_i64(*i),
            Canonical::Float(f) => serializer.serialize_f64(*f),
            Canonical::Str(s) => serializer.serialize_str(s),
            Canonical::Seq(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Canonical::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            Canonical::Bytes(bytes) => serializer.serialize_bytes(bytes),
            Canonical::DateTime(ts) => serializer.collect_str(ts),
            Canonical::ObjectId(oid) => serializer.collect_str(oid),
        }
    }
}

struct CanonicalVisitor;

impl<'de> Visitor<'de> for CanonicalVisitor {
    type Value = Canonical;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON-native value")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Canonical, E> {
        Ok(Canonical::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Canonical, E> {
        Ok(Canonical::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Canonical, D::Error> {
        Canonical::deserialize(d)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Canonical, E> {
        Ok(Canonical::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Canonical, E> {
        Ok(Canonical::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Canonical, E> {
        Ok(match i64::try_from(v) {
            Ok(i) => Canonical::Int(i),
            Err(_) => Canonical::Float(v as f64),
        })
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Canonical, E> {
        Ok(Canonical::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Canonical, E> {
        Ok(Canonical::Str(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Canonical, E> {
        Ok(Canonical::Str(v))
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Canonical, E> {
        Ok(Canonical::Bytes(v.to_vec()))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> Result<Canonical, A::Error> {
        let mut items = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some(item) = access.next_element()? {
            items.push(item);
        }
        Ok(Canonical::Seq(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Canonical, A::Error> {
        let mut map = CanonicalMap::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((k, v)) = access.next_entry::<String, Canonical>()? {
            map.insert(k, v);
        }
        Ok(Canonical::Map(map))
    }
}

impl<'de> Deserialize<'de> for Canonical {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(CanonicalVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_json_value_keeps_int_and_float_apart() {
        let cf = Canonical::from(json!({"a": 1, "b": 1.0, "c": [true, null]}));
        assert_eq!(cf["a"], Canonical::Int(1));
        assert_eq!(cf["b"], Canonical::Float(1.0));
        assert_eq!(cf["c"][0], Canonical::Bool(true));
        assert!(cf["missing"].is_null());
    }

    #[test]
    fn type_tag_requires_both_string_keys() {
        let tagged = Canonical::from(json!({"@module": "m", "@class": "C"}));
        assert_eq!(tagged.type_tag(), Some(TypeTag::new("m", "C")));
        let partial = Canonical::from(json!({"@module": "m"}));
        assert_eq!(partial.type_tag(), None);
        let wrong = Canonical::from(json!({"@module": 1, "@class": "C"}));
        assert_eq!(wrong.type_tag(), None);
    }

    #[test]
    fn passthrough_variants_are_not_json_native() {
        let cf = Canonical::Seq(vec![Canonical::Int(1), Canonical::Bytes(vec![1, 2])]);
        assert!(!cf.is_json_native());
        assert!(cf.to_json_value().is_none());
        assert!(Canonical::Float(f64::NAN).to_json_value().is_none());
    }

    #[test]
    fn serde_round_trip_through_serde_json() {
        let cf = Canonical::from(json!({"x": [1, 2.5, "s"], "y": {"z": null}}));
        let text = serde_json::to_string(&cf).unwrap();
        let back: Canonical = serde_json::from_str(&text).unwrap();
        assert_eq!(back, cf);
    }
}
