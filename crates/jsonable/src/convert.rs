//! Conversions between typed Rust fields and [`Value`].

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use indexmap::IndexMap;
use thiserror::Error;
use uuid::Uuid;

use crate::callable::Callable;
use crate::object::{AsAny, JsonableType};
use crate::value::{Fields, Foreign, Timestamp, Value};

/// A value did not have the shape a typed field expects.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("expected {expected}, found {found}")]
pub struct Mismatch {
    pub expected: String,
    pub found: String,
}

impl Mismatch {
    pub fn new(expected: impl Into<String>, found: &Value) -> Self {
        Mismatch {
            expected: expected.into(),
            found: found.type_name(),
        }
    }
}

pub trait ToValue {
    fn to_value(&self) -> Value;
}

pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, Mismatch>;
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, Mismatch> {
        Ok(value)
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, Mismatch> {
        value.as_bool().ok_or_else(|| Mismatch::new("bool", &value))
    }
}

macro_rules! int_conversions {
    ($($t:ty),*) => {
        $(
            impl ToValue for $t {
                fn to_value(&self) -> Value {
                    Value::Int(*self as i64)
                }
            }

            impl FromValue for $t {
                fn from_value(value: Value) -> Result<Self, Mismatch> {
                    value
                        .as_i64()
                        .and_then(|i| <$t>::try_from(i).ok())
                        .ok_or_else(|| Mismatch::new(stringify!($t), &value))
                }
            }
        )*
    };
}

int_conversions!(i8, i16, i32, i64, u8, u16, u32);

/// Unsigned types wider than `i64`: values past `i64::MAX` travel as floats
/// and come back through a saturating cast.
macro_rules! wide_conversions {
    ($($t:ty),*) => {
        $(
            impl ToValue for $t {
                fn to_value(&self) -> Value {
                    match i64::try_from(*self) {
                        Ok(i) => Value::Int(i),
                        Err(_) => Value::Float(*self as f64),
                    }
                }
            }

            impl FromValue for $t {
                fn from_value(value: Value) -> Result<Self, Mismatch> {
                    let out = match &value {
                        Value::Int(i) => <$t>::try_from(*i).ok(),
                        Value::Float(f)
                            if f.fract() == 0.0 && *f > i64::MAX as f64 && *f <= <$t>::MAX as f64 =>
                        {
                            Some(*f as $t)
                        }
                        _ => None,
                    };
                    out.ok_or_else(|| Mismatch::new(stringify!($t), &value))
                }
            }
        )*
    };
}

wide_conversions!(u64, usize);

impl ToValue for f64 {
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, Mismatch> {
        value.as_f64().ok_or_else(|| Mismatch::new("float", &value))
    }
}

impl ToValue for f32 {
    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self, Mismatch> {
        f64::from_value(value).map(|f| f as f32)
    }
}

impl ToValue for str {
    fn to_value(&self) -> Value {
        Value::Str(self.to_string())
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::Str(self.clone())
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, Mismatch> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(Mismatch::new("str", &other)),
        }
    }
}

impl ToValue for PathBuf {
    fn to_value(&self) -> Value {
        Value::Path(self.clone())
    }
}

impl FromValue for PathBuf {
    fn from_value(value: Value) -> Result<Self, Mismatch> {
        match value {
            Value::Path(p) => Ok(p),
            Value::Str(s) => Ok(PathBuf::from(s)),
            other => Err(Mismatch::new("Path", &other)),
        }
    }
}

impl ToValue for Uuid {
    fn to_value(&self) -> Value {
        Value::Uuid(*self)
    }
}

impl FromValue for Uuid {
    fn from_value(value: Value) -> Result<Self, Mismatch> {
        match &value {
            Value::Uuid(id) => Ok(*id),
            Value::Str(s) => Uuid::parse_str(s).map_err(|_| Mismatch::new("UUID", &value)),
            _ => Err(Mismatch::new("UUID", &value)),
        }
    }
}

impl ToValue for Timestamp {
    fn to_value(&self) -> Value {
        Value::DateTime(*self)
    }
}

impl FromValue for Timestamp {
    fn from_value(value: Value) -> Result<Self, Mismatch> {
        match &value {
            Value::DateTime(ts) => Ok(*ts),
            Value::Str(s) => Timestamp::parse(s).ok_or_else(|| Mismatch::new("datetime", &value)),
            _ => Err(Mismatch::new("datetime", &value)),
        }
    }
}

impl ToValue for NaiveDateTime {
    fn to_value(&self) -> Value {
        Value::DateTime(Timestamp::Naive(*self))
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: Value) -> Result<Self, Mismatch> {
        match Timestamp::from_value(value)? {
            Timestamp::Naive(dt) => Ok(dt),
            aware => Err(Mismatch::new("naive datetime", &Value::DateTime(aware))),
        }
    }
}

impl ToValue for DateTime<FixedOffset> {
    fn to_value(&self) -> Value {
        Value::DateTime(Timestamp::Aware(*self))
    }
}

impl FromValue for DateTime<FixedOffset> {
    fn from_value(value: Value) -> Result<Self, Mismatch> {
        match Timestamp::from_value(value)? {
            Timestamp::Aware(dt) => Ok(dt),
            naive => Err(Mismatch::new("aware datetime", &Value::DateTime(naive))),
        }
    }
}

impl ToValue for DateTime<Utc> {
    fn to_value(&self) -> Value {
        Value::DateTime(Timestamp::from(*self))
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: Value) -> Result<Self, Mismatch> {
        DateTime::<FixedOffset>::from_value(value).map(|dt| dt.with_timezone(&Utc))
    }
}

impl ToValue for Callable {
    fn to_value(&self) -> Value {
        Value::Callable(self.clone())
    }
}

impl FromValue for Callable {
    fn from_value(value: Value) -> Result<Self, Mismatch> {
        match value {
            Value::Callable(c) => Ok(c),
            other => Err(Mismatch::new("callable", &other)),
        }
    }
}

impl ToValue for Foreign {
    fn to_value(&self) -> Value {
        Value::Foreign(self.clone())
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, Mismatch> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: ToValue> ToValue for Vec<T> {
    fn to_value(&self) -> Value {
        Value::Seq(self.iter().map(ToValue::to_value).collect())
    }
}

impl<T: ToValue> ToValue for [T] {
    fn to_value(&self) -> Value {
        Value::Seq(self.iter().map(ToValue::to_value).collect())
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self, Mismatch> {
        match value {
            Value::Seq(items) | Value::Tuple(items) | Value::Set(items) => {
                items.into_iter().map(T::from_value).collect()
            }
            other => Err(Mismatch::new("list", &other)),
        }
    }
}

fn map_entries<T: FromValue>(value: Value) -> Result<Vec<(String, T)>, Mismatch> {
    match value {
        Value::Map(map) => map
            .into_iter()
            .map(|(k, v)| T::from_value(v).map(|v| (k, v)))
            .collect(),
        other => Err(Mismatch::new("dict", &other)),
    }
}

impl<T: ToValue> ToValue for IndexMap<String, T> {
    fn to_value(&self) -> Value {
        Value::Map(self.iter().map(|(k, v)| (k.clone(), v.to_value())).collect())
    }
}

impl<T: FromValue> FromValue for IndexMap<String, T> {
    fn from_value(value: Value) -> Result<Self, Mismatch> {
        Ok(map_entries(value)?.into_iter().collect())
    }
}

impl<T: ToValue> ToValue for BTreeMap<String, T> {
    fn to_value(&self) -> Value {
        Value::Map(self.iter().map(|(k, v)| (k.clone(), v.to_value())).collect())
    }
}

impl<T: FromValue> FromValue for BTreeMap<String, T> {
    fn from_value(value: Value) -> Result<Self, Mismatch> {
        Ok(map_entries(value)?.into_iter().collect())
    }
}

impl<T: ToValue, S> ToValue for HashMap<String, T, S> {
    fn to_value(&self) -> Value {
        Value::Map(self.iter().map(|(k, v)| (k.clone(), v.to_value())).collect())
    }
}

impl<T: FromValue, S: std::hash::BuildHasher + Default> FromValue for HashMap<String, T, S> {
    fn from_value(value: Value) -> Result<Self, Mismatch> {
        Ok(map_entries(value)?.into_iter().collect())
    }
}

/// Shorthand for building [`Fields`] from typed values.
pub fn fields<I, K, V>(entries: I) -> Fields
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: ToValue,
{
    entries
        .into_iter()
        .map(|(k, v)| (k.into(), v.to_value()))
        .collect()
}

/// Conversion used by derived types: the instance itself, or an untagged
/// mapping rebuilt through `from_fields`.
#[doc(hidden)]
pub fn object_from_value<T: JsonableType + Clone>(value: Value) -> Result<T, Mismatch> {
    let expected = T::tag().to_string();
    match value {
        Value::Object(obj) => match AsAny::as_any(&*obj).downcast_ref::<T>() {
            Some(this) => Ok(this.clone()),
            None => Err(Mismatch {
                expected,
                found: obj.type_tag().to_string(),
            }),
        },
        Value::Map(map) => T::from_fields(map).map_err(|err| Mismatch {
            expected,
            found: format!("an incompatible mapping ({})", err),
        }),
        other => Err(Mismatch::new(expected, &other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_check_range() {
        assert_eq!(u8::from_value(Value::Int(255)), Ok(255));
        assert!(u8::from_value(Value::Int(256)).is_err());
        assert!(i64::from_value(Value::Float(1.0)).is_err());
        assert_eq!(f64::from_value(Value::Int(3)), Ok(3.0));
    }

    #[test]
    fn wide_unsigned_values_round_trip() {
        assert_eq!(u64::MAX.to_value(), Value::Float(u64::MAX as f64));
        assert_eq!(u64::from_value(u64::MAX.to_value()), Ok(u64::MAX));
        assert_eq!(u64::from_value(Value::Int(7)), Ok(7));
        assert!(u64::from_value(Value::Int(-1)).is_err());
        assert!(u64::from_value(Value::Float(2.5)).is_err());
        assert!(u64::from_value(Value::Float(1e30)).is_err());
        assert_eq!(usize::from_value(usize::MAX.to_value()), Ok(usize::MAX));
    }

    #[test]
    fn containers_convert_elementwise() {
        let v = vec![1i64, 2, 3].to_value();
        assert_eq!(Vec::<i64>::from_value(v), Ok(vec![1, 2, 3]));
        let tuple = Value::Tuple(vec![Value::Int(1)]);
        assert_eq!(Vec::<i64>::from_value(tuple), Ok(vec![1]));

        let err = Vec::<i64>::from_value(Value::Seq(vec![Value::Str("x".into())])).unwrap_err();
        assert_eq!(err.to_string(), "expected i64, found str");
    }

    #[test]
    fn option_maps_null() {
        assert_eq!(Option::<String>::from_value(Value::Null), Ok(None));
        assert_eq!(None::<i64>.to_value(), Value::Null);
    }

    #[test]
    fn fields_helper_keeps_order() {
        let f = fields([("b", 2i64), ("a", 1)]);
        assert_eq!(f.keys().collect::<Vec<_>>(), ["b", "a"]);
    }
}
