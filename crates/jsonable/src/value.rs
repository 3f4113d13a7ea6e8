//! The native value model handed to and returned from the dispatchers.

use std::any::Any;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDateTime, Timelike};
use indexmap::IndexMap;
use serde::ser::{Error as _, Serialize, Serializer};
use uuid::Uuid;

use crate::callable::Callable;
use crate::object::{AsAny, Jsonable};

/// Named state of a participating object, in declaration order.
pub type Fields = IndexMap<String, Value>;

const DATE_TIME: &str = "%Y-%m-%d %H:%M:%S";

/// A point in time that remembers whether it carried an offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timestamp {
    Naive(NaiveDateTime),
    Aware(DateTime<FixedOffset>),
}

impl Timestamp {
    pub fn naive(&self) -> NaiveDateTime {
        match self {
            Timestamp::Naive(dt) => *dt,
            Timestamp::Aware(dt) => dt.naive_local(),
        }
    }

    pub fn offset(&self) -> Option<FixedOffset> {
        match self {
            Timestamp::Naive(_) => None,
            Timestamp::Aware(dt) => Some(*dt.offset()),
        }
    }

    pub fn is_aware(&self) -> bool {
        matches!(self, Timestamp::Aware(_))
    }

    /// Parses `YYYY-MM-DD HH:MM:SS[.fraction][±HH:MM]`. A `T` separator is
    /// accepted as well.
    pub fn parse(text: &str) -> Option<Timestamp> {
        let text = text.trim();
        let normalized;
        let text = if text.len() > 10 && text.as_bytes()[10] == b'T' {
            normalized = format!("{} {}", &text[..10], &text[11..]);
            normalized.as_str()
        } else {
            text
        };
        if let Some(ts) = parse_offset_seconds(text) {
            return Some(ts);
        }
        if let Some(dt) = ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%:z"]
            .iter()
            .find_map(|fmt| DateTime::parse_from_str(text, fmt).ok())
        {
            return Some(Timestamp::Aware(dt));
        }
        parse_naive(text).map(Timestamp::Naive)
    }
}

fn parse_naive(text: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%d %H:%M:%S%.f", DATE_TIME]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}

/// Offsets written as `±HH:MM:SS`, which `%:z` does not read.
fn parse_offset_seconds(text: &str) -> Option<Timestamp> {
    let split = text.len().checked_sub(9)?;
    let offset = text.get(split..)?;
    let bytes = offset.as_bytes();
    let sign = match bytes[0] {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    if bytes[3] != b':' || bytes[6] != b':' {
        return None;
    }
    let part = |range: std::ops::Range<usize>| offset.get(range)?.parse::<i32>().ok();
    let seconds = part(1..3)? * 3600 + part(4..6)? * 60 + part(7..9)?;
    let offset = FixedOffset::east_opt(sign * seconds)?;
    parse_naive(&text[..split])?
        .and_local_timezone(offset)
        .single()
        .map(Timestamp::Aware)
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let naive = self.naive();
        write!(f, "{}", naive.format(DATE_TIME))?;
        let nanos = naive.nanosecond() % 1_000_000_000;
        if nanos != 0 {
            if nanos % 1000 == 0 {
                write!(f, ".{:06}", nanos / 1000)?;
            } else {
                write!(f, ".{:09}", nanos)?;
            }
        }
        if let Timestamp::Aware(dt) = self {
            let offset_fmt = if dt.offset().local_minus_utc() % 60 == 0 {
                "%:z"
            } else {
                "%::z"
            };
            write!(f, "{}", dt.format(offset_fmt))?;
        }
        Ok(())
    }
}

impl From<NaiveDateTime> for Timestamp {
    fn from(dt: NaiveDateTime) -> Self {
        Timestamp::Naive(dt)
    }
}

impl From<DateTime<FixedOffset>> for Timestamp {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Timestamp::Aware(dt)
    }
}

impl From<DateTime<chrono::Utc>> for Timestamp {
    fn from(dt: DateTime<chrono::Utc>) -> Self {
        Timestamp::Aware(dt.fixed_offset())
    }
}

/// A value owned by an external collaborator, or any other type that does
/// not participate in the serializable capability.
pub trait ForeignValue: Any + fmt::Debug + Send + Sync {
    fn foreign_type_name(&self) -> &'static str;
    fn foreign_any(&self) -> &dyn Any;
    fn foreign_eq(&self, other: &dyn ForeignValue) -> bool;
}

impl<T> ForeignValue for T
where
    T: Any + fmt::Debug + PartialEq + Send + Sync,
{
    fn foreign_type_name(&self) -> &'static str {
        let full = std::any::type_name::<T>();
        full.rsplit("::").next().unwrap_or(full)
    }

    fn foreign_any(&self) -> &dyn Any {
        self
    }

    fn foreign_eq(&self, other: &dyn ForeignValue) -> bool {
        other
            .foreign_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }
}

#[derive(Clone)]
pub struct Foreign(Arc<dyn ForeignValue>);

impl Foreign {
    pub fn new<T: ForeignValue>(value: T) -> Self {
        Foreign(Arc::new(value))
    }

    pub fn type_name(&self) -> &'static str {
        self.0.foreign_type_name()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.foreign_any().downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.downcast_ref::<T>().is_some()
    }
}

impl fmt::Debug for Foreign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl PartialEq for Foreign {
    fn eq(&self, other: &Self) -> bool {
        self.0.foreign_eq(&*other.0)
    }
}

#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Seq(Vec<Value>),
    Tuple(Vec<Value>),
    /// Unordered collection, kept in encounter order.
    Set(Vec<Value>),
    Map(Fields),
    DateTime(Timestamp),
    Uuid(Uuid),
    Path(PathBuf),
    Object(Arc<dyn Jsonable>),
    Callable(Callable),
    Foreign(Foreign),
}

impl Value {
    pub fn object<T: Jsonable>(value: T) -> Value {
        Value::Object(Arc::new(value))
    }

    pub fn foreign<T: ForeignValue>(value: T) -> Value {
        Value::Foreign(Foreign::new(value))
    }

    /// Runtime type name used in error messages and logs.
    pub fn type_name(&self) -> String {
        match self {
            Value::Null => "NoneType".into(),
            Value::Bool(_) => "bool".into(),
            Value::Int(_) => "int".into(),
            Value::Float(_) => "float".into(),
            Value::Str(_) => "str".into(),
            Value::Bytes(_) => "bytes".into(),
            Value::Seq(_) => "list".into(),
            Value::Tuple(_) => "tuple".into(),
            Value::Set(_) => "set".into(),
            Value::Map(_) => "dict".into(),
            Value::DateTime(_) => "datetime".into(),
            Value::Uuid(_) => "UUID".into(),
            Value::Path(_) => "Path".into(),
            Value::Object(obj) => obj.type_tag().class,
            Value::Callable(c) => c.type_name().into(),
            Value::Foreign(f) => f.type_name().into(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Items of a sequence, tuple or set.
    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Value::Seq(items) | Value::Tuple(items) | Value::Set(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Fields> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|map| map.get(key))
    }

    pub fn as_object(&self) -> Option<&dyn Jsonable> {
        match self {
            Value::Object(obj) => Some(&**obj),
            _ => None,
        }
    }

    pub fn as_callable(&self) -> Option<&Callable> {
        match self {
            Value::Callable(c) => Some(c),
            _ => None,
        }
    }

    /// Borrows a participating object or foreign value as its concrete type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Object(obj) => AsAny::as_any(&**obj).downcast_ref::<T>(),
            Value::Foreign(f) => f.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Human-readable coercion used when a value has no canonical form.
    pub fn display(&self) -> String {
        match self {
            Value::Null => "None".into(),
            Value::Bool(true) => "True".into(),
            Value::Bool(false) => "False".into(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format!("{:?}", f),
            Value::Str(s) => s.clone(),
            Value::Bytes(bytes) => {
                let escaped: String = bytes
                    .iter()
                    .flat_map(|b| std::ascii::escape_default(*b))
                    .map(char::from)
                    .collect();
                format!("b'{}'", escaped)
            }
            Value::Seq(items) => format!("[{}]", join_display(items)),
            Value::Tuple(items) => format!("({})", join_display(items)),
            Value::Set(items) => format!("{{{}}}", join_display(items)),
            Value::Map(map) => {
                let inner: Vec<String> = map
                    .iter()
                    .map(|(k, v)| format!("'{}': {}", k, v.display()))
                    .collect();
                format!("{{{}}}", inner.join(", "))
            }
            Value::DateTime(ts) => ts.to_string(),
            Value::Uuid(id) => id.to_string(),
            Value::Path(p) => p.display().to_string(),
            Value::Object(obj) => obj.display(),
            Value::Callable(c) => c.to_string(),
            Value::Foreign(f) => format!("{:?}", f),
        }
    }
}

fn join_display(items: &[Value]) -> String {
    items.iter().map(Value::display).collect::<Vec<_>>().join(", ")
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Str(a), Str(b)) => a == b,
            (Bytes(a), Bytes(b)) => a == b,
            (Seq(a), Seq(b)) | (Tuple(a), Tuple(b)) | (Set(a), Set(b)) => a == b,
            (Map(a), Map(b)) => a == b,
            (DateTime(a), DateTime(b)) => a == b,
            (Uuid(a), Uuid(b)) => a == b,
            (Path(a), Path(b)) => a == b,
            (Object(a), Object(b)) => {
                if Arc::ptr_eq(a, b) {
                    return true;
                }
                if a.type_tag() != b.type_tag() {
                    return false;
                }
                match (a.to_fields(), b.to_fields()) {
                    (Ok(x), Ok(y)) => x == y,
                    _ => false,
                }
            }
            (Callable(a), Callable(b)) => a == b,
            (Foreign(a), Foreign(b)) => a == b,
            _ => false,
        }
    }
}

impl Serialize for Value {
    /// Serializes through the default encoder, so participating objects
    /// appear as tagged mappings in any serde format.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        crate::encode::encode(self)
            .map_err(S::Error::custom)?
            .serialize(serializer)
    }
}

macro_rules! value_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i64 => Int,
    i32 => Int,
    u32 => Int,
    f64 => Float,
    f32 => Float,
    String => Str,
    &str => Str,
    Vec<Value> => Seq,
    Fields => Map,
    Timestamp => DateTime,
    Uuid => Uuid,
    PathBuf => Path,
    Callable => Callable,
    Foreign => Foreign,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn naive(micro: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2019, 7, 1)
            .and_then(|d| d.and_hms_micro_opt(12, 30, 5, micro))
            .unwrap()
    }

    #[test]
    fn timestamp_text_forms() {
        assert_eq!(Timestamp::Naive(naive(0)).to_string(), "2019-07-01 12:30:05");
        assert_eq!(
            Timestamp::Naive(naive(12)).to_string(),
            "2019-07-01 12:30:05.000012"
        );
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let aware = naive(0).and_local_timezone(offset).unwrap();
        assert_eq!(
            Timestamp::Aware(aware).to_string(),
            "2019-07-01 12:30:05+02:00"
        );
    }

    #[test]
    fn timestamp_parse_round_trips() {
        let offset = FixedOffset::west_opt(5 * 3600).unwrap();
        let cases = [
            Timestamp::Naive(naive(0)),
            Timestamp::Naive(naive(999_999)),
            Timestamp::Aware(naive(42).and_local_timezone(offset).unwrap()),
        ];
        for ts in cases {
            assert_eq!(Timestamp::parse(&ts.to_string()), Some(ts));
        }
        assert_eq!(
            Timestamp::parse("2019-07-01T12:30:05"),
            Some(Timestamp::Naive(naive(0)))
        );
        assert_eq!(Timestamp::parse("not a date"), None);
    }

    #[test]
    fn offsets_with_seconds_survive() {
        let offset = FixedOffset::east_opt(5 * 3600 + 30 * 60 + 15).unwrap();
        let ts = Timestamp::Aware(naive(250).and_local_timezone(offset).unwrap());
        let text = ts.to_string();
        assert_eq!(text, "2019-07-01 12:30:05.000250+05:30:15");
        assert_eq!(Timestamp::parse(&text), Some(ts));

        let west = FixedOffset::west_opt(3600 + 1).unwrap();
        let ts = Timestamp::Aware(naive(0).and_local_timezone(west).unwrap());
        assert_eq!(ts.to_string(), "2019-07-01 12:30:05-01:00:01");
        assert_eq!(Timestamp::parse(&ts.to_string()), Some(ts));
    }

    #[test]
    fn nan_is_not_equal_to_itself() {
        assert_ne!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert_eq!(Value::Float(1.5), Value::Float(1.5));
        assert_ne!(Value::Int(1), Value::Float(1.0));
    }

    #[test]
    fn foreign_values_compare_dynamically() {
        #[derive(Debug, PartialEq)]
        struct Opaque(u8);

        let a = Value::foreign(Opaque(1));
        assert_eq!(a, Value::foreign(Opaque(1)));
        assert_ne!(a, Value::foreign(Opaque(2)));
        assert_ne!(a, Value::foreign(1u8));
        assert_eq!(a.downcast_ref::<Opaque>(), Some(&Opaque(1)));
        assert_eq!(a.type_name(), "Opaque");
    }

    #[test]
    fn display_coercions() {
        assert_eq!(Value::Null.display(), "None");
        assert_eq!(
            Value::Seq(vec![Value::Int(1), Value::Str("a".into())]).display(),
            "[1, a]"
        );
        assert_eq!(Value::Bytes(b"ab\x01".to_vec()).display(), "b'ab\\x01'");
    }
}
