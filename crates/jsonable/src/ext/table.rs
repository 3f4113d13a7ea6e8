//! Labelled one- and two-dimensional tables.
//!
//! `DataFrame` encodes as `{"data": {column: {index: value}}}` and `Series`
//! as `{"name", "data": {index: value}}`, both tagged with the `pandas`
//! namespace.

use indexmap::IndexMap;

use crate::canonical::{Canonical, CanonicalMap};
use crate::convert::ToValue;
use crate::decode::Decoder;
use crate::encode::{fixed_shape, EncodeHandler, Encoder};
use crate::error::{Error, Result};
use crate::object::TypeTag;
use crate::registry::Registry;
use crate::value::{Fields, Value};

const MODULE: &str = "pandas";
const FRAME: &str = "DataFrame";
const SERIES: &str = "Series";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Series {
    name: Option<String>,
    index: Vec<String>,
    values: Vec<Value>,
}

impl Series {
    pub fn new<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: ToValue,
        I: IntoIterator<Item = (K, V)>,
    {
        let (index, values) = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.to_value()))
            .unzip();
        Series {
            name: None,
            index,
            values,
        }
    }

    /// Positional labels `"0"`, `"1"`, ...
    pub fn from_values(values: Vec<Value>) -> Self {
        let index = (0..values.len()).map(|i| i.to_string()).collect();
        Series {
            name: None,
            index,
            values,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn index(&self) -> &[String] {
        &self.index
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, label: &str) -> Option<&Value> {
        let pos = self.index.iter().position(|l| l == label)?;
        self.values.get(pos)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.index.iter().map(String::as_str).zip(&self.values)
    }

    pub(crate) fn to_data<F>(&self, mut f: F) -> Result<CanonicalMap>
    where
        F: FnMut(&Value) -> Result<Canonical>,
    {
        self.iter()
            .map(|(label, value)| Ok((label.to_string(), f(value)?)))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataFrame {
    index: Vec<String>,
    columns: IndexMap<String, Vec<Value>>,
}

impl DataFrame {
    /// One row per record. Columns appear in first-seen order and cells
    /// missing from a record are null.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = Fields>,
    {
        let records: Vec<Fields> = records.into_iter().collect();
        let mut columns: IndexMap<String, Vec<Value>> = IndexMap::new();
        for record in &records {
            for key in record.keys() {
                columns.entry(key.clone()).or_default();
            }
        }
        for record in &records {
            for (name, cells) in columns.iter_mut() {
                cells.push(record.get(name).cloned().unwrap_or(Value::Null));
            }
        }
        let index = (0..records.len()).map(|i| i.to_string()).collect();
        DataFrame { index, columns }
    }

    pub fn from_columns(index: Vec<String>, columns: IndexMap<String, Vec<Value>>) -> Result<Self> {
        if let Some((name, cells)) = columns.iter().find(|(_, c)| c.len() != index.len()) {
            return Err(Error::malformed(
                FRAME,
                format!(
                    "column '{}' has {} cells for {} rows",
                    name,
                    cells.len(),
                    index.len()
                ),
            ));
        }
        Ok(DataFrame { index, columns })
    }

    pub fn index(&self) -> &[String] {
        &self.index
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// `(rows, columns)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.index.len(), self.columns.len())
    }

    pub fn get(&self, row: &str, column: &str) -> Option<&Value> {
        let pos = self.index.iter().position(|l| l == row)?;
        self.columns.get(column)?.get(pos)
    }

    pub(crate) fn to_data<F>(&self, mut f: F) -> Result<CanonicalMap>
    where
        F: FnMut(&Value) -> Result<Canonical>,
    {
        let mut data = CanonicalMap::with_capacity(self.columns.len());
        for (name, cells) in &self.columns {
            let mut column = CanonicalMap::with_capacity(cells.len());
            for (label, cell) in self.index.iter().zip(cells) {
                column.insert(label.clone(), f(cell)?);
            }
            data.insert(name.clone(), Canonical::Map(column));
        }
        Ok(data)
    }
}

pub(super) const ENCODE: EncodeHandler = EncodeHandler {
    name: "table",
    encode_fn: encode_table,
};

fn encode_table(value: &Value, enc: &Encoder) -> Option<Result<Canonical>> {
    if let Some(frame) = value.downcast_ref::<DataFrame>() {
        return Some(frame.to_data(|cell| enc.encode(cell)).map(|data| {
            fixed_shape(MODULE, FRAME, [("data", Canonical::Map(data))])
        }));
    }
    let series = value.downcast_ref::<Series>()?;
    Some(series.to_data(|cell| enc.encode(cell)).map(|data| {
        let name = series
            .name()
            .map_or(Canonical::Null, |n| Canonical::Str(n.to_string()));
        fixed_shape(
            MODULE,
            SERIES,
            [("name", name), ("data", Canonical::Map(data))],
        )
    }))
}

fn data_entry<'a>(map: &'a CanonicalMap, class: &str) -> Result<&'a CanonicalMap> {
    match map.get("data") {
        Some(Canonical::Map(data)) => Ok(data),
        Some(other) => Err(Error::malformed(
            class,
            format!("'data' must be a mapping, not {}", other.kind_name()),
        )),
        None => Err(Error::malformed(class, "missing 'data'")),
    }
}

fn decode_frame(map: &CanonicalMap, dec: &Decoder) -> Result<Value> {
    let data = data_entry(map, FRAME)?;
    let mut index: Vec<String> = Vec::new();
    let mut parsed: IndexMap<String, IndexMap<String, Value>> = IndexMap::new();
    for (name, column) in data {
        let Canonical::Map(cells) = column else {
            return Err(Error::malformed(
                FRAME,
                format!("column '{}' must be a mapping", name),
            ));
        };
        let mut decoded = IndexMap::with_capacity(cells.len());
        for (label, cell) in cells {
            if !index.contains(label) {
                index.push(label.clone());
            }
            decoded.insert(label.clone(), dec.decode(cell)?);
        }
        parsed.insert(name.clone(), decoded);
    }
    let columns = parsed
        .into_iter()
        .map(|(name, mut cells)| {
            let column = index
                .iter()
                .map(|label| cells.shift_remove(label).unwrap_or(Value::Null))
                .collect();
            (name, column)
        })
        .collect();
    DataFrame::from_columns(index, columns).map(Value::foreign)
}

fn decode_series(map: &CanonicalMap, dec: &Decoder) -> Result<Value> {
    let data = data_entry(map, SERIES)?;
    let mut series = Series::default();
    for (label, cell) in data {
        series.index.push(label.clone());
        series.values.push(dec.decode(cell)?);
    }
    series.name = match map.get("name") {
        Some(Canonical::Str(name)) => Some(name.clone()),
        _ => None,
    };
    Ok(Value::foreign(series))
}

pub(super) fn register(registry: &mut Registry) {
    registry
        .register_raw(TypeTag::new(MODULE, FRAME), decode_frame)
        .register_raw(TypeTag::new(MODULE, SERIES), decode_series);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::fields;
    use std::sync::Arc;

    fn round_trip(value: Value) -> Value {
        let registry = Arc::new(Registry::with_builtins());
        let cf = Encoder::with_registry(registry.clone()).encode(&value).unwrap();
        Decoder::with_registry(registry).decode(&cf).unwrap()
    }

    #[test]
    fn frame_from_records_fills_gaps() {
        let frame = DataFrame::from_records([
            fields([("a", 1i64), ("b", 1)]),
            fields([("a", 2i64)]),
        ]);
        assert_eq!(frame.shape(), (2, 2));
        assert_eq!(frame.get("1", "b"), Some(&Value::Null));
        assert_eq!(round_trip(Value::foreign(frame.clone())), Value::foreign(frame));
    }

    #[test]
    fn frame_encodes_column_major() {
        let frame = DataFrame::from_records([fields([("x", 5i64)])]);
        let cf = Encoder::with_registry(Arc::new(Registry::with_builtins()))
            .encode(&Value::foreign(frame))
            .unwrap();
        assert_eq!(cf["@class"], Canonical::from("DataFrame"));
        assert_eq!(cf["data"]["x"]["0"], Canonical::Int(5));
    }

    #[test]
    fn series_keeps_name_and_nested_values() {
        let series = Series::new([
            ("a", vec![1i64, 2, 3]),
            ("b", vec![4, 5, 6]),
        ])
        .with_name("numbers");
        let back = round_trip(Value::foreign(series.clone()));
        let back = back.downcast_ref::<Series>().unwrap();
        assert_eq!(back, &series);
        assert_eq!(back.name(), Some("numbers"));
        assert_eq!(back.get("b").and_then(|v| v.as_seq()).map(<[Value]>::len), Some(3));
    }

    #[test]
    fn ragged_columns_are_rejected() {
        let mut columns = IndexMap::new();
        columns.insert("a".to_string(), vec![Value::Int(1)]);
        assert!(DataFrame::from_columns(vec![], columns).is_err());
    }
}
