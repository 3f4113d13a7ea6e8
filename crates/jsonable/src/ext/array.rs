//! Dense n-dimensional numeric arrays.
//!
//! Encoded as `{"@module": "numpy", "@class": "array", "dtype", "data"}`
//! where `data` is the nested-list form. Complex arrays store
//! `[real_nested, imag_nested]`. A zero-dimensional real array encodes as
//! its bare element.

use std::fmt;

use crate::canonical::{Canonical, CanonicalMap};
use crate::decode::builtin::str_entry;
use crate::decode::Decoder;
use crate::encode::{fixed_shape, EncodeHandler, Encoder};
use crate::error::{Error, Result};
use crate::object::TypeTag;
use crate::registry::Registry;
use crate::value::Value;

const MODULE: &str = "numpy";
const CLASS: &str = "array";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dtype {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    Float32,
    Float64,
    Complex64,
    Complex128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Bool,
    Int,
    Float,
    Complex,
}

impl Dtype {
    pub fn as_str(self) -> &'static str {
        match self {
            Dtype::Bool => "bool",
            Dtype::Int8 => "int8",
            Dtype::Int16 => "int16",
            Dtype::Int32 => "int32",
            Dtype::Int64 => "int64",
            Dtype::UInt8 => "uint8",
            Dtype::UInt16 => "uint16",
            Dtype::UInt32 => "uint32",
            Dtype::Float32 => "float32",
            Dtype::Float64 => "float64",
            Dtype::Complex64 => "complex64",
            Dtype::Complex128 => "complex128",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "bool" => Dtype::Bool,
            "int8" => Dtype::Int8,
            "int16" => Dtype::Int16,
            "int32" => Dtype::Int32,
            "int64" => Dtype::Int64,
            "uint8" => Dtype::UInt8,
            "uint16" => Dtype::UInt16,
            "uint32" => Dtype::UInt32,
            "float32" => Dtype::Float32,
            "float64" => Dtype::Float64,
            "complex64" => Dtype::Complex64,
            "complex128" => Dtype::Complex128,
            _ => return None,
        })
    }

    pub fn is_complex(self) -> bool {
        self.category() == Category::Complex
    }

    fn category(self) -> Category {
        match self {
            Dtype::Bool => Category::Bool,
            Dtype::Int8
            | Dtype::Int16
            | Dtype::Int32
            | Dtype::Int64
            | Dtype::UInt8
            | Dtype::UInt16
            | Dtype::UInt32 => Category::Int,
            Dtype::Float32 | Dtype::Float64 => Category::Float,
            Dtype::Complex64 | Dtype::Complex128 => Category::Complex,
        }
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    pub const fn new(re: f64, im: f64) -> Self {
        Complex { re, im }
    }
}

fn fmt_component(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{}", f as i64)
    } else {
        format!("{:?}", f)
    }
}

impl fmt::Display for Complex {
    /// `(1+2j)` style.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.im.is_sign_negative() { '-' } else { '+' };
        write!(
            f,
            "({}{}{}j)",
            fmt_component(self.re),
            sign,
            fmt_component(self.im.abs())
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Element {
    Bool(bool),
    Int(i64),
    Float(f64),
    Complex(Complex),
}

impl Element {
    /// `None` for complex elements, which have no single JSON number.
    fn to_canonical(self) -> Option<Canonical> {
        match self {
            Element::Bool(b) => Some(Canonical::Bool(b)),
            Element::Int(i) => Some(Canonical::Int(i)),
            Element::Float(f) => Some(Canonical::Float(f)),
            Element::Complex(_) => None,
        }
    }
}

/// Flat row-major storage.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    Bool(Vec<bool>),
    Int(Vec<i64>),
    Float(Vec<f64>),
    Complex(Vec<Complex>),
}

impl ArrayData {
    pub fn len(&self) -> usize {
        match self {
            ArrayData::Bool(v) => v.len(),
            ArrayData::Int(v) => v.len(),
            ArrayData::Float(v) => v.len(),
            ArrayData::Complex(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn element(&self, i: usize) -> Option<Element> {
        match self {
            ArrayData::Bool(v) => v.get(i).copied().map(Element::Bool),
            ArrayData::Int(v) => v.get(i).copied().map(Element::Int),
            ArrayData::Float(v) => v.get(i).copied().map(Element::Float),
            ArrayData::Complex(v) => v.get(i).copied().map(Element::Complex),
        }
    }

    fn category(&self) -> Category {
        match self {
            ArrayData::Bool(_) => Category::Bool,
            ArrayData::Int(_) => Category::Int,
            ArrayData::Float(_) => Category::Float,
            ArrayData::Complex(_) => Category::Complex,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NdArray {
    dtype: Dtype,
    shape: Vec<usize>,
    data: ArrayData,
}

impl NdArray {
    pub fn new(dtype: Dtype, shape: Vec<usize>, data: ArrayData) -> Result<Self> {
        if dtype.category() != data.category() {
            return Err(Error::malformed(
                CLASS,
                format!("{} storage cannot hold dtype {}", data_kind(&data), dtype),
            ));
        }
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(Error::malformed(
                CLASS,
                format!(
                    "shape {:?} needs {} elements, got {}",
                    shape,
                    expected,
                    data.len()
                ),
            ));
        }
        Ok(NdArray { dtype, shape, data })
    }

    pub fn from_i64(shape: Vec<usize>, data: Vec<i64>) -> Result<Self> {
        Self::new(Dtype::Int64, shape, ArrayData::Int(data))
    }

    pub fn from_f64(shape: Vec<usize>, data: Vec<f64>) -> Result<Self> {
        Self::new(Dtype::Float64, shape, ArrayData::Float(data))
    }

    pub fn from_bool(shape: Vec<usize>, data: Vec<bool>) -> Result<Self> {
        Self::new(Dtype::Bool, shape, ArrayData::Bool(data))
    }

    pub fn from_complex(shape: Vec<usize>, data: Vec<Complex>) -> Result<Self> {
        Self::new(Dtype::Complex128, shape, ArrayData::Complex(data))
    }

    pub fn dtype(&self) -> Dtype {
        self.dtype
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    /// Element at a full multi-index.
    pub fn get(&self, index: &[usize]) -> Option<Element> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut flat = 0;
        for (i, dim) in index.iter().zip(&self.shape) {
            if i >= dim {
                return None;
            }
            flat = flat * dim + i;
        }
        self.data.element(flat)
    }

    fn elements(&self) -> Vec<Element> {
        (0..self.data.len())
            .filter_map(|i| self.data.element(i))
            .collect()
    }

    /// Nested-list form, mapping each element through `leaf`.
    pub(crate) fn nested<F>(&self, leaf: &mut F) -> Result<Canonical>
    where
        F: FnMut(Element) -> Result<Canonical>,
    {
        nest(&self.shape, &self.elements(), leaf)
    }

    fn to_canonical(&self) -> Result<Canonical> {
        if let ArrayData::Complex(values) = &self.data {
            let re: Vec<Element> = values.iter().map(|c| Element::Float(c.re)).collect();
            let im: Vec<Element> = values.iter().map(|c| Element::Float(c.im)).collect();
            let mut leaf = |e: Element| Ok(e.to_canonical().unwrap_or(Canonical::Null));
            let data = Canonical::Seq(vec![
                nest(&self.shape, &re, &mut leaf)?,
                nest(&self.shape, &im, &mut leaf)?,
            ]);
            return Ok(self.tagged(data));
        }
        if self.shape.is_empty() {
            if let Some(element) = self.data.element(0).and_then(Element::to_canonical) {
                return Ok(element);
            }
        }
        let data = self.nested(&mut |e| Ok(e.to_canonical().unwrap_or(Canonical::Null)))?;
        Ok(self.tagged(data))
    }

    fn tagged(&self, data: Canonical) -> Canonical {
        fixed_shape(
            MODULE,
            CLASS,
            [
                ("dtype", Canonical::Str(self.dtype.as_str().to_string())),
                ("data", data),
            ],
        )
    }

    fn from_nested(dtype: Dtype, data: &Canonical) -> Result<Self> {
        if dtype.is_complex() {
            let parts = match data {
                Canonical::Seq(parts) if parts.len() == 2 => parts,
                _ => {
                    return Err(Error::malformed(
                        CLASS,
                        "complex data must be [real, imag]",
                    ))
                }
            };
            let (shape, re) = flatten(&parts[0])?;
            let (im_shape, im) = flatten(&parts[1])?;
            if shape != im_shape {
                return Err(Error::malformed(CLASS, "real and imaginary shapes differ"));
            }
            let values = re
                .iter()
                .zip(&im)
                .map(|(r, i)| Ok(Complex::new(leaf_f64(r)?, leaf_f64(i)?)))
                .collect::<Result<Vec<_>>>()?;
            return Self::new(dtype, shape, ArrayData::Complex(values));
        }
        let (shape, leaves) = flatten(data)?;
        let storage = match dtype.category() {
            Category::Bool => ArrayData::Bool(
                leaves
                    .iter()
                    .map(|c| c.as_bool().ok_or_else(|| bad_leaf(c, dtype)))
                    .collect::<Result<_>>()?,
            ),
            Category::Int => ArrayData::Int(
                leaves
                    .iter()
                    .map(|c| c.as_i64().ok_or_else(|| bad_leaf(c, dtype)))
                    .collect::<Result<_>>()?,
            ),
            Category::Float => ArrayData::Float(
                leaves.iter().map(|c| leaf_f64(c)).collect::<Result<_>>()?,
            ),
            Category::Complex => {
                return Err(Error::malformed(CLASS, "complex data must be [real, imag]"))
            }
        };
        Self::new(dtype, shape, storage)
    }
}

fn data_kind(data: &ArrayData) -> &'static str {
    match data {
        ArrayData::Bool(_) => "bool",
        ArrayData::Int(_) => "integer",
        ArrayData::Float(_) => "float",
        ArrayData::Complex(_) => "complex",
    }
}

fn bad_leaf(leaf: &Canonical, dtype: Dtype) -> Error {
    Error::malformed(
        CLASS,
        format!("{} element in a {} array", leaf.kind_name(), dtype),
    )
}

fn leaf_f64(leaf: &Canonical) -> Result<f64> {
    leaf.as_f64().ok_or_else(|| bad_leaf(leaf, Dtype::Float64))
}

fn nest<F>(shape: &[usize], flat: &[Element], leaf: &mut F) -> Result<Canonical>
where
    F: FnMut(Element) -> Result<Canonical>,
{
    let Some((&dim, rest)) = shape.split_first() else {
        return match flat.first() {
            Some(element) => leaf(*element),
            None => Ok(Canonical::Null),
        };
    };
    let chunk: usize = rest.iter().product();
    let mut items = Vec::with_capacity(dim);
    for i in 0..dim {
        items.push(nest(rest, &flat[i * chunk..(i + 1) * chunk], leaf)?);
    }
    Ok(Canonical::Seq(items))
}

/// Infers the shape from the first element at each level, then checks
/// that the whole tree is rectangular.
fn flatten(data: &Canonical) -> Result<(Vec<usize>, Vec<&Canonical>)> {
    let mut shape = Vec::new();
    let mut cursor = data;
    while let Canonical::Seq(items) = cursor {
        shape.push(items.len());
        match items.first() {
            Some(first) => cursor = first,
            None => break,
        }
    }
    let mut leaves = Vec::new();
    collect_leaves(data, &shape, &mut leaves)?;
    Ok((shape, leaves))
}

fn collect_leaves<'a>(
    node: &'a Canonical,
    shape: &[usize],
    out: &mut Vec<&'a Canonical>,
) -> Result<()> {
    match (shape.split_first(), node) {
        (None, Canonical::Seq(_)) => Err(Error::malformed(CLASS, "ragged nested data")),
        (None, leaf) => {
            out.push(leaf);
            Ok(())
        }
        (Some((&dim, rest)), Canonical::Seq(items)) if items.len() == dim => items
            .iter()
            .try_for_each(|item| collect_leaves(item, rest, out)),
        (Some(_), _) => Err(Error::malformed(CLASS, "ragged nested data")),
    }
}

pub(super) const ENCODE: EncodeHandler = EncodeHandler {
    name: "array",
    encode_fn: encode_array,
};

fn encode_array(value: &Value, _: &Encoder) -> Option<Result<Canonical>> {
    value.downcast_ref::<NdArray>().map(NdArray::to_canonical)
}

fn decode_array(map: &CanonicalMap, _: &Decoder) -> Result<Value> {
    let name = str_entry(map, CLASS, "dtype")?;
    let dtype = Dtype::parse(name)
        .ok_or_else(|| Error::malformed(CLASS, format!("unknown dtype '{}'", name)))?;
    let data = map
        .get("data")
        .ok_or_else(|| Error::malformed(CLASS, "missing 'data'"))?;
    NdArray::from_nested(dtype, data).map(Value::foreign)
}

pub(super) fn register(registry: &mut Registry) {
    registry.register_raw(TypeTag::new(MODULE, CLASS), decode_array);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn round_trip(arr: NdArray) -> Value {
        let registry = Arc::new(Registry::with_builtins());
        let cf = Encoder::with_registry(registry.clone())
            .encode(&Value::foreign(arr))
            .unwrap();
        Decoder::with_registry(registry).decode(&cf).unwrap()
    }

    #[test]
    fn matrix_encodes_as_nested_lists() {
        let arr = NdArray::from_i64(vec![2, 3], vec![1, 2, 3, 4, 5, 6]).unwrap();
        let cf = arr.to_canonical().unwrap();
        assert_eq!(cf["dtype"], Canonical::from("int64"));
        assert_eq!(cf["data"][1][2], Canonical::Int(6));
        assert_eq!(round_trip(arr.clone()), Value::foreign(arr));
    }

    #[test]
    fn complex_round_trip_keeps_components() {
        let arr = NdArray::from_complex(
            vec![2, 2],
            vec![
                Complex::new(1.0, 0.0),
                Complex::new(2.0, 1.0),
                Complex::new(0.0, -1.0),
                Complex::new(3.5, 2.0),
            ],
        )
        .unwrap();
        let back = round_trip(arr.clone());
        let back = back.downcast_ref::<NdArray>().unwrap();
        assert_eq!(back, &arr);
        assert_eq!(back.get(&[0, 1]), Some(Element::Complex(Complex::new(2.0, 1.0))));
    }

    #[test]
    fn zero_dimensional_is_a_bare_number() {
        let arr = NdArray::from_f64(vec![], vec![2.5]).unwrap();
        assert_eq!(arr.to_canonical().unwrap(), Canonical::Float(2.5));
    }

    #[test]
    fn empty_and_ragged_data() {
        let arr = NdArray::from_f64(vec![0], vec![]).unwrap();
        assert_eq!(round_trip(arr.clone()), Value::foreign(arr));

        let ragged = Canonical::Seq(vec![
            Canonical::Seq(vec![Canonical::Int(1)]),
            Canonical::Seq(vec![]),
        ]);
        assert!(NdArray::from_nested(Dtype::Int64, &ragged).is_err());
    }

    #[test]
    fn complex_display() {
        assert_eq!(Complex::new(1.0, 2.0).to_string(), "(1+2j)");
        assert_eq!(Complex::new(1.5, -0.5).to_string(), "(1.5-0.5j)");
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        assert!(NdArray::from_i64(vec![2, 2], vec![1, 2, 3]).is_err());
        assert!(NdArray::new(Dtype::Float64, vec![1], ArrayData::Int(vec![1])).is_err());
    }
}
