//! The `Value` enum and its factory methods.

use std::fmt;

use ixl_types::DataType;

use crate::composite::{ArrayValue, MapValue, StructValue, WeightedSetValue};
use crate::heap::Heap;

/// A geographic position in micro-degrees.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

/// A concrete field value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    // Primitives (inline, no heap allocation)
    Byte(i8),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bool(bool),
    Position(Position),

    // Heap-backed primitives
    Str(Heap<String>),
    Raw(Heap<Vec<u8>>),
    Predicate(Heap<String>),

    // Composites
    Array(ArrayValue),
    WeightedSet(WeightedSetValue),
    Map(MapValue),
    Struct(StructValue),
}

// Factory methods

impl Value {
    #[inline]
    pub fn string(s: impl Into<String>) -> Self {
        Value::Str(Heap::new(s.into()))
    }

    #[inline]
    pub fn raw(bytes: impl Into<Vec<u8>>) -> Self {
        Value::Raw(Heap::new(bytes.into()))
    }

    #[inline]
    pub fn predicate(text: impl Into<String>) -> Self {
        Value::Predicate(Heap::new(text.into()))
    }

    #[inline]
    pub fn position(x: i32, y: i32) -> Self {
        Value::Position(Position { x, y })
    }

    /// An array of `element_type` holding `items`.
    #[inline]
    pub fn array(element_type: DataType, items: Vec<Value>) -> Self {
        Value::Array(ArrayValue::new(element_type, items))
    }
}

// Accessors

impl Value {
    /// The type this value is an instance of.
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Byte(_) => DataType::Byte,
            Value::Int(_) => DataType::Int,
            Value::Long(_) => DataType::Long,
            Value::Float(_) => DataType::Float,
            Value::Double(_) => DataType::Double,
            Value::Bool(_) => DataType::Bool,
            Value::Position(_) => DataType::Position,
            Value::Str(_) => DataType::String,
            Value::Raw(_) => DataType::Raw,
            Value::Predicate(_) => DataType::Predicate,
            Value::Array(a) => DataType::array(a.element_type().clone()),
            Value::WeightedSet(w) => DataType::weighted_set(w.element_type().clone()),
            Value::Map(m) => DataType::map(m.key_type().clone(), m.value_type().clone()),
            Value::Struct(s) => DataType::Struct(s.struct_type().clone()),
        }
    }

    /// Whether this value may flow where `ty` is required.
    pub fn conforms_to(&self, ty: &DataType) -> bool {
        ty.is_assignable_from(&self.data_type())
    }

    /// Byte, int, long, float or double.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Value::Byte(_) | Value::Int(_) | Value::Long(_) | Value::Float(_) | Value::Double(_)
        )
    }

    /// Integral numeric value widened to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Byte(n) => Some(i64::from(*n)),
            Value::Int(n) => Some(i64::from(*n)),
            Value::Long(n) => Some(*n),
            _ => None,
        }
    }

    /// Any numeric value widened to `f64`.
    ///
    /// Longs beyond 2^53 lose precision; callers comparing two integral
    /// values should use [`Value::as_i64`].
    #[expect(
        clippy::cast_precision_loss,
        reason = "floating comparison of mixed numeric widths"
    )]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(n) => Some(f64::from(*n)),
            Value::Double(n) => Some(*n),
            other => other.as_i64().map(|n| n as f64),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayValue> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_weighted_set(&self) -> Option<&WeightedSetValue> {
        match self {
            Value::WeightedSet(w) => Some(w),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapValue> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructValue> {
        match self {
            Value::Struct(s) => Some(s),
            _ => None,
        }
    }
}

impl From<ArrayValue> for Value {
    fn from(value: ArrayValue) -> Self {
        Value::Array(value)
    }
}

impl From<WeightedSetValue> for Value {
    fn from(value: WeightedSetValue) -> Self {
        Value::WeightedSet(value)
    }
}

impl From<MapValue> for Value {
    fn from(value: MapValue) -> Self {
        Value::Map(value)
    }
}

impl From<StructValue> for Value {
    fn from(value: StructValue) -> Self {
        Value::Struct(value)
    }
}

/// Textual form of a value, as used by string concatenation.
///
/// Strings render without quotes.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Byte(n) => write!(f, "{n}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Long(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::Double(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Position(p) => write!(f, "N{};E{}", p.y, p.x),
            Value::Str(s) | Value::Predicate(s) => f.write_str(s),
            Value::Raw(bytes) => {
                for b in bytes.iter() {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
            Value::Array(a) => {
                write!(f, "[")?;
                for (i, item) in a.items().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::WeightedSet(w) => {
                write!(f, "{{")?;
                for (i, (item, weight)) in w.entries().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}:{weight}")?;
                }
                write!(f, "}}")
            }
            Value::Map(m) => {
                write!(f, "{{")?;
                for (i, (key, value)) in m.entries().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}:{value}")?;
                }
                write!(f, "}}")
            }
            Value::Struct(s) => {
                write!(f, "{}{{", s.struct_type().name())?;
                let mut first = true;
                for (field, value) in s.iter() {
                    let Some(value) = value else { continue };
                    if !first {
                        write!(f, ", ")?;
                    }
                    first = false;
                    write!(f, "{}:{value}", field.name())?;
                }
                write!(f, "}}")
            }
        }
    }
}
