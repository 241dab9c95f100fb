//! The `DataType` lattice.

use std::fmt;
use std::sync::Arc;

use crate::StructType;

/// Descriptor of a value type flowing through an expression tree.
///
/// Collections are parameterized by their element types; structs are shared
/// behind an `Arc` because the same layout is referenced by every value and
/// every node that mentions it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataType {
    // Primitive scalars
    Byte,
    Int,
    Long,
    Float,
    Double,
    Bool,
    String,
    Raw,
    Position,
    Predicate,

    // Parameterized types
    Array(Box<DataType>),
    WeightedSet(Box<DataType>),
    Map(Box<DataType>, Box<DataType>),
    Struct(Arc<StructType>),

    // Wildcards (generic nodes only)
    /// Matches every type.
    Any,
    /// Matches every numeric primitive and any collection thereof.
    AnyNumeric,

    /// Placeholder for a type that is decided during verification.
    Unresolved,
}

impl DataType {
    /// `array<element>`.
    pub fn array(element: DataType) -> Self {
        DataType::Array(Box::new(element))
    }

    /// `weightedset<element>`.
    pub fn weighted_set(element: DataType) -> Self {
        DataType::WeightedSet(Box::new(element))
    }

    /// `map<key,value>`.
    pub fn map(key: DataType, value: DataType) -> Self {
        DataType::Map(Box::new(key), Box::new(value))
    }

    /// Wrap a struct layout.
    pub fn structure(ty: StructType) -> Self {
        DataType::Struct(Arc::new(ty))
    }

    /// Numeric primitives: byte, int, long, float, double.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::Byte | DataType::Int | DataType::Long | DataType::Float | DataType::Double
        )
    }

    /// Integral primitives: byte, int, long.
    pub fn is_integral(&self) -> bool {
        matches!(self, DataType::Byte | DataType::Int | DataType::Long)
    }

    /// Primitive scalar types.
    pub fn is_primitive(&self) -> bool {
        self.is_numeric()
            || matches!(
                self,
                DataType::Bool
                    | DataType::String
                    | DataType::Raw
                    | DataType::Position
                    | DataType::Predicate
            )
    }

    /// `Any` or `AnyNumeric`.
    pub fn is_wildcard(&self) -> bool {
        matches!(self, DataType::Any | DataType::AnyNumeric)
    }

    /// Arrays and weighted sets, the shapes that support concatenation.
    pub fn is_collection(&self) -> bool {
        matches!(self, DataType::Array(_) | DataType::WeightedSet(_))
    }

    /// Element type of an array or weighted set.
    pub fn element_type(&self) -> Option<&DataType> {
        match self {
            DataType::Array(element) | DataType::WeightedSet(element) => Some(element),
            _ => None,
        }
    }

    /// Same collection shape with a different element type.
    ///
    /// Returns `None` if `self` is not an array or weighted set.
    pub fn with_element_type(&self, element: DataType) -> Option<DataType> {
        match self {
            DataType::Array(_) => Some(DataType::array(element)),
            DataType::WeightedSet(_) => Some(DataType::weighted_set(element)),
            _ => None,
        }
    }

    /// Whether the type, including all nested element and field types, is
    /// free of the `Unresolved` placeholder.
    pub fn is_resolved(&self) -> bool {
        match self {
            DataType::Unresolved => false,
            DataType::Array(element) | DataType::WeightedSet(element) => element.is_resolved(),
            DataType::Map(key, value) => key.is_resolved() && value.is_resolved(),
            DataType::Struct(ty) => ty.fields().iter().all(|f| f.data_type().is_resolved()),
            _ => true,
        }
    }

    /// Whether a value of type `other` may be used where `self` is required.
    ///
    /// Reflexive for every resolved type. Covariant only into wildcard element
    /// types: `array<any>` accepts `array<int>` but not the other way around.
    /// Structs are accepted only by an identical layout.
    pub fn is_assignable_from(&self, other: &DataType) -> bool {
        match (self, other) {
            (DataType::Unresolved, _) | (_, DataType::Unresolved) => false,
            (DataType::Any, _) => true,
            (DataType::AnyNumeric, other) => {
                other.is_numeric()
                    || *other == DataType::AnyNumeric
                    || other
                        .element_type()
                        .is_some_and(|e| DataType::AnyNumeric.is_assignable_from(e))
            }
            (DataType::Array(a), DataType::Array(b))
            | (DataType::WeightedSet(a), DataType::WeightedSet(b)) => a.is_assignable_from(b),
            (DataType::Map(k1, v1), DataType::Map(k2, v2)) => {
                k1.is_assignable_from(k2) && v1.is_assignable_from(v2)
            }
            (DataType::Struct(a), DataType::Struct(b)) => Arc::ptr_eq(a, b) || a == b,
            (a, b) => a == b,
        }
    }

    /// Widening rank of a numeric primitive.
    fn numeric_rank(&self) -> Option<u8> {
        match self {
            DataType::Byte => Some(0),
            DataType::Int => Some(1),
            DataType::Long => Some(2),
            DataType::Float => Some(3),
            DataType::Double => Some(4),
            _ => None,
        }
    }

    /// Result type of an arithmetic operation between two numeric types.
    ///
    /// Bytes widen to int. Returns `None` if either side is not numeric.
    pub fn promote(&self, other: &DataType) -> Option<DataType> {
        let rank = self.numeric_rank()?.max(other.numeric_rank()?);
        Some(match rank {
            0 | 1 => DataType::Int,
            2 => DataType::Long,
            3 => DataType::Float,
            _ => DataType::Double,
        })
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Byte => write!(f, "byte"),
            DataType::Int => write!(f, "int"),
            DataType::Long => write!(f, "long"),
            DataType::Float => write!(f, "float"),
            DataType::Double => write!(f, "double"),
            DataType::Bool => write!(f, "bool"),
            DataType::String => write!(f, "string"),
            DataType::Raw => write!(f, "raw"),
            DataType::Position => write!(f, "position"),
            DataType::Predicate => write!(f, "predicate"),
            DataType::Array(element) => write!(f, "array<{element}>"),
            DataType::WeightedSet(element) => write!(f, "weightedset<{element}>"),
            DataType::Map(key, value) => write!(f, "map<{key},{value}>"),
            DataType::Struct(ty) => write!(f, "{}", ty.name()),
            DataType::Any => write!(f, "any"),
            DataType::AnyNumeric => write!(f, "numeric"),
            DataType::Unresolved => write!(f, "unresolved"),
        }
    }
}
