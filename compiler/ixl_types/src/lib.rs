//! Type model for ixl.
//!
//! Every value flowing through an expression tree is described by a
//! [`DataType`]. The type model is a small lattice:
//!
//! - Primitive scalars (`byte`, `int`, `long`, `float`, `double`, `bool`,
//!   `string`, `raw`, `position`, `predicate`)
//! - Parameterized collections (`array<T>`, `weightedset<T>`, `map<K,V>`)
//! - Structured types ([`StructType`]), assignable only to themselves
//! - Two wildcards used by generic nodes: `Any` and `AnyNumeric`
//! - A placeholder `Unresolved` for output types that are only known once
//!   verification has run
//!
//! Assignability ([`DataType::is_assignable_from`]) is reflexive and covariant
//! into collections of a wildcard element type.

mod data_type;
mod struct_type;

pub use data_type::DataType;
pub use struct_type::{Field, StructType};
