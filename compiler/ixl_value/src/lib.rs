//! Field values for ixl.
//!
//! [`Value`] is the runtime counterpart of [`ixl_types::DataType`]: every
//! value knows its own type ([`Value::data_type`]) and can be checked against
//! a required type ([`Value::conforms_to`]).
//!
//! Absence is not a value. Code that may produce "nothing" uses
//! `Option<Value>`, so an absent field is never confused with an empty string
//! or a zero.
//!
//! # Sharing
//!
//! Strings, collections and structs live behind [`Heap`], a reference-counted
//! wrapper. Cloning a value is cheap; mutation goes through copy-on-write
//! methods on the composite types.

mod composite;
mod heap;
mod ordering;
mod value;

pub use composite::{ArrayValue, MapValue, StructValue, WeightedSetValue};
pub use heap::Heap;
pub use value::{Position, Value};
