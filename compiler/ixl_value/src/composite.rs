//! Collection and struct values.
//!
//! Every composite keeps its contents behind a [`Heap`], so cloning a value
//! out of a document is cheap and mutation copies only when the storage is
//! shared.

use std::sync::Arc;

use ixl_types::{DataType, Field, StructType};

use crate::heap::Heap;
use crate::value::Value;

/// An ordered list of values of one element type.
#[derive(Clone, Debug, PartialEq)]
pub struct ArrayValue {
    element_type: DataType,
    items: Heap<Vec<Value>>,
}

impl ArrayValue {
    pub fn new(element_type: DataType, items: Vec<Value>) -> Self {
        ArrayValue {
            element_type,
            items: Heap::new(items),
        }
    }

    pub fn empty(element_type: DataType) -> Self {
        Self::new(element_type, Vec::new())
    }

    pub fn element_type(&self) -> &DataType {
        &self.element_type
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push(&mut self, item: Value) {
        self.items.make_mut().push(item);
    }

    /// A new array holding the items of `self` followed by those of `other`.
    ///
    /// The element type of `self` is kept.
    #[must_use]
    pub fn concat(&self, other: &ArrayValue) -> ArrayValue {
        let mut items = Vec::with_capacity(self.len() + other.len());
        items.extend(self.items.iter().cloned());
        items.extend(other.items.iter().cloned());
        ArrayValue::new(self.element_type.clone(), items)
    }
}

/// A set of distinct values, each carrying an integer weight.
///
/// Insertion order is preserved. Inserting an item that is already present
/// replaces its weight.
#[derive(Clone, Debug, PartialEq)]
pub struct WeightedSetValue {
    element_type: DataType,
    entries: Heap<Vec<(Value, i32)>>,
}

impl WeightedSetValue {
    pub fn new(element_type: DataType) -> Self {
        WeightedSetValue {
            element_type,
            entries: Heap::new(Vec::new()),
        }
    }

    pub fn element_type(&self) -> &DataType {
        &self.element_type
    }

    pub fn entries(&self) -> &[(Value, i32)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Weight of `item`, if present.
    pub fn weight(&self, item: &Value) -> Option<i32> {
        self.entries
            .iter()
            .find_map(|(v, w)| (v == item).then_some(*w))
    }

    pub fn insert(&mut self, item: Value, weight: i32) {
        let entries = self.entries.make_mut();
        match entries.iter_mut().find(|(v, _)| *v == item) {
            Some(entry) => entry.1 = weight,
            None => entries.push((item, weight)),
        }
    }

    /// A new set holding the entries of both sets.
    ///
    /// Items present in both take the weight from `other`.
    #[must_use]
    pub fn concat(&self, other: &WeightedSetValue) -> WeightedSetValue {
        let mut out = self.clone();
        for (item, weight) in other.entries.iter() {
            out.insert(item.clone(), *weight);
        }
        out
    }
}

/// Key/value pairs with unique keys, in insertion order.
#[derive(Clone, Debug, PartialEq)]
pub struct MapValue {
    key_type: DataType,
    value_type: DataType,
    entries: Heap<Vec<(Value, Value)>>,
}

impl MapValue {
    pub fn new(key_type: DataType, value_type: DataType) -> Self {
        MapValue {
            key_type,
            value_type,
            entries: Heap::new(Vec::new()),
        }
    }

    pub fn key_type(&self) -> &DataType {
        &self.key_type
    }

    pub fn value_type(&self) -> &DataType {
        &self.value_type
    }

    pub fn entries(&self) -> &[(Value, Value)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries
            .iter()
            .find_map(|(k, v)| (k == key).then_some(v))
    }

    /// Insert or replace the value stored under `key`.
    pub fn insert(&mut self, key: Value, value: Value) {
        let entries = self.entries.make_mut();
        match entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => entries.push((key, value)),
        }
    }
}

/// A value of a [`StructType`]: one optional slot per declared field.
#[derive(Clone, Debug, PartialEq)]
pub struct StructValue {
    ty: Arc<StructType>,
    fields: Heap<Vec<Option<Value>>>,
}

impl StructValue {
    /// A struct with every field unset.
    pub fn new(ty: Arc<StructType>) -> Self {
        let fields = vec![None; ty.len()];
        StructValue {
            ty,
            fields: Heap::new(fields),
        }
    }

    pub fn struct_type(&self) -> &Arc<StructType> {
        &self.ty
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        let index = self.ty.field_index(name)?;
        self.field_at(index)
    }

    pub fn field_at(&self, index: usize) -> Option<&Value> {
        self.fields.get(index).and_then(Option::as_ref)
    }

    /// Set or clear a field by name. Returns `false` if the struct type has
    /// no such field.
    pub fn set_field(&mut self, name: &str, value: Option<Value>) -> bool {
        match self.ty.field_index(name) {
            Some(index) => {
                self.set_field_at(index, value);
                true
            }
            None => false,
        }
    }

    pub fn set_field_at(&mut self, index: usize, value: Option<Value>) {
        if let Some(slot) = self.fields.make_mut().get_mut(index) {
            *slot = value;
        }
    }

    /// Declared fields paired with their current values.
    pub fn iter(&self) -> impl Iterator<Item = (&Field, Option<&Value>)> {
        self.ty
            .fields()
            .iter()
            .zip(self.fields.iter().map(Option::as_ref))
    }
}
