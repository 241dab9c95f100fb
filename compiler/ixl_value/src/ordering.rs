//! Total ordering over values.
//!
//! Numbers of different widths compare by numeric value, so `1` (int) equals
//! `1` (long). Values of unrelated kinds order by kind so that the ordering
//! stays total.

use std::cmp::Ordering;

use crate::value::Value;

impl Value {
    /// Compare two values.
    ///
    /// Floating values compare numerically, so `0.0` equals `-0.0`. NaN
    /// falls back to IEEE total ordering: it equals itself and sorts above
    /// every other number.
    pub fn compare_to(&self, other: &Value) -> Ordering {
        if self.is_numeric() && other.is_numeric() {
            return compare_numbers(self, other);
        }
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Position(a), Value::Position(b)) => a.cmp(b),
            (Value::Str(a), Value::Str(b)) | (Value::Predicate(a), Value::Predicate(b)) => {
                a.as_str().cmp(b.as_str())
            }
            (Value::Raw(a), Value::Raw(b)) => a.as_slice().cmp(b.as_slice()),
            (Value::Array(a), Value::Array(b)) => {
                compare_seq(a.items().iter(), b.items().iter())
            }
            (Value::WeightedSet(a), Value::WeightedSet(b)) => compare_seq(
                a.entries().iter().map(|(v, _)| v),
                b.entries().iter().map(|(v, _)| v),
            )
            .then_with(|| {
                let wa = a.entries().iter().map(|(_, w)| *w);
                let wb = b.entries().iter().map(|(_, w)| *w);
                wa.cmp(wb)
            }),
            (Value::Map(a), Value::Map(b)) => compare_seq(
                a.entries().iter().flat_map(|(k, v)| [k, v]),
                b.entries().iter().flat_map(|(k, v)| [k, v]),
            ),
            (Value::Struct(a), Value::Struct(b)) => a
                .struct_type()
                .name()
                .cmp(b.struct_type().name())
                .then_with(|| {
                    let fa = a.iter().map(|(_, v)| v);
                    let fb = b.iter().map(|(_, v)| v);
                    for (x, y) in fa.zip(fb) {
                        let ord = match (x, y) {
                            (None, None) => Ordering::Equal,
                            (None, Some(_)) => Ordering::Less,
                            (Some(_), None) => Ordering::Greater,
                            (Some(x), Some(y)) => x.compare_to(y),
                        };
                        if ord != Ordering::Equal {
                            return ord;
                        }
                    }
                    a.struct_type().len().cmp(&b.struct_type().len())
                }),
            _ => kind_rank(self).cmp(&kind_rank(other)),
        }
    }
}

fn compare_numbers(a: &Value, b: &Value) -> Ordering {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x.cmp(&y);
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or_else(|| x.total_cmp(&y)),
        _ => Ordering::Equal,
    }
}

fn compare_seq<'a>(
    mut a: impl Iterator<Item = &'a Value>,
    mut b: impl Iterator<Item = &'a Value>,
) -> Ordering {
    loop {
        match (a.next(), b.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => match x.compare_to(y) {
                Ordering::Equal => {}
                ord => return ord,
            },
        }
    }
}

fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Byte(_) | Value::Int(_) | Value::Long(_) | Value::Float(_) | Value::Double(_) => 0,
        Value::Bool(_) => 1,
        Value::Str(_) => 2,
        Value::Predicate(_) => 3,
        Value::Raw(_) => 4,
        Value::Position(_) => 5,
        Value::Array(_) => 6,
        Value::WeightedSet(_) => 7,
        Value::Map(_) => 8,
        Value::Struct(_) => 9,
    }
}
