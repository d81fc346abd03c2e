//! Cross-type BSON value ordering, used by every named index (§4.6's
//! type-rank table: `MinValue < Null < numeric < String < Document < Array
//! < Binary < ObjectId < Guid < Boolean < DateTime < MaxValue`).

use super::{Array, Decimal128, Document, Value};
use crate::utils::Collation;
use std::cmp::Ordering;

impl Value {
    /// The type-group rank from the table above; values in the same group
    /// compare by the rules in `compare_to`, values in different groups
    /// compare by rank alone.
    fn type_rank(&self) -> u8 {
        match self {
            Value::MinValue => 0,
            Value::Null => 1,
            Value::Int32(_) | Value::Int64(_) | Value::Double(_) | Value::Decimal(_) => 2,
            Value::String(_) => 3,
            Value::Document(_) => 4,
            Value::Array(_) => 5,
            Value::Binary(_) => 6,
            Value::ObjectId(_) => 7,
            Value::Guid(_) => 8,
            Value::Boolean(_) => 9,
            Value::DateTime(_) => 10,
            Value::MaxValue => 11,
        }
    }

    /// Bit-exact index-key comparator (§4.6). `collation` only affects
    /// string-to-string comparisons; every other type group has a single,
    /// collation-independent ordering.
    pub(crate) fn compare_to(&self, other: &Value, collation: &Collation) -> Ordering {
        let by_rank = self.type_rank().cmp(&other.type_rank());
        if by_rank != Ordering::Equal {
            return by_rank;
        }

        match (self, other) {
            (Value::MinValue, Value::MinValue) => Ordering::Equal,
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::MaxValue, Value::MaxValue) => Ordering::Equal,
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::DateTime(a), Value::DateTime(b)) => {
                a.as_unix_milliseconds().cmp(&b.as_unix_milliseconds())
            }
            (Value::ObjectId(a), Value::ObjectId(b)) => a.as_bytes().cmp(b.as_bytes()),
            (Value::Guid(a), Value::Guid(b)) => a.cmp(b),
            (Value::Binary(a), Value::Binary(b)) => a.bytes().cmp(b.bytes()),
            (Value::String(a), Value::String(b)) => collation.compare_str(a, b),
            (Value::Document(a), Value::Document(b)) => compare_documents(a, b, collation),
            (Value::Array(a), Value::Array(b)) => compare_arrays(a, b, collation),
            // Everything left in the "numeric" rank group (Int32/Int64/Double/Decimal).
            _ => compare_numeric(self, other),
        }
    }
}

fn to_decimal(v: &Value) -> Decimal128 {
    match *v {
        Value::Int32(x) => Decimal128::from(x),
        Value::Int64(x) => Decimal128::from(x),
        // NaN/overflow have no total order in Decimal128; treat them as 0
        // rather than panicking since index comparisons must never fail.
        Value::Double(x) => Decimal128::try_from(x).unwrap_or(Decimal128::from(0i32)),
        Value::Decimal(d) => d,
        _ => unreachable!("compare_numeric called with a non-numeric value"),
    }
}

fn compare_numeric(a: &Value, b: &Value) -> Ordering {
    to_decimal(a).cmp(&to_decimal(b))
}

/// Field-by-field in insertion order until a difference; a shorter document
/// that is a prefix of a longer one sorts first.
fn compare_documents(a: &Document, b: &Document, collation: &Collation) -> Ordering {
    let mut ai = a.iter();
    let mut bi = b.iter();
    loop {
        return match (ai.next(), bi.next()) {
            (Some((_, av)), Some((_, bv))) => match av.compare_to(bv, collation) {
                Ordering::Equal => continue,
                other => other,
            },
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
        };
    }
}

/// Element-by-element until a difference; shorter-prefix arrays sort first.
fn compare_arrays(a: &Array, b: &Array, collation: &Collation) -> Ordering {
    let mut ai = a.iter();
    let mut bi = b.iter();
    loop {
        return match (ai.next(), bi.next()) {
            (Some(av), Some(bv)) => match av.compare_to(bv, collation) {
                Ordering::Equal => continue,
                other => other,
            },
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::Collation;

    fn c() -> Collation {
        Collation::default()
    }

    #[test]
    fn orders_type_groups() {
        assert_eq!(Value::MinValue.compare_to(&Value::Null, &c()), Ordering::Less);
        assert_eq!(
            Value::Int32(1).compare_to(&Value::String("a".into()), &c()),
            Ordering::Less
        );
        assert_eq!(
            Value::Boolean(true).compare_to(&Value::MaxValue, &c()),
            Ordering::Less
        );
    }

    #[test]
    fn promotes_numerics_across_representations() {
        assert_eq!(
            Value::Int32(5).compare_to(&Value::Double(5.0), &c()),
            Ordering::Equal
        );
        assert_eq!(
            Value::Int64(3).compare_to(&Value::Int32(4), &c()),
            Ordering::Less
        );
    }

    #[test]
    fn strings_compare_case_insensitively_by_default() {
        assert_eq!(
            Value::String("abc".into()).compare_to(&Value::String("ABC".into()), &c()),
            Ordering::Equal
        );
    }

    #[test]
    fn arrays_compare_elementwise_then_by_length() {
        let short = Value::Array(Array::from([Value::Int32(1)].as_slice()));
        let long = Value::Array(Array::from([Value::Int32(1), Value::Int32(2)].as_slice()));
        assert_eq!(short.compare_to(&long, &c()), Ordering::Less);
    }
}
