use indexmap::IndexMap;
use serde_json::{Map, Value};

/// One object from an export entity. Normally holds a single key.
pub type Fragment = Map<String, Value>;

/// Ordered fragments describing one row before normalization.
pub type Entity = Vec<Fragment>;

/// Flat row keyed by column name, in first-seen key order.
pub type Record = IndexMap<String, Value>;

/// Whole-valued floats are rewritten as integers when this is `Coerce`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WholeFloats {
    Coerce,
    Keep,
}

/// Merge an entity's fragments into one record.
///
/// Later fragments overwrite earlier ones for the same key; the key keeps the
/// position where it first appeared.
pub fn normalize_entity(fragments: &[Fragment], floats: WholeFloats) -> Record {
    let mut merged = Record::with_capacity(fragments.len());
    for fragment in fragments {
        for (key, value) in fragment {
            merged.insert(key.clone(), value.clone());
        }
    }
    if floats == WholeFloats::Coerce {
        for value in merged.values_mut() {
            if let Some(int) = whole_float_as_i64(value) {
                *value = Value::from(int);
            }
        }
    }
    merged
}

/// `Some(n)` when `value` is a float like `12.0` that fits in an i64.
fn whole_float_as_i64(value: &Value) -> Option<i64> {
    let Value::Number(num) = value else {
        return None;
    };
    if !num.is_f64() {
        return None;
    }
    let f = num.as_f64()?;
    // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive.
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}
