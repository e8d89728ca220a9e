//! Value-level decoding of the declarative [`Ty`] IR.
//!
//! `decode_value` is total: every outcome is either the normalized value or a
//! [`Reject`] describing where and why the value does not fit. Tying a reject
//! to a field name happens one level up, in [`crate::field`].
//!
//! - Scalars are returned unchanged once they pass their checks.
//! - Objects keep only declared keys (extra keys are dropped, never errors).
//! - Arrays and objects report the first failing element, with its location.
pub mod string;
pub mod num;
pub mod arr;
pub mod obj;

use serde_json::Value;

use crate::error::Reject;
use crate::ir::{JsonKind, Ty};

pub fn decode_value(ty: &Ty, value: &Value) -> Result<Value, Reject> {
    match ty {
        Ty::Any => Ok(value.clone()),
        Ty::Null => match value {
            Value::Null => Ok(Value::Null),
            other => Err(Reject::mismatch("null", JsonKind::of(other))),
        },
        Ty::Bool => match value {
            Value::Bool(b) => Ok(Value::Bool(*b)),
            other => Err(Reject::mismatch("boolean", JsonKind::of(other))),
        },
        Ty::Integer { min, max } => num::decode_integer(*min, *max, value),
        Ty::Number { min, max } => num::decode_number(*min, *max, value),
        Ty::String { enum_, pattern, format } => {
            string::decode_string(enum_, pattern.as_ref(), *format, value)
        }
        Ty::ArrayList { item, min_items, max_items } => {
            arr::decode_list(item, *min_items, *max_items, value)
        }
        Ty::ArrayTuple { elems, min_items, max_items } => {
            arr::decode_tuple(elems, *min_items, *max_items, value)
        }
        Ty::Object { fields } => obj::decode_object(fields, value),
        Ty::OneOf(arms) => decode_one_of(ty, arms, value),
        Ty::Nullable(inner) => match value {
            Value::Null => Ok(Value::Null),
            other => decode_value(inner, other),
        },
    }
}

fn decode_one_of(ty: &Ty, arms: &[Ty], value: &Value) -> Result<Value, Reject> {
    for arm in arms {
        if let Ok(v) = decode_value(arm, value) {
            return Ok(v);
        }
    }
    Err(Reject::mismatch(ty.describe(), JsonKind::of(value)))
}
