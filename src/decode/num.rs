use serde_json::Value;

use crate::error::Reject;
use crate::ir::JsonKind;

pub(super) fn decode_integer(min: Option<i64>, max: Option<i64>, value: &Value) -> Result<Value, Reject> {
    let Value::Number(n) = value else {
        return Err(Reject::mismatch("integer", JsonKind::of(value)));
    };
    // i128 covers the whole u64 range without a second code path
    let x = match n.as_i64().map(i128::from).or_else(|| n.as_u64().map(i128::from)) {
        Some(x) => x,
        None => return Err(Reject::mismatch("integer", JsonKind::Number)),
    };
    if let Some(min) = min {
        if x < i128::from(min) {
            return Err(Reject::custom(format!("{x} is below minimum {min}")));
        }
    }
    if let Some(max) = max {
        if x > i128::from(max) {
            return Err(Reject::custom(format!("{x} is above maximum {max}")));
        }
    }
    Ok(value.clone())
}

pub(super) fn decode_number(min: Option<f64>, max: Option<f64>, value: &Value) -> Result<Value, Reject> {
    let x = match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        other => return Err(Reject::mismatch("number", JsonKind::of(other))),
    };
    if let Some(min) = min {
        if x < min {
            return Err(Reject::custom(format!("{value} is below minimum {min}")));
        }
    }
    if let Some(max) = max {
        if x > max {
            return Err(Reject::custom(format!("{value} is above maximum {max}")));
        }
    }
    Ok(value.clone())
}
