use serde_json::Value;

use super::decode_value;
use crate::error::Reject;
use crate::ir::{JsonKind, Ty};

pub(super) fn decode_list(
    item: &Ty,
    min_items: Option<u32>,
    max_items: Option<u32>,
    value: &Value,
) -> Result<Value, Reject> {
    let Value::Array(xs) = value else {
        return Err(Reject::mismatch("array", JsonKind::of(value)));
    };
    check_len(xs.len(), min_items, max_items)?;
    let out = xs
        .iter()
        .enumerate()
        .map(|(i, el)| decode_value(item, el).map_err(|r| r.at(i)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::Array(out))
}

pub(super) fn decode_tuple(
    elems: &[Ty],
    min_items: u32,
    max_items: u32,
    value: &Value,
) -> Result<Value, Reject> {
    let Value::Array(xs) = value else {
        return Err(Reject::mismatch("array", JsonKind::of(value)));
    };
    // positions past the declared elements have no decoder
    let max_items = max_items.min(elems.len() as u32);
    check_len(xs.len(), Some(min_items), Some(max_items))?;
    let out = xs
        .iter()
        .zip(elems)
        .enumerate()
        .map(|(i, (el, ty))| decode_value(ty, el).map_err(|r| r.at(i)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::Array(out))
}

fn check_len(len: usize, min_items: Option<u32>, max_items: Option<u32>) -> Result<(), Reject> {
    if let Some(min) = min_items {
        if len < min as usize {
            return Err(Reject::custom(format!("expected at least {min} items, found {len}")));
        }
    }
    if let Some(max) = max_items {
        if len > max as usize {
            return Err(Reject::custom(format!("expected at most {max} items, found {len}")));
        }
    }
    Ok(())
}
