use serde_json::{Map, Value};

use super::decode_value;
use crate::error::Reject;
use crate::ir::{Field, JsonKind};

/// Nested objects inside a field. Same presence rules as top-level fields, but
/// the first failure rejects the whole containing value.
pub(super) fn decode_object(fields: &[Field], value: &Value) -> Result<Value, Reject> {
    let Value::Object(map) = value else {
        return Err(Reject::mismatch("object", JsonKind::of(value)));
    };
    let mut out = Map::with_capacity(fields.len());
    for field in fields {
        match map.get(&field.name) {
            None | Some(Value::Null) if field.required => {
                return Err(Reject::custom("missing required key").at(&field.name));
            }
            None => {}
            Some(Value::Null) => {
                out.insert(field.name.clone(), Value::Null);
            }
            Some(raw) => {
                let v = decode_value(&field.ty, raw).map_err(|r| r.at(&field.name))?;
                out.insert(field.name.clone(), v);
            }
        }
    }
    Ok(Value::Object(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Ty;
    use serde_json::json;

    fn geo() -> Vec<Field> {
        vec![
            Field { name: "lat".into(), ty: Ty::number(), required: true },
            Field { name: "lng".into(), ty: Ty::number(), required: true },
            Field { name: "label".into(), ty: Ty::string(), required: false },
        ]
    }

    #[test]
    fn drops_undeclared_keys() {
        let v = json!({"lat": 37.42, "lng": -122.08, "zoom": 4});
        assert_eq!(decode_object(&geo(), &v), Ok(json!({"lat": 37.42, "lng": -122.08})));
    }

    #[test]
    fn keeps_explicit_null_for_optional() {
        let v = json!({"lat": 1, "lng": 2, "label": null});
        assert_eq!(decode_object(&geo(), &v), Ok(json!({"lat": 1, "lng": 2, "label": null})));
    }

    #[test]
    fn nested_required_key_is_reported_with_path() {
        let v = json!({"lat": 37.42});
        assert_eq!(
            decode_object(&geo(), &v),
            Err(Reject::Custom { path: "/lng".into(), message: "missing required key".into() })
        );
        let v = json!({"lat": 37.42, "lng": null});
        assert!(decode_object(&geo(), &v).is_err());
    }

    #[test]
    fn nested_mismatch_carries_key() {
        let v = json!({"lat": "37.42", "lng": 1});
        assert_eq!(
            decode_object(&geo(), &v),
            Err(Reject::Mismatch { path: "/lat".into(), expected: "number".into(), found: JsonKind::String })
        );
    }
}
