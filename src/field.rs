//! Field Decoder: one declared field against one raw object.
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::decode::decode_value;
use crate::error::{DecodeError, Reject};
use crate::ir::Ty;

pub type DecodeFn = dyn Fn(&Value) -> Result<Value, Reject> + Send + Sync;
pub type ValidateFn = dyn Fn(&Value) -> Result<(), String> + Send + Sync;

/// How a present, non-null raw value is turned into a decoded value.
#[derive(Clone)]
pub enum Decoder {
    Typed(Ty),
    Custom(Arc<DecodeFn>),
}

impl Decoder {
    fn run(&self, value: &Value) -> Result<Value, Reject> {
        match self {
            Decoder::Typed(ty) => decode_value(ty, value),
            Decoder::Custom(f) => f(value),
        }
    }
}

impl fmt::Debug for Decoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decoder::Typed(ty) => f.debug_tuple("Typed").field(ty).finish(),
            Decoder::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// One declared field of a record type.
#[derive(Clone)]
pub struct FieldSpec {
    name: String,
    required: bool,
    decoder: Decoder,
    validators: Vec<Arc<ValidateFn>>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, required: bool, decoder: Decoder) -> Self {
        Self { name: name.into(), required, decoder, validators: Vec::new() }
    }

    pub fn required(name: impl Into<String>, ty: Ty) -> Self {
        Self::new(name, true, Decoder::Typed(ty))
    }

    pub fn optional(name: impl Into<String>, ty: Ty) -> Self {
        Self::new(name, false, Decoder::Typed(ty))
    }

    pub fn custom<F>(name: impl Into<String>, required: bool, decode: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, Reject> + Send + Sync + 'static,
    {
        Self::new(name, required, Decoder::Custom(Arc::new(decode)))
    }

    /// Extra check run after the decoder succeeds; an `Err` message becomes
    /// [`DecodeError::Custom`].
    pub fn validate<F>(mut self, check: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validators.push(Arc::new(check));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("required", &self.required)
            .field("decoder", &self.decoder)
            .field("validators", &self.validators.len())
            .finish()
    }
}

/// Outcome of decoding a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedField<T> {
    Value(T),
    Failed(DecodeError),
}

impl<T> DecodedField<T> {
    pub fn is_failed(&self) -> bool {
        matches!(self, DecodedField::Failed(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            DecodedField::Value(v) => Some(v),
            DecodedField::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&DecodeError> {
        match self {
            DecodedField::Value(_) => None,
            DecodedField::Failed(e) => Some(e),
        }
    }

    pub fn into_result(self) -> Result<T, DecodeError> {
        match self {
            DecodedField::Value(v) => Ok(v),
            DecodedField::Failed(e) => Err(e),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> DecodedField<U> {
        match self {
            DecodedField::Value(v) => DecodedField::Value(f(v)),
            DecodedField::Failed(e) => DecodedField::Failed(e),
        }
    }
}

impl<T> From<Result<T, DecodeError>> for DecodedField<T> {
    fn from(result: Result<T, DecodeError>) -> Self {
        match result {
            Ok(v) => DecodedField::Value(v),
            Err(e) => DecodedField::Failed(e),
        }
    }
}

/// Decode `spec` out of `raw`. Total: every failure is a `Failed` value.
pub fn decode_field(spec: &FieldSpec, raw: &Map<String, Value>) -> DecodedField<Option<Value>> {
    let value = match raw.get(&spec.name) {
        None if spec.required => {
            return DecodedField::Failed(DecodeError::KeyMissing { field: spec.name.clone() });
        }
        Some(Value::Null) if spec.required => {
            return DecodedField::Failed(DecodeError::NullForRequired { field: spec.name.clone() });
        }
        None | Some(Value::Null) => return DecodedField::Value(None),
        Some(value) => value,
    };
    run_decoder(spec, value).map(Some).into()
}

fn run_decoder(spec: &FieldSpec, value: &Value) -> Result<Value, DecodeError> {
    let decoded = spec
        .decoder
        .run(value)
        .map_err(|r| r.into_decode_error(&spec.name))?;
    for check in &spec.validators {
        check(&decoded).map_err(|message| DecodeError::Custom {
            field: spec.name.clone(),
            path: String::new(),
            message,
        })?;
    }
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::JsonKind;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    #[test]
    fn absent_required_is_key_missing() {
        let spec = FieldSpec::required("name", Ty::string());
        assert_eq!(
            decode_field(&spec, &obj(json!({}))),
            DecodedField::Failed(DecodeError::KeyMissing { field: "name".into() })
        );
    }

    #[test]
    fn null_required_is_null_for_required() {
        let spec = FieldSpec::required("name", Ty::string());
        assert_eq!(
            decode_field(&spec, &obj(json!({"name": null}))),
            DecodedField::Failed(DecodeError::NullForRequired { field: "name".into() })
        );
    }

    #[test]
    fn optional_absent_or_null_is_none() {
        let spec = FieldSpec::optional("url", Ty::string());
        assert_eq!(decode_field(&spec, &obj(json!({}))), DecodedField::Value(None));
        assert_eq!(decode_field(&spec, &obj(json!({"url": null}))), DecodedField::Value(None));
    }

    #[test]
    fn optional_wrong_type_still_fails() {
        let spec = FieldSpec::optional("rating", Ty::number());
        assert_eq!(
            decode_field(&spec, &obj(json!({"rating": "4.5"}))),
            DecodedField::Failed(DecodeError::TypeMismatch {
                field: "rating".into(),
                path: String::new(),
                expected: "number".into(),
                found: JsonKind::String,
            })
        );
    }

    #[test]
    fn custom_decoder_and_validator() {
        let spec = FieldSpec::custom("age", true, |v| match v.as_str() {
            Some(s) => s.parse::<i64>().map(Value::from).map_err(|e| Reject::custom(e.to_string())),
            None => Ok(v.clone()),
        })
        .validate(|v| match v.as_i64() {
            Some(n) if n >= 0 => Ok(()),
            _ => Err("age must be a non-negative integer".to_string()),
        });

        assert_eq!(decode_field(&spec, &obj(json!({"age": "33"}))), DecodedField::Value(Some(json!(33))));
        assert_eq!(
            decode_field(&spec, &obj(json!({"age": -1}))).error().map(DecodeError::kind),
            Some("custom")
        );
        assert_eq!(
            decode_field(&spec, &obj(json!({"age": "x"}))).error().map(DecodeError::kind),
            Some("custom")
        );
    }

    #[test]
    fn decoded_field_helpers() {
        let ok: DecodedField<i32> = Ok(3).into();
        assert_eq!(ok.clone().map(|x| x * 2).into_result(), Ok(6));
        assert!(!ok.is_failed());
        let failed: DecodedField<i32> = Err(DecodeError::KeyMissing { field: "x".into() }).into();
        assert!(failed.is_failed());
        assert_eq!(failed.value(), None);
    }
}
