//! Record Assembler, Failure Report and the typed projection.
//!
//! A [`RecordSpec`] is built once and shared read-only. Every decode call
//! returns a fresh [`DecodedRecord`] holding exactly one entry per declared
//! field, in declaration order, plus a [`FailureReport`] derived from it.
//! Field failures never abort the walk; only a raw value that is not an
//! object (or, for text input, is not JSON) fails the whole call.
use std::collections::HashSet;

use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{AccessError, DecodeError, RecordError, SchemaError};
use crate::field::{DecodedField, FieldSpec, decode_field};
use crate::ir::JsonKind;
use crate::path_de;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone)]
pub struct RecordSpec {
    fields: Vec<FieldSpec>,
}

pub type FieldOutcome = DecodedField<Option<Value>>;

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRecord {
    fields: IndexMap<String, FieldOutcome>,
    report: FailureReport,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    pub field: String,
    pub required: bool,
    pub error: DecodeError,
}

/// Failed fields, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FailureReport(Vec<Failure>);

/// Caller-side accept/reject rules. The assembler itself never applies one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Policy {
    /// accept only records with an empty report
    #[default]
    Strict,
    /// accept while every failure is on an optional field
    RequiredOnly,
    Lenient,
}

/// What `encode` writes for failed and absent fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EncodeMode {
    #[default]
    Omit,
    Null,
}

// ————————————————————————————————————————————————————————————————————————————
// RECORD SPEC
// ————————————————————————————————————————————————————————————————————————————

impl RecordSpec {
    pub fn new(fields: Vec<FieldSpec>) -> Result<Self, SchemaError> {
        let mut seen = HashSet::with_capacity(fields.len());
        for field in &fields {
            if !seen.insert(field.name()) {
                return Err(SchemaError::DuplicateField { name: field.name().to_string() });
            }
        }
        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn decode(&self, raw: &Value) -> Result<DecodedRecord, RecordError> {
        decode_record(self, raw)
    }

    /// Parse JSON text, then decode. Syntax errors are their own stage.
    pub fn decode_str(&self, src: &str) -> Result<DecodedRecord, RecordError> {
        let raw: Value = path_de::from_str_with_path(src)
            .map_err(|e| RecordError::Syntax { path: e.path, source: e.source })?;
        decode_record(self, &raw)
    }

    pub fn decode_slice(&self, bytes: &[u8]) -> Result<DecodedRecord, RecordError> {
        let raw: Value = path_de::from_slice_with_path(bytes)
            .map_err(|e| RecordError::Syntax { path: e.path, source: e.source })?;
        decode_record(self, &raw)
    }

    /// Decode a batch in parallel; results keep input order.
    pub fn decode_many(&self, raws: &[Value]) -> Vec<Result<DecodedRecord, RecordError>> {
        raws.par_iter().map(|raw| decode_record(self, raw)).collect()
    }
}

// ————————————————————————————————————————————————————————————————————————————
// ASSEMBLER
// ————————————————————————————————————————————————————————————————————————————

pub fn decode_record(spec: &RecordSpec, raw: &Value) -> Result<DecodedRecord, RecordError> {
    let Value::Object(map) = raw else {
        let found = JsonKind::of(raw);
        tracing::warn!(%found, "record is not an object");
        return Err(RecordError::NotAnObject { found });
    };
    Ok(assemble(spec, map))
}

fn assemble(spec: &RecordSpec, map: &Map<String, Value>) -> DecodedRecord {
    let mut fields = IndexMap::with_capacity(spec.fields.len());
    for field_spec in &spec.fields {
        fields.insert(field_spec.name().to_string(), decode_field(field_spec, map));
    }

    let report = FailureReport(
        spec.fields
            .iter()
            .zip(fields.values())
            .filter_map(|(field_spec, outcome)| {
                outcome.error().map(|error| Failure {
                    field: field_spec.name().to_string(),
                    required: field_spec.is_required(),
                    error: error.clone(),
                })
            })
            .collect(),
    );
    for failure in report.iter() {
        tracing::debug!(field = %failure.field, error = %failure.error, "field failed to decode");
    }
    if !report.is_empty() {
        tracing::debug!(failed = report.len(), declared = fields.len(), "record decoded with failures");
    }

    DecodedRecord { fields, report }
}

// ————————————————————————————————————————————————————————————————————————————
// DECODED RECORD
// ————————————————————————————————————————————————————————————————————————————

impl DecodedRecord {
    pub fn report(&self) -> &FailureReport {
        &self.report
    }

    pub fn is_complete(&self) -> bool {
        self.report.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&FieldOutcome> {
        self.fields.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldOutcome)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Typed projection of one field.
    ///
    /// An absent optional field projects through `null`, so `Option<_>`
    /// targets get `None` and anything else gets [`AccessError::Absent`].
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<T, AccessError> {
        let outcome = self
            .fields
            .get(name)
            .ok_or_else(|| AccessError::Undeclared { field: name.to_string() })?;
        match outcome {
            DecodedField::Failed(e) => Err(AccessError::Failed {
                field: name.to_string(),
                source: e.clone(),
            }),
            DecodedField::Value(None) => serde_json::from_value(Value::Null)
                .map_err(|_| AccessError::Absent { field: name.to_string() }),
            DecodedField::Value(Some(v)) => serde_json::from_value(v.clone()).map_err(|source| {
                AccessError::Projection { field: name.to_string(), source }
            }),
        }
    }

    /// Like [`get`](Self::get), but an undeclared name is a bug in the caller
    /// and panics instead of being returned as data.
    pub fn require<T: DeserializeOwned>(&self, name: &str) -> Result<T, AccessError> {
        match self.get(name) {
            Err(e) if e.is_programmer_error() => panic!("{e}"),
            other => other,
        }
    }

    /// Present values back into a JSON object, in declaration order.
    pub fn encode(&self, mode: EncodeMode) -> Value {
        let mut out = Map::with_capacity(self.fields.len());
        for (name, outcome) in &self.fields {
            match (outcome, mode) {
                (DecodedField::Value(Some(v)), _) => {
                    out.insert(name.clone(), v.clone());
                }
                (_, EncodeMode::Null) => {
                    out.insert(name.clone(), Value::Null);
                }
                (_, EncodeMode::Omit) => {}
            }
        }
        Value::Object(out)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// FAILURE REPORT & POLICY
// ————————————————————————————————————————————————————————————————————————————

impl FailureReport {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Failure> {
        self.0.iter()
    }

    pub fn has_required_failures(&self) -> bool {
        self.0.iter().any(|f| f.required)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|f| f.field.as_str())
    }
}

impl<'a> IntoIterator for &'a FailureReport {
    type Item = &'a Failure;
    type IntoIter = std::slice::Iter<'a, Failure>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Policy {
    pub fn accepts(self, record: &DecodedRecord) -> bool {
        match self {
            Policy::Strict => record.report.is_empty(),
            Policy::RequiredOnly => !record.report.has_required_failures(),
            Policy::Lenient => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Ty;
    use serde_json::json;

    fn person() -> RecordSpec {
        RecordSpec::new(vec![
            FieldSpec::required("name", Ty::string()),
            FieldSpec::required("age", Ty::integer()),
            FieldSpec::optional("email", Ty::string()),
        ])
        .unwrap()
    }

    #[test]
    fn isolates_type_mismatch_to_its_field() {
        let rec = person().decode(&json!({"name": "garric", "age": "33"})).unwrap();
        assert_eq!(rec.field("name"), Some(&DecodedField::Value(Some(json!("garric")))));
        assert_eq!(
            rec.field("age"),
            Some(&DecodedField::Failed(DecodeError::TypeMismatch {
                field: "age".into(),
                path: String::new(),
                expected: "integer".into(),
                found: JsonKind::String,
            }))
        );
        assert_eq!(rec.field("email"), Some(&DecodedField::Value(None)));
        assert_eq!(rec.report().fields().collect::<Vec<_>>(), vec!["age"]);
        assert_eq!(rec.len(), 3);
    }

    #[test]
    fn non_object_records_fail_whole() {
        let err = person().decode(&json!(["garric", 33])).unwrap_err();
        assert!(matches!(err, RecordError::NotAnObject { found: JsonKind::Array }));
    }

    #[test]
    fn duplicate_fields_are_rejected() {
        let err = RecordSpec::new(vec![
            FieldSpec::required("id", Ty::string()),
            FieldSpec::optional("id", Ty::integer()),
        ])
        .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateField { name } if name == "id"));
    }

    #[test]
    fn report_follows_declaration_order() {
        let rec = person().decode(&json!({"email": 5, "age": null})).unwrap();
        let kinds: Vec<_> = rec.report().iter().map(|f| (f.field.as_str(), f.error.kind())).collect();
        assert_eq!(
            kinds,
            vec![("name", "key_missing"), ("age", "null_for_required"), ("email", "type_mismatch")]
        );
    }

    #[test]
    fn projection() {
        let rec = person().decode(&json!({"name": "garric", "age": "33"})).unwrap();
        assert_eq!(rec.get::<String>("name").unwrap(), "garric");
        assert_eq!(rec.get::<Option<String>>("email").unwrap(), None);
        assert!(matches!(rec.get::<String>("email"), Err(AccessError::Absent { .. })));
        assert!(matches!(rec.get::<i64>("age"), Err(AccessError::Failed { .. })));
        assert!(matches!(rec.get::<u8>("name"), Err(AccessError::Projection { .. })));
        let err = rec.get::<String>("nickname").unwrap_err();
        assert!(err.is_programmer_error());
    }

    #[test]
    #[should_panic(expected = "not declared")]
    fn require_panics_on_undeclared_name() {
        let rec = person().decode(&json!({"name": "garric", "age": 33})).unwrap();
        let _ = rec.require::<String>("nickname");
    }

    #[test]
    fn policies() {
        let spec = person();
        let clean = spec.decode(&json!({"name": "a", "age": 1})).unwrap();
        let optional_bad = spec.decode(&json!({"name": "a", "age": 1, "email": 1})).unwrap();
        let required_bad = spec.decode(&json!({"name": "a"})).unwrap();

        assert!(Policy::Strict.accepts(&clean));
        assert!(!Policy::Strict.accepts(&optional_bad));
        assert!(Policy::RequiredOnly.accepts(&optional_bad));
        assert!(!Policy::RequiredOnly.accepts(&required_bad));
        assert!(Policy::Lenient.accepts(&required_bad));
    }

    #[test]
    fn encode_modes() {
        let rec = person().decode(&json!({"name": "a", "age": "x"})).unwrap();
        assert_eq!(rec.encode(EncodeMode::Omit), json!({"name": "a"}));
        assert_eq!(rec.encode(EncodeMode::Null), json!({"name": "a", "age": null, "email": null}));
    }

    #[test]
    fn text_input_stages() {
        let spec = person();
        let err = spec.decode_str(r#"{"name": "a", "age": }"#).unwrap_err();
        assert!(matches!(err, RecordError::Syntax { .. }));
        let rec = spec.decode_slice(br#"{"name": "a", "age": 2}"#).unwrap();
        assert!(rec.is_complete());
    }

    #[test]
    fn decode_many_keeps_order() {
        let raws = vec![json!({"name": "a", "age": 1}), json!(3), json!({"name": "c"})];
        let out = person().decode_many(&raws);
        assert!(out[0].as_ref().unwrap().is_complete());
        assert!(out[1].is_err());
        assert_eq!(out[2].as_ref().unwrap().report().len(), 1);
    }
}
