//! Record-level behavior of the resilient decoder, end to end.

use json_failable::{
    DecodeError, DecodedField, EncodeMode, FieldSpec, JsonKind, Policy, RecordSpec, Ty,
};
use once_cell::sync::Lazy;
use serde_json::{Value, json};

static PLACE: Lazy<RecordSpec> = Lazy::new(|| {
    RecordSpec::new(vec![
        FieldSpec::required("id", Ty::string()),
        FieldSpec::optional("name", Ty::string()),
        FieldSpec::optional("rating", Ty::Number { min: Some(0.0), max: Some(5.0) }),
        FieldSpec::optional("open", Ty::Bool),
        FieldSpec::required("tags", Ty::list_of(Ty::string())),
        FieldSpec::optional(
            "geo",
            Ty::Object {
                fields: vec![
                    json_failable::Field { name: "lat".into(), ty: Ty::number(), required: true },
                    json_failable::Field { name: "lng".into(), ty: Ty::number(), required: true },
                ],
            },
        ),
    ])
    .unwrap()
});

fn full_place() -> Value {
    json!({
        "id": "0ahUKEa1ZQ",
        "name": "Acme Widgets",
        "rating": 4.3,
        "open": true,
        "tags": ["hardware", "store"],
        "geo": { "lat": 37.4219, "lng": -122.0840 }
    })
}

#[test]
fn exact_input_decodes_without_failures() {
    let raw = full_place();
    let rec = PLACE.decode(&raw).unwrap();
    assert!(rec.report().is_empty());
    for (name, outcome) in rec.iter() {
        assert_eq!(outcome, &DecodedField::Value(Some(raw[name].clone())), "field {name}");
    }
}

#[test]
fn optional_absent_or_null_is_none_and_unreported() {
    let absent = json!({ "id": "a", "tags": [] });
    let nulled = json!({ "id": "a", "tags": [], "name": null, "rating": null, "open": null, "geo": null });
    for raw in [absent, nulled] {
        let rec = PLACE.decode(&raw).unwrap();
        for name in ["name", "rating", "open", "geo"] {
            assert_eq!(rec.field(name), Some(&DecodedField::Value(None)));
        }
        assert!(rec.report().is_empty());
    }
}

#[test]
fn missing_required_still_assembles_every_field() {
    let rec = PLACE.decode(&json!({ "name": "Acme" })).unwrap();
    assert_eq!(rec.len(), PLACE.fields().len());
    let report: Vec<_> = rec.report().iter().map(|f| f.error.clone()).collect();
    assert_eq!(
        report,
        vec![
            DecodeError::KeyMissing { field: "id".into() },
            DecodeError::KeyMissing { field: "tags".into() },
        ]
    );
    assert_eq!(rec.get::<String>("name").unwrap(), "Acme");
}

#[test]
fn extra_keys_are_ignored() {
    let mut noisy = full_place();
    noisy["zoom"] = json!(12);
    noisy["geo"]["alt"] = json!("high");
    noisy["padding"] = json!([null, null]);
    assert_eq!(PLACE.decode(&noisy).unwrap(), PLACE.decode(&full_place()).unwrap());

    let mut broken = json!({ "id": 1, "tags": [] });
    let before = PLACE.decode(&broken).unwrap();
    broken["unknown"] = json!({ "deep": true });
    assert_eq!(PLACE.decode(&broken).unwrap(), before);
}

#[test]
fn one_bad_field_never_blocks_another() {
    let spec = RecordSpec::new(vec![
        FieldSpec::required("name", Ty::string()),
        FieldSpec::required("age", Ty::integer()),
    ])
    .unwrap();
    let rec = spec.decode(&json!({ "name": "garric", "age": "33" })).unwrap();

    assert_eq!(rec.field("name"), Some(&DecodedField::Value(Some(json!("garric")))));
    let age_error = DecodeError::TypeMismatch {
        field: "age".into(),
        path: String::new(),
        expected: "integer".into(),
        found: JsonKind::String,
    };
    assert_eq!(rec.field("age"), Some(&DecodedField::Failed(age_error.clone())));
    let report: Vec<_> = rec.report().iter().map(|f| (f.field.as_str(), f.error.clone())).collect();
    assert_eq!(report, vec![("age", age_error)]);
}

#[test]
fn nested_failure_stays_inside_its_field() {
    let mut raw = full_place();
    raw["geo"] = json!({ "lat": "north", "lng": 1 });
    raw["rating"] = json!(9);
    let rec = PLACE.decode(&raw).unwrap();

    let failed: Vec<_> = rec.report().iter().map(|f| (f.field.as_str(), f.required)).collect();
    assert_eq!(failed, vec![("rating", false), ("geo", false)]);
    assert!(matches!(
        rec.field("geo"),
        Some(DecodedField::Failed(DecodeError::TypeMismatch { path, .. })) if path == "/lat"
    ));
    assert!(Policy::RequiredOnly.accepts(&rec));
    assert!(!Policy::Strict.accepts(&rec));
    assert_eq!(rec.get::<Vec<String>>("tags").unwrap(), vec!["hardware", "store"]);
}

#[test]
fn encode_then_decode_is_idempotent() {
    for raw in [full_place(), json!({ "id": "b", "tags": ["x"], "open": null, "extra": 1 })] {
        let rec = PLACE.decode(&raw).unwrap();
        assert!(rec.is_complete());
        for mode in [EncodeMode::Omit, EncodeMode::Null] {
            let again = PLACE.decode(&rec.encode(mode)).unwrap();
            assert_eq!(again, rec);
        }
    }
}

#[test]
fn specs_are_shared_across_threads() {
    let raws: Vec<Value> = (0..64)
        .map(|i| if i % 2 == 0 { full_place() } else { json!({ "id": i, "tags": "x" }) })
        .collect();

    let handles: Vec<_> = raws
        .chunks(16)
        .map(|chunk| {
            let chunk = chunk.to_vec();
            std::thread::spawn(move || {
                chunk.iter().map(|raw| PLACE.decode(raw).unwrap().report().len()).collect::<Vec<_>>()
            })
        })
        .collect();
    let counts: Vec<usize> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();

    let expected: Vec<usize> = (0..64).map(|i| if i % 2 == 0 { 0 } else { 2 }).collect();
    assert_eq!(counts, expected);
    assert_eq!(
        PLACE.decode_many(&raws).iter().map(|r| r.as_ref().unwrap().report().len()).collect::<Vec<_>>(),
        expected
    );
}
