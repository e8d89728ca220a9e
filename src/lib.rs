//! Resilient record decoding for semi-structured JSON.
//!
//! Each declared field is decoded on its own, so one bad field never throws
//! away the rest of a record:
//!
//! ```
//! use json_failable::{FieldSpec, RecordSpec, Ty};
//! use serde_json::json;
//!
//! let spec = RecordSpec::new(vec![
//!     FieldSpec::required("name", Ty::string()),
//!     FieldSpec::required("age", Ty::integer()),
//! ]).unwrap();
//!
//! let rec = spec.decode(&json!({ "name": "garric", "age": "33" })).unwrap();
//! assert_eq!(rec.get::<String>("name").unwrap(), "garric");
//! assert_eq!(rec.report().fields().collect::<Vec<_>>(), vec!["age"]);
//! ```
pub mod decode;
pub mod error;
pub mod field;
pub mod ir;
pub mod jq_exec;
pub mod path_de;
pub mod record;
pub mod schema;

pub use error::{AccessError, DecodeError, RecordError, Reject, SchemaError};
pub use field::{DecodedField, Decoder, FieldSpec, decode_field};
pub use ir::{Field, JsonKind, StrFormat, Ty};
pub use record::{
    DecodedRecord, EncodeMode, Failure, FailureReport, FieldOutcome, Policy, RecordSpec, decode_record,
};
