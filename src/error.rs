//! Error taxonomy.
//!
//! Per-field failures ([`DecodeError`]) are data: they end up in a
//! [`crate::record::FailureReport`] and never abort a record. The other enums
//! are hard failures of a whole call.
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::ir::JsonKind;

/// Why one field failed to decode.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecodeError {
    #[error("missing required key `{field}`")]
    KeyMissing { field: String },

    #[error("`{field}{path}`: expected {expected}, found {found}")]
    TypeMismatch {
        field: String,
        /// JSON pointer below the field value; empty at the field itself.
        path: String,
        expected: String,
        found: JsonKind,
    },

    #[error("required key `{field}` is null")]
    NullForRequired { field: String },

    #[error("`{field}{path}`: {message}")]
    Custom {
        field: String,
        path: String,
        message: String,
    },
}

impl DecodeError {
    pub fn field(&self) -> &str {
        match self {
            DecodeError::KeyMissing { field }
            | DecodeError::TypeMismatch { field, .. }
            | DecodeError::NullForRequired { field }
            | DecodeError::Custom { field, .. } => field,
        }
    }

    /// Stable snake_case label, same as the serialized `kind` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            DecodeError::KeyMissing { .. } => "key_missing",
            DecodeError::TypeMismatch { .. } => "type_mismatch",
            DecodeError::NullForRequired { .. } => "null_for_required",
            DecodeError::Custom { .. } => "custom",
        }
    }
}

/// A decoder's verdict on a single value, before it is tied to a field name.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Reject {
    #[error("{path}: expected {expected}, found {found}")]
    Mismatch {
        path: String,
        expected: String,
        found: JsonKind,
    },
    #[error("{path}: {message}")]
    Custom { path: String, message: String },
}

impl Reject {
    pub fn mismatch(expected: impl Into<String>, found: JsonKind) -> Self {
        Reject::Mismatch { path: String::new(), expected: expected.into(), found }
    }

    pub fn custom(message: impl Into<String>) -> Self {
        Reject::Custom { path: String::new(), message: message.into() }
    }

    /// Prefix the location with one more JSON pointer segment (outermost last).
    pub fn at(mut self, segment: impl std::fmt::Display) -> Self {
        let segment = segment.to_string().replace('~', "~0").replace('/', "~1");
        match &mut self {
            Reject::Mismatch { path, .. } | Reject::Custom { path, .. } => {
                path.insert_str(0, &format!("/{segment}"));
            }
        }
        self
    }

    pub fn into_decode_error(self, field: &str) -> DecodeError {
        match self {
            Reject::Mismatch { path, expected, found } => DecodeError::TypeMismatch {
                field: field.to_string(),
                path,
                expected,
                found,
            },
            Reject::Custom { path, message } => DecodeError::Custom {
                field: field.to_string(),
                path,
                message,
            },
        }
    }
}

/// The record as a whole could not be decoded; no per-field recovery applies.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("record is not an object (found {found})")]
    NotAnObject { found: JsonKind },

    #[error("malformed JSON at {path}: {source}")]
    Syntax {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures of the typed projection over a decoded record.
#[derive(Debug, Error)]
pub enum AccessError {
    /// Programmer error: the name was never declared in the record spec.
    #[error("field `{field}` is not declared in the record spec")]
    Undeclared { field: String },

    #[error("field `{field}` failed to decode: {source}")]
    Failed {
        field: String,
        #[source]
        source: DecodeError,
    },

    #[error("optional field `{field}` is absent")]
    Absent { field: String },

    #[error("field `{field}` cannot be projected: {source}")]
    Projection {
        field: String,
        #[source]
        source: serde_json::Error,
    },
}

impl AccessError {
    pub fn is_programmer_error(&self) -> bool {
        matches!(self, AccessError::Undeclared { .. })
    }
}

/// Problems building a record spec from a schema document.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("schema node at `{path}` is not an object")]
    NotAnObject { path: String },

    #[error("schema root must be an object type with `properties`")]
    RootNotRecord,

    #[error("unknown type `{name}` at `{path}`")]
    UnknownType { path: String, name: String },

    #[error("unknown string format `{name}` at `{path}`")]
    UnknownFormat { path: String, name: String },

    #[error("invalid pattern at `{path}`: {source}")]
    BadPattern {
        path: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid schema at `{path}`: {message}")]
    Invalid { path: String, message: String },

    #[error("field `{name}` declared more than once")]
    DuplicateField { name: String },

    #[error("malformed schema JSON: {source}")]
    Malformed {
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read schema file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse schema file {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
}
