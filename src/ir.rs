// Declarative field types. Built once (by hand or from a schema) and only read afterwards.

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone)]
pub enum Ty {
    Any,                     // accepts every value unchanged
    Null,                    // exactly null
    Bool,
    Integer { min: Option<i64>, max: Option<i64> },
    Number  { min: Option<f64>, max: Option<f64> },
    String  { enum_: Vec<String>, pattern: Option<Regex>, format: Option<StrFormat> },
    ArrayList {
        item: Box<Ty>,
        min_items: Option<u32>,
        max_items: Option<u32>,
    },
    ArrayTuple {
        elems: Vec<Ty>,      // one decoder per position
        min_items: u32,      // positions below this must be present
        max_items: u32,      // == elems.len()
    },
    Object {
        fields: Vec<Field>,  // declaration order
    },
    OneOf(Vec<Ty>),          // first arm that decodes wins
    Nullable(Box<Ty>),       // null wrapper
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub ty: Ty,
    pub required: bool,      // present & non-null
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrFormat {
    Uri,
    DateTime,
    Date,
}

/// Coarse JSON kind, used for the `found` side of a type mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JsonKind {
    Null,
    Boolean,
    Integer,
    Number,
    String,
    Array,
    Object,
}

impl JsonKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => JsonKind::Null,
            Value::Bool(_) => JsonKind::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => JsonKind::Integer,
            Value::Number(_) => JsonKind::Number,
            Value::String(_) => JsonKind::String,
            Value::Array(_) => JsonKind::Array,
            Value::Object(_) => JsonKind::Object,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JsonKind::Null => "null",
            JsonKind::Boolean => "boolean",
            JsonKind::Integer => "integer",
            JsonKind::Number => "number",
            JsonKind::String => "string",
            JsonKind::Array => "array",
            JsonKind::Object => "object",
        }
    }
}

impl std::fmt::Display for JsonKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StrFormat {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "uri" => Some(StrFormat::Uri),
            "date-time" => Some(StrFormat::DateTime),
            "date" => Some(StrFormat::Date),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StrFormat::Uri => "uri",
            StrFormat::DateTime => "date-time",
            StrFormat::Date => "date",
        }
    }
}

impl Ty {
    /// Short human description, used as the `expected` side of a mismatch.
    pub fn describe(&self) -> String {
        match self {
            Ty::Any => "any".to_string(),
            Ty::Null => "null".to_string(),
            Ty::Bool => "boolean".to_string(),
            Ty::Integer { .. } => "integer".to_string(),
            Ty::Number { .. } => "number".to_string(),
            Ty::String { .. } => "string".to_string(),
            Ty::ArrayList { .. } | Ty::ArrayTuple { .. } => "array".to_string(),
            Ty::Object { .. } => "object".to_string(),
            Ty::OneOf(arms) => arms.iter().map(Ty::describe).collect::<Vec<_>>().join(" | "),
            Ty::Nullable(inner) => format!("{} | null", inner.describe()),
        }
    }

    pub fn string() -> Self {
        Ty::String { enum_: Vec::new(), pattern: None, format: None }
    }

    pub fn integer() -> Self {
        Ty::Integer { min: None, max: None }
    }

    pub fn number() -> Self {
        Ty::Number { min: None, max: None }
    }

    pub fn list_of(item: Ty) -> Self {
        Ty::ArrayList { item: Box::new(item), min_items: None, max_items: None }
    }

    pub fn nullable(inner: Ty) -> Self {
        Ty::Nullable(Box::new(inner))
    }
}
