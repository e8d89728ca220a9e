//! Build record specs from a JSON-Schema-ish document.
//!
//! The accepted dialect is the one schema inference emits: `type`,
//! `properties`, `required`, `enum`, `pattern`, `format`, `minimum`,
//! `maximum`, `items`, `prefixItems`, `minItems`, `maxItems` and `oneOf`.
//! Property order is declaration order (serde_json `preserve_order`).
use std::path::Path;

use regex::Regex;
use serde::de::{self, DeserializeSeed, Deserializer, MapAccess, SeqAccess, Visitor};
use serde_json::{Map, Number, Value};

use crate::error::SchemaError;
use crate::field::{Decoder, FieldSpec};
use crate::ir::{Field, StrFormat, Ty};
use crate::record::RecordSpec;

impl RecordSpec {
    /// The root must be an object type with `properties`; each property
    /// becomes one field, required when listed in `required`.
    pub fn from_schema(schema: &Value) -> Result<Self, SchemaError> {
        let Some(node) = schema.as_object() else {
            return Err(SchemaError::RootNotRecord);
        };
        if node.get("type").and_then(Value::as_str) != Some("object") || !node.contains_key("properties") {
            return Err(SchemaError::RootNotRecord);
        }
        let fields = object_fields(node, "#")?
            .into_iter()
            .map(|f| FieldSpec::new(f.name, f.required, Decoder::Typed(f.ty)))
            .collect();
        RecordSpec::new(fields)
    }

    /// Parse schema text. Unlike [`RecordSpec::from_schema`], this sees
    /// repeated object keys before they collapse, so a property declared
    /// twice is a [`SchemaError::DuplicateField`].
    pub fn from_schema_str(src: &str) -> Result<Self, SchemaError> {
        Self::from_schema(&parse_unique(src)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let src = std::fs::read_to_string(path)
            .map_err(|source| SchemaError::Io { path: path.to_path_buf(), source })?;
        Self::from_schema_str(&src).map_err(|e| match e {
            SchemaError::Malformed { source } => {
                SchemaError::Parse { path: path.to_path_buf(), message: source.to_string() }
            }
            other => other,
        })
    }
}

impl Ty {
    pub fn from_schema(node: &Value) -> Result<Ty, SchemaError> {
        ty_at(node, "#")
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn ty_at(node: &Value, path: &str) -> Result<Ty, SchemaError> {
    let Some(obj) = node.as_object() else {
        return Err(SchemaError::NotAnObject { path: path.to_string() });
    };

    if let Some(arms) = obj.get("oneOf") {
        let Some(arms) = arms.as_array() else {
            return Err(invalid(path, "`oneOf` must be an array"));
        };
        let arms = arms
            .iter()
            .enumerate()
            .map(|(i, arm)| ty_at(arm, &format!("{path}/oneOf/{i}")))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(simplify_unions(arms));
    }

    match obj.get("type") {
        None => Ok(Ty::Any),
        Some(Value::String(name)) => ty_named(name, obj, path),
        // `"type": ["string", "null"]` shares the other keywords across arms
        Some(Value::Array(names)) => {
            let arms = names
                .iter()
                .map(|name| match name.as_str() {
                    Some(name) => ty_named(name, obj, path),
                    None => Err(invalid(path, "`type` entries must be strings")),
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(simplify_unions(arms))
        }
        Some(_) => Err(invalid(path, "`type` must be a string or an array of strings")),
    }
}

fn ty_named(name: &str, obj: &Map<String, Value>, path: &str) -> Result<Ty, SchemaError> {
    let ty = match name {
        "any" => Ty::Any,
        "null" => Ty::Null,
        "boolean" => Ty::Bool,
        "integer" => Ty::Integer {
            min: number_kw(obj, "minimum").map(|f| f.ceil() as i64),
            max: number_kw(obj, "maximum").map(|f| f.floor() as i64),
        },
        "number" => Ty::Number {
            min: number_kw(obj, "minimum"),
            max: number_kw(obj, "maximum"),
        },
        "string" => string_ty(obj, path)?,
        "array" => array_ty(obj, path)?,
        "object" => Ty::Object { fields: object_fields(obj, path)? },
        other => {
            return Err(SchemaError::UnknownType { path: path.to_string(), name: other.to_string() });
        }
    };
    Ok(ty)
}

fn string_ty(obj: &Map<String, Value>, path: &str) -> Result<Ty, SchemaError> {
    let enum_ = match obj.get("enum") {
        None => Vec::new(),
        Some(Value::Array(lits)) => lits
            .iter()
            .map(|lit| match lit {
                Value::String(s) => Ok(s.clone()),
                _ => Err(invalid(path, "string `enum` entries must be strings")),
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => return Err(invalid(path, "`enum` must be an array")),
    };
    let pattern = match obj.get("pattern") {
        None => None,
        Some(Value::String(rx)) => Some(Regex::new(rx).map_err(|source| SchemaError::BadPattern {
            path: format!("{path}/pattern"),
            source,
        })?),
        Some(_) => return Err(invalid(path, "`pattern` must be a string")),
    };
    let format = match obj.get("format") {
        None => None,
        Some(Value::String(name)) => Some(StrFormat::parse(name).ok_or_else(|| {
            SchemaError::UnknownFormat { path: format!("{path}/format"), name: name.clone() }
        })?),
        Some(_) => return Err(invalid(path, "`format` must be a string")),
    };
    Ok(Ty::String { enum_, pattern, format })
}

fn array_ty(obj: &Map<String, Value>, path: &str) -> Result<Ty, SchemaError> {
    let min_items = count_kw(obj, "minItems", path)?;
    let max_items = count_kw(obj, "maxItems", path)?;

    if let Some(prefix) = obj.get("prefixItems") {
        let Some(prefix) = prefix.as_array() else {
            return Err(invalid(path, "`prefixItems` must be an array"));
        };
        let elems = prefix
            .iter()
            .enumerate()
            .map(|(i, el)| ty_at(el, &format!("{path}/prefixItems/{i}")))
            .collect::<Result<Vec<_>, _>>()?;
        let arity = elems.len() as u32;
        return Ok(Ty::ArrayTuple {
            elems,
            min_items: min_items.unwrap_or(arity).min(arity),
            max_items: arity,
        });
    }

    let item = match obj.get("items") {
        None => Ty::Any,
        Some(item) => ty_at(item, &format!("{path}/items"))?,
    };
    Ok(Ty::ArrayList { item: Box::new(item), min_items, max_items })
}

fn object_fields(obj: &Map<String, Value>, path: &str) -> Result<Vec<Field>, SchemaError> {
    let props = match obj.get("properties") {
        None => return Ok(Vec::new()),
        Some(Value::Object(props)) => props,
        Some(_) => return Err(invalid(path, "`properties` must be an object")),
    };
    let required: Vec<&str> = match obj.get("required") {
        None => Vec::new(),
        Some(Value::Array(names)) => names
            .iter()
            .map(|name| name.as_str().ok_or_else(|| invalid(path, "`required` entries must be strings")))
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => return Err(invalid(path, "`required` must be an array")),
    };
    if let Some(unknown) = required.iter().find(|name| !props.contains_key(**name)) {
        return Err(invalid(path, &format!("required key `{unknown}` has no property")));
    }

    props
        .iter()
        .map(|(name, node)| -> Result<Field, SchemaError> {
            Ok(Field {
                name: name.clone(),
                ty: ty_at(node, &format!("{path}/properties/{name}"))?,
                required: required.contains(&name.as_str()),
            })
        })
        .collect()
}

// Collapse common unions: X ∪ null → Nullable(X)
fn simplify_unions(mut arms: Vec<Ty>) -> Ty {
    let mut had_null = false;
    arms.retain(|t| {
        if matches!(t, Ty::Null) { had_null = true; false } else { true }
    });

    let core = match arms.len() {
        0 => return Ty::Null,
        1 => arms.remove(0),
        _ => Ty::OneOf(arms),
    };

    if had_null {
        Ty::Nullable(Box::new(core))
    } else {
        core
    }
}

fn number_kw(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    obj.get(key).and_then(Value::as_f64)
}

fn count_kw(obj: &Map<String, Value>, key: &str, path: &str) -> Result<Option<u32>, SchemaError> {
    match obj.get(key) {
        None => Ok(None),
        Some(v) => v
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| invalid(path, &format!("`{key}` must be a non-negative integer"))),
    }
}

fn invalid(path: &str, message: &str) -> SchemaError {
    SchemaError::Invalid { path: path.to_string(), message: message.to_string() }
}

// ————————————————————————————————————————————————————————————————————————————
// DUPLICATE-AWARE PARSING
// ————————————————————————————————————————————————————————————————————————————

/// `serde_json::Value` keeps the last of two equal keys. Parsing through
/// [`UniqueKeys`] records every repeat with the pointer of its object.
fn parse_unique(src: &str) -> Result<Value, SchemaError> {
    let mut repeats = Vec::new();
    let mut de = serde_json::Deserializer::from_str(src);
    let value = UniqueKeys { repeats: &mut repeats, path: "#".to_string() }
        .deserialize(&mut de)
        .and_then(|v| de.end().map(|()| v))
        .map_err(|source| SchemaError::Malformed { source })?;
    match repeats.into_iter().next() {
        None => Ok(value),
        Some((path, key)) if path.ends_with("/properties") => Err(SchemaError::DuplicateField { name: key }),
        Some((path, key)) => Err(invalid(&path, &format!("key `{key}` appears more than once"))),
    }
}

struct UniqueKeys<'a> {
    repeats: &'a mut Vec<(String, String)>,
    path: String,
}

impl<'de> DeserializeSeed<'de> for UniqueKeys<'_> {
    type Value = Value;

    fn deserialize<D: Deserializer<'de>>(self, de: D) -> Result<Value, D::Error> {
        de.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for UniqueKeys<'_> {
    type Value = Value;

    fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Number::from_f64(v).map_or(Value::Null, Value::Number))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let UniqueKeys { repeats, path } = self;
        let mut out = Vec::new();
        while let Some(el) =
            seq.next_element_seed(UniqueKeys { repeats: &mut *repeats, path: format!("{path}/{}", out.len()) })?
        {
            out.push(el);
        }
        Ok(Value::Array(out))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        let UniqueKeys { repeats, path } = self;
        let mut out = Map::new();
        while let Some(key) = map.next_key::<String>()? {
            let value = map.next_value_seed(UniqueKeys { repeats: &mut *repeats, path: format!("{path}/{key}") })?;
            if out.contains_key(&key) {
                repeats.push((path.clone(), key.clone()));
            }
            out.insert(key, value);
        }
        Ok(Value::Object(out))
    }
}
