use serde::de::DeserializeOwned;
use thiserror::Error;

/// A parse or shape error, with the JSON path the deserializer had reached.
#[derive(Debug, Error)]
#[error("at JSON path {path} → {source}")]
pub struct PathError {
    pub path: String,
    #[source]
    pub source: serde_json::Error,
}

impl From<serde_path_to_error::Error<serde_json::Error>> for PathError {
    fn from(err: serde_path_to_error::Error<serde_json::Error>) -> Self {
        let path = err.path().to_string();
        PathError { path, source: err.into_inner() }
    }
}

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, PathError> {
    let mut de = serde_json::Deserializer::from_str(src);
    let v = serde_path_to_error::deserialize::<_, T>(&mut de)?;
    de.end().map_err(|source| PathError { path: ".".to_string(), source })?;
    Ok(v)
}

pub fn from_slice_with_path<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, PathError> {
    let mut de = serde_json::Deserializer::from_slice(bytes);
    let v = serde_path_to_error::deserialize::<_, T>(&mut de)?;
    de.end().map_err(|source| PathError { path: ".".to_string(), source })?;
    Ok(v)
}
