//! Error type shared by the library modules.
//!
//! Binaries wrap these in `anyhow` with file context; best-effort loops log
//! them and move on.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("bad JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The file parsed, but its top level is not an array.
    #[error("{path} is not a JSON array (found {found})")]
    NotArray { path: PathBuf, found: &'static str },

    #[error("record is not a JSON object (found {found})")]
    NotObject { found: &'static str },

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("none of {tried} is set (checked the environment and .env files)")]
    MissingApiKey { tried: String },

    #[error("LLM request failed: {0}")]
    Llm(String),
}

/// Short name of a JSON value's kind, for error messages.
pub fn kind_of(v: &serde_json::Value) -> &'static str {
    use serde_json::Value;
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
