//! Secrets from the environment and `.env` files.

use std::env;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::error::DataError;

/// `.env` locations tried in order; the first one that exists is loaded.
pub const ENV_CANDIDATES: &[&str] = &[".env", "data_pipeline/.env", "../.env"];

/// Load the first existing `.env` candidate. Variables already present in the
/// process environment are not overridden.
pub fn load_dotenv() -> Option<PathBuf> {
    load_dotenv_from(Path::new("."))
}

pub fn load_dotenv_from(base: &Path) -> Option<PathBuf> {
    for candidate in ENV_CANDIDATES {
        let path = base.join(candidate);
        if !path.is_file() {
            continue;
        }
        match dotenvy::from_path(&path) {
            Ok(()) => {
                info!("loaded environment from {}", path.display());
                return Some(path);
            }
            Err(e) => warn!("could not parse {}: {e}", path.display()),
        }
    }
    None
}

/// Gemini key variable names in priority order.
pub fn gemini_key_names() -> Vec<String> {
    let mut names = vec!["GEMINI_API_KEY".to_string(), "GOOGLE_API_KEY".to_string()];
    names.extend((1..=9).map(|i| format!("GEMINI_API_KEY_{i}")));
    names
}

/// Every distinct non-empty Gemini key, in priority order.
pub fn gemini_keys() -> Result<Vec<String>, DataError> {
    resolve_keys(&gemini_key_names(), |name| env::var(name).ok())
}

pub fn openai_key() -> Result<String, DataError> {
    resolve_keys(&["OPENAI_API_KEY".to_string()], |name| env::var(name).ok())
        .map(|mut keys| keys.remove(0))
}

fn resolve_keys<F>(names: &[String], lookup: F) -> Result<Vec<String>, DataError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut keys: Vec<String> = Vec::new();
    for name in names {
        if let Some(v) = lookup(name) {
            let v = v.trim().trim_matches(|c| c == '"' || c == '\'').to_string();
            if !v.is_empty() && !keys.contains(&v) {
                keys.push(v);
            }
        }
    }
    if keys.is_empty() {
        return Err(DataError::MissingApiKey {
            tried: names.join(", "),
        });
    }
    Ok(keys)
}
