//! Access to secrets and parameters passed through the process environment.

use std::sync::Once;

static DOTENV: Once = Once::new();

#[derive(Debug, thiserror::Error)]
#[error("{0} not found in environment variables")]
pub struct MissingVar(pub String);

/// Load `.env` from the working directory (or a parent) once, if present.
pub fn load_dotenv() {
    DOTENV.call_once(|| {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded environment file");
        }
    });
}

/// Read a variable that must be set and non-empty.
pub fn require(name: &str) -> Result<String, MissingVar> {
    load_dotenv();
    match dotenvy::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(MissingVar(name.to_string())),
    }
}
