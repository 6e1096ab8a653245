use thiserror::Error;

/// An environment variable required by the application is not set.
#[derive(Debug, Error)]
#[error("Missing environment variable: {0}")]
pub struct MissingEnvVarError(pub String);

/// Reads an environment variable, returning a structured error if it's missing.
///
/// Values that are empty or only whitespace count as missing, so an exported
/// but blank variable never overrides a configured value.
///
/// # Arguments
/// * `name` - The name of the environment variable to read.
pub fn get_env_var(name: &str) -> Result<String, MissingEnvVarError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(MissingEnvVarError(name.to_string())),
    }
}

/// Like [`get_env_var`], but for optional overrides where absence is normal.
pub fn env_override(name: &str) -> Option<String> {
    get_env_var(name).ok()
}
