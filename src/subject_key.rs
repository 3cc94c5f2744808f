use thiserror::Error;

/// Prefix every NDA GUID starts with.
pub const KEY_PREFIX: &str = "NDAR";

/// Separator NDA places after the prefix (`NDAR_INV...`).
pub const KEY_SEPARATOR: char = '_';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("subject key '{0}' does not start with the '{KEY_PREFIX}' prefix")]
    MissingPrefix(String),

    #[error("subject key '{0}' has nothing after the '{KEY_PREFIX}' prefix")]
    EmptyIdentifier(String),

    #[error("subject key '{0}' already contains a '{KEY_SEPARATOR}' separator")]
    EmbeddedSeparator(String),
}

/// Remove every separator: `NDAR_INVX8CRJYVP` → `NDARINVX8CRJYVP`.
pub fn strip_separator(key: &str) -> String {
    key.chars().filter(|&c| c != KEY_SEPARATOR).collect()
}

/// Reinsert the separator after the prefix: `NDARINVX8CRJYVP` → `NDAR_INVX8CRJYVP`.
///
/// The key must start with the prefix and be followed by a non-empty
/// identifier without separators, so that `strip_separator` gives back the
/// input exactly.
pub fn with_separator(key: &str) -> Result<String, KeyError> {
    let id = key
        .strip_prefix(KEY_PREFIX)
        .ok_or_else(|| KeyError::MissingPrefix(key.to_string()))?;
    if id.is_empty() {
        return Err(KeyError::EmptyIdentifier(key.to_string()));
    }
    if id.contains(KEY_SEPARATOR) {
        return Err(KeyError::EmbeddedSeparator(key.to_string()));
    }
    Ok(format!("{KEY_PREFIX}{KEY_SEPARATOR}{id}"))
}
