//! Profile persistence
//!
//! One JSON file per profile, holding the raw stored topology. Loading never
//! reconciles; callers do that against the live machine themselves.

mod repository;

pub use repository::ProfileRepository;

use std::path::PathBuf;
use thiserror::Error;

use crate::constants::config::FORBIDDEN_NAME_CHARS;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("profile '{0}' does not exist")]
    NotFound(String),

    #[error("invalid profile name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("unsupported profile format version {version} in {path:?}")]
    UnsupportedVersion { path: PathBuf, version: u32 },

    #[error("failed to access {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse profile {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Profile names double as file names
pub fn validate_name(name: &str) -> Result<(), ProfileError> {
    let reason = if name.trim().is_empty() {
        "name is empty"
    } else if name.starts_with('.') {
        "name must not start with '.'"
    } else if name.contains(FORBIDDEN_NAME_CHARS) {
        "name contains a character that is not allowed in file names"
    } else if name.chars().any(char::is_control) {
        "name contains control characters"
    } else {
        return Ok(());
    };

    Err(ProfileError::InvalidName {
        name: name.to_string(),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Work").is_ok());
        assert!(validate_name("Gaming - 3 screens").is_ok());

        for bad in ["", "   ", ".hidden", "a/b", "a\\b", "what?", "x:y", "star*", "tab\tname"] {
            assert!(
                matches!(validate_name(bad), Err(ProfileError::InvalidName { .. })),
                "{bad:?} should be rejected"
            );
        }
    }
}
