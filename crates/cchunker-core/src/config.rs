use crate::error::{CchunkError, Result};
use crate::polynomial::Polynomial;
use crate::types::{LineCheck, ProfileKind, SizeProfile};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Run configuration, optionally stored as TOML.
///
/// Built once at the program boundary and passed down; every field has a
/// default so a partial file is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Rolling-hash polynomial. Changing it changes every chunk boundary.
    #[serde(default)]
    pub polynomial: Polynomial,
    /// Chunk size profile.
    #[serde(default)]
    pub profile: ProfileKind,
    /// Require exactly one output line per chunk in reduction mode.
    #[serde(default = "default_strict_lines")]
    pub strict_lines: bool,
}

fn default_strict_lines() -> bool {
    true
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            polynomial: Polynomial::default(),
            profile: ProfileKind::default(),
            strict_lines: default_strict_lines(),
        }
    }
}

impl ChunkerConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CchunkError::ConfigNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CchunkError::TomlDe(e.to_string()))
    }

    pub fn size_profile(&self) -> SizeProfile {
        self.profile.size_profile()
    }

    pub fn line_check(&self) -> LineCheck {
        if self.strict_lines {
            LineCheck::Strict
        } else {
            LineCheck::Off
        }
    }
}
