use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, SignError};

/// What the dispatcher does when the source document cannot be retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FetchFailurePolicy {
    /// Surface the fetch error to the caller.
    #[default]
    Abort,
    /// Produce a standalone signing certificate instead.
    Certificate,
}

/// Branding and policy knobs for document generation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerationConfig {
    pub product_name: String,
    pub certificate_subtitle: String,
    pub product_tagline: String,
    pub on_fetch_failure: FetchFailurePolicy,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            product_name: "QuickInk".to_string(),
            certificate_subtitle: "E-Signature Certificate".to_string(),
            product_tagline: "Self-Hosted E-Signature Solution".to_string(),
            on_fetch_failure: FetchFailurePolicy::Abort,
        }
    }
}

impl GenerationConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| SignError::ConfigError(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| SignError::ConfigError(format!("Invalid JSON: {}", e)))
    }
}
