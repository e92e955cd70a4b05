//! Engine configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Hard ceiling on nodes created while parsing one blueprint
pub const MAX_TEMPLATE_NODE_COUNT: usize = 65_535;
/// Hard ceiling on nested template depth
pub const MAX_NESTED_TEMPLATE_COUNT: usize = 16;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("Invalid config {path}: {reason}")]
    Invalid { path: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub max_node_count: usize,
    pub max_nested_templates: usize,
    /// Structural recursion guard for the parser walk
    pub max_structure_depth: usize,
    pub tenant_id: String,
    pub locale: Option<String>,
    pub files: TemplateFiles,
}

/// Names of the fixed template roles inside a blueprint package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateFiles {
    pub constants: String,
    pub variables: String,
    pub index: String,
    pub i18n_dir: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_node_count: MAX_TEMPLATE_NODE_COUNT,
            max_nested_templates: MAX_NESTED_TEMPLATE_COUNT,
            max_structure_depth: 256,
            tenant_id: "default".to_string(),
            locale: None,
            files: TemplateFiles::default(),
        }
    }
}

impl Default for TemplateFiles {
    fn default() -> Self {
        Self {
            constants: "constants.yaml".to_string(),
            variables: "variables.yaml".to_string(),
            index: "index.yaml".to_string(),
            i18n_dir: "i18n".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load from a YAML or JSON file. Missing fields fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_yaml_str(&content).map_err(|reason| ConfigError::Invalid {
            path: path.display().to_string(),
            reason,
        })
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, String> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content).map_err(|e| e.to_string())?;
        if config.max_node_count == 0 {
            return Err("max_node_count must be positive".to_string());
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_match_ceilings() {
        let config = EngineConfig::default();
        assert_eq!(config.max_node_count, 65_535);
        assert_eq!(config.max_nested_templates, 16);
        assert_eq!(config.files.index, "index.yaml");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = EngineConfig::from_yaml_str("tenant_id: acme\nfiles:\n  index: main.yaml\n")
            .unwrap();
        assert_eq!(config.tenant_id, "acme");
        assert_eq!(config.files.index, "main.yaml");
        assert_eq!(config.files.constants, "constants.yaml");
        assert_eq!(config.max_nested_templates, 16);
    }

    #[test]
    fn test_from_file_reports_invalid_content() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "max_node_count: [1, 2]").unwrap();
        let err = EngineConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }
}
