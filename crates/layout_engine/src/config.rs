use crate::error::{LayoutError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Engine settings, read from a TOML file with a `[search]` table.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Let placements grow the layout beyond its initial column count
    pub allow_expand: bool,
    pub tie_break: TieBreakMode,
    /// Required by `tie_break = "seeded"`
    pub seed: Option<u64>,
    /// Stop the search once this many layouts were accepted
    pub stop_after: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TieBreakMode {
    #[default]
    Random,
    Seeded,
    First,
}

impl EngineConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            LayoutError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let config: EngineConfig = toml::from_str(&content).map_err(|e| {
            LayoutError::Config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let search = &self.search;
        if search.tie_break == TieBreakMode::Seeded && search.seed.is_none() {
            return Err(LayoutError::Config(
                "tie_break = \"seeded\" requires a seed".to_string(),
            ));
        }
        if search.stop_after == Some(0) {
            return Err(LayoutError::Config(
                "stop_after must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!(!config.search.allow_expand);
        assert_eq!(config.search.tie_break, TieBreakMode::Random);
        assert!(config.search.stop_after.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("engine.toml");
        fs::write(
            &path,
            "[search]\nallow_expand = true\ntie_break = \"seeded\"\nseed = 11\nstop_after = 4\n",
        )
        .unwrap();

        let config = EngineConfig::load_from_file(&path).unwrap();
        assert!(config.search.allow_expand);
        assert_eq!(config.search.tie_break, TieBreakMode::Seeded);
        assert_eq!(config.search.seed, Some(11));
        assert_eq!(config.search.stop_after, Some(4));
    }

    #[test]
    fn test_seeded_requires_seed() {
        let result = EngineConfig::from_toml_str("[search]\ntie_break = \"seeded\"\n");
        assert!(matches!(result, Err(LayoutError::Config(_))));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(EngineConfig::from_toml_str("[search]\nstop_after = 0\n").is_err());
        assert!(EngineConfig::from_toml_str("[search]\ntie_break = \"dice\"\n").is_err());
    }

    #[test]
    fn test_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = EngineConfig::load_from_file(&temp_dir.path().join("absent.toml"));
        assert!(matches!(result, Err(LayoutError::Config(_))));
    }
}
