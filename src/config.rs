//! `relq.toml` configuration.
//!
//! ```toml
//! [query]
//! use_relational_nulls = false
//! parameter_prefix = "p"
//!
//! [cache]
//! enabled = true
//! max_entries = 1000
//! ```

use crate::cache::CacheConfig;
use crate::error::{QueryError, QueryResult};
use crate::postprocessor::PostprocessorOptions;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "relq.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RelqConfig {
    pub query: QueryConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub use_relational_nulls: bool,
    pub parameter_prefix: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            use_relational_nulls: false,
            parameter_prefix: "p".to_string(),
        }
    }
}

impl From<&QueryConfig> for PostprocessorOptions {
    fn from(config: &QueryConfig) -> Self {
        PostprocessorOptions {
            use_relational_nulls: config.use_relational_nulls,
            parameter_prefix: config.parameter_prefix.clone(),
        }
    }
}

impl RelqConfig {
    /// Load from `path`, or the first of `./relq.toml` and the user config
    /// directory that exists. Falls back to defaults when neither does.
    pub fn load(path: Option<&Path>) -> QueryResult<Self> {
        let candidate = match path {
            Some(explicit) => Some(explicit.to_path_buf()),
            None => Self::default_locations().into_iter().find(|p| p.exists()),
        };

        match candidate {
            Some(path) => {
                let content = fs::read_to_string(&path)?;
                tracing::debug!(path = %path.display(), "loaded configuration");
                Self::from_toml_str(&content)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml_str(content: &str) -> QueryResult<Self> {
        let config: RelqConfig = toml::from_str(content).map_err(|e| QueryError::Config(e.to_string()))?;
        if config.query.parameter_prefix.is_empty() {
            return Err(QueryError::Config("query.parameter_prefix must not be empty".to_string()));
        }
        Ok(config)
    }

    fn default_locations() -> Vec<PathBuf> {
        let mut locations = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(dir) = dirs::config_dir() {
            locations.push(dir.join("relq").join(CONFIG_FILE_NAME));
        }
        locations
    }

    pub fn postprocessor_options(&self) -> PostprocessorOptions {
        PostprocessorOptions::from(&self.query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = RelqConfig::from_toml_str("").unwrap();
        assert_eq!(config, RelqConfig::default());
        assert_eq!(config.query.parameter_prefix, "p");
        assert!(config.cache.enabled);
        assert_eq!(config.cache.max_entries, 1000);
    }

    #[test]
    fn test_partial_sections() {
        let config = RelqConfig::from_toml_str(
            r#"
            [query]
            use_relational_nulls = true

            [cache]
            max_entries = 5
            "#,
        )
        .unwrap();
        assert!(config.query.use_relational_nulls);
        assert_eq!(config.query.parameter_prefix, "p");
        assert_eq!(config.cache.max_entries, 5);
        assert!(config.cache.enabled);

        let options = config.postprocessor_options();
        assert!(options.use_relational_nulls);
    }

    #[test]
    fn test_malformed() {
        let err = RelqConfig::from_toml_str("[query]\nuse_relational_nulls = \"yes\"").unwrap_err();
        assert!(matches!(err, QueryError::Config(_)));

        let err = RelqConfig::from_toml_str("[query]\nparameter_prefix = \"\"").unwrap_err();
        assert!(matches!(err, QueryError::Config(_)));
    }

    #[test]
    fn test_load_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[query]\nparameter_prefix = \"arg\"").unwrap();

        let config = RelqConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.query.parameter_prefix, "arg");
    }

    #[test]
    fn test_load_missing_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = RelqConfig::load(Some(dir.path().join("absent.toml").as_path())).unwrap_err();
        assert!(matches!(err, QueryError::Io(_)));
    }
}
