//! Kernel configuration, persisted as TOML.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::identifier::IdentifierTranslator;
use crate::persist::{AnyExecutor, PoolExecutor, ThreadExecutor};
use crate::vocab::ManagedVocabulary;

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Which execution context asynchronous consumption runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorKind {
    /// One OS thread per unit of work.
    #[default]
    Thread,
    /// A fixed-size rayon pool.
    Pool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    #[serde(default)]
    pub kind: ExecutorKind,
    /// Pool size; ignored for `thread`.
    #[serde(default = "default_threads")]
    pub threads: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            kind: ExecutorKind::default(),
            threads: default_threads(),
        }
    }
}

/// Additions to the built-in managed vocabulary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyConfig {
    #[serde(default)]
    pub managed_namespaces: Vec<String>,
    #[serde(default)]
    pub managed_properties: Vec<String>,
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelConfig {
    /// Namespace of subjects this repository owns.
    #[serde(default = "default_base_uri")]
    pub base_uri: String,
    /// Tracing filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    #[serde(default)]
    pub vocabulary: VocabularyConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
}

fn default_base_uri() -> String {
    "info:fedora".into()
}
fn default_log_filter() -> String {
    "info".into()
}
fn default_threads() -> usize {
    4
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            base_uri: default_base_uri(),
            log_filter: default_log_filter(),
            vocabulary: VocabularyConfig::default(),
            executor: ExecutorConfig::default(),
        }
    }
}

impl KernelConfig {
    /// Load from a TOML file and validate.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.base_uri.trim_end_matches('/').is_empty() {
            return Err(ConfigError::Invalid {
                message: "base_uri must not be empty".into(),
            });
        }
        if self.executor.kind == ExecutorKind::Pool && self.executor.threads == 0 {
            return Err(ConfigError::Invalid {
                message: "executor.threads must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Built-in managed vocabulary plus configured extras.
    pub fn vocabulary(&self) -> ManagedVocabulary {
        let mut vocabulary = ManagedVocabulary::repository();
        for namespace in &self.vocabulary.managed_namespaces {
            vocabulary = vocabulary.with_namespace(namespace.as_str());
        }
        for property in &self.vocabulary.managed_properties {
            vocabulary = vocabulary.with_property(property.as_str());
        }
        vocabulary
    }

    pub fn translator(&self) -> ConfigResult<IdentifierTranslator> {
        IdentifierTranslator::new(self.base_uri.as_str()).map_err(|e| ConfigError::Invalid {
            message: e.to_string(),
        })
    }

    pub fn executor(&self) -> ConfigResult<AnyExecutor> {
        Ok(match self.executor.kind {
            ExecutorKind::Thread => AnyExecutor::Thread(ThreadExecutor::default()),
            ExecutorKind::Pool => AnyExecutor::Pool(PoolExecutor::new(self.executor.threads)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::{Statement, Term};

    #[test]
    fn empty_toml_gives_defaults() {
        let config: KernelConfig = toml::from_str("").unwrap();
        assert_eq!(config, KernelConfig::default());
        assert_eq!(config.base_uri, "info:fedora");
        assert_eq!(config.executor.threads, 4);
        assert_eq!(config.executor.kind, ExecutorKind::Thread);
    }

    #[test]
    fn partial_toml() {
        let config: KernelConfig = toml::from_str(
            r#"
            base_uri = "http://localhost:8080/rest"
            [executor]
            kind = "pool"
            threads = 2
            [vocabulary]
            managed_namespaces = ["http://internal.example/#"]
            "#,
        )
        .unwrap();
        assert_eq!(config.executor.kind, ExecutorKind::Pool);
        assert_eq!(config.log_filter, "info");
        let vocab = config.vocabulary();
        let s = Statement::new(
            Term::blank("b"),
            Term::iri("http://internal.example/#secret"),
            Term::literal("x"),
        );
        assert!(vocab.is_managed(&s));
        assert!(matches!(config.executor().unwrap(), AnyExecutor::Pool(_)));
    }

    #[test]
    fn zero_pool_threads_is_invalid() {
        let mut config = KernelConfig::default();
        config.executor.kind = ExecutorKind::Pool;
        config.executor.threads = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn empty_base_uri_is_invalid() {
        let config = KernelConfig {
            base_uri: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(config.translator().is_err());
    }
}
