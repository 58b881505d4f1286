use std::{fs::read_to_string, io::ErrorKind, path::Path};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::{persistor::FilePersistor, scope::Scope};

pub const DEFAULT_CONFIG_FILE: &str = "upgrader.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Slot used when no key is given on the command line.
    pub key: String,
    pub store: StoreConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            key: "app".to_owned(),
            store: StoreConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub scope: Scope,
    /// File name under the scope. Its extension picks the format.
    pub file: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            scope: Scope::default(),
            file: "versions.toml".to_owned(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = read_to_string(path)
            .with_context(|| format!("Cannot read config {}", path.display()))?;
        Self::parse(&data).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Like [`load`](Self::load), but a missing file yields the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        match Self::load(&path) {
            Err(e)
                if e.downcast_ref::<std::io::Error>()
                    .is_some_and(|io| io.kind() == ErrorKind::NotFound) =>
            {
                log::debug!("No config at {}, using defaults", path.as_ref().display());
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn parse(data: &str) -> Result<Self> {
        Ok(toml::from_str(data)?)
    }

    /// The persistor for `key`, or for the configured default key.
    pub fn persistor(&self, key: Option<&str>) -> Result<FilePersistor> {
        let key = key.unwrap_or(&self.key);
        FilePersistor::in_scope(&self.store.scope, &self.store.file, key)
    }
}

#[cfg(test)]
mod config_test {
    use super::*;
    use crate::{persistor::Persistor, version::Version};
    use std::path::PathBuf;

    #[test]
    fn test_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.store.scope, Scope::Config);
    }

    #[test]
    fn test_parse() {
        let config = Config::parse(
            r#"
            key = "settings"

            [store]
            scope = { custom = "/var/lib/app" }
            file = "state.json"
            "#,
        )
        .unwrap();

        assert_eq!(config.key, "settings");
        assert_eq!(config.store.scope, Scope::Custom(PathBuf::from("/var/lib/app")));
        assert_eq!(config.store.file, "state.json");

        let config = Config::parse("[store]\nscope = \"dot\"").unwrap();
        assert_eq!(config.store.scope, Scope::Dot);
        assert_eq!(config.store.file, "versions.toml");
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, Config::default());

        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "key = 3").unwrap();
        assert!(Config::load_or_default(&path).is_err());
    }

    #[test]
    fn test_persistor_in_scope() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            key: "app".to_owned(),
            store: StoreConfig {
                scope: Scope::Custom(dir.path().to_path_buf()),
                file: "versions.toml".to_owned(),
            },
        };

        let persistor = config.persistor(Some("cache")).unwrap();
        assert_eq!(persistor.key(), "cache");
        assert_eq!(
            persistor.path(),
            dir.path().join(".upgrader").join("versions.toml")
        );
        assert_eq!(persistor.current().unwrap(), Version::BASE);
        assert!(!dir.path().join(".upgrader").exists());
    }
}
