use anyhow::{Context, Result};
use dirs::{config_dir, config_local_dir, document_dir, home_dir};
use serde::Deserialize;
use std::path::PathBuf;

const PRESERVED_DIR: &str = ".upgrader";

/// Base directory a store file lives under.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Document,
    Home,
    #[default]
    Config,
    ConfigLocal,
    Dot,
    Custom(PathBuf),
}

impl Scope {
    pub fn path(&self) -> Option<PathBuf> {
        match self {
            Scope::Document => document_dir(),
            Scope::Home => home_dir(),
            Scope::Config => config_dir(),
            Scope::ConfigLocal => config_local_dir(),
            Scope::Dot => Some(PathBuf::from(".")),
            Scope::Custom(p) => Some(p.clone()),
        }
    }

    /// Resolves `<base>/.upgrader/<id>`. Nothing is created on disk; writers
    /// create the directory on their first save.
    pub fn full_path(&self, id: &str) -> Result<PathBuf> {
        let mut path = self.path().context("There is no valid base path")?;
        path.push(PRESERVED_DIR);
        path.push(id);
        Ok(path)
    }
}
