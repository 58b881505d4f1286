use std::{
    cell::{Cell, RefCell},
    collections::BTreeMap,
    fs::{create_dir_all, read_to_string},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

use crate::{scope::Scope, version::Version};

/// Stores the current version of one slot.
///
/// Runs assume a single writer per backing store. Slots that share a store
/// (such as one [`FilePersistor`] file) must not be written concurrently
/// either, since a commit to one slot may rewrite the others.
pub trait Persistor {
    /// The last committed version, or `None` if nothing was ever committed.
    fn load(&self) -> Result<Option<Version>>;

    fn save(&self, version: Version) -> Result<()>;

    fn current(&self) -> Result<Version> {
        Ok(self.load()?.unwrap_or(Version::BASE))
    }
}

impl<P: Persistor + ?Sized> Persistor for &P {
    fn load(&self) -> Result<Option<Version>> {
        (**self).load()
    }

    fn save(&self, version: Version) -> Result<()> {
        (**self).save(version)
    }
}

/// Remembers nothing. Every run starts from the base version.
pub struct NoPersistor;
impl Persistor for NoPersistor {
    fn load(&self) -> Result<Option<Version>> {
        Ok(None)
    }

    fn save(&self, _version: Version) -> Result<()> {
        Ok(())
    }
}

/// Keeps the version in memory and records every commit.
#[derive(Debug, Default)]
pub struct MemoryPersistor {
    slot: Cell<Option<Version>>,
    history: RefCell<Vec<Version>>,
}

impl MemoryPersistor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(version: Version) -> Self {
        Self {
            slot: Cell::new(Some(version)),
            history: RefCell::new(Vec::new()),
        }
    }

    /// Every version saved so far, oldest first.
    pub fn history(&self) -> Vec<Version> {
        self.history.borrow().clone()
    }
}

impl Persistor for MemoryPersistor {
    fn load(&self) -> Result<Option<Version>> {
        Ok(self.slot.get())
    }

    fn save(&self, version: Version) -> Result<()> {
        self.slot.set(Some(version));
        self.history.borrow_mut().push(version);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Toml,
    Json,
}

impl Format {
    /// `.json` files are JSON, anything else is TOML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
            _ => Format::Toml,
        }
    }

    fn parse(self, data: &str) -> Result<BTreeMap<String, Version>> {
        Ok(match self {
            Format::Toml => toml::from_str(data)?,
            Format::Json if data.trim().is_empty() => BTreeMap::new(),
            Format::Json => serde_json::from_str(data)?,
        })
    }

    fn render(self, slots: &BTreeMap<String, Version>) -> Result<String> {
        Ok(match self {
            Format::Toml => toml::to_string(slots)?,
            Format::Json => serde_json::to_string_pretty(slots)?,
        })
    }
}

/// One slot in a store file. A store file holds any number of slots, keyed
/// by name, so independent version counters can share it.
///
/// Every save rewrites the whole file from what it read just before. Two
/// processes saving different slots of the same file at once can undo each
/// other's commits, so keep to one writer per file.
#[derive(Debug, Clone)]
pub struct FilePersistor {
    path: PathBuf,
    key: String,
    format: Format,
}

impl FilePersistor {
    pub fn new(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            format: Format::from_path(&path),
            path,
            key: key.into(),
        }
    }

    pub fn in_scope(scope: &Scope, file: &str, key: impl Into<String>) -> Result<Self> {
        Ok(Self::new(scope.full_path(file)?, key))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Every slot in the store file.
    pub fn entries(&self) -> Result<BTreeMap<String, Version>> {
        let data = match read_to_string(&self.path) {
            Ok(d) => d,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("Cannot read {}", self.path.display()));
            }
        };
        self.format
            .parse(&data)
            .with_context(|| format!("Malformed store file {}", self.path.display()))
    }

    /// Drops this slot. Returns whether it existed.
    pub fn remove(&self) -> Result<bool> {
        let mut slots = self.entries()?;
        if slots.remove(&self.key).is_none() {
            return Ok(false);
        }
        self.write(&slots)?;
        Ok(true)
    }

    fn write(&self, slots: &BTreeMap<String, Version>) -> Result<()> {
        let data = self.format.render(slots)?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        create_dir_all(dir)
            .with_context(|| format!("Cannot create directory {}", dir.display()))?;

        // Write beside the target and rename so readers never see half a file
        let mut file = NamedTempFile::new_in(dir)
            .with_context(|| format!("Cannot create a temporary file in {}", dir.display()))?;
        file.write_all(data.as_bytes())?;
        file.as_file()
            .sync_all()
            .with_context(|| format!("Cannot flush {}", self.path.display()))?;
        file.persist(&self.path)
            .with_context(|| format!("Cannot write {}", self.path.display()))?;
        Ok(())
    }
}

impl Persistor for FilePersistor {
    fn load(&self) -> Result<Option<Version>> {
        Ok(self.entries()?.get(&self.key).copied())
    }

    fn save(&self, version: Version) -> Result<()> {
        let mut slots = self.entries()?;
        slots.insert(self.key.clone(), version);
        self.write(&slots)
    }
}

#[cfg(test)]
mod persistor_test {
    use super::*;

    #[test]
    fn test_memory_persistor() {
        let persistor = MemoryPersistor::new();
        assert_eq!(persistor.current().unwrap(), Version::BASE);

        persistor.save(Version::new(2)).unwrap();
        persistor.save(Version::new(3)).unwrap();
        assert_eq!(persistor.load().unwrap(), Some(Version::new(3)));
        assert_eq!(persistor.history(), vec![Version::new(2), Version::new(3)]);
    }

    #[test]
    fn test_no_persistor() {
        NoPersistor.save(Version::new(5)).unwrap();
        assert_eq!(NoPersistor.current().unwrap(), Version::BASE);
    }

    #[test]
    fn test_file_slots_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("versions.toml");
        let app = FilePersistor::new(&path, "app");
        let cache = FilePersistor::new(&path, "cache");

        assert_eq!(app.load().unwrap(), None);
        assert_eq!(app.current().unwrap(), Version::BASE);

        app.save(Version::new(4)).unwrap();
        cache.save(Version::new(1)).unwrap();
        app.save(Version::new(5)).unwrap();

        assert_eq!(app.current().unwrap(), Version::new(5));
        assert_eq!(cache.current().unwrap(), Version::new(1));

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("app = 5"));
        assert!(raw.contains("cache = 1"));
    }

    #[test]
    fn test_file_slots_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("versions.json");
        let app = FilePersistor::new(&path, "app");

        app.save(Version::new(3)).unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["app"], 3);

        assert!(app.remove().unwrap());
        assert!(!app.remove().unwrap());
        assert_eq!(app.load().unwrap(), None);
    }

    #[test]
    fn test_save_keeps_other_slots() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("versions.toml");
        let app = FilePersistor::new(&path, "app");
        let cache = FilePersistor::new(&path, "cache");

        app.save(Version::new(4)).unwrap();
        cache.save(Version::new(1)).unwrap();
        app.save(Version::new(5)).unwrap();
        cache.save(Version::new(2)).unwrap();

        let slots = app.entries().unwrap();
        assert_eq!(slots.get("app"), Some(&Version::new(5)));
        assert_eq!(slots.get("cache"), Some(&Version::new(2)));
    }

    #[test]
    fn test_scoped_store_created_on_save() {
        let dir = tempfile::tempdir().unwrap();
        let scope = Scope::Custom(dir.path().to_path_buf());
        let app = FilePersistor::in_scope(&scope, "versions.toml", "app").unwrap();

        assert_eq!(app.current().unwrap(), Version::BASE);
        assert!(app.entries().unwrap().is_empty());
        assert!(!dir.path().join(".upgrader").exists());

        app.save(Version::new(2)).unwrap();
        assert!(app.path().is_file());
        assert_eq!(std::fs::read_to_string(app.path()).unwrap().trim(), "app = 2");
        // Only the store file is left behind, no temporary files
        assert_eq!(std::fs::read_dir(dir.path().join(".upgrader")).unwrap().count(), 1);
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("versions.toml");
        std::fs::write(&path, "app = \"three\"").unwrap();

        let err = FilePersistor::new(&path, "app").load().unwrap_err();
        assert!(format!("{err:#}").contains("Malformed store file"));
    }
}
