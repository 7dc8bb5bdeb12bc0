//! Persistent string key-value store backed by a single JSON file.
//!
//! Every call reads the file and every mutation rewrites it, so several
//! handles to the same path always observe each other's writes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct LocalStore {
    path: PathBuf,
}

impl LocalStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(entries)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    pub fn set(&self, key: &str, value: impl Into<String>) -> Result<()> {
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.into());
        self.write_all(&entries)
    }

    /// Sets every pair with a single rewrite of the file.
    pub fn set_many<I, V>(&self, pairs: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'static str, V)>,
        V: Into<String>,
    {
        let mut entries = self.read_all()?;
        for (key, value) in pairs {
            entries.insert(key.to_string(), value.into());
        }
        self.write_all(&entries)
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }

    /// Returns the stored value, storing `init()` first if the key is absent.
    pub fn get_or_insert_with(&self, key: &str, init: impl FnOnce() -> String) -> Result<String> {
        if let Some(value) = self.get(key)? {
            return Ok(value);
        }
        let value = init();
        self.set(key, value.clone())?;
        Ok(value)
    }
}
