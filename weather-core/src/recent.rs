use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::config::project_dirs;

/// Fixed storage key; the list lives in `<data dir>/search-history.json`.
pub const STORAGE_KEY: &str = "search-history";

pub const MAX_RECENT: usize = 8;

/// Most-recent-first list of searched city names, deduplicated ignoring case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecentSearches {
    names: Vec<String>,
}

impl RecentSearches {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut recent = Self::default();
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        recent.merge_front(&names);
        recent
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn most_recent(&self) -> Option<&str> {
        self.names.first().map(String::as_str)
    }

    /// Puts `names` at the front (keeping their order), drops older entries
    /// that differ only by case, and truncates to [`MAX_RECENT`].
    pub fn merge_front(&mut self, names: &[String]) {
        let mut merged: Vec<String> = Vec::with_capacity(MAX_RECENT);
        for name in names.iter().chain(self.names.iter()) {
            let name = name.trim();
            if name.is_empty() || merged.iter().any(|m| same_city(m, name)) {
                continue;
            }
            merged.push(name.to_string());
        }
        merged.truncate(MAX_RECENT);
        self.names = merged;
    }

    /// Returns whether anything was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.names.len();
        self.names.retain(|n| !same_city(n, name.trim()));
        self.names.len() != before
    }
}

fn same_city(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// JSON file holding the persisted [`RecentSearches`].
#[derive(Debug, Clone)]
pub struct RecentStore {
    path: PathBuf,
}

impl RecentStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store in the platform data directory.
    pub fn default_location() -> Result<Self> {
        let dirs = project_dirs()?;
        Ok(Self::new(
            dirs.data_dir().join(format!("{STORAGE_KEY}.json")),
        ))
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Missing file means no history yet.
    pub fn load(&self) -> Result<RecentSearches> {
        if !self.path.exists() {
            return Ok(RecentSearches::default());
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read search history: {}", self.path.display()))?;
        let names: Vec<String> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse search history: {}", self.path.display()))?;

        Ok(RecentSearches::from_names(names))
    }

    pub fn save(&self, recent: &RecentSearches) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create data directory: {}", parent.display())
            })?;
        }

        let json = serde_json::to_string_pretty(recent)
            .context("Failed to serialize search history")?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write search history: {}", self.path.display()))?;

        Ok(())
    }
}
