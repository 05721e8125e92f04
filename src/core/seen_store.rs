use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::utils::error::AppError;

/// Identities that have already been notified, kept in first-seen order so
/// the persisted file is reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct SeenSet {
    order: Vec<String>,
    index: HashSet<String>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.index.contains(identity)
    }

    /// Returns `false` if the identity was already present.
    pub fn insert(&mut self, identity: impl Into<String>) -> bool {
        let identity = identity.into();
        if self.index.contains(&identity) {
            return false;
        }
        self.index.insert(identity.clone());
        self.order.push(identity);
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

impl From<Vec<String>> for SeenSet {
    fn from(ids: Vec<String>) -> Self {
        ids.into_iter().collect()
    }
}

impl From<SeenSet> for Vec<String> {
    fn from(set: SeenSet) -> Self {
        set.order
    }
}

impl FromIterator<String> for SeenSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut set = SeenSet::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

/// JSON-file persistence for the [`SeenSet`]: a single indented array of
/// identity strings.
#[derive(Debug, Clone)]
pub struct SeenStore {
    path: PathBuf,
}

impl SeenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Never fails. A missing file is a first run; an unreadable or malformed
    /// one is logged and treated as empty.
    pub fn load(&self) -> SeenSet {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No state file at {}, starting fresh", self.path.display());
                return SeenSet::new();
            }
            Err(e) => {
                let err = AppError::StateCorruption(format!("cannot read {}: {}", self.path.display(), e));
                tracing::warn!("{}; treating as empty", err);
                return SeenSet::new();
            }
        };

        match serde_json::from_str::<SeenSet>(&content) {
            Ok(seen) => {
                tracing::info!("Loaded {} seen ad IDs from {}", seen.len(), self.path.display());
                seen
            }
            Err(e) => {
                let err = AppError::StateCorruption(format!("{} is not a JSON array of strings: {}", self.path.display(), e));
                tracing::warn!("{}; treating as empty", err);
                SeenSet::new()
            }
        }
    }

    /// Replaces the file atomically: the new content is written to a temporary
    /// file in the same directory and renamed over the old one.
    pub fn save(&self, seen: &SeenSet) -> Result<(), AppError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        std::fs::create_dir_all(dir).map_err(|e| self.persistence_error("create directory", e))?;

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        seen.serialize(&mut ser)?;
        buf.push(b'\n');

        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| self.persistence_error("create temporary file", e))?;
        tmp.write_all(&buf)
            .map_err(|e| self.persistence_error("write", e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| self.persistence_error("sync", e))?;
        tmp.persist(&self.path)
            .map_err(|e| self.persistence_error("replace", e.error))?;

        tracing::info!("Successfully saved {} ad IDs to {}", seen.len(), self.path.display());
        Ok(())
    }

    fn persistence_error(&self, action: &str, err: std::io::Error) -> AppError {
        AppError::Persistence(format!("failed to {} {}: {}", action, self.path.display(), err))
    }
}
