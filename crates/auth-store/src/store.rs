//! Document-oriented persistence over a filesystem root
//!
//! Every document is a JSON value addressed by a path relative to the store
//! root. Writes are atomic (temp file + rename) so a crash mid-write never
//! leaves a torn `info.json` or `tokens.json` behind, generalized to
//! arbitrary serializable values and arbitrary relative paths.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{Error, Result};

/// Filesystem-backed document store rooted at a single directory.
pub struct Store {
    root: PathBuf,
}

impl Store {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn absolute(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }

    /// Read the raw bytes at `path`. Missing files surface as `Error::NotFound`
    /// rather than collapsing to a default — callers that need to distinguish
    /// "absent" from "present but empty" use this directly.
    pub async fn read_raw(&self, path: impl AsRef<Path>) -> Result<Vec<u8>> {
        let full = self.absolute(path.as_ref());
        Ok(tokio::fs::read(&full).await?)
    }

    /// Return the parsed JSON document at `path`, or `default` if it does not exist.
    ///
    /// Missing-parent directories are not created on load.
    pub async fn load_document<T>(&self, path: impl AsRef<Path>, default: T) -> Result<T>
    where
        T: DeserializeOwned,
    {
        match self.read_raw(path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(Error::NotFound) => Ok(default),
            Err(e) => Err(e),
        }
    }

    /// Atomically replace the document at `path`, creating parent directories.
    pub async fn save_document<T>(&self, path: impl AsRef<Path>, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        let full = self.absolute(path.as_ref());
        let parent = full
            .parent()
            .ok_or_else(|| Error::Io("document path has no parent directory".into()))?;
        tokio::fs::create_dir_all(parent).await?;

        let json = serde_json::to_vec_pretty(value)?;
        let tmp_path = parent.join(format!(
            ".{}.tmp.{}",
            full.file_name().and_then(|n| n.to_str()).unwrap_or("doc"),
            std::process::id()
        ));

        tokio::fs::write(&tmp_path, &json).await?;
        tokio::fs::rename(&tmp_path, &full).await?;
        debug!(path = %full.display(), "saved document");
        Ok(())
    }

    /// Read a plain-text document, or `default` if it does not exist.
    /// Used for the `.access`/`.group`/`access.txt` rule files, which are
    /// line-oriented text rather than JSON.
    pub async fn load_text(&self, path: impl AsRef<Path>, default: String) -> Result<String> {
        match self.read_raw(path).await {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(Error::NotFound) => Ok(default),
            Err(e) => Err(e),
        }
    }

    /// Write a plain-text document atomically, creating parent directories.
    pub async fn save_text(&self, path: impl AsRef<Path>, contents: &str) -> Result<()> {
        let full = self.absolute(path.as_ref());
        let parent = full
            .parent()
            .ok_or_else(|| Error::Io("document path has no parent directory".into()))?;
        tokio::fs::create_dir_all(parent).await?;

        let tmp_path = parent.join(format!(
            ".{}.tmp.{}",
            full.file_name().and_then(|n| n.to_str()).unwrap_or("doc"),
            std::process::id()
        ));
        tokio::fs::write(&tmp_path, contents.as_bytes()).await?;
        tokio::fs::rename(&tmp_path, &full).await?;
        Ok(())
    }

    /// Remove the document at `path`. A missing file is a no-op.
    pub async fn drop_document(&self, path: impl AsRef<Path>) -> Result<()> {
        let full = self.absolute(path.as_ref());
        match tokio::fs::remove_file(&full).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Breadth-first enumeration of everything under `prefix`, relative to the root.
    ///
    /// Returns `(relative_path, is_file)` pairs. An absent `prefix` yields an
    /// empty walk rather than an error.
    pub async fn walk(&self, prefix: impl AsRef<Path>) -> Result<Vec<(PathBuf, bool)>> {
        let root_prefix = prefix.as_ref().to_path_buf();
        let full_prefix = self.absolute(&root_prefix);

        let mut results = Vec::new();
        let mut queue = VecDeque::new();
        queue.push_back(full_prefix.clone());

        while let Some(dir) = queue.pop_front() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let file_type = entry.file_type().await?;
                let relative = path
                    .strip_prefix(&self.root)
                    .unwrap_or(&path)
                    .to_path_buf();

                if file_type.is_dir() {
                    results.push((relative, false));
                    queue.push_back(path);
                } else {
                    results.push((relative, true));
                }
            }
        }

        Ok(results)
    }
}
