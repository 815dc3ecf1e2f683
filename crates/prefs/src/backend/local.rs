//! Local filesystem preference backend.
//!
//! Values are kept in a single JSON object on disk and accessed via
//! `tokio::fs` for async I/O.

use crate::backend::{PreferenceBackend, Values};
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use std::path::PathBuf;
use tokio::fs;

/// JSON file preference backend.
///
/// # Examples
///
/// ```no_run
/// use flightsearch_prefs::backend::LocalBackend;
///
/// let backend = LocalBackend::new("local", "/home/user/.local/share/flightsearch/preferences.json");
/// ```
#[derive(Debug, Clone)]
pub struct LocalBackend {
    name: String,
    path: PathBuf,
}
impl LocalBackend {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self { name: name.into(), path: path.into() }
    }

    /// Sibling file the new contents are written to before being renamed
    /// over the real file.
    fn staging_path(&self) -> PathBuf {
        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        PathBuf::from(staging)
    }
}

#[async_trait]
impl PreferenceBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read(&self) -> Result<Values> {
        let data = match fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Values::new()),
            Err(e) => exn::bail!(ErrorKind::Io(e)),
        };
        serde_json::from_slice(&data).or_raise(|| ErrorKind::InvalidData(self.path.clone()))
    }

    async fn write(&self, values: &Values) -> Result<()> {
        let data = serde_json::to_vec_pretty(values).or_raise(|| ErrorKind::InvalidData(self.path.clone()))?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await.map_err(ErrorKind::Io)?;
        }
        // Write-then-rename: a crash mid-write leaves the old file intact.
        let staging = self.staging_path();
        fs::write(&staging, &data).await.map_err(ErrorKind::Io)?;
        fs::rename(&staging, &self.path).await.map_err(ErrorKind::Io)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> Values {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[tokio::test]
    async fn test_missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("local", dir.path().join("prefs.json"));
        assert!(backend.read().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("local", dir.path().join("nested/dir/prefs.json"));
        backend.write(&values(&[("search_query", "LAX")])).await.unwrap();
        assert_eq!(backend.read().await.unwrap(), values(&[("search_query", "LAX")]));
        assert!(!backend.staging_path().exists(), "staging file is renamed away");
    }

    #[tokio::test]
    async fn test_write_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("local", dir.path().join("prefs.json"));
        backend.write(&values(&[("a", "1"), ("b", "2")])).await.unwrap();
        backend.write(&values(&[("a", "3")])).await.unwrap();
        assert_eq!(backend.read().await.unwrap(), values(&[("a", "3")]));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_invalid_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, b"{ not json").unwrap();
        let backend = LocalBackend::new("local", &path);
        let err = backend.read().await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidData(p) if p == &path));
    }

    #[tokio::test]
    async fn test_non_string_values_are_invalid_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, br#"{"search_query": 42}"#).unwrap();
        let backend = LocalBackend::new("local", &path);
        assert!(backend.read().await.is_err());
    }

    #[tokio::test]
    async fn test_directory_in_place_of_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("local", dir.path());
        let err = backend.read().await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Io(_)));
    }
}
