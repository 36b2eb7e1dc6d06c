use std::{path::PathBuf, sync::atomic::{AtomicUsize, Ordering}};

use ahash::AHashMap;
use anyhow::{Context, Result};
use bytes::Bytes;

/// Read access to published daily datasets by resource key.
pub trait DatasetSource: Send + Sync {
    fn fetch(&self, key: &str) -> Result<Bytes>;

    /// Where `key` is read from, for logs and notices.
    fn locate(&self, key: &str) -> String;
}

/// Datasets served by the public object store over HTTP.
#[cfg(feature = "download")]
pub struct HttpSource {
    base_url: String,
    client: reqwest::blocking::Client,
}

#[cfg(feature = "download")]
impl HttpSource {
    pub fn new(base_url: impl Into<String>, timeout: Option<std::time::Duration>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { base_url, client: crate::common::http_client(timeout)? })
    }
}

#[cfg(feature = "download")]
impl DatasetSource for HttpSource {
    fn fetch(&self, key: &str) -> Result<Bytes> {
        crate::common::download_bytes(&self.client, &self.locate(key))
    }

    fn locate(&self, key: &str) -> String { format!("{}/{key}", self.base_url) }
}

/// Datasets mirrored into a local directory under their resource keys.
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }
}

impl DatasetSource for DirSource {
    fn fetch(&self, key: &str) -> Result<Bytes> {
        let path = self.root.join(key);
        let bytes = std::fs::read(&path)
            .with_context(|| format!("[source::DirSource] Failed to read {}", path.display()))?;
        Ok(Bytes::from(bytes))
    }

    fn locate(&self, key: &str) -> String { self.root.join(key).display().to_string() }
}

/// In-memory datasets. Counts fetches so callers can observe cache behaviour.
#[derive(Default)]
pub struct MemSource {
    files: AHashMap<String, Bytes>,
    fetches: AtomicUsize,
}

impl MemSource {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, key: impl Into<String>, bytes: impl Into<Bytes>) {
        self.files.insert(key.into(), bytes.into());
    }

    /// Number of `fetch` calls so far, successful or not.
    pub fn fetch_count(&self) -> usize { self.fetches.load(Ordering::Relaxed) }
}

impl DatasetSource for MemSource {
    fn fetch(&self, key: &str) -> Result<Bytes> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        self.files.get(key).cloned()
            .with_context(|| format!("[source::MemSource] No dataset named {key}"))
    }

    fn locate(&self, key: &str) -> String { format!("mem://{key}") }
}

impl<S: DatasetSource + ?Sized> DatasetSource for std::sync::Arc<S> {
    fn fetch(&self, key: &str) -> Result<Bytes> { (**self).fetch(key) }

    fn locate(&self, key: &str) -> String { (**self).locate(key) }
}

impl<S: DatasetSource + ?Sized> DatasetSource for Box<S> {
    fn fetch(&self, key: &str) -> Result<Bytes> { (**self).fetch(key) }

    fn locate(&self, key: &str) -> String { (**self).locate(key) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dir_source_reads_by_key() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.geoparquet"), b"PAR1").unwrap();

        let source = DirSource::new(dir.path());
        assert_eq!(source.fetch("a.geoparquet").unwrap(), Bytes::from_static(b"PAR1"));
        assert!(source.fetch("b.geoparquet").is_err());
    }

    #[test]
    fn mem_source_counts_failed_fetches_too() {
        let mut source = MemSource::new();
        source.insert("k", Bytes::from_static(b"x"));
        assert!(source.fetch("k").is_ok());
        assert!(source.fetch("missing").is_err());
        assert_eq!(source.fetch_count(), 2);
    }
}
