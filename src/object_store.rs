// src/object_store.rs
//
// Pluggable destination-container abstraction with consistent URL schemes.
// Supported destinations: a SAS container URL (https://…blob.core.windows.net/…?sig=…)
// and a local directory (file://) used for dry runs and tests.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::azure_client::AzureSession;
use crate::file_store::FileSystemContainer;

/// Error classes callers care about distinguishing from generic transport
/// failures. Carried inside `anyhow::Error`; recover with `downcast_ref`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("blob {0:?} already exists in the destination container")]
    AlreadyExists(String),
}

/// One destination container, live for the duration of a single upload or
/// listing operation. Implementations release their underlying resources
/// on drop, on every exit path.
#[async_trait]
pub trait BlobContainer: Send + Sync {
    /// Container URL suitable for logs (never includes credentials).
    fn url(&self) -> String;

    /// Store `data` under `name`. Fails with `StoreError::AlreadyExists`
    /// when the blob exists and `overwrite` is false.
    async fn put(&self, name: &str, data: Bytes, overwrite: bool) -> Result<()>;

    /// Upload one local file under `name`. `max_concurrency` bounds the
    /// parallel block transfers used once the file crosses the
    /// large-blob threshold; small files go up in a single request.
    async fn put_file(
        &self,
        src: &Path,
        name: &str,
        overwrite: bool,
        max_concurrency: usize,
    ) -> Result<()>;

    /// Names of all blobs, optionally restricted to a prefix, sorted.
    async fn list(&self, prefix: Option<&str>) -> Result<Vec<String>>;

    async fn exists(&self, name: &str) -> Result<bool>;

    async fn delete(&self, name: &str) -> Result<()>;
}

/// A minimal scheme enum so we can route destination URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Azure,
    File,
    Unknown,
}

/// Best-effort scheme inference from a destination URL.
pub fn infer_scheme(url: &str) -> Scheme {
    if url.contains(".blob.core.windows.net/") {
        Scheme::Azure
    } else if url.starts_with("file://") {
        Scheme::File
    } else {
        Scheme::Unknown
    }
}

/// Convenience factory that picks a backend from a destination URL.
pub fn container_for_url(url: &str) -> Result<Arc<dyn BlobContainer>> {
    match infer_scheme(url) {
        Scheme::Azure => Ok(Arc::new(AzureSession::from_sas_url(url)?)),
        Scheme::File => {
            let root = url.trim_start_matches("file://");
            if root.is_empty() {
                bail!("file:// destination is missing a path");
            }
            Ok(Arc::new(FileSystemContainer::new(Path::new(root))?))
        }
        Scheme::Unknown => bail!(
            "unable to infer a backend from {url}. Supported: a SAS container URL or file:///path/"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_inference() {
        assert_eq!(
            infer_scheme("https://a.blob.core.windows.net/c?sig=x"),
            Scheme::Azure
        );
        assert_eq!(infer_scheme("file:///tmp/out"), Scheme::File);
        assert_eq!(infer_scheme("s3://bucket/key"), Scheme::Unknown);
    }

    #[test]
    fn factory_rejects_unknown_and_empty() {
        assert!(container_for_url("gopher://x").is_err());
        assert!(container_for_url("file://").is_err());
    }
}
