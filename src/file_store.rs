// src/file_store.rs
//
// FileSystemContainer: the BlobContainer interface over a local directory.
// Serves file:// destinations and doubles as the offline stand-in for a
// real container in tests.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tracing::debug;

use crate::object_store::{BlobContainer, StoreError};
use crate::scanner::scan_tree;

pub struct FileSystemContainer {
    root: PathBuf,
}

impl FileSystemContainer {
    /// Open (creating if needed) a directory acting as the container.
    pub fn new(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root)
            .with_context(|| format!("cannot create container directory {}", root.display()))?;
        Ok(Self { root: root.to_path_buf() })
    }

    /// Blob names are container-relative with forward slashes.
    fn blob_path(&self, name: &str) -> PathBuf {
        let mut path = self.root.clone();
        for part in name.split('/').filter(|p| !p.is_empty()) {
            path.push(part);
        }
        path
    }

    async fn guard_overwrite(&self, name: &str, overwrite: bool) -> Result<()> {
        if !overwrite && self.blob_path(name).exists() {
            return Err(StoreError::AlreadyExists(name.to_string()).into());
        }
        Ok(())
    }
}

#[async_trait]
impl BlobContainer for FileSystemContainer {
    fn url(&self) -> String {
        format!("file://{}", self.root.display())
    }

    async fn put(&self, name: &str, data: Bytes, overwrite: bool) -> Result<()> {
        self.guard_overwrite(name, overwrite).await?;
        let dst = self.blob_path(name);
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&dst, &data)
            .await
            .with_context(|| format!("writing {}", dst.display()))?;
        debug!("stored {} bytes as {}", data.len(), name);
        Ok(())
    }

    async fn put_file(
        &self,
        src: &Path,
        name: &str,
        overwrite: bool,
        _max_concurrency: usize,
    ) -> Result<()> {
        self.guard_overwrite(name, overwrite).await?;
        let dst = self.blob_path(name);
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::copy(src, &dst)
            .await
            .with_context(|| format!("copying {} to {}", src.display(), dst.display()))?;
        Ok(())
    }

    async fn list(&self, prefix: Option<&str>) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in scan_tree(&self.root) {
            let entry = entry?;
            let rel = entry
                .path
                .strip_prefix(&self.root)
                .expect("scanned path is under the container root");
            let name = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if prefix.map_or(true, |p| name.starts_with(p)) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.blob_path(name).exists())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let path = self.blob_path(name);
        fs::remove_file(&path)
            .await
            .with_context(|| format!("deleting {}", path.display()))
    }
}
