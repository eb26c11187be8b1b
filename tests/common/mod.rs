// tests/common/mod.rs
//
// Shared helpers: scratch-tree builders and BlobContainer doubles with
// injectable failure behavior.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;

use hrea_pipeline::{BlobContainer, FileSystemContainer};

/// Lay out `count` files under `root`, spread across nested directories,
/// with names that sort deterministically.
pub fn build_tree(root: &Path, count: usize) -> Vec<PathBuf> {
    let mut created = Vec::with_capacity(count);
    for i in 0..count {
        let rel = match i % 3 {
            0 => format!("level0/{i:04}.chunk"),
            1 => format!("level0/deep/{i:04}.chunk"),
            _ => format!("{i:04}.chunk"),
        };
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, format!("payload-{i}")).unwrap();
        created.push(path);
    }
    created
}

/// A container whose uploads never complete; exercises deadline handling.
pub struct StalledContainer;

#[async_trait]
impl BlobContainer for StalledContainer {
    fn url(&self) -> String {
        "stalled://container".to_string()
    }

    async fn put(&self, _name: &str, _data: Bytes, _overwrite: bool) -> Result<()> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }

    async fn put_file(
        &self,
        _src: &Path,
        _name: &str,
        _overwrite: bool,
        _max_concurrency: usize,
    ) -> Result<()> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }

    async fn list(&self, _prefix: Option<&str>) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn exists(&self, _name: &str) -> Result<bool> {
        Ok(false)
    }

    async fn delete(&self, _name: &str) -> Result<()> {
        Ok(())
    }
}

/// A container that panics on upload; exercises systemic-failure handling.
pub struct PanickingContainer;

#[async_trait]
impl BlobContainer for PanickingContainer {
    fn url(&self) -> String {
        "panicking://container".to_string()
    }

    async fn put(&self, _name: &str, _data: Bytes, _overwrite: bool) -> Result<()> {
        panic!("container connection lost");
    }

    async fn put_file(
        &self,
        _src: &Path,
        _name: &str,
        _overwrite: bool,
        _max_concurrency: usize,
    ) -> Result<()> {
        panic!("container connection lost");
    }

    async fn list(&self, _prefix: Option<&str>) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn exists(&self, _name: &str) -> Result<bool> {
        Ok(false)
    }

    async fn delete(&self, _name: &str) -> Result<()> {
        Ok(())
    }
}

/// A filesystem-backed container that fails the first `failures` upload
/// attempts of every blob with a transient error; exercises the retry
/// policy.
pub struct FlakyContainer {
    inner: FileSystemContainer,
    failures: u32,
    attempts: Mutex<HashMap<String, u32>>,
}

impl FlakyContainer {
    pub fn new(root: &Path, failures: u32) -> Result<Self> {
        Ok(Self {
            inner: FileSystemContainer::new(root)?,
            failures,
            attempts: Mutex::new(HashMap::new()),
        })
    }

    fn should_fail(&self, name: &str) -> bool {
        let mut attempts = self.attempts.lock().unwrap();
        let seen = attempts.entry(name.to_string()).or_insert(0);
        *seen += 1;
        *seen <= self.failures
    }
}

#[async_trait]
impl BlobContainer for FlakyContainer {
    fn url(&self) -> String {
        self.inner.url()
    }

    async fn put(&self, name: &str, data: Bytes, overwrite: bool) -> Result<()> {
        if self.should_fail(name) {
            return Err(anyhow!("transient: connection reset while uploading {name}"));
        }
        self.inner.put(name, data, overwrite).await
    }

    async fn put_file(
        &self,
        src: &Path,
        name: &str,
        overwrite: bool,
        max_concurrency: usize,
    ) -> Result<()> {
        if self.should_fail(name) {
            return Err(anyhow!("transient: connection reset while uploading {name}"));
        }
        self.inner.put_file(src, name, overwrite, max_concurrency).await
    }

    async fn list(&self, prefix: Option<&str>) -> Result<Vec<String>> {
        self.inner.list(prefix).await
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        self.inner.exists(name).await
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.inner.delete(name).await
    }
}
