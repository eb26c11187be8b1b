// src/azure_client.rs
//
// AzureSession: one SAS-credentialed container connection, scoped to a
// single top-level operation. Small blobs go up in one request; blobs over
// the large-blob threshold are staged as blocks with bounded concurrency
// and committed in order.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use azure_storage::StorageCredentials;
use azure_storage_blobs::prelude::{BlobBlockType, BlockList, ClientBuilder, ContainerClient};
use bytes::Bytes;
use futures::stream::{FuturesUnordered, StreamExt, TryStreamExt};
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::constants::{AZURE_BLOCK_SIZE, LARGE_BLOB_THRESHOLD};
use crate::object_store::{BlobContainer, StoreError};
use crate::sas::SasUrl;

/// High-level client bound to one container through a SAS URL.
pub struct AzureSession {
    client: Arc<ContainerClient>,
    sas: SasUrl,
}

impl AzureSession {
    /// Build a session from a full SAS container URL.
    pub fn from_sas_url(raw: &str) -> Result<Self> {
        Self::from_sas(SasUrl::parse(raw)?)
    }

    pub fn from_sas(sas: SasUrl) -> Result<Self> {
        let credentials = StorageCredentials::sas_token(sas.token.clone())
            .context("SAS URL carries an unusable signature token")?;
        let client = ClientBuilder::new(sas.account.clone(), credentials)
            .container_client(sas.container.clone());
        Ok(Self { client: Arc::new(client), sas })
    }

    pub fn sas(&self) -> &SasUrl {
        &self.sas
    }

    pub fn container_name(&self) -> &str {
        &self.sas.container
    }

    async fn guard_overwrite(&self, name: &str, overwrite: bool) -> Result<()> {
        if !overwrite && self.exists(name).await? {
            return Err(StoreError::AlreadyExists(name.to_string()).into());
        }
        Ok(())
    }

    /// Stage `src` as fixed-size blocks, at most `max_concurrency` in
    /// flight, then commit the block list in file order.
    async fn put_file_blocks(&self, src: &Path, name: &str, max_concurrency: usize) -> Result<()> {
        let file = tokio::fs::File::open(src)
            .await
            .with_context(|| format!("opening {}", src.display()))?;
        let mut reader = tokio::io::BufReader::new(file);

        let mut in_flight = FuturesUnordered::new();
        let mut block_ids: Vec<String> = Vec::new();
        let mut next_idx: u64 = 0;

        loop {
            let mut buf = vec![0u8; AZURE_BLOCK_SIZE];
            let mut filled = 0;
            while filled < buf.len() {
                let n = reader.read(&mut buf[filled..]).await?;
                if n == 0 {
                    break;
                }
                filled += n;
            }
            if filled == 0 {
                break;
            }
            buf.truncate(filled);

            // fixed-width ids keep the commit list stable regardless of
            // completion order
            let block_id = azure_core::base64::encode(format!("{next_idx:08}").as_bytes());
            block_ids.push(block_id.clone());

            // backpressure
            if in_flight.len() >= max_concurrency.max(1) {
                if let Some(res) = in_flight.next().await {
                    res?;
                }
            }

            let client = Arc::clone(&self.client);
            let blob_name = name.to_string();
            in_flight.push(async move {
                client
                    .blob_client(blob_name)
                    .put_block(block_id, buf)
                    .await
                    .map(|_| ())
                    .map_err(anyhow::Error::from)
            });

            next_idx += 1;
        }

        while let Some(res) = in_flight.next().await {
            res?;
        }

        let block_list = BlockList {
            blocks: block_ids.into_iter().map(BlobBlockType::new_uncommitted).collect(),
        };
        self.client
            .blob_client(name.to_string())
            .put_block_list(block_list)
            .await
            .with_context(|| format!("committing block list for {name}"))?;
        debug!("committed {next_idx} blocks for {name}");
        Ok(())
    }
}

#[async_trait]
impl BlobContainer for AzureSession {
    fn url(&self) -> String {
        self.sas.redacted()
    }

    async fn put(&self, name: &str, data: Bytes, overwrite: bool) -> Result<()> {
        self.guard_overwrite(name, overwrite).await?;
        self.client
            .blob_client(name.to_string())
            .put_block_blob(data.to_vec())
            .await
            .with_context(|| format!("uploading blob {name}"))?;
        Ok(())
    }

    async fn put_file(
        &self,
        src: &Path,
        name: &str,
        overwrite: bool,
        max_concurrency: usize,
    ) -> Result<()> {
        let meta = tokio::fs::metadata(src)
            .await
            .with_context(|| format!("reading metadata of {}", src.display()))?;
        self.guard_overwrite(name, overwrite).await?;

        if meta.len() > LARGE_BLOB_THRESHOLD {
            debug!(
                "{} is {} bytes, staging blocks (max {} in flight)",
                src.display(),
                meta.len(),
                max_concurrency
            );
            self.put_file_blocks(src, name, max_concurrency).await
        } else {
            let data = tokio::fs::read(src)
                .await
                .with_context(|| format!("reading {}", src.display()))?;
            self.client
                .blob_client(name.to_string())
                .put_block_blob(data)
                .await
                .with_context(|| format!("uploading blob {name}"))?;
            Ok(())
        }
    }

    async fn list(&self, prefix: Option<&str>) -> Result<Vec<String>> {
        let mut builder = self.client.list_blobs();
        if let Some(p) = prefix {
            if !p.is_empty() {
                builder = builder.prefix(p.to_string());
            }
        }

        let mut names = Vec::new();
        let mut stream = builder.into_stream();
        while let Some(page) = stream
            .try_next()
            .await
            .with_context(|| format!("listing blobs in {}", self.sas.redacted()))?
        {
            for blob in page.blobs.blobs() {
                names.push(blob.name.clone());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        self.client
            .blob_client(name.to_string())
            .exists()
            .await
            .with_context(|| format!("checking existence of {name}"))
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.client
            .blob_client(name.to_string())
            .delete()
            .await
            .with_context(|| format!("deleting {name}"))?;
        Ok(())
    }
}
