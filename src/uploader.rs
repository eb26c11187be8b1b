// src/uploader.rs
//
// Folder-to-container upload engine. One scan pass feeds both the chunk
// count and the work list; each chunk fans out into spawned per-file
// upload tasks that are awaited against an optional deadline. Per-file
// failures are recorded and the batch keeps going; anything outside the
// per-file flow aborts the whole operation.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use tracing::{debug, error, info};

use crate::azure_client::AzureSession;
use crate::chunker::Chunked;
use crate::config::{RetryPolicy, UploadConfig};
use crate::object_store::{BlobContainer, StoreError};
use crate::progress::UploadProgress;
use crate::scanner::scan_tree;

/// One pending unit of work, handed to the scheduler on launch.
#[derive(Debug, Clone)]
pub struct UploadTask {
    pub src: PathBuf,
    /// Container-relative destination name, forward-slash normalized
    pub dst_name: String,
    pub overwrite: bool,
    pub max_concurrency: usize,
}

/// Successful outcome of one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub name: String,
    pub source: PathBuf,
}

/// Recorded per-file failure; the batch continues past these.
#[derive(Debug)]
pub struct UploadFailure {
    pub source: PathBuf,
    pub dst_name: String,
    pub error: String,
}

/// Aggregate result of a folder upload.
#[derive(Debug, Default)]
pub struct UploadReport {
    pub uploaded: usize,
    pub chunks: usize,
    pub failures: Vec<UploadFailure>,
}

impl UploadReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Join `prefix` and a relative path into a forward-slash blob name.
fn join_blob_path(prefix: &str, rel: &Path) -> String {
    let mut name = prefix.trim_matches('/').to_string();
    for comp in rel.components() {
        if !name.is_empty() {
            name.push('/');
        }
        name.push_str(&comp.as_os_str().to_string_lossy());
    }
    name
}

/// Upload a single local file to the container.
///
/// The destination name defaults to the source file's base name; a name
/// that is empty after trimming is a fatal precondition failure. With
/// `overwrite == false` an existing destination surfaces as
/// `StoreError::AlreadyExists`.
pub async fn upload_blob(
    container: &dyn BlobContainer,
    src: &Path,
    dst_name: Option<&str>,
    overwrite: bool,
    max_concurrency: usize,
) -> Result<UploadReceipt> {
    let name = match dst_name {
        Some(n) => n.to_string(),
        None => src
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };
    ensure!(
        !name.trim().is_empty(),
        "invalid destination blob name {name:?} for {}",
        src.display()
    );

    container.put_file(src, &name, overwrite, max_concurrency).await?;
    debug!("{} was uploaded as {}", src.display(), name);
    Ok(UploadReceipt { name, source: src.to_path_buf() })
}

/// Run one task, retrying transient failures per the policy. Conflicts
/// are never retried; with overwrite off a retry cannot succeed.
async fn run_task(
    container: Arc<dyn BlobContainer>,
    task: UploadTask,
    retry: Option<RetryPolicy>,
) -> Result<UploadReceipt> {
    let (attempts, mut backoff) = match retry {
        Some(policy) => (policy.attempts.max(1), policy.backoff),
        None => (1, Duration::ZERO),
    };

    let mut attempt = 1;
    loop {
        match container
            .put_file(&task.src, &task.dst_name, task.overwrite, task.max_concurrency)
            .await
        {
            Ok(()) => {
                return Ok(UploadReceipt {
                    name: task.dst_name,
                    source: task.src,
                })
            }
            Err(err) if attempt < attempts && err.downcast_ref::<StoreError>().is_none() => {
                debug!(
                    "attempt {attempt} of {attempts} for {} failed: {err:#}",
                    task.src.display()
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Upload an entire local directory tree under a destination prefix.
///
/// The prefix is `dst_prefix` when given, else the folder's base name;
/// every file lands under `prefix/relative/path`. Files are uploaded in
/// chunks of `cfg.chunk_size`; within a chunk all uploads run
/// concurrently and the chunk completes when every task has resolved or
/// the optional deadline has aborted the stragglers. The progress bar,
/// when supplied, advances once per chunk.
pub async fn upload_folder(
    container: Arc<dyn BlobContainer>,
    src_folder: &Path,
    dst_prefix: Option<&str>,
    cfg: &UploadConfig,
    progress: Option<&UploadProgress>,
) -> Result<UploadReport> {
    // Preconditions, checked before any I/O is issued.
    ensure!(
        !src_folder.as_os_str().is_empty() && src_folder.as_os_str().len() > 1,
        "src_folder={} is invalid",
        src_folder.display()
    );
    ensure!(
        src_folder.is_absolute(),
        "src_folder={} is not an absolute path",
        src_folder.display()
    );
    ensure!(
        src_folder.parent().is_some(),
        "src_folder={} is the filesystem root",
        src_folder.display()
    );
    ensure!(
        src_folder.exists(),
        "src_folder={} does not exist",
        src_folder.display()
    );
    ensure!(
        src_folder.is_dir(),
        "src_folder={} is not a directory",
        src_folder.display()
    );

    let result = upload_folder_inner(&container, src_folder, dst_prefix, cfg, progress).await;
    if let Err(err) = &result {
        error!(
            "failed to upload {} to {}: {err:#}",
            src_folder.display(),
            container.url()
        );
    }
    result
}

async fn upload_folder_inner(
    container: &Arc<dyn BlobContainer>,
    src_folder: &Path,
    dst_prefix: Option<&str>,
    cfg: &UploadConfig,
    progress: Option<&UploadProgress>,
) -> Result<UploadReport> {
    let prefix = match dst_prefix {
        Some(p) => {
            let trimmed = p.trim_matches('/');
            ensure!(!trimmed.is_empty(), "invalid destination prefix {p:?}");
            trimmed.to_string()
        }
        None => src_folder
            .file_name()
            .with_context(|| format!("cannot derive a prefix from {}", src_folder.display()))?
            .to_string_lossy()
            .into_owned(),
    };

    // One scan pass feeds the chunk count, the progress total and the
    // work list alike.
    let files = scan_tree(src_folder).collect::<Result<Vec<_>>>()?;
    let total_chunks = files.len().div_ceil(cfg.chunk_size) as u64;

    let owned_hidden;
    let progress = match progress {
        Some(p) => p,
        None => {
            owned_hidden = UploadProgress::hidden(total_chunks);
            &owned_hidden
        }
    };
    progress.set_total(total_chunks);

    info!(
        "uploading {} file(s) from {} to {} in {} chunk(s)",
        files.len(),
        src_folder.display(),
        container.url(),
        total_chunks
    );

    let mut report = UploadReport::default();

    for chunk in Chunked::new(files.into_iter(), cfg.chunk_size) {
        tokio::time::sleep(cfg.throttle).await;

        let mut handles = Vec::with_capacity(chunk.len());
        for entry in chunk {
            if entry.is_dir || !entry.path.is_file() {
                continue;
            }
            let rel = entry.path.strip_prefix(src_folder).with_context(|| {
                format!("{} escaped {}", entry.path.display(), src_folder.display())
            })?;
            let dst_name = join_blob_path(&prefix, rel);
            let task = UploadTask {
                src: entry.path.clone(),
                dst_name: dst_name.clone(),
                overwrite: cfg.overwrite,
                max_concurrency: cfg.max_concurrency,
            };
            debug!("queueing upload of {} as {}", entry.path.display(), dst_name);
            let handle = tokio::spawn(run_task(Arc::clone(container), task, cfg.retry));
            handles.push((handle, entry.path, dst_name));
        }

        // Await the whole chunk; once the deadline elapses the remaining
        // tasks are aborted rather than awaited to completion.
        let deadline = cfg.timeout.map(|t| tokio::time::Instant::now() + t);
        for (mut handle, src, dst_name) in handles {
            let joined = match deadline {
                Some(at) => match tokio::time::timeout_at(at, &mut handle).await {
                    Ok(joined) => joined,
                    Err(_elapsed) => {
                        handle.abort();
                        handle.await
                    }
                },
                None => handle.await,
            };

            match joined {
                Ok(Ok(receipt)) => {
                    debug!("{} was uploaded as {}", receipt.source.display(), receipt.name);
                    report.uploaded += 1;
                }
                Ok(Err(err)) => {
                    error!("{dst_name} was not uploaded successfully");
                    error!("{err:#}");
                    report.failures.push(UploadFailure {
                        source: src,
                        dst_name,
                        error: format!("{err:#}"),
                    });
                }
                Err(join_err) if join_err.is_cancelled() => {
                    error!(
                        "uploading {} to {} was aborted at the chunk deadline",
                        src.display(),
                        container.url()
                    );
                    report.failures.push(UploadFailure {
                        source: src,
                        dst_name,
                        error: "aborted at the chunk deadline".to_string(),
                    });
                }
                Err(join_err) => {
                    // a panicked task is systemic, not a per-file failure
                    return Err(anyhow::Error::new(join_err)
                        .context(format!("upload task for {} panicked", src.display())));
                }
            }
        }

        progress.chunk_completed();
        report.chunks += 1;
    }

    info!(
        "finished {}: {} uploaded, {} failed across {} chunk(s)",
        src_folder.display(),
        report.uploaded,
        report.failures.len(),
        report.chunks
    );
    Ok(report)
}

/// Upload a freshly built zarr pyramid folder into a SAS container.
///
/// Opens one session for the duration of the call and overwrites any
/// blobs left behind by a previous run, so re-running after a partial
/// failure converges on the same object set.
pub async fn upload_pyramid(
    sas_url: &str,
    src_folder: &Path,
    dst_prefix: Option<&str>,
    timeout: Option<Duration>,
) -> Result<UploadReport> {
    let session = Arc::new(AzureSession::from_sas_url(sas_url)?);
    let cfg = UploadConfig {
        overwrite: true,
        timeout,
        ..UploadConfig::default()
    };
    upload_folder(session, src_folder, dst_prefix, &cfg, None).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_paths_are_forward_slash_joined() {
        assert_eq!(
            join_blob_path("zarr/Kenya", Path::new("0/.zarray")),
            "zarr/Kenya/0/.zarray"
        );
        assert_eq!(join_blob_path("/p/", Path::new("a")), "p/a");
        assert_eq!(join_blob_path("p", Path::new("a b.tif")), "p/a b.tif");
    }
}
