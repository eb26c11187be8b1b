// src/config.rs
//
// Runtime knobs for folder uploads.

use std::time::Duration;

use crate::constants::{
    DEFAULT_BLOCK_CONCURRENCY, DEFAULT_CHUNK_THROTTLE, DEFAULT_UPLOAD_CHUNK_SIZE,
};

/// Retry behavior for transient per-file failures.
///
/// Disabled by default; conflict errors are never retried regardless of
/// this policy.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts per file (1 means a single try, i.e. no retry)
    pub attempts: u32,
    /// Delay before the first retry; doubles after each failed attempt
    pub backoff: Duration,
}

/// Parameters used by `upload_folder` / `upload_blob`.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Overwrite existing destination blobs instead of failing with a conflict
    pub overwrite: bool,
    /// Concurrent block uploads per blob once it crosses the large-blob threshold
    pub max_concurrency: usize,
    /// Files launched concurrently per chunk
    pub chunk_size: usize,
    /// Per-chunk deadline; pending uploads are aborted once it elapses
    pub timeout: Option<Duration>,
    /// Optional retry policy for transient per-file failures
    pub retry: Option<RetryPolicy>,
    /// Pause before launching each chunk
    pub throttle: Duration,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            overwrite: false,
            max_concurrency: DEFAULT_BLOCK_CONCURRENCY,
            chunk_size: DEFAULT_UPLOAD_CHUNK_SIZE,
            timeout: None,
            retry: None,
            throttle: DEFAULT_CHUNK_THROTTLE,
        }
    }
}
