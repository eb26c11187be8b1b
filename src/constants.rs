// src/constants.rs
//
// Centralized constants for hrea-pipeline to avoid hardcoded values throughout the codebase

use std::time::Duration;

/// Number of upload tasks launched per chunk (bounds in-flight uploads)
pub const DEFAULT_UPLOAD_CHUNK_SIZE: usize = 100;

/// Blobs larger than this are uploaded as staged blocks instead of a single PUT (64 MB)
pub const LARGE_BLOB_THRESHOLD: u64 = 64 * 1024 * 1024;

/// Block size for staged (multipart) blob uploads (16 MB)
pub const AZURE_BLOCK_SIZE: usize = 16 * 1024 * 1024;

/// Default number of concurrent block uploads per large blob
pub const DEFAULT_BLOCK_CONCURRENCY: usize = 8;

/// Pause inserted before each chunk of uploads is launched (container-side throttling)
pub const DEFAULT_CHUNK_THROTTLE: Duration = Duration::from_secs(1);

/// Environment variable consulted when no SAS URL is given on the command line
pub const SAS_URL_ENV_VAR: &str = "HREA_SAS_URL";

/// Web-mercator tile edge in pixels, used by the zoom/resolution math
pub const DEFAULT_TILE_SIZE: u32 = 256;
