// src/lib.rs
//
// Crate root — module roster plus the public re-exports.

pub mod azure_client;
pub mod catalog;
pub mod chunker;
pub mod config;
pub mod constants;
pub mod file_store;
pub mod object_store;
pub mod progress;
pub mod raster;
pub mod sas;
pub mod scanner;
pub mod uploader;

// Destination containers
pub use object_store::{container_for_url, infer_scheme, BlobContainer, Scheme, StoreError};
pub use azure_client::AzureSession;
pub use file_store::FileSystemContainer;

// Upload engine
pub use config::{RetryPolicy, UploadConfig};
pub use progress::UploadProgress;
pub use uploader::{
    upload_blob, upload_folder, upload_pyramid, UploadFailure, UploadReceipt, UploadReport,
    UploadTask,
};

// Scanning & batching
pub use chunker::Chunked;
pub use scanner::{scan_tree, FileEntry};

// SAS URLs, catalog, raster collaborator seam
pub use catalog::{gdal_vsiaz_path, list_cogs, signed_url, CogQuery};
pub use raster::{
    plan_levels, plan_levels_default, resolution_to_zoom, zoom_to_resolution, GdalVersion,
    PyramidLevel, RasterAccessConfig,
};
pub use sas::SasUrl;
