// src/catalog.rs
//
// Discovery of HREA COG blobs already present in the container, filtered
// the way the datasets are named: country, acquisition year and variable
// name all appear as substrings of the blob name
// (e.g. `Kenya_set_lightscore_sy_2013.tif`).

use anyhow::Result;

use crate::object_store::BlobContainer;
use crate::sas::SasUrl;

/// Substring filters for blob names; unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct CogQuery {
    pub country: Option<String>,
    pub year: Option<u16>,
    pub variable: Option<String>,
}

impl CogQuery {
    pub fn matches(&self, blob_name: &str) -> bool {
        if let Some(country) = &self.country {
            if !blob_name.contains(country.as_str()) {
                return false;
            }
        }
        if let Some(year) = self.year {
            if !blob_name.contains(&year.to_string()) {
                return false;
            }
        }
        if let Some(variable) = &self.variable {
            if !blob_name.contains(variable.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Enumerate the container and keep the blob names matching `query`,
/// in the container's sorted listing order.
pub async fn list_cogs(container: &dyn BlobContainer, query: &CogQuery) -> Result<Vec<String>> {
    let names = container.list(None).await?;
    Ok(names.into_iter().filter(|name| query.matches(name)).collect())
}

/// GDAL streaming-VSI path for a blob, readable once the raster access
/// variables of `crate::raster::RasterAccessConfig` are applied.
pub fn gdal_vsiaz_path(container_name: &str, blob_name: &str) -> String {
    format!("/vsiaz_streaming/{container_name}/{blob_name}")
}

/// Fully signed HTTPS URL for a blob (for tools that take plain URLs).
pub fn signed_url(sas: &SasUrl, blob_name: &str) -> String {
    sas.signed_blob_url(blob_name)
}
