// src/raster.rs
//
// The seam toward the raster-processing collaborator: call-scoped access
// configuration for GDAL-based readers (instead of mutating the process
// environment) and the web-mercator zoom/resolution math used to plan a
// pyramid's coarsening levels. The warping, resampling and zarr encoding
// themselves live outside this crate.

use std::fmt;
use std::str::FromStr;

use anyhow::{bail, ensure, Context, Result};

use crate::constants::DEFAULT_TILE_SIZE;
use crate::sas::SasUrl;

/// WGS84 equatorial radius in meters.
const EARTH_RADIUS_M: f64 = 6_378_137.0;

fn initial_resolution(tile_size: u32) -> f64 {
    2.0 * std::f64::consts::PI * EARTH_RADIUS_M / f64::from(tile_size)
}

/// Ground resolution in meters/pixel at a web-mercator zoom level.
pub fn zoom_to_resolution(zoom: u32, tile_size: u32) -> f64 {
    initial_resolution(tile_size) / 2f64.powi(zoom as i32)
}

/// Fractional web-mercator zoom level for a ground resolution.
pub fn resolution_to_zoom(resolution_m: f64, tile_size: u32) -> f64 {
    (initial_resolution(tile_size) / resolution_m.abs()).log2()
}

/// One planned pyramid level: its zoom, its target resolution and the
/// integer coarsening factor relative to the native resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct PyramidLevel {
    pub zoom: u32,
    pub resolution_m: f64,
    pub coarsen_factor: u32,
}

/// Plan the coarsening levels for a raster with the given native
/// resolution, from zoom 0 down to (at most) `levels` levels. Planning
/// stops before the first level whose resolution is finer than native,
/// i.e. whose factor would drop below 1.
pub fn plan_levels(native_resolution_m: f64, levels: u32, tile_size: u32) -> Vec<PyramidLevel> {
    let mut planned = Vec::new();
    for zoom in 0..levels {
        let resolution_m = zoom_to_resolution(zoom, tile_size);
        let factor = resolution_m / native_resolution_m;
        if factor < 1.0 {
            break;
        }
        planned.push(PyramidLevel {
            zoom,
            resolution_m,
            coarsen_factor: factor.round() as u32,
        });
    }
    planned
}

/// A `major.minor[.patch]` GDAL version, as reported by the collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GdalVersion {
    pub major: u32,
    pub minor: u32,
}

impl FromStr for GdalVersion {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split('.');
        let major = parts
            .next()
            .and_then(|p| p.parse().ok())
            .with_context(|| format!("cannot parse GDAL version {s:?}"))?;
        let minor = parts
            .next()
            .and_then(|p| p.parse().ok())
            .with_context(|| format!("cannot parse GDAL version {s:?}"))?;
        Ok(Self { major, minor })
    }
}

impl fmt::Display for GdalVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Credentials a GDAL-based raster reader needs to open blobs in the
/// container directly. Scoped to the call: the caller applies the
/// rendered pairs to its own collaborator invocation, nothing touches
/// the process environment.
#[derive(Debug, Clone)]
pub struct RasterAccessConfig {
    pub account: String,
    pub sas_token: String,
}

impl RasterAccessConfig {
    pub fn from_sas(sas: &SasUrl) -> Self {
        Self {
            account: sas.account.clone(),
            sas_token: sas.token.clone(),
        }
    }

    /// Variable pairs for the given GDAL version. GDAL below 3 cannot
    /// read SAS-signed containers at all; 3.0/3.1 predate the SAS
    /// variables and are rejected rather than silently degraded.
    pub fn gdal_variables(&self, gdal: &GdalVersion) -> Result<Vec<(String, String)>> {
        ensure!(gdal.major >= 3, "unsupported GDAL version {gdal}");

        let mut vars = vec![("AZURE_STORAGE_ACCOUNT".to_string(), self.account.clone())];
        if gdal.major > 3 || gdal.minor >= 5 {
            vars.push(("AZURE_STORAGE_SAS_TOKEN".to_string(), self.sas_token.clone()));
        } else if gdal.minor >= 2 {
            vars.push(("AZURE_SAS".to_string(), self.sas_token.clone()));
        } else {
            bail!("GDAL {gdal} has no SAS token support; 3.2 or newer is required");
        }
        Ok(vars)
    }
}

/// `plan_levels` with the standard 256 px tile size.
pub fn plan_levels_default(native_resolution_m: f64, levels: u32) -> Vec<PyramidLevel> {
    plan_levels(native_resolution_m, levels, DEFAULT_TILE_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_zero_is_the_full_equator() {
        let res = zoom_to_resolution(0, 256);
        assert!((res - 156_543.033_928).abs() < 1e-3, "{res}");
        // each zoom level halves the resolution
        assert!((zoom_to_resolution(5, 256) - res / 32.0).abs() < 1e-9);
    }

    #[test]
    fn resolution_to_zoom_inverts_zoom_to_resolution() {
        for zoom in 0..12 {
            let res = zoom_to_resolution(zoom, 256);
            let back = resolution_to_zoom(res, 256);
            assert!((back - zoom as f64).abs() < 1e-9, "zoom {zoom} -> {back}");
        }
    }

    #[test]
    fn planning_stops_at_native_resolution() {
        // ~30 m native (HREA tiles): zooms 0..=12 stay coarser than native
        let levels = plan_levels_default(30.0, 15);
        assert_eq!(levels.len(), 13);
        assert_eq!(levels[0].zoom, 0);
        assert_eq!(levels.last().unwrap().zoom, 12);
        assert!(levels.iter().all(|l| l.coarsen_factor >= 1));
        // factors halve with each level
        assert_eq!(levels[0].coarsen_factor, 5218);
        assert_eq!(levels[12].coarsen_factor, 1);
    }

    #[test]
    fn gdal_version_parsing() {
        assert_eq!("3.7.1".parse::<GdalVersion>().unwrap(), GdalVersion { major: 3, minor: 7 });
        assert_eq!("3.2".parse::<GdalVersion>().unwrap(), GdalVersion { major: 3, minor: 2 });
        assert!("three".parse::<GdalVersion>().is_err());
        assert!("3".parse::<GdalVersion>().is_err());
    }

    #[test]
    fn sas_variables_depend_on_gdal_version() {
        let cfg = RasterAccessConfig {
            account: "undpacct01".to_string(),
            sas_token: "sv=1&sig=x".to_string(),
        };

        let modern = cfg.gdal_variables(&GdalVersion { major: 3, minor: 7 }).unwrap();
        assert!(modern.contains(&("AZURE_STORAGE_SAS_TOKEN".to_string(), "sv=1&sig=x".to_string())));

        let older = cfg.gdal_variables(&GdalVersion { major: 3, minor: 3 }).unwrap();
        assert!(older.contains(&("AZURE_SAS".to_string(), "sv=1&sig=x".to_string())));
        assert!(older.iter().all(|(k, _)| k != "AZURE_STORAGE_SAS_TOKEN"));

        assert!(cfg.gdal_variables(&GdalVersion { major: 2, minor: 4 }).is_err());
        assert!(cfg.gdal_variables(&GdalVersion { major: 3, minor: 1 }).is_err());
    }
}
