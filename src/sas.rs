// src/sas.rs
//
// Shared-access-signature container URLs, parsed into their typed parts.
// Everything that needs the account, the container name or the token —
// the session, the catalog URL forms, the raster access config — starts here.

use std::fmt;

use anyhow::{bail, Context, Result};
use url::Url;

/// A parsed SAS container URL:
/// `https://{account}.blob.core.windows.net/{container}?{token}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SasUrl {
    /// Storage account name, e.g. `undpngddlsgeohubdev01`
    pub account: String,
    /// Container name (first and only path segment)
    pub container: String,
    /// Blob endpoint without path or query, e.g. `https://acct.blob.core.windows.net`
    pub endpoint: String,
    /// The signature query string, without the leading `?`
    pub token: String,
}

impl SasUrl {
    pub fn parse(raw: &str) -> Result<Self> {
        let parsed = Url::parse(raw).with_context(|| format!("invalid SAS URL {raw:?}"))?;
        match parsed.scheme() {
            "http" | "https" => {}
            other => bail!("SAS URL must be http(s), got scheme {other:?}"),
        }

        let host = parsed
            .host_str()
            .context("SAS URL has no host")?
            .to_string();
        let account = host
            .strip_suffix(".blob.core.windows.net")
            .with_context(|| format!("expected an {{account}}.blob.core.windows.net host, got {host:?}"))?
            .to_string();
        if account.is_empty() {
            bail!("SAS URL host {host:?} has an empty account name");
        }

        let container = parsed
            .path()
            .trim_matches('/')
            .to_string();
        if container.is_empty() || container.contains('/') {
            bail!("SAS URL path {:?} must name exactly one container", parsed.path());
        }

        let token = parsed
            .query()
            .context("SAS URL carries no signature query")?
            .to_string();

        let endpoint = format!("{}://{}", parsed.scheme(), host);
        Ok(Self { account, container, endpoint, token })
    }

    /// The container URL without its signature, safe for logs.
    pub fn redacted(&self) -> String {
        format!("{}/{}", self.endpoint, self.container)
    }

    /// Full signed URL for one blob inside the container.
    pub fn signed_blob_url(&self, blob_name: &str) -> String {
        format!("{}/{}/{}?{}", self.endpoint, self.container, blob_name, self.token)
    }
}

impl fmt::Display for SasUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // never print the token
        write!(f, "{}", self.redacted())
    }
}
