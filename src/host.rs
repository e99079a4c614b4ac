//! Host name derivation for source URLs

use crate::error::Error as CrateError;
use thiserror::Error;
use url::Url;

/// Error type for host normalization
#[derive(Debug, Error)]
pub enum HostError {
    /// URL parsing error
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// The URL parsed but carries no host
    #[error("No host in URL: {0}")]
    MissingHost(String),
}

impl From<HostError> for CrateError {
    fn from(err: HostError) -> Self {
        CrateError::InvalidUrl(err.to_string())
    }
}

/// Derive the display host of a source URL
///
/// A host starting with `www` loses its first four characters, whatever the
/// fourth one is. `www.example.com` becomes `example.com`, while
/// `wwwx.example.com` becomes `.example.com`.
///
/// # Arguments
///
/// * `url` - Absolute URL of the source page
///
/// # Returns
///
/// The host with the `www` prefix cut off
pub fn normalize_host(url: &str) -> Result<String, HostError> {
    let parsed = Url::parse(url.trim())?;
    let host = parsed
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| HostError::MissingHost(url.to_string()))?;

    // Hosts are ASCII once the url crate has applied IDNA.
    let host = if host.starts_with("www") {
        host.get(4..).unwrap_or_default()
    } else {
        host
    };

    Ok(host.to_string())
}
