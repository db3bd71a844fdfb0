//! Remote template download.
//!
//! One small wrapper over ureq with explicit connect and read timeouts.
//! Failures surface as [`DownloadError`] and are never retried.

use std::time::Duration;
use thiserror::Error;
use url::Url;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_secs(30);
const OVERALL_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors raised while fetching a remote template.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The URL itself does not parse.
    #[error("invalid template URL '{url}': {source}")]
    InvalidUrl {
        /// The offending URL text.
        url: String,
        /// Parse failure detail.
        #[source]
        source: url::ParseError,
    },

    /// The request failed or timed out.
    #[error("download of '{url}' failed: {source}")]
    Transport {
        /// The requested URL.
        url: String,
        /// Transport failure detail.
        #[source]
        source: Box<ureq::Error>,
    },

    /// The response body could not be read as text.
    #[error("reading response from '{url}' failed: {source}")]
    Read {
        /// The requested URL.
        url: String,
        /// Read failure detail.
        #[source]
        source: std::io::Error,
    },
}

/// Fetch the template at `url` as text.
///
/// # Errors
///
/// Returns a [`DownloadError`] on an unparsable URL, a transport failure,
/// a timeout, or an unreadable response body.
pub fn fetch_text(url: &str) -> Result<String, DownloadError> {
    let parsed = Url::parse(url).map_err(|source| DownloadError::InvalidUrl {
        url: url.to_owned(),
        source,
    })?;
    let agent = ureq::AgentBuilder::new()
        .timeout_connect(CONNECT_TIMEOUT)
        .timeout_read(READ_TIMEOUT)
        .timeout(OVERALL_TIMEOUT)
        .build();
    tracing::debug!(url = %parsed, "fetching template");
    let response = agent
        .get(parsed.as_str())
        .call()
        .map_err(|source| DownloadError::Transport {
            url: parsed.to_string(),
            source: Box::new(source),
        })?;
    response
        .into_string()
        .map_err(|source| DownloadError::Read {
            url: parsed.to_string(),
            source,
        })
}
