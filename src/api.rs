// Upload client: a small blocking HTTP client that POSTs artifact bytes to
// the symbolication endpoint, keyed by identifier in the URL.

use std::fs;
use std::path::Path;

use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use url::Url;

use crate::error::{Error, Result};
use crate::identifier::Identifier;

/// Token in an upload template that is replaced by the identifier.
pub const PLACEHOLDER: &str = "SYMBOLICATION_ID";
const QUERY_KEY: &str = "symbolication_id";

/// Build the request URL for one artifact.
///
/// The first `SYMBOLICATION_ID` in the template is replaced by the
/// identifier. Without a placeholder, `symbolication_id=<id>` is appended
/// as a query parameter, reusing a trailing `?` or an existing query
/// string when there is one.
pub fn symbolication_url(template: &str, id: &Identifier) -> Result<Url> {
    let raw = if template.contains(PLACEHOLDER) {
        template.replacen(PLACEHOLDER, id.as_str(), 1)
    } else {
        let param = format!("{QUERY_KEY}={id}");
        if template.ends_with('?') {
            format!("{template}{param}")
        } else if template.contains('?') {
            format!("{template}&{param}")
        } else {
            format!("{template}?{param}")
        }
    };
    Url::parse(&raw).map_err(|source| Error::InvalidUrl { url: raw, source })
}

/// Holds a reqwest blocking client and the endpoint template every upload
/// is addressed through.
#[derive(Clone)]
pub struct UploadClient {
    client: Client,
    template: String,
}

impl UploadClient {
    /// Redirects are not followed: a 3xx answer is reported as a failed
    /// upload rather than replayed against another location.
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .redirect(Policy::none())
            .build()
            .map_err(Error::Client)?;
        Ok(UploadClient {
            client,
            template: template.into(),
        })
    }

    /// POST the raw bytes of `path` to the endpoint for `id`. A status
    /// outside 2xx is an error carrying the status code; the response body
    /// is only logged.
    pub fn upload(&self, path: &Path, id: &Identifier) -> Result<()> {
        let url = symbolication_url(&self.template, id)?;
        tracing::info!("Uploading {} ({id})...", path.display());

        let body = fs::read(path).map_err(|e| Error::io(path, e))?;
        let res = self
            .client
            .post(url.clone())
            .body(body)
            .send()
            .map_err(|source| Error::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = res.status();
        if !status.is_success() {
            let txt = res.text().unwrap_or_default();
            tracing::debug!(%url, %status, body = %txt, "upload rejected");
            return Err(Error::UploadStatus {
                url: url.to_string(),
                status,
            });
        }
        tracing::debug!(%url, %status, "upload accepted");
        Ok(())
    }
}
