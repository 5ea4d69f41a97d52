// API client module: a small blocking HTTP client for the two Gyazo
// endpoints the drain loop needs (list the newest images, delete one).
// Everything is synchronous; one request is in flight at a time.

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::drain::ImageStore;

/// Base URL of the public Gyazo API.
pub const GYAZO_API_URL: &str = "https://api.gyazo.com";

/// Number of images requested per listing call (the API maximum).
pub const PAGE_SIZE: usize = 100;

/// Build the HTTP client shared by the API client and the downloader.
pub fn build_http_client() -> Result<Client> {
    Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}

/// API client holding the shared reqwest client, the API base URL and
/// the account's access token.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: String,
}

/// One image as returned by `GET /api/images`. Absent or `null` fields
/// decode to empty strings; non premium accounts get an empty `url`.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub image_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: Metadata,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_at: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub image_type: String,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    #[serde(default, deserialize_with = "null_as_default")]
    pub app: String,
}

impl ImageRecord {
    /// The application tag, unless it is blank or a single space.
    pub fn app_tag(&self) -> Option<&str> {
        match self.metadata.app.as_str() {
            "" | " " => None,
            app => Some(app),
        }
    }

    /// Whether the record carries something to download.
    pub fn has_url(&self) -> bool {
        !self.url.is_empty()
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl ApiClient {
    /// Client for the real Gyazo API.
    pub fn new(client: Client, token: &str) -> Self {
        Self::with_base_url(client, GYAZO_API_URL, token)
    }

    /// Client for an API served somewhere else (a local mock in tests).
    pub fn with_base_url(client: Client, base_url: &str, token: &str) -> Self {
        ApiClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    /// Fetch up to `PAGE_SIZE` of the most recent images. A failed request,
    /// a non-success status or a body that is not a JSON array of images
    /// is an error.
    pub fn list_images(&self) -> Result<Vec<ImageRecord>> {
        let url = format!("{}/api/images", &self.base_url);
        debug!(%url, per_page = PAGE_SIZE, "listing images");
        let res = self
            .client
            .get(&url)
            .query(&[("per_page", PAGE_SIZE.to_string()), ("access_token", self.token.clone())])
            .send()
            .context("Failed to send image list request")?;
        let status = res.status();
        let body = res.text().context("Failed to read image list response")?;
        if !status.is_success() {
            anyhow::bail!("Listing images failed: {} - {}", status, body);
        }
        let images: Vec<ImageRecord> =
            serde_json::from_str(&body).context("Parsing image list json")?;
        debug!(count = images.len(), "listed images");
        Ok(images)
    }

    /// Delete one image. Only a `200 OK` counts as success.
    pub fn delete_image(&self, image_id: &str) -> Result<()> {
        let url = self.image_url(image_id)?;
        debug!(%url, "deleting image");
        let res = self
            .client
            .delete(url)
            .query(&[("access_token", &self.token)])
            .send()
            .with_context(|| format!("Failed to send delete request for image {}", image_id))?;
        if res.status() != StatusCode::OK {
            let status = res.status();
            let txt = res.text().unwrap_or_else(|_| "".into());
            anyhow::bail!("Error deleting image {} ❌: {} - {}", image_id, status, txt);
        }
        Ok(())
    }
}

impl ApiClient {
    // The id becomes a single percent-encoded path segment.
    fn image_url(&self, image_id: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid API base url {}", &self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("API base url {} cannot take a path", &self.base_url))?
            .pop_if_empty()
            .extend(["api", "images", image_id]);
        Ok(url)
    }
}

impl ImageStore for ApiClient {
    fn list_images(&self) -> Result<Vec<ImageRecord>> {
        ApiClient::list_images(self)
    }

    fn delete_image(&self, image_id: &str) -> Result<()> {
        ApiClient::delete_image(self, image_id)
    }
}
