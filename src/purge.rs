//! Image Service Purge Client

use reqwest::Client;

use crate::pipeline::{Result, ToolError};

pub const API_KEY_HEADER: &str = "ft-origami-api-key";

pub struct PurgeClient {
    client: Client,
    service_url: String,
    api_key: String,
}

impl PurgeClient {
    pub fn new(service_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            service_url: service_url.into(),
            api_key: api_key.into(),
        }
    }

    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    /// `{service}/v2/images/purge/{identifier}?source=oist`
    pub fn purge_url(&self, identifier: &str) -> String {
        format!(
            "{}/v2/images/purge/{}?source=oist",
            self.service_url.trim_end_matches('/'),
            identifier
        )
    }

    /// Ask the service to evict `identifier`. Non-2xx responses are errors.
    pub async fn purge(&self, identifier: &str) -> Result<()> {
        let url = self.purge_url(identifier);
        self.client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|source| ToolError::Purge { url, source })?;
        Ok(())
    }
}
