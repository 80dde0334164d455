use reqwest::Client;
use std::time::Duration;
use url::Url;

use super::LogIndexer;
use crate::error::IndexerError;
use crate::filter::LogFilter;
use crate::log::{IndexerResponse, RawLogEntry};

const MAX_ERROR_BODY: usize = 512;

/// Log indexer reached over HTTP.
///
/// Each query is a `POST` of the filter as JSON to the indexer URL.
#[derive(Debug, Clone)]
pub struct HttpIndexer {
    name: String,
    url: Url,
    reliability: u32,
    client: Client,
}

impl HttpIndexer {
    /// Create an indexer client. `timeout` bounds each request on its own,
    /// independently of the quorum deadline.
    pub fn new(url: Url, reliability: u32, timeout: Duration) -> Result<Self, IndexerError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("farmscope/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let name = url.host_str().unwrap_or(url.as_str()).to_string();

        Ok(Self {
            name,
            url,
            reliability,
            client,
        })
    }
}

#[async_trait::async_trait]
impl LogIndexer for HttpIndexer {
    fn name(&self) -> &str {
        &self.name
    }

    fn reliability(&self) -> u32 {
        self.reliability
    }

    async fn fetch_logs(&self, filter: &LogFilter) -> Result<Vec<RawLogEntry>, IndexerError> {
        let response = self
            .client
            .post(self.url.clone())
            .json(&filter.to_request())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut end = MAX_ERROR_BODY;
                while !body.is_char_boundary(end) {
                    end -= 1;
                }
                body.truncate(end);
            }
            return Err(IndexerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let parsed: IndexerResponse = serde_json::from_slice(&bytes)
            .map_err(|e| IndexerError::Malformed(e.to_string()))?;

        parsed.into_entries()
    }
}
