// HTTP client for the Walrus publisher (writes) and aggregator (reads).

use super::{BlobTransport, StoreReply, TransportFailure};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

pub const DEFAULT_PUBLISHER_URL: &str = "https://publisher.walrus-testnet.walrus.space";
pub const DEFAULT_AGGREGATOR_URL: &str = "https://aggregator.walrus-testnet.walrus.space";

const BLOBS_PATH: &str = "/v1/blobs";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Blob store reached over HTTP.
#[derive(Clone)]
pub struct HttpBlobStore {
    client: reqwest::Client,
    publisher_url: String,
    aggregator_url: String,
    epochs: Option<u32>,
}

impl HttpBlobStore {
    pub fn new(
        publisher_url: impl Into<String>,
        aggregator_url: impl Into<String>,
        epochs: Option<u32>,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            publisher_url: publisher_url.into().trim_end_matches('/').to_string(),
            aggregator_url: aggregator_url.into().trim_end_matches('/').to_string(),
            epochs,
        })
    }

    /// Collection endpoint a payload is `PUT` to.
    pub fn upload_url(&self) -> String {
        match self.epochs {
            Some(epochs) => format!("{}{}?epochs={}", self.publisher_url, BLOBS_PATH, epochs),
            None => format!("{}{}", self.publisher_url, BLOBS_PATH),
        }
    }

    /// Where a stored blob can be read back.
    pub fn blob_url(&self, storage_id: &str) -> String {
        format!("{}{}/{}", self.aggregator_url, BLOBS_PATH, storage_id)
    }

    /// Reads a stored blob's raw bytes from the aggregator.
    pub async fn read_blob(&self, storage_id: &str) -> anyhow::Result<Bytes> {
        let url = self.blob_url(storage_id);
        tracing::info!(%url, "reading blob from aggregator");
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "Aggregator returned {} for blob {}: {}",
                status,
                storage_id,
                body
            ));
        }
        Ok(response.bytes().await?)
    }
}

fn classify(err: reqwest::Error) -> TransportFailure {
    if err.is_timeout() {
        TransportFailure::TimedOut
    } else {
        TransportFailure::Unreachable(err.to_string())
    }
}

#[async_trait]
impl BlobTransport for HttpBlobStore {
    async fn put_blob(
        &self,
        body: Bytes,
        content_type: &str,
    ) -> Result<StoreReply, TransportFailure> {
        let response = self
            .client
            .put(self.upload_url())
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(text) => text,
            Err(e) if status >= 400 => format!("Could not read error response: {}", e),
            Err(e) => return Err(classify(e)),
        };
        Ok(StoreReply { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_built_from_base_endpoints() {
        let store =
            HttpBlobStore::new("https://pub.example/", "https://agg.example", None).unwrap();
        assert_eq!(store.upload_url(), "https://pub.example/v1/blobs");
        assert_eq!(store.blob_url("abc"), "https://agg.example/v1/blobs/abc");

        let store =
            HttpBlobStore::new("https://pub.example", "https://agg.example", Some(5)).unwrap();
        assert_eq!(store.upload_url(), "https://pub.example/v1/blobs?epochs=5");
    }
}
