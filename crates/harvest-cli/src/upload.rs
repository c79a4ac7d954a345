//! HTTP delivery of queued captures

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

use harvest_queue::{Deliver, DeliveryError, QueuedItem};

use crate::capture::CaptureMetadata;

/// Header carrying base64-encoded JSON metadata
pub const METADATA_HEADER: &str = "X-Capture-Metadata";
/// Lets the server drop duplicate uploads of the same capture
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// POSTs each capture's raw bytes to `{endpoint}/captures/{id}`
pub struct HttpDelivery {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpDelivery {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, id: &str) -> String {
        format!("{}/captures/{}", self.endpoint, id)
    }
}

#[async_trait]
impl Deliver<CaptureMetadata> for HttpDelivery {
    async fn deliver(&self, item: &QueuedItem<CaptureMetadata>) -> Result<(), DeliveryError> {
        let metadata = serde_json::to_vec(&item.metadata)
            .map_err(|e| DeliveryError::Rejected(format!("Unencodable metadata: {}", e)))?;

        let response = self
            .client
            .post(self.url(&item.id))
            .header(IDEMPOTENCY_HEADER, item.id.as_str())
            .header(METADATA_HEADER, STANDARD.encode(metadata))
            .header(CONTENT_TYPE, item.metadata.mime_type.as_str())
            .body(item.payload.clone())
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(item_id = %item.id, status = %status, "Upload accepted");
            Ok(())
        } else {
            Err(DeliveryError::Rejected(format!("HTTP {}", status)))
        }
    }
}
