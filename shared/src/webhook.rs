use crate::email::DeliveryError;
use crate::types::LeadRecord;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;

pub const SUBMISSION_HEADER: &str = "X-Leadgate-Submission";
pub const SIGNATURE_HEADER: &str = "X-Leadgate-Signature";

type HmacSha256 = Hmac<Sha256>;

/// Destination for normalized leads (automation webhook)
#[async_trait]
pub trait LeadSink: Send + Sync {
    async fn deliver(&self, record: &LeadRecord) -> Result<(), DeliveryError>;
}

/// `sha256=<base64 HMAC-SHA256(body)>`
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(body);
    format!(
        "sha256={}",
        general_purpose::STANDARD.encode(mac.finalize().into_bytes())
    )
}

pub struct WebhookSink {
    client: reqwest::Client,
    url: String,
    secret: Option<String>,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>, secret: Option<String>) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| DeliveryError::Transport(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
            secret,
        })
    }
}

#[async_trait]
impl LeadSink for WebhookSink {
    async fn deliver(&self, record: &LeadRecord) -> Result<(), DeliveryError> {
        let body =
            serde_json::to_vec(record).map_err(|e| DeliveryError::Build(e.to_string()))?;

        let mut request = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(SUBMISSION_HEADER, record.submission_id.as_str());
        if let Some(secret) = &self.secret {
            request = request.header(SIGNATURE_HEADER, sign(secret, &body));
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status(status.as_u16()));
        }
        Ok(())
    }
}
