use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, header};
use serde::Serialize;
use serde_json::Value;

use crate::config::{Credentials, TrackerConfig};
use crate::error::DeliveryError;
use crate::signing::RequestSigner;
use crate::types::{
    BatchItemResult, ClickEvent, ClickFields, ConversionEvent, DeliveryResult, PostbackFields,
    SignedRequest,
};

const POSTBACK_PATH: &str = "/api/postback";
const CLICK_PATH: &str = "/api/sdk/click";
const API_KEY_HEADER: &str = "X-API-Key";

/// Sends signed conversion and click events to the AffTok API.
///
/// One instance is meant to be built at startup and shared (it is `Send + Sync`);
/// the underlying connection pool is reused across calls and released by
/// [`close`](Self::close).
pub struct AfftokClient {
    http: Client,
    credentials: Credentials,
    signer: RequestSigner,
    batch_delay: Duration,
}

impl AfftokClient {
    /// Create a client with the default 30s timeout and 100ms batch delay.
    pub fn new(credentials: Credentials) -> Result<Self> {
        Self::with_config(TrackerConfig::new(credentials))
    }

    /// Create a client from a full configuration.
    pub fn with_config(config: TrackerConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let signer = RequestSigner::new(
            config.credentials.api_key.clone(),
            config.credentials.advertiser_id.clone(),
        );

        Ok(Self {
            http,
            credentials: config.credentials,
            signer,
            batch_delay: config.batch_delay,
        })
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn batch_delay(&self) -> Duration {
        self.batch_delay
    }

    /// Report a conversion to `/api/postback`.
    pub async fn send_postback(&self, event: &ConversionEvent) -> DeliveryResult {
        tracing::debug!(
            "Sending postback for offer {} transaction {}",
            event.offer_id,
            event.transaction_id
        );
        let result = self
            .post_signed(POSTBACK_PATH, PostbackFields::from(event))
            .await;
        if let Err(e) = &result {
            tracing::warn!("Postback {} failed: {}", event.transaction_id, e);
        }
        result
    }

    /// Record a server-side click at `/api/sdk/click`.
    pub async fn track_click(&self, event: &ClickEvent) -> DeliveryResult {
        tracing::debug!("Tracking click for offer {}", event.offer_id);
        let result = self.post_signed(CLICK_PATH, ClickFields::from(event)).await;
        if let Err(e) = &result {
            tracing::warn!("Click for offer {} failed: {}", event.offer_id, e);
        }
        result
    }

    /// Send conversions one at a time, in order, pausing after each send.
    ///
    /// Failures are recorded and the batch carries on. An event with a blank
    /// required field is recorded as failed without being sent.
    pub async fn send_batch_postbacks(&self, events: &[ConversionEvent]) -> Vec<BatchItemResult> {
        let mut results = Vec::with_capacity(events.len());

        for event in events {
            if let Err(e) = event.validate() {
                tracing::warn!("Skipping postback {:?}: {}", event.transaction_id, e);
                results.push(BatchItemResult {
                    transaction_id: event.transaction_id.clone(),
                    result: Err(e),
                });
                continue;
            }

            let result = self.send_postback(event).await;
            results.push(BatchItemResult {
                transaction_id: event.transaction_id.clone(),
                result,
            });

            tokio::time::sleep(self.batch_delay).await;
        }

        let failed = results.iter().filter(|r| !r.is_success()).count();
        tracing::info!(
            "Batch finished: {} sent, {} failed",
            results.len() - failed,
            failed
        );
        results
    }

    /// Release the connection pool.
    pub fn close(self) {
        tracing::debug!("Closing AffTok client for {}", self.credentials.base_url);
        drop(self.http);
    }

    async fn post_signed<T: Serialize>(&self, path: &str, fields: T) -> DeliveryResult {
        let body = SignedRequest::new(
            &self.credentials.api_key,
            &self.credentials.advertiser_id,
            fields,
            self.signer.sign(),
        );
        let url = format!("{}{}", self.credentials.base_url, path);

        let response = self
            .http
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .header(API_KEY_HEADER, &self.credentials.api_key)
            .json(&body)
            .send()
            .await
            .map_err(DeliveryError::from_transport)?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(DeliveryError::from_transport)?;

        if !status.is_success() {
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body: text,
            });
        }

        // An empty 2xx (e.g. 204) is a success with no data, not a decode failure.
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| DeliveryError::Decode(e.to_string()))
    }
}
