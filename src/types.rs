use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DeliveryError;
use crate::signing::Signature;

/// Outcome of one delivery: the decoded response body, or why it failed.
pub type DeliveryResult = Result<Value, DeliveryError>;

/// Opaque key-value pairs forwarded untouched to the API.
pub type CustomParams = Map<String, Value>;

/// Default values applied to conversions when the caller leaves them out
pub mod defaults {
    pub const CURRENCY: &str = "USD";
    pub const STATUS: &str = "approved";

    pub(crate) fn currency() -> String {
        CURRENCY.to_string()
    }

    pub(crate) fn status() -> String {
        STATUS.to_string()
    }
}

/// A conversion (postback) to report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionEvent {
    pub offer_id: String,
    pub transaction_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub click_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default = "defaults::currency")]
    pub currency: String,
    #[serde(default = "defaults::status")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_params: Option<CustomParams>,
}

impl ConversionEvent {
    pub fn new(offer_id: impl Into<String>, transaction_id: impl Into<String>) -> Self {
        Self {
            offer_id: offer_id.into(),
            transaction_id: transaction_id.into(),
            click_id: None,
            amount: None,
            currency: defaults::currency(),
            status: defaults::status(),
            custom_params: None,
        }
    }

    /// Check the required fields are non-blank.
    pub fn validate(&self) -> Result<(), DeliveryError> {
        require("offer_id", &self.offer_id)?;
        require("transaction_id", &self.transaction_id)
    }

    pub fn with_click_id(mut self, click_id: impl Into<String>) -> Self {
        self.click_id = Some(click_id.into());
        self
    }

    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn with_custom_params(mut self, params: CustomParams) -> Self {
        self.custom_params = Some(params);
        self
    }
}

/// A server-side click to record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClickEvent {
    pub offer_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_id_1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_id_2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_id_3: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_params: Option<CustomParams>,
}

impl ClickEvent {
    pub fn new(offer_id: impl Into<String>) -> Self {
        Self {
            offer_id: offer_id.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), DeliveryError> {
        require("offer_id", &self.offer_id)
    }
}

fn require(field: &str, value: &str) -> Result<(), DeliveryError> {
    if value.trim().is_empty() {
        return Err(DeliveryError::Invalid(format!("{} cannot be empty", field)));
    }
    Ok(())
}

// Unset, empty-string and empty-object optionals are all left out of the body.
fn is_blank(value: &Option<&str>) -> bool {
    value.is_none_or(str::is_empty)
}

fn is_empty_params(value: &Option<&CustomParams>) -> bool {
    value.is_none_or(Map::is_empty)
}

/// Body posted to `/api/postback`, minus the signing envelope
#[derive(Debug, Serialize)]
pub struct PostbackFields<'a> {
    pub offer_id: &'a str,
    pub transaction_id: &'a str,
    pub status: &'a str,
    pub currency: &'a str,
    #[serde(skip_serializing_if = "is_blank")]
    pub click_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "is_empty_params")]
    pub custom_params: Option<&'a CustomParams>,
}

impl<'a> From<&'a ConversionEvent> for PostbackFields<'a> {
    fn from(event: &'a ConversionEvent) -> Self {
        Self {
            offer_id: &event.offer_id,
            transaction_id: &event.transaction_id,
            status: &event.status,
            currency: &event.currency,
            click_id: event.click_id.as_deref(),
            amount: event.amount,
            custom_params: event.custom_params.as_ref(),
        }
    }
}

/// Body posted to `/api/sdk/click`, minus the signing envelope
#[derive(Debug, Serialize)]
pub struct ClickFields<'a> {
    pub offer_id: &'a str,
    #[serde(skip_serializing_if = "is_blank")]
    pub tracking_code: Option<&'a str>,
    #[serde(skip_serializing_if = "is_blank")]
    pub sub_id_1: Option<&'a str>,
    #[serde(skip_serializing_if = "is_blank")]
    pub sub_id_2: Option<&'a str>,
    #[serde(skip_serializing_if = "is_blank")]
    pub sub_id_3: Option<&'a str>,
    #[serde(skip_serializing_if = "is_blank")]
    pub ip: Option<&'a str>,
    #[serde(skip_serializing_if = "is_blank")]
    pub user_agent: Option<&'a str>,
    #[serde(skip_serializing_if = "is_empty_params")]
    pub custom_params: Option<&'a CustomParams>,
}

impl<'a> From<&'a ClickEvent> for ClickFields<'a> {
    fn from(event: &'a ClickEvent) -> Self {
        Self {
            offer_id: &event.offer_id,
            tracking_code: event.tracking_code.as_deref(),
            sub_id_1: event.sub_id_1.as_deref(),
            sub_id_2: event.sub_id_2.as_deref(),
            sub_id_3: event.sub_id_3.as_deref(),
            ip: event.ip.as_deref(),
            user_agent: event.user_agent.as_deref(),
            custom_params: event.custom_params.as_ref(),
        }
    }
}

/// Credentials plus signature, with the event fields flattened alongside.
#[derive(Debug, Serialize)]
pub struct SignedRequest<'a, T> {
    pub api_key: &'a str,
    pub advertiser_id: &'a str,
    #[serde(flatten)]
    pub fields: T,
    pub timestamp: i64,
    pub nonce: String,
    pub signature: String,
}

impl<'a, T> SignedRequest<'a, T> {
    pub fn new(api_key: &'a str, advertiser_id: &'a str, fields: T, signed: Signature) -> Self {
        Self {
            api_key,
            advertiser_id,
            fields,
            timestamp: signed.timestamp,
            nonce: signed.nonce,
            signature: signed.signature,
        }
    }
}

/// Wire view of a [`DeliveryResult`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryReport {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&DeliveryResult> for DeliveryReport {
    fn from(result: &DeliveryResult) -> Self {
        match result {
            Ok(data) => Self {
                success: true,
                data: Some(data.clone()),
                error: None,
            },
            Err(err) => Self {
                success: false,
                data: None,
                error: Some(err.to_string()),
            },
        }
    }
}

/// One entry of a batch, tagged with the transaction it came from
#[derive(Debug)]
pub struct BatchItemResult {
    pub transaction_id: String,
    pub result: DeliveryResult,
}

impl BatchItemResult {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

impl Serialize for BatchItemResult {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Tagged<'a> {
            transaction_id: &'a str,
            #[serde(flatten)]
            report: DeliveryReport,
        }

        Tagged {
            transaction_id: &self.transaction_id,
            report: DeliveryReport::from(&self.result),
        }
        .serialize(serializer)
    }
}
