pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod signing;
pub mod types;

pub use client::AfftokClient;
pub use config::{Credentials, TrackerConfig};
pub use error::{ConfigError, DeliveryError};
pub use types::{BatchItemResult, ClickEvent, ConversionEvent, DeliveryReport, DeliveryResult};
