//! Request signing for the AffTok server-to-server API.
//!
//! Every outbound request carries `timestamp`, `nonce` and `signature` fields.
//! The signature is a lowercase hex HMAC-SHA256 over
//! `api_key|advertiser_id|timestamp|nonce`, keyed by the API key. Event fields
//! are not part of the signed string.

use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use rand::Rng;
use rand::distributions::Alphanumeric;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Length of every generated nonce.
pub const NONCE_LEN: usize = 32;

/// Generate a random alphanumeric nonce of [`NONCE_LEN`] characters.
///
/// Uses `thread_rng`, which is a CSPRNG seeded from the OS.
pub fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LEN)
        .map(char::from)
        .collect()
}

/// Current time in integer milliseconds since the Unix epoch.
pub fn timestamp_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Build the pipe-delimited string that gets signed.
pub fn signable_string(api_key: &str, advertiser_id: &str, timestamp: i64, nonce: &str) -> String {
    format!("{}|{}|{}|{}", api_key, advertiser_id, timestamp, nonce)
}

fn mac_for(api_key: &str, advertiser_id: &str, timestamp: i64, nonce: &str) -> HmacSha256 {
    // HMAC pads or hashes the key to the block size, so no key length is rejected.
    let mut mac =
        HmacSha256::new_from_slice(api_key.as_bytes()).expect("HMAC accepts any key length");
    mac.update(signable_string(api_key, advertiser_id, timestamp, nonce).as_bytes());
    mac
}

/// Compute the hex-encoded HMAC-SHA256 signature for one request.
pub fn generate_signature(api_key: &str, advertiser_id: &str, timestamp: i64, nonce: &str) -> String {
    hex::encode(mac_for(api_key, advertiser_id, timestamp, nonce).finalize().into_bytes())
}

/// Check a received signature in constant time.
///
/// Returns `false` for signatures that are not valid hex.
pub fn verify_signature(
    api_key: &str,
    advertiser_id: &str,
    timestamp: i64,
    nonce: &str,
    signature: &str,
) -> bool {
    let Ok(expected) = hex::decode(signature) else {
        return false;
    };
    mac_for(api_key, advertiser_id, timestamp, nonce)
        .verify_slice(&expected)
        .is_ok()
}

/// The three authentication fields attached to every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub timestamp: i64,
    pub nonce: String,
    pub signature: String,
}

/// Signs requests on behalf of one advertiser.
#[derive(Debug, Clone)]
pub struct RequestSigner {
    api_key: String,
    advertiser_id: String,
}

impl RequestSigner {
    pub fn new(api_key: impl Into<String>, advertiser_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            advertiser_id: advertiser_id.into(),
        }
    }

    /// Sign with a fresh timestamp and nonce.
    pub fn sign(&self) -> Signature {
        self.sign_with(timestamp_millis(), generate_nonce())
    }

    /// Sign with a caller-supplied timestamp and nonce.
    pub fn sign_with(&self, timestamp: i64, nonce: String) -> Signature {
        let signature = generate_signature(&self.api_key, &self.advertiser_id, timestamp, &nonce);
        Signature {
            timestamp,
            nonce,
            signature,
        }
    }
}
