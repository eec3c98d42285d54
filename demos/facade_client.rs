/// Example HTTP client calling the AffTok façade server
///
/// Run the server first:
/// ```bash
/// API_KEY=... ADVERTISER_ID=... cargo run --bin server
/// ```
///
/// Then run this example:
/// ```bash
/// cargo run --example facade_client
/// ```
use serde::Deserialize;
use serde_json::json;

use afftok_s2s::api::MetricsResponse;
use afftok_s2s::DeliveryReport;

#[derive(Deserialize, Debug)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Deserialize, Debug)]
struct BatchItem {
    transaction_id: String,
    success: bool,
    error: Option<String>,
}

#[derive(Deserialize, Debug)]
struct BatchResponse {
    results: Vec<BatchItem>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let base_url = std::env::var("API_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
    let client = reqwest::Client::new();

    println!("=== AffTok Façade Client Demo ===\n");

    // 1. Health Check
    println!("1. Checking server health...");
    let health: HealthResponse = client
        .get(format!("{}/health", base_url))
        .send()
        .await?
        .json()
        .await?;
    println!("   Server status: {}", health.status);
    println!("   Version: {}\n", health.version);

    // 2. Single conversion
    println!("2. Sending a postback...");
    let response = client
        .post(format!("{}/postback", base_url))
        .json(&json!({
            "offer_id": "offer_123",
            "transaction_id": "demo_txn_1",
            "click_id": "click_abc123",
            "amount": 49.99,
            "currency": "EUR"
        }))
        .send()
        .await?;
    let status = response.status();
    let report: DeliveryReport = response.json().await?;
    match (report.success, report.data, report.error) {
        (true, Some(data), _) => println!("   Accepted ({}): {}\n", status, data),
        (_, _, Some(error)) => println!("   Rejected ({}): {}\n", status, error),
        _ => println!("   Unexpected response ({})\n", status),
    }

    // 3. Click
    println!("3. Tracking a click...");
    let response = client
        .post(format!("{}/click", base_url))
        .json(&json!({
            "offer_id": "offer_123",
            "tracking_code": "campaign_summer_2024",
            "sub_id_1": "source_google"
        }))
        .send()
        .await?;
    println!("   {} {}\n", response.status(), response.text().await?);

    // 4. Batch
    println!("4. Sending a batch of postbacks...");
    let batch: BatchResponse = client
        .post(format!("{}/batch-postbacks", base_url))
        .json(&json!([
            {"offer_id": "offer_123", "transaction_id": "demo_batch_1", "amount": 10.0},
            {"offer_id": "offer_123", "transaction_id": "demo_batch_2", "amount": 20.0},
            {"offer_id": "offer_123", "transaction_id": "demo_batch_3", "amount": 30.0}
        ]))
        .send()
        .await?
        .json()
        .await?;
    for (i, item) in batch.results.iter().enumerate() {
        match &item.error {
            Some(error) => println!("   [{}] {} failed: {}", i + 1, item.transaction_id, error),
            None => println!("   [{}] {} success={}", i + 1, item.transaction_id, item.success),
        }
    }
    println!();

    // 5. Metrics
    println!("5. Getting server metrics...");
    let metrics: MetricsResponse = client
        .get(format!("{}/api/metrics", base_url))
        .send()
        .await?
        .json()
        .await?;
    println!("   Total requests: {}", metrics.total_requests);
    println!("   Failed deliveries: {}", metrics.failed_deliveries);
    println!("   Uptime: {} seconds\n", metrics.uptime_seconds);

    println!("=== Demo Complete ===");

    Ok(())
}
