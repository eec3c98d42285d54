//! Delivery tests against a mocked AffTok API.

use std::time::{Duration, Instant};

use serde_json::{Value, json};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use afftok_s2s::signing::verify_signature;
use afftok_s2s::{AfftokClient, ClickEvent, ConversionEvent, Credentials, DeliveryError, TrackerConfig};

const API_KEY: &str = "test_api_key";
const ADVERTISER_ID: &str = "adv_42";

fn client_for(server: &MockServer) -> AfftokClient {
    AfftokClient::new(Credentials::new(API_KEY, ADVERTISER_ID, server.uri())).unwrap()
}

async fn sent_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}

#[tokio::test]
async fn test_postback_success_returns_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/postback"))
        .and(header("X-API-Key", API_KEY))
        .and(header("Content-Type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "abc"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = client
        .send_postback(&ConversionEvent::new("offer_1", "txn_1"))
        .await;

    assert_eq!(result.unwrap(), json!({"id": "abc"}));
}

#[tokio::test]
async fn test_postback_rejection_returns_raw_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/postback"))
        .respond_with(ResponseTemplate::new(422).set_body_string("invalid offer"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .send_postback(&ConversionEvent::new("bad_offer", "txn_1"))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "invalid offer");
    assert_eq!(err.status(), Some(422));
}

#[tokio::test]
async fn test_postback_unreachable_host_is_an_error_value() {
    let client = AfftokClient::new(Credentials::new(API_KEY, ADVERTISER_ID, "http://127.0.0.1:1"))
        .unwrap();

    let err = client
        .send_postback(&ConversionEvent::new("offer_1", "txn_1"))
        .await
        .unwrap_err();

    assert!(!err.to_string().is_empty());
    assert!(matches!(err, DeliveryError::Connect(_) | DeliveryError::Transport(_)));
}

#[tokio::test]
async fn test_postback_timeout_is_classified() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let mut config = TrackerConfig::new(Credentials::new(API_KEY, ADVERTISER_ID, server.uri()));
    config.timeout = Duration::from_millis(200);
    let client = AfftokClient::with_config(config).unwrap();

    let err = client
        .send_postback(&ConversionEvent::new("offer_1", "txn_1"))
        .await
        .unwrap_err();

    assert!(matches!(err, DeliveryError::Timeout(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_postback_non_json_success_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .send_postback(&ConversionEvent::new("offer_1", "txn_1"))
        .await
        .unwrap_err();

    assert!(matches!(err, DeliveryError::Decode(_)));
}

#[tokio::test]
async fn test_postback_empty_success_body_is_null() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let result = client_for(&server)
        .send_postback(&ConversionEvent::new("offer_1", "txn_1"))
        .await;

    assert_eq!(result.unwrap(), Value::Null);
}

#[tokio::test]
async fn test_postback_payload_is_signed_and_omits_unset_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/postback"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    client
        .send_postback(&ConversionEvent::new("offer_1", "txn_1").with_amount(29.99))
        .await
        .unwrap();

    let bodies = sent_bodies(&server).await;
    assert_eq!(bodies.len(), 1);
    let body = bodies[0].as_object().unwrap();

    assert_eq!(body["api_key"], API_KEY);
    assert_eq!(body["advertiser_id"], ADVERTISER_ID);
    assert_eq!(body["offer_id"], "offer_1");
    assert_eq!(body["transaction_id"], "txn_1");
    assert_eq!(body["status"], "approved");
    assert_eq!(body["currency"], "USD");
    assert_eq!(body["amount"], 29.99);
    assert!(!body.contains_key("click_id"));
    assert!(!body.contains_key("custom_params"));

    let timestamp = body["timestamp"].as_i64().unwrap();
    let nonce = body["nonce"].as_str().unwrap();
    let signature = body["signature"].as_str().unwrap();
    assert_eq!(nonce.len(), 32);
    assert!(verify_signature(API_KEY, ADVERTISER_ID, timestamp, nonce, signature));
}

#[tokio::test]
async fn test_each_request_gets_fresh_nonce() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let event = ConversionEvent::new("offer_1", "txn_1");
    client.send_postback(&event).await.unwrap();
    client.send_postback(&event).await.unwrap();

    let bodies = sent_bodies(&server).await;
    assert_ne!(bodies[0]["nonce"], bodies[1]["nonce"]);
    assert_ne!(bodies[0]["signature"], bodies[1]["signature"]);
}

#[tokio::test]
async fn test_track_click_uses_click_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/sdk/click"))
        .and(header("X-API-Key", API_KEY))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"click_id": "c1"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let event = ClickEvent {
        tracking_code: Some("summer".to_string()),
        sub_id_2: Some("banner".to_string()),
        ..ClickEvent::new("offer_1")
    };
    let data = client.track_click(&event).await.unwrap();
    assert_eq!(data, json!({"click_id": "c1"}));

    let body = sent_bodies(&server).await.remove(0);
    let body = body.as_object().unwrap();
    assert_eq!(body["tracking_code"], "summer");
    assert_eq!(body["sub_id_2"], "banner");
    for absent in ["sub_id_1", "sub_id_3", "ip", "user_agent", "custom_params", "transaction_id"] {
        assert!(!body.contains_key(absent), "unexpected key {}", absent);
    }
}

#[tokio::test]
async fn test_batch_is_ordered_tagged_and_spaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/postback"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let events: Vec<ConversionEvent> = ["T1", "T2", "T3"]
        .iter()
        .map(|id| ConversionEvent::new("offer_1", *id))
        .collect();

    let start = Instant::now();
    let results = client.send_batch_postbacks(&events).await;
    let elapsed = start.elapsed();

    let ids: Vec<&str> = results.iter().map(|r| r.transaction_id.as_str()).collect();
    assert_eq!(ids, vec!["T1", "T2", "T3"]);
    assert!(results.iter().all(|r| r.is_success()));
    assert!(elapsed >= Duration::from_millis(200), "elapsed {:?}", elapsed);

    let sent: Vec<Value> = sent_bodies(&server)
        .await
        .into_iter()
        .map(|b| b["transaction_id"].clone())
        .collect();
    assert_eq!(sent, vec![json!("T1"), json!("T2"), json!("T3")]);
}

fn client_with_delay(server: &MockServer, delay: Duration) -> AfftokClient {
    let mut config = TrackerConfig::new(Credentials::new(API_KEY, ADVERTISER_ID, server.uri()));
    config.batch_delay = delay;
    AfftokClient::with_config(config).unwrap()
}

async fn mount_ok(server: &MockServer) {
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_batch_pauses_after_last_send() {
    let server = MockServer::start().await;
    mount_ok(&server).await;
    let client = client_with_delay(&server, Duration::from_millis(100));

    let events: Vec<ConversionEvent> = ["T1", "T2", "T3"]
        .iter()
        .map(|id| ConversionEvent::new("offer_1", *id))
        .collect();

    let start = Instant::now();
    let results = client.send_batch_postbacks(&events).await;
    let elapsed = start.elapsed();

    assert_eq!(results.len(), 3);
    assert!(elapsed >= Duration::from_millis(300), "elapsed {:?}", elapsed);
}

#[tokio::test]
async fn test_batch_uses_configured_delay() {
    let server = MockServer::start().await;
    mount_ok(&server).await;
    let client = client_with_delay(&server, Duration::from_millis(50));
    assert_eq!(client.batch_delay(), Duration::from_millis(50));

    let events = vec![
        ConversionEvent::new("offer_1", "T1"),
        ConversionEvent::new("offer_1", "T2"),
    ];

    let start = Instant::now();
    client.send_batch_postbacks(&events).await;
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_millis(100), "elapsed {:?}", elapsed);
}

#[tokio::test]
async fn test_batch_records_invalid_event_and_sends_the_rest() {
    let server = MockServer::start().await;
    mount_ok(&server).await;
    let client = client_with_delay(&server, Duration::from_millis(1));

    let events = vec![
        ConversionEvent::new("offer_1", "T1"),
        ConversionEvent::new("", "T2"),
        ConversionEvent::new("offer_1", "T3"),
    ];
    let results = client.send_batch_postbacks(&events).await;

    assert!(results[0].is_success());
    let err = results[1].result.as_ref().unwrap_err();
    assert!(matches!(err, DeliveryError::Invalid(_)));
    assert_eq!(err.to_string(), "offer_id cannot be empty");
    assert!(results[2].is_success());

    let sent: Vec<Value> = sent_bodies(&server)
        .await
        .into_iter()
        .map(|b| b["transaction_id"].clone())
        .collect();
    assert_eq!(sent, vec![json!("T1"), json!("T3")]);
}

#[tokio::test]
async fn test_batch_continues_after_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(wiremock::matchers::body_partial_json(json!({"transaction_id": "T2"})))
        .respond_with(ResponseTemplate::new(400).set_body_string("duplicate transaction"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let mut config = TrackerConfig::new(Credentials::new(API_KEY, ADVERTISER_ID, server.uri()));
    config.batch_delay = Duration::from_millis(1);
    let client = AfftokClient::with_config(config).unwrap();

    let events: Vec<ConversionEvent> = ["T1", "T2", "T3"]
        .iter()
        .map(|id| ConversionEvent::new("offer_1", *id))
        .collect();
    let results = client.send_batch_postbacks(&events).await;

    assert_eq!(results.len(), 3);
    assert!(results[0].is_success());
    assert_eq!(
        results[1].result.as_ref().unwrap_err().to_string(),
        "duplicate transaction"
    );
    assert!(results[2].is_success());
}

#[tokio::test]
async fn test_close_consumes_client() {
    let server = MockServer::start().await;
    let client = client_for(&server);
    assert_eq!(client.credentials().base_url, server.uri());
    client.close();
}
