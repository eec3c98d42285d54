use std::env;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde_json::json;

use afftok_s2s::types::CustomParams;
use afftok_s2s::{AfftokClient, ClickEvent, ConversionEvent, DeliveryReport, TrackerConfig};

fn program_name(args: &[String]) -> &str {
    args.first().map_or("afftok-s2s", String::as_str)
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} <command> [args]", program);
    eprintln!("  postback <offer_id> <transaction_id> [amount] [currency]");
    eprintln!("  click <offer_id> [tracking_code] [sub_id_1]");
    eprintln!("  demo     run a simple conversion, an attributed conversion, a click and a batch");
    eprintln!();
    eprintln!("Reads API_KEY, ADVERTISER_ID and BASE_URL from the environment.");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let program = program_name(&args);
    if args.len() < 2 {
        print_usage(program);
        std::process::exit(1);
    }

    let config = TrackerConfig::from_env().context("Invalid AffTok configuration")?;
    let client = AfftokClient::with_config(config)?;

    match args[1].as_str() {
        "postback" => {
            let (Some(offer_id), Some(transaction_id)) = (args.get(2), args.get(3)) else {
                print_usage(program);
                std::process::exit(1);
            };
            let mut event = ConversionEvent::new(offer_id, transaction_id);
            if let Some(raw) = args.get(4) {
                let amount = raw
                    .parse::<f64>()
                    .with_context(|| format!("Invalid amount: {}", raw))?;
                event = event.with_amount(amount);
            }
            if let Some(currency) = args.get(5) {
                event = event.with_currency(currency);
            }
            print_result("Postback", &DeliveryReport::from(&client.send_postback(&event).await));
        }
        "click" => {
            let Some(offer_id) = args.get(2) else {
                print_usage(program);
                std::process::exit(1);
            };
            let event = ClickEvent {
                tracking_code: args.get(3).cloned(),
                sub_id_1: args.get(4).cloned(),
                ..ClickEvent::new(offer_id)
            };
            print_result("Click", &DeliveryReport::from(&client.track_click(&event).await));
        }
        "demo" => run_demo(&client).await?,
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage(program);
            std::process::exit(1);
        }
    }

    client.close();
    Ok(())
}

async fn run_demo(client: &AfftokClient) -> Result<()> {
    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();

    println!("1. Sending a simple conversion...");
    let event = ConversionEvent::new("offer_123", format!("txn_{}", now)).with_amount(29.99);
    print_result("Result", &DeliveryReport::from(&client.send_postback(&event).await));

    println!("2. Sending a conversion with click attribution...");
    let mut params = CustomParams::new();
    params.insert("product_id".to_string(), json!("prod_456"));
    params.insert("category".to_string(), json!("electronics"));
    let event = ConversionEvent::new("offer_123", format!("txn_{}_2", now))
        .with_click_id("click_abc123")
        .with_amount(49.99)
        .with_currency("EUR")
        .with_custom_params(params);
    print_result("Result", &DeliveryReport::from(&client.send_postback(&event).await));

    println!("3. Tracking a server-side click...");
    let click = ClickEvent {
        tracking_code: Some("campaign_summer_2024".to_string()),
        sub_id_1: Some("source_google".to_string()),
        ip: Some("192.168.1.1".to_string()),
        user_agent: Some(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
        ),
        ..ClickEvent::new("offer_123")
    };
    print_result("Result", &DeliveryReport::from(&client.track_click(&click).await));

    println!("4. Batch sending conversions...");
    let batch: Vec<ConversionEvent> = [10.0, 20.0, 30.0]
        .iter()
        .enumerate()
        .map(|(i, amount)| {
            ConversionEvent::new("offer_123", format!("batch_{}_{}", i + 1, now))
                .with_amount(*amount)
        })
        .collect();
    for item in client.send_batch_postbacks(&batch).await {
        print_result(&item.transaction_id, &DeliveryReport::from(&item.result));
    }

    Ok(())
}

fn print_result(label: &str, report: &DeliveryReport) {
    match serde_json::to_string(report) {
        Ok(text) => println!("  {}: {}\n", label, text),
        Err(e) => println!("  {}: <unprintable: {}>\n", label, e),
    }
}
