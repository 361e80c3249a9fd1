mod telemetry;

use clap::Parser;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Generates vault and irrigation monitor traffic against a running hub.
/// Devices alternate family by index: even labels are vaults, odd labels
/// are monitors.
#[derive(Debug, Parser)]
struct Args {
    /// Base URL of the hub
    #[arg(long, env = "HUB_URL", default_value = "http://localhost:8080")]
    server_url: String,

    /// Account that owns the simulated fleet
    #[arg(long, env = "OWNER_ID")]
    owner_id: Uuid,

    /// Number of simulated devices
    #[arg(long, env = "DEVICES", default_value_t = 10)]
    devices: usize,

    /// Delay between report rounds in milliseconds
    #[arg(long, env = "INTERVAL_MS", default_value_t = 5000)]
    interval_ms: u64,

    /// Vaults submit a history event every N rounds
    #[arg(long, env = "EVENT_EVERY", default_value_t = 12)]
    event_every: u64,

    /// Label prefix for the simulated devices
    #[arg(long, env = "LABEL_PREFIX", default_value = "sim")]
    label_prefix: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt::init();

    info!("Starting device simulator");
    info!(
        "Hub: {}, Devices: {}, Interval: {}ms",
        args.server_url, args.devices, args.interval_ms
    );

    let client = reqwest::Client::new();

    // Register the fleet up front. Labels that already exist are fine, so
    // restarting the simulator reuses its devices.
    let labels: Vec<String> = (0..args.devices)
        .map(|i| format!("{}-{}", args.label_prefix, i))
        .collect();

    for label in &labels {
        match client
            .post(format!("{}/api/v1/devices", args.server_url))
            .header("x-owner-id", args.owner_id.to_string())
            .json(&serde_json::json!({ "deviceID": label }))
            .send()
            .await
        {
            Ok(resp)
                if resp.status() == StatusCode::OK || resp.status() == StatusCode::CONFLICT => {}
            Ok(resp) => {
                error!("Failed to register {}: {}", label, resp.status());
                std::process::exit(1);
            }
            Err(e) => {
                error!("Failed to reach hub: {}", e);
                std::process::exit(1);
            }
        }
    }

    info!("Fleet of {} devices ready, starting to report", labels.len());

    let mut rng = rand::thread_rng();
    let mut round = 0u64;
    let interval = Duration::from_millis(args.interval_ms);

    loop {
        for (i, label) in labels.iter().enumerate() {
            let result = if i % 2 == 0 {
                let payload = telemetry::vault_report(&mut rng, label.clone());
                client
                    .post(format!("{}/api/v1/report", args.server_url))
                    .json(&payload)
                    .send()
                    .await
            } else {
                let payload = telemetry::monitor_report(&mut rng, label.clone());
                client
                    .post(format!("{}/api/v1/report", args.server_url))
                    .json(&payload)
                    .send()
                    .await
            };

            match result {
                Ok(resp) if resp.status().is_success() => {}
                Ok(resp) => warn!("Report for {} rejected: {}", label, resp.status()),
                Err(e) => warn!("Failed to report for {}: {}", label, e),
            }
        }

        if round % args.event_every == 0 {
            for label in labels.iter().step_by(2) {
                let payload = telemetry::vault_event(&mut rng, label.clone());
                match client
                    .post(format!("{}/api/v1/events", args.server_url))
                    .json(&payload)
                    .send()
                    .await
                {
                    Ok(resp) if resp.status().is_success() => {}
                    Ok(resp) => warn!("Event for {} rejected: {}", label, resp.status()),
                    Err(e) => warn!("Failed to submit event for {}: {}", label, e),
                }
            }
        }

        round += 1;
        if round % 100 == 0 {
            info!("Completed {} report rounds", round);
        }

        tokio::time::sleep(interval).await;
    }
}
