//! Browse for speakers for a few seconds and print them as JSON
//!
//! Usage: cargo run -p klingel-discovery --example discover_json [seconds]

use klingel_discovery::{DeviceFilter, DeviceRegistry, DiscoveryListener, DiscoveryWorker};
use serde::Serialize;
use std::time::Duration;

#[derive(Serialize)]
struct SpeakerInfo {
    name: String,
    address: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let seconds = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(5);

    let registry = DeviceRegistry::new();
    let listener = DiscoveryListener::new(registry.clone(), DeviceFilter::allow_all());
    let mut worker = DiscoveryWorker::spawn(klingel_discovery::DEFAULT_SERVICE_TYPE, listener)?;

    std::thread::sleep(Duration::from_secs(seconds));
    worker.shutdown()?;

    let speakers: Vec<SpeakerInfo> = registry
        .devices()
        .into_iter()
        .map(|d| SpeakerInfo {
            name: d.name,
            address: d.address.to_string(),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&speakers)?);
    Ok(())
}
