use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use klingel_auth::{CredentialGuard, OAuthClient, SdmClient, TokenFile};
use klingel_discovery::{DeviceRegistry, DiscoveryListener, DiscoveryWorker};
use klingel_dispatch::Dispatcher;
use klingel_pubsub::{PubSubClient, SubscriptionLoop};
use notify_client::NotifyClient;
use tracing::{error, info, warn};

mod config;
mod logging;

use config::Config;

fn main() -> Result<()> {
    let env_file = match dotenvy::dotenv() {
        Ok(path) => Some(path),
        Err(e) if e.not_found() => None,
        Err(e) => return Err(anyhow::Error::new(e).context("Failed to read .env file")),
    };

    let config = Config::from_env().context("Failed to parse configuration")?;
    logging::init_logging(config.log_mode, &config.log_level)
        .context("Failed to initialize logging")?;

    if let Some(path) = env_file {
        info!("Loaded environment from {}", path.display());
    }
    config.print_summary();

    if let Err(e) = run(config) {
        error!("klingel failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Wire up credentials, discovery and the subscription, then block until Ctrl-C
fn run(config: Config) -> Result<()> {
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            info!("Shutdown requested");
            shutdown.store(true, Ordering::SeqCst);
        })
        .context("Failed to install Ctrl-C handler")?;
    }

    let registry = DeviceRegistry::new();
    // The grace window is measured from here
    let dispatcher = Dispatcher::new(registry.clone(), NotifyClient::new(), config.dispatch_config());

    let oauth = OAuthClient::google(&config.client_id, &config.client_secret);
    let guard = CredentialGuard::load(oauth, TokenFile::new(&config.tokens_file))
        .with_context(|| format!("Failed to load credentials from {}", config.tokens_file.display()))?;
    let guard = Arc::new(guard);

    let sdm = SdmClient::new(&config.device_client_id).context("Failed to create SDM client")?;
    if let Err(e) = sdm.check_access(&guard) {
        warn!("Device access check failed, continuing anyway: {}", e);
    }

    let listener = DiscoveryListener::new(registry, config.device_filter());
    let mut discovery = DiscoveryWorker::spawn(&config.service_type, listener)
        .context("Failed to start speaker discovery")?;

    let client = PubSubClient::new(&config.project_id, &config.subscription_id)
        .context("Failed to create Pub/Sub client")?;
    let mut subscription = SubscriptionLoop::new(client, guard, dispatcher, shutdown)
        .with_max_messages(config.max_messages);
    subscription.run();

    discovery
        .shutdown()
        .context("Failed to stop speaker discovery")?;
    info!("Stopped");
    Ok(())
}
