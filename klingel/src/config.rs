//! Command line arguments, environment overrides and validation

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use klingel_discovery::DeviceFilter;
use klingel_dispatch::{DispatchConfig, DOORBELL_CHIME_EVENT};
use tracing::info;

use crate::logging::LoggingMode;

/// Rings the speakers on the local network when the doorbell is pressed
///
/// Credentials and the Pub/Sub subscription are usually supplied through the
/// environment or a `.env` file; environment variables take precedence over
/// flags.
#[derive(Parser, Debug, Clone)]
#[command(name = "klingel", version)]
pub struct Args {
    /// Google Cloud project of the Pub/Sub subscription [env: PROJECT_ID]
    #[arg(long)]
    pub project_id: Option<String>,

    /// Pub/Sub subscription receiving device events [env: SUBSCRIPTION_ID]
    #[arg(long)]
    pub subscription_id: Option<String>,

    /// OAuth client id [env: CLIENT_ID]
    #[arg(long)]
    pub client_id: Option<String>,

    /// OAuth client secret [env: CLIENT_SECRET]
    #[arg(long)]
    pub client_secret: Option<String>,

    /// Device Access project id [env: DEVICE_CLIENT_ID]
    #[arg(long)]
    pub device_client_id: Option<String>,

    /// JSON file holding the OAuth tokens [env: TOKENS_FILE]
    #[arg(long)]
    pub tokens_file: Option<PathBuf>,

    /// Seconds after start during which events are dropped [env: KLINGEL_GRACE_PERIOD_SECS]
    #[arg(long, default_value = "120")]
    pub grace_period_secs: u64,

    /// Seconds a doorbell press is remembered for deduplication [env: KLINGEL_DEDUP_TTL_SECS]
    #[arg(long, default_value = "86400")]
    pub dedup_ttl_secs: u64,

    /// Skip speakers whose name contains this text; repeatable [env: KLINGEL_EXCLUDE, comma separated]
    #[arg(long = "exclude", value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// mDNS service type announced by the speakers
    #[arg(long, default_value = klingel_discovery::DEFAULT_SERVICE_TYPE)]
    pub service_type: String,

    /// Messages requested per pull
    #[arg(long, default_value = "10")]
    pub max_messages: u32,

    /// Log level or filter directives, e.g. `debug` or `info,klingel_dispatch=trace` [env: KLINGEL_LOG_LEVEL]
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Log format (compact, debug, json) [env: KLINGEL_LOG_MODE]
    #[arg(long, default_value = "compact")]
    pub log_mode: String,
}

impl Args {
    /// Override fields with the environment variables `var` returns
    pub fn apply_env<F>(&mut self, var: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = var("PROJECT_ID") {
            self.project_id = Some(value);
        }
        if let Some(value) = var("SUBSCRIPTION_ID") {
            self.subscription_id = Some(value);
        }
        if let Some(value) = var("CLIENT_ID") {
            self.client_id = Some(value);
        }
        if let Some(value) = var("CLIENT_SECRET") {
            self.client_secret = Some(value);
        }
        if let Some(value) = var("DEVICE_CLIENT_ID") {
            self.device_client_id = Some(value);
        }
        if let Some(value) = var("TOKENS_FILE") {
            self.tokens_file = Some(PathBuf::from(value));
        }

        if let Some(value) = var("KLINGEL_GRACE_PERIOD_SECS") {
            self.grace_period_secs = value
                .trim()
                .parse()
                .context("Invalid KLINGEL_GRACE_PERIOD_SECS environment variable")?;
        }
        if let Some(value) = var("KLINGEL_DEDUP_TTL_SECS") {
            self.dedup_ttl_secs = value
                .trim()
                .parse()
                .context("Invalid KLINGEL_DEDUP_TTL_SECS environment variable")?;
        }
        if let Some(value) = var("KLINGEL_EXCLUDE") {
            self.exclude = value
                .split(',')
                .map(str::trim)
                .filter(|pattern| !pattern.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(value) = var("KLINGEL_LOG_LEVEL") {
            self.log_level = value;
        }
        if let Some(value) = var("KLINGEL_LOG_MODE") {
            self.log_mode = value;
        }

        Ok(())
    }

    /// Validate command line arguments
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("PROJECT_ID", self.project_id.is_some()),
            ("SUBSCRIPTION_ID", self.subscription_id.is_some()),
            ("CLIENT_ID", self.client_id.is_some()),
            ("CLIENT_SECRET", self.client_secret.is_some()),
            ("DEVICE_CLIENT_ID", self.device_client_id.is_some()),
            ("TOKENS_FILE", self.tokens_file.is_some()),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, present)| !present)
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(anyhow!("Missing required configuration: {}", missing.join(", ")));
        }

        if self.dedup_ttl_secs == 0 {
            return Err(anyhow!("Dedup TTL must be positive"));
        }

        if self.max_messages == 0 {
            return Err(anyhow!("Max messages must be at least 1"));
        }

        tracing_subscriber::EnvFilter::try_new(&self.log_level)
            .map_err(|e| anyhow!("Invalid log level '{}': {}", self.log_level, e))?;

        self.log_mode.parse::<LoggingMode>()?;

        Ok(())
    }
}

/// Validated daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub project_id: String,
    pub subscription_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub device_client_id: String,
    pub tokens_file: PathBuf,
    pub grace_period: Duration,
    pub dedup_ttl: Duration,
    pub exclude: Vec<String>,
    pub service_type: String,
    pub max_messages: u32,
    pub log_level: String,
    pub log_mode: LoggingMode,
}

impl TryFrom<Args> for Config {
    type Error = anyhow::Error;

    fn try_from(args: Args) -> Result<Self> {
        args.validate()?;
        let log_mode: LoggingMode = args.log_mode.parse()?;

        let required = |value: Option<String>, name: &str| {
            value.ok_or_else(|| anyhow!("Missing required configuration: {}", name))
        };

        Ok(Self {
            project_id: required(args.project_id, "PROJECT_ID")?,
            subscription_id: required(args.subscription_id, "SUBSCRIPTION_ID")?,
            client_id: required(args.client_id, "CLIENT_ID")?,
            client_secret: required(args.client_secret, "CLIENT_SECRET")?,
            device_client_id: required(args.device_client_id, "DEVICE_CLIENT_ID")?,
            tokens_file: args
                .tokens_file
                .ok_or_else(|| anyhow!("Missing required configuration: TOKENS_FILE"))?,
            grace_period: Duration::from_secs(args.grace_period_secs),
            dedup_ttl: Duration::from_secs(args.dedup_ttl_secs),
            exclude: args.exclude,
            service_type: args.service_type,
            max_messages: args.max_messages,
            log_level: args.log_level,
            log_mode,
        })
    }
}

impl Config {
    /// Parse flags, apply the process environment and validate
    pub fn from_env() -> Result<Self> {
        let mut args = Args::parse();
        args.apply_env(|name| std::env::var(name).ok())?;
        Config::try_from(args)
    }

    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            grace_period: self.grace_period,
            dedup_ttl: self.dedup_ttl,
            event_type: DOORBELL_CHIME_EVENT.to_string(),
        }
    }

    pub fn device_filter(&self) -> DeviceFilter {
        DeviceFilter::new(self.exclude.iter().cloned())
    }

    /// Log the configuration, secrets left out
    pub fn print_summary(&self) {
        info!("Configuration:");
        info!("  Subscription: projects/{}/subscriptions/{}", self.project_id, self.subscription_id);
        info!("  Device access project: {}", self.device_client_id);
        info!("  Tokens file: {}", self.tokens_file.display());
        info!("  Grace period: {}s", self.grace_period.as_secs());
        info!("  Dedup TTL: {}s", self.dedup_ttl.as_secs());
        info!("  Excluded speakers: {:?}", self.exclude);
        info!("  Service type: {}", self.service_type);
        info!("  Max messages per pull: {}", self.max_messages);
    }
}
