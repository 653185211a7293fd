//! `lgr` binary: run one reconciliation against an in-memory log service,
//! print definition digests and log group identifiers.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lgr_core::{DefinitionHash, DeploymentContext};
use lgr_handler::{HandlerConfig, InMemoryLogService, LogGroupHandler, ServiceSnapshot};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Log group reconciler
#[derive(Parser, Debug)]
#[command(name = "lgr", version, about = "Log group reconciliation handler")]
struct Cli {
    /// Emit diagnostic logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one invocation against an in-memory log service
    Reconcile {
        /// Event JSON file
        #[arg(long)]
        event: PathBuf,
        /// Service snapshot JSON file to seed the in-memory service
        #[arg(long)]
        service_state: Option<PathBuf>,
        /// Handler config TOML file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Region override
        #[arg(long)]
        region: Option<String>,
        /// Account number override
        #[arg(long)]
        account: Option<String>,
        /// Print the service snapshot after the invocation
        #[arg(long)]
        dump_state: bool,
    },

    /// Print the definition hash of a component definition
    Digest {
        /// Definition JSON file
        #[arg(long)]
        definition: PathBuf,
    },

    /// Print the identifiers of a log group
    Link {
        /// Log group name
        #[arg(long)]
        name: String,
        /// Region code
        #[arg(long)]
        region: String,
        /// Account number
        #[arg(long)]
        account: String,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))
}

fn load_config(
    path: Option<&Path>,
    region: Option<String>,
    account: Option<String>,
) -> Result<HandlerConfig> {
    let mut config = match path {
        Some(path) => HandlerConfig::from_file(path)?,
        None => HandlerConfig::default(),
    }
    .with_env_overrides();

    if let Some(region) = region {
        config = config.with_region(region);
    }
    if let Some(account) = account {
        config = config.with_account_number(account);
    }
    config.validate()?;
    Ok(config)
}

async fn reconcile(
    event: &Path,
    service_state: Option<&Path>,
    config: HandlerConfig,
    dump_state: bool,
) -> Result<bool> {
    let event = read_json(event)?;
    let snapshot: ServiceSnapshot = match service_state {
        Some(path) => serde_json::from_value(read_json(path)?)
            .with_context(|| format!("invalid service snapshot in {}", path.display()))?,
        None => ServiceSnapshot::default(),
    };

    let service = InMemoryLogService::from_snapshot(config.deployment(), snapshot);
    let handler = LogGroupHandler::new(config, service);
    let response = handler.handle(&event).await;

    tracing::info!(status = ?response.status, progress = response.progress, "invocation done");
    println!("{}", serde_json::to_string_pretty(&response)?);
    if dump_state {
        println!("{}", serde_json::to_string_pretty(&handler.service().snapshot())?);
    }
    Ok(response.is_success())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    match cli.command {
        Commands::Reconcile {
            event,
            service_state,
            config,
            region,
            account,
            dump_state,
        } => {
            let config = load_config(config.as_deref(), region, account)?;
            let success = reconcile(&event, service_state.as_deref(), config, dump_state).await?;
            if !success {
                std::process::exit(1);
            }
        }
        Commands::Digest { definition } => {
            let definition = read_json(&definition)?;
            println!("{}", DefinitionHash::compute(&definition)?);
        }
        Commands::Link {
            name,
            region,
            account,
        } => {
            let deployment = DeploymentContext::new(region, account);
            println!("arn:      {}", deployment.arn(&name));
            println!("star_arn: {}", deployment.star_arn(&name));
            println!("console:  {}", deployment.console_link(&name));
        }
    }
    Ok(())
}
