//! pubmesh daemon binary.
//!
//! Loads configuration and runs the overlay routing node.

use clap::Parser;
use pubmesh::{Config, ConfigError, Event, Node};
use std::path::PathBuf;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

/// Topic pub/sub overlay routing daemon
#[derive(Parser, Debug)]
#[command(name = "pubmeshd", version, about)]
struct Args {
    /// Path to configuration file (overrides default search paths)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn init_logging() {
    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();
    fmt().with_env_filter(filter).with_target(true).init();
}

/// Resolve the daemon configuration.
///
/// An explicit `--config` file replaces the search-path cascade entirely;
/// otherwise every file found along the cascade is merged.
fn load_config(args: &Args) -> Result<Config, ConfigError> {
    if let Some(path) = &args.config {
        let config = Config::load_file(path)?;
        info!(path = %path.display(), "using explicit config file");
        return Ok(config);
    }
    let (config, merged) = Config::load()?;
    if merged.is_empty() {
        info!("no config files found, using defaults");
    } else {
        info!(files = merged.len(), "merged config cascade");
        for path in &merged {
            debug!(path = %path.display(), "merged config file");
        }
    }
    Ok(config)
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_logging();
    let args = Args::parse();

    info!("pubmesh starting");

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("configuration error: {e}");
            std::process::exit(1);
        }
    };
    if !config.has_id() {
        warn!("no peer id configured, generating an ephemeral one");
    }

    let mut node = Node::new(config);
    info!(
        id = %node.id(),
        forward = node.config().forward(),
        ttl = node.ttl(),
        "node ready"
    );

    let sender = node.sender();
    let mut task = tokio::spawn(async move { node.run().await });

    info!("pubmesh running, press Ctrl+C to exit");

    tokio::select! {
        result = &mut task => {
            match result {
                Ok(Ok(())) => info!("Event loop exited"),
                Ok(Err(e)) => error!("Event loop error: {}", e),
                Err(e) => error!("Node task failed: {}", e),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
            let _ = sender.send(Event::Shutdown);
            match task.await {
                Ok(Ok(())) => info!("Drain complete"),
                Ok(Err(e)) => warn!("Error during shutdown: {}", e),
                Err(e) => error!("Node task failed: {}", e),
            }
        }
    }

    info!("pubmesh shutdown complete");
}
