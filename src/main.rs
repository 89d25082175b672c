//! `edge-gateway`: serve HTTP/JSON in front of a gRPC backend.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use edge_gateway::config::{load_config, ConfigError, ConfigOverrides, GatewayConfig};
use edge_gateway::observability::{init_logging, init_metrics};
use edge_gateway::routing::{load_descriptor_pool, MethodRegistry};

#[derive(Parser)]
#[command(name = "edge-gateway", version)]
#[command(about = "HTTP/JSON to gRPC edge gateway", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "EDGE_GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Override listener.bind_address
    #[arg(long)]
    bind: Option<String>,

    /// Override backend.address
    #[arg(long)]
    backend: Option<String>,

    /// Override schema.descriptor_set
    #[arg(long)]
    descriptor_set: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Default)]
enum Commands {
    /// Connect to the backend and serve (default)
    #[default]
    Serve,
    /// Validate configuration and routes, print the route table, then exit
    Check,
}

fn load(cli: &Cli) -> Result<GatewayConfig, ConfigError> {
    let overrides = ConfigOverrides {
        bind_address: cli.bind.clone(),
        backend_address: cli.backend.clone(),
        descriptor_set: cli.descriptor_set.clone(),
    };
    load_config(cli.config.as_deref(), &overrides)
}

fn check(config: &GatewayConfig) -> Result<(), Box<dyn std::error::Error>> {
    let pool = load_descriptor_pool(config.schema.descriptor_set.as_deref())?;
    let registry = MethodRegistry::from_routes(&pool, &config.routes)?;

    for route in registry.iter() {
        println!(
            "{:<7} {:<40} {}",
            route.verb().as_str(),
            route.template().as_str(),
            route.rpc_name()
        );
    }
    println!("{} route(s) OK", registry.len());
    Ok(())
}

async fn serve(config: GatewayConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        init_metrics(addr)?;
    }

    let gateway = edge_gateway::start(&config).await?;
    let report = gateway.run().await?;

    tracing::info!(forced = report.forced, abandoned = report.abandoned, "Shutdown complete");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load(&cli)?;
    init_logging(&config.observability);

    let result = match cli.command.unwrap_or_default() {
        Commands::Check => check(&config),
        Commands::Serve => serve(config).await,
    };
    if let Err(e) = &result {
        tracing::error!(error = %e, "Gateway failed");
    }
    result
}
