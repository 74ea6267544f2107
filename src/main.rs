mod chat;
mod collectors;
mod config;
mod http;
mod metrics;
mod responder;
mod snapshot;

use clap::Parser;
use collectors::system::SystemProvider;
use config::Config;
use http::AppState;
use metrics::Metrics;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sysbotd")]
#[command(version)]
struct Cli {
    #[arg(long, default_value = "./config.yaml")]
    config: String,
    #[arg(long)]
    print_default_config: bool,
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    if cli.print_default_config {
        println!("{}", Config::example_yaml());
        return;
    }

    let cfg = if Path::new(&cli.config).exists() {
        match Config::load_from_file(&cli.config) {
            Ok(cfg) => cfg,
            Err(err) => {
                error!(error = %err, "failed to load configuration");
                std::process::exit(1);
            }
        }
    } else {
        info!(path = %cli.config, "config file not found, using defaults");
        Config::default()
    };

    let addr: SocketAddr = match cfg.listen.parse() {
        Ok(addr) => addr,
        Err(err) => {
            error!(error = %err, listen = %cfg.listen, "invalid listen address");
            std::process::exit(1);
        }
    };

    let metrics = match Metrics::new() {
        Ok(metrics) => metrics,
        Err(err) => {
            error!(error = %err, "failed to initialize metrics");
            std::process::exit(1);
        }
    };

    let state = AppState {
        provider: Arc::new(SystemProvider::new(cfg.top_processes)),
        metrics,
        reply_delay: Duration::from_millis(cfg.reply_delay_ms),
        collect_timeout: Duration::from_millis(cfg.collect_timeout_ms),
    };

    info!(
        listen = %cfg.listen,
        reply_delay_ms = cfg.reply_delay_ms,
        "starting sysbotd"
    );

    let app = http::build_router(state);
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(error = %err, %addr, "failed to bind HTTP server");
            std::process::exit(1);
        }
    };

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());
    if let Err(err) = server.await {
        error!(error = %err, "HTTP server error");
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for Ctrl+C");
        return;
    }
    info!("shutdown signal received, stopping");
}
