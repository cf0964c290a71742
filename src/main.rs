//! Open CORS relay.
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌───────────────────────────────────────────────┐
//!                          │                  CORS RELAY                   │
//!   Caller request         │  ┌─────────┐   ┌──────────┐   ┌────────────┐  │
//!   ───────────────────────┼─▶│  http   │──▶│  relay   │──▶│  request   │──┼──▶ Target
//!                          │  │ server  │   │  target  │   │ projection │  │
//!                          │  └────┬────┘   └──────────┘   └────────────┘  │
//!                          │       │ /cookie                               │
//!                          │       ▼                                       │
//!                          │  ┌─────────┐                  ┌────────────┐  │
//!   Caller response        │  │ session │                  │  response  │  │
//!   ◀──────────────────────┼──│  store  │      ◀───────────│ projection │◀─┼─── Target
//!                          │  └─────────┘                  └────────────┘  │
//!                          │                                               │
//!                          │  config · observability · lifecycle · tls     │
//!                          └───────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use cors_relay::config::{load_config, validate_config, ConfigError, LogFormat, RelayConfig};
use cors_relay::http::RelayServer;
use cors_relay::lifecycle::{signals, Shutdown};
use cors_relay::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "cors-relay")]
#[command(about = "Open HTTP relay adding permissive CORS headers", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Override `observability.log_format`.
    #[arg(long, value_enum)]
    log_format: Option<LogFormatArg>,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum LogFormatArg {
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => RelayConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    if let Some(format) = cli.log_format {
        config.observability.log_format = format.into();
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init_logging(&config.observability);
    tracing::info!("cors-relay v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        session_backend = ?config.session.backend,
        tls = config.listener.tls.is_some(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());

    let server = RelayServer::new(config)?;
    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
