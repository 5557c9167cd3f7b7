//! gatekeeper
//!
//! JWT authentication and per-client admission in front of the account API.
//!
//! ```text
//!     Client Request
//!     ──────────────▶ admission (token bucket per IP) ──429──▶
//!                          │
//!                          ▼
//!                     [protected?] auth (Bearer JWT) ──401──▶
//!                          │
//!                          ▼
//!                       handler
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use gatekeeper::auth::token::RECOMMENDED_SECRET_LEN;
use gatekeeper::config::{self, AuthConfig, ServiceConfig};
use gatekeeper::observability::{logging, metrics};
use gatekeeper::{lifecycle, HttpServer, Shutdown, TokenCodec};

#[derive(Parser)]
#[command(name = "gatekeeper")]
#[command(about = "JWT authentication and rate-limited admission gateway", long_about = None)]
struct Cli {
    /// TOML config file. Without it, defaults plus JWT_SECRET / PORT are used.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default)
    Serve,
    /// Sign a token for a subject with the configured secret
    IssueToken {
        #[arg(long)]
        subject: String,
        /// Overrides auth.token_ttl_secs
        #[arg(long, allow_negative_numbers = true)]
        ttl_secs: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => config::load_from_env()?,
    };

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::IssueToken { subject, ttl_secs } => {
            let ttl = issue_ttl(ttl_secs, &config.auth)?;
            let token = TokenCodec::new(config.auth.jwt_secret.as_bytes()).create_token(&subject, ttl)?;
            println!("{}", token);
            Ok(())
        }
    }
}

/// Lifetime for `issue-token`: the flag if given, else the configured ttl.
fn issue_ttl(ttl_secs: Option<i64>, auth: &AuthConfig) -> Result<chrono::Duration, String> {
    match ttl_secs {
        Some(secs) => chrono::Duration::try_seconds(secs)
            .ok_or_else(|| format!("--ttl-secs {secs} is out of range")),
        None => Ok(auth.token_ttl()),
    }
}

async fn serve(config: ServiceConfig) -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging(&config.observability);

    tracing::info!("gatekeeper v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        token_ttl_secs = config.auth.token_ttl_secs,
        capacity = config.rate_limit.capacity,
        refill_per_second = config.rate_limit.refill_per_second,
        idle_retention_secs = ?config.rate_limit.idle_retention_secs,
        "Configuration loaded"
    );
    if config.auth.jwt_secret.len() < RECOMMENDED_SECRET_LEN {
        tracing::warn!(
            recommended = RECOMMENDED_SECRET_LEN,
            "JWT secret is shorter than recommended"
        );
    }

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config);
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        lifecycle::signals::wait_for_signal().await;
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
