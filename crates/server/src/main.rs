use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{info, warn};

use exposr_server::auth::crypto::AtRestCipher;
use exposr_server::auth::password::hash_password;
use exposr_server::config::ExposrConfig;

/// Exposr image analysis server.
#[derive(Parser, Debug)]
#[command(name = "exposr-server", about = "HTTP server for the Exposr image analysis service")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "exposr.toml")]
    config: String,

    /// Override the bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port.
    #[arg(long)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt a value with ENCRYPTION_KEY. Reads plaintext from stdin.
    Encrypt,
    /// Print an Argon2 hash for ADMIN_PASSWORD_HASH. Reads the password from stdin.
    HashPassword,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Encrypt) => return run_encrypt(),
        Some(Commands::HashPassword) => return run_hash_password(),
        None => {}
    }

    // Defaults apply when the file does not exist.
    let config_found = Path::new(&cli.config).exists();
    let mut config = if config_found {
        ExposrConfig::from_toml(&std::fs::read_to_string(&cli.config)?)?
    } else {
        ExposrConfig::default()
    };
    config.apply_env_overrides(|name| std::env::var(name).ok())?;
    config.validate()?;

    let telemetry_guard =
        exposr_server::telemetry::init(&config.telemetry, config.server.log_format);

    if !config_found {
        info!(path = %cli.config, "config file not found, using defaults");
    }
    info!(environment = ?config.server.environment, "starting exposr-server");

    let state = exposr_server::factory::build_state(&config)?;
    let app = exposr_server::api::router(state);

    let host = cli.host.unwrap_or_else(|| config.server.host.clone());
    let port = cli.port.unwrap_or(config.server.port);
    let addr = format!("{host}:{port}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "exposr-server listening");

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async {
            let _ = stop_rx.await;
        })
        .await
    });

    tokio::select! {
        result = &mut server => {
            result??;
        }
        () = shutdown_signal() => {
            let _ = stop_tx.send(());
            let drain = Duration::from_secs(config.server.shutdown_timeout_seconds);
            match tokio::time::timeout(drain, server).await {
                Ok(result) => result??,
                Err(_) => warn!(
                    timeout_secs = config.server.shutdown_timeout_seconds,
                    "shutdown timeout exceeded, dropping in-flight requests"
                ),
            }
        }
    }

    telemetry_guard.shutdown();
    info!("exposr-server shut down");
    Ok(())
}

fn read_stdin() -> Result<String, Box<dyn std::error::Error>> {
    let mut input = String::new();
    std::io::Read::read_to_string(&mut std::io::stdin(), &mut input)?;
    Ok(input.trim_end_matches(['\r', '\n']).to_owned())
}

fn run_encrypt() -> Result<(), Box<dyn std::error::Error>> {
    let key = std::env::var("ENCRYPTION_KEY")
        .map_err(|_| "ENCRYPTION_KEY environment variable is required for the encrypt command")?;
    let cipher =
        AtRestCipher::from_encoded(&key).map_err(|e| format!("invalid ENCRYPTION_KEY: {e}"))?;
    println!("{}", cipher.encrypt(&read_stdin()?)?);
    Ok(())
}

fn run_hash_password() -> Result<(), Box<dyn std::error::Error>> {
    let password = read_stdin()?;
    if password.is_empty() {
        return Err("password must not be empty".into());
    }
    println!("{}", hash_password(&password)?);
    Ok(())
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}
