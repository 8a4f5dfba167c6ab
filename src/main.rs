//! Operator CLI for filemount configuration files.
//!
//! ```text
//! filemount check server.json            # validate once
//! filemount check server.json --tls      # also read the PEM material
//! filemount check server.json --watch    # re-validate on every save
//! filemount print server.toml            # normalized JSON on stdout
//! ```

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use filemount::config::{load_config, Config, ConfigError, ConfigWatcher};
use filemount::net::load_tls_material;
use filemount::observability::init_logging;

#[derive(Parser)]
#[command(name = "filemount")]
#[command(about = "Validate configuration for the multi-mount file server", long_about = None)]
struct Cli {
    /// Log level used when RUST_LOG is unset
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate a configuration file
    Check {
        config: PathBuf,

        /// Also read the TLS key, certificate and root bundle
        #[arg(long)]
        tls: bool,

        /// Keep running and re-validate whenever the file changes
        #[arg(long)]
        watch: bool,
    },
    /// Print the validated configuration as JSON
    Print { config: PathBuf },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Commands::Check { config, tls, watch } => {
            let outcome = check(&config, tls);
            if watch {
                watch_config(&config, tls).await?;
            }
            outcome?;
        }
        Commands::Print { config } => {
            let loaded = load_config(&config).inspect_err(report)?;
            println!("{}", serde_json::to_string_pretty(&loaded)?);
        }
    }

    Ok(())
}

fn check(path: &Path, tls: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(path).inspect_err(report)?;
    verify(path, &config, tls)
}

fn verify(path: &Path, config: &Config, tls: bool) -> Result<(), Box<dyn std::error::Error>> {
    summarize(path, config);

    if tls {
        let material = load_tls_material(&config.ssl).inspect_err(|e| tracing::error!("{}", e))?;
        tracing::info!(
            certificates = material.certificate_chain.len(),
            roots = material.roots.len(),
            "TLS material readable"
        );
    }
    Ok(())
}

async fn watch_config(path: &Path, tls: bool) -> Result<(), Box<dyn std::error::Error>> {
    let (watcher, mut updates) = ConfigWatcher::new(path);
    let _watcher = watcher.run()?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            Some(outcome) = updates.recv() => match outcome {
                Ok(config) => {
                    let _ = verify(path, &config, tls);
                }
                Err(e) => report(&e),
            },
            _ = &mut ctrl_c => {
                tracing::info!("Stopped watching");
                return Ok(());
            }
        }
    }
}

fn summarize(path: &Path, config: &Config) {
    tracing::info!(
        path = %path.display(),
        mounts = config.mounts.len(),
        origins = config.origins.len(),
        "Configuration valid"
    );
    tracing::info!(
        key = %config.ssl.key.display(),
        certificate = %config.ssl.certificate.display(),
        root = %config.ssl.root.display(),
        "TLS"
    );
    for mount in &config.mounts {
        tracing::info!(
            name = %mount.name,
            mount_type = %mount.mount_type,
            path = %mount.path,
            directory = %mount.directory.display(),
            "Mount"
        );
    }
    for origin in &config.origins {
        tracing::info!(origin = %origin, "CORS origin");
    }
}

fn report(err: &ConfigError) {
    match err {
        ConfigError::Validation(violations) => {
            for violation in violations {
                tracing::error!(
                    field = %violation.field,
                    kind = ?violation.kind,
                    "{}",
                    violation.reason
                );
            }
            tracing::error!(count = violations.len(), "Configuration invalid");
        }
        other => tracing::error!("{}", other),
    }
}
