//! Lyric Relay - translation relay for synced song lyrics
//!
//! Entry point: runs the HTTP relay or one-shot translation and detection
//! commands against the same pipeline.

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lyric_relay::cli::{Args, Commands};
use lyric_relay::config::Config;
use lyric_relay::detect::detect_language;
use lyric_relay::error::RelayError;
use lyric_relay::server::{self, AppState};
use lyric_relay::translate::TranslationRequest;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.verbose)?;

    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if std::path::Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };
    config.apply_env();

    match args.command {
        Commands::Serve { bind, port } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            server::serve(config).await?;
        }
        Commands::Translate { target, source, providers, lines } => {
            if config.primary.token().is_none() {
                return Err(RelayError::MissingCredential("HF_TOKEN").into());
            }

            let state = AppState::from_config(config)?;
            let request = TranslationRequest::new(lines, Some(source.as_str()), Some(target.as_str()));
            let result = state.orchestrator.translate_batch(&request).await?;

            for (line, provider) in result.lines.iter().zip(&result.providers) {
                if providers {
                    let label = format!("[{:?}]", provider).to_lowercase();
                    println!("{:<14} {}", label, line);
                } else {
                    println!("{}", line);
                }
            }
        }
        Commands::Detect { text } => {
            println!("{}", detect_language(&text));
        }
        Commands::InitConfig { output } => {
            if output.exists() {
                return Err(RelayError::Config(format!(
                    "Refusing to overwrite {}",
                    output.display()
                ))
                .into());
            }
            Config::default().save_to_file(&output)?;
            println!("Wrote default configuration to {}", output.display());
        }
    }

    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".lyric-relay").join("log");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = rolling::daily(&log_dir, "lyric-relay.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Flushes on drop; must outlive every span
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("lyric-relay.log").display()
    );

    Ok(())
}
