//! Reelcast CLI entry point.

use anyhow::Result;
use clap::Parser;
use reelcast::cli::{commands, log_filter, until_cancelled, Cli, Commands};
use reelcast::config::Settings;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&std::path::PathBuf::from(path)))?,
        None => Settings::load()?,
    };

    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| {
            log_filter(cli.verbose, &settings.general.log_level)
        })))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Ctrl-C cancels whatever is in flight
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    // Execute command; an interrupt ends it even mid-request
    let command = async {
        match &cli.command {
            Commands::Run {
                source,
                narrate,
                no_narrate,
                no_upload,
                title,
            } => {
                commands::run_pipeline(source, *narrate, *no_narrate, *no_upload, title.clone(), settings, &cancel).await?;
            }

            Commands::Extract { source } => {
                commands::run_extract(source, settings).await?;
            }

            Commands::Narrate { text_file, voice } => {
                commands::run_narrate(text_file, voice.clone(), settings).await?;
            }

            Commands::Generate { text_file, timeout } => {
                commands::run_generate(text_file, *timeout, settings, &cancel).await?;
            }

            Commands::Status { job_id, wait } => {
                commands::run_status(job_id, *wait, settings, &cancel).await?;
            }

            Commands::Upload {
                video,
                thumbnail,
                title,
            } => {
                commands::run_upload(video, thumbnail.as_deref(), title, settings).await?;
            }

            Commands::Doctor => {
                commands::run_doctor(&settings)?;
            }

            Commands::Config { action } => {
                commands::run_config(action, settings)?;
            }
        }

        Ok::<_, anyhow::Error>(())
    };

    until_cancelled(&cancel, command).await
}
