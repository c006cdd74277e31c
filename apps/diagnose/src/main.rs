use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    FlowEvent, HttpPredictionClient, MissingScanStore, ScanStore, UploadFlowController,
};
use shared::domain::{ProcessState, ScanId};
use storage::Storage;
use tracing_subscriber::EnvFilter;

mod config;
mod render;

#[derive(Parser, Debug)]
#[command(about = "Send a chest X-ray to the TB classifier and show the prediction")]
struct Cli {
    /// Overrides the configured prediction endpoint.
    #[arg(long)]
    predict_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one upload → predict → persist flow for an already uploaded image.
    Run {
        #[arg(long)]
        image_url: String,
        /// Existing scan record to update with the prediction.
        #[arg(long, conflicts_with = "register")]
        scan_id: Option<String>,
        /// Register a new scan record before predicting.
        #[arg(long)]
        register: bool,
        #[arg(long)]
        user_id: Option<String>,
    },
    /// Query the inference service health route.
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let mut settings = config::load_settings();
    if let Some(predict_url) = cli.predict_url {
        settings.predict_url = predict_url;
    }
    let predictor = Arc::new(HttpPredictionClient::new(&settings.predict_url)?);

    match cli.command {
        Command::Health => {
            let health = predictor.health().await?;
            println!(
                "ok={} device={} model_loaded={}",
                health.ok,
                health.device.as_deref().unwrap_or("unknown"),
                health.model_loaded
            );
        }
        Command::Run {
            image_url,
            scan_id,
            register,
            user_id,
        } => {
            let needs_storage = register || scan_id.is_some();
            let storage = if needs_storage {
                Some(
                    Storage::new(&settings.database_url)
                        .await
                        .with_context(|| {
                            format!("failed to open scan database '{}'", settings.database_url)
                        })?,
                )
            } else {
                None
            };
            let scans: Arc<dyn ScanStore> = match &storage {
                Some(storage) => Arc::new(storage.clone()),
                None => Arc::new(MissingScanStore),
            };

            let controller =
                UploadFlowController::new(predictor, scans).with_ramp(settings.progress_ramp());
            let mut events = controller.subscribe_events();
            let event_log = tokio::spawn(async move {
                while let Ok(event) = events.recv().await {
                    match event {
                        FlowEvent::StateChanged { state, .. } => {
                            tracing::info!(%state, "flow state")
                        }
                        FlowEvent::ProgressChanged(progress) => {
                            tracing::debug!(progress, "flow progress")
                        }
                        FlowEvent::PredictionReady(result) => {
                            tracing::info!(label = %result.label, "prediction ready")
                        }
                        FlowEvent::PersistenceFailed { scan_id, reason } => {
                            eprintln!("warning: scan {scan_id} was not updated: {reason}")
                        }
                    }
                }
            });

            controller.on_upload_start().await;
            let scan_id = match (&storage, register) {
                (Some(storage), true) => {
                    match storage.create_scan(user_id.as_deref(), &image_url).await {
                        Ok(scan_id) => Some(scan_id),
                        Err(err) => {
                            controller.on_upload_error(format!("{err:#}")).await;
                            None
                        }
                    }
                }
                _ => scan_id.map(ScanId::new),
            };

            let state = if controller.snapshot().await.state == ProcessState::Error {
                ProcessState::Error
            } else {
                controller.on_upload_complete(&image_url, scan_id.clone()).await
            };

            for line in render::render(&controller.view().await) {
                println!("{line}");
            }

            if let (Some(storage), Some(scan_id), ProcessState::Ready) = (&storage, &scan_id, state)
            {
                // The prediction write is detached from the flow.
                tokio::time::sleep(std::time::Duration::from_millis(200)).await;
                if let Some(scan) = storage.get_scan(scan_id).await? {
                    println!("scan {} status={}", scan.scan_id, scan.status.as_str());
                }
            }

            drop(controller);
            event_log.abort();
            if state == ProcessState::Error {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
