//! Media Processor
//!
//! Command line entry point of the rendition engine:
//! - `process`: run one pending video through the ladder
//! - `batch`: run a list of pending videos with bounded concurrency
//! - `plan`: print the ladder a source resolution would produce
//! - `qualities`: list the stored renditions of a video
// Copyright 2025 Francisco F. Pinochet
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use media_processor::{
    rendition_spec, supported_qualities, BatchCoordinator, EncodePath, EncodePlan, FfmpegEncoder,
    FfprobeProber, InMemoryRecordStore, MediaProber, PostgresRecordStore, RecordStore,
    RenditionPipeline,
};
use rendition_config::AppConfig;
use rendition_logging::init_from_format;
use rendition_types::{VideoRecord, VideoStatus, VideoTask};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "media-processor", version, about = "Rendition ladder transcoding engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process one file from the pending directory
    Process {
        #[arg(long)]
        video_id: Uuid,
        /// File name under PENDING_DIR
        #[arg(long)]
        filename: String,
        /// Overrides VIDEO_URL_BASE
        #[arg(long)]
        url_base: Option<String>,
    },
    /// Process a JSON array of `{video_id, filename, video_url_base?}` tasks
    Batch {
        #[arg(long)]
        tasks: PathBuf,
        /// Overrides MAX_WORKERS
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Print the renditions planned for a source resolution
    Plan {
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
    },
    /// List the stored renditions of a video
    Qualities {
        #[arg(long)]
        video_id: Uuid,
    },
}

#[derive(Serialize)]
struct PlannedRendition {
    quality: String,
    width: u32,
    height: u32,
    bitrate: Option<String>,
    scale: Option<String>,
    original_quality: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::from_env()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_from_format("media-processor", config.log_level(), config.log_format);

    match cli.command {
        Command::Process {
            video_id,
            filename,
            url_base,
        } => {
            let store = open_store(&config, &[video_id]).await?;
            let pipeline = build_pipeline(&config, store);
            let url_base = url_base.unwrap_or_else(|| config.video_url_base.clone());

            info!(video_id = %video_id, filename = %filename, "Processing video");
            let report = pipeline
                .process_pending_video(video_id, &filename, &url_base)
                .await;
            print_json(&report)?;

            if !report.success {
                std::process::exit(1);
            }
        }
        Command::Batch { tasks, workers } => {
            let raw = tokio::fs::read_to_string(&tasks)
                .await
                .with_context(|| format!("Failed to read tasks file {}", tasks.display()))?;
            let tasks: Vec<VideoTask> =
                serde_json::from_str(&raw).context("Tasks file is not a JSON array of tasks")?;

            let ids: Vec<Uuid> = tasks.iter().map(|t| t.video_id).collect();
            let store = open_store(&config, &ids).await?;
            let pipeline = Arc::new(build_pipeline(&config, store));

            let coordinator = BatchCoordinator::new(pipeline)
                .with_max_workers(workers.unwrap_or(config.max_workers))
                .with_default_url_base(config.video_url_base.clone());
            let report = coordinator.run(tasks).await;
            print_json(&report)?;
        }
        Command::Plan { width, height } => {
            let mut planned = Vec::new();
            for quality in supported_qualities(height) {
                let plan = EncodePlan::new(quality, width, height)?;
                planned.push(PlannedRendition {
                    quality: quality.to_string(),
                    width: plan.target_width,
                    height: plan.target_height,
                    bitrate: rendition_spec(quality).map(|spec| spec.bitrate_arg()),
                    scale: plan.scale_filter(),
                    original_quality: plan.is_original_quality,
                });
            }
            print_json(&planned)?;
        }
        Command::Qualities { video_id } => {
            let store = open_store(&config, &[]).await?;
            let records = store.list_qualities(video_id).await?;
            print_json(&records)?;
        }
    }

    Ok(())
}

/// Postgres when DATABASE_URL is set, otherwise an in-memory store seeded
/// with the videos about to be processed.
async fn open_store(config: &AppConfig, seed: &[Uuid]) -> Result<Arc<dyn RecordStore>> {
    if let Some(url) = &config.database_url {
        let store = PostgresRecordStore::connect(url)
            .await
            .context("Failed to connect to record database")?;
        return Ok(Arc::new(store));
    }

    warn!("DATABASE_URL not configured, using in-memory record store");
    let store = InMemoryRecordStore::new();
    for video_id in seed {
        store
            .insert_video(VideoRecord::new(*video_id, None, VideoStatus::Draft))
            .await;
    }
    Ok(Arc::new(store))
}

fn build_pipeline(config: &AppConfig, store: Arc<dyn RecordStore>) -> RenditionPipeline {
    let prober: Arc<dyn MediaProber> = Arc::new(FfprobeProber::new(config.ffprobe_path.clone()));
    let encoder = FfmpegEncoder::new(
        config.ffmpeg_path.clone(),
        EncodePath::from_backend(config.encoder_backend),
        prober.clone(),
    )
    .with_timeout(config.encode_timeout());

    RenditionPipeline::new(
        store,
        prober,
        Arc::new(encoder),
        config.pending_dir.clone(),
        config.completed_dir.clone(),
    )
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
