//! Rendition pipeline
//!
//! Drives one video through the ladder: probe, mark processing, encode each
//! supported rung in ascending order, pick the default rendition and settle the
//! video on `published` or `draft`.
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


use crate::encoder::{RenditionEncoder, RenditionJobOutcome};
use crate::error::{ProcessingError, ProcessingResult};
use crate::ladder::{select_default_quality, supported_qualities};
use crate::probe::MediaProber;
use crate::store::RecordStore;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use rendition_types::{
    MediaDescription, NewQualityRecord, PipelineReport, QualityLabel, QualityPatch, QualityStatus,
    RenditionResult, VideoStatus,
};
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Error text reported when no rung could be produced
pub const ALL_FAILED: &str = "All compressions failed";

/// Orchestrates the rendition ladder of single videos
pub struct RenditionPipeline {
    store: Arc<dyn RecordStore>,
    prober: Arc<dyn MediaProber>,
    encoder: Arc<dyn RenditionEncoder>,
    pending_dir: PathBuf,
    completed_dir: PathBuf,
}

impl RenditionPipeline {
    pub fn new(
        store: Arc<dyn RecordStore>,
        prober: Arc<dyn MediaProber>,
        encoder: Arc<dyn RenditionEncoder>,
        pending_dir: impl Into<PathBuf>,
        completed_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            prober,
            encoder,
            pending_dir: pending_dir.into(),
            completed_dir: completed_dir.into(),
        }
    }

    /// Directory receiving every output of `video_id`
    pub fn output_dir(&self, video_id: Uuid) -> PathBuf {
        self.completed_dir.join(video_id.to_string())
    }

    /// Produce every supported rung of `input_path` for `video_id`.
    ///
    /// A probe failure or an unknown video returns an error before anything
    /// is written. Rung failures never escape: they show up as `failed`
    /// results, and a run where nothing reached `ready` leaves the video in
    /// `draft`.
    pub async fn process_video_qualities(
        &self,
        video_id: Uuid,
        input_path: &Path,
        video_url_base: &str,
    ) -> ProcessingResult<PipelineReport> {
        let media = self.prober.probe(input_path).await?;

        if self.store.get_video(video_id).await?.is_none() {
            return Err(ProcessingError::VideoNotFound(video_id));
        }

        self.store
            .update_video_status(video_id, VideoStatus::Processing)
            .await?;

        let supported = supported_qualities(media.height);
        info!(
            video_id = %video_id,
            width = media.width,
            height = media.height,
            rungs = supported.len(),
            "Processing video qualities"
        );

        let base_name = input_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| video_id.to_string());
        let url_base = video_url_base.trim_end_matches('/');
        let output_dir = self.output_dir(video_id);
        let processing_start = Utc::now();

        let mut results = Vec::with_capacity(supported.len());
        for quality in &supported {
            let output_filename = format!("{}_{}.mp4", base_name, quality);
            let rung = Rung {
                video_id,
                quality: *quality,
                url: format!("{}/{}/{}", url_base, video_id, output_filename),
                output_path: output_dir.join(&output_filename),
                started_at: processing_start,
            };

            if let Some(result) = self.process_rung(&rung, input_path, &media).await {
                results.push(result);
            }
        }

        let ready: Vec<QualityLabel> = results
            .iter()
            .filter(|r| r.is_ready())
            .map(|r| r.quality)
            .collect();

        if ready.is_empty() {
            self.store
                .update_video_status(video_id, VideoStatus::Draft)
                .await?;
            warn!(video_id = %video_id, "No rendition could be produced");
            return Ok(PipelineReport::failed(ALL_FAILED, results));
        }

        if let Some(default_quality) = select_default_quality(&supported, &ready) {
            self.assign_default(video_id, default_quality).await;
        }

        self.store
            .update_video_status(video_id, VideoStatus::Published)
            .await?;
        info!(
            video_id = %video_id,
            ready = ready.len(),
            failed = results.len() - ready.len(),
            "Video published"
        );

        Ok(PipelineReport::succeeded(results))
    }

    /// Process `{pending}/{filename}` and register the original on success.
    ///
    /// Never returns an error: every outcome becomes a report. Unexpected
    /// errors and panics during the run force the video to `draft`.
    pub async fn process_pending_video(
        &self,
        video_id: Uuid,
        filename: &str,
        video_url_base: &str,
    ) -> PipelineReport {
        let input_path = self.pending_dir.join(filename);

        if !tokio::fs::try_exists(&input_path).await.unwrap_or(false) {
            let err = ProcessingError::SourceMissing(input_path);
            warn!(video_id = %video_id, error = %err, "Pending video missing");
            return PipelineReport::failed(err.to_string(), Vec::new());
        }

        let run = AssertUnwindSafe(async {
            let report = self
                .process_video_qualities(video_id, &input_path, video_url_base)
                .await?;
            if report.success {
                self.register_original(video_id, &input_path, filename, video_url_base)
                    .await;
            }
            Ok::<_, ProcessingError>(report)
        })
        .catch_unwind()
        .await;

        match run {
            Ok(Ok(report)) => report,
            Ok(Err(err @ (ProcessingError::ProbeFailed { .. } | ProcessingError::VideoNotFound(_)))) => {
                warn!(video_id = %video_id, error = %err, "Video not processed");
                PipelineReport::failed(err.to_string(), Vec::new())
            }
            Ok(Err(err)) => {
                error!(video_id = %video_id, error = %err, "Error processing video");
                self.force_draft(video_id).await;
                PipelineReport::failed(err.to_string(), Vec::new())
            }
            Err(panic) => {
                let err = ProcessingError::Unexpected(panic_message(panic.as_ref()));
                error!(video_id = %video_id, error = %err, "Pipeline panicked");
                self.force_draft(video_id).await;
                PipelineReport::failed(err.to_string(), Vec::new())
            }
        }
    }

    async fn process_rung(
        &self,
        rung: &Rung,
        input_path: &Path,
        source: &MediaDescription,
    ) -> Option<RenditionResult> {
        let record = match self
            .store
            .create_quality_record(NewQualityRecord::processing(
                rung.video_id,
                rung.quality,
                rung.url.clone(),
                rung.started_at,
            ))
            .await
        {
            Ok(record) => record,
            Err(e) => {
                error!(
                    video_id = %rung.video_id,
                    quality = %rung.quality,
                    error = %e,
                    "Failed to create quality record, skipping"
                );
                return None;
            }
        };

        let outcome = self
            .encoder
            .encode(
                input_path,
                &rung.output_path,
                rung.quality,
                source.width,
                source.height,
            )
            .await;

        match outcome {
            Ok(outcome) => {
                let patch = ready_patch(&outcome, source.duration);
                if let Err(e) = self.store.update_quality_record(record.id, patch).await {
                    error!(
                        video_id = %rung.video_id,
                        quality = %rung.quality,
                        error = %e,
                        "Failed to record ready rendition"
                    );
                }
                Some(RenditionResult::ready(rung.quality, outcome.file_size))
            }
            Err(e) => {
                warn!(
                    video_id = %rung.video_id,
                    quality = %rung.quality,
                    error = %e,
                    "Rendition failed"
                );
                if let Err(store_err) = self
                    .store
                    .update_quality_status(record.id, QualityStatus::Failed)
                    .await
                {
                    error!(
                        video_id = %rung.video_id,
                        quality = %rung.quality,
                        error = %store_err,
                        "Failed to record failed rendition"
                    );
                }
                Some(RenditionResult::failed(rung.quality, e.to_string()))
            }
        }
    }

    async fn assign_default(&self, video_id: Uuid, quality: QualityLabel) {
        let records = match self.store.list_qualities(video_id).await {
            Ok(records) => records,
            Err(e) => {
                error!(video_id = %video_id, error = %e, "Failed to list qualities");
                return;
            }
        };

        let Some(record) = records
            .iter()
            .find(|r| r.quality == quality && r.status == QualityStatus::Ready)
        else {
            warn!(video_id = %video_id, quality = %quality, "Default rendition not found");
            return;
        };

        match self.store.set_default_quality(video_id, record.id).await {
            Ok(true) => info!(video_id = %video_id, quality = %quality, "Default rendition set"),
            Ok(false) => warn!(video_id = %video_id, quality = %quality, "Default rendition not set"),
            Err(e) => error!(video_id = %video_id, error = %e, "Failed to set default rendition"),
        }
    }

    /// Copy the source next to its renditions and record it as `original`.
    /// Failures are logged only.
    async fn register_original(
        &self,
        video_id: Uuid,
        input_path: &Path,
        filename: &str,
        video_url_base: &str,
    ) {
        if let Err(e) = self
            .try_register_original(video_id, input_path, filename, video_url_base)
            .await
        {
            error!(video_id = %video_id, error = %e, "Failed to register original");
        }
    }

    async fn try_register_original(
        &self,
        video_id: Uuid,
        input_path: &Path,
        filename: &str,
        video_url_base: &str,
    ) -> ProcessingResult<()> {
        let output_dir = self.output_dir(video_id);
        tokio::fs::create_dir_all(&output_dir).await?;

        let original_output = output_dir.join(filename);
        if !tokio::fs::try_exists(&original_output).await? {
            tokio::fs::copy(input_path, &original_output).await?;
        }

        let media = self.prober.probe(&original_output).await?;
        let url = format!(
            "{}/{}/{}",
            video_url_base.trim_end_matches('/'),
            video_id,
            filename
        );

        let record = self
            .store
            .create_quality_record(
                NewQualityRecord::processing(video_id, QualityLabel::Original, url, Utc::now())
                    .with_media(&media)
                    .with_status(QualityStatus::Ready),
            )
            .await?;

        self.store
            .update_quality_record(
                record.id,
                QualityPatch::new()
                    .media_attributes(&media)
                    .completed_at(Utc::now()),
            )
            .await?;

        info!(video_id = %video_id, file_size = media.file_size, "Original registered");
        Ok(())
    }

    async fn force_draft(&self, video_id: Uuid) {
        if let Err(e) = self
            .store
            .update_video_status(video_id, VideoStatus::Draft)
            .await
        {
            error!(video_id = %video_id, error = %e, "Failed to reset video to draft");
        }
    }
}

/// Everything about one rung that is fixed before encoding starts
struct Rung {
    video_id: Uuid,
    quality: QualityLabel,
    url: String,
    output_path: PathBuf,
    started_at: DateTime<Utc>,
}

fn ready_patch(outcome: &RenditionJobOutcome, source_duration: u64) -> QualityPatch {
    let mut patch = QualityPatch::new();
    if let Some(media) = &outcome.media {
        patch = patch.media_attributes(media);
    }
    patch
        .status(QualityStatus::Ready)
        .file_size(outcome.file_size)
        .resolution(outcome.width, outcome.height)
        .codec(outcome.codec.clone(), outcome.container.clone())
        .duration(source_duration)
        .encoding_time(outcome.encoding_time)
        .completed_at(Utc::now())
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "pipeline panicked".to_string()
    }
}
