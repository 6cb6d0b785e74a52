//! Test doubles shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use media_processor::{
    EncodePlan, InMemoryRecordStore, MediaProber, ProcessingError, ProcessingResult,
    RecordStore, RenditionEncoder, RenditionJobOutcome, RenditionPipeline, StoreError,
    StoreResult,
};
use rendition_types::{
    MediaDescription, NewQualityRecord, QualityLabel, QualityPatch, QualityStatus,
    VideoQualityRecord, VideoRecord, VideoStatus,
};
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;

pub fn media(width: u32, height: u32) -> MediaDescription {
    MediaDescription {
        width,
        height,
        duration: 42,
        bitrate: Some(5000),
        codec: "h264".to_string(),
        container: "mov".to_string(),
        fps: Some(30.0),
        pixel_format: Some("yuv420p".to_string()),
        color_space: None,
        color_range: None,
        aspect_ratio: format!("{}:{}", width, height),
        frame_count: Some(1260),
        audio_codec: Some("aac".to_string()),
        audio_bitrate: Some(128),
        audio_sample_rate: Some(48000),
        audio_channels: Some(2),
        file_size: 0,
    }
}

/// Reports the same description for every file
pub struct FakeProber {
    media: MediaDescription,
    fail: bool,
}

impl FakeProber {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            media: media(width, height),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            media: media(1920, 1080),
            fail: true,
        }
    }
}

#[async_trait]
impl MediaProber for FakeProber {
    async fn probe(&self, path: &Path) -> ProcessingResult<MediaDescription> {
        if self.fail {
            return Err(ProcessingError::probe_failed(path, "unreadable"));
        }
        let mut media = self.media.clone();
        media.file_size = tokio::fs::metadata(path).await.map(|m| m.len()).unwrap_or(0);
        Ok(media)
    }
}

/// Writes a small file per rung and tracks how many encodes overlap
#[derive(Default)]
pub struct FakeEncoder {
    pub failing: HashSet<QualityLabel>,
    pub panic_on: Option<QualityLabel>,
    pub delay: Duration,
    pub active: AtomicUsize,
    pub max_active: AtomicUsize,
    pub calls: AtomicUsize,
}

impl FakeEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(qualities: &[QualityLabel]) -> Self {
        Self {
            failing: qualities.iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn panicking_on(quality: QualityLabel) -> Self {
        Self {
            panic_on: Some(quality),
            ..Self::default()
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RenditionEncoder for FakeEncoder {
    async fn encode(
        &self,
        _input: &Path,
        output: &Path,
        quality: QualityLabel,
        source_width: u32,
        source_height: u32,
    ) -> ProcessingResult<RenditionJobOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panic_on == Some(quality) {
            panic!("encoder exploded on {}", quality);
        }

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(&quality) {
            return Err(ProcessingError::EncodeFailed {
                quality,
                diagnostic: "exit status: 1".to_string(),
            });
        }

        let plan = EncodePlan::new(quality, source_width, source_height)?;
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(output, quality.as_str().as_bytes()).await?;

        Ok(RenditionJobOutcome {
            width: plan.target_width,
            height: plan.target_height,
            file_size: quality.as_str().len() as u64,
            encoding_time: 1,
            codec: "h264".to_string(),
            container: "mp4".to_string(),
            media: None,
        })
    }
}

/// In-memory store that refuses to create records for some qualities
pub struct FlakyStore {
    pub inner: InMemoryRecordStore,
    pub reject: HashSet<QualityLabel>,
}

#[async_trait]
impl RecordStore for FlakyStore {
    async fn get_video(&self, video_id: Uuid) -> StoreResult<Option<VideoRecord>> {
        self.inner.get_video(video_id).await
    }

    async fn update_video_status(&self, video_id: Uuid, status: VideoStatus) -> StoreResult<bool> {
        self.inner.update_video_status(video_id, status).await
    }

    async fn create_quality_record(&self, record: NewQualityRecord) -> StoreResult<VideoQualityRecord> {
        if self.reject.contains(&record.quality) {
            return Err(StoreError::Database("connection reset".to_string()));
        }
        self.inner.create_quality_record(record).await
    }

    async fn update_quality_record(&self, quality_id: Uuid, patch: QualityPatch) -> StoreResult<bool> {
        self.inner.update_quality_record(quality_id, patch).await
    }

    async fn update_quality_status(&self, quality_id: Uuid, status: QualityStatus) -> StoreResult<bool> {
        self.inner.update_quality_status(quality_id, status).await
    }

    async fn list_qualities(&self, video_id: Uuid) -> StoreResult<Vec<VideoQualityRecord>> {
        self.inner.list_qualities(video_id).await
    }

    async fn set_default_quality(&self, video_id: Uuid, quality_id: Uuid) -> StoreResult<bool> {
        self.inner.set_default_quality(video_id, quality_id).await
    }
}

/// Pending and completed directories under one temp dir
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("pending")).expect("pending dir");
        Self { dir }
    }

    pub fn pending(&self) -> std::path::PathBuf {
        self.dir.path().join("pending")
    }

    pub fn completed(&self) -> std::path::PathBuf {
        self.dir.path().join("completed")
    }

    pub fn add_pending(&self, filename: &str) {
        std::fs::write(self.pending().join(filename), b"source bytes").expect("pending file");
    }

    pub fn pipeline(
        &self,
        store: Arc<dyn RecordStore>,
        prober: FakeProber,
        encoder: Arc<FakeEncoder>,
    ) -> RenditionPipeline {
        RenditionPipeline::new(
            store,
            Arc::new(prober),
            encoder,
            self.pending(),
            self.completed(),
        )
    }
}

pub async fn seeded_store(video_ids: &[Uuid], status: VideoStatus) -> Arc<InMemoryRecordStore> {
    let store = InMemoryRecordStore::new();
    for id in video_ids {
        store
            .insert_video(VideoRecord::new(*id, Some("clip".to_string()), status.clone()))
            .await;
    }
    Arc::new(store)
}
