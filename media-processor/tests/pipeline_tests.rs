//! Rendition pipeline integration tests

mod common;

use common::{seeded_store, FakeEncoder, FakeProber, FlakyStore, Workspace};
use media_processor::pipeline::ALL_FAILED;
use media_processor::{InMemoryRecordStore, RecordStore};
use rendition_types::{QualityLabel, QualityStatus, VideoStatus};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use QualityLabel::*;

async fn video_status(store: &InMemoryRecordStore, video_id: Uuid) -> VideoStatus {
    store.get_video(video_id).await.unwrap().unwrap().status
}

async fn default_quality(store: &InMemoryRecordStore, video_id: Uuid) -> Option<QualityLabel> {
    let defaults: Vec<QualityLabel> = store
        .list_qualities(video_id)
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.is_default)
        .map(|r| r.quality)
        .collect();
    assert!(defaults.len() <= 1, "more than one default: {:?}", defaults);
    defaults.first().copied()
}

#[tokio::test]
async fn test_default_prefers_1080_when_720_failed() {
    let ws = Workspace::new();
    ws.add_pending("clip.mov");
    let video_id = Uuid::new_v4();
    let store = seeded_store(&[video_id], VideoStatus::Draft).await;
    let encoder = Arc::new(FakeEncoder::failing(&[P144, P240, P720]));
    let pipeline = ws.pipeline(store.clone(), FakeProber::new(1920, 1080), encoder);

    let report = pipeline
        .process_pending_video(video_id, "clip.mov", "https://cdn.test/videos")
        .await;

    assert!(report.success);
    let ready: Vec<QualityLabel> = report
        .results
        .iter()
        .filter(|r| r.is_ready())
        .map(|r| r.quality)
        .collect();
    assert_eq!(ready, vec![P360, P480, P1080]);
    assert_eq!(report.results.len(), 6);
    assert_eq!(default_quality(&store, video_id).await, Some(P1080));
    assert_eq!(video_status(&store, video_id).await, VideoStatus::Published);
}

#[tokio::test]
async fn test_default_prefers_720() {
    let ws = Workspace::new();
    ws.add_pending("clip.mov");
    let video_id = Uuid::new_v4();
    let store = seeded_store(&[video_id], VideoStatus::Draft).await;
    let pipeline = ws.pipeline(store.clone(), FakeProber::new(3840, 2160), Arc::new(FakeEncoder::new()));

    let report = pipeline
        .process_pending_video(video_id, "clip.mov", "https://cdn.test/videos")
        .await;

    assert!(report.success);
    assert_eq!(report.ready_count(), 8);
    assert_eq!(default_quality(&store, video_id).await, Some(P720));
}

#[tokio::test]
async fn test_default_falls_back_to_lowest_ready() {
    let ws = Workspace::new();
    ws.add_pending("clip.mov");
    let video_id = Uuid::new_v4();
    let store = seeded_store(&[video_id], VideoStatus::Draft).await;
    let encoder = Arc::new(FakeEncoder::failing(&[P360, P480, P720]));
    let pipeline = ws.pipeline(store.clone(), FakeProber::new(1280, 720), encoder);

    let report = pipeline
        .process_pending_video(video_id, "clip.mov", "https://cdn.test/videos")
        .await;

    assert!(report.success);
    assert_eq!(default_quality(&store, video_id).await, Some(P144));
}

#[tokio::test]
async fn test_all_failed_leaves_video_in_draft() {
    let ws = Workspace::new();
    ws.add_pending("clip.mov");
    let video_id = Uuid::new_v4();
    let store = seeded_store(&[video_id], VideoStatus::Published).await;
    let encoder = Arc::new(FakeEncoder::failing(&[P144, P240, P360]));
    let pipeline = ws.pipeline(store.clone(), FakeProber::new(640, 360), encoder);

    let report = pipeline
        .process_pending_video(video_id, "clip.mov", "https://cdn.test/videos")
        .await;

    assert!(!report.success);
    assert_eq!(report.error.as_deref(), Some(ALL_FAILED));
    assert_eq!(report.results.len(), 3);
    assert!(report.results.iter().all(|r| r.error.is_some()));
    assert_eq!(video_status(&store, video_id).await, VideoStatus::Draft);
    assert_eq!(default_quality(&store, video_id).await, None);

    let records = store.list_qualities(video_id).await.unwrap();
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.status == QualityStatus::Failed));
    // no original is registered for a failed run
    assert!(!ws.completed().join(video_id.to_string()).join("clip.mov").exists());
}

#[tokio::test]
async fn test_partial_success_is_published() {
    let ws = Workspace::new();
    ws.add_pending("clip.mov");
    let video_id = Uuid::new_v4();
    let store = seeded_store(&[video_id], VideoStatus::Draft).await;
    let encoder = Arc::new(FakeEncoder::failing(&[P240]));
    let pipeline = ws.pipeline(store.clone(), FakeProber::new(426, 240), encoder);

    let report = pipeline
        .process_pending_video(video_id, "clip.mov", "https://cdn.test/videos")
        .await;

    assert!(report.success);
    assert_eq!(report.results.len(), 2);
    assert_eq!(report.results[0].quality, P144);
    assert_eq!(report.results[0].status, QualityStatus::Ready);
    assert_eq!(report.results[1].quality, P240);
    assert_eq!(report.results[1].status, QualityStatus::Failed);
    assert_eq!(default_quality(&store, video_id).await, Some(P144));
    assert_eq!(video_status(&store, video_id).await, VideoStatus::Published);
}

#[tokio::test]
async fn test_tiny_source_has_empty_ladder() {
    let ws = Workspace::new();
    ws.add_pending("tiny.mov");
    let video_id = Uuid::new_v4();
    let store = seeded_store(&[video_id], VideoStatus::Processing).await;
    let encoder = Arc::new(FakeEncoder::new());
    let pipeline = ws.pipeline(store.clone(), FakeProber::new(160, 120), encoder.clone());

    let report = pipeline
        .process_pending_video(video_id, "tiny.mov", "https://cdn.test/videos")
        .await;

    assert!(!report.success);
    assert!(report.results.is_empty());
    assert_eq!(encoder.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert_eq!(video_status(&store, video_id).await, VideoStatus::Draft);
}

#[tokio::test]
async fn test_probe_failure_changes_nothing() {
    let ws = Workspace::new();
    ws.add_pending("clip.mov");
    let video_id = Uuid::new_v4();
    let store = seeded_store(&[video_id], VideoStatus::from("uploaded")).await;
    let pipeline = ws.pipeline(store.clone(), FakeProber::failing(), Arc::new(FakeEncoder::new()));

    let report = pipeline
        .process_pending_video(video_id, "clip.mov", "https://cdn.test/videos")
        .await;

    assert!(!report.success);
    assert!(report.error.unwrap().contains("Probe failed"));
    assert_eq!(video_status(&store, video_id).await, VideoStatus::from("uploaded"));
    assert!(store.list_qualities(video_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_pending_file_changes_nothing() {
    let ws = Workspace::new();
    let video_id = Uuid::new_v4();
    let store = seeded_store(&[video_id], VideoStatus::from("uploaded")).await;
    let pipeline = ws.pipeline(store.clone(), FakeProber::new(1280, 720), Arc::new(FakeEncoder::new()));

    let report = pipeline
        .process_pending_video(video_id, "absent.mov", "https://cdn.test/videos")
        .await;

    assert!(!report.success);
    assert!(report.error.unwrap().contains("Video file not found"));
    assert_eq!(video_status(&store, video_id).await, VideoStatus::from("uploaded"));
}

#[tokio::test]
async fn test_unknown_video_is_reported() {
    let ws = Workspace::new();
    ws.add_pending("clip.mov");
    let video_id = Uuid::new_v4();
    let store = seeded_store(&[], VideoStatus::Draft).await;
    let encoder = Arc::new(FakeEncoder::new());
    let pipeline = ws.pipeline(store.clone(), FakeProber::new(1280, 720), encoder.clone());

    let report = pipeline
        .process_pending_video(video_id, "clip.mov", "https://cdn.test/videos")
        .await;

    assert!(!report.success);
    assert!(report.error.unwrap().contains("Video not found"));
    assert_eq!(encoder.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert!(store.list_qualities(video_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_record_store_failure_skips_rung() {
    let ws = Workspace::new();
    ws.add_pending("clip.mov");
    let video_id = Uuid::new_v4();
    let inner = InMemoryRecordStore::new();
    inner
        .insert_video(rendition_types::VideoRecord::new(video_id, None, VideoStatus::Draft))
        .await;
    let store = Arc::new(FlakyStore {
        inner,
        reject: HashSet::from([P360]),
    });
    let encoder = Arc::new(FakeEncoder::new());
    let pipeline = ws.pipeline(store.clone(), FakeProber::new(640, 360), encoder.clone());

    let report = pipeline
        .process_pending_video(video_id, "clip.mov", "https://cdn.test/videos")
        .await;

    assert!(report.success);
    let qualities: Vec<QualityLabel> = report.results.iter().map(|r| r.quality).collect();
    assert_eq!(qualities, vec![P144, P240]);
    assert_eq!(encoder.calls.load(std::sync::atomic::Ordering::SeqCst), 2);

    let records = store.list_qualities(video_id).await.unwrap();
    let default: Vec<QualityLabel> = records.iter().filter(|r| r.is_default).map(|r| r.quality).collect();
    assert_eq!(default, vec![P144]);
}

#[tokio::test]
async fn test_panic_forces_draft() {
    let ws = Workspace::new();
    ws.add_pending("clip.mov");
    let video_id = Uuid::new_v4();
    let store = seeded_store(&[video_id], VideoStatus::Published).await;
    let encoder = Arc::new(FakeEncoder::panicking_on(P240));
    let pipeline = ws.pipeline(store.clone(), FakeProber::new(1280, 720), encoder);

    let report = pipeline
        .process_pending_video(video_id, "clip.mov", "https://cdn.test/videos")
        .await;

    assert!(!report.success);
    assert!(report.error.unwrap().contains("encoder exploded"));
    assert_eq!(video_status(&store, video_id).await, VideoStatus::Draft);
}

#[tokio::test]
async fn test_outputs_and_urls_layout() {
    let ws = Workspace::new();
    ws.add_pending("holiday.mov");
    let video_id = Uuid::new_v4();
    let store = seeded_store(&[video_id], VideoStatus::Draft).await;
    let pipeline = ws.pipeline(store.clone(), FakeProber::new(854, 480), Arc::new(FakeEncoder::new()));

    let report = pipeline
        .process_pending_video(video_id, "holiday.mov", "https://cdn.test/videos/")
        .await;
    assert!(report.success);

    let output_dir = ws.completed().join(video_id.to_string());
    for quality in ["144p", "240p", "360p", "480p"] {
        assert!(output_dir.join(format!("holiday_{}.mp4", quality)).is_file());
    }

    let records = store.list_qualities(video_id).await.unwrap();
    let p144 = records.iter().find(|r| r.quality == P144).unwrap();
    assert_eq!(
        p144.url,
        format!("https://cdn.test/videos/{}/holiday_144p.mp4", video_id)
    );
    assert_eq!(p144.status, QualityStatus::Ready);
    assert_eq!(p144.resolution_width, Some(256));
    assert_eq!(p144.resolution_height, Some(144));
    assert_eq!(p144.duration, Some(42));
    assert_eq!(p144.codec.as_deref(), Some("h264"));
    assert_eq!(p144.container.as_deref(), Some("mp4"));
    assert!(p144.processing_completed_at.is_some());

    // one shared start time for every rung of the run
    let starts: HashSet<_> = records
        .iter()
        .filter(|r| !r.quality.is_original())
        .map(|r| r.processing_started_at)
        .collect();
    assert_eq!(starts.len(), 1);
}

#[tokio::test]
async fn test_original_registered_after_success() {
    let ws = Workspace::new();
    ws.add_pending("clip.mov");
    let video_id = Uuid::new_v4();
    let store = seeded_store(&[video_id], VideoStatus::Draft).await;
    let pipeline = ws.pipeline(store.clone(), FakeProber::new(640, 360), Arc::new(FakeEncoder::new()));

    let report = pipeline
        .process_pending_video(video_id, "clip.mov", "https://cdn.test/videos")
        .await;
    assert!(report.success);

    let copied = ws.completed().join(video_id.to_string()).join("clip.mov");
    assert_eq!(std::fs::read(&copied).unwrap(), b"source bytes");

    let records = store.list_qualities(video_id).await.unwrap();
    let original = records.last().unwrap();
    assert_eq!(original.quality, Original);
    assert_eq!(original.status, QualityStatus::Ready);
    assert!(!original.is_default);
    assert_eq!(original.url, format!("https://cdn.test/videos/{}/clip.mov", video_id));
    assert_eq!(original.file_size, Some(12));
    assert_eq!(original.resolution_width, Some(640));
    assert_eq!(original.fps, Some(30.0));
    assert_eq!(original.audio_channels, Some(2));
    assert!(original.processing_completed_at.is_some());
    // the original is not part of the report
    assert!(report.results.iter().all(|r| r.quality != Original));
}
