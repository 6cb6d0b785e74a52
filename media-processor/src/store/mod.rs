//! Record store
//!
//! The engine reads videos and reads/writes their quality records through the
//! [`RecordStore`] capability. It is handed to the pipeline at construction so
//! runs can share one store or use separate ones.
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


pub mod memory;
pub mod postgres;

pub use memory::InMemoryRecordStore;
pub use postgres::PostgresRecordStore;

use crate::error::StoreResult;
use async_trait::async_trait;
use rendition_types::{
    NewQualityRecord, QualityPatch, QualityStatus, VideoQualityRecord, VideoRecord, VideoStatus,
};
use uuid::Uuid;

/// Persistence of videos and their renditions
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_video(&self, video_id: Uuid) -> StoreResult<Option<VideoRecord>>;

    /// Returns false when the video does not exist
    async fn update_video_status(&self, video_id: Uuid, status: VideoStatus) -> StoreResult<bool>;

    async fn create_quality_record(&self, record: NewQualityRecord) -> StoreResult<VideoQualityRecord>;

    /// Apply the provided fields as one update. An empty patch is a no-op
    /// and returns false, as does an unknown id.
    async fn update_quality_record(&self, quality_id: Uuid, patch: QualityPatch) -> StoreResult<bool>;

    async fn update_quality_status(&self, quality_id: Uuid, status: QualityStatus) -> StoreResult<bool>;

    /// All renditions of a video, highest quality first and `original` last
    async fn list_qualities(&self, video_id: Uuid) -> StoreResult<Vec<VideoQualityRecord>>;

    /// Clear any existing default of the video and flag `quality_id`, atomically.
    /// Returns false (and changes nothing) when the record does not belong to
    /// the video.
    async fn set_default_quality(&self, video_id: Uuid, quality_id: Uuid) -> StoreResult<bool>;
}
