//! In-memory record store
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


use super::RecordStore;
use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use chrono::Utc;
use rendition_types::{
    NewQualityRecord, QualityPatch, QualityStatus, VideoQualityRecord, VideoRecord, VideoStatus,
};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct State {
    videos: HashMap<Uuid, VideoRecord>,
    qualities: HashMap<Uuid, VideoQualityRecord>,
}

/// Record store kept in process memory.
///
/// Used when no database is configured and by tests. Every operation takes the
/// single lock, so the default swap is atomic with respect to other writers.
#[derive(Default)]
pub struct InMemoryRecordStore {
    state: RwLock<State>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a video (replaces any existing one with the same id)
    pub async fn insert_video(&self, video: VideoRecord) {
        self.state.write().await.videos.insert(video.id, video);
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get_video(&self, video_id: Uuid) -> StoreResult<Option<VideoRecord>> {
        Ok(self.state.read().await.videos.get(&video_id).cloned())
    }

    async fn update_video_status(&self, video_id: Uuid, status: VideoStatus) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        match state.videos.get_mut(&video_id) {
            Some(video) => {
                video.status = status;
                video.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn create_quality_record(&self, record: NewQualityRecord) -> StoreResult<VideoQualityRecord> {
        let mut state = self.state.write().await;
        if !state.videos.contains_key(&record.video_id) {
            return Err(StoreError::NotFound(record.video_id));
        }

        let created = VideoQualityRecord::from_new(Uuid::new_v4(), record);
        state.qualities.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_quality_record(&self, quality_id: Uuid, patch: QualityPatch) -> StoreResult<bool> {
        if patch.is_empty() {
            return Ok(false);
        }
        let mut state = self.state.write().await;
        Ok(state
            .qualities
            .get_mut(&quality_id)
            .map(|record| record.apply(&patch))
            .unwrap_or(false))
    }

    async fn update_quality_status(&self, quality_id: Uuid, status: QualityStatus) -> StoreResult<bool> {
        self.update_quality_record(quality_id, QualityPatch::new().status(status))
            .await
    }

    async fn list_qualities(&self, video_id: Uuid) -> StoreResult<Vec<VideoQualityRecord>> {
        let state = self.state.read().await;
        let mut records: Vec<VideoQualityRecord> = state
            .qualities
            .values()
            .filter(|record| record.video_id == video_id)
            .cloned()
            .collect();
        records.sort_by_key(|record| (record.quality.list_priority(), record.created_at));
        Ok(records)
    }

    async fn set_default_quality(&self, video_id: Uuid, quality_id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;

        let belongs = state
            .qualities
            .get(&quality_id)
            .is_some_and(|record| record.video_id == video_id);
        if !belongs {
            return Ok(false);
        }

        let now = Utc::now();
        for record in state.qualities.values_mut().filter(|r| r.video_id == video_id) {
            let is_default = record.id == quality_id;
            if record.is_default != is_default {
                record.is_default = is_default;
                record.updated_at = now;
            }
        }
        Ok(true)
    }
}
