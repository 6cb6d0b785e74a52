//! Persisted records and the partial-update patch
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


use crate::media::MediaDescription;
use crate::quality::{QualityLabel, QualityStatus, VideoStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A video as seen by the engine. Metadata beyond the status is owned
/// elsewhere and never written here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: Uuid,
    pub title: Option<String>,
    pub status: VideoStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VideoRecord {
    pub fn new(id: Uuid, title: Option<String>, status: VideoStatus) -> Self {
        let now = Utc::now();
        Self {
            id,
            title,
            status,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One rendition of a video, persisted by the record store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoQualityRecord {
    pub id: Uuid,
    pub video_id: Uuid,
    pub quality: QualityLabel,
    pub url: String,
    pub file_size: Option<u64>,
    pub bitrate: Option<u32>,
    pub resolution_width: Option<u32>,
    pub resolution_height: Option<u32>,
    pub codec: Option<String>,
    pub container: Option<String>,
    pub duration: Option<u64>,
    pub fps: Option<f64>,
    pub pixel_format: Option<String>,
    pub color_space: Option<String>,
    pub color_range: Option<String>,
    pub audio_codec: Option<String>,
    pub audio_bitrate: Option<u32>,
    pub audio_sample_rate: Option<u32>,
    pub audio_channels: Option<u32>,
    pub aspect_ratio: Option<String>,
    pub frame_count: Option<u64>,
    /// Encode wall-clock time in seconds
    pub encoding_time: Option<u64>,
    pub is_default: bool,
    pub status: QualityStatus,
    pub processing_started_at: Option<DateTime<Utc>>,
    pub processing_completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VideoQualityRecord {
    /// Materialise a freshly created record. Stores call this so every adapter
    /// fills defaults the same way.
    pub fn from_new(id: Uuid, new: NewQualityRecord) -> Self {
        let now = Utc::now();
        Self {
            id,
            video_id: new.video_id,
            quality: new.quality,
            url: new.url,
            file_size: new.file_size,
            bitrate: new.bitrate,
            resolution_width: new.resolution_width,
            resolution_height: new.resolution_height,
            codec: new.codec,
            container: new.container,
            duration: new.duration,
            fps: None,
            pixel_format: None,
            color_space: None,
            color_range: None,
            audio_codec: None,
            audio_bitrate: None,
            audio_sample_rate: None,
            audio_channels: None,
            aspect_ratio: None,
            frame_count: None,
            encoding_time: None,
            is_default: false,
            status: new.status,
            processing_started_at: Some(new.processing_started_at.unwrap_or(now)),
            processing_completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply the fields present in `patch`. Returns false when the patch is empty.
    pub fn apply(&mut self, patch: &QualityPatch) -> bool {
        if patch.is_empty() {
            return false;
        }

        macro_rules! set {
            ($field:ident) => {
                if let Some(value) = &patch.$field {
                    self.$field = Some(value.clone());
                }
            };
        }

        if let Some(url) = &patch.url {
            self.url = url.clone();
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        set!(file_size);
        set!(bitrate);
        set!(resolution_width);
        set!(resolution_height);
        set!(codec);
        set!(container);
        set!(duration);
        set!(fps);
        set!(pixel_format);
        set!(color_space);
        set!(color_range);
        set!(audio_codec);
        set!(audio_bitrate);
        set!(audio_sample_rate);
        set!(audio_channels);
        set!(aspect_ratio);
        set!(frame_count);
        set!(encoding_time);
        set!(processing_completed_at);
        self.updated_at = Utc::now();
        true
    }
}

/// Fields supplied when a quality record is created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewQualityRecord {
    pub video_id: Uuid,
    pub quality: QualityLabel,
    pub url: String,
    pub status: QualityStatus,
    pub processing_started_at: Option<DateTime<Utc>>,
    pub file_size: Option<u64>,
    pub bitrate: Option<u32>,
    pub resolution_width: Option<u32>,
    pub resolution_height: Option<u32>,
    pub codec: Option<String>,
    pub container: Option<String>,
    pub duration: Option<u64>,
}

impl NewQualityRecord {
    /// A record about to be encoded: `processing`, no media fields yet
    pub fn processing(
        video_id: Uuid,
        quality: QualityLabel,
        url: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            video_id,
            quality,
            url: url.into(),
            status: QualityStatus::Processing,
            processing_started_at: Some(started_at),
            file_size: None,
            bitrate: None,
            resolution_width: None,
            resolution_height: None,
            codec: None,
            container: None,
            duration: None,
        }
    }

    /// Carry the basic fields of a probed file into the creation request
    pub fn with_media(mut self, media: &MediaDescription) -> Self {
        self.file_size = Some(media.file_size);
        self.bitrate = media.bitrate;
        self.resolution_width = Some(media.width);
        self.resolution_height = Some(media.height);
        self.codec = Some(media.codec.clone());
        self.container = Some(media.container.clone());
        self.duration = Some(media.duration);
        self
    }

    pub fn with_status(mut self, status: QualityStatus) -> Self {
        self.status = status;
        self
    }
}

/// Partial update of a quality record.
///
/// Every field is optional; only the fields that are set are written, and the
/// store applies them as one update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityPatch {
    pub url: Option<String>,
    pub status: Option<QualityStatus>,
    pub file_size: Option<u64>,
    pub bitrate: Option<u32>,
    pub resolution_width: Option<u32>,
    pub resolution_height: Option<u32>,
    pub codec: Option<String>,
    pub container: Option<String>,
    pub duration: Option<u64>,
    pub fps: Option<f64>,
    pub pixel_format: Option<String>,
    pub color_space: Option<String>,
    pub color_range: Option<String>,
    pub audio_codec: Option<String>,
    pub audio_bitrate: Option<u32>,
    pub audio_sample_rate: Option<u32>,
    pub audio_channels: Option<u32>,
    pub aspect_ratio: Option<String>,
    pub frame_count: Option<u64>,
    pub encoding_time: Option<u64>,
    pub processing_completed_at: Option<DateTime<Utc>>,
}

impl QualityPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: QualityStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn file_size(mut self, file_size: u64) -> Self {
        self.file_size = Some(file_size);
        self
    }

    pub fn resolution(mut self, width: u32, height: u32) -> Self {
        self.resolution_width = Some(width);
        self.resolution_height = Some(height);
        self
    }

    pub fn codec(mut self, codec: impl Into<String>, container: impl Into<String>) -> Self {
        self.codec = Some(codec.into());
        self.container = Some(container.into());
        self
    }

    pub fn duration(mut self, seconds: u64) -> Self {
        self.duration = Some(seconds);
        self
    }

    pub fn encoding_time(mut self, seconds: u64) -> Self {
        self.encoding_time = Some(seconds);
        self
    }

    pub fn completed_at(mut self, at: DateTime<Utc>) -> Self {
        self.processing_completed_at = Some(at);
        self
    }

    /// Extended attributes of a probed file. Absent values stay unset so they
    /// never overwrite stored data.
    pub fn media_attributes(mut self, media: &MediaDescription) -> Self {
        self.bitrate = media.bitrate;
        self.fps = media.fps;
        self.pixel_format = media.pixel_format.clone();
        self.color_space = media.color_space.clone();
        self.color_range = media.color_range.clone();
        self.audio_codec = media.audio_codec.clone();
        self.audio_bitrate = media.audio_bitrate;
        self.audio_sample_rate = media.audio_sample_rate;
        self.audio_channels = media.audio_channels;
        self.aspect_ratio = Some(media.aspect_ratio.clone());
        self.frame_count = media.frame_count;
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
