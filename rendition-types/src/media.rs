//! Probed media description
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


use serde::{Deserialize, Serialize};

/// Structured description of a media file, as reported by the inspection tool.
///
/// Transient: it is copied field by field into quality records and never
/// persisted as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaDescription {
    pub width: u32,
    pub height: u32,
    /// Whole seconds, truncated
    pub duration: u64,
    /// Container bitrate in kbps
    pub bitrate: Option<u32>,
    pub codec: String,
    /// File extension without the leading dot
    pub container: String,
    /// Rounded to two decimals
    pub fps: Option<f64>,
    pub pixel_format: Option<String>,
    pub color_space: Option<String>,
    pub color_range: Option<String>,
    pub aspect_ratio: String,
    pub frame_count: Option<u64>,
    pub audio_codec: Option<String>,
    /// kbps
    pub audio_bitrate: Option<u32>,
    pub audio_sample_rate: Option<u32>,
    pub audio_channels: Option<u32>,
    pub file_size: u64,
}

impl MediaDescription {
    /// A description is only usable for planning when both axes are non-zero.
    pub fn has_valid_dimensions(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub fn is_portrait(&self) -> bool {
        self.height > self.width
    }

    pub fn has_audio(&self) -> bool {
        self.audio_codec.is_some()
    }
}
