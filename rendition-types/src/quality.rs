//! Quality labels and lifecycle statuses
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


use crate::error::TypesError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Rendition quality label.
///
/// The ladder rungs are declared in ascending height order so the derived
/// `Ord` follows the ladder. `Original` is the pass-through pseudo-rung and
/// sorts after every ladder rung.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QualityLabel {
    #[serde(rename = "144p")]
    P144,
    #[serde(rename = "240p")]
    P240,
    #[serde(rename = "360p")]
    P360,
    #[serde(rename = "480p")]
    P480,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "1440p")]
    P1440,
    #[serde(rename = "2160p")]
    P2160,
    #[serde(rename = "original")]
    Original,
}

impl QualityLabel {
    /// Ladder rungs, lowest first. Excludes the original pseudo-rung.
    pub const LADDER: [QualityLabel; 8] = [
        QualityLabel::P144,
        QualityLabel::P240,
        QualityLabel::P360,
        QualityLabel::P480,
        QualityLabel::P720,
        QualityLabel::P1080,
        QualityLabel::P1440,
        QualityLabel::P2160,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityLabel::P144 => "144p",
            QualityLabel::P240 => "240p",
            QualityLabel::P360 => "360p",
            QualityLabel::P480 => "480p",
            QualityLabel::P720 => "720p",
            QualityLabel::P1080 => "1080p",
            QualityLabel::P1440 => "1440p",
            QualityLabel::P2160 => "2160p",
            QualityLabel::Original => "original",
        }
    }

    pub fn is_original(&self) -> bool {
        matches!(self, QualityLabel::Original)
    }

    /// Listing priority used when records are returned for a video:
    /// highest rung first, the original last.
    pub fn list_priority(&self) -> u8 {
        match self {
            QualityLabel::P2160 => 1,
            QualityLabel::P1440 => 2,
            QualityLabel::P1080 => 3,
            QualityLabel::P720 => 4,
            QualityLabel::P480 => 5,
            QualityLabel::P360 => 6,
            QualityLabel::P240 => 7,
            QualityLabel::P144 => 8,
            QualityLabel::Original => 9,
        }
    }
}

impl fmt::Display for QualityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityLabel {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "144p" => Ok(QualityLabel::P144),
            "240p" => Ok(QualityLabel::P240),
            "360p" => Ok(QualityLabel::P360),
            "480p" => Ok(QualityLabel::P480),
            "720p" => Ok(QualityLabel::P720),
            "1080p" => Ok(QualityLabel::P1080),
            "1440p" => Ok(QualityLabel::P1440),
            "2160p" => Ok(QualityLabel::P2160),
            "original" => Ok(QualityLabel::Original),
            other => Err(TypesError::UnknownQuality(other.to_string())),
        }
    }
}

/// Lifecycle of a single rendition record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityStatus {
    Processing,
    Ready,
    Failed,
}

impl QualityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityStatus::Processing => "processing",
            QualityStatus::Ready => "ready",
            QualityStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for QualityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityStatus {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(QualityStatus::Processing),
            "ready" => Ok(QualityStatus::Ready),
            "failed" => Ok(QualityStatus::Failed),
            other => Err(TypesError::UnknownStatus(other.to_string())),
        }
    }
}

/// Lifecycle of a video.
///
/// Only `Draft`, `Processing` and `Published` are written by the engine.
/// Any other status is owned by another system and kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VideoStatus {
    Draft,
    Processing,
    Published,
    Other(String),
}

impl VideoStatus {
    pub fn as_str(&self) -> &str {
        match self {
            VideoStatus::Draft => "draft",
            VideoStatus::Processing => "processing",
            VideoStatus::Published => "published",
            VideoStatus::Other(s) => s.as_str(),
        }
    }
}

impl From<String> for VideoStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "draft" => VideoStatus::Draft,
            "processing" => VideoStatus::Processing,
            "published" => VideoStatus::Published,
            _ => VideoStatus::Other(s),
        }
    }
}

impl From<&str> for VideoStatus {
    fn from(s: &str) -> Self {
        VideoStatus::from(s.to_string())
    }
}

impl From<VideoStatus> for String {
    fn from(status: VideoStatus) -> Self {
        match status {
            VideoStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_label_round_trips_through_str() {
        for label in QualityLabel::LADDER.iter().chain([QualityLabel::Original].iter()) {
            assert_eq!(label.as_str().parse::<QualityLabel>().unwrap(), *label);
        }
    }

    #[test]
    fn test_unknown_quality_label() {
        let err = "4320p".parse::<QualityLabel>().unwrap_err();
        assert_eq!(err, TypesError::UnknownQuality("4320p".to_string()));
    }

    #[test]
    fn test_ladder_is_ascending_and_original_sorts_last() {
        let mut sorted = QualityLabel::LADDER.to_vec();
        sorted.sort();
        assert_eq!(sorted, QualityLabel::LADDER.to_vec());
        assert!(QualityLabel::Original > QualityLabel::P2160);
    }

    #[test]
    fn test_list_priority_puts_highest_first() {
        assert!(QualityLabel::P2160.list_priority() < QualityLabel::P1080.list_priority());
        assert!(QualityLabel::P144.list_priority() < QualityLabel::Original.list_priority());
    }

    #[test]
    fn test_quality_label_serde_uses_label_strings() {
        let json = serde_json::to_string(&QualityLabel::P1080).unwrap();
        assert_eq!(json, "\"1080p\"");
        let back: QualityLabel = serde_json::from_str("\"original\"").unwrap();
        assert_eq!(back, QualityLabel::Original);
    }

    #[test]
    fn test_video_status_keeps_foreign_values() {
        let status = VideoStatus::from("archived");
        assert_eq!(status, VideoStatus::Other("archived".to_string()));
        assert_eq!(status.as_str(), "archived");

        let json = serde_json::to_string(&VideoStatus::Published).unwrap();
        assert_eq!(json, "\"published\"");
        let back: VideoStatus = serde_json::from_str("\"draft\"").unwrap();
        assert_eq!(back, VideoStatus::Draft);
    }
}
