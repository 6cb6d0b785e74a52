//! Run and batch reports
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


use crate::quality::{QualityLabel, QualityStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Pipeline Reports
// ============================================================================

/// Outcome of one rung of a pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenditionResult {
    pub quality: QualityLabel,
    pub status: QualityStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RenditionResult {
    pub fn ready(quality: QualityLabel, file_size: u64) -> Self {
        Self {
            quality,
            status: QualityStatus::Ready,
            file_size: Some(file_size),
            error: None,
        }
    }

    pub fn failed(quality: QualityLabel, error: impl Into<String>) -> Self {
        Self {
            quality,
            status: QualityStatus::Failed,
            file_size: None,
            error: Some(error.into()),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == QualityStatus::Ready
    }
}

/// Result of one pipeline run over a single video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub results: Vec<RenditionResult>,
}

impl PipelineReport {
    pub fn succeeded(results: Vec<RenditionResult>) -> Self {
        Self {
            success: true,
            error: None,
            results,
        }
    }

    pub fn failed(error: impl Into<String>, results: Vec<RenditionResult>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            results,
        }
    }

    pub fn ready_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_ready()).count()
    }
}

// ============================================================================
// Batch Reports
// ============================================================================

/// One video to run through the pipeline as part of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoTask {
    pub video_id: Uuid,
    /// File name under the pending directory
    pub filename: String,
    #[serde(default)]
    pub video_url_base: Option<String>,
}

/// Per-task entry of a batch report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub video_id: Uuid,
    pub filename: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub qualities: Vec<RenditionResult>,
}

impl BatchEntry {
    pub fn from_report(task: &VideoTask, report: PipelineReport) -> Self {
        Self {
            video_id: task.video_id,
            filename: task.filename.clone(),
            success: report.success,
            error: report.error,
            qualities: report.results,
        }
    }

    pub fn failed(task: &VideoTask, error: impl Into<String>) -> Self {
        Self {
            video_id: task.video_id,
            filename: task.filename.clone(),
            success: false,
            error: Some(error.into()),
            qualities: Vec::new(),
        }
    }
}

/// Aggregate of a batch run. `results` is in completion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<BatchEntry>,
}

impl BatchReport {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn record(&mut self, entry: BatchEntry) {
        if entry.success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.results.push(entry);
    }
}
