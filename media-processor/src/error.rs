//! Error types for media processing
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


use rendition_types::QualityLabel;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Record store error
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database driver or query error
    #[error("Database error: {0}")]
    Database(String),

    /// A stored value could not be mapped back to a domain type
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(Uuid),
}

impl From<tokio_postgres::Error> for StoreError {
    fn from(e: tokio_postgres::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

/// Processing error.
///
/// Rung-level variants (`EncoderUnavailable`, `EncodeFailed`, `OutputMissing`)
/// are contained to the rung that raised them. `ProbeFailed`, `VideoNotFound`
/// and `Unexpected` end the run.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Probe failed for {path}: {reason}")]
    ProbeFailed { path: PathBuf, reason: String },

    #[error("Encoder unavailable: {0}")]
    EncoderUnavailable(String),

    #[error("Encode failed for {quality}: {diagnostic}")]
    EncodeFailed {
        quality: QualityLabel,
        diagnostic: String,
    },

    #[error("Encoder produced no output at {0}")]
    OutputMissing(PathBuf),

    #[error("Unsupported quality: {0}")]
    UnknownQuality(String),

    #[error("Video not found: {0}")]
    VideoNotFound(Uuid),

    #[error("Video file not found: {0}")]
    SourceMissing(PathBuf),

    #[error("Record store error: {0}")]
    RecordStore(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected failure: {0}")]
    Unexpected(String),
}

impl ProcessingError {
    pub fn probe_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        ProcessingError::ProbeFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type ProcessingResult<T> = Result<T, ProcessingError>;
pub type StoreResult<T> = Result<T, StoreError>;
