//! Media Processor Library
//!
//! Rendition ladder engine:
//! - Media inspection (ffprobe)
//! - Quality ladder planning and default rendition selection
//! - Rendition encoding (ffmpeg, hardware or software)
//! - Per-video pipeline with record store bookkeeping
//! - Bounded-concurrency batch processing
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


pub mod batch;
pub mod encoder;
pub mod error;
pub mod ladder;
pub mod pipeline;
pub mod probe;
pub mod store;

pub use batch::BatchCoordinator;
pub use encoder::{
    build_encode_args, EncodePath, EncodePlan, FfmpegEncoder, HardwareBackend, RenditionEncoder,
    RenditionJobOutcome,
};
pub use error::{ProcessingError, ProcessingResult, StoreError, StoreResult};
pub use ladder::{
    rendition_spec, select_default_quality, supported_qualities, target_resolution, RenditionSpec,
};
pub use pipeline::RenditionPipeline;
pub use probe::{FfprobeProber, MediaProber};
pub use store::{InMemoryRecordStore, PostgresRecordStore, RecordStore};
