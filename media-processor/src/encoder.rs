//! Rendition encoding via ffmpeg
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


use crate::error::{ProcessingError, ProcessingResult};
use crate::ladder::{rendition_spec, round_up_even, target_resolution, RenditionSpec};
use crate::probe::MediaProber;
use async_trait::async_trait;
use rendition_config::EncoderBackend;
use rendition_types::{MediaDescription, QualityLabel};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Minimum bitrate (kbps) for original-quality hardware encodes
const MIN_ORIGINAL_BITRATE_KBPS: u64 = 5000;

/// Hardware encoder backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareBackend {
    /// Apple VideoToolbox (macOS)
    VideoToolbox,
    /// NVIDIA NVENC (Windows/Linux)
    Nvenc,
}

impl HardwareBackend {
    fn hwaccel(&self) -> &'static str {
        match self {
            HardwareBackend::VideoToolbox => "videotoolbox",
            HardwareBackend::Nvenc => "cuda",
        }
    }

    fn h264_codec(&self) -> &'static str {
        match self {
            HardwareBackend::VideoToolbox => "h264_videotoolbox",
            HardwareBackend::Nvenc => "h264_nvenc",
        }
    }
}

/// Which encoder invocation shape to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodePath {
    Hardware(HardwareBackend),
    Software,
}

impl EncodePath {
    /// Resolve the configured backend against the running platform.
    ///
    /// `auto` only picks VideoToolbox on Apple Silicon. NVENC must be asked for.
    pub fn from_backend(backend: EncoderBackend) -> Self {
        match backend {
            EncoderBackend::Software => EncodePath::Software,
            EncoderBackend::Videotoolbox => EncodePath::Hardware(HardwareBackend::VideoToolbox),
            EncoderBackend::Nvenc => EncodePath::Hardware(HardwareBackend::Nvenc),
            EncoderBackend::Auto => Self::detect(),
        }
    }

    pub fn detect() -> Self {
        if cfg!(all(target_os = "macos", target_arch = "aarch64")) {
            EncodePath::Hardware(HardwareBackend::VideoToolbox)
        } else {
            EncodePath::Software
        }
    }
}

/// Everything needed to build one encoder invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodePlan {
    pub quality: QualityLabel,
    pub source_width: u32,
    pub source_height: u32,
    pub target_width: u32,
    pub target_height: u32,
    /// Encode at source quality (higher bitrate/CRF settings)
    pub is_original_quality: bool,
    /// Ladder parameters; `None` for the original pseudo-rung
    pub spec: Option<&'static RenditionSpec>,
}

impl EncodePlan {
    pub fn new(quality: QualityLabel, source_width: u32, source_height: u32) -> ProcessingResult<Self> {
        let (spec, (target_width, target_height)) = if quality.is_original() {
            (None, (round_up_even(source_width), round_up_even(source_height)))
        } else {
            let spec = rendition_spec(quality)
                .ok_or_else(|| ProcessingError::UnknownQuality(quality.to_string()))?;
            (
                Some(spec),
                target_resolution(source_width, source_height, spec.height),
            )
        };

        // A rung that lands exactly on the source dimensions is encoded as original
        let is_original_quality = quality.is_original()
            || (target_width == source_width && target_height == source_height);

        Ok(Self {
            quality,
            source_width,
            source_height,
            target_width,
            target_height,
            is_original_quality,
            spec,
        })
    }

    /// `scale=W:H` when the target differs from the source
    pub fn scale_filter(&self) -> Option<String> {
        if self.target_width == self.source_width && self.target_height == self.source_height {
            None
        } else {
            Some(format!("scale={}:{}", self.target_width, self.target_height))
        }
    }

    /// Source-proportional bitrate in kbps, never below 5 Mbps
    pub fn adaptive_bitrate_kbps(&self) -> u64 {
        let pixels = u64::from(self.source_width) * u64::from(self.source_height);
        ((pixels as f64 * 0.15) as u64).max(MIN_ORIGINAL_BITRATE_KBPS)
    }

    fn audio_bitrate(&self) -> &'static str {
        if self.is_original_quality {
            "192k"
        } else {
            "128k"
        }
    }

    /// `(bitrate, maxrate, bufsize)` for the hardware path
    fn rate_control(&self) -> (String, String, String) {
        match (self.is_original_quality, self.spec) {
            (false, Some(spec)) => (spec.bitrate_arg(), spec.maxrate_arg(), spec.bufsize_arg()),
            _ => {
                let rate = self.adaptive_bitrate_kbps();
                (
                    format!("{}k", rate),
                    format!("{}k", (rate as f64 * 1.5) as u64),
                    format!("{}k", rate * 2),
                )
            }
        }
    }
}

/// Build the ffmpeg argument list (without the program name)
pub fn build_encode_args(plan: &EncodePlan, path: EncodePath, input: &Path, output: &Path) -> Vec<String> {
    let mut args: Vec<String> = vec!["-hide_banner".into(), "-loglevel".into(), "error".into()];

    if let EncodePath::Hardware(backend) = path {
        args.extend(["-hwaccel".into(), backend.hwaccel().into()]);
    }
    args.extend(["-i".into(), input.to_string_lossy().into_owned()]);

    match path {
        EncodePath::Hardware(backend) => {
            args.extend(["-c:v".into(), backend.h264_codec().into()]);
            let (bitrate, maxrate, bufsize) = plan.rate_control();
            args.extend([
                "-b:v".into(),
                bitrate,
                "-maxrate".into(),
                maxrate,
                "-bufsize".into(),
                bufsize,
            ]);
        }
        EncodePath::Software => {
            args.extend(["-c:v".into(), "libx264".into()]);
            match (plan.is_original_quality, plan.spec) {
                (false, Some(spec)) => args.extend([
                    "-preset".into(),
                    "fast".into(),
                    "-crf".into(),
                    "23".into(),
                    "-b:v".into(),
                    spec.bitrate_arg(),
                    "-maxrate".into(),
                    spec.maxrate_arg(),
                    "-bufsize".into(),
                    spec.bufsize_arg(),
                ]),
                _ => args.extend([
                    "-preset".into(),
                    "slow".into(),
                    "-crf".into(),
                    "18".into(),
                ]),
            }
        }
    }

    args.extend([
        "-c:a".into(),
        "aac".into(),
        "-b:a".into(),
        plan.audio_bitrate().into(),
    ]);

    if let Some(filter) = plan.scale_filter() {
        args.extend(["-vf".into(), filter]);
    }

    if path == EncodePath::Hardware(HardwareBackend::VideoToolbox) {
        args.extend(["-allow_sw".into(), "1".into()]);
    }

    args.extend(["-movflags".into(), "+faststart".into()]);
    if path == EncodePath::Software {
        args.extend(["-threads".into(), "0".into()]);
    }
    args.extend(["-y".into(), output.to_string_lossy().into_owned()]);

    args
}

/// What a successful encode produced
#[derive(Debug, Clone, PartialEq)]
pub struct RenditionJobOutcome {
    pub width: u32,
    pub height: u32,
    pub file_size: u64,
    /// Wall-clock seconds spent in the encoder
    pub encoding_time: u64,
    pub codec: String,
    pub container: String,
    /// Probe of the output, absent when the output could not be probed
    pub media: Option<MediaDescription>,
}

/// Encodes a single rendition
#[async_trait]
pub trait RenditionEncoder: Send + Sync {
    async fn encode(
        &self,
        input: &Path,
        output: &Path,
        quality: QualityLabel,
        source_width: u32,
        source_height: u32,
    ) -> ProcessingResult<RenditionJobOutcome>;
}

/// Encoder backed by the `ffmpeg` binary
pub struct FfmpegEncoder {
    ffmpeg_path: String,
    path: EncodePath,
    prober: Arc<dyn MediaProber>,
    timeout: Option<Duration>,
}

impl FfmpegEncoder {
    pub fn new(ffmpeg_path: impl Into<String>, path: EncodePath, prober: Arc<dyn MediaProber>) -> Self {
        let path_name = match path {
            EncodePath::Hardware(backend) => format!("{:?}", backend),
            EncodePath::Software => "software".to_string(),
        };
        info!(encode_path = %path_name, "Encoder configured");
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            path,
            prober,
            timeout: None,
        }
    }

    /// Kill the encoder when a single invocation runs longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self, quality: QualityLabel, args: &[String]) -> ProcessingResult<()> {
        let mut command = Command::new(&self.ffmpeg_path);
        command.args(args).kill_on_drop(true);
        let child = command.output();

        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child).await {
                Ok(result) => result,
                Err(_) => {
                    return Err(ProcessingError::EncodeFailed {
                        quality,
                        diagnostic: format!("encode timed out after {:?}", limit),
                    })
                }
            },
            None => child.await,
        };

        let output = result.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ProcessingError::EncoderUnavailable(format!("{} not found", self.ffmpeg_path))
            } else {
                ProcessingError::EncoderUnavailable(format!("failed to spawn {}: {}", self.ffmpeg_path, e))
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProcessingError::EncodeFailed {
                quality,
                diagnostic: format!("ffmpeg exited with {}: {}", output.status, stderr.trim()),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl RenditionEncoder for FfmpegEncoder {
    async fn encode(
        &self,
        input: &Path,
        output: &Path,
        quality: QualityLabel,
        source_width: u32,
        source_height: u32,
    ) -> ProcessingResult<RenditionJobOutcome> {
        let plan = EncodePlan::new(quality, source_width, source_height)?;

        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let args = build_encode_args(&plan, self.path, input, output);
        debug!(quality = %quality, args = ?args, "Running ffmpeg");

        let started = Instant::now();
        self.run(quality, &args).await?;
        let encoding_time = started.elapsed().as_secs();

        let file_size = match tokio::fs::metadata(output).await {
            Ok(meta) if meta.is_file() => meta.len(),
            _ => return Err(ProcessingError::OutputMissing(output.to_path_buf())),
        };

        let media = match self.prober.probe(output).await {
            Ok(media) => Some(media),
            Err(e) => {
                warn!(quality = %quality, error = %e, "Could not probe encoded output");
                None
            }
        };

        info!(
            quality = %quality,
            width = plan.target_width,
            height = plan.target_height,
            file_size = file_size,
            encoding_time = encoding_time,
            "Rendition encoded"
        );

        Ok(RenditionJobOutcome {
            width: plan.target_width,
            height: plan.target_height,
            file_size,
            encoding_time,
            codec: "h264".to_string(),
            container: "mp4".to_string(),
            media,
        })
    }
}
