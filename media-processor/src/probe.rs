//! Media inspection via ffprobe
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
use async_trait::async_trait;
use rendition_types::MediaDescription;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// Inspects a media file and describes it
#[async_trait]
pub trait MediaProber: Send + Sync {
    async fn probe(&self, path: &Path) -> ProcessingResult<MediaDescription>;
}

/// Prober backed by the `ffprobe` binary
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    ffprobe_path: String,
}

impl FfprobeProber {
    pub fn new(ffprobe_path: impl Into<String>) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
        }
    }
}

impl Default for FfprobeProber {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

#[async_trait]
impl MediaProber for FfprobeProber {
    async fn probe(&self, path: &Path) -> ProcessingResult<MediaDescription> {
        let output = Command::new(&self.ffprobe_path)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                ProcessingError::probe_failed(path, format!("failed to run {}: {}", self.ffprobe_path, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProcessingError::probe_failed(
                path,
                format!("ffprobe exited with {}: {}", output.status, stderr.trim()),
            ));
        }

        let file_size = tokio::fs::metadata(path)
            .await
            .map_err(|e| ProcessingError::probe_failed(path, e.to_string()))?
            .len();

        let container = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();

        let media = parse_probe_output(path, &output.stdout, container, file_size)?;
        debug!(
            path = %path.display(),
            width = media.width,
            height = media.height,
            duration = media.duration,
            "Probed media file"
        );
        Ok(media)
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    format: ProbeFormat,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    pix_fmt: Option<String>,
    color_space: Option<String>,
    color_range: Option<String>,
    display_aspect_ratio: Option<String>,
    nb_frames: Option<String>,
    bit_rate: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u32>,
}

impl ProbeStream {
    fn is(&self, codec_type: &str) -> bool {
        self.codec_type.as_deref() == Some(codec_type)
    }
}

/// Parse `ffprobe -print_format json -show_format -show_streams` output.
///
/// `container` and `file_size` come from the filesystem, not the tool.
pub fn parse_probe_output(
    path: &Path,
    json: &[u8],
    container: &str,
    file_size: u64,
) -> ProcessingResult<MediaDescription> {
    let data: ProbeOutput = serde_json::from_slice(json)
        .map_err(|e| ProcessingError::probe_failed(path, format!("invalid ffprobe output: {}", e)))?;

    let video = data
        .streams
        .iter()
        .find(|s| s.is("video"))
        .ok_or_else(|| ProcessingError::probe_failed(path, "no video stream"))?;
    let audio = data.streams.iter().find(|s| s.is("audio"));

    let width = video.width.unwrap_or(0);
    let height = video.height.unwrap_or(0);

    let duration = parse_number(data.format.duration.as_deref()).max(0.0);
    let bitrate = parse_number(data.format.bit_rate.as_deref()) as u64 / 1000;
    let fps = parse_frame_rate(video.r_frame_rate.as_deref().unwrap_or("0/1"));

    let aspect_ratio = match non_empty(&video.display_aspect_ratio) {
        Some(ratio) if ratio != "0:1" => ratio,
        _ => format!("{}:{}", width, height),
    };

    let frame_count = match video.nb_frames.as_deref().and_then(|n| n.trim().parse::<u64>().ok()) {
        Some(frames) if frames > 0 => Some(frames),
        _ if fps > 0.0 && duration > 0.0 => Some((fps * duration).round() as u64),
        _ => None,
    };

    let media = MediaDescription {
        width,
        height,
        duration: duration as u64,
        bitrate: (bitrate > 0).then_some(bitrate as u32),
        codec: video.codec_name.clone().unwrap_or_default(),
        container: container.to_string(),
        fps: (fps > 0.0).then(|| (fps * 100.0).round() / 100.0),
        pixel_format: non_empty(&video.pix_fmt),
        color_space: non_empty(&video.color_space),
        color_range: non_empty(&video.color_range),
        aspect_ratio,
        frame_count,
        audio_codec: audio.map(|a| a.codec_name.clone().unwrap_or_default()),
        audio_bitrate: audio
            .and_then(|a| a.bit_rate.as_deref())
            .and_then(|b| b.trim().parse::<u64>().ok())
            .map(|b| (b / 1000) as u32),
        audio_sample_rate: audio
            .and_then(|a| a.sample_rate.as_deref())
            .and_then(|r| r.trim().parse::<u32>().ok())
            .filter(|r| *r > 0),
        audio_channels: audio.and_then(|a| a.channels).filter(|c| *c > 0),
        file_size,
    };

    if !media.has_valid_dimensions() {
        return Err(ProcessingError::probe_failed(
            PathBuf::from(path),
            format!("invalid dimensions {}x{}", width, height),
        ));
    }
    Ok(media)
}

/// `num/den` or a bare number. A zero denominator yields 0.
pub fn parse_frame_rate(value: &str) -> f64 {
    match value.split_once('/') {
        Some((num, den)) => {
            let num = num.trim().parse::<f64>().unwrap_or(0.0);
            let den = den.trim().parse::<f64>().unwrap_or(0.0);
            if den > 0.0 {
                num / den
            } else {
                0.0
            }
        }
        None => value.trim().parse::<f64>().unwrap_or(0.0),
    }
}

fn parse_number(value: Option<&str>) -> f64 {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_deref().filter(|v| !v.is_empty()).map(str::to_string)
}
