//! Quality ladder planning
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

/// Tallest rung ever produced, whatever the source height
pub const MAX_LADDER_HEIGHT: u32 = 2160;

/// Rungs preferred as the default playback rendition, in order
pub const DEFAULT_PREFERENCE: [QualityLabel; 4] = [
    QualityLabel::P720,
    QualityLabel::P1080,
    QualityLabel::P480,
    QualityLabel::P360,
];

/// Encoding parameters of one ladder rung (rates in kbps)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenditionSpec {
    pub quality: QualityLabel,
    pub height: u32,
    pub bitrate_kbps: u32,
    pub maxrate_kbps: u32,
    pub bufsize_kbps: u32,
}

impl RenditionSpec {
    pub fn bitrate_arg(&self) -> String {
        format!("{}k", self.bitrate_kbps)
    }

    pub fn maxrate_arg(&self) -> String {
        format!("{}k", self.maxrate_kbps)
    }

    pub fn bufsize_arg(&self) -> String {
        format!("{}k", self.bufsize_kbps)
    }
}

/// The ladder, ascending by height
pub const RENDITION_LADDER: [RenditionSpec; 8] = [
    RenditionSpec { quality: QualityLabel::P144, height: 144, bitrate_kbps: 200, maxrate_kbps: 300, bufsize_kbps: 400 },
    RenditionSpec { quality: QualityLabel::P240, height: 240, bitrate_kbps: 400, maxrate_kbps: 600, bufsize_kbps: 800 },
    RenditionSpec { quality: QualityLabel::P360, height: 360, bitrate_kbps: 800, maxrate_kbps: 1200, bufsize_kbps: 1600 },
    RenditionSpec { quality: QualityLabel::P480, height: 480, bitrate_kbps: 1500, maxrate_kbps: 2250, bufsize_kbps: 3000 },
    RenditionSpec { quality: QualityLabel::P720, height: 720, bitrate_kbps: 3000, maxrate_kbps: 4500, bufsize_kbps: 6000 },
    RenditionSpec { quality: QualityLabel::P1080, height: 1080, bitrate_kbps: 6000, maxrate_kbps: 9000, bufsize_kbps: 12000 },
    RenditionSpec { quality: QualityLabel::P1440, height: 1440, bitrate_kbps: 12000, maxrate_kbps: 18000, bufsize_kbps: 24000 },
    RenditionSpec { quality: QualityLabel::P2160, height: 2160, bitrate_kbps: 25000, maxrate_kbps: 37500, bufsize_kbps: 50000 },
];

/// Look up the rung definition. The original pseudo-rung has none.
pub fn rendition_spec(quality: QualityLabel) -> Option<&'static RenditionSpec> {
    RENDITION_LADDER.iter().find(|spec| spec.quality == quality)
}

/// Rungs to produce for a source of the given height, lowest first.
///
/// Only rungs at or below the source height are kept, and nothing above 4K.
pub fn supported_qualities(original_height: u32) -> Vec<QualityLabel> {
    let max_height = original_height.min(MAX_LADDER_HEIGHT);
    RENDITION_LADDER
        .iter()
        .filter(|spec| spec.height <= max_height)
        .map(|spec| spec.quality)
        .collect()
}

/// Round up to the next even number (H.264 needs even dimensions)
pub fn round_up_even(value: u32) -> u32 {
    if value % 2 == 0 {
        value
    } else {
        value + 1
    }
}

/// Encode dimensions for a rung of `target_height` from a `width`x`height` source.
///
/// Never upscales: a target at or above the source height keeps the source
/// dimensions. Scaling is driven by height only so portrait sources stay
/// portrait.
pub fn target_resolution(width: u32, height: u32, target_height: u32) -> (u32, u32) {
    if height == 0 || target_height >= height {
        return (round_up_even(width), round_up_even(height));
    }

    let new_height = target_height;
    let new_width = (u64::from(new_height) * u64::from(width) / u64::from(height)) as u32;

    (round_up_even(new_width), round_up_even(new_height))
}

/// Pick the default playback rung.
///
/// First preferred rung that is both supported and ready, otherwise the lowest
/// supported rung that is ready.
pub fn select_default_quality(
    supported: &[QualityLabel],
    ready: &[QualityLabel],
) -> Option<QualityLabel> {
    let usable = |quality: &QualityLabel| supported.contains(quality) && ready.contains(quality);

    DEFAULT_PREFERENCE
        .iter()
        .copied()
        .find(|quality| usable(quality))
        .or_else(|| supported.iter().copied().filter(|q| usable(q)).min())
}
