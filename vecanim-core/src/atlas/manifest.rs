//! JSON manifest schema emitted alongside each atlas SVG (spec §6).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FrameManifestEntry {
    pub id: String,
    pub atlas_x: u32,
    pub atlas_y: u32,
    pub width: u32,
    pub height: u32,
    pub content_offset_x: f64,
    pub content_offset_y: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnimationManifest {
    pub version: u32,
    pub animation: String,
    pub atlas_width: u32,
    pub atlas_height: u32,
    pub frames: Vec<FrameManifestEntry>,
    /// Playback-order list of frame ids; a duplicate frame repeats its
    /// canonical representative's id rather than listing its own.
    pub playback: Vec<String>,
    /// Original per-source-frame id -> canonical representative id, for
    /// every frame that was deduplicated against an earlier one.
    pub duplicates: BTreeMap<String, String>,
    pub frame_rate: f64,
}

impl AnimationManifest {
    pub const VERSION: u32 = 1;
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SpriteAnimationEntry {
    pub animation: String,
    pub atlas_svg: String,
    pub atlas_json: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SpriteManifest {
    pub sprite: String,
    pub animations: Vec<SpriteAnimationEntry>,
    /// Packed atlas bytes divided by the summed size of the unpacked source
    /// frame SVGs, as a rough win/loss indicator for the batch summary.
    pub compression_ratio: f64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ImageRegistry {
    /// Content hash -> file name, merged across every sprite in a batch run
    /// when `--export-images` is set.
    pub images: BTreeMap<String, String>,
}
