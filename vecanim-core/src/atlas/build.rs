//! Atlas assembly and the per-sprite / per-batch driver (spec §4.9, §5, §6).
//!
//! [`AtlasBuilder::build_animation`] is the pure pipeline stage: parsed
//! frame SVGs in, one packed atlas SVG + manifest out. [`build_batch`] is
//! the filesystem-facing entry point the CLI calls: it discovers sprite
//! directories, runs them concurrently (spec §5's "embarrassingly parallel
//! across sprites" model — no shared mutable state, so no locking), and
//! catches and logs a failing sprite without aborting the rest (spec §7).

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine as _;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::foundation::error::{VecanimError, VecanimResult};
use crate::foundation::math::Fnv1a64;

use super::hash::{canonicalize, CanonicalDef};
use super::manifest::{AnimationManifest, FrameManifestEntry, ImageRegistry, SpriteAnimationEntry, SpriteManifest};
use super::pack::pack;
use super::parse::parse_frame;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Atlas strip width the packer's candidate sweep won't exceed.
    pub max_strip_width: u32,
    /// Minimum gap, in pixels, kept between packed frames.
    pub padding: u32,
    /// Emit compact sequential ids (`d0`, `frame0`, ...) instead of
    /// content-hash ids; mainly useful for deterministic fixture output.
    pub short_ids: bool,
    pub export_images: bool,
    /// URL prefix externalized image refs are rooted under; relative paths
    /// are used when unset.
    pub web_base_path: Option<String>,
    pub worker_timeout_secs: u64,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            max_strip_width: 2048,
            padding: 1,
            short_ids: false,
            export_images: false,
            web_base_path: None,
            worker_timeout_secs: 30,
        }
    }
}

pub struct BuiltAnimation {
    pub svg: String,
    pub manifest: AnimationManifest,
    pub exported_images: Vec<ExportedImage>,
}

pub struct ExportedImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

pub struct AtlasBuilder<'a> {
    config: &'a BuilderConfig,
}

impl<'a> AtlasBuilder<'a> {
    pub fn new(config: &'a BuilderConfig) -> Self {
        Self { config }
    }

    /// Builds one animation's atlas from its frame SVG sources, already in
    /// playback order.
    pub fn build_animation(&self, animation_name: &str, frame_svgs: &[String], frame_rate: f64) -> VecanimResult<BuiltAnimation> {
        let parsed: Vec<_> = frame_svgs.iter().map(|s| parse_frame(s)).collect::<VecanimResult<_>>()?;
        let canonical = canonicalize(animation_name, &parsed, self.config.short_ids);

        let symbol_ids = symbol_ids(animation_name, canonical.unique_frames.len(), self.config.short_ids);
        let sizes: Vec<(u32, u32)> = canonical
            .frame_assignment
            .iter()
            .enumerate()
            .filter_map(|(src_idx, &unique_idx)| {
                // only need one representative source frame's view box per
                // unique frame; first occurrence wins
                let is_first = canonical.frame_assignment[..src_idx].iter().all(|&u| u != unique_idx);
                is_first.then(|| {
                    let vb = parsed[src_idx].view_box;
                    ((vb.2.ceil().max(1.0)) as u32, (vb.3.ceil().max(1.0)) as u32)
                })
            })
            .collect();

        let (atlas_w, atlas_h, placements) = pack(&sizes, self.config.padding, self.config.max_strip_width);

        let (exported_images, image_overrides) = self.export_images(&canonical.defs);
        let svg = render_svg(atlas_w, atlas_h, &canonical.defs, &image_overrides, &canonical.unique_frames, &symbol_ids);

        let frames: Vec<FrameManifestEntry> = symbol_ids
            .iter()
            .zip(&placements)
            .zip(&sizes)
            .map(|((id, rect), &(w, h))| FrameManifestEntry {
                id: id.clone(),
                atlas_x: rect.x,
                atlas_y: rect.y,
                width: w,
                height: h,
                content_offset_x: 0.0,
                content_offset_y: 0.0,
            })
            .collect();

        let playback: Vec<String> = canonical.frame_assignment.iter().map(|&i| symbol_ids[i].clone()).collect();
        let mut duplicates = BTreeMap::new();
        let mut seen = vec![false; canonical.unique_frames.len()];
        for (src_idx, &unique_idx) in canonical.frame_assignment.iter().enumerate() {
            if seen[unique_idx] {
                duplicates.insert(format!("frame{src_idx}"), symbol_ids[unique_idx].clone());
            }
            seen[unique_idx] = true;
        }

        let manifest = AnimationManifest {
            version: AnimationManifest::VERSION,
            animation: animation_name.to_string(),
            atlas_width: atlas_w,
            atlas_height: atlas_h,
            frames,
            playback,
            duplicates,
            frame_rate,
        };

        Ok(BuiltAnimation { svg, manifest, exported_images })
    }

    /// Rewrites every image def's embedded data URL to an external file ref
    /// when `export_images` is set, returning `(files to write, id ->
    /// rewritten def content)`.
    fn export_images(&self, defs: &[CanonicalDef]) -> (Vec<ExportedImage>, BTreeMap<String, String>) {
        let mut files = Vec::new();
        let mut hrefs = BTreeMap::new();
        if !self.config.export_images {
            return (files, hrefs);
        }
        for def in defs {
            let Some((mime, b64)) = &def.image_payload else { continue };
            let Ok(bytes) = base64::engine::general_purpose::STANDARD.decode(b64) else { continue };
            let ext = match mime.as_str() {
                "image/png" => "png",
                "image/jpeg" => "jpg",
                _ => "bin",
            };
            let file_name = format!("{}.{ext}", def.content_hash);
            let href = match &self.config.web_base_path {
                Some(base) => format!("{}/{file_name}", base.trim_end_matches('/')),
                None => file_name.clone(),
            };
            let data_url_attr = format!("data:{mime};base64,{b64}");
            let rewritten = def.content.replacen(&data_url_attr, &href, 1);
            hrefs.insert(def.id.clone(), rewritten);
            files.push(ExportedImage { file_name, bytes });
        }
        (files, hrefs)
    }
}

fn symbol_ids(animation_name: &str, count: usize, short_ids: bool) -> Vec<String> {
    (0..count)
        .map(|i| {
            if short_ids {
                format!("frame{i}")
            } else {
                let mut h = Fnv1a64::new_default();
                h.write_bytes(animation_name.as_bytes());
                h.write_u64(i as u64);
                format!("frame_{}", Fnv1a64::new(h.finish()).finish_hex(12))
            }
        })
        .collect()
}

fn render_svg(
    width: u32,
    height: u32,
    defs: &[CanonicalDef],
    image_overrides: &BTreeMap<String, String>,
    unique_frames: &[super::hash::CanonicalFrame],
    symbol_ids: &[String],
) -> String {
    let mut out = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" viewBox="0 0 {width} {height}" width="{width}" height="{height}">"#
    );
    if !defs.is_empty() {
        out.push_str("<defs>");
        for def in defs {
            let content = image_overrides.get(&def.id).map(String::as_str).unwrap_or(&def.content);
            let _ = write!(out, "<{} id=\"{}\">{}</{}>", def.tag, def.id, content, def.tag);
        }
        out.push_str("</defs>");
    }
    for (id, frame) in symbol_ids.iter().zip(unique_frames) {
        let _ = write!(out, r#"<symbol id="{id}">"#);
        for u in &frame.uses {
            let Some(href) = &u.href else { continue };
            let _ = write!(out, r#"<use href="#{href}""#);
            if let Some(t) = &u.transform {
                let _ = write!(out, r#" transform="{t}""#);
            }
            for (k, v) in &u.extra_attrs {
                let _ = write!(out, r#" {k}="{v}""#);
            }
            out.push_str("/>");
        }
        out.push_str("</symbol>");
    }
    out.push_str("</svg>");
    out
}

pub struct SpriteBuildResult {
    pub sprite: String,
    pub manifest: SpriteManifest,
    /// One built atlas per animation, in the order listed in `manifest`.
    pub built_animations: Vec<BuiltAnimation>,
}

pub struct BatchSummary {
    pub sprites_built: usize,
    pub failed_sprites: Vec<(String, String)>,
}

/// Runs the atlas builder across every sprite subdirectory of `input_dir`,
/// writing `<output_dir>/<sprite>/...` per spec §6, and returns an aggregate
/// summary. One sprite's failure is logged and counted, not propagated.
pub fn build_batch(input_dir: &Path, output_dir: &Path, config: &BuilderConfig) -> VecanimResult<BatchSummary> {
    let sprite_dirs = discover_sprite_dirs(input_dir)?;
    fs::create_dir_all(output_dir)
        .map_err(|e| VecanimError::unprocessable(format!("cannot create output dir '{}': {e}", output_dir.display())))?;

    let results: Vec<(String, VecanimResult<SpriteBuildResult>)> = sprite_dirs
        .par_iter()
        .map(|dir| {
            let name = sprite_name(dir);
            let result = build_one_sprite(dir, &name, config);
            if let Err(e) = &result {
                tracing::error!(sprite = %name, error = %e, "sprite atlas build failed");
            }
            (name, result)
        })
        .collect();

    let mut registry = ImageRegistry::default();
    let mut failed_sprites = Vec::new();
    let mut sprites_built = 0usize;

    for (name, result) in results {
        match result {
            Ok(built) => {
                if let Err(e) = write_sprite_output(output_dir, &built, &mut registry) {
                    failed_sprites.push((name, e.to_string()));
                } else {
                    sprites_built += 1;
                }
            }
            Err(e) => failed_sprites.push((name, e.to_string())),
        }
    }

    if config.export_images && !registry.images.is_empty() {
        let export_dir = output_dir.join("images");
        fs::create_dir_all(&export_dir)?;
        let registry_json = serde_json::to_string_pretty(&registry)
            .map_err(|e| VecanimError::unprocessable(format!("serialize image registry: {e}")))?;
        fs::write(export_dir.join("registry.json"), registry_json)?;
    }

    Ok(BatchSummary { sprites_built, failed_sprites })
}

fn write_sprite_output(output_dir: &Path, built: &SpriteBuildResult, registry: &mut ImageRegistry) -> VecanimResult<()> {
    let sprite_dir = output_dir.join(&built.sprite);
    fs::create_dir_all(&sprite_dir)?;
    let flat = built.manifest.animations.len() == 1;

    for (entry, animation) in built.manifest.animations.iter().zip(&built.built_animations) {
        let dir = if flat { sprite_dir.clone() } else { sprite_dir.join(&entry.animation) };
        fs::create_dir_all(&dir)?;
        fs::write(dir.join("atlas.svg"), &animation.svg)?;
        let atlas_json = serde_json::to_string_pretty(&animation.manifest)
            .map_err(|e| VecanimError::unprocessable(format!("serialize atlas manifest: {e}")))?;
        fs::write(dir.join("atlas.json"), atlas_json)?;

        for img in &animation.exported_images {
            registry.images.entry(img.file_name.clone()).or_insert_with(|| img.file_name.clone());
            let dest = output_dir.join("images").join(&img.file_name);
            if !dest.exists() {
                fs::create_dir_all(dest.parent().unwrap())?;
                fs::write(&dest, &img.bytes)?;
            }
        }
    }

    let manifest_json = serde_json::to_string_pretty(&built.manifest)
        .map_err(|e| VecanimError::unprocessable(format!("serialize sprite manifest: {e}")))?;
    fs::write(sprite_dir.join("manifest.json"), manifest_json)?;
    Ok(())
}

fn discover_sprite_dirs(input_dir: &Path) -> VecanimResult<Vec<PathBuf>> {
    let entries = fs::read_dir(input_dir)
        .map_err(|_| VecanimError::unprocessable(format!("cannot read input dir '{}'", input_dir.display())))?;
    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn sprite_name(dir: &Path) -> String {
    dir.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

/// Groups a sprite directory's `<animation>_<frame-index>.svg` files by
/// animation name, compiles each into an atlas, and assembles the sprite
/// manifest summarizing them.
fn build_one_sprite(dir: &Path, sprite_name: &str, config: &BuilderConfig) -> VecanimResult<SpriteBuildResult> {
    let mut by_animation: BTreeMap<String, Vec<(u32, PathBuf)>> = BTreeMap::new();
    for entry in fs::read_dir(dir).map_err(|_| VecanimError::unprocessable(format!("cannot read sprite dir '{}'", dir.display())))? {
        let entry = entry?;
        let path = entry.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else { continue };
        let Some((animation, index)) = parse_frame_filename(file_name) else { continue };
        by_animation.entry(animation).or_default().push((index, path));
    }

    let builder = AtlasBuilder::new(config);
    let mut animations = Vec::new();
    let mut built_animations = Vec::new();
    let mut source_bytes = 0u64;
    let mut packed_bytes = 0u64;

    for (animation, mut files) in by_animation {
        files.sort_by_key(|(idx, _)| *idx);
        let frame_svgs: Vec<String> = files
            .iter()
            .map(|(_, path)| fs::read_to_string(path).map_err(VecanimError::from))
            .collect::<VecanimResult<_>>()?;
        source_bytes += frame_svgs.iter().map(|s| s.len() as u64).sum::<u64>();

        let built = builder.build_animation(&animation, &frame_svgs, 30.0)?;
        packed_bytes += built.svg.len() as u64;

        animations.push(SpriteAnimationEntry {
            animation: animation.clone(),
            atlas_svg: format!("{animation}/atlas.svg"),
            atlas_json: format!("{animation}/atlas.json"),
            width: built.manifest.atlas_width,
            height: built.manifest.atlas_height,
        });
        built_animations.push(built);
    }

    if animations.len() == 1 {
        animations[0].atlas_svg = "atlas.svg".to_string();
        animations[0].atlas_json = "atlas.json".to_string();
    }

    let compression_ratio = if source_bytes == 0 { 1.0 } else { packed_bytes as f64 / source_bytes as f64 };
    Ok(SpriteBuildResult {
        sprite: sprite_name.to_string(),
        manifest: SpriteManifest { sprite: sprite_name.to_string(), animations, compression_ratio },
        built_animations,
    })
}

fn parse_frame_filename(file_name: &str) -> Option<(String, u32)> {
    let stem = file_name.strip_suffix(".svg")?;
    let (name, idx) = stem.rsplit_once('_')?;
    let idx: u32 = idx.parse().ok()?;
    Some((name.to_string(), idx))
}

#[cfg(test)]
#[path = "../../tests/unit/atlas/build.rs"]
mod tests;
