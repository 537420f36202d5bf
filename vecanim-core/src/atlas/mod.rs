//! Deduplicating SVG atlas builder.
//!
//! Takes the per-frame SVG documents [`crate::svg::SvgEmitter`] produces for
//! one animation and packs them into a single atlas SVG: [`parse`] reads each
//! frame's defs and placements back out, [`hash`] canonicalizes and
//! deduplicates defs and whole frames by content hash, [`pack`] places the
//! resulting unique frames on a packed raster grid, and [`build`] assembles
//! the atlas SVG plus the [`manifest`] JSON describing it. [`build::build_batch`]
//! is the filesystem-facing driver the CLI calls across a directory of
//! sprites.

mod build;
mod hash;
mod manifest;
mod pack;
mod parse;

pub use build::{AtlasBuilder, BatchSummary, BuilderConfig, BuiltAnimation, ExportedImage, build_batch};
pub use manifest::{
    AnimationManifest, FrameManifestEntry, ImageRegistry, SpriteAnimationEntry, SpriteManifest,
};
