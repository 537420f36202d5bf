//! Top-level container decode, character cache, and drawable resolution
//! (spec §3, §6).

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::bitmap::{self, DecodedBitmap};
use crate::bitreader::{BitReader, ReaderFlags};
use crate::foundation::core::{CharacterId, FrameRate, Matrix, Rectangle};
use crate::foundation::error::{VecanimError, VecanimResult};
use crate::morph::MorphCompiler;
use crate::records::{self, ExportedAsset, MorphFillStyle, MorphLineStyle};
use crate::shapes::{CompiledPath, ShapeCompiler};
use crate::tag::{self, TagHeader, TagReader};
use crate::timeline::Timeline;

/// Compression scheme indicated by the container's 3-byte signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signature {
    Uncompressed,
    Zlib,
    /// Signature byte observed but not decompressible with this crate's
    /// dependency stack; the body is treated as opaque (spec §9 silence —
    /// no lzma-capable crate appears anywhere in the pack's dependency
    /// tables, so this falls back to "unprocessable" rather than inventing
    /// an unvetted dependency).
    LzmaLike,
}

/// Header fields surfaced directly from the container (spec §3, §6).
#[derive(Clone, Debug, PartialEq)]
pub struct ContainerMetadata {
    pub signature: Signature,
    pub version: u8,
    pub declared_length: u32,
    pub frame_bounds: Rectangle,
    pub frame_rate: FrameRate,
    pub frame_count: u16,
    /// `false` when the declared length disagrees with the actual input
    /// length (spec §3: "surfaced as a non-fatal warning").
    pub valid: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ShapeDefinition {
    pub id: CharacterId,
    pub bounds: Rectangle,
    pub paths: Vec<CompiledPath>,
    /// Equal to `(bounds.x_min, bounds.y_min)`; the offset a renderer
    /// subtracts to draw the shape's own content starting at the origin
    /// (spec §3, CompiledPath normalization offsets).
    pub offset: (crate::foundation::core::Twips, crate::foundation::core::Twips),
}

#[derive(Clone, Debug, PartialEq)]
pub struct MorphShapeDefinition {
    pub id: CharacterId,
    pub start_bounds: Rectangle,
    pub end_bounds: Rectangle,
    start_records: Vec<records::ShapeRecord>,
    end_records: Vec<records::ShapeRecord>,
    fill_styles: Vec<MorphFillStyle>,
    line_styles: Vec<MorphLineStyle>,
}

impl MorphShapeDefinition {
    /// Compiles geometry at `ratio`, memoized per ratio rounded to four
    /// decimals (spec §4.5 caching note).
    pub fn paths_at(
        &self,
        ratio: f64,
        cache: &RefCell<HashMap<u32, Rc<Vec<CompiledPath>>>>,
    ) -> VecanimResult<Rc<Vec<CompiledPath>>> {
        let key = (ratio.clamp(0.0, 1.0) * 10_000.0).round() as u32;
        if let Some(hit) = cache.borrow().get(&key) {
            return Ok(hit.clone());
        }
        let paths = MorphCompiler::compile(
            &self.start_records,
            &self.end_records,
            &self.fill_styles,
            &self.line_styles,
            ratio,
        )?;
        let paths = Rc::new(paths);
        cache.borrow_mut().insert(key, paths.clone());
        Ok(paths)
    }

    /// Bounds at `ratio`, per-coordinate linear blend (spec §3).
    pub fn bounds_at(&self, ratio: f64) -> Rectangle {
        let t = ratio.clamp(0.0, 1.0);
        let lerp = |a: i32, b: i32| (a as f64 + (b as f64 - a as f64) * t).round() as i32;
        Rectangle {
            x_min: lerp(self.start_bounds.x_min, self.end_bounds.x_min),
            x_max: lerp(self.start_bounds.x_max, self.end_bounds.x_max),
            y_min: lerp(self.start_bounds.y_min, self.end_bounds.y_min),
            y_max: lerp(self.start_bounds.y_max, self.end_bounds.y_max),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum EncodedImage {
    Jpeg(Vec<u8>),
    Png(Vec<u8>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct BitmapDefinition {
    pub id: CharacterId,
    pub width: u16,
    pub height: u16,
    pub encoded: EncodedImage,
    /// Raw straight RGBA, when available, enabling color-transform
    /// reproduction without a round trip through the encoded form (spec
    /// §3, BitmapDefinition).
    pub raw_rgba: Option<Vec<u8>>,
}

/// A sprite's control-tag stream plus its lazily-compiled timeline (spec
/// §3, §9 cyclic-sprite strategy).
#[derive(Debug)]
pub struct SpriteDefinition {
    pub id: CharacterId,
    pub frame_count: u16,
    body_offset: usize,
    body_len: usize,
    timeline: RefCell<Option<Rc<Timeline>>>,
}

impl PartialEq for SpriteDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// Tagged sum over the four character kinds a PlaceObject can reference
/// (spec §9: "dynamic dispatch over drawables").
#[derive(Clone, Debug)]
pub enum Drawable {
    Shape(Rc<ShapeDefinition>),
    MorphShape(Rc<MorphShapeDefinition>),
    Sprite(Rc<SpriteDefinition>),
    Bitmap(Rc<BitmapDefinition>),
}

impl Drawable {
    pub fn character_id(&self) -> CharacterId {
        match self {
            Drawable::Shape(s) => s.id,
            Drawable::MorphShape(m) => m.id,
            Drawable::Sprite(s) => s.id,
            Drawable::Bitmap(b) => b.id,
        }
    }
}

/// Owns the decoded byte buffer and every per-container cache (spec §3:
/// "Container exclusively owns the decoded byte buffer").
pub struct Container {
    data: Vec<u8>,
    pub metadata: ContainerMetadata,
    pub exports: Vec<ExportedAsset>,
    body_offset: usize,
    body_len: usize,
    flags: ReaderFlags,
    jpeg_tables: Option<Vec<u8>>,
    character_offsets: HashMap<CharacterId, TagHeader>,
    characters: RefCell<HashMap<CharacterId, Drawable>>,
    morph_cache: RefCell<HashMap<CharacterId, RefCell<HashMap<u32, Rc<Vec<CompiledPath>>>>>>,
    root_timeline: RefCell<Option<Rc<Timeline>>>,
    in_progress_sprites: RefCell<HashSet<CharacterId>>,
}

const MAX_AXIS_EXTENT_TWIPS: i32 = 8192 * 20;

impl Container {
    /// Top-level decode entrypoint (spec §6).
    pub fn decode(input: &[u8], flags: ReaderFlags) -> VecanimResult<Container> {
        if input.len() < 8 {
            return Err(VecanimError::out_of_bounds("container shorter than fixed header"));
        }
        let signature = match input[0] {
            b'F' => Signature::Uncompressed,
            b'C' => Signature::Zlib,
            _ => Signature::LzmaLike,
        };
        let version = input[3];
        let declared_length = u32::from_le_bytes([input[4], input[5], input[6], input[7]]);

        let rest = &input[8..];
        let body_bytes: Vec<u8> = match signature {
            Signature::Uncompressed => rest.to_vec(),
            Signature::Zlib => crate::bitreader::inflate(rest, ReaderFlags::forgiving())?,
            Signature::LzmaLike => {
                if flags.contains(ReaderFlags::UNPROCESSABLE) {
                    return Err(VecanimError::unprocessable(
                        "lzma-like compressed container body is not supported",
                    ));
                }
                tracing::warn!("lzma-like container body treated as opaque");
                rest.to_vec()
            }
        };

        // Header fields beyond declared length are read forgivingly so a
        // truncated header still yields a (marked-invalid) container
        // instead of a hard failure (spec §8 scenario a).
        let mut r = BitReader::new(&body_bytes, ReaderFlags::forgiving());
        let frame_bounds = records::read_rectangle(&mut r)?;
        let frame_rate = FrameRate::from_raw_8_8(r.read_u16_le()?);
        let frame_count = r.read_u16_le()?;
        let body_offset = r.tell_bytes();
        let body_len = body_bytes.len().saturating_sub(body_offset);

        let valid = declared_length as usize == input.len();
        if !valid {
            tracing::warn!(
                declared_length,
                actual_length = input.len(),
                "container declared length does not match actual input length"
            );
        }

        let metadata = ContainerMetadata {
            signature,
            version,
            declared_length,
            frame_bounds,
            frame_rate,
            frame_count,
            valid,
        };

        let mut container = Container {
            data: body_bytes,
            metadata,
            exports: Vec::new(),
            body_offset,
            body_len,
            flags,
            jpeg_tables: None,
            character_offsets: HashMap::new(),
            characters: RefCell::new(HashMap::new()),
            morph_cache: RefCell::new(HashMap::new()),
            root_timeline: RefCell::new(None),
            in_progress_sprites: RefCell::new(HashSet::new()),
        };
        container.scan_top_level_tags()?;
        Ok(container)
    }

    /// One pass over the root tag stream: records character offsets, the
    /// shared JPEG header table (if present), and exported-asset names.
    fn scan_top_level_tags(&mut self) -> VecanimResult<()> {
        let slice = &self.data[self.body_offset..self.body_offset + self.body_len];
        let mut reader = TagReader::new(slice, self.flags);
        while let Some(header) = reader.next_tag()? {
            if let Some(id) = header.character_id {
                self.character_offsets.entry(id).or_insert(header);
            }
            match header.code {
                tag::code::JPEG_TABLES => {
                    let mut br = reader.body_reader(&header, ReaderFlags::forgiving());
                    self.jpeg_tables = Some(br.read_bytes(header.body_len)?);
                }
                tag::code::EXPORT_ASSETS => {
                    let mut br = reader.body_reader(&header, ReaderFlags::forgiving());
                    self.exports.extend(records::read_export_assets(&mut br)?);
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Resolves a character id to its drawable, decoding and caching it on
    /// first access (spec §3, invariant 1: unresolved ids yield `None`
    /// without aborting the caller).
    pub fn resolve(&self, id: CharacterId) -> VecanimResult<Option<Drawable>> {
        if let Some(existing) = self.characters.borrow().get(&id) {
            return Ok(Some(existing.clone()));
        }
        let Some(header) = self.character_offsets.get(&id).copied() else {
            return Ok(None);
        };
        let drawable = self.define_character(&header)?;
        if let Some(drawable) = &drawable {
            self.characters.borrow_mut().insert(id, drawable.clone());
        }
        Ok(drawable)
    }

    fn body_reader_for(&self, header: &TagHeader, flags: ReaderFlags) -> BitReader<'_> {
        BitReader::bounded_at(&self.data, header.body_offset, header.body_offset + header.body_len, flags)
    }

    fn define_character(&self, header: &TagHeader) -> VecanimResult<Option<Drawable>> {
        use tag::code::*;
        let drawable = match header.code {
            DEFINE_SHAPE => Some(self.define_shape(header, false, false)?),
            DEFINE_SHAPE2 => Some(self.define_shape(header, false, false)?),
            DEFINE_SHAPE3 => Some(self.define_shape(header, true, true)?),
            DEFINE_SHAPE4 => Some(self.define_shape(header, true, true)?),
            DEFINE_MORPH_SHAPE => Some(self.define_morph_shape(header, false)?),
            DEFINE_MORPH_SHAPE2 => Some(self.define_morph_shape(header, true)?),
            DEFINE_SPRITE => Some(self.define_sprite(header)?),
            DEFINE_BITS => Some(self.define_bits_shared_tables(header)?),
            DEFINE_BITS_JPEG2 => Some(self.define_bits_jpeg2(header)?),
            DEFINE_BITS_JPEG3 => Some(self.define_bits_jpeg_alpha(header, false)?),
            DEFINE_BITS_JPEG4 => Some(self.define_bits_jpeg_alpha(header, true)?),
            DEFINE_BITS_LOSSLESS => Some(self.define_bits_lossless(header, false)?),
            DEFINE_BITS_LOSSLESS2 => Some(self.define_bits_lossless(header, true)?),
            _ => None,
        };
        Ok(drawable)
    }

    fn define_shape(
        &self,
        header: &TagHeader,
        with_alpha: bool,
        extended_line_style: bool,
    ) -> VecanimResult<Drawable> {
        let mut r = self.body_reader_for(header, ReaderFlags::forgiving());
        let id = CharacterId(r.read_u16_le()?);
        let bounds = records::read_rectangle(&mut r)?;
        if extended_line_style {
            // DefineShape4 additionally carries an edge-bounds rectangle
            // and a reserved/winding/scaling-stroke flags byte ahead of
            // the style arrays.
            let _edge_bounds = records::read_rectangle(&mut r)?;
            let _reserved = r.read_ubits(5)?;
            let _uses_fill_winding = r.read_bit()?;
            let _uses_non_scaling_strokes = r.read_bit()?;
            let _uses_scaling_strokes = r.read_bit()?;
        }
        let fill_styles = records::read_fill_style_array(&mut r, with_alpha)?;
        let line_styles = records::read_line_style_array(&mut r, extended_line_style, with_alpha)?;
        let mut fill_bits = r.read_ubits(4)?;
        let mut line_bits = r.read_ubits(4)?;

        let mut edge_records = Vec::new();
        loop {
            let record = records::read_shape_record(
                &mut r,
                &mut fill_bits,
                &mut line_bits,
                extended_line_style,
                with_alpha,
            )?;
            let is_end = matches!(record, records::ShapeRecord::End);
            edge_records.push(record);
            if is_end || r.is_exhausted() {
                break;
            }
        }

        let paths = ShapeCompiler::compile(&edge_records, fill_styles, line_styles);
        Ok(Drawable::Shape(Rc::new(ShapeDefinition {
            id,
            bounds,
            paths,
            offset: (
                crate::foundation::core::Twips(bounds.x_min),
                crate::foundation::core::Twips(bounds.y_min),
            ),
        })))
    }

    fn define_morph_shape(&self, header: &TagHeader, with_alpha: bool) -> VecanimResult<Drawable> {
        let mut r = self.body_reader_for(header, ReaderFlags::forgiving());
        let id = CharacterId(r.read_u16_le()?);
        let start_bounds = records::read_rectangle(&mut r)?;
        let end_bounds = records::read_rectangle(&mut r)?;
        if with_alpha {
            let _start_edge_bounds = records::read_rectangle(&mut r)?;
            let _end_edge_bounds = records::read_rectangle(&mut r)?;
            let _reserved = r.read_ubits(6)?;
            let _uses_non_scaling = r.read_bit()?;
            let _uses_scaling = r.read_bit()?;
        }
        // Offset to the end-edges sub-stream: read but unused (spec §9
        // open question — treated as informational).
        let _end_edges_offset = r.read_u32_le()?;

        let mut fill_count = r.read_u8()? as usize;
        if fill_count == 0xFF {
            fill_count = r.read_u16_le()? as usize;
        }
        let fill_styles = (0..fill_count)
            .map(|_| records::read_morph_fill_style(&mut r))
            .collect::<VecanimResult<Vec<_>>>()?;
        let mut line_count = r.read_u8()? as usize;
        if line_count == 0xFF {
            line_count = r.read_u16_le()? as usize;
        }
        let line_styles = (0..line_count)
            .map(|_| records::read_morph_line_style(&mut r))
            .collect::<VecanimResult<Vec<_>>>()?;

        let mut start_fill_bits = r.read_ubits(4)?;
        let mut start_line_bits = r.read_ubits(4)?;
        let mut start_records = Vec::new();
        loop {
            let record =
                records::read_shape_record(&mut r, &mut start_fill_bits, &mut start_line_bits, true, true)?;
            let is_end = matches!(record, records::ShapeRecord::End);
            start_records.push(record);
            if is_end || r.is_exhausted() {
                break;
            }
        }

        let mut end_fill_bits = r.read_ubits(4)?;
        let mut end_line_bits = r.read_ubits(4)?;
        let mut end_records = Vec::new();
        loop {
            let record =
                records::read_shape_record(&mut r, &mut end_fill_bits, &mut end_line_bits, true, true)?;
            let is_end = matches!(record, records::ShapeRecord::End);
            end_records.push(record);
            if is_end || r.is_exhausted() {
                break;
            }
        }

        Ok(Drawable::MorphShape(Rc::new(MorphShapeDefinition {
            id,
            start_bounds,
            end_bounds,
            start_records,
            end_records,
            fill_styles,
            line_styles,
        })))
    }

    fn define_sprite(&self, header: &TagHeader) -> VecanimResult<Drawable> {
        let mut r = self.body_reader_for(header, ReaderFlags::forgiving());
        let id = CharacterId(r.read_u16_le()?);
        let frame_count = r.read_u16_le()?;
        let body_offset = r.tell_bytes();
        let body_len = header.body_len.saturating_sub(body_offset - header.body_offset);
        Ok(Drawable::Sprite(Rc::new(SpriteDefinition {
            id,
            frame_count,
            body_offset,
            body_len,
            timeline: RefCell::new(None),
        })))
    }

    fn define_bits_shared_tables(&self, header: &TagHeader) -> VecanimResult<Drawable> {
        let mut r = self.body_reader_for(header, ReaderFlags::forgiving());
        let id = CharacterId(r.read_u16_le()?);
        let local = r.read_bytes(header.body_len.saturating_sub(2))?;
        let mut full = local;
        if let Some(tables) = &self.jpeg_tables {
            let mut combined = tables.clone();
            combined.extend_from_slice(&full);
            full = combined;
        }
        let decoded = bitmap::decode_jpeg(&full).unwrap_or_else(|_| DecodedBitmap::empty());
        Ok(Drawable::Bitmap(Rc::new(BitmapDefinition {
            id,
            width: decoded.width,
            height: decoded.height,
            encoded: EncodedImage::Jpeg(full),
            raw_rgba: if decoded.rgba.is_empty() { None } else { Some(decoded.rgba) },
        })))
    }

    fn define_bits_jpeg2(&self, header: &TagHeader) -> VecanimResult<Drawable> {
        let mut r = self.body_reader_for(header, ReaderFlags::forgiving());
        let id = CharacterId(r.read_u16_le()?);
        let data = r.read_bytes(header.body_len.saturating_sub(2))?;
        let decoded = bitmap::decode_jpeg(&data).unwrap_or_else(|_| DecodedBitmap::empty());
        Ok(Drawable::Bitmap(Rc::new(BitmapDefinition {
            id,
            width: decoded.width,
            height: decoded.height,
            encoded: EncodedImage::Jpeg(data),
            raw_rgba: if decoded.rgba.is_empty() { None } else { Some(decoded.rgba) },
        })))
    }

    fn define_bits_jpeg_alpha(&self, header: &TagHeader, has_deblock: bool) -> VecanimResult<Drawable> {
        let mut r = self.body_reader_for(header, ReaderFlags::forgiving());
        let id = CharacterId(r.read_u16_le()?);
        let jpeg_len = r.read_u32_le()? as usize;
        if has_deblock {
            let _deblock_param = r.read_fixed8_8()?;
        }
        let jpeg_data = r.read_bytes(jpeg_len)?;
        let body_end = header.body_offset + header.body_len;
        let alpha_data = r.read_to(body_end)?;
        let decoded = bitmap::decode_jpeg_with_alpha(&jpeg_data, &alpha_data)
            .unwrap_or_else(|_| DecodedBitmap::empty());
        let png = if decoded.width > 0 {
            Some(bitmap::encode_png(decoded.width, decoded.height, &decoded.rgba))
        } else {
            None
        };
        Ok(Drawable::Bitmap(Rc::new(BitmapDefinition {
            id,
            width: decoded.width,
            height: decoded.height,
            encoded: png.map(EncodedImage::Png).unwrap_or(EncodedImage::Jpeg(jpeg_data)),
            raw_rgba: if decoded.rgba.is_empty() { None } else { Some(decoded.rgba) },
        })))
    }

    fn define_bits_lossless(&self, header: &TagHeader, with_alpha: bool) -> VecanimResult<Drawable> {
        let mut r = self.body_reader_for(header, ReaderFlags::forgiving());
        let id = CharacterId(r.read_u16_le()?);
        let lossless_header = records::read_lossless_bitmap_header(&mut r, with_alpha)?;
        let body_end = header.body_offset + header.body_len;
        let inflated = r.read_inflate_to(body_end)?;
        let decoded = bitmap::decode_lossless(&lossless_header, &inflated)?;
        let png = if decoded.width > 0 {
            bitmap::encode_png(decoded.width, decoded.height, &decoded.rgba)
        } else {
            Vec::new()
        };
        Ok(Drawable::Bitmap(Rc::new(BitmapDefinition {
            id,
            width: decoded.width,
            height: decoded.height,
            encoded: EncodedImage::Png(png),
            raw_rgba: if decoded.rgba.is_empty() { None } else { Some(decoded.rgba) },
        })))
    }

    /// Own declared bounds for a drawable, compiling a sprite's timeline if
    /// needed to obtain its aggregate bounds (spec §4.7).
    pub fn drawable_bounds(&self, drawable: &Drawable) -> VecanimResult<Rectangle> {
        Ok(match drawable {
            Drawable::Shape(s) => s.bounds,
            Drawable::MorphShape(m) => m.start_bounds,
            Drawable::Bitmap(b) => Rectangle {
                x_min: 0,
                x_max: i32::from(b.width) * 20,
                y_min: 0,
                y_max: i32::from(b.height) * 20,
            },
            Drawable::Sprite(s) => self.timeline_of(s)?.bounds,
        })
    }

    /// Geometry for a morph shape at `ratio`, memoized per character id and
    /// ratio (spec §4.5).
    pub fn morph_paths(
        &self,
        morph: &Rc<MorphShapeDefinition>,
        ratio: f64,
    ) -> VecanimResult<Rc<Vec<CompiledPath>>> {
        let mut caches = self.morph_cache.borrow_mut();
        let entry = caches.entry(morph.id).or_insert_with(|| RefCell::new(HashMap::new()));
        let cache = entry;
        let result = morph.paths_at(ratio, cache);
        result
    }

    /// The root (non-sprite) timeline, compiled lazily and memoized.
    pub fn root_timeline(&self) -> VecanimResult<Rc<Timeline>> {
        if let Some(existing) = self.root_timeline.borrow().as_ref() {
            return Ok(existing.clone());
        }
        let timeline = Rc::new(crate::timeline::TimelineCompositor::compile(
            self,
            self.body_offset,
            self.body_offset + self.body_len,
            MAX_AXIS_EXTENT_TWIPS,
        )?);
        *self.root_timeline.borrow_mut() = Some(timeline.clone());
        Ok(timeline)
    }

    /// A sprite's timeline, compiled lazily with cycle detection (spec §3,
    /// §9): a sprite re-entered while its own timeline is still compiling
    /// yields an empty timeline rather than recursing forever.
    pub fn timeline_of(&self, sprite: &Rc<SpriteDefinition>) -> VecanimResult<Rc<Timeline>> {
        if let Some(existing) = sprite.timeline.borrow().as_ref() {
            return Ok(existing.clone());
        }
        if self.in_progress_sprites.borrow().contains(&sprite.id) {
            tracing::warn!(character_id = sprite.id.0, "cyclic sprite reference, returning empty timeline");
            return Ok(Rc::new(Timeline { bounds: Rectangle::EMPTY, frames: Vec::new() }));
        }
        self.in_progress_sprites.borrow_mut().insert(sprite.id);
        let result = crate::timeline::TimelineCompositor::compile(
            self,
            sprite.body_offset,
            sprite.body_offset + sprite.body_len,
            MAX_AXIS_EXTENT_TWIPS,
        );
        self.in_progress_sprites.borrow_mut().remove(&sprite.id);
        let timeline = Rc::new(result?);
        *sprite.timeline.borrow_mut() = Some(timeline.clone());
        Ok(timeline)
    }

    pub(crate) fn data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn flags(&self) -> ReaderFlags {
        self.flags
    }
}

/// Composes the placement matrix with a drawable's own minimum corner so
/// its locally-normalized content lands on the stage at the right place,
/// and integer-rounds the result (spec §4.7).
pub(crate) fn effective_matrix(placement: Matrix, own_bounds: Rectangle) -> Matrix {
    placement.multiply(Matrix::translate(
        crate::foundation::core::Twips(own_bounds.x_min),
        crate::foundation::core::Twips(own_bounds.y_min),
    ))
}

/// Maps a rectangle's four corners through `m` and returns their bounding
/// envelope.
pub(crate) fn transform_rectangle(m: Matrix, rect: Rectangle) -> Rectangle {
    let transform_point = |x: i32, y: i32| -> (i32, i32) {
        let tx = m.scale_x * f64::from(x) + m.skew_x * f64::from(y) + f64::from(m.translate_x.get());
        let ty = m.skew_y * f64::from(x) + m.scale_y * f64::from(y) + f64::from(m.translate_y.get());
        (tx.round() as i32, ty.round() as i32)
    };
    let corners = [
        transform_point(rect.x_min, rect.y_min),
        transform_point(rect.x_max, rect.y_min),
        transform_point(rect.x_max, rect.y_max),
        transform_point(rect.x_min, rect.y_max),
    ];
    let mut x_min = i32::MAX;
    let mut x_max = i32::MIN;
    let mut y_min = i32::MAX;
    let mut y_max = i32::MIN;
    for (x, y) in corners {
        x_min = x_min.min(x);
        x_max = x_max.max(x);
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }
    Rectangle { x_min, x_max, y_min, y_max }
}

/// A placed object exceeds the configured maximum axis extent (spec §4.7).
pub(crate) fn exceeds_max_extent(rect: Rectangle, max_extent: i32) -> bool {
    rect.width() > max_extent || rect.height() > max_extent
}

#[cfg(test)]
#[path = "../tests/unit/container.rs"]
mod tests;
