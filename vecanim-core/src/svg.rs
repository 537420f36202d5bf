//! Drawable → SVG document emission.
//!
//! [`SvgEmitter`] is the drawing interface compiled shapes, sprites, morph
//! shapes, and bitmaps are rendered through. It owns a deferred `<defs>`
//! buffer, deduplicated by structural hash, and exposes the small vocabulary
//! of draw operations a frame compositor needs: `area`, `shape`, `image`,
//! `include`, `start_clip`/`end_clip`.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::rc::Rc;

use base64::Engine as _;

use crate::container::{
    BitmapDefinition, Container, Drawable, EncodedImage, MorphShapeDefinition, ShapeDefinition,
};
use crate::foundation::core::{Color, Matrix, Rectangle, Twips};
use crate::foundation::error::VecanimResult;
use crate::foundation::math::Fnv1a64;
use crate::records::{CapStyle, Filter, FillStyle, Gradient, JoinStyle, LineStyle, SpreadMode};
use crate::shapes::{CompiledPath, CompiledSegment};

/// How strokes thinner than one pixel are represented.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThinStrokeMode {
    /// Clamp the rendered width to 1px and rely on `vector-effect` to keep
    /// it constant under scaling.
    NonScalingMinimumOnePixel,
    /// Emit the true sub-pixel width as-is.
    SubPixel,
}

#[derive(Clone, Debug)]
pub struct SvgEmitterOptions {
    pub thin_stroke_mode: ThinStrokeMode,
    /// Use compact sequential def ids (`d0`, `d1`, …) instead of
    /// content-hash ids.
    pub short_ids: bool,
}

impl Default for SvgEmitterOptions {
    fn default() -> Self {
        Self {
            thin_stroke_mode: ThinStrokeMode::NonScalingMinimumOnePixel,
            short_ids: false,
        }
    }
}

/// One open group the caller must eventually close, tracked so `finish`
/// can close anything left dangling rather than emit unbalanced markup.
enum OpenGroup {
    Area,
    Clip(String),
}

pub struct SvgEmitter<'c> {
    container: &'c Container,
    options: SvgEmitterOptions,
    body: String,
    defs: Vec<(String, String)>,
    def_ids: HashMap<u64, String>,
    next_seq: u32,
    open: Vec<OpenGroup>,
}

impl<'c> SvgEmitter<'c> {
    pub fn new(container: &'c Container, options: SvgEmitterOptions) -> Self {
        Self {
            container,
            options,
            body: String::new(),
            defs: Vec::new(),
            def_ids: HashMap::new(),
            next_seq: 0,
            open: Vec::new(),
        }
    }

    /// Opens the root group so `bounds`'s upper-left maps to the origin.
    pub fn area(&mut self, bounds: Rectangle) {
        let dx = -Twips(bounds.x_min).to_pixels();
        let dy = -Twips(bounds.y_min).to_pixels();
        let _ = write!(self.body, r#"<g transform="translate({dx:.3},{dy:.3})">"#);
        self.open.push(OpenGroup::Area);
    }

    /// Emits a translated group of `<path>` elements for a compiled shape's
    /// paths.
    pub fn shape(&mut self, paths: &[CompiledPath], x_offset: Twips, y_offset: Twips) {
        let dx = x_offset.to_pixels();
        let dy = y_offset.to_pixels();
        let _ = write!(self.body, r#"<g transform="translate({dx:.3},{dy:.3})">"#);
        for path in paths {
            let fragment = self.path_element(path);
            self.body.push_str(&fragment);
        }
        self.body.push_str("</g>");
    }

    /// Emits an `<image>` element with a data-URL payload.
    pub fn image(&mut self, bitmap: &BitmapDefinition) {
        self.body.push_str(&Self::image_element(bitmap));
    }

    fn image_element(bitmap: &BitmapDefinition) -> String {
        let (mime, bytes): (&str, &[u8]) = match &bitmap.encoded {
            EncodedImage::Jpeg(d) => ("image/jpeg", d),
            EncodedImage::Png(d) => ("image/png", d),
        };
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        format!(
            r#"<image width="{}" height="{}" preserveAspectRatio="none" href="data:{mime};base64,{encoded}"/>"#,
            bitmap.width, bitmap.height,
        )
    }

    /// Draws `drawable` into the deferred defs buffer (memoized per
    /// character id and, for morph shapes, ratio bucket) and references it
    /// at the call site via `<use>`.
    pub fn include(
        &mut self,
        drawable: &Drawable,
        matrix: Matrix,
        ratio: Option<f64>,
        filters: &[Filter],
        blend_mode: u8,
        name: Option<&str>,
    ) -> VecanimResult<()> {
        let def_id = self.ensure_drawable_def(drawable, ratio)?;
        let filter_id = self.filter_ref(filters);
        let [a, b, c, d, e, f] = matrix.to_affine().as_coeffs();
        let _ = write!(
            self.body,
            r#"<use href="#{def_id}" transform="matrix({a:.6},{b:.6},{c:.6},{d:.6},{e:.3},{f:.3})""#
        );
        if let Some(id) = &filter_id {
            let _ = write!(self.body, r#" filter="url(#{id})""#);
        }
        if let Some(css) = blend_mode_css(blend_mode) {
            let _ = write!(self.body, r#" style="mix-blend-mode:{css}""#);
        }
        if let Some(name) = name {
            let _ = write!(self.body, r#" id="{}""#, escape_attr(name));
        }
        self.body.push_str("/>");
        Ok(())
    }

    /// Installs a `<clipPath>` in defs and opens a group that references
    /// it; paired with [`Self::end_clip`].
    pub fn start_clip(&mut self, drawable: &Drawable, matrix: Matrix, ratio: Option<f64>) -> VecanimResult<String> {
        let content_id = self.ensure_drawable_def(drawable, ratio)?;
        let [a, b, c, d, e, f] = matrix.to_affine().as_coeffs();
        let clip_id = self.register_def(&format!("clip:{content_id}:{matrix:?}"), |id| {
            format!(
                r#"<clipPath id="{id}"><use href="#{content_id}" transform="matrix({a:.6},{b:.6},{c:.6},{d:.6},{e:.3},{f:.3})"/></clipPath>"#
            )
        });
        let _ = write!(self.body, r#"<g clip-path="url(#{clip_id})">"#);
        self.open.push(OpenGroup::Clip(clip_id.clone()));
        Ok(clip_id)
    }

    /// Closes the group opened by [`Self::start_clip`]; `id` must match the
    /// id it returned.
    pub fn end_clip(&mut self, id: &str) {
        if let Some(OpenGroup::Clip(open_id)) = self.open.last() {
            if open_id == id {
                self.open.pop();
                self.body.push_str("</g>");
                return;
            }
        }
        tracing::warn!(id, "end_clip called without a matching open clip group");
        self.body.push_str("</g>");
    }

    /// Closes every still-open group and returns the assembled `<svg>`
    /// document.
    pub fn finish(mut self, bounds: Rectangle) -> String {
        while self.open.pop().is_some() {
            self.body.push_str("</g>");
        }
        let width = Twips(bounds.width()).to_pixels();
        let height = Twips(bounds.height()).to_pixels();
        let mut out = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" viewBox="0 0 {width:.3} {height:.3}" width="{width:.3}" height="{height:.3}">"#
        );
        if !self.defs.is_empty() {
            out.push_str("<defs>");
            for (_, content) in &self.defs {
                out.push_str(content);
            }
            out.push_str("</defs>");
        }
        out.push_str(&self.body);
        out.push_str("</svg>");
        out
    }

    // -- defs plumbing --------------------------------------------------

    /// Registers a defs entry keyed by a structural string, returning its
    /// existing id on a repeat key or allocating and building a new one.
    fn register_def(&mut self, key: &str, build: impl FnOnce(&str) -> String) -> String {
        let mut h = Fnv1a64::new_default();
        h.write_bytes(key.as_bytes());
        let digest = h.finish();
        if let Some(id) = self.def_ids.get(&digest) {
            return id.clone();
        }
        let id = if self.options.short_ids {
            let id = format!("d{}", self.next_seq);
            self.next_seq += 1;
            id
        } else {
            format!("def_{}", Fnv1a64::new(digest).finish_hex(12))
        };
        let content = build(&id);
        self.def_ids.insert(digest, id.clone());
        self.defs.push((id.clone(), content));
        id
    }

    fn ensure_drawable_def(&mut self, drawable: &Drawable, ratio: Option<f64>) -> VecanimResult<String> {
        // Ratio only distinguishes morph-shape defs; a sprite's def is keyed
        // purely on its character id (see sprite_def_content).
        let ratio_key = if matches!(drawable, Drawable::MorphShape(_)) { ratio } else { None };
        let key = format!("drawable:{:?}:{:?}", drawable.character_id(), ratio_key);
        let mut h = Fnv1a64::new_default();
        h.write_bytes(key.as_bytes());
        let digest = h.finish();
        if let Some(id) = self.def_ids.get(&digest) {
            return Ok(id.clone());
        }

        let content = match drawable {
            Drawable::Shape(shape) => self.shape_def_content(shape),
            Drawable::MorphShape(morph) => self.morph_def_content(morph, ratio)?,
            Drawable::Bitmap(bitmap) => Self::bitmap_def_content(bitmap),
            Drawable::Sprite(sprite) => self.sprite_def_content(sprite)?,
        };

        let id = if self.options.short_ids {
            let id = format!("d{}", self.next_seq);
            self.next_seq += 1;
            id
        } else {
            format!("def_{}", Fnv1a64::new(digest).finish_hex(12))
        };
        let wrapped = format!(r#"<g id="{id}">{content}</g>"#);
        self.def_ids.insert(digest, id.clone());
        self.defs.push((id.clone(), wrapped));
        Ok(id)
    }

    fn shape_def_content(&mut self, shape: &Rc<ShapeDefinition>) -> String {
        let mut sub = SvgEmitter {
            container: self.container,
            options: self.options.clone(),
            body: String::new(),
            defs: std::mem::take(&mut self.defs),
            def_ids: std::mem::take(&mut self.def_ids),
            next_seq: self.next_seq,
            open: Vec::new(),
        };
        sub.shape(&shape.paths, Twips(-shape.offset.0.get()), Twips(-shape.offset.1.get()));
        self.defs = sub.defs;
        self.def_ids = sub.def_ids;
        self.next_seq = sub.next_seq;
        sub.body
    }

    fn morph_def_content(&mut self, morph: &Rc<MorphShapeDefinition>, ratio: Option<f64>) -> VecanimResult<String> {
        let ratio = ratio.unwrap_or(0.0);
        let paths = self.container.morph_paths(morph, ratio)?;
        let bounds = morph.bounds_at(ratio);
        let mut sub = SvgEmitter {
            container: self.container,
            options: self.options.clone(),
            body: String::new(),
            defs: std::mem::take(&mut self.defs),
            def_ids: std::mem::take(&mut self.def_ids),
            next_seq: self.next_seq,
            open: Vec::new(),
        };
        sub.shape(&paths, Twips(-bounds.x_min), Twips(-bounds.y_min));
        self.defs = sub.defs;
        self.def_ids = sub.def_ids;
        self.next_seq = sub.next_seq;
        Ok(sub.body)
    }

    fn bitmap_def_content(bitmap: &Rc<BitmapDefinition>) -> String {
        Self::image_element(bitmap)
    }

    /// Renders a sprite's first timeline frame. A sprite plays on its own
    /// independent frame counter, so there is no single "current" frame to
    /// pick relative to an ancestor timeline; the first frame is used as a
    /// static representative (documented limitation, akin to the inner
    /// drop-shadow/glow filters below).
    fn sprite_def_content(&mut self, sprite: &Rc<crate::container::SpriteDefinition>) -> VecanimResult<String> {
        let timeline = self.container.timeline_of(sprite)?;
        let Some(frame_obj) = timeline.frames.first() else {
            return Ok(String::new());
        };
        let mut sub = SvgEmitter {
            container: self.container,
            options: self.options.clone(),
            body: String::new(),
            defs: std::mem::take(&mut self.defs),
            def_ids: std::mem::take(&mut self.def_ids),
            next_seq: self.next_seq,
            open: Vec::new(),
        };
        for object in &frame_obj.objects {
            sub.include(&object.drawable, object.matrix, object.ratio, &object.filters, object.blend_mode, object.name.as_deref())?;
        }
        self.defs = sub.defs;
        self.def_ids = sub.def_ids;
        self.next_seq = sub.next_seq;
        Ok(sub.body)
    }

    // -- path / fill / stroke rendering ----------------------------------

    fn path_element(&mut self, path: &CompiledPath) -> String {
        let d = build_path_d(&path.segments);
        let mut out = format!(r#"<path d="{d}" fill-rule="evenodd""#);
        match &path.fill {
            Some(fill) => {
                let (attr, opacity) = self.fill_attr(fill);
                let _ = write!(out, r#" fill="{attr}""#);
                if let Some(op) = opacity {
                    let _ = write!(out, r#" fill-opacity="{op:.4}""#);
                }
            }
            None => out.push_str(r#" fill="none""#),
        }
        if let Some(line) = &path.line {
            self.write_stroke_attrs(&mut out, line);
        }
        out.push_str("/>");
        out
    }

    fn write_stroke_attrs(&mut self, out: &mut String, line: &LineStyle) {
        let width_px = line.width.to_pixels();
        let (stroke_width, vector_effect) = match self.options.thin_stroke_mode {
            ThinStrokeMode::NonScalingMinimumOnePixel if width_px < 1.0 => (1.0, true),
            _ => (width_px.max(0.0), false),
        };
        let (color_attr, opacity) = match (&line.color, &line.fill) {
            (Some(c), _) => (format!("#{:02x}{:02x}{:02x}", c.r, c.g, c.b), Some(f64::from(c.a) / 255.0)),
            (None, Some(fill)) => self.fill_attr(fill),
            (None, None) => ("none".to_string(), None),
        };
        let _ = write!(out, r#" stroke="{color_attr}" stroke-width="{stroke_width:.3}""#);
        if let Some(op) = opacity {
            let _ = write!(out, r#" stroke-opacity="{op:.4}""#);
        }
        if vector_effect {
            out.push_str(r#" vector-effect="non-scaling-stroke""#);
        }
        let _ = write!(
            out,
            r#" stroke-linecap="{}" stroke-linejoin="{}""#,
            cap_attr(line.start_cap),
            join_attr(line.join),
        );
        if line.join == JoinStyle::Miter {
            if let Some(limit) = line.miter_limit {
                let _ = write!(out, r#" stroke-miterlimit="{limit:.3}""#);
            }
        }
    }

    /// Returns `(fill-attribute-value, opacity)`, registering a gradient or
    /// pattern def as needed, deduplicated by structural hash within a
    /// document.
    fn fill_attr(&mut self, fill: &FillStyle) -> (String, Option<f64>) {
        match fill {
            FillStyle::Solid(c) => (
                format!("#{:02x}{:02x}{:02x}", c.r, c.g, c.b),
                Some(f64::from(c.a) / 255.0),
            ),
            FillStyle::LinearGradient { matrix, gradient } => {
                let id = self.gradient_def(matrix, gradient, GradientKind::Linear, None);
                (format!("url(#{id})"), None)
            }
            FillStyle::RadialGradient { matrix, gradient } => {
                let id = self.gradient_def(matrix, gradient, GradientKind::Radial, None);
                (format!("url(#{id})"), None)
            }
            FillStyle::FocalRadialGradient { matrix, gradient } => {
                let id = self.gradient_def(matrix, gradient, GradientKind::Radial, gradient.focal_point);
                (format!("url(#{id})"), None)
            }
            FillStyle::Bitmap {
                character_id,
                matrix,
                repeating,
                smoothed: _,
            } => {
                let id = self.pattern_def(*character_id, matrix, *repeating);
                (format!("url(#{id})"), None)
            }
        }
    }

    fn gradient_def(&mut self, matrix: &Matrix, gradient: &Gradient, kind: GradientKind, focal: Option<f64>) -> String {
        let key = format!("gradient:{:?}:{:?}:{:?}:{:?}", kind, matrix, gradient, focal);
        self.register_def(&key, |id| {
            let spread = match gradient.spread {
                SpreadMode::Pad => "pad",
                SpreadMode::Reflect => "reflect",
                SpreadMode::Repeat => "repeat",
            };
            let [a, b, c, d, e, f] = matrix.to_affine().as_coeffs();
            let mut stops = String::new();
            for stop in &gradient.stops {
                let offset = f64::from(stop.ratio) / 255.0;
                let _ = write!(
                    stops,
                    r#"<stop offset="{offset:.4}" stop-color="#{:02x}{:02x}{:02x}" stop-opacity="{:.4}"/>"#,
                    stop.color.r,
                    stop.color.g,
                    stop.color.b,
                    f64::from(stop.color.a) / 255.0,
                );
            }
            match kind {
                GradientKind::Linear => format!(
                    r#"<linearGradient id="{id}" gradientUnits="userSpaceOnUse" x1="-16384" y1="0" x2="16384" y2="0" spreadMethod="{spread}" gradientTransform="matrix({a:.6},{b:.6},{c:.6},{d:.6},{e:.3},{f:.3})">{stops}</linearGradient>"#
                ),
                GradientKind::Radial => {
                    let (fx, fy) = focal
                        .map(|fp| (fp * 16384.0, 0.0))
                        .unwrap_or((0.0, 0.0));
                    format!(
                        r#"<radialGradient id="{id}" gradientUnits="userSpaceOnUse" cx="0" cy="0" r="16384" fx="{fx:.3}" fy="{fy:.3}" spreadMethod="{spread}" gradientTransform="matrix({a:.6},{b:.6},{c:.6},{d:.6},{e:.3},{f:.3})">{stops}</radialGradient>"#
                    )
                }
            }
        })
    }

    fn pattern_def(&mut self, character_id: crate::foundation::core::CharacterId, matrix: &Matrix, repeating: bool) -> String {
        let bitmap = self.container.resolve(character_id).ok().flatten();
        let key = format!("pattern:{:?}:{:?}:{:?}", character_id, matrix, repeating);
        self.register_def(&key, |id| {
            let image = match &bitmap {
                Some(Drawable::Bitmap(b)) => Self::image_element(b),
                _ => String::new(),
            };
            let (w, h) = match &bitmap {
                Some(Drawable::Bitmap(b)) => (f64::from(b.width), f64::from(b.height)),
                _ => (1.0, 1.0),
            };
            let [a, b, c, d, e, f] = matrix.to_affine().as_coeffs();
            format!(
                r#"<pattern id="{id}" patternUnits="userSpaceOnUse" width="{w}" height="{h}" patternTransform="matrix({a:.6},{b:.6},{c:.6},{d:.6},{e:.3},{f:.3})">{image}</pattern>"#
            )
        })
    }

    /// Builds the `<filter>` def implementing the filter conversion
    /// contract; returns `None` for an empty list or for a list composed
    /// entirely of the documented-unsupported inner-shadow/inner-glow
    /// variants, which pass their input through unchanged.
    fn filter_ref(&mut self, filters: &[Filter]) -> Option<String> {
        if filters.is_empty() {
            return None;
        }
        let key = format!("filter:{:?}", filters);
        let mut any_supported = false;
        let mut primitives = String::new();
        let mut last_result = "SourceGraphic".to_string();
        let mut counter = 0u32;
        let mut next_result = || {
            counter += 1;
            format!("f{counter}")
        };

        for filter in filters {
            match filter {
                Filter::DropShadow { inner: true, .. } | Filter::Glow { inner: true, .. } => {
                    // Documented limitation: inner variants return the input
                    // unchanged.
                    continue;
                }
                Filter::DropShadow {
                    color,
                    blur_x,
                    blur_y,
                    angle,
                    distance,
                    knockout,
                    ..
                } => {
                    any_supported = true;
                    let dx = angle.cos() * distance;
                    let dy = angle.sin() * distance;
                    push_shadow_pass(&mut primitives, &mut next_result, &mut last_result, *color, dx, dy, *blur_x, *blur_y, *knockout);
                }
                Filter::Glow {
                    color,
                    blur_x,
                    blur_y,
                    knockout,
                    ..
                } => {
                    any_supported = true;
                    push_shadow_pass(&mut primitives, &mut next_result, &mut last_result, *color, 0.0, 0.0, *blur_x, *blur_y, *knockout);
                }
                Filter::Bevel {
                    shadow_color,
                    highlight_color,
                    blur_x,
                    blur_y,
                    angle,
                    distance,
                    knockout,
                    ..
                } => {
                    any_supported = true;
                    let dx = angle.cos() * distance;
                    let dy = angle.sin() * distance;
                    push_shadow_pass(&mut primitives, &mut next_result, &mut last_result, *shadow_color, dx, dy, *blur_x, *blur_y, false);
                    push_shadow_pass(&mut primitives, &mut next_result, &mut last_result, *highlight_color, -dx, -dy, *blur_x, *blur_y, *knockout);
                }
                Filter::GradientGlow { gradient, blur_x, blur_y, knockout, .. }
                | Filter::GradientBevel { gradient, blur_x, blur_y, knockout, .. } => {
                    any_supported = true;
                    // Lift the stop colors to an averaged flat color: a full
                    // gradient-fill flood is out of scope for a filter
                    // primitive chain without a second pass over geometry.
                    let color = average_gradient_color(gradient);
                    push_shadow_pass(&mut primitives, &mut next_result, &mut last_result, color, 0.0, 0.0, *blur_x, *blur_y, *knockout);
                }
                Filter::Blur { blur_x, blur_y, .. } => {
                    any_supported = true;
                    let result = next_result();
                    push_blur(&mut primitives, &last_result, &result, *blur_x, *blur_y);
                    last_result = result;
                }
                Filter::ColorMatrix { matrix } => {
                    any_supported = true;
                    let result = next_result();
                    let values = matrix.iter().map(|v| format!("{v:.6}")).collect::<Vec<_>>().join(" ");
                    let _ = write!(
                        primitives,
                        r#"<feColorMatrix in="{last_result}" result="{result}" type="matrix" values="{values}"/>"#
                    );
                    last_result = result;
                }
                Filter::Convolution {
                    matrix_x,
                    matrix_y,
                    divisor,
                    bias,
                    matrix,
                    preserve_alpha,
                    ..
                } => {
                    any_supported = true;
                    let result = next_result();
                    let kernel = matrix.iter().map(|v| format!("{v:.6}")).collect::<Vec<_>>().join(" ");
                    let _ = write!(
                        primitives,
                        r#"<feConvolveMatrix in="{last_result}" result="{result}" order="{matrix_x} {matrix_y}" divisor="{divisor}" bias="{bias}" preserveAlpha="{preserve_alpha}" kernelMatrix="{kernel}"/>"#
                    );
                    last_result = result;
                }
            }
        }

        if !any_supported {
            return None;
        }

        Some(self.register_def(&key, |id| {
            format!(r#"<filter id="{id}" x="-50%" y="-50%" width="200%" height="200%">{primitives}</filter>"#)
        }))
    }
}

/// Composites one timeline frame's depth-ordered display list into a
/// complete SVG document. A clip-depth on an object opens a clip group
/// covering every following object up to and including that depth; the
/// clip object itself is never drawn, only referenced as a mask.
pub fn render_frame_to_svg(
    container: &Container,
    frame: &crate::timeline::Frame,
    options: SvgEmitterOptions,
) -> VecanimResult<String> {
    let mut emitter = SvgEmitter::new(container, options);
    emitter.area(frame.bounds);

    let mut clip_stack: Vec<(u16, String)> = Vec::new();
    for obj in &frame.objects {
        while let Some((boundary, _)) = clip_stack.last() {
            if obj.depth > *boundary {
                let (_, id) = clip_stack.pop().unwrap();
                emitter.end_clip(&id);
            } else {
                break;
            }
        }

        if let Some(clip_depth) = obj.clip_depth {
            let id = emitter.start_clip(&obj.drawable, obj.matrix, obj.ratio)?;
            clip_stack.push((clip_depth, id));
            continue;
        }

        emitter.include(&obj.drawable, obj.matrix, obj.ratio, &obj.filters, obj.blend_mode, obj.name.as_deref())?;
    }
    while let Some((_, id)) = clip_stack.pop() {
        emitter.end_clip(&id);
    }

    Ok(emitter.finish(frame.bounds))
}

enum GradientKind {
    Linear,
    Radial,
}

impl std::fmt::Debug for GradientKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            GradientKind::Linear => "linear",
            GradientKind::Radial => "radial",
        })
    }
}

fn push_shadow_pass(
    primitives: &mut String,
    next_result: &mut impl FnMut() -> String,
    last_result: &mut String,
    color: Color,
    dx: f64,
    dy: f64,
    blur_x: f64,
    blur_y: f64,
    knockout: bool,
) {
    let flood = next_result();
    let _ = write!(
        primitives,
        r#"<feFlood flood-color="#{:02x}{:02x}{:02x}" flood-opacity="{:.4}" result="{flood}"/>"#,
        color.r,
        color.g,
        color.b,
        f64::from(color.a) / 255.0,
    );
    let masked = next_result();
    let _ = write!(
        primitives,
        r#"<feComposite in="{flood}" in2="SourceAlpha" operator="in" result="{masked}"/>"#
    );
    let offset = next_result();
    let _ = write!(
        primitives,
        r#"<feOffset in="{masked}" dx="{dx:.3}" dy="{dy:.3}" result="{offset}"/>"#
    );
    let blurred = next_result();
    push_blur(primitives, &offset, &blurred, blur_x, blur_y);
    let merged = next_result();
    if knockout {
        let _ = write!(primitives, r#"<feMerge result="{merged}"><feMergeNode in="{blurred}"/></feMerge>"#);
    } else {
        let _ = write!(
            primitives,
            r#"<feMerge result="{merged}"><feMergeNode in="{blurred}"/><feMergeNode in="{}"/></feMerge>"#,
            last_result,
        );
    }
    *last_result = merged;
}

/// Box-blur convolution approximation up to radius 9, falling back to
/// `feGaussianBlur` with σ = radius / √3 beyond that.
fn push_blur(primitives: &mut String, input: &str, result: &str, radius_x: f64, radius_y: f64) {
    let radius = radius_x.max(radius_y);
    if radius <= 9.0 {
        let size = ((radius.round() as i64).max(0) * 2 + 1).max(1);
        let divisor = (size * size) as f64;
        let kernel = vec!["1".to_string(); (size * size) as usize].join(" ");
        let target = (size / 2).max(0);
        let _ = write!(
            primitives,
            r#"<feConvolveMatrix in="{input}" result="{result}" order="{size} {size}" divisor="{divisor}" targetX="{target}" targetY="{target}" edgeMode="duplicate" kernelMatrix="{kernel}"/>"#
        );
    } else {
        let sigma = radius / 3.0_f64.sqrt();
        let _ = write!(
            primitives,
            r#"<feGaussianBlur in="{input}" result="{result}" stdDeviation="{sigma:.4}"/>"#
        );
    }
}

fn average_gradient_color(gradient: &Gradient) -> Color {
    if gradient.stops.is_empty() {
        return Color::OPAQUE_BLACK;
    }
    let n = gradient.stops.len() as f64;
    let (mut r, mut g, mut b, mut a) = (0.0, 0.0, 0.0, 0.0);
    for stop in &gradient.stops {
        r += f64::from(stop.color.r);
        g += f64::from(stop.color.g);
        b += f64::from(stop.color.b);
        a += f64::from(stop.color.a);
    }
    Color {
        r: (r / n).round() as u8,
        g: (g / n).round() as u8,
        b: (b / n).round() as u8,
        a: (a / n).round() as u8,
    }
}

fn cap_attr(cap: CapStyle) -> &'static str {
    match cap {
        CapStyle::Round => "round",
        CapStyle::None => "butt",
        CapStyle::Square => "square",
    }
}

fn join_attr(join: JoinStyle) -> &'static str {
    match join {
        JoinStyle::Round => "round",
        JoinStyle::Bevel => "bevel",
        JoinStyle::Miter => "miter",
    }
}

/// Standard CSS `mix-blend-mode` keyword for a normalized blend-mode byte,
/// `None` for "normal".
fn blend_mode_css(mode: u8) -> Option<&'static str> {
    Some(match mode {
        2 => "multiply",
        3 => "screen",
        4 => "lighten",
        5 => "darken",
        6 => "difference",
        7 => "exclusion",
        8 => "overlay",
        9 => "hard-light",
        13 => "color-dodge",
        14 => "color-burn",
        _ => return None,
    })
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;").replace('"', "&quot;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Builds a path `d` attribute from a chain-ordered segment list, starting a
/// new `M` subpath whenever a segment's start doesn't continue the previous
/// one (a [`CompiledPath`] may concatenate several disjoint closed loops,
/// e.g. a shape with a hole).
fn build_path_d(segments: &[CompiledSegment]) -> String {
    let mut d = String::new();
    let mut cursor: Option<(Twips, Twips)> = None;
    for seg in segments {
        if cursor != Some(seg.from) {
            if cursor.is_some() {
                d.push_str("Z ");
            }
            let (x, y) = (seg.from.0.to_pixels(), seg.from.1.to_pixels());
            let _ = write!(d, "M{x:.3} {y:.3} ");
        }
        match seg.control {
            None => {
                let (x, y) = (seg.to.0.to_pixels(), seg.to.1.to_pixels());
                let _ = write!(d, "L{x:.3} {y:.3} ");
            }
            Some((cx, cy)) => {
                let (cx, cy) = (cx.to_pixels(), cy.to_pixels());
                let (x, y) = (seg.to.0.to_pixels(), seg.to.1.to_pixels());
                let _ = write!(d, "Q{cx:.3} {cy:.3} {x:.3} {y:.3} ");
            }
        }
        cursor = Some(seg.to);
    }
    if !segments.is_empty() {
        d.push('Z');
    }
    d.trim_end().to_string()
}

#[cfg(test)]
#[path = "../tests/unit/svg.rs"]
mod tests;
