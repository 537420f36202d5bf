//! Edge-stream → closed-path compilation (spec §4.4).
//!
//! [`ShapeCompiler::compile`] interprets a `ShapeRecord` stream into a list
//! of [`CompiledPath`]s, one per distinct fill or line style encountered,
//! each holding a chain-ordered segment list.

use std::collections::HashMap;

use crate::foundation::core::Twips;
use crate::foundation::math::Fnv1a64;
use crate::records::{FillStyle, Gradient, LineStyle, ShapeRecord};

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CompiledSegment {
    pub from: (Twips, Twips),
    pub to: (Twips, Twips),
    /// Present for a quadratic bezier; absent for a straight line.
    pub control: Option<(Twips, Twips)>,
}

impl CompiledSegment {
    fn reversed(&self) -> CompiledSegment {
        CompiledSegment {
            from: self.to,
            to: self.from,
            control: self.control,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CompiledPath {
    pub segments: Vec<CompiledSegment>,
    pub fill: Option<FillStyle>,
    pub line: Option<LineStyle>,
}

fn hash_gradient(h: &mut Fnv1a64, g: &Gradient) {
    h.write_u8(match g.spread {
        crate::records::SpreadMode::Pad => 0,
        crate::records::SpreadMode::Reflect => 1,
        crate::records::SpreadMode::Repeat => 2,
    });
    h.write_u8(match g.interpolation {
        crate::records::InterpolationMode::Normal => 0,
        crate::records::InterpolationMode::Linear => 1,
    });
    for stop in &g.stops {
        h.write_u8(stop.ratio);
        h.write_u8(stop.color.r);
        h.write_u8(stop.color.g);
        h.write_u8(stop.color.b);
        h.write_u8(stop.color.a);
    }
    if let Some(fp) = g.focal_point {
        h.write_bytes(&fp.to_le_bytes());
    }
}

fn hash_fill_style(style: &FillStyle) -> String {
    let mut h = Fnv1a64::new_default();
    match style {
        FillStyle::Solid(c) => {
            h.write_u8(0);
            h.write_u8(c.r);
            h.write_u8(c.g);
            h.write_u8(c.b);
            h.write_u8(c.a);
        }
        FillStyle::LinearGradient { matrix, gradient } => {
            h.write_u8(1);
            hash_matrix(&mut h, matrix);
            hash_gradient(&mut h, gradient);
        }
        FillStyle::RadialGradient { matrix, gradient } => {
            h.write_u8(2);
            hash_matrix(&mut h, matrix);
            hash_gradient(&mut h, gradient);
        }
        FillStyle::FocalRadialGradient { matrix, gradient } => {
            h.write_u8(3);
            hash_matrix(&mut h, matrix);
            hash_gradient(&mut h, gradient);
        }
        FillStyle::Bitmap {
            character_id,
            matrix,
            repeating,
            smoothed,
        } => {
            h.write_u8(4);
            h.write_bytes(&character_id.0.to_le_bytes());
            hash_matrix(&mut h, matrix);
            h.write_u8(*repeating as u8);
            h.write_u8(*smoothed as u8);
        }
    }
    format!("f:{:016x}", h.finish())
}

fn hash_matrix(h: &mut Fnv1a64, m: &crate::foundation::core::Matrix) {
    h.write_bytes(&m.scale_x.to_le_bytes());
    h.write_bytes(&m.scale_y.to_le_bytes());
    h.write_bytes(&m.skew_x.to_le_bytes());
    h.write_bytes(&m.skew_y.to_le_bytes());
    h.write_i32(m.translate_x.get());
    h.write_i32(m.translate_y.get());
}

fn hash_line_style(style: &LineStyle) -> String {
    let mut h = Fnv1a64::new_default();
    h.write_i32(style.width.get());
    if let Some(c) = style.color {
        h.write_u8(1);
        h.write_u8(c.r);
        h.write_u8(c.g);
        h.write_u8(c.b);
        h.write_u8(c.a);
    } else {
        h.write_u8(0);
    }
    if let Some(fill) = &style.fill {
        h.write_bytes(hash_fill_style(fill).as_bytes());
    }
    format!("l:{:016x}", h.finish())
}

#[derive(Clone)]
enum StyleRef {
    Fill(FillStyle),
    Line(LineStyle),
}

#[derive(Default, Clone, Copy)]
struct ActiveStyles {
    fill0: Option<u32>,
    fill1: Option<u32>,
    line: Option<u32>,
}

/// Converts a shape's edge-stream into style-grouped, chain-ordered paths.
pub struct ShapeCompiler {
    pen: (i32, i32),
    fill_styles: Vec<FillStyle>,
    line_styles: Vec<LineStyle>,
    active: ActiveStyles,
    accumulated: Vec<CompiledSegment>,
    open: HashMap<String, (StyleRef, Vec<CompiledSegment>)>,
    closed: Vec<(StyleRef, Vec<CompiledSegment>)>,
    finalized: Vec<CompiledPath>,
}

impl ShapeCompiler {
    pub fn compile(
        records: &[ShapeRecord],
        fill_styles: Vec<FillStyle>,
        line_styles: Vec<LineStyle>,
    ) -> Vec<CompiledPath> {
        let mut c = ShapeCompiler {
            pen: (0, 0),
            fill_styles,
            line_styles,
            active: ActiveStyles::default(),
            accumulated: Vec::new(),
            open: HashMap::new(),
            closed: Vec::new(),
            finalized: Vec::new(),
        };
        for record in records {
            c.apply(record);
        }
        c.finalized
    }

    fn apply(&mut self, record: &ShapeRecord) {
        match record {
            ShapeRecord::StyleChange {
                move_to,
                fill0,
                fill1,
                line,
                new_styles,
            } => {
                self.flush_edges();

                let full_reset = new_styles.is_some()
                    && move_to.is_some()
                    && fill0.is_some()
                    && fill1.is_some()
                    && line.is_some();

                if new_styles.is_some() {
                    self.close_all();
                }
                if full_reset {
                    self.finalize_closed();
                }

                if let Some(ns) = new_styles {
                    self.fill_styles = ns.fill_styles.clone();
                    self.line_styles = ns.line_styles.clone();
                    self.active = ActiveStyles::default();
                }
                if let Some(v) = fill0 {
                    self.active.fill0 = index_or_none(*v);
                }
                if let Some(v) = fill1 {
                    self.active.fill1 = index_or_none(*v);
                }
                if let Some(v) = line {
                    self.active.line = index_or_none(*v);
                }
                if let Some((x, y)) = move_to {
                    self.pen = (*x, *y);
                }
            }
            ShapeRecord::StraightEdge { dx, dy } => {
                let from = self.pen;
                self.pen = (self.pen.0 + dx, self.pen.1 + dy);
                self.accumulated.push(CompiledSegment {
                    from: (Twips(from.0), Twips(from.1)),
                    to: (Twips(self.pen.0), Twips(self.pen.1)),
                    control: None,
                });
            }
            ShapeRecord::CurvedEdge {
                control_dx,
                control_dy,
                anchor_dx,
                anchor_dy,
            } => {
                let from = self.pen;
                let control = (self.pen.0 + control_dx, self.pen.1 + control_dy);
                let to = (control.0 + anchor_dx, control.1 + anchor_dy);
                self.pen = to;
                self.accumulated.push(CompiledSegment {
                    from: (Twips(from.0), Twips(from.1)),
                    to: (Twips(to.0), Twips(to.1)),
                    control: Some((Twips(control.0), Twips(control.1))),
                });
            }
            ShapeRecord::End => {
                self.flush_edges();
                self.close_all();
                self.finalize_closed();
            }
        }
    }

    fn flush_edges(&mut self) {
        if self.accumulated.is_empty() {
            return;
        }
        let edges = std::mem::take(&mut self.accumulated);

        if let Some(idx) = self.active.fill0 {
            if let Some(style) = self.fill_styles.get(idx as usize) {
                let key = hash_fill_style(style);
                let reversed: Vec<_> = edges.iter().rev().map(CompiledSegment::reversed).collect();
                self.open
                    .entry(key)
                    .or_insert_with(|| (StyleRef::Fill(style.clone()), Vec::new()))
                    .1
                    .extend(reversed);
            }
        }
        if let Some(idx) = self.active.fill1 {
            if let Some(style) = self.fill_styles.get(idx as usize) {
                let key = hash_fill_style(style);
                self.open
                    .entry(key)
                    .or_insert_with(|| (StyleRef::Fill(style.clone()), Vec::new()))
                    .1
                    .extend(edges.iter().copied());
            }
        }
        if let Some(idx) = self.active.line {
            if let Some(style) = self.line_styles.get(idx as usize) {
                let key = hash_line_style(style);
                self.open
                    .entry(key)
                    .or_insert_with(|| (StyleRef::Line(style.clone()), Vec::new()))
                    .1
                    .extend(edges.iter().copied());
            }
        }
    }

    fn close_all(&mut self) {
        for (_key, entry) in self.open.drain() {
            self.closed.push(entry);
        }
    }

    fn finalize_closed(&mut self) {
        let closed = std::mem::take(&mut self.closed);
        let mut fills = Vec::new();
        let mut lines = Vec::new();
        for (style_ref, segments) in closed {
            let segments = chain_segments(segments);
            match style_ref {
                StyleRef::Fill(fill) => fills.push(CompiledPath {
                    segments,
                    fill: Some(fill),
                    line: None,
                }),
                StyleRef::Line(line) => lines.push(CompiledPath {
                    segments,
                    fill: None,
                    line: Some(line),
                }),
            }
        }
        self.finalized.extend(fills);
        self.finalized.extend(lines);
    }
}

fn index_or_none(raw: u32) -> Option<u32> {
    if raw == 0 {
        None
    } else {
        Some(raw - 1)
    }
}

/// Reorders segments so consecutive endpoints match, chaining regardless of
/// input order (spec §4.4). Shared with the morph compiler, which performs
/// the same chaining pass over blended geometry.
pub(crate) fn chain_segments_pub(segments: Vec<CompiledSegment>) -> Vec<CompiledSegment> {
    chain_segments(segments)
}

fn chain_segments(mut remaining: Vec<CompiledSegment>) -> Vec<CompiledSegment> {
    let mut ordered = Vec::with_capacity(remaining.len());
    while !remaining.is_empty() {
        let mut chain = vec![remaining.remove(0)];
        loop {
            let tail = chain.last().unwrap().to;
            if let Some(idx) = remaining.iter().position(|s| s.from == tail) {
                chain.push(remaining.remove(idx));
                continue;
            }
            if let Some(idx) = remaining.iter().position(|s| s.to == tail) {
                chain.push(remaining.remove(idx).reversed());
                continue;
            }
            break;
        }
        ordered.extend(chain);
    }
    ordered
}

#[cfg(test)]
#[path = "../tests/unit/shapes.rs"]
mod tests;
