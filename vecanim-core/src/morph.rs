//! Start/end edge-stream interpolation (spec §4.5).
//!
//! [`MorphCompiler::compile`] pairs a morph shape's start and end edge
//! streams and blends geometry and styles at a ratio in `[0, 1]`, producing
//! the same [`CompiledPath`] shape the non-morph compiler yields so the SVG
//! emitter can treat both uniformly.

use std::collections::HashMap;

use crate::foundation::core::{validate_ratio, Color, Matrix, Twips};
use crate::foundation::error::VecanimResult;
use crate::records::{
    CapStyle, FillStyle, Gradient, GradientStop, InterpolationMode, JoinStyle, LineStyle,
    MorphFillStyle, MorphLineStyle, ShapeRecord, SpreadMode,
};
use crate::shapes::{CompiledPath, CompiledSegment};

fn lerp_i32(a: i32, b: i32, t: f64) -> i32 {
    (a as f64 + (b as f64 - a as f64) * t).round() as i32
}

fn lerp_point(a: (i32, i32), b: (i32, i32), t: f64) -> (Twips, Twips) {
    (Twips(lerp_i32(a.0, b.0, t)), Twips(lerp_i32(a.1, b.1, t)))
}

fn lerp_u8(a: u8, b: u8, t: f64) -> u8 {
    (a as f64 + (b as f64 - a as f64) * t).round().clamp(0.0, 255.0) as u8
}

fn lerp_color(a: Color, b: Color, t: f64) -> Color {
    Color {
        r: lerp_u8(a.r, b.r, t),
        g: lerp_u8(a.g, b.g, t),
        b: lerp_u8(a.b, b.b, t),
        a: lerp_u8(a.a, b.a, t),
    }
}

fn lerp_matrix(a: Matrix, b: Matrix, t: f64) -> Matrix {
    Matrix::lerp(a, b, t)
}

fn lerp_gradient(start: &[GradientStop], end: &[GradientStop], t: f64) -> Gradient {
    let stops = start
        .iter()
        .zip(end.iter())
        .map(|(s, e)| GradientStop {
            ratio: lerp_u8(s.ratio, e.ratio, t),
            color: lerp_color(s.color, e.color, t),
        })
        .collect();
    Gradient {
        spread: SpreadMode::Pad,
        interpolation: InterpolationMode::Normal,
        stops,
        focal_point: None,
    }
}

fn blend_fill(style: &MorphFillStyle, t: f64) -> FillStyle {
    match style {
        MorphFillStyle::Solid { start, end } => FillStyle::Solid(lerp_color(*start, *end, t)),
        MorphFillStyle::LinearGradient {
            start_matrix,
            end_matrix,
            stops,
        } => FillStyle::LinearGradient {
            matrix: lerp_matrix(*start_matrix, *end_matrix, t),
            gradient: lerp_gradient_pairs(stops, t),
        },
        MorphFillStyle::RadialGradient {
            start_matrix,
            end_matrix,
            stops,
        } => FillStyle::RadialGradient {
            matrix: lerp_matrix(*start_matrix, *end_matrix, t),
            gradient: lerp_gradient_pairs(stops, t),
        },
        MorphFillStyle::Bitmap {
            character_id,
            start_matrix,
            end_matrix,
            repeating,
            smoothed,
        } => FillStyle::Bitmap {
            character_id: *character_id,
            matrix: lerp_matrix(*start_matrix, *end_matrix, t),
            repeating: *repeating,
            smoothed: *smoothed,
        },
    }
}

fn lerp_gradient_pairs(pairs: &[(GradientStop, GradientStop)], t: f64) -> Gradient {
    let stops = pairs
        .iter()
        .map(|(s, e)| GradientStop {
            ratio: lerp_u8(s.ratio, e.ratio, t),
            color: lerp_color(s.color, e.color, t),
        })
        .collect();
    Gradient {
        spread: SpreadMode::Pad,
        interpolation: InterpolationMode::Normal,
        stops,
        focal_point: None,
    }
}

fn blend_line(style: &MorphLineStyle, t: f64) -> LineStyle {
    LineStyle {
        width: Twips(lerp_i32(style.start_width.get(), style.end_width.get(), t)),
        color: Some(lerp_color(style.start_color, style.end_color, t)),
        fill: None,
        start_cap: CapStyle::Round,
        end_cap: CapStyle::Round,
        join: JoinStyle::Round,
        miter_limit: None,
        no_h_scale: false,
        no_v_scale: false,
        pixel_hinting: false,
        no_close: false,
    }
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

fn index_or_none(raw: u32) -> Option<u32> {
    if raw == 0 {
        None
    } else {
        Some(raw - 1)
    }
}

/// Interpolates a morph shape's paired edge streams at `ratio`.
pub struct MorphCompiler;

impl MorphCompiler {
    pub fn compile(
        start_records: &[ShapeRecord],
        end_records: &[ShapeRecord],
        fill_styles: &[MorphFillStyle],
        line_styles: &[MorphLineStyle],
        ratio: f64,
    ) -> VecanimResult<Vec<CompiledPath>> {
        let ratio = validate_ratio(ratio)?;
        let blended_fills: Vec<FillStyle> = fill_styles.iter().map(|f| blend_fill(f, ratio)).collect();
        let blended_lines: Vec<LineStyle> = line_styles.iter().map(|l| blend_line(l, ratio)).collect();

        let mut state = State {
            start_pen: (0, 0),
            end_pen: (0, 0),
            active: ActiveStyles::default(),
            accumulated: Vec::new(),
            open: HashMap::new(),
            closed: Vec::new(),
            finalized: Vec::new(),
            fill_styles: blended_fills,
            line_styles: blended_lines,
        };

        // The end stream may carry StyleChange-with-move records that have
        // no start-side counterpart; skip past them when pairing with a
        // non-style-change start record (spec §4.5).
        let mut end_idx = 0usize;
        for start_rec in start_records {
            if !matches!(start_rec, ShapeRecord::StyleChange { .. }) {
                while matches!(
                    end_records.get(end_idx),
                    Some(ShapeRecord::StyleChange { move_to: Some(_), .. })
                ) {
                    end_idx += 1;
                }
            }
            let end_rec = end_records.get(end_idx).cloned().unwrap_or(ShapeRecord::End);
            end_idx += 1;
            state.apply_pair(start_rec, &end_rec, ratio);
        }

        Ok(state.finalized)
    }
}

struct State {
    start_pen: (i32, i32),
    end_pen: (i32, i32),
    active: ActiveStyles,
    accumulated: Vec<CompiledSegment>,
    open: HashMap<String, (StyleRef, Vec<CompiledSegment>)>,
    closed: Vec<(StyleRef, Vec<CompiledSegment>)>,
    finalized: Vec<CompiledPath>,
    fill_styles: Vec<FillStyle>,
    line_styles: Vec<LineStyle>,
}

impl State {
    fn apply_pair(&mut self, start: &ShapeRecord, end: &ShapeRecord, ratio: f64) {
        match start {
            ShapeRecord::StyleChange {
                move_to,
                fill0,
                fill1,
                line,
                ..
            } => {
                self.flush();
                if let Some(v) = fill0 {
                    self.active.fill0 = index_or_none(*v);
                }
                if let Some(v) = fill1 {
                    self.active.fill1 = index_or_none(*v);
                }
                if let Some(v) = line {
                    self.active.line = index_or_none(*v);
                }
                let end_move = if let ShapeRecord::StyleChange { move_to: Some(m), .. } = end {
                    Some(*m)
                } else {
                    None
                };
                if let Some((x, y)) = move_to {
                    self.start_pen = (*x, *y);
                    self.end_pen = end_move.unwrap_or((*x, *y));
                }
            }
            ShapeRecord::StraightEdge { dx, dy } => {
                let sfrom = self.start_pen;
                let sto = (sfrom.0 + dx, sfrom.1 + dy);
                self.start_pen = sto;
                match end {
                    ShapeRecord::StraightEdge { dx: edx, dy: edy } => {
                        let efrom = self.end_pen;
                        let eto = (efrom.0 + edx, efrom.1 + edy);
                        self.end_pen = eto;
                        self.push_segment(CompiledSegment {
                            from: lerp_point(sfrom, efrom, ratio),
                            to: lerp_point(sto, eto, ratio),
                            control: None,
                        });
                    }
                    ShapeRecord::CurvedEdge {
                        control_dx,
                        control_dy,
                        anchor_dx,
                        anchor_dy,
                    } => {
                        let efrom = self.end_pen;
                        let econtrol = (efrom.0 + control_dx, efrom.1 + control_dy);
                        let eto = (econtrol.0 + anchor_dx, econtrol.1 + anchor_dy);
                        self.end_pen = eto;
                        let smid = ((sfrom.0 + sto.0) / 2, (sfrom.1 + sto.1) / 2);
                        self.push_segment(CompiledSegment {
                            from: lerp_point(sfrom, efrom, ratio),
                            to: lerp_point(sto, eto, ratio),
                            control: Some(lerp_point(smid, econtrol, ratio)),
                        });
                    }
                    _ => {}
                }
            }
            ShapeRecord::CurvedEdge {
                control_dx,
                control_dy,
                anchor_dx,
                anchor_dy,
            } => {
                let sfrom = self.start_pen;
                let scontrol = (sfrom.0 + control_dx, sfrom.1 + control_dy);
                let sto = (scontrol.0 + anchor_dx, scontrol.1 + anchor_dy);
                self.start_pen = sto;
                match end {
                    ShapeRecord::StraightEdge { dx, dy } => {
                        let efrom = self.end_pen;
                        let eto = (efrom.0 + dx, efrom.1 + dy);
                        self.end_pen = eto;
                        let emid = ((efrom.0 + eto.0) / 2, (efrom.1 + eto.1) / 2);
                        self.push_segment(CompiledSegment {
                            from: lerp_point(sfrom, efrom, ratio),
                            to: lerp_point(sto, eto, ratio),
                            control: Some(lerp_point(scontrol, emid, ratio)),
                        });
                    }
                    ShapeRecord::CurvedEdge {
                        control_dx: ecdx,
                        control_dy: ecdy,
                        anchor_dx: eadx,
                        anchor_dy: eady,
                    } => {
                        let efrom = self.end_pen;
                        let econtrol = (efrom.0 + ecdx, efrom.1 + ecdy);
                        let eto = (econtrol.0 + eadx, econtrol.1 + eady);
                        self.end_pen = eto;
                        self.push_segment(CompiledSegment {
                            from: lerp_point(sfrom, efrom, ratio),
                            to: lerp_point(sto, eto, ratio),
                            control: Some(lerp_point(scontrol, econtrol, ratio)),
                        });
                    }
                    _ => {}
                }
            }
            ShapeRecord::End => {
                self.flush();
                self.close_all();
                self.finalize();
            }
        }
    }

    fn push_segment(&mut self, seg: CompiledSegment) {
        self.accumulated.push(seg);
    }

    fn flush(&mut self) {
        if self.accumulated.is_empty() {
            return;
        }
        let edges = std::mem::take(&mut self.accumulated);
        if let Some(idx) = self.active.fill0 {
            if let Some(style) = self.fill_styles.get(idx as usize) {
                let reversed: Vec<_> = edges.iter().rev().map(reversed_segment).collect();
                self.open
                    .entry(format!("f0:{idx}"))
                    .or_insert_with(|| (StyleRef::Fill(style.clone()), Vec::new()))
                    .1
                    .extend(reversed);
            }
        }
        if let Some(idx) = self.active.fill1 {
            if let Some(style) = self.fill_styles.get(idx as usize) {
                self.open
                    .entry(format!("f1:{idx}"))
                    .or_insert_with(|| (StyleRef::Fill(style.clone()), Vec::new()))
                    .1
                    .extend(edges.iter().copied());
            }
        }
        if let Some(idx) = self.active.line {
            if let Some(style) = self.line_styles.get(idx as usize) {
                self.open
                    .entry(format!("l:{idx}"))
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

    fn finalize(&mut self) {
        let closed = std::mem::take(&mut self.closed);
        let mut fills = Vec::new();
        let mut lines = Vec::new();
        for (style_ref, segments) in closed {
            let segments = crate::shapes::chain_segments_pub(segments);
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

fn reversed_segment(seg: &CompiledSegment) -> CompiledSegment {
    CompiledSegment {
        from: seg.to,
        to: seg.from,
        control: seg.control,
    }
}

#[cfg(test)]
#[path = "../tests/unit/morph.rs"]
mod tests;
