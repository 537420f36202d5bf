//! Typed record decoders (spec §4.3): pure functions over a [`BitReader`]
//! that each produce one record variant. Structural headers are decoded in
//! strict mode; most record bodies run forgiving so one bad record does not
//! abort the whole definition.

use crate::bitreader::BitReader;
use crate::foundation::core::{CharacterId, Color, ColorTransform, Matrix, Rectangle, Twips};
use crate::foundation::error::VecanimResult;

/// Bit-packed rectangle record: a 5-bit field width followed by four signed
/// fields of that width, byte-aligned on exit.
pub fn read_rectangle(r: &mut BitReader) -> VecanimResult<Rectangle> {
    let width = r.read_ubits(5)?;
    let x_min = r.read_sbits(width)?;
    let x_max = r.read_sbits(width)?;
    let y_min = r.read_sbits(width)?;
    let y_max = r.read_sbits(width)?;
    r.byte_align();
    Ok(Rectangle {
        x_min,
        x_max,
        y_min,
        y_max,
    })
}

/// Matrix record: independently optional scale and translate/skew pairs,
/// each preceded by its own 5-bit field width (spec §4.3).
pub fn read_matrix(r: &mut BitReader) -> VecanimResult<Matrix> {
    let mut m = Matrix::IDENTITY;

    if r.read_bit()? {
        let width = r.read_ubits(5)?;
        m.scale_x = r.read_fbits(width)?;
        m.scale_y = r.read_fbits(width)?;
    }
    if r.read_bit()? {
        let width = r.read_ubits(5)?;
        m.skew_x = r.read_fbits(width)?;
        m.skew_y = r.read_fbits(width)?;
    }
    let translate_width = r.read_ubits(5)?;
    m.translate_x = Twips(r.read_sbits(translate_width)?);
    m.translate_y = Twips(r.read_sbits(translate_width)?);
    r.byte_align();
    Ok(m)
}

/// Straight color record: no alpha lane (older shape profiles).
pub fn read_color_rgb(r: &mut BitReader) -> VecanimResult<Color> {
    let rr = r.read_u8()?;
    let g = r.read_u8()?;
    let b = r.read_u8()?;
    Ok(Color::rgb(rr, g, b))
}

/// Color record with an explicit alpha channel.
pub fn read_color_rgba(r: &mut BitReader) -> VecanimResult<Color> {
    let rr = r.read_u8()?;
    let g = r.read_u8()?;
    let b = r.read_u8()?;
    let a = r.read_u8()?;
    Ok(Color::rgba(rr, g, b, a))
}

/// ColorTransform record: two has-flags plus a shared field width; missing
/// multiplier defaults to 256, missing additive defaults to 0 (spec §4.3).
pub fn read_color_transform(r: &mut BitReader, with_alpha: bool) -> VecanimResult<ColorTransform> {
    let has_add = r.read_bit()?;
    let has_mult = r.read_bit()?;
    let width = r.read_ubits(4)?;

    let mut mult = [256; 4];
    if has_mult {
        mult[0] = r.read_sbits(width)?;
        mult[1] = r.read_sbits(width)?;
        mult[2] = r.read_sbits(width)?;
        if with_alpha {
            mult[3] = r.read_sbits(width)?;
        }
    }
    let mut add = [0; 4];
    if has_add {
        add[0] = r.read_sbits(width)?;
        add[1] = r.read_sbits(width)?;
        add[2] = r.read_sbits(width)?;
        if with_alpha {
            add[3] = r.read_sbits(width)?;
        }
    }
    r.byte_align();
    Ok(ColorTransform { mult, add })
}

/// Gradient spread behavior beyond the last stop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SpreadMode {
    Pad,
    Reflect,
    Repeat,
}

/// Stop-color interpolation space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum InterpolationMode {
    Normal,
    Linear,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GradientStop {
    pub ratio: u8,
    pub color: Color,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Gradient {
    pub spread: SpreadMode,
    pub interpolation: InterpolationMode,
    pub stops: Vec<GradientStop>,
    /// Present only for the focal-radial variant.
    pub focal_point: Option<f64>,
}

fn read_gradient(r: &mut BitReader, with_alpha: bool, focal: bool) -> VecanimResult<Gradient> {
    let spread = match r.read_ubits(2)? {
        1 => SpreadMode::Reflect,
        2 => SpreadMode::Repeat,
        _ => SpreadMode::Pad,
    };
    let interpolation = if r.read_ubits(2)? == 1 {
        InterpolationMode::Linear
    } else {
        InterpolationMode::Normal
    };
    let count = r.read_ubits(4)? as usize;
    let mut stops = Vec::with_capacity(count);
    for _ in 0..count {
        let ratio = r.read_u8()?;
        let color = if with_alpha {
            read_color_rgba(r)?
        } else {
            read_color_rgb(r)?
        };
        stops.push(GradientStop { ratio, color });
    }
    let focal_point = if focal {
        Some(r.read_fixed8_8()?)
    } else {
        None
    };
    Ok(Gradient {
        spread,
        interpolation,
        stops,
        focal_point,
    })
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum FillStyle {
    Solid(Color),
    LinearGradient { matrix: Matrix, gradient: Gradient },
    RadialGradient { matrix: Matrix, gradient: Gradient },
    FocalRadialGradient { matrix: Matrix, gradient: Gradient },
    Bitmap {
        character_id: CharacterId,
        matrix: Matrix,
        repeating: bool,
        smoothed: bool,
    },
}

/// Reads one fill style; `with_alpha` selects the color/gradient profile
/// (newer profile carries alpha throughout, older does not).
pub fn read_fill_style(r: &mut BitReader, with_alpha: bool) -> VecanimResult<FillStyle> {
    let kind = r.read_u8()?;
    Ok(match kind {
        0x00 => {
            let color = if with_alpha {
                read_color_rgba(r)?
            } else {
                read_color_rgb(r)?
            };
            FillStyle::Solid(color)
        }
        0x10 => FillStyle::LinearGradient {
            matrix: read_matrix(r)?,
            gradient: read_gradient(r, with_alpha, false)?,
        },
        0x12 => FillStyle::RadialGradient {
            matrix: read_matrix(r)?,
            gradient: read_gradient(r, with_alpha, false)?,
        },
        0x13 => FillStyle::FocalRadialGradient {
            matrix: read_matrix(r)?,
            gradient: read_gradient(r, with_alpha, true)?,
        },
        0x40 | 0x41 | 0x42 | 0x43 => {
            let character_id = CharacterId(r.read_u16_le()?);
            let matrix = read_matrix(r)?;
            FillStyle::Bitmap {
                character_id,
                matrix,
                repeating: kind == 0x40 || kind == 0x42,
                smoothed: kind == 0x40 || kind == 0x41,
            }
        }
        _ => FillStyle::Solid(Color::OPAQUE_BLACK),
    })
}

/// Reads a fill style array: a count byte, `0xFF` meaning "read a 16-bit
/// count next" (spec §4.3).
pub fn read_fill_style_array(r: &mut BitReader, with_alpha: bool) -> VecanimResult<Vec<FillStyle>> {
    let mut count = r.read_u8()? as usize;
    if count == 0xFF {
        count = r.read_u16_le()? as usize;
    }
    (0..count).map(|_| read_fill_style(r, with_alpha)).collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CapStyle {
    Round,
    None,
    Square,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum JoinStyle {
    Round,
    Bevel,
    Miter,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LineStyle {
    pub width: Twips,
    pub color: Option<Color>,
    pub fill: Option<FillStyle>,
    pub start_cap: CapStyle,
    pub end_cap: CapStyle,
    pub join: JoinStyle,
    pub miter_limit: Option<f64>,
    pub no_h_scale: bool,
    pub no_v_scale: bool,
    pub pixel_hinting: bool,
    pub no_close: bool,
}

/// Simple two-field line style (older profile): width + straight color.
pub fn read_line_style_simple(r: &mut BitReader, with_alpha: bool) -> VecanimResult<LineStyle> {
    let width = Twips(r.read_u16_le()? as i32);
    let color = if with_alpha {
        read_color_rgba(r)?
    } else {
        read_color_rgb(r)?
    };
    Ok(LineStyle {
        width,
        color: Some(color),
        fill: None,
        start_cap: CapStyle::Round,
        end_cap: CapStyle::Round,
        join: JoinStyle::Round,
        miter_limit: None,
        no_h_scale: false,
        no_v_scale: false,
        pixel_hinting: false,
        no_close: false,
    })
}

fn cap_style(bits: u32) -> CapStyle {
    match bits {
        1 => CapStyle::None,
        2 => CapStyle::Square,
        _ => CapStyle::Round,
    }
}

fn join_style(bits: u32) -> JoinStyle {
    match bits {
        1 => JoinStyle::Bevel,
        2 => JoinStyle::Miter,
        _ => JoinStyle::Round,
    }
}

/// Extended line style: cap/join bit-packed, optional miter limit, and may
/// carry a fill style instead of a flat color (spec §4.3).
pub fn read_line_style_extended(r: &mut BitReader) -> VecanimResult<LineStyle> {
    let width = Twips(r.read_u16_le()? as i32);
    let start_cap = cap_style(r.read_ubits(2)?);
    let join = join_style(r.read_ubits(2)?);
    let has_fill = r.read_bit()?;
    let no_h_scale = r.read_bit()?;
    let no_v_scale = r.read_bit()?;
    let pixel_hinting = r.read_bit()?;
    let _reserved = r.read_ubits(5)?;
    let no_close = r.read_bit()?;
    let end_cap = cap_style(r.read_ubits(2)?);

    let miter_limit = if join == JoinStyle::Miter {
        Some(r.read_fixed8_8()?)
    } else {
        None
    };

    let (color, fill) = if has_fill {
        (None, Some(read_fill_style(r, true)?))
    } else {
        (Some(read_color_rgba(r)?), None)
    };

    Ok(LineStyle {
        width,
        color,
        fill,
        start_cap,
        end_cap,
        join,
        miter_limit,
        no_h_scale,
        no_v_scale,
        pixel_hinting,
        no_close,
    })
}

pub fn read_line_style_array(
    r: &mut BitReader,
    extended: bool,
    with_alpha: bool,
) -> VecanimResult<Vec<LineStyle>> {
    let mut count = r.read_u8()? as usize;
    if count == 0xFF {
        count = r.read_u16_le()? as usize;
    }
    (0..count)
        .map(|_| {
            if extended {
                read_line_style_extended(r)
            } else {
                read_line_style_simple(r, with_alpha)
            }
        })
        .collect()
}

/// A new style palette installed by a full-reset `StyleChange`, plus the
/// fill/line index widths that follow it (spec §4.3: "new styles" resets
/// the current fill- and line-bit widths).
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NewStyles {
    pub fill_styles: Vec<FillStyle>,
    pub line_styles: Vec<LineStyle>,
    pub fill_bits: u32,
    pub line_bits: u32,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ShapeRecord {
    StyleChange {
        move_to: Option<(i32, i32)>,
        fill0: Option<u32>,
        fill1: Option<u32>,
        line: Option<u32>,
        new_styles: Option<NewStyles>,
    },
    StraightEdge {
        dx: i32,
        dy: i32,
    },
    CurvedEdge {
        control_dx: i32,
        control_dy: i32,
        anchor_dx: i32,
        anchor_dy: i32,
    },
    End,
}

/// Reads one shape record, mutating the caller's current fill/line index
/// bit widths when a full-reset `StyleChange` installs a new palette (spec
/// §4.3). `shape_version` selects line-style profile and color alpha.
pub fn read_shape_record(
    r: &mut BitReader,
    fill_bits: &mut u32,
    line_bits: &mut u32,
    extended_line_style: bool,
    with_alpha: bool,
) -> VecanimResult<ShapeRecord> {
    let is_edge = r.read_bit()?;
    if is_edge {
        let is_straight = r.read_bit()?;
        let num_bits = r.read_ubits(4)? + 2;
        if is_straight {
            let general_line = r.read_bit()?;
            let (dx, dy) = if general_line {
                (r.read_sbits(num_bits)?, r.read_sbits(num_bits)?)
            } else {
                let is_vertical = r.read_bit()?;
                let delta = r.read_sbits(num_bits)?;
                if is_vertical {
                    (0, delta)
                } else {
                    (delta, 0)
                }
            };
            Ok(ShapeRecord::StraightEdge { dx, dy })
        } else {
            let control_dx = r.read_sbits(num_bits)?;
            let control_dy = r.read_sbits(num_bits)?;
            let anchor_dx = r.read_sbits(num_bits)?;
            let anchor_dy = r.read_sbits(num_bits)?;
            Ok(ShapeRecord::CurvedEdge {
                control_dx,
                control_dy,
                anchor_dx,
                anchor_dy,
            })
        }
    } else {
        let new_styles_flag = r.read_bit()?;
        let line_flag = r.read_bit()?;
        let fill1_flag = r.read_bit()?;
        let fill0_flag = r.read_bit()?;
        let move_flag = r.read_bit()?;

        if !(new_styles_flag || line_flag || fill1_flag || fill0_flag || move_flag) {
            return Ok(ShapeRecord::End);
        }

        let move_to = if move_flag {
            let bits = r.read_ubits(5)?;
            let x = r.read_sbits(bits)?;
            let y = r.read_sbits(bits)?;
            Some((x, y))
        } else {
            None
        };
        let fill0 = if fill0_flag {
            Some(r.read_ubits(*fill_bits)?)
        } else {
            None
        };
        let fill1 = if fill1_flag {
            Some(r.read_ubits(*fill_bits)?)
        } else {
            None
        };
        let line = if line_flag {
            Some(r.read_ubits(*line_bits)?)
        } else {
            None
        };

        let new_styles = if new_styles_flag {
            let fill_styles = read_fill_style_array(r, with_alpha)?;
            let line_styles = read_line_style_array(r, extended_line_style, with_alpha)?;
            let new_fill_bits = r.read_ubits(4)?;
            let new_line_bits = r.read_ubits(4)?;
            *fill_bits = new_fill_bits;
            *line_bits = new_line_bits;
            Some(NewStyles {
                fill_styles,
                line_styles,
                fill_bits: new_fill_bits,
                line_bits: new_line_bits,
            })
        } else {
            None
        };

        Ok(ShapeRecord::StyleChange {
            move_to,
            fill0,
            fill1,
            line,
            new_styles,
        })
    }
}

/// A filter applied to a placed object (spec §4.3: 8 types, typed fields
/// only — conversion to SVG primitives is the emitter's job).
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Filter {
    DropShadow {
        color: Color,
        blur_x: f64,
        blur_y: f64,
        angle: f64,
        distance: f64,
        strength: f64,
        inner: bool,
        knockout: bool,
        passes: u8,
    },
    Blur {
        blur_x: f64,
        blur_y: f64,
        passes: u8,
    },
    Glow {
        color: Color,
        blur_x: f64,
        blur_y: f64,
        strength: f64,
        inner: bool,
        knockout: bool,
        passes: u8,
    },
    Bevel {
        shadow_color: Color,
        highlight_color: Color,
        blur_x: f64,
        blur_y: f64,
        angle: f64,
        distance: f64,
        strength: f64,
        inner: bool,
        knockout: bool,
        on_top: bool,
        passes: u8,
    },
    GradientGlow {
        gradient: Gradient,
        blur_x: f64,
        blur_y: f64,
        angle: f64,
        distance: f64,
        strength: f64,
        inner: bool,
        knockout: bool,
        on_top: bool,
        passes: u8,
    },
    Convolution {
        matrix_x: u8,
        matrix_y: u8,
        divisor: f32,
        bias: f32,
        matrix: Vec<f32>,
        default_color: Color,
        clamp: bool,
        preserve_alpha: bool,
    },
    ColorMatrix {
        matrix: [f64; 20],
    },
    GradientBevel {
        gradient: Gradient,
        blur_x: f64,
        blur_y: f64,
        angle: f64,
        distance: f64,
        strength: f64,
        inner: bool,
        knockout: bool,
        on_top: bool,
        passes: u8,
    },
}

fn read_glow_flags(r: &mut BitReader) -> VecanimResult<(bool, bool, bool, u8)> {
    let inner = r.read_bit()?;
    let knockout = r.read_bit()?;
    let _composite = r.read_bit()?;
    let on_top = r.read_bit()?;
    let passes = r.read_ubits(4)? as u8;
    Ok((inner, knockout, on_top, passes))
}

pub fn read_filter(r: &mut BitReader) -> VecanimResult<Filter> {
    let kind = r.read_u8()?;
    Ok(match kind {
        0 => {
            let color = read_color_rgba(r)?;
            let blur_x = r.read_fixed16_16()?;
            let blur_y = r.read_fixed16_16()?;
            let angle = r.read_fixed16_16()?;
            let distance = r.read_fixed16_16()?;
            let strength = r.read_fixed8_8()?;
            let (inner, knockout, _, passes) = read_glow_flags(r)?;
            Filter::DropShadow {
                color,
                blur_x,
                blur_y,
                angle,
                distance,
                strength,
                inner,
                knockout,
                passes,
            }
        }
        1 => {
            let blur_x = r.read_fixed16_16()?;
            let blur_y = r.read_fixed16_16()?;
            let passes = r.read_ubits(5)? as u8;
            let _reserved = r.read_ubits(3)?;
            Filter::Blur {
                blur_x,
                blur_y,
                passes,
            }
        }
        2 => {
            let color = read_color_rgba(r)?;
            let blur_x = r.read_fixed16_16()?;
            let blur_y = r.read_fixed16_16()?;
            let strength = r.read_fixed8_8()?;
            let (inner, knockout, _, passes) = read_glow_flags(r)?;
            Filter::Glow {
                color,
                blur_x,
                blur_y,
                strength,
                inner,
                knockout,
                passes,
            }
        }
        3 => {
            let shadow_color = read_color_rgba(r)?;
            let highlight_color = read_color_rgba(r)?;
            let blur_x = r.read_fixed16_16()?;
            let blur_y = r.read_fixed16_16()?;
            let angle = r.read_fixed16_16()?;
            let distance = r.read_fixed16_16()?;
            let strength = r.read_fixed8_8()?;
            let (inner, knockout, on_top, passes) = read_glow_flags(r)?;
            Filter::Bevel {
                shadow_color,
                highlight_color,
                blur_x,
                blur_y,
                angle,
                distance,
                strength,
                inner,
                knockout,
                on_top,
                passes,
            }
        }
        4 => {
            let count = r.read_u8()? as usize;
            let gradient = read_gradient_with_count(r, count)?;
            let blur_x = r.read_fixed16_16()?;
            let blur_y = r.read_fixed16_16()?;
            let angle = r.read_fixed16_16()?;
            let distance = r.read_fixed16_16()?;
            let strength = r.read_fixed8_8()?;
            let (inner, knockout, on_top, passes) = read_glow_flags(r)?;
            Filter::GradientGlow {
                gradient,
                blur_x,
                blur_y,
                angle,
                distance,
                strength,
                inner,
                knockout,
                on_top,
                passes,
            }
        }
        5 => {
            let matrix_x = r.read_u8()?;
            let matrix_y = r.read_u8()?;
            let divisor = r.read_f32()?;
            let bias = r.read_f32()?;
            let n = matrix_x as usize * matrix_y as usize;
            let mut matrix = Vec::with_capacity(n);
            for _ in 0..n {
                matrix.push(r.read_f32()?);
            }
            let default_color = read_color_rgba(r)?;
            let _reserved = r.read_ubits(6)?;
            let clamp = r.read_bit()?;
            let preserve_alpha = r.read_bit()?;
            Filter::Convolution {
                matrix_x,
                matrix_y,
                divisor,
                bias,
                matrix,
                default_color,
                clamp,
                preserve_alpha,
            }
        }
        6 => {
            let mut matrix = [0.0; 20];
            for (i, slot) in matrix.iter_mut().enumerate() {
                let raw = f64::from(r.read_f32()?);
                // Only the five offset columns (indices 4, 9, 14, 19) are in
                // 0..255 range on the wire; the multiplicative columns are
                // already unit-scaled.
                *slot = if i % 5 == 4 { raw / 255.0 } else { raw };
            }
            Filter::ColorMatrix { matrix }
        }
        7 => {
            let count = r.read_u8()? as usize;
            let gradient = read_gradient_with_count(r, count)?;
            let blur_x = r.read_fixed16_16()?;
            let blur_y = r.read_fixed16_16()?;
            let angle = r.read_fixed16_16()?;
            let distance = r.read_fixed16_16()?;
            let strength = r.read_fixed8_8()?;
            let (inner, knockout, on_top, passes) = read_glow_flags(r)?;
            Filter::GradientBevel {
                gradient,
                blur_x,
                blur_y,
                angle,
                distance,
                strength,
                inner,
                knockout,
                on_top,
                passes,
            }
        }
        _ => Filter::ColorMatrix { matrix: IDENTITY_COLOR_MATRIX },
    })
}

const IDENTITY_COLOR_MATRIX: [f64; 20] = [
    1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0,
    0.0,
];

/// Gradient filters carry their own explicit stop count ahead of the
/// standard gradient-stop array instead of the 4-bit count field.
fn read_gradient_with_count(r: &mut BitReader, count: usize) -> VecanimResult<Gradient> {
    let mut stops = Vec::with_capacity(count);
    for _ in 0..count {
        let color = read_color_rgba(r)?;
        stops.push(GradientStop { ratio: 0, color });
    }
    for stop in stops.iter_mut() {
        stop.ratio = r.read_u8()?;
    }
    Ok(Gradient {
        spread: SpreadMode::Pad,
        interpolation: InterpolationMode::Normal,
        stops,
        focal_point: None,
    })
}

pub fn read_filter_list(r: &mut BitReader) -> VecanimResult<Vec<Filter>> {
    let count = r.read_u8()? as usize;
    (0..count).map(|_| read_filter(r)).collect()
}

/// Normalized PlaceObject record across all three profile variants (spec
/// §4.7). Absent optional fields mean "leave unchanged" on a move.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PlaceObjectRecord {
    pub depth: u16,
    pub is_move: bool,
    pub character_id: Option<CharacterId>,
    pub matrix: Option<Matrix>,
    pub color_transform: Option<ColorTransform>,
    pub ratio: Option<f64>,
    pub name: Option<String>,
    pub clip_depth: Option<u16>,
    pub filters: Option<Vec<Filter>>,
    pub blend_mode: Option<u8>,
    pub class_name: Option<String>,
}

/// Profile 1: always an add, never a move; depth + character + matrix +
/// optional color transform, all unconditional. `body_end` is the tag
/// body's absolute end offset in the underlying buffer, used to detect the
/// trailing color transform's presence.
pub fn read_place_object_v1(r: &mut BitReader, body_end: usize) -> VecanimResult<PlaceObjectRecord> {
    let character_id = Some(CharacterId(r.read_u16_le()?));
    let depth = r.read_u16_le()?;
    let matrix = Some(read_matrix(r)?);
    let color_transform = if r.tell_bytes() < body_end {
        Some(read_color_transform(r, false)?)
    } else {
        None
    };
    Ok(PlaceObjectRecord {
        depth,
        is_move: false,
        character_id,
        matrix,
        color_transform,
        ..Default::default()
    })
}

/// Profile 2: a flags byte selects which optional fields follow.
pub fn read_place_object_v2(r: &mut BitReader) -> VecanimResult<PlaceObjectRecord> {
    let has_clip_actions = r.read_bit()?;
    let has_clip_depth = r.read_bit()?;
    let has_name = r.read_bit()?;
    let has_ratio = r.read_bit()?;
    let has_color_transform = r.read_bit()?;
    let has_matrix = r.read_bit()?;
    let has_character = r.read_bit()?;
    let is_move = r.read_bit()?;
    let depth = r.read_u16_le()?;

    let character_id = if has_character {
        Some(CharacterId(r.read_u16_le()?))
    } else {
        None
    };
    let matrix = if has_matrix {
        Some(read_matrix(r)?)
    } else {
        None
    };
    let color_transform = if has_color_transform {
        Some(read_color_transform(r, true)?)
    } else {
        None
    };
    let ratio = if has_ratio {
        Some(f64::from(r.read_u16_le()?) / 65535.0)
    } else {
        None
    };
    let name = if has_name {
        Some(r.read_cstring()?)
    } else {
        None
    };
    let clip_depth = if has_clip_depth {
        Some(r.read_u16_le()?)
    } else {
        None
    };
    if has_clip_actions {
        // Clip-event action records: not modelled, skipped to end of body
        // by the caller bounding this reader to the tag body.
    }

    Ok(PlaceObjectRecord {
        depth,
        is_move,
        character_id,
        matrix,
        color_transform,
        ratio,
        name,
        clip_depth,
        ..Default::default()
    })
}

/// Profile 3: adds filters, blend mode, bitmap caching, visibility,
/// background color, and an image/class-name pairing whose field order
/// depends on which of `has_image`/`has_class_name` is set (spec §9 open
/// question — the class-name string is read first whenever `has_class_name`
/// is set, or when both `has_image` and `has_character` are set).
pub fn read_place_object_v3(r: &mut BitReader) -> VecanimResult<PlaceObjectRecord> {
    let has_clip_actions = r.read_bit()?;
    let has_clip_depth = r.read_bit()?;
    let has_name = r.read_bit()?;
    let has_ratio = r.read_bit()?;
    let has_color_transform = r.read_bit()?;
    let has_matrix = r.read_bit()?;
    let has_character = r.read_bit()?;
    let is_move = r.read_bit()?;

    let _reserved = r.read_ubits(1)?;
    let opaque_background = r.read_bit()?;
    let _visible = r.read_bit()?;
    let has_image = r.read_bit()?;
    let has_class_name = r.read_bit()?;
    let has_cache_as_bitmap = r.read_bit()?;
    let has_blend_mode = r.read_bit()?;
    let has_filter_list = r.read_bit()?;
    let _ = opaque_background;

    let depth = r.read_u16_le()?;

    let class_name = if has_class_name || (has_image && has_character) {
        Some(r.read_cstring()?)
    } else {
        None
    };
    let character_id = if has_character {
        Some(CharacterId(r.read_u16_le()?))
    } else {
        None
    };
    let matrix = if has_matrix {
        Some(read_matrix(r)?)
    } else {
        None
    };
    let color_transform = if has_color_transform {
        Some(read_color_transform(r, true)?)
    } else {
        None
    };
    let ratio = if has_ratio {
        Some(f64::from(r.read_u16_le()?) / 65535.0)
    } else {
        None
    };
    let name = if has_name {
        Some(r.read_cstring()?)
    } else {
        None
    };
    let clip_depth = if has_clip_depth {
        Some(r.read_u16_le()?)
    } else {
        None
    };
    let filters = if has_filter_list {
        Some(read_filter_list(r)?)
    } else {
        None
    };
    let blend_mode = if has_blend_mode {
        Some(r.read_u8()?)
    } else {
        None
    };
    if has_cache_as_bitmap {
        let _ = r.read_u8()?;
    }
    if has_clip_actions {
        // Not modelled; caller's body bound discards the remainder.
    }

    Ok(PlaceObjectRecord {
        depth,
        is_move,
        character_id,
        matrix,
        color_transform,
        ratio,
        name,
        clip_depth,
        filters,
        blend_mode,
        class_name,
    })
}

/// Normalizes a blend-mode byte: out-of-range or absent both mean "normal"
/// (spec §4.7).
pub fn normalize_blend_mode(raw: Option<u8>) -> u8 {
    match raw {
        Some(v) if (1..=14).contains(&v) => v,
        _ => 0,
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum MorphFillStyle {
    Solid {
        start: Color,
        end: Color,
    },
    LinearGradient {
        start_matrix: Matrix,
        end_matrix: Matrix,
        stops: Vec<(GradientStop, GradientStop)>,
    },
    RadialGradient {
        start_matrix: Matrix,
        end_matrix: Matrix,
        stops: Vec<(GradientStop, GradientStop)>,
    },
    Bitmap {
        character_id: CharacterId,
        start_matrix: Matrix,
        end_matrix: Matrix,
        repeating: bool,
        smoothed: bool,
    },
}

pub fn read_morph_fill_style(r: &mut BitReader) -> VecanimResult<MorphFillStyle> {
    let kind = r.read_u8()?;
    Ok(match kind {
        0x00 => MorphFillStyle::Solid {
            start: read_color_rgba(r)?,
            end: read_color_rgba(r)?,
        },
        0x10 | 0x12 => {
            let start_matrix = read_matrix(r)?;
            let end_matrix = read_matrix(r)?;
            let count = r.read_u8()? as usize;
            let mut stops = Vec::with_capacity(count);
            for _ in 0..count {
                let start_ratio = r.read_u8()?;
                let start_color = read_color_rgba(r)?;
                let end_ratio = r.read_u8()?;
                let end_color = read_color_rgba(r)?;
                stops.push((
                    GradientStop {
                        ratio: start_ratio,
                        color: start_color,
                    },
                    GradientStop {
                        ratio: end_ratio,
                        color: end_color,
                    },
                ));
            }
            if kind == 0x10 {
                MorphFillStyle::LinearGradient {
                    start_matrix,
                    end_matrix,
                    stops,
                }
            } else {
                MorphFillStyle::RadialGradient {
                    start_matrix,
                    end_matrix,
                    stops,
                }
            }
        }
        0x40 | 0x41 | 0x42 | 0x43 => {
            let character_id = CharacterId(r.read_u16_le()?);
            let start_matrix = read_matrix(r)?;
            let end_matrix = read_matrix(r)?;
            MorphFillStyle::Bitmap {
                character_id,
                start_matrix,
                end_matrix,
                repeating: kind == 0x40 || kind == 0x42,
                smoothed: kind == 0x40 || kind == 0x41,
            }
        }
        _ => MorphFillStyle::Solid {
            start: Color::OPAQUE_BLACK,
            end: Color::OPAQUE_BLACK,
        },
    })
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MorphLineStyle {
    pub start_width: Twips,
    pub end_width: Twips,
    pub start_color: Color,
    pub end_color: Color,
}

pub fn read_morph_line_style(r: &mut BitReader) -> VecanimResult<MorphLineStyle> {
    let start_width = Twips(r.read_u16_le()? as i32);
    let end_width = Twips(r.read_u16_le()? as i32);
    let start_color = read_color_rgba(r)?;
    let end_color = read_color_rgba(r)?;
    Ok(MorphLineStyle {
        start_width,
        end_width,
        start_color,
        end_color,
    })
}

/// Lossless/JPEG bitmap header fields (spec §4.6); the pixel payload is
/// decoded separately by the bitmap module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum LosslessFormat {
    Palettized8,
    Rgb15,
    Rgb24,
    /// Alpha-carrying 32-bit variant, only produced by the "with alpha"
    /// lossless tag profile (spec §4.6, sub-format 5d).
    Argb32,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LosslessBitmapHeader {
    pub format: LosslessFormat,
    pub width: u16,
    pub height: u16,
    /// Palette entries minus one, only meaningful for `Palettized8`.
    pub color_table_size: Option<u8>,
}

/// `with_alpha` selects the "with alpha" tag profile, under which format
/// code 5 denotes 32-bit ARGB rather than 24-bit XRGB.
pub fn read_lossless_bitmap_header(
    r: &mut BitReader,
    with_alpha: bool,
) -> VecanimResult<LosslessBitmapHeader> {
    let format_code = r.read_u8()?;
    let width = r.read_u16_le()?;
    let height = r.read_u16_le()?;
    let (format, color_table_size) = match format_code {
        3 => (LosslessFormat::Palettized8, Some(r.read_u8()?)),
        4 => (LosslessFormat::Rgb15, None),
        5 if with_alpha => (LosslessFormat::Argb32, None),
        5 => (LosslessFormat::Rgb24, None),
        _ => (LosslessFormat::Rgb24, None),
    };
    Ok(LosslessBitmapHeader {
        format,
        width,
        height,
        color_table_size,
    })
}

/// One exported-asset entry (spec §4.3, §10.6): a character id paired with
/// its public name.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ExportedAsset {
    pub character_id: CharacterId,
    pub name: String,
}

pub fn read_export_assets(r: &mut BitReader) -> VecanimResult<Vec<ExportedAsset>> {
    let count = r.read_u16_le()? as usize;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let character_id = CharacterId(r.read_u16_le()?);
        let name = r.read_cstring()?;
        out.push(ExportedAsset { character_id, name });
    }
    Ok(out)
}

#[cfg(test)]
#[path = "../tests/unit/records.rs"]
mod tests;
