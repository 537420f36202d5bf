use crate::foundation::error::{VecanimError, VecanimResult};

pub use kurbo::{Affine, BezPath, Point, Rect as KRect, Vec2};

/// A length in twips (1/20 pixel), the native unit of the container's
/// geometric coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Twips(pub i32);

impl Twips {
    pub const PER_PIXEL: f64 = 20.0;

    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    pub const fn zero() -> Self {
        Self(0)
    }

    pub const fn get(self) -> i32 {
        self.0
    }

    pub fn to_pixels(self) -> f64 {
        f64::from(self.0) / Self::PER_PIXEL
    }

    pub fn from_pixels(px: f64) -> Self {
        Self((px * Self::PER_PIXEL).round() as i32)
    }
}

impl std::ops::Add for Twips {
    type Output = Twips;
    fn add(self, rhs: Twips) -> Twips {
        Twips(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Twips {
    type Output = Twips;
    fn sub(self, rhs: Twips) -> Twips {
        Twips(self.0 - rhs.0)
    }
}

/// Declared bounding rectangle in twips. Empty iff all four edges are zero
/// (spec §3, Rectangle invariant).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rectangle {
    pub x_min: i32,
    pub x_max: i32,
    pub y_min: i32,
    pub y_max: i32,
}

impl Rectangle {
    pub const EMPTY: Rectangle = Rectangle {
        x_min: 0,
        x_max: 0,
        y_min: 0,
        y_max: 0,
    };

    pub fn is_empty(self) -> bool {
        self == Self::EMPTY
    }

    pub fn width(self) -> i32 {
        self.x_max - self.x_min
    }

    pub fn height(self) -> i32 {
        self.y_max - self.y_min
    }

    /// Union of two rectangles; an empty operand does not widen the result
    /// unless both are empty.
    pub fn union(self, other: Rectangle) -> Rectangle {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        Rectangle {
            x_min: self.x_min.min(other.x_min),
            x_max: self.x_max.max(other.x_max),
            y_min: self.y_min.min(other.y_min),
            y_max: self.y_max.max(other.y_max),
        }
    }

    pub fn to_kurbo_pixels(self) -> KRect {
        KRect::new(
            Twips(self.x_min).to_pixels(),
            Twips(self.y_min).to_pixels(),
            Twips(self.x_max).to_pixels(),
            Twips(self.y_max).to_pixels(),
        )
    }
}

/// Six fixed-point affine components as read from the container: two scale,
/// two skew, two translate (spec §3, Matrix).
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Matrix {
    pub scale_x: f64,
    pub scale_y: f64,
    pub skew_x: f64,
    pub skew_y: f64,
    pub translate_x: Twips,
    pub translate_y: Twips,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        scale_x: 1.0,
        scale_y: 1.0,
        skew_x: 0.0,
        skew_y: 0.0,
        translate_x: Twips(0),
        translate_y: Twips(0),
    };

    /// Standard affine composition, `self` applied after `other` (i.e.
    /// `self * other` maps a point through `other` then `self`).
    pub fn multiply(self, other: Matrix) -> Matrix {
        Matrix {
            scale_x: self.scale_x * other.scale_x + self.skew_x * other.skew_y,
            skew_x: self.scale_x * other.skew_x + self.skew_x * other.scale_y,
            skew_y: self.skew_y * other.scale_x + self.scale_y * other.skew_y,
            scale_y: self.skew_y * other.skew_x + self.scale_y * other.scale_y,
            translate_x: Twips(
                (self.scale_x * other.translate_x.0 as f64
                    + self.skew_x * other.translate_y.0 as f64
                    + self.translate_x.0 as f64)
                    .round() as i32,
            ),
            translate_y: Twips(
                (self.skew_y * other.translate_x.0 as f64
                    + self.scale_y * other.translate_y.0 as f64
                    + self.translate_y.0 as f64)
                    .round() as i32,
            ),
        }
    }

    pub fn translate(dx: Twips, dy: Twips) -> Matrix {
        Matrix {
            translate_x: dx,
            translate_y: dy,
            ..Matrix::IDENTITY
        }
    }

    /// Blend two matrices per-component at `ratio` in `[0, 1]`; translate is
    /// integer-rounded after the blend (spec §4.5).
    pub fn lerp(a: Matrix, b: Matrix, ratio: f64) -> Matrix {
        fn lerp_f64(a: f64, b: f64, t: f64) -> f64 {
            a + (b - a) * t
        }
        Matrix {
            scale_x: lerp_f64(a.scale_x, b.scale_x, ratio),
            scale_y: lerp_f64(a.scale_y, b.scale_y, ratio),
            skew_x: lerp_f64(a.skew_x, b.skew_x, ratio),
            skew_y: lerp_f64(a.skew_y, b.skew_y, ratio),
            translate_x: Twips(
                lerp_f64(a.translate_x.0 as f64, b.translate_x.0 as f64, ratio).round() as i32,
            ),
            translate_y: Twips(
                lerp_f64(a.translate_y.0 as f64, b.translate_y.0 as f64, ratio).round() as i32,
            ),
        }
    }

    pub fn to_affine(self) -> Affine {
        Affine::new([
            self.scale_x,
            self.skew_y,
            self.skew_x,
            self.scale_y,
            self.translate_x.to_pixels(),
            self.translate_y.to_pixels(),
        ])
    }
}

/// Straight (3-channel, alpha implied 255) or alpha-carrying (4-channel)
/// color, depending on the record profile that produced it (spec §3, Color).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const OPAQUE_BLACK: Color = Color {
        r: 0,
        g: 0,
        b: 0,
        a: 255,
    };

    pub fn rgb(r: u8, g: u8, b: u8) -> Color {
        Color { r, g, b, a: 255 }
    }

    pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> Color {
        Color { r, g, b, a }
    }

    /// Integer-rounded per-channel blend at `ratio` in `[0, 1]`.
    pub fn lerp(a: Color, b: Color, ratio: f64) -> Color {
        fn lerp_u8(a: u8, b: u8, t: f64) -> u8 {
            (a as f64 + (b as f64 - a as f64) * t).round().clamp(0.0, 255.0) as u8
        }
        Color {
            r: lerp_u8(a.r, b.r, ratio),
            g: lerp_u8(a.g, b.g, ratio),
            b: lerp_u8(a.b, b.b, ratio),
            a: lerp_u8(a.a, b.a, ratio),
        }
    }
}

/// Four multiplicative and four additive terms; identity when all
/// multiplicative terms are 256 (spec §3, ColorTransform).
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ColorTransform {
    pub mult: [i32; 4],
    pub add: [i32; 4],
}

impl Default for ColorTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ColorTransform {
    pub const IDENTITY: ColorTransform = ColorTransform {
        mult: [256, 256, 256, 256],
        add: [0, 0, 0, 0],
    };

    /// `clamp(c * mult / 256 + add, 0, 255)` per channel (spec §3).
    pub fn apply(self, c: Color) -> Color {
        let channels = [c.r, c.g, c.b, c.a];
        let mut out = [0u8; 4];
        for i in 0..4 {
            let v = (i64::from(channels[i]) * i64::from(self.mult[i])) / 256 + i64::from(self.add[i]);
            out[i] = v.clamp(0, 255) as u8;
        }
        Color {
            r: out[0],
            g: out[1],
            b: out[2],
            a: out[3],
        }
    }

    /// Compose a chain of independently-clamping transforms left to right
    /// (spec §9: compositing at decode time would change results, since each
    /// step clamps to `[0, 255]` independently).
    pub fn apply_chain(chain: &[ColorTransform], c: Color) -> Color {
        chain.iter().fold(c, |acc, t| t.apply(acc))
    }
}

/// 16-bit character identifier used to address definitions in the character
/// table (spec §3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CharacterId(pub u16);

/// Absolute 0-based frame index within a timeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameIndex(pub u32);

/// Frame rate as the 8.8 fixed-point value read from the container header.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FrameRate(pub f64);

impl FrameRate {
    pub fn from_raw_8_8(raw: u16) -> FrameRate {
        FrameRate(f64::from(raw) / 256.0)
    }
}

pub(crate) fn validate_ratio(ratio: f64) -> VecanimResult<f64> {
    if !ratio.is_finite() {
        return Err(VecanimError::malformed("interpolation ratio is not finite"));
    }
    Ok(ratio.clamp(0.0, 1.0))
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
