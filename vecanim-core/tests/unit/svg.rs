use super::*;
use crate::bitreader::ReaderFlags;
use crate::container::Container;
use crate::foundation::core::{CharacterId, Color, Matrix, Rectangle};
use crate::records::{CapStyle, JoinStyle, LineStyle};
use crate::shapes::CompiledSegment;
use crate::tag;

#[derive(Default)]
struct BitWriter {
    bytes: Vec<u8>,
    bit_len: usize,
}

impl BitWriter {
    fn push(&mut self, value: u32, width: u32) -> &mut Self {
        for i in (0..width).rev() {
            let bit = (value >> i) & 1;
            let byte_idx = self.bit_len / 8;
            if byte_idx >= self.bytes.len() {
                self.bytes.push(0);
            }
            if bit == 1 {
                self.bytes[byte_idx] |= 1 << (7 - (self.bit_len % 8));
            }
            self.bit_len += 1;
        }
        self
    }

    fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

fn short_tag_header(code: u16, len: u16) -> [u8; 2] {
    let packed: u16 = (code << 6) | (len & 0x3F);
    packed.to_le_bytes()
}

fn push_tag(out: &mut Vec<u8>, code: u16, tag_body: &[u8]) {
    out.extend_from_slice(&short_tag_header(code, tag_body.len() as u16));
    out.extend_from_slice(tag_body);
}

/// A solid-fill 0,0..200,200 triangle DEFINE_SHAPE body, matching the one in
/// container.rs's own tests.
fn define_shape_body(character_id: u16) -> Vec<u8> {
    let mut body = character_id.to_le_bytes().to_vec();

    let mut rect = BitWriter::default();
    rect.push(8, 5).push(0, 8).push(200, 8).push(0, 8).push(200, 8);
    body.extend(rect.into_bytes());

    body.extend_from_slice(&[0x01, 0x00, 0xFF, 0x00, 0x00]); // one solid red fill
    body.push(0x00); // line style count = 0
    body.push(0x10); // fill_bits=1, line_bits=0

    let mut records = BitWriter::default();
    records
        .push(0, 1)
        .push(0, 1)
        .push(0, 1)
        .push(1, 1)
        .push(0, 1)
        .push(1, 1)
        .push(0, 5)
        .push(1, 1);
    records.push(1, 1).push(1, 1).push(10, 4).push(1, 1).push(200u32 & 0xFFF, 12).push(0, 12);
    records.push(1, 1).push(1, 1).push(10, 4).push(1, 1).push(0, 12).push(200u32 & 0xFFF, 12);
    records
        .push(1, 1)
        .push(1, 1)
        .push(10, 4)
        .push(1, 1)
        .push((-200i64 as u32) & 0xFFF, 12)
        .push((-200i64 as u32) & 0xFFF, 12);
    records.push(0, 1).push(0, 5);
    body.extend(records.into_bytes());

    body
}

fn wrap_container(declared_body: Vec<u8>) -> Vec<u8> {
    let mut body = vec![0u8];
    body.extend_from_slice(&0u16.to_le_bytes());
    body.extend_from_slice(&1u16.to_le_bytes());
    body.extend(declared_body);

    let total_len = (8 + body.len()) as u32;
    let mut out = vec![b'F', b'W', b'S', 6];
    out.extend_from_slice(&total_len.to_le_bytes());
    out.extend(body);
    out
}

fn decode_one_shape(character_id: u16) -> Container {
    let mut tags = Vec::new();
    push_tag(&mut tags, tag::code::DEFINE_SHAPE, &define_shape_body(character_id));
    push_tag(&mut tags, tag::code::END, &[]);
    let input = wrap_container(tags);
    Container::decode(&input, ReaderFlags::forgiving()).unwrap()
}

#[test]
fn including_the_same_drawable_twice_shares_a_single_def() {
    let container = decode_one_shape(9);
    let drawable = container.resolve(CharacterId(9)).unwrap().expect("shape resolves");

    let mut emitter = SvgEmitter::new(&container, SvgEmitterOptions::default());
    emitter.area(Rectangle { x_min: 0, x_max: 4000, y_min: 0, y_max: 4000 });
    emitter.include(&drawable, Matrix::IDENTITY, None, &[], 0, None).unwrap();
    emitter.include(&drawable, Matrix::IDENTITY, None, &[], 0, None).unwrap();
    let doc = emitter.finish(Rectangle { x_min: 0, x_max: 4000, y_min: 0, y_max: 4000 });

    assert_eq!(doc.matches("<defs>").count(), 1);
    assert_eq!(doc.matches("<g id=\"def_").count(), 1);
    assert_eq!(doc.matches("<use href=\"#def_").count(), 2);
    assert!(doc.contains(r#"fill="#ff0000""#));
    assert!(doc.starts_with("<svg "));
    assert!(doc.ends_with("</svg>"));
}

#[test]
fn short_ids_use_compact_sequential_names() {
    let container = decode_one_shape(9);
    let drawable = container.resolve(CharacterId(9)).unwrap().expect("shape resolves");

    let options = SvgEmitterOptions { short_ids: true, ..SvgEmitterOptions::default() };
    let mut emitter = SvgEmitter::new(&container, options);
    emitter.include(&drawable, Matrix::IDENTITY, None, &[], 0, None).unwrap();
    let doc = emitter.finish(Rectangle { x_min: 0, x_max: 4000, y_min: 0, y_max: 4000 });

    assert!(doc.contains("<g id=\"d0\">"));
    assert!(doc.contains("href=\"#d0\""));
}

#[test]
fn build_path_d_closes_every_disjoint_loop_not_just_the_last() {
    let px = |t: i32| crate::foundation::core::Twips(t);
    let first_loop = vec![
        CompiledSegment { from: (px(0), px(0)), to: (px(100), px(0)), control: None },
        CompiledSegment { from: (px(100), px(0)), to: (px(0), px(0)), control: None },
    ];
    let second_loop = vec![CompiledSegment {
        from: (px(500), px(500)),
        to: (px(600), px(500)),
        control: None,
    }];
    let segments: Vec<_> = first_loop.into_iter().chain(second_loop).collect();

    let d = build_path_d(&segments);

    // The jump from the first loop's end (0,0) to the second loop's start
    // (500,500) must close the first loop with an explicit Z before the
    // second M, not just once at the very end.
    let first_z = d.find('Z').expect("at least one Z");
    let second_m = d[first_z..].find('M').map(|i| i + first_z).expect("a second M after the first Z");
    assert!(second_m > first_z);
    assert!(d.ends_with('Z'));
    assert_eq!(d.matches('Z').count(), 2);
}

#[test]
fn thin_strokes_clamp_to_one_pixel_with_non_scaling_vector_effect() {
    let container = decode_one_shape(9);
    let mut emitter = SvgEmitter::new(&container, SvgEmitterOptions::default());
    let line = LineStyle {
        width: crate::foundation::core::Twips(4), // 0.2px, well under 1px
        color: Some(Color::rgb(0, 0, 0)),
        fill: None,
        start_cap: CapStyle::Round,
        end_cap: CapStyle::Round,
        join: JoinStyle::Round,
        miter_limit: None,
        no_h_scale: false,
        no_v_scale: false,
        pixel_hinting: false,
        no_close: false,
    };
    let mut out = String::new();
    emitter.write_stroke_attrs(&mut out, &line);

    assert!(out.contains(r#"stroke-width="1.000""#));
    assert!(out.contains(r#"vector-effect="non-scaling-stroke""#));
}

#[test]
fn sub_pixel_mode_keeps_the_true_width_unclamped() {
    let container = decode_one_shape(9);
    let options = SvgEmitterOptions { thin_stroke_mode: ThinStrokeMode::SubPixel, ..SvgEmitterOptions::default() };
    let mut emitter = SvgEmitter::new(&container, options);
    let line = LineStyle {
        width: crate::foundation::core::Twips(4),
        color: Some(Color::rgb(0, 0, 0)),
        fill: None,
        start_cap: CapStyle::Round,
        end_cap: CapStyle::Round,
        join: JoinStyle::Round,
        miter_limit: None,
        no_h_scale: false,
        no_v_scale: false,
        pixel_hinting: false,
        no_close: false,
    };
    let mut out = String::new();
    emitter.write_stroke_attrs(&mut out, &line);

    assert!(out.contains(r#"stroke-width="0.200""#));
    assert!(!out.contains("vector-effect"));
}

#[test]
fn a_sprite_placing_itself_renders_without_recursing_forever() {
    let mut inner = Vec::new();
    let place_body = {
        let mut body = vec![0b0000_0010u8]; // has_character, no matrix
        body.extend(5u16.to_le_bytes()); // depth
        body.extend(5u16.to_le_bytes()); // character id (itself)
        body
    };
    push_tag(&mut inner, tag::code::PLACE_OBJECT2, &place_body);
    push_tag(&mut inner, tag::code::SHOW_FRAME, &[]);
    push_tag(&mut inner, tag::code::END, &[]);

    let mut sprite_body = 5u16.to_le_bytes().to_vec();
    sprite_body.extend(1u16.to_le_bytes());
    sprite_body.extend(inner);

    let mut tags = Vec::new();
    push_tag(&mut tags, tag::code::DEFINE_SPRITE, &sprite_body);
    push_tag(&mut tags, tag::code::END, &[]);
    let input = wrap_container(tags);
    let container = Container::decode(&input, ReaderFlags::forgiving()).unwrap();
    let drawable = container.resolve(CharacterId(5)).unwrap().expect("sprite resolves");

    let mut emitter = SvgEmitter::new(&container, SvgEmitterOptions::default());
    emitter.include(&drawable, Matrix::IDENTITY, None, &[], 0, None).unwrap();
    let doc = emitter.finish(Rectangle { x_min: 0, x_max: 4000, y_min: 0, y_max: 4000 });

    assert!(doc.starts_with("<svg "));
}

#[test]
fn unrecognized_blend_mode_bytes_fall_back_to_no_css_override() {
    assert_eq!(blend_mode_css(3), Some("screen"));
    assert_eq!(blend_mode_css(0), None);
    assert_eq!(blend_mode_css(1), None);
    assert_eq!(blend_mode_css(200), None);
}

#[test]
fn escape_attr_covers_all_four_reserved_characters() {
    assert_eq!(escape_attr(r#"a&b"c<d>"#), "a&amp;b&quot;c&lt;d&gt;");
}

#[test]
fn filter_ref_skips_an_inner_only_filter_list() {
    let container = decode_one_shape(9);
    let mut emitter = SvgEmitter::new(&container, SvgEmitterOptions::default());
    let inner_glow = crate::records::Filter::Glow {
        color: Color::rgb(255, 255, 255),
        blur_x: 4.0,
        blur_y: 4.0,
        strength: 1.0,
        inner: true,
        knockout: false,
        passes: 1,
    };
    assert!(emitter.filter_ref(&[inner_glow]).is_none());
    assert!(emitter.filter_ref(&[]).is_none());
}

#[test]
fn filter_ref_builds_a_filter_def_for_an_outer_drop_shadow() {
    let container = decode_one_shape(9);
    let mut emitter = SvgEmitter::new(&container, SvgEmitterOptions::default());
    let shadow = crate::records::Filter::DropShadow {
        color: Color::rgba(0, 0, 0, 128),
        blur_x: 4.0,
        blur_y: 4.0,
        angle: 0.785398,
        distance: 5.0,
        strength: 1.0,
        inner: false,
        knockout: false,
        passes: 1,
    };
    let id = emitter.filter_ref(&[shadow]).expect("drop shadow is supported");

    let drawable = container.resolve(CharacterId(9)).unwrap().unwrap();
    emitter.include(&drawable, Matrix::IDENTITY, None, &[], 0, None).unwrap();
    let doc = emitter.finish(Rectangle { x_min: 0, x_max: 4000, y_min: 0, y_max: 4000 });
    assert!(doc.contains(&format!(r#"<filter id="{id}""#)));
    assert!(doc.contains("<feFlood"));
    assert!(doc.contains("<feMerge"));
}
