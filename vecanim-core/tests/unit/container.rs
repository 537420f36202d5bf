use super::*;
use crate::bitreader::ReaderFlags;
use crate::foundation::core::{CharacterId, Color};
use crate::records::FillStyle;

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

/// A solid-fill 0,0..200,200 triangle as a DEFINE_SHAPE tag body, the way
/// `define_shape` expects it: character id, rectangle, fill/line style
/// arrays, fill/line bit widths, then the edge-record stream.
fn define_shape_body(character_id: u16) -> Vec<u8> {
    let mut body = character_id.to_le_bytes().to_vec();

    let mut rect = BitWriter::default();
    rect.push(8, 5).push(0, 8).push(200, 8).push(0, 8).push(200, 8);
    body.extend(rect.into_bytes());

    // One solid red fill style, no line styles.
    body.extend_from_slice(&[0x01, 0x00, 0xFF, 0x00, 0x00]);
    body.push(0x00); // line style count = 0
    body.push(0x10); // fill_bits=1, line_bits=0

    let mut records = BitWriter::default();
    // StyleChange: move to (0,0), fill1 = style 0 (one-based raw = 1).
    records
        .push(0, 1) // is_edge
        .push(0, 1) // new_styles
        .push(0, 1) // line
        .push(1, 1) // fill1
        .push(0, 1) // fill0
        .push(1, 1) // move
        .push(0, 5) // move bit width (x=y=0)
        .push(1, 1); // fill1 raw index
                      // Three straight edges forming a closed triangle: (200,0), (0,200), (-200,-200).
                      // num_bits field carries (bit width - 2), so 10 here means 12-bit dx/dy.
    records
        .push(1, 1) // is_edge
        .push(1, 1) // is_straight
        .push(10, 4) // num_bits - 2
        .push(1, 1) // general line
        .push(200i64 as u32 & 0xFFF, 12)
        .push(0, 12);
    records
        .push(1, 1)
        .push(1, 1)
        .push(10, 4)
        .push(1, 1)
        .push(0, 12)
        .push(200i64 as u32 & 0xFFF, 12);
    records
        .push(1, 1)
        .push(1, 1)
        .push(10, 4)
        .push(1, 1)
        .push((-200i64 as u32) & 0xFFF, 12)
        .push((-200i64 as u32) & 0xFFF, 12);
    // End: all five non-edge flags zero.
    records.push(0, 1).push(0, 5);
    body.extend(records.into_bytes());

    body
}

fn place_object2_body(character_id: Option<u16>, depth: u16, translate: Option<(i32, i32)>) -> Vec<u8> {
    let has_character = character_id.is_some() as u32;
    let has_matrix = translate.is_some() as u32;
    let flags = (0u32 << 7) // clip actions
        | (0 << 6) // clip depth
        | (0 << 5) // name
        | (0 << 4) // ratio
        | (0 << 3) // color transform
        | (has_matrix << 2)
        | (has_character << 1)
        | 0; // is_move
    let mut body = vec![flags as u8];
    body.extend(depth.to_le_bytes());
    if let Some(id) = character_id {
        body.extend(id.to_le_bytes());
    }
    if let Some((tx, ty)) = translate {
        let mut m = BitWriter::default();
        m.push(0, 1) // has_scale
            .push(0, 1) // has_skew
            .push(11, 5) // translate width
            .push(tx as u32 & 0x7FF, 11)
            .push(ty as u32 & 0x7FF, 11);
        body.extend(m.into_bytes());
    }
    body
}

fn push_tag(out: &mut Vec<u8>, code: u16, tag_body: &[u8]) {
    out.extend_from_slice(&short_tag_header(code, tag_body.len() as u16));
    out.extend_from_slice(tag_body);
}

fn wrap_container(declared_body: Vec<u8>) -> Vec<u8> {
    let mut body = vec![0u8]; // empty frame rectangle, byte-aligned
    body.extend_from_slice(&0u16.to_le_bytes()); // frame rate
    body.extend_from_slice(&1u16.to_le_bytes()); // frame count
    body.extend(declared_body);

    let total_len = (8 + body.len()) as u32;
    let mut out = vec![b'F', b'W', b'S', 6];
    out.extend_from_slice(&total_len.to_le_bytes());
    out.extend(body);
    out
}

#[test]
fn truncated_header_yields_invalid_but_zero_frame_count() {
    // Exactly spec scenario (a): 8 header bytes declaring length 15,
    // followed by a single End tag, 10 bytes total against a declared 15.
    let mut data = vec![b'F', b'W', b'S', 6, 15, 0, 0, 0];
    data.extend_from_slice(&[0x00, 0x00]);

    let container = Container::decode(&data, ReaderFlags::forgiving()).unwrap();
    assert_eq!(container.metadata.signature, Signature::Uncompressed);
    assert_eq!(container.metadata.version, 6);
    assert_eq!(container.metadata.declared_length, 15);
    assert_eq!(container.metadata.frame_count, 0);
    assert!(!container.metadata.valid);
}

#[test]
fn resolves_shape_and_compiles_a_placement_into_the_root_timeline() {
    let mut tags = Vec::new();
    push_tag(&mut tags, tag::code::DEFINE_SHAPE, &define_shape_body(9));
    push_tag(
        &mut tags,
        tag::code::PLACE_OBJECT2,
        &place_object2_body(Some(9), 1, Some((500, 300))),
    );
    push_tag(&mut tags, tag::code::SHOW_FRAME, &[]);
    push_tag(&mut tags, tag::code::END, &[]);

    let input = wrap_container(tags);
    let container = Container::decode(&input, ReaderFlags::forgiving()).unwrap();
    assert!(container.metadata.valid);

    let drawable = container.resolve(CharacterId(9)).unwrap().expect("shape resolves");
    let Drawable::Shape(shape) = &drawable else {
        panic!("expected a shape drawable");
    };
    assert_eq!(shape.bounds, Rectangle { x_min: 0, x_max: 200, y_min: 0, y_max: 200 });
    assert_eq!(shape.paths.len(), 1);
    assert_eq!(shape.paths[0].fill, Some(FillStyle::Solid(Color::rgb(255, 0, 0))));

    assert!(container.resolve(CharacterId(404)).unwrap().is_none());

    let timeline = container.root_timeline().unwrap();
    assert_eq!(timeline.frames.len(), 1);
    let frame = &timeline.frames[0];
    assert_eq!(frame.objects.len(), 1);
    let object = &frame.objects[0];
    assert_eq!(object.character_id, CharacterId(9));
    assert_eq!(
        object.bounds,
        Rectangle { x_min: 500, x_max: 700, y_min: 300, y_max: 500 }
    );
}
