use super::*;
use crate::bitreader::ReaderFlags;
use crate::container::Container;
use crate::foundation::core::CharacterId;
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

/// A minimal no-geometry DEFINE_SHAPE body: empty bounds, no styles, no
/// edges, just an immediate End record.
fn empty_shape_body(character_id: u16) -> Vec<u8> {
    let mut body = character_id.to_le_bytes().to_vec();
    body.push(0x00); // empty rectangle (width=0), already byte-aligned
    body.push(0x00); // fill style count = 0
    body.push(0x00); // line style count = 0
    body.push(0x00); // fill_bits=0, line_bits=0
    body.push(0x00); // End record (all five flags zero)
    body
}

fn place_object2_body(character_id: Option<u16>, depth: u16) -> Vec<u8> {
    let has_character = character_id.is_some() as u32;
    let flags = (has_character << 1) as u8;
    let mut body = vec![flags];
    body.extend(depth.to_le_bytes());
    if let Some(id) = character_id {
        body.extend(id.to_le_bytes());
    }
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

#[test]
fn remove_object2_clears_the_depth_before_the_next_show_frame() {
    let mut tags = Vec::new();
    push_tag(&mut tags, tag::code::DEFINE_SHAPE, &empty_shape_body(1));
    push_tag(&mut tags, tag::code::PLACE_OBJECT2, &place_object2_body(Some(1), 1));
    push_tag(&mut tags, tag::code::REMOVE_OBJECT2, &1u16.to_le_bytes());
    push_tag(&mut tags, tag::code::SHOW_FRAME, &[]);
    push_tag(&mut tags, tag::code::END, &[]);

    let input = wrap_container(tags);
    let container = Container::decode(&input, ReaderFlags::forgiving()).unwrap();
    let timeline = container.root_timeline().unwrap();

    assert_eq!(timeline.frames.len(), 1);
    assert!(timeline.frames[0].objects.is_empty());
}

#[test]
fn frame_label_and_actions_are_attached_to_the_next_show_frame() {
    let mut tags = Vec::new();
    push_tag(&mut tags, tag::code::FRAME_LABEL, b"intro\0");
    push_tag(&mut tags, tag::code::DO_ACTION, &[0xAA, 0xBB]);
    push_tag(&mut tags, tag::code::SHOW_FRAME, &[]);
    push_tag(&mut tags, tag::code::END, &[]);

    let input = wrap_container(tags);
    let container = Container::decode(&input, ReaderFlags::forgiving()).unwrap();
    let timeline = container.root_timeline().unwrap();

    assert_eq!(timeline.frames.len(), 1);
    let frame = &timeline.frames[0];
    assert_eq!(frame.label.as_deref(), Some("intro"));
    assert_eq!(frame.actions, vec![vec![0xAA, 0xBB]]);
}

#[test]
fn a_sprite_that_places_itself_does_not_recurse_forever() {
    // Inner tag stream: place character 5 (itself) at depth 1, show frame, end.
    let mut inner = Vec::new();
    push_tag(&mut inner, tag::code::PLACE_OBJECT2, &place_object2_body(Some(5), 1));
    push_tag(&mut inner, tag::code::SHOW_FRAME, &[]);
    push_tag(&mut inner, tag::code::END, &[]);

    let mut sprite_body = 5u16.to_le_bytes().to_vec();
    sprite_body.extend(1u16.to_le_bytes()); // frame_count
    sprite_body.extend(inner);

    let mut tags = Vec::new();
    push_tag(&mut tags, tag::code::DEFINE_SPRITE, &sprite_body);
    push_tag(&mut tags, tag::code::END, &[]);

    let input = wrap_container(tags);
    let container = Container::decode(&input, ReaderFlags::forgiving()).unwrap();

    let drawable = container.resolve(CharacterId(5)).unwrap().expect("sprite resolves");
    let crate::container::Drawable::Sprite(sprite) = &drawable else {
        panic!("expected a sprite drawable");
    };

    // Must return promptly (no stack overflow / infinite loop) with exactly
    // the one frame the sprite's own stream produces.
    let timeline = container.timeline_of(sprite).unwrap();
    assert_eq!(timeline.frames.len(), 1);
    assert_eq!(timeline.frames[0].objects.len(), 1);
    assert_eq!(timeline.frames[0].objects[0].character_id, CharacterId(5));
}
