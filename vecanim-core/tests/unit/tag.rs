use super::*;

fn short_tag_header(code: u16, len: u16) -> [u8; 2] {
    let packed: u16 = (code << 6) | (len & 0x3F);
    packed.to_le_bytes()
}

#[test]
fn iterates_short_tags_and_stops_at_end() {
    let mut data = Vec::new();
    data.extend_from_slice(&short_tag_header(code::SHOW_FRAME, 0));
    data.extend_from_slice(&short_tag_header(code::SET_BACKGROUND_COLOR, 3));
    data.extend_from_slice(&[0xFF, 0x00, 0x00]);
    data.extend_from_slice(&short_tag_header(code::END, 0));

    let mut r = TagReader::new(&data, ReaderFlags::strict());
    let t1 = r.next_tag().unwrap().unwrap();
    assert_eq!(t1.code, code::SHOW_FRAME);
    assert_eq!(t1.body_len, 0);

    let t2 = r.next_tag().unwrap().unwrap();
    assert_eq!(t2.code, code::SET_BACKGROUND_COLOR);
    assert_eq!(t2.body_len, 3);

    let t3 = r.next_tag().unwrap().unwrap();
    assert!(t3.is_end());

    assert!(r.next_tag().unwrap().is_none());
}

#[test]
fn extended_length_tag_reads_32_bit_length() {
    let mut data = Vec::new();
    data.extend_from_slice(&short_tag_header(code::DEFINE_BINARY_DATA, 0x3F));
    data.extend_from_slice(&4u32.to_le_bytes());
    data.extend_from_slice(&[0, 0, 0xAA, 0xBB]);
    data.extend_from_slice(&short_tag_header(code::END, 0));

    let mut r = TagReader::new(&data, ReaderFlags::strict());
    let t = r.next_tag().unwrap().unwrap();
    assert_eq!(t.code, code::DEFINE_BINARY_DATA);
    assert_eq!(t.body_len, 4);
    assert_eq!(t.character_id, Some(CharacterId(0)));
}

#[test]
fn definition_tag_exposes_peeked_character_id() {
    let mut data = Vec::new();
    data.extend_from_slice(&short_tag_header(code::DEFINE_SHAPE, 2));
    data.extend_from_slice(&42u16.to_le_bytes());
    data.extend_from_slice(&short_tag_header(code::END, 0));

    let mut r = TagReader::new(&data, ReaderFlags::strict());
    let t = r.next_tag().unwrap().unwrap();
    assert_eq!(t.character_id, Some(CharacterId(42)));
}

#[test]
fn non_definition_tag_has_no_character_id() {
    let mut data = Vec::new();
    data.extend_from_slice(&short_tag_header(code::SHOW_FRAME, 0));
    data.extend_from_slice(&short_tag_header(code::END, 0));

    let mut r = TagReader::new(&data, ReaderFlags::strict());
    let t = r.next_tag().unwrap().unwrap();
    assert_eq!(t.character_id, None);
}

#[test]
fn lookup_builds_index_lazily_and_finds_definition() {
    let mut data = Vec::new();
    data.extend_from_slice(&short_tag_header(code::SHOW_FRAME, 0));
    data.extend_from_slice(&short_tag_header(code::DEFINE_SHAPE, 2));
    data.extend_from_slice(&7u16.to_le_bytes());
    data.extend_from_slice(&short_tag_header(code::END, 0));

    let mut r = TagReader::new(&data, ReaderFlags::strict());
    let found = r.lookup(CharacterId(7)).unwrap();
    assert!(found.is_some());
    assert_eq!(found.unwrap().code, code::DEFINE_SHAPE);
    assert!(r.lookup(CharacterId(99)).unwrap().is_none());
}

#[test]
fn lookup_preserves_iteration_position() {
    let mut data = Vec::new();
    data.extend_from_slice(&short_tag_header(code::SHOW_FRAME, 0));
    data.extend_from_slice(&short_tag_header(code::DEFINE_SHAPE, 2));
    data.extend_from_slice(&7u16.to_le_bytes());
    data.extend_from_slice(&short_tag_header(code::END, 0));

    let mut r = TagReader::new(&data, ReaderFlags::strict());
    let first = r.next_tag().unwrap().unwrap();
    assert_eq!(first.code, code::SHOW_FRAME);

    r.lookup(CharacterId(7)).unwrap();

    let next = r.next_tag().unwrap().unwrap();
    assert_eq!(next.code, code::DEFINE_SHAPE);
}

#[test]
fn truncated_body_errors_in_strict_mode() {
    let mut data = Vec::new();
    data.extend_from_slice(&short_tag_header(code::SET_BACKGROUND_COLOR, 10));
    data.extend_from_slice(&[0, 0, 0]);

    let mut r = TagReader::new(&data, ReaderFlags::strict());
    assert!(r.next_tag().is_err());
}

#[test]
fn truncated_body_clamps_in_forgiving_mode() {
    let mut data = Vec::new();
    data.extend_from_slice(&short_tag_header(code::SET_BACKGROUND_COLOR, 10));
    data.extend_from_slice(&[0, 0, 0]);

    let mut r = TagReader::new(&data, ReaderFlags::forgiving());
    let t = r.next_tag().unwrap().unwrap();
    assert_eq!(t.body_len, 3);
}

#[test]
fn body_reader_is_bounded_to_tag_body() {
    let mut data = Vec::new();
    data.extend_from_slice(&short_tag_header(code::SET_BACKGROUND_COLOR, 3));
    data.extend_from_slice(&[0x11, 0x22, 0x33]);
    data.extend_from_slice(&short_tag_header(code::END, 0));

    let mut r = TagReader::new(&data, ReaderFlags::strict());
    let t = r.next_tag().unwrap().unwrap();
    let mut body = r.body_reader(&t, ReaderFlags::strict());
    assert_eq!(body.read_u8().unwrap(), 0x11);
    assert_eq!(body.remaining_bytes(), 2);
}
