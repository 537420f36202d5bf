use super::*;

#[test]
fn reads_le_primitives_and_aligns_bits() {
    let data = [0x01, 0x02, 0x03, 0x04, 0xFF, 0xFF];
    let mut r = BitReader::new(&data, ReaderFlags::strict());
    assert_eq!(r.read_u8().unwrap(), 0x01);
    assert_eq!(r.read_u16_le().unwrap(), 0x0403);
    assert_eq!(r.tell_bytes(), 3);
}

#[test]
fn bit_reads_are_msb_first() {
    // 0b1011_0000
    let data = [0b1011_0000];
    let mut r = BitReader::new(&data, ReaderFlags::strict());
    assert_eq!(r.read_bit().unwrap(), true);
    assert_eq!(r.read_bit().unwrap(), false);
    assert_eq!(r.read_bit().unwrap(), true);
    assert_eq!(r.read_bit().unwrap(), true);
}

#[test]
fn ubits_zero_width_reads_zero_without_advancing() {
    let data = [0xFF];
    let mut r = BitReader::new(&data, ReaderFlags::strict());
    assert_eq!(r.read_ubits(0).unwrap(), 0);
    assert_eq!(r.read_ubits(8).unwrap(), 0xFF);
}

#[test]
fn sbits_two_complement() {
    // 5-bit field: 0b11110 = -2
    let data = [0b1111_0000];
    let mut r = BitReader::new(&data, ReaderFlags::strict());
    assert_eq!(r.read_sbits(5).unwrap(), -2);
}

#[test]
fn byte_aligned_primitive_flushes_partial_bits() {
    let data = [0b1000_0000, 0xAB];
    let mut r = BitReader::new(&data, ReaderFlags::strict());
    assert_eq!(r.read_bit().unwrap(), true);
    // One bit consumed from byte 0; a byte-aligned read must skip the rest
    // of that byte and start at byte 1.
    assert_eq!(r.read_u8().unwrap(), 0xAB);
}

#[test]
fn out_of_bounds_fails_in_strict_mode() {
    let data = [0x01];
    let mut r = BitReader::new(&data, ReaderFlags::strict());
    let _ = r.read_u8().unwrap();
    assert!(r.read_u8().is_err());
}

#[test]
fn out_of_bounds_clamps_to_zero_in_forgiving_mode() {
    let data = [0x01];
    let mut r = BitReader::new(&data, ReaderFlags::forgiving());
    let _ = r.read_u8().unwrap();
    assert_eq!(r.read_u8().unwrap(), 0);
    assert_eq!(r.read_u32_le().unwrap(), 0);
}

#[test]
fn fixed_point_readers_scale_correctly() {
    let mut data = Vec::new();
    data.extend_from_slice(&(1i16 << 8).to_le_bytes()); // 1.0 in 8.8
    data.extend_from_slice(&(1i32 << 16).to_le_bytes()); // 1.0 in 16.16
    let mut r = BitReader::new(&data, ReaderFlags::strict());
    assert_eq!(r.read_fixed8_8().unwrap(), 1.0);
    assert_eq!(r.read_fixed16_16().unwrap(), 1.0);
}

#[test]
fn f64_swapped_matches_manual_half_swap() {
    let value: f64 = 12345.625;
    let bytes = value.to_le_bytes();
    let mut swapped = [0u8; 8];
    swapped[0..4].copy_from_slice(&bytes[4..8]);
    swapped[4..8].copy_from_slice(&bytes[0..4]);

    let mut r = BitReader::new(&swapped, ReaderFlags::strict());
    assert_eq!(r.read_f64_swapped().unwrap(), value);
}

#[test]
fn cstring_reads_until_nul() {
    let data = b"hello\0world";
    let mut r = BitReader::new(data, ReaderFlags::strict());
    assert_eq!(r.read_cstring().unwrap(), "hello");
    assert_eq!(r.tell_bytes(), 6);
}

#[test]
fn chunk_shares_buffer_and_bounds_view() {
    let data = [1, 2, 3, 4, 5];
    let r = BitReader::new(&data, ReaderFlags::strict());
    let mut sub = r.chunk(2, 4);
    assert_eq!(sub.remaining_bytes(), 2);
    assert_eq!(sub.read_u8().unwrap(), 3);
    assert_eq!(sub.read_u8().unwrap(), 4);
    assert!(sub.is_exhausted());
}

#[test]
fn inflate_round_trips_zlib_payload() {
    use std::io::Write;
    let mut enc = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    enc.write_all(b"hello vecanim").unwrap();
    let compressed = enc.finish().unwrap();

    let mut r = BitReader::new(&compressed, ReaderFlags::strict());
    let out = r.read_inflate_to(compressed.len()).unwrap();
    assert_eq!(out, b"hello vecanim");
}
