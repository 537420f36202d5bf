use super::*;
use crate::records::{LosslessBitmapHeader, LosslessFormat};

#[test]
fn sanitize_jpeg_strips_nested_soi_and_wraps_exactly_one() {
    let data = [0xFFu8, 0xD8, 0xFF, 0xD8, 0xAA, 0xBB, 0xFF, 0xD9, 0xFF, 0xD9];
    let out = sanitize_jpeg(&data);
    assert_eq!(&out[0..2], &[0xFF, 0xD8]);
    assert_eq!(&out[out.len() - 2..], &[0xFF, 0xD9]);
    // only the two leftover raw bytes should remain between the markers
    let inner = &out[2..out.len() - 2];
    assert_eq!(inner, &[0xAA, 0xBB]);
}

#[test]
fn unpremultiply_channel_collapses_zero_alpha_to_zero() {
    assert_eq!(unpremultiply_channel(200, 0), 0);
    assert_eq!(unpremultiply_channel(128, 255), 128);
}

#[test]
fn lossless_rgb24_round_trips_to_straight_rgba() {
    // 2x1 image: pixel 0 = red, pixel 1 = green (padding byte XX is ignored).
    let inflated = vec![0xAAu8, 0xFF, 0x00, 0x00, 0xAA, 0x00, 0xFF, 0x00];
    let header = LosslessBitmapHeader {
        format: LosslessFormat::Rgb24,
        width: 2,
        height: 1,
        color_table_size: None,
    };
    let decoded = decode_lossless(&header, &inflated).unwrap();
    assert_eq!(
        decoded.rgba,
        vec![0xFF, 0x00, 0x00, 0xFF, 0x00, 0xFF, 0x00, 0xFF]
    );
}

#[test]
fn lossless_palettized_maps_indices_through_table() {
    // 2 colors (table_size=1 -> 2 entries), 2x1 image, row padded to 4 bytes.
    let mut inflated = vec![10u8, 20, 30, 40, 50, 60];
    inflated.extend_from_slice(&[0, 1, 0, 0]); // row: idx0, idx1, padding
    let header = LosslessBitmapHeader {
        format: LosslessFormat::Palettized8,
        width: 2,
        height: 1,
        color_table_size: Some(1),
    };
    let decoded = decode_lossless(&header, &inflated).unwrap();
    assert_eq!(
        decoded.rgba,
        vec![10, 20, 30, 255, 40, 50, 60, 255]
    );
}

#[test]
fn encode_png_round_trips_through_zlib_inflate() {
    use std::io::Read;

    let rgba = vec![0xFFu8, 0x00, 0x00, 0xFF, 0x00, 0xFF, 0x00, 0xFF];
    let png = encode_png(2, 1, &rgba);
    assert_eq!(&png[0..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);

    // IHDR chunk directly follows the signature: 4-byte length, "IHDR", 13
    // bytes of fields, 4-byte CRC.
    let ihdr = &png[8 + 8..8 + 8 + 13];
    let width = u32::from_be_bytes(ihdr[0..4].try_into().unwrap());
    let height = u32::from_be_bytes(ihdr[4..8].try_into().unwrap());
    assert_eq!(width, 2);
    assert_eq!(height, 1);
    assert_eq!(ihdr[8], 8); // bit depth
    assert_eq!(ihdr[9], 6); // RGBA color type

    let ihdr_chunk_end = 8 + 4 + 4 + 13 + 4; // signature + (len+type+data+crc)
    let idat_len =
        u32::from_be_bytes(png[ihdr_chunk_end..ihdr_chunk_end + 4].try_into().unwrap()) as usize;
    let idat_start = ihdr_chunk_end + 4 + 4; // skip this chunk's len + type
    let idat = &png[idat_start..idat_start + idat_len];
    let mut decoder = flate2::read::ZlibDecoder::new(idat);
    let mut raw = Vec::new();
    decoder.read_to_end(&mut raw).unwrap();

    // Each scanline has a leading filter-type byte (0 = none).
    assert_eq!(raw[0], 0);
    assert_eq!(&raw[1..5], &rgba[0..4]);
    assert_eq!(raw[5], 0);
    assert_eq!(&raw[6..10], &rgba[4..8]);
}
