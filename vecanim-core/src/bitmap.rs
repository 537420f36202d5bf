//! Bitmap sub-format decoding and minimal PNG encoding (spec §4.6).

use std::io::Cursor;

use crate::bitreader::{inflate, ReaderFlags};
use crate::foundation::error::{VecanimError, VecanimResult};
use crate::records::{LosslessBitmapHeader, LosslessFormat};

/// A decoded bitmap: always normalized to 8-bit-per-channel straight RGBA.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedBitmap {
    pub width: u16,
    pub height: u16,
    pub rgba: Vec<u8>,
}

impl DecodedBitmap {
    pub fn empty() -> DecodedBitmap {
        DecodedBitmap {
            width: 0,
            height: 0,
            rgba: Vec::new(),
        }
    }
}

/// Un-premultiplies one channel against a stored alpha (spec §4.6): fully
/// transparent pixels collapse to `(0,0,0,0)`.
fn unpremultiply_channel(stored: u8, alpha: u8) -> u8 {
    if alpha == 0 {
        0
    } else {
        ((u32::from(stored) * 255) / u32::from(alpha)).min(255) as u8
    }
}

/// Walks JPEG markers (`0xFF xx`), drops nested SOI/EOI markers, and wraps
/// the result with exactly one leading SOI and trailing EOI (spec §4.6).
pub fn sanitize_jpeg(data: &[u8]) -> Vec<u8> {
    const SOI: u8 = 0xD8;
    const EOI: u8 = 0xD9;
    let mut out = Vec::with_capacity(data.len() + 4);
    out.push(0xFF);
    out.push(SOI);

    let mut i = 0;
    while i + 1 < data.len() {
        if data[i] != 0xFF {
            i += 1;
            continue;
        }
        let marker = data[i + 1];
        if marker == SOI || marker == EOI {
            i += 2;
            continue;
        }
        // Markers with no length field (TEM and the RSTn restart markers).
        if marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
            out.push(0xFF);
            out.push(marker);
            i += 2;
            continue;
        }
        if i + 3 >= data.len() {
            break;
        }
        let len = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
        let end = (i + 2 + len).min(data.len());
        out.extend_from_slice(&data[i..end]);
        if marker == 0xDA {
            // Start-of-scan: the rest of the segment is entropy-coded data,
            // not another length-prefixed segment; copy through to EOI.
            let scan_start = end;
            let mut j = scan_start;
            while j + 1 < data.len() && !(data[j] == 0xFF && data[j + 1] == EOI) {
                j += 1;
            }
            out.extend_from_slice(&data[scan_start..j.min(data.len())]);
            i = j;
            continue;
        }
        i = end;
    }

    out.push(0xFF);
    out.push(EOI);
    out
}

/// Decodes a (sanitized) JPEG stream to straight RGBA8.
pub fn decode_jpeg(data: &[u8]) -> VecanimResult<DecodedBitmap> {
    let sanitized = sanitize_jpeg(data);
    let img = image::ImageReader::new(Cursor::new(&sanitized))
        .with_guessed_format()
        .map_err(|e| VecanimError::unprocessable(format!("jpeg format sniff failed: {e}")))?
        .decode()
        .map_err(|e| VecanimError::unprocessable(format!("jpeg decode failed: {e}")))?
        .to_rgba8();
    let (width, height) = img.dimensions();
    Ok(DecodedBitmap {
        width: width as u16,
        height: height as u16,
        rgba: img.into_raw(),
    })
}

/// Decodes a JPEG plus a zlib-compressed alpha plane, un-premultiplying
/// each color channel against its pixel's alpha (spec §4.6, sub-formats 3
/// and 4 — the deblocking parameter of sub-format 4 is preserved by the
/// caller but has no effect on pixel values here).
pub fn decode_jpeg_with_alpha(jpeg_data: &[u8], alpha_data: &[u8]) -> VecanimResult<DecodedBitmap> {
    let base = decode_jpeg(jpeg_data)?;
    let alpha = inflate(alpha_data, ReaderFlags::forgiving())?;
    let pixel_count = base.width as usize * base.height as usize;
    if alpha.len() < pixel_count {
        return Ok(base);
    }

    let mut rgba = base.rgba;
    for i in 0..pixel_count {
        let a = alpha[i];
        let px = &mut rgba[i * 4..i * 4 + 4];
        px[0] = unpremultiply_channel(px[0], a);
        px[1] = unpremultiply_channel(px[1], a);
        px[2] = unpremultiply_channel(px[2], a);
        px[3] = a;
    }
    Ok(DecodedBitmap {
        width: base.width,
        height: base.height,
        rgba,
    })
}

/// Decodes a lossless bitmap payload (already zlib-inflated) per its
/// sub-format (spec §4.6).
pub fn decode_lossless(header: &LosslessBitmapHeader, inflated: &[u8]) -> VecanimResult<DecodedBitmap> {
    let width = header.width as usize;
    let height = header.height as usize;
    let rgba = match header.format {
        LosslessFormat::Palettized8 => decode_palettized(inflated, width, height, header.color_table_size),
        LosslessFormat::Rgb15 => decode_rgb15(inflated, width, height),
        LosslessFormat::Rgb24 => decode_rgb24(inflated, width, height),
        LosslessFormat::Argb32 => decode_argb32(inflated, width, height),
    };
    match rgba {
        Some(rgba) => Ok(DecodedBitmap {
            width: header.width,
            height: header.height,
            rgba,
        }),
        None => Ok(DecodedBitmap::empty()),
    }
}

fn decode_palettized(
    data: &[u8],
    width: usize,
    height: usize,
    table_size: Option<u8>,
) -> Option<Vec<u8>> {
    let entries = table_size? as usize + 1;
    // Palette entries are RGB (3 bytes); RGBA palettes are only used by the
    // "with alpha" tag variant, which this sub-format does not carry.
    let palette_bytes = entries * 3;
    if data.len() < palette_bytes {
        return None;
    }
    let palette = &data[..palette_bytes];
    let row_stride = (width + 3) & !3;
    let mut out = vec![0u8; width * height * 4];
    for y in 0..height {
        let row_start = palette_bytes + y * row_stride;
        if row_start + width > data.len() {
            break;
        }
        let row = &data[row_start..row_start + width];
        for (x, &idx) in row.iter().enumerate() {
            let p = idx as usize * 3;
            if p + 2 >= palette.len() {
                continue;
            }
            let out_idx = (y * width + x) * 4;
            out[out_idx] = palette[p];
            out[out_idx + 1] = palette[p + 1];
            out[out_idx + 2] = palette[p + 2];
            out[out_idx + 3] = 255;
        }
    }
    Some(out)
}

fn decode_rgb15(data: &[u8], width: usize, height: usize) -> Option<Vec<u8>> {
    let row_stride = (width * 2 + 3) & !3;
    let mut out = vec![0u8; width * height * 4];
    for y in 0..height {
        let row_start = y * row_stride;
        for x in 0..width {
            let off = row_start + x * 2;
            if off + 1 >= data.len() {
                break;
            }
            let pixel = u16::from_be_bytes([data[off], data[off + 1]]);
            let r5 = ((pixel >> 10) & 0x1F) as u32;
            let g5 = ((pixel >> 5) & 0x1F) as u32;
            let b5 = (pixel & 0x1F) as u32;
            let out_idx = (y * width + x) * 4;
            out[out_idx] = ((r5 * 255) / 31) as u8;
            out[out_idx + 1] = ((g5 * 255) / 31) as u8;
            out[out_idx + 2] = ((b5 * 255) / 31) as u8;
            out[out_idx + 3] = 255;
        }
    }
    Some(out)
}

fn decode_rgb24(data: &[u8], width: usize, height: usize) -> Option<Vec<u8>> {
    let row_stride = ((width * 4) + 3) & !3;
    let mut out = vec![0u8; width * height * 4];
    for y in 0..height {
        let row_start = y * row_stride;
        for x in 0..width {
            let off = row_start + x * 4;
            if off + 3 >= data.len() {
                break;
            }
            // One leading padding byte, then R, G, B.
            let out_idx = (y * width + x) * 4;
            out[out_idx] = data[off + 1];
            out[out_idx + 1] = data[off + 2];
            out[out_idx + 2] = data[off + 3];
            out[out_idx + 3] = 255;
        }
    }
    Some(out)
}

fn decode_argb32(data: &[u8], width: usize, height: usize) -> Option<Vec<u8>> {
    let row_stride = width * 4;
    let mut out = vec![0u8; width * height * 4];
    for y in 0..height {
        let row_start = y * row_stride;
        for x in 0..width {
            let off = row_start + x * 4;
            if off + 3 >= data.len() {
                break;
            }
            let a = data[off];
            let out_idx = (y * width + x) * 4;
            out[out_idx] = unpremultiply_channel(data[off + 1], a);
            out[out_idx + 1] = unpremultiply_channel(data[off + 2], a);
            out[out_idx + 2] = unpremultiply_channel(data[off + 3], a);
            out[out_idx + 3] = a;
        }
    }
    Some(out)
}

/// Minimal PNG writer: signature, one IHDR, one IDAT of zlib-deflated
/// filter-0 scanlines, IEND (spec §4.6).
pub fn encode_png(width: u16, height: u16, rgba: &[u8]) -> Vec<u8> {
    const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    let mut out = Vec::with_capacity(rgba.len() + 64);
    out.extend_from_slice(&SIGNATURE);

    let mut ihdr = Vec::with_capacity(13);
    ihdr.extend_from_slice(&(width as u32).to_be_bytes());
    ihdr.extend_from_slice(&(height as u32).to_be_bytes());
    ihdr.push(8); // bit depth
    ihdr.push(6); // color type: RGBA
    ihdr.push(0); // compression
    ihdr.push(0); // filter
    ihdr.push(0); // interlace
    write_chunk(&mut out, b"IHDR", &ihdr);

    let row_bytes = width as usize * 4;
    let mut raw = Vec::with_capacity((row_bytes + 1) * height as usize);
    for y in 0..height as usize {
        raw.push(0); // filter type 0 (none)
        let start = y * row_bytes;
        raw.extend_from_slice(&rgba[start..start + row_bytes]);
    }

    let compressed = deflate(&raw);
    write_chunk(&mut out, b"IDAT", &compressed);
    write_chunk(&mut out, b"IEND", &[]);
    out
}

fn deflate(raw: &[u8]) -> Vec<u8> {
    use std::io::Write;
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    let _ = encoder.write_all(raw);
    encoder.finish().unwrap_or_default()
}

fn write_chunk(out: &mut Vec<u8>, kind: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(kind);
    hasher.update(data);
    out.extend_from_slice(kind);
    out.extend_from_slice(data);
    out.extend_from_slice(&hasher.finalize().to_be_bytes());
}

#[cfg(test)]
#[path = "../tests/unit/bitmap.rs"]
mod tests;
