//! Bit/byte-oriented reader over a byte slice (spec §4.1).
//!
//! A [`BitReader`] never panics on malformed or truncated input. Instead each
//! instance carries a [`ReaderFlags`] mask selecting which of the five
//! semantic error kinds (spec §7) should fail with [`VecanimError`] versus
//! silently clamp to a conservative default. Structural headers are read in
//! strict mode; optional tag bodies are read in forgiving mode so one
//! malformed record does not abort the whole container.

use std::io::Read;

use crate::foundation::error::{VecanimError, VecanimResult};

bitflags::bitflags! {
    /// Selects which semantic error kinds a [`BitReader`] fails on instead of
    /// silently clamping (spec §4.1, §7).
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ReaderFlags: u8 {
        const OUT_OF_BOUNDS  = 0b0000_0001;
        const MALFORMED      = 0b0000_0010;
        const EXTRA_DATA     = 0b0000_0100;
        const UNKNOWN_TAG     = 0b0000_1000;
        const UNPROCESSABLE  = 0b0001_0000;
    }
}

impl ReaderFlags {
    /// No kind fails; every condition clamps or truncates. Used for optional
    /// tag bodies.
    pub fn forgiving() -> Self {
        ReaderFlags::empty()
    }

    /// Every kind fails. Used for structural headers (container header, tag
    /// framing).
    pub fn strict() -> Self {
        ReaderFlags::all()
    }
}

/// A bit/byte cursor over `data[.. end]`. Cloning is cheap (no owned buffer).
#[derive(Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    end: usize,
    byte_pos: usize,
    bit_pos: u8,
    pub flags: ReaderFlags,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8], flags: ReaderFlags) -> Self {
        Self::bounded(data, data.len(), flags)
    }

    /// A reader bounded to `[0, end)` of `data`, clamping `end` to the slice
    /// length.
    pub fn bounded(data: &'a [u8], end: usize, flags: ReaderFlags) -> Self {
        Self {
            data,
            end: end.min(data.len()),
            byte_pos: 0,
            bit_pos: 0,
            flags,
        }
    }

    pub fn tell_bytes(&self) -> usize {
        self.byte_pos
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn seek_bytes(&mut self, pos: usize) {
        self.byte_pos = pos.min(self.end);
        self.bit_pos = 0;
    }

    pub fn remaining_bytes(&self) -> usize {
        self.end.saturating_sub(self.byte_pos)
    }

    pub fn is_exhausted(&self) -> bool {
        self.byte_pos >= self.end
    }

    /// Flushes any partial bit state. A byte-aligned read always calls this
    /// first (spec §4.1: "reading a byte-aligned primitive implicitly
    /// flushes any partial bit state").
    pub fn byte_align(&mut self) {
        if self.bit_pos != 0 {
            self.byte_pos += 1;
            self.bit_pos = 0;
        }
    }

    /// Derive a chunked view over `[offset, end)` sharing the same buffer
    /// (spec §4.1).
    pub fn chunk(&self, offset: usize, end: usize) -> BitReader<'a> {
        BitReader::bounded(self.data, end, self.flags).with_start(offset)
    }

    /// A reader over `data` bounded to `[start, end)`, cursor positioned at
    /// `start`.
    pub fn bounded_at(data: &'a [u8], start: usize, end: usize, flags: ReaderFlags) -> Self {
        Self::bounded(data, end, flags).with_start(start)
    }

    fn with_start(mut self, offset: usize) -> Self {
        self.byte_pos = offset.min(self.end);
        self
    }

    /// Report an out-of-bounds condition: error in strict mode, or clamp the
    /// cursor to `end` in forgiving mode so repeated reads keep returning
    /// defaults rather than re-triggering per call.
    fn hit_end(&mut self, what: &str) -> VecanimResult<()> {
        if self.flags.contains(ReaderFlags::OUT_OF_BOUNDS) {
            return Err(VecanimError::out_of_bounds(what.to_string()));
        }
        self.byte_pos = self.end;
        self.bit_pos = 0;
        Ok(())
    }

    fn take_bytes(&mut self, n: usize) -> VecanimResult<&'a [u8]> {
        self.byte_align();
        if self.byte_pos + n > self.end {
            self.hit_end("byte read past end of view")?;
            return Ok(&[]);
        }
        let slice = &self.data[self.byte_pos..self.byte_pos + n];
        self.byte_pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> VecanimResult<u8> {
        Ok(self.take_bytes(1)?.first().copied().unwrap_or(0))
    }

    pub fn read_i8(&mut self) -> VecanimResult<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16_le(&mut self) -> VecanimResult<u16> {
        let b = self.take_bytes(2)?;
        Ok(if b.len() == 2 {
            u16::from_le_bytes([b[0], b[1]])
        } else {
            0
        })
    }

    pub fn read_i16_le(&mut self) -> VecanimResult<i16> {
        Ok(self.read_u16_le()? as i16)
    }

    pub fn read_u32_le(&mut self) -> VecanimResult<u32> {
        let b = self.take_bytes(4)?;
        Ok(if b.len() == 4 {
            u32::from_le_bytes([b[0], b[1], b[2], b[3]])
        } else {
            0
        })
    }

    pub fn read_i32_le(&mut self) -> VecanimResult<i32> {
        Ok(self.read_u32_le()? as i32)
    }

    /// Signed 8.8 fixed-point (spec §4.1).
    pub fn read_fixed8_8(&mut self) -> VecanimResult<f64> {
        Ok(f64::from(self.read_i16_le()?) / 256.0)
    }

    /// Signed 16.16 fixed-point (spec §4.1).
    pub fn read_fixed16_16(&mut self) -> VecanimResult<f64> {
        Ok(f64::from(self.read_i32_le()?) / 65536.0)
    }

    pub fn read_f32(&mut self) -> VecanimResult<f32> {
        Ok(f32::from_bits(self.read_u32_le()?))
    }

    pub fn read_f64(&mut self) -> VecanimResult<f64> {
        let b = self.take_bytes(8)?;
        if b.len() != 8 {
            return Ok(0.0);
        }
        let mut arr = [0u8; 8];
        arr.copy_from_slice(b);
        Ok(f64::from_bits(u64::from_le_bytes(arr)))
    }

    /// Legacy script double convention: the low and high 32-bit halves are
    /// swapped relative to standard little-endian IEEE 754 (spec §4.1).
    pub fn read_f64_swapped(&mut self) -> VecanimResult<f64> {
        let b = self.take_bytes(8)?;
        if b.len() != 8 {
            return Ok(0.0);
        }
        let mut swapped = [0u8; 8];
        swapped[0..4].copy_from_slice(&b[4..8]);
        swapped[4..8].copy_from_slice(&b[0..4]);
        Ok(f64::from_bits(u64::from_le_bytes(swapped)))
    }

    fn current_byte(&self) -> u8 {
        self.data.get(self.byte_pos).copied().unwrap_or(0)
    }

    pub fn read_bit(&mut self) -> VecanimResult<bool> {
        if self.byte_pos >= self.end {
            self.hit_end("bit read past end")?;
            return Ok(false);
        }
        let byte = self.current_byte();
        let bit = (byte >> (7 - self.bit_pos)) & 1 == 1;
        self.bit_pos += 1;
        if self.bit_pos == 8 {
            self.bit_pos = 0;
            self.byte_pos += 1;
        }
        Ok(bit)
    }

    /// Unsigned bit-field of `n` bits, `n <= 32`. Most-significant-bit-first
    /// within each byte. `n == 0` reads as `0` without advancing any state
    /// (spec §8, boundary property 9).
    pub fn read_ubits(&mut self, n: u32) -> VecanimResult<u32> {
        debug_assert!(n <= 32);
        if n == 0 {
            return Ok(0);
        }
        let mut value: u32 = 0;
        for _ in 0..n {
            value = (value << 1) | u32::from(self.read_bit()?);
        }
        Ok(value)
    }

    /// Signed bit-field, two's complement relative to `n` bits (spec §4.1).
    pub fn read_sbits(&mut self, n: u32) -> VecanimResult<i32> {
        if n == 0 {
            return Ok(0);
        }
        let raw = self.read_ubits(n)?;
        let shift = 32 - n;
        Ok(((raw << shift) as i32) >> shift)
    }

    /// Signed fixed-point bit-field scaled by `1/65536` (spec §4.1).
    pub fn read_fbits(&mut self, n: u32) -> VecanimResult<f64> {
        Ok(f64::from(self.read_sbits(n)?) / 65536.0)
    }

    /// Null-terminated, single-byte-encoded string.
    pub fn read_cstring(&mut self) -> VecanimResult<String> {
        self.byte_align();
        let start = self.byte_pos;
        let mut i = start;
        while i < self.end && self.data[i] != 0 {
            i += 1;
        }
        let bytes = &self.data[start..i];
        if i < self.end {
            self.byte_pos = i + 1;
        } else if self.flags.contains(ReaderFlags::MALFORMED) {
            return Err(VecanimError::malformed("unterminated string"));
        } else {
            self.byte_pos = self.end;
        }
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Read exactly `n` raw bytes.
    pub fn read_bytes(&mut self, n: usize) -> VecanimResult<Vec<u8>> {
        Ok(self.take_bytes(n)?.to_vec())
    }

    /// Read raw bytes from the current position up to the absolute offset
    /// `to` (clamped to the view's end).
    pub fn read_to(&mut self, to: usize) -> VecanimResult<Vec<u8>> {
        self.byte_align();
        let to = to.min(self.end);
        if to < self.byte_pos {
            return Ok(Vec::new());
        }
        self.read_bytes(to - self.byte_pos)
    }

    /// Read raw bytes up to `to` and zlib-inflate them.
    pub fn read_inflate_to(&mut self, to: usize) -> VecanimResult<Vec<u8>> {
        let raw = self.read_to(to)?;
        inflate(&raw, self.flags)
    }
}

/// Zlib-inflate `data`, honoring [`ReaderFlags::MALFORMED`] for decompression
/// failure.
pub(crate) fn inflate(data: &[u8], flags: ReaderFlags) -> VecanimResult<Vec<u8>> {
    let mut decoder = flate2::read::ZlibDecoder::new(data);
    let mut out = Vec::new();
    match decoder.read_to_end(&mut out) {
        Ok(_) => Ok(out),
        Err(e) => {
            if flags.contains(ReaderFlags::MALFORMED) {
                Err(VecanimError::malformed(format!("zlib inflate failed: {e}")))
            } else {
                tracing::warn!(error = %e, "zlib inflate failed, returning partial output");
                Ok(out)
            }
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/bitreader.rs"]
mod tests;
