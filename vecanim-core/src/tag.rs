//! Tag-stream traversal (spec §4.2).
//!
//! A container body is a sequence of tags, each framed by a 16-bit
//! code+length field (with an optional 32-bit extended length), terminated
//! by a zero-code `End` tag. [`TagReader`] exposes tag headers as an
//! iterator and resolves character-id → defining-tag lookups lazily.

use std::collections::HashMap;

use crate::bitreader::{BitReader, ReaderFlags};
use crate::foundation::core::CharacterId;
use crate::foundation::error::{VecanimError, VecanimResult};

/// Well-known tag codes this engine gives first-class treatment to. Codes
/// outside this list are not malformed — they are valid but unrecognized,
/// and are surfaced to callers as [`TagHeader::code`] for best-effort
/// pass-through or as a logged "unknown tag" condition in strict mode.
#[allow(dead_code)]
pub mod code {
    pub const END: u16 = 0;
    pub const SHOW_FRAME: u16 = 1;
    pub const DEFINE_SHAPE: u16 = 2;
    pub const PLACE_OBJECT: u16 = 4;
    pub const REMOVE_OBJECT: u16 = 5;
    pub const DEFINE_BITS: u16 = 6;
    pub const DEFINE_BUTTON: u16 = 7;
    pub const JPEG_TABLES: u16 = 8;
    pub const SET_BACKGROUND_COLOR: u16 = 9;
    pub const DEFINE_FONT: u16 = 10;
    pub const DEFINE_TEXT: u16 = 11;
    pub const DO_ACTION: u16 = 12;
    pub const DEFINE_FONT_INFO: u16 = 13;
    pub const DEFINE_SOUND: u16 = 14;
    pub const START_SOUND: u16 = 15;
    pub const SOUND_STREAM_HEAD: u16 = 18;
    pub const DEFINE_BITS_LOSSLESS: u16 = 20;
    pub const DEFINE_BITS_JPEG2: u16 = 21;
    pub const DEFINE_SHAPE2: u16 = 22;
    pub const PROTECT: u16 = 24;
    pub const PLACE_OBJECT2: u16 = 26;
    pub const REMOVE_OBJECT2: u16 = 28;
    pub const DEFINE_SHAPE3: u16 = 32;
    pub const DEFINE_TEXT2: u16 = 33;
    pub const DEFINE_BUTTON2: u16 = 34;
    pub const DEFINE_BITS_JPEG3: u16 = 35;
    pub const DEFINE_BITS_LOSSLESS2: u16 = 36;
    pub const DEFINE_EDIT_TEXT: u16 = 37;
    pub const DEFINE_SPRITE: u16 = 39;
    pub const FRAME_LABEL: u16 = 43;
    pub const SOUND_STREAM_HEAD2: u16 = 45;
    pub const DEFINE_MORPH_SHAPE: u16 = 46;
    pub const DEFINE_FONT2: u16 = 48;
    pub const EXPORT_ASSETS: u16 = 56;
    pub const IMPORT_ASSETS: u16 = 57;
    pub const ENABLE_DEBUGGER: u16 = 58;
    pub const DO_INIT_ACTION: u16 = 59;
    pub const DEFINE_VIDEO_STREAM: u16 = 60;
    pub const VIDEO_FRAME: u16 = 61;
    pub const DEFINE_FONT_INFO2: u16 = 62;
    pub const SCRIPT_LIMITS: u16 = 65;
    pub const SET_TAB_INDEX: u16 = 66;
    pub const FILE_ATTRIBUTES: u16 = 69;
    pub const PLACE_OBJECT3: u16 = 70;
    pub const IMPORT_ASSETS2: u16 = 71;
    pub const DEFINE_FONT_ALIGN_ZONES: u16 = 73;
    pub const DEFINE_FONT3: u16 = 75;
    pub const SYMBOL_CLASS: u16 = 76;
    pub const METADATA: u16 = 77;
    pub const DEFINE_SCALING_GRID: u16 = 78;
    pub const DO_ABC: u16 = 82;
    pub const DEFINE_SHAPE4: u16 = 83;
    pub const DEFINE_MORPH_SHAPE2: u16 = 84;
    pub const DEFINE_SCENE_AND_FRAME_LABEL_DATA: u16 = 86;
    pub const DEFINE_BINARY_DATA: u16 = 87;
    pub const DEFINE_FONT_NAME: u16 = 88;
    pub const START_SOUND2: u16 = 89;
    pub const DEFINE_BITS_JPEG4: u16 = 90;
    pub const DEFINE_FONT4: u16 = 91;
    pub const ENABLE_TELEMETRY: u16 = 93;
}

/// One tag header: code, absolute body offset/length, and (for definition
/// tags) the character id it defines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TagHeader {
    pub code: u16,
    pub body_offset: usize,
    pub body_len: usize,
    pub character_id: Option<CharacterId>,
}

impl TagHeader {
    pub fn is_end(&self) -> bool {
        self.code == code::END
    }
}

/// Tags whose body begins with a 16-bit character id (spec §4.2: "For
/// definition tags whose first two bytes are a character-id, peek the id
/// for indexing").
fn defines_character(tag_code: u16) -> bool {
    matches!(
        tag_code,
        code::DEFINE_SHAPE
            | code::DEFINE_SHAPE2
            | code::DEFINE_SHAPE3
            | code::DEFINE_SHAPE4
            | code::DEFINE_MORPH_SHAPE
            | code::DEFINE_MORPH_SHAPE2
            | code::DEFINE_SPRITE
            | code::DEFINE_BITS
            | code::DEFINE_BITS_LOSSLESS
            | code::DEFINE_BITS_LOSSLESS2
            | code::DEFINE_BITS_JPEG2
            | code::DEFINE_BITS_JPEG3
            | code::DEFINE_BITS_JPEG4
            | code::DEFINE_FONT
            | code::DEFINE_FONT2
            | code::DEFINE_FONT3
            | code::DEFINE_FONT4
            | code::DEFINE_TEXT
            | code::DEFINE_TEXT2
            | code::DEFINE_EDIT_TEXT
            | code::DEFINE_BUTTON
            | code::DEFINE_BUTTON2
            | code::DEFINE_SOUND
            | code::DEFINE_VIDEO_STREAM
            | code::DEFINE_BINARY_DATA
    )
}

/// Traverses a tag stream, yielding [`TagHeader`]s and resolving
/// character-id → defining-tag lookups.
pub struct TagReader<'a> {
    data: &'a [u8],
    end: usize,
    pos: usize,
    flags: ReaderFlags,
    stopped: bool,
    index: Option<HashMap<CharacterId, TagHeader>>,
}

impl<'a> TagReader<'a> {
    pub fn new(data: &'a [u8], flags: ReaderFlags) -> Self {
        Self {
            data,
            end: data.len(),
            pos: 0,
            flags,
            stopped: false,
            index: None,
        }
    }

    /// Read the next tag header, or `None` once the `End` tag or declared
    /// end has been reached. Iteration always terminates on `End` even if
    /// the caller's declared length implies more data follows (spec §3).
    pub fn next_tag(&mut self) -> VecanimResult<Option<TagHeader>> {
        if self.stopped || self.pos >= self.end {
            return Ok(None);
        }

        let mut r = BitReader::bounded_at(self.data, self.pos, self.end, self.flags);
        let packed = r.read_u16_le()?;
        let tag_code = packed >> 6;
        let short_len = packed & 0x3F;
        let body_len = if short_len == 0x3F {
            r.read_u32_le()? as usize
        } else {
            short_len as usize
        };
        let body_offset = r.tell_bytes();

        if body_offset + body_len > self.end {
            if self.flags.contains(ReaderFlags::OUT_OF_BOUNDS) {
                return Err(VecanimError::out_of_bounds(format!(
                    "tag {tag_code} declares body past end of stream"
                )));
            }
            tracing::warn!(tag_code, "tag body truncated to remaining bytes");
        }
        let clamped_len = body_len.min(self.end.saturating_sub(body_offset));

        let character_id = if defines_character(tag_code) && clamped_len >= 2 {
            let mut peek =
                BitReader::bounded_at(self.data, body_offset, self.end, ReaderFlags::forgiving());
            Some(CharacterId(peek.read_u16_le()?))
        } else {
            None
        };

        let header = TagHeader {
            code: tag_code,
            body_offset,
            body_len: clamped_len,
            character_id,
        };

        self.pos = body_offset + clamped_len;
        if header.is_end() {
            self.stopped = true;
        }
        Ok(Some(header))
    }

    /// Produce a `BitReader` bounded to a tag's body.
    pub fn body_reader(&self, tag: &TagHeader, flags: ReaderFlags) -> BitReader<'a> {
        BitReader::bounded_at(self.data, tag.body_offset, tag.body_offset + tag.body_len, flags)
    }

    /// Lookup a character's defining tag, building the identifier → offset
    /// index on first call (spec §4.2).
    pub fn lookup(&mut self, id: CharacterId) -> VecanimResult<Option<TagHeader>> {
        if self.index.is_none() {
            self.build_index()?;
        }
        Ok(self.index.as_ref().unwrap().get(&id).copied())
    }

    fn build_index(&mut self) -> VecanimResult<()> {
        let saved_pos = self.pos;
        let saved_stopped = self.stopped;
        self.pos = 0;
        self.stopped = false;

        let mut map = HashMap::new();
        while let Some(tag) = self.next_tag()? {
            if let Some(id) = tag.character_id {
                // First definition wins (spec §3: duplicate ids are
                // malformed input; spec §7: "first one wins").
                map.entry(id).or_insert(tag);
            }
        }

        self.pos = saved_pos;
        self.stopped = saved_stopped;
        self.index = Some(map);
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/unit/tag.rs"]
mod tests;
