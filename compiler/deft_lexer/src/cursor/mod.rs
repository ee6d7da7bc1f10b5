//! Byte cursor over template or expression source.
//!
//! Reads past the end return `0x00`, so scanning loops terminate on the
//! first out-of-range byte without separate bounds checks. Source text is
//! never expected to contain interior nulls; where it does, `is_eof`
//! compares the position against the length to tell them apart.

/// Cursor over a `&str`, advanced byte by byte.
///
/// The cursor is [`Copy`], enabling cheap state snapshots for backtracking.
#[derive(Clone, Copy, Debug)]
pub struct Cursor<'a> {
    src: &'a str,
    pos: u32,
}

impl<'a> Cursor<'a> {
    /// Create a cursor at offset 0.
    pub fn new(src: &'a str) -> Self {
        debug_assert!(u32::try_from(src.len()).is_ok(), "source exceeds 4 GiB");
        Cursor { src, pos: 0 }
    }

    /// Create a cursor positioned at `pos`.
    pub fn at(src: &'a str, pos: u32) -> Self {
        Cursor { src, pos }
    }

    #[inline]
    fn byte_at(&self, pos: u32) -> u8 {
        self.src.as_bytes().get(pos as usize).copied().unwrap_or(0)
    }

    /// Byte at the current position (`0x00` at EOF).
    #[inline]
    pub fn current(&self) -> u8 {
        self.byte_at(self.pos)
    }

    /// Byte one position ahead of current.
    #[inline]
    pub fn peek(&self) -> u8 {
        self.byte_at(self.pos + 1)
    }

    /// Byte two positions ahead of current.
    #[inline]
    pub fn peek2(&self) -> u8 {
        self.byte_at(self.pos + 2)
    }

    /// Advance the cursor by one byte.
    #[inline]
    pub fn advance(&mut self) {
        self.pos += 1;
    }

    /// Advance the cursor by `n` bytes.
    #[inline]
    pub fn advance_n(&mut self, n: u32) {
        self.pos += n;
    }

    /// Advance past one full UTF-8 character.
    #[inline]
    pub fn advance_char(&mut self) {
        let width = match self.current() {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => 1,
        };
        self.advance_n(width);
    }

    /// Current character, if any.
    pub fn current_char(&self) -> Option<char> {
        self.src.get(self.pos as usize..)?.chars().next()
    }

    /// Returns `true` once the cursor has consumed the whole source.
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos as usize >= self.src.len()
    }

    /// Current byte offset in the source.
    #[inline]
    pub fn pos(&self) -> u32 {
        self.pos
    }

    /// Move to an absolute offset.
    #[inline]
    pub fn set_pos(&mut self, pos: u32) {
        self.pos = pos;
    }

    /// Length of the source in bytes.
    #[allow(
        clippy::cast_possible_truncation,
        reason = "source length is checked against u32 on construction"
    )]
    pub fn source_len(&self) -> u32 {
        self.src.len() as u32
    }

    /// Source substring between two offsets.
    ///
    /// Offsets come from the cursor's own boundary tracking and always fall
    /// on character boundaries; anything else yields an empty slice.
    pub fn slice(&self, start: u32, end: u32) -> &'a str {
        self.src.get(start as usize..end as usize).unwrap_or("")
    }

    /// Source substring from `start` to the current position.
    pub fn slice_from(&self, start: u32) -> &'a str {
        self.slice(start, self.pos)
    }

    /// Remaining source from the current position.
    pub fn rest(&self) -> &'a str {
        self.src.get(self.pos as usize..).unwrap_or("")
    }

    /// Whether the remaining source starts with `prefix`.
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.rest().starts_with(prefix)
    }

    /// Advance while `pred` returns `true` for the current byte.
    ///
    /// `pred(0)` must return `false`.
    #[inline]
    pub fn eat_while(&mut self, pred: impl Fn(u8) -> bool) {
        while pred(self.current()) {
            self.pos += 1;
        }
    }

    /// Skip spaces, tabs, and line breaks.
    pub fn eat_whitespace(&mut self) {
        self.eat_while(|b| b.is_ascii_whitespace());
    }

    /// Advance to the next occurrence of `needle`, or to EOF.
    ///
    /// Returns `true` if the byte was found.
    #[allow(
        clippy::cast_possible_truncation,
        reason = "offset < source_len which fits in u32"
    )]
    pub fn eat_until(&mut self, needle: u8) -> bool {
        match memchr::memchr(needle, self.rest().as_bytes()) {
            Some(offset) => {
                self.pos += offset as u32;
                true
            }
            None => {
                self.pos = self.source_len();
                false
            }
        }
    }

    /// Advance to the next occurrence of any of three bytes, or to EOF.
    #[allow(
        clippy::cast_possible_truncation,
        reason = "offset < source_len which fits in u32"
    )]
    pub fn eat_until3(&mut self, a: u8, b: u8, c: u8) -> bool {
        match memchr::memchr3(a, b, c, self.rest().as_bytes()) {
            Some(offset) => {
                self.pos += offset as u32;
                true
            }
            None => {
                self.pos = self.source_len();
                false
            }
        }
    }
}
