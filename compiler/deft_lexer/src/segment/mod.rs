//! Template segmenter.
//!
//! Splits template source into text, `{{ expression }}` and `{% statement %}`
//! segments. Comments (`{# ... #}`) are dropped. The body of a
//! `{% raw %}...{% endraw %}` block comes back as a single [`SegmentKind::Raw`]
//! segment, untouched.
//!
//! # Whitespace control
//!
//! A `-` just inside any delimiter (`{{-`, `-%}`, `{#-` ...) strips all
//! whitespace on that side, up to the neighbouring segment.
//!
//! # Closers
//!
//! Closing delimiters are searched quote-aware and brace-balanced:
//! `{{ '}}' }}` is one expression whose text is `'}}'`, and so is
//! `{{ {'a': {'b': 1}} }}`.

use deft_ir::Span;

use crate::cursor::Cursor;
use crate::error::{LexError, LexErrorKind};

/// What a segment holds.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum SegmentKind {
    /// Literal template text.
    Text,
    /// Inner text of `{{ ... }}`.
    Expression,
    /// Inner text of `{% ... %}`.
    Statement,
    /// Verbatim body of a raw block.
    Raw,
}

/// A piece of template source.
///
/// For expressions and statements, `text` is the trimmed inner source and
/// `span` covers exactly that text. For the other kinds `span` covers `text`
/// as it appears in the source (after whitespace control).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Segment<'a> {
    pub kind: SegmentKind,
    pub text: &'a str,
    pub span: Span,
}

/// Split template source into segments.
pub fn segment(src: &str) -> Result<Vec<Segment<'_>>, LexError> {
    Segmenter::new(src).run()
}

struct Segmenter<'a> {
    cursor: Cursor<'a>,
    segments: Vec<Segment<'a>>,
    /// The previous delimiter asked for leading whitespace of the next text
    /// to be stripped.
    trim_next: bool,
}

#[derive(Copy, Clone, Eq, PartialEq)]
enum Delim {
    Expression,
    Statement,
    Comment,
}

impl Delim {
    fn from_byte(b: u8) -> Option<Self> {
        match b {
            b'{' => Some(Delim::Expression),
            b'%' => Some(Delim::Statement),
            b'#' => Some(Delim::Comment),
            _ => None,
        }
    }

    /// First byte of the closer; the second is always `}`.
    fn close_byte(self) -> u8 {
        match self {
            Delim::Expression => b'}',
            Delim::Statement => b'%',
            Delim::Comment => b'#',
        }
    }

    fn unterminated(self) -> LexErrorKind {
        match self {
            Delim::Expression => LexErrorKind::UnterminatedExpression,
            Delim::Statement => LexErrorKind::UnterminatedTag,
            Delim::Comment => LexErrorKind::UnterminatedComment,
        }
    }
}

impl<'a> Segmenter<'a> {
    fn new(src: &'a str) -> Self {
        Segmenter {
            cursor: Cursor::new(src),
            segments: Vec::new(),
            trim_next: false,
        }
    }

    fn run(mut self) -> Result<Vec<Segment<'a>>, LexError> {
        loop {
            let text_start = self.cursor.pos();
            let Some((open, delim)) = self.find_open() else {
                let end = self.cursor.source_len();
                self.push_text(text_start, end, false);
                return Ok(self.segments);
            };

            self.cursor.set_pos(open + 2);
            let trim_prev = self.cursor.current() == b'-';
            if trim_prev {
                self.cursor.advance();
            }
            self.push_text(text_start, open, trim_prev);

            let inner_start = self.cursor.pos();
            let close = self.find_close(delim, open)?;
            let trim_after = close > inner_start && self.cursor.slice(close - 1, close) == "-";
            let inner_end = if trim_after { close - 1 } else { close };
            self.cursor.set_pos(close + 2);
            self.trim_next = trim_after;

            match delim {
                Delim::Comment => {}
                Delim::Expression => {
                    self.push_inner(SegmentKind::Expression, inner_start, inner_end);
                }
                Delim::Statement => {
                    self.push_inner(SegmentKind::Statement, inner_start, inner_end);
                    if self.cursor.slice(inner_start, inner_end).trim() == "raw" {
                        self.segments.pop();
                        self.raw_block(open)?;
                    }
                }
            }
        }
    }

    /// Find the next `{{`, `{%` or `{#` at or after the cursor.
    fn find_open(&mut self) -> Option<(u32, Delim)> {
        loop {
            if !self.cursor.eat_until(b'{') {
                return None;
            }
            if let Some(delim) = Delim::from_byte(self.cursor.peek()) {
                return Some((self.cursor.pos(), delim));
            }
            self.cursor.advance();
        }
    }

    /// Find the offset of the closer for `delim`.
    ///
    /// Inside expressions and statements, quoted strings are skipped and
    /// braces are balanced, so a map literal's `}}` never closes the tag.
    fn find_close(&mut self, delim: Delim, open: u32) -> Result<u32, LexError> {
        let unterminated = || LexError::new(delim.unterminated(), Span::new(open, open + 2));
        let close_byte = delim.close_byte();
        if delim == Delim::Comment {
            loop {
                if !self.cursor.eat_until(close_byte) {
                    return Err(unterminated());
                }
                if self.cursor.peek() == b'}' {
                    return Ok(self.cursor.pos());
                }
                self.cursor.advance();
            }
        }

        let mut depth = 0u32;
        loop {
            match self.cursor.current() {
                0 if self.cursor.is_eof() => return Err(unterminated()),
                quote @ (b'\'' | b'"') => {
                    if !skip_string(&mut self.cursor, quote) {
                        return Err(unterminated());
                    }
                }
                b'{' => {
                    depth += 1;
                    self.cursor.advance();
                }
                b'}' if depth > 0 => {
                    depth -= 1;
                    self.cursor.advance();
                }
                b if b == close_byte && self.cursor.peek() == b'}' => {
                    return Ok(self.cursor.pos());
                }
                _ => self.cursor.advance(),
            }
        }
    }

    /// Consume a raw block body; the cursor sits just after `{% raw %}`.
    fn raw_block(&mut self, open: u32) -> Result<(), LexError> {
        let body_start = self.cursor.pos();
        loop {
            if !self.cursor.eat_until(b'{') {
                return Err(LexError::new(
                    LexErrorKind::UnterminatedRaw,
                    Span::new(open, body_start),
                ));
            }
            let tag_start = self.cursor.pos();
            if let Some(after) = match_endraw(self.cursor) {
                let trim_body_end = self.cursor.slice(tag_start, tag_start + 3) == "{%-";
                let trim_following = self.cursor.slice(after - 3, after) == "-%}";

                let mut text = self.cursor.slice(body_start, tag_start);
                let mut start = body_start;
                if self.trim_next {
                    let trimmed = text.trim_start();
                    start += span_len(text) - span_len(trimmed);
                    text = trimmed;
                }
                if trim_body_end {
                    text = text.trim_end();
                }
                self.segments.push(Segment {
                    kind: SegmentKind::Raw,
                    text,
                    span: Span::new(start, start + span_len(text)),
                });
                self.cursor.set_pos(after);
                self.trim_next = trim_following;
                return Ok(());
            }
            self.cursor.advance();
        }
    }

    fn push_text(&mut self, start: u32, end: u32, trim_end: bool) {
        let mut text = self.cursor.slice(start, end);
        let mut start = start;
        if self.trim_next {
            let trimmed = text.trim_start();
            start += span_len(text) - span_len(trimmed);
            text = trimmed;
            self.trim_next = false;
        }
        if trim_end {
            text = text.trim_end();
        }
        if !text.is_empty() {
            self.segments.push(Segment {
                kind: SegmentKind::Text,
                text,
                span: Span::new(start, start + span_len(text)),
            });
        }
    }

    fn push_inner(&mut self, kind: SegmentKind, start: u32, end: u32) {
        let raw = self.cursor.slice(start, end);
        let text = raw.trim();
        let start = start + span_len(raw) - span_len(raw.trim_start());
        self.segments.push(Segment {
            kind,
            text,
            span: Span::new(start, start + span_len(text)),
        });
    }
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "segment text is a slice of a source whose length fits in u32"
)]
fn span_len(s: &str) -> u32 {
    s.len() as u32
}

/// Skip a quoted string starting at the cursor. Returns `false` if the
/// string runs to EOF.
fn skip_string(cursor: &mut Cursor<'_>, quote: u8) -> bool {
    cursor.advance();
    loop {
        match cursor.current() {
            0 if cursor.is_eof() => return false,
            b'\\' => cursor.advance_n(2),
            b if b == quote => {
                cursor.advance();
                return true;
            }
            _ => cursor.advance(),
        }
    }
}

/// If the cursor sits on `{% endraw %}` (with optional `-` markers), return
/// the offset just past it.
fn match_endraw(mut cursor: Cursor<'_>) -> Option<u32> {
    if !cursor.starts_with("{%") {
        return None;
    }
    cursor.advance_n(2);
    if cursor.current() == b'-' {
        cursor.advance();
    }
    cursor.eat_whitespace();
    if !cursor.starts_with("endraw") {
        return None;
    }
    cursor.advance_n(6);
    cursor.eat_whitespace();
    if cursor.current() == b'-' {
        cursor.advance();
    }
    if !cursor.starts_with("%}") {
        return None;
    }
    Some(cursor.pos() + 2)
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
