//! Tag kinds.

use std::fmt;

/// The block and statement tags the template language knows.
///
/// Used to name a construct in errors and to check it against the host's
/// disabled-tag configuration.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum TagKind {
    Set,
    If,
    For,
    Macro,
    Do,
    Raw,
    Autoescape,
}

impl TagKind {
    /// Every tag kind, in declaration order.
    pub const ALL: [TagKind; 7] = [
        TagKind::Set,
        TagKind::If,
        TagKind::For,
        TagKind::Macro,
        TagKind::Do,
        TagKind::Raw,
        TagKind::Autoescape,
    ];

    /// Keyword that opens the tag.
    pub const fn as_str(self) -> &'static str {
        match self {
            TagKind::Set => "set",
            TagKind::If => "if",
            TagKind::For => "for",
            TagKind::Macro => "macro",
            TagKind::Do => "do",
            TagKind::Raw => "raw",
            TagKind::Autoescape => "autoescape",
        }
    }

    /// Look up a tag by its opening keyword.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == keyword)
    }
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
