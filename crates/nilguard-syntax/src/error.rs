//! Positioned lexing and parsing errors.

use crate::token::Pos;

/// An error produced while lexing or parsing one source file.
///
/// The position is a raw file-set offset; the driver resolves it against the
/// `FileSet` when rendering the diagnostic.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct SyntaxError {
    pub message: String,
    pub pos: Pos,
}

impl SyntaxError {
    #[must_use]
    pub fn new(message: impl Into<String>, pos: Pos) -> Self {
        Self {
            message: message.into(),
            pos,
        }
    }

    #[must_use]
    pub fn unexpected_char(c: char, pos: Pos) -> Self {
        Self::new(format!("unexpected character {c:?}"), pos)
    }

    #[must_use]
    pub fn unterminated_string(pos: Pos) -> Self {
        Self::new("unterminated string literal", pos)
    }

    #[must_use]
    pub fn unterminated_comment(pos: Pos) -> Self {
        Self::new("unterminated block comment", pos)
    }
}
