//! Tokens, source positions, and the file set.
//!
//! Positions are global byte offsets across all files registered in a
//! [`FileSet`], so a single `Pos` identifies both the file and the offset
//! within it. Resolving a `Pos` back to `{file, line, column}` only happens
//! when a diagnostic is rendered.

use std::fmt;

/// A global byte offset into a [`FileSet`].
///
/// `Pos::NONE` (offset 0) marks "no position"; every registered file starts
/// at base 1 or later, so real positions are always nonzero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Pos(u32);

impl Pos {
    pub const NONE: Pos = Pos(0);

    #[must_use]
    pub fn new(offset: u32) -> Self {
        Self(offset)
    }

    #[must_use]
    pub fn offset(self) -> u32 {
        self.0
    }

    #[must_use]
    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A half-open source range `[start, end)` in file-set coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: Pos,
    pub end: Pos,
}

impl Span {
    #[must_use]
    pub fn new(start: Pos, end: Pos) -> Self {
        Self { start, end }
    }

    /// Span covering both operands.
    #[must_use]
    pub fn to(self, other: Span) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// A resolved source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

struct SourceFile {
    name: String,
    base: u32,
    size: u32,
    /// Byte offset (file-local) of the first character of each line.
    line_starts: Vec<u32>,
}

/// Registry of source files mapping global positions back to locations.
#[derive(Default)]
pub struct FileSet {
    files: Vec<SourceFile>,
}

impl FileSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a file and returns the base offset assigned to it.
    ///
    /// Token positions produced by the lexer for this file are
    /// `base + file-local offset`.
    pub fn add(&mut self, name: &str, src: &str) -> u32 {
        let base = self.files.last().map_or(1, |f| f.base + f.size + 1);
        let mut line_starts = vec![0];
        for (i, b) in src.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(u32::try_from(i).unwrap_or(u32::MAX).saturating_add(1));
            }
        }
        self.files.push(SourceFile {
            name: name.to_owned(),
            base,
            size: u32::try_from(src.len()).unwrap_or(u32::MAX),
            line_starts,
        });
        base
    }

    /// Resolves a global position to `{file, line, column}`.
    ///
    /// Returns a placeholder location for `Pos::NONE` or positions outside
    /// every registered file.
    #[must_use]
    pub fn position(&self, pos: Pos) -> Position {
        if !pos.is_none() {
            for file in &self.files {
                if pos.offset() >= file.base && pos.offset() <= file.base + file.size {
                    let local = pos.offset() - file.base;
                    let line_idx = match file.line_starts.binary_search(&local) {
                        Ok(i) => i,
                        Err(i) => i - 1,
                    };
                    return Position {
                        file: file.name.clone(),
                        line: u32::try_from(line_idx).unwrap_or(0) + 1,
                        column: local - file.line_starts[line_idx] + 1,
                    };
                }
            }
        }
        Position {
            file: String::from("-"),
            line: 0,
            column: 0,
        }
    }

    /// Name of the file containing `pos`, if any.
    #[must_use]
    pub fn file_name(&self, pos: Pos) -> Option<&str> {
        self.files
            .iter()
            .find(|f| pos.offset() >= f.base && pos.offset() <= f.base + f.size)
            .map(|f| f.name.as_str())
    }
}

/// Lexical token kinds for the analyzed Go subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Ident,
    Int,
    Float,
    Char,
    Str,

    // Operators and delimiters.
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Shl,
    Shr,
    AmpCaret,
    AndAnd,
    OrOr,
    Arrow,
    Inc,
    Dec,
    Eq,
    Lt,
    Gt,
    Assign,
    Not,
    NotEq,
    LtEq,
    GtEq,
    Define,
    /// Compound assignment (`+=`, `<<=`, …); the operator itself is not
    /// semantically relevant to the analyzer.
    OpAssign,
    Ellipsis,
    LParen,
    LBracket,
    LBrace,
    RParen,
    RBracket,
    RBrace,
    Comma,
    Period,
    Semi,
    Colon,

    // Keywords.
    Break,
    Case,
    Chan,
    Const,
    Continue,
    Default,
    Defer,
    Else,
    Fallthrough,
    For,
    Func,
    Go,
    Goto,
    If,
    Import,
    Interface,
    Map,
    Package,
    Range,
    Return,
    Select,
    Struct,
    Switch,
    Type,
    Var,

    Eof,
}

impl TokenKind {
    /// Keyword lookup for an identifier-shaped lexeme.
    #[must_use]
    pub fn keyword(text: &str) -> Option<Self> {
        Some(match text {
            "break" => Self::Break,
            "case" => Self::Case,
            "chan" => Self::Chan,
            "const" => Self::Const,
            "continue" => Self::Continue,
            "default" => Self::Default,
            "defer" => Self::Defer,
            "else" => Self::Else,
            "fallthrough" => Self::Fallthrough,
            "for" => Self::For,
            "func" => Self::Func,
            "go" => Self::Go,
            "goto" => Self::Goto,
            "if" => Self::If,
            "import" => Self::Import,
            "interface" => Self::Interface,
            "map" => Self::Map,
            "package" => Self::Package,
            "range" => Self::Range,
            "return" => Self::Return,
            "select" => Self::Select,
            "struct" => Self::Struct,
            "switch" => Self::Switch,
            "type" => Self::Type,
            "var" => Self::Var,
            _ => return None,
        })
    }

    /// Whether a line break after a token of this kind inserts a semicolon.
    #[must_use]
    pub fn closes_statement(self) -> bool {
        matches!(
            self,
            Self::Ident
                | Self::Int
                | Self::Float
                | Self::Char
                | Self::Str
                | Self::Break
                | Self::Continue
                | Self::Fallthrough
                | Self::Return
                | Self::Inc
                | Self::Dec
                | Self::RParen
                | Self::RBracket
                | Self::RBrace
        )
    }
}

/// A lexed token. `text` is only populated for identifiers and literals.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_resolution_across_files() {
        let mut fset = FileSet::new();
        let base_a = fset.add("a.go", "package a\nvar x int\n");
        let base_b = fset.add("b.go", "package b\n");

        let pos = Pos::new(base_a + 10);
        let loc = fset.position(pos);
        assert_eq!(loc.file, "a.go");
        assert_eq!(loc.line, 2);
        assert_eq!(loc.column, 1);

        let loc = fset.position(Pos::new(base_b));
        assert_eq!(loc.file, "b.go");
        assert_eq!(loc.line, 1);
        assert_eq!(loc.column, 1);
    }

    #[test]
    fn none_position_resolves_to_placeholder() {
        let fset = FileSet::new();
        let loc = fset.position(Pos::NONE);
        assert_eq!(loc.file, "-");
        assert_eq!(loc.line, 0);
    }
}
