//! Hand-written lexer with Go's automatic semicolon insertion.
//!
//! The scanner works on bytes; identifiers accept the ASCII subset plus `_`,
//! which covers the analyzed corpus. Comments are skipped, but a comment that
//! spans a line break participates in semicolon insertion the same way a raw
//! newline does.

use crate::{
    error::SyntaxError,
    token::{Pos, Span, Token, TokenKind},
};

pub struct Lexer<'a> {
    src: &'a [u8],
    offset: usize,
    /// Base offset of this file within the file set.
    base: u32,
    /// Kind of the last emitted token, for semicolon insertion.
    last: Option<TokenKind>,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(src: &'a str, base: u32) -> Self {
        Self {
            src: src.as_bytes(),
            offset: 0,
            base,
            last: None,
            tokens: Vec::new(),
        }
    }

    /// Tokenizes the whole file, ending with an `Eof` token.
    pub fn tokenize(mut self) -> Result<Vec<Token>, SyntaxError> {
        loop {
            self.skip_blank()?;
            if self.offset >= self.src.len() {
                // A final line without a trailing newline still terminates
                // its statement.
                self.maybe_insert_semi();
                let pos = self.pos_at(self.offset);
                self.push_at(TokenKind::Eof, String::new(), Span::new(pos, pos));
                return Ok(self.tokens);
            }
            self.scan_token()?;
        }
    }

    fn pos_at(&self, offset: usize) -> Pos {
        Pos::new(self.base + u32::try_from(offset).unwrap_or(u32::MAX))
    }

    fn peek(&self) -> u8 {
        self.src.get(self.offset).copied().unwrap_or(0)
    }

    fn peek_at(&self, n: usize) -> u8 {
        self.src.get(self.offset + n).copied().unwrap_or(0)
    }

    fn push_at(&mut self, kind: TokenKind, text: String, span: Span) {
        self.last = Some(kind);
        self.tokens.push(Token { kind, text, span });
    }

    fn push(&mut self, kind: TokenKind, start: usize, len: usize) {
        let span = Span::new(self.pos_at(start), self.pos_at(start + len));
        self.push_at(kind, String::new(), span);
        self.offset = start + len;
    }

    fn maybe_insert_semi(&mut self) {
        if let Some(last) = self.last
            && last.closes_statement()
        {
            let pos = self.pos_at(self.offset);
            self.push_at(TokenKind::Semi, String::from("\n"), Span::new(pos, pos));
        }
    }

    /// Skips whitespace and comments, inserting semicolons at line breaks.
    fn skip_blank(&mut self) -> Result<(), SyntaxError> {
        loop {
            match self.peek() {
                b' ' | b'\t' | b'\r' => self.offset += 1,
                b'\n' => {
                    self.maybe_insert_semi();
                    self.offset += 1;
                }
                b'/' if self.peek_at(1) == b'/' => {
                    while self.offset < self.src.len() && self.peek() != b'\n' {
                        self.offset += 1;
                    }
                }
                b'/' if self.peek_at(1) == b'*' => {
                    let start = self.offset;
                    self.offset += 2;
                    let mut multiline = false;
                    loop {
                        if self.offset >= self.src.len() {
                            return Err(SyntaxError::unterminated_comment(self.pos_at(start)));
                        }
                        if self.peek() == b'\n' {
                            multiline = true;
                        }
                        if self.peek() == b'*' && self.peek_at(1) == b'/' {
                            self.offset += 2;
                            break;
                        }
                        self.offset += 1;
                    }
                    if multiline {
                        self.maybe_insert_semi();
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn scan_token(&mut self) -> Result<(), SyntaxError> {
        let start = self.offset;
        let c = self.peek();
        match c {
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.scan_ident(start),
            b'0'..=b'9' => self.scan_number(start),
            b'.' if self.peek_at(1).is_ascii_digit() => self.scan_number(start),
            b'"' => self.scan_string(start, b'"'),
            b'`' => self.scan_raw_string(start),
            b'\'' => self.scan_string(start, b'\''),
            b'+' => match self.peek_at(1) {
                b'+' => Ok(self.push(TokenKind::Inc, start, 2)),
                b'=' => Ok(self.push(TokenKind::OpAssign, start, 2)),
                _ => Ok(self.push(TokenKind::Plus, start, 1)),
            },
            b'-' => match self.peek_at(1) {
                b'-' => Ok(self.push(TokenKind::Dec, start, 2)),
                b'=' => Ok(self.push(TokenKind::OpAssign, start, 2)),
                _ => Ok(self.push(TokenKind::Minus, start, 1)),
            },
            b'*' => match self.peek_at(1) {
                b'=' => Ok(self.push(TokenKind::OpAssign, start, 2)),
                _ => Ok(self.push(TokenKind::Star, start, 1)),
            },
            b'/' => match self.peek_at(1) {
                b'=' => Ok(self.push(TokenKind::OpAssign, start, 2)),
                _ => Ok(self.push(TokenKind::Slash, start, 1)),
            },
            b'%' => match self.peek_at(1) {
                b'=' => Ok(self.push(TokenKind::OpAssign, start, 2)),
                _ => Ok(self.push(TokenKind::Percent, start, 1)),
            },
            b'^' => match self.peek_at(1) {
                b'=' => Ok(self.push(TokenKind::OpAssign, start, 2)),
                _ => Ok(self.push(TokenKind::Caret, start, 1)),
            },
            b'&' => match (self.peek_at(1), self.peek_at(2)) {
                (b'&', _) => Ok(self.push(TokenKind::AndAnd, start, 2)),
                (b'^', b'=') => Ok(self.push(TokenKind::OpAssign, start, 3)),
                (b'^', _) => Ok(self.push(TokenKind::AmpCaret, start, 2)),
                (b'=', _) => Ok(self.push(TokenKind::OpAssign, start, 2)),
                _ => Ok(self.push(TokenKind::Amp, start, 1)),
            },
            b'|' => match self.peek_at(1) {
                b'|' => Ok(self.push(TokenKind::OrOr, start, 2)),
                b'=' => Ok(self.push(TokenKind::OpAssign, start, 2)),
                _ => Ok(self.push(TokenKind::Pipe, start, 1)),
            },
            b'<' => match (self.peek_at(1), self.peek_at(2)) {
                (b'=', _) => Ok(self.push(TokenKind::LtEq, start, 2)),
                (b'-', _) => Ok(self.push(TokenKind::Arrow, start, 2)),
                (b'<', b'=') => Ok(self.push(TokenKind::OpAssign, start, 3)),
                (b'<', _) => Ok(self.push(TokenKind::Shl, start, 2)),
                _ => Ok(self.push(TokenKind::Lt, start, 1)),
            },
            b'>' => match (self.peek_at(1), self.peek_at(2)) {
                (b'=', _) => Ok(self.push(TokenKind::GtEq, start, 2)),
                (b'>', b'=') => Ok(self.push(TokenKind::OpAssign, start, 3)),
                (b'>', _) => Ok(self.push(TokenKind::Shr, start, 2)),
                _ => Ok(self.push(TokenKind::Gt, start, 1)),
            },
            b'=' => match self.peek_at(1) {
                b'=' => Ok(self.push(TokenKind::Eq, start, 2)),
                _ => Ok(self.push(TokenKind::Assign, start, 1)),
            },
            b'!' => match self.peek_at(1) {
                b'=' => Ok(self.push(TokenKind::NotEq, start, 2)),
                _ => Ok(self.push(TokenKind::Not, start, 1)),
            },
            b':' => match self.peek_at(1) {
                b'=' => Ok(self.push(TokenKind::Define, start, 2)),
                _ => Ok(self.push(TokenKind::Colon, start, 1)),
            },
            b'.' => {
                if self.peek_at(1) == b'.' && self.peek_at(2) == b'.' {
                    Ok(self.push(TokenKind::Ellipsis, start, 3))
                } else {
                    Ok(self.push(TokenKind::Period, start, 1))
                }
            }
            b'(' => Ok(self.push(TokenKind::LParen, start, 1)),
            b')' => Ok(self.push(TokenKind::RParen, start, 1)),
            b'[' => Ok(self.push(TokenKind::LBracket, start, 1)),
            b']' => Ok(self.push(TokenKind::RBracket, start, 1)),
            b'{' => Ok(self.push(TokenKind::LBrace, start, 1)),
            b'}' => Ok(self.push(TokenKind::RBrace, start, 1)),
            b',' => Ok(self.push(TokenKind::Comma, start, 1)),
            b';' => Ok(self.push(TokenKind::Semi, start, 1)),
            other => Err(SyntaxError::unexpected_char(other as char, self.pos_at(start))),
        }
    }

    fn scan_ident(&mut self, start: usize) -> Result<(), SyntaxError> {
        while matches!(self.peek(), b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_') {
            self.offset += 1;
        }
        let text = String::from_utf8_lossy(&self.src[start..self.offset]).into_owned();
        let span = Span::new(self.pos_at(start), self.pos_at(self.offset));
        match TokenKind::keyword(&text) {
            Some(kw) => self.push_at(kw, String::new(), span),
            None => self.push_at(TokenKind::Ident, text, span),
        }
        Ok(())
    }

    fn scan_number(&mut self, start: usize) -> Result<(), SyntaxError> {
        let mut kind = TokenKind::Int;
        // Hex, octal, and binary prefixes keep integer kind.
        if self.peek() == b'0' && matches!(self.peek_at(1), b'x' | b'X' | b'o' | b'O' | b'b' | b'B') {
            self.offset += 2;
            while self.peek().is_ascii_alphanumeric() || self.peek() == b'_' {
                self.offset += 1;
            }
        } else {
            while self.peek().is_ascii_digit() || self.peek() == b'_' {
                self.offset += 1;
            }
            if self.peek() == b'.' && self.peek_at(1) != b'.' {
                kind = TokenKind::Float;
                self.offset += 1;
                while self.peek().is_ascii_digit() || self.peek() == b'_' {
                    self.offset += 1;
                }
            }
            if matches!(self.peek(), b'e' | b'E') {
                kind = TokenKind::Float;
                self.offset += 1;
                if matches!(self.peek(), b'+' | b'-') {
                    self.offset += 1;
                }
                while self.peek().is_ascii_digit() {
                    self.offset += 1;
                }
            }
        }
        let text = String::from_utf8_lossy(&self.src[start..self.offset]).into_owned();
        let span = Span::new(self.pos_at(start), self.pos_at(self.offset));
        self.push_at(kind, text, span);
        Ok(())
    }

    fn scan_string(&mut self, start: usize, quote: u8) -> Result<(), SyntaxError> {
        self.offset += 1;
        while self.offset < self.src.len() {
            match self.peek() {
                b'\\' => self.offset += 2,
                b'\n' => break,
                c if c == quote => {
                    self.offset += 1;
                    let text = String::from_utf8_lossy(&self.src[start..self.offset]).into_owned();
                    let span = Span::new(self.pos_at(start), self.pos_at(self.offset));
                    let kind = if quote == b'\'' { TokenKind::Char } else { TokenKind::Str };
                    self.push_at(kind, text, span);
                    return Ok(());
                }
                _ => self.offset += 1,
            }
        }
        Err(SyntaxError::unterminated_string(self.pos_at(start)))
    }

    fn scan_raw_string(&mut self, start: usize) -> Result<(), SyntaxError> {
        self.offset += 1;
        while self.offset < self.src.len() {
            if self.peek() == b'`' {
                self.offset += 1;
                let text = String::from_utf8_lossy(&self.src[start..self.offset]).into_owned();
                let span = Span::new(self.pos_at(start), self.pos_at(self.offset));
                self.push_at(TokenKind::Str, text, span);
                return Ok(());
            }
            self.offset += 1;
        }
        Err(SyntaxError::unterminated_string(self.pos_at(start)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src, 1)
            .tokenize()
            .expect("lexes")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn semicolons_inserted_at_line_breaks() {
        let ks = kinds("x := 1\ny := 2\n");
        assert_eq!(
            ks,
            vec![
                TokenKind::Ident,
                TokenKind::Define,
                TokenKind::Int,
                TokenKind::Semi,
                TokenKind::Ident,
                TokenKind::Define,
                TokenKind::Int,
                TokenKind::Semi,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn no_semicolon_after_operators() {
        let ks = kinds("x &&\ny\n");
        assert_eq!(
            ks,
            vec![
                TokenKind::Ident,
                TokenKind::AndAnd,
                TokenKind::Ident,
                TokenKind::Semi,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn keywords_and_composite_operators() {
        let ks = kinds("if a != nil { return a }");
        assert_eq!(
            ks,
            vec![
                TokenKind::If,
                TokenKind::Ident,
                TokenKind::NotEq,
                TokenKind::Ident,
                TokenKind::LBrace,
                TokenKind::Return,
                TokenKind::Ident,
                TokenKind::RBrace,
                TokenKind::Semi,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn final_line_without_newline_terminates() {
        let ks = kinds("x");
        assert_eq!(ks, vec![TokenKind::Ident, TokenKind::Semi, TokenKind::Eof]);
    }
}
