//! Lexical analyzer for gatesim's bounded SystemVerilog subset.
//!
//! Converts source text into a sequence of [`Token`]s: keyword/identifier
//! scanning, sized and unsized numeric literals (`4'b1010`, `8'hFF`, `42`),
//! line and block comments, and the operator/punctuation set the grammar
//! needs. Lexer errors are reported to the [`DiagnosticSink`] and surface as
//! [`SvToken::Error`] tokens so the parser can keep going and resynchronize
//! rather than abort on the first bad character.

use crate::token::{lookup_keyword, LiteralBase, SvToken, Token};
use gatesim_diagnostics::code::{Category, DiagnosticCode};
use gatesim_diagnostics::{Diagnostic, DiagnosticSink};
use gatesim_source::{FileId, Span};

/// Lexes the given SystemVerilog source text into a vector of tokens.
///
/// Whitespace and comments are skipped. The returned vector always ends with
/// a [`SvToken::Eof`] token. Lexer errors are reported via the diagnostic
/// sink and produce [`SvToken::Error`] tokens in the output.
pub fn lex(source: &str, file: FileId, sink: &DiagnosticSink) -> Vec<Token> {
    let mut lexer = Lexer {
        source: source.as_bytes(),
        pos: 0,
        file,
        sink,
    };
    lexer.lex_all()
}

struct Lexer<'a> {
    source: &'a [u8],
    pos: usize,
    file: FileId,
    sink: &'a DiagnosticSink,
}

impl Lexer<'_> {
    fn lex_all(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_and_comments();
            if self.pos >= self.source.len() {
                tokens.push(Token::new(
                    SvToken::Eof,
                    Span::new(self.file, self.pos as u32, self.pos as u32),
                ));
                break;
            }
            tokens.push(self.next_token());
        }
        tokens
    }

    fn peek(&self) -> u8 {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> u8 {
        let idx = self.pos + offset;
        if idx < self.source.len() {
            self.source[idx]
        } else {
            0
        }
    }

    fn advance(&mut self) -> u8 {
        let b = self.source[self.pos];
        self.pos += 1;
        b
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(self.file, start as u32, self.pos as u32)
    }

    fn error(&self, msg: &str, span: Span) {
        self.sink
            .emit(Diagnostic::error(DiagnosticCode::new(Category::Error, 100), msg, span));
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.pos < self.source.len() && self.source[self.pos].is_ascii_whitespace() {
                self.pos += 1;
            }
            if self.pos >= self.source.len() {
                return;
            }
            if self.peek() == b'/' && self.peek_at(1) == b'/' {
                self.pos += 2;
                while self.pos < self.source.len() && self.source[self.pos] != b'\n' {
                    self.pos += 1;
                }
                continue;
            }
            if self.peek() == b'/' && self.peek_at(1) == b'*' {
                let start = self.pos;
                self.pos += 2;
                loop {
                    if self.pos >= self.source.len() {
                        self.error("unterminated block comment", self.span_from(start));
                        break;
                    }
                    if self.source[self.pos] == b'*' && self.peek_at(1) == b'/' {
                        self.pos += 2;
                        break;
                    }
                    self.pos += 1;
                }
                continue;
            }
            break;
        }
    }

    fn next_token(&mut self) -> Token {
        let start = self.pos;
        let c = self.peek();

        if c.is_ascii_digit() {
            return self.lex_number(start);
        }
        if c == b'_' || c.is_ascii_alphabetic() {
            return self.lex_ident_or_keyword(start);
        }

        self.advance();
        let kind = match c {
            b'(' => SvToken::LParen,
            b')' => SvToken::RParen,
            b'[' => SvToken::LBracket,
            b']' => SvToken::RBracket,
            b'{' => SvToken::LBrace,
            b'}' => SvToken::RBrace,
            b',' => SvToken::Comma,
            b';' => SvToken::Semicolon,
            b'.' => SvToken::Dot,
            b'@' => SvToken::At,
            b':' => SvToken::Colon,
            b'?' => SvToken::Question,
            b'+' => SvToken::Plus,
            b'-' => SvToken::Minus,
            b'*' => SvToken::Star,
            b'/' => SvToken::Slash,
            b'%' => SvToken::Percent,
            b'=' => {
                if self.peek() == b'=' {
                    self.advance();
                    SvToken::EqEq
                } else {
                    SvToken::Assign_
                }
            }
            b'!' => {
                if self.peek() == b'=' {
                    self.advance();
                    SvToken::BangEq
                } else {
                    SvToken::Bang
                }
            }
            b'<' => {
                if self.peek() == b'=' {
                    self.advance();
                    SvToken::LtEq
                } else if self.peek() == b'<' {
                    self.advance();
                    SvToken::Shl
                } else {
                    SvToken::Lt
                }
            }
            b'>' => {
                if self.peek() == b'=' {
                    self.advance();
                    SvToken::GtEq
                } else if self.peek() == b'>' {
                    self.advance();
                    SvToken::Shr
                } else {
                    SvToken::Gt
                }
            }
            b'&' => {
                if self.peek() == b'&' {
                    self.advance();
                    SvToken::AmpAmp
                } else {
                    SvToken::Amp
                }
            }
            b'|' => {
                if self.peek() == b'|' {
                    self.advance();
                    SvToken::PipePipe
                } else {
                    SvToken::Pipe
                }
            }
            b'^' => {
                if self.peek() == b'~' {
                    self.advance();
                    SvToken::Xnor
                } else {
                    SvToken::Caret
                }
            }
            b'~' => {
                if self.peek() == b'^' {
                    self.advance();
                    SvToken::Xnor
                } else {
                    SvToken::Tilde
                }
            }
            other => {
                let text = (other as char).to_string();
                self.error(&format!("unexpected character '{}'", other as char), self.span_from(start));
                SvToken::Error(text)
            }
        };
        Token::new(kind, self.span_from(start))
    }

    fn lex_ident_or_keyword(&mut self, start: usize) -> Token {
        while self.pos < self.source.len()
            && (self.peek().is_ascii_alphanumeric() || self.peek() == b'_')
        {
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.source[start..self.pos])
            .expect("identifier bytes are ASCII")
            .to_string();
        Token::new(lookup_keyword(&text), self.span_from(start))
    }

    /// Lexes either an unsized decimal literal or a sized literal of the
    /// form `<width>'<base><digits>`.
    fn lex_number(&mut self, start: usize) -> Token {
        while self.pos < self.source.len() && self.peek().is_ascii_digit() {
            self.pos += 1;
        }
        let width_text = std::str::from_utf8(&self.source[start..self.pos]).unwrap();

        if self.peek() != b'\'' {
            let value: u64 = width_text.parse().unwrap_or(0);
            return Token::new(SvToken::UnsizedDecimal(value), self.span_from(start));
        }

        let width: u32 = match width_text.parse() {
            Ok(w) => w,
            Err(_) => {
                self.error("malformed sized literal width", self.span_from(start));
                return Token::new(SvToken::Error(width_text.to_string()), self.span_from(start));
            }
        };
        self.advance(); // consume '\''

        let base = match self.peek() {
            b'b' | b'B' => LiteralBase::Binary,
            b'h' | b'H' => LiteralBase::Hex,
            b'd' | b'D' => LiteralBase::Decimal,
            _ => {
                self.error("expected 'b', 'h', or 'd' after ' in sized literal", self.span_from(start));
                return Token::new(SvToken::Error("'".to_string()), self.span_from(start));
            }
        };
        self.advance();

        let digits_start = self.pos;
        let valid = |b: u8, base: LiteralBase| match base {
            LiteralBase::Binary => b == b'0' || b == b'1' || b == b'_',
            LiteralBase::Hex => b.is_ascii_hexdigit() || b == b'_',
            LiteralBase::Decimal => b.is_ascii_digit() || b == b'_',
        };
        while self.pos < self.source.len() && valid(self.peek(), base) {
            self.pos += 1;
        }
        let digits = std::str::from_utf8(&self.source[digits_start..self.pos])
            .unwrap()
            .replace('_', "");

        if digits.is_empty() {
            self.error("sized literal has no digits", self.span_from(start));
        }

        Token::new(
            SvToken::SizedLiteral { width, base, digits },
            self.span_from(start),
        )
    }
}
