//! Token-stream parser state shared by the type and declaration grammars.

use templar_core::ParseError;

use crate::lexer::{Lexer, Token, TokenKind};

pub struct Parser<'src> {
    source: &'src str,
    tokens: Vec<Token<'src>>,
    pos: usize,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Result<Self, ParseError> {
        Ok(Self {
            source,
            tokens: Lexer::tokenize(source)?,
            pos: 0,
        })
    }

    #[inline]
    pub fn peek(&self) -> Token<'src> {
        self.peek_nth(0)
    }

    /// Token `n` positions ahead; EOF past the end.
    pub fn peek_nth(&self, n: usize) -> Token<'src> {
        let last = self.tokens.len() - 1;
        self.tokens[(self.pos + n).min(last)]
    }

    #[inline]
    pub fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    #[inline]
    pub fn check_word(&self, word: &str) -> bool {
        self.peek().is_word(word)
    }

    pub fn is_eof(&self) -> bool {
        self.check(TokenKind::Eof)
    }

    pub fn advance(&mut self) -> Token<'src> {
        let token = self.peek();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    pub fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn eat_word(&mut self, word: &str) -> bool {
        if self.check_word(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn expect(&mut self, kind: TokenKind) -> Result<Token<'src>, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(kind.describe()))
        }
    }

    pub fn expect_word(&mut self, word: &str) -> Result<Token<'src>, ParseError> {
        if self.check_word(word) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("'{word}'")))
        }
    }

    pub fn expect_identifier(&mut self) -> Result<&'src str, ParseError> {
        Ok(self.expect(TokenKind::Identifier)?.lexeme)
    }

    /// Error for the current token.
    pub fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.peek();
        if token.kind == TokenKind::Eof {
            ParseError::UnexpectedEof {
                expected: expected.to_string(),
            }
        } else {
            ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: token.lexeme.to_string(),
                span: token.span,
            }
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn rewind(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Source text between two token positions (start inclusive, end exclusive).
    pub fn text_between(&self, start: usize, end: usize) -> &'src str {
        if start >= end {
            return "";
        }
        let from = self.tokens[start].offset as usize;
        let last = self.tokens[end - 1];
        let to = last.offset as usize + last.lexeme.len();
        &self.source[from..to]
    }

    /// Skip a balanced `(..)`, `[..]` or `{..}` group starting at the current
    /// opener. Returns the text strictly inside it.
    pub fn skip_group(&mut self) -> Result<&'src str, ParseError> {
        let open = self.advance();
        let close = match open.kind {
            TokenKind::LParen => TokenKind::RParen,
            TokenKind::LBracket => TokenKind::RBracket,
            TokenKind::LBrace => TokenKind::RBrace,
            _ => return Err(ParseError::UnexpectedToken {
                expected: "'(', '[' or '{'".to_string(),
                found: open.lexeme.to_string(),
                span: open.span,
            }),
        };
        let inner_start = self.pos;
        let mut depth = 0usize;
        loop {
            let token = self.peek();
            match token.kind {
                TokenKind::Eof => {
                    return Err(ParseError::Unterminated {
                        what: "bracketed group",
                        span: open.span,
                    });
                }
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => depth += 1,
                kind if kind == close && depth == 0 => {
                    let inner = self.text_between(inner_start, self.pos);
                    self.advance();
                    return Ok(inner);
                }
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.advance();
        }
    }

    /// Skip tokens until `stop` matches at bracket depth zero, returning the
    /// skipped text. The stopping token is not consumed.
    pub fn skip_until(&mut self, stop: impl Fn(TokenKind) -> bool) -> Result<&'src str, ParseError> {
        let start = self.pos;
        loop {
            let kind = self.peek().kind;
            if kind == TokenKind::Eof || stop(kind) {
                return Ok(self.text_between(start, self.pos));
            }
            match kind {
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => {
                    self.skip_group()?;
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    /// Skip a `[[ ... ]]` attribute list and return the attribute names.
    pub fn parse_attributes(&mut self) -> Result<Vec<String>, ParseError> {
        let mut names = Vec::new();
        while self.check(TokenKind::LBracket) && self.peek_nth(1).is(TokenKind::LBracket) {
            self.advance();
            let inner = self.skip_group()?;
            self.expect(TokenKind::RBracket)?;
            let inner = inner.trim().trim_start_matches('[').trim_end_matches(']');
            names.extend(
                inner
                    .split(',')
                    .map(|attr| attr.split('(').next().unwrap_or_default().trim().replace(' ', ""))
                    .filter(|attr| !attr.is_empty()),
            );
        }
        Ok(names)
    }
}

/// Parse an integer literal lexeme (decimal, hex, binary, octal; suffixes
/// and digit separators allowed).
pub fn parse_int_literal(lexeme: &str) -> Option<i128> {
    let digits: String = lexeme
        .trim_end_matches(['u', 'U', 'l', 'L'])
        .chars()
        .filter(|c| *c != '\'')
        .collect();
    let lower = digits.to_ascii_lowercase();
    if let Some(hex) = lower.strip_prefix("0x") {
        i128::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = lower.strip_prefix("0b") {
        i128::from_str_radix(bin, 2).ok()
    } else if lower.len() > 1 && lower.starts_with('0') {
        i128::from_str_radix(&lower[1..], 8).ok()
    } else {
        lower.parse().ok()
    }
}
