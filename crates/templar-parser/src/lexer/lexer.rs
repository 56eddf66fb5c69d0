//! The [`Lexer`] converts source text into [`Token`]s, dispatching on the
//! first character. Comments and preprocessor lines are skipped.

use templar_core::{ParseError, Span};

use super::cursor::{Cursor, is_ident_continue, is_ident_start};
use super::token::{Token, TokenKind};

pub struct Lexer<'src> {
    cursor: Cursor<'src>,
    /// Only whitespace seen since the last newline.
    at_line_start: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            cursor: Cursor::new(source),
            at_line_start: true,
        }
    }

    /// Lex the whole input. The returned vector always ends with an EOF token.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn tokenize(source: &'src str) -> Result<Vec<Token<'src>>, ParseError> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token()?;
            let eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if eof {
                return Ok(tokens);
            }
        }
    }

    pub fn next_token(&mut self) -> Result<Token<'src>, ParseError> {
        self.skip_trivia()?;

        let line = self.cursor.line();
        let col = self.cursor.column();
        let start = self.cursor.offset();

        let Some(c) = self.cursor.peek() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                lexeme: "",
                span: Span::point(line, col),
                offset: start,
            });
        };

        let kind = match c {
            c if c.is_ascii_digit() => self.scan_number()?,
            '.' if self.cursor.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) => self.scan_number()?,
            c if is_ident_start(c) => {
                self.cursor.eat_while(is_ident_continue);
                TokenKind::Identifier
            }
            '"' => self.scan_quoted('"', TokenKind::StringLiteral)?,
            '\'' => self.scan_quoted('\'', TokenKind::CharLiteral)?,
            _ => self.scan_operator()?,
        };

        let lexeme = self.cursor.slice_from(start);
        Ok(Token {
            kind,
            lexeme,
            span: Span::new(line, col, lexeme.len() as u32),
            offset: start,
        })
    }

    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            match self.cursor.peek() {
                Some('\n') => {
                    self.cursor.advance();
                    self.at_line_start = true;
                }
                Some(c) if c.is_whitespace() => {
                    self.cursor.advance();
                }
                Some('#') if self.at_line_start => self.skip_preprocessor_line(),
                Some('/') if self.cursor.check_str("//") => {
                    self.cursor.eat_while(|c| c != '\n');
                }
                Some('/') if self.cursor.check_str("/*") => {
                    let span = Span::point(self.cursor.line(), self.cursor.column());
                    self.cursor.eat_str("/*");
                    loop {
                        if self.cursor.eat_str("*/") {
                            break;
                        }
                        if self.cursor.advance().is_none() {
                            return Err(ParseError::Unterminated { what: "comment", span });
                        }
                    }
                }
                _ => {
                    self.at_line_start = false;
                    return Ok(());
                }
            }
        }
    }

    fn skip_preprocessor_line(&mut self) {
        while let Some(c) = self.cursor.advance() {
            match c {
                '\\' => {
                    self.cursor.eat('\r');
                    self.cursor.eat('\n');
                }
                '\n' => break,
                _ => {}
            }
        }
        self.at_line_start = true;
    }

    fn scan_number(&mut self) -> Result<TokenKind, ParseError> {
        let span = Span::point(self.cursor.line(), self.cursor.column());
        let start = self.cursor.offset();
        let mut kind = TokenKind::IntLiteral;

        if self.cursor.check_str("0x") || self.cursor.check_str("0X") || self.cursor.check_str("0b") || self.cursor.check_str("0B") {
            self.cursor.advance();
            self.cursor.advance();
            self.cursor.eat_while(|c| c.is_ascii_hexdigit() || c == '\'');
        } else {
            self.cursor.eat_while(|c| c.is_ascii_digit() || c == '\'');
            if self.cursor.peek() == Some('.') && self.cursor.peek_nth(1) != Some('.') {
                kind = TokenKind::FloatLiteral;
                self.cursor.advance();
                self.cursor.eat_while(|c| c.is_ascii_digit());
            }
            if self.cursor.check(|c| c == 'e' || c == 'E') {
                kind = TokenKind::FloatLiteral;
                self.cursor.advance();
                if self.cursor.check(|c| c == '+' || c == '-') {
                    self.cursor.advance();
                }
                if !self.cursor.check(|c| c.is_ascii_digit()) {
                    return Err(ParseError::InvalidNumber {
                        text: self.cursor.slice_from(start).to_string(),
                        span,
                    });
                }
                self.cursor.eat_while(|c| c.is_ascii_digit());
            }
        }
        // suffixes: u, l, ul, ll, f
        self.cursor.eat_while(|c| matches!(c, 'u' | 'U' | 'l' | 'L' | 'f' | 'F'));
        Ok(kind)
    }

    fn scan_quoted(&mut self, quote: char, kind: TokenKind) -> Result<TokenKind, ParseError> {
        let span = Span::point(self.cursor.line(), self.cursor.column());
        self.cursor.advance();
        loop {
            match self.cursor.advance() {
                None | Some('\n') => {
                    let what = if quote == '"' { "string" } else { "character literal" };
                    return Err(ParseError::Unterminated { what, span });
                }
                Some('\\') => {
                    self.cursor.advance();
                }
                Some(c) if c == quote => return Ok(kind),
                Some(_) => {}
            }
        }
    }

    fn scan_operator(&mut self) -> Result<TokenKind, ParseError> {
        for (text, kind) in [
            ("::", TokenKind::ColonColon),
            ("...", TokenKind::Ellipsis),
            ("&&", TokenKind::AmpAmp),
            ("->", TokenKind::Arrow),
        ] {
            if self.cursor.eat_str(text) {
                return Ok(kind);
            }
        }
        let span = Span::point(self.cursor.line(), self.cursor.column());
        let Some(c) = self.cursor.advance() else {
            return Err(ParseError::UnexpectedEof {
                expected: "token".to_string(),
            });
        };
        Ok(match c {
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,
            '<' => TokenKind::Less,
            '>' => TokenKind::Greater,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '*' => TokenKind::Star,
            '&' => TokenKind::Amp,
            '=' => TokenKind::Equal,
            '+' | '-' | '/' | '%' | '^' | '|' | '!' | '~' | '.' | '?' => TokenKind::Punct,
            ch => return Err(ParseError::UnexpectedChar { ch, span }),
        })
    }
}
