//! Hand-written scanner turning `jsonmap` source text into a token stream
//! (spec §4.1).
//!
//! Modeled on the character-cursor lexers common in small Rust DSLs: a
//! `Vec<char>` cursor tracking `(line, column)` by hand, with one
//! `consume_*` helper per lexeme family.

use log::trace;

use crate::error::{JsonMapError, Result};
use crate::token::{Token, TokenKind};

/// Scans `source` into a token stream ending in `TokenKind::Eof`, or
/// returns the first lexical error encountered.
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    Lexer::new(source).run().map_err(|err| {
        log::debug!("lex error: {err}");
        err
    })
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Lexer {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn run(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_and_comments();
            let (line, column) = (self.line, self.column);
            let Some(c) = self.peek() else {
                tokens.push(Token::new(TokenKind::Eof, line, column, 0));
                break;
            };

            let token = match c {
                '=' => self.single(TokenKind::Eq),
                ';' => self.single(TokenKind::Semicolon),
                ':' => self.single(TokenKind::Colon),
                ',' => self.single(TokenKind::Comma),
                '.' => self.single(TokenKind::Dot),
                '{' => self.single(TokenKind::LBrace),
                '}' => self.single(TokenKind::RBrace),
                '[' => self.single(TokenKind::LBracket),
                ']' => self.single(TokenKind::RBracket),
                '&' => self.consume_amp(),
                '"' => self.consume_string()?,
                c if c == '-' || c.is_ascii_digit() => self.consume_number()?,
                c if c.is_ascii_alphabetic() || c == '_' => self.consume_ident(),
                c => {
                    return Err(JsonMapError::Lex {
                        message: format!("unexpected character '{c}'"),
                        line,
                        column,
                    });
                }
            };
            trace!("token {:?} at {}:{}", token.kind, token.line, token.column);
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while !matches!(self.peek(), None | Some('\n')) {
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn single(&mut self, kind: TokenKind) -> Token {
        let (line, column) = (self.line, self.column);
        self.advance();
        Token::new(kind, line, column, 1)
    }

    fn consume_amp(&mut self) -> Token {
        let (line, column) = (self.line, self.column);
        self.advance(); // '&'
        match self.peek() {
            Some('?') => {
                self.advance();
                Token::new(TokenKind::AnonRef, line, column, 2)
            }
            Some('!') => {
                self.advance();
                Token::new(TokenKind::GlobalRef, line, column, 2)
            }
            _ => Token::new(TokenKind::Ref, line, column, 1),
        }
    }

    fn consume_ident(&mut self) -> Token {
        let (line, column) = (self.line, self.column);
        let mut lexeme = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                lexeme.push(c);
                self.advance();
            } else {
                break;
            }
        }
        let length = lexeme.chars().count();
        let kind = match lexeme.as_str() {
            "map" => TokenKind::Map,
            "zip" => TokenKind::Zip,
            "bind" => TokenKind::Bind,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            _ => TokenKind::Ident(lexeme),
        };
        Token::new(kind, line, column, length)
    }

    fn consume_number(&mut self) -> Result<Token> {
        let (line, column) = (self.line, self.column);
        let mut lexeme = String::new();

        if self.peek() == Some('-') {
            lexeme.push('-');
            self.advance();
        }
        if !matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            return Err(JsonMapError::Lex {
                message: "malformed number: expected digit".to_string(),
                line,
                column,
            });
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                lexeme.push(c);
                self.advance();
            } else {
                break;
            }
        }
        if self.peek() == Some('.') && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) {
            lexeme.push('.');
            self.advance();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    lexeme.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let mut exp = String::new();
            exp.push(self.advance().unwrap());
            if matches!(self.peek(), Some('+') | Some('-')) {
                exp.push(self.advance().unwrap());
            }
            if !matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                return Err(JsonMapError::Lex {
                    message: "malformed number: expected digit in exponent".to_string(),
                    line,
                    column,
                });
            }
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    exp.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
            lexeme.push_str(&exp);
        }

        let value: f64 = lexeme.parse().map_err(|_| JsonMapError::Lex {
            message: format!("malformed number `{lexeme}`"),
            line,
            column,
        })?;
        if !value.is_finite() {
            return Err(JsonMapError::Lex {
                message: format!("malformed number `{lexeme}`: out of range"),
                line,
                column,
            });
        }
        let length = lexeme.chars().count();
        Ok(Token::new(TokenKind::Num(value), line, column, length))
    }

    fn consume_string(&mut self) -> Result<Token> {
        let (line, column) = (self.line, self.column);
        self.advance(); // opening quote
        let mut value = String::new();
        let mut length = 2; // the two quote characters

        loop {
            match self.advance() {
                None => {
                    return Err(JsonMapError::Lex {
                        message: "unterminated string literal".to_string(),
                        line,
                        column,
                    });
                }
                Some('"') => break,
                Some('\\') => {
                    length += 1;
                    let escape = self.advance().ok_or(JsonMapError::Lex {
                        message: "unterminated string literal".to_string(),
                        line,
                        column,
                    })?;
                    length += 1;
                    match escape {
                        '"' => value.push('"'),
                        '\\' => value.push('\\'),
                        '/' => value.push('/'),
                        'n' => value.push('\n'),
                        'r' => value.push('\r'),
                        't' => value.push('\t'),
                        'b' => value.push('\u{0008}'),
                        'f' => value.push('\u{000C}'),
                        'u' => {
                            let mut hex = String::new();
                            for _ in 0..4 {
                                let h = self.advance().ok_or(JsonMapError::Lex {
                                    message: "unterminated \\u escape".to_string(),
                                    line,
                                    column,
                                })?;
                                hex.push(h);
                                length += 1;
                            }
                            let code = u32::from_str_radix(&hex, 16).map_err(|_| {
                                JsonMapError::Lex {
                                    message: format!("invalid \\u escape `{hex}`"),
                                    line,
                                    column,
                                }
                            })?;
                            let ch = char::from_u32(code).ok_or(JsonMapError::Lex {
                                message: format!("invalid unicode code point `{hex}`"),
                                line,
                                column,
                            })?;
                            value.push(ch);
                        }
                        other => {
                            return Err(JsonMapError::Lex {
                                message: format!("invalid escape sequence `\\{other}`"),
                                line,
                                column,
                            });
                        }
                    }
                }
                Some(c) => {
                    value.push(c);
                    length += 1;
                }
            }
        }

        Ok(Token::new(TokenKind::Str(value), line, column, length))
    }
}
