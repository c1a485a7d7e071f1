//! Recursive-descent parser: token stream to `Program` AST (spec §4.2).
//!
//! The grammar has two spots that need more than ordinary top-down
//! parsing:
//!
//! * **Object-body dialect.** `{ … }` can use `key = expr;` (statement
//!   style) or `"key": expr,` (JSON style), but not both in the same
//!   body. The parser commits to whichever separator it sees after the
//!   first key and rejects the other one for the rest of the body.
//! * **`zip` source/body split.** `zip` takes one or more source
//!   expressions followed by a body, and both sources and bodies can be
//!   `[…]`/`{…}` syntactically. After parsing each expression the parser
//!   peeks at the next token: if it could start another expression,
//!   what was just parsed is a source and parsing continues; otherwise
//!   it is the body, and it must be a list or object literal.

use log::debug;

use crate::ast::{Binding, Body, Expr, PathStep, Program, RefRoot};
use crate::error::{JsonMapError, Result};
use crate::token::{Token, TokenKind};

pub fn parse_program(tokens: Vec<Token>) -> Result<Program> {
    debug!("parsing program of {} tokens", tokens.len());
    Parser::new(tokens).parse_program()
}

#[derive(Clone, Copy, PartialEq)]
enum Dialect {
    Json,
    Stmt,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn error(&self, message: impl Into<String>) -> JsonMapError {
        let tok = self.peek();
        JsonMapError::Parse {
            message: message.into(),
            line: tok.line,
            column: tok.column,
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.error(format!(
                "expected {}, found {}",
                kind.describe(),
                self.peek().kind.describe()
            )))
        }
    }

    // ---- top level ----------------------------------------------------

    fn parse_program(&mut self) -> Result<Program> {
        let mut bindings = Vec::new();
        let mut seen = std::collections::HashSet::new();
        while !self.check(&TokenKind::Eof) {
            let name_tok = self.peek().clone();
            let binding = self.parse_binding()?;
            if !seen.insert(binding.name.clone()) {
                return Err(JsonMapError::Parse {
                    message: format!("duplicate binding name `{}`", binding.name),
                    line: name_tok.line,
                    column: name_tok.column,
                });
            }
            bindings.push(binding);
            match &self.peek().kind {
                TokenKind::Semicolon => {
                    self.advance();
                }
                TokenKind::Eof => break,
                _ => {
                    return Err(self.error(format!(
                        "expected `;` or end of input, found {}",
                        self.peek().kind.describe()
                    )))
                }
            }
        }
        Ok(Program { bindings })
    }

    fn parse_binding(&mut self) -> Result<Binding> {
        let name = self.parse_name()?;
        self.expect(TokenKind::Eq)?;
        let expr = self.parse_expr()?;
        Ok(Binding { name, expr })
    }

    fn parse_name(&mut self) -> Result<String> {
        match self.peek().kind.clone() {
            TokenKind::Ident(s) => {
                self.advance();
                Ok(s)
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(s)
            }
            other => Err(self.error(format!("expected a name, found {}", other.describe()))),
        }
    }

    // ---- expressions ----------------------------------------------------

    fn parse_expr(&mut self) -> Result<Expr> {
        match self.peek().kind.clone() {
            TokenKind::Null => {
                self.advance();
                Ok(Expr::JsonNull)
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::JsonBool(true))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::JsonBool(false))
            }
            TokenKind::Num(n) => {
                self.advance();
                Ok(Expr::JsonNumber(n))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Expr::JsonString(s))
            }
            TokenKind::Ref => self.parse_ref(RefRoot::Current),
            TokenKind::AnonRef => self.parse_ref(RefRoot::Anonymous),
            TokenKind::GlobalRef => self.parse_ref(RefRoot::Global),
            TokenKind::LBracket => self.parse_list_literal(),
            TokenKind::LBrace => {
                self.advance();
                let entries = self.parse_object_body()?;
                Ok(Expr::ObjectLit(entries))
            }
            TokenKind::Map => self.parse_map(),
            TokenKind::Zip => self.parse_zip(),
            TokenKind::Bind => self.parse_bind(),
            other => Err(self.error(format!("expected an expression, found {}", other.describe()))),
        }
    }

    fn starts_expr(kind: &TokenKind) -> bool {
        matches!(
            kind,
            TokenKind::Null
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Num(_)
                | TokenKind::Str(_)
                | TokenKind::Ref
                | TokenKind::AnonRef
                | TokenKind::GlobalRef
                | TokenKind::LBracket
                | TokenKind::LBrace
                | TokenKind::Map
                | TokenKind::Zip
                | TokenKind::Bind
        )
    }

    // ---- references ----------------------------------------------------

    fn parse_ref(&mut self, root: RefRoot) -> Result<Expr> {
        self.advance(); // '&' / '&?' / '&!'
        let mut path = Vec::new();
        // `&name` and (per the tutorial's `&!store`, `store = &!store;`
        // style) `&!name`/`&?name` all allow the first step to follow
        // immediately, without a leading dot; later steps always need one.
        if self.peek_starts_path_step() {
            path.push(self.parse_path_step()?);
        }
        while self.check(&TokenKind::Dot) {
            self.advance();
            path.push(self.parse_path_step()?);
        }
        Ok(Expr::Ref { root, path })
    }

    fn peek_starts_path_step(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::Ident(_) | TokenKind::Str(_) | TokenKind::Num(_)
        )
    }

    fn parse_path_step(&mut self) -> Result<PathStep> {
        match self.peek().kind.clone() {
            TokenKind::Ident(s) => {
                self.advance();
                Ok(PathStep::Field(s))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(PathStep::Field(s))
            }
            TokenKind::Num(n) => {
                if n < 0.0 || n.fract() != 0.0 {
                    return Err(self.error(format!(
                        "path index must be a non-negative integer, found {n}"
                    )));
                }
                self.advance();
                Ok(PathStep::Index(n as u64))
            }
            other => Err(self.error(format!(
                "expected a field name or index, found {}",
                other.describe()
            ))),
        }
    }

    // ---- lists ----------------------------------------------------

    fn parse_list_literal(&mut self) -> Result<Expr> {
        self.advance(); // '['
        if self.check(&TokenKind::RBracket) {
            self.advance();
            return Ok(Expr::ListLit(Vec::new()));
        }
        let items = self.parse_comma_separated(TokenKind::RBracket)?;
        Ok(Expr::ListLit(items))
    }

    /// Parses `expr (',' expr)* ','?` up to (and consuming) `close`.
    /// Assumes the opening delimiter has already been consumed and that
    /// at least one expression is present.
    fn parse_comma_separated(&mut self, close: TokenKind) -> Result<Vec<Expr>> {
        let mut items = Vec::new();
        loop {
            items.push(self.parse_expr()?);
            if self.check(&TokenKind::Comma) {
                self.advance();
                if self.check(&close) {
                    break;
                }
            } else {
                break;
            }
        }
        self.expect(close)?;
        Ok(items)
    }

    // ---- object bodies ----------------------------------------------------

    /// Parses `objectBody '}'`, having already consumed the opening `{`.
    fn parse_object_body(&mut self) -> Result<Vec<(String, Expr)>> {
        if self.check(&TokenKind::RBrace) {
            self.advance();
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        let mut dialect: Option<Dialect> = None;
        loop {
            let name = self.parse_name()?;
            match self.peek().kind {
                TokenKind::Colon => {
                    self.commit_dialect(&mut dialect, Dialect::Json)?;
                    self.advance();
                    entries.push((name, self.parse_expr()?));
                }
                TokenKind::Eq => {
                    self.commit_dialect(&mut dialect, Dialect::Stmt)?;
                    self.advance();
                    entries.push((name, self.parse_expr()?));
                }
                _ => {
                    return Err(self.error(format!(
                        "expected `:` or `=`, found {}",
                        self.peek().kind.describe()
                    )))
                }
            }
            let separator = match dialect.unwrap() {
                Dialect::Json => TokenKind::Comma,
                Dialect::Stmt => TokenKind::Semicolon,
            };
            if self.check(&separator) {
                self.advance();
                if self.check(&TokenKind::RBrace) {
                    break;
                }
            } else if self.check(&TokenKind::RBrace) {
                break;
            } else {
                return Err(self.error(format!(
                    "expected {} or `}}`, found {}",
                    separator.describe(),
                    self.peek().kind.describe()
                )));
            }
        }
        self.expect(TokenKind::RBrace)?;
        check_unique(entries.iter().map(|(k, _)| k.as_str()), "object")?;
        Ok(entries)
    }

    fn commit_dialect(&mut self, dialect: &mut Option<Dialect>, found: Dialect) -> Result<()> {
        match dialect {
            None => {
                *dialect = Some(found);
                Ok(())
            }
            Some(existing) if *existing == found => Ok(()),
            Some(_) => {
                log::warn!("object body mixes dialects at {:?}", self.peek());
                Err(self.error(
                    "mixed object body styles: an object body must use either `key = expr;` \
                     throughout or `\"key\": expr,` throughout, not both",
                ))
            }
        }
    }

    // ---- map / zip / bind ----------------------------------------------------

    fn parse_body(&mut self) -> Result<Body> {
        match self.peek().kind {
            TokenKind::LBracket => {
                self.advance();
                if self.check(&TokenKind::RBracket) {
                    return Err(self.error("list body must contain at least one expression"));
                }
                let items = self.parse_comma_separated(TokenKind::RBracket)?;
                Ok(Body::List(items))
            }
            TokenKind::LBrace => {
                self.advance();
                let entries = self.parse_object_body()?;
                Ok(Body::Object(entries))
            }
            _ => Err(self.error(format!(
                "expected a body (`[` or `{{`), found {}",
                self.peek().kind.describe()
            ))),
        }
    }

    fn parse_map(&mut self) -> Result<Expr> {
        self.advance(); // 'map'
        let source = self.parse_expr()?;
        let body = self.parse_body()?;
        Ok(Expr::Map {
            source: Box::new(source),
            body: Box::new(body),
        })
    }

    fn parse_bind(&mut self) -> Result<Expr> {
        self.advance(); // 'bind'
        let source = self.parse_expr()?;
        let body = self.parse_body()?;
        Ok(Expr::Bind {
            source: Box::new(source),
            body: Box::new(body),
        })
    }

    /// Parses `expr+ body`, where the final list/object literal — the one
    /// not followed by anything that could start another expression — is
    /// the body, and everything before it is a source.
    fn parse_zip(&mut self) -> Result<Expr> {
        self.advance(); // 'zip'
        let mut sources = Vec::new();
        loop {
            let expr = self.parse_expr()?;
            if Self::starts_expr(&self.peek().kind) {
                sources.push(expr);
                continue;
            }
            let body = match expr {
                Expr::ListLit(items) => {
                    if items.is_empty() {
                        return Err(self.error("zip body must contain at least one expression"));
                    }
                    Body::List(items)
                }
                Expr::ObjectLit(entries) => Body::Object(entries),
                _ => return Err(self.error("zip requires a list or object body")),
            };
            if sources.is_empty() {
                return Err(self.error("zip requires at least one source expression"));
            }
            return Ok(Expr::Zip {
                sources,
                body: Box::new(body),
            });
        }
    }
}

fn check_unique<'a>(names: impl Iterator<Item = &'a str>, scope: &str) -> Result<()> {
    let mut seen = std::collections::HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(JsonMapError::DuplicateKey {
                path: scope.to_string(),
                key: name.to_string(),
            });
        }
    }
    Ok(())
}
