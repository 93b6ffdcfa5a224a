use std::{fmt, mem};

use log::trace;

use crate::diagnostic::Diagnostic;
use crate::token::{Token, TokenKind};
use crate::tokenizer::Tokenizer;

/// Two-token window over a tokenizer (current + lookahead) with the
/// expect-peek idiom and a diagnostic sink shared by every parser.
pub struct TokenCursor<'a> {
    tokens: Tokenizer<'a>,
    cur: Token,
    peek: Token,
    diagnostics: Vec<Diagnostic>,
    report_anomalies: bool,
}

/// Short description of a token for messages: its kind, plus the text for
/// kinds whose text is not implied by the kind.
pub fn describe(tok: &Token) -> String {
    match tok.kind {
        TokenKind::Ident
        | TokenKind::IntConst
        | TokenKind::StringConst
        | TokenKind::Unknown
        | TokenKind::Illegal => format!("{} {:?}", tok.kind, tok.literal),
        _ => tok.kind.to_string(),
    }
}

impl<'a> TokenCursor<'a> {
    pub fn new(tokens: Tokenizer<'a>) -> Self {
        Self::build(tokens, false)
    }

    /// Like `new`, but every `Unknown`/`Illegal` token pulled from the
    /// tokenizer is also recorded as a diagnostic.
    pub fn reporting_anomalies(tokens: Tokenizer<'a>) -> Self {
        Self::build(tokens, true)
    }

    fn build(tokens: Tokenizer<'a>, report_anomalies: bool) -> Self {
        let mut cursor = Self {
            tokens,
            cur: Token::new(0, 0, TokenKind::Eof, ""),
            peek: Token::new(0, 0, TokenKind::Eof, ""),
            diagnostics: Vec::new(),
            report_anomalies,
        };
        cursor.cur = cursor.pull();
        cursor.peek = cursor.pull();
        cursor
    }

    fn pull(&mut self) -> Token {
        let tok = self.tokens.next_token();
        trace!("{}:{} {:?} {:?}", tok.line, tok.col, tok.kind, tok.literal);
        if self.report_anomalies && tok.kind.is_anomaly() {
            let message = describe(&tok);
            self.diagnostics
                .push(Diagnostic::new(tok.line, tok.col, message));
        }
        tok
    }

    pub fn cur(&self) -> &Token {
        &self.cur
    }

    pub fn peek(&self) -> &Token {
        &self.peek
    }

    pub fn advance(&mut self) {
        let next = self.pull();
        self.cur = mem::replace(&mut self.peek, next);
    }

    /// Advances and returns the token that was current.
    pub fn bump(&mut self) -> Token {
        let next = self.pull();
        let peek = mem::replace(&mut self.peek, next);
        mem::replace(&mut self.cur, peek)
    }

    pub fn cur_is(&self, kind: TokenKind) -> bool {
        self.cur.is(kind)
    }

    pub fn peek_is(&self, kind: TokenKind) -> bool {
        self.peek.is(kind)
    }

    /// Advances if the lookahead is `kind`; otherwise records a diagnostic
    /// and leaves the cursor where it is.
    pub fn expect_peek(&mut self, kind: TokenKind) -> bool {
        if self.peek_is(kind) {
            self.advance();
            true
        } else {
            self.peek_error(kind);
            false
        }
    }

    /// Like `expect_peek` for the end of a line-oriented command.
    pub fn expect_peek_eol(&mut self) -> bool {
        if self.peek.kind.is_eol() {
            self.advance();
            true
        } else {
            self.peek_error("end of line");
            false
        }
    }

    pub fn peek_error(&mut self, expected: impl fmt::Display) {
        let message = format!(
            "expected next token to be {}, got {} instead",
            expected,
            describe(&self.peek)
        );
        self.diagnostics
            .push(Diagnostic::new(self.peek.line, self.peek.col, message));
    }

    pub fn cur_error(&mut self, message: impl Into<String>) {
        self.diagnostics
            .push(Diagnostic::new(self.cur.line, self.cur.col, message));
    }

    pub fn error(&mut self, line: usize, col: usize, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::new(line, col, message));
    }

    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        mem::take(&mut self.diagnostics)
    }

    /// Consumes the rest of the input, so that lexing anomalies past the
    /// point where parsing stopped still get reported.
    pub fn drain(&mut self) {
        while !self.cur_is(TokenKind::Eof) {
            self.advance();
        }
    }
}
