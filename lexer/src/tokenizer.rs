use crate::token::{CommentKind, Keyword, Token, TokenKind};

pub const DEFAULT_TAB_WIDTH: usize = 4;

/// The three source languages of the toolchain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dialect {
    Jack,
    Vm,
    Asm,
}

impl Dialect {
    pub fn keyword(&self, s: &str) -> Option<Keyword> {
        match self {
            Dialect::Jack => Some(match s {
                "class" => Keyword::Class,
                "constructor" => Keyword::Constructor,
                "method" => Keyword::Method,
                "function" => Keyword::Function,
                "int" => Keyword::Int,
                "boolean" => Keyword::Boolean,
                "char" => Keyword::Char,
                "void" => Keyword::Void,
                "var" => Keyword::Var,
                "static" => Keyword::Static,
                "field" => Keyword::Field,
                "let" => Keyword::Let,
                "do" => Keyword::Do,
                "if" => Keyword::If,
                "else" => Keyword::Else,
                "while" => Keyword::While,
                "return" => Keyword::Return,
                "true" => Keyword::True,
                "false" => Keyword::False,
                "null" => Keyword::Null,
                "this" => Keyword::This,
                _ => return None,
            }),
            Dialect::Vm => Some(match s {
                "push" => Keyword::Push,
                "pop" => Keyword::Pop,
                "add" => Keyword::Add,
                "sub" => Keyword::Sub,
                "neg" => Keyword::Neg,
                "eq" => Keyword::Eq,
                "gt" => Keyword::Gt,
                "lt" => Keyword::Lt,
                "and" => Keyword::And,
                "or" => Keyword::Or,
                "not" => Keyword::Not,
                "label" => Keyword::Label,
                "goto" => Keyword::Goto,
                "if" => Keyword::If,
                "function" => Keyword::Function,
                "call" => Keyword::Call,
                "return" => Keyword::Return,
                _ => return None,
            }),
            Dialect::Asm => None,
        }
    }

    fn is_ident_start(&self, c: u8) -> bool {
        c.is_ascii_alphabetic()
            || c == b'_'
            || (*self == Dialect::Asm && matches!(c, b'.' | b'$' | b':'))
    }

    fn is_ident_char(&self, c: u8) -> bool {
        c.is_ascii_alphanumeric()
            || c == b'_'
            || match self {
                Dialect::Jack => false,
                // reserve $ as internal symbol
                Dialect::Vm => matches!(c, b'.' | b':'),
                Dialect::Asm => matches!(c, b'.' | b'$' | b':'),
            }
    }
}

#[derive(Clone, Copy)]
struct Pos {
    line: usize,
    col: usize,
}

/// Lazily splits source text into tokens. Never fails: characters it cannot
/// classify come back as `Unknown` or `Illegal` tokens.
pub struct Tokenizer<'a> {
    s: &'a str,
    p: usize,
    pos: Pos,
    dialect: Dialect,
    tab_width: usize,
    skip_comments: bool,
    skip_newlines: bool,
    done: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str, dialect: Dialect) -> Self {
        Self {
            s: source,
            p: 0,
            pos: Pos { line: 1, col: 1 },
            dialect,
            tab_width: DEFAULT_TAB_WIDTH,
            skip_comments: false,
            skip_newlines: false,
            done: false,
        }
    }

    pub fn skip_comments(mut self) -> Self {
        self.skip_comments = true;
        self
    }

    pub fn skip_newlines(mut self) -> Self {
        self.skip_newlines = true;
        self
    }

    pub fn tab_width(mut self, width: usize) -> Self {
        self.tab_width = width;
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn byte(&self, offset: usize) -> Option<u8> {
        self.s.as_bytes().get(self.p + offset).copied()
    }

    fn mov_p(&mut self, n: usize) {
        let bytes = self.s.as_bytes();
        for _ in 0..n {
            if self.p >= bytes.len() {
                break;
            }
            match bytes[self.p] {
                b'\n' => {
                    self.pos.line += 1;
                    self.pos.col = 1;
                }
                b'\t' => self.pos.col += self.tab_width,
                // continuation bytes of a multi-byte character
                c if c & 0xc0 == 0x80 => {}
                _ => self.pos.col += 1,
            }
            self.p += 1;
        }
    }

    fn scan(&mut self, mut accept: impl FnMut(u8) -> bool) -> &'a str {
        let b = self.p;
        while let Some(c) = self.byte(0) {
            if !accept(c) {
                break;
            }
            self.mov_p(1);
        }
        &self.s[b..self.p]
    }

    fn skip_blanks(&mut self) {
        self.scan(|c| matches!(c, b' ' | b'\t' | 0x0b | 0x0c));
    }

    fn next_line_comment(&mut self, start: Pos) -> Token {
        let text = self.scan(|c| c != b'\n' && c != b'\r');
        Token::new(
            start.line,
            start.col,
            TokenKind::Comment(CommentKind::Line),
            text,
        )
    }

    fn next_block_comment(&mut self, start: Pos) -> Token {
        let b = self.p;
        let kind = if self.byte(2) == Some(b'*') && self.byte(3) != Some(b'/') {
            CommentKind::Doc
        } else {
            CommentKind::Block
        };
        self.mov_p(2);
        let mut closed = false;
        while let Some(c) = self.byte(0) {
            if c == b'*' && self.byte(1) == Some(b'/') {
                self.mov_p(2);
                closed = true;
                break;
            }
            self.mov_p(1);
        }
        let text = &self.s[b..self.p];
        let kind = if closed {
            TokenKind::Comment(kind)
        } else {
            TokenKind::Illegal
        };
        Token::new(start.line, start.col, kind, text)
    }

    fn next_string(&mut self, start: Pos) -> Token {
        self.mov_p(1);
        let text = self.scan(|c| !matches!(c, b'"' | b'\n' | b'\r'));
        if self.byte(0) == Some(b'"') {
            self.mov_p(1);
            Token::new(start.line, start.col, TokenKind::StringConst, text)
        } else {
            Token::new(start.line, start.col, TokenKind::Illegal, text)
        }
    }

    fn next_ident_or_keyword(&mut self, start: Pos) -> Token {
        let dialect = self.dialect;
        let b = self.p;
        self.mov_p(1);
        self.scan(|c| dialect.is_ident_char(c));
        let s = &self.s[b..self.p];
        let kind = dialect
            .keyword(s)
            .map(TokenKind::Keyword)
            .unwrap_or(TokenKind::Ident);
        Token::new(start.line, start.col, kind, s)
    }

    fn next_symbol(&mut self, start: Pos, kind: TokenKind) -> Token {
        let b = self.p;
        self.mov_p(1);
        Token::new(start.line, start.col, kind, &self.s[b..self.p])
    }

    fn next_unknown(&mut self, start: Pos) -> Token {
        let ch = self.s[self.p..].chars().next().unwrap_or('\u{fffd}');
        self.mov_p(ch.len_utf8().max(1));
        Token::new(start.line, start.col, TokenKind::Unknown, ch.to_string())
    }

    fn next_raw(&mut self) -> Token {
        self.skip_blanks();
        let start = self.pos;
        let c = match self.byte(0) {
            Some(c) => c,
            None => return Token::new(start.line, start.col, TokenKind::Eof, ""),
        };
        match c {
            b'\n' => self.next_symbol(start, TokenKind::Newline),
            b'\r' => {
                if self.byte(1) == Some(b'\n') {
                    self.mov_p(2);
                    Token::new(start.line, start.col, TokenKind::Newline, "\n")
                } else {
                    self.next_symbol(start, TokenKind::Illegal)
                }
            }
            b'/' => match self.byte(1) {
                Some(b'/') => self.next_line_comment(start),
                Some(b'*') => self.next_block_comment(start),
                _ => self.next_symbol(start, TokenKind::Div),
            },
            b'(' => self.next_symbol(start, TokenKind::LParen),
            b')' => self.next_symbol(start, TokenKind::RParen),
            b'[' => self.next_symbol(start, TokenKind::LBrack),
            b']' => self.next_symbol(start, TokenKind::RBrack),
            b'{' => self.next_symbol(start, TokenKind::LBrace),
            b'}' => self.next_symbol(start, TokenKind::RBrace),
            b',' => self.next_symbol(start, TokenKind::Comma),
            b';' => self.next_symbol(start, TokenKind::Semi),
            b'=' => self.next_symbol(start, TokenKind::Equal),
            b'+' => self.next_symbol(start, TokenKind::Plus),
            b'-' => self.next_symbol(start, TokenKind::Minus),
            b'*' => self.next_symbol(start, TokenKind::Mult),
            b'&' => self.next_symbol(start, TokenKind::And),
            b'|' => self.next_symbol(start, TokenKind::Or),
            b'~' => self.next_symbol(start, TokenKind::Tilde),
            b'<' => self.next_symbol(start, TokenKind::Lt),
            b'>' => self.next_symbol(start, TokenKind::Gt),
            b'@' => self.next_symbol(start, TokenKind::At),
            b'"' => self.next_string(start),
            c if c.is_ascii_digit() => {
                let digits = self.scan(|c| c.is_ascii_digit());
                Token::new(start.line, start.col, TokenKind::IntConst, digits)
            }
            c if self.dialect.is_ident_start(c) => self.next_ident_or_keyword(start),
            b'.' => self.next_symbol(start, TokenKind::Period),
            _ => self.next_unknown(start),
        }
    }

    /// Returns the next token that survives the skip policy. Once the input
    /// is exhausted every call returns `Eof`.
    pub fn next_token(&mut self) -> Token {
        loop {
            let tok = self.next_raw();
            match tok.kind {
                TokenKind::Comment(_) if self.skip_comments => continue,
                TokenKind::Newline if self.skip_newlines => continue,
                _ => break tok,
            }
        }
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token;

    /// Yields every token up to and including the first `Eof`.
    fn next(&mut self) -> Option<Token> {
        if self.done {
            return None;
        }
        let tok = self.next_token();
        if tok.is(TokenKind::Eof) {
            self.done = true;
        }
        Some(tok)
    }
}
