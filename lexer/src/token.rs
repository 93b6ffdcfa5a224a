use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommentKind {
    /// `// ...` up to the end of the line
    Line,
    /// `/* ... */`
    Block,
    /// `/** ... */`
    Doc,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Keyword {
    // jack
    Class,
    Constructor,
    Method,
    Function,
    Int,
    Boolean,
    Char,
    Void,
    Var,
    Static,
    Field,
    Let,
    Do,
    If,
    Else,
    While,
    Return,
    True,
    False,
    Null,
    This,
    // vm
    Push,
    Pop,
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
    Label,
    Goto,
    Call,
}

impl Keyword {
    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Class => "class",
            Keyword::Constructor => "constructor",
            Keyword::Method => "method",
            Keyword::Function => "function",
            Keyword::Int => "int",
            Keyword::Boolean => "boolean",
            Keyword::Char => "char",
            Keyword::Void => "void",
            Keyword::Var => "var",
            Keyword::Static => "static",
            Keyword::Field => "field",
            Keyword::Let => "let",
            Keyword::Do => "do",
            Keyword::If => "if",
            Keyword::Else => "else",
            Keyword::While => "while",
            Keyword::Return => "return",
            Keyword::True => "true",
            Keyword::False => "false",
            Keyword::Null => "null",
            Keyword::This => "this",
            Keyword::Push => "push",
            Keyword::Pop => "pop",
            Keyword::Add => "add",
            Keyword::Sub => "sub",
            Keyword::Neg => "neg",
            Keyword::Eq => "eq",
            Keyword::Gt => "gt",
            Keyword::Lt => "lt",
            Keyword::And => "and",
            Keyword::Or => "or",
            Keyword::Not => "not",
            Keyword::Label => "label",
            Keyword::Goto => "goto",
            Keyword::Call => "call",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// A character no production of the dialect starts with.
    Unknown,
    /// A recognised but malformed lexeme: lone `\r`, unterminated string.
    Illegal,
    Eof,
    Newline,
    Comment(CommentKind),
    Keyword(Keyword),
    LParen,
    RParen,
    LBrack,
    RBrack,
    LBrace,
    RBrace,
    Comma,
    Semi,
    Equal,
    Period,
    Plus,
    Minus,
    Mult,
    Div,
    And,
    Or,
    Tilde,
    Lt,
    Gt,
    At,
    IntConst,
    StringConst,
    Ident,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Unknown => "unknown character",
            TokenKind::Illegal => "illegal token",
            TokenKind::Eof => "end of file",
            TokenKind::Newline => "newline",
            TokenKind::Comment(_) => "comment",
            TokenKind::Keyword(kw) => kw.as_str(),
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBrack => "'['",
            TokenKind::RBrack => "']'",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::Comma => "','",
            TokenKind::Semi => "';'",
            TokenKind::Equal => "'='",
            TokenKind::Period => "'.'",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Mult => "'*'",
            TokenKind::Div => "'/'",
            TokenKind::And => "'&'",
            TokenKind::Or => "'|'",
            TokenKind::Tilde => "'~'",
            TokenKind::Lt => "'<'",
            TokenKind::Gt => "'>'",
            TokenKind::At => "'@'",
            TokenKind::IntConst => "integer constant",
            TokenKind::StringConst => "string constant",
            TokenKind::Ident => "identifier",
        }
    }

    /// Comments, newlines and the end of input all terminate a line-oriented command.
    pub fn is_eol(&self) -> bool {
        matches!(
            self,
            TokenKind::Comment(_) | TokenKind::Newline | TokenKind::Eof
        )
    }

    pub fn is_anomaly(&self) -> bool {
        matches!(self, TokenKind::Unknown | TokenKind::Illegal)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lexeme and the position of its first character.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub line: usize,
    pub col: usize,
    pub kind: TokenKind,
    pub literal: String,
}

/// Largest value an integer constant may take: a 15-bit address.
pub const MAX_INT: u16 = 32767;

impl Token {
    pub fn new(line: usize, col: usize, kind: TokenKind, literal: impl Into<String>) -> Self {
        Self {
            line,
            col,
            kind,
            literal: literal.into(),
        }
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    /// Value of an integer constant if it lies in `0..=MAX_INT`.
    pub fn int_value(&self) -> Option<u16> {
        if self.kind != TokenKind::IntConst {
            return None;
        }
        self.literal
            .parse::<u32>()
            .ok()
            .filter(|&n| n <= MAX_INT as u32)
            .map(|n| n as u16)
    }
}

/// A value tagged with the source line it came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Spanned<T> {
    pub item: T,
    pub line: usize,
}

impl<T> Spanned<T> {
    pub fn new(item: T, line: usize) -> Self {
        Self { item, line }
    }
}
