//! Syntax tree of one Jack class. Every node keeps the token it starts at.

use lexer::{Keyword, Token};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeRef {
    Int,
    Char,
    Boolean,
    Class(String),
}

impl TypeRef {
    pub fn name(&self) -> &str {
        match self {
            TypeRef::Int => "int",
            TypeRef::Char => "char",
            TypeRef::Boolean => "boolean",
            TypeRef::Class(name) => name,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassVarKind {
    Static,
    Field,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubroutineKind {
    Constructor,
    Function,
    Method,
}

impl SubroutineKind {
    pub fn from_keyword(kw: Keyword) -> Option<Self> {
        match kw {
            Keyword::Constructor => Some(SubroutineKind::Constructor),
            Keyword::Function => Some(SubroutineKind::Function),
            Keyword::Method => Some(SubroutineKind::Method),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Class {
    pub token: Token,
    pub name: String,
    pub vars: Vec<ClassVarDec>,
    pub subroutines: Vec<SubroutineDec>,
}

/// `static|field type name (, name)* ;`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassVarDec {
    pub token: Token,
    pub kind: ClassVarKind,
    pub ty: TypeRef,
    pub names: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubroutineDec {
    pub token: Token,
    pub kind: SubroutineKind,
    /// `None` for `void`.
    pub ret: Option<TypeRef>,
    pub name: String,
    pub params: Vec<Parameter>,
    pub body: SubroutineBody,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parameter {
    pub token: Token,
    pub ty: TypeRef,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubroutineBody {
    pub token: Token,
    pub vars: Vec<VarDec>,
    pub statements: Vec<Statement>,
}

/// `var type name (, name)* ;`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VarDec {
    pub token: Token,
    pub ty: TypeRef,
    pub names: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Statement {
    Let {
        token: Token,
        name: String,
        index: Option<Expression>,
        value: Expression,
    },
    If {
        token: Token,
        cond: Expression,
        then: Vec<Statement>,
        els: Option<Vec<Statement>>,
    },
    While {
        token: Token,
        cond: Expression,
        body: Vec<Statement>,
    },
    Do {
        token: Token,
        call: SubroutineCall,
    },
    Return {
        token: Token,
        value: Option<Expression>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Lt,
    Gt,
    Eq,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeywordConst {
    True,
    False,
    Null,
    This,
}

/// A term followed by operator/term pairs, applied left to right with no
/// precedence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expression {
    pub term: Term,
    pub rest: Vec<(BinaryOp, Term)>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Term {
    IntConst(Token, u16),
    StringConst(Token),
    KeywordConst(Token, KeywordConst),
    Var(Token),
    Index(Token, Box<Expression>),
    Call(SubroutineCall),
    Group(Token, Box<Expression>),
    Unary(Token, UnaryOp, Box<Term>),
}

/// `name(args)` or `qualifier.name(args)`; whether the qualifier is a
/// variable or a class is decided during code generation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubroutineCall {
    pub token: Token,
    pub qualifier: Option<String>,
    pub name: String,
    pub args: Vec<Expression>,
}
