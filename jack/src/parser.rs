use lexer::{describe, Diagnostic, Dialect, Keyword, Token, TokenCursor, TokenKind, Tokenizer};
use log::debug;

use crate::ast::*;

/// Recursive descent over a `TokenCursor`. Every production starts with the
/// cursor on its first token and leaves it on its last one; a production
/// that fails records one diagnostic and returns `None`, which aborts the
/// whole class.
pub struct Parser<'a> {
    cursor: TokenCursor<'a>,
}

fn kw(kw: Keyword) -> TokenKind {
    TokenKind::Keyword(kw)
}

fn binary_op(kind: TokenKind) -> Option<BinaryOp> {
    Some(match kind {
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Mult => BinaryOp::Mul,
        TokenKind::Div => BinaryOp::Div,
        TokenKind::And => BinaryOp::And,
        TokenKind::Or => BinaryOp::Or,
        TokenKind::Lt => BinaryOp::Lt,
        TokenKind::Gt => BinaryOp::Gt,
        TokenKind::Equal => BinaryOp::Eq,
        _ => return None,
    })
}

fn is_statement(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Keyword(Keyword::Let | Keyword::If | Keyword::While | Keyword::Do | Keyword::Return)
    )
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        let tokens = Tokenizer::new(source, Dialect::Jack)
            .skip_comments()
            .skip_newlines();
        Self {
            cursor: TokenCursor::reporting_anomalies(tokens),
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Option<()> {
        self.cursor.expect_peek(kind).then_some(())
    }

    fn expect_ident(&mut self) -> Option<String> {
        self.expect(TokenKind::Ident)?;
        Some(self.cursor.cur().literal.clone())
    }

    fn unexpected_cur(&mut self, expected: &str) -> Option<()> {
        let message = format!(
            "expected {}, got {} instead",
            expected,
            describe(self.cursor.cur())
        );
        self.cursor.cur_error(message);
        None
    }

    fn next_type(&mut self) -> Option<TypeRef> {
        let ty = match self.cursor.peek().kind {
            TokenKind::Keyword(Keyword::Int) => TypeRef::Int,
            TokenKind::Keyword(Keyword::Char) => TypeRef::Char,
            TokenKind::Keyword(Keyword::Boolean) => TypeRef::Boolean,
            TokenKind::Ident => TypeRef::Class(self.cursor.peek().literal.clone()),
            _ => {
                self.cursor.peek_error("a type");
                return None;
            }
        };
        self.cursor.advance();
        Some(ty)
    }

    /// `type name (, name)* ;` following a `static`, `field` or `var`.
    fn var_names(&mut self) -> Option<(TypeRef, Vec<String>)> {
        let ty = self.next_type()?;
        let mut names = vec![self.expect_ident()?];
        while self.cursor.peek_is(TokenKind::Comma) {
            self.cursor.advance();
            names.push(self.expect_ident()?);
        }
        self.expect(TokenKind::Semi)?;
        Some((ty, names))
    }

    fn class_var_dec(&mut self) -> Option<ClassVarDec> {
        let token = self.cursor.cur().clone();
        let kind = if token.is(kw(Keyword::Static)) {
            ClassVarKind::Static
        } else {
            ClassVarKind::Field
        };
        let (ty, names) = self.var_names()?;
        Some(ClassVarDec {
            token,
            kind,
            ty,
            names,
        })
    }

    fn var_dec(&mut self) -> Option<VarDec> {
        let token = self.cursor.cur().clone();
        let (ty, names) = self.var_names()?;
        Some(VarDec { token, ty, names })
    }

    fn parameters(&mut self) -> Option<Vec<Parameter>> {
        let mut params = Vec::new();
        if self.cursor.peek_is(TokenKind::RParen) {
            return Some(params);
        }
        loop {
            let ty = self.next_type()?;
            let token = self.cursor.cur().clone();
            let name = self.expect_ident()?;
            params.push(Parameter { token, ty, name });
            if !self.cursor.peek_is(TokenKind::Comma) {
                return Some(params);
            }
            self.cursor.advance();
        }
    }

    /// Statements up to, not including, the closing brace.
    fn statements(&mut self) -> Option<Vec<Statement>> {
        let mut statements = Vec::new();
        while is_statement(self.cursor.peek().kind) {
            self.cursor.advance();
            statements.push(self.statement()?);
        }
        Some(statements)
    }

    fn block(&mut self) -> Option<Vec<Statement>> {
        self.expect(TokenKind::LBrace)?;
        let statements = self.statements()?;
        self.expect(TokenKind::RBrace)?;
        Some(statements)
    }

    fn subroutine_body(&mut self) -> Option<SubroutineBody> {
        self.expect(TokenKind::LBrace)?;
        let token = self.cursor.cur().clone();
        let mut vars = Vec::new();
        while self.cursor.peek_is(kw(Keyword::Var)) {
            self.cursor.advance();
            vars.push(self.var_dec()?);
        }
        let statements = self.statements()?;
        self.expect(TokenKind::RBrace)?;
        Some(SubroutineBody {
            token,
            vars,
            statements,
        })
    }

    fn subroutine_dec(&mut self, kind: SubroutineKind) -> Option<SubroutineDec> {
        let token = self.cursor.cur().clone();
        let ret = if self.cursor.peek_is(kw(Keyword::Void)) {
            self.cursor.advance();
            None
        } else {
            Some(self.next_type()?)
        };
        let name = self.expect_ident()?;
        self.expect(TokenKind::LParen)?;
        let params = self.parameters()?;
        self.expect(TokenKind::RParen)?;
        let body = self.subroutine_body()?;
        Some(SubroutineDec {
            token,
            kind,
            ret,
            name,
            params,
            body,
        })
    }

    fn class(&mut self) -> Option<Class> {
        if !self.cursor.cur_is(kw(Keyword::Class)) {
            self.unexpected_cur("'class'")?;
        }
        let token = self.cursor.cur().clone();
        let name = self.expect_ident()?;
        self.expect(TokenKind::LBrace)?;
        let mut vars = Vec::new();
        let mut subroutines = Vec::new();
        loop {
            match self.cursor.peek().kind {
                TokenKind::Keyword(Keyword::Static | Keyword::Field) => {
                    self.cursor.advance();
                    vars.push(self.class_var_dec()?);
                }
                TokenKind::Keyword(k) if SubroutineKind::from_keyword(k).is_some() => {
                    self.cursor.advance();
                    let kind = SubroutineKind::from_keyword(k)?;
                    subroutines.push(self.subroutine_dec(kind)?);
                }
                TokenKind::RBrace => {
                    self.cursor.advance();
                    break;
                }
                _ => {
                    self.cursor
                        .peek_error("a class variable, a subroutine or '}'");
                    return None;
                }
            }
        }
        self.expect(TokenKind::Eof)?;
        Some(Class {
            token,
            name,
            vars,
            subroutines,
        })
    }

    fn statement(&mut self) -> Option<Statement> {
        let token = self.cursor.cur().clone();
        match token.kind {
            TokenKind::Keyword(Keyword::Let) => {
                let name = self.expect_ident()?;
                let index = if self.cursor.peek_is(TokenKind::LBrack) {
                    self.cursor.advance();
                    let index = self.next_expression()?;
                    self.expect(TokenKind::RBrack)?;
                    Some(index)
                } else {
                    None
                };
                self.expect(TokenKind::Equal)?;
                let value = self.next_expression()?;
                self.expect(TokenKind::Semi)?;
                Some(Statement::Let {
                    token,
                    name,
                    index,
                    value,
                })
            }
            TokenKind::Keyword(Keyword::If) => {
                let cond = self.condition()?;
                let then = self.block()?;
                let els = if self.cursor.peek_is(kw(Keyword::Else)) {
                    self.cursor.advance();
                    Some(self.block()?)
                } else {
                    None
                };
                Some(Statement::If {
                    token,
                    cond,
                    then,
                    els,
                })
            }
            TokenKind::Keyword(Keyword::While) => {
                let cond = self.condition()?;
                let body = self.block()?;
                Some(Statement::While { token, cond, body })
            }
            TokenKind::Keyword(Keyword::Do) => {
                self.expect(TokenKind::Ident)?;
                let call = self.subroutine_call()?;
                self.expect(TokenKind::Semi)?;
                Some(Statement::Do { token, call })
            }
            TokenKind::Keyword(Keyword::Return) => {
                let value = if self.cursor.peek_is(TokenKind::Semi) {
                    None
                } else {
                    Some(self.next_expression()?)
                };
                self.expect(TokenKind::Semi)?;
                Some(Statement::Return { token, value })
            }
            _ => {
                self.unexpected_cur("a statement")?;
                None
            }
        }
    }

    /// `( expression )`
    fn condition(&mut self) -> Option<Expression> {
        self.expect(TokenKind::LParen)?;
        let cond = self.next_expression()?;
        self.expect(TokenKind::RParen)?;
        Some(cond)
    }

    fn next_expression(&mut self) -> Option<Expression> {
        self.cursor.advance();
        self.expression()
    }

    fn expression(&mut self) -> Option<Expression> {
        let term = self.term()?;
        let mut rest = Vec::new();
        while let Some(op) = binary_op(self.cursor.peek().kind) {
            self.cursor.advance();
            self.cursor.advance();
            rest.push((op, self.term()?));
        }
        Some(Expression { term, rest })
    }

    fn term(&mut self) -> Option<Term> {
        let token = self.cursor.cur().clone();
        let term = match token.kind {
            TokenKind::IntConst => match token.int_value() {
                Some(v) => Term::IntConst(token, v),
                None => {
                    let message = format!(
                        "integer {} is out of range 0..={}",
                        token.literal,
                        lexer::MAX_INT
                    );
                    self.cursor.cur_error(message);
                    return None;
                }
            },
            TokenKind::StringConst => {
                if let Some(ch) = token.literal.chars().find(|c| !c.is_ascii()) {
                    self.cursor
                        .cur_error(format!("unsupported character {:?} in string constant", ch));
                    return None;
                }
                Term::StringConst(token)
            }
            TokenKind::Keyword(Keyword::True) => Term::KeywordConst(token, KeywordConst::True),
            TokenKind::Keyword(Keyword::False) => Term::KeywordConst(token, KeywordConst::False),
            TokenKind::Keyword(Keyword::Null) => Term::KeywordConst(token, KeywordConst::Null),
            TokenKind::Keyword(Keyword::This) => Term::KeywordConst(token, KeywordConst::This),
            TokenKind::Ident => match self.cursor.peek().kind {
                TokenKind::LBrack => {
                    self.cursor.advance();
                    let index = self.next_expression()?;
                    self.expect(TokenKind::RBrack)?;
                    Term::Index(token, Box::new(index))
                }
                TokenKind::LParen | TokenKind::Period => Term::Call(self.subroutine_call()?),
                _ => Term::Var(token),
            },
            TokenKind::LParen => {
                let inner = self.next_expression()?;
                self.expect(TokenKind::RParen)?;
                Term::Group(token, Box::new(inner))
            }
            TokenKind::Minus | TokenKind::Tilde => {
                let op = if token.is(TokenKind::Minus) {
                    UnaryOp::Neg
                } else {
                    UnaryOp::Not
                };
                self.cursor.advance();
                Term::Unary(token, op, Box::new(self.term()?))
            }
            _ => {
                self.unexpected_cur("an expression")?;
                return None;
            }
        };
        Some(term)
    }

    /// Starts on the first identifier of `name(...)` or `qualifier.name(...)`.
    fn subroutine_call(&mut self) -> Option<SubroutineCall> {
        let token: Token = self.cursor.cur().clone();
        let (qualifier, name) = if self.cursor.peek_is(TokenKind::Period) {
            self.cursor.advance();
            let name = self.expect_ident()?;
            (Some(token.literal.clone()), name)
        } else {
            (None, token.literal.clone())
        };
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        if !self.cursor.peek_is(TokenKind::RParen) {
            loop {
                args.push(self.next_expression()?);
                if !self.cursor.peek_is(TokenKind::Comma) {
                    break;
                }
                self.cursor.advance();
            }
        }
        self.expect(TokenKind::RParen)?;
        Some(SubroutineCall {
            token,
            qualifier,
            name,
            args,
        })
    }

    pub fn parse(mut self) -> Result<Class, Vec<Diagnostic>> {
        let class = self.class();
        match class {
            Some(class) if !self.cursor.has_errors() => {
                debug!(
                    "parsed class {}: {} variable declarations, {} subroutines",
                    class.name,
                    class.vars.len(),
                    class.subroutines.len()
                );
                Ok(class)
            }
            _ => {
                self.cursor.drain();
                Err(self.cursor.take_diagnostics())
            }
        }
    }
}

/// Parses one Jack class. The first syntax error aborts the class; lexing
/// anomalies anywhere in the file are reported alongside it.
pub fn parse(source: &str) -> Result<Class, Vec<Diagnostic>> {
    Parser::new(source).parse()
}

#[cfg(test)]
pub(crate) mod tests {
    use proptest::prelude::*;

    use super::*;

    pub(crate) static LIST_CODE: &str = r#"
// line comment
/** doc comment */
class List {
    field int data;
    field List next;
    static int nodeCount;

    constructor List new(int car, List cdr) {
        let data = car;
        let next = cdr;
        let nodeCount = nodeCount + 1;
        return this;
    }

    method int getData() { return data; }

    method void print() {
        var List current;
        let current = this;
        while (~(current = null)) {
            do Output.printInt(current.getData());
            do Output.printChar(32);
            let current = current.getNext();
        }
        return;
    }

    function Array readNodes() {
        var Array a;
        var int i, n;
        let a = Array.new(nodeCount);
        let i = 0;
        while (i < nodeCount) {
            let a[i] = Keyboard.readInt("Enter a number:");
            let i = i + 1;
        }
        if (i > 0) { let n = -i; } else { let n = 1; }
        return a;
    }
}
"#;

    #[test]
    fn test_empty_class() {
        let class = parse("class C { }").unwrap();
        assert_eq!(class.name, "C");
        assert!(class.vars.is_empty());
        assert!(class.subroutines.is_empty());
        assert_eq!((class.token.line, class.token.col), (1, 1));
    }

    #[test]
    fn test_list() {
        let class = parse(LIST_CODE).unwrap();
        assert_eq!(class.name, "List");
        assert_eq!(class.vars.len(), 3);
        assert_eq!(class.vars[2].kind, ClassVarKind::Static);
        assert_eq!(class.subroutines.len(), 4);

        let ctor = &class.subroutines[0];
        assert_eq!(ctor.kind, SubroutineKind::Constructor);
        assert_eq!(ctor.ret, Some(TypeRef::Class("List".into())));
        assert_eq!(ctor.params.len(), 2);
        assert_eq!(ctor.params[1].ty, TypeRef::Class("List".into()));
        assert_eq!(ctor.body.statements.len(), 4);

        let print = &class.subroutines[2];
        assert_eq!(print.ret, None);
        match &print.body.statements[1] {
            Statement::While { cond, body, .. } => {
                assert!(matches!(cond.term, Term::Unary(_, UnaryOp::Not, _)));
                assert_eq!(body.len(), 3);
            }
            other => panic!("unexpected statement {:?}", other),
        }

        let read = &class.subroutines[3];
        assert_eq!(read.body.vars[1].names, ["i", "n"]);
        match &read.body.statements[2] {
            Statement::While { body, .. } => match &body[0] {
                Statement::Let { index, value, .. } => {
                    assert!(index.is_some());
                    match &value.term {
                        Term::Call(call) => {
                            assert_eq!(call.qualifier.as_deref(), Some("Keyboard"));
                            assert_eq!(call.name, "readInt");
                            assert_eq!(call.args.len(), 1);
                        }
                        other => panic!("unexpected term {:?}", other),
                    }
                }
                other => panic!("unexpected statement {:?}", other),
            },
            other => panic!("unexpected statement {:?}", other),
        }
        assert!(matches!(
            read.body.statements[3],
            Statement::If { els: Some(_), .. }
        ));
    }

    #[test]
    fn test_flat_expression() {
        let class = parse("class C { function int f() { return 1 + 2 * 3 - (4); } }").unwrap();
        match &class.subroutines[0].body.statements[0] {
            Statement::Return {
                value: Some(expr), ..
            } => {
                assert!(matches!(expr.term, Term::IntConst(_, 1)));
                let ops: Vec<BinaryOp> = expr.rest.iter().map(|(op, _)| *op).collect();
                assert_eq!(ops, [BinaryOp::Add, BinaryOp::Mul, BinaryOp::Sub]);
                assert!(matches!(expr.rest[2].1, Term::Group(..)));
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn test_malformed() {
        for src in [
            "class C {",
            "class { }",
            "class C { function void f() { let x = 1 } }",
            "class C { } }",
            "class C { function void f() { do ; } }",
            "class C { method f() { } }",
            "class C { function void f() { let x = ; } }",
            "let x = 1;",
            "",
        ] {
            let errs = parse(src).unwrap_err();
            assert!(!errs.is_empty(), "{:?}", src);
        }
    }

    #[test]
    fn test_diagnostic_position() {
        let errs = parse("class C {\n  function void f() {\n    let x = 1\n  }\n}").unwrap_err();
        assert_eq!(errs.len(), 1);
        assert_eq!(
            errs[0].to_string(),
            "parsing error (line 4, col 3): expected next token to be ';', got '}' instead"
        );
    }

    #[test]
    fn test_anomalies_reported() {
        let errs = parse("class C { function void f() { return; } } # \"open").unwrap_err();
        let messages: Vec<&str> = errs.iter().map(|d| d.message.as_str()).collect();
        assert!(messages.contains(&"unknown character \"#\""));
        assert_eq!(errs.iter().filter(|d| d.col == 45).count(), 1);
    }

    #[test]
    fn test_int_range() {
        let errs = parse("class C { function int f() { return 32768; } }").unwrap_err();
        assert_eq!(errs[0].message, "integer 32768 is out of range 0..=32767");
        assert!(parse("class C { function int f() { return 32767; } }").is_ok());
    }

    proptest! {
        #[test]
        fn garbage_terminates(src in "[a-z{}();=+.,\\[\\]~\" 0-9\n]{0,64}") {
            let _ = parse(&src);
        }

        #[test]
        fn truncation_never_parses(cut in 1usize..LIST_CODE.trim_end().len()) {
            let src = &LIST_CODE.trim_end()[..cut];
            prop_assert!(parse(src).is_err());
        }
    }
}
