use std::collections::HashMap;

use lexer::Token;
use log::{debug, trace};
use vmtranslator::{ArithmeticOp, Command, Segment};

use crate::ast::*;
use crate::error::{Result, UnresolvedSymbolSnafu};
use crate::symbols::{Symbol, SymbolKind, SymbolTable};

const ALLOC_FUNC: &str = "Memory.alloc";

/// Lowers one class to VM commands. Label numbering and symbol scopes live
/// here, so independent classes can be compiled concurrently.
pub struct Generator {
    instrs: Vec<Command>,
    cls_name: String,
    class_symbols: SymbolTable,
    routine_symbols: SymbolTable,
    label_indexes: HashMap<&'static str, u32>,
}

impl Generator {
    pub fn new() -> Self {
        Self {
            instrs: Vec::new(),
            cls_name: String::new(),
            class_symbols: SymbolTable::new(),
            routine_symbols: SymbolTable::new(),
            label_indexes: HashMap::new(),
        }
    }

    fn i(&mut self, instr: Command) {
        self.instrs.push(instr);
    }

    fn push(&mut self, seg: Segment, v: u16) {
        self.i(Command::Push(seg, v))
    }

    fn pop(&mut self, seg: Segment, v: u16) {
        self.i(Command::Pop(seg, v))
    }

    fn op(&mut self, op: ArithmeticOp) {
        self.i(Command::Arithmetic(op))
    }

    fn call(&mut self, fn_name: impl Into<String>, args: usize) {
        self.i(Command::Call(fn_name.into(), args as u16))
    }

    fn label(&mut self, label: &str) {
        self.i(Command::Label(label.to_string()));
    }

    fn goto(&mut self, label: &str) {
        self.i(Command::Goto(label.to_string()));
    }

    fn if_goto(&mut self, label: &str) {
        self.i(Command::IfGoto(label.to_string()));
    }

    /// Next `BASE_n` for this class; each base counts from 1.
    fn index_label(&mut self, base: &'static str) -> String {
        let n = self.label_indexes.entry(base).or_insert(0);
        *n += 1;
        format!("{}_{}", base, n)
    }

    fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.routine_symbols
            .get(name)
            .or_else(|| self.class_symbols.get(name))
    }

    fn resolve(&self, name: &str, tok: &Token) -> Result<Symbol> {
        match self.lookup(name) {
            Some(sym) => Ok(sym.clone()),
            None => UnresolvedSymbolSnafu {
                class: self.cls_name.as_str(),
                name,
                line: tok.line,
                col: tok.col,
            }
            .fail(),
        }
    }

    fn push_symbol(&mut self, sym: &Symbol) {
        self.push(sym.kind.segment(), sym.index)
    }

    fn gen_string(&mut self, s: &str) {
        self.push(Segment::Constant, s.len() as u16);
        self.call("String.new", 1);
        for c in s.bytes() {
            self.push(Segment::Constant, c as u16);
            self.call("String.appendChar", 2);
        }
    }

    fn gen_call(&mut self, call: &SubroutineCall) -> Result<()> {
        let (fn_name, receiver) = match &call.qualifier {
            None => {
                self.push(Segment::Pointer, 0);
                (format!("{}.{}", self.cls_name, call.name), 1)
            }
            Some(qualifier) => match self.lookup(qualifier).cloned() {
                Some(sym) => {
                    self.push_symbol(&sym);
                    (format!("{}.{}", sym.ty, call.name), 1)
                }
                None => (format!("{}.{}", qualifier, call.name), 0),
            },
        };
        for arg in &call.args {
            self.push_expr(arg)?;
        }
        self.call(fn_name, receiver + call.args.len());
        Ok(())
    }

    /// Leaves `base + index` on the stack.
    fn push_element_address(&mut self, name: &str, tok: &Token, index: &Expression) -> Result<()> {
        let sym = self.resolve(name, tok)?;
        self.push_symbol(&sym);
        self.push_expr(index)?;
        self.op(ArithmeticOp::Add);
        Ok(())
    }

    fn push_term(&mut self, term: &Term) -> Result<()> {
        match term {
            Term::IntConst(_, v) => self.push(Segment::Constant, *v),
            Term::StringConst(tok) => self.gen_string(&tok.literal),
            Term::KeywordConst(_, kw) => match kw {
                KeywordConst::True => {
                    self.push(Segment::Constant, 1);
                    self.op(ArithmeticOp::Neg);
                }
                KeywordConst::False | KeywordConst::Null => self.push(Segment::Constant, 0),
                KeywordConst::This => self.push(Segment::Pointer, 0),
            },
            Term::Var(tok) => {
                let sym = self.resolve(&tok.literal, tok)?;
                self.push_symbol(&sym);
            }
            Term::Index(tok, index) => {
                self.push_element_address(&tok.literal, tok, index)?;
                self.pop(Segment::Pointer, 1);
                self.push(Segment::That, 0);
            }
            Term::Call(call) => self.gen_call(call)?,
            Term::Group(_, expr) => self.push_expr(expr)?,
            Term::Unary(_, op, term) => {
                self.push_term(term)?;
                self.op(match op {
                    UnaryOp::Neg => ArithmeticOp::Neg,
                    UnaryOp::Not => ArithmeticOp::Not,
                });
            }
        }
        Ok(())
    }

    fn push_expr(&mut self, expr: &Expression) -> Result<()> {
        self.push_term(&expr.term)?;
        for (op, term) in &expr.rest {
            self.push_term(term)?;
            match op {
                BinaryOp::Add => self.op(ArithmeticOp::Add),
                BinaryOp::Sub => self.op(ArithmeticOp::Sub),
                BinaryOp::Mul => self.call("Math.multiply", 2),
                BinaryOp::Div => self.call("Math.divide", 2),
                BinaryOp::And => self.op(ArithmeticOp::And),
                BinaryOp::Or => self.op(ArithmeticOp::Or),
                BinaryOp::Lt => self.op(ArithmeticOp::Lt),
                BinaryOp::Gt => self.op(ArithmeticOp::Gt),
                BinaryOp::Eq => self.op(ArithmeticOp::Eq),
            }
        }
        Ok(())
    }

    fn gen_stmts(&mut self, stmts: &[Statement]) -> Result<()> {
        for stmt in stmts {
            self.gen_stmt(stmt)?;
        }
        Ok(())
    }

    fn gen_stmt(&mut self, stmt: &Statement) -> Result<()> {
        match stmt {
            Statement::Let {
                token,
                name,
                index: None,
                value,
            } => {
                self.push_expr(value)?;
                let sym = self.resolve(name, token)?;
                self.pop(sym.kind.segment(), sym.index);
            }
            Statement::Let {
                token,
                name,
                index: Some(index),
                value,
            } => {
                // address first: the value may itself move `that`
                self.push_element_address(name, token, index)?;
                self.push_expr(value)?;
                self.pop(Segment::Temp, 0);
                self.pop(Segment::Pointer, 1);
                self.push(Segment::Temp, 0);
                self.pop(Segment::That, 0);
            }
            Statement::If {
                cond, then, els, ..
            } => {
                self.push_expr(cond)?;
                self.op(ArithmeticOp::Not);
                let end_label = self.index_label("END_IF");
                match els {
                    None => {
                        self.if_goto(&end_label);
                        self.gen_stmts(then)?;
                    }
                    Some(els) => {
                        let else_label = self.index_label("ELSE_IF");
                        self.if_goto(&else_label);
                        self.gen_stmts(then)?;
                        self.goto(&end_label);
                        self.label(&else_label);
                        self.gen_stmts(els)?;
                    }
                }
                self.label(&end_label);
            }
            Statement::While { cond, body, .. } => {
                let begin_label = self.index_label("WHILE");
                let end_label = self.index_label("END_WHILE");
                self.label(&begin_label);
                self.push_expr(cond)?;
                self.op(ArithmeticOp::Not);
                self.if_goto(&end_label);
                self.gen_stmts(body)?;
                self.goto(&begin_label);
                self.label(&end_label);
            }
            Statement::Do { call, .. } => {
                self.gen_call(call)?;
                self.pop(Segment::Temp, 0);
            }
            Statement::Return { value, .. } => {
                match value {
                    Some(value) => self.push_expr(value)?,
                    None => self.push(Segment::Constant, 0),
                }
                self.i(Command::Return);
            }
        }
        Ok(())
    }

    pub fn gen_subroutine(&mut self, sub: &SubroutineDec) -> Result<()> {
        self.routine_symbols.clear();
        if sub.kind == SubroutineKind::Method {
            let cls_name = self.cls_name.clone();
            self.routine_symbols
                .define("this", &cls_name, SymbolKind::Argument);
        }
        for param in &sub.params {
            self.routine_symbols
                .define(&param.name, param.ty.name(), SymbolKind::Argument);
        }
        for dec in &sub.body.vars {
            for name in &dec.names {
                self.routine_symbols
                    .define(name, dec.ty.name(), SymbolKind::Local);
            }
        }
        let locals = self.routine_symbols.count(SymbolKind::Local);
        trace!("{}.{}: {} locals", self.cls_name, sub.name, locals);
        self.i(Command::Function(
            format!("{}.{}", self.cls_name, sub.name),
            locals,
        ));
        match sub.kind {
            SubroutineKind::Constructor => {
                let fields = self.class_symbols.count(SymbolKind::Field);
                self.push(Segment::Constant, fields);
                self.call(ALLOC_FUNC, 1);
                self.pop(Segment::Pointer, 0);
            }
            SubroutineKind::Method => {
                self.push(Segment::Argument, 0);
                self.pop(Segment::Pointer, 0);
            }
            SubroutineKind::Function => {}
        }
        self.gen_stmts(&sub.body.statements)
    }

    pub fn gen_class(&mut self, cls: &Class) -> Result<()> {
        self.cls_name = cls.name.clone();
        self.class_symbols.clear();
        self.label_indexes.clear();
        for dec in &cls.vars {
            let kind = match dec.kind {
                ClassVarKind::Static => SymbolKind::Static,
                ClassVarKind::Field => SymbolKind::Field,
            };
            for name in &dec.names {
                self.class_symbols.define(name, dec.ty.name(), kind);
            }
        }
        for sub in &cls.subroutines {
            self.gen_subroutine(sub)?;
        }
        debug!("class {}: {} vm commands", cls.name, self.instrs.len());
        Ok(())
    }

    pub fn instructions(&self) -> &[Command] {
        &self.instrs
    }

    pub fn into_instructions(self) -> Vec<Command> {
        self.instrs
    }
}

impl Default for Generator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::parser::parse;

    fn compile(src: &str) -> Result<String> {
        let class = parse(src).unwrap();
        let mut gen = Generator::new();
        gen.gen_class(&class)?;
        Ok(vmtranslator::render_vm(gen.instructions()))
    }

    fn lines(src: &str) -> Vec<String> {
        compile(src).unwrap().lines().map(str::to_string).collect()
    }

    #[test]
    fn test_constructor_and_fields() {
        let out = lines(
            "class P {
                field int x, y;
                static int n;
                constructor P new(int ax) { let x = ax; let n = n + 1; return this; }
            }",
        );
        assert_eq!(
            out,
            [
                "function P.new 0",
                "push constant 2",
                "call Memory.alloc 1",
                "pop pointer 0",
                "push argument 0",
                "pop this 0",
                "push static 0",
                "push constant 1",
                "add",
                "pop static 0",
                "push pointer 0",
                "return",
            ]
        );
    }

    #[test]
    fn test_method_calls() {
        let out = lines(
            "class P {
                field P next;
                method int get(int k) { var int a; let a = k; return a; }
                method void f() {
                    var P p;
                    do get(1);
                    do p.get(2);
                    do next.get(3);
                    do Output.printInt(4);
                    return;
                }
            }",
        );
        let expected = [
            "function P.get 1",
            "push argument 0",
            "pop pointer 0",
            "push argument 1",
            "pop local 0",
            "push local 0",
            "return",
            "function P.f 1",
            "push argument 0",
            "pop pointer 0",
            "push pointer 0",
            "push constant 1",
            "call P.get 2",
            "pop temp 0",
            "push local 0",
            "push constant 2",
            "call P.get 2",
            "pop temp 0",
            "push this 0",
            "push constant 3",
            "call P.get 2",
            "pop temp 0",
            "push constant 4",
            "call Output.printInt 1",
            "pop temp 0",
            "push constant 0",
            "return",
        ];
        assert_eq!(out, expected);
    }

    #[test]
    fn test_arrays_and_strings() {
        let out = lines(
            "class M {
                function void main() {
                    var Array a, b;
                    let a[1] = b[2];
                    do Output.printString(\"Hi\");
                    return;
                }
            }",
        );
        assert_eq!(
            out[1..],
            [
                "push local 0",
                "push constant 1",
                "add",
                "push local 1",
                "push constant 2",
                "add",
                "pop pointer 1",
                "push that 0",
                "pop temp 0",
                "pop pointer 1",
                "push temp 0",
                "pop that 0",
                "push constant 2",
                "call String.new 1",
                "push constant 72",
                "call String.appendChar 2",
                "push constant 105",
                "call String.appendChar 2",
                "call Output.printString 1",
                "pop temp 0",
                "push constant 0",
                "return",
            ]
        );
    }

    #[test]
    fn test_operators_and_constants() {
        let out = lines(
            "class M {
                function int f(int x) {
                    return -x * 2 / (x - 1) & true | ~false < null > 3 = 4;
                }
            }",
        );
        assert_eq!(
            out[1..],
            [
                "push argument 0",
                "neg",
                "push constant 2",
                "call Math.multiply 2",
                "push argument 0",
                "push constant 1",
                "sub",
                "call Math.divide 2",
                "push constant 1",
                "neg",
                "and",
                "push constant 0",
                "not",
                "or",
                "push constant 0",
                "lt",
                "push constant 3",
                "gt",
                "push constant 4",
                "eq",
                "return",
            ]
        );
    }

    #[test]
    fn test_control_flow_labels() {
        let out = lines(
            "class M {
                function void f(int x) {
                    while (x) { if (x) { let x = 0; } }
                    if (x) { let x = 1; } else { let x = 2; }
                    return;
                }
                function void g() {
                    while (true) { }
                    return;
                }
            }",
        );
        let expected = [
            "function M.f 0",
            "label WHILE_1",
            "push argument 0",
            "not",
            "if-goto END_WHILE_1",
            "push argument 0",
            "not",
            "if-goto END_IF_1",
            "push constant 0",
            "pop argument 0",
            "label END_IF_1",
            "goto WHILE_1",
            "label END_WHILE_1",
            "push argument 0",
            "not",
            "if-goto ELSE_IF_1",
            "push constant 1",
            "pop argument 0",
            "goto END_IF_2",
            "label ELSE_IF_1",
            "push constant 2",
            "pop argument 0",
            "label END_IF_2",
            "push constant 0",
            "return",
            "function M.g 0",
            "label WHILE_2",
            "push constant 1",
            "neg",
            "not",
            "if-goto END_WHILE_2",
            "goto WHILE_2",
            "label END_WHILE_2",
            "push constant 0",
            "return",
        ];
        assert_eq!(out, expected);
    }

    #[test]
    fn test_shadowing() {
        let out = lines(
            "class M {
                field int x;
                method int f() { var int x; let x = 1; return x; }
                method int g() { return x; }
            }",
        );
        assert!(out.contains(&"pop local 0".to_string()));
        assert_eq!(out[out.len() - 2], "push this 0");
    }

    #[test]
    fn test_unresolved() {
        let err = compile("class M { function void f() { let y = 1; return; } }").unwrap_err();
        assert!(matches!(err, Error::UnresolvedSymbol { ref name, line: 1, col: 31, .. } if name == "y"));
        assert_eq!(
            err.to_string(),
            "internal compiler error (M - line 1, col 31): unresolved symbol 'y'"
        );
    }
}
