use std::collections::{HashMap, HashSet};

use assembler::{Comp, Dest, Instruction, Jump, Operand, Operator};
use lexer::Spanned;
use log::trace;

use crate::command::{ArithmeticOp, Command, Segment};
use crate::error::{
    DuplicateLabelSnafu, Error, InvalidIndexSnafu, PopConstantSnafu, TooManyArgumentsSnafu,
    UndefinedLabelSnafu,
};

const R_SP: &str = "SP";
const R_LCL: &str = "LCL";
const R_ARG: &str = "ARG";
const R_THIS: &str = "THIS";
const R_THAT: &str = "THAT";
const R_R13: &str = "R13";
const R_R14: &str = "R14";
const R_TEMPS: [&str; 8] = ["R5", "R6", "R7", "R8", "R9", "R10", "R11", "R12"];
const R_PTRS: [&str; 2] = [R_THIS, R_THAT];

/// Largest segment offset addressed with `A=M+1`/`A=A+1` chains; larger
/// offsets are added to the base with `D`.
const DIRECT_OFFSET_MAX: u16 = 2;

pub(crate) const STACK_BASE: u16 = 256;
pub(crate) const ENTRY_POINT: &str = "Sys.init";
const RETURN_LABEL: &str = "$RETURN";
/// `ARG = SP - 5 - n` must stay an A-instruction constant.
pub(crate) const MAX_CALL_ARGS: u16 = lexer::MAX_INT - 5;

fn segment_base(seg: Segment) -> Option<&'static str> {
    match seg {
        Segment::Local => Some(R_LCL),
        Segment::Argument => Some(R_ARG),
        Segment::This => Some(R_THIS),
        Segment::That => Some(R_THAT),
        _ => None,
    }
}

struct Jumped {
    symbol: String,
    context: String,
    line: usize,
    label: String,
}

/// Lowers VM commands of one translation unit to assembly, handing each
/// instruction to `emit` as it is produced. Label counters live here, so
/// every file of a program must go through the same translator.
pub(crate) struct Translator<E> {
    labels: HashSet<String>,
    label_indexes: HashMap<String, usize>,
    /// `goto`/`if-goto` targets, checked against `labels` once every unit is in.
    jumps: Vec<Jumped>,
    file: String,
    function: Option<String>,
    annotate: bool,
    uses_return: bool,
    errors: Vec<Error>,
    emit: E,
}

impl<E> Translator<E>
where
    E: FnMut(Instruction),
{
    pub(crate) fn new(annotate: bool, emit: E) -> Self {
        Self {
            labels: HashSet::new(),
            label_indexes: HashMap::new(),
            jumps: Vec::new(),
            file: String::new(),
            function: None,
            annotate,
            uses_return: false,
            errors: Vec::new(),
            emit,
        }
    }

    /// Starts a new source file: statics and unscoped labels take its name.
    pub(crate) fn set_file(&mut self, name: &str) {
        self.file = name.to_string();
        self.function = None;
    }

    fn context(&self) -> &str {
        self.function.as_deref().unwrap_or(&self.file)
    }

    fn emit_ref(&mut self, a: &str) {
        (self.emit)(Instruction::symbol(a));
    }

    fn emit_value(&mut self, v: u16) {
        (self.emit)(Instruction::value(v));
    }

    fn emit_label(&mut self, l: &str) {
        (self.emit)(Instruction::Label(l.to_string()));
    }

    fn emit_comment(&mut self, text: impl Into<String>) {
        if self.annotate {
            (self.emit)(Instruction::Comment(text.into()));
        }
    }

    fn emit_set(&mut self, dest: Dest, operand: Operand) {
        (self.emit)(Instruction::Compute(dest, Comp::Unary(None, operand), None));
    }

    fn emit_unary(&mut self, dest: Dest, op: Operator, operand: Operand) {
        (self.emit)(Instruction::Compute(
            dest,
            Comp::Unary(Some(op), operand),
            None,
        ));
    }

    fn emit_binary(&mut self, dest: Dest, l: Operand, op: Operator, r: Operand) {
        (self.emit)(Instruction::Compute(dest, Comp::Binary(l, op, r), None));
    }

    fn emit_jump(&mut self, label: &str, cond: Operand, jump: Jump) {
        self.emit_ref(label);
        (self.emit)(Instruction::Compute(
            Dest::none(),
            Comp::Unary(None, cond),
            Some(jump),
        ));
    }

    fn emit_goto(&mut self, label: &str) {
        self.emit_jump(label, Operand::Zero, Jump::JMP);
    }

    fn emit_load_mem_d(&mut self, symbol: &str) {
        self.emit_ref(symbol);
        self.emit_set(Dest::d(), Operand::M);
    }

    fn emit_store_d(&mut self, symbol: &str) {
        self.emit_ref(symbol);
        self.emit_set(Dest::m(), Operand::D);
    }

    fn emit_store_int(&mut self, symbol: &str, value: i16) {
        match value {
            0 | 1 => {
                self.emit_ref(symbol);
                self.emit_set(
                    Dest::m(),
                    if value == 0 {
                        Operand::Zero
                    } else {
                        Operand::One
                    },
                );
            }
            -1 => {
                self.emit_ref(symbol);
                self.emit_unary(Dest::m(), Operator::Minus, Operand::One);
            }
            _ => {
                self.emit_value(value.unsigned_abs());
                if value < 0 {
                    self.emit_unary(Dest::d(), Operator::Minus, Operand::A);
                } else {
                    self.emit_set(Dest::d(), Operand::A);
                }
                self.emit_store_d(symbol);
            }
        }
    }

    // A=RAM[symbol]+offset
    fn emit_ptr_to_a(&mut self, symbol: &str, offset: i32) {
        let n = offset.unsigned_abs() as u16;
        let op = if offset < 0 {
            Operator::Minus
        } else {
            Operator::Plus
        };
        if n <= DIRECT_OFFSET_MAX {
            self.emit_ref(symbol);
            if n == 0 {
                self.emit_set(Dest::a(), Operand::M);
            } else {
                self.emit_binary(Dest::a(), Operand::M, op, Operand::One);
            }
            for _ in 1..n {
                self.emit_binary(Dest::a(), Operand::A, op, Operand::One);
            }
        } else {
            self.emit_value(n);
            self.emit_set(Dest::d(), Operand::A);
            self.emit_ref(symbol);
            if offset < 0 {
                self.emit_binary(Dest::a(), Operand::M, Operator::Minus, Operand::D);
            } else {
                self.emit_binary(Dest::a(), Operand::D, Operator::Plus, Operand::M);
            }
        }
    }

    fn emit_inc_sp(&mut self) {
        self.emit_ref(R_SP);
        self.emit_binary(Dest::m(), Operand::M, Operator::Plus, Operand::One);
    }

    // SP-=1, A=SP
    fn emit_dec_sp(&mut self) {
        self.emit_ref(R_SP);
        self.emit_binary(
            Dest::new(true, false, true),
            Operand::M,
            Operator::Minus,
            Operand::One,
        );
    }

    fn emit_push_d(&mut self) {
        // RAM[SP]=D
        self.emit_ref(R_SP);
        self.emit_set(Dest::a(), Operand::M);
        self.emit_set(Dest::m(), Operand::D);
        self.emit_inc_sp();
    }

    fn emit_push_bool(&mut self, value: bool) {
        self.emit_ref(R_SP);
        self.emit_set(Dest::a(), Operand::M);
        if value {
            self.emit_unary(Dest::m(), Operator::Minus, Operand::One);
        } else {
            self.emit_set(Dest::m(), Operand::Zero);
        }
        self.emit_inc_sp();
    }

    fn emit_pop_d(&mut self) {
        self.emit_dec_sp();
        self.emit_set(Dest::d(), Operand::M);
    }

    fn index_label(&mut self, base: String) -> String {
        let index = self.label_indexes.entry(base.clone()).or_insert(0);
        let label = format!("{}.{}", base, index);
        *index += 1;
        label
    }

    fn check_index(
        &mut self,
        line: usize,
        segment: Segment,
        index: u16,
        len: u16,
        expected: &'static str,
    ) -> bool {
        if index < len {
            return true;
        }
        let err = InvalidIndexSnafu {
            context: self.context(),
            line,
            segment,
            index,
            expected,
        }
        .build();
        self.errors.push(err);
        false
    }

    fn static_symbol(&self, i: u16) -> String {
        format!("{}.{}", self.file, i)
    }

    fn translate_push(&mut self, line: usize, seg: Segment, i: u16) {
        match seg {
            Segment::Local | Segment::Argument | Segment::This | Segment::That => {
                let base = segment_base(seg).unwrap_or(R_LCL);
                // D=RAM[RAM[base]+i]
                self.emit_ptr_to_a(base, i as i32);
                self.emit_set(Dest::d(), Operand::M);
            }
            Segment::Constant => {
                if i <= 1 {
                    self.emit_ref(R_SP);
                    self.emit_set(Dest::a(), Operand::M);
                    self.emit_set(
                        Dest::m(),
                        if i == 0 { Operand::Zero } else { Operand::One },
                    );
                    self.emit_inc_sp();
                    return;
                }
                // D=i
                self.emit_value(i);
                self.emit_set(Dest::d(), Operand::A);
            }
            Segment::Static => {
                let symbol = self.static_symbol(i);
                self.emit_load_mem_d(&symbol);
            }
            Segment::Temp => {
                if !self.check_index(line, seg, i, 8, "0-7") {
                    return;
                }
                self.emit_load_mem_d(R_TEMPS[i as usize]);
            }
            Segment::Pointer => {
                if !self.check_index(line, seg, i, 2, "0 or 1") {
                    return;
                }
                self.emit_load_mem_d(R_PTRS[i as usize]);
            }
        }
        self.emit_push_d();
    }

    fn translate_pop(&mut self, line: usize, seg: Segment, i: u16) {
        match seg {
            Segment::Local | Segment::Argument | Segment::This | Segment::That => {
                let base = segment_base(seg).unwrap_or(R_LCL);
                if i <= DIRECT_OFFSET_MAX {
                    self.emit_pop_d();
                    self.emit_ptr_to_a(base, i as i32);
                    self.emit_set(Dest::m(), Operand::D);
                } else {
                    // R13=RAM[base]+i
                    self.emit_ptr_to_a(base, i as i32);
                    self.emit_set(Dest::d(), Operand::A);
                    self.emit_store_d(R_R13);
                    self.emit_pop_d();
                    // RAM[R13]=D
                    self.emit_ref(R_R13);
                    self.emit_set(Dest::a(), Operand::M);
                    self.emit_set(Dest::m(), Operand::D);
                }
            }
            Segment::Constant => {
                let err = PopConstantSnafu {
                    context: self.context(),
                    line,
                }
                .build();
                self.errors.push(err);
            }
            Segment::Static => {
                self.emit_pop_d();
                let symbol = self.static_symbol(i);
                self.emit_store_d(&symbol);
            }
            Segment::Temp => {
                if self.check_index(line, seg, i, 8, "0-7") {
                    self.emit_pop_d();
                    self.emit_store_d(R_TEMPS[i as usize]);
                }
            }
            Segment::Pointer => {
                if self.check_index(line, seg, i, 2, "0 or 1") {
                    self.emit_pop_d();
                    self.emit_store_d(R_PTRS[i as usize]);
                }
            }
        }
    }

    fn translate_arithmetic(&mut self, op: ArithmeticOp) {
        match op {
            ArithmeticOp::Add | ArithmeticOp::Sub | ArithmeticOp::And | ArithmeticOp::Or => {
                self.emit_pop_d();
                self.emit_dec_sp();
                match op {
                    ArithmeticOp::Add => {
                        self.emit_binary(Dest::d(), Operand::D, Operator::Plus, Operand::M)
                    }
                    ArithmeticOp::And => {
                        self.emit_binary(Dest::d(), Operand::D, Operator::And, Operand::M)
                    }
                    ArithmeticOp::Or => {
                        self.emit_binary(Dest::d(), Operand::D, Operator::Or, Operand::M)
                    }
                    _ => self.emit_binary(Dest::d(), Operand::M, Operator::Minus, Operand::D),
                }
                self.emit_push_d();
            }
            ArithmeticOp::Neg | ArithmeticOp::Not => {
                self.emit_dec_sp();
                let unary = if op == ArithmeticOp::Neg {
                    Operator::Minus
                } else {
                    Operator::Not
                };
                self.emit_unary(Dest::d(), unary, Operand::M);
                self.emit_push_d();
            }
            ArithmeticOp::Eq | ArithmeticOp::Gt | ArithmeticOp::Lt => {
                let jump = match op {
                    ArithmeticOp::Eq => Jump::JEQ,
                    ArithmeticOp::Gt => Jump::JGT,
                    _ => Jump::JLT,
                };
                let base = format!("${}.{}", op.as_str().to_uppercase(), self.context());
                let true_label = self.index_label(base);
                let end_label = format!("{}.end", true_label);
                // D=lhs-rhs
                self.emit_pop_d();
                self.emit_dec_sp();
                self.emit_binary(Dest::d(), Operand::M, Operator::Minus, Operand::D);
                self.emit_jump(&true_label, Operand::D, jump);
                self.emit_push_bool(false);
                self.emit_goto(&end_label);
                self.emit_label(&true_label);
                self.emit_push_bool(true);
                self.emit_label(&end_label);
            }
        }
    }

    fn define_label(&mut self, line: usize, label: &str) -> bool {
        if self.labels.insert(label.to_string()) {
            return true;
        }
        let err = DuplicateLabelSnafu {
            context: self.context(),
            line,
            label,
        }
        .build();
        self.errors.push(err);
        false
    }

    fn label_symbol(&self, label: &str) -> String {
        format!("{}${}", self.context(), label)
    }

    fn jump_symbol(&mut self, line: usize, label: &str) -> String {
        let symbol = self.label_symbol(label);
        self.jumps.push(Jumped {
            symbol: symbol.clone(),
            context: self.context().to_string(),
            line,
            label: label.to_string(),
        });
        symbol
    }

    pub(crate) fn translate_call(&mut self, name: &str, n: u16) {
        let ret_label = self.index_label(format!("$RET.{}", name));
        // push <ret_label>
        self.emit_ref(&ret_label);
        self.emit_set(Dest::d(), Operand::A);
        self.emit_push_d();
        // push LCL, ARG, THIS, THAT
        for r in [R_LCL, R_ARG, R_THIS, R_THAT] {
            self.emit_load_mem_d(r);
            self.emit_push_d();
        }
        // ARG=SP-5-n
        self.emit_value(n + 5);
        self.emit_set(Dest::d(), Operand::A);
        self.emit_ref(R_SP);
        self.emit_binary(Dest::d(), Operand::M, Operator::Minus, Operand::D);
        self.emit_store_d(R_ARG);
        // LCL=SP
        self.emit_load_mem_d(R_SP);
        self.emit_store_d(R_LCL);
        self.emit_goto(name);
        self.emit_label(&ret_label);
    }

    fn translate_function(&mut self, line: usize, name: &str, n: u16) {
        self.function = Some(name.to_string());
        if !self.define_label(line, name) {
            return;
        }
        self.emit_label(name);
        if n > 0 {
            self.emit_set(Dest::d(), Operand::Zero);
            for _ in 0..n {
                self.emit_push_d();
            }
        }
    }

    pub(crate) fn translate(&mut self, command: &Spanned<Command>) {
        let line = command.line;
        trace!("{} (line {}): {}", self.context(), line, command.item);
        if self.annotate {
            let text = format!("{} (line {}): '{}'", self.context(), line, command.item);
            self.emit_comment(text);
        }
        match &command.item {
            Command::Arithmetic(op) => self.translate_arithmetic(*op),
            Command::Push(seg, i) => self.translate_push(line, *seg, *i),
            Command::Pop(seg, i) => self.translate_pop(line, *seg, *i),
            Command::Label(label) => {
                let label = self.label_symbol(label);
                if self.define_label(line, &label) {
                    self.emit_label(&label);
                }
            }
            Command::Goto(label) => {
                let label = self.jump_symbol(line, label);
                self.emit_goto(&label);
            }
            Command::IfGoto(label) => {
                self.emit_pop_d();
                let label = self.jump_symbol(line, label);
                self.emit_jump(&label, Operand::D, Jump::JNE);
            }
            Command::Function(name, n) => self.translate_function(line, name, *n),
            Command::Call(_, n) if *n > MAX_CALL_ARGS => {
                let err = TooManyArgumentsSnafu {
                    context: self.context(),
                    line,
                    count: *n,
                }
                .build();
                self.errors.push(err);
            }
            Command::Call(name, n) => self.translate_call(name, *n),
            Command::Return => {
                self.uses_return = true;
                self.emit_goto(RETURN_LABEL);
            }
        }
    }

    pub(crate) fn bootstrap(&mut self) {
        self.emit_comment("bootstrap");
        self.emit_store_int(R_SP, STACK_BASE as i16);
        self.emit_store_int(R_LCL, -1);
        self.emit_store_int(R_ARG, -2);
        self.emit_store_int(R_THIS, -3);
        self.emit_store_int(R_THAT, -4);
        self.translate_call(ENTRY_POINT, 0);
    }

    fn translate_shared_return(&mut self) {
        self.emit_comment("shared return");
        self.emit_label(RETURN_LABEL);
        // R13=LCL
        self.emit_load_mem_d(R_LCL);
        self.emit_store_d(R_R13);
        // R14=RAM[R13-5]
        self.emit_ptr_to_a(R_R13, -5);
        self.emit_set(Dest::d(), Operand::M);
        self.emit_store_d(R_R14);
        // RAM[ARG]=pop()
        self.emit_pop_d();
        self.emit_ptr_to_a(R_ARG, 0);
        self.emit_set(Dest::m(), Operand::D);
        // SP=ARG+1
        self.emit_ref(R_ARG);
        self.emit_binary(Dest::d(), Operand::M, Operator::Plus, Operand::One);
        self.emit_store_d(R_SP);
        // THAT, THIS, ARG, LCL = RAM[R13-1..R13-4]
        for (offset, r) in [(-1, R_THAT), (-2, R_THIS), (-3, R_ARG), (-4, R_LCL)] {
            self.emit_ptr_to_a(R_R13, offset);
            self.emit_set(Dest::d(), Operand::M);
            self.emit_store_d(r);
        }
        // JMP R14
        self.emit_ref(R_R14);
        self.emit_set(Dest::a(), Operand::M);
        self.emit_goto_a();
    }

    fn emit_goto_a(&mut self) {
        (self.emit)(Instruction::Compute(
            Dest::none(),
            Comp::Unary(None, Operand::Zero),
            Some(Jump::JMP),
        ));
    }

    /// Appends the shared return routine if any function returned, and
    /// hands back every error met along the way.
    pub(crate) fn finish(mut self) -> Vec<Error> {
        if self.uses_return {
            self.translate_shared_return();
        }
        for jump in &self.jumps {
            if !self.labels.contains(&jump.symbol) {
                let err = UndefinedLabelSnafu {
                    context: jump.context.as_str(),
                    line: jump.line,
                    label: jump.label.as_str(),
                }
                .build();
                self.errors.push(err);
            }
        }
        self.errors
    }
}
