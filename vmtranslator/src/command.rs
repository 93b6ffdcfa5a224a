use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Segment {
    Local,
    Argument,
    This,
    That,
    Constant,
    Static,
    Temp,
    Pointer,
}

impl Segment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Segment::Local => "local",
            Segment::Argument => "argument",
            Segment::This => "this",
            Segment::That => "that",
            Segment::Constant => "constant",
            Segment::Static => "static",
            Segment::Temp => "temp",
            Segment::Pointer => "pointer",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "local" => Segment::Local,
            "argument" => Segment::Argument,
            "this" => Segment::This,
            "that" => Segment::That,
            "constant" => Segment::Constant,
            "static" => Segment::Static,
            "temp" => Segment::Temp,
            "pointer" => Segment::Pointer,
            _ => return None,
        })
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
}

impl ArithmeticOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArithmeticOp::Add => "add",
            ArithmeticOp::Sub => "sub",
            ArithmeticOp::Neg => "neg",
            ArithmeticOp::Eq => "eq",
            ArithmeticOp::Gt => "gt",
            ArithmeticOp::Lt => "lt",
            ArithmeticOp::And => "and",
            ArithmeticOp::Or => "or",
            ArithmeticOp::Not => "not",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Arithmetic(ArithmeticOp),
    Push(Segment, u16),
    Pop(Segment, u16),
    Label(String),
    Goto(String),
    IfGoto(String),
    Function(String, u16),
    Call(String, u16),
    Return,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Arithmetic(op) => f.write_str(op.as_str()),
            Command::Push(seg, i) => write!(f, "push {} {}", seg, i),
            Command::Pop(seg, i) => write!(f, "pop {} {}", seg, i),
            Command::Label(label) => write!(f, "label {}", label),
            Command::Goto(label) => write!(f, "goto {}", label),
            Command::IfGoto(label) => write!(f, "if-goto {}", label),
            Command::Function(name, n) => write!(f, "function {} {}", name, n),
            Command::Call(name, n) => write!(f, "call {} {}", name, n),
            Command::Return => f.write_str("return"),
        }
    }
}

/// VM text, one command per line.
pub fn render_vm<'a>(commands: impl IntoIterator<Item = &'a Command>) -> String {
    let mut s = String::new();
    for command in commands {
        s.push_str(&command.to_string());
        s.push('\n');
    }
    s
}
