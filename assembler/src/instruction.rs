use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Dest {
    pub a: bool,
    pub d: bool,
    pub m: bool,
}

impl Dest {
    pub fn new(a: bool, d: bool, m: bool) -> Self {
        Self { a, d, m }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn a() -> Self {
        Self::new(true, false, false)
    }

    pub fn d() -> Self {
        Self::new(false, true, false)
    }

    pub fn m() -> Self {
        Self::new(false, false, true)
    }

    pub fn is_none(&self) -> bool {
        !(self.a || self.d || self.m)
    }

    pub fn bits(&self) -> u16 {
        (self.a as u16) << 2 | (self.d as u16) << 1 | self.m as u16
    }
}

impl fmt::Display for Dest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a {
            f.write_str("A")?;
        }
        if self.m {
            f.write_str("M")?;
        }
        if self.d {
            f.write_str("D")?;
        }
        Ok(())
    }
}

impl FromStr for Dest {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err("missing destination before '='".to_string());
        }
        let mut dest = Dest::none();
        for c in s.chars() {
            let slot = match c {
                'A' => &mut dest.a,
                'D' => &mut dest.d,
                'M' => &mut dest.m,
                _ => return Err(format!("invalid destination '{}'", s)),
            };
            if *slot {
                return Err(format!("invalid destination '{}'", s));
            }
            *slot = true;
        }
        Ok(dest)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operand {
    Zero,
    One,
    A,
    D,
    M,
}

impl Operand {
    fn to_char(self) -> char {
        match self {
            Operand::Zero => '0',
            Operand::One => '1',
            Operand::A => 'A',
            Operand::D => 'D',
            Operand::M => 'M',
        }
    }

    fn from_char(c: char) -> Option<Self> {
        Some(match c {
            '0' => Operand::Zero,
            '1' => Operand::One,
            'A' => Operand::A,
            'D' => Operand::D,
            'M' => Operand::M,
            _ => return None,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Plus,
    Minus,
    And,
    Or,
    Not,
}

impl Operator {
    fn to_char(self) -> char {
        match self {
            Operator::Plus => '+',
            Operator::Minus => '-',
            Operator::And => '&',
            Operator::Or => '|',
            Operator::Not => '!',
        }
    }

    fn from_char(c: char) -> Option<Self> {
        Some(match c {
            '+' => Operator::Plus,
            '-' => Operator::Minus,
            '&' => Operator::And,
            '|' => Operator::Or,
            '!' => Operator::Not,
            _ => return None,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comp {
    Unary(Option<Operator>, Operand),
    Binary(Operand, Operator, Operand),
}

/// Every computation the ALU can encode.
pub const COMPS: [&str; 28] = [
    "0", "1", "-1", "D", "A", "M", "!D", "!A", "!M", "-D", "-A", "-M", "D+1", "A+1", "M+1",
    "D-1", "A-1", "M-1", "D+A", "D+M", "D-A", "D-M", "A-D", "M-D", "D&A", "D&M", "D|A", "D|M",
];

impl fmt::Display for Comp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comp::Unary(Some(op), operand) => write!(f, "{}{}", op.to_char(), operand.to_char()),
            Comp::Unary(None, operand) => write!(f, "{}", operand.to_char()),
            Comp::Binary(lhs, op, rhs) => {
                write!(f, "{}{}{}", lhs.to_char(), op.to_char(), rhs.to_char())
            }
        }
    }
}

impl FromStr for Comp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !COMPS.contains(&s) {
            return Err(format!("invalid computation '{}'", s));
        }
        let cs: Vec<char> = s.chars().collect();
        let invalid = || format!("invalid computation '{}'", s);
        match cs.as_slice() {
            [x] => Operand::from_char(*x)
                .map(|x| Comp::Unary(None, x))
                .ok_or_else(invalid),
            [op, x] => match (Operator::from_char(*op), Operand::from_char(*x)) {
                (Some(op), Some(x)) => Ok(Comp::Unary(Some(op), x)),
                _ => Err(invalid()),
            },
            [lhs, op, rhs] => match (
                Operand::from_char(*lhs),
                Operator::from_char(*op),
                Operand::from_char(*rhs),
            ) {
                (Some(lhs), Some(op), Some(rhs)) => Ok(Comp::Binary(lhs, op, rhs)),
                _ => Err(invalid()),
            },
            _ => Err(invalid()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u16)]
pub enum Jump {
    JGT = 0b001,
    JEQ = 0b010,
    JGE = 0b011,
    JLT = 0b100,
    JNE = 0b101,
    JLE = 0b110,
    JMP = 0b111,
}

impl Jump {
    pub fn as_str(&self) -> &'static str {
        match self {
            Jump::JGT => "JGT",
            Jump::JEQ => "JEQ",
            Jump::JGE => "JGE",
            Jump::JLT => "JLT",
            Jump::JNE => "JNE",
            Jump::JLE => "JLE",
            Jump::JMP => "JMP",
        }
    }
}

impl FromStr for Jump {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "JGT" => Jump::JGT,
            "JEQ" => Jump::JEQ,
            "JGE" => Jump::JGE,
            "JLT" => Jump::JLT,
            "JNE" => Jump::JNE,
            "JLE" => Jump::JLE,
            "JMP" => Jump::JMP,
            _ => return Err(format!("invalid jump '{}'", s)),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Address {
    Value(u16),
    Symbol(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    Address(Address),
    Compute(Dest, Comp, Option<Jump>),
    Label(String),
    /// Rendered as a `//` line, never encoded.
    Comment(String),
}

impl Instruction {
    pub fn value(v: u16) -> Self {
        Instruction::Address(Address::Value(v))
    }

    pub fn symbol(s: impl Into<String>) -> Self {
        Instruction::Address(Address::Symbol(s.into()))
    }

    /// Whether the instruction occupies a slot in instruction memory.
    pub fn is_encoded(&self) -> bool {
        matches!(self, Instruction::Address(_) | Instruction::Compute(..))
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Address(Address::Value(v)) => write!(f, "@{}", v),
            Instruction::Address(Address::Symbol(symbol)) => write!(f, "@{}", symbol),
            Instruction::Compute(dest, comp, jump) => {
                if !dest.is_none() {
                    write!(f, "{}=", dest)?;
                }
                write!(f, "{}", comp)?;
                if let Some(jump) = jump {
                    write!(f, ";{}", jump.as_str())?;
                }
                Ok(())
            }
            Instruction::Label(symbol) => write!(f, "({})", symbol),
            Instruction::Comment(text) => write!(f, "// {}", text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let cases = [
            (Instruction::value(256), "@256"),
            (Instruction::symbol("LOOP"), "@LOOP"),
            (
                Instruction::Compute(
                    Dest::new(true, false, true),
                    Comp::Binary(Operand::M, Operator::Minus, Operand::One),
                    None,
                ),
                "AM=M-1",
            ),
            (
                Instruction::Compute(Dest::none(), Comp::Unary(None, Operand::Zero), Some(Jump::JMP)),
                "0;JMP",
            ),
            (
                Instruction::Compute(Dest::d(), Comp::Unary(Some(Operator::Not), Operand::M), None),
                "D=!M",
            ),
            (Instruction::Label("END".to_string()), "(END)"),
            (Instruction::Comment("bootstrap".to_string()), "// bootstrap"),
        ];
        for (instr, expect) in cases {
            assert_eq!(instr.to_string(), expect);
        }
    }

    #[test]
    fn test_comp_table_parses_back() {
        for s in COMPS {
            let comp: Comp = s.parse().unwrap();
            assert_eq!(comp.to_string(), s);
        }
        assert!("A+D".parse::<Comp>().is_err());
        assert!("D+2".parse::<Comp>().is_err());
        assert!("".parse::<Comp>().is_err());
    }

    #[test]
    fn test_dest() {
        assert_eq!("AMD".parse::<Dest>(), Ok(Dest::new(true, true, true)));
        assert_eq!("MD".parse::<Dest>().map(|d| d.bits()), Ok(0b011));
        assert!("MM".parse::<Dest>().is_err());
        assert!("X".parse::<Dest>().is_err());
        assert!("".parse::<Dest>().is_err());
    }

    #[test]
    fn test_jump() {
        assert_eq!("JLE".parse::<Jump>(), Ok(Jump::JLE));
        assert_eq!(Jump::JNE as u16, 0b101);
        assert!("jmp".parse::<Jump>().is_err());
    }
}
