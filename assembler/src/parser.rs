use lexer::{describe, Diagnostic, Dialect, Spanned, TokenCursor, TokenKind, Tokenizer};
use log::debug;

use crate::instruction::{Address, Dest, Instruction};

// SYMBOL = (letter | digit | "_" | "." | "$" | ":")+
// A-INSTR = "@" (SYMBOL | digit+)
// L-INSTR = "(" SYMBOL ")"
// C-INSTR = (DEST "=")? COMP (";" JUMP)?
struct Parser<'a> {
    cursor: TokenCursor<'a>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            cursor: TokenCursor::new(Tokenizer::new(source, Dialect::Asm).skip_comments()),
        }
    }

    fn read_a_instr(&mut self) -> Option<Instruction> {
        let tok = self.cursor.peek().clone();
        match tok.kind {
            TokenKind::IntConst => {
                self.cursor.advance();
                match tok.int_value() {
                    Some(v) => Some(Instruction::Address(Address::Value(v))),
                    None => {
                        self.cursor.cur_error(format!(
                            "address {} is out of range 0..={}",
                            tok.literal,
                            lexer::MAX_INT
                        ));
                        None
                    }
                }
            }
            TokenKind::Ident => {
                self.cursor.advance();
                Some(Instruction::Address(Address::Symbol(tok.literal)))
            }
            _ => {
                self.cursor.peek_error("a symbol or an address");
                None
            }
        }
    }

    fn read_l_instr(&mut self) -> Option<Instruction> {
        if !self.cursor.expect_peek(TokenKind::Ident) {
            return None;
        }
        let symbol = self.cursor.cur().literal.clone();
        if !self.cursor.expect_peek(TokenKind::RParen) {
            return None;
        }
        Some(Instruction::Label(symbol))
    }

    fn read_c_instr(&mut self) -> Option<Instruction> {
        let (line, col) = (self.cursor.cur().line, self.cursor.cur().col);
        let mut text = self.cursor.cur().literal.clone();
        while !self.cursor.peek().kind.is_eol() {
            self.cursor.advance();
            text.push_str(&self.cursor.cur().literal);
        }
        match parse_compute(&text) {
            Ok(instr) => Some(instr),
            Err(message) => {
                self.cursor.error(line, col, message);
                None
            }
        }
    }

    fn read_instr(&mut self) -> Option<Instruction> {
        match self.cursor.cur().kind {
            TokenKind::At => self.read_a_instr(),
            TokenKind::LParen => self.read_l_instr(),
            TokenKind::Ident | TokenKind::IntConst | TokenKind::Minus | TokenKind::Unknown => {
                self.read_c_instr()
            }
            _ => {
                let message = format!("unexpected {}", describe(self.cursor.cur()));
                self.cursor.cur_error(message);
                None
            }
        }
    }

    fn parse(mut self) -> Result<Vec<Spanned<Instruction>>, Vec<Diagnostic>> {
        let mut instrs = Vec::new();
        loop {
            match self.cursor.cur().kind {
                TokenKind::Eof => break,
                TokenKind::Newline => {
                    self.cursor.advance();
                    continue;
                }
                _ => {}
            }
            let line = self.cursor.cur().line;
            match self.read_instr() {
                Some(instr) if self.cursor.expect_peek_eol() => {
                    instrs.push(Spanned::new(instr, line));
                }
                _ => {
                    while !self.cursor.cur().kind.is_eol() {
                        self.cursor.advance();
                    }
                }
            }
        }
        if self.cursor.has_errors() {
            return Err(self.cursor.take_diagnostics());
        }
        debug!("parsed {} assembly instructions", instrs.len());
        Ok(instrs)
    }
}

fn parse_compute(text: &str) -> Result<Instruction, String> {
    let (dest, rest) = match text.split_once('=') {
        Some((dest, rest)) => (dest.parse::<Dest>()?, rest),
        None => (Dest::none(), text),
    };
    let (comp, jump) = match rest.split_once(';') {
        Some((comp, jump)) => (comp, Some(jump.parse()?)),
        None => (rest, None),
    };
    Ok(Instruction::Compute(dest, comp.parse()?, jump))
}

/// Parses assembly text into instructions tagged with their source line.
/// Every malformed line is reported, not just the first.
pub fn parse(source: &str) -> Result<Vec<Spanned<Instruction>>, Vec<Diagnostic>> {
    Parser::new(source).parse()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::instruction::{Comp, Jump, Operand, Operator};

    pub(crate) static SUM_CODE: &str = r##"// Adds 1+...+100.
    @i     // i refers to some mem. location.
    M=1    // i=1
    @sum   // sum refers to some mem. location.
    M=0    // sum=0
(LOOP)
    @i
    D=M    // D=i
    @100
    D=D-A  // D=i-100
    @END
    D;JGT  // If (i-100)>0 goto END
    @i
    D=M    // D=i
    @sum
    M=D+M  // sum=sum+i
    @i
    M=M+1  // i=i+1
    @LOOP
    0;JMP  // Goto LOOP
(END)
    @END
    0;JMP  // Infinite loop
"##;

    #[test]
    fn test_parse() {
        let instrs = parse(SUM_CODE).unwrap();
        assert_eq!(instrs.len(), 22);
        assert_eq!(instrs[0], Spanned::new(Instruction::symbol("i"), 2));
        assert_eq!(instrs[4], Spanned::new(Instruction::Label("LOOP".into()), 6));
        assert_eq!(
            instrs[10].item,
            Instruction::Compute(Dest::none(), Comp::Unary(None, Operand::D), Some(Jump::JGT))
        );
        assert_eq!(
            instrs[14].item,
            Instruction::Compute(Dest::m(), Comp::Binary(Operand::D, Operator::Plus, Operand::M), None)
        );
        let rendered: Vec<String> = instrs.iter().map(|i| i.item.to_string()).collect();
        assert_eq!(rendered[7], "@100");
        assert_eq!(rendered[8], "D=D-A");
        assert_eq!(rendered[19], "(END)");
    }

    #[test]
    fn test_symbols_with_punctuation() {
        let instrs = parse("($RET.Main.main.0)\n@Foo.bar$x:1\nAM=M-1\nD=!M\nD=-1").unwrap();
        assert_eq!(instrs[0].item, Instruction::Label("$RET.Main.main.0".into()));
        assert_eq!(instrs[1].item, Instruction::symbol("Foo.bar$x:1"));
        assert_eq!(instrs[2].item.to_string(), "AM=M-1");
        assert_eq!(instrs[3].item.to_string(), "D=!M");
        assert_eq!(instrs[4].item.to_string(), "D=-1");
    }

    #[test]
    fn test_errors_collected_per_line() {
        let errs = parse("@\nD=D*A\n(LOOP\nMM=1\n@40000\n0;JMP\nD;JXX").unwrap_err();
        let lines: Vec<usize> = errs.iter().map(|d| d.line).collect();
        assert_eq!(lines, [1, 2, 3, 4, 5, 7]);
        assert_eq!(errs[1].message, "invalid computation 'D*A'");
        assert_eq!(errs[4].message, "address 40000 is out of range 0..=32767");
    }

    #[test]
    fn test_trailing_tokens() {
        let errs = parse("@5 @6").unwrap_err();
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].col, 4);
    }
}
