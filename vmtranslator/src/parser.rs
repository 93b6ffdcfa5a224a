use lexer::{describe, Diagnostic, Dialect, Keyword, Spanned, TokenCursor, TokenKind, Tokenizer};
use log::debug;

use crate::command::{ArithmeticOp, Command, Segment};

struct Parser<'a> {
    cursor: TokenCursor<'a>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            cursor: TokenCursor::new(Tokenizer::new(source, Dialect::Vm).skip_comments()),
        }
    }

    fn next_symbol(&mut self) -> Option<String> {
        self.cursor
            .expect_peek(TokenKind::Ident)
            .then(|| self.cursor.cur().literal.clone())
    }

    fn next_i(&mut self) -> Option<u16> {
        if !self.cursor.expect_peek(TokenKind::IntConst) {
            return None;
        }
        let i = self.cursor.cur().int_value();
        if i.is_none() {
            let message = format!(
                "integer {} is out of range 0..={}",
                self.cursor.cur().literal,
                lexer::MAX_INT
            );
            self.cursor.cur_error(message);
        }
        i
    }

    fn next_segment(&mut self) -> Option<Segment> {
        if !self.cursor.expect_peek(TokenKind::Ident) {
            return None;
        }
        let seg = Segment::from_name(&self.cursor.cur().literal);
        if seg.is_none() {
            let message = format!("unknown segment '{}'", self.cursor.cur().literal);
            self.cursor.cur_error(message);
        }
        seg
    }

    fn next_command(&mut self) -> Option<Command> {
        let kw = match self.cursor.cur().kind {
            TokenKind::Keyword(kw) => kw,
            _ => {
                let message = format!("expected a command, got {} instead", describe(self.cursor.cur()));
                self.cursor.cur_error(message);
                return None;
            }
        };
        let arithmetic = |op| Some(Command::Arithmetic(op));
        match kw {
            Keyword::Push => {
                let seg = self.next_segment()?;
                Some(Command::Push(seg, self.next_i()?))
            }
            Keyword::Pop => {
                let seg = self.next_segment()?;
                Some(Command::Pop(seg, self.next_i()?))
            }
            Keyword::Add => arithmetic(ArithmeticOp::Add),
            Keyword::Sub => arithmetic(ArithmeticOp::Sub),
            Keyword::Neg => arithmetic(ArithmeticOp::Neg),
            Keyword::Eq => arithmetic(ArithmeticOp::Eq),
            Keyword::Gt => arithmetic(ArithmeticOp::Gt),
            Keyword::Lt => arithmetic(ArithmeticOp::Lt),
            Keyword::And => arithmetic(ArithmeticOp::And),
            Keyword::Or => arithmetic(ArithmeticOp::Or),
            Keyword::Not => arithmetic(ArithmeticOp::Not),
            Keyword::Label => Some(Command::Label(self.next_symbol()?)),
            Keyword::Goto => Some(Command::Goto(self.next_symbol()?)),
            Keyword::If => {
                if !self.cursor.expect_peek(TokenKind::Minus)
                    || !self.cursor.expect_peek(TokenKind::Keyword(Keyword::Goto))
                {
                    return None;
                }
                Some(Command::IfGoto(self.next_symbol()?))
            }
            Keyword::Function => {
                let name = self.next_symbol()?;
                Some(Command::Function(name, self.next_i()?))
            }
            Keyword::Call => {
                let name = self.next_symbol()?;
                Some(Command::Call(name, self.next_i()?))
            }
            Keyword::Return => Some(Command::Return),
            _ => {
                let message = format!("expected a command, got {} instead", describe(self.cursor.cur()));
                self.cursor.cur_error(message);
                None
            }
        }
    }

    fn parse(mut self) -> Result<Vec<Spanned<Command>>, Vec<Diagnostic>> {
        let mut commands = Vec::new();
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
            match self.next_command() {
                Some(command) if self.cursor.expect_peek_eol() => {
                    commands.push(Spanned::new(command, line));
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
        debug!("parsed {} vm commands", commands.len());
        Ok(commands)
    }
}

/// Parses VM text, one command per line. Each malformed line yields a
/// diagnostic; parsing always continues with the next line.
pub fn parse(source: &str) -> Result<Vec<Spanned<Command>>, Vec<Diagnostic>> {
    Parser::new(source).parse()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    static SUM_CODE: &str = "// Sum code
push constant 0
pop local 0         // initializes sum = 0
label LOOP_START
push argument 0
push local 0
add
pop local 0\t        // sum = sum + counter
push argument 0
push constant 1
sub
pop argument 0      // counter--
push argument 0
if-goto LOOP_START  // If counter != 0, goto LOOP_START
push local 0
";

    #[test]
    fn test_parse() {
        let commands = parse(SUM_CODE).unwrap();
        assert_eq!(commands.len(), 14);
        assert_eq!(commands[0], Spanned::new(Command::Push(Segment::Constant, 0), 2));
        assert_eq!(commands[2].item, Command::Label("LOOP_START".into()));
        assert_eq!(commands[5].item, Command::Arithmetic(ArithmeticOp::Add));
        assert_eq!(commands[12], Spanned::new(Command::IfGoto("LOOP_START".into()), 14));
        let rendered: Vec<String> = commands.iter().map(|c| c.item.to_string()).collect();
        assert_eq!(rendered[6], "pop local 0");
        assert_eq!(rendered[12], "if-goto LOOP_START");
    }

    #[test]
    fn test_functions() {
        let commands = parse("function Main.main 2\r\ncall Math.multiply 2\r\nreturn").unwrap();
        assert_eq!(
            commands.iter().map(|c| c.item.clone()).collect::<Vec<_>>(),
            [
                Command::Function("Main.main".into(), 2),
                Command::Call("Math.multiply".into(), 2),
                Command::Return,
            ]
        );
        assert_eq!(commands[2].line, 3);
    }

    #[test]
    fn test_errors_per_line() {
        let errs = parse("push heap 0\npop local\nfrob\npush constant 99999\nadd\nif goto X\nadd 1")
            .unwrap_err();
        let lines: Vec<usize> = errs.iter().map(|d| d.line).collect();
        assert_eq!(lines, [1, 2, 3, 4, 6, 7]);
        assert_eq!(errs[0].message, "unknown segment 'heap'");
        assert_eq!(
            errs[1].message,
            "expected next token to be integer constant, got newline instead"
        );
        assert_eq!(errs[2].message, "expected a command, got identifier \"frob\" instead");
        assert_eq!(errs[3].message, "integer 99999 is out of range 0..=32767");
    }

    #[test]
    fn test_render_round_trip() {
        let source = "push this 2\npop pointer 1\nlabel a.b:c\ngoto a.b:c\nnot\n";
        let commands: Vec<Command> = parse(source).unwrap().into_iter().map(|c| c.item).collect();
        assert_eq!(crate::render_vm(&commands), source);
    }
}
