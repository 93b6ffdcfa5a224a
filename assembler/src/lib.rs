//! Hack assembler: symbolic assembly to 16-bit machine words.

mod code;
mod error;
mod instruction;
mod parser;
mod symbols;

use log::debug;
use snafu::ensure;

pub use error::{Error, Result};
pub use instruction::{Address, Comp, Dest, Instruction, Jump, Operand, Operator, COMPS};
pub use parser::parse;
pub use symbols::{SymbolTable, KBD, SCREEN};

use error::{DuplicateLabelSnafu, ProgramTooLargeSnafu};

/// Size of the instruction memory; labels must address into it.
pub const MAX_PROGRAM_SIZE: usize = 32768;

/// Assembles program text.
pub fn assemble(source: &str) -> Result<Vec<u16>> {
    let program = parse(source).map_err(|diagnostics| Error::Parse { diagnostics })?;
    assemble_lines(program.iter().map(|s| (s.line, &s.item)).collect())
}

/// Assembles an instruction listing, e.g. translator output. Lines in
/// errors count listing entries from 1, which matches `render_asm`.
pub fn assemble_instructions(instrs: &[Instruction]) -> Result<Vec<u16>> {
    assemble_lines(
        instrs
            .iter()
            .enumerate()
            .map(|(i, instr)| (i + 1, instr))
            .collect(),
    )
}

fn assemble_lines(program: Vec<(usize, &Instruction)>) -> Result<Vec<u16>> {
    let mut symbols = SymbolTable::new();

    let mut offset = 0usize;
    for &(line, instr) in &program {
        match instr {
            Instruction::Label(label) => {
                ensure!(
                    offset < MAX_PROGRAM_SIZE,
                    ProgramTooLargeSnafu { count: offset + 1 }
                );
                if !symbols.define_label(label, offset as u16) {
                    return DuplicateLabelSnafu {
                        label: label.clone(),
                        line,
                    }
                    .fail();
                }
            }
            instr if instr.is_encoded() => offset += 1,
            _ => {}
        }
    }
    ensure!(
        offset <= MAX_PROGRAM_SIZE,
        ProgramTooLargeSnafu { count: offset }
    );

    let words: Vec<u16> = program
        .iter()
        .filter_map(|&(_, instr)| code::encode(instr, &mut symbols))
        .collect();
    debug!(
        "assembled {} words, {} variables",
        words.len(),
        symbols.variable_count()
    );
    Ok(words)
}

/// One instruction per line, newline terminated.
pub fn render_asm(instrs: &[Instruction]) -> String {
    let mut s = String::new();
    for instr in instrs {
        s.push_str(&instr.to_string());
        s.push('\n');
    }
    s
}

/// `.hack` text: one 16-digit binary word per line, no trailing newline.
pub fn render_binary(words: &[u16]) -> String {
    words
        .iter()
        .map(|w| format!("{:016b}", w))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tests::SUM_CODE;

    #[test]
    fn test_assemble() {
        let words = assemble(SUM_CODE).unwrap();
        assert_eq!(words.len(), 20);
        // @i, @sum allocate 16 and 17
        assert_eq!(words[0], 16);
        assert_eq!(words[2], 17);
        // (END) sits after 18 instructions
        assert_eq!(words[8], 18);
        assert_eq!(words[18], 18);
        assert_eq!(words[19], 0b1110101010000111);
        assert_eq!(words[16], 4);
    }

    #[test]
    fn test_label_before_last_line() {
        let words = assemble("@x\nM=1\n@y\nM=0\n(LAST)\n@LAST").unwrap();
        assert_eq!(words, [16, 0b1110111111001000, 17, 0b1110101010001000, 4]);
    }

    #[test]
    fn test_duplicate_label() {
        let err = assemble("(A)\n@0\n(A)\n").unwrap_err();
        assert!(matches!(err, Error::DuplicateLabel { line: 3, .. }));
        assert_eq!(err.to_string(), "line 3: label 'A' is already defined");
    }

    #[test]
    fn test_parse_error_display() {
        let err = assemble("D=D*A").unwrap_err();
        assert_eq!(
            err.to_string(),
            "parsing error (line 1, col 1): invalid computation 'D*A'"
        );
    }

    #[test]
    fn test_program_too_large() {
        let instrs = vec![Instruction::value(0); MAX_PROGRAM_SIZE + 1];
        assert!(matches!(
            assemble_instructions(&instrs),
            Err(Error::ProgramTooLarge { count }) if count == MAX_PROGRAM_SIZE + 1
        ));
        let instrs = vec![Instruction::value(0); MAX_PROGRAM_SIZE];
        assert_eq!(assemble_instructions(&instrs).unwrap().len(), MAX_PROGRAM_SIZE);
    }

    #[test]
    fn test_comments_not_encoded() {
        let instrs = [
            Instruction::Comment("start".into()),
            Instruction::Label("L".into()),
            Instruction::symbol("L"),
        ];
        assert_eq!(assemble_instructions(&instrs).unwrap(), [0]);
        assert_eq!(render_asm(&instrs), "// start\n(L)\n@L\n");
    }

    #[test]
    fn test_render_binary() {
        assert_eq!(
            render_binary(&[16, 0b1110101010000111]),
            "0000000000010000\n1110101010000111"
        );
        assert_eq!(render_binary(&[]), "");
    }
}
