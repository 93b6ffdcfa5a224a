use crate::instruction::{Address, Comp, Instruction, Operand, Operator};
use crate::symbols::SymbolTable;

pub(crate) fn assemble_comp(comp: &Comp) -> u16 {
    // a zx nx zy ny f no
    // if (zx == 1) set x = 0
    // if (nx == 1) set x = !x
    // if (zy == 1) set y = 0
    // if (ny == 1) set y = !y
    // if (f == 1)  set out = x + y
    // if (f == 0)  set out = x & y
    // if (no == 1) set out = !out
    let mut a = false;
    let mut zx = false;
    let mut nx = false;
    let mut zy = false;
    let mut ny = false;
    let mut f = false;
    let mut no = false;

    match *comp {
        Comp::Unary(op, operand) => {
            let neg = matches!(op, Some(Operator::Minus));
            let not = matches!(op, Some(Operator::Not));
            match operand {
                Operand::Zero => {
                    zx = true;
                    zy = true;
                    f = true;
                }
                Operand::One => {
                    zx = true;
                    nx = true;
                    zy = true;
                    ny = !neg;
                    f = true;
                    no = !neg;
                }
                Operand::D => {
                    zy = true;
                    ny = true;
                    f = neg;
                    no = not || neg;
                }
                Operand::A | Operand::M => {
                    a = operand == Operand::M;
                    zx = true;
                    nx = true;
                    f = neg;
                    no = not || neg;
                }
            }
        }
        Comp::Binary(lhs, op, rhs) => {
            if matches!(op, Operator::Plus | Operator::Minus) {
                f = true;
                let is_lhs_d = lhs == Operand::D;
                let is_rhs_one = rhs == Operand::One;
                if op == Operator::Minus {
                    zx = !is_lhs_d && is_rhs_one;
                    nx = is_lhs_d ^ is_rhs_one;
                    zy = is_lhs_d && is_rhs_one;
                    ny = !nx;
                    no = !is_rhs_one;
                } else if is_rhs_one {
                    zx = !is_lhs_d;
                    nx = true;
                    zy = is_lhs_d;
                    ny = true;
                    no = true;
                }
            } else {
                let is_or = op == Operator::Or;
                nx = is_or;
                ny = is_or;
                no = is_or;
            }
            a = lhs == Operand::M || rhs == Operand::M;
        }
    }

    (a as u16) << 6
        | (zx as u16) << 5
        | (nx as u16) << 4
        | (zy as u16) << 3
        | (ny as u16) << 2
        | (f as u16) << 1
        | (no as u16)
}

/// Encodes one instruction, binding variables in `symbols` as they are
/// first seen. Labels and comments have no encoding.
pub(crate) fn encode(instr: &Instruction, symbols: &mut SymbolTable) -> Option<u16> {
    match instr {
        Instruction::Address(Address::Value(v)) => Some(v & 0x7fff),
        Instruction::Address(Address::Symbol(symbol)) => Some(symbols.resolve(symbol) & 0x7fff),
        Instruction::Compute(dest, comp, jump) => {
            let ac = assemble_comp(comp);
            let j = jump.map(|j| j as u16).unwrap_or(0);
            Some(0b1110000000000000 | ac << 6 | dest.bits() << 3 | j)
        }
        Instruction::Label(_) | Instruction::Comment(_) => None,
    }
}
