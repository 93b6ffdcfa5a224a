//! A small Hack CPU for running translated programs in tests.

#![allow(dead_code)]

use vmtranslator::Options;

pub const SP: usize = 0;
pub const LCL: usize = 1;
pub const ARG: usize = 2;
pub const THIS: usize = 3;
pub const THAT: usize = 4;

pub struct Cpu {
    rom: Vec<u16>,
    pub ram: Vec<u16>,
    pub a: u16,
    pub d: u16,
    pub pc: usize,
}

fn alu(x: u16, y: u16, bits: u16) -> u16 {
    let (zx, nx, zy, ny, f, no) = (
        bits & 0b100000 != 0,
        bits & 0b010000 != 0,
        bits & 0b001000 != 0,
        bits & 0b000100 != 0,
        bits & 0b000010 != 0,
        bits & 0b000001 != 0,
    );
    let mut x = if zx { 0 } else { x };
    if nx {
        x = !x;
    }
    let mut y = if zy { 0 } else { y };
    if ny {
        y = !y;
    }
    let out = if f { x.wrapping_add(y) } else { x & y };
    if no {
        !out
    } else {
        out
    }
}

impl Cpu {
    pub fn new(rom: Vec<u16>) -> Self {
        Self {
            rom,
            ram: vec![0; 32768],
            a: 0,
            d: 0,
            pc: 0,
        }
    }

    pub fn step(&mut self) {
        let instr = self.rom[self.pc];
        if instr & 0x8000 == 0 {
            self.a = instr;
            self.pc += 1;
            return;
        }
        let addr = self.a as usize & 0x7fff;
        let y = if instr & 0x1000 != 0 {
            self.ram[addr]
        } else {
            self.a
        };
        let out = alu(self.d, y, (instr >> 6) & 0x3f);
        let (dest, jump) = ((instr >> 3) & 0b111, instr & 0b111);
        if dest & 0b001 != 0 {
            self.ram[addr] = out;
        }
        if dest & 0b100 != 0 {
            self.a = out;
        }
        if dest & 0b010 != 0 {
            self.d = out;
        }
        let v = out as i16;
        let taken = (jump & 0b100 != 0 && v < 0)
            || (jump & 0b010 != 0 && v == 0)
            || (jump & 0b001 != 0 && v > 0);
        self.pc = if taken { addr } else { self.pc + 1 };
    }

    /// Runs until the program counter leaves the program or `max_steps`
    /// instructions have executed.
    pub fn run(&mut self, max_steps: usize) {
        for _ in 0..max_steps {
            if self.pc >= self.rom.len() {
                break;
            }
            self.step();
        }
    }

    pub fn top(&self) -> u16 {
        self.ram[self.ram[SP] as usize - 1]
    }
}

/// Translates and assembles `files` as one program and loads it.
pub fn load(files: &[(&str, &str)], bootstrap: bool) -> Cpu {
    let options = Options {
        bootstrap,
        annotate: false,
    };
    let instrs = vmtranslator::translate_sources(files.iter().copied(), &options).unwrap();
    let words = assembler::assemble_instructions(&instrs).unwrap();
    Cpu::new(words)
}

/// Loads a program without bootstrap and sets up a caller frame by hand.
pub fn load_with_frame(files: &[(&str, &str)]) -> Cpu {
    let mut cpu = load(files, false);
    cpu.ram[SP] = 256;
    cpu.ram[LCL] = 300;
    cpu.ram[ARG] = 400;
    cpu.ram[THIS] = 3000;
    cpu.ram[THAT] = 3010;
    cpu
}
