#[path = "../../vmtranslator/tests/common/mod.rs"]
mod common;

use common::Cpu;
use n2t::{build, Language, Options, Source, Target};

static SYS: &str = "
class Sys {
    function void init() {
        do Main.run();
        while (true) { }
        return;
    }
}
";

static MAIN: &str = "
class Main {
    static int result;

    function void run() {
        let result = Main.sum(10);
        return;
    }

    /** 1 + 2 + ... + n */
    function int sum(int n) {
        var int total;
        let total = 0;
        while (n > 0) {
            let total = total + n;
            let n = n - 1;
        }
        return total;
    }
}
";

fn options(target: Target) -> Options {
    Options {
        target,
        program_name: "Prog".into(),
        ..Options::default()
    }
}

fn words(hack: &str) -> Vec<u16> {
    hack.lines()
        .map(|line| u16::from_str_radix(line, 2).unwrap())
        .collect()
}

#[test]
fn jack_program_runs() {
    let sources = [
        Source::new("Main", Language::Jack, MAIN),
        Source::new("Sys", Language::Jack, SYS),
    ];
    let report = build(&sources, &options(Target::Hack));
    assert!(report.is_ok(), "{:?}", report.diagnostics);
    let names: Vec<String> = report.artifacts.iter().map(|a| a.file_name()).collect();
    assert_eq!(names, ["Main.vm", "Sys.vm", "Prog.asm", "Prog.hack"]);

    let hack = &report.artifact("Prog.hack").unwrap().text;
    assert!(!hack.ends_with('\n'));
    assert!(hack.lines().all(|l| l.len() == 16));
    let mut cpu = Cpu::new(words(hack));
    cpu.run(100_000);
    // `Main.0` is the first variable symbol of the program
    assert_eq!(cpu.ram[16], 55);
}

#[test]
fn target_vm_stops_after_compilation() {
    let sources = [Source::new("Main", Language::Jack, MAIN)];
    let report = build(&sources, &options(Target::Vm));
    assert!(report.is_ok());
    assert_eq!(report.artifacts.len(), 1);
    let vm = &report.artifacts[0].text;
    assert!(vm.starts_with("function Main.run 0\n"));
    assert!(vm.contains("label WHILE_1\n"));
}

#[test]
fn failed_file_does_not_block_siblings() {
    let sources = [
        Source::new("Main", Language::Jack, MAIN),
        Source::new("Sys", Language::Jack, "class Sys { function void init() { do ; } }"),
    ];
    let report = build(&sources, &options(Target::Hack));
    assert!(!report.is_ok());
    assert_eq!(report.diagnostics.len(), 1);
    assert!(report.diagnostics[0].starts_with("Sys.jack: parsing error (line 1, col 39)"));
    // the good class still compiles, the program is not linked
    assert!(report.artifact("Main.vm").is_some());
    assert!(report.artifact("Prog.asm").is_none());
}

#[test]
fn vm_sources_bootstrap_by_default() {
    let sys = "function Sys.init 0\npush constant 7\npop static 0\nlabel HALT\ngoto HALT\n";
    let helper = "function Helper.f 0\npush constant 0\nreturn\n";
    let two = build(
        &[
            Source::new("Sys", Language::Vm, sys),
            Source::new("Helper", Language::Vm, helper),
        ],
        &options(Target::Asm),
    );
    assert!(two.is_ok());
    let asm = &two.artifact("Prog.asm").unwrap().text;
    assert!(asm.starts_with("@256\n"));

    let one = build(&[Source::new("Sys", Language::Vm, sys)], &options(Target::Asm));
    assert!(!one.artifact("Prog.asm").unwrap().text.starts_with("@256\n"));

    let forced = build(
        &[Source::new("Sys", Language::Vm, sys)],
        &Options {
            bootstrap: Some(true),
            ..options(Target::Hack)
        },
    );
    let mut cpu = Cpu::new(words(&forced.artifact("Prog.hack").unwrap().text));
    cpu.run(1000);
    assert_eq!(cpu.ram[16], 7);
}

#[test]
fn vm_errors_name_the_file() {
    let report = build(
        &[Source::new("Bad", Language::Vm, "push heap 1\npop constant 0\nfrob\n")],
        &options(Target::Hack),
    );
    assert!(report.artifacts.is_empty());
    assert_eq!(
        report.diagnostics,
        [
            "Bad.vm: parsing error (line 1, col 6): unknown segment 'heap'",
            "Bad.vm: parsing error (line 3, col 1): expected a command, got identifier \"frob\" instead",
        ]
    );
}

#[test]
fn translation_errors_name_the_program() {
    let report = build(
        &[Source::new("Bad", Language::Vm, "pop constant 0\npush temp 8\n")],
        &options(Target::Asm),
    );
    assert_eq!(report.diagnostics.len(), 2);
    assert!(report.diagnostics.iter().all(|d| d.starts_with("Prog: translation error (Bad - line")));
}

#[test]
fn assembly_sources_assemble_one_by_one() {
    let report = build(
        &[
            Source::new("Add", Language::Asm, "@2\nD=A\n@3\nD=D+A\n@0\nM=D\n"),
            Source::new("Bad", Language::Asm, "@2\nD=Q\n"),
        ],
        &options(Target::Hack),
    );
    assert_eq!(
        report.artifact("Add.hack").unwrap().text,
        "0000000000000010\n1110110000010000\n0000000000000011\n1110000010010000\n0000000000000000\n1110001100001000"
    );
    assert!(report.artifact("Bad.hack").is_none());
    assert_eq!(report.diagnostics.len(), 1);
    assert!(report.diagnostics[0].starts_with("Bad.asm: parsing error (line 2, col 1)"));

    let report = build(
        &[Source::new("Add", Language::Asm, "@2\n")],
        &options(Target::Asm),
    );
    assert!(report.is_ok());
    assert!(report.artifacts.is_empty());
}
