use crate::support::fixture;
use serial_test::serial;
use spray::debugger::{Config, Debugger, StopReason};

fn config() -> Config {
    Config {
        no_color: true,
        stdlib_path: None,
    }
}

#[test]
#[serial]
fn single_step_moves_the_program_counter() {
    let bin = fixture("simple");
    let mut dbg = Debugger::setup(bin.to_str().unwrap(), &[], config()).unwrap();

    dbg.break_at_function("main").unwrap();
    assert!(matches!(dbg.run().unwrap(), StopReason::Breakpoint(_)));

    let before = dbg.current_pc().unwrap();
    dbg.single_step().unwrap();
    let after = dbg.current_pc().unwrap();
    assert_ne!(before, after);

    dbg.shutdown().unwrap();
}

#[test]
#[serial]
fn step_out_returns_control_to_the_caller() {
    let bin = fixture("simple");
    let mut dbg = Debugger::setup(bin.to_str().unwrap(), &[], config()).unwrap();

    dbg.break_at_function("weird_sum").unwrap();
    assert!(matches!(dbg.run().unwrap(), StopReason::Breakpoint(_)));

    let reason = dbg.step_out().unwrap();
    assert!(matches!(reason, StopReason::Breakpoint(_) | StopReason::Signal(_)));

    let pc = dbg.current_pc().unwrap();
    let sym = dbg.oracle().sym_by_addr(pc).expect("symbol after step-out");
    assert_eq!(sym.name(), "main");

    dbg.shutdown().unwrap();
}

#[test]
#[serial]
fn stepping_over_every_line_eventually_exits_cleanly() {
    let bin = fixture("simple");
    let mut dbg = Debugger::setup(bin.to_str().unwrap(), &[], config()).unwrap();

    dbg.break_at_function("main").unwrap();
    assert!(matches!(dbg.run().unwrap(), StopReason::Breakpoint(_)));

    let mut exit_code = None;
    for _ in 0..10_000 {
        match dbg.step_over().unwrap() {
            StopReason::Exited(code) => {
                exit_code = Some(code);
                break;
            }
            StopReason::Breakpoint(_) | StopReason::Signal(_) => continue,
        }
    }

    assert_eq!(exit_code, Some(0));
}
