use crate::support::fixture;
use serial_test::serial;
use spray::debugger::breakpoint::BreakpointTable;
use spray::debugger::{Config, Debugger};
use spray::debugger::StopReason;

fn config() -> Config {
    Config {
        no_color: true,
        stdlib_path: None,
    }
}

#[test]
#[serial]
fn breakpoint_on_function_stops_there_then_runs_to_completion() {
    let bin = fixture("simple");
    let bin_str = bin.to_str().unwrap();
    let mut dbg = Debugger::setup(bin_str, &[], config()).unwrap();

    dbg.break_at_function("main").unwrap();
    let reason = dbg.run().unwrap();
    assert!(matches!(reason, StopReason::Breakpoint(_)));

    let pc = dbg.current_pc().unwrap();
    let sym = dbg.oracle().sym_by_addr(pc).expect("symbol at stop pc");
    assert_eq!(sym.name(), "main");

    let reason = dbg.continue_().unwrap();
    assert!(matches!(reason, StopReason::Exited(_)));

    dbg.shutdown().unwrap();
}

#[test]
#[serial]
fn deleting_a_breakpoint_lets_the_process_run_free() {
    let bin = fixture("simple");
    let bin_str = bin.to_str().unwrap();
    let mut dbg = Debugger::setup(bin_str, &[], config()).unwrap();

    let sym = dbg.oracle().sym_by_name("weird_sum").unwrap().clone();
    let start = dbg.oracle().function_start_addr(&sym).unwrap();
    let real = dbg.load_bias().to_real(start);

    dbg.break_at_addr(real).unwrap();
    dbg.delete_break(real).unwrap();

    let reason = dbg.run().unwrap();
    assert!(matches!(reason, StopReason::Exited(_)));

    dbg.shutdown().unwrap();
}

#[test]
#[serial]
fn enabling_patches_the_trap_byte_and_disabling_restores_it() {
    let bin = fixture("simple");
    let dbg = Debugger::setup(bin.to_str().unwrap(), &[], config()).unwrap();

    let sym = dbg.oracle().sym_by_name("weird_sum").unwrap().clone();
    let start = dbg.oracle().function_start_addr(&sym).unwrap();
    let addr = dbg.load_bias().to_real(start);

    let original = dbg.read_mem(addr).unwrap();

    let mut table = BreakpointTable::new();
    table.enable(dbg.pid(), addr).unwrap();
    assert!(table.is_armed(addr));

    let patched = dbg.read_mem(addr).unwrap();
    assert_eq!(patched & 0xff, 0xcc);
    assert_eq!(patched & !0xffu64, original & !0xffu64);

    table.disable(dbg.pid(), addr).unwrap();
    assert!(!table.is_armed(addr));
    assert_eq!(dbg.read_mem(addr).unwrap(), original);

    dbg.shutdown().unwrap();
}
