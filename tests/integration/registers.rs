use crate::support::fixture;
use serial_test::serial;
use spray::debugger::address::RealAddr;
use spray::debugger::{Config, Debugger, StopReason};

fn config() -> Config {
    Config {
        no_color: true,
        stdlib_path: None,
    }
}

#[test]
#[serial]
fn register_write_is_visible_to_a_subsequent_read() {
    let bin = fixture("simple");
    let mut dbg = Debugger::setup(bin.to_str().unwrap(), &[], config()).unwrap();

    dbg.break_at_function("main").unwrap();
    assert!(matches!(dbg.run().unwrap(), StopReason::Breakpoint(_)));

    let original = dbg.read_reg("rax").unwrap();
    dbg.write_reg("rax", 0x1234_5678).unwrap();
    assert_eq!(dbg.read_reg("rax").unwrap(), 0x1234_5678);

    dbg.write_reg("rax", original).unwrap();
    dbg.shutdown().unwrap();
}

#[test]
#[serial]
fn memory_write_is_visible_to_a_subsequent_read() {
    let bin = fixture("simple");
    let mut dbg = Debugger::setup(bin.to_str().unwrap(), &[], config()).unwrap();

    dbg.break_at_function("main").unwrap();
    assert!(matches!(dbg.run().unwrap(), StopReason::Breakpoint(_)));

    let rsp = dbg.read_reg("rsp").unwrap();
    let scratch = RealAddr(rsp as usize - 256);

    let original = dbg.read_mem(scratch).unwrap();
    dbg.write_mem(scratch, 0xdead_beef_dead_beef).unwrap();
    assert_eq!(dbg.read_mem(scratch).unwrap(), 0xdead_beef_dead_beef);

    dbg.write_mem(scratch, original).unwrap();
    dbg.shutdown().unwrap();
}

#[test]
#[serial]
fn print_var_reads_formal_parameters_at_the_function_start() {
    let bin = fixture("simple");
    let mut dbg = Debugger::setup(bin.to_str().unwrap(), &[], config()).unwrap();

    dbg.break_at_function("weird_sum").unwrap();
    assert!(matches!(dbg.run().unwrap(), StopReason::Breakpoint(_)));

    assert_eq!(dbg.print_var("a").unwrap(), 1);
    assert_eq!(dbg.print_var("b").unwrap(), 2);

    dbg.shutdown().unwrap();
}
