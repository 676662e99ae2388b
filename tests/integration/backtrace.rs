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
fn backtrace_shows_the_caller_above_the_callee() {
    let bin = fixture("recurring_variables");
    let mut dbg = Debugger::setup(bin.to_str().unwrap(), &[], config()).unwrap();

    dbg.break_at_function("blah").unwrap();
    assert!(matches!(dbg.run().unwrap(), StopReason::Breakpoint(_)));

    let frames = dbg.print_backtrace().unwrap();
    assert!(frames.len() >= 2);
    assert_eq!(frames[0].function.as_deref(), Some("blah"));
    assert_eq!(frames[1].function.as_deref(), Some("main"));

    dbg.shutdown().unwrap();
}
