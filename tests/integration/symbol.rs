use crate::support::fixture;
use serial_test::serial;
use spray::debugger::oracle::Oracle;
use std::path::Path;

fn load(name: &str) -> Oracle {
    let bin = fixture(name);
    Oracle::load(Path::new(&bin)).unwrap()
}

#[test]
#[serial]
fn sym_by_addr_round_trips_through_start_addr() {
    let oracle = load("simple");
    for name in ["main", "weird_sum"] {
        let sym = oracle.sym_by_name(name).expect("symbol present").clone();
        let found = oracle
            .sym_by_addr(oracle.sym_start_addr(&sym))
            .expect("symbol at its own start address");
        assert_eq!(found.name(), sym.name());
    }
}

#[test]
#[serial]
fn addr_at_sym_position_falls_within_the_function() {
    let oracle = load("simple");
    let sym = oracle.sym_by_name("main").unwrap().clone();
    let filepath = oracle.sym_filepath(&sym).expect("main has a source file");
    let position = oracle.sym_position(&sym).expect("main has a position");

    let addr = oracle
        .addr_at(&filepath.to_string_lossy(), position.line)
        .expect("resolvable address for main's declared line");

    assert!(addr.in_range(oracle.sym_start_addr(&sym), oracle.sym_end_addr(&sym)));
}

#[test]
#[serial]
fn effective_function_start_skips_past_the_prologue() {
    let oracle = load("simple");
    for name in ["main", "weird_sum"] {
        let sym = oracle.sym_by_name(name).unwrap().clone();
        let effective = oracle.function_start_addr(&sym).unwrap();
        assert!(effective.in_range(oracle.sym_start_addr(&sym), oracle.sym_end_addr(&sym)));
        assert!(oracle.line_entry_from_pc(effective).is_some());
    }
}

#[test]
#[serial]
fn filepath_from_pc_is_absent_for_an_unmapped_address() {
    let oracle = load("simple");
    assert!(oracle.filepath_from_pc(spray::debugger::address::DbgAddr(0xdead_beef)).is_none());
}
