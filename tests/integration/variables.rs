use crate::support::fixture;
use gimli::Operation;
use serial_test::serial;
use spray::debugger::address::DbgAddr;
use spray::debugger::oracle::Oracle;
use std::path::Path;

fn load() -> Oracle {
    let bin = fixture("recurring_variables");
    Oracle::load(Path::new(&bin)).unwrap()
}

fn encoding() -> gimli::Encoding {
    gimli::Encoding {
        address_size: 8,
        format: gimli::Format::Dwarf32,
        version: 4,
    }
}

/// Inside `blah`, `a` isn't declared locally, so it resolves to the
/// global: a `DW_OP_addr` expression, fixed regardless of the calling
/// frame. Inside `main`, the local `a` shadows it with a frame-relative
/// `DW_OP_fbreg` expression instead.
#[test]
#[serial]
fn a_resolves_to_the_global_inside_blah_but_a_local_inside_main() {
    let oracle = load();

    let blah = oracle.sym_by_name("blah").unwrap().clone();
    let blah_pc = oracle.function_start_addr(&blah).unwrap();
    assert_eq!(first_op_kind(&oracle, blah_pc, "a"), OpKind::Address);

    let main = oracle.sym_by_name("main").unwrap().clone();
    let main_pc = oracle.function_start_addr(&main).unwrap();
    assert_eq!(first_op_kind(&oracle, main_pc, "a"), OpKind::FrameOffset);
}

#[test]
#[serial]
fn b_and_c_are_frame_relative_in_both_scopes() {
    let oracle = load();

    let blah = oracle.sym_by_name("blah").unwrap().clone();
    let blah_pc = oracle.function_start_addr(&blah).unwrap();
    assert_eq!(first_op_kind(&oracle, blah_pc, "b"), OpKind::FrameOffset);
    assert_eq!(first_op_kind(&oracle, blah_pc, "c"), OpKind::FrameOffset);

    let main = oracle.sym_by_name("main").unwrap().clone();
    let main_pc = oracle.function_start_addr(&main).unwrap();
    assert_eq!(first_op_kind(&oracle, main_pc, "b"), OpKind::FrameOffset);
    assert_eq!(first_op_kind(&oracle, main_pc, "c"), OpKind::FrameOffset);
}

#[derive(Debug, PartialEq, Eq)]
enum OpKind {
    Address,
    FrameOffset,
    Other,
}

fn first_op_kind(oracle: &Oracle, pc: DbgAddr, name: &str) -> OpKind {
    let loclist = oracle.loclist_for_var(pc, name).expect("variable has a location");
    let expr = loclist.for_pc(pc).expect("location valid at this pc");
    let mut ops = expr.clone().operations(encoding());
    match ops.next().unwrap().unwrap() {
        Operation::Address { .. } => OpKind::Address,
        Operation::FrameOffset { .. } => OpKind::FrameOffset,
        _ => OpKind::Other,
    }
}
