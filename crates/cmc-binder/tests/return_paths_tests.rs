use super::*;
use crate::test_support::*;
use cmc_ast::{FunctionData, NodeArena, NodeIndex, NodeKind, Specifiers};
use cmc_common::{CompileResult, ErrorKind};

/// `int f(int x, bool b) { <body> }` as the only member of a unit.
fn int_function(arena: &mut NodeArena, body: Vec<NodeIndex>) -> (NodeIndex, NodeIndex) {
    let x = int_parameter(arena, "x");
    let bool_type = arena.add_type_name("bool");
    let b = arena.add_parameter("b", bool_type);
    let int_type = arena.add_type_name("int");
    let body = arena.add_block(body);
    let f = arena.add_function(
        NodeKind::Function,
        FunctionData::new("f")
            .specifiers(Specifiers::PUBLIC)
            .returns(int_type)
            .params(vec![x, b])
            .body(body),
    );
    let root = arena.add_compile_unit("f.cm", vec![f]);
    (root, f)
}

fn check(arena: &NodeArena, root: NodeIndex, f: NodeIndex) -> CompileResult<()> {
    let table = complete(arena, root)?;
    let function = table.get_function_symbol(f)?;
    check_function_return_paths(&table, arena, function)
}

fn return_int(arena: &mut NodeArena, value: i64) -> NodeIndex {
    let value = arena.add_int(value);
    arena.add_return(value)
}

#[test]
fn test_plain_return_terminates() {
    let mut arena = NodeArena::new();
    let ret = return_int(&mut arena, 0);
    let (root, f) = int_function(&mut arena, vec![ret]);
    assert!(check(&arena, root, f).is_ok());
}

#[test]
fn test_empty_body_does_not_terminate() {
    let mut arena = NodeArena::new();
    let (root, f) = int_function(&mut arena, vec![]);

    let err = check(&arena, root, f).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ControlFlow);
    assert_eq!(
        err.message,
        "not all control paths terminate in return statement or throw statement"
    );
    assert_eq!(err.primary, arena.span(f));
}

#[test]
fn test_throw_terminates() {
    let mut arena = NodeArena::new();
    let value = arena.add_int(1);
    let throw = arena.add_throw(value);
    let (root, f) = int_function(&mut arena, vec![throw]);
    assert!(check(&arena, root, f).is_ok());
}

#[test]
fn test_if_needs_both_branches() {
    let mut arena = NodeArena::new();
    let cond = arena.add_identifier("b");
    let then_ret = return_int(&mut arena, 1);
    let only_then = arena.add_if(cond, then_ret, NodeIndex::NONE);
    let (root, f) = int_function(&mut arena, vec![only_then]);
    assert!(check(&arena, root, f).is_err());

    let mut arena = NodeArena::new();
    let cond = arena.add_identifier("b");
    let then_ret = return_int(&mut arena, 1);
    let else_ret = return_int(&mut arena, 0);
    let both = arena.add_if(cond, then_ret, else_ret);
    let (root, f) = int_function(&mut arena, vec![both]);
    assert!(check(&arena, root, f).is_ok());
}

#[test]
fn test_while_true_terminates() {
    let mut arena = NodeArena::new();
    let cond = arena.add_bool(true);
    let ret = return_int(&mut arena, 1);
    let body = arena.add_block(vec![ret]);
    let while_true = arena.add_while(cond, body);
    let (root, f) = int_function(&mut arena, vec![while_true]);
    assert!(check(&arena, root, f).is_ok());
}

#[test]
fn test_while_on_variable_does_not_terminate() {
    let mut arena = NodeArena::new();
    let cond = arena.add_identifier("b");
    let ret = return_int(&mut arena, 1);
    let body = arena.add_block(vec![ret]);
    let loop_on_b = arena.add_while(cond, body);
    let (root, f) = int_function(&mut arena, vec![loop_on_b]);

    let err = check(&arena, root, f).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ControlFlow);
}

#[test]
fn test_conditional_return_inside_forever_loop() {
    let mut arena = NodeArena::new();
    let cond = arena.add_bool(true);
    let b = arena.add_identifier("b");
    let ret = return_int(&mut arena, 1);
    let guarded = arena.add_if(b, ret, NodeIndex::NONE);
    let body = arena.add_block(vec![guarded]);
    let forever = arena.add_while(cond, body);
    let (root, f) = int_function(&mut arena, vec![forever]);
    assert!(check(&arena, root, f).is_ok());
}

#[test]
fn test_for_without_condition_is_forever() {
    let mut arena = NodeArena::new();
    let ret = return_int(&mut arena, 1);
    let body = arena.add_block(vec![ret]);
    let forever = arena.add_for(NodeIndex::NONE, NodeIndex::NONE, NodeIndex::NONE, body);
    let (root, f) = int_function(&mut arena, vec![forever]);
    assert!(check(&arena, root, f).is_ok());
}

#[test]
fn test_switch_requires_default() {
    let mut arena = NodeArena::new();
    let x = arena.add_identifier("x");
    let one = arena.add_int(1);
    let ret_one = return_int(&mut arena, 1);
    let case = arena.add_case(vec![one], vec![ret_one]);
    let switch = arena.add_switch(x, vec![case], NodeIndex::NONE);
    let (root, f) = int_function(&mut arena, vec![switch]);
    assert!(check(&arena, root, f).is_err());

    let mut arena = NodeArena::new();
    let x = arena.add_identifier("x");
    let one = arena.add_int(1);
    let ret_one = return_int(&mut arena, 1);
    let case = arena.add_case(vec![one], vec![ret_one]);
    let ret_zero = return_int(&mut arena, 0);
    let default = arena.add_default(vec![ret_zero]);
    let switch = arena.add_switch(x, vec![case], default);
    let (root, f) = int_function(&mut arena, vec![switch]);
    assert!(check(&arena, root, f).is_ok());
}

#[test]
fn test_switch_case_falling_out_does_not_terminate() {
    let mut arena = NodeArena::new();
    let x = arena.add_identifier("x");
    let one = arena.add_int(1);
    let brk = arena.add_break();
    let case = arena.add_case(vec![one], vec![brk]);
    let ret_zero = return_int(&mut arena, 0);
    let default = arena.add_default(vec![ret_zero]);
    let switch = arena.add_switch(x, vec![case], default);
    let (root, f) = int_function(&mut arena, vec![switch]);
    assert!(check(&arena, root, f).is_err());
}

#[test]
fn test_void_and_bodiless_functions_pass() {
    let mut arena = NodeArena::new();
    let v = function(&mut arena, "v", Specifiers::PUBLIC, None, vec![]);
    let int_type = arena.add_type_name("int");
    let decl = arena.add_function(
        NodeKind::Function,
        FunctionData::new("g")
            .specifiers(Specifiers::PUBLIC | Specifiers::EXTERNAL)
            .returns(int_type),
    );
    let root = arena.add_compile_unit("v.cm", vec![v, decl]);

    let table = complete(&arena, root).unwrap();
    for node in [v, decl] {
        let function = table.get_function_symbol(node).unwrap();
        assert!(check_function_return_paths(&table, &arena, function).is_ok());
    }
}

#[test]
fn test_terminates_function_on_single_statement() {
    let mut arena = NodeArena::new();
    let ret = return_int(&mut arena, 1);
    let block = arena.add_block(vec![ret]);
    let brk = arena.add_break();
    let (root, _) = int_function(&mut arena, vec![block, brk]);

    let table = complete(&arena, root).unwrap();
    assert!(terminates_function(&table, &arena, block).unwrap());
    assert!(!terminates_function(&table, &arena, brk).unwrap());
}

#[test]
fn test_block_terminates_when_any_statement_does() {
    // Statements after the terminating one are never examined.
    let mut arena = NodeArena::new();
    let ret = return_int(&mut arena, 1);
    let b = arena.add_identifier("b");
    let trailing = arena.add_expression_statement(b);
    let (root, f) = int_function(&mut arena, vec![ret, trailing]);
    assert!(check(&arena, root, f).is_ok());
}
