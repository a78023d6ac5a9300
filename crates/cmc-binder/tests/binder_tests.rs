use super::*;
use crate::test_support::*;
use cmc_ast::{
    BinaryOp, ClassData, FunctionData, InitializerTarget, NodeArena, NodeIndex, NodeKind,
    Specifiers, UnaryOp,
};
use cmc_common::ErrorKind;
use cmc_symbols::{SymbolId, SymbolTable, group_names};

/// `public void f(<parameters>) { <body> }` as the only member of a unit.
fn void_unit(arena: &mut NodeArena, parameters: Vec<NodeIndex>, body: Vec<NodeIndex>) -> (NodeIndex, NodeIndex) {
    let body = arena.add_block(body);
    let f = arena.add_function(
        NodeKind::Function,
        FunctionData::new("f")
            .specifiers(Specifiers::PUBLIC)
            .params(parameters)
            .body(body),
    );
    let root = arena.add_compile_unit("f.cm", vec![f]);
    (root, f)
}

fn local_int(arena: &mut NodeArena, name: &str, value: i64) -> NodeIndex {
    let ty = arena.add_type_name("int");
    let value = arena.add_int(value);
    arena.add_construction(name, ty, vec![value])
}

/// `for (int i = 0; i < 10; i + 1) {}`
fn counting_loop(arena: &mut NodeArena) -> NodeIndex {
    let init = local_int(arena, "i", 0);
    let i = arena.add_identifier("i");
    let ten = arena.add_int(10);
    let condition = arena.add_binary(BinaryOp::Less, i, ten);
    let i = arena.add_identifier("i");
    let one = arena.add_int(1);
    let increment = arena.add_binary(BinaryOp::Add, i, one);
    let body = arena.add_block(vec![]);
    arena.add_for(init, condition, increment, body)
}

fn bound_function<'u>(table: &SymbolTable, unit: &'u BoundCompileUnit, node: NodeIndex) -> &'u BoundFunction {
    let function = table.get_function_symbol(node).unwrap();
    unit.function(function).expect("bound function")
}

fn constructors(table: &SymbolTable, class: &str) -> Vec<SymbolId> {
    table.group_functions(symbol(table, class), group_names::CONSTRUCTOR)
}

// =============================================================================
// Function bodies
// =============================================================================

#[test]
fn test_free_function_body() {
    let mut arena = NodeArena::new();
    let a = int_parameter(&mut arena, "a");
    let b = int_parameter(&mut arena, "b");
    let left = arena.add_identifier("a");
    let right = arena.add_identifier("b");
    let sum = arena.add_binary(BinaryOp::Add, left, right);
    let ret = arena.add_return(sum);
    let int_type = arena.add_type_name("int");
    let body = arena.add_block(vec![ret]);
    let add = arena.add_function(
        NodeKind::Function,
        FunctionData::new("add")
            .specifiers(Specifiers::PUBLIC)
            .returns(int_type)
            .params(vec![a, b])
            .body(body),
    );
    let root = arena.add_compile_unit("add.cm", vec![add]);

    let (table, unit) = bind(&arena, root).unwrap();
    assert_eq!(unit.file_name, "add.cm");
    let bound = bound_function(&table, &unit, add);
    assert!(!bound.synthesized);
    assert_eq!(statement_names(bound), vec!["receive", "receive", "return"]);

    let function = table.get_function_symbol(add).unwrap();
    let data = table.function_data(function).unwrap();
    let BoundStatementKind::Return {
        expression: Some(expression),
        return_value,
    } = &bound.statements()[2].kind
    else {
        panic!("expected a return with a value");
    };
    assert_eq!(*return_value, data.return_value);
    assert_eq!(table.type_name(expression.type_id), "int");
    assert!(matches!(
        expression.kind,
        BoundExpressionKind::Binary { op: BinaryOp::Add, .. }
    ));
}

#[test]
fn test_member_function_reads_member_through_this() {
    let mut arena = NodeArena::new();
    let value_ref = arena.add_identifier("value");
    let ret = arena.add_return(value_ref);
    let get = function(&mut arena, "Get", Specifiers::PUBLIC, Some("int"), vec![ret]);
    let value = member_variable(&mut arena, "value", "int");
    let class = arena.add_class_decl("C", Specifiers::PUBLIC, vec![get, value]);
    let root = arena.add_compile_unit("c.cm", vec![class]);

    let (table, unit) = bind(&arena, root).unwrap();
    let bound = bound_function(&table, &unit, get);
    assert_eq!(statement_names(bound), vec!["receive", "return"]);

    let function = table.get_function_symbol(get).unwrap();
    let this = table.function_data(function).unwrap().parameters[0];
    assert_eq!(
        bound.statements()[0].kind,
        BoundStatementKind::Receive { parameter: this }
    );
    let BoundStatementKind::Return {
        expression: Some(expression),
        ..
    } = &bound.statements()[1].kind
    else {
        panic!("expected a return with a value");
    };
    let BoundExpressionKind::MemberVariable {
        object: Some(object),
        variable,
    } = &expression.kind
    else {
        panic!("expected a member variable access");
    };
    assert_eq!(*variable, symbol(&table, "C.value"));
    assert_eq!(object.kind, BoundExpressionKind::This(this));
}

#[test]
fn test_bodiless_functions_are_not_bound() {
    let mut arena = NodeArena::new();
    let f = arena.add_function(
        NodeKind::Function,
        FunctionData::new("puts").specifiers(Specifiers::EXTERNAL),
    );
    let root = arena.add_compile_unit("ext.cm", vec![f]);

    let (_, unit) = bind(&arena, root).unwrap();
    assert!(unit.nodes.is_empty());
}

#[test]
fn test_missing_return_path_is_reported() {
    let mut arena = NodeArena::new();
    let bool_type = arena.add_type_name("bool");
    let b = arena.add_parameter("b", bool_type);
    let cond = arena.add_identifier("b");
    let one = arena.add_int(1);
    let ret = arena.add_return(one);
    let guarded = arena.add_if(cond, ret, NodeIndex::NONE);
    let int_type = arena.add_type_name("int");
    let body = arena.add_block(vec![guarded]);
    let f = arena.add_function(
        NodeKind::Function,
        FunctionData::new("f").returns(int_type).params(vec![b]).body(body),
    );
    let root = arena.add_compile_unit("f.cm", vec![f]);

    let err = bind(&arena, root).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ControlFlow);
    assert_eq!(err.primary, arena.span(f));
}

// =============================================================================
// Statements
// =============================================================================

#[test]
fn test_break_outside_loop_is_rejected() {
    let mut arena = NodeArena::new();
    let brk = arena.add_break();
    let (root, _) = void_unit(&mut arena, vec![], vec![brk]);

    let err = bind(&arena, root).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ControlFlow);
    assert_eq!(
        err.message,
        "break statement must be enclosed in a while, do, for or switch statement"
    );
    assert_eq!(err.primary, arena.span(brk));
}

#[test]
fn test_continue_inside_switch_only_is_rejected() {
    let mut arena = NodeArena::new();
    let x = int_parameter(&mut arena, "x");
    let cond = arena.add_identifier("x");
    let one = arena.add_int(1);
    let cont = arena.add_continue();
    let case = arena.add_case(vec![one], vec![cont]);
    let switch = arena.add_switch(cond, vec![case], NodeIndex::NONE);
    let (root, _) = void_unit(&mut arena, vec![x], vec![switch]);

    let err = bind(&arena, root).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ControlFlow);
    assert_eq!(
        err.message,
        "continue statement must be enclosed in a while, do or for statement"
    );
}

#[test]
fn test_break_and_continue_inside_loops() {
    let mut arena = NodeArena::new();
    let x = int_parameter(&mut arena, "x");
    let cond = arena.add_identifier("x");
    let one = arena.add_int(1);
    let brk = arena.add_break();
    let case = arena.add_case(vec![one], vec![brk]);
    let default_brk = arena.add_break();
    let default = arena.add_default(vec![default_brk]);
    let switch = arena.add_switch(cond, vec![case], default);
    let t = arena.add_bool(true);
    let cont = arena.add_continue();
    let loop_body = arena.add_block(vec![switch, cont]);
    let forever = arena.add_while(t, loop_body);
    let (root, f) = void_unit(&mut arena, vec![x], vec![forever]);

    let (table, unit) = bind(&arena, root).unwrap();
    let bound = bound_function(&table, &unit, f);
    assert_eq!(statement_names(bound), vec!["receive", "while"]);
    let BoundStatementKind::While { body: Some(body), .. } = &bound.statements()[1].kind else {
        panic!("expected a while statement with a body");
    };
    let names: Vec<&str> = body.statements().iter().map(|s| s.name()).collect();
    assert_eq!(names, vec!["switch", "continue"]);
    let BoundStatementKind::Switch { cases, default, .. } = &body.statements()[0].kind else {
        panic!("expected a switch statement");
    };
    assert_eq!(cases.len(), 1);
    assert!(default.is_some());
}

#[test]
fn test_condition_must_be_bool() {
    let mut arena = NodeArena::new();
    let one = arena.add_int(1);
    let then_block = arena.add_block(vec![]);
    let if_stmt = arena.add_if(one, then_block, NodeIndex::NONE);
    let (root, _) = void_unit(&mut arena, vec![], vec![if_stmt]);

    let err = bind(&arena, root).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Resolution);
    assert_eq!(err.message, "condition must be of type bool, not 'int'");
    assert_eq!(err.primary, arena.span(one));
}

#[test]
fn test_if_else_fills_both_branches() {
    let mut arena = NodeArena::new();
    let t = arena.add_bool(true);
    let then_block = arena.add_block(vec![]);
    let else_stmt = arena.add_empty();
    let if_stmt = arena.add_if(t, then_block, else_stmt);
    let (root, f) = void_unit(&mut arena, vec![], vec![if_stmt]);

    let (table, unit) = bind(&arena, root).unwrap();
    let bound = bound_function(&table, &unit, f);
    let BoundStatementKind::If {
        then_statement: Some(then_statement),
        else_statement: Some(else_statement),
        has_else: true,
        ..
    } = &bound.statements()[0].kind
    else {
        panic!("expected an if statement with both branches");
    };
    assert_eq!(then_statement.name(), "compound");
    assert_eq!(else_statement.name(), "empty");
}

#[test]
fn test_void_function_cannot_return_value() {
    let mut arena = NodeArena::new();
    let one = arena.add_int(1);
    let ret = arena.add_return(one);
    let (root, _) = void_unit(&mut arena, vec![], vec![ret]);

    let err = bind(&arena, root).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Declaration);
    assert_eq!(err.message, "void function cannot return a value");
}

#[test]
fn test_non_void_function_must_return_value() {
    let mut arena = NodeArena::new();
    let ret = arena.add_return(NodeIndex::NONE);
    let f = function(&mut arena, "f", Specifiers::PUBLIC, Some("int"), vec![ret]);
    let root = arena.add_compile_unit("f.cm", vec![f]);

    let err = bind(&arena, root).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Declaration);
    assert_eq!(err.message, "return statement in non-void function must return a value");
}

#[test]
fn test_sequential_for_loops_reuse_variable_name() {
    let mut arena = NodeArena::new();
    let first = counting_loop(&mut arena);
    let second = counting_loop(&mut arena);
    let (root, f) = void_unit(&mut arena, vec![], vec![first, second]);

    let (table, unit) = bind(&arena, root).unwrap();
    let bound = bound_function(&table, &unit, f);
    assert_eq!(statement_names(bound), vec!["for", "for"]);
    let BoundStatementKind::For {
        init: Some(init),
        condition: Some(condition),
        increment: Some(_),
        body: Some(body),
        has_init: true,
    } = &bound.statements()[0].kind
    else {
        panic!("expected a complete for statement");
    };
    assert_eq!(init.name(), "construction");
    assert_eq!(table.type_name(condition.type_id), "bool");
    assert_eq!(body.name(), "compound");
}

#[test]
fn test_duplicate_local_is_rejected() {
    let mut arena = NodeArena::new();
    let first = local_int(&mut arena, "x", 1);
    let second = local_int(&mut arena, "x", 2);
    let (root, _) = void_unit(&mut arena, vec![], vec![first, second]);

    let err = bind(&arena, root).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Declaration);
    assert_eq!(err.message, "symbol 'x' already defined");
}

#[test]
fn test_local_is_visible_in_nested_block() {
    let mut arena = NodeArena::new();
    let x = local_int(&mut arena, "x", 1);
    let target = arena.add_identifier("x");
    let two = arena.add_int(2);
    let assign = arena.add_assignment(target, two);
    let inner = arena.add_block(vec![assign]);
    let (root, f) = void_unit(&mut arena, vec![], vec![x, inner]);

    let (table, unit) = bind(&arena, root).unwrap();
    let bound = bound_function(&table, &unit, f);
    let BoundStatementKind::Construction { local, constructor, arguments } = &bound.statements()[0].kind else {
        panic!("expected a construction statement");
    };
    assert_eq!(*constructor, SymbolId::NONE);
    assert_eq!(arguments.len(), 1);
    let inner = &bound.statements()[1];
    let BoundStatementKind::Assignment { target, .. } = &inner.statements()[0].kind else {
        panic!("expected an assignment");
    };
    assert_eq!(target.kind, BoundExpressionKind::LocalVariable(*local));
}

#[test]
fn test_unknown_identifier() {
    let mut arena = NodeArena::new();
    let y = arena.add_identifier("y");
    let stmt = arena.add_expression_statement(y);
    let (root, _) = void_unit(&mut arena, vec![], vec![stmt]);

    let err = bind(&arena, root).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Resolution);
    assert_eq!(err.message, "symbol 'y' not found");
    assert_eq!(err.primary, arena.span(y));
}

#[test]
fn test_assignment_target_must_be_variable() {
    let mut arena = NodeArena::new();
    let one = arena.add_int(1);
    let two = arena.add_int(2);
    let assign = arena.add_assignment(one, two);
    let (root, _) = void_unit(&mut arena, vec![], vec![assign]);

    let err = bind(&arena, root).unwrap_err();
    assert_eq!(err.message, "left side of assignment must be a variable");
}

#[test]
fn test_not_requires_bool_operand() {
    let mut arena = NodeArena::new();
    let one = arena.add_int(1);
    let not = arena.add_unary(UnaryOp::Not, one);
    let stmt = arena.add_expression_statement(not);
    let (root, _) = void_unit(&mut arena, vec![], vec![stmt]);

    let err = bind(&arena, root).unwrap_err();
    assert_eq!(err.message, "operand of '!' must be of type bool, not 'int'");
}

#[test]
fn test_void_local_is_rejected() {
    let mut arena = NodeArena::new();
    let void_type = arena.add_type_name("void");
    let v = arena.add_construction("v", void_type, vec![]);
    let (root, _) = void_unit(&mut arena, vec![], vec![v]);

    let err = bind(&arena, root).unwrap_err();
    assert_eq!(err.message, "local variable 'v' cannot be of type void");
}

#[test]
fn test_this_in_static_function_is_rejected() {
    let mut arena = NodeArena::new();
    let this = arena.add_this();
    let stmt = arena.add_expression_statement(this);
    let f = function(&mut arena, "Make", Specifiers::PUBLIC | Specifiers::STATIC, None, vec![stmt]);
    let class = arena.add_class_decl("C", Specifiers::PUBLIC, vec![f]);
    let root = arena.add_compile_unit("c.cm", vec![class]);

    let err = bind(&arena, root).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Resolution);
    assert_eq!(err.message, "'this' can only be used in non-static member functions");
}

// =============================================================================
// Calls and member access
// =============================================================================

/// `void f(int x) {}`, `void f(bool x) {}` and `void g() { <call> }`.
fn overload_unit(arena: &mut NodeArena, arguments: Vec<NodeIndex>) -> (NodeIndex, NodeIndex, NodeIndex) {
    let x = int_parameter(arena, "x");
    let int_body = arena.add_block(vec![]);
    let f_int = arena.add_function(
        NodeKind::Function,
        FunctionData::new("f").params(vec![x]).body(int_body),
    );
    let bool_type = arena.add_type_name("bool");
    let x = arena.add_parameter("x", bool_type);
    let bool_body = arena.add_block(vec![]);
    let f_bool = arena.add_function(
        NodeKind::Function,
        FunctionData::new("f").params(vec![x]).body(bool_body),
    );
    let callee = arena.add_identifier("f");
    let call = arena.add_invoke(callee, arguments);
    let stmt = arena.add_expression_statement(call);
    let g = function(arena, "g", Specifiers::empty(), None, vec![stmt]);
    let root = arena.add_compile_unit("calls.cm", vec![f_int, f_bool, g]);
    (root, f_bool, g)
}

#[test]
fn test_overload_selected_by_argument_type() {
    let mut arena = NodeArena::new();
    let t = arena.add_bool(true);
    let (root, f_bool, g) = overload_unit(&mut arena, vec![t]);

    let (table, unit) = bind(&arena, root).unwrap();
    let bound = bound_function(&table, &unit, g);
    let BoundStatementKind::Expression(call) = &bound.statements()[0].kind else {
        panic!("expected an expression statement");
    };
    let BoundExpressionKind::FunctionCall { function, object, arguments } = &call.kind else {
        panic!("expected a function call");
    };
    assert_eq!(*function, table.get_function_symbol(f_bool).unwrap());
    assert!(object.is_none());
    assert_eq!(arguments.len(), 1);
    assert_eq!(table.type_name(call.type_id), "void");
}

#[test]
fn test_call_with_wrong_arity() {
    let mut arena = NodeArena::new();
    let one = arena.add_int(1);
    let two = arena.add_int(2);
    let (root, _, _) = overload_unit(&mut arena, vec![one, two]);

    let err = bind(&arena, root).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Resolution);
    assert_eq!(err.message, "no overload of 'f' takes 2 arguments");
}

#[test]
fn test_local_of_class_type_uses_default_constructor() {
    let mut arena = NodeArena::new();
    let a = member_variable(&mut arena, "a", "int");
    let class = arena.add_class_decl("C", Specifiers::PUBLIC, vec![a]);
    let c_type = arena.add_type_name("C");
    let c = arena.add_construction("c", c_type, vec![]);
    let subject = arena.add_identifier("c");
    let member = arena.add_dot(subject, "a");
    let int_type = arena.add_type_name("int");
    let y = arena.add_construction("y", int_type, vec![member]);
    let body = arena.add_block(vec![c, y]);
    let f = arena.add_function(NodeKind::Function, FunctionData::new("f").body(body));
    let root = arena.add_compile_unit("c.cm", vec![class, f]);

    let (table, unit) = bind(&arena, root).unwrap();
    let bound = bound_function(&table, &unit, f);
    let BoundStatementKind::Construction { local, constructor, arguments } = &bound.statements()[0].kind else {
        panic!("expected a construction statement");
    };
    assert!(arguments.is_empty());
    assert_eq!(*constructor, constructors(&table, "C")[0]);
    assert!(
        table
            .get(*constructor)
            .unwrap()
            .has_flag(cmc_symbols::SymbolFlags::COMPILER_GENERATED)
    );

    let BoundStatementKind::Construction { arguments, .. } = &bound.statements()[1].kind else {
        panic!("expected a construction statement");
    };
    let BoundExpressionKind::MemberVariable { object: Some(object), variable } = &arguments[0].kind else {
        panic!("expected a member access");
    };
    assert_eq!(*variable, symbol(&table, "C.a"));
    assert_eq!(object.kind, BoundExpressionKind::LocalVariable(*local));
    assert_eq!(table.type_name(arguments[0].type_id), "int");
}

#[test]
fn test_missing_member_through_dot() {
    let mut arena = NodeArena::new();
    let class = arena.add_class_decl("C", Specifiers::PUBLIC, vec![]);
    let c_type = arena.add_type_name("C");
    let c = arena.add_construction("c", c_type, vec![]);
    let subject = arena.add_identifier("c");
    let member = arena.add_dot(subject, "missing");
    let stmt = arena.add_expression_statement(member);
    let body = arena.add_block(vec![c, stmt]);
    let f = arena.add_function(NodeKind::Function, FunctionData::new("f").body(body));
    let root = arena.add_compile_unit("c.cm", vec![class, f]);

    let err = bind(&arena, root).unwrap_err();
    assert_eq!(err.message, "'missing' is not a member of 'C'");
}

// =============================================================================
// Constructors and destructors
// =============================================================================

fn derived(arena: &mut NodeArena, name: &str, base: &str, members: Vec<NodeIndex>) -> NodeIndex {
    let base_type = arena.add_type_name(base);
    arena.add_class(ClassData {
        name: name.to_string(),
        specifiers: Specifiers::PUBLIC,
        base_types: vec![base_type],
        members,
        ..ClassData::default()
    })
}

fn constructor(arena: &mut NodeArena, class: &str, parameters: Vec<NodeIndex>, initializers: Vec<NodeIndex>) -> NodeIndex {
    let body = arena.add_block(vec![]);
    arena.add_function(
        NodeKind::Constructor,
        FunctionData::new(class)
            .specifiers(Specifiers::PUBLIC)
            .params(parameters)
            .initializers(initializers)
            .body(body),
    )
}

#[test]
fn test_constructor_prologue_order() {
    let mut arena = NodeArena::new();
    let base_ctor = constructor(&mut arena, "B", vec![], vec![]);
    let base = arena.add_class_decl("B", Specifiers::PUBLIC, vec![base_ctor]);

    let one = arena.add_int(1);
    let init_a = arena.add_initializer(InitializerTarget::Member("a".to_string()), vec![one]);
    let ctor = constructor(&mut arena, "D", vec![], vec![init_a]);
    let f = function(&mut arena, "f", Specifiers::PUBLIC | Specifiers::VIRTUAL, None, vec![]);
    let a = member_variable(&mut arena, "a", "int");
    let b = member_variable(&mut arena, "b", "int");
    let class = derived(&mut arena, "D", "B", vec![ctor, f, a, b]);
    let root = arena.add_compile_unit("bd.cm", vec![base, class]);

    let (table, unit) = bind(&arena, root).unwrap();
    let bound = bound_function(&table, &unit, ctor);
    assert_eq!(
        statement_names(bound),
        vec![
            "receive",
            "initializer call",
            "vtable pointer initialization",
            "member initialization",
            "member initialization",
        ]
    );
    let base_symbol = symbol(&table, "B");
    assert_eq!(
        bound.statements()[1].kind,
        BoundStatementKind::InitializerCall {
            class: base_symbol,
            constructor: table.get_function_symbol(base_ctor).unwrap(),
            arguments: Vec::new(),
        }
    );
    let BoundStatementKind::InitializeMember { variable, arguments } = &bound.statements()[3].kind else {
        panic!("expected a member initialization");
    };
    assert_eq!(*variable, symbol(&table, "D.a"));
    assert_eq!(arguments.len(), 1);
    let BoundStatementKind::InitializeMember { variable, arguments } = &bound.statements()[4].kind else {
        panic!("expected a member initialization");
    };
    assert_eq!(*variable, symbol(&table, "D.b"));
    assert!(arguments.is_empty());
}

#[test]
fn test_base_without_default_constructor() {
    let mut arena = NodeArena::new();
    let x = int_parameter(&mut arena, "x");
    let base_ctor = constructor(&mut arena, "B", vec![x], vec![]);
    let base = arena.add_class_decl("B", Specifiers::PUBLIC, vec![base_ctor]);
    let ctor = constructor(&mut arena, "D", vec![], vec![]);
    let class = derived(&mut arena, "D", "B", vec![ctor]);
    let root = arena.add_compile_unit("bd.cm", vec![base, class]);

    let err = bind(&arena, root).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Resolution);
    assert_eq!(err.message, "base class 'B' of class 'D' has no default constructor");
}

#[test]
fn test_explicit_base_initializer_selects_constructor() {
    let mut arena = NodeArena::new();
    let x = int_parameter(&mut arena, "x");
    let base_ctor = constructor(&mut arena, "B", vec![x], vec![]);
    let base = arena.add_class_decl("B", Specifiers::PUBLIC, vec![base_ctor]);
    let seven = arena.add_int(7);
    let init = arena.add_initializer(InitializerTarget::Base, vec![seven]);
    let ctor = constructor(&mut arena, "D", vec![], vec![init]);
    let class = derived(&mut arena, "D", "B", vec![ctor]);
    let root = arena.add_compile_unit("bd.cm", vec![base, class]);

    let (table, unit) = bind(&arena, root).unwrap();
    let bound = bound_function(&table, &unit, ctor);
    let BoundStatementKind::InitializerCall { class, constructor, arguments } = &bound.statements()[1].kind else {
        panic!("expected an initializer call");
    };
    assert_eq!(*class, symbol(&table, "B"));
    assert_eq!(*constructor, table.get_function_symbol(base_ctor).unwrap());
    assert_eq!(arguments.len(), 1);
}

#[test]
fn test_base_initializer_without_base_class() {
    let mut arena = NodeArena::new();
    let init = arena.add_initializer(InitializerTarget::Base, vec![]);
    let ctor = constructor(&mut arena, "C", vec![], vec![init]);
    let class = arena.add_class_decl("C", Specifiers::PUBLIC, vec![ctor]);
    let root = arena.add_compile_unit("c.cm", vec![class]);

    let err = bind(&arena, root).unwrap_err();
    assert_eq!(err.message, "class 'C' has no base class");
    assert_eq!(err.primary, arena.span(init));
}

#[test]
fn test_this_initializer_excludes_member_initializers() {
    let mut arena = NodeArena::new();
    let default_ctor = constructor(&mut arena, "C", vec![], vec![]);
    let x = int_parameter(&mut arena, "x");
    let delegate = arena.add_initializer(InitializerTarget::This, vec![]);
    let x_ref = arena.add_identifier("x");
    let init_a = arena.add_initializer(InitializerTarget::Member("a".to_string()), vec![x_ref]);
    let ctor = constructor(&mut arena, "C", vec![x], vec![delegate, init_a]);
    let a = member_variable(&mut arena, "a", "int");
    let class = arena.add_class_decl("C", Specifiers::PUBLIC, vec![default_ctor, ctor, a]);
    let root = arena.add_compile_unit("c.cm", vec![class]);

    let err = bind(&arena, root).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Declaration);
    assert_eq!(
        err.message,
        "constructor with a this initializer cannot initialize member variables"
    );
    assert_eq!(err.primary, arena.span(init_a));
}

#[test]
fn test_this_initializer_delegates() {
    let mut arena = NodeArena::new();
    let default_ctor = constructor(&mut arena, "C", vec![], vec![]);
    let x = int_parameter(&mut arena, "x");
    let delegate = arena.add_initializer(InitializerTarget::This, vec![]);
    let ctor = constructor(&mut arena, "C", vec![x], vec![delegate]);
    let a = member_variable(&mut arena, "a", "int");
    let class = arena.add_class_decl("C", Specifiers::PUBLIC, vec![default_ctor, ctor, a]);
    let root = arena.add_compile_unit("c.cm", vec![class]);

    let (table, unit) = bind(&arena, root).unwrap();
    let bound = bound_function(&table, &unit, ctor);
    assert_eq!(statement_names(bound), vec!["receive", "receive", "initializer call"]);
    let BoundStatementKind::InitializerCall { constructor, .. } = &bound.statements()[2].kind else {
        panic!("expected an initializer call");
    };
    assert_eq!(*constructor, table.get_function_symbol(default_ctor).unwrap());
}

#[test]
fn test_unknown_member_initializer() {
    let mut arena = NodeArena::new();
    let one = arena.add_int(1);
    let init = arena.add_initializer(InitializerTarget::Member("z".to_string()), vec![one]);
    let ctor = constructor(&mut arena, "C", vec![], vec![init]);
    let class = arena.add_class_decl("C", Specifiers::PUBLIC, vec![ctor]);
    let root = arena.add_compile_unit("c.cm", vec![class]);

    let err = bind(&arena, root).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Resolution);
    assert_eq!(err.message, "class 'C' has no member variable 'z'");
}

#[test]
fn test_destructor_epilogue_order() {
    let mut arena = NodeArena::new();
    let base = arena.add_class_decl("B", Specifiers::PUBLIC, vec![]);
    let body = arena.add_block(vec![]);
    let dtor = arena.add_function(
        NodeKind::Destructor,
        FunctionData::new("~D").specifiers(Specifiers::PUBLIC).body(body),
    );
    let a = member_variable(&mut arena, "a", "int");
    let b = member_variable(&mut arena, "b", "int");
    let class = derived(&mut arena, "D", "B", vec![dtor, a, b]);
    let root = arena.add_compile_unit("bd.cm", vec![base, class]);

    let (table, unit) = bind(&arena, root).unwrap();
    let bound = bound_function(&table, &unit, dtor);
    let b_symbol = symbol(&table, "B");
    let base_destructor = table.group_functions(b_symbol, group_names::DESTRUCTOR)[0];
    let tail: Vec<&BoundStatementKind> = bound.statements()[1..].iter().map(|s| &s.kind).collect();
    assert_eq!(
        tail,
        vec![
            &BoundStatementKind::DestroyMember { variable: symbol(&table, "D.b") },
            &BoundStatementKind::DestroyMember { variable: symbol(&table, "D.a") },
            &BoundStatementKind::DestroyBase { class: b_symbol, destructor: base_destructor },
        ]
    );
}

// =============================================================================
// Synthesized members
// =============================================================================

#[test]
fn test_implicit_members_get_synthesized_bodies() {
    let mut arena = NodeArena::new();
    let a = member_variable(&mut arena, "a", "int");
    let class = arena.add_class_decl("C", Specifiers::PUBLIC, vec![a]);
    let root = arena.add_compile_unit("c.cm", vec![class]);

    let (table, unit) = bind(&arena, root).unwrap();
    let c = symbol(&table, "C");
    let bound_class = unit.class(c).expect("bound class");
    assert_eq!(bound_class.functions().count(), 6);
    assert!(bound_class.functions().all(|f| f.synthesized));

    let ctors = constructors(&table, "C");
    let default = bound_class.function(ctors[0]).unwrap();
    assert_eq!(statement_names(default), vec!["receive", "member initialization"]);

    let copy = bound_class.function(ctors[1]).unwrap();
    assert_eq!(
        statement_names(copy),
        vec!["receive", "receive", "member initialization"]
    );
    let that = table.function_data(ctors[1]).unwrap().parameters[1];
    let BoundStatementKind::InitializeMember { arguments, .. } = &copy.statements()[2].kind else {
        panic!("expected a member initialization");
    };
    let BoundExpressionKind::MemberVariable { object: Some(object), .. } = &arguments[0].kind else {
        panic!("expected a member access");
    };
    assert_eq!(object.kind, BoundExpressionKind::Parameter(that));

    let destructor = table.group_functions(c, group_names::DESTRUCTOR)[0];
    let destructor = bound_class.function(destructor).unwrap();
    assert_eq!(statement_names(destructor), vec!["receive", "member destruction"]);

    let assignment = table.group_functions(c, group_names::ASSIGNMENT)[0];
    let assignment = bound_class.function(assignment).unwrap();
    assert_eq!(
        statement_names(assignment),
        vec!["receive", "receive", "assignment"]
    );
}

#[test]
fn test_defaulted_equality_compares_members() {
    let mut arena = NodeArena::new();
    let that_type = arena.add_const_ref("C");
    let that = arena.add_parameter("that", that_type);
    let bool_type = arena.add_type_name("bool");
    let equal = arena.add_function(
        NodeKind::Function,
        FunctionData::new("operator==")
            .specifiers(Specifiers::PUBLIC | Specifiers::DEFAULT)
            .returns(bool_type)
            .params(vec![that]),
    );
    let a = member_variable(&mut arena, "a", "int");
    let b = member_variable(&mut arena, "b", "int");
    let class = arena.add_class_decl("C", Specifiers::PUBLIC, vec![equal, a, b]);
    let root = arena.add_compile_unit("c.cm", vec![class]);

    let (table, unit) = bind(&arena, root).unwrap();
    let function = table.get_function_symbol(equal).unwrap();
    let bound = unit.function(function).expect("synthesized operator==");
    assert!(bound.synthesized);
    assert_eq!(statement_names(bound), vec!["receive", "receive", "return"]);
    let BoundStatementKind::Return {
        expression: Some(expression),
        ..
    } = &bound.statements()[2].kind
    else {
        panic!("expected a return with a value");
    };
    let BoundExpressionKind::Binary { op: BinaryOp::And, left, right } = &expression.kind else {
        panic!("expected a conjunction");
    };
    assert!(matches!(left.kind, BoundExpressionKind::Binary { op: BinaryOp::Eq, .. }));
    assert!(matches!(right.kind, BoundExpressionKind::Binary { op: BinaryOp::Eq, .. }));
    assert_eq!(table.type_name(expression.type_id), "bool");
}

#[test]
fn test_virtual_class_destructor_resets_vtable_pointer() {
    let mut arena = NodeArena::new();
    let f = function(&mut arena, "f", Specifiers::PUBLIC | Specifiers::VIRTUAL, None, vec![]);
    let class = arena.add_class_decl("C", Specifiers::PUBLIC, vec![f]);
    let root = arena.add_compile_unit("c.cm", vec![class]);

    let (table, unit) = bind(&arena, root).unwrap();
    let c = symbol(&table, "C");
    let destructor = table.group_functions(c, group_names::DESTRUCTOR)[0];
    let bound = unit.function(destructor).unwrap();
    assert_eq!(
        statement_names(bound),
        vec!["receive", "vtable pointer initialization"]
    );
}

#[test]
fn test_class_template_bodies_are_skipped() {
    let mut arena = NodeArena::new();
    let t = arena.add_template_parameter("T");
    let member = function(&mut arena, "f", Specifiers::PUBLIC, None, vec![]);
    let template = arena.add_class(ClassData {
        name: "Box".to_string(),
        specifiers: Specifiers::PUBLIC,
        template_parameters: vec![t],
        members: vec![member],
        ..ClassData::default()
    });
    let g = function(&mut arena, "g", Specifiers::PUBLIC, None, vec![]);
    let root = arena.add_compile_unit("box.cm", vec![template, g]);

    let (table, unit) = bind(&arena, root).unwrap();
    let functions = unit.functions();
    assert_eq!(functions.len(), 1);
    assert_eq!(functions[0].function, table.get_function_symbol(g).unwrap());
}

#[test]
fn test_functions_in_namespaces_are_bound() {
    let mut arena = NodeArena::new();
    let f = function(&mut arena, "f", Specifiers::PUBLIC, None, vec![]);
    let inner = arena.add_namespace("Inner", vec![f]);
    let outer = arena.add_namespace("Outer", vec![inner]);
    let root = arena.add_compile_unit("ns.cm", vec![outer]);

    let (table, unit) = bind(&arena, root).unwrap();
    let function = table.get_function_symbol(f).unwrap();
    assert_eq!(table.full_name(function), "Outer.Inner.f");
    assert!(unit.function(function).is_some());
}
