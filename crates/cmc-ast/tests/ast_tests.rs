//! Tests for the AST builders and accessors.

use super::*;
use cmc_common::{FileId, Span};

#[test]
fn test_add_node_wires_parent_links() {
    let mut arena = NodeArena::new();
    let cond = arena.add_bool(true);
    let ret = arena.add_return(NodeIndex::NONE);
    let body = arena.add_block(vec![ret]);
    let while_stmt = arena.add_while(cond, body);

    assert_eq!(arena.parent(cond), while_stmt);
    assert_eq!(arena.parent(body), while_stmt);
    assert_eq!(arena.parent(ret), body);
    assert!(arena.parent(while_stmt).is_none());
    assert_eq!(arena.kind(while_stmt), Some(NodeKind::While));
}

#[test]
fn test_synthetic_spans_are_distinct() {
    let mut arena = NodeArena::with_file(FileId(3));
    let a = arena.add_identifier("a");
    let b = arena.add_identifier("b");
    assert_ne!(arena.span(a), arena.span(b));
    assert_eq!(arena.span(a).file, FileId(3));
    assert!(!arena.span(a).is_dummy());
    assert_eq!(arena.span(NodeIndex::NONE), Span::DUMMY);
}

#[test]
fn test_function_accessor_and_static_constructor() {
    let mut arena = NodeArena::new();
    let body = arena.add_block(vec![]);
    let ctor = arena.add_function(
        NodeKind::Constructor,
        FunctionData::new("@constructor")
            .specifiers(Specifiers::STATIC)
            .body(body),
    );
    let plain = arena.add_function(NodeKind::Constructor, FunctionData::new("@constructor"));

    assert!(arena.is_static_constructor(ctor));
    assert!(!arena.is_static_constructor(plain));

    let node = arena.get(ctor).expect("ctor node");
    let data = arena.get_function(node).expect("function data");
    assert!(data.has_body());
    assert!(arena.get_class(node).is_none());
}

#[test]
fn test_find_ancestor_and_declared_name() {
    let mut arena = NodeArena::new();
    let ret = arena.add_return(NodeIndex::NONE);
    let body = arena.add_block(vec![ret]);
    let func = arena.add_function(NodeKind::Function, FunctionData::new("f").body(body));
    let class = arena.add_class_decl("Foo", Specifiers::PUBLIC, vec![func]);
    let ns = arena.add_namespace("N", vec![class]);
    let _unit = arena.add_compile_unit("foo.cm", vec![ns]);

    assert_eq!(arena.find_ancestor(ret, NodeKind::is_function_like), func);
    assert_eq!(arena.find_ancestor(ret, |k| k == NodeKind::Class), class);
    assert!(arena.find_ancestor(ns, |k| k == NodeKind::Class).is_none());
    assert_eq!(arena.declared_name(class), Some("Foo"));
    assert_eq!(arena.declared_name(func), Some("f"));
    assert_eq!(arena.declared_name(ret), None);
}

#[test]
fn test_children_in_source_order() {
    let mut arena = NodeArena::new();
    let init = arena.add_empty();
    let inc = arena.add_empty();
    let body = arena.add_block(vec![]);
    let for_stmt = arena.add_for(init, NodeIndex::NONE, inc, body);
    let node = arena.get(for_stmt).expect("for node");
    assert_eq!(node.data.children(), vec![init, inc, body]);
    assert!(arena.get_for(node).is_some_and(|f| f.condition.is_none()));
}

#[test]
fn test_derived_type_builders() {
    let mut arena = NodeArena::new();
    let const_ref = arena.add_const_ref("Foo");
    let node = arena.get(const_ref).expect("derived");
    let derived = arena.get_derived_type(node).expect("derived data");
    assert_eq!(derived.derivations, Derivations::CONST_REF);
    let base = arena.get(derived.base).expect("base");
    assert_eq!(arena.get_type_name(base).map(|t| t.name.as_str()), Some("Foo"));
    assert!(!derived.derivations.is_empty());
    assert!(Derivations::NONE.is_empty());
}

/// Node data borrows from the node, not from the arena it was read from.
fn function_name<'n>(arena: &NodeArena, node: &'n Node) -> Option<&'n str> {
    arena.get_function(node).map(|f| f.name.as_str())
}

#[test]
fn test_node_data_outlives_arena_borrow() {
    let mut arena = NodeArena::new();
    let f = arena.add_function(NodeKind::Function, FunctionData::new("f"));
    let node = arena.get(f).cloned().expect("function node");
    let name = {
        let scratch = NodeArena::new();
        function_name(&scratch, &node)
    };
    assert_eq!(name, Some("f"));
    assert!(arena.get_class(&node).is_none());
}
