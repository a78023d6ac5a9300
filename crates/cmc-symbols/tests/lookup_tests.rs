use super::*;
use cmc_ast::{ClassData, Derivations, NodeArena, NodeIndex, Specifiers};
use cmc_common::{ErrorKind, Span};

fn declared(arena: &NodeArena, root: NodeIndex) -> SymbolTable {
    let mut table = SymbolTable::new();
    declare_compile_unit(&mut table, arena, root).expect("declaration pass");
    table
}

fn scope_of(table: &SymbolTable, full_name: &str) -> ScopeId {
    let symbol = table.lookup_global(full_name).unwrap().expect(full_name);
    table.get(symbol).unwrap().scope
}

/// `namespace N { public class A {} namespace M { class B {} } }`
fn nested_namespaces(arena: &mut NodeArena) -> NodeIndex {
    let a = arena.add_class_decl("A", Specifiers::PUBLIC, vec![]);
    let b = arena.add_class_decl("B", Specifiers::empty(), vec![]);
    let m = arena.add_namespace("M", vec![b]);
    let n = arena.add_namespace("N", vec![a, m]);
    arena.add_compile_unit("n.cm", vec![n])
}

#[test]
fn test_lookup_respects_parent_policy() {
    let mut arena = NodeArena::new();
    let root = nested_namespaces(&mut arena);
    let table = declared(&arena, root);
    let m_scope = scope_of(&table, "N.M");
    let a = table.lookup_global("N.A").unwrap().unwrap();

    assert_eq!(table.lookup(m_scope, "A", ScopeLookup::THIS, Span::DUMMY).unwrap(), None);
    assert_eq!(
        table
            .lookup(m_scope, "A", ScopeLookup::THIS_AND_PARENT, Span::DUMMY)
            .unwrap(),
        Some(a)
    );
}

#[test]
fn test_qualified_lookup_descends_containers() {
    let mut arena = NodeArena::new();
    let root = nested_namespaces(&mut arena);
    let table = declared(&arena, root);

    let b = table.lookup_global("N.M.B").unwrap().expect("N.M.B");
    assert_eq!(table.full_name(b), "N.M.B");
    assert_eq!(table.lookup_global("N.M.C").unwrap(), None);

    // A missing component under a class is not found, not an error.
    assert_eq!(table.lookup_global("N.A.X.Y").unwrap(), None);
}

#[test]
fn test_qualified_lookup_through_non_container_fails() {
    let mut arena = NodeArena::new();
    let int_t = arena.add_type_name("int");
    let x = arena.add_member_variable("x", Specifiers::PUBLIC, int_t);
    let point = arena.add_class_decl("Point", Specifiers::PUBLIC, vec![x]);
    let root = arena.add_compile_unit("p.cm", vec![point]);
    let table = declared(&arena, root);

    assert!(table.lookup_global("Point.x").unwrap().is_some());
    let err = table.lookup_global("Point.x.y").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Resolution);
    assert_eq!(err.message, "'x' is not a container");
}

#[test]
fn test_dotted_namespace_declaration_creates_components() {
    let mut arena = NodeArena::new();
    let c = arena.add_class_decl("C", Specifiers::PUBLIC, vec![]);
    let ns = arena.add_namespace("System.Collections", vec![c]);
    let again = arena.add_namespace("System", vec![]);
    let root = arena.add_compile_unit("s.cm", vec![ns, again]);
    let table = declared(&arena, root);

    let system = table.lookup_global("System").unwrap().unwrap();
    assert!(table.get(system).unwrap().is_namespace());
    assert!(table.lookup_global("System.Collections.C").unwrap().is_some());
    assert_eq!(table.symbol_for_node(again), Some(system));
}

#[test]
fn test_lookup_through_base_scope() {
    let mut arena = NodeArena::new();
    let int_t = arena.add_type_name("int");
    let x = arena.add_member_variable("x", Specifiers::PROTECTED, int_t);
    let base = arena.add_class_decl("Base", Specifiers::PUBLIC, vec![x]);
    let derived = arena.add_class_decl("Derived", Specifiers::PUBLIC, vec![]);
    let root = arena.add_compile_unit("b.cm", vec![base, derived]);
    let mut table = declared(&arena, root);

    let base_scope = scope_of(&table, "Base");
    let derived_scope = scope_of(&table, "Derived");
    table.scope_mut(derived_scope).unwrap().base = base_scope;
    let x = table.lookup_global("Base.x").unwrap().unwrap();

    assert_eq!(table.lookup(derived_scope, "x", ScopeLookup::THIS, Span::DUMMY).unwrap(), None);
    assert_eq!(
        table
            .lookup(derived_scope, "x", ScopeLookup::THIS_AND_BASE, Span::DUMMY)
            .unwrap(),
        Some(x)
    );
    assert_eq!(table.lookup_global("Derived.x").unwrap(), Some(x));
}

fn using_unit(arena: &mut NodeArena, usings: &[&str]) -> NodeIndex {
    let xa = arena.add_class_decl("X", Specifiers::PUBLIC, vec![]);
    let a = arena.add_namespace("A", vec![xa]);
    let xb = arena.add_class_decl("X", Specifiers::PUBLIC, vec![]);
    let b = arena.add_namespace("B", vec![xb]);
    let mut members: Vec<NodeIndex> = usings.iter().map(|u| arena.add_using_namespace(u)).collect();
    members.push(a);
    members.push(b);
    arena.add_compile_unit("u.cm", members)
}

#[test]
fn test_using_namespace_resolves_unqualified_name() {
    let mut arena = NodeArena::new();
    let root = using_unit(&mut arena, &["A"]);
    let table = declared(&arena, root);
    let global_scope = table.get(table.global_namespace()).unwrap().scope;

    let x = table.lookup(global_scope, "X", ScopeLookup::ALL, Span::DUMMY).unwrap();
    assert_eq!(x, table.lookup_global("A.X").unwrap());
    let without_file = table
        .lookup(global_scope, "X", ScopeLookup::THIS_AND_PARENT, Span::DUMMY)
        .unwrap();
    assert_eq!(without_file, None);
}

#[test]
fn test_using_two_namespaces_with_same_name_is_ambiguous() {
    let mut arena = NodeArena::new();
    let root = using_unit(&mut arena, &["A", "B"]);
    let table = declared(&arena, root);
    let global_scope = table.get(table.global_namespace()).unwrap().scope;

    let err = table
        .lookup(global_scope, "X", ScopeLookup::ALL, Span::DUMMY)
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Resolution);
    assert_eq!(err.message, "reference to 'X' is ambiguous: A.X or B.X");
}

#[test]
fn test_using_unknown_namespace_is_reported() {
    let mut arena = NodeArena::new();
    let root = using_unit(&mut arena, &["Q"]);
    let table = declared(&arena, root);
    let global_scope = table.get(table.global_namespace()).unwrap().scope;

    let err = table
        .lookup(global_scope, "X", ScopeLookup::ALL, Span::DUMMY)
        .unwrap_err();
    assert_eq!(err.message, "namespace 'Q' not found");
}

// =============================================================================
// Type resolution
// =============================================================================

#[test]
fn test_resolve_basic_and_derived_types() {
    let mut arena = NodeArena::new();
    let root = nested_namespaces(&mut arena);
    let int_t = arena.add_type_name("int");
    let a_ref = arena.add_const_ref("N.A");
    let mut table = declared(&arena, root);
    let global_scope = table.get(table.global_namespace()).unwrap().scope;
    let resolver = TypeResolver::new(&arena);

    let int_id = resolver.resolve(&mut table, global_scope, int_t).unwrap();
    assert_eq!(int_id, table.types().basic(BasicType::Int));

    let a_ref_id = resolver.resolve(&mut table, global_scope, a_ref).unwrap();
    assert_eq!(table.type_name(a_ref_id), "const N.A&");
    assert_eq!(table.types().derivations(a_ref_id), Derivations::CONST_REF);
    let a = table.lookup_global("N.A").unwrap().unwrap();
    assert_eq!(table.types().type_symbol(table.types().base_type(a_ref_id)), Some(a));
}

#[test]
fn test_nested_derivations_fold() {
    let mut types = TypeRepository::new();
    let int_id = types.basic(BasicType::Int);
    let pointer = types.make_derived(int_id, Derivations::POINTER);
    let pointer_pointer = types.make_derived(pointer, Derivations::POINTER);
    assert_eq!(types.base_type(pointer_pointer), int_id);
    assert_eq!(types.derivations(pointer_pointer).pointers, 2);
    assert_eq!(types.make_derived(int_id, Derivations::POINTER), pointer);
}

#[test]
fn test_typedef_resolves_lazily_in_declaring_scope() {
    let mut arena = NodeArena::new();
    let a = arena.add_class_decl("A", Specifiers::PUBLIC, vec![]);
    let target = arena.add_type_name("A");
    let typedef = arena.add_typedef("Alias", Specifiers::PUBLIC, target);
    let n = arena.add_namespace("N", vec![a, typedef]);
    let use_site = arena.add_type_name("N.Alias");
    let root = arena.add_compile_unit("t.cm", vec![n]);
    let mut table = declared(&arena, root);
    let global_scope = table.get(table.global_namespace()).unwrap().scope;

    let resolved = TypeResolver::new(&arena)
        .resolve(&mut table, global_scope, use_site)
        .unwrap();
    let a = table.lookup_global("N.A").unwrap().unwrap();
    assert_eq!(resolved, table.class_data(a).unwrap().type_id);

    let alias = table.lookup_global("N.Alias").unwrap().unwrap();
    match &table.get(alias).unwrap().kind {
        SymbolKind::Typedef(data) => assert_eq!(data.type_id, resolved),
        other => panic!("expected typedef, got {other}"),
    }
}

#[test]
fn test_self_referential_typedef_is_rejected() {
    let mut arena = NodeArena::new();
    let target = arena.add_type_name("Loop");
    let typedef = arena.add_typedef("Loop", Specifiers::PUBLIC, target);
    let use_site = arena.add_type_name("Loop");
    let root = arena.add_compile_unit("loop.cm", vec![typedef]);
    let mut table = declared(&arena, root);
    let global_scope = table.get(table.global_namespace()).unwrap().scope;

    let err = TypeResolver::new(&arena)
        .resolve(&mut table, global_scope, use_site)
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Resolution);
}

#[test]
fn test_non_type_and_missing_type_errors() {
    let mut arena = NodeArena::new();
    let int_t = arena.add_type_name("int");
    let x = arena.add_member_variable("x", Specifiers::PUBLIC, int_t);
    let class = arena.add_class_decl("C", Specifiers::PUBLIC, vec![x]);
    let not_type = arena.add_type_name("C.x");
    let missing = arena.add_type_name("Nowhere");
    let root = arena.add_compile_unit("e.cm", vec![class]);
    let mut table = declared(&arena, root);
    let global_scope = table.get(table.global_namespace()).unwrap().scope;
    let resolver = TypeResolver::new(&arena);

    let err = resolver.resolve(&mut table, global_scope, not_type).unwrap_err();
    assert_eq!(err.message, "'C.x' does not denote a type");
    let err = resolver.resolve(&mut table, global_scope, missing).unwrap_err();
    assert_eq!(err.message, "type 'Nowhere' not found");
}

#[test]
fn test_class_template_requires_arguments() {
    let mut arena = NodeArena::new();
    let t = arena.add_template_parameter("T");
    let list = arena.add_class(ClassData {
        name: "List".to_string(),
        specifiers: Specifiers::PUBLIC,
        template_parameters: vec![t],
        ..ClassData::default()
    });
    let use_site = arena.add_type_name("List");
    let root = arena.add_compile_unit("l.cm", vec![list]);
    let mut table = declared(&arena, root);
    let global_scope = table.get(table.global_namespace()).unwrap().scope;

    let err = TypeResolver::new(&arena)
        .resolve(&mut table, global_scope, use_site)
        .unwrap_err();
    assert_eq!(err.message, "class template 'List' requires template arguments");
}

#[test]
fn test_type_access_is_minimum_over_parts() {
    let mut arena = NodeArena::new();
    let public_class = arena.add_class_decl("Open", Specifiers::PUBLIC, vec![]);
    let internal_class = arena.add_class_decl("Hidden", Specifiers::empty(), vec![]);
    let root = arena.add_compile_unit("a.cm", vec![public_class, internal_class]);
    let table = declared(&arena, root);

    let open = table.lookup_global("Open").unwrap().unwrap();
    let hidden = table.lookup_global("Hidden").unwrap().unwrap();
    assert_eq!(table.type_access(table.class_data(open).unwrap().type_id), Access::Public);
    assert_eq!(
        table.type_access(table.class_data(hidden).unwrap().type_id),
        Access::Internal
    );
    assert_eq!(table.type_access(table.types().basic(BasicType::Bool)), Access::Public);
}
