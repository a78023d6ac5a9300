use super::*;
use crate::module_image::{ClassRecord, KindRecord, SymbolRecord};
use cmc_ast::{ClassData, NodeArena, Specifiers};
use cmc_common::{CompileOptions, ErrorKind, Span};

/// A table holding `public class <name> {}` at global scope.
fn table_with_class(table: SymbolTable, name: &str) -> SymbolTable {
    let mut table = table;
    let mut arena = NodeArena::new();
    let class = arena.add_class_decl(name, Specifiers::PUBLIC, vec![]);
    let root = arena.add_compile_unit("unit.cm", vec![class]);
    declare_compile_unit(&mut table, &arena, root).expect("declaration pass");
    table
}

fn image_of(table: &SymbolTable, options: &CompileOptions) -> Vec<u8> {
    let mut bytes = Vec::new();
    table.export(&mut bytes, options).expect("export");
    bytes
}

fn cid_of(table: &SymbolTable, full_name: &str) -> Cid {
    let class = table.lookup_global(full_name).unwrap().expect(full_name);
    table.class_data(class).unwrap().cid.expect("class id")
}

#[test]
fn test_import_preserves_sids_and_marks_symbols_imported() {
    let producer = table_with_class(SymbolTable::with_sid_base(1000), "Foo");
    let foo = producer.lookup_global("Foo").unwrap().unwrap();
    let foo_sid = producer.get(foo).unwrap().sid;
    let image = image_of(&producer, &CompileOptions::default());

    let mut consumer = SymbolTable::new();
    let summary = consumer.import(&mut image.as_slice()).unwrap();
    assert_eq!(summary.symbols, 1);
    assert_eq!(summary.template_instances, 0);

    let imported = consumer.lookup_global("Foo").unwrap().expect("imported Foo");
    let symbol = consumer.get(imported).unwrap();
    assert_eq!(symbol.sid, foo_sid);
    assert_eq!(symbol.access, Access::Public);
    assert!(consumer.is_imported(imported));
    assert_eq!(consumer.symbol_by_sid(foo_sid), Some(imported));
}

#[test]
fn test_imported_members_keep_their_shape() {
    let mut arena = NodeArena::new();
    let int_t = arena.add_type_name("int");
    let x = arena.add_parameter("x", int_t);
    let get = arena.add_function(
        cmc_ast::NodeKind::Function,
        cmc_ast::FunctionData::new("Get")
            .specifiers(Specifiers::PUBLIC)
            .params(vec![x]),
    );
    let field_t = arena.add_type_name("int");
    let field = arena.add_member_variable("value", Specifiers::empty(), field_t);
    let class = arena.add_class_decl("Foo", Specifiers::PUBLIC, vec![get, field]);
    let n = arena.add_namespace("N", vec![class]);
    let root = arena.add_compile_unit("foo.cm", vec![n]);
    let mut producer = SymbolTable::with_sid_base(1000);
    declare_compile_unit(&mut producer, &arena, root).unwrap();
    let image = image_of(&producer, &CompileOptions::default());

    let mut consumer = SymbolTable::new();
    consumer.import(&mut image.as_slice()).unwrap();
    let foo = consumer.lookup_global("N.Foo").unwrap().expect("N.Foo");
    let functions = consumer.group_functions(foo, "Get");
    assert_eq!(functions.len(), 1);
    let parameters = &consumer.function_data(functions[0]).unwrap().parameters;
    let names: Vec<&str> = parameters
        .iter()
        .map(|&p| consumer.get(p).unwrap().name.as_str())
        .collect();
    assert_eq!(names, vec!["this", "x"]);
    assert_eq!(consumer.class_data(foo).unwrap().member_variables.len(), 1);
    assert!(consumer.get_overload("N.Foo.Get").is_some());
}

#[test]
fn test_class_ids_follow_the_persisted_map() {
    let producer = table_with_class(SymbolTable::with_sid_base(1000), "Foo");
    assert_eq!(cid_of(&producer, "Foo"), Cid(1));
    let image = image_of(&producer, &CompileOptions::default());

    // Without the map the importer hands out the next free cid.
    let mut without_map = table_with_class(SymbolTable::new(), "Baz");
    without_map.import(&mut image.as_slice()).unwrap();
    assert_eq!(cid_of(&without_map, "Baz"), Cid(1));
    assert_eq!(cid_of(&without_map, "Foo"), Cid(2));

    // With the producer's map Foo keeps its cid and local classes avoid it.
    let mut persisted = SymbolTable::new();
    persisted.set_class_id_map(producer.class_id_map().clone());
    let mut with_map = table_with_class(persisted, "Baz");
    with_map.import(&mut image.as_slice()).unwrap();
    assert_eq!(cid_of(&with_map, "Baz"), Cid(2));
    assert_eq!(cid_of(&with_map, "Foo"), Cid(1));
    assert_eq!(with_map.class_by_cid(Cid(1)), with_map.lookup_global("Foo").unwrap());
}

#[test]
fn test_full_config_carries_template_instance_cids() {
    let mut arena = NodeArena::new();
    let foo = arena.add_class_decl("Foo", Specifiers::PUBLIC, vec![]);
    let t = arena.add_template_parameter("T");
    let list = arena.add_class(ClassData {
        name: "List".to_string(),
        specifiers: Specifiers::PUBLIC,
        template_parameters: vec![t],
        ..ClassData::default()
    });
    let root = arena.add_compile_unit("list.cm", vec![foo, list]);
    let mut producer = SymbolTable::with_sid_base(1000);
    declare_compile_unit(&mut producer, &arena, root).unwrap();
    let primary = producer.lookup_global("List").unwrap().unwrap();
    let int_id = producer.types().basic(BasicType::Int);
    let instance = producer
        .instantiate_class_template(&arena, primary, vec![int_id], Span::DUMMY)
        .unwrap();
    let instance_cid = producer.class_data(instance).unwrap().cid.unwrap();
    assert_eq!(instance_cid, Cid(2));

    let plain = image_of(&producer, &CompileOptions::default());
    let full = image_of(&producer, &CompileOptions::default().with_full_config(true));
    assert_eq!(plain.last(), Some(&0));
    assert!(full.len() > plain.len());

    let imported_instance_cid = |image: &[u8]| {
        let mut consumer = table_with_class(SymbolTable::new(), "Baz");
        let summary = consumer.import(&mut &image[..]).unwrap();
        assert_eq!(summary.template_instances, 1);
        let imported = consumer.template_instances()[0];
        assert_eq!(consumer.class_key(imported), "List<int>");
        consumer.class_data(imported).unwrap().cid.unwrap()
    };
    assert_ne!(imported_instance_cid(&plain), instance_cid);
    assert_eq!(imported_instance_cid(&full), instance_cid);
}

#[test]
fn test_instance_cid_taken_by_local_class_is_rejected() {
    let mut arena = NodeArena::new();
    let mut producer = SymbolTable::with_sid_base(1000);
    declare_list(&mut producer, &mut arena);
    let primary = producer.lookup_global("List").unwrap().unwrap();
    let int_id = producer.types().basic(BasicType::Int);
    let instance = producer
        .instantiate_class_template(&arena, primary, vec![int_id], Span::DUMMY)
        .unwrap();
    assert_eq!(producer.class_data(instance).unwrap().cid, Some(Cid(1)));
    let full = image_of(&producer, &CompileOptions::default().with_full_config(true));

    // Local A holds cid 1 before the image's `List<int>` = 1 arrives.
    let mut consumer = table_with_class(SymbolTable::new(), "A");
    let a = consumer.lookup_global("A").unwrap().unwrap();
    assert_eq!(cid_of(&consumer, "A"), Cid(1));

    let err = consumer.import(&mut full.as_slice()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Serialization);
    assert_eq!(
        err.message,
        "class id 1 of 'List<int>' is already assigned to 'A'"
    );
    assert_eq!(consumer.class_by_cid(Cid(1)), Some(a));
    assert_eq!(cid_of(&consumer, "A"), Cid(1));
}

/// `public class List<T> {}` declared into `table`; returns its node.
fn declare_list(table: &mut SymbolTable, arena: &mut NodeArena) -> cmc_ast::NodeIndex {
    let t = arena.add_template_parameter("T");
    let list = arena.add_class(ClassData {
        name: "List".to_string(),
        specifiers: Specifiers::PUBLIC,
        template_parameters: vec![t],
        ..ClassData::default()
    });
    let root = arena.add_compile_unit("list.cm", vec![list]);
    declare_compile_unit(table, arena, root).unwrap();
    list
}

/// Import `base` into a fresh table, instantiate `List<int>` there and
/// export the result. The template's declaration stays available through
/// `list_node`.
fn dependent_image(sid_base: u32, base: &[u8], arena: &NodeArena, list_node: cmc_ast::NodeIndex) -> Vec<u8> {
    let mut table = SymbolTable::with_sid_base(sid_base);
    table.import(&mut &base[..]).unwrap();
    let primary = table.lookup_global("List").unwrap().unwrap();
    table.map_symbol_node(primary, list_node);
    let int_id = table.types().basic(BasicType::Int);
    table
        .instantiate_class_template(arena, primary, vec![int_id], Span::DUMMY)
        .unwrap();
    image_of(&table, &CompileOptions::default())
}

#[test]
fn test_duplicate_instance_is_aliased_on_import() {
    let mut arena = NodeArena::new();
    let mut base = SymbolTable::with_sid_base(1000);
    let list_node = declare_list(&mut base, &mut arena);
    let base_image = image_of(&base, &CompileOptions::default());
    let left = dependent_image(2000, &base_image, &arena, list_node);
    let right = dependent_image(3000, &base_image, &arena, list_node);

    let mut consumer = SymbolTable::new();
    consumer.import(&mut base_image.as_slice()).unwrap();
    let first = consumer.import(&mut left.as_slice()).unwrap();
    let second = consumer.import(&mut right.as_slice()).unwrap();
    assert_eq!(first.template_instances, 1);
    assert_eq!(second.template_instances, 0);
    assert_eq!(consumer.template_instances().len(), 1);
}

#[test]
fn test_instantiating_an_imported_instance_reuses_it() {
    let mut arena = NodeArena::new();
    let mut base = SymbolTable::with_sid_base(1000);
    let list_node = declare_list(&mut base, &mut arena);
    let base_image = image_of(&base, &CompileOptions::default());
    let left = dependent_image(2000, &base_image, &arena, list_node);

    let mut consumer = SymbolTable::new();
    consumer.import(&mut base_image.as_slice()).unwrap();
    consumer.import(&mut left.as_slice()).unwrap();
    let primary = consumer.lookup_global("List").unwrap().unwrap();
    consumer.map_symbol_node(primary, list_node);
    let existing = consumer.template_instances()[0];
    let int_id = consumer.types().basic(BasicType::Int);
    let again = consumer
        .instantiate_class_template(&arena, primary, vec![int_id], Span::DUMMY)
        .unwrap();
    assert_eq!(again, existing);
    assert!(consumer.is_imported(again));
}

#[test]
fn test_importing_the_same_image_twice_is_rejected() {
    let producer = table_with_class(SymbolTable::with_sid_base(1000), "Foo");
    let foo = producer.lookup_global("Foo").unwrap().unwrap();
    let image = image_of(&producer, &CompileOptions::default());

    let mut consumer = SymbolTable::new();
    consumer.import(&mut image.as_slice()).unwrap();
    let err = consumer.import(&mut image.as_slice()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Serialization);
    assert_eq!(
        err.message,
        format!("symbol id {} already in use", producer.get(foo).unwrap().sid.0)
    );
}

#[test]
fn test_images_from_default_sid_base_overlap() {
    let first = table_with_class(SymbolTable::new(), "Foo");
    let second = table_with_class(SymbolTable::new(), "Bar");
    let bar = second.lookup_global("Bar").unwrap().unwrap();
    let first_image = image_of(&first, &CompileOptions::default());
    let second_image = image_of(&second, &CompileOptions::default());

    let mut consumer = SymbolTable::with_sid_base(5000);
    consumer.import(&mut first_image.as_slice()).unwrap();
    let err = consumer.import(&mut second_image.as_slice()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Serialization);
    assert_eq!(
        err.message,
        format!("symbol id {} already in use", second.get(bar).unwrap().sid.0)
    );

    let mut disjoint = SymbolTable::with_sid_base(5000);
    let second = table_with_class(SymbolTable::with_sid_base(2000), "Bar");
    disjoint.import(&mut first_image.as_slice()).unwrap();
    disjoint
        .import(&mut image_of(&second, &CompileOptions::default()).as_slice())
        .unwrap();
    assert!(disjoint.lookup_global("Bar").unwrap().is_some());
}

#[test]
fn test_missing_dependency_is_reported() {
    let mut arena = NodeArena::new();
    let mut base = SymbolTable::with_sid_base(1000);
    let list_node = declare_list(&mut base, &mut arena);
    let base_image = image_of(&base, &CompileOptions::default());
    let dependent = dependent_image(2000, &base_image, &arena, list_node);

    let mut consumer = SymbolTable::new();
    let err = consumer.import(&mut dependent.as_slice()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Serialization);
    assert!(err.message.contains("import its dependencies first"), "{}", err.message);
}

#[test]
fn test_malformed_images_are_rejected() {
    let mut table = SymbolTable::new();
    let err = table.import(&mut &b"ELF\x7f\x01\x00\x00\x00"[..]).unwrap_err();
    assert_eq!(err.message, "not a module image");

    let mut wrong_version = b"CMCM".to_vec();
    wrong_version.extend_from_slice(&99u32.to_le_bytes());
    let err = table.import(&mut wrong_version.as_slice()).unwrap_err();
    assert_eq!(err.message, "unsupported module image version 99");

    let truncated = b"CMCM".to_vec();
    let err = table.import(&mut truncated.as_slice()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Serialization);
}

#[test]
fn test_tree_must_start_with_a_namespace() {
    let root = SymbolRecord {
        sid: Sid(7),
        name: "Stray".to_string(),
        access: Access::Public,
        flags: 0,
        kind: KindRecord::Class(ClassRecord {
            flags: 0,
            base_class: None,
            interfaces: Vec::new(),
            special_members: Vec::new(),
            has_user_defined_constructor: false,
            conversions: Vec::new(),
            vtable: Vec::new(),
        }),
        children: Vec::new(),
    };
    let json = serde_json::to_vec(&root).unwrap();
    let mut image = b"CMCM".to_vec();
    image.extend_from_slice(&MODULE_IMAGE_VERSION.to_le_bytes());
    image.extend_from_slice(&(json.len() as u32).to_le_bytes());
    image.extend_from_slice(&json);

    let mut table = SymbolTable::new();
    let err = table.import(&mut image.as_slice()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Serialization);
    assert_eq!(err.message, "namespace expected");
}
