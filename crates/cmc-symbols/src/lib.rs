//! Symbol table for the cmc binder.
//!
//! - **Symbols**: a closed set of kinds in a `SymbolArena`, linked by
//!   `SymbolId`; stable identity across units is the `Sid`
//! - **Scopes**: one `ContainerScope` per container symbol, searched by
//!   `ScopeLookup` policies
//! - **Types**: `TypeRepository` interns basic, symbol, derived and
//!   template-instance types; `TypeResolver` maps AST type expressions
//! - **Passes**: the declaration pass creates skeleton symbols; module
//!   images carry them to dependent units

pub mod class;
pub mod class_ids;
pub mod declaration_pass;
pub mod function;
pub mod module_image;
pub mod scope;
pub mod symbol;
pub mod symbol_table;
pub mod type_resolver;
pub mod types;

// SymbolTable impl blocks
mod table_lookup;
mod table_members;
mod table_scopes;
mod templates;
mod vtable;

pub use class::{ClassFlags, ClassTypeData, SpecialMemberKind, SpecialMemberState, SpecialMembers};
pub use class_ids::ClassIdMap;
pub use declaration_pass::declare_compile_unit;
pub use function::{FunctionFlags, FunctionKind, FunctionSymbolData, group_names};
pub use module_image::{ImportSummary, MODULE_IMAGE_VERSION};
pub use scope::{ContainerScope, ScopeId, ScopeLookup};
pub use symbol::{
    Access, Cid, ConstValue, Sid, Symbol, SymbolArena, SymbolFlags, SymbolId, SymbolKind,
};
pub use symbol_table::SymbolTable;
pub use type_resolver::TypeResolver;
pub use types::{BasicType, TypeId, TypeKind, TypeRepository};

#[cfg(test)]
#[path = "../tests/symbol_table_tests.rs"]
mod symbol_table_tests;

#[cfg(test)]
#[path = "../tests/lookup_tests.rs"]
mod lookup_tests;

#[cfg(test)]
#[path = "../tests/template_tests.rs"]
mod template_tests;

#[cfg(test)]
#[path = "../tests/module_image_tests.rs"]
mod module_image_tests;
