//! The symbol data model.
//!
//! Symbols live in a [`SymbolArena`] and refer to each other by [`SymbolId`].
//! The arena index is only meaningful within one table; the stable identity
//! that survives Export/Import is the [`Sid`].

use crate::class::ClassTypeData;
use crate::function::FunctionSymbolData;
use crate::scope::ScopeId;
use crate::types::TypeId;
use cmc_ast::Specifiers;
use cmc_common::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a symbol in its table's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

impl SymbolId {
    pub const NONE: SymbolId = SymbolId(u32::MAX);

    #[inline]
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }

    #[inline]
    #[must_use]
    pub const fn is_some(self) -> bool {
        !self.is_none()
    }
}

impl Default for SymbolId {
    fn default() -> Self {
        SymbolId::NONE
    }
}

/// Stable symbol id: assigned once, never reused within a compilation and
/// preserved across Export/Import.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Sid(pub u32);

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Class id used for RTTI and vtable addressing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cid(pub u64);

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cid {}", self.0)
    }
}

/// Access level, ordered from least to most accessible.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Access {
    #[default]
    Private,
    Protected,
    Internal,
    Public,
}

impl Access {
    /// Access written in `specifiers`, or `default` when none is.
    #[must_use]
    pub fn from_specifiers(specifiers: Specifiers, default: Access) -> Access {
        if specifiers.contains(Specifiers::PUBLIC) {
            Access::Public
        } else if specifiers.contains(Specifiers::PROTECTED) {
            Access::Protected
        } else if specifiers.contains(Specifiers::INTERNAL) {
            Access::Internal
        } else if specifiers.contains(Specifiers::PRIVATE) {
            Access::Private
        } else {
            default
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Access::Private => "private",
            Access::Protected => "protected",
            Access::Internal => "internal",
            Access::Public => "public",
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags::bitflags! {
    /// Status flags shared by every symbol kind.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct SymbolFlags: u32 {
        const BOUND = 1 << 0;
        const STATIC = 1 << 1;
        const EXTERNAL = 1 << 2;
        const VIRTUAL = 1 << 3;
        const ABSTRACT = 1 << 4;
        const REPLICATED = 1 << 5;
        /// Created by Import rather than by this unit's declaration pass.
        const IMPORTED = 1 << 6;
        const COMPILER_GENERATED = 1 << 7;
    }
}

/// A compile-time constant value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstValue {
    Bool(bool),
    Int(i64),
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Bool(b) => write!(f, "{b}"),
            ConstValue::Int(i) => write!(f, "{i}"),
        }
    }
}

// =============================================================================
// Kind payloads
// =============================================================================

/// Parameters, local variables and return values.
#[derive(Clone, Debug, Default)]
pub struct VariableData {
    pub type_id: TypeId,
}

#[derive(Clone, Debug, Default)]
pub struct MemberVariableData {
    pub type_id: TypeId,
    /// Declaration order among the class's member variables.
    pub layout_index: usize,
}

#[derive(Clone, Debug, Default)]
pub struct InterfaceTypeData {
    pub type_id: TypeId,
}

#[derive(Clone, Debug, Default)]
pub struct EnumTypeData {
    pub type_id: TypeId,
    pub underlying_type: TypeId,
}

/// Constants and enum constants.
#[derive(Clone, Debug, Default)]
pub struct ConstantData {
    pub type_id: TypeId,
    /// Filled in by the constant evaluator or by Import.
    pub value: Option<ConstValue>,
}

#[derive(Clone, Debug, Default)]
pub struct TypedefData {
    /// `TypeId::NONE` until first resolved.
    pub type_id: TypeId,
}

/// Delegates and class delegates.
#[derive(Clone, Debug, Default)]
pub struct DelegateData {
    pub type_id: TypeId,
    pub return_type: Option<TypeId>,
    pub parameter_types: Vec<TypeId>,
}

#[derive(Clone, Debug, Default)]
pub struct ConceptData {
    pub type_parameters: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct TemplateParameterData {
    pub type_id: TypeId,
}

/// Overload group: every function of one container sharing a group name.
#[derive(Clone, Debug, Default)]
pub struct FunctionGroupData {
    pub functions: Vec<SymbolId>,
}

/// Closed set of symbol kinds.
#[derive(Clone, Debug)]
pub enum SymbolKind {
    Namespace,
    Class(Box<ClassTypeData>),
    Interface(InterfaceTypeData),
    Enum(EnumTypeData),
    EnumConstant(ConstantData),
    Constant(ConstantData),
    Typedef(TypedefData),
    Delegate(DelegateData),
    ClassDelegate(DelegateData),
    Concept(ConceptData),
    TemplateParameter(TemplateParameterData),
    FunctionGroup(FunctionGroupData),
    Function(Box<FunctionSymbolData>),
    Parameter(VariableData),
    LocalVariable(VariableData),
    MemberVariable(MemberVariableData),
    ReturnValue(VariableData),
    DeclarationBlock,
}

impl SymbolKind {
    /// Kinds that own a `ContainerScope`.
    #[must_use]
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            SymbolKind::Namespace
                | SymbolKind::Class(_)
                | SymbolKind::Interface(_)
                | SymbolKind::Enum(_)
                | SymbolKind::Delegate(_)
                | SymbolKind::ClassDelegate(_)
                | SymbolKind::Concept(_)
                | SymbolKind::Function(_)
                | SymbolKind::DeclarationBlock
        )
    }

    /// Kinds that name a type.
    #[must_use]
    pub fn type_id(&self) -> Option<TypeId> {
        match self {
            SymbolKind::Class(data) => Some(data.type_id),
            SymbolKind::Interface(data) => Some(data.type_id),
            SymbolKind::Enum(data) => Some(data.type_id),
            SymbolKind::Delegate(data) | SymbolKind::ClassDelegate(data) => Some(data.type_id),
            SymbolKind::TemplateParameter(data) => Some(data.type_id),
            _ => None,
        }
    }

    /// Declared type of a value symbol.
    #[must_use]
    pub fn value_type(&self) -> Option<TypeId> {
        match self {
            SymbolKind::Parameter(data)
            | SymbolKind::LocalVariable(data)
            | SymbolKind::ReturnValue(data) => Some(data.type_id),
            SymbolKind::MemberVariable(data) => Some(data.type_id),
            SymbolKind::Constant(data) | SymbolKind::EnumConstant(data) => Some(data.type_id),
            _ => None,
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            SymbolKind::Namespace => "namespace",
            SymbolKind::Class(_) => "class",
            SymbolKind::Interface(_) => "interface",
            SymbolKind::Enum(_) => "enumerated type",
            SymbolKind::EnumConstant(_) => "enumeration constant",
            SymbolKind::Constant(_) => "constant",
            SymbolKind::Typedef(_) => "typedef",
            SymbolKind::Delegate(_) => "delegate",
            SymbolKind::ClassDelegate(_) => "class delegate",
            SymbolKind::Concept(_) => "concept",
            SymbolKind::TemplateParameter(_) => "template parameter",
            SymbolKind::FunctionGroup(_) => "function group",
            SymbolKind::Function(_) => "function",
            SymbolKind::Parameter(_) => "parameter",
            SymbolKind::LocalVariable(_) => "local variable",
            SymbolKind::MemberVariable(_) => "member variable",
            SymbolKind::ReturnValue(_) => "return value",
            SymbolKind::DeclarationBlock => "declaration block",
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Symbol
// =============================================================================

#[derive(Clone, Debug)]
pub struct Symbol {
    pub id: SymbolId,
    pub sid: Sid,
    pub name: String,
    pub span: Span,
    /// Non-owning link to the enclosing container.
    pub parent: SymbolId,
    pub access: Access,
    pub flags: SymbolFlags,
    pub kind: SymbolKind,
    /// `ScopeId::NONE` unless `kind.is_container()`.
    pub scope: ScopeId,
    /// Owned children in declaration order.
    pub children: Vec<SymbolId>,
}

impl Symbol {
    #[inline]
    #[must_use]
    pub fn has_flag(&self, flag: SymbolFlags) -> bool {
        self.flags.contains(flag)
    }

    #[inline]
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags.contains(SymbolFlags::STATIC)
    }

    #[inline]
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.flags.contains(SymbolFlags::BOUND)
    }

    #[inline]
    #[must_use]
    pub fn is_function(&self) -> bool {
        matches!(self.kind, SymbolKind::Function(_))
    }

    #[inline]
    #[must_use]
    pub fn is_class(&self) -> bool {
        matches!(self.kind, SymbolKind::Class(_))
    }

    #[inline]
    #[must_use]
    pub fn is_namespace(&self) -> bool {
        matches!(self.kind, SymbolKind::Namespace)
    }

    pub fn class_data(&self) -> Option<&ClassTypeData> {
        match &self.kind {
            SymbolKind::Class(data) => Some(data),
            _ => None,
        }
    }

    pub fn class_data_mut(&mut self) -> Option<&mut ClassTypeData> {
        match &mut self.kind {
            SymbolKind::Class(data) => Some(data),
            _ => None,
        }
    }

    pub fn function_data(&self) -> Option<&FunctionSymbolData> {
        match &self.kind {
            SymbolKind::Function(data) => Some(data),
            _ => None,
        }
    }

    pub fn function_data_mut(&mut self) -> Option<&mut FunctionSymbolData> {
        match &mut self.kind {
            SymbolKind::Function(data) => Some(data),
            _ => None,
        }
    }
}

/// Arena that owns every symbol of one table.
#[derive(Clone, Debug, Default)]
pub struct SymbolArena {
    symbols: Vec<Symbol>,
}

impl SymbolArena {
    pub fn new() -> SymbolArena {
        SymbolArena::default()
    }

    /// Allocate a symbol; `id`, `parent`, `scope` and `children` are set up
    /// by the caller through the returned id.
    pub fn alloc(&mut self, sid: Sid, name: String, span: Span, kind: SymbolKind) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(Symbol {
            id,
            sid,
            name,
            span,
            parent: SymbolId::NONE,
            access: Access::Private,
            flags: SymbolFlags::empty(),
            kind,
            scope: ScopeId::NONE,
            children: Vec::new(),
        });
        id
    }

    #[inline]
    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        if id.is_none() {
            None
        } else {
            self.symbols.get(id.0 as usize)
        }
    }

    #[inline]
    pub fn get_mut(&mut self, id: SymbolId) -> Option<&mut Symbol> {
        if id.is_none() {
            None
        } else {
            self.symbols.get_mut(id.0 as usize)
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }
}
