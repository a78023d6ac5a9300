//! Type interning.
//!
//! Every type is identified by a `TypeId`; structurally equal types share one
//! id. Class, interface, enum, delegate and template-parameter types wrap
//! their symbol, and template instances are ordinary class symbols whose
//! instantiation key is interned separately.

use crate::symbol::SymbolId;
use cmc_ast::{Derivations, RefKind};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

impl TypeId {
    pub const NONE: TypeId = TypeId(u32::MAX);

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

impl Default for TypeId {
    fn default() -> Self {
        TypeId::NONE
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BasicType {
    Void,
    Bool,
    SByte,
    Byte,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    Float,
    Double,
    Char,
    WChar,
    UChar,
}

impl BasicType {
    pub const ALL: [BasicType; 15] = [
        BasicType::Void,
        BasicType::Bool,
        BasicType::SByte,
        BasicType::Byte,
        BasicType::Short,
        BasicType::UShort,
        BasicType::Int,
        BasicType::UInt,
        BasicType::Long,
        BasicType::ULong,
        BasicType::Float,
        BasicType::Double,
        BasicType::Char,
        BasicType::WChar,
        BasicType::UChar,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            BasicType::Void => "void",
            BasicType::Bool => "bool",
            BasicType::SByte => "sbyte",
            BasicType::Byte => "byte",
            BasicType::Short => "short",
            BasicType::UShort => "ushort",
            BasicType::Int => "int",
            BasicType::UInt => "uint",
            BasicType::Long => "long",
            BasicType::ULong => "ulong",
            BasicType::Float => "float",
            BasicType::Double => "double",
            BasicType::Char => "char",
            BasicType::WChar => "wchar",
            BasicType::UChar => "uchar",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<BasicType> {
        BasicType::ALL.iter().copied().find(|b| b.name() == name)
    }

    #[must_use]
    pub const fn is_integral(self) -> bool {
        matches!(
            self,
            BasicType::SByte
                | BasicType::Byte
                | BasicType::Short
                | BasicType::UShort
                | BasicType::Int
                | BasicType::UInt
                | BasicType::Long
                | BasicType::ULong
        )
    }
}

impl fmt::Display for BasicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Basic(BasicType),
    /// Class, interface, enum, delegate or template parameter.
    Symbol(SymbolId),
    /// `base` is never itself a derived type.
    Derived {
        base: TypeId,
        derivations: Derivations,
    },
}

#[derive(Clone, Debug)]
pub struct TypeRepository {
    types: Vec<TypeKind>,
    interned: FxHashMap<TypeKind, TypeId>,
    template_instances: FxHashMap<(SymbolId, Vec<TypeId>), SymbolId>,
    exported_template_types: Vec<SymbolId>,
    exported_derived_types: Vec<TypeId>,
}

impl Default for TypeRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRepository {
    pub fn new() -> TypeRepository {
        let mut repo = TypeRepository {
            types: Vec::new(),
            interned: FxHashMap::default(),
            template_instances: FxHashMap::default(),
            exported_template_types: Vec::new(),
            exported_derived_types: Vec::new(),
        };
        for basic in BasicType::ALL {
            repo.intern(TypeKind::Basic(basic));
        }
        repo
    }

    fn intern(&mut self, kind: TypeKind) -> TypeId {
        if let Some(&id) = self.interned.get(&kind) {
            return id;
        }
        let id = TypeId(self.types.len() as u32);
        self.types.push(kind.clone());
        self.interned.insert(kind, id);
        id
    }

    #[inline]
    pub fn get(&self, id: TypeId) -> Option<&TypeKind> {
        if id.is_none() {
            None
        } else {
            self.types.get(id.0 as usize)
        }
    }

    /// Basic types are interned first, in `BasicType::ALL` order.
    #[inline]
    #[must_use]
    pub fn basic(&self, basic: BasicType) -> TypeId {
        TypeId(basic as u32)
    }

    #[inline]
    #[must_use]
    pub fn void_type(&self) -> TypeId {
        self.basic(BasicType::Void)
    }

    #[inline]
    #[must_use]
    pub fn is_void(&self, id: TypeId) -> bool {
        id == self.void_type()
    }

    pub fn symbol_type(&mut self, symbol: SymbolId) -> TypeId {
        self.intern(TypeKind::Symbol(symbol))
    }

    /// Apply `derivations` on top of `base`, folding nested derivations so
    /// that the base of a derived type is always a plain type.
    pub fn make_derived(&mut self, base: TypeId, derivations: Derivations) -> TypeId {
        if derivations.is_empty() {
            return base;
        }
        let (plain, existing) = match self.get(base) {
            Some(TypeKind::Derived { base, derivations }) => (*base, *derivations),
            _ => (base, Derivations::NONE),
        };
        let combined = Derivations {
            is_const: existing.is_const || derivations.is_const,
            pointers: existing.pointers.saturating_add(derivations.pointers),
            reference: if derivations.reference == RefKind::None {
                existing.reference
            } else {
                derivations.reference
            },
        };
        self.intern(TypeKind::Derived {
            base: plain,
            derivations: combined,
        })
    }

    /// Strip all derivations.
    #[must_use]
    pub fn base_type(&self, id: TypeId) -> TypeId {
        match self.get(id) {
            Some(TypeKind::Derived { base, .. }) => *base,
            _ => id,
        }
    }

    #[must_use]
    pub fn derivations(&self, id: TypeId) -> Derivations {
        match self.get(id) {
            Some(TypeKind::Derived { derivations, .. }) => *derivations,
            _ => Derivations::NONE,
        }
    }

    /// The symbol behind a (possibly derived) type.
    #[must_use]
    pub fn type_symbol(&self, id: TypeId) -> Option<SymbolId> {
        match self.get(self.base_type(id)) {
            Some(TypeKind::Symbol(symbol)) => Some(*symbol),
            _ => None,
        }
    }

    #[must_use]
    pub fn basic_kind(&self, id: TypeId) -> Option<BasicType> {
        match self.get(id) {
            Some(TypeKind::Basic(basic)) => Some(*basic),
            _ => None,
        }
    }

    // =========================================================================
    // Template instances
    // =========================================================================

    pub fn lookup_template_instance(&self, primary: SymbolId, arguments: &[TypeId]) -> Option<SymbolId> {
        self.template_instances
            .get(&(primary, arguments.to_vec()))
            .copied()
    }

    pub fn add_template_instance(&mut self, primary: SymbolId, arguments: Vec<TypeId>, instance: SymbolId) {
        self.template_instances.insert((primary, arguments), instance);
    }

    pub fn record_exported_template_type(&mut self, instance: SymbolId) {
        if !self.exported_template_types.contains(&instance) {
            self.exported_template_types.push(instance);
        }
    }

    pub fn record_exported_derived_type(&mut self, derived: TypeId) {
        if !self.exported_derived_types.contains(&derived) {
            self.exported_derived_types.push(derived);
        }
    }

    pub fn exported_template_types(&self) -> &[SymbolId] {
        &self.exported_template_types
    }

    pub fn exported_derived_types(&self) -> &[TypeId] {
        &self.exported_derived_types
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
