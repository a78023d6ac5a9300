//! Function symbol data.

use crate::symbol::SymbolId;
use crate::types::TypeId;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

bitflags::bitflags! {
    /// Function-specific flags. `static`, `external` and `replicated` live in
    /// the shared `SymbolFlags`.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct FunctionFlags: u32 {
        const CDECL = 1 << 0;
        const VIRTUAL = 1 << 1;
        const ABSTRACT = 1 << 2;
        const OVERRIDE = 1 << 3;
        const NOTHROW = 1 << 4;
        const INLINE = 1 << 5;
        const SUPPRESSED = 1 << 6;
        const DEFAULT = 1 << 7;
        const EXPLICIT = 1 << 8;
        const NEW = 1 << 9;
        const CONVERSION = 1 << 10;
        const CONSTEXPR = 1 << 11;
        const CONVERTING_CONSTRUCTOR = 1 << 12;
        const MEMBER_OF_CLASS_TEMPLATE = 1 << 13;
        const MEMBER_OF_TEMPLATE_TYPE = 1 << 14;
        const TEMPLATE_SPECIALIZATION = 1 << 15;
        const HAS_BODY = 1 << 16;

        const VIRTUAL_MASK = Self::VIRTUAL.bits() | Self::ABSTRACT.bits() | Self::OVERRIDE.bits();
    }
}

/// Shape of a function, fixed by the declaration pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FunctionKind {
    Free,
    Member,
    Constructor,
    StaticConstructor,
    Destructor,
    ConversionFunction,
}

impl FunctionKind {
    #[inline]
    #[must_use]
    pub const fn is_member(self) -> bool {
        !matches!(self, FunctionKind::Free)
    }

    /// Instance or static constructor.
    #[inline]
    #[must_use]
    pub const fn is_any_constructor(self) -> bool {
        matches!(self, FunctionKind::Constructor | FunctionKind::StaticConstructor)
    }
}

/// Well-known group names.
pub mod group_names {
    pub const CONSTRUCTOR: &str = "@constructor";
    pub const STATIC_CONSTRUCTOR: &str = "@static_constructor";
    pub const DESTRUCTOR: &str = "@destructor";
    pub const CONVERSION: &str = "@operator_conv";
    pub const ASSIGNMENT: &str = "operator=";
    pub const EQUAL: &str = "operator==";
}

#[derive(Clone, Debug)]
pub struct FunctionSymbolData {
    /// Overload-group key.
    pub group_name: String,
    pub kind: FunctionKind,
    pub flags: FunctionFlags,
    /// `this` first for non-static members.
    pub parameters: Vec<SymbolId>,
    /// `None` is void.
    pub return_type: Option<TypeId>,
    pub return_value: SymbolId,
    /// -1 when not virtual.
    pub vtbl_index: i32,
    pub overridden: SymbolId,
    /// Every function that overrides this one, transitively.
    pub override_set: SmallVec<[SymbolId; 2]>,
    pub function_template: SymbolId,
    pub template_parameters: Vec<SymbolId>,
    /// Overload-resolution name computed by the declaration binder.
    pub overload_name: String,
    pub constraint: Option<String>,
}

impl FunctionSymbolData {
    pub fn new(group_name: impl Into<String>, kind: FunctionKind) -> Self {
        FunctionSymbolData {
            group_name: group_name.into(),
            kind,
            flags: FunctionFlags::empty(),
            parameters: Vec::new(),
            return_type: None,
            return_value: SymbolId::NONE,
            vtbl_index: -1,
            overridden: SymbolId::NONE,
            override_set: SmallVec::new(),
            function_template: SymbolId::NONE,
            template_parameters: Vec::new(),
            overload_name: String::new(),
            constraint: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn has(&self, flag: FunctionFlags) -> bool {
        self.flags.contains(flag)
    }

    #[inline]
    #[must_use]
    pub fn is_void(&self) -> bool {
        self.return_type.is_none()
    }

    #[inline]
    #[must_use]
    pub fn is_virtual_abstract_or_override(&self) -> bool {
        self.flags.intersects(FunctionFlags::VIRTUAL_MASK)
    }

    #[inline]
    #[must_use]
    pub fn is_function_template(&self) -> bool {
        !self.template_parameters.is_empty()
    }
}
