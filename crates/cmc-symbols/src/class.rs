//! Class type data and special-member accumulators.

use crate::symbol::{Cid, SymbolId};
use crate::types::TypeId;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ClassFlags: u32 {
        /// Unspecialized class template.
        const TEMPLATE = 1 << 0;
        /// Instantiation of a class template.
        const TEMPLATE_INSTANCE = 1 << 1;
        const BASES_RESOLVED = 1 << 2;
        const VTABLE_INITIALIZED = 1 << 3;
        /// Every member function bound and implicit members planned.
        const COMPLETED = 1 << 4;
    }
}

/// Special member kinds tracked per class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecialMemberKind {
    DefaultConstructor,
    CopyConstructor,
    MoveConstructor,
    StaticConstructor,
    CopyAssignment,
    MoveAssignment,
    OpEqual,
    Destructor,
}

impl SpecialMemberKind {
    pub const COUNT: usize = 8;

    pub const ALL: [SpecialMemberKind; SpecialMemberKind::COUNT] = [
        SpecialMemberKind::DefaultConstructor,
        SpecialMemberKind::CopyConstructor,
        SpecialMemberKind::MoveConstructor,
        SpecialMemberKind::StaticConstructor,
        SpecialMemberKind::CopyAssignment,
        SpecialMemberKind::MoveAssignment,
        SpecialMemberKind::OpEqual,
        SpecialMemberKind::Destructor,
    ];

    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            SpecialMemberKind::DefaultConstructor => "default constructor",
            SpecialMemberKind::CopyConstructor => "copy constructor",
            SpecialMemberKind::MoveConstructor => "move constructor",
            SpecialMemberKind::StaticConstructor => "static constructor",
            SpecialMemberKind::CopyAssignment => "copy assignment",
            SpecialMemberKind::MoveAssignment => "move assignment",
            SpecialMemberKind::OpEqual => "operator==",
            SpecialMemberKind::Destructor => "destructor",
        }
    }
}

impl fmt::Display for SpecialMemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a special member comes from. Exactly one state per kind, so
/// user-defined, suppressed and generated are exclusive by construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecialMemberState {
    #[default]
    Absent,
    UserDefined,
    Suppressed,
    /// Declared `= default`; the body is synthesized.
    Generate,
}

#[derive(Clone, Debug, Default)]
pub struct SpecialMembers {
    states: [SpecialMemberState; SpecialMemberKind::COUNT],
    functions: [SymbolId; SpecialMemberKind::COUNT],
    /// Any user-written constructor, converting constructors included.
    pub has_user_defined_constructor: bool,
}

impl SpecialMembers {
    #[inline]
    #[must_use]
    pub fn state(&self, kind: SpecialMemberKind) -> SpecialMemberState {
        self.states[kind.index()]
    }

    #[inline]
    #[must_use]
    pub fn function(&self, kind: SpecialMemberKind) -> SymbolId {
        self.functions[kind.index()]
    }

    #[must_use]
    pub fn has_user_defined(&self, kind: SpecialMemberKind) -> bool {
        self.state(kind) == SpecialMemberState::UserDefined
    }

    #[must_use]
    pub fn has_suppressed(&self, kind: SpecialMemberKind) -> bool {
        self.state(kind) == SpecialMemberState::Suppressed
    }

    #[must_use]
    pub fn generate(&self, kind: SpecialMemberKind) -> bool {
        self.state(kind) == SpecialMemberState::Generate
    }

    /// Declared by the user in any form (written, suppressed or defaulted).
    #[must_use]
    pub fn is_declared(&self, kind: SpecialMemberKind) -> bool {
        self.state(kind) != SpecialMemberState::Absent
    }

    /// Record the state of `kind`. Fails with the previously recorded
    /// function when the kind was already classified.
    pub fn set(
        &mut self,
        kind: SpecialMemberKind,
        state: SpecialMemberState,
        function: SymbolId,
    ) -> Result<(), SymbolId> {
        let slot = kind.index();
        if self.states[slot] != SpecialMemberState::Absent {
            return Err(self.functions[slot]);
        }
        self.states[slot] = state;
        self.functions[slot] = function;
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct ClassTypeData {
    pub cid: Option<Cid>,
    pub type_id: TypeId,
    pub flags: ClassFlags,
    pub base_class: SymbolId,
    pub interfaces: Vec<SymbolId>,
    pub template_parameters: Vec<SymbolId>,
    pub template_arguments: Vec<TypeId>,
    /// For instances: the class template they were instantiated from.
    pub primary_template: SymbolId,
    pub special_members: SpecialMembers,
    /// Converting constructors and conversion functions.
    pub conversions: SmallVec<[SymbolId; 2]>,
    pub vtable: Vec<SymbolId>,
    pub member_variables: Vec<SymbolId>,
}

impl ClassTypeData {
    #[inline]
    #[must_use]
    pub fn is_template(&self) -> bool {
        self.flags.contains(ClassFlags::TEMPLATE)
    }

    #[inline]
    #[must_use]
    pub fn is_template_instance(&self) -> bool {
        self.flags.contains(ClassFlags::TEMPLATE_INSTANCE)
    }
}
