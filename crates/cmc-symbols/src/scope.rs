//! Container scopes.
//!
//! Every container symbol owns one `ContainerScope`: an insertion-ordered
//! map from local name to symbol plus links to the lexically enclosing scope
//! and, for classes, the base class scope. Lookup policies that walk those
//! links live on `SymbolTable` because they need the symbol arena.

use crate::symbol::SymbolId;
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

impl ScopeId {
    pub const NONE: ScopeId = ScopeId(u32::MAX);

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

impl Default for ScopeId {
    fn default() -> Self {
        ScopeId::NONE
    }
}

bitflags::bitflags! {
    /// Which scopes a lookup may consult, in addition to the starting one.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ScopeLookup: u8 {
        const THIS = 1 << 0;
        const BASE = 1 << 1;
        const PARENT = 1 << 2;
        /// The compile unit's `using` namespaces.
        const FILE = 1 << 3;

        const THIS_AND_BASE = Self::THIS.bits() | Self::BASE.bits();
        const THIS_AND_PARENT = Self::THIS.bits() | Self::PARENT.bits();
        const THIS_AND_BASE_AND_PARENT =
            Self::THIS.bits() | Self::BASE.bits() | Self::PARENT.bits();
        const ALL = Self::THIS_AND_BASE_AND_PARENT.bits() | Self::FILE.bits();
    }
}

#[derive(Clone, Debug)]
pub struct ContainerScope {
    pub owner: SymbolId,
    pub parent: ScopeId,
    /// Scope of the base class, once bases are resolved.
    pub base: ScopeId,
    members: IndexMap<String, SymbolId, FxBuildHasher>,
}

impl ContainerScope {
    pub fn new(owner: SymbolId) -> ContainerScope {
        ContainerScope {
            owner,
            parent: ScopeId::NONE,
            base: ScopeId::NONE,
            members: IndexMap::default(),
        }
    }

    #[inline]
    pub fn lookup_local(&self, name: &str) -> Option<SymbolId> {
        self.members.get(name).copied()
    }

    /// Install `symbol` under `name`. Fails with the symbol already installed
    /// under that name.
    pub fn install(&mut self, name: &str, symbol: SymbolId) -> Result<(), SymbolId> {
        if let Some(&existing) = self.members.get(name) {
            return Err(existing);
        }
        self.members.insert(name.to_string(), symbol);
        Ok(())
    }

    /// Members in insertion order.
    pub fn members(&self) -> impl Iterator<Item = (&str, SymbolId)> {
        self.members.iter().map(|(name, &id)| (name.as_str(), id))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
