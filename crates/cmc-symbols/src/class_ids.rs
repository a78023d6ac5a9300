//! Persisted class-id map.
//!
//! Separately compiled units must agree on the cid of every class they
//! share. The map records `full name → cid` as a JSON document next to the
//! compiled module; a unit that loads it reuses those cids instead of
//! allocating fresh ones.

use crate::symbol::Cid;
use cmc_common::{CompileError, CompileResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassIdMap {
    #[serde(default)]
    classes: BTreeMap<String, Cid>,
}

impl ClassIdMap {
    pub fn new() -> ClassIdMap {
        ClassIdMap::default()
    }

    pub fn get(&self, full_name: &str) -> Option<Cid> {
        self.classes.get(full_name).copied()
    }

    pub fn insert(&mut self, full_name: String, cid: Cid) {
        self.classes.insert(full_name, cid);
    }

    pub fn contains_cid(&self, cid: Cid) -> bool {
        self.classes.values().any(|&c| c == cid)
    }

    pub fn max_cid(&self) -> Option<Cid> {
        self.classes.values().copied().max()
    }

    /// Add every entry of `other` not already present.
    pub fn merge(&mut self, other: &ClassIdMap) {
        for (name, &cid) in &other.classes {
            self.classes.entry(name.clone()).or_insert(cid);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Cid)> {
        self.classes.iter().map(|(name, &cid)| (name.as_str(), cid))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn from_json_str(text: &str) -> CompileResult<ClassIdMap> {
        serde_json::from_str(text)
            .map_err(|e| CompileError::serialization(format!("invalid class id map: {e}")))
    }

    pub fn to_json_string(&self) -> CompileResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CompileError::serialization(format!("cannot write class id map: {e}")))
    }

    pub fn load(path: &Path) -> CompileResult<ClassIdMap> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CompileError::serialization(format!(
                "cannot read class id map '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_json_str(&text)
    }

    pub fn save(&self, path: &Path) -> CompileResult<()> {
        let text = self.to_json_string()?;
        std::fs::write(path, text).map_err(|e| {
            CompileError::serialization(format!(
                "cannot write class id map '{}': {e}",
                path.display()
            ))
        })
    }
}
