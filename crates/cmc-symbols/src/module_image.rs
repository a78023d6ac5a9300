//! Module images: Export and Import of a compiled unit's symbols.
//!
//! Sections, in order (integers little-endian):
//!
//! 1. magic `CMCM` and a `u32` format version
//! 2. the namespace tree: `u32` length + JSON [`SymbolRecord`]
//! 3. exported template instances: `u32` count, then per instance `u32`
//!    length + JSON [`InstanceRecord`]
//! 4. exported derived types: `u32` count, then per type `u32` length +
//!    JSON [`TypeRecord`]
//! 5. a `u8` flag; under the full build configuration it is 1 and is
//!    followed by the template instance cid table: `u32` count, then per
//!    entry `u32` name length, name bytes, `u64` cid
//!
//! Symbols are referenced by sid, which Import preserves. Cids are not
//! stored in the tree: Import assigns them through the persisted
//! name → cid map, so the same class gets the same cid in every unit that
//! loads the map.

use crate::class::{ClassFlags, ClassTypeData, SpecialMemberKind, SpecialMemberState};
use crate::class_ids::ClassIdMap;
use crate::function::{FunctionFlags, FunctionKind, FunctionSymbolData};
use crate::symbol::{
    Access, Cid, ConceptData, ConstValue, ConstantData, DelegateData, EnumTypeData, InterfaceTypeData,
    MemberVariableData, Sid, SymbolFlags, SymbolId, SymbolKind, TemplateParameterData,
    TypedefData, VariableData,
};
use crate::scope::ScopeId;
use crate::symbol_table::SymbolTable;
use crate::types::{BasicType, TypeId, TypeKind};
use cmc_ast::Derivations;
use cmc_common::{CompileError, CompileOptions, CompileResult, Span, limits};
use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use tracing::{debug, instrument};

const MAGIC: [u8; 4] = *b"CMCM";
pub const MODULE_IMAGE_VERSION: u32 = 1;
/// Upper bound for one length-prefixed record.
const MAX_RECORD_BYTES: u32 = 64 * 1024 * 1024;

// =============================================================================
// Records
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TypeRecord {
    Basic(BasicType),
    Symbol(Sid),
    Derived {
        base: Box<TypeRecord>,
        derivations: Derivations,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolRecord {
    pub sid: Sid,
    pub name: String,
    pub access: Access,
    pub flags: u32,
    pub kind: KindRecord,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SymbolRecord>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum KindRecord {
    Namespace,
    Class(ClassRecord),
    Interface,
    Enum {
        underlying_type: TypeRecord,
    },
    EnumConstant {
        value: Option<ConstValue>,
    },
    Constant {
        type_id: Option<TypeRecord>,
        value: Option<ConstValue>,
    },
    Typedef {
        type_id: Option<TypeRecord>,
    },
    Delegate(DelegateRecord),
    ClassDelegate(DelegateRecord),
    Concept {
        type_parameters: Vec<String>,
    },
    TemplateParameter,
    Function(FunctionRecord),
    Parameter {
        type_id: Option<TypeRecord>,
    },
    MemberVariable {
        type_id: Option<TypeRecord>,
        layout_index: usize,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassRecord {
    pub flags: u32,
    pub base_class: Option<Sid>,
    pub interfaces: Vec<Sid>,
    pub special_members: Vec<SpecialMemberRecord>,
    pub has_user_defined_constructor: bool,
    pub conversions: Vec<Sid>,
    pub vtable: Vec<Sid>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialMemberRecord {
    pub kind: SpecialMemberKind,
    pub state: SpecialMemberState,
    pub function: Option<Sid>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegateRecord {
    pub return_type: Option<TypeRecord>,
    pub parameter_types: Vec<TypeRecord>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionRecord {
    pub group_name: String,
    pub function_kind: FunctionKind,
    pub flags: u32,
    pub return_type: Option<TypeRecord>,
    pub vtbl_index: i32,
    pub overridden: Option<Sid>,
    pub overload_name: String,
    pub constraint: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceRecord {
    pub primary: Sid,
    pub arguments: Vec<TypeRecord>,
    pub class: SymbolRecord,
}

/// What an Import added to the table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub symbols: usize,
    pub template_instances: usize,
    pub derived_types: usize,
}

// =============================================================================
// Framing
// =============================================================================

fn io_error(error: std::io::Error) -> CompileError {
    CompileError::serialization(format!("module image I/O failed: {error}"))
}

fn write_u32<W: Write>(writer: &mut W, value: u32) -> CompileResult<()> {
    writer.write_all(&value.to_le_bytes()).map_err(io_error)
}

fn read_u32<R: Read>(reader: &mut R) -> CompileResult<u32> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes).map_err(io_error)?;
    Ok(u32::from_le_bytes(bytes))
}

fn write_len<W: Write>(writer: &mut W, len: usize) -> CompileResult<()> {
    let len = u32::try_from(len)
        .map_err(|_| CompileError::serialization("module image section too large"))?;
    write_u32(writer, len)
}

fn write_json<W: Write, T: Serialize>(writer: &mut W, value: &T) -> CompileResult<()> {
    let bytes = serde_json::to_vec(value)
        .map_err(|e| CompileError::serialization(format!("cannot encode module record: {e}")))?;
    write_len(writer, bytes.len())?;
    writer.write_all(&bytes).map_err(io_error)
}

fn read_bytes<R: Read>(reader: &mut R) -> CompileResult<Vec<u8>> {
    let len = read_u32(reader)?;
    if len > MAX_RECORD_BYTES {
        return Err(CompileError::serialization(format!(
            "module record of {len} bytes exceeds the {MAX_RECORD_BYTES} byte limit"
        )));
    }
    let mut bytes = vec![0u8; len as usize];
    reader.read_exact(&mut bytes).map_err(io_error)?;
    Ok(bytes)
}

fn read_json<R: Read, T: DeserializeOwned>(reader: &mut R) -> CompileResult<T> {
    let bytes = read_bytes(reader)?;
    serde_json::from_slice(&bytes)
        .map_err(|e| CompileError::serialization(format!("malformed module record: {e}")))
}

// =============================================================================
// Export
// =============================================================================

impl SymbolTable {
    /// Write the namespace tree, the template instances and derived types
    /// created by this table, and (under `full_config`) the instance cid
    /// table. Imported symbols are not re-exported.
    #[instrument(level = "debug", skip_all)]
    pub fn export<W: Write>(&self, writer: &mut W, options: &CompileOptions) -> CompileResult<()> {
        writer.write_all(&MAGIC).map_err(io_error)?;
        write_u32(writer, MODULE_IMAGE_VERSION)?;

        let tree = self
            .export_symbol(self.global_namespace)?
            .ok_or_else(|| CompileError::internal("global namespace not exportable"))?;
        write_json(writer, &tree)?;

        let instances: Vec<SymbolId> = self
            .types
            .exported_template_types()
            .iter()
            .copied()
            .filter(|&i| !self.is_imported(i))
            .collect();
        write_len(writer, instances.len())?;
        for &instance in &instances {
            let record = self.export_instance(instance)?;
            write_json(writer, &record)?;
        }

        let derived = self.types.exported_derived_types();
        write_len(writer, derived.len())?;
        for &type_id in derived {
            write_json(writer, &self.type_record(type_id)?)?;
        }

        if options.full_config {
            writer.write_all(&[1]).map_err(io_error)?;
            write_len(writer, instances.len())?;
            for &instance in &instances {
                let key = self.class_key(instance);
                let cid = self.class_data(instance)?.cid.ok_or_else(|| {
                    CompileError::internal(format!("template instance '{key}' has no class id"))
                })?;
                write_len(writer, key.len())?;
                writer.write_all(key.as_bytes()).map_err(io_error)?;
                writer.write_all(&cid.0.to_le_bytes()).map_err(io_error)?;
            }
        } else {
            writer.write_all(&[0]).map_err(io_error)?;
        }
        debug!(instances = instances.len(), derived = derived.len(), "exported module image");
        Ok(())
    }

    fn export_instance(&self, instance: SymbolId) -> CompileResult<InstanceRecord> {
        let data = self.class_data(instance)?;
        let arguments = data
            .template_arguments
            .iter()
            .map(|&a| self.type_record(a))
            .collect::<CompileResult<Vec<_>>>()?;
        let class = self.export_symbol(instance)?.ok_or_else(|| {
            CompileError::internal(format!("template instance {} not exportable", instance.0))
        })?;
        Ok(InstanceRecord {
            primary: self.sid_of(data.primary_template)?,
            arguments,
            class,
        })
    }

    fn export_symbol(&self, id: SymbolId) -> CompileResult<Option<SymbolRecord>> {
        let symbol = self.symbol(id)?;
        if symbol.has_flag(SymbolFlags::IMPORTED) && !symbol.is_namespace() {
            return Ok(None);
        }
        let kind = match &symbol.kind {
            SymbolKind::Namespace => KindRecord::Namespace,
            SymbolKind::Class(data) => KindRecord::Class(self.class_record(data)?),
            SymbolKind::Interface(_) => KindRecord::Interface,
            SymbolKind::Enum(data) => KindRecord::Enum {
                underlying_type: self.type_record(data.underlying_type)?,
            },
            SymbolKind::EnumConstant(data) => KindRecord::EnumConstant { value: data.value },
            SymbolKind::Constant(data) => KindRecord::Constant {
                type_id: self.optional_type_record(data.type_id)?,
                value: data.value,
            },
            SymbolKind::Typedef(data) => KindRecord::Typedef {
                type_id: self.optional_type_record(data.type_id)?,
            },
            SymbolKind::Delegate(data) => KindRecord::Delegate(self.delegate_record(data)?),
            SymbolKind::ClassDelegate(data) => KindRecord::ClassDelegate(self.delegate_record(data)?),
            SymbolKind::Concept(data) => KindRecord::Concept {
                type_parameters: data.type_parameters.clone(),
            },
            SymbolKind::TemplateParameter(_) => KindRecord::TemplateParameter,
            SymbolKind::Function(data) => KindRecord::Function(FunctionRecord {
                group_name: data.group_name.clone(),
                function_kind: data.kind,
                flags: data.flags.bits(),
                return_type: data.return_type.map(|t| self.type_record(t)).transpose()?,
                vtbl_index: data.vtbl_index,
                overridden: self.optional_sid(data.overridden)?,
                overload_name: data.overload_name.clone(),
                constraint: data.constraint.clone(),
            }),
            SymbolKind::Parameter(data) => KindRecord::Parameter {
                type_id: self.optional_type_record(data.type_id)?,
            },
            SymbolKind::MemberVariable(data) => KindRecord::MemberVariable {
                type_id: self.optional_type_record(data.type_id)?,
                layout_index: data.layout_index,
            },
            SymbolKind::FunctionGroup(_)
            | SymbolKind::LocalVariable(_)
            | SymbolKind::ReturnValue(_)
            | SymbolKind::DeclarationBlock => return Ok(None),
        };
        let mut children = Vec::new();
        for &child in &symbol.children {
            if let Some(record) = self.export_symbol(child)? {
                children.push(record);
            }
        }
        Ok(Some(SymbolRecord {
            sid: symbol.sid,
            name: symbol.name.clone(),
            access: symbol.access,
            flags: (symbol.flags - SymbolFlags::IMPORTED).bits(),
            kind,
            children,
        }))
    }

    fn class_record(&self, data: &ClassTypeData) -> CompileResult<ClassRecord> {
        let mut special_members = Vec::new();
        for kind in SpecialMemberKind::ALL {
            let state = data.special_members.state(kind);
            if state != SpecialMemberState::Absent {
                special_members.push(SpecialMemberRecord {
                    kind,
                    state,
                    function: self.optional_sid(data.special_members.function(kind))?,
                });
            }
        }
        Ok(ClassRecord {
            flags: (data.flags - ClassFlags::TEMPLATE_INSTANCE).bits(),
            base_class: self.optional_sid(data.base_class)?,
            interfaces: self.sids(&data.interfaces)?,
            special_members,
            has_user_defined_constructor: data.special_members.has_user_defined_constructor,
            conversions: self.sids(&data.conversions)?,
            vtable: self.sids(&data.vtable)?,
        })
    }

    fn delegate_record(&self, data: &DelegateData) -> CompileResult<DelegateRecord> {
        Ok(DelegateRecord {
            return_type: data.return_type.map(|t| self.type_record(t)).transpose()?,
            parameter_types: data
                .parameter_types
                .iter()
                .map(|&t| self.type_record(t))
                .collect::<CompileResult<Vec<_>>>()?,
        })
    }

    fn type_record(&self, type_id: TypeId) -> CompileResult<TypeRecord> {
        match self.types.get(type_id) {
            Some(TypeKind::Basic(basic)) => Ok(TypeRecord::Basic(*basic)),
            Some(TypeKind::Symbol(symbol)) => Ok(TypeRecord::Symbol(self.sid_of(*symbol)?)),
            Some(TypeKind::Derived { base, derivations }) => Ok(TypeRecord::Derived {
                base: Box::new(self.type_record(*base)?),
                derivations: *derivations,
            }),
            None => Err(CompileError::internal(format!("type {} not found", type_id.0))),
        }
    }

    fn optional_type_record(&self, type_id: TypeId) -> CompileResult<Option<TypeRecord>> {
        if type_id.is_none() {
            return Ok(None);
        }
        self.type_record(type_id).map(Some)
    }

    fn sid_of(&self, id: SymbolId) -> CompileResult<Sid> {
        Ok(self.symbol(id)?.sid)
    }

    fn optional_sid(&self, id: SymbolId) -> CompileResult<Option<Sid>> {
        if id.is_none() {
            return Ok(None);
        }
        self.sid_of(id).map(Some)
    }

    fn sids(&self, ids: &[SymbolId]) -> CompileResult<Vec<Sid>> {
        ids.iter().map(|&id| self.sid_of(id)).collect()
    }
}

// =============================================================================
// Import
// =============================================================================

/// State of one Import: sids that merged into existing symbols and the
/// symbols whose types are resolved once every symbol exists.
#[derive(Default)]
struct ImportState {
    aliases: FxHashMap<Sid, SymbolId>,
    pending: Vec<(SymbolId, KindRecord)>,
    symbols: usize,
}

impl SymbolTable {
    /// Read a module image written by [`SymbolTable::export`] into this
    /// table. Imported symbols keep their sids and are flagged `IMPORTED`;
    /// namespaces merge by name with existing ones.
    ///
    /// Sids are kept as written, so every image imported into one table must
    /// come from a table with its own sid range (see
    /// [`SymbolTable::with_sid_base`]). Two images that both start from the
    /// default base overlap, and the second import fails with
    /// "symbol id N already in use".
    #[instrument(level = "debug", skip_all)]
    pub fn import<R: Read>(&mut self, reader: &mut R) -> CompileResult<ImportSummary> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic).map_err(io_error)?;
        if magic != MAGIC {
            return Err(CompileError::serialization("not a module image"));
        }
        let version = read_u32(reader)?;
        if version != MODULE_IMAGE_VERSION {
            return Err(CompileError::serialization(format!(
                "unsupported module image version {version}"
            )));
        }
        let tree: SymbolRecord = read_json(reader)?;
        if !matches!(tree.kind, KindRecord::Namespace) {
            return Err(CompileError::serialization("namespace expected"));
        }
        let instance_count = read_u32(reader)?;
        let mut instances = Vec::new();
        for _ in 0..instance_count {
            instances.push(read_json::<_, InstanceRecord>(reader)?);
        }
        let derived_count = read_u32(reader)?;
        let mut derived = Vec::new();
        for _ in 0..derived_count {
            derived.push(read_json::<_, TypeRecord>(reader)?);
        }
        let mut flag = [0u8; 1];
        reader.read_exact(&mut flag).map_err(io_error)?;
        if flag[0] > 1 {
            return Err(CompileError::serialization("malformed class id table flag"));
        }
        if flag[0] == 1 {
            let entries = read_u32(reader)?;
            let mut map = ClassIdMap::new();
            for _ in 0..entries {
                let name = String::from_utf8(read_bytes(reader)?).map_err(|_| {
                    CompileError::serialization("class id table entry is not UTF-8")
                })?;
                let mut cid = [0u8; 8];
                reader.read_exact(&mut cid).map_err(io_error)?;
                map.insert(name, Cid(u64::from_le_bytes(cid)));
            }
            self.merge_class_id_map(&map);
        }

        let mut state = ImportState::default();
        let global = self.global_namespace;
        state.aliases.insert(tree.sid, global);
        for child in &tree.children {
            self.import_symbol(child, global, &mut state)?;
        }
        let mut summary = ImportSummary::default();
        for instance in &instances {
            if self.import_instance(instance, &mut state)? {
                summary.template_instances += 1;
            }
        }

        let pending = std::mem::take(&mut state.pending);
        for (id, kind) in &pending {
            self.complete_imported(*id, kind, &state)?;
        }
        for record in &derived {
            self.type_from_record(record, &state)?;
        }
        summary.symbols = state.symbols;
        summary.derived_types = derived.len();
        debug!(?summary, "imported module image");
        Ok(summary)
    }

    fn import_symbol(
        &mut self,
        record: &SymbolRecord,
        parent: SymbolId,
        state: &mut ImportState,
    ) -> CompileResult<()> {
        if matches!(record.kind, KindRecord::Namespace) {
            let namespace = self.import_namespace(record, parent, state)?;
            for child in &record.children {
                self.import_symbol(child, namespace, state)?;
            }
            return Ok(());
        }
        let id = self.create_imported(record, state)?;
        self.add_child_imported(parent, id, record)?;
        for child in &record.children {
            self.import_symbol(child, id, state)?;
        }
        Ok(())
    }

    fn import_namespace(
        &mut self,
        record: &SymbolRecord,
        parent: SymbolId,
        state: &mut ImportState,
    ) -> CompileResult<SymbolId> {
        let scope = self.container_scope(parent)?;
        if let Some(existing) = self.scope(scope).and_then(|s| s.lookup_local(&record.name)) {
            if !self.symbol(existing)?.is_namespace() {
                return Err(CompileError::serialization(format!(
                    "'{}' is not a namespace",
                    self.full_name(existing)
                )));
            }
            state.aliases.insert(record.sid, existing);
            return Ok(existing);
        }
        let namespace = if self.symbol_by_sid(record.sid).is_none() {
            self.ensure_sid_above(record.sid);
            self.new_symbol_with_sid(record.sid, record.name.clone(), Span::DUMMY, SymbolKind::Namespace)
        } else {
            self.new_symbol(record.name.clone(), Span::DUMMY, SymbolKind::Namespace)
        };
        self.symbol_mut(namespace)?.access = Access::Public;
        self.add_child(parent, namespace)?;
        let ns_scope = self.container_scope(namespace)?;
        if let Some(s) = self.scope_mut(ns_scope) {
            s.parent = scope;
        }
        state.aliases.insert(record.sid, namespace);
        state.symbols += 1;
        Ok(namespace)
    }

    /// Allocate the symbol for `record` under its persisted sid.
    fn create_imported(&mut self, record: &SymbolRecord, state: &mut ImportState) -> CompileResult<SymbolId> {
        if self.symbol_by_sid(record.sid).is_some() {
            return Err(CompileError::serialization(format!(
                "symbol id {} already in use",
                record.sid.0
            )));
        }
        let kind = match &record.kind {
            KindRecord::Namespace => SymbolKind::Namespace,
            KindRecord::Class(class) => SymbolKind::Class(Box::new(ClassTypeData {
                flags: ClassFlags::from_bits_truncate(class.flags),
                ..ClassTypeData::default()
            })),
            KindRecord::Interface => SymbolKind::Interface(InterfaceTypeData::default()),
            KindRecord::Enum { .. } => SymbolKind::Enum(EnumTypeData::default()),
            KindRecord::EnumConstant { value } => SymbolKind::EnumConstant(ConstantData {
                type_id: TypeId::NONE,
                value: *value,
            }),
            KindRecord::Constant { value, .. } => SymbolKind::Constant(ConstantData {
                type_id: TypeId::NONE,
                value: *value,
            }),
            KindRecord::Typedef { .. } => SymbolKind::Typedef(TypedefData::default()),
            KindRecord::Delegate(_) => SymbolKind::Delegate(DelegateData::default()),
            KindRecord::ClassDelegate(_) => SymbolKind::ClassDelegate(DelegateData::default()),
            KindRecord::Concept { type_parameters } => SymbolKind::Concept(ConceptData {
                type_parameters: type_parameters.clone(),
            }),
            KindRecord::TemplateParameter => {
                SymbolKind::TemplateParameter(TemplateParameterData::default())
            }
            KindRecord::Function(function) => {
                let mut data =
                    FunctionSymbolData::new(function.group_name.clone(), function.function_kind);
                data.flags = FunctionFlags::from_bits_truncate(function.flags);
                data.vtbl_index = function.vtbl_index;
                data.overload_name = function.overload_name.clone();
                data.constraint = function.constraint.clone();
                SymbolKind::Function(Box::new(data))
            }
            KindRecord::Parameter { .. } => SymbolKind::Parameter(VariableData::default()),
            KindRecord::MemberVariable { layout_index, .. } => {
                SymbolKind::MemberVariable(MemberVariableData {
                    type_id: TypeId::NONE,
                    layout_index: *layout_index,
                })
            }
        };
        let names_type = matches!(
            record.kind,
            KindRecord::Class(_)
                | KindRecord::Interface
                | KindRecord::Enum { .. }
                | KindRecord::Delegate(_)
                | KindRecord::ClassDelegate(_)
                | KindRecord::TemplateParameter
        );
        self.ensure_sid_above(record.sid);
        let id = self.new_symbol_with_sid(record.sid, record.name.clone(), Span::DUMMY, kind);
        let type_id = names_type.then(|| self.types.symbol_type(id));
        let symbol = self.symbol_mut(id)?;
        symbol.access = record.access;
        symbol.flags = SymbolFlags::from_bits_truncate(record.flags) | SymbolFlags::IMPORTED;
        if let Some(type_id) = type_id {
            match &mut symbol.kind {
                SymbolKind::Class(data) => data.type_id = type_id,
                SymbolKind::Interface(data) => data.type_id = type_id,
                SymbolKind::Enum(data) => data.type_id = type_id,
                SymbolKind::Delegate(data) | SymbolKind::ClassDelegate(data) => {
                    data.type_id = type_id;
                }
                SymbolKind::TemplateParameter(data) => data.type_id = type_id,
                _ => {}
            }
        }
        state.pending.push((id, record.kind.clone()));
        state.symbols += 1;
        Ok(id)
    }

    /// Link an imported symbol under `parent` and register it with the
    /// parent's member lists.
    fn add_child_imported(&mut self, parent: SymbolId, id: SymbolId, record: &SymbolRecord) -> CompileResult<()> {
        if let KindRecord::Function(function) = &record.kind {
            let group = self.function_group(parent, &function.group_name, Span::DUMMY)?;
            if let SymbolKind::FunctionGroup(g) = &mut self.symbol_mut(group)?.kind {
                g.functions.push(id);
            }
        }
        self.add_child(parent, id)?;
        let is_container = self.symbol(id)?.kind.is_container();
        if is_container {
            let parent_scope = self.container_scope(parent)?;
            let scope = self.container_scope(id)?;
            if let Some(s) = self.scope_mut(scope) {
                s.parent = parent_scope;
            }
        }
        match (&record.kind, &mut self.symbol_mut(parent)?.kind) {
            (KindRecord::Parameter { .. }, SymbolKind::Function(function)) => {
                function.parameters.push(id);
            }
            (KindRecord::TemplateParameter, SymbolKind::Function(function)) => {
                function.template_parameters.push(id);
            }
            (KindRecord::TemplateParameter, SymbolKind::Class(class)) => {
                class.template_parameters.push(id);
            }
            (KindRecord::MemberVariable { .. }, SymbolKind::Class(class)) => {
                class.member_variables.push(id);
            }
            _ => {}
        }
        Ok(())
    }

    /// Import one template instance. Returns false when this table already
    /// holds the same instance; its sid then refers to the existing one.
    fn import_instance(&mut self, record: &InstanceRecord, state: &mut ImportState) -> CompileResult<bool> {
        let primary = self.resolve_sid(record.primary, state)?;
        let mut arguments = Vec::with_capacity(record.arguments.len());
        for argument in &record.arguments {
            arguments.push(self.type_from_record(argument, state)?);
        }
        if let Some(existing) = self.types.lookup_template_instance(primary, &arguments) {
            state.aliases.insert(record.class.sid, existing);
            return Ok(false);
        }
        let instance = self.create_imported(&record.class, state)?;
        let parent = self.symbol(primary)?.parent;
        self.symbol_mut(instance)?.parent = parent;
        let parent_scope = self.container_scope(parent)?;
        let scope = self.container_scope(instance)?;
        if let Some(s) = self.scope_mut(scope) {
            s.parent = parent_scope;
        }
        {
            let data = self.class_data_mut(instance)?;
            data.flags |= ClassFlags::TEMPLATE_INSTANCE;
            data.primary_template = primary;
            data.template_arguments = arguments.clone();
        }
        self.types.add_template_instance(primary, arguments, instance);
        self.types.record_exported_template_type(instance);
        for child in &record.class.children {
            self.import_symbol(child, instance, state)?;
        }
        Ok(true)
    }

    fn resolve_sid(&self, sid: Sid, state: &ImportState) -> CompileResult<SymbolId> {
        state
            .aliases
            .get(&sid)
            .copied()
            .or_else(|| self.symbol_by_sid(sid))
            .ok_or_else(|| {
                CompileError::serialization(format!(
                    "module image refers to unknown symbol id {}; import its dependencies first",
                    sid.0
                ))
            })
    }

    fn resolve_optional_sid(&self, sid: Option<Sid>, state: &ImportState) -> CompileResult<SymbolId> {
        match sid {
            Some(sid) => self.resolve_sid(sid, state),
            None => Ok(SymbolId::NONE),
        }
    }

    fn type_from_record(&mut self, record: &TypeRecord, state: &ImportState) -> CompileResult<TypeId> {
        self.type_from_record_at_depth(record, state, 0)
    }

    fn type_from_record_at_depth(
        &mut self,
        record: &TypeRecord,
        state: &ImportState,
        depth: u32,
    ) -> CompileResult<TypeId> {
        if depth > limits::MAX_TYPE_RESOLUTION_DEPTH {
            return Err(CompileError::serialization("type record nested too deeply"));
        }
        match record {
            TypeRecord::Basic(basic) => Ok(self.types.basic(*basic)),
            TypeRecord::Symbol(sid) => {
                let symbol = self.resolve_sid(*sid, state)?;
                Ok(self.types.symbol_type(symbol))
            }
            TypeRecord::Derived { base, derivations } => {
                let base = self.type_from_record_at_depth(base, state, depth + 1)?;
                Ok(self.types.make_derived(base, *derivations))
            }
        }
    }

    fn optional_type_from_record(
        &mut self,
        record: &Option<TypeRecord>,
        state: &ImportState,
    ) -> CompileResult<TypeId> {
        match record {
            Some(record) => self.type_from_record(record, state),
            None => Ok(TypeId::NONE),
        }
    }

    /// Second phase: fill in everything that refers to other symbols.
    fn complete_imported(&mut self, id: SymbolId, kind: &KindRecord, state: &ImportState) -> CompileResult<()> {
        match kind {
            KindRecord::Class(record) => self.complete_imported_class(id, record, state),
            KindRecord::Enum { underlying_type } => {
                let underlying = self.type_from_record(underlying_type, state)?;
                if let SymbolKind::Enum(data) = &mut self.symbol_mut(id)?.kind {
                    data.underlying_type = underlying;
                }
                Ok(())
            }
            KindRecord::EnumConstant { .. } => {
                let parent = self.symbol(id)?.parent;
                let enum_type = self.symbol(parent)?.kind.type_id().unwrap_or(TypeId::NONE);
                if let SymbolKind::EnumConstant(data) = &mut self.symbol_mut(id)?.kind {
                    data.type_id = enum_type;
                }
                Ok(())
            }
            KindRecord::Constant { type_id, .. } => {
                let resolved = self.optional_type_from_record(type_id, state)?;
                if let SymbolKind::Constant(data) = &mut self.symbol_mut(id)?.kind {
                    data.type_id = resolved;
                }
                Ok(())
            }
            KindRecord::Typedef { type_id } => {
                let resolved = self.optional_type_from_record(type_id, state)?;
                if let SymbolKind::Typedef(data) = &mut self.symbol_mut(id)?.kind {
                    data.type_id = resolved;
                }
                Ok(())
            }
            KindRecord::Delegate(record) | KindRecord::ClassDelegate(record) => {
                let return_type = match &record.return_type {
                    Some(t) => Some(self.type_from_record(t, state)?),
                    None => None,
                };
                let mut parameter_types = Vec::with_capacity(record.parameter_types.len());
                for t in &record.parameter_types {
                    parameter_types.push(self.type_from_record(t, state)?);
                }
                if let SymbolKind::Delegate(data) | SymbolKind::ClassDelegate(data) =
                    &mut self.symbol_mut(id)?.kind
                {
                    data.return_type = return_type;
                    data.parameter_types = parameter_types;
                }
                Ok(())
            }
            KindRecord::Function(record) => self.complete_imported_function(id, record, state),
            KindRecord::Parameter { type_id } => {
                let resolved = self.optional_type_from_record(type_id, state)?;
                if let SymbolKind::Parameter(data) = &mut self.symbol_mut(id)?.kind {
                    data.type_id = resolved;
                }
                Ok(())
            }
            KindRecord::MemberVariable { type_id, .. } => {
                let resolved = self.optional_type_from_record(type_id, state)?;
                if let SymbolKind::MemberVariable(data) = &mut self.symbol_mut(id)?.kind {
                    data.type_id = resolved;
                }
                Ok(())
            }
            KindRecord::Namespace
            | KindRecord::Interface
            | KindRecord::Concept { .. }
            | KindRecord::TemplateParameter => Ok(()),
        }
    }

    fn complete_imported_class(
        &mut self,
        class: SymbolId,
        record: &ClassRecord,
        state: &ImportState,
    ) -> CompileResult<()> {
        let base_class = self.resolve_optional_sid(record.base_class, state)?;
        let interfaces = record
            .interfaces
            .iter()
            .map(|&sid| self.resolve_sid(sid, state))
            .collect::<CompileResult<Vec<_>>>()?;
        let conversions = record
            .conversions
            .iter()
            .map(|&sid| self.resolve_sid(sid, state))
            .collect::<CompileResult<Vec<_>>>()?;
        let vtable = record
            .vtable
            .iter()
            .map(|&sid| self.resolve_sid(sid, state))
            .collect::<CompileResult<Vec<_>>>()?;
        let mut special = Vec::with_capacity(record.special_members.len());
        for member in &record.special_members {
            special.push((
                member.kind,
                member.state,
                self.resolve_optional_sid(member.function, state)?,
            ));
        }
        let base_scope = if base_class.is_some() {
            self.container_scope(base_class)?
        } else {
            ScopeId::NONE
        };
        {
            let data = self.class_data_mut(class)?;
            data.base_class = base_class;
            data.interfaces = interfaces;
            data.conversions = conversions.into_iter().collect();
            data.vtable = vtable;
            data.special_members.has_user_defined_constructor = record.has_user_defined_constructor;
            for (kind, member_state, function) in special {
                data.special_members
                    .set(kind, member_state, function)
                    .map_err(|_| {
                        CompileError::serialization(format!("{kind} recorded twice in module image"))
                    })?;
            }
        }
        let scope = self.container_scope(class)?;
        if let Some(s) = self.scope_mut(scope) {
            s.base = base_scope;
        }
        if !self.class_data(class)?.is_template() {
            self.assign_cid(class)?;
        }
        Ok(())
    }

    fn complete_imported_function(
        &mut self,
        function: SymbolId,
        record: &FunctionRecord,
        state: &ImportState,
    ) -> CompileResult<()> {
        let return_type = match &record.return_type {
            Some(t) => Some(self.type_from_record(t, state)?),
            None => None,
        };
        let overridden = self.resolve_optional_sid(record.overridden, state)?;
        {
            let data = self.function_data_mut(function)?;
            data.return_type = return_type;
            data.overridden = overridden;
        }
        if let Some(return_type) = return_type {
            let value = self.add_return_value(function)?;
            if let SymbolKind::ReturnValue(data) = &mut self.symbol_mut(value)?.kind {
                data.type_id = return_type;
            }
        }
        let mut current = overridden;
        let mut steps = 0usize;
        while current.is_some() && steps <= limits::MAX_BASE_CLASS_DEPTH {
            steps += 1;
            let data = self.function_data_mut(current)?;
            if !data.override_set.contains(&function) {
                data.override_set.push(function);
            }
            current = data.overridden;
        }
        Ok(())
    }
}
