//! Snapshot construction.
//!
//! A Builder is either initialized from a full list of database descriptors or
//! from a prior snapshot, then mutated by zero or more diffs, then frozen by
//! `build()`. Diff application stages every mutation on persistent-map clones
//! and commits only on success, so a failed apply leaves the Builder exactly
//! as it was.

use crate::builtin;
use crate::config::SchemaConfig;
use crate::diff::{DiffKind, SchemaDiff};
use crate::error::{Result, SchemaError};
use crate::meta::Meta;
use crate::model::{DbInfo, PolicyInfo, ResourceGroupInfo, TableInfo};
use crate::placement;
use crate::snapshot::index::{table_name_key, SchemaIndex, TableRef};
use crate::snapshot::{InfoSchemaRef, InfoSchemaV1, InfoSchemaV2};
use im::HashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuilderMode {
    Full,
    Incremental,
}

/// In-progress snapshot state. Cloning is cheap (persistent maps), which is
/// what makes the stage-then-commit discipline of `apply_diff` affordable.
#[derive(Clone)]
struct Stage {
    index: SchemaIndex,
    tables: HashMap<i64, Arc<TableInfo>>,
}

impl Stage {
    fn insert_policy(&mut self, policy: Arc<PolicyInfo>) {
        self.index.policies.insert(policy.name.l.clone(), policy);
    }

    fn insert_resource_group(&mut self, group: Arc<ResourceGroupInfo>) {
        self.index.resource_groups.insert(group.name.l.clone(), group);
    }

    fn insert_db_record(&mut self, db: Arc<DbInfo>) -> Result<()> {
        if let Some(existing) = self.index.db_ids_by_name.get(db.name.folded()) {
            if *existing != db.id {
                return Err(SchemaError::DatabaseExists {
                    db: db.name.original().to_string(),
                });
            }
        }
        self.index.db_ids_by_name.insert(db.name.l.clone(), db.id);
        self.index.dbs_by_id.insert(db.id, db);
        Ok(())
    }

    /// Registers a table body under its database: name index, reverse map,
    /// temp-table set, owning-db record, and placement bundles.
    fn insert_table(&mut self, db_id: i64, table: Arc<TableInfo>) -> Result<()> {
        table.validate()?;
        let db = self
            .index
            .dbs_by_id
            .get(&db_id)
            .cloned()
            .ok_or_else(|| SchemaError::database_not_exists_by_id(db_id))?;
        let key = table_name_key(&db.name, &table.name);
        if let Some(existing) = self.index.table_ids_by_name.get(&key) {
            if *existing != table.id {
                return Err(SchemaError::table_exists(table.name.original()));
            }
        }
        if !db.table_ids.contains(&table.id) {
            let mut record = (*db).clone();
            record.table_ids.push(table.id);
            self.index.dbs_by_id.insert(db_id, Arc::new(record));
        }
        let partition_ids: Vec<i64> = table
            .partition
            .as_ref()
            .map(|partition| partition.definitions.iter().map(|def| def.id).collect())
            .unwrap_or_default();
        self.index.table_ids_by_name.insert(key.clone(), table.id);
        self.index.table_refs.insert(
            table.id,
            TableRef {
                schema_id: db_id,
                key,
                partition_ids,
            },
        );
        if table.is_global_temp() {
            self.index.global_temp_ids.insert(table.id);
        } else {
            self.index.global_temp_ids.remove(&table.id);
        }
        self.rebuild_bundles(&table);
        self.tables.insert(table.id, table);
        Ok(())
    }

    fn rebuild_bundles(&mut self, table: &TableInfo) {
        let policies = self.index.policies.clone();
        let resolve = |policy_ref: &crate::model::PolicyRef| {
            policies.get(policy_ref.name.folded()).cloned()
        };
        match placement::new_table_bundle(&resolve, table) {
            Some(bundle) => {
                self.index.bundles.insert(table.id, bundle);
            }
            None => {
                self.index.bundles.remove(&table.id);
            }
        }
        if let Some(partition) = &table.partition {
            for def in &partition.definitions {
                match placement::new_partition_bundle(&resolve, def) {
                    Some(bundle) => {
                        self.index.bundles.insert(def.id, bundle);
                    }
                    None => {
                        self.index.bundles.remove(&def.id);
                    }
                }
            }
        }
    }

    /// Unregisters a table everywhere it appears. Bundle cleanup covers the
    /// table id and every partition id recorded in the reverse map, so it
    /// works even when the body was never materialized (v2 ancestors).
    fn remove_table(&mut self, table_id: i64) -> bool {
        let Some(table_ref) = self.index.table_refs.get(&table_id).cloned() else {
            return false;
        };
        self.index.table_refs.remove(&table_id);
        self.index.table_ids_by_name.remove(&table_ref.key);
        self.index.global_temp_ids.remove(&table_id);
        self.index.bundles.remove(&table_id);
        for physical_id in &table_ref.partition_ids {
            self.index.bundles.remove(physical_id);
        }
        self.tables.remove(&table_id);
        if let Some(db) = self.index.dbs_by_id.get(&table_ref.schema_id).cloned() {
            if db.table_ids.contains(&table_id) {
                let mut record = (*db).clone();
                record.table_ids.retain(|id| *id != table_id);
                self.index
                    .dbs_by_id
                    .insert(table_ref.schema_id, Arc::new(record));
            }
        }
        true
    }

    fn remove_db(&mut self, schema_id: i64) -> Vec<i64> {
        let Some(db) = self.index.dbs_by_id.get(&schema_id).cloned() else {
            return Vec::new();
        };
        let table_ids = db.table_ids.clone();
        for table_id in &table_ids {
            self.remove_table(*table_id);
        }
        self.index.db_ids_by_name.remove(db.name.folded());
        self.index.dbs_by_id.remove(&schema_id);
        table_ids
    }
}

pub struct Builder {
    meta: Arc<dyn Meta>,
    config: SchemaConfig,
    mode: Option<BuilderMode>,
    state: Stage,
    /// True while `state.tables` holds a body for every indexed table.
    fully_materialized: bool,
    dirty_table_ids: HashSet<i64>,
}

impl Builder {
    pub fn new(meta: Arc<dyn Meta>, config: SchemaConfig) -> Result<Self> {
        config.validate()?;
        let mut stage = Stage {
            index: SchemaIndex::new(0),
            tables: HashMap::new(),
        };
        for schema in builtin::builtin_schemas() {
            stage.insert_db_record(schema.db.clone())?;
            for table in &schema.tables {
                stage.insert_table(schema.db.id, table.clone())?;
            }
        }
        Ok(Self {
            meta,
            config,
            mode: None,
            state: stage,
            fully_materialized: true,
            dirty_table_ids: HashSet::new(),
        })
    }

    /// Full build: populates the indices from the given database descriptors,
    /// reading table bodies through the facade. Only Public databases enter
    /// the snapshot. Idempotent for identical inputs.
    pub fn init_with_db_infos(
        mut self,
        dbs: Vec<Arc<DbInfo>>,
        policies: Vec<Arc<PolicyInfo>>,
        resource_groups: Vec<Arc<ResourceGroupInfo>>,
        schema_version: i64,
    ) -> Result<Self> {
        self.set_mode(BuilderMode::Full)?;
        let mut stage = self.state.clone();
        for policy in policies {
            stage.insert_policy(policy);
        }
        for group in resource_groups {
            stage.insert_resource_group(group);
        }
        for db in dbs {
            if !db.state.is_public() {
                continue;
            }
            let record = Arc::new(DbInfo {
                id: db.id,
                name: db.name.clone(),
                state: db.state,
                table_ids: Vec::new(),
            });
            stage.insert_db_record(record)?;
            for table in self.meta.list_tables(db.id)? {
                stage.insert_table(db.id, table)?;
            }
        }
        stage.index.schema_version = schema_version;
        self.state = stage;
        self.fully_materialized = true;
        Ok(self)
    }

    /// Incremental build: clones the prior snapshot's indices by structural
    /// sharing. Table bodies are shared too (v1) or fetched lazily through the
    /// facade (v2 prior).
    pub fn init_with_old_info_schema(mut self, prev: &InfoSchemaRef) -> Result<Self> {
        self.set_mode(BuilderMode::Incremental)?;
        match prev {
            InfoSchemaRef::V1(snapshot) => {
                self.state = Stage {
                    index: snapshot.index().clone(),
                    tables: snapshot.tables().clone(),
                };
                self.fully_materialized = true;
            }
            InfoSchemaRef::V2(snapshot) => {
                self.state = Stage {
                    index: snapshot.index().clone(),
                    tables: HashMap::new(),
                };
                self.fully_materialized = false;
            }
        }
        Ok(self)
    }

    fn set_mode(&mut self, mode: BuilderMode) -> Result<()> {
        if self.mode.is_some() {
            return Err(SchemaError::Validation(
                "builder is already initialized".to_string(),
            ));
        }
        self.mode = Some(mode);
        Ok(())
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.mode.is_none() {
            return Err(SchemaError::Validation(
                "builder is not initialized".to_string(),
            ));
        }
        Ok(())
    }

    /// Applies one diff (plus its chained diffs, in order) against the
    /// in-progress state. Returns the affected physical table ids. On error
    /// the Builder's observable state is unchanged.
    pub fn apply_diff(&mut self, meta: &dyn Meta, diff: &SchemaDiff) -> Result<Vec<i64>> {
        self.ensure_initialized()?;
        diff.validate()?;
        let mut stage = self.state.clone();
        let mut affected = Vec::new();
        Self::apply_tree(&mut stage, meta, diff, &mut affected)?;
        stage.index.schema_version += 1;
        self.state = stage;
        self.dirty_table_ids.extend(affected.iter().copied());
        Ok(affected)
    }

    fn apply_tree(
        stage: &mut Stage,
        meta: &dyn Meta,
        diff: &SchemaDiff,
        affected: &mut Vec<i64>,
    ) -> Result<()> {
        Self::apply_kind(stage, meta, diff.kind, affected)?;
        for chained in &diff.affected {
            Self::apply_tree(stage, meta, chained, affected)?;
        }
        Ok(())
    }

    fn apply_kind(
        stage: &mut Stage,
        meta: &dyn Meta,
        kind: DiffKind,
        affected: &mut Vec<i64>,
    ) -> Result<()> {
        debug!(kind = kind.name(), "applying schema diff");
        match kind {
            DiffKind::CreateSchema { schema_id } => {
                let db = meta
                    .get_database(schema_id)?
                    .ok_or_else(|| SchemaError::database_not_exists_by_id(schema_id))?;
                let record = Arc::new(DbInfo {
                    id: db.id,
                    name: db.name.clone(),
                    state: db.state,
                    table_ids: Vec::new(),
                });
                stage.insert_db_record(record)?;
                for table in meta.list_tables(schema_id)? {
                    affected.push(table.id);
                    stage.insert_table(schema_id, table)?;
                }
            }
            DiffKind::DropSchema { schema_id } => {
                affected.extend(stage.remove_db(schema_id));
            }
            DiffKind::CreateTable {
                schema_id,
                table_id,
            } => {
                stage
                    .index
                    .dbs_by_id
                    .get(&schema_id)
                    .ok_or_else(|| SchemaError::database_not_exists_by_id(schema_id))?;
                let table = meta
                    .get_table(schema_id, table_id)?
                    .ok_or_else(|| SchemaError::table_not_exists_by_id(schema_id, table_id))?;
                affected.extend(table.physical_table_ids());
                stage.insert_table(schema_id, table)?;
            }
            DiffKind::DropTable { table_id, .. } => {
                if stage.remove_table(table_id) {
                    affected.push(table_id);
                }
            }
            DiffKind::RenameTable {
                schema_id,
                table_id,
                old_schema_id,
            } => {
                stage
                    .index
                    .dbs_by_id
                    .get(&old_schema_id)
                    .ok_or_else(|| SchemaError::database_not_exists_by_id(old_schema_id))?;
                stage
                    .index
                    .dbs_by_id
                    .get(&schema_id)
                    .ok_or_else(|| SchemaError::database_not_exists_by_id(schema_id))?;
                let table = meta
                    .get_table(schema_id, table_id)?
                    .ok_or_else(|| SchemaError::table_not_exists_by_id(schema_id, table_id))?;
                stage.remove_table(table_id);
                affected.push(table_id);
                stage.insert_table(schema_id, table)?;
            }
            DiffKind::TruncateTable {
                schema_id,
                table_id,
                old_table_id,
            } => {
                stage
                    .index
                    .dbs_by_id
                    .get(&schema_id)
                    .ok_or_else(|| SchemaError::database_not_exists_by_id(schema_id))?;
                let table = meta
                    .get_table(schema_id, table_id)?
                    .ok_or_else(|| SchemaError::table_not_exists_by_id(schema_id, table_id))?;
                if stage.remove_table(old_table_id) {
                    affected.push(old_table_id);
                }
                affected.extend(table.physical_table_ids());
                stage.insert_table(schema_id, table)?;
            }
            DiffKind::AddColumn {
                schema_id,
                table_id,
            }
            | DiffKind::ModifyColumn {
                schema_id,
                table_id,
            }
            | DiffKind::DropColumn {
                schema_id,
                table_id,
            }
            | DiffKind::AddIndex {
                schema_id,
                table_id,
            }
            | DiffKind::DropIndex {
                schema_id,
                table_id,
            }
            | DiffKind::AlterTablePlacement {
                schema_id,
                table_id,
            } => {
                Self::refresh_table(stage, meta, schema_id, table_id, affected)?;
            }
            DiffKind::ExchangeTablePartition {
                schema_id,
                table_id,
                old_schema_id,
                old_table_id,
            } => {
                Self::refresh_table(stage, meta, schema_id, table_id, affected)?;
                Self::refresh_table(stage, meta, old_schema_id, old_table_id, affected)?;
            }
        }
        Ok(())
    }

    /// Re-reads a table body from the facade and replaces it in the indices.
    fn refresh_table(
        stage: &mut Stage,
        meta: &dyn Meta,
        schema_id: i64,
        table_id: i64,
        affected: &mut Vec<i64>,
    ) -> Result<()> {
        stage
            .index
            .dbs_by_id
            .get(&schema_id)
            .ok_or_else(|| SchemaError::database_not_exists_by_id(schema_id))?;
        let table = meta
            .get_table(schema_id, table_id)?
            .ok_or_else(|| SchemaError::table_not_exists_by_id(schema_id, table_id))?;
        stage.remove_table(table_id);
        affected.extend(table.physical_table_ids());
        stage.insert_table(schema_id, table)
    }

    /// Freezes the in-progress state into an immutable snapshot. The
    /// representation is chosen by the configuration captured at `new()`.
    pub fn build(mut self) -> Result<InfoSchemaRef> {
        self.ensure_initialized()?;
        self.state.index.built_at = SystemTime::now();
        if self.config.v2_enabled() {
            let seed: Vec<Arc<TableInfo>> = self
                .dirty_table_ids
                .iter()
                .filter_map(|id| self.state.tables.get(id).cloned())
                .collect();
            let snapshot =
                InfoSchemaV2::new(self.state.index, Arc::clone(&self.meta), &self.config, seed);
            Ok(InfoSchemaRef::V2(Arc::new(snapshot)))
        } else {
            if !self.fully_materialized {
                let missing: Vec<(i64, i64)> = self
                    .state
                    .index
                    .table_refs
                    .iter()
                    .filter(|(id, _)| !self.state.tables.contains_key(id))
                    .map(|(id, table_ref)| (*id, table_ref.schema_id))
                    .collect();
                for (table_id, schema_id) in missing {
                    let body = if builtin::is_reserved_id(table_id) {
                        builtin::builtin_table_by_id(table_id)
                    } else {
                        self.meta.get_table(schema_id, table_id)?
                    };
                    let body = body.ok_or_else(|| {
                        SchemaError::table_not_exists_by_id(schema_id, table_id)
                    })?;
                    self.state.tables.insert(table_id, body);
                }
            }
            Ok(InfoSchemaRef::V1(Arc::new(InfoSchemaV1::new(
                self.state.index,
                self.state.tables,
            ))))
        }
    }
}
