//! Session-local overlay for temporary tables.
//!
//! `SessionTables` owns the local temporary tables of one connection.
//! `SessionExtendedInfoSchema` layers that overlay on top of a global
//! snapshot, consulting the overlay first so a local temp table may shadow a
//! global table of the same name.

use crate::error::{Result, SchemaError};
use crate::model::{DbInfo, PolicyInfo, ResourceGroupInfo, TableInfo};
use crate::name::CiStr;
use crate::placement::Bundle;
use crate::snapshot::{InfoSchema, InfoSchemaRef};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct SchemaTables {
    db: Arc<DbInfo>,
    /// folded table name -> body.
    tables: HashMap<String, Arc<TableInfo>>,
}

/// Local temporary tables of one session.
///
/// Uniqueness is enforced within the overlay only: both the
/// (db name, table name) pair and the table id must be free. The global
/// snapshot is deliberately not consulted, since shadowing is legal.
#[derive(Debug, Clone, Default)]
pub struct SessionTables {
    /// folded db name -> tables of that db.
    schemas: HashMap<String, SchemaTables>,
    /// table id -> body, for id lookups and id-uniqueness checks.
    by_id: HashMap<i64, Arc<TableInfo>>,
}

impl SessionTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Adds a local temporary table under the given database record.
    /// Fails `TableExists` when the name or the id is already taken in this
    /// overlay. A failed add leaves the overlay unchanged.
    pub fn add_table(&mut self, db: Arc<DbInfo>, table: Arc<TableInfo>) -> Result<()> {
        if self.by_id.contains_key(&table.id) {
            return Err(SchemaError::table_exists(table.name.original()));
        }
        if let Some(schema) = self.schemas.get(db.name.folded()) {
            if schema.tables.contains_key(table.name.folded()) {
                return Err(SchemaError::table_exists(table.name.original()));
            }
        }
        let schema = self
            .schemas
            .entry(db.name.folded().to_string())
            .or_insert_with(|| SchemaTables {
                db: Arc::clone(&db),
                tables: HashMap::new(),
            });
        schema
            .tables
            .insert(table.name.folded().to_string(), Arc::clone(&table));
        self.by_id.insert(table.id, table);
        Ok(())
    }

    /// Removes a table by name; true iff it was present. The synthetic db
    /// record is dropped together with its last table.
    pub fn remove_table(&mut self, db_name: &CiStr, table_name: &CiStr) -> bool {
        let Some(schema) = self.schemas.get_mut(db_name.folded()) else {
            return false;
        };
        let Some(table) = schema.tables.remove(table_name.folded()) else {
            return false;
        };
        self.by_id.remove(&table.id);
        if schema.tables.is_empty() {
            self.schemas.remove(db_name.folded());
        }
        true
    }

    pub fn table_by_name(&self, db_name: &CiStr, table_name: &CiStr) -> Option<Arc<TableInfo>> {
        self.schemas
            .get(db_name.folded())
            .and_then(|schema| schema.tables.get(table_name.folded()))
            .cloned()
    }

    pub fn table_exists(&self, db_name: &CiStr, table_name: &CiStr) -> bool {
        self.table_by_name(db_name, table_name).is_some()
    }

    pub fn table_by_id(&self, id: i64) -> Option<Arc<TableInfo>> {
        self.by_id.get(&id).cloned()
    }

    /// Synthetic database record for a db that owns at least one local
    /// temporary table.
    pub fn schema_by_id(&self, id: i64) -> Option<Arc<DbInfo>> {
        self.schemas
            .values()
            .find(|schema| schema.db.id == id)
            .map(|schema| Arc::clone(&schema.db))
    }

    pub fn has_temporary_table(&self) -> bool {
        !self.by_id.is_empty()
    }
}

/// Combined view of a global snapshot and one session's overlay.
///
/// Lookups consult the overlay first, then the snapshot, so local temporary
/// tables shadow global ones by name while global ids remain reachable.
#[derive(Clone)]
pub struct SessionExtendedInfoSchema {
    pub snapshot: InfoSchemaRef,
    pub local_temporary_tables: Arc<SessionTables>,
}

impl SessionExtendedInfoSchema {
    pub fn new(snapshot: InfoSchemaRef, local: Arc<SessionTables>) -> Self {
        Self {
            snapshot,
            local_temporary_tables: local,
        }
    }
}

impl InfoSchema for SessionExtendedInfoSchema {
    fn schema_by_name(&self, name: &CiStr) -> Option<Arc<DbInfo>> {
        self.snapshot.schema_by_name(name)
    }

    /// Prefers the global record; falls back to the overlay's synthetic one,
    /// which keeps temp tables queryable after their database was dropped
    /// from the global snapshot.
    fn schema_by_id(&self, id: i64) -> Option<Arc<DbInfo>> {
        self.snapshot
            .schema_by_id(id)
            .or_else(|| self.local_temporary_tables.schema_by_id(id))
    }

    fn all_schemas(&self) -> Vec<Arc<DbInfo>> {
        self.snapshot.all_schemas()
    }

    fn schema_tables(&self, name: &CiStr) -> Vec<Arc<TableInfo>> {
        self.snapshot.schema_tables(name)
    }

    fn table_by_name(&self, schema: &CiStr, table: &CiStr) -> Result<Arc<TableInfo>> {
        if let Some(local) = self.local_temporary_tables.table_by_name(schema, table) {
            return Ok(local);
        }
        self.snapshot.table_by_name(schema, table)
    }

    fn table_by_id(&self, id: i64) -> Option<Arc<TableInfo>> {
        self.local_temporary_tables
            .table_by_id(id)
            .or_else(|| self.snapshot.table_by_id(id))
    }

    fn table_exists(&self, schema: &CiStr, table: &CiStr) -> bool {
        self.local_temporary_tables.table_exists(schema, table)
            || self.snapshot.table_exists(schema, table)
    }

    fn has_temporary_table(&self) -> bool {
        self.local_temporary_tables.has_temporary_table() || self.snapshot.has_temporary_table()
    }

    fn placement_bundle_by_physical_table_id(&self, id: i64) -> Option<Arc<Bundle>> {
        self.snapshot.placement_bundle_by_physical_table_id(id)
    }

    fn all_placement_policies(&self) -> Vec<Arc<PolicyInfo>> {
        self.snapshot.all_placement_policies()
    }

    fn all_resource_groups(&self) -> Vec<Arc<ResourceGroupInfo>> {
        self.snapshot.all_resource_groups()
    }

    fn schema_meta_version(&self) -> i64 {
        self.snapshot.schema_meta_version()
    }

    fn is_v2(&self) -> bool {
        self.snapshot.is_v2()
    }
}
