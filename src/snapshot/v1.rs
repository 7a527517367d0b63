//! Fully materialized snapshot: every descriptor body is held in memory.

use super::index::SchemaIndex;
use super::InfoSchema;
use crate::error::{Result, SchemaError};
use crate::model::{DbInfo, PolicyInfo, ResourceGroupInfo, TableInfo};
use crate::name::CiStr;
use crate::placement::Bundle;
use im::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

pub struct InfoSchemaV1 {
    index: SchemaIndex,
    tables: HashMap<i64, Arc<TableInfo>>,
}

impl InfoSchemaV1 {
    pub(crate) fn new(index: SchemaIndex, tables: HashMap<i64, Arc<TableInfo>>) -> Self {
        Self { index, tables }
    }

    pub fn built_at(&self) -> SystemTime {
        self.index.built_at
    }

    pub(crate) fn index(&self) -> &SchemaIndex {
        &self.index
    }

    pub(crate) fn tables(&self) -> &HashMap<i64, Arc<TableInfo>> {
        &self.tables
    }
}

impl InfoSchema for InfoSchemaV1 {
    fn schema_by_name(&self, name: &CiStr) -> Option<Arc<DbInfo>> {
        self.index.db_by_name(name)
    }

    fn schema_by_id(&self, id: i64) -> Option<Arc<DbInfo>> {
        self.index.dbs_by_id.get(&id).cloned()
    }

    fn all_schemas(&self) -> Vec<Arc<DbInfo>> {
        self.index.all_schemas()
    }

    fn schema_tables(&self, name: &CiStr) -> Vec<Arc<TableInfo>> {
        let Some(db) = self.index.db_by_name(name) else {
            return Vec::new();
        };
        db.table_ids
            .iter()
            .filter_map(|id| self.tables.get(id).cloned())
            .collect()
    }

    fn table_by_name(&self, schema: &CiStr, table: &CiStr) -> Result<Arc<TableInfo>> {
        self.index
            .table_id_by_name(schema, table)
            .and_then(|id| self.tables.get(&id).cloned())
            .ok_or_else(|| SchemaError::table_not_exists(schema.original(), table.original()))
    }

    fn table_by_id(&self, id: i64) -> Option<Arc<TableInfo>> {
        self.tables.get(&id).cloned()
    }

    fn has_temporary_table(&self) -> bool {
        !self.index.global_temp_ids.is_empty()
    }

    fn placement_bundle_by_physical_table_id(&self, id: i64) -> Option<Arc<Bundle>> {
        self.index.bundles.get(&id).cloned()
    }

    fn all_placement_policies(&self) -> Vec<Arc<PolicyInfo>> {
        self.index.all_policies()
    }

    fn all_resource_groups(&self) -> Vec<Arc<ResourceGroupInfo>> {
        self.index.all_resource_groups()
    }

    fn schema_meta_version(&self) -> i64 {
        self.index.schema_version
    }
}
