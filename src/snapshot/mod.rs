//! Immutable snapshot representations and their shared query surface.

pub(crate) mod index;
mod v1;
mod v2;

pub use v1::InfoSchemaV1;
pub use v2::InfoSchemaV2;

use crate::error::Result;
use crate::model::{DbInfo, PolicyInfo, ResourceGroupInfo, TableInfo};
use crate::name::CiStr;
use crate::placement::Bundle;
use std::sync::Arc;
use std::time::SystemTime;

/// Public query surface of one catalog snapshot.
///
/// Implementations are deep-immutable after construction; every method is safe
/// to call from any number of threads without synchronization. All lookups are
/// amortized O(1) except `schema_tables`, which is O(k) in the tables of that
/// schema.
pub trait InfoSchema: Send + Sync {
    fn schema_by_name(&self, name: &CiStr) -> Option<Arc<DbInfo>>;

    fn schema_by_id(&self, id: i64) -> Option<Arc<DbInfo>>;

    fn schema_exists(&self, name: &CiStr) -> bool {
        self.schema_by_name(name).is_some()
    }

    fn all_schemas(&self) -> Vec<Arc<DbInfo>>;

    fn all_schema_names(&self) -> Vec<CiStr> {
        self.all_schemas()
            .into_iter()
            .map(|db| db.name.clone())
            .collect()
    }

    /// Tables of the named schema; empty when the schema is absent.
    fn schema_tables(&self, name: &CiStr) -> Vec<Arc<TableInfo>>;

    fn table_by_name(&self, schema: &CiStr, table: &CiStr) -> Result<Arc<TableInfo>>;

    fn table_by_id(&self, id: i64) -> Option<Arc<TableInfo>>;

    fn table_exists(&self, schema: &CiStr, table: &CiStr) -> bool {
        self.table_by_name(schema, table).is_ok()
    }

    /// Reverse lookup: resolves the owning schema of a table descriptor
    /// through this snapshot's own schema index, keyed by `table.db_id`.
    fn schema_by_table(&self, table: &TableInfo) -> Option<Arc<DbInfo>> {
        self.schema_by_id(table.db_id)
    }

    /// True iff any global temporary table is visible in this snapshot.
    /// Local temporary tables live in session overlays and do not count.
    fn has_temporary_table(&self) -> bool;

    fn placement_bundle_by_physical_table_id(&self, id: i64) -> Option<Arc<Bundle>>;

    fn all_placement_policies(&self) -> Vec<Arc<PolicyInfo>>;

    fn all_resource_groups(&self) -> Vec<Arc<ResourceGroupInfo>>;

    fn schema_meta_version(&self) -> i64;

    fn is_v2(&self) -> bool {
        false
    }
}

pub fn table_is_view(is: &dyn InfoSchema, schema: &CiStr, table: &CiStr) -> bool {
    is.table_by_name(schema, table)
        .map(|table| table.is_view)
        .unwrap_or(false)
}

pub fn table_is_sequence(is: &dyn InfoSchema, schema: &CiStr, table: &CiStr) -> bool {
    is.table_by_name(schema, table)
        .map(|table| table.is_sequence)
        .unwrap_or(false)
}

/// Cheap cloneable handle to a built snapshot, tagged by representation.
#[derive(Clone)]
pub enum InfoSchemaRef {
    V1(Arc<InfoSchemaV1>),
    V2(Arc<InfoSchemaV2>),
}

impl InfoSchemaRef {
    fn inner(&self) -> &dyn InfoSchema {
        match self {
            InfoSchemaRef::V1(snapshot) => snapshot.as_ref(),
            InfoSchemaRef::V2(snapshot) => snapshot.as_ref(),
        }
    }

    pub fn built_at(&self) -> SystemTime {
        match self {
            InfoSchemaRef::V1(snapshot) => snapshot.built_at(),
            InfoSchemaRef::V2(snapshot) => snapshot.built_at(),
        }
    }

    pub(crate) fn index(&self) -> &index::SchemaIndex {
        match self {
            InfoSchemaRef::V1(snapshot) => snapshot.index(),
            InfoSchemaRef::V2(snapshot) => snapshot.index(),
        }
    }
}

impl InfoSchema for InfoSchemaRef {
    fn schema_by_name(&self, name: &CiStr) -> Option<Arc<DbInfo>> {
        self.inner().schema_by_name(name)
    }

    fn schema_by_id(&self, id: i64) -> Option<Arc<DbInfo>> {
        self.inner().schema_by_id(id)
    }

    fn schema_exists(&self, name: &CiStr) -> bool {
        self.inner().schema_exists(name)
    }

    fn all_schemas(&self) -> Vec<Arc<DbInfo>> {
        self.inner().all_schemas()
    }

    fn all_schema_names(&self) -> Vec<CiStr> {
        self.inner().all_schema_names()
    }

    fn schema_tables(&self, name: &CiStr) -> Vec<Arc<TableInfo>> {
        self.inner().schema_tables(name)
    }

    fn table_by_name(&self, schema: &CiStr, table: &CiStr) -> Result<Arc<TableInfo>> {
        self.inner().table_by_name(schema, table)
    }

    fn table_by_id(&self, id: i64) -> Option<Arc<TableInfo>> {
        self.inner().table_by_id(id)
    }

    fn table_exists(&self, schema: &CiStr, table: &CiStr) -> bool {
        self.inner().table_exists(schema, table)
    }

    fn schema_by_table(&self, table: &TableInfo) -> Option<Arc<DbInfo>> {
        self.inner().schema_by_table(table)
    }

    fn has_temporary_table(&self) -> bool {
        self.inner().has_temporary_table()
    }

    fn placement_bundle_by_physical_table_id(&self, id: i64) -> Option<Arc<Bundle>> {
        self.inner().placement_bundle_by_physical_table_id(id)
    }

    fn all_placement_policies(&self) -> Vec<Arc<PolicyInfo>> {
        self.inner().all_placement_policies()
    }

    fn all_resource_groups(&self) -> Vec<Arc<ResourceGroupInfo>> {
        self.inner().all_resource_groups()
    }

    fn schema_meta_version(&self) -> i64 {
        self.inner().schema_meta_version()
    }

    fn is_v2(&self) -> bool {
        self.inner().is_v2()
    }
}
