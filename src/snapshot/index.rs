//! Name and id indices shared by both snapshot representations.
//!
//! Every map here is a persistent (`im`) structure: cloning an index for an
//! incremental build shares structure with the prior snapshot until a diff
//! touches a leaf.

use crate::model::{DbInfo, PolicyInfo, ResourceGroupInfo};
use crate::name::CiStr;
use crate::placement::Bundle;
use compact_str::CompactString;
use im::{HashMap, HashSet};
use std::sync::Arc;
use std::time::SystemTime;

/// Composite key for table name lookups: folded db name + folded table name.
pub(crate) type TableNameKey = (CompactString, CompactString);

pub(crate) fn table_name_key(db: &CiStr, table: &CiStr) -> TableNameKey {
    (db.l.clone(), table.l.clone())
}

/// Per-table entry of the secondary id map: owning schema, folded name key,
/// and the partition physical ids. Enough to undo every index entry of a
/// table without holding its body, which v2 builders may not have resident.
#[derive(Debug, Clone)]
pub(crate) struct TableRef {
    pub schema_id: i64,
    pub key: TableNameKey,
    pub partition_ids: Vec<i64>,
}

#[derive(Debug, Clone)]
pub(crate) struct SchemaIndex {
    pub schema_version: i64,
    pub built_at: SystemTime,
    pub dbs_by_id: HashMap<i64, Arc<DbInfo>>,
    pub db_ids_by_name: HashMap<CompactString, i64>,
    pub table_ids_by_name: HashMap<TableNameKey, i64>,
    /// table id -> owning schema + name key (the reverse lookup map).
    pub table_refs: HashMap<i64, TableRef>,
    /// Ids of global temporary tables visible in the snapshot.
    pub global_temp_ids: HashSet<i64>,
    /// physical table id -> resolved placement bundle.
    pub bundles: HashMap<i64, Arc<Bundle>>,
    /// folded policy name -> policy.
    pub policies: HashMap<CompactString, Arc<PolicyInfo>>,
    /// folded group name -> resource group.
    pub resource_groups: HashMap<CompactString, Arc<ResourceGroupInfo>>,
}

impl SchemaIndex {
    pub fn new(schema_version: i64) -> Self {
        Self {
            schema_version,
            built_at: SystemTime::now(),
            dbs_by_id: HashMap::new(),
            db_ids_by_name: HashMap::new(),
            table_ids_by_name: HashMap::new(),
            table_refs: HashMap::new(),
            global_temp_ids: HashSet::new(),
            bundles: HashMap::new(),
            policies: HashMap::new(),
            resource_groups: HashMap::new(),
        }
    }

    pub fn db_by_name(&self, name: &CiStr) -> Option<Arc<DbInfo>> {
        let id = self.db_ids_by_name.get(name.folded())?;
        self.dbs_by_id.get(id).cloned()
    }

    pub fn table_id_by_name(&self, db: &CiStr, table: &CiStr) -> Option<i64> {
        self.table_ids_by_name
            .get(&table_name_key(db, table))
            .copied()
    }

    pub fn all_schemas(&self) -> Vec<Arc<DbInfo>> {
        let mut dbs: Vec<_> = self.dbs_by_id.values().cloned().collect();
        dbs.sort_by_key(|db| db.id);
        dbs
    }

    pub fn all_policies(&self) -> Vec<Arc<PolicyInfo>> {
        let mut policies: Vec<_> = self.policies.values().cloned().collect();
        policies.sort_by_key(|policy| policy.id);
        policies
    }

    pub fn all_resource_groups(&self) -> Vec<Arc<ResourceGroupInfo>> {
        let mut groups: Vec<_> = self.resource_groups.values().cloned().collect();
        groups.sort_by_key(|group| group.id);
        groups
    }
}
