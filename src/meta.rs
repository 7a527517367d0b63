//! Read-side facade over the transactional KV store.
//!
//! The engine never touches the store directly; it consumes catalog objects
//! through [`Meta`]. `MemMeta` is the in-process implementation used by the
//! builder tests and by embedded callers, with `freeze()` producing the
//! immutable read view a snapshot stays bound to.

use crate::builtin::FIRST_USER_ID;
use crate::error::{Result, SchemaError};
use crate::model::{DbInfo, TableInfo};
use im::HashMap;
use parking_lot::RwLock;
use std::sync::Arc;

pub trait Meta: Send + Sync {
    fn get_database(&self, id: i64) -> Result<Option<Arc<DbInfo>>>;
    fn list_databases(&self) -> Result<Vec<Arc<DbInfo>>>;
    fn get_table(&self, db_id: i64, table_id: i64) -> Result<Option<Arc<TableInfo>>>;
    fn list_tables(&self, db_id: i64) -> Result<Vec<Arc<TableInfo>>>;
    /// Monotonic id allocator. Writer-side concern; read snapshots reject it.
    fn gen_global_id(&self) -> Result<i64>;
}

#[derive(Debug, Clone)]
struct MetaCore {
    dbs: HashMap<i64, Arc<DbInfo>>,
    tables: HashMap<i64, HashMap<i64, Arc<TableInfo>>>,
    next_global_id: i64,
}

impl Default for MetaCore {
    fn default() -> Self {
        Self {
            dbs: HashMap::new(),
            tables: HashMap::new(),
            next_global_id: FIRST_USER_ID,
        }
    }
}

/// In-memory catalog store behind the [`Meta`] facade.
#[derive(Debug, Default)]
pub struct MemMeta {
    core: RwLock<MetaCore>,
}

impl MemMeta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_database(&self, db: DbInfo) -> Result<()> {
        let mut core = self.core.write();
        if core.dbs.contains_key(&db.id) {
            return Err(SchemaError::DatabaseExists {
                db: db.name.original().to_string(),
            });
        }
        core.tables.insert(db.id, HashMap::new());
        core.dbs.insert(db.id, Arc::new(db));
        Ok(())
    }

    pub fn drop_database(&self, id: i64) -> bool {
        let mut core = self.core.write();
        core.tables.remove(&id);
        core.dbs.remove(&id).is_some()
    }

    pub fn create_table(&self, db_id: i64, table: TableInfo) -> Result<()> {
        table.validate()?;
        let mut core = self.core.write();
        let db = core
            .dbs
            .get(&db_id)
            .cloned()
            .ok_or_else(|| SchemaError::database_not_exists_by_id(db_id))?;
        let table_id = table.id;
        let tables = core.tables.entry(db_id).or_default();
        if tables.contains_key(&table_id) {
            return Err(SchemaError::table_exists(table.name.original()));
        }
        tables.insert(table_id, Arc::new(table));
        let mut db = (*db).clone();
        if !db.table_ids.contains(&table_id) {
            db.table_ids.push(table_id);
        }
        core.dbs.insert(db_id, Arc::new(db));
        Ok(())
    }

    /// Replaces a table body in place, inserting it if absent.
    pub fn update_table(&self, db_id: i64, table: TableInfo) -> Result<()> {
        table.validate()?;
        let mut core = self.core.write();
        let db = core
            .dbs
            .get(&db_id)
            .cloned()
            .ok_or_else(|| SchemaError::database_not_exists_by_id(db_id))?;
        let table_id = table.id;
        core.tables
            .entry(db_id)
            .or_default()
            .insert(table_id, Arc::new(table));
        if !db.table_ids.contains(&table_id) {
            let mut db = (*db).clone();
            db.table_ids.push(table_id);
            core.dbs.insert(db_id, Arc::new(db));
        }
        Ok(())
    }

    pub fn drop_table(&self, db_id: i64, table_id: i64) -> bool {
        let mut core = self.core.write();
        let removed = core
            .tables
            .get_mut(&db_id)
            .and_then(|tables| tables.remove(&table_id))
            .is_some();
        if removed {
            if let Some(db) = core.dbs.get(&db_id).cloned() {
                let mut db = (*db).clone();
                db.table_ids.retain(|id| *id != table_id);
                core.dbs.insert(db_id, Arc::new(db));
            }
        }
        removed
    }

    /// Immutable read view at the current state. Cheap: the underlying maps
    /// are persistent, so this is a handful of pointer copies.
    pub fn freeze(&self) -> MetaSnapshot {
        let core = self.core.read();
        MetaSnapshot {
            dbs: core.dbs.clone(),
            tables: core.tables.clone(),
        }
    }
}

impl Meta for MemMeta {
    fn get_database(&self, id: i64) -> Result<Option<Arc<DbInfo>>> {
        Ok(self.core.read().dbs.get(&id).cloned())
    }

    fn list_databases(&self) -> Result<Vec<Arc<DbInfo>>> {
        let core = self.core.read();
        let mut dbs: Vec<_> = core.dbs.values().cloned().collect();
        dbs.sort_by_key(|db| db.id);
        Ok(dbs)
    }

    fn get_table(&self, db_id: i64, table_id: i64) -> Result<Option<Arc<TableInfo>>> {
        Ok(self
            .core
            .read()
            .tables
            .get(&db_id)
            .and_then(|tables| tables.get(&table_id))
            .cloned())
    }

    fn list_tables(&self, db_id: i64) -> Result<Vec<Arc<TableInfo>>> {
        let core = self.core.read();
        let mut tables: Vec<_> = core
            .tables
            .get(&db_id)
            .map(|tables| tables.values().cloned().collect())
            .unwrap_or_default();
        tables.sort_by_key(|table| table.id);
        Ok(tables)
    }

    fn gen_global_id(&self) -> Result<i64> {
        let mut core = self.core.write();
        let id = core.next_global_id;
        core.next_global_id += 1;
        Ok(id)
    }
}

/// Frozen [`Meta`] view bound to the state observed at `freeze()` time.
#[derive(Debug, Clone)]
pub struct MetaSnapshot {
    dbs: HashMap<i64, Arc<DbInfo>>,
    tables: HashMap<i64, HashMap<i64, Arc<TableInfo>>>,
}

impl Meta for MetaSnapshot {
    fn get_database(&self, id: i64) -> Result<Option<Arc<DbInfo>>> {
        Ok(self.dbs.get(&id).cloned())
    }

    fn list_databases(&self) -> Result<Vec<Arc<DbInfo>>> {
        let mut dbs: Vec<_> = self.dbs.values().cloned().collect();
        dbs.sort_by_key(|db| db.id);
        Ok(dbs)
    }

    fn get_table(&self, db_id: i64, table_id: i64) -> Result<Option<Arc<TableInfo>>> {
        Ok(self
            .tables
            .get(&db_id)
            .and_then(|tables| tables.get(&table_id))
            .cloned())
    }

    fn list_tables(&self, db_id: i64) -> Result<Vec<Arc<TableInfo>>> {
        let mut tables: Vec<_> = self
            .tables
            .get(&db_id)
            .map(|tables| tables.values().cloned().collect())
            .unwrap_or_default();
        tables.sort_by_key(|table| table.id);
        Ok(tables)
    }

    fn gen_global_id(&self) -> Result<i64> {
        Err(SchemaError::Meta(
            "gen_global_id is not available on a frozen meta view".to_string(),
        ))
    }
}
