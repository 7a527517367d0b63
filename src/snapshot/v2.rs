//! Bounded-cache snapshot: name indices are fully materialized, table bodies
//! live in a byte-budgeted LRU backed by the snapshot-bound meta facade.

use super::index::SchemaIndex;
use super::InfoSchema;
use crate::builtin;
use crate::config::SchemaConfig;
use crate::error::{Result, SchemaError};
use crate::meta::Meta;
use crate::model::{DbInfo, PolicyInfo, ResourceGroupInfo, TableInfo};
use crate::name::CiStr;
use crate::placement::Bundle;
use lru::LruCache;
use parking_lot::Mutex;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::warn;

struct CacheShard {
    lru: LruCache<i64, Arc<TableInfo>>,
    bytes: usize,
}

/// Sharded LRU over table descriptor bodies. Entries are `Arc`s, so eviction
/// never invalidates a reference a reader still holds.
struct TableCache {
    shards: Box<[Mutex<CacheShard>]>,
    shard_budget: usize,
}

impl TableCache {
    fn new(total_bytes: u64, shards: usize) -> Self {
        let shard_budget = (total_bytes as usize / shards).max(1);
        let shards = (0..shards)
            .map(|_| {
                Mutex::new(CacheShard {
                    lru: LruCache::unbounded(),
                    bytes: 0,
                })
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            shards,
            shard_budget,
        }
    }

    fn shard_for(&self, id: i64) -> &Mutex<CacheShard> {
        let mut hasher = DefaultHasher::new();
        id.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % self.shards.len()]
    }

    fn get(&self, id: i64) -> Option<Arc<TableInfo>> {
        self.shard_for(id).lock().lru.get(&id).cloned()
    }

    fn put(&self, table: Arc<TableInfo>) {
        let size = table.approx_mem_size();
        let mut shard = self.shard_for(table.id).lock();
        if let Some(old) = shard.lru.put(table.id, table) {
            shard.bytes = shard.bytes.saturating_sub(old.approx_mem_size());
        }
        shard.bytes += size;
        // A single oversized descriptor is allowed to stay resident; anything
        // beyond it is evicted least-recently-used first.
        while shard.bytes > self.shard_budget && shard.lru.len() > 1 {
            if let Some((_, evicted)) = shard.lru.pop_lru() {
                shard.bytes = shard.bytes.saturating_sub(evicted.approx_mem_size());
            } else {
                break;
            }
        }
    }

    fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.lock().lru.len()).sum()
    }
}

pub struct InfoSchemaV2 {
    index: SchemaIndex,
    cache: TableCache,
    meta: Arc<dyn Meta>,
}

impl InfoSchemaV2 {
    pub(crate) fn new(
        index: SchemaIndex,
        meta: Arc<dyn Meta>,
        config: &SchemaConfig,
        seed: impl IntoIterator<Item = Arc<TableInfo>>,
    ) -> Self {
        let cache = TableCache::new(config.schema_cache_size, config.cache_shards);
        for table in seed {
            if !builtin::is_reserved_id(table.id) {
                cache.put(table);
            }
        }
        Self { index, cache, meta }
    }

    pub fn built_at(&self) -> SystemTime {
        self.index.built_at
    }

    /// Number of descriptor bodies currently resident in the cache.
    pub fn cached_table_count(&self) -> usize {
        self.cache.len()
    }

    pub(crate) fn index(&self) -> &SchemaIndex {
        &self.index
    }

    /// Resolves a table body that the name index says is visible: synthesized
    /// catalog first, then the cache, then the meta facade bound to this
    /// snapshot's read view.
    fn fetch(&self, schema_id: i64, table_id: i64) -> Result<Arc<TableInfo>> {
        if builtin::is_reserved_id(table_id) {
            if let Some(table) = builtin::builtin_table_by_id(table_id) {
                return Ok(table);
            }
        }
        if let Some(table) = self.cache.get(table_id) {
            return Ok(table);
        }
        let table = self
            .meta
            .get_table(schema_id, table_id)?
            .ok_or_else(|| SchemaError::table_not_exists_by_id(schema_id, table_id))?;
        self.cache.put(table.clone());
        Ok(table)
    }
}

impl InfoSchema for InfoSchemaV2 {
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
            .filter_map(|id| match self.fetch(db.id, *id) {
                Ok(table) => Some(table),
                Err(err) => {
                    warn!(table_id = *id, %err, "failed to load table body for schema listing");
                    None
                }
            })
            .collect()
    }

    fn table_by_name(&self, schema: &CiStr, table: &CiStr) -> Result<Arc<TableInfo>> {
        let not_exists =
            || SchemaError::table_not_exists(schema.original(), table.original());
        let id = self.index.table_id_by_name(schema, table).ok_or_else(not_exists)?;
        let schema_id = self
            .index
            .table_refs
            .get(&id)
            .map(|r| r.schema_id)
            .ok_or_else(not_exists)?;
        match self.fetch(schema_id, id) {
            Ok(body) => Ok(body),
            Err(SchemaError::TableNotExists { .. }) => Err(not_exists()),
            Err(err) => Err(err),
        }
    }

    fn table_by_id(&self, id: i64) -> Option<Arc<TableInfo>> {
        let schema_id = self.index.table_refs.get(&id)?.schema_id;
        match self.fetch(schema_id, id) {
            Ok(table) => Some(table),
            Err(err) => {
                warn!(table_id = id, %err, "failed to load table body");
                None
            }
        }
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

    fn is_v2(&self) -> bool {
        true
    }
}
