use crate::error::{Result, SchemaError};

/// Construction-time configuration for one Builder.
///
/// Injected once per Builder rather than read from ambient process state, so
/// snapshots are reproducible in tests regardless of what a live server does
/// with its knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaConfig {
    /// Byte budget for lazily cached table descriptors. Zero selects the
    /// fully materialized (v1) snapshot representation; any positive value
    /// selects the bounded-cache (v2) representation with this budget.
    pub schema_cache_size: u64,
    /// Shard count for the v2 descriptor cache. The byte budget is split
    /// evenly across shards.
    pub cache_shards: usize,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            schema_cache_size: 0,
            cache_shards: 16,
        }
    }
}

impl SchemaConfig {
    pub fn with_cache_size(mut self, bytes: u64) -> Self {
        self.schema_cache_size = bytes;
        self
    }

    pub fn with_cache_shards(mut self, shards: usize) -> Self {
        self.cache_shards = shards;
        self
    }

    pub fn v2_enabled(&self) -> bool {
        self.schema_cache_size > 0
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache_shards == 0 {
            return Err(SchemaError::InvalidConfig {
                message: "cache_shards must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
