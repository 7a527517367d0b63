//! In-memory catalog snapshot engine.
//!
//! The engine turns catalog state read through a [`Meta`] facade into
//! immutable, versioned snapshots that the query path consults without
//! synchronization. Snapshots are built either from a full list of database
//! descriptors or incrementally, by applying [`SchemaDiff`]s against a prior
//! snapshot with structural sharing of the untouched indices.
//!
//! Two physical representations coexist behind the [`InfoSchema`] query
//! trait: an eager one holding every descriptor body (v1) and a bounded-cache
//! one backed by the facade (v2), selected by
//! [`SchemaConfig::schema_cache_size`]. Per-session temporary tables layer on
//! top through [`SessionExtendedInfoSchema`].

pub mod builder;
pub mod builtin;
pub mod config;
pub mod diff;
pub mod error;
pub mod meta;
pub mod model;
pub mod name;
pub mod placement;
pub mod session;
pub mod snapshot;

pub use builder::Builder;
pub use config::SchemaConfig;
pub use diff::{DiffKind, SchemaDiff};
pub use error::{ErrorCode, Result, SchemaError};
pub use meta::{MemMeta, Meta, MetaSnapshot};
pub use model::{
    ColumnInfo, DbInfo, FieldType, IndexColumn, IndexInfo, PartitionDefinition, PartitionInfo,
    PlacementSettings, PolicyInfo, PolicyRef, ResourceGroupInfo, ResourceGroupSettings,
    SchemaState, TableInfo, TempTableKind,
};
pub use name::CiStr;
pub use placement::{Bundle, PeerRole, PlacementRule};
pub use session::{SessionExtendedInfoSchema, SessionTables};
pub use snapshot::{
    table_is_sequence, table_is_view, InfoSchema, InfoSchemaRef, InfoSchemaV1, InfoSchemaV2,
};

use std::sync::Arc;

/// True when the snapshot uses the bounded-cache representation.
pub fn is_v2(is: &dyn InfoSchema) -> bool {
    is.is_v2()
}

/// Builds a throwaway v1 snapshot holding the given tables under a single
/// database. Intended for tests and tools that need an `InfoSchema` without a
/// real catalog store behind it.
pub fn mock_info_schema(
    db_name: &str,
    db_id: i64,
    tables: Vec<TableInfo>,
) -> Result<InfoSchemaRef> {
    let meta = Arc::new(MemMeta::new());
    meta.create_database(DbInfo::new(db_id, db_name))?;
    for table in tables {
        meta.create_table(db_id, table)?;
    }
    let db = meta
        .get_database(db_id)?
        .ok_or_else(|| SchemaError::database_not_exists_by_id(db_id))?;
    Builder::new(meta, SchemaConfig::default())?
        .init_with_db_infos(vec![db], Vec::new(), Vec::new(), 0)?
        .build()
}
