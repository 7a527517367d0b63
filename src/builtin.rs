//! Synthesized read-only meta-schemas.
//!
//! Every snapshot exposes `information_schema` and `metrics_schema` with a
//! fixed table catalog, independent of DDL history. Their ids come from a
//! reserved low range that the global id allocator never hands out.

use crate::model::{ColumnInfo, DbInfo, FieldType, SchemaState, TableInfo, TempTableKind};
use crate::name::CiStr;
use once_cell::sync::Lazy;
use std::sync::Arc;

pub const INFORMATION_SCHEMA_NAME: &str = "information_schema";
pub const METRICS_SCHEMA_NAME: &str = "metrics_schema";

pub const INFORMATION_SCHEMA_DB_ID: i64 = 1;
pub const METRICS_SCHEMA_DB_ID: i64 = 64;

/// First id the global allocator may hand out; everything below is reserved
/// for the synthesized schemas.
pub const FIRST_USER_ID: i64 = 1_000;

pub fn is_reserved_id(id: i64) -> bool {
    (0..FIRST_USER_ID).contains(&id)
}

use crate::model::FieldType::{Datetime, Double, Json, Long, Longlong, Text, Timestamp, Varchar};

type ColumnSpec = (&'static str, FieldType);

const INFORMATION_SCHEMA_TABLES: &[(&str, &[ColumnSpec])] = &[
    (
        "SCHEMATA",
        &[
            ("CATALOG_NAME", Varchar(512)),
            ("SCHEMA_NAME", Varchar(64)),
            ("DEFAULT_CHARACTER_SET_NAME", Varchar(64)),
            ("DEFAULT_COLLATION_NAME", Varchar(32)),
            ("SQL_PATH", Varchar(512)),
        ],
    ),
    (
        "TABLES",
        &[
            ("TABLE_CATALOG", Varchar(512)),
            ("TABLE_SCHEMA", Varchar(64)),
            ("TABLE_NAME", Varchar(64)),
            ("TABLE_TYPE", Varchar(64)),
            ("ENGINE", Varchar(64)),
            ("TABLE_ROWS", Longlong),
            ("CREATE_TIME", Datetime),
            ("TABLE_COMMENT", Varchar(2048)),
        ],
    ),
    (
        "COLUMNS",
        &[
            ("TABLE_SCHEMA", Varchar(64)),
            ("TABLE_NAME", Varchar(64)),
            ("COLUMN_NAME", Varchar(64)),
            ("ORDINAL_POSITION", Longlong),
            ("COLUMN_DEFAULT", Text),
            ("IS_NULLABLE", Varchar(3)),
            ("DATA_TYPE", Varchar(64)),
            ("COLUMN_COMMENT", Varchar(1024)),
        ],
    ),
    (
        "STATISTICS",
        &[
            ("TABLE_SCHEMA", Varchar(64)),
            ("TABLE_NAME", Varchar(64)),
            ("NON_UNIQUE", Varchar(1)),
            ("INDEX_NAME", Varchar(64)),
            ("SEQ_IN_INDEX", Longlong),
            ("COLUMN_NAME", Varchar(64)),
            ("CARDINALITY", Longlong),
        ],
    ),
    (
        "CHARACTER_SETS",
        &[
            ("CHARACTER_SET_NAME", Varchar(32)),
            ("DEFAULT_COLLATE_NAME", Varchar(32)),
            ("DESCRIPTION", Varchar(60)),
            ("MAXLEN", Longlong),
        ],
    ),
    (
        "COLLATIONS",
        &[
            ("COLLATION_NAME", Varchar(32)),
            ("CHARACTER_SET_NAME", Varchar(32)),
            ("ID", Longlong),
            ("IS_DEFAULT", Varchar(3)),
            ("IS_COMPILED", Varchar(3)),
            ("SORTLEN", Longlong),
        ],
    ),
    (
        "FILES",
        &[
            ("FILE_ID", Longlong),
            ("FILE_NAME", Varchar(4000)),
            ("FILE_TYPE", Varchar(20)),
            ("TABLESPACE_NAME", Varchar(64)),
            ("ENGINE", Varchar(64)),
        ],
    ),
    (
        "PROFILING",
        &[
            ("QUERY_ID", Long),
            ("SEQ", Long),
            ("STATE", Varchar(30)),
            ("DURATION", Double),
        ],
    ),
    (
        "PARTITIONS",
        &[
            ("TABLE_SCHEMA", Varchar(64)),
            ("TABLE_NAME", Varchar(64)),
            ("PARTITION_NAME", Varchar(64)),
            ("PARTITION_ORDINAL_POSITION", Longlong),
            ("PARTITION_METHOD", Varchar(18)),
            ("PARTITION_EXPRESSION", Text),
            ("TABLE_ROWS", Longlong),
        ],
    ),
    (
        "KEY_COLUMN_USAGE",
        &[
            ("CONSTRAINT_NAME", Varchar(64)),
            ("TABLE_SCHEMA", Varchar(64)),
            ("TABLE_NAME", Varchar(64)),
            ("COLUMN_NAME", Varchar(64)),
            ("ORDINAL_POSITION", Longlong),
        ],
    ),
    (
        "REFERENTIAL_CONSTRAINTS",
        &[
            ("CONSTRAINT_NAME", Varchar(64)),
            ("UNIQUE_CONSTRAINT_NAME", Varchar(64)),
            ("TABLE_NAME", Varchar(64)),
            ("REFERENCED_TABLE_NAME", Varchar(64)),
        ],
    ),
    (
        "SESSION_VARIABLES",
        &[
            ("VARIABLE_NAME", Varchar(64)),
            ("VARIABLE_VALUE", Varchar(1024)),
        ],
    ),
    (
        "PLUGINS",
        &[
            ("PLUGIN_NAME", Varchar(64)),
            ("PLUGIN_VERSION", Varchar(20)),
            ("PLUGIN_STATUS", Varchar(10)),
            ("PLUGIN_TYPE", Varchar(80)),
        ],
    ),
    (
        "TABLE_CONSTRAINTS",
        &[
            ("CONSTRAINT_NAME", Varchar(64)),
            ("TABLE_SCHEMA", Varchar(64)),
            ("TABLE_NAME", Varchar(64)),
            ("CONSTRAINT_TYPE", Varchar(64)),
        ],
    ),
    (
        "TRIGGERS",
        &[
            ("TRIGGER_NAME", Varchar(64)),
            ("EVENT_MANIPULATION", Varchar(6)),
            ("EVENT_OBJECT_TABLE", Varchar(64)),
            ("ACTION_TIMING", Varchar(6)),
        ],
    ),
    (
        "USER_PRIVILEGES",
        &[
            ("GRANTEE", Varchar(81)),
            ("TABLE_CATALOG", Varchar(512)),
            ("PRIVILEGE_TYPE", Varchar(64)),
            ("IS_GRANTABLE", Varchar(3)),
        ],
    ),
    (
        "ENGINES",
        &[
            ("ENGINE", Varchar(64)),
            ("SUPPORT", Varchar(8)),
            ("COMMENT", Varchar(80)),
        ],
    ),
    (
        "VIEWS",
        &[
            ("TABLE_SCHEMA", Varchar(64)),
            ("TABLE_NAME", Varchar(64)),
            ("VIEW_DEFINITION", Text),
            ("CHECK_OPTION", Varchar(8)),
            ("IS_UPDATABLE", Varchar(3)),
        ],
    ),
    (
        "ROUTINES",
        &[
            ("ROUTINE_SCHEMA", Varchar(64)),
            ("ROUTINE_NAME", Varchar(64)),
            ("ROUTINE_TYPE", Varchar(9)),
            ("DATA_TYPE", Varchar(64)),
            ("ROUTINE_DEFINITION", Text),
        ],
    ),
    (
        "SCHEMA_PRIVILEGES",
        &[
            ("GRANTEE", Varchar(81)),
            ("TABLE_SCHEMA", Varchar(64)),
            ("PRIVILEGE_TYPE", Varchar(64)),
            ("IS_GRANTABLE", Varchar(3)),
        ],
    ),
    (
        "COLUMN_PRIVILEGES",
        &[
            ("GRANTEE", Varchar(81)),
            ("TABLE_SCHEMA", Varchar(64)),
            ("TABLE_NAME", Varchar(64)),
            ("COLUMN_NAME", Varchar(64)),
            ("PRIVILEGE_TYPE", Varchar(64)),
        ],
    ),
    (
        "TABLE_PRIVILEGES",
        &[
            ("GRANTEE", Varchar(81)),
            ("TABLE_SCHEMA", Varchar(64)),
            ("TABLE_NAME", Varchar(64)),
            ("PRIVILEGE_TYPE", Varchar(64)),
        ],
    ),
    (
        "PARAMETERS",
        &[
            ("SPECIFIC_SCHEMA", Varchar(64)),
            ("SPECIFIC_NAME", Varchar(64)),
            ("ORDINAL_POSITION", Longlong),
            ("PARAMETER_NAME", Varchar(64)),
            ("DATA_TYPE", Varchar(64)),
        ],
    ),
    (
        "EVENTS",
        &[
            ("EVENT_SCHEMA", Varchar(64)),
            ("EVENT_NAME", Varchar(64)),
            ("DEFINER", Varchar(77)),
            ("EVENT_TYPE", Varchar(9)),
            ("STATUS", Varchar(18)),
        ],
    ),
    (
        "GLOBAL_STATUS",
        &[
            ("VARIABLE_NAME", Varchar(64)),
            ("VARIABLE_VALUE", Varchar(1024)),
        ],
    ),
    (
        "GLOBAL_VARIABLES",
        &[
            ("VARIABLE_NAME", Varchar(64)),
            ("VARIABLE_VALUE", Varchar(1024)),
        ],
    ),
    (
        "SESSION_STATUS",
        &[
            ("VARIABLE_NAME", Varchar(64)),
            ("VARIABLE_VALUE", Varchar(1024)),
        ],
    ),
    (
        "OPTIMIZER_TRACE",
        &[
            ("QUERY", Text),
            ("TRACE", Json),
            ("INSUFFICIENT_PRIVILEGES", Varchar(1)),
        ],
    ),
    (
        "TABLESPACES",
        &[
            ("TABLESPACE_NAME", Varchar(64)),
            ("ENGINE", Varchar(64)),
            ("TABLESPACE_TYPE", Varchar(64)),
        ],
    ),
    (
        "COLLATION_CHARACTER_SET_APPLICABILITY",
        &[
            ("COLLATION_NAME", Varchar(32)),
            ("CHARACTER_SET_NAME", Varchar(32)),
        ],
    ),
    (
        "PROCESSLIST",
        &[
            ("ID", Longlong),
            ("USER", Varchar(32)),
            ("HOST", Varchar(64)),
            ("DB", Varchar(64)),
            ("COMMAND", Varchar(16)),
            ("TIME", Long),
            ("STATE", Varchar(7)),
            ("INFO", Text),
        ],
    ),
    (
        "TIDB_TRX",
        &[
            ("ID", Longlong),
            ("START_TIME", Timestamp),
            ("CURRENT_SQL_DIGEST", Varchar(64)),
            ("STATE", Varchar(20)),
            ("MEM_BUFFER_KEYS", Longlong),
            ("MEM_BUFFER_BYTES", Longlong),
            ("SESSION_ID", Longlong),
            ("USER", Varchar(16)),
            ("DB", Varchar(64)),
        ],
    ),
    (
        "DEADLOCKS",
        &[
            ("DEADLOCK_ID", Longlong),
            ("OCCUR_TIME", Timestamp),
            ("TRY_LOCK_TRX_ID", Longlong),
            ("KEY", Text),
            ("TRX_HOLDING_LOCK", Longlong),
        ],
    ),
    (
        "TRX_SUMMARY",
        &[("DIGEST", Varchar(16)), ("ALL_SQL_DIGESTS", Text)],
    ),
    (
        "PLACEMENT_POLICIES",
        &[
            ("POLICY_ID", Longlong),
            ("POLICY_NAME", Varchar(64)),
            ("PRIMARY_REGION", Varchar(1024)),
            ("REGIONS", Varchar(1024)),
            ("FOLLOWERS", Longlong),
            ("LEARNERS", Longlong),
        ],
    ),
    (
        "RESOURCE_GROUPS",
        &[
            ("NAME", Varchar(32)),
            ("RU_PER_SEC", Longlong),
            ("BURSTABLE", Varchar(3)),
        ],
    ),
    (
        "VARIABLES_INFO",
        &[
            ("VARIABLE_NAME", Varchar(64)),
            ("VARIABLE_SCOPE", Varchar(64)),
            ("DEFAULT_VALUE", Varchar(1024)),
            ("CURRENT_VALUE", Varchar(1024)),
            ("MIN_VALUE", Varchar(64)),
            ("MAX_VALUE", Varchar(64)),
            ("POSSIBLE_VALUES", Varchar(256)),
            ("IS_NOOP", Varchar(3)),
        ],
    ),
];

const METRICS_SCHEMA_TABLES: &[(&str, &[ColumnSpec])] = &[
    (
        "up",
        &[
            ("time", Datetime),
            ("instance", Varchar(64)),
            ("job", Varchar(64)),
            ("value", Double),
        ],
    ),
    (
        "uptime",
        &[
            ("time", Datetime),
            ("instance", Varchar(64)),
            ("value", Double),
        ],
    ),
    (
        "query_duration",
        &[
            ("time", Datetime),
            ("instance", Varchar(64)),
            ("sql_type", Varchar(64)),
            ("quantile", Double),
            ("value", Double),
        ],
    ),
    (
        "connection_count",
        &[
            ("time", Datetime),
            ("instance", Varchar(64)),
            ("value", Double),
        ],
    ),
];

fn synthesize_table(id: i64, db_id: i64, name: &str, columns: &[ColumnSpec]) -> TableInfo {
    TableInfo {
        id,
        name: CiStr::new(name),
        db_id,
        state: SchemaState::Public,
        columns: columns
            .iter()
            .enumerate()
            .map(|(offset, (col_name, field_type))| ColumnInfo {
                id: offset as i64 + 1,
                name: CiStr::new(*col_name),
                offset,
                field_type: *field_type,
                state: SchemaState::Public,
                comment: String::new(),
            })
            .collect(),
        indices: Vec::new(),
        partition: None,
        temp_kind: TempTableKind::None,
        is_view: false,
        is_sequence: false,
        placement_policy: None,
        comment: String::new(),
    }
}

fn synthesize_schema(
    db_id: i64,
    db_name: &str,
    specs: &[(&str, &[ColumnSpec])],
) -> (Arc<DbInfo>, Vec<Arc<TableInfo>>) {
    let tables: Vec<Arc<TableInfo>> = specs
        .iter()
        .enumerate()
        .map(|(pos, (name, columns))| {
            Arc::new(synthesize_table(db_id + pos as i64 + 1, db_id, name, columns))
        })
        .collect();
    let db = Arc::new(DbInfo {
        id: db_id,
        name: CiStr::new(db_name),
        state: SchemaState::Public,
        table_ids: tables.iter().map(|table| table.id).collect(),
    });
    (db, tables)
}

pub struct BuiltinSchema {
    pub db: Arc<DbInfo>,
    pub tables: Vec<Arc<TableInfo>>,
}

static BUILTIN_SCHEMAS: Lazy<Vec<BuiltinSchema>> = Lazy::new(|| {
    let (info_db, info_tables) = synthesize_schema(
        INFORMATION_SCHEMA_DB_ID,
        INFORMATION_SCHEMA_NAME,
        INFORMATION_SCHEMA_TABLES,
    );
    let (metrics_db, metrics_tables) = synthesize_schema(
        METRICS_SCHEMA_DB_ID,
        METRICS_SCHEMA_NAME,
        METRICS_SCHEMA_TABLES,
    );
    vec![
        BuiltinSchema {
            db: info_db,
            tables: info_tables,
        },
        BuiltinSchema {
            db: metrics_db,
            tables: metrics_tables,
        },
    ]
});

/// The two synthesized databases injected into every snapshot.
pub fn builtin_schemas() -> &'static [BuiltinSchema] {
    &BUILTIN_SCHEMAS
}

static BUILTIN_TABLES_BY_ID: Lazy<std::collections::HashMap<i64, Arc<TableInfo>>> =
    Lazy::new(|| {
        builtin_schemas()
            .iter()
            .flat_map(|schema| schema.tables.iter())
            .map(|table| (table.id, Arc::clone(table)))
            .collect()
    });

/// Body of a synthesized table by its reserved id.
pub fn builtin_table_by_id(id: i64) -> Option<Arc<TableInfo>> {
    BUILTIN_TABLES_BY_ID.get(&id).cloned()
}
