//! The synthesized `information_schema` / `metrics_schema` catalogs.

use infoschema::builtin::{self, FIRST_USER_ID};
use infoschema::{
    Builder, CiStr, ColumnInfo, FieldType, InfoSchema, InfoSchemaRef, MemMeta, Meta, SchemaConfig,
    SchemaState,
};
use std::sync::Arc;

fn empty_snapshot() -> InfoSchemaRef {
    let meta = Arc::new(MemMeta::new());
    Builder::new(meta as Arc<dyn Meta>, SchemaConfig::default())
        .expect("new builder")
        .init_with_db_infos(Vec::new(), Vec::new(), Vec::new(), 0)
        .expect("init")
        .build()
        .expect("build")
}

#[test]
fn every_fixed_table_resolves() {
    let is = empty_snapshot();
    let info_schema = CiStr::new("information_schema");

    let fixed_tables = [
        "SCHEMATA",
        "TABLES",
        "COLUMNS",
        "STATISTICS",
        "CHARACTER_SETS",
        "COLLATIONS",
        "FILES",
        "PROFILING",
        "PARTITIONS",
        "KEY_COLUMN_USAGE",
        "REFERENTIAL_CONSTRAINTS",
        "SESSION_VARIABLES",
        "PLUGINS",
        "TABLE_CONSTRAINTS",
        "TRIGGERS",
        "USER_PRIVILEGES",
        "ENGINES",
        "VIEWS",
        "ROUTINES",
        "SCHEMA_PRIVILEGES",
        "COLUMN_PRIVILEGES",
        "TABLE_PRIVILEGES",
        "PARAMETERS",
        "EVENTS",
        "GLOBAL_STATUS",
        "GLOBAL_VARIABLES",
        "SESSION_STATUS",
        "OPTIMIZER_TRACE",
        "TABLESPACES",
        "COLLATION_CHARACTER_SET_APPLICABILITY",
        "PROCESSLIST",
        "TIDB_TRX",
        "DEADLOCKS",
        "TRX_SUMMARY",
        "PLACEMENT_POLICIES",
        "RESOURCE_GROUPS",
        "VARIABLES_INFO",
    ];
    for name in fixed_tables {
        let table = is
            .table_by_name(&info_schema, &CiStr::new(name))
            .unwrap_or_else(|err| panic!("{name} must resolve: {err}"));
        assert!(!table.columns.is_empty(), "{name} carries columns");
    }
}

#[test]
fn builtin_schemas_exist_in_an_empty_snapshot() {
    let is = empty_snapshot();
    assert!(is.schema_exists(&CiStr::new("information_schema")));
    assert!(is.schema_exists(&CiStr::new("METRICS_SCHEMA")));
    assert_eq!(is.all_schemas().len(), 2);

    let up = is
        .table_by_name(&CiStr::new("metrics_schema"), &CiStr::new("up"))
        .expect("metrics_schema.up resolves");
    assert_eq!(up.columns.len(), 4);
}

#[test]
fn builtin_ids_stay_below_the_user_range() {
    let is = empty_snapshot();
    for schema in is.all_schemas() {
        assert!(schema.id < FIRST_USER_ID);
        for table_id in &schema.table_ids {
            assert!(*table_id < FIRST_USER_ID);
        }
    }

    // The allocator starts where the reserved range ends.
    let meta = MemMeta::new();
    assert!(meta.gen_global_id().expect("gen id") >= FIRST_USER_ID);
}

#[test]
fn create_table_like_renumbers_ids_from_one() {
    let is = empty_snapshot();

    // `create table vi like information_schema.variables_info`
    let source = is
        .table_by_name(&CiStr::new("information_schema"), &CiStr::new("variables_info"))
        .expect("source table");
    assert_eq!(source.columns.len(), 8);

    let mut copy = source.clone_with_fresh_ids(CiStr::new("vi"), 2_000, 1_500);
    for (pos, column) in copy.columns.iter().enumerate() {
        assert_eq!(column.id, pos as i64 + 1);
    }

    // `alter table vi add column c` allocates the next id in the copy's own
    // id space, independent of the source's ids.
    copy.columns.push(ColumnInfo {
        id: copy.columns.len() as i64 + 1,
        name: CiStr::new("c"),
        offset: copy.columns.len(),
        field_type: FieldType::Varchar(32),
        state: SchemaState::Public,
        comment: String::new(),
    });
    copy.validate().expect("copy stays valid");
    assert_eq!(copy.columns[8].name.original(), "c");
    assert_eq!(copy.columns[8].id, 9);

    // Same flow against a metrics_schema table.
    let source = is
        .table_by_name(&CiStr::new("metrics_schema"), &CiStr::new("up"))
        .expect("source table");
    let mut copy = source.clone_with_fresh_ids(CiStr::new("u"), 2_001, 1_500);
    copy.columns.push(ColumnInfo {
        id: copy.columns.len() as i64 + 1,
        name: CiStr::new("c"),
        offset: copy.columns.len(),
        field_type: FieldType::Varchar(32),
        state: SchemaState::Public,
        comment: String::new(),
    });
    assert_eq!(copy.columns[4].name.original(), "c");
    assert_eq!(copy.columns[4].id, 5);
}

#[test]
fn builtin_catalog_is_shared_across_snapshots() {
    let first = empty_snapshot();
    let second = empty_snapshot();
    let name = CiStr::new("information_schema");
    let a = first
        .table_by_name(&name, &CiStr::new("tables"))
        .expect("first");
    let b = second
        .table_by_name(&name, &CiStr::new("tables"))
        .expect("second");
    // One static catalog backs every snapshot.
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(builtin::builtin_schemas().len(), 2);
}
