//! Diff-kind coverage: every mutation the builder supports, plus the
//! guarantee that a failed apply leaves no partial state behind.

use infoschema::{
    Builder, CiStr, ColumnInfo, DbInfo, DiffKind, ErrorCode, FieldType, InfoSchema, InfoSchemaRef,
    MemMeta, Meta, SchemaConfig, SchemaDiff, SchemaState, TableInfo, TempTableKind,
};
use std::sync::Arc;

fn new_column(id: i64, name: &str, offset: usize) -> ColumnInfo {
    ColumnInfo {
        id,
        name: CiStr::new(name),
        offset,
        field_type: FieldType::Longlong,
        state: SchemaState::Public,
        comment: String::new(),
    }
}

fn new_table(id: i64, db_id: i64, name: &str) -> TableInfo {
    TableInfo {
        id,
        name: CiStr::new(name),
        db_id,
        state: SchemaState::Public,
        columns: vec![new_column(1, "a", 0)],
        indices: Vec::new(),
        partition: None,
        temp_kind: TempTableKind::None,
        is_view: false,
        is_sequence: false,
        placement_policy: None,
        comment: String::new(),
    }
}

struct Ctx {
    meta: Arc<MemMeta>,
    is: InfoSchemaRef,
}

impl Ctx {
    fn new() -> Self {
        let meta = Arc::new(MemMeta::new());
        let is = Builder::new(Arc::clone(&meta) as Arc<dyn Meta>, SchemaConfig::default())
            .expect("new builder")
            .init_with_db_infos(Vec::new(), Vec::new(), Vec::new(), 1)
            .expect("init")
            .build()
            .expect("build");
        Self { meta, is }
    }

    fn apply(&mut self, diff: SchemaDiff) {
        let mut builder =
            Builder::new(Arc::clone(&self.meta) as Arc<dyn Meta>, SchemaConfig::default())
                .expect("new builder")
                .init_with_old_info_schema(&self.is)
                .expect("init with old");
        builder
            .apply_diff(self.meta.as_ref(), &diff)
            .expect("apply diff");
        self.is = builder.build().expect("build");
    }

    fn create_schema(&mut self, name: &str) -> i64 {
        let db_id = self.meta.gen_global_id().expect("gen id");
        self.meta
            .create_database(DbInfo::new(db_id, name))
            .expect("create database");
        self.apply(SchemaDiff::new(DiffKind::CreateSchema { schema_id: db_id }));
        db_id
    }

    fn create_table(&mut self, db_id: i64, name: &str) -> i64 {
        let tbl_id = self.meta.gen_global_id().expect("gen id");
        self.meta
            .create_table(db_id, new_table(tbl_id, db_id, name))
            .expect("create table");
        self.apply(SchemaDiff::new(DiffKind::CreateTable {
            schema_id: db_id,
            table_id: tbl_id,
        }));
        tbl_id
    }
}

#[test]
fn create_and_drop_schema() {
    let mut ctx = Ctx::new();
    let db_id = ctx.create_schema("test");
    let schema = ctx.is.schema_by_id(db_id).expect("schema visible");
    assert_eq!(schema.name.original(), "test");

    ctx.meta.drop_database(db_id);
    ctx.apply(SchemaDiff::new(DiffKind::DropSchema { schema_id: db_id }));
    assert!(ctx.is.schema_by_id(db_id).is_none());
    assert!(!ctx.is.schema_exists(&CiStr::new("test")));

    // Dropping an absent schema is a no-op, not an error.
    ctx.apply(SchemaDiff::new(DiffKind::DropSchema { schema_id: db_id }));
}

#[test]
fn drop_schema_removes_its_tables() {
    let mut ctx = Ctx::new();
    let db_id = ctx.create_schema("test");
    let t1 = ctx.create_table(db_id, "t1");
    let t2 = ctx.create_table(db_id, "t2");
    assert!(ctx.is.table_by_id(t1).is_some());

    ctx.meta.drop_database(db_id);
    ctx.apply(SchemaDiff::new(DiffKind::DropSchema { schema_id: db_id }));
    assert!(ctx.is.table_by_id(t1).is_none());
    assert!(ctx.is.table_by_id(t2).is_none());
}

#[test]
fn create_and_drop_table() {
    let mut ctx = Ctx::new();
    let db_id = ctx.create_schema("test");
    let tbl_id = ctx.create_table(db_id, "t");

    let tbl = ctx.is.table_by_id(tbl_id).expect("table visible");
    assert_eq!(tbl.name.original(), "t");
    assert_eq!(
        ctx.is.schema_by_id(db_id).expect("schema").table_ids,
        vec![tbl_id]
    );

    ctx.meta.drop_table(db_id, tbl_id);
    ctx.apply(SchemaDiff::new(DiffKind::DropTable {
        schema_id: db_id,
        table_id: tbl_id,
    }));
    assert!(ctx.is.table_by_id(tbl_id).is_none());
    assert!(ctx.is.schema_by_id(db_id).expect("schema").table_ids.is_empty());

    // Dropping again is a no-op.
    ctx.apply(SchemaDiff::new(DiffKind::DropTable {
        schema_id: db_id,
        table_id: tbl_id,
    }));
}

#[test]
fn add_and_modify_column_refresh_the_body() {
    let mut ctx = Ctx::new();
    let db_id = ctx.create_schema("test");
    let tbl_id = ctx.create_table(db_id, "t");

    let mut body = new_table(tbl_id, db_id, "t");
    body.columns.push(new_column(2, "b", 1));
    ctx.meta.update_table(db_id, body).expect("update table");
    ctx.apply(SchemaDiff::new(DiffKind::AddColumn {
        schema_id: db_id,
        table_id: tbl_id,
    }));
    assert_eq!(ctx.is.table_by_id(tbl_id).expect("table").columns.len(), 2);

    let mut body = new_table(tbl_id, db_id, "t");
    body.columns.push(new_column(2, "b", 1));
    body.columns[0].comment = "test".to_string();
    ctx.meta.update_table(db_id, body).expect("update table");
    ctx.apply(SchemaDiff::new(DiffKind::ModifyColumn {
        schema_id: db_id,
        table_id: tbl_id,
    }));
    assert_eq!(
        ctx.is.table_by_id(tbl_id).expect("table").columns[0].comment,
        "test"
    );
}

#[test]
fn truncate_swaps_table_ids() {
    let mut ctx = Ctx::new();
    let db_id = ctx.create_schema("test");
    let old_id = ctx.create_table(db_id, "t");

    let new_id = ctx.meta.gen_global_id().expect("gen id");
    ctx.meta.drop_table(db_id, old_id);
    ctx.meta
        .create_table(db_id, new_table(new_id, db_id, "t"))
        .expect("create table");
    ctx.apply(SchemaDiff::new(DiffKind::TruncateTable {
        schema_id: db_id,
        table_id: new_id,
        old_table_id: old_id,
    }));

    assert!(ctx.is.table_by_id(old_id).is_none());
    assert_eq!(
        ctx.is
            .table_by_name(&CiStr::new("test"), &CiStr::new("t"))
            .expect("table resolves")
            .id,
        new_id
    );
}

#[test]
fn exchange_partition_refreshes_both_sides() {
    let mut ctx = Ctx::new();
    let db_id = ctx.create_schema("test");
    let t1 = ctx.create_table(db_id, "t1");
    let t2 = ctx.create_table(db_id, "t2");

    let mut body = new_table(t1, db_id, "t1");
    body.comment = "exchanged".to_string();
    ctx.meta.update_table(db_id, body).expect("update t1");
    let mut body = new_table(t2, db_id, "t2");
    body.comment = "exchanged".to_string();
    ctx.meta.update_table(db_id, body).expect("update t2");

    ctx.apply(
        SchemaDiff::new(DiffKind::ExchangeTablePartition {
            schema_id: db_id,
            table_id: t1,
            old_schema_id: db_id,
            old_table_id: t2,
        })
        .with_affected(vec![SchemaDiff::new(DiffKind::ModifyColumn {
            schema_id: db_id,
            table_id: t2,
        })]),
    );

    assert_eq!(ctx.is.table_by_id(t1).expect("t1").comment, "exchanged");
    assert_eq!(ctx.is.table_by_id(t2).expect("t2").comment, "exchanged");
}

#[test]
fn failed_apply_leaves_builder_unchanged() {
    let ctx = {
        let mut ctx = Ctx::new();
        ctx.create_schema("test");
        ctx
    };
    let db_id = ctx
        .is
        .schema_by_name(&CiStr::new("test"))
        .expect("schema")
        .id;

    let mut builder =
        Builder::new(Arc::clone(&ctx.meta) as Arc<dyn Meta>, SchemaConfig::default())
            .expect("new builder")
            .init_with_old_info_schema(&ctx.is)
            .expect("init with old");

    let before_version = ctx.is.schema_meta_version();

    let err = builder
        .apply_diff(
            ctx.meta.as_ref(),
            &SchemaDiff::new(DiffKind::CreateSchema { schema_id: 999_999 }),
        )
        .expect_err("missing referent");
    assert_eq!(err.code(), ErrorCode::DatabaseNotExists);

    let err = builder
        .apply_diff(
            ctx.meta.as_ref(),
            &SchemaDiff::new(DiffKind::CreateTable {
                schema_id: db_id,
                table_id: 999_999,
            }),
        )
        .expect_err("missing referent");
    assert_eq!(err.code(), ErrorCode::TableNotExists);

    // A failed apply neither bumps the version nor leaves partial entries.
    let is = builder.build().expect("build");
    assert_eq!(is.schema_meta_version(), before_version);
    assert!(is.schema_by_id(999_999).is_none());
    assert!(is.table_by_id(999_999).is_none());
    assert_eq!(is.all_schemas().len(), 3);
}

#[test]
fn name_collision_within_db_is_rejected() {
    let mut ctx = Ctx::new();
    let db_id = ctx.create_schema("test");
    ctx.create_table(db_id, "t");

    // A second id committed under the same folded name.
    let dup_id = ctx.meta.gen_global_id().expect("gen id");
    ctx.meta
        .create_table(db_id, new_table(dup_id, db_id, "T"))
        .expect("create table");

    let mut builder =
        Builder::new(Arc::clone(&ctx.meta) as Arc<dyn Meta>, SchemaConfig::default())
            .expect("new builder")
            .init_with_old_info_schema(&ctx.is)
            .expect("init with old");
    let err = builder
        .apply_diff(
            ctx.meta.as_ref(),
            &SchemaDiff::new(DiffKind::CreateTable {
                schema_id: db_id,
                table_id: dup_id,
            }),
        )
        .expect_err("folded-name collision");
    assert_eq!(err.code(), ErrorCode::TableExists);
}

#[test]
fn malformed_diff_is_rejected() {
    let mut ctx = Ctx::new();
    let db_id = ctx.create_schema("test");

    let mut builder =
        Builder::new(Arc::clone(&ctx.meta) as Arc<dyn Meta>, SchemaConfig::default())
            .expect("new builder")
            .init_with_old_info_schema(&ctx.is)
            .expect("init with old");
    let err = builder
        .apply_diff(
            ctx.meta.as_ref(),
            &SchemaDiff::new(DiffKind::CreateTable {
                schema_id: db_id,
                table_id: 0,
            }),
        )
        .expect_err("unset id");
    assert_eq!(err.code(), ErrorCode::InvalidDiff);
}

#[test]
fn versions_are_monotonic_across_builds() {
    let mut ctx = Ctx::new();
    let mut last = ctx.is.schema_meta_version();
    let db_id = ctx.create_schema("test");
    assert!(ctx.is.schema_meta_version() > last);
    last = ctx.is.schema_meta_version();
    ctx.create_table(db_id, "t1");
    assert!(ctx.is.schema_meta_version() > last);
    last = ctx.is.schema_meta_version();
    ctx.create_table(db_id, "t2");
    assert!(ctx.is.schema_meta_version() > last);
}

#[test]
fn builder_modes_are_mutually_exclusive() {
    let meta = Arc::new(MemMeta::new());
    let is = Builder::new(Arc::clone(&meta) as Arc<dyn Meta>, SchemaConfig::default())
        .expect("new builder")
        .init_with_db_infos(Vec::new(), Vec::new(), Vec::new(), 0)
        .expect("init")
        .build()
        .expect("build");

    let builder = Builder::new(Arc::clone(&meta) as Arc<dyn Meta>, SchemaConfig::default())
        .expect("new builder")
        .init_with_old_info_schema(&is)
        .expect("first init");
    assert!(builder
        .init_with_db_infos(Vec::new(), Vec::new(), Vec::new(), 0)
        .is_err());
}

#[test]
fn every_snapshot_invariant_holds_after_a_batch_of_diffs() {
    let mut ctx = Ctx::new();
    let db_id = ctx.create_schema("test");
    let other_db = ctx.create_schema("other");
    ctx.create_table(db_id, "t1");
    let t2 = ctx.create_table(db_id, "t2");
    ctx.create_table(other_db, "t1");

    // Invariant: reverse lookup agrees with the forward index.
    for schema in ctx.is.all_schemas() {
        assert!(ctx.is.schema_exists(&schema.name));
        for table_id in &schema.table_ids {
            let table = ctx.is.table_by_id(*table_id).expect("body present");
            let owner = ctx.is.schema_by_table(&table).expect("owner resolves");
            assert_eq!(owner.id, table.db_id);
        }
    }

    // Rename across databases.
    let mut body = new_table(t2, other_db, "t2_moved");
    body.db_id = other_db;
    ctx.meta.drop_table(db_id, t2);
    ctx.meta.create_table(other_db, body).expect("move table");
    ctx.apply(SchemaDiff::new(DiffKind::RenameTable {
        schema_id: other_db,
        table_id: t2,
        old_schema_id: db_id,
    }));

    assert!(ctx
        .is
        .table_by_name(&CiStr::new("other"), &CiStr::new("t2_moved"))
        .is_ok());
    assert!(ctx
        .is
        .table_by_name(&CiStr::new("test"), &CiStr::new("t2"))
        .is_err());
    let moved = ctx.is.table_by_id(t2).expect("moved body");
    assert_eq!(moved.db_id, other_db);
    assert_eq!(
        ctx.is.schema_by_table(&moved).expect("owner").id,
        other_db
    );
}
