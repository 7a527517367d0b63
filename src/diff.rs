//! Catalog change descriptions emitted by the DDL subsystem.

use crate::error::{Result, SchemaError};
use serde::{Deserialize, Serialize};

/// One catalog change. The set is closed: every kind carries exactly the ids
/// it needs, and payload bytes with an unknown tag fail decoding instead of
/// being ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffKind {
    CreateSchema {
        schema_id: i64,
    },
    DropSchema {
        schema_id: i64,
    },
    CreateTable {
        schema_id: i64,
        table_id: i64,
    },
    DropTable {
        schema_id: i64,
        table_id: i64,
    },
    RenameTable {
        schema_id: i64,
        table_id: i64,
        old_schema_id: i64,
    },
    TruncateTable {
        schema_id: i64,
        table_id: i64,
        old_table_id: i64,
    },
    AddColumn {
        schema_id: i64,
        table_id: i64,
    },
    ModifyColumn {
        schema_id: i64,
        table_id: i64,
    },
    DropColumn {
        schema_id: i64,
        table_id: i64,
    },
    AddIndex {
        schema_id: i64,
        table_id: i64,
    },
    DropIndex {
        schema_id: i64,
        table_id: i64,
    },
    AlterTablePlacement {
        schema_id: i64,
        table_id: i64,
    },
    ExchangeTablePartition {
        schema_id: i64,
        table_id: i64,
        old_schema_id: i64,
        old_table_id: i64,
    },
}

impl DiffKind {
    pub fn name(&self) -> &'static str {
        match self {
            DiffKind::CreateSchema { .. } => "create schema",
            DiffKind::DropSchema { .. } => "drop schema",
            DiffKind::CreateTable { .. } => "create table",
            DiffKind::DropTable { .. } => "drop table",
            DiffKind::RenameTable { .. } => "rename table",
            DiffKind::TruncateTable { .. } => "truncate table",
            DiffKind::AddColumn { .. } => "add column",
            DiffKind::ModifyColumn { .. } => "modify column",
            DiffKind::DropColumn { .. } => "drop column",
            DiffKind::AddIndex { .. } => "add index",
            DiffKind::DropIndex { .. } => "drop index",
            DiffKind::AlterTablePlacement { .. } => "alter table placement",
            DiffKind::ExchangeTablePartition { .. } => "exchange table partition",
        }
    }

    /// Rejects diffs whose required ids were never filled in by the emitter.
    pub fn validate(&self) -> Result<()> {
        let complete = match *self {
            DiffKind::CreateSchema { schema_id } | DiffKind::DropSchema { schema_id } => {
                schema_id > 0
            }
            DiffKind::CreateTable {
                schema_id,
                table_id,
            }
            | DiffKind::DropTable {
                schema_id,
                table_id,
            }
            | DiffKind::AddColumn {
                schema_id,
                table_id,
            }
            | DiffKind::ModifyColumn {
                schema_id,
                table_id,
            }
            | DiffKind::DropColumn {
                schema_id,
                table_id,
            }
            | DiffKind::AddIndex {
                schema_id,
                table_id,
            }
            | DiffKind::DropIndex {
                schema_id,
                table_id,
            }
            | DiffKind::AlterTablePlacement {
                schema_id,
                table_id,
            } => schema_id > 0 && table_id > 0,
            DiffKind::RenameTable {
                schema_id,
                table_id,
                old_schema_id,
            } => schema_id > 0 && table_id > 0 && old_schema_id > 0,
            DiffKind::TruncateTable {
                schema_id,
                table_id,
                old_table_id,
            } => schema_id > 0 && table_id > 0 && old_table_id > 0,
            DiffKind::ExchangeTablePartition {
                schema_id,
                table_id,
                old_schema_id,
                old_table_id,
            } => schema_id > 0 && table_id > 0 && old_schema_id > 0 && old_table_id > 0,
        };
        if !complete {
            return Err(SchemaError::invalid_diff(format!(
                "{} diff carries an unset id",
                self.name()
            )));
        }
        Ok(())
    }
}

/// A diff plus the chained diffs it drags along (e.g. the partner side of an
/// exchange-partition). Chained diffs are applied in order after the primary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDiff {
    pub kind: DiffKind,
    #[serde(default)]
    pub affected: Vec<SchemaDiff>,
}

impl SchemaDiff {
    pub fn new(kind: DiffKind) -> Self {
        Self {
            kind,
            affected: Vec::new(),
        }
    }

    pub fn with_affected(mut self, affected: Vec<SchemaDiff>) -> Self {
        self.affected = affected;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.kind.validate()?;
        for chained in &self.affected {
            chained.validate()?;
        }
        Ok(())
    }

    pub fn to_payload(&self) -> Result<Vec<u8>> {
        rmp_serde::to_vec(self).map_err(|e| SchemaError::invalid_diff(e.to_string()))
    }

    pub fn from_payload(bytes: &[u8]) -> Result<SchemaDiff> {
        let diff: SchemaDiff =
            rmp_serde::from_slice(bytes).map_err(|e| SchemaError::invalid_diff(e.to_string()))?;
        diff.validate()?;
        Ok(diff)
    }
}

impl From<DiffKind> for SchemaDiff {
    fn from(kind: DiffKind) -> Self {
        SchemaDiff::new(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::{DiffKind, SchemaDiff};
    use crate::error::ErrorCode;

    #[test]
    fn payload_roundtrip() {
        let diff = SchemaDiff::new(DiffKind::TruncateTable {
            schema_id: 1000,
            table_id: 1002,
            old_table_id: 1001,
        })
        .with_affected(vec![SchemaDiff::new(DiffKind::DropTable {
            schema_id: 1000,
            table_id: 1003,
        })]);
        let bytes = diff.to_payload().expect("encode");
        let decoded = SchemaDiff::from_payload(&bytes).expect("decode");
        assert_eq!(diff, decoded);
    }

    #[test]
    fn unknown_tag_is_rejected() {
        #[derive(serde::Serialize)]
        enum BogusKind {
            SplitTable { schema_id: i64 },
        }
        #[derive(serde::Serialize)]
        struct BogusDiff {
            kind: BogusKind,
            affected: Vec<()>,
        }
        let bytes = rmp_serde::to_vec(&BogusDiff {
            kind: BogusKind::SplitTable { schema_id: 1 },
            affected: vec![],
        })
        .expect("encode");
        let err = SchemaDiff::from_payload(&bytes).expect_err("unknown tag must fail");
        assert_eq!(err.code(), ErrorCode::InvalidDiff);
    }

    #[test]
    fn unset_ids_are_rejected() {
        let diff = SchemaDiff::new(DiffKind::CreateTable {
            schema_id: 1000,
            table_id: 0,
        });
        let err = diff.validate().expect_err("zero table id must fail");
        assert_eq!(err.code(), ErrorCode::InvalidDiff);
    }
}
