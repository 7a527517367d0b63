//! Descriptor value types for catalog objects.
//!
//! These are plain values: a table does not point back at its database, and a
//! database carries table ids rather than table bodies. Both directions are
//! resolved through the snapshot's id-keyed maps, keeping the object graph a
//! tree.

use crate::error::{Result, SchemaError};
use crate::name::CiStr;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::mem;

/// Visibility state of a schema object during online DDL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemaState {
    #[default]
    None,
    DeleteOnly,
    WriteOnly,
    Public,
}

impl SchemaState {
    pub fn is_public(self) -> bool {
        matches!(self, SchemaState::Public)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TempTableKind {
    #[default]
    None,
    /// Schema globally visible, data session-scoped.
    Global,
    /// Schema visible only in the creating session; lives in the overlay.
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    Long,
    Longlong,
    Float,
    Double,
    Varchar(u32),
    Text,
    Blob,
    Timestamp,
    Datetime,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub id: i64,
    pub name: CiStr,
    /// Zero-based position within the owning table.
    pub offset: usize,
    pub field_type: FieldType,
    pub state: SchemaState,
    #[serde(default)]
    pub comment: String,
}

/// Index member, referencing a column by its offset in the owning table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexColumn {
    pub offset: usize,
    /// Prefix length in bytes; `None` indexes the whole value.
    pub length: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexInfo {
    pub id: i64,
    pub name: CiStr,
    pub columns: SmallVec<[IndexColumn; 4]>,
    pub unique: bool,
    pub primary: bool,
    pub state: SchemaState,
}

/// Reference from a table or partition to a placement policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRef {
    pub id: i64,
    pub name: CiStr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionDefinition {
    /// Physical table id, drawn from the same id space as table ids.
    pub id: i64,
    pub name: CiStr,
    pub less_than: Vec<String>,
    #[serde(default)]
    pub placement_policy: Option<PolicyRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionInfo {
    pub expr: String,
    pub definitions: Vec<PartitionDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    pub id: i64,
    pub name: CiStr,
    /// Owning database id.
    pub db_id: i64,
    pub state: SchemaState,
    pub columns: Vec<ColumnInfo>,
    pub indices: Vec<IndexInfo>,
    #[serde(default)]
    pub partition: Option<PartitionInfo>,
    #[serde(default)]
    pub temp_kind: TempTableKind,
    #[serde(default)]
    pub is_view: bool,
    #[serde(default)]
    pub is_sequence: bool,
    #[serde(default)]
    pub placement_policy: Option<PolicyRef>,
    #[serde(default)]
    pub comment: String,
}

impl TableInfo {
    pub fn is_global_temp(&self) -> bool {
        matches!(self.temp_kind, TempTableKind::Global)
    }

    pub fn is_local_temp(&self) -> bool {
        matches!(self.temp_kind, TempTableKind::Local)
    }

    /// Ids of the physical tables behind this descriptor: the table id itself
    /// plus one id per partition.
    pub fn physical_table_ids(&self) -> SmallVec<[i64; 4]> {
        let mut ids = SmallVec::new();
        ids.push(self.id);
        if let Some(partition) = &self.partition {
            ids.extend(partition.definitions.iter().map(|def| def.id));
        }
        ids
    }

    /// Checks the intra-descriptor invariants: column offsets form a
    /// contiguous `0..n` range and every index member resolves to a column.
    pub fn validate(&self) -> Result<()> {
        for (pos, column) in self.columns.iter().enumerate() {
            if column.offset != pos {
                return Err(SchemaError::Validation(format!(
                    "table '{}': column '{}' at position {pos} has offset {}",
                    self.name, column.name, column.offset
                )));
            }
        }
        for index in &self.indices {
            for member in &index.columns {
                if member.offset >= self.columns.len() {
                    return Err(SchemaError::Validation(format!(
                        "table '{}': index '{}' references column offset {} of {} columns",
                        self.name,
                        index.name,
                        member.offset,
                        self.columns.len()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Copy for `create table … like`: keeps the column list and index shape
    /// but renumbers column ids and index ids from 1 within the new table's
    /// own id space.
    pub fn clone_with_fresh_ids(&self, name: CiStr, table_id: i64, db_id: i64) -> TableInfo {
        let mut copy = self.clone();
        copy.name = name;
        copy.id = table_id;
        copy.db_id = db_id;
        copy.partition = None;
        copy.placement_policy = None;
        copy.temp_kind = TempTableKind::None;
        for (pos, column) in copy.columns.iter_mut().enumerate() {
            column.id = pos as i64 + 1;
        }
        for (pos, index) in copy.indices.iter_mut().enumerate() {
            index.id = pos as i64 + 1;
        }
        copy
    }

    /// Rough heap footprint of the descriptor, used for cache byte budgeting.
    /// Counts the struct, name buffers, and the column/index/partition bodies.
    pub fn approx_mem_size(&self) -> usize {
        let mut size = mem::size_of::<TableInfo>();
        size += self.name.o.len() + self.name.l.len();
        size += self.comment.len();
        for column in &self.columns {
            size += mem::size_of::<ColumnInfo>();
            size += column.name.o.len() + column.name.l.len() + column.comment.len();
        }
        for index in &self.indices {
            size += mem::size_of::<IndexInfo>();
            size += index.name.o.len() + index.name.l.len();
            size += index.columns.len() * mem::size_of::<IndexColumn>();
        }
        if let Some(partition) = &self.partition {
            size += partition.expr.len();
            for def in &partition.definitions {
                size += mem::size_of::<PartitionDefinition>();
                size += def.name.o.len() + def.name.l.len();
                size += def.less_than.iter().map(String::len).sum::<usize>();
            }
        }
        size
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbInfo {
    pub id: i64,
    pub name: CiStr,
    pub state: SchemaState,
    /// Ids of the tables owned by this database. Bodies live in the
    /// snapshot's id-keyed table map (v1) or behind the cache (v2).
    pub table_ids: Vec<i64>,
}

impl DbInfo {
    pub fn new(id: i64, name: impl Into<CiStr>) -> Self {
        Self {
            id,
            name: name.into(),
            state: SchemaState::Public,
            table_ids: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementSettings {
    #[serde(default)]
    pub primary_region: String,
    #[serde(default)]
    pub regions: Vec<String>,
    #[serde(default)]
    pub followers: u64,
    #[serde(default)]
    pub learners: u64,
    #[serde(default)]
    pub constraints: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyInfo {
    pub id: i64,
    pub name: CiStr,
    pub settings: PlacementSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGroupSettings {
    pub ru_per_sec: u64,
    #[serde(default)]
    pub burstable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGroupInfo {
    pub id: i64,
    pub name: CiStr,
    pub settings: ResourceGroupSettings,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::CiStr;
    use smallvec::smallvec;

    fn column(id: i64, name: &str, offset: usize) -> ColumnInfo {
        ColumnInfo {
            id,
            name: CiStr::new(name),
            offset,
            field_type: FieldType::Longlong,
            state: SchemaState::Public,
            comment: String::new(),
        }
    }

    fn two_column_table() -> TableInfo {
        TableInfo {
            id: 1001,
            name: CiStr::new("t"),
            db_id: 1000,
            state: SchemaState::Public,
            columns: vec![column(11, "a", 0), column(12, "b", 1)],
            indices: vec![IndexInfo {
                id: 21,
                name: CiStr::new("idx"),
                columns: smallvec![IndexColumn {
                    offset: 0,
                    length: Some(10),
                }],
                unique: true,
                primary: true,
                state: SchemaState::Public,
            }],
            partition: None,
            temp_kind: TempTableKind::None,
            is_view: false,
            is_sequence: false,
            placement_policy: None,
            comment: String::new(),
        }
    }

    #[test]
    fn validate_accepts_contiguous_offsets() {
        assert!(two_column_table().validate().is_ok());
    }

    #[test]
    fn validate_rejects_gapped_offsets() {
        let mut table = two_column_table();
        table.columns[1].offset = 5;
        assert!(table.validate().is_err());
    }

    #[test]
    fn validate_rejects_dangling_index_member() {
        let mut table = two_column_table();
        table.indices[0].columns[0].offset = 9;
        assert!(table.validate().is_err());
    }

    #[test]
    fn clone_with_fresh_ids_renumbers_from_one() {
        let source = two_column_table();
        let copy = source.clone_with_fresh_ids(CiStr::new("t_like"), 2001, 1000);
        assert_eq!(copy.id, 2001);
        assert_eq!(copy.columns[0].id, 1);
        assert_eq!(copy.columns[1].id, 2);
        assert_eq!(copy.indices[0].id, 1);
        // Shape is preserved.
        assert_eq!(copy.columns.len(), source.columns.len());
        assert_eq!(copy.columns[1].offset, 1);
    }

    #[test]
    fn physical_ids_include_partitions() {
        let mut table = two_column_table();
        table.partition = Some(PartitionInfo {
            expr: "a".to_string(),
            definitions: vec![
                PartitionDefinition {
                    id: 3001,
                    name: CiStr::new("p0"),
                    less_than: vec!["10".to_string()],
                    placement_policy: None,
                },
                PartitionDefinition {
                    id: 3002,
                    name: CiStr::new("p1"),
                    less_than: vec!["20".to_string()],
                    placement_policy: None,
                },
            ],
        });
        assert_eq!(table.physical_table_ids().as_slice(), &[1001, 3001, 3002]);
    }

    #[test]
    fn approx_mem_size_grows_with_columns() {
        let small = two_column_table();
        let mut large = small.clone();
        for offset in 2..32 {
            large
                .columns
                .push(column(offset as i64 + 10, "padding_column", offset));
        }
        assert!(large.approx_mem_size() > small.approx_mem_size());
    }
}
