use thiserror::Error;

/// Stable error codes surfaced to upper layers. Numeric values follow the
/// MySQL wire protocol where one exists; engine-specific conditions use the
/// 8000+ extension range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    DatabaseNotExists,
    DatabaseExists,
    TableNotExists,
    TableExists,
    InvalidDiff,
    InvalidConfig,
    Validation,
    Meta,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::DatabaseNotExists => "database_not_exists",
            ErrorCode::DatabaseExists => "database_exists",
            ErrorCode::TableNotExists => "table_not_exists",
            ErrorCode::TableExists => "table_exists",
            ErrorCode::InvalidDiff => "invalid_diff",
            ErrorCode::InvalidConfig => "invalid_config",
            ErrorCode::Validation => "validation",
            ErrorCode::Meta => "meta",
        }
    }

    /// MySQL-compatible numeric code, relayed to clients unchanged.
    pub fn mysql_code(self) -> u16 {
        match self {
            ErrorCode::DatabaseNotExists => 1049, // ER_BAD_DB_ERROR
            ErrorCode::DatabaseExists => 1007,    // ER_DB_CREATE_EXISTS
            ErrorCode::TableNotExists => 1146,    // ER_NO_SUCH_TABLE
            ErrorCode::TableExists => 1050,       // ER_TABLE_EXISTS_ERROR
            ErrorCode::InvalidDiff => 8216,
            ErrorCode::InvalidConfig => 8212,
            ErrorCode::Validation => 8215,
            ErrorCode::Meta => 1105, // ER_UNKNOWN_ERROR
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Unknown database '{db}'")]
    DatabaseNotExists { db: String },
    #[error("Can't create database '{db}'; database exists")]
    DatabaseExists { db: String },
    #[error("Table '{db}.{table}' doesn't exist")]
    TableNotExists { db: String, table: String },
    #[error("Table '{table}' already exists")]
    TableExists { table: String },
    #[error("invalid schema diff: {reason}")]
    InvalidDiff { reason: String },
    #[error("invalid config: {message}")]
    InvalidConfig { message: String },
    #[error("validation error: {0}")]
    Validation(String),
    #[error("meta facade error: {0}")]
    Meta(String),
}

impl SchemaError {
    pub fn database_not_exists(db: impl Into<String>) -> Self {
        SchemaError::DatabaseNotExists { db: db.into() }
    }

    pub fn database_not_exists_by_id(id: i64) -> Self {
        SchemaError::DatabaseNotExists {
            db: format!("(Schema ID {id})"),
        }
    }

    pub fn table_not_exists(db: impl Into<String>, table: impl Into<String>) -> Self {
        SchemaError::TableNotExists {
            db: db.into(),
            table: table.into(),
        }
    }

    pub fn table_not_exists_by_id(schema_id: i64, table_id: i64) -> Self {
        SchemaError::TableNotExists {
            db: format!("(Schema ID {schema_id})"),
            table: format!("(Table ID {table_id})"),
        }
    }

    pub fn table_exists(table: impl Into<String>) -> Self {
        SchemaError::TableExists {
            table: table.into(),
        }
    }

    pub fn invalid_diff(reason: impl Into<String>) -> Self {
        SchemaError::InvalidDiff {
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            SchemaError::DatabaseNotExists { .. } => ErrorCode::DatabaseNotExists,
            SchemaError::DatabaseExists { .. } => ErrorCode::DatabaseExists,
            SchemaError::TableNotExists { .. } => ErrorCode::TableNotExists,
            SchemaError::TableExists { .. } => ErrorCode::TableExists,
            SchemaError::InvalidDiff { .. } => ErrorCode::InvalidDiff,
            SchemaError::InvalidConfig { .. } => ErrorCode::InvalidConfig,
            SchemaError::Validation(_) => ErrorCode::Validation,
            SchemaError::Meta(_) => ErrorCode::Meta,
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code().as_str()
    }
}

pub type Result<T> = std::result::Result<T, SchemaError>;
