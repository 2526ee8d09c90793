use rusqlite::ffi;

/// Storage-layer error with unique-constraint violations surfaced as a
/// tagged kind so callers can switch on them instead of matching message
/// substrings.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint violation on {table}.{column}")]
    Constraint { table: String, column: String },
    #[error(transparent)]
    Other(#[from] rusqlite::Error),
}

impl StoreError {
    pub fn is_constraint(&self) -> bool {
        matches!(self, StoreError::Constraint { .. })
    }
}

/// Classify a rusqlite error, pulling table/column out of SQLite's
/// "UNIQUE constraint failed: table.col, table.col2" message for unique
/// and primary-key violations.
pub fn classify(err: rusqlite::Error) -> StoreError {
    if let rusqlite::Error::SqliteFailure(e, ref msg) = err {
        let unique = e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
            || e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY;
        if unique {
            if let Some(msg) = msg {
                if let Some((table, column)) = parse_constraint_message(msg) {
                    return StoreError::Constraint { table, column };
                }
            }
        }
    }
    StoreError::Other(err)
}

fn parse_constraint_message(msg: &str) -> Option<(String, String)> {
    // "UNIQUE constraint failed: routes.sector_id, routes.name"
    let rest = msg.split(':').nth(1)?.trim();
    let last = rest.split(',').next_back()?.trim();
    let (table, column) = last.split_once('.')?;
    Some((table.to_string(), column.to_string()))
}
