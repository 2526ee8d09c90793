//! Access to the external-reference tables: the persisted mapping of
//! `(source, external_id)` to local entities, plus the per-reference sync
//! flags an operator can edit to pause or redirect sync.

use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use crate::store::{classify, StoreError};

pub const SOURCE_SLOPER: &str = "sloper";

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Crag,
    Sector,
    Route,
    Issue,
}

impl RefKind {
    pub fn table(self) -> &'static str {
        match self {
            Self::Crag => "sloper_crag_refs",
            Self::Sector => "sloper_sector_refs",
            Self::Route => "sloper_route_refs",
            Self::Issue => "sloper_issue_refs",
        }
    }

    fn select_sql(self) -> &'static str {
        match self {
            Self::Crag => {
                "SELECT id, local_id, sync_data, sync_children, forced_name
                 FROM sloper_crag_refs WHERE source = ? AND external_id = ?"
            }
            Self::Sector => {
                "SELECT id, local_id, sync_data, sync_children, forced_name
                 FROM sloper_sector_refs WHERE source = ? AND external_id = ?"
            }
            Self::Route => {
                "SELECT id, local_id, sync_data, 1, forced_name
                 FROM sloper_route_refs WHERE source = ? AND external_id = ?"
            }
            Self::Issue => {
                "SELECT id, local_id, sync_data, 1, NULL
                 FROM sloper_issue_refs WHERE source = ? AND external_id = ?"
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExternalRef {
    pub id: String,
    pub local_id: Option<String>,
    pub sync_data: bool,
    pub sync_children: bool,
    pub forced_name: Option<String>,
}

pub fn find(
    conn: &Connection,
    kind: RefKind,
    source: &str,
    external_id: &str,
) -> Result<Option<ExternalRef>, StoreError> {
    conn.query_row(kind.select_sql(), [source, external_id], |row| {
        Ok(ExternalRef {
            id: row.get(0)?,
            local_id: row.get(1)?,
            sync_data: row.get::<_, i64>(2)? != 0,
            sync_children: row.get::<_, i64>(3)? != 0,
            forced_name: row.get(4)?,
        })
    })
    .optional()
    .map_err(classify)
}

/// Create a reference row; returns its id.
pub fn create(
    conn: &Connection,
    kind: RefKind,
    source: &str,
    external_id: &str,
    external_parent_id: Option<&str>,
    local_id: &str,
    sync_data: bool,
) -> Result<String, StoreError> {
    let id = Uuid::new_v4().to_string();
    let sync_data_i = if sync_data { 1i64 } else { 0i64 };
    let res = match kind {
        RefKind::Crag | RefKind::Sector => conn.execute(
            &format!(
                "INSERT INTO {}(id, source, external_id, external_parent_id, local_id, sync_data, sync_children)
                 VALUES(?, ?, ?, ?, ?, ?, ?)",
                kind.table()
            ),
            // Aliasing references (sync_data = 0) must not be followed
            // into children either, or the duplicate would re-grow a
            // second subtree.
            (&id, source, external_id, external_parent_id, local_id, sync_data_i, sync_data_i),
        ),
        RefKind::Route => conn.execute(
            "INSERT INTO sloper_route_refs(id, source, external_id, external_parent_id, local_id, sync_data)
             VALUES(?, ?, ?, ?, ?, ?)",
            (&id, source, external_id, external_parent_id, local_id, sync_data_i),
        ),
        RefKind::Issue => conn.execute(
            "INSERT INTO sloper_issue_refs(id, source, external_id, local_id, sync_data)
             VALUES(?, ?, ?, ?, ?)",
            (&id, source, external_id, local_id, sync_data_i),
        ),
    };
    res.map_err(classify)?;
    Ok(id)
}

/// Does any reference already alias `local_id` under the same upstream
/// container? Distinguishes a genuine in-container name collision from an
/// authentic duplicate reported under two different parents.
pub fn alias_exists_under_parent(
    conn: &Connection,
    kind: RefKind,
    source: &str,
    local_id: &str,
    external_parent_id: &str,
) -> Result<bool, StoreError> {
    let sql = format!(
        "SELECT 1 FROM {} WHERE source = ? AND local_id = ? AND external_parent_id = ? LIMIT 1",
        kind.table()
    );
    conn.query_row(&sql, [source, local_id, external_parent_id], |_| Ok(()))
        .optional()
        .map_err(classify)
        .map(|v| v.is_some())
}

/// Pin the resolver-assigned name on the reference of a local entity so
/// later syncs restore it instead of re-deriving it from upstream.
pub fn set_forced_name(
    conn: &Connection,
    kind: RefKind,
    source: &str,
    local_id: &str,
    name: &str,
) -> Result<(), StoreError> {
    let sql = format!(
        "UPDATE {} SET forced_name = ? WHERE source = ? AND local_id = ?",
        kind.table()
    );
    conn.execute(&sql, [name, source, local_id]).map_err(classify)?;
    Ok(())
}
