use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join("cragbook.sqlite3");
    let conn = Connection::open(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

/// In-memory database with the full schema. Used by tests.
pub fn open_in_memory() -> anyhow::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(conn)
}

fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS crags(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            description TEXT,
            sort_order INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS sectors(
            id TEXT PRIMARY KEY,
            crag_id TEXT NOT NULL,
            name TEXT NOT NULL,
            sort_order INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT,
            FOREIGN KEY(crag_id) REFERENCES crags(id),
            UNIQUE(crag_id, name)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sectors_crag ON sectors(crag_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS routes(
            id TEXT PRIMARY KEY,
            sector_id TEXT NOT NULL,
            name TEXT NOT NULL,
            grade TEXT,
            climb_kind TEXT,
            sort_order INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT,
            FOREIGN KEY(sector_id) REFERENCES sectors(id),
            UNIQUE(sector_id, name)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_routes_sector ON routes(sector_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS issues(
            id TEXT PRIMARY KEY,
            route_id TEXT NOT NULL,
            issue_type TEXT NOT NULL,
            sub_issue_type TEXT,
            status TEXT,
            comment TEXT,
            reported_by TEXT,
            reported_at TEXT,
            resolved_at TEXT,
            updated_at TEXT,
            FOREIGN KEY(route_id) REFERENCES routes(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_issues_route ON issues(route_id)",
        [],
    )?;

    // External-reference tables, one per entity level. At most one row per
    // (source, external_id); several rows may point at the same local id
    // when upstream duplicates were merged.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS sloper_crag_refs(
            id TEXT PRIMARY KEY,
            source TEXT NOT NULL,
            external_id TEXT NOT NULL,
            external_parent_id TEXT,
            local_id TEXT,
            sync_data INTEGER NOT NULL DEFAULT 1,
            sync_children INTEGER NOT NULL DEFAULT 1,
            forced_name TEXT,
            UNIQUE(source, external_id),
            FOREIGN KEY(local_id) REFERENCES crags(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS sloper_sector_refs(
            id TEXT PRIMARY KEY,
            source TEXT NOT NULL,
            external_id TEXT NOT NULL,
            external_parent_id TEXT,
            local_id TEXT,
            sync_data INTEGER NOT NULL DEFAULT 1,
            sync_children INTEGER NOT NULL DEFAULT 1,
            forced_name TEXT,
            UNIQUE(source, external_id),
            FOREIGN KEY(local_id) REFERENCES sectors(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS sloper_route_refs(
            id TEXT PRIMARY KEY,
            source TEXT NOT NULL,
            external_id TEXT NOT NULL,
            external_parent_id TEXT,
            local_id TEXT,
            sync_data INTEGER NOT NULL DEFAULT 1,
            forced_name TEXT,
            UNIQUE(source, external_id),
            FOREIGN KEY(local_id) REFERENCES routes(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS sloper_issue_refs(
            id TEXT PRIMARY KEY,
            source TEXT NOT NULL,
            external_id TEXT NOT NULL,
            local_id TEXT,
            sync_data INTEGER NOT NULL DEFAULT 1,
            UNIQUE(source, external_id),
            FOREIGN KEY(local_id) REFERENCES issues(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sloper_sector_refs_local ON sloper_sector_refs(local_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sloper_route_refs_local ON sloper_route_refs(local_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;

    // Existing workspaces may predate the climb_kind column.
    ensure_routes_climb_kind(conn)?;

    Ok(())
}

fn ensure_routes_climb_kind(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "routes", "climb_kind")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE routes ADD COLUMN climb_kind TEXT", [])?;
    Ok(())
}

pub fn settings_get_json(conn: &Connection, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row("SELECT value FROM settings WHERE key = ?", [key], |r| {
            r.get(0)
        })
        .optional()?;
    match raw {
        Some(s) => Ok(Some(serde_json::from_str(&s)?)),
        None => Ok(None),
    }
}

pub fn settings_set_json(
    conn: &Connection,
    key: &str,
    value: &serde_json::Value,
) -> anyhow::Result<()> {
    let raw = serde_json::to_string(value)?;
    conn.execute(
        "INSERT INTO settings(key, value) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        [key, &raw],
    )?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
