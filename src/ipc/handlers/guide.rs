use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_crags_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    // Include basic counts so the UI can show a useful dashboard.
    // Correlated subqueries avoid double-counting from joins.
    let mut stmt = match conn.prepare(
        "SELECT
           c.id,
           c.name,
           c.description,
           (SELECT COUNT(*) FROM sectors s WHERE s.crag_id = c.id) AS sector_count,
           (SELECT COUNT(*) FROM routes r JOIN sectors s ON s.id = r.sector_id
             WHERE s.crag_id = c.id) AS route_count
         FROM crags c
         ORDER BY c.sort_order, c.name",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let rows = stmt
        .query_map([], |row| {
            let id: String = row.get(0)?;
            let name: String = row.get(1)?;
            let description: Option<String> = row.get(2)?;
            let sector_count: i64 = row.get(3)?;
            let route_count: i64 = row.get(4)?;
            Ok(json!({
                "id": id,
                "name": name,
                "description": description,
                "sectorCount": sector_count,
                "routeCount": route_count
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(crags) => ok(&req.id, json!({ "crags": crags })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_sectors_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(crag_id) = req.params.get("cragId").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing cragId", None);
    };

    let mut stmt = match conn.prepare(
        "SELECT
           s.id,
           s.name,
           s.sort_order,
           (SELECT COUNT(*) FROM routes r WHERE r.sector_id = s.id) AS route_count
         FROM sectors s
         WHERE s.crag_id = ?
         ORDER BY s.sort_order, s.name",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let rows = stmt
        .query_map([crag_id], |row| {
            let id: String = row.get(0)?;
            let name: String = row.get(1)?;
            let sort_order: i64 = row.get(2)?;
            let route_count: i64 = row.get(3)?;
            Ok(json!({
                "id": id,
                "name": name,
                "sortOrder": sort_order,
                "routeCount": route_count
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(sectors) => ok(&req.id, json!({ "sectors": sectors })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_routes_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(sector_id) = req.params.get("sectorId").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing sectorId", None);
    };

    let mut stmt = match conn.prepare(
        "SELECT
           r.id,
           r.name,
           r.grade,
           r.climb_kind,
           r.sort_order,
           (SELECT COUNT(*) FROM issues i WHERE i.route_id = r.id) AS issue_count
         FROM routes r
         WHERE r.sector_id = ?
         ORDER BY r.sort_order, r.name",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let rows = stmt
        .query_map([sector_id], |row| {
            let id: String = row.get(0)?;
            let name: String = row.get(1)?;
            let grade: Option<String> = row.get(2)?;
            let climb_kind: Option<String> = row.get(3)?;
            let sort_order: i64 = row.get(4)?;
            let issue_count: i64 = row.get(5)?;
            Ok(json!({
                "id": id,
                "name": name,
                "grade": grade,
                "climbKind": climb_kind,
                "sortOrder": sort_order,
                "issueCount": issue_count
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(routes) => ok(&req.id, json!({ "routes": routes })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_issues_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let route_id = req.params.get("routeId").and_then(|v| v.as_str());

    let base = "SELECT i.id, i.route_id, i.issue_type, i.sub_issue_type, i.status,
                       i.comment, i.reported_by, i.reported_at, i.resolved_at
                FROM issues i";
    let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<serde_json::Value> {
        Ok(json!({
            "id": row.get::<_, String>(0)?,
            "routeId": row.get::<_, String>(1)?,
            "issueType": row.get::<_, String>(2)?,
            "subIssueType": row.get::<_, Option<String>>(3)?,
            "status": row.get::<_, Option<String>>(4)?,
            "comment": row.get::<_, Option<String>>(5)?,
            "reportedBy": row.get::<_, Option<String>>(6)?,
            "reportedAt": row.get::<_, Option<String>>(7)?,
            "resolvedAt": row.get::<_, Option<String>>(8)?,
        }))
    };

    let rows = match route_id {
        Some(rid) => conn
            .prepare(&format!(
                "{} WHERE i.route_id = ? ORDER BY i.reported_at",
                base
            ))
            .and_then(|mut stmt| {
                stmt.query_map([rid], map_row)
                    .and_then(|it| it.collect::<Result<Vec<_>, _>>())
            }),
        None => conn
            .prepare(&format!("{} ORDER BY i.reported_at", base))
            .and_then(|mut stmt| {
                stmt.query_map([], map_row)
                    .and_then(|it| it.collect::<Result<Vec<_>, _>>())
            }),
    };

    match rows {
        Ok(issues) => ok(&req.id, json!({ "issues": issues })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "crags.list" => Some(handle_crags_list(state, req)),
        "sectors.list" => Some(handle_sectors_list(state, req)),
        "routes.list" => Some(handle_routes_list(state, req)),
        "issues.list" => Some(handle_issues_list(state, req)),
        _ => None,
    }
}
