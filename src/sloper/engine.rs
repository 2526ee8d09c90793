//! Reconciliation of upstream sloper records against the local
//! crag/sector/route/issue hierarchy.
//!
//! Record processing is strictly sequential within one parent scope:
//! duplicate detection reads the effects of immediately preceding writes,
//! so this engine must never interleave inserts for the same parent.

use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use crate::store::StoreError;

use super::client::{RawCrag, RawIssue, RawRoute, RawSector, SloperApi};
use super::error::SyncError;
use super::fields;
use super::log::{SyncLog, SyncStats};
use super::refs::{self, RefKind, SOURCE_SLOPER};

/// Hard stop for pathological imports ("Project", "Project 2", ... chains).
/// Exceeding it fails the record, never the run.
const MAX_RENAME_DEPTH: usize = 32;

/// A sector eligible for a follow-up route sync.
#[derive(Debug, Clone)]
pub struct SectorHandle {
    pub sector_id: String,
    pub external_sector_id: String,
    pub name: String,
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Name-uniqueness scope of one entity level: its table, its ref table
/// and the parent column pinning the scope (none for crags).
#[derive(Clone, Copy)]
struct NameScope<'a> {
    kind: RefKind,
    entity_table: &'static str,
    parent: Option<(&'static str, &'a str)>,
}

#[derive(Debug, Clone)]
struct Competitor {
    id: String,
    sort_order: i64,
}

fn find_by_name(
    conn: &Connection,
    scope: NameScope<'_>,
    name: &str,
) -> Result<Option<Competitor>, StoreError> {
    let res = match scope.parent {
        Some((col, val)) => conn
            .query_row(
                &format!(
                    "SELECT id, sort_order FROM {} WHERE name = ? AND {} = ?",
                    scope.entity_table, col
                ),
                [name, val],
                |r| {
                    Ok(Competitor {
                        id: r.get(0)?,
                        sort_order: r.get(1)?,
                    })
                },
            )
            .optional(),
        None => conn
            .query_row(
                &format!(
                    "SELECT id, sort_order FROM {} WHERE name = ?",
                    scope.entity_table
                ),
                [name],
                |r| {
                    Ok(Competitor {
                        id: r.get(0)?,
                        sort_order: r.get(1)?,
                    })
                },
            )
            .optional(),
    };
    res.map_err(crate::store::classify)
}

fn entity_name(
    conn: &Connection,
    scope: NameScope<'_>,
    id: &str,
) -> Result<Option<String>, StoreError> {
    conn.query_row(
        &format!("SELECT name FROM {} WHERE id = ?", scope.entity_table),
        [id],
        |r| r.get(0),
    )
    .optional()
    .map_err(crate::store::classify)
}

fn rename_entity(
    conn: &Connection,
    scope: NameScope<'_>,
    id: &str,
    name: &str,
) -> Result<(), StoreError> {
    conn.execute(
        &format!(
            "UPDATE {} SET name = ?, updated_at = ? WHERE id = ?",
            scope.entity_table
        ),
        (name, now(), id),
    )
    .map_err(crate::store::classify)?;
    Ok(())
}

/// Resolve a genuine in-container name collision between two local
/// entities. The lower sort order keeps the unsuffixed name; the other
/// is renamed to the next incremental suffix. If the incremented name is
/// itself taken, recurse on it with the next competitor; each level
/// strictly increments the trailing counter, so the chain terminates,
/// with `MAX_RENAME_DEPTH` as an explicit backstop.
fn resolve_name_collision(
    conn: &Connection,
    log: &mut SyncLog,
    scope: NameScope<'_>,
    name: &str,
    a: &Competitor,
    b: &Competitor,
    depth: usize,
) -> Result<(), SyncError> {
    if depth >= MAX_RENAME_DEPTH {
        return Err(SyncError::RenameChainTooDeep {
            name: name.to_string(),
            max: MAX_RENAME_DEPTH,
        });
    }

    // Ties keep the unsuffixed name on the first competitor.
    let (keeper, mover) = if b.sort_order < a.sort_order {
        (b, a)
    } else {
        (a, b)
    };

    let next = fields::next_incremental_name(name);
    match find_by_name(conn, scope, &next)? {
        Some(third) if third.id != mover.id => {
            resolve_name_collision(conn, log, scope, &next, &third, mover, depth + 1)?;
        }
        Some(_) => {} // mover already holds the incremented name
        None => {
            rename_entity(conn, scope, &mover.id, &next)?;
            refs::set_forced_name(conn, scope.kind, SOURCE_SLOPER, &mover.id, &next)?;
            log.info(format!("renamed duplicate {:?} to {:?}", name, next));
        }
    }

    // The base name is free now; retrofit it onto the keeper (which may
    // still carry its insert placeholder).
    if entity_name(conn, scope, &keeper.id)?.as_deref() != Some(name) {
        rename_entity(conn, scope, &keeper.id, name)?;
    }
    refs::set_forced_name(conn, scope.kind, SOURCE_SLOPER, &keeper.id, name)?;
    Ok(())
}

/// Insert-or-duplicate-resolution shared by crags, sectors and routes.
///
/// `insert` must attempt the entity insert under the given name and
/// return the new local id. On a unique-name violation the duplicate
/// path decides between a genuine in-container collision (insert under a
/// placeholder, then rename both) and an authentic cross-container
/// duplicate (alias the existing entity, no insert).
#[allow(clippy::too_many_arguments)]
fn insert_or_resolve<F>(
    conn: &Connection,
    log: &mut SyncLog,
    stats: &mut SyncStats,
    scope: NameScope<'_>,
    external_id: &str,
    external_parent_id: &str,
    name: &str,
    sort_order: i64,
    insert: F,
) -> Result<Option<String>, SyncError>
where
    F: Fn(&Connection, &str) -> Result<String, StoreError>,
{
    match insert(conn, name) {
        Ok(local_id) => {
            refs::create(
                conn,
                scope.kind,
                SOURCE_SLOPER,
                external_id,
                Some(external_parent_id),
                &local_id,
                true,
            )?;
            stats.inserted += 1;
            Ok(Some(local_id))
        }
        Err(StoreError::Constraint { .. }) => {
            let Some(existing) = find_by_name(conn, scope, name)? else {
                // Constraint fired but nobody holds the name: some other
                // uniqueness tripped; treat as a per-record failure.
                return Err(SyncError::Store(StoreError::Constraint {
                    table: scope.entity_table.to_string(),
                    column: "name".to_string(),
                }));
            };

            let same_parent = refs::alias_exists_under_parent(
                conn,
                scope.kind,
                SOURCE_SLOPER,
                &existing.id,
                external_parent_id,
            )?;

            if same_parent {
                // Two records genuinely share a name inside one upstream
                // container. Insert under a placeholder to satisfy the
                // constraint immediately, then hand out suffixes.
                let placeholder = Uuid::new_v4().to_string();
                let local_id = insert(conn, &placeholder).map_err(SyncError::Store)?;
                refs::create(
                    conn,
                    scope.kind,
                    SOURCE_SLOPER,
                    external_id,
                    Some(external_parent_id),
                    &local_id,
                    true,
                )?;
                let fresh = Competitor {
                    id: local_id.clone(),
                    sort_order,
                };
                if let Err(e) = resolve_name_collision(conn, log, scope, name, &existing, &fresh, 0)
                {
                    // The record is unusable without a resolved name; take
                    // the placeholder row and its reference back out so the
                    // failure leaves nothing behind and the next run retries
                    // from scratch.
                    conn.execute(
                        &format!(
                            "DELETE FROM {} WHERE source = ? AND local_id = ?",
                            scope.kind.table()
                        ),
                        [SOURCE_SLOPER, local_id.as_str()],
                    )
                    .map_err(crate::store::classify)?;
                    conn.execute(
                        &format!("DELETE FROM {} WHERE id = ?", scope.entity_table),
                        [local_id.as_str()],
                    )
                    .map_err(crate::store::classify)?;
                    return Err(e);
                }
                stats.inserted += 1;
                Ok(Some(local_id))
            } else {
                // Same name under a different upstream parent: most
                // likely the same real-world object reported twice.
                // Alias it and never overwrite from this second source.
                refs::create(
                    conn,
                    scope.kind,
                    SOURCE_SLOPER,
                    external_id,
                    Some(external_parent_id),
                    &existing.id,
                    false,
                )?;
                stats.aliased += 1;
                log.info(format!(
                    "aliased {:?} (external {}) to existing entry",
                    name, external_id
                ));
                Ok(None)
            }
        }
        Err(e) => Err(SyncError::Store(e)),
    }
}

fn reconcile_crag(
    conn: &Connection,
    log: &mut SyncLog,
    stats: &mut SyncStats,
    guidebook_id: &str,
    raw: &RawCrag,
) -> Result<Option<String>, SyncError> {
    let external_id = raw.id.to_string();
    let name = fields::decode_text(&raw.name);
    let description = raw.description.as_deref().map(fields::decode_text);

    if let Some(r) = refs::find(conn, RefKind::Crag, SOURCE_SLOPER, &external_id)? {
        let Some(local_id) = r.local_id else {
            stats.skipped += 1;
            log.info(format!("crag {:?}: unsynced reference, skipped", name));
            return Ok(None);
        };
        if r.sync_data {
            let stored_name = r.forced_name.as_deref().unwrap_or(&name);
            // The guard keeps an unchanged re-run from touching the row
            // (and its updated_at) at all.
            conn.execute(
                "UPDATE crags SET name = ?1, description = ?2, sort_order = ?3, updated_at = ?4
                 WHERE id = ?5
                   AND (name IS NOT ?1 OR description IS NOT ?2 OR sort_order IS NOT ?3)",
                (stored_name, &description, raw.sort_order, now(), &local_id),
            )
            .map_err(crate::store::classify)?;
            stats.updated += 1;
        } else {
            stats.skipped += 1;
        }
        return Ok(r.sync_children.then_some(local_id));
    }

    let scope = NameScope {
        kind: RefKind::Crag,
        entity_table: "crags",
        parent: None,
    };
    let sort_order = raw.sort_order;
    insert_or_resolve(
        conn,
        log,
        stats,
        scope,
        &external_id,
        guidebook_id,
        &name,
        sort_order,
        |conn, insert_name| {
            let id = Uuid::new_v4().to_string();
            conn.execute(
                "INSERT INTO crags(id, name, description, sort_order, updated_at)
                 VALUES(?, ?, ?, ?, ?)",
                (&id, insert_name, &description, sort_order, now()),
            )
            .map_err(crate::store::classify)?;
            Ok(id)
        },
    )
}

fn reconcile_sector(
    conn: &Connection,
    log: &mut SyncLog,
    stats: &mut SyncStats,
    crag_local_id: &str,
    external_crag_id: &str,
    raw: &RawSector,
) -> Result<Option<String>, SyncError> {
    let external_id = raw.id.to_string();
    let name = fields::decode_text(&raw.name);

    if let Some(r) = refs::find(conn, RefKind::Sector, SOURCE_SLOPER, &external_id)? {
        let Some(local_id) = r.local_id else {
            stats.skipped += 1;
            log.info(format!("sector {:?}: unsynced reference, skipped", name));
            return Ok(None);
        };
        if r.sync_data {
            let stored_name = r.forced_name.as_deref().unwrap_or(&name);
            conn.execute(
                "UPDATE sectors SET name = ?1, sort_order = ?2, updated_at = ?3
                 WHERE id = ?4 AND (name IS NOT ?1 OR sort_order IS NOT ?2)",
                (stored_name, raw.sort_order, now(), &local_id),
            )
            .map_err(crate::store::classify)?;
            stats.updated += 1;
        } else {
            stats.skipped += 1;
        }
        return Ok(r.sync_children.then_some(local_id));
    }

    let scope = NameScope {
        kind: RefKind::Sector,
        entity_table: "sectors",
        parent: Some(("crag_id", crag_local_id)),
    };
    let sort_order = raw.sort_order;
    insert_or_resolve(
        conn,
        log,
        stats,
        scope,
        &external_id,
        external_crag_id,
        &name,
        sort_order,
        |conn, insert_name| {
            let id = Uuid::new_v4().to_string();
            conn.execute(
                "INSERT INTO sectors(id, crag_id, name, sort_order, updated_at)
                 VALUES(?, ?, ?, ?, ?)",
                (&id, crag_local_id, insert_name, sort_order, now()),
            )
            .map_err(crate::store::classify)?;
            Ok(id)
        },
    )
}

fn reconcile_route(
    conn: &Connection,
    log: &mut SyncLog,
    stats: &mut SyncStats,
    sector_local_id: &str,
    external_sector_id: &str,
    raw: &RawRoute,
) -> Result<(), SyncError> {
    let external_id = raw.id.to_string();
    let name = fields::decode_text(&raw.name);
    let grade = raw.grade.as_deref().map(fields::decode_text);
    let climb_kind = raw.route_type.as_deref().map(fields::decode_text);

    if let Some(r) = refs::find(conn, RefKind::Route, SOURCE_SLOPER, &external_id)? {
        let Some(local_id) = r.local_id else {
            stats.skipped += 1;
            log.info(format!("route {:?}: unsynced reference, skipped", name));
            return Ok(());
        };
        if r.sync_data {
            let stored_name = r.forced_name.as_deref().unwrap_or(&name);
            conn.execute(
                "UPDATE routes SET name = ?1, grade = ?2, climb_kind = ?3, sort_order = ?4,
                        updated_at = ?5
                 WHERE id = ?6
                   AND (name IS NOT ?1 OR grade IS NOT ?2 OR climb_kind IS NOT ?3
                        OR sort_order IS NOT ?4)",
                (
                    stored_name,
                    &grade,
                    &climb_kind,
                    raw.sort_order,
                    now(),
                    &local_id,
                ),
            )
            .map_err(crate::store::classify)?;
            stats.updated += 1;
        } else {
            stats.skipped += 1;
        }
        return Ok(());
    }

    let scope = NameScope {
        kind: RefKind::Route,
        entity_table: "routes",
        parent: Some(("sector_id", sector_local_id)),
    };
    let sort_order = raw.sort_order;
    insert_or_resolve(
        conn,
        log,
        stats,
        scope,
        &external_id,
        external_sector_id,
        &name,
        sort_order,
        |conn, insert_name| {
            let id = Uuid::new_v4().to_string();
            conn.execute(
                "INSERT INTO routes(id, sector_id, name, grade, climb_kind, sort_order, updated_at)
                 VALUES(?, ?, ?, ?, ?, ?, ?)",
                (
                    &id,
                    sector_local_id,
                    insert_name,
                    &grade,
                    &climb_kind,
                    sort_order,
                    now(),
                ),
            )
            .map_err(crate::store::classify)?;
            Ok(id)
        },
    )
    .map(|_| ())
}

fn reconcile_issue(
    conn: &Connection,
    log: &mut SyncLog,
    stats: &mut SyncStats,
    raw: &RawIssue,
) -> Result<(), SyncError> {
    let external_id = raw.id.to_string();

    // Issues hang off routes; an issue for a route we never synced (or
    // whose reference was unsynced by the operator) is skipped.
    let route_ref = refs::find(conn, RefKind::Route, SOURCE_SLOPER, &raw.route_id.to_string())?;
    let Some(route_local) = route_ref.and_then(|r| r.local_id) else {
        stats.skipped += 1;
        log.info(format!(
            "issue {}: no local route for external route {}, skipped",
            external_id, raw.route_id
        ));
        return Ok(());
    };

    let reported_at = fields::convert_timestamp(&raw.created)?;
    let resolved_at = match raw.resolved.as_deref() {
        Some(v) if !v.trim().is_empty() => Some(fields::convert_timestamp(v)?),
        _ => None,
    };

    let issue_type = fields::map_issue_category(raw.issue_category_id);
    let sub_issue_type = fields::map_issue_detail(raw.issue_type_id, raw.issue_detail_id);
    let status = fields::map_status(raw.status_id);
    if status.is_none() {
        log.warn(format!(
            "issue {}: unmapped status id {}, storing no status",
            external_id, raw.status_id
        ));
    }

    let comment = raw.comment.as_deref().map(fields::decode_text);
    let reported_by = raw.reported_by.as_deref().map(fields::decode_text);

    if let Some(r) = refs::find(conn, RefKind::Issue, SOURCE_SLOPER, &external_id)? {
        let Some(local_id) = r.local_id else {
            stats.skipped += 1;
            return Ok(());
        };
        if r.sync_data {
            conn.execute(
                "UPDATE issues SET route_id = ?1, issue_type = ?2, sub_issue_type = ?3,
                        status = ?4, comment = ?5, reported_by = ?6, reported_at = ?7,
                        resolved_at = ?8, updated_at = ?9
                 WHERE id = ?10
                   AND (route_id IS NOT ?1 OR issue_type IS NOT ?2 OR sub_issue_type IS NOT ?3
                        OR status IS NOT ?4 OR comment IS NOT ?5 OR reported_by IS NOT ?6
                        OR reported_at IS NOT ?7 OR resolved_at IS NOT ?8)",
                (
                    &route_local,
                    issue_type.as_str(),
                    sub_issue_type.map(|s| s.as_str()),
                    status.map(|s| s.as_str()),
                    &comment,
                    &reported_by,
                    &reported_at,
                    &resolved_at,
                    now(),
                    &local_id,
                ),
            )
            .map_err(crate::store::classify)?;
            stats.updated += 1;
        } else {
            stats.skipped += 1;
        }
        return Ok(());
    }

    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO issues(id, route_id, issue_type, sub_issue_type, status, comment,
                reported_by, reported_at, resolved_at, updated_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &id,
            &route_local,
            issue_type.as_str(),
            sub_issue_type.map(|s| s.as_str()),
            status.map(|s| s.as_str()),
            &comment,
            &reported_by,
            &reported_at,
            &resolved_at,
            now(),
        ),
    )
    .map_err(crate::store::classify)?;
    refs::create(
        conn,
        RefKind::Issue,
        SOURCE_SLOPER,
        &external_id,
        None,
        &id,
        true,
    )?;
    stats.inserted += 1;
    Ok(())
}

/// Describe a per-record error for the log, with identifying context.
fn record_failure(log: &mut SyncLog, stats: &mut SyncStats, what: &str, name: &str, e: &SyncError) {
    stats.failed += 1;
    log.warn(format!("{} {:?}: {}", what, name, e));
}

/// Reconcile all crags of one guidebook, and the sectors embedded in
/// their payloads. Returns the sectors eligible for a route sync.
pub fn sync_crags_and_sectors(
    conn: &Connection,
    api: &mut dyn SloperApi,
    log: &mut SyncLog,
    guidebook_id: &str,
) -> Result<Vec<SectorHandle>, SyncError> {
    api.authenticate()?;
    let crags = api.fetch_crags(guidebook_id)?;
    log.info(format!(
        "guidebook {}: fetched {} crags",
        guidebook_id,
        crags.len()
    ));

    let mut crag_stats = SyncStats::default();
    let mut sector_stats = SyncStats::default();
    let mut handles = Vec::new();

    for raw in &crags {
        let crag_local = match reconcile_crag(conn, log, &mut crag_stats, guidebook_id, raw) {
            Ok(v) => v,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                record_failure(log, &mut crag_stats, "crag", &raw.name, &e);
                continue;
            }
        };
        let Some(crag_local) = crag_local else {
            continue;
        };
        let external_crag_id = raw.id.to_string();
        for raw_sector in &raw.sectors {
            match reconcile_sector(
                conn,
                log,
                &mut sector_stats,
                &crag_local,
                &external_crag_id,
                raw_sector,
            ) {
                Ok(Some(sector_local)) => handles.push(SectorHandle {
                    sector_id: sector_local,
                    external_sector_id: raw_sector.id.to_string(),
                    name: fields::decode_text(&raw_sector.name),
                }),
                Ok(None) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => record_failure(log, &mut sector_stats, "sector", &raw_sector.name, &e),
            }
        }
    }

    crag_stats.summarize(log, "crags");
    sector_stats.summarize(log, "sectors");
    Ok(handles)
}

/// Reconcile the routes of one sector. Returns the number of records
/// that produced or refreshed a local route.
pub fn sync_routes(
    conn: &Connection,
    api: &mut dyn SloperApi,
    log: &mut SyncLog,
    sector_id: &str,
    external_sector_id: &str,
) -> Result<usize, SyncError> {
    api.authenticate()?;
    let routes = api.fetch_routes(external_sector_id)?;
    log.info(format!(
        "sector {}: fetched {} routes",
        external_sector_id,
        routes.len()
    ));

    let mut stats = SyncStats::default();
    for raw in &routes {
        match reconcile_route(conn, log, &mut stats, sector_id, external_sector_id, raw) {
            Ok(()) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => record_failure(log, &mut stats, "route", &raw.name, &e),
        }
    }
    stats.summarize(log, "routes");
    Ok(stats.synced())
}

/// Cleanup first (container emptiness is only assessable once all
/// descendants are known), then reconcile all issues; the upstream issue
/// feed is global, not scoped by crag.
pub fn sync_issues(
    conn: &Connection,
    api: &mut dyn SloperApi,
    log: &mut SyncLog,
) -> Result<(), SyncError> {
    if let Err(e) = cleanup_pass(conn, log) {
        // Best-effort: a failed cleanup never blocks the issue sync.
        log.warn(format!("cleanup pass failed: {}", e));
    }

    api.authenticate()?;
    let issues = api.fetch_issues()?;
    log.info(format!("fetched {} issues", issues.len()));

    let mut stats = SyncStats::default();
    for raw in &issues {
        match reconcile_issue(conn, log, &mut stats, raw) {
            Ok(()) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => record_failure(log, &mut stats, "issue", &raw.id.to_string(), &e),
        }
    }
    stats.summarize(log, "issues");
    Ok(())
}

fn ids(conn: &Connection, sql: &str) -> Result<Vec<String>, StoreError> {
    let mut stmt = conn.prepare(sql).map_err(crate::store::classify)?;
    let rows = stmt
        .query_map([], |r| r.get::<_, String>(0))
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(crate::store::classify)?;
    Ok(rows)
}

/// Remove orphaned references, then empty containers bottom-up: sector
/// references and sectors with zero routes, then crag references and
/// crags with zero sectors. Only sloper-sourced references are touched.
pub fn cleanup_pass(conn: &Connection, log: &mut SyncLog) -> Result<(), StoreError> {
    // References whose local entity no longer exists.
    for (table, entity) in [
        ("sloper_issue_refs", "issues"),
        ("sloper_route_refs", "routes"),
        ("sloper_sector_refs", "sectors"),
        ("sloper_crag_refs", "crags"),
    ] {
        let n = conn
            .execute(
                &format!(
                    "DELETE FROM {} WHERE source = 'sloper' AND local_id IS NOT NULL
                     AND local_id NOT IN (SELECT id FROM {})",
                    table, entity
                ),
                [],
            )
            .map_err(crate::store::classify)?;
        if n > 0 {
            log.info(format!("cleanup: removed {} orphaned {} rows", n, table));
        }
    }

    let empty_sectors = ids(
        conn,
        "SELECT s.id FROM sectors s
         WHERE EXISTS (SELECT 1 FROM sloper_sector_refs x
                       WHERE x.source = 'sloper' AND x.local_id = s.id)
           AND NOT EXISTS (SELECT 1 FROM routes r WHERE r.sector_id = s.id)",
    )?;
    for id in &empty_sectors {
        conn.execute(
            "DELETE FROM sloper_sector_refs WHERE source = 'sloper' AND local_id = ?",
            [id],
        )
        .map_err(crate::store::classify)?;
        conn.execute("DELETE FROM sectors WHERE id = ?", [id])
            .map_err(crate::store::classify)?;
    }
    if !empty_sectors.is_empty() {
        log.info(format!(
            "cleanup: removed {} empty sectors with their references",
            empty_sectors.len()
        ));
    }

    let empty_crags = ids(
        conn,
        "SELECT c.id FROM crags c
         WHERE EXISTS (SELECT 1 FROM sloper_crag_refs x
                       WHERE x.source = 'sloper' AND x.local_id = c.id)
           AND NOT EXISTS (SELECT 1 FROM sectors s WHERE s.crag_id = c.id)",
    )?;
    for id in &empty_crags {
        conn.execute(
            "DELETE FROM sloper_crag_refs WHERE source = 'sloper' AND local_id = ?",
            [id],
        )
        .map_err(crate::store::classify)?;
        conn.execute("DELETE FROM crags WHERE id = ?", [id])
            .map_err(crate::store::classify)?;
    }
    if !empty_crags.is_empty() {
        log.info(format!(
            "cleanup: removed {} empty crags with their references",
            empty_crags.len()
        ));
    }

    Ok(())
}
