mod test_support;

use cragbookd::sloper::{sync_crags_and_sectors, sync_routes, SyncLog};
use test_support::{count, names, open_db, raw_crag, raw_route, raw_sector, FakeSloper};

// An upstream sector reporting far more identically-named records than
// the rename chain is willing to walk. The run must finish, cap the
// chain, and leave no half-inserted rows behind.
#[test]
fn pathological_duplicate_import_completes_and_caps_the_rename_chain() {
    let conn = open_db();
    let mut api = FakeSloper::default();

    api.crags = vec![raw_crag(10, "Kullaberg", vec![raw_sector(100, "Kapellet", 0)])];
    let mut log = SyncLog::new();
    let handles = sync_crags_and_sectors(&conn, &mut api, &mut log, "gb-1").expect("seed");
    let sector_id = handles[0].sector_id.clone();

    api.routes.insert(
        "100".to_string(),
        (0..40).map(|i| raw_route(i + 1, "Project", i)).collect(),
    );

    let mut log = SyncLog::new();
    let synced = sync_routes(&conn, &mut api, &mut log, &sector_id, "100").expect("sync");
    let report = log.lines().join("\n");

    // The chain walks "Project" through "Project 33"; the rest fail.
    assert_eq!(synced, 33);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM routes"), 33);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM sloper_route_refs"), 33);
    let route_names = names(&conn, "SELECT name FROM routes ORDER BY sort_order");
    assert_eq!(route_names.first().map(String::as_str), Some("Project"));
    assert_eq!(route_names.last().map(String::as_str), Some("Project 33"));
    assert!(report.contains("rename chain exceeded 32 steps"), "{}", report);
    assert!(
        report.contains("routes: 33 inserted, 0 updated, 0 aliased, 0 skipped, 7 failed (40 total)"),
        "{}",
        report
    );

    // Failed records must not leave their insert placeholders (or the
    // references pointing at them) in the workspace.
    assert_eq!(
        count(
            &conn,
            "SELECT COUNT(*) FROM routes WHERE name NOT LIKE 'Project%'",
        ),
        0
    );
    assert_eq!(
        count(
            &conn,
            "SELECT COUNT(*) FROM sloper_route_refs
             WHERE local_id NOT IN (SELECT id FROM routes)",
        ),
        0
    );

    // Re-running the same payload is stable: the resolved records update,
    // the overflow records fail again cleanly, nothing accumulates.
    let mut log = SyncLog::new();
    let synced = sync_routes(&conn, &mut api, &mut log, &sector_id, "100").expect("re-sync");
    let report = log.lines().join("\n");
    assert_eq!(synced, 33);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM routes"), 33);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM sloper_route_refs"), 33);
    assert_eq!(
        names(&conn, "SELECT name FROM routes ORDER BY sort_order"),
        route_names
    );
    assert!(
        report.contains("routes: 0 inserted, 33 updated, 0 aliased, 0 skipped, 7 failed (40 total)"),
        "{}",
        report
    );
}
