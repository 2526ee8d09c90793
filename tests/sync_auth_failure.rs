mod test_support;

use cragbookd::sloper::{sync_crags_and_sectors, sync_issues, SyncError, SyncLog};
use test_support::{count, open_db, raw_crag, FakeSloper};

#[test]
fn failed_authentication_aborts_the_run_before_any_write() {
    let conn = open_db();
    let mut api = FakeSloper {
        crags: vec![raw_crag(10, "Kullaberg", vec![])],
        fail_auth: true,
        ..Default::default()
    };

    let mut log = SyncLog::new();
    let err = sync_crags_and_sectors(&conn, &mut api, &mut log, "gb-1").unwrap_err();
    assert!(matches!(err, SyncError::Auth(_)));
    assert!(err.is_fatal());
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM crags"), 0);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM sloper_crag_refs"), 0);
}

#[test]
fn issue_sync_still_runs_cleanup_when_authentication_fails() {
    let conn = open_db();

    // A sloper-sourced sector with no routes, waiting for cleanup.
    conn.execute(
        "INSERT INTO crags(id, name, sort_order) VALUES('c1', 'Kullaberg', 0)",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO sectors(id, crag_id, name, sort_order) VALUES('s1', 'c1', 'Tom', 0)",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO sloper_sector_refs(id, source, external_id, local_id, sync_data, sync_children)
         VALUES('x1', 'sloper', '100', 's1', 1, 1)",
        [],
    )
    .unwrap();

    let mut api = FakeSloper {
        fail_auth: true,
        ..Default::default()
    };
    let mut log = SyncLog::new();
    let err = sync_issues(&conn, &mut api, &mut log).unwrap_err();
    assert!(matches!(err, SyncError::Auth(_)));

    // Cleanup precedes the fetch, so the empty sector is already gone.
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM sectors"), 0);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM sloper_sector_refs"), 0);
}
