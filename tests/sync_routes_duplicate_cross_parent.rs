mod test_support;

use cragbookd::sloper::{sync_crags_and_sectors, sync_routes, SyncLog};
use test_support::{count, names, open_db, raw_crag, raw_route, raw_sector, FakeSloper};

#[test]
fn same_name_from_a_different_upstream_sector_is_aliased_not_duplicated() {
    let conn = open_db();
    let mut api = FakeSloper::default();

    api.crags = vec![raw_crag(10, "Kullaberg", vec![raw_sector(100, "Kapellet", 0)])];
    let mut log = SyncLog::new();
    let handles = sync_crags_and_sectors(&conn, &mut api, &mut log, "gb-1").expect("seed");
    let sector_id = handles[0].sector_id.clone();

    // The same physical sector appears twice upstream (e.g. in two
    // guidebooks); both upstream sectors were mapped onto one local
    // sector. Upstream sector 200 re-reports the same route.
    api.routes.insert(
        "100".to_string(),
        vec![raw_route(1, "Vingen", 0)],
    );
    api.routes.insert(
        "200".to_string(),
        vec![raw_route(2, "Vingen", 0)],
    );

    let mut log = SyncLog::new();
    sync_routes(&conn, &mut api, &mut log, &sector_id, "100").expect("sync from 100");
    let mut log = SyncLog::new();
    let synced = sync_routes(&conn, &mut api, &mut log, &sector_id, "200").expect("sync from 200");

    // One local route, two references; the alias must not be updated
    // from its (presumably lower-fidelity) second source.
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM routes"), 1);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM sloper_route_refs"), 2);
    assert_eq!(
        count(
            &conn,
            "SELECT COUNT(*) FROM sloper_route_refs WHERE external_id = '2' AND sync_data = 0",
        ),
        1
    );
    assert_eq!(synced, 0);
    assert!(log.lines().iter().any(|l| l.contains("aliased")), "{:?}", log.lines());

    // Re-running the aliased source only produces skip noise.
    let mut log = SyncLog::new();
    let synced = sync_routes(&conn, &mut api, &mut log, &sector_id, "200").expect("re-sync");
    assert_eq!(synced, 0);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM routes"), 1);
    assert_eq!(
        names(&conn, "SELECT name FROM routes"),
        vec!["Vingen".to_string()]
    );
}
