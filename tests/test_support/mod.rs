#![allow(dead_code)]

use std::collections::HashMap;

use cragbookd::sloper::client::{RawCrag, RawIssue, RawRoute, RawSector, SloperApi};
use cragbookd::sloper::SyncError;
use rusqlite::Connection;

/// Scripted stand-in for the upstream API.
#[derive(Default)]
pub struct FakeSloper {
    pub crags: Vec<RawCrag>,
    pub routes: HashMap<String, Vec<RawRoute>>,
    pub issues: Vec<RawIssue>,
    pub fail_auth: bool,
    pub auth_calls: usize,
}

impl SloperApi for FakeSloper {
    fn authenticate(&mut self) -> Result<(), SyncError> {
        self.auth_calls += 1;
        if self.fail_auth {
            return Err(SyncError::Auth("bad credentials".into()));
        }
        Ok(())
    }

    fn fetch_crags(&self, _guidebook_id: &str) -> Result<Vec<RawCrag>, SyncError> {
        Ok(self.crags.clone())
    }

    fn fetch_routes(&self, external_sector_id: &str) -> Result<Vec<RawRoute>, SyncError> {
        Ok(self
            .routes
            .get(external_sector_id)
            .cloned()
            .unwrap_or_default())
    }

    fn fetch_issues(&self) -> Result<Vec<RawIssue>, SyncError> {
        Ok(self.issues.clone())
    }
}

pub fn open_db() -> Connection {
    cragbookd::db::open_in_memory().expect("in-memory db")
}

pub fn raw_sector(id: i64, name: &str, sort_order: i64) -> RawSector {
    RawSector {
        id,
        name: name.to_string(),
        sort_order,
    }
}

pub fn raw_crag(id: i64, name: &str, sectors: Vec<RawSector>) -> RawCrag {
    RawCrag {
        id,
        name: name.to_string(),
        description: None,
        sort_order: 0,
        sectors,
    }
}

pub fn raw_route(id: i64, name: &str, sort_order: i64) -> RawRoute {
    RawRoute {
        id,
        name: name.to_string(),
        grade: Some("6b+".to_string()),
        route_type: Some("sport".to_string()),
        sort_order,
    }
}

pub fn raw_issue(id: i64, route_id: i64, status_id: i64, created: &str) -> RawIssue {
    RawIssue {
        id,
        route_id,
        issue_category_id: 1,
        issue_type_id: 2,
        issue_detail_id: 0,
        status_id,
        comment: Some("worn &amp; spinning bolt".to_string()),
        reported_by: Some("A Climber".to_string()),
        created: created.to_string(),
        resolved: None,
    }
}

pub fn count(conn: &Connection, sql: &str) -> i64 {
    conn.query_row(sql, [], |r| r.get(0)).expect("count query")
}

pub fn names(conn: &Connection, sql: &str) -> Vec<String> {
    let mut stmt = conn.prepare(sql).expect("prepare");
    stmt.query_map([], |r| r.get::<_, String>(0))
        .expect("query")
        .collect::<Result<Vec<_>, _>>()
        .expect("collect")
}
