use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use cragbookd::ipc::{handle_request, AppState, Request};
use serde_json::json;

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn request(state: &mut AppState, id: &str, method: &str, params: serde_json::Value) -> serde_json::Value {
    handle_request(
        state,
        Request {
            id: id.to_string(),
            method: method.to_string(),
            params,
        },
    )
}

fn request_ok(
    state: &mut AppState,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let resp = request(state, id, method, params);
    assert_eq!(
        resp.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "{} failed: {}",
        method,
        resp
    );
    resp.get("result").cloned().unwrap_or(json!(null))
}

#[test]
fn router_dispatch_covers_handler_families() {
    let workspace = temp_dir("cragbook-router-smoke");
    let mut state = AppState {
        workspace: None,
        db: None,
    };

    let health = request_ok(&mut state, "1", "health", json!({}));
    assert!(health.get("version").is_some());

    // Every data surface refuses to answer before a workspace is selected.
    let resp = request(&mut state, "1b", "crags.list", json!({}));
    assert_eq!(resp.get("ok").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(
        resp.get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str()),
        Some("no_workspace")
    );

    let _ = request_ok(
        &mut state,
        "2",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let crags = request_ok(&mut state, "3", "crags.list", json!({}));
    assert_eq!(crags.get("crags"), Some(&json!([])));

    // Sync entry points refuse to run before credentials are configured.
    let resp = request(&mut state, "4", "sync.issues", json!({}));
    assert_eq!(resp.get("ok").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(
        resp.get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str()),
        Some("sync_not_configured")
    );

    let _ = request_ok(
        &mut state,
        "5",
        "sync.settingsSet",
        json!({
            "baseUrl": "https://sloper.example",
            "username": "admin",
            "password": "hunter2",
            "guidebooks": [
                { "externalId": "gb-1", "name": "Western Crags" },
                { "externalId": "gb-2", "name": "Eastern Crags" }
            ]
        }),
    );

    // Credentials are write-only on the read surface.
    let settings = request_ok(&mut state, "6", "sync.settingsGet", json!({}));
    assert_eq!(settings.get("username"), Some(&json!("admin")));
    assert_eq!(settings.get("passwordSet"), Some(&json!(true)));
    assert!(settings.get("password").is_none());
    assert_eq!(
        settings
            .get("guidebooks")
            .and_then(|v| v.as_array())
            .map(|a| a.len()),
        Some(2)
    );

    let resp = request(
        &mut state,
        "7",
        "sync.cragsAndSectors",
        json!({ "bookIndex": 9 }),
    );
    assert_eq!(resp.get("ok").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(
        resp.get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str()),
        Some("bad_params")
    );

    let resp = request(&mut state, "8", "no.such.method", json!({}));
    assert_eq!(
        resp.get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str()),
        Some("not_implemented")
    );
}

#[test]
fn sync_entry_points_answer_ok_with_a_log_even_when_the_source_is_down() {
    let workspace = temp_dir("cragbook-sync-down");
    let mut state = AppState {
        workspace: None,
        db: None,
    };
    let _ = request_ok(
        &mut state,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    // Nothing listens here; authentication fails immediately.
    let _ = request_ok(
        &mut state,
        "2",
        "sync.settingsSet",
        json!({
            "baseUrl": "http://127.0.0.1:9",
            "username": "admin",
            "password": "hunter2",
            "guidebooks": [{ "externalId": "gb-1", "name": "Western Crags" }]
        }),
    );

    let result = request_ok(&mut state, "3", "sync.issues", json!({}));
    let log = result
        .get("log")
        .and_then(|v| v.as_array())
        .expect("log array");
    assert!(
        log.iter()
            .any(|l| l.as_str().unwrap_or("").contains("sync aborted")),
        "{:?}",
        log
    );
}
