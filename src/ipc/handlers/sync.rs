use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::sloper::{self, HttpSloperApi, SyncLog};
use serde_json::{json, Value};

const SETTINGS_KEY: &str = "sync.sloper";

struct SloperSettings {
    base_url: String,
    username: String,
    password: String,
    /// Ordered by priority: guidebooks listed later are processed later,
    /// so their records win duplicate resolution.
    guidebooks: Vec<(String, String)>, // (external id, display name)
}

fn default_settings() -> Value {
    json!({
        "baseUrl": "",
        "username": "",
        "password": "",
        "guidebooks": []
    })
}

fn load_settings(conn: &rusqlite::Connection) -> Result<SloperSettings, String> {
    let raw = db::settings_get_json(conn, SETTINGS_KEY)
        .map_err(|e| e.to_string())?
        .unwrap_or_else(default_settings);

    let str_field = |key: &str| -> String {
        raw.get(key)
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .trim()
            .to_string()
    };
    let guidebooks = raw
        .get("guidebooks")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|g| {
                    let external_id = g.get("externalId")?.as_str()?.to_string();
                    let name = g
                        .get("name")
                        .and_then(|v| v.as_str())
                        .unwrap_or("")
                        .to_string();
                    Some((external_id, name))
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    Ok(SloperSettings {
        base_url: str_field("baseUrl"),
        username: str_field("username"),
        password: str_field("password"),
        guidebooks,
    })
}

fn require_configured(s: &SloperSettings) -> Result<(), String> {
    if s.base_url.is_empty() || s.username.is_empty() || s.password.is_empty() {
        return Err("sloper base url and credentials are not configured".into());
    }
    Ok(())
}

fn handle_settings_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let raw = match db::settings_get_json(conn, SETTINGS_KEY) {
        Ok(v) => v.unwrap_or_else(default_settings),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    // Credentials are write-only through this surface.
    let password_set = raw
        .get("password")
        .and_then(|v| v.as_str())
        .map(|s| !s.is_empty())
        .unwrap_or(false);
    ok(
        &req.id,
        json!({
            "baseUrl": raw.get("baseUrl").cloned().unwrap_or(json!("")),
            "username": raw.get("username").cloned().unwrap_or(json!("")),
            "passwordSet": password_set,
            "guidebooks": raw.get("guidebooks").cloned().unwrap_or(json!([])),
        }),
    )
}

fn handle_settings_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let mut current = match db::settings_get_json(conn, SETTINGS_KEY) {
        Ok(v) => v.unwrap_or_else(default_settings),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    for key in ["baseUrl", "username", "password"] {
        if let Some(v) = req.params.get(key) {
            let Some(s) = v.as_str() else {
                return err(&req.id, "bad_params", format!("{} must be string", key), None);
            };
            current[key] = json!(s.trim());
        }
    }
    if let Some(v) = req.params.get("guidebooks") {
        let Some(arr) = v.as_array() else {
            return err(&req.id, "bad_params", "guidebooks must be an array", None);
        };
        for g in arr {
            if g.get("externalId").and_then(|v| v.as_str()).is_none() {
                return err(
                    &req.id,
                    "bad_params",
                    "each guidebook needs a string externalId",
                    None,
                );
            }
        }
        current["guidebooks"] = v.clone();
    }

    if let Err(e) = db::settings_set_json(conn, SETTINGS_KEY, &current) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    ok(&req.id, json!({ "ok": true }))
}

fn handle_sync_crags_and_sectors(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(book_index) = req.params.get("bookIndex").and_then(|v| v.as_u64()) else {
        return err(&req.id, "bad_params", "missing bookIndex", None);
    };

    let settings = match load_settings(conn) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e, None),
    };
    if let Err(e) = require_configured(&settings) {
        return err(&req.id, "sync_not_configured", e, None);
    }
    let Some((guidebook_id, guidebook_name)) = settings.guidebooks.get(book_index as usize) else {
        return err(
            &req.id,
            "bad_params",
            format!("bookIndex {} out of range", book_index),
            None,
        );
    };

    let mut api = HttpSloperApi::new(&settings.base_url, &settings.username, &settings.password);
    let mut log = SyncLog::new();
    log.info(format!(
        "syncing crags and sectors from guidebook {:?}",
        guidebook_name
    ));

    let sector_list =
        match sloper::sync_crags_and_sectors(conn, &mut api, &mut log, guidebook_id) {
            Ok(handles) => handles
                .iter()
                .map(|h| {
                    json!({
                        "sectorId": h.sector_id,
                        "externalSectorId": h.external_sector_id,
                        "name": h.name,
                    })
                })
                .collect::<Vec<_>>(),
            Err(e) => {
                log.warn(format!("sync aborted: {}", e));
                Vec::new()
            }
        };

    ok(
        &req.id,
        json!({ "log": log.into_lines(), "sectorList": sector_list }),
    )
}

fn handle_sync_routes(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(sector_id) = req.params.get("sectorId").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing sectorId", None);
    };
    let Some(external_sector_id) = req.params.get("externalSectorId").and_then(|v| v.as_str())
    else {
        return err(&req.id, "bad_params", "missing externalSectorId", None);
    };

    let settings = match load_settings(conn) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e, None),
    };
    if let Err(e) = require_configured(&settings) {
        return err(&req.id, "sync_not_configured", e, None);
    }

    let mut api = HttpSloperApi::new(&settings.base_url, &settings.username, &settings.password);
    let mut log = SyncLog::new();

    let sync_count =
        match sloper::sync_routes(conn, &mut api, &mut log, sector_id, external_sector_id) {
            Ok(n) => n,
            Err(e) => {
                log.warn(format!("sync aborted: {}", e));
                0
            }
        };

    ok(
        &req.id,
        json!({ "log": log.into_lines(), "syncCount": sync_count }),
    )
}

fn handle_sync_issues(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let settings = match load_settings(conn) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e, None),
    };
    if let Err(e) = require_configured(&settings) {
        return err(&req.id, "sync_not_configured", e, None);
    }

    let mut api = HttpSloperApi::new(&settings.base_url, &settings.username, &settings.password);
    let mut log = SyncLog::new();

    if let Err(e) = sloper::sync_issues(conn, &mut api, &mut log) {
        log.warn(format!("sync aborted: {}", e));
    }

    ok(&req.id, json!({ "log": log.into_lines() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "sync.settingsGet" => Some(handle_settings_get(state, req)),
        "sync.settingsSet" => Some(handle_settings_set(state, req)),
        "sync.cragsAndSectors" => Some(handle_sync_crags_and_sectors(state, req)),
        "sync.routes" => Some(handle_sync_routes(state, req)),
        "sync.issues" => Some(handle_sync_issues(state, req)),
        _ => None,
    }
}
