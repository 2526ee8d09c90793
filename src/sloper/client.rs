//! HTTP client for the upstream "sloper" API.
//!
//! The engine is deliberately sequential (duplicate detection reads the
//! effects of immediately preceding writes), so a blocking client is the
//! right shape here. One `authenticate` per sync session; the token is
//! not cached across runs.

use serde::Deserialize;

use super::error::SyncError;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSector {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub sort_order: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCrag {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sort_order: i64,
    // The upstream API has no standalone sector listing; sectors ride
    // along on the crag payload.
    #[serde(default)]
    pub sectors: Vec<RawSector>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRoute {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub route_type: Option<String>,
    #[serde(default)]
    pub sort_order: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawIssue {
    pub id: i64,
    pub route_id: i64,
    #[serde(default)]
    pub issue_category_id: i64,
    #[serde(default)]
    pub issue_type_id: i64,
    #[serde(default)]
    pub issue_detail_id: i64,
    #[serde(default)]
    pub status_id: i64,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub reported_by: Option<String>,
    pub created: String,
    #[serde(default)]
    pub resolved: Option<String>,
}

/// Seam between the reconciliation engine and the upstream API. Tests
/// substitute a scripted implementation.
pub trait SloperApi {
    fn authenticate(&mut self) -> Result<(), SyncError>;
    fn fetch_crags(&self, guidebook_id: &str) -> Result<Vec<RawCrag>, SyncError>;
    fn fetch_routes(&self, external_sector_id: &str) -> Result<Vec<RawRoute>, SyncError>;
    fn fetch_issues(&self) -> Result<Vec<RawIssue>, SyncError>;
}

pub struct HttpSloperApi {
    base_url: String,
    username: String,
    password: String,
    token: Option<String>,
    http: reqwest::blocking::Client,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: Option<String>,
}

impl HttpSloperApi {
    pub fn new(base_url: &str, username: &str, password: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
            token: None,
            http: reqwest::blocking::Client::new(),
        }
    }

    fn token(&self) -> Result<&str, SyncError> {
        self.token
            .as_deref()
            .ok_or_else(|| SyncError::Auth("not authenticated".into()))
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, SyncError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(self.token()?)
            .send()
            .map_err(|e| SyncError::Fetch(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(SyncError::Fetch(format!(
                "GET {} returned {}",
                path,
                resp.status()
            )));
        }
        resp.json().map_err(|e| SyncError::Fetch(e.to_string()))
    }
}

impl SloperApi for HttpSloperApi {
    fn authenticate(&mut self) -> Result<(), SyncError> {
        let url = format!("{}/api/v1/login", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(&serde_json::json!({
                "username": self.username,
                "password": self.password,
            }))
            .send()
            .map_err(|e| SyncError::Auth(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(SyncError::Auth(format!("login returned {}", resp.status())));
        }
        let body: LoginResponse = resp.json().map_err(|e| SyncError::Auth(e.to_string()))?;
        match body.token {
            Some(t) if !t.is_empty() => {
                self.token = Some(t);
                Ok(())
            }
            _ => Err(SyncError::Auth("login response carried no token".into())),
        }
    }

    fn fetch_crags(&self, guidebook_id: &str) -> Result<Vec<RawCrag>, SyncError> {
        self.get_json(&format!("/api/v1/guidebooks/{}/crags", guidebook_id))
    }

    fn fetch_routes(&self, external_sector_id: &str) -> Result<Vec<RawRoute>, SyncError> {
        self.get_json(&format!("/api/v1/sectors/{}/routes", external_sector_id))
    }

    fn fetch_issues(&self) -> Result<Vec<RawIssue>, SyncError> {
        self.get_json("/api/v1/issues")
    }
}
