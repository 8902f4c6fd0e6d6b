//! In-memory stand-in for the Neocities API (`/api/info`, `/api/list`,
//! `/api/delete`, `/api/upload`) used by the client's integration tests.
//!
//! One site, owned by `TEST_API_KEY`, is seeded with a few files; a second
//! public site exists for info lookups. Responses use the Neocities envelope:
//! `{"result":"success",...}` or `{"result":"error","error_type":..,"message":..}`.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    extract::{Multipart, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};

pub const TEST_API_KEY: &str = "test-api-key";
pub const OWNER_SITE: &str = "youpi";
pub const PUBLIC_SITE: &str = "neighbour";

const TIMESTAMP: &str = "Sat, 13 Feb 2016 03:04:00 -0000";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SiteRecord {
    pub sitename: String,
    pub hits: i64,
    pub created_at: String,
    pub last_updated: String,
    pub domain: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct Site {
    pub record: Option<SiteRecord>,
    pub files: BTreeMap<String, Vec<u8>>,
}

#[derive(Debug)]
pub struct MockState {
    pub api_key: String,
    pub owner: String,
    pub sites: HashMap<String, Site>,
}

impl MockState {
    /// The owner's site with `index.html`, `not_found.html` and
    /// `images/cat.png`, plus a public neighbour site.
    pub fn seeded() -> Self {
        let mut files = BTreeMap::new();
        files.insert("index.html".to_string(), b"<h1>hi</h1>".to_vec());
        files.insert("not_found.html".to_string(), b"<h1>404</h1>".to_vec());
        files.insert("images/cat.png".to_string(), vec![0x89, b'P', b'N', b'G']);

        let mut sites = HashMap::new();
        sites.insert(
            OWNER_SITE.to_string(),
            Site {
                record: Some(site_record(OWNER_SITE, 5072, None, &["art", "music"])),
                files,
            },
        );
        sites.insert(
            PUBLIC_SITE.to_string(),
            Site {
                record: Some(site_record(PUBLIC_SITE, 12, Some("neighbour.example"), &[])),
                files: BTreeMap::new(),
            },
        );

        Self {
            api_key: TEST_API_KEY.to_string(),
            owner: OWNER_SITE.to_string(),
            sites,
        }
    }

    fn owner_site(&mut self) -> &mut Site {
        self.sites.entry(self.owner.clone()).or_default()
    }
}

fn site_record(name: &str, hits: i64, domain: Option<&str>, tags: &[&str]) -> SiteRecord {
    SiteRecord {
        sitename: name.to_string(),
        hits,
        created_at: TIMESTAMP.to_string(),
        last_updated: TIMESTAMP.to_string(),
        domain: domain.map(str::to_string),
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

pub type Db = Arc<RwLock<MockState>>;

pub fn app() -> Router {
    app_with_state(MockState::seeded())
}

pub fn app_with_state(state: MockState) -> Router {
    let db: Db = Arc::new(RwLock::new(state));
    Router::new()
        .route("/api/info", get(site_info))
        .route("/api/list", get(list_files))
        .route("/api/delete", post(delete_files))
        .route("/api/upload", post(upload_files))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// A Neocities-style error envelope.
#[derive(Debug)]
pub struct ApiFailure {
    status: StatusCode,
    error_type: &'static str,
    message: String,
}

impl ApiFailure {
    fn new(status: StatusCode, error_type: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            error_type,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let body = json!({
            "result": "error",
            "error_type": self.error_type,
            "message": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

fn success_message(message: &str) -> Json<Value> {
    Json(json!({ "result": "success", "message": message }))
}

fn authorize(state: &MockState, headers: &HeaderMap) -> Result<(), ApiFailure> {
    let expected = format!("Bearer {}", state.api_key);
    let supplied = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    if supplied == Some(expected.as_str()) {
        Ok(())
    } else {
        Err(ApiFailure::new(
            StatusCode::FORBIDDEN,
            "invalid_auth",
            "invalid credentials - please check your username and password",
        ))
    }
}

#[derive(Deserialize)]
pub struct InfoQuery {
    pub sitename: Option<String>,
}

async fn site_info(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(query): Query<InfoQuery>,
) -> Result<Json<Value>, ApiFailure> {
    let state = db.read().await;
    let name = match query.sitename {
        Some(name) => name,
        None => {
            authorize(&state, &headers)?;
            state.owner.clone()
        }
    };
    debug!(sitename = %name, "info");
    let record = state
        .sites
        .get(&name)
        .and_then(|site| site.record.clone())
        .ok_or_else(|| ApiFailure::new(StatusCode::NOT_FOUND, "site_not_found", "site not found"))?;
    Ok(Json(json!({ "result": "success", "info": record })))
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub path: Option<String>,
}

async fn list_files(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiFailure> {
    let mut state = db.write().await;
    authorize(&state, &headers)?;
    let site = state.owner_site();

    let mut entries: BTreeMap<String, Value> = BTreeMap::new();
    for (path, contents) in &site.files {
        let segments: Vec<&str> = path.split('/').collect();
        let mut dir = String::new();
        for segment in &segments[..segments.len() - 1] {
            if !dir.is_empty() {
                dir.push('/');
            }
            dir.push_str(segment);
            entries.insert(
                dir.clone(),
                json!({ "path": dir, "is_directory": true, "updated_at": TIMESTAMP }),
            );
        }
        entries.insert(
            path.clone(),
            json!({
                "path": path,
                "is_directory": false,
                "size": contents.len(),
                "updated_at": TIMESTAMP,
            }),
        );
    }

    let prefix = query.path.map(|p| format!("{}/", p.trim_end_matches('/')));
    let files: Vec<Value> = entries
        .into_iter()
        .filter(|(path, _)| prefix.as_ref().map_or(true, |p| path.starts_with(p.as_str())))
        .map(|(_, entry)| entry)
        .collect();
    Ok(Json(json!({ "result": "success", "files": files })))
}

/// Pull `filenames[]` values out of a form-encoded body.
pub fn parse_filenames(body: &str) -> Vec<String> {
    body.split('&')
        .filter_map(|pair| pair.split_once('='))
        .filter(|(key, _)| *key == "filenames[]" || *key == "filenames%5B%5D")
        .map(|(_, value)| {
            let value = value.replace('+', " ");
            percent_decode_str(&value).decode_utf8_lossy().into_owned()
        })
        .collect()
}

async fn delete_files(
    State(db): State<Db>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<Value>, ApiFailure> {
    let mut state = db.write().await;
    authorize(&state, &headers)?;
    let filenames = parse_filenames(&body);
    if filenames.is_empty() {
        return Err(ApiFailure::new(
            StatusCode::BAD_REQUEST,
            "missing_filenames",
            "you must provide files to delete",
        ));
    }

    let site = state.owner_site();
    if let Some(missing) = filenames.iter().find(|f| !site.files.contains_key(*f)) {
        return Err(ApiFailure::new(
            StatusCode::BAD_REQUEST,
            "missing_files",
            format!("{missing} was not found on your site, canceled deleting"),
        ));
    }
    for name in &filenames {
        site.files.remove(name);
    }
    info!(count = filenames.len(), "deleted files");
    Ok(success_message("file(s) have been deleted"))
}

async fn upload_files(
    State(db): State<Db>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiFailure> {
    authorize(&*db.read().await, &headers)?;

    let mut uploaded = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiFailure::new(StatusCode::BAD_REQUEST, "invalid_file_type", e.to_string()))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiFailure::new(StatusCode::BAD_REQUEST, "invalid_file_type", e.to_string()))?;
        uploaded.push((name, data.to_vec()));
    }
    if uploaded.is_empty() {
        return Err(ApiFailure::new(
            StatusCode::BAD_REQUEST,
            "missing_files",
            "you must provide files to upload",
        ));
    }

    let mut state = db.write().await;
    let site = state.owner_site();
    for (name, data) in uploaded {
        site.files.insert(name, data);
    }
    Ok(success_message("your file(s) have been successfully uploaded"))
}
