//! Integration test library - an in-process fake of the Schematics API
//!
//! The fake speaks just enough of the IAM and Schematics APIs to drive a
//! workspace through its whole lifecycle, and records every request so tests
//! can check what the client sent.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Multipart, Path, Query, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Form, Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

use schematics_client::{Client, Config};

/// API key the fake IAM endpoint accepts
pub const TEST_API_KEY: &str = "test-api-key";

/// Identity of every action the client triggers
pub const TEST_USER: &str = "tester@example.com";

/// Identity of another tool working on the same workspaces
pub const OTHER_USER: &str = "ci-bot@example.com";

pub const REFRESH_TOKEN: &str = "fake-refresh-token";

/// Computes the outputs of an apply from the workspace variables
pub type OutputFn = fn(&HashMap<String, String>) -> serde_json::Map<String, Value>;

/// Behavior of the fake service
#[derive(Clone)]
pub struct FakeOptions {
    /// Activity reads answered with INPROGRESS before an activity finishes
    pub polls_until_done: usize,
    /// Action name (e.g. "APPLY") whose activities end FAILED
    pub failing_action: Option<&'static str>,
    /// Return `activityid` from plan/apply/destroy triggers
    pub return_activity_ids: bool,
    pub outputs: OutputFn,
}

impl Default for FakeOptions {
    fn default() -> Self {
        Self {
            polls_until_done: 2,
            failing_action: None,
            return_activity_ids: true,
            outputs: resource_group_outputs,
        }
    }
}

/// Output of the demo code: a resource group named after the prefix
pub fn resource_group_outputs(variables: &HashMap<String, String>) -> serde_json::Map<String, Value> {
    let mut outputs = serde_json::Map::new();
    if let Some(prefix) = variables.get("prefix") {
        outputs.insert(
            "name".to_string(),
            json!({"sensitive": false, "type": "string", "value": format!("{}-group", prefix)}),
        );
    }
    outputs
}

/// One request seen by the fake
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub refresh_token: Option<String>,
    pub github_token: Option<String>,
}

impl RecordedRequest {
    /// "METHOD /path", handy for ordering assertions
    pub fn line(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

#[derive(Debug, Clone)]
struct FakeAction {
    id: String,
    name: String,
    performed_by: String,
    performed_at: String,
    polls: usize,
}

#[derive(Debug, Clone)]
struct FakeWorkspace {
    record: Value,
    variables: HashMap<String, String>,
    actions: Vec<FakeAction>,
    outputs: serde_json::Map<String, Value>,
}

#[derive(Default)]
struct Store {
    requests: Vec<RecordedRequest>,
    workspaces: HashMap<String, FakeWorkspace>,
    uploads: HashMap<String, Vec<u8>>,
    tokens_issued: usize,
}

struct FakeState {
    options: FakeOptions,
    store: Mutex<Store>,
}

type SharedState = Arc<FakeState>;

/// Running fake service, stopped on drop
pub struct FakeSchematics {
    addr: SocketAddr,
    state: SharedState,
    server: JoinHandle<()>,
}

impl FakeSchematics {
    pub async fn start() -> Self {
        Self::start_with(FakeOptions::default()).await
    }

    pub async fn start_with(options: FakeOptions) -> Self {
        init_tracing();

        let state = Arc::new(FakeState {
            options,
            store: Mutex::new(Store::default()),
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake server");
        let addr = listener.local_addr().expect("Failed to read local address");

        let app = router(state.clone());
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            addr,
            state,
            server,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Client configuration pointing at the fake, with fast polling
    pub fn config(&self) -> Config {
        Config {
            api_endpoint: self.base_url(),
            iam_endpoint: format!("{}/identity/token", self.base_url()),
            api_key: Some(TEST_API_KEY.to_string()),
            poll_initial_ms: 5,
            poll_max_ms: 20,
            wait_timeout: 10,
            ..Config::default()
        }
    }

    pub fn client(&self) -> Client {
        Client::new(self.config()).expect("Failed to create client")
    }

    /// Every request received so far, in order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    /// "METHOD /path" of every API request, IAM calls excluded
    pub fn api_calls(&self) -> Vec<String> {
        self.lock()
            .requests
            .iter()
            .filter(|r| r.path.starts_with("/v1/"))
            .map(RecordedRequest::line)
            .collect()
    }

    /// Archive uploaded to a workspace
    pub fn upload(&self, workspace_id: &str) -> Option<Vec<u8>> {
        self.lock().uploads.get(workspace_id).cloned()
    }

    pub fn tokens_issued(&self) -> usize {
        self.lock().tokens_issued
    }

    pub fn workspace_exists(&self, workspace_id: &str) -> bool {
        self.lock().workspaces.contains_key(workspace_id)
    }

    /// Add a workspace created by another tool
    pub fn seed_workspace(&self, name: &str, status: &str) -> String {
        let id = workspace_id(name);
        let record = workspace_record(&id, name, "", "us-east", OTHER_USER, status, &[]);
        self.lock().workspaces.insert(
            id.clone(),
            FakeWorkspace {
                record,
                variables: HashMap::new(),
                actions: Vec::new(),
                outputs: serde_json::Map::new(),
            },
        );
        id
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Store> {
        self.state.store.lock().expect("Fake store poisoned")
    }
}

impl Drop for FakeSchematics {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Send client logs to the test output, filtered by `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Read every file of an uploaded tar archive
pub fn unpack(archive: &[u8]) -> HashMap<String, String> {
    use std::io::Read;

    let mut files = HashMap::new();
    let mut archive = tar::Archive::new(archive);
    for entry in archive.entries().expect("Failed to read archive") {
        let mut entry = entry.expect("Failed to read archive entry");
        let name = entry
            .path()
            .expect("Invalid entry path")
            .to_string_lossy()
            .to_string();
        let mut content = String::new();
        entry
            .read_to_string(&mut content)
            .expect("Failed to read entry content");
        files.insert(name, content);
    }
    files
}

// ============================================================================
// Router
// ============================================================================

fn router(state: SharedState) -> Router {
    let api_routes = Router::new()
        .route("/version", get(version))
        .route("/workspaces", post(create_workspace).get(list_workspaces))
        .route(
            "/workspaces/{id}",
            get(get_workspace).delete(delete_workspace),
        )
        .route("/workspaces/{id}/actions", get(list_actions))
        .route("/workspaces/{id}/actions/{action_id}", get(get_action))
        .route("/workspaces/{id}/plan", put(plan))
        .route("/workspaces/{id}/apply", put(apply))
        .route("/workspaces/{id}/destroy", put(destroy))
        .route("/workspaces/{id}/output_values", get(output_values))
        .route(
            "/workspaces/{id}/template_data/{template_id}/template_repo_upload",
            put(upload_tar),
        )
        .layer(middleware::from_fn(require_bearer));

    Router::new()
        .route("/identity/token", post(issue_token))
        .nest("/v1", api_routes)
        .layer(middleware::from_fn_with_state(state.clone(), record))
        .with_state(state)
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn record(State(state): State<SharedState>, request: Request, next: Next) -> Response {
    let headers = request.headers();
    let recorded = RecordedRequest {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        query: request.uri().query().map(str::to_string),
        authorization: header(headers, "authorization"),
        refresh_token: header(headers, "refresh_token"),
        github_token: header(headers, "x-github-token"),
    };
    state
        .store
        .lock()
        .expect("Fake store poisoned")
        .requests
        .push(recorded);

    next.run(request).await
}

async fn require_bearer(request: Request, next: Next) -> Result<Response, StatusCode> {
    let authorized = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Bearer fake-access-"));

    if !authorized {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(next.run(request).await)
}

fn not_found(what: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "messagekey": "M1012_NotFound",
            "message": format!("{} not found", what),
            "requestid": uuid::Uuid::new_v4().to_string(),
        })),
    )
        .into_response()
}

fn workspace_id(name: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", name.to_lowercase(), &suffix[..8])
}

fn workspace_record(
    id: &str,
    name: &str,
    description: &str,
    location: &str,
    created_by: &str,
    status: &str,
    template_data: &[Value],
) -> Value {
    json!({
        "id": id,
        "name": name,
        "crn": format!("crn:v1:fake:schematics:{}:workspace:{}", location, id),
        "type": ["terraform_v0.13"],
        "description": description,
        "resource_group": "Default",
        "location": location,
        "tags": [],
        "created_at": Utc::now().to_rfc3339(),
        "created_by": created_by,
        "status": status,
        "workspace_status": {"frozen": false, "locked": false},
        "template_data": template_data,
        "last_health_check_at": "0001-01-01T00:00:00Z",
    })
}

// ============================================================================
// IAM
// ============================================================================

async fn issue_token(
    State(state): State<SharedState>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let valid = form.get("grant_type").map(String::as_str)
        == Some("urn:ibm:params:oauth:grant-type:apikey")
        && form.get("apikey").map(String::as_str) == Some(TEST_API_KEY);
    if !valid {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"errorCode": "BXNIM0415E", "errorMessage": "Provided API key could not be found."})),
        )
            .into_response();
    }

    let mut store = state.store.lock().expect("Fake store poisoned");
    store.tokens_issued += 1;

    Json(json!({
        "access_token": format!("fake-access-{}", store.tokens_issued),
        "refresh_token": REFRESH_TOKEN,
        "token_type": "Bearer",
        "expires_in": 3600,
        "expiration": Utc::now().timestamp() + 3600,
    }))
    .into_response()
}

// ============================================================================
// Workspaces
// ============================================================================

async fn create_workspace(State(state): State<SharedState>, Json(body): Json<Value>) -> Response {
    let location = body["location"].as_str().unwrap_or_default();
    if location == "nowhere" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "messagekey": "M1008_InvalidLocation",
                "message": "location nowhere is not supported",
                "requestid": "req-location",
            })),
        )
            .into_response();
    }

    let name = body["name"].as_str().unwrap_or("workspace");
    let id = workspace_id(name);
    let template_id = format!("iac-{}", &uuid::Uuid::new_v4().simple().to_string()[..12]);

    let request_template = &body["template_data"][0];
    let variables: HashMap<String, String> = request_template["variablestore"]
        .as_array()
        .map(|vars| {
            vars.iter()
                .filter_map(|v| {
                    Some((
                        v["name"].as_str()?.to_string(),
                        v["value"].as_str().unwrap_or_default().to_string(),
                    ))
                })
                .collect()
        })
        .unwrap_or_default();

    // The service expands a /tree/<branch>/<folder> URL into its parts
    let mut folder = request_template["folder"].as_str().unwrap_or(".").to_string();
    if folder.is_empty() {
        folder = ".".to_string();
    }
    let template_repo = body["template_repo"]["url"].as_str().map(|url| {
        let (url, branch) = match url.split_once("/tree/") {
            Some((base, rest)) => {
                let (branch, path) = rest.split_once('/').unwrap_or((rest, ""));
                if !path.is_empty() {
                    folder = path.to_string();
                }
                (base.to_string(), branch.to_string())
            }
            None => (url.to_string(), "master".to_string()),
        };
        json!({"url": url, "branch": branch, "has_uploadedgitrepotar": false})
    });

    let template = json!({
        "id": template_id,
        "folder": folder,
        "type": request_template["type"],
        "variablestore": request_template["variablestore"],
        "has_githubtoken": false,
    });
    let mut record = workspace_record(
        &id,
        name,
        body["description"].as_str().unwrap_or_default(),
        if location.is_empty() { "us-south" } else { location },
        TEST_USER,
        "DRAFT",
        &[template],
    );
    if let Some(repo) = template_repo {
        record["template_repo"] = repo;
    }

    let now = Utc::now();
    let actions = vec![
        FakeAction {
            id: uuid::Uuid::new_v4().simple().to_string(),
            name: "WORKSPACE_CREATE".to_string(),
            performed_by: TEST_USER.to_string(),
            performed_at: now.to_rfc3339(),
            polls: 0,
        },
        // Another tool touching the same workspace right after us
        FakeAction {
            id: uuid::Uuid::new_v4().simple().to_string(),
            name: "WORKSPACE_CREATE".to_string(),
            performed_by: OTHER_USER.to_string(),
            performed_at: (now + chrono::Duration::seconds(5)).to_rfc3339(),
            polls: usize::MAX / 2,
        },
    ];

    state.store.lock().expect("Fake store poisoned").workspaces.insert(
        id,
        FakeWorkspace {
            record: record.clone(),
            variables,
            actions,
            outputs: serde_json::Map::new(),
        },
    );

    (StatusCode::CREATED, Json(record)).into_response()
}

async fn list_workspaces(State(state): State<SharedState>) -> Json<Value> {
    let store = state.store.lock().expect("Fake store poisoned");
    let workspaces: Vec<Value> = store.workspaces.values().map(|w| w.record.clone()).collect();

    Json(json!({
        "offset": 0,
        "limit": 100,
        "count": workspaces.len(),
        "workspaces": workspaces,
    }))
}

async fn get_workspace(State(state): State<SharedState>, Path(id): Path<String>) -> Response {
    let store = state.store.lock().expect("Fake store poisoned");
    match store.workspaces.get(&id) {
        Some(workspace) => Json(workspace.record.clone()).into_response(),
        None => not_found("workspace"),
    }
}

async fn delete_workspace(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if header(&headers, "refresh_token").as_deref() != Some(REFRESH_TOKEN) {
        return (StatusCode::BAD_REQUEST, Json(json!({"message": "refresh_token is required"})))
            .into_response();
    }
    if query.get("destroy_resources").is_none() {
        return (StatusCode::BAD_REQUEST, Json(json!({"message": "destroy_resources is required"})))
            .into_response();
    }

    let mut store = state.store.lock().expect("Fake store poisoned");
    match store.workspaces.remove(&id) {
        Some(_) => Json(json!(id)).into_response(),
        None => not_found("workspace"),
    }
}

// ============================================================================
// Actions
// ============================================================================

fn action_status(options: &FakeOptions, action: &FakeAction) -> &'static str {
    if action.polls < options.polls_until_done {
        "INPROGRESS"
    } else if options.failing_action == Some(action.name.as_str())
        || action.performed_by == OTHER_USER
    {
        "FAILED"
    } else {
        "DONE"
    }
}

fn action_json(options: &FakeOptions, action: &FakeAction) -> Value {
    let status = action_status(options, action);
    let message = if status == "FAILED" {
        format!("{} failed on the fake service", action.name)
    } else {
        String::new()
    };
    json!({
        "action_id": action.id,
        "name": action.name,
        "status": status,
        "message": [],
        "performed_by": action.performed_by,
        "performed_at": action.performed_at,
        "templates": [{
            "template_type": "terraform_v0.13",
            "start_time": action.performed_at,
            "status": status,
            "message": message,
        }],
    })
}

async fn list_actions(State(state): State<SharedState>, Path(id): Path<String>) -> Response {
    let store = state.store.lock().expect("Fake store poisoned");
    let Some(workspace) = store.workspaces.get(&id) else {
        return not_found("workspace");
    };

    let actions: Vec<Value> = workspace
        .actions
        .iter()
        .map(|a| action_json(&state.options, a))
        .collect();
    Json(json!({
        "workspace_id": id,
        "workspace_name": workspace.record["name"],
        "actions": actions,
    }))
    .into_response()
}

async fn get_action(
    State(state): State<SharedState>,
    Path((id, action_id)): Path<(String, String)>,
) -> Response {
    let mut store = state.store.lock().expect("Fake store poisoned");
    let Some(workspace) = store.workspaces.get_mut(&id) else {
        return not_found("workspace");
    };
    let Some(index) = workspace.actions.iter().position(|a| a.id == action_id) else {
        return not_found("action");
    };

    let action = &mut workspace.actions[index];
    let body = action_json(&state.options, action);
    action.polls = action.polls.saturating_add(1);
    let name = action.name.clone();

    if body["status"] == "DONE" {
        let status = if name == "APPLY" { "ACTIVE" } else { "INACTIVE" };
        workspace.record["status"] = json!(status);
        if name == "APPLY" {
            workspace.outputs = (state.options.outputs)(&workspace.variables);
        }
    }

    Json(body).into_response()
}

fn trigger(state: &SharedState, id: &str, name: &str, headers: &HeaderMap) -> Response {
    if header(headers, "refresh_token").as_deref() != Some(REFRESH_TOKEN) {
        return (StatusCode::BAD_REQUEST, Json(json!({"message": "refresh_token is required"})))
            .into_response();
    }

    let mut store = state.store.lock().expect("Fake store poisoned");
    let Some(workspace) = store.workspaces.get_mut(id) else {
        return not_found("workspace");
    };

    let action = FakeAction {
        id: uuid::Uuid::new_v4().simple().to_string(),
        name: name.to_string(),
        performed_by: TEST_USER.to_string(),
        performed_at: Utc::now().to_rfc3339(),
        polls: 0,
    };
    let action_id = action.id.clone();
    workspace.actions.push(action);
    if name == "DESTROY" {
        workspace.outputs.clear();
    }

    let body = if state.options.return_activity_ids {
        json!({"activityid": action_id})
    } else {
        json!({})
    };
    (StatusCode::ACCEPTED, Json(body)).into_response()
}

async fn plan(State(state): State<SharedState>, Path(id): Path<String>, headers: HeaderMap) -> Response {
    trigger(&state, &id, "PLAN", &headers)
}

async fn apply(State(state): State<SharedState>, Path(id): Path<String>, headers: HeaderMap) -> Response {
    trigger(&state, &id, "APPLY", &headers)
}

async fn destroy(State(state): State<SharedState>, Path(id): Path<String>, headers: HeaderMap) -> Response {
    trigger(&state, &id, "DESTROY", &headers)
}

async fn output_values(State(state): State<SharedState>, Path(id): Path<String>) -> Response {
    let store = state.store.lock().expect("Fake store poisoned");
    let Some(workspace) = store.workspaces.get(&id) else {
        return not_found("workspace");
    };

    let template_id = workspace.record["template_data"][0]["id"].clone();
    let output_values: Vec<Value> = workspace
        .outputs
        .iter()
        .map(|(name, value)| {
            let mut entry = serde_json::Map::new();
            entry.insert(name.clone(), value.clone());
            Value::Object(entry)
        })
        .collect();

    Json(json!([{
        "folder": workspace.record["template_data"][0]["folder"],
        "id": template_id,
        "output_values": output_values,
        "value_type": "terraform_v0.13",
    }]))
    .into_response()
}

async fn upload_tar(
    State(state): State<SharedState>,
    Path((id, template_id)): Path<(String, String)>,
    mut multipart: Multipart,
) -> Response {
    let mut archive = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("file") {
            archive = field.bytes().await.ok();
        }
    }
    let Some(archive) = archive else {
        return (StatusCode::BAD_REQUEST, Json(json!({"message": "file part is required"})))
            .into_response();
    };

    let mut store = state.store.lock().expect("Fake store poisoned");
    let Some(workspace) = store.workspaces.get(&id) else {
        return not_found("workspace");
    };
    if workspace.record["template_data"][0]["id"] != json!(template_id) {
        return not_found("template");
    }

    store.uploads.insert(id.clone(), archive.to_vec());
    Json(json!({
        "id": id,
        "file_value": ".tar",
        "has_received_file": true,
    }))
    .into_response()
}

// ============================================================================
// Version
// ============================================================================

async fn version() -> Json<Value> {
    Json(json!({
        "commitsha": "40db47f4aae3b84f23b173e5ab9c3efe71092d37",
        "builddate": "2020-12-11T10:33:56Z",
        "buildno": "6525",
        "supported_template_types": [
            {"ansible": "v2.9.7", "helm": "v3.1.1", "ibm_cloud_provider": "v1.17.0", "template_name": "terraform_v0.12", "terraform": "v0.12.20"},
            {"ansible": "v2.9.7", "helm": "v3.1.1", "ibm_cloud_provider": "v1.13.1", "template_name": "terraform_v0.13", "terraform": "v0.13.5"}
        ],
    }))
}
