use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use printdesk_api::app::{self, AppServices};
use printdesk_api::middleware::AgentAuth;
use printdesk_infra::config::DEFAULT_MAX_UPLOAD_BYTES;
use printdesk_infra::{FileJobStore, JobStore, PayloadStore, RemoteStore, RemoteStoreError, ServerConfig};
use reqwest::{multipart, StatusCode};
use serde_json::{json, Value};

struct TestServer {
    base_url: String,
    prints_dir: std::path::PathBuf,
    handle: tokio::task::JoinHandle<()>,
    _dir: tempfile::TempDir,
}

impl TestServer {
    async fn spawn(agent_key: Option<&str>) -> Self {
        Self::spawn_with(|config| match agent_key {
            Some(key) => config.with_agent_key(key),
            None => config,
        })
        .await
    }

    async fn spawn_with(configure: impl FnOnce(ServerConfig) -> ServerConfig) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let prints_dir = dir.path().join("prints");
        let config = configure(ServerConfig::local(&prints_dir).with_default_printer("front-desk"));

        // Build app (same router as prod), but bind to an ephemeral port.
        let app = app::build_app(&config).expect("failed to build app");
        Self::serve(app, prints_dir, dir).await
    }

    async fn spawn_with_remote(remote: Arc<dyn RemoteStore>) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let prints_dir = dir.path().join("prints");
        let jobs: Arc<dyn JobStore> = Arc::new(FileJobStore::open(&prints_dir).unwrap());
        let services = AppServices::new(jobs.clone(), PayloadStore::new(jobs, Some(remote)), "front-desk");

        let app = app::router(services, AgentAuth::disabled(), DEFAULT_MAX_UPLOAD_BYTES);
        Self::serve(app, prints_dir, dir).await
    }

    async fn serve(app: axum::Router, prints_dir: std::path::PathBuf, dir: tempfile::TempDir) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            prints_dir,
            handle,
            _dir: dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn document(size: usize) -> Vec<u8> {
    let mut bytes = b"%PDF-1.4\n".to_vec();
    bytes.resize(size, b'x');
    bytes
}

async fn submit(client: &reqwest::Client, srv: &TestServer, printer: Option<&str>) -> Value {
    let mut form = multipart::Form::new().part(
        "file",
        multipart::Part::bytes(document(10 * 1024))
            .file_name("invoice.pdf")
            .mime_str("application/pdf")
            .unwrap(),
    );
    if let Some(p) = printer {
        form = form.text("printerId", p.to_string());
    }

    let res = client.post(srv.url("/prints")).multipart(form).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json().await.unwrap()
}

async fn list(client: &reqwest::Client, srv: &TestServer) -> Vec<Value> {
    let res = client.get(srv.url("/prints")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    res.json().await.unwrap()
}

async fn next(client: &reqwest::Client, srv: &TestServer, key: Option<&str>) -> reqwest::Response {
    let mut req = client.get(srv.url("/prints?next=true"));
    if let Some(k) = key {
        req = req.header("X-Agent-Key", k);
    }
    req.send().await.unwrap()
}

async fn post_status(
    client: &reqwest::Client,
    srv: &TestServer,
    id: &str,
    body: Value,
    key: Option<&str>,
) -> reqwest::Response {
    let mut req = client.post(srv.url(&format!("/prints/{id}/status"))).json(&body);
    if let Some(k) = key {
        req = req.header("X-Agent-Key", k);
    }
    req.send().await.unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn(Some("k")).await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn submitted_job_appears_in_list() {
    let srv = TestServer::spawn(None).await;
    let client = reqwest::Client::new();

    let created = submit(&client, &srv, Some("warehouse")).await;
    let id = created["id"].as_str().unwrap();

    let jobs = list(&client, &srv).await;
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0]["id"], id);
    assert_eq!(jobs[0]["printerId"], "warehouse");
    assert_eq!(jobs[0]["status"], "queued");
}

#[tokio::test]
async fn local_fallback_without_remote_credentials() {
    let srv = TestServer::spawn(None).await;
    let client = reqwest::Client::new();

    let created = submit(&client, &srv, None).await;
    let id = created["id"].as_str().unwrap();
    assert!(created["temporaryLink"].is_null());

    let payload = std::fs::read(srv.prints_dir.join(format!("{id}.pdf"))).unwrap();
    assert_eq!(payload, document(10 * 1024));

    let jobs = list(&client, &srv).await;
    assert_eq!(jobs[0]["status"], "queued");
    assert_eq!(jobs[0]["printerId"], "front-desk");

    let res = client.get(srv.url(&format!("/prints/{id}/file"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "application/pdf");
    assert_eq!(res.bytes().await.unwrap().to_vec(), document(10 * 1024));
}

#[tokio::test]
async fn submit_without_file_is_bad_request() {
    let srv = TestServer::spawn(None).await;
    let client = reqwest::Client::new();

    let form = multipart::Form::new().text("printerId", "office");
    let res = client.post(srv.url("/prints")).multipart(form).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "bad_request");
    assert!(list(&client, &srv).await.is_empty());
}

async fn assert_json_error(res: reqwest::Response, status: StatusCode, code: &str) {
    assert_eq!(res.status(), status);
    assert_eq!(res.headers()["content-type"], "application/json");
    let body: Value = res.json().await.expect("error body is JSON");
    assert_eq!(body["error"], code);
    assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
}

#[tokio::test]
async fn non_multipart_submissions_get_json_errors() {
    let srv = TestServer::spawn(None).await;
    let client = reqwest::Client::new();

    let res = client.post(srv.url("/prints")).send().await.unwrap();
    assert_json_error(res, StatusCode::BAD_REQUEST, "bad_request").await;

    let res = client
        .post(srv.url("/prints"))
        .json(&json!({"file": "not a form"}))
        .send()
        .await
        .unwrap();
    assert_json_error(res, StatusCode::BAD_REQUEST, "bad_request").await;

    let res = client
        .post(srv.url("/prints"))
        .header("content-type", "multipart/form-data; boundary=xyz")
        .body("garbage without any boundary")
        .send()
        .await
        .unwrap();
    assert_json_error(res, StatusCode::BAD_REQUEST, "bad_request").await;

    assert!(list(&client, &srv).await.is_empty());
}

#[tokio::test]
async fn malformed_query_gets_json_error() {
    let srv = TestServer::spawn(None).await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/prints?next=true&next=false")).send().await.unwrap();
    assert_json_error(res, StatusCode::BAD_REQUEST, "bad_request").await;
}

#[tokio::test]
async fn malformed_status_body_gets_json_error() {
    let srv = TestServer::spawn(None).await;
    let client = reqwest::Client::new();
    let id = submit(&client, &srv, None).await["id"].as_str().unwrap().to_string();

    let res = client
        .post(srv.url(&format!("/prints/{id}/status")))
        .header("content-type", "application/json")
        .body("{ not json")
        .send()
        .await
        .unwrap();
    assert_json_error(res, StatusCode::BAD_REQUEST, "bad_request").await;
}

#[tokio::test]
async fn oversized_upload_is_payload_too_large() {
    let srv = TestServer::spawn_with(|config| config.with_max_upload_bytes(1024)).await;
    let client = reqwest::Client::new();

    let form = multipart::Form::new().part(
        "file",
        multipart::Part::bytes(document(8 * 1024)).file_name("big.pdf"),
    );
    let res = client.post(srv.url("/prints")).multipart(form).send().await.unwrap();
    assert_json_error(res, StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large").await;

    assert!(list(&client, &srv).await.is_empty());
}

#[tokio::test]
async fn next_returns_only_queued_jobs() {
    let srv = TestServer::spawn(None).await;
    let client = reqwest::Client::new();

    let res = next(&client, &srv, None).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let first = submit(&client, &srv, None).await;
    let first_id = first["id"].as_str().unwrap().to_string();
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    let second = submit(&client, &srv, None).await;
    let second_id = second["id"].as_str().unwrap().to_string();

    let res = next(&client, &srv, None).await;
    assert_eq!(res.status(), StatusCode::OK);
    let job: Value = res.json().await.unwrap();
    assert_eq!(job["id"], first_id.as_str());

    let res = post_status(&client, &srv, &first_id, json!({"status": "done", "message": "ok"}), None).await;
    assert_eq!(res.status(), StatusCode::OK);

    let job: Value = next(&client, &srv, None).await.json().await.unwrap();
    assert_eq!(job["id"], second_id.as_str());

    post_status(&client, &srv, &second_id, json!({"status": "failed", "message": "jam"}), None).await;

    // Resolved jobs exist but nothing is queued.
    let res = next(&client, &srv, None).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert_eq!(list(&client, &srv).await.len(), 2);
}

#[tokio::test]
async fn status_for_unknown_job_is_not_found_and_creates_nothing() {
    let srv = TestServer::spawn(None).await;
    let client = reqwest::Client::new();

    let missing = "0190b3c4-7a1e-7cc0-8000-000000000000";
    let res = post_status(&client, &srv, missing, json!({"status": "done"}), None).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "not_found");

    let res = post_status(&client, &srv, "not-a-job", json!({"status": "done"}), None).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    assert!(list(&client, &srv).await.is_empty());
    assert!(!srv.prints_dir.join(format!("{missing}.json")).exists());
}

#[tokio::test]
async fn repeated_done_is_idempotent() {
    let srv = TestServer::spawn(None).await;
    let client = reqwest::Client::new();

    let id = submit(&client, &srv, None).await["id"].as_str().unwrap().to_string();

    for message in ["printed", "printed again"] {
        let res = post_status(&client, &srv, &id, json!({"status": "done", "message": message}), None).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["ok"], true);
    }

    let jobs = list(&client, &srv).await;
    assert_eq!(jobs[0]["status"], "done");
    assert_eq!(jobs[0]["lastMessage"], "printed again");
}

#[tokio::test]
async fn invalid_status_value_is_bad_request() {
    let srv = TestServer::spawn(None).await;
    let client = reqwest::Client::new();

    let id = submit(&client, &srv, None).await["id"].as_str().unwrap().to_string();
    let res = post_status(&client, &srv, &id, json!({"status": "printing"}), None).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    assert_eq!(list(&client, &srv).await[0]["status"], "queued");
}

#[tokio::test]
async fn agent_key_is_enforced_on_agent_endpoints() {
    let srv = TestServer::spawn(Some("s3cret")).await;
    let client = reqwest::Client::new();

    let id = submit(&client, &srv, None).await["id"].as_str().unwrap().to_string();

    assert_eq!(next(&client, &srv, None).await.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(next(&client, &srv, Some("wrong")).await.status(), StatusCode::UNAUTHORIZED);

    let res = post_status(&client, &srv, &id, json!({"status": "done"}), None).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let res = post_status(&client, &srv, &id, json!({"status": "done"}), Some("wrong")).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");

    let res = client.get(srv.url(&format!("/prints/{id}/file"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // No state change from the rejected calls.
    assert_eq!(list(&client, &srv).await[0]["status"], "queued");

    let res = next(&client, &srv, Some("s3cret")).await;
    assert_eq!(res.status(), StatusCode::OK);
    let res = post_status(&client, &srv, &id, json!({"status": "done"}), Some("s3cret")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(list(&client, &srv).await[0]["status"], "done");
}

#[tokio::test]
async fn claim_leases_job_to_a_single_agent() {
    let srv = TestServer::spawn(None).await;
    let client = reqwest::Client::new();

    let id = submit(&client, &srv, None).await["id"].as_str().unwrap().to_string();

    let res = client
        .post(srv.url("/prints/claim"))
        .json(&json!({"agentId": "agent-a"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let job: Value = res.json().await.unwrap();
    assert_eq!(job["id"], id.as_str());
    assert_eq!(job["claimedBy"], "agent-a");

    let res = client
        .post(srv.url("/prints/claim"))
        .json(&json!({"agentId": "agent-b"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    // The observational dequeue still reports the queued job.
    assert_eq!(next(&client, &srv, None).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn claim_requires_agent_id() {
    let srv = TestServer::spawn(None).await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/prints/claim"))
        .json(&json!({"agentId": "  "}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

struct FixedLinkRemote;

#[async_trait]
impl RemoteStore for FixedLinkRemote {
    async fn upload(&self, filename: &str, _bytes: Bytes) -> Result<String, RemoteStoreError> {
        Ok(format!("https://dl.example/prints/{filename}"))
    }
}

struct DownRemote;

#[async_trait]
impl RemoteStore for DownRemote {
    async fn upload(&self, _filename: &str, _bytes: Bytes) -> Result<String, RemoteStoreError> {
        Err(RemoteStoreError::Api(503, "unavailable".to_string()))
    }
}

#[tokio::test]
async fn remote_upload_returns_link_and_keeps_no_local_copy() {
    let srv = TestServer::spawn_with_remote(Arc::new(FixedLinkRemote)).await;
    let client = reqwest::Client::new();

    let created = submit(&client, &srv, None).await;
    let id = created["id"].as_str().unwrap();
    assert_eq!(created["temporaryLink"], format!("https://dl.example/prints/{id}.pdf"));
    assert!(!srv.prints_dir.join(format!("{id}.pdf")).exists());

    let res = client.get(srv.url(&format!("/prints/{id}/file"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn remote_failure_falls_back_silently() {
    let srv = TestServer::spawn_with_remote(Arc::new(DownRemote)).await;
    let client = reqwest::Client::new();

    let created = submit(&client, &srv, None).await;
    let id = created["id"].as_str().unwrap();
    assert!(created["temporaryLink"].is_null());
    assert!(srv.prints_dir.join(format!("{id}.pdf")).exists());
}
