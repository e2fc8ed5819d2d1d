//! Task endpoint tests: bearer attachment, filters, payload shapes, and
//! error pass-through for non-auth failures.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

use taskdeck::models::{NewTask, TaskFilter, TaskPatch, TaskPriority, TaskStatus};
use taskdeck::{ApiClient, ApiError, Config, CredentialPair, CredentialStore};

fn task_json(id: i64, title: &str) -> serde_json::Value {
    json!({
        "id": id,
        "user_id": 1,
        "title": title,
        "status": "TODO",
        "priority": "MEDIUM",
        "created_at": "2026-08-01T12:00:00Z",
        "updated_at": "2026-08-01T12:00:00Z"
    })
}

fn page_json(tasks: Vec<serde_json::Value>) -> serde_json::Value {
    let total = tasks.len();
    json!({ "data": tasks, "meta": { "total": total, "page": 1, "per_page": 20 } })
}

fn logged_in_client(server: &MockServer, dir: &TempDir) -> (ApiClient, Arc<CredentialStore>) {
    let store = Arc::new(CredentialStore::open(dir.path().to_path_buf()).unwrap());
    store
        .save(CredentialPair {
            access: "A1".to_string(),
            refresh: "R1".to_string(),
        })
        .unwrap();
    let config = Config::new(server.uri(), dir.path().to_path_buf());
    let client = ApiClient::new(&config, store.clone()).unwrap();
    (client, store)
}

/// Matches requests that carry no Authorization header at all.
struct NoAuthHeader;

impl Match for NoAuthHeader {
    fn matches(&self, request: &Request) -> bool {
        !request.headers.contains_key("authorization")
    }
}

#[tokio::test]
async fn list_attaches_bearer_and_parses_page() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let (client, _store) = logged_in_client(&server, &dir);

    Mock::given(method("GET"))
        .and(path("/v1/tasks"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page_json(vec![task_json(1, "Ship it"), task_json(2, "Docs")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let page = client.list_tasks(&TaskFilter::default()).await.unwrap();
    assert_eq!(page.data.len(), 2);
    assert_eq!(page.data[0].title, "Ship it");
    assert_eq!(page.meta.total, 2);
}

#[tokio::test]
async fn list_sends_filter_query_params() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let (client, _store) = logged_in_client(&server, &dir);

    Mock::given(method("GET"))
        .and(path("/v1/tasks"))
        .and(query_param("status", "IN_PROGRESS"))
        .and(query_param("priority", "HIGH"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(vec![])))
        .expect(1)
        .mount(&server)
        .await;

    let filter = TaskFilter {
        status: Some(TaskStatus::InProgress),
        priority: Some(TaskPriority::High),
        page: Some(2),
        per_page: None,
    };
    client.list_tasks(&filter).await.unwrap();
}

#[tokio::test]
async fn unauthenticated_requests_carry_no_bearer() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let store = Arc::new(CredentialStore::open(dir.path().to_path_buf()).unwrap());
    let config = Config::new(server.uri(), dir.path().to_path_buf());
    let client = ApiClient::new(&config, store).unwrap();

    Mock::given(method("GET"))
        .and(path("/v1/tasks"))
        .and(NoAuthHeader)
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(vec![])))
        .expect(1)
        .mount(&server)
        .await;

    client.list_tasks(&TaskFilter::default()).await.unwrap();
}

#[tokio::test]
async fn create_task_posts_payload_and_unwraps_envelope() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let (client, _store) = logged_in_client(&server, &dir);

    Mock::given(method("POST"))
        .and(path("/v1/tasks"))
        .and(body_json(json!({ "title": "Ship it", "priority": "HIGH" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": task_json(9, "Ship it")
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut new_task = NewTask::new("Ship it");
    new_task.priority = Some(TaskPriority::High);
    let task = client.create_task(&new_task).await.unwrap();
    assert_eq!(task.id, 9);
    assert_eq!(task.title, "Ship it");
}

#[tokio::test]
async fn update_task_puts_patch_fields() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let (client, _store) = logged_in_client(&server, &dir);

    Mock::given(method("PUT"))
        .and(path("/v1/tasks/7"))
        .and(body_json(json!({ "title": "Renamed" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": task_json(7, "Renamed")
        })))
        .expect(1)
        .mount(&server)
        .await;

    let patch = TaskPatch {
        title: Some("Renamed".to_string()),
        ..TaskPatch::default()
    };
    let task = client.update_task(7, &patch).await.unwrap();
    assert_eq!(task.title, "Renamed");
}

#[tokio::test]
async fn update_status_patches_and_returns_unit() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let (client, _store) = logged_in_client(&server, &dir);

    Mock::given(method("PATCH"))
        .and(path("/v1/tasks/7/status"))
        .and(body_json(json!({ "status": "DONE" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client.update_task_status(7, TaskStatus::Done).await.unwrap();
}

#[tokio::test]
async fn delete_task_hits_the_endpoint_once() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let (client, _store) = logged_in_client(&server, &dir);

    Mock::given(method("DELETE"))
        .and(path("/v1/tasks/7"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client.delete_task(7).await.unwrap();
}

#[tokio::test]
async fn missing_task_surfaces_not_found() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let (client, _store) = logged_in_client(&server, &dir);

    Mock::given(method("GET"))
        .and(path("/v1/tasks/404"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such task"))
        .mount(&server)
        .await;

    let result = client.get_task(404).await;
    assert!(matches!(result, Err(ApiError::NotFound(_))));
}

#[tokio::test]
async fn server_errors_pass_through_without_ending_the_session() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let (client, store) = logged_in_client(&server, &dir);

    Mock::given(method("GET"))
        .and(path("/v1/tasks"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database unavailable"))
        .expect(1)
        .mount(&server)
        .await;

    let fired = Arc::new(AtomicBool::new(false));
    let fired_in_hook = fired.clone();
    let client = client.on_session_expired(move || fired_in_hook.store(true, Ordering::SeqCst));

    let result = client.list_tasks(&TaskFilter::default()).await;
    assert!(matches!(result, Err(ApiError::ServerError(_))));

    // State unchanged: still logged in, no forced navigation
    assert!(store.is_authenticated());
    assert!(!fired.load(Ordering::SeqCst));
}
