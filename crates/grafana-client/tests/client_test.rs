//! HTTP-level tests for GrafanaClient
//!
//! Each test starts a small in-process fake Grafana built with axum and points
//! the real client at it.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use grafana_client::{
    Board, Datasource, GrafanaAuth, GrafanaClient, GrafanaClientTrait, GrafanaError,
};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn datasource_by_name(Path(name): Path<String>) -> (StatusCode, Json<Value>) {
    if name == "my prometheus" {
        (
            StatusCode::OK,
            Json(json!({"id": 3, "uid": "P1", "name": name, "type": "prometheus", "url": "http://prom:9090"})),
        )
    } else {
        (StatusCode::NOT_FOUND, Json(json!({"message": "Data source not found"})))
    }
}

#[tokio::test]
async fn test_get_datasource_by_name_found_and_not_found() {
    let app = Router::new().route("/api/datasources/name/{name}", get(datasource_by_name));
    let endpoint = serve(app).await;
    let client = GrafanaClient::new(endpoint, GrafanaAuth::parse("token")).unwrap();

    let ds = client.get_datasource_by_name("my prometheus").await.unwrap();
    assert_eq!(ds.id, 3);
    assert_eq!(ds.kind, "prometheus");

    let err = client.get_datasource_by_name("loki").await.unwrap_err();
    assert!(err.is_not_found(), "expected NotFound, got {err:?}");
}

async fn folders_requiring_basic_auth(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    // admin:admin
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        == Some("Basic YWRtaW46YWRtaW4=");
    if authorized {
        (StatusCode::OK, Json(json!([{"id": 4, "uid": "abc", "title": "teamA"}])))
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({"message": "Unauthorized"})))
    }
}

#[tokio::test]
async fn test_basic_auth_is_sent_and_rejection_is_typed() {
    let app = Router::new().route("/api/folders", get(folders_requiring_basic_auth));
    let endpoint = serve(app).await;

    let client = GrafanaClient::new(endpoint.clone(), GrafanaAuth::parse("admin:admin")).unwrap();
    let folder = client.get_folder_by_title("teamA").await.unwrap();
    assert_eq!(folder.map(|f| f.id), Some(4));
    assert_eq!(client.get_folder_by_title("teamB").await.unwrap(), None);

    let client = GrafanaClient::new(endpoint, GrafanaAuth::parse("admin:wrong")).unwrap();
    let err = client.list_folders().await.unwrap_err();
    assert!(matches!(err, GrafanaError::Authentication(_)), "got {err:?}");
}

type Captured = Arc<Mutex<Option<Value>>>;

async fn capture_dashboard(
    State(captured): State<Captured>,
    Json(body): Json<Value>,
) -> Json<Value> {
    *captured.lock().unwrap() = Some(body);
    Json(json!({"id": 10, "uid": "dash1", "status": "success", "version": 2, "slug": "dash1"}))
}

#[tokio::test]
async fn test_set_dashboard_posts_overwrite_and_folder() {
    let captured: Captured = Arc::new(Mutex::new(None));
    let app = Router::new()
        .route("/api/dashboards/db", post(capture_dashboard))
        .with_state(captured.clone());
    let endpoint = serve(app).await;
    let client = GrafanaClient::new(endpoint, GrafanaAuth::parse("token")).unwrap();

    let board: Board = serde_json::from_value(json!({
        "id": 99,
        "uid": "dash1",
        "title": "Dash1",
        "panels": [{"type": "graph"}],
    }))
    .unwrap();
    let response = client.set_dashboard(&board, true, 5).await.unwrap();
    assert_eq!(response.status.as_deref(), Some("success"));

    let body = captured.lock().unwrap().clone().unwrap();
    assert_eq!(body["overwrite"], true);
    assert_eq!(body["folderId"], 5);
    assert_eq!(body["dashboard"]["title"], "Dash1");
    assert_eq!(body["dashboard"]["panels"][0]["type"], "graph");
    assert!(body["dashboard"].get("id").is_none(), "numeric id must be stripped");
}

async fn create_datasource(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({
        "id": 7,
        "name": body["name"],
        "message": "Datasource added",
        "datasource": {"id": 7, "name": body["name"], "type": body["type"]},
    }))
}

#[tokio::test]
async fn test_create_datasource_returns_resolved_id() {
    let app = Router::new().route("/api/datasources", post(create_datasource));
    let endpoint = serve(app).await;
    let client = GrafanaClient::new(endpoint, GrafanaAuth::parse("token")).unwrap();

    let created = client
        .create_datasource(&Datasource {
            name: "loki".to_string(),
            kind: "loki".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(created.id, 7);
    assert_eq!(created.name, "loki");
}

#[tokio::test]
async fn test_update_datasource_requires_resolved_id() {
    let client = GrafanaClient::new("http://127.0.0.1:1", GrafanaAuth::parse("token")).unwrap();
    let err = client
        .update_datasource(&Datasource {
            name: "loki".to_string(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, GrafanaError::InvalidRequest(_)));
}
