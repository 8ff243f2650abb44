//! End-to-end tests of the HTTP API against an in-memory blob store.

use std::time::Duration;

use axum::body::Body;
use axum::Router;
use http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use apkshelf_daemon::http_server;
use apkshelf_daemon::ServiceState;
use common::index::CODE_ALPHABET;
use common::shelf::{Shelf, ShelfConfig};
use object_store::testing::{FailingStore, Operation};
use object_store::BlobStore;

const BOUNDARY: &str = "apkshelf-test-boundary";

async fn setup_app(config: ShelfConfig) -> Router {
    let store = BlobStore::new_ephemeral().await.unwrap();
    app_over(store, config)
}

fn app_over(store: BlobStore, config: ShelfConfig) -> Router {
    let state = ServiceState::new(Shelf::new(store, config));
    http_server::router(state)
}

fn multipart_upload(filename: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, http::HeaderMap, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, body.to_vec())
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, _, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

async fn list_files(app: &Router) -> Vec<Value> {
    let (status, body) = send_json(app, get("/api/list")).await;
    assert_eq!(status, StatusCode::OK);
    body["files"].as_array().unwrap().clone()
}

/// Redirect side effects run on the job worker; poll until they land.
async fn wait_for_count(app: &Router, url: &str, expected: u64) {
    for _ in 0..100 {
        let (_, body) = send_json(app, get("/api/download")).await;
        if body["stats"][url].as_u64() == Some(expected) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("download count for {url} never reached {expected}");
}

#[tokio::test]
async fn test_upload_redirect_and_count() {
    let app = setup_app(ShelfConfig::default()).await;
    let data = vec![42u8; 10 * 1024];

    let (status, uploaded) = send_json(&app, multipart_upload("app.apk", &data)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(uploaded["filename"], "app.apk");
    assert_eq!(uploaded["size"], 10 * 1024);
    assert!(uploaded["uploadedAt"].is_string());

    let code = uploaded["shortCode"].as_str().unwrap().to_string();
    assert_eq!(code.len(), 4);
    assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));
    let file_url = uploaded["url"].as_str().unwrap().to_string();

    let (status, headers, _) = send(&app, get(&format!("/d/{code}"))).await;
    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(headers[header::LOCATION], file_url.as_str());

    wait_for_count(&app, &file_url, 1).await;

    // The file itself is served by the daemon.
    let path = url::Url::parse(&file_url).unwrap().path().to_string();
    let (status, headers, body) = send(&app, get(&path)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers[header::CONTENT_TYPE],
        "application/vnd.android.package-archive"
    );
    assert_eq!(body, data);

    let files = list_files(&app).await;
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["filename"], "app.apk");
    assert_eq!(files[0]["shortCode"], code.as_str());
}

#[tokio::test]
async fn test_non_apk_is_rejected() {
    let app = setup_app(ShelfConfig::default()).await;

    let (status, body) = send_json(&app, multipart_upload("app.txt", b"hello")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Only APK files are allowed");

    assert!(list_files(&app).await.is_empty());
}

#[tokio::test]
async fn test_oversized_upload_is_rejected_before_write() {
    let app = setup_app(ShelfConfig {
        max_upload_bytes: 1024,
        ..Default::default()
    })
    .await;

    // Over the configured ceiling but inside the transport limit.
    let (status, body) = send_json(&app, multipart_upload("big.apk", &vec![0u8; 4096])).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(body["error"].is_string());

    // Over the transport limit as well.
    let (status, _, _) = send(&app, multipart_upload("huge.apk", &vec![0u8; 256 * 1024])).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

    assert!(list_files(&app).await.is_empty());
    let (_, stats) = send_json(&app, get("/api/download")).await;
    assert_eq!(stats["stats"], json!({}));
}

#[tokio::test]
async fn test_upload_without_file_part() {
    let app = setup_app(ShelfConfig::default()).await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"note\"\r\n\r\n\
             hello\r\n--{BOUNDARY}--\r\n"
        )))
        .unwrap();

    let (status, body) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file provided");
}

#[tokio::test]
async fn test_unknown_code_is_404_and_not_counted() {
    let app = setup_app(ShelfConfig::default()).await;

    let (status, _, body) = send(&app, get("/d/zzzz")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, b"File not found");

    tokio::time::sleep(Duration::from_millis(20)).await;
    let (_, stats) = send_json(&app, get("/api/download")).await;
    assert_eq!(stats["stats"], json!({}));
}

#[tokio::test]
async fn test_delete_removes_file_and_link() {
    let app = setup_app(ShelfConfig::default()).await;
    let (_, uploaded) = send_json(&app, multipart_upload("app.apk", b"apk")).await;
    let file_url = uploaded["url"].as_str().unwrap();
    let code = uploaded["shortCode"].as_str().unwrap();

    let (status, body) = send_json(
        &app,
        json_request(Method::DELETE, "/api/delete", json!({ "url": file_url })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));

    assert!(list_files(&app).await.is_empty());
    let (status, _, _) = send(&app, get(&format!("/d/{code}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_validation() {
    let app = setup_app(ShelfConfig::default()).await;

    let (status, body) =
        send_json(&app, json_request(Method::DELETE, "/api/delete", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No URL provided");

    let (status, _) = send_json(
        &app,
        json_request(
            Method::DELETE,
            "/api/delete",
            json!({ "url": "https://elsewhere.example.com/apk/app.apk" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_rejects_metadata_documents() {
    let app = setup_app(ShelfConfig::default()).await;
    let (_, uploaded) = send_json(&app, multipart_upload("app.apk", b"apk")).await;
    let file_url = uploaded["url"].as_str().unwrap();
    let code = uploaded["shortCode"].as_str().unwrap();

    let base = file_url.split("/apk/").next().unwrap();
    for target in ["apk-meta/short-links.json", "apk-stats/download-counts.json"] {
        let (status, body) = send_json(
            &app,
            json_request(
                Method::DELETE,
                "/api/delete",
                json!({ "url": format!("{base}/{target}") }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{target}");
        assert!(body["error"].as_str().unwrap().starts_with("Not a file"));
    }

    let (status, headers, _) = send(&app, get(&format!("/d/{code}"))).await;
    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(headers[header::LOCATION], file_url);
    assert_eq!(list_files(&app).await.len(), 1);
}

#[tokio::test]
async fn test_delete_failure_is_500() {
    let backend = FailingStore::new();
    let app = app_over(backend.blob_store().unwrap(), ShelfConfig::default());
    let (_, uploaded) = send_json(&app, multipart_upload("app.apk", b"apk")).await;
    let file_url = uploaded["url"].as_str().unwrap();

    backend.fail(Operation::Put, "apk-meta");
    let (status, body) = send_json(
        &app,
        json_request(Method::DELETE, "/api/delete", json!({ "url": file_url })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Delete failed" }));

    backend.heal();
    assert!(list_files(&app).await.is_empty());
}

#[tokio::test]
async fn test_track_download_endpoint() {
    let app = setup_app(ShelfConfig::default()).await;

    let (status, body) =
        send_json(&app, json_request(Method::POST, "/api/download", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No fileUrl provided");

    for expected in 1..=2 {
        let (status, body) = send_json(
            &app,
            json_request(Method::POST, "/api/download", json!({ "fileUrl": "http://x/a.apk" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "downloads": expected }));
    }

    let (_, stats) = send_json(&app, get("/api/download")).await;
    assert_eq!(stats, json!({ "stats": { "http://x/a.apk": 2 } }));
}

#[tokio::test]
async fn test_short_link_endpoint() {
    let app = setup_app(ShelfConfig::default()).await;

    let (status, body) = send_json(
        &app,
        json_request(Method::POST, "/api/short-link", json!({ "url": "http://x/a.apk" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing url or filename");

    let (status, body) = send_json(
        &app,
        json_request(
            Method::POST,
            "/api/short-link",
            json!({ "url": "http://x/a.apk", "filename": "a.apk" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let code = body["shortCode"].as_str().unwrap();

    let (status, headers, _) = send(&app, get(&format!("/d/{code}"))).await;
    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(headers[header::LOCATION], "http://x/a.apk");
}

#[tokio::test]
async fn test_reconcile_removes_orphaned_links() {
    let app = setup_app(ShelfConfig::default()).await;
    send_json(&app, multipart_upload("kept.apk", b"k")).await;
    send_json(
        &app,
        json_request(
            Method::POST,
            "/api/short-link",
            json!({ "url": "http://localhost/blobs/apk/gone-abc.apk", "filename": "gone.apk" }),
        ),
    )
    .await;

    let (status, report) = send_json(
        &app,
        json_request(Method::POST, "/api/reconcile", json!({ "dryRun": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["dryRun"], true);
    assert_eq!(report["orphanedLinks"].as_array().unwrap().len(), 1);
    assert_eq!(report["removedLinks"], 0);

    let (status, report) =
        send_json(&app, json_request(Method::POST, "/api/reconcile", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["removedLinks"], 1);

    let files = list_files(&app).await;
    assert_eq!(files.len(), 1);
    assert!(files[0]["shortCode"].is_string());
}

#[tokio::test]
async fn test_missing_blob_is_404() {
    let app = setup_app(ShelfConfig::default()).await;
    let (status, _, _) = send(&app, get("/blobs/apk/nothing.apk")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_probes() {
    let app = setup_app(ShelfConfig::default()).await;

    let (status, body) = send_json(&app, get("/_status/livez")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));

    let (status, body) = send_json(&app, get("/_status/readyz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));

    let (status, body) = send_json(&app, get("/_status/version")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "apkshelf-daemon");
}
