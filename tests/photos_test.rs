mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::*;
use serde_json::{Value, json};
use std::time::Duration;
use tower::ServiceExt;

async fn upload(app: &axum::Router, filename: &str) -> String {
    let response = app
        .clone()
        .oneshot(upload_request(
            "/api/upload",
            multipart_body("photo", filename, b"image bytes"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["filename"]
        .as_str()
        .unwrap()
        .to_string()
}

async fn list(app: &axum::Router) -> Vec<Value> {
    let response = app.clone().oneshot(get_request("/api/photos")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_cors(&response);
    body_json(response).await.as_array().unwrap().clone()
}

#[tokio::test]
async fn test_list_empty() {
    let (_dir, _state, app) = setup().await;
    assert!(list(&app).await.is_empty());
}

#[tokio::test]
async fn test_list_newest_first() {
    let (_dir, _state, app) = setup().await;

    let first = upload(&app, "a.jpg").await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    let second = upload(&app, "b.png").await;

    let photos = list(&app).await;
    assert_eq!(photos.len(), 2);
    assert_eq!(photos[0]["filename"], second.as_str());
    assert_eq!(photos[1]["filename"], first.as_str());
    assert_eq!(
        photos[0]["url"].as_str().unwrap(),
        format!("http://localhost/uploads/{second}")
    );

    // Listing is stable without intervening uploads.
    assert_eq!(list(&app).await, photos);
}

#[tokio::test]
async fn test_list_skips_non_images() {
    let (dir, _state, app) = setup().await;
    let uploads = dir.path().join("uploads");
    std::fs::write(uploads.join("notes.txt"), b"not a photo").unwrap();
    std::fs::write(uploads.join("legacy.GIF"), b"GIF89a").unwrap();
    std::fs::create_dir(uploads.join("thumbs.png")).unwrap();

    let photos = list(&app).await;
    assert_eq!(photos, vec![json!({
        "filename": "legacy.GIF",
        "url": "http://localhost/uploads/legacy.GIF"
    })]);
}

#[tokio::test]
async fn test_serve_missing_file() {
    let (_dir, _state, app) = setup().await;

    let response = app
        .oneshot(get_request("/uploads/missing.jpg"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_cors(&response);
    assert!(body_json(response).await["error"].is_string());
}

#[tokio::test]
async fn test_serve_rejects_traversal() {
    let (dir, _state, app) = setup().await;
    std::fs::write(dir.path().join("secret.jpg"), b"secret").unwrap();

    let response = app
        .oneshot(get_request("/uploads/..%2Fsecret.jpg"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_serve_file_headers() {
    let (_dir, _state, app) = setup().await;
    let name = upload(&app, "cat.gif").await;

    let response = app
        .oneshot(get_request(&format!("/uploads/{name}")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/gif");
    assert_eq!(response.headers()["cache-control"], "public, max-age=3600");
    assert_eq!(body_bytes(response).await.as_ref(), b"image bytes");
}

#[tokio::test]
async fn test_options_preflight() {
    let (_dir, _state, app) = setup().await;

    for uri in ["/api/upload", "/api/photos", "/uploads/x.jpg", "/no/such/route"] {
        let request = Request::builder()
            .method("OPTIONS")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        assert_cors(&response);
        assert!(body_bytes(response).await.is_empty());
    }
}

#[tokio::test]
async fn test_unknown_route() {
    let (_dir, _state, app) = setup().await;

    let response = app.oneshot(get_request("/api/nothing")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_cors(&response);
    assert_eq!(
        body_json(response).await,
        json!({"error": "Ruta no encontrada"})
    );
}

#[tokio::test]
async fn test_photos_wrong_method() {
    let (_dir, _state, app) = setup().await;

    let response = app
        .oneshot(json_request("POST", "/api/photos", "{}"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_health_and_openapi() {
    let (_dir, _state, app) = setup().await;

    let response = app.clone().oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["storage_backend"], "local");
    assert_eq!(json["max_file_size_mb"], 10);
    assert_eq!(json["namespaces"].as_array().unwrap().len(), 2);
    assert_eq!(json["namespaces"][0]["backend"], "local");

    let response = app
        .oneshot(get_request("/api-docs/openapi.json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["paths"]["/api/upload"].is_object());
}
