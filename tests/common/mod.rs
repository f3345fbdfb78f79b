#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, Bytes},
    http::{Request, Response},
};
use http_body_util::BodyExt;
use lasacam_backend::config::AppConfig;
use lasacam_backend::infrastructure::storage::setup_namespaces;
use lasacam_backend::{AppState, create_app};
use serde_json::Value;
use tempfile::TempDir;

pub const BOUNDARY: &str = "----LasaCamTestBoundary";

/// App backed by local storage under a fresh temp dir
pub async fn setup() -> (TempDir, AppState, Router) {
    let dir = TempDir::new().unwrap();
    let config = AppConfig::development(dir.path());
    let namespaces = setup_namespaces(&config).await.unwrap();
    let state = AppState { config, namespaces };
    let app = create_app(state.clone());
    (dir, state, app)
}

pub fn multipart_body(field: &str, filename: &str, data: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn upload_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header("Content-Length", body.len())
        .body(Body::from(body))
        .unwrap()
}

pub fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub fn assert_cors<B>(response: &Response<B>) {
    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["access-control-allow-methods"], "GET, POST, OPTIONS");
    assert_eq!(headers["access-control-allow-headers"], "Content-Type");
}

/// `lasacam-<digits>-<8 lowercase hex><ext>`
pub fn is_stored_name(name: &str, ext: &str) -> bool {
    let Some(rest) = name
        .strip_prefix("lasacam-")
        .and_then(|rest| rest.strip_suffix(ext))
    else {
        return false;
    };
    let Some((millis, suffix)) = rest.split_once('-') else {
        return false;
    };
    !millis.is_empty()
        && millis.chars().all(|c| c.is_ascii_digit())
        && suffix.len() == 8
        && suffix.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'))
}
