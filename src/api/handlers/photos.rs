use crate::api::error::{AppError, RequestError};
use crate::api::origin::PublicOrigin;
use crate::models::{DownloadRequest, ErrorResponse, PhotoSummary, UploadResponse};
use crate::services::photo_service::{DownloadPayload, PhotoService};
use crate::utils::validation::ValidationError;
use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bytes::Bytes;
use http_body_util::LengthLimitError;
use serde_json::Value;
use std::sync::Arc;

const FILE_CACHE_CONTROL: &str = "public, max-age=3600";

/// Upload, listing, file and download routes of one namespace
pub fn routes(service: Arc<PhotoService>) -> Router {
    let namespace = service.namespace().clone();

    Router::new()
        .route(
            &format!("{}/upload", namespace.api_prefix),
            post(upload_photo).fallback(method_not_allowed),
        )
        .route(
            &format!("{}/photos", namespace.api_prefix),
            get(list_photos).fallback(method_not_allowed),
        )
        .route(
            &format!("{}/download", namespace.api_prefix),
            post(download_photos).fallback(method_not_allowed),
        )
        .route(
            &format!("{}/:name", namespace.files_route),
            get(serve_file).fallback(method_not_allowed),
        )
        .with_state(service)
}

#[utoipa::path(
    post,
    path = "/api/upload",
    request_body(content = Vec<u8>, content_type = "multipart/form-data", description = "Form with a `photo` file field"),
    responses(
        (status = 200, description = "Photo stored", body = UploadResponse),
        (status = 400, description = "Bad multipart body, extension or size", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    tag = "photos"
)]
pub async fn upload_photo(
    State(service): State<Arc<PhotoService>>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<UploadResponse>, AppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let declared_length = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());

    let boundary = service.accept_upload(content_type, declared_length)?;

    let max_size = service.policy().max_file_size;
    let body = axum::body::to_bytes(body, max_size)
        .await
        .map_err(|e| body_read_error(e, max_size))?;

    let origin = PublicOrigin::from_headers(&headers);
    let response = service.upload(&boundary, &body, &origin).await?;
    Ok(Json(response))
}

fn body_read_error(err: axum::Error, max_size: usize) -> AppError {
    let source = err.into_inner();
    if source.is::<LengthLimitError>() {
        ValidationError::TooLarge {
            size: max_size as u64 + 1,
            max_size,
        }
        .into()
    } else {
        AppError::Internal(format!("Error al leer la petición: {}", source))
    }
}

#[utoipa::path(
    get,
    path = "/api/photos",
    responses(
        (status = 200, description = "Stored photos, newest first", body = Vec<PhotoSummary>),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    tag = "photos"
)]
pub async fn list_photos(
    State(service): State<Arc<PhotoService>>,
    headers: HeaderMap,
) -> Result<Json<Vec<PhotoSummary>>, AppError> {
    let origin = PublicOrigin::from_headers(&headers);
    Ok(Json(service.list(&origin).await?))
}

#[utoipa::path(
    get,
    path = "/uploads/{name}",
    params(("name" = String, Path, description = "Stored filename")),
    responses(
        (status = 200, description = "Raw image bytes"),
        (status = 404, description = "No such file", body = ErrorResponse)
    ),
    tag = "photos"
)]
pub async fn serve_file(
    State(service): State<Arc<PhotoService>>,
    Path(name): Path<String>,
) -> Result<Response, AppError> {
    let (data, content_type) = service.fetch(&name).await?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CACHE_CONTROL, FILE_CACHE_CONTROL.to_string()),
        ],
        data,
    )
        .into_response())
}

#[utoipa::path(
    post,
    path = "/api/download",
    request_body = DownloadRequest,
    responses(
        (status = 200, description = "The image itself for one name, a ZIP for several"),
        (status = 400, description = "Bad JSON or empty imageNames", body = ErrorResponse),
        (status = 404, description = "The single requested image does not exist", body = ErrorResponse)
    ),
    tag = "photos"
)]
pub async fn download_photos(
    State(service): State<Arc<PhotoService>>,
    body: Bytes,
) -> Result<Response, AppError> {
    let names = parse_download_request(&body)?;

    let response = match service.download(&names).await? {
        DownloadPayload::Single {
            filename,
            data,
            content_type,
        } => file_response(data, content_type.as_ref(), "inline", &filename),
        DownloadPayload::Archive { filename, data, .. } => {
            file_response(data, "application/zip", "attachment", &filename)
        }
    };

    Ok(response)
}

/// Extracts `imageNames` from a download body
pub fn parse_download_request(body: &[u8]) -> Result<Vec<String>, RequestError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|_| RequestError::BadJson("JSON inválido".to_string()))?;

    let is_blank = match &value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    };
    if is_blank {
        return Err(RequestError::BadJson("Body JSON requerido".to_string()));
    }

    let missing = || RequestError::MissingField("imageNames debe ser una lista no vacía".to_string());
    let request: DownloadRequest = serde_json::from_value(value).map_err(|_| missing())?;
    if request.image_names.is_empty() {
        return Err(missing());
    }

    Ok(request.image_names)
}

fn file_response(data: Vec<u8>, content_type: &str, disposition: &str, filename: &str) -> Response {
    let mut response = (StatusCode::OK, data).into_response();
    let headers = response.headers_mut();

    if let Ok(value) = HeaderValue::from_str(content_type) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Ok(value) =
        HeaderValue::from_str(&format!("{}; filename=\"{}\"", disposition, filename.replace('"', "")))
    {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    if disposition == "inline" {
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(FILE_CACHE_CONTROL));
    }

    response
}

pub async fn method_not_allowed() -> AppError {
    RequestError::WrongMethod.into()
}
