use crate::api::error::AppError;

/// Any path no route claims
pub async fn not_found() -> AppError {
    AppError::NotFound("Ruta no encontrada".to_string())
}
