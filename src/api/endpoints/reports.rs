//! Report endpoints — list, detail, image bytes, delete.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Extension;
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, UserContext};
use crate::db::repository::report as report_repo;
use crate::models::Report;

#[derive(Serialize)]
pub struct ReportListResponse {
    pub count: usize,
    pub reports: Vec<Report>,
}

/// `GET /api/reports` — all reports for the authenticated user,
/// newest first.
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
) -> Result<Json<ReportListResponse>, ApiError> {
    let conn = ctx.db.lock().await;
    let reports = report_repo::list_reports_by_user(&conn, &user.user_id)?;
    Ok(Json(ReportListResponse {
        count: reports.len(),
        reports,
    }))
}

/// `GET /api/reports/:id` — one full report or 404.
pub async fn detail(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<String>,
) -> Result<Json<Report>, ApiError> {
    let id = parse_id(&id, "report id")?;
    let conn = ctx.db.lock().await;
    let report = report_repo::get_report(&conn, &id, &user.user_id)?;
    Ok(Json(report))
}

/// `GET /api/reports/:id/images/:image_id` — raw image bytes with the
/// stored content type.
pub async fn image(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Path((id, image_id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "report id")?;
    let image_id = parse_id(&image_id, "image id")?;
    let conn = ctx.db.lock().await;
    let (content_type, bytes) =
        report_repo::get_report_image(&conn, &id, &image_id, &user.user_id)?;
    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub message: &'static str,
}

/// `DELETE /api/reports/:id` — remove a report and its images.
pub async fn remove(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let id = parse_id(&id, "report id")?;
    {
        let conn = ctx.db.lock().await;
        report_repo::delete_report(&conn, &id, &user.user_id)?;
    }
    tracing::info!(report_id = %id, "deleted report");
    Ok(Json(DeleteResponse {
        message: "Report deleted successfully",
    }))
}

fn parse_id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid {what} format")))
}
