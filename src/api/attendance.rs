use crate::auth::auth::AuthUser;
use crate::clocking::tracker::AttendanceTracker;
use crate::error::AppError;
use crate::repository::AttendanceStore;
use actix_web::{HttpResponse, Responder, web};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct ScanRequest {
    /// Text decoded from the store barcode
    #[schema(example = "STORE-7-20261016")]
    pub code: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct LogQuery {
    /// Page number, starting at 1
    pub page: Option<u32>,
    /// Items per page (default 5, max 100)
    pub per_page: Option<u32>,
}

/// Clock in or out by scanning the store barcode
#[utoipa::path(
    post,
    path = "/api/attendance/scan",
    request_body = ScanRequest,
    responses(
        (status = 200, description = "Scan accepted", body = crate::clocking::tracker::ScanReceipt),
        (status = 400, description = "Invalid or expired store barcode", body = Object, example = json!({
            "error": "Invalid or expired store barcode."
        })),
        (status = 401, description = "User not authenticated"),
        (status = 403, description = "Outside clocking hours", body = Object, example = json!({
            "error": "Clocking is only allowed between 06:00 and 21:00."
        })),
        (status = 409, description = "Concurrent scan for the same session"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn scan<S: AttendanceStore + 'static>(
    auth: AuthUser,
    tracker: web::Data<AttendanceTracker<S>>,
    payload: web::Json<ScanRequest>,
) -> Result<impl Responder, AppError> {
    let receipt = tracker
        .scan(auth.store_id, auth.user_id, &payload.code, Utc::now())
        .await?;
    Ok(HttpResponse::Ok().json(receipt))
}

/// List the store's attendance log, newest first
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(LogQuery),
    responses(
        (status = 200, description = "Paginated attendance log", body = crate::clocking::tracker::LogPage),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn list_logs<S: AttendanceStore + 'static>(
    auth: AuthUser,
    tracker: web::Data<AttendanceTracker<S>>,
    query: web::Query<LogQuery>,
) -> Result<impl Responder, AppError> {
    let page = tracker
        .list(auth.store_id, query.page, query.per_page)
        .await?;
    Ok(HttpResponse::Ok().json(page))
}

/// Delete one attendance record
#[utoipa::path(
    delete,
    path = "/api/attendance/{id}",
    params(
        ("id" = u64, Path, description = "Attendance record id")
    ),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Store owner only"),
        (status = 404, description = "No such record in this store")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn delete_log<S: AttendanceStore + 'static>(
    auth: AuthUser,
    tracker: web::Data<AttendanceTracker<S>>,
    path: web::Path<u64>,
) -> Result<impl Responder, AppError> {
    auth.require_owner()?;
    tracker.delete(auth.store_id, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Delete every attendance record of the store
#[utoipa::path(
    delete,
    path = "/api/attendance",
    responses(
        (status = 200, description = "All records deleted", body = Object, example = json!({
            "message": "All attendance logs deleted.",
            "deleted": 12
        })),
        (status = 403, description = "Store owner only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn delete_all_logs<S: AttendanceStore + 'static>(
    auth: AuthUser,
    tracker: web::Data<AttendanceTracker<S>>,
) -> Result<impl Responder, AppError> {
    auth.require_owner()?;
    let deleted = tracker.delete_all(auth.store_id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "All attendance logs deleted.",
        "deleted": deleted
    })))
}

/// Today's store barcode
#[utoipa::path(
    get,
    path = "/api/attendance/barcode",
    responses(
        (status = 200, description = "Barcode payload to render", body = crate::clocking::barcode::StoreBarcode),
        (status = 403, description = "Store owner only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn barcode<S: AttendanceStore + 'static>(
    auth: AuthUser,
    tracker: web::Data<AttendanceTracker<S>>,
) -> Result<impl Responder, AppError> {
    auth.require_owner()?;
    Ok(HttpResponse::Ok().json(tracker.barcode(auth.store_id, Utc::now())))
}
