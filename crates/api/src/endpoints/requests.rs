//! Enrollment request endpoints.

use academy_common::AppResult;
use academy_core::{CreateRequestInput, GuardianInfo, ProvisioningOutcome};
use academy_db::entities::{
    enrollment::{self, EnrollmentStatus},
    enrollment_request::{self, RequestStatus, RoutingPath},
    enums::Frequency,
};
use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};

use crate::{extractors::Actor, middleware::AppState, response::ApiResponse};

// ==================== Request/Response Types ====================

/// Enrollment request response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentRequestResponse {
    pub id: String,
    pub request_code: String,
    pub student_id: String,
    pub course_id: String,
    pub frequency: Frequency,
    pub quoted_price: String,
    pub message: Option<String>,
    pub status: RequestStatus,
    pub routing_path: Option<RoutingPath>,
    pub rejection_reason: Option<String>,
    pub enrollment_id: Option<String>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl From<enrollment_request::Model> for EnrollmentRequestResponse {
    fn from(r: enrollment_request::Model) -> Self {
        Self {
            id: r.id,
            request_code: r.request_code,
            student_id: r.student_id,
            course_id: r.course_id,
            frequency: r.frequency,
            quoted_price: r.quoted_price.to_string(),
            message: r.message,
            status: r.status,
            routing_path: r.routing_path,
            rejection_reason: r.rejection_reason,
            enrollment_id: r.enrollment_id,
            reviewed_by: r.reviewed_by,
            reviewed_at: r.reviewed_at.map(|t| t.to_rfc3339()),
            created_at: r.created_at.to_rfc3339(),
            updated_at: r.updated_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// Enrollment response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentResponse {
    pub id: String,
    pub student_id: String,
    pub course_id: String,
    pub enrollment_request_id: Option<String>,
    pub status: EnrollmentStatus,
    pub progress_percentage: i32,
    pub notes: Option<String>,
    pub enrolled_at: String,
    pub completed_at: Option<String>,
}

impl From<enrollment::Model> for EnrollmentResponse {
    fn from(e: enrollment::Model) -> Self {
        Self {
            id: e.id,
            student_id: e.student_id,
            course_id: e.course_id,
            enrollment_request_id: e.enrollment_request_id,
            status: e.status,
            progress_percentage: e.progress_percentage,
            notes: e.notes,
            enrolled_at: e.enrolled_at.to_rfc3339(),
            completed_at: e.completed_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// Approval response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalResponse {
    pub request: EnrollmentRequestResponse,
    pub enrollment: EnrollmentResponse,
}

/// Guardian provisioning response. The temporary password is only ever
/// delivered through the welcome event, never over this API.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardianNotificationResponse {
    pub request: EnrollmentRequestResponse,
    pub guardian_id: String,
    pub registration_code: Option<String>,
    pub newly_registered: bool,
}

/// Create request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    pub student_id: String,
    pub course_id: String,
    #[serde(flatten)]
    pub input: CreateRequestInput,
}

/// Body naming a single request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestIdRequest {
    pub request_id: String,
}

/// Lookup by business code.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestCodeRequest {
    pub request_code: String,
}

/// Guardian provisioning body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGuardianRequest {
    pub request_id: String,
    pub guardian: GuardianInfo,
}

/// Reject body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectRequest {
    pub request_id: String,
    pub reason: String,
}

/// List requests, either of one student or by status.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRequest {
    pub student_id: Option<String>,
    #[serde(default)]
    pub status: RequestStatus,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub until_id: Option<String>,
}

const fn default_limit() -> u64 {
    10
}

/// Count body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountRequest {
    #[serde(default)]
    pub status: RequestStatus,
}

/// Count response.
#[derive(Serialize)]
pub struct CountResponse {
    pub count: u64,
}

// ==================== Handlers ====================

async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateRequest>,
) -> AppResult<ApiResponse<EnrollmentRequestResponse>> {
    let request = state
        .request_service
        .create(&req.student_id, &req.course_id, req.input)
        .await?;
    Ok(ApiResponse::ok(request.into()))
}

async fn notify(
    State(state): State<AppState>,
    Json(req): Json<RequestIdRequest>,
) -> AppResult<ApiResponse<EnrollmentRequestResponse>> {
    let request = state.request_service.notify(&req.request_id).await?;
    Ok(ApiResponse::ok(request.into()))
}

async fn create_guardian(
    State(state): State<AppState>,
    Json(req): Json<CreateGuardianRequest>,
) -> AppResult<ApiResponse<GuardianNotificationResponse>> {
    let notification = state
        .request_service
        .create_guardian_and_notify(&req.request_id, req.guardian)
        .await?;

    let outcome = &notification.outcome;
    Ok(ApiResponse::ok(GuardianNotificationResponse {
        guardian_id: outcome.guardian_id().to_string(),
        registration_code: outcome.registration().map(|r| r.registration_code.clone()),
        newly_registered: matches!(outcome, ProvisioningOutcome::Registered { .. }),
        request: notification.request.into(),
    }))
}

async fn approve(
    Actor(actor): Actor,
    State(state): State<AppState>,
    Json(req): Json<RequestIdRequest>,
) -> AppResult<ApiResponse<ApprovalResponse>> {
    let approval = state.request_service.approve(&req.request_id, &actor).await?;
    Ok(ApiResponse::ok(ApprovalResponse {
        request: approval.request.into(),
        enrollment: approval.enrollment.into(),
    }))
}

async fn reject(
    Actor(actor): Actor,
    State(state): State<AppState>,
    Json(req): Json<RejectRequest>,
) -> AppResult<ApiResponse<EnrollmentRequestResponse>> {
    let request = state
        .request_service
        .reject(&req.request_id, &actor, &req.reason)
        .await?;
    Ok(ApiResponse::ok(request.into()))
}

async fn cancel(
    Actor(actor): Actor,
    State(state): State<AppState>,
    Json(req): Json<RequestIdRequest>,
) -> AppResult<ApiResponse<EnrollmentRequestResponse>> {
    let request = state.request_service.cancel(&req.request_id, &actor).await?;
    Ok(ApiResponse::ok(request.into()))
}

async fn show(
    State(state): State<AppState>,
    Json(req): Json<RequestIdRequest>,
) -> AppResult<ApiResponse<EnrollmentRequestResponse>> {
    let request = state.request_service.get(&req.request_id).await?;
    Ok(ApiResponse::ok(request.into()))
}

async fn show_by_code(
    State(state): State<AppState>,
    Json(req): Json<RequestCodeRequest>,
) -> AppResult<ApiResponse<EnrollmentRequestResponse>> {
    let request = state.request_service.get_by_code(&req.request_code).await?;
    Ok(ApiResponse::ok(request.into()))
}

async fn list(
    State(state): State<AppState>,
    Json(req): Json<ListRequest>,
) -> AppResult<ApiResponse<Vec<EnrollmentRequestResponse>>> {
    let requests = match req.student_id {
        Some(student_id) => state.request_service.list_for_student(&student_id).await?,
        None => {
            state
                .request_service
                .list_by_status(req.status, req.limit.min(100), req.until_id.as_deref())
                .await?
        }
    };
    Ok(ApiResponse::ok(requests.into_iter().map(Into::into).collect()))
}

async fn count(
    State(state): State<AppState>,
    Json(req): Json<CountRequest>,
) -> AppResult<ApiResponse<CountResponse>> {
    let count = state.request_service.count_by_status(req.status).await?;
    Ok(ApiResponse::ok(CountResponse { count }))
}

/// Create the enrollment request router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create))
        .route("/notify", post(notify))
        .route("/create-guardian", post(create_guardian))
        .route("/approve", post(approve))
        .route("/reject", post(reject))
        .route("/cancel", post(cancel))
        .route("/show", post(show))
        .route("/show-by-code", post(show_by_code))
        .route("/list", post(list))
        .route("/count", post(count))
}
