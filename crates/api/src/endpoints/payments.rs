//! Payment endpoints.

use academy_common::AppResult;
use academy_core::{SubmitPaymentInput, SubscriptionParams};
use academy_db::entities::payment::{self, PaymentStatus};
use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};

use super::requests::{EnrollmentRequestResponse, EnrollmentResponse};
use super::subscriptions::SubscriptionResponse;
use crate::{extractors::Actor, middleware::AppState, response::ApiResponse};

// ==================== Request/Response Types ====================

/// Payment response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub id: String,
    pub payment_reference: String,
    pub student_id: String,
    pub guardian_id: Option<String>,
    pub course_id: String,
    pub enrollment_request_id: Option<String>,
    pub amount: String,
    pub currency: String,
    pub receipt_ref: String,
    pub status: PaymentStatus,
    pub admin_notes: Option<String>,
    pub verified_by: Option<String>,
    pub verified_at: Option<String>,
    pub created_at: String,
}

impl From<payment::Model> for PaymentResponse {
    fn from(p: payment::Model) -> Self {
        Self {
            id: p.id,
            payment_reference: p.payment_reference,
            student_id: p.student_id,
            guardian_id: p.guardian_id,
            course_id: p.course_id,
            enrollment_request_id: p.enrollment_request_id,
            amount: p.amount.to_string(),
            currency: p.currency,
            receipt_ref: p.receipt_ref,
            status: p.status,
            admin_notes: p.admin_notes,
            verified_by: p.verified_by,
            verified_at: p.verified_at.map(|t| t.to_rfc3339()),
            created_at: p.created_at.to_rfc3339(),
        }
    }
}

/// Verification response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResponse {
    pub payment: PaymentResponse,
    pub subscription: Option<SubscriptionResponse>,
    pub enrollment_request: Option<EnrollmentRequestResponse>,
    pub enrollment: Option<EnrollmentResponse>,
}

/// Verify body. Without `subscription` the payment is only marked verified.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub payment_id: String,
    pub notes: Option<String>,
    pub subscription: Option<SubscriptionParams>,
}

/// Reject body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectRequest {
    pub payment_id: String,
    pub reason: String,
}

/// Body naming a single payment.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIdRequest {
    pub payment_id: String,
}

/// List payments, either of one student or by status.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRequest {
    pub student_id: Option<String>,
    #[serde(default)]
    pub status: PaymentStatus,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub until_id: Option<String>,
}

const fn default_limit() -> u64 {
    10
}

// ==================== Handlers ====================

async fn submit(
    State(state): State<AppState>,
    Json(req): Json<SubmitPaymentInput>,
) -> AppResult<ApiResponse<PaymentResponse>> {
    let payment = state.payment_service.submit(req).await?;
    Ok(ApiResponse::ok(payment.into()))
}

async fn verify(
    Actor(actor): Actor,
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> AppResult<ApiResponse<VerificationResponse>> {
    let verification = state
        .payment_service
        .verify(&req.payment_id, &actor, req.notes, req.subscription)
        .await?;

    Ok(ApiResponse::ok(VerificationResponse {
        payment: verification.payment.into(),
        subscription: verification.subscription.map(Into::into),
        enrollment_request: verification.enrollment_request.map(Into::into),
        enrollment: verification.enrollment.map(Into::into),
    }))
}

async fn reject(
    Actor(actor): Actor,
    State(state): State<AppState>,
    Json(req): Json<RejectRequest>,
) -> AppResult<ApiResponse<PaymentResponse>> {
    let payment = state
        .payment_service
        .reject(&req.payment_id, &actor, &req.reason)
        .await?;
    Ok(ApiResponse::ok(payment.into()))
}

async fn show(
    State(state): State<AppState>,
    Json(req): Json<PaymentIdRequest>,
) -> AppResult<ApiResponse<PaymentResponse>> {
    let payment = state.payment_service.get(&req.payment_id).await?;
    Ok(ApiResponse::ok(payment.into()))
}

async fn list(
    State(state): State<AppState>,
    Json(req): Json<ListRequest>,
) -> AppResult<ApiResponse<Vec<PaymentResponse>>> {
    let payments = match req.student_id {
        Some(student_id) => state.payment_service.list_for_student(&student_id).await?,
        None => {
            state
                .payment_service
                .list_by_status(req.status, req.limit.min(100), req.until_id.as_deref())
                .await?
        }
    };
    Ok(ApiResponse::ok(payments.into_iter().map(Into::into).collect()))
}

/// Create the payments router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/submit", post(submit))
        .route("/verify", post(verify))
        .route("/reject", post(reject))
        .route("/show", post(show))
        .route("/list", post(list))
}
