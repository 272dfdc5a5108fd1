//! Subscription endpoints.

use academy_common::AppResult;
use academy_db::entities::{
    enums::Frequency,
    subscription::{self, SubscriptionStatus},
};
use axum::{Json, Router, extract::State, routing::post};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{middleware::AppState, response::ApiResponse};

// ==================== Request/Response Types ====================

/// Subscription response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResponse {
    pub id: String,
    pub subscription_code: String,
    pub student_id: String,
    pub course_id: String,
    pub payment_id: String,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: SubscriptionStatus,
    pub total_sessions: i32,
    pub sessions_attended: i32,
    pub sessions_remaining: i32,
    pub status_reason: Option<String>,
    pub cancelled_at: Option<String>,
    pub created_at: String,
}

impl From<subscription::Model> for SubscriptionResponse {
    fn from(s: subscription::Model) -> Self {
        Self {
            id: s.id,
            subscription_code: s.subscription_code,
            student_id: s.student_id,
            course_id: s.course_id,
            payment_id: s.payment_id,
            frequency: s.frequency,
            start_date: s.start_date,
            end_date: s.end_date,
            status: s.status,
            total_sessions: s.total_sessions,
            sessions_attended: s.sessions_attended,
            sessions_remaining: s.sessions_remaining,
            status_reason: s.status_reason,
            cancelled_at: s.cancelled_at.map(|t| t.to_rfc3339()),
            created_at: s.created_at.to_rfc3339(),
        }
    }
}

/// Body naming a single subscription.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionIdRequest {
    pub subscription_id: String,
}

/// Body for status changes that carry a reason.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReasonRequest {
    pub subscription_id: String,
    #[serde(default)]
    pub reason: String,
}

/// Body for date-dependent operations; `today` defaults to the server date.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatedRequest {
    pub subscription_id: String,
    pub today: Option<NaiveDate>,
}

/// List subscriptions of a student.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRequest {
    pub student_id: String,
}

fn today_or_now(today: Option<NaiveDate>) -> NaiveDate {
    today.unwrap_or_else(|| Utc::now().date_naive())
}

// ==================== Handlers ====================

async fn attend(
    State(state): State<AppState>,
    Json(req): Json<SubscriptionIdRequest>,
) -> AppResult<ApiResponse<SubscriptionResponse>> {
    let subscription = state
        .subscription_service
        .record_attendance(&req.subscription_id)
        .await?;
    Ok(ApiResponse::ok(subscription.into()))
}

async fn check_expiry(
    State(state): State<AppState>,
    Json(req): Json<DatedRequest>,
) -> AppResult<ApiResponse<SubscriptionResponse>> {
    let subscription = state
        .subscription_service
        .check_expiry(&req.subscription_id, today_or_now(req.today))
        .await?;
    Ok(ApiResponse::ok(subscription.into()))
}

async fn cancel(
    State(state): State<AppState>,
    Json(req): Json<ReasonRequest>,
) -> AppResult<ApiResponse<SubscriptionResponse>> {
    let subscription = state
        .subscription_service
        .cancel(&req.subscription_id, &req.reason)
        .await?;
    Ok(ApiResponse::ok(subscription.into()))
}

async fn suspend(
    State(state): State<AppState>,
    Json(req): Json<ReasonRequest>,
) -> AppResult<ApiResponse<SubscriptionResponse>> {
    let subscription = state
        .subscription_service
        .suspend(&req.subscription_id, &req.reason)
        .await?;
    Ok(ApiResponse::ok(subscription.into()))
}

async fn reactivate(
    State(state): State<AppState>,
    Json(req): Json<DatedRequest>,
) -> AppResult<ApiResponse<SubscriptionResponse>> {
    let subscription = state
        .subscription_service
        .reactivate(&req.subscription_id, today_or_now(req.today))
        .await?;
    Ok(ApiResponse::ok(subscription.into()))
}

async fn show(
    State(state): State<AppState>,
    Json(req): Json<SubscriptionIdRequest>,
) -> AppResult<ApiResponse<SubscriptionResponse>> {
    let subscription = state.subscription_service.get(&req.subscription_id).await?;
    Ok(ApiResponse::ok(subscription.into()))
}

async fn list(
    State(state): State<AppState>,
    Json(req): Json<ListRequest>,
) -> AppResult<ApiResponse<Vec<SubscriptionResponse>>> {
    let subscriptions = state
        .subscription_service
        .list_for_student(&req.student_id)
        .await?;
    Ok(ApiResponse::ok(
        subscriptions.into_iter().map(Into::into).collect(),
    ))
}

/// Create the subscriptions router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/attend", post(attend))
        .route("/check-expiry", post(check_expiry))
        .route("/cancel", post(cancel))
        .route("/suspend", post(suspend))
        .route("/reactivate", post(reactivate))
        .route("/show", post(show))
        .route("/list", post(list))
}
