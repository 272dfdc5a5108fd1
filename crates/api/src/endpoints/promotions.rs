//! Student promotion endpoints.

use academy_common::AppResult;
use academy_core::CreatePromotionInput;
use academy_db::entities::student_promotion::{self, PromotionStatus, PromotionType};
use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};

use super::requests::EnrollmentResponse;
use crate::{extractors::Actor, middleware::AppState, response::ApiResponse};

// ==================== Request/Response Types ====================

/// Promotion response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionResponse {
    pub id: String,
    pub promotion_code: String,
    pub student_id: String,
    pub from_level_id: Option<String>,
    pub to_level_id: String,
    pub promotion_type: PromotionType,
    pub status: PromotionStatus,
    pub auto_update_enrollments: bool,
    pub promoted_by: String,
    pub reviewed_by: Option<String>,
    pub notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub created_at: String,
    pub reviewed_at: Option<String>,
    pub completed_at: Option<String>,
}

impl From<student_promotion::Model> for PromotionResponse {
    fn from(p: student_promotion::Model) -> Self {
        Self {
            id: p.id,
            promotion_code: p.promotion_code,
            student_id: p.student_id,
            from_level_id: p.from_level_id,
            to_level_id: p.to_level_id,
            promotion_type: p.promotion_type,
            status: p.status,
            auto_update_enrollments: p.auto_update_enrollments,
            promoted_by: p.promoted_by,
            reviewed_by: p.reviewed_by,
            notes: p.notes,
            rejection_reason: p.rejection_reason,
            created_at: p.created_at.to_rfc3339(),
            reviewed_at: p.reviewed_at.map(|t| t.to_rfc3339()),
            completed_at: p.completed_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// Executed promotion response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionOutcomeResponse {
    pub promotion: PromotionResponse,
    pub completed_enrollments: Vec<EnrollmentResponse>,
}

/// Body naming a single promotion.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionIdRequest {
    pub promotion_id: String,
}

/// Reject body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectRequest {
    pub promotion_id: String,
    pub reason: String,
}

/// List promotions of a student.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRequest {
    pub student_id: String,
}

// ==================== Handlers ====================

async fn create(
    Actor(actor): Actor,
    State(state): State<AppState>,
    Json(req): Json<CreatePromotionInput>,
) -> AppResult<ApiResponse<PromotionResponse>> {
    let promotion = state.promotion_service.create(req, &actor).await?;
    Ok(ApiResponse::ok(promotion.into()))
}

async fn approve(
    Actor(actor): Actor,
    State(state): State<AppState>,
    Json(req): Json<PromotionIdRequest>,
) -> AppResult<ApiResponse<PromotionOutcomeResponse>> {
    let outcome = state
        .promotion_service
        .approve(&req.promotion_id, &actor)
        .await?;
    Ok(ApiResponse::ok(PromotionOutcomeResponse {
        promotion: outcome.promotion.into(),
        completed_enrollments: outcome
            .completed_enrollments
            .into_iter()
            .map(Into::into)
            .collect(),
    }))
}

async fn reject(
    Actor(actor): Actor,
    State(state): State<AppState>,
    Json(req): Json<RejectRequest>,
) -> AppResult<ApiResponse<PromotionResponse>> {
    let promotion = state
        .promotion_service
        .reject(&req.promotion_id, &actor, &req.reason)
        .await?;
    Ok(ApiResponse::ok(promotion.into()))
}

async fn show(
    State(state): State<AppState>,
    Json(req): Json<PromotionIdRequest>,
) -> AppResult<ApiResponse<PromotionResponse>> {
    let promotion = state.promotion_service.get(&req.promotion_id).await?;
    Ok(ApiResponse::ok(promotion.into()))
}

async fn list(
    State(state): State<AppState>,
    Json(req): Json<ListRequest>,
) -> AppResult<ApiResponse<Vec<PromotionResponse>>> {
    let promotions = state
        .promotion_service
        .list_for_student(&req.student_id)
        .await?;
    Ok(ApiResponse::ok(promotions.into_iter().map(Into::into).collect()))
}

/// Create the promotions router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create))
        .route("/approve", post(approve))
        .route("/reject", post(reject))
        .route("/show", post(show))
        .route("/list", post(list))
}
