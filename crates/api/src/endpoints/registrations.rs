//! Parent registration endpoints.

use academy_common::AppResult;
use academy_db::entities::parent_registration::{self, RegistrationStatus};
use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};

use crate::{middleware::AppState, response::ApiResponse};

/// Parent registration response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    pub id: String,
    pub registration_code: String,
    pub student_id: String,
    pub enrollment_request_id: String,
    pub guardian_email: String,
    pub status: RegistrationStatus,
    pub expires_at: String,
    pub created_guardian_id: Option<String>,
    pub completed_at: Option<String>,
}

impl From<parent_registration::Model> for RegistrationResponse {
    fn from(r: parent_registration::Model) -> Self {
        Self {
            id: r.id,
            registration_code: r.registration_code,
            student_id: r.student_id,
            enrollment_request_id: r.enrollment_request_id,
            guardian_email: r.guardian_email,
            status: r.status,
            expires_at: r.expires_at.to_rfc3339(),
            created_guardian_id: r.created_guardian_id,
            completed_at: r.completed_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// Lookup by registration code.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationCodeRequest {
    pub registration_code: String,
}

/// Completion body.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRequest {
    pub registration_code: String,
    pub temporary_password: String,
    pub new_password: String,
}

async fn complete(
    State(state): State<AppState>,
    Json(req): Json<CompleteRequest>,
) -> AppResult<ApiResponse<RegistrationResponse>> {
    let registration = state
        .provisioning_service
        .complete(
            &req.registration_code,
            &req.temporary_password,
            &req.new_password,
        )
        .await?;
    Ok(ApiResponse::ok(registration.into()))
}

async fn show(
    State(state): State<AppState>,
    Json(req): Json<RegistrationCodeRequest>,
) -> AppResult<ApiResponse<RegistrationResponse>> {
    let registration = state
        .provisioning_service
        .get_by_code(&req.registration_code)
        .await?;
    Ok(ApiResponse::ok(registration.into()))
}

/// Create the parent registration router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/complete", post(complete))
        .route("/show", post(show))
}
