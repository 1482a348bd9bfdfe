use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub lastname: Option<String>,
    pub email: String,
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for a password change.
#[derive(Debug, Deserialize)]
pub struct UpdatePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Response returned after login, wire-compatible with the frontend.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub login_success: bool,
    pub user_id: Uuid,
}

/// Identity payload for the guarded auth-check endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthCheckResponse {
    pub id: Uuid,
    pub is_auth: bool,
    pub is_admin: bool,
    pub email: String,
    pub name: Option<String>,
    pub lastname: Option<String>,
    pub role: i32,
    pub image: Option<String>,
}

/// Uniform guard rejection body. Every failure on the authentication path
/// (missing cookie, bad signature, no matching record, store error) maps to
/// this same shape so no internal detail leaks to the client.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthFailure {
    pub is_auth: bool,
    pub error: bool,
}

impl AuthFailure {
    pub fn unauthenticated() -> Self {
        Self {
            is_auth: false,
            error: true,
        }
    }
}

impl IntoResponse for AuthFailure {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, Json(self)).into_response()
    }
}
