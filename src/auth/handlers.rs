use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthCheckResponse, LoginRequest, LoginResponse, RegisterRequest, SuccessResponse,
            UpdatePasswordRequest,
        },
        guard::CurrentUser,
        password::{hash_password, verify_password},
        repo::{NewUser, User},
        token::TokenKeys,
    },
    state::AppState,
};

const MAX_NAME_LEN: usize = 50;
const MIN_PASSWORD_LEN: usize = 5;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/auth", get(auth_check))
        .route("/logout", get(logout))
        .route("/password", post(update_password))
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn validate_register(payload: &RegisterRequest) -> Result<(), &'static str> {
    if !is_valid_email(&payload.email) {
        return Err("Invalid email");
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        return Err("Password too short");
    }
    if payload.name.as_deref().is_some_and(|n| n.chars().count() > MAX_NAME_LEN) {
        return Err("Name too long");
    }
    if payload
        .lastname
        .as_deref()
        .is_some_and(|n| n.chars().count() > MAX_NAME_LEN)
    {
        return Err("Last name too long");
    }
    Ok(())
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<Json<SuccessResponse>, (StatusCode, String)> {
    payload.email = payload.email.trim().to_lowercase();

    if let Err(msg) = validate_register(&payload) {
        warn!(email = %payload.email, msg, "register rejected");
        return Err((StatusCode::BAD_REQUEST, msg.into()));
    }

    // Ensure email is not taken
    match User::find_by_email(&state.db, &payload.email).await {
        Ok(Some(_)) => {
            warn!(email = %payload.email, "email already registered");
            return Err((StatusCode::CONFLICT, "Email already registered".into()));
        }
        Ok(None) => {}
        Err(e) => {
            error!(error = %e, "find_by_email failed");
            return Err((e.status(), e.to_string()));
        }
    }

    // Hashing happens here, once, before the insert; the store never sees
    // the plaintext.
    let hash = match hash_password(&payload.password) {
        Ok(h) => h,
        Err(e) => {
            error!(error = %e, "hash_password failed");
            return Err((e.status(), e.to_string()));
        }
    };

    let user = match User::create(
        &state.db,
        NewUser {
            name: payload.name.as_deref(),
            lastname: payload.lastname.as_deref(),
            email: &payload.email,
            password_hash: &hash,
        },
    )
    .await
    {
        Ok(u) => u,
        // A concurrent registration can slip past the pre-check and hit the
        // unique constraint instead.
        Err(e) if e.is_unique_violation() => {
            warn!(email = %payload.email, "email already registered");
            return Err((StatusCode::CONFLICT, "Email already registered".into()));
        }
        Err(e) => {
            error!(error = %e, "create user failed");
            return Err((e.status(), e.to_string()));
        }
    };

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(Json(SuccessResponse { success: true }))
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(mut payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), (StatusCode, String)> {
    payload.email = payload.email.trim().to_lowercase();

    let user = match User::find_by_email(&state.db, &payload.email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(email = %payload.email, "login unknown email");
            return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
        }
        Err(e) => {
            error!(error = %e, "find_by_email failed");
            return Err((e.status(), e.to_string()));
        }
    };

    let ok = match verify_password(&payload.password, &user.password_hash) {
        Ok(v) => v,
        Err(e) => {
            error!(error = %e, "verify_password failed");
            return Err((e.status(), e.to_string()));
        }
    };

    if !ok {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
    }

    let keys = TokenKeys::from_ref(&state);
    let (token, token_exp) = match keys.issue(user.id) {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "token issue failed");
            return Err((e.status(), e.to_string()));
        }
    };

    // Overwrites any previous token, so at most one session is live per user.
    let user = match User::store_session_token(&state.db, user.id, &token, token_exp).await {
        Ok(u) => u,
        Err(e) => {
            error!(error = %e, "store session token failed");
            return Err((e.status(), e.to_string()));
        }
    };

    let cookie = Cookie::build((state.config.auth.cookie_name.clone(), token))
        .path("/")
        .http_only(true)
        .build();

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            login_success: true,
            user_id: user.id,
        }),
    ))
}

#[instrument(skip(current))]
pub async fn auth_check(current: CurrentUser) -> Json<AuthCheckResponse> {
    let user = current.user;
    Json(AuthCheckResponse {
        id: user.id,
        is_auth: true,
        is_admin: user.is_admin(),
        email: user.email,
        name: user.name,
        lastname: user.lastname,
        role: user.role,
        image: user.image,
    })
}

/// Password change: the digest is recomputed here and nowhere else, so
/// saves that do not touch the password never rehash.
#[instrument(skip(state, current, payload))]
pub async fn update_password(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(payload): Json<UpdatePasswordRequest>,
) -> Result<Json<SuccessResponse>, (StatusCode, String)> {
    if payload.new_password.len() < MIN_PASSWORD_LEN {
        warn!(user_id = %current.user.id, "new password too short");
        return Err((StatusCode::BAD_REQUEST, "Password too short".into()));
    }

    let ok = match verify_password(&payload.old_password, &current.user.password_hash) {
        Ok(v) => v,
        Err(e) => {
            error!(error = %e, "verify_password failed");
            return Err((e.status(), e.to_string()));
        }
    };
    if !ok {
        warn!(user_id = %current.user.id, "password change with wrong old password");
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
    }

    let hash = match hash_password(&payload.new_password) {
        Ok(h) => h,
        Err(e) => {
            error!(error = %e, "hash_password failed");
            return Err((e.status(), e.to_string()));
        }
    };

    if let Err(e) = User::update_password(&state.db, current.user.id, &hash).await {
        error!(error = %e, user_id = %current.user.id, "update password failed");
        return Err((e.status(), e.to_string()));
    }

    info!(user_id = %current.user.id, "password changed");
    Ok(Json(SuccessResponse { success: true }))
}

#[instrument(skip(state, current))]
pub async fn logout(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<SuccessResponse>, (StatusCode, String)> {
    if let Err(e) = User::clear_session_token(&state.db, current.user.id).await {
        error!(error = %e, user_id = %current.user.id, "clear session token failed");
        return Err((e.status(), e.to_string()));
    }

    info!(user_id = %current.user.id, "user logged out");
    Ok(Json(SuccessResponse { success: true }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_addresses() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@sub.example.org"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a b@x.com"));
        assert!(!is_valid_email("a@x"));
    }

    fn request(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: None,
            lastname: None,
            email: email.into(),
            password: password.into(),
        }
    }

    #[test]
    fn register_validation_enforces_password_length() {
        assert!(validate_register(&request("a@x.com", "secret")).is_ok());
        assert_eq!(
            validate_register(&request("a@x.com", "1234")),
            Err("Password too short")
        );
    }

    #[test]
    fn register_validation_caps_name_length() {
        let mut req = request("a@x.com", "secret");
        req.name = Some("x".repeat(MAX_NAME_LEN));
        assert!(validate_register(&req).is_ok());
        req.name = Some("x".repeat(MAX_NAME_LEN + 1));
        assert_eq!(validate_register(&req), Err("Name too long"));
    }
}
