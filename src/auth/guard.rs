use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::CookieJar;
use tracing::{debug, warn};

use crate::{
    auth::{dto::AuthFailure, repo::User, token::TokenKeys},
    state::AppState,
};

/// Identity resolved by the guard: the user record plus the raw token it
/// presented, both available to downstream handlers.
pub struct CurrentUser {
    pub user: User,
    pub token: String,
}

/// Cookie-based authentication guard.
///
/// Extracts the auth cookie, decodes it, and resolves (decoded id, raw
/// token) against the store. The exact-token lookup means a token from a
/// previous login no longer matches once a new one has been issued. Any
/// failure yields the uniform not-authenticated body and the request never
/// reaches the handler.
#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AuthFailure;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = match jar.get(&state.config.auth.cookie_name) {
            Some(cookie) => cookie.value().to_string(),
            None => {
                debug!("auth cookie missing");
                return Err(AuthFailure::unauthenticated());
            }
        };

        let keys = TokenKeys::from_ref(state);
        let claims = match keys.decode(&token) {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "token decode failed");
                return Err(AuthFailure::unauthenticated());
            }
        };

        let user = match User::find_by_credential_token(&state.db, claims.sub, &token).await {
            Ok(Some(u)) => u,
            Ok(None) => {
                warn!(user_id = %claims.sub, "no record matching token");
                return Err(AuthFailure::unauthenticated());
            }
            Err(e) => {
                warn!(error = %e, "session lookup failed");
                return Err(AuthFailure::unauthenticated());
            }
        };

        Ok(CurrentUser { user, token })
    }
}
