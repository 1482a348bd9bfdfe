use axum::{response::Html, routing::get, Router};

use crate::state::AppState;

/// Presentational views only; every interaction goes through /api/users.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(landing))
        .route("/login", get(login))
        .route("/register", get(register))
}

async fn landing() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

async fn login() -> Html<&'static str> {
    Html(include_str!("../static/login.html"))
}

async fn register() -> Html<&'static str> {
    Html(include_str!("../static/register.html"))
}
