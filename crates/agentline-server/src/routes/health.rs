use axum::{routing::get, Router};

async fn health() -> &'static str {
    "OK"
}

pub fn routes() -> Router {
    Router::new().route("/health", get(health))
}
