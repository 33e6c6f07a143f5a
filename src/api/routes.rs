use crate::AppState;
use axum::{
    Router,
    routing::{get, post},
};

pub fn create_router() -> Router<AppState> {
    let api_routes = Router::new().route(
        "/research",
        post(crate::api::handlers::research::research),
    );

    Router::new()
        .route("/health", get(crate::api::handlers::health))
        .route("/ws", get(crate::api::handlers::stream::ws_handler))
        .nest("/api", api_routes)
}
