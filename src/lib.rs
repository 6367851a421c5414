pub mod app;
pub mod handlers;
pub mod models;
pub mod services;
pub mod utils;

#[cfg(test)]
mod test_support;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use app::state::AppState;
use handlers::*;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/oauth/{provider}/connect", get(oauth::connect))
        .route("/api/oauth/{provider}/callback", get(oauth::callback))
        .route(
            "/api/terminals/devices",
            get(devices::list_devices).post(devices::select_device),
        )
        .route(
            "/api/terminals/payment-intent",
            post(payment_intent::create_payment_intent),
        )
        .route(
            "/api/terminals/payment-status",
            post(payment_status::get_payment_status),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
