use std::time::Duration;

use axum::{
    error_handling::HandleErrorLayer,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tower::{BoxError, ServiceBuilder};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::{request_tracing, ServerState};

use super::{api, pages};

pub struct AppRouter;

impl AppRouter {
    pub fn create(state: ServerState) -> Router {
        let cors_layer = CorsLayer::new().allow_origin(Any).allow_methods(Any);

        Router::new()
            .route("/", get(pages::welcome))
            .route("/dashboard", get(pages::dashboard))
            .route("/debug", get(pages::debug))
            .route("/api/emails", get(api::get_emails))
            .route("/api/refresh", post(api::refresh))
            .route("/api/create-drafts", post(api::create_drafts))
            .route("/api/email/:id", get(api::get_email_by_id))
            .route("/api/debug", get(api::debug_info))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(request_tracing::make_span))
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(HandleErrorLayer::new(|_: BoxError| async {
                        StatusCode::REQUEST_TIMEOUT
                    }))
                    .timeout(Duration::from_secs(60))
                    .layer(cors_layer),
            )
            .with_state(state)
            .fallback(handler_404)
    }
}

pub async fn handler_404() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Route does not exist")
}
