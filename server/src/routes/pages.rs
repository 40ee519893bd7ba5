use axum::response::Html;
use minijinja::render;

use crate::server_config::cfg;

use super::templates::{DASHBOARD_TEMPLATE, DEBUG_TEMPLATE, WELCOME_TEMPLATE};

/// GET /
pub async fn welcome() -> Html<String> {
    Html(render!(WELCOME_TEMPLATE, user_email => &cfg.user_email))
}

/// GET /dashboard
pub async fn dashboard() -> Html<String> {
    Html(DASHBOARD_TEMPLATE.to_string())
}

/// GET /debug
pub async fn debug() -> Html<String> {
    Html(DEBUG_TEMPLATE.to_string())
}
