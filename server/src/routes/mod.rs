mod api;
mod app_router;
mod pages;
mod templates;

pub use app_router::AppRouter;
