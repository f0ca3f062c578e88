//! REST surface for the pentkit catalog
//!
//! All routes live under `/api`. Handlers share one [`Catalog`] and run its
//! blocking storage calls on tokio's blocking pool.

pub mod error;
mod handlers;

use axum::routing::{get, post, put};
use axum::Router;
use pentkit_core::Catalog;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use error::{status_for, ApiError, ApiResult};

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
}

/// Builds the application router
pub fn router(catalog: Arc<Catalog>) -> Router {
    let api = Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route("/categories/type/{type}", get(handlers::categories_by_type))
        .route("/categories/reorder", put(handlers::reorder_categories))
        .route(
            "/categories/{id}",
            get(handlers::get_category)
                .put(handlers::update_category)
                .delete(handlers::delete_category),
        )
        .route(
            "/commands",
            get(handlers::list_commands).post(handlers::create_command),
        )
        .route("/commands/search", get(handlers::search_commands))
        .route("/commands/generate", post(handlers::generate_commands))
        .route("/commands/reorder", put(handlers::reorder_commands))
        .route(
            "/commands/category/{category_id}",
            get(handlers::commands_by_category),
        )
        .route("/commands/phase/{phase}", get(handlers::commands_by_phase))
        .route(
            "/commands/{id}",
            get(handlers::get_command)
                .put(handlers::update_command)
                .delete(handlers::delete_command),
        );

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState { catalog })
}
