//! Route definitions for the AgroFocus backend

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public + protected profile)
        .nest("/auth", auth_routes())
        // Protected routes - vegetation indices
        .nest("/indices", index_routes())
        // Protected routes - meteorology and GDD
        .nest("/meteorology", meteorology_routes())
        // Protected routes - productivity estimation
        .nest("/productivity", productivity_routes())
        // Protected routes - field delineation
        .nest("/fields", field_routes())
        // Protected routes - monitoring map
        .nest("/monitoring", monitoring_routes())
}

/// Authentication routes
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
        .route(
            "/profile",
            get(handlers::get_profile).route_layer(middleware::from_fn(auth_middleware)),
        )
}

/// Vegetation index routes (protected)
fn index_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_indices))
        .route("/ndvi/:field_id", get(handlers::get_ndvi))
        .route("/ndre/:field_id", get(handlers::get_ndre))
        .route("/msavi/:field_id", get(handlers::get_msavi))
        .route("/compare/:field_id", get(handlers::compare_indices))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Meteorology and GDD routes (protected)
fn meteorology_routes() -> Router<AppState> {
    Router::new()
        .route("/gdd/crops", get(handlers::list_gdd_crops))
        .route("/gdd/batch", post(handlers::batch_gdd))
        .route("/gdd/:field_id", get(handlers::get_gdd))
        .route("/current", get(handlers::current_weather))
        .route("/forecast", get(handlers::weather_forecast))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Productivity routes (protected)
fn productivity_routes() -> Router<AppState> {
    Router::new()
        .route("/crops", get(handlers::list_productivity_crops))
        .route("/estimate/:field_id", get(handlers::estimate_productivity))
        .route("/history/:field_id", get(handlers::productivity_history))
        .route("/compare/:field_id", get(handlers::compare_seasons))
        .route("/yield", post(handlers::record_yield))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Field delineation routes (protected)
fn field_routes() -> Router<AppState> {
    Router::new()
        .route("/delineate", post(handlers::delineate_fields))
        .route("/delineate/preview", post(handlers::preview_delineation))
        .route("/classify-zones", post(handlers::classify_zones))
        .route("/export", post(handlers::export_fields))
        .route("/algorithms", get(handlers::list_algorithms))
        .route("/:field_id/boundary", put(handlers::adjust_boundary))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Monitoring routes (protected)
fn monitoring_routes() -> Router<AppState> {
    Router::new()
        .route("/layers/:field_id", get(handlers::monitoring_layers))
        .route("/fields", get(handlers::monitoring_fields))
        .route("/farms/:farm_id", get(handlers::farm_overview))
        .route_layer(middleware::from_fn(auth_middleware))
}
