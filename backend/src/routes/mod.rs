//! Route definitions for the Stock Management Platform

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public)
        .nest("/auth", auth_routes())
        // Protected routes - role management
        .nest("/roles", role_routes())
        // Protected routes - user management
        .nest("/users", user_routes())
        // Protected routes - supplier registry
        .nest("/suppliers", supplier_routes())
        // Protected routes - product catalog
        .nest("/products", product_routes())
        // Protected routes - stock movements
        .nest("/movements", movement_routes())
        // Protected routes - notifications
        .nest("/notifications", notification_routes())
}

/// Authentication routes (public)
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
}

/// Role management routes (protected)
fn role_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_roles).post(handlers::create_role))
        .route("/permissions", get(handlers::list_permissions))
        .route(
            "/:role_id",
            get(handlers::get_role)
                .put(handlers::update_role)
                .delete(handlers::delete_role),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// User management routes (protected)
fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_users).post(handlers::create_user))
        .route("/me", get(handlers::get_me))
        .route(
            "/:user_id",
            get(handlers::get_user).put(handlers::update_user),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Supplier registry routes (protected)
fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_suppliers).post(handlers::create_supplier),
        )
        .route(
            "/:supplier_id",
            get(handlers::get_supplier).put(handlers::update_supplier),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Product catalog routes (protected)
fn product_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_products).post(handlers::create_product),
        )
        .route("/low-stock", get(handlers::list_low_stock_products))
        .route("/code/:code", get(handlers::get_product_by_code))
        .route(
            "/:product_id",
            get(handlers::get_product).put(handlers::update_product),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Stock movement routes (protected)
fn movement_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_movements).post(handlers::register_movement),
        )
        .route(
            "/:movement_id",
            get(handlers::get_movement)
                .put(handlers::update_movement)
                .delete(handlers::delete_movement),
        )
        .route(
            "/:movement_id/deactivate",
            post(handlers::deactivate_movement),
        )
        .route(
            "/:movement_id/reactivate",
            post(handlers::reactivate_movement),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Notification routes (protected)
fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::get_notifications))
        .route(
            "/:notification_id/read",
            post(handlers::mark_notification_read),
        )
        .route(
            "/queue/process",
            post(handlers::process_notification_queue),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}
