use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{health_check, movies, orders};
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    let movie_routes = Router::new()
        .route("/", get(movies::catalog))
        .route("/upcoming", get(movies::upcoming_movies))
        .route("/popular", get(movies::popular_movies))
        .route("/genres", get(movies::all_genres))
        .route("/:id", get(movies::movie_detail));

    let order_routes = Router::new()
        .route("/", post(orders::create_order))
        .route("/history", get(orders::order_history))
        .route("/schedules", get(orders::schedules))
        .route("/seats", get(orders::available_seats))
        .route("/payments", get(orders::payments))
        .route("/cinemas", get(orders::cinemas))
        .route("/locations", get(orders::locations))
        .route("/times", get(orders::times))
        .route("/:id", get(orders::order_detail));

    Router::new()
        .route("/health", get(health_check))
        .nest("/movies", movie_routes)
        .nest("/orders", order_routes)
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer())
        .layer(create_cors_layer())
        .with_state(state)
}
