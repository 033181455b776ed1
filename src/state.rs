use sqlx::PgPool;

use crate::cache::Cache;
use crate::repositories::{MovieRepository, OrderRepository};

/// Shared application state handed to every handler by axum.
#[derive(Clone)]
pub struct AppState {
    pub movies: MovieRepository,
    pub orders: OrderRepository,
}

impl AppState {
    pub fn new(db: PgPool, cache: Cache) -> Self {
        Self {
            movies: MovieRepository::new(db.clone(), cache),
            orders: OrderRepository::new(db),
        }
    }
}
