use axum::Router;

use crate::AppState;

pub mod marketplace;

/// Build the /api router with all sub-routes.
pub fn router() -> Router<AppState> {
    Router::new().merge(marketplace::router())
}
