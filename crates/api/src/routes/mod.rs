pub mod health;
pub mod project;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /projects                       create-and-analyze (POST), list (GET)
/// /projects/{id}                  project detail (GET)
/// /projects/{id}/designs          synthesize a design (POST)
/// ```
///
/// Every route requires the `x-user-id` header.
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/projects", project::router())
}
