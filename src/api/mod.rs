//! HTTP surface: thin translation between routes and the job dispatcher.
//! Authentication happens here, before any job is submitted.

pub mod routes;
pub mod state;

pub use routes::{api_routes, outcome_json};
pub use state::AppState;

use axum::Router;
use tower_http::trace::TraceLayer;

pub fn router(state: AppState) -> Router {
    api_routes(state).layer(TraceLayer::new_for_http())
}
