// Export route modules
pub mod agent;
pub mod auth;
pub mod health;

use crate::state::AppState;
use axum::Router;

// Function to configure all routes
pub fn configure(state: AppState) -> Router {
    Router::new()
        .merge(auth::routes(state.clone()))
        .merge(agent::routes(state))
        .merge(health::routes())
}
