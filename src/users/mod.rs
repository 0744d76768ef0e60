use axum::Router;

use crate::state::AppState;

mod dto;
pub mod handlers;
mod repo;
pub mod repo_types;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::public_routes())
        .merge(handlers::account_routes())
        .merge(handlers::admin_routes())
}
