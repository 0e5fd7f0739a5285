pub mod dto;
pub mod error;
pub mod handlers;
pub mod model;
pub mod repo;
mod repo_types;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
