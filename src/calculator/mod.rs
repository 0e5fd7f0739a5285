//! Public calculator page and its stateless two-operand endpoints.

pub mod handlers;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
