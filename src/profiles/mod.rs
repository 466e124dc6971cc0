mod card;
mod page;

use axum::{routing::get, Router};

use crate::AppState;

pub use card::{initials, last_seen_label, ProfileCard};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{user_id}", get(page::profile))
}
