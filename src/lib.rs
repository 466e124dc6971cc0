pub mod appresult;
pub mod config;
pub mod conversations;
pub mod db;
pub mod error;
pub mod identity;
pub mod model;
pub mod profiles;
pub mod store;
pub mod users;

use std::sync::Arc;

use axum::{extract::FromRef, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use appresult::{AppError, AppResult};
pub use error::{ChatError, ChatResult};

use store::ChatStore;
use users::Directory;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub store: Arc<dyn ChatStore>,
    pub directory: Directory,
}

impl AppState {
    pub fn new(store: Arc<dyn ChatStore>) -> Self {
        Self {
            directory: Directory::new(store.clone()),
            store,
        }
    }
}

pub fn app(app_state: AppState) -> Router {
    Router::new()
        .nest("/users", users::router())
        .nest("/c", conversations::router())
        .nest("/p", profiles::router())

        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
