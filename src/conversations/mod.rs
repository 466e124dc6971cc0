mod history;
mod send;
mod sync;
mod ws;

use axum::{routing::get, Router};

use crate::AppState;

pub use history::load_messages;
pub use send::{send_message, SendMessageRequest};
pub use sync::{ConversationSync, ConversationView, SyncState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{user_id}", get(history::history).post(send::send))
        .route("/{user_id}/ws", get(ws::conversation_ws))
}
