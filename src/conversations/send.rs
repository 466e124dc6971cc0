use std::sync::Arc;

use axum::{debug_handler, extract::{Path, State}, http::StatusCode, Json};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    error::{ChatError, ChatResult},
    model::Identity,
    store::{ChatStore, NewMessage},
    users::Directory,
    AppResult, AppState,
};

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

/// Appends a message to the thread with `remote_id`. Nothing local changes
/// here; the conversation's subscription picks the new row up.
pub async fn send_message(
    store: &dyn ChatStore,
    identity: &Identity,
    remote_id: Option<&str>,
    content: &str,
) -> ChatResult<()> {
    let Some(remote_id) = remote_id else {
        return Err(ChatError::NoConversation);
    };

    let content = content.trim();
    if content.is_empty() {
        return Err(ChatError::EmptyMessage);
    }

    let row = store
        .insert_message(NewMessage {
            sender_id: identity.user_id.clone(),
            receiver_id: remote_id.to_owned(),
            content: content.to_owned(),
        })
        .await
        .inspect_err(|err| warn!(error = %err, remote_id, "sending message failed"))?;

    info!(id = %row.id, from = %row.sender_id, to = %row.receiver_id, "message sent");
    Ok(())
}

#[debug_handler(state = AppState)]
pub(crate) async fn send(
    Path(remote_id): Path<String>,
    State(store): State<Arc<dyn ChatStore>>,
    State(directory): State<Directory>,
    identity: Identity,

    Json(SendMessageRequest { content }): Json<SendMessageRequest>,
) -> AppResult<StatusCode> {
    if directory.find(&remote_id).await.is_none() {
        return Err(ChatError::UnknownUser(remote_id).into());
    }

    send_message(store.as_ref(), &identity, Some(&remote_id), &content).await?;
    Ok(StatusCode::NO_CONTENT)
}
