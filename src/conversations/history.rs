use std::sync::Arc;

use axum::{debug_handler, extract::{Path, State}, Json};

use crate::{
    db::{self, MessageRow},
    error::ChatResult,
    model::{ConversationKey, Identity, MessageRecord},
    store::ChatStore,
    users::Directory,
    AppResult, AppState, ChatError,
};

/// Reads the whole thread and marks which messages belong to `local_id`.
pub async fn load_messages(
    store: &dyn ChatStore,
    key: &ConversationKey,
    local_id: &str,
) -> ChatResult<Vec<MessageRecord>> {
    let rows = store.fetch_conversation(key).await?;
    Ok(rows.into_iter().map(|row| to_record(row, local_id)).collect())
}

fn to_record(row: MessageRow, local_id: &str) -> MessageRecord {
    MessageRecord {
        is_own: row.sender_id == local_id,
        id: row.id,
        sender_id: row.sender_id,
        receiver_id: row.receiver_id,
        content: row.content,
        timestamp: db::from_millis(row.timestamp),
        status: row.status,
    }
}

#[debug_handler(state = AppState)]
pub(crate) async fn history(
    Path(remote_id): Path<String>,
    State(store): State<Arc<dyn ChatStore>>,
    State(directory): State<Directory>,
    identity: Identity,
) -> AppResult<Json<Vec<MessageRecord>>> {
    if directory.find(&remote_id).await.is_none() {
        return Err(ChatError::UnknownUser(remote_id).into());
    }

    let key = ConversationKey::new(&identity.user_id, remote_id);
    Ok(Json(load_messages(store.as_ref(), &key, &identity.user_id).await?))
}
