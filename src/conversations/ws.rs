use std::sync::Arc;

use axum::{
    debug_handler,
    extract::{ws::{Message, WebSocket}, Path, State, WebSocketUpgrade},
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info};

use crate::{
    model::Identity,
    store::ChatStore,
    users::Directory,
    AppResult, AppState, ChatError,
};

use super::{send::SendMessageRequest, sync::ConversationSync};

#[debug_handler(state = AppState)]
pub(crate) async fn conversation_ws(
    Path(remote_id): Path<String>,
    State(store): State<Arc<dyn ChatStore>>,
    State(directory): State<Directory>,
    identity: Identity,

    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    if directory.find(&remote_id).await.is_none() {
        return Err(ChatError::UnknownUser(remote_id).into());
    }

    Ok(ws.on_upgrade(move |socket| run(socket, store, identity, remote_id)))
}

/// Pushes every view of the conversation to the socket; text frames coming
/// back are messages to send.
async fn run(socket: WebSocket, store: Arc<dyn ChatStore>, identity: Identity, remote_id: String) {
    info!(local = %identity.user_id, remote = %remote_id, "conversation socket opened");

    let mut sync = ConversationSync::new(store, identity);
    let mut views = sync.watch();
    sync.select(Some(&remote_id)).await;

    let (mut sender, mut receiver) = socket.split();

    let mut push_task = tokio::spawn(async move {
        loop {
            let payload = {
                let view = views.borrow_and_update();
                serde_json::to_string(&*view)
            };
            let Ok(payload) = payload else {
                break;
            };
            if sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
            if views.changed().await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            _ = &mut push_task => break,
            frame = receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let Ok(SendMessageRequest { content }) = serde_json::from_str(text.as_str()) else {
                        debug!("ignoring malformed frame");
                        continue;
                    };
                    // failures are recorded on the view the client is watching
                    let _ = sync.send(&content).await;
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => continue,
            },
        }
    }

    push_task.abort();
    sync.close().await;
    info!(remote = %remote_id, "conversation socket closed");
}
