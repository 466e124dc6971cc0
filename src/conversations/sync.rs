//! Live view of one conversation.
//!
//! Selecting a remote user spawns a worker that subscribes to the thread,
//! fetches it, and refetches the whole list every time the subscription
//! reports a change. Views are published on a watch channel. Every selection
//! bumps the view's generation and a worker only writes to the view of its
//! own generation, so nothing from a previous conversation can leak into the
//! current one.

use std::sync::Arc;

use serde::Serialize;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    error::ChatResult,
    model::{ConversationKey, Identity, MessageRecord},
    store::ChatStore,
};

use super::{history::load_messages, send::send_message};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// Nobody selected.
    #[default]
    Idle,
    /// Loading the list. A failed refetch stays here with the previous list
    /// and the error until the next change comes in.
    Fetching,
    /// Subscribed and showing the latest fetch.
    Live,
    /// The first fetch failed; nothing is subscribed. Select again to retry.
    Failed,
    Closed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConversationView {
    pub remote: Option<String>,
    pub state: SyncState,
    pub messages: Vec<MessageRecord>,
    pub error: Option<String>,
    pub generation: u64,
}

pub struct ConversationSync {
    store: Arc<dyn ChatStore>,
    identity: Identity,
    view: Arc<watch::Sender<ConversationView>>,
    worker: Option<JoinHandle<()>>,
}

impl ConversationSync {
    pub fn new(store: Arc<dyn ChatStore>, identity: Identity) -> Self {
        Self {
            store,
            identity,
            view: Arc::new(watch::channel(ConversationView::default()).0),
            worker: None,
        }
    }

    pub fn watch(&self) -> watch::Receiver<ConversationView> {
        self.view.subscribe()
    }

    pub fn view(&self) -> ConversationView {
        self.view.borrow().clone()
    }

    pub fn remote(&self) -> Option<String> {
        self.view.borrow().remote.clone()
    }

    /// Switches the conversation. The previous worker and its subscription
    /// are gone before anything for the new remote starts.
    pub async fn select(&mut self, remote: Option<&str>) {
        let running = self.worker.as_ref().is_some_and(|worker| !worker.is_finished());
        if running && self.remote().as_deref() == remote {
            return;
        }

        self.stop_worker().await;
        let generation = self.view.borrow().generation + 1;

        let Some(remote) = remote else {
            self.view.send_replace(ConversationView {
                generation,
                ..Default::default()
            });
            return;
        };

        info!(local = %self.identity.user_id, remote, generation, "opening conversation");
        self.view.send_replace(ConversationView {
            remote: Some(remote.to_owned()),
            state: SyncState::Fetching,
            messages: Vec::new(),
            error: None,
            generation,
        });

        let worker = Worker {
            store: self.store.clone(),
            key: ConversationKey::new(&self.identity.user_id, remote),
            view: self.view.clone(),
            generation,
        };
        self.worker = Some(tokio::spawn(worker.run()));
    }

    /// Tears the conversation down for good.
    pub async fn close(&mut self) {
        self.stop_worker().await;
        let generation = self.view.borrow().generation + 1;
        self.view.send_replace(ConversationView {
            state: SyncState::Closed,
            generation,
            ..Default::default()
        });
    }

    /// Sends to whoever is selected. A failure is also recorded on the view.
    pub async fn send(&self, content: &str) -> ChatResult<()> {
        let (remote, generation) = {
            let view = self.view.borrow();
            (view.remote.clone(), view.generation)
        };

        let result = send_message(self.store.as_ref(), &self.identity, remote.as_deref(), content).await;
        if let Err(err) = &result {
            self.view.send_if_modified(|view| {
                if view.generation != generation {
                    return false;
                }
                view.error = Some(err.to_string());
                true
            });
        }
        result
    }

    async fn stop_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
            // resolves once the task (and its subscription) is dropped
            let _ = worker.await;
        }
    }
}

impl Drop for ConversationSync {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}

struct Worker {
    store: Arc<dyn ChatStore>,
    key: ConversationKey,
    view: Arc<watch::Sender<ConversationView>>,
    generation: u64,
}

impl Worker {
    async fn run(self) {
        // subscribe first so a change landing during the fetch is not missed
        let mut subscription = self.store.subscribe(&self.key);

        match self.fetch().await {
            Ok(messages) => self.publish(|view| {
                view.state = SyncState::Live;
                view.messages = messages;
                view.error = None;
            }),
            Err(err) => {
                warn!(error = %err, remote = self.key.remote(), "initial fetch failed");
                drop(subscription);
                self.publish(|view| {
                    view.state = SyncState::Failed;
                    view.error = Some(err.to_string());
                });
                return;
            }
        }

        loop {
            if let Err(err) = subscription.changed().await {
                warn!(error = %err, remote = self.key.remote(), "subscription ended");
                self.publish(|view| {
                    view.state = SyncState::Closed;
                    view.error = Some(err.to_string());
                });
                return;
            }
            // one refetch covers everything already queued
            subscription.drain();

            debug!(remote = self.key.remote(), "change received, refetching");
            self.publish(|view| view.state = SyncState::Fetching);

            match self.fetch().await {
                Ok(messages) => self.publish(|view| {
                    view.state = SyncState::Live;
                    view.messages = messages;
                    view.error = None;
                }),
                Err(err) => {
                    warn!(error = %err, remote = self.key.remote(), "refetch failed");
                    self.publish(|view| view.error = Some(err.to_string()));
                }
            }
        }
    }

    async fn fetch(&self) -> ChatResult<Vec<MessageRecord>> {
        load_messages(self.store.as_ref(), &self.key, self.key.local()).await
    }

    fn publish(&self, update: impl FnOnce(&mut ConversationView)) {
        self.view.send_if_modified(|view| {
            if view.generation != self.generation {
                return false;
            }
            update(view);
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;
    use crate::store::{NewMessage, SqliteStore};

    async fn live_on(views: &mut watch::Receiver<ConversationView>, remote: &str) -> ConversationView {
        timeout(
            Duration::from_secs(5),
            views.wait_for(|v| v.state == SyncState::Live && v.remote.as_deref() == Some(remote)),
        )
        .await
        .unwrap()
        .unwrap()
        .clone()
    }

    #[tokio::test]
    async fn worker_from_an_earlier_selection_cannot_write() {
        let store = Arc::new(SqliteStore::in_memory().await.unwrap());
        let mut sync = ConversationSync::new(store.clone(), Identity::new("a"));
        let mut views = sync.watch();

        sync.select(Some("b")).await;
        let first = live_on(&mut views, "b").await;
        sync.select(Some("c")).await;
        let current = live_on(&mut views, "c").await;
        assert!(current.generation > first.generation);

        let stale = Worker {
            store: store.clone(),
            key: ConversationKey::new("a", "b"),
            view: sync.view.clone(),
            generation: first.generation,
        };
        let messages = stale.fetch().await.unwrap();
        stale.publish(|view| {
            view.remote = Some("b".into());
            view.messages = messages;
        });
        assert_eq!(sync.view(), current);

        // a full worker run on the old generation is just as inert
        let handle = tokio::spawn(stale.run());
        timeout(Duration::from_secs(5), async {
            while store.active_subscriptions() != 2 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        store
            .insert_message(NewMessage {
                sender_id: "b".into(),
                receiver_id: "a".into(),
                content: "for the old thread".into(),
            })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(sync.view(), current);

        handle.abort();
    }
}
