use async_trait::async_trait;
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use time::OffsetDateTime;
use tokio::sync::broadcast;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::{
    db::{self, AccountRow, MessageRow, PresenceRow},
    error::ChatResult,
    model::{ConversationKey, Role, SENT},
};

use super::{ChangeKind, ChatStore, MessageChange, NewMessage, Subscription};

const CHANGE_BUFFER: usize = 256;

/// SQLite-backed store with an in-process change feed.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db_pool: SqlitePool,
    changes: broadcast::Sender<MessageChange>,
}

impl SqliteStore {
    pub async fn connect(url: &str) -> ChatResult<Self> {
        let db_pool = SqlitePoolOptions::new()
            .max_connections(16)
            .connect(url)
            .await?;
        Self::new(db_pool).await
    }

    /// A private database that lives as long as the store.
    pub async fn in_memory() -> ChatResult<Self> {
        let db_pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::new(db_pool).await
    }

    pub async fn new(db_pool: SqlitePool) -> ChatResult<Self> {
        db::create_schema(&db_pool).await?;
        Ok(Self {
            db_pool,
            changes: broadcast::channel(CHANGE_BUFFER).0,
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db_pool
    }

    #[instrument(skip(self))]
    pub async fn upsert_account(
        &self,
        id: &str,
        name: &str,
        email: &str,
        role: Role,
        created_at: OffsetDateTime,
    ) -> ChatResult<()> {
        sqlx::query(
            "INSERT INTO users (id,name,email,role,created_at) VALUES (?,?,?,?,?)
             ON CONFLICT(id) DO UPDATE SET name=excluded.name, email=excluded.email, role=excluded.role",
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(role.as_str())
        .bind(db::to_millis(created_at))
        .execute(&self.db_pool)
        .await?;
        Ok(())
    }

    /// Writes a raw presence value; readers validate it.
    #[instrument(skip(self))]
    pub async fn set_presence(
        &self,
        user_id: &str,
        status: &str,
        updated_at: OffsetDateTime,
    ) -> ChatResult<()> {
        sqlx::query(
            "INSERT INTO user_status (user_id,status,updated_at) VALUES (?,?,?)
             ON CONFLICT(user_id) DO UPDATE SET status=excluded.status, updated_at=excluded.updated_at",
        )
        .bind(user_id)
        .bind(status)
        .bind(db::to_millis(updated_at))
        .execute(&self.db_pool)
        .await?;
        Ok(())
    }

    /// Announces a change made by another writer sharing the database.
    pub fn publish(&self, change: MessageChange) {
        // no subscribers is fine
        let _ = self.changes.send(change);
    }

    pub fn active_subscriptions(&self) -> usize {
        self.changes.receiver_count()
    }
}

#[async_trait]
impl ChatStore for SqliteStore {
    #[instrument(skip(self))]
    async fn list_accounts(&self) -> ChatResult<Vec<AccountRow>> {
        let accounts = sqlx::query_as::<_, AccountRow>(
            "SELECT id,name,email,role,created_at FROM users ORDER BY name",
        )
        .fetch_all(&self.db_pool)
        .await?;
        Ok(accounts)
    }

    #[instrument(skip(self))]
    async fn list_presence(&self) -> ChatResult<Vec<PresenceRow>> {
        let presence = sqlx::query_as::<_, PresenceRow>(
            "SELECT user_id,status,updated_at FROM user_status",
        )
        .fetch_all(&self.db_pool)
        .await?;
        Ok(presence)
    }

    #[instrument(skip(self), fields(local = key.local(), remote = key.remote()))]
    async fn fetch_conversation(&self, key: &ConversationKey) -> ChatResult<Vec<MessageRow>> {
        let messages = sqlx::query_as::<_, MessageRow>(
            "SELECT id,sender_id,receiver_id,content,timestamp,status FROM messages
             WHERE (sender_id=? AND receiver_id=?) OR (sender_id=? AND receiver_id=?)
             ORDER BY timestamp ASC, seq ASC",
        )
        .bind(key.local())
        .bind(key.remote())
        .bind(key.remote())
        .bind(key.local())
        .fetch_all(&self.db_pool)
        .await?;
        debug!(count = messages.len(), "fetched conversation");
        Ok(messages)
    }

    #[instrument(skip(self, message), fields(sender = %message.sender_id, receiver = %message.receiver_id))]
    async fn insert_message(&self, message: NewMessage) -> ChatResult<MessageRow> {
        let row = MessageRow {
            id: Uuid::now_v7().to_string(),
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            content: message.content,
            timestamp: db::to_millis(OffsetDateTime::now_utc()),
            status: SENT.to_owned(),
        };

        sqlx::query("INSERT INTO messages (id,sender_id,receiver_id,content,timestamp,status) VALUES (?,?,?,?,?,?)")
            .bind(&row.id)
            .bind(&row.sender_id)
            .bind(&row.receiver_id)
            .bind(&row.content)
            .bind(row.timestamp)
            .bind(&row.status)
            .execute(&self.db_pool)
            .await?;

        self.publish(MessageChange {
            kind: ChangeKind::Insert,
            sender_id: row.sender_id.clone(),
            receiver_id: row.receiver_id.clone(),
        });

        Ok(row)
    }

    fn subscribe(&self, key: &ConversationKey) -> Subscription {
        debug!(local = key.local(), remote = key.remote(), "subscribing");
        Subscription::new(key.clone(), self.changes.subscribe())
    }
}
