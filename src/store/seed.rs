use std::path::Path;

use serde::Deserialize;
use time::OffsetDateTime;
use tracing::info;

use crate::model::Role;

use super::SqliteStore;

/// A roster to load at startup, for development databases.
#[derive(Debug, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub users: Vec<SeedAccount>,
    #[serde(default)]
    pub presence: Vec<SeedPresence>,
}

#[derive(Debug, Deserialize)]
pub struct SeedAccount {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
}

#[derive(Debug, Deserialize)]
pub struct SeedPresence {
    pub user_id: String,
    pub status: String,
}

impl Seed {
    pub fn from_file(path: &Path) -> anyhow::Result<Seed> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub async fn apply(&self, store: &SqliteStore) -> anyhow::Result<()> {
        let now = OffsetDateTime::now_utc();
        for user in &self.users {
            store
                .upsert_account(
                    &user.id,
                    &user.name,
                    &user.email,
                    Role::from_store(&user.role),
                    user.created_at.unwrap_or(now),
                )
                .await?;
        }
        for presence in &self.presence {
            store.set_presence(&presence.user_id, &presence.status, now).await?;
        }
        info!(users = self.users.len(), presence = self.presence.len(), "seeded directory");
        Ok(())
    }
}
