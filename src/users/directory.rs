use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::{
    db::{self, AccountRow, PresenceRow},
    error::ChatResult,
    model::{PLACEHOLDER_AVATAR, Role, Status, UserRecord},
    store::ChatStore,
};

/// Loads every account and joins in presence. A presence failure is not
/// fatal: everyone is reported offline instead.
pub async fn list_users(store: &dyn ChatStore) -> ChatResult<Vec<UserRecord>> {
    let accounts = store.list_accounts().await?;

    let presence = match store.list_presence().await {
        Ok(rows) => rows,
        Err(err) => {
            warn!(error = %err, "could not fetch presence, reporting everyone offline");
            Vec::new()
        }
    };

    let mut presence: HashMap<String, PresenceRow> = presence
        .into_iter()
        .map(|row| (row.user_id.clone(), row))
        .collect();

    Ok(accounts
        .into_iter()
        .map(|account| {
            let presence = presence.remove(&account.id);
            merge(account, presence)
        })
        .collect())
}

fn merge(account: AccountRow, presence: Option<PresenceRow>) -> UserRecord {
    let (status, last_seen) = match presence {
        Some(row) => (Status::from_store(Some(&row.status)), row.updated_at),
        None => (Status::Offline, account.created_at),
    };

    UserRecord {
        role: Role::from_store(&account.role),
        id: account.id,
        name: account.name,
        status,
        email: account.email,
        last_seen: db::from_millis(last_seen),
        avatar: Some(PLACEHOLDER_AVATAR.to_owned()),
    }
}

/// The contact list as shown to `local_id`: everyone but themselves whose
/// name or role contains `query`, ignoring case.
pub fn roster_view<'a>(users: &'a [UserRecord], local_id: &str, query: &str) -> Vec<&'a UserRecord> {
    let query = query.to_lowercase();
    users
        .iter()
        .filter(|user| user.id != local_id)
        .filter(|user| {
            user.name.to_lowercase().contains(&query)
                || user.role.as_str().to_lowercase().contains(&query)
        })
        .collect()
}

pub fn current_user<'a>(users: &'a [UserRecord], local_id: &str) -> Option<&'a UserRecord> {
    users.iter().find(|user| user.id == local_id)
}

#[derive(Debug, Default)]
struct Roster {
    users: Vec<UserRecord>,
    error: Option<String>,
}

/// Last loaded roster, refreshed on demand.
#[derive(Clone)]
pub struct Directory {
    store: Arc<dyn ChatStore>,
    roster: Arc<RwLock<Roster>>,
}

impl Directory {
    pub fn new(store: Arc<dyn ChatStore>) -> Self {
        Self {
            store,
            roster: Arc::default(),
        }
    }

    /// Reloads the roster. On failure the previous roster stays and the
    /// error is kept for display.
    pub async fn refresh(&self) -> ChatResult<()> {
        match list_users(self.store.as_ref()).await {
            Ok(users) => {
                info!(count = users.len(), "directory loaded");
                let mut roster = self.roster.write().await;
                roster.users = users;
                roster.error = None;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "directory refresh failed");
                self.roster.write().await.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    pub async fn users(&self) -> Vec<UserRecord> {
        self.roster.read().await.users.clone()
    }

    pub async fn find(&self, user_id: &str) -> Option<UserRecord> {
        current_user(&self.roster.read().await.users, user_id).cloned()
    }

    pub async fn error(&self) -> Option<String> {
        self.roster.read().await.error.clone()
    }
}
