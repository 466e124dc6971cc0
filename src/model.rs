use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::warn;

/// Every roster entry gets the same avatar until per-user images exist.
pub const PLACEHOLDER_AVATAR: &str = "/api/placeholder/32/32";

/// Delivery marker written on every new message.
pub const SENT: &str = "sent";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Student,
    Faculty,
    Alumni,
}

impl Role {
    /// Reads a role column. Anything unrecognised is treated as a student.
    pub fn from_store(raw: &str) -> Role {
        use Role::*;
        match raw.trim().to_ascii_lowercase().as_str() {
            "student" => Student,
            "faculty" => Faculty,
            "alumni" => Alumni,
            other => {
                warn!(role = other, "unknown role in directory, using Student");
                Student
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        use Role::*;
        match self {
            Student => "Student",
            Faculty => "Faculty",
            Alumni => "Alumni",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Online,
    Away,
    #[default]
    Offline,
}

impl Status {
    /// Reads a presence column; missing or unknown values collapse to offline.
    pub fn from_store(raw: Option<&str>) -> Status {
        use Status::*;
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("online") => Online,
            Some("away") => Away,
            _ => Offline,
        }
    }

    pub fn as_str(&self) -> &'static str {
        use Status::*;
        match self {
            Online => "online",
            Away => "away",
            Offline => "offline",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directory entry joined with its presence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub role: Role,
    pub status: Status,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub last_seen: OffsetDateTime,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageRecord {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub status: String,
    /// True when the viewer sent it.
    pub is_own: bool,
}

/// The signed-in user. Sign-in happens elsewhere; this is only ever read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
}

impl Identity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

/// The unordered pair of participants that scopes one thread.
#[derive(Debug, Clone)]
pub struct ConversationKey {
    local: String,
    remote: String,
}

impl ConversationKey {
    pub fn new(local: impl Into<String>, remote: impl Into<String>) -> Self {
        Self {
            local: local.into(),
            remote: remote.into(),
        }
    }

    pub fn local(&self) -> &str {
        &self.local
    }

    pub fn remote(&self) -> &str {
        &self.remote
    }

    /// Whether a row with this sender and receiver belongs to the thread.
    pub fn contains(&self, sender_id: &str, receiver_id: &str) -> bool {
        (sender_id == self.local && receiver_id == self.remote)
            || (sender_id == self.remote && receiver_id == self.local)
    }
}

impl PartialEq for ConversationKey {
    fn eq(&self, other: &Self) -> bool {
        self.contains(&other.local, &other.remote)
    }
}

impl Eq for ConversationKey {}
