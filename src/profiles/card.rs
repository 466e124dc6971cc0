use serde::Serialize;
use time::OffsetDateTime;

use crate::model::{Role, Status, UserRecord};

/// What the info panel shows for one user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileCard {
    pub id: String,
    pub name: String,
    pub initials: String,
    pub role: Role,
    pub status: Status,
    pub email: String,
    pub last_seen: String,
    pub avatar: Option<String>,
}

impl ProfileCard {
    pub fn new(user: &UserRecord, now: OffsetDateTime) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            initials: initials(&user.name),
            role: user.role,
            status: user.status,
            email: user.email.clone(),
            last_seen: last_seen_label(user.last_seen, now),
            avatar: user.avatar.clone(),
        }
    }
}

pub fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

pub fn last_seen_label(last_seen: OffsetDateTime, now: OffsetDateTime) -> String {
    let elapsed = now - last_seen;
    let minutes = elapsed.whole_minutes();
    let hours = elapsed.whole_hours();
    let days = elapsed.whole_days();

    if minutes < 1 {
        "Active now".to_owned()
    } else if minutes < 60 {
        format!("Active {minutes} minutes ago")
    } else if hours < 24 {
        format!("Active {hours} hours ago")
    } else if days < 7 {
        format!("Active {days} days ago")
    } else {
        format!("Last seen {}", last_seen.date())
    }
}

#[cfg(test)]
mod tests {
    use time::{Duration, macros::datetime};

    use super::*;

    #[test]
    fn last_seen_buckets() {
        let now = datetime!(2025-03-10 12:00 UTC);
        assert_eq!(last_seen_label(now, now), "Active now");
        assert_eq!(last_seen_label(now + Duration::minutes(2), now), "Active now");
        assert_eq!(last_seen_label(now - Duration::seconds(59), now), "Active now");
        assert_eq!(last_seen_label(now - Duration::minutes(5), now), "Active 5 minutes ago");
        assert_eq!(last_seen_label(now - Duration::minutes(90), now), "Active 1 hours ago");
        assert_eq!(last_seen_label(now - Duration::days(2), now), "Active 2 days ago");
        assert_eq!(last_seen_label(now - Duration::days(30), now), "Last seen 2025-02-08");
    }

    #[test]
    fn initials_take_each_word() {
        assert_eq!(initials("ada lovelace"), "AL");
        assert_eq!(initials("  Grace   Brewster Hopper "), "GBH");
        assert_eq!(initials(""), "");
    }
}
