//! Player profiles and live-session merging.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// General information about a player, as persisted in the ledger.
///
/// Profiles are immutable snapshots: a fresh profile is built for every trade
/// or join event by merging the stored data with whatever the server
/// currently knows about the player (see [`PlayerProfile::merged_with`]), and
/// is persisted via an upsert keyed by the player's unique id.
///
/// The Unix epoch acts as the "unknown" sentinel for both timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerProfile {
    uuid: Uuid,
    name: String,
    first_seen: DateTime<Utc>,
    last_seen: DateTime<Utc>,
}

impl PlayerProfile {
    /// Creates a profile from stored data.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Empty`] if the name is empty, or
    /// [`ValidationError::SeenOutOfOrder`] if `first_seen` is after
    /// `last_seen`.
    pub fn new(
        uuid: Uuid,
        name: impl Into<String>,
        first_seen: DateTime<Utc>,
        last_seen: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ValidationError::Empty("player name"));
        }
        if first_seen > last_seen {
            return Err(ValidationError::SeenOutOfOrder {
                first_seen,
                last_seen,
            });
        }
        Ok(Self {
            uuid,
            name,
            first_seen,
            last_seen,
        })
    }

    /// Creates a profile for a player the ledger has never seen.
    ///
    /// Both timestamps are set to the Unix epoch sentinel; merging with a
    /// live session fills them in.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Empty`] if the name is empty.
    pub fn unknown(uuid: Uuid, name: impl Into<String>) -> Result<Self, ValidationError> {
        Self::new(uuid, name, DateTime::UNIX_EPOCH, DateTime::UNIX_EPOCH)
    }

    /// The player's unique id.
    pub const fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// The player's last known name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// When the player was first seen on the server(s).
    pub const fn first_seen(&self) -> DateTime<Utc> {
        self.first_seen
    }

    /// When the player was last seen on the server(s).
    pub const fn last_seen(&self) -> DateTime<Utc> {
        self.last_seen
    }

    /// Merges this profile with the player directory's current view.
    ///
    /// The earliest known first-seen wins. A player who is online right now
    /// is seen *now*, and their current name wins over the stored one;
    /// otherwise a newer locally recorded last-seen updates both the
    /// last-seen timestamp and the name.
    #[must_use]
    pub fn merged_with(&self, session: &SessionInfo, now: DateTime<Utc>) -> Self {
        let mut first_seen = self.first_seen;
        let mut last_seen = self.last_seen;
        let mut name = self.name.clone();

        if let Some(first_played) = session.first_played {
            if first_played < first_seen || first_seen == DateTime::UNIX_EPOCH {
                first_seen = first_played;
            }
        }

        if session.online {
            last_seen = now;
            if let Some(session_name) = &session.name {
                name.clone_from(session_name);
            }
        } else if let Some(last_played) = session.last_played {
            if last_played > last_seen {
                last_seen = last_played;
                if let Some(session_name) = &session.name {
                    name.clone_from(session_name);
                }
            }
        }

        if first_seen > last_seen {
            first_seen = last_seen;
        }

        Self {
            uuid: self.uuid,
            name,
            first_seen,
            last_seen,
        }
    }
}

/// What the live-player directory currently knows about a player.
///
/// This is the collaborator input for [`PlayerProfile::merged_with`]; the
/// directory itself (an in-memory cache fed by join/quit events) lives
/// outside the storage layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    /// The player's current name, if known locally.
    pub name: Option<String>,
    /// Whether the player is online right now.
    pub online: bool,
    /// When the player first played on this server, if known.
    pub first_played: Option<DateTime<Utc>>,
    /// When the player last played on this server, if known.
    pub last_played: Option<DateTime<Utc>>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().unwrap()
    }

    #[test]
    fn rejects_out_of_order_timestamps() {
        let err = PlayerProfile::new(Uuid::new_v4(), "alice", ts(200), ts(100));
        assert!(matches!(err, Err(ValidationError::SeenOutOfOrder { .. })));
    }

    #[test]
    fn online_session_wins_name_and_last_seen() {
        let stored = PlayerProfile::new(Uuid::new_v4(), "old_name", ts(100), ts(200)).unwrap();
        let session = SessionInfo {
            name: Some(String::from("new_name")),
            online: true,
            first_played: None,
            last_played: None,
        };
        let merged = stored.merged_with(&session, ts(500));
        assert_eq!(merged.name(), "new_name");
        assert_eq!(merged.last_seen(), ts(500));
        assert_eq!(merged.first_seen(), ts(100));
    }

    #[test]
    fn earlier_local_first_played_wins() {
        let stored = PlayerProfile::new(Uuid::new_v4(), "alice", ts(100), ts(200)).unwrap();
        let session = SessionInfo {
            first_played: Some(ts(50)),
            ..SessionInfo::default()
        };
        let merged = stored.merged_with(&session, ts(500));
        assert_eq!(merged.first_seen(), ts(50));
        assert_eq!(merged.last_seen(), ts(200));
    }

    #[test]
    fn offline_newer_last_played_updates_name() {
        let stored = PlayerProfile::new(Uuid::new_v4(), "old_name", ts(100), ts(200)).unwrap();
        let session = SessionInfo {
            name: Some(String::from("renamed")),
            online: false,
            first_played: None,
            last_played: Some(ts(300)),
        };
        let merged = stored.merged_with(&session, ts(500));
        assert_eq!(merged.name(), "renamed");
        assert_eq!(merged.last_seen(), ts(300));
    }

    #[test]
    fn offline_older_last_played_changes_nothing() {
        let stored = PlayerProfile::new(Uuid::new_v4(), "alice", ts(100), ts(200)).unwrap();
        let session = SessionInfo {
            name: Some(String::from("stale")),
            online: false,
            first_played: None,
            last_played: Some(ts(150)),
        };
        let merged = stored.merged_with(&session, ts(500));
        assert_eq!(merged.name(), "alice");
        assert_eq!(merged.last_seen(), ts(200));
    }

    #[test]
    fn unknown_profile_uses_epoch_sentinels() {
        let profile = PlayerProfile::unknown(Uuid::new_v4(), "bob").unwrap();
        assert_eq!(profile.first_seen(), DateTime::UNIX_EPOCH);
        assert_eq!(profile.last_seen(), DateTime::UNIX_EPOCH);
    }
}
