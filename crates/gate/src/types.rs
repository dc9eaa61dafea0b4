use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Platform user identifier (administrators, visitors and the super-admin).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(Self)
            .map_err(|e| Error::invalid_argument(format!("not a user id: {s:?} ({e})")))
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// The sender of an inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub id: UserId,
    pub username: Option<String>,
}

impl Sender {
    pub fn new(id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            username: None,
        }
    }

    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }
}

/// Which of an administrator's two lists a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// Reward channel, revealed after verification.
    Channel,
    /// Gate group, membership required.
    Group,
}

impl RecordKind {
    /// Capitalised label used in prompts ("Channel", "Group").
    pub fn label(self) -> &'static str {
        match self {
            Self::Channel => "Channel",
            Self::Group => "Group",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Channel => f.write_str("channel"),
            Self::Group => f.write_str("group"),
        }
    }
}

/// A configured channel or group: platform chat id plus invite link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub chat_id: String,
    pub link: String,
}

impl ChatRecord {
    pub fn new(chat_id: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            link: link.into(),
        }
    }
}

impl FromStr for ChatRecord {
    type Err = Error;

    /// Parse a detail line of exactly two whitespace-separated tokens.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tokens = s.split_whitespace();
        match (tokens.next(), tokens.next(), tokens.next()) {
            (Some(chat_id), Some(link), None) => Ok(Self::new(chat_id, link)),
            _ => Err(Error::invalid_argument(format!(
                "expected `<id> <link>`, got {s:?}"
            ))),
        }
    }
}

/// Live membership status of a user in a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    Member,
    Administrator,
    Owner,
    Restricted,
    Left,
    Kicked,
    Unknown,
}

impl MemberStatus {
    /// Only plain members, administrators and owners satisfy a gate.
    pub fn is_joined(self) -> bool {
        matches!(self, Self::Member | Self::Administrator | Self::Owner)
    }
}
