//! crates/weave_core/src/domain.rs
//!
//! Defines the data structures shared between the API client and its callers.
//! All of them are read-mostly projections of server state and carry the
//! serde shape the backend speaks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

//=========================================================================================
// Accounts
//=========================================================================================

/// The currently logged-in user, as returned by `/auth/me` and the auth endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    /// Informational only; a value the client cannot parse reads as `None`.
    #[serde(default, with = "timestamp::lenient")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_pic_url: Option<String>,
}

impl User {
    /// The name shown for this user: the username, or the email when no username is set.
    pub fn display_name(&self) -> &str {
        if self.username.trim().is_empty() {
            &self.email
        } else {
            &self.username
        }
    }
}

/// Lightweight user listing returned by `/groups/users`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Body returned by login and register.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: User,
}

//=========================================================================================
// Groups
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(alias = "created_by")]
    pub owner_id: i64,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub members: Vec<GroupMember>,
    #[serde(default)]
    pub current_prompt: Option<Prompt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invite_code: Option<String>,
    /// Attached client-side after a refresh; never sent by the groups endpoints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_stats: Option<GroupVideoStats>,
}

/// A membership row, always nested inside a [`Group`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMember {
    pub id: i64,
    pub user_id: i64,
    pub group_id: i64,
    #[serde(with = "timestamp")]
    pub joined_at: DateTime<Utc>,
    // Older backends omit the nested user and role.
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub id: i64,
    pub text: String,
    #[serde(default)]
    pub group_id: Option<i64>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupVideoStats {
    pub group_id: i64,
    pub total_submissions: u32,
    pub unique_submitters: u32,
    pub total_members: u32,
    pub submission_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InviteStatus {
    Pending,
    Accepted,
    Declined,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InviteGroupSummary {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InviteUserSummary {
    pub id: i64,
    pub username: String,
}

/// A pending (or settled) invitation of a user into a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupInvite {
    pub id: i64,
    pub group_id: i64,
    pub invited_username: String,
    pub invited_by: i64,
    pub status: InviteStatus,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub expires_at: Option<DateTime<Utc>>,
    pub group: InviteGroupSummary,
    pub invited_by_user: InviteUserSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InviteUsersResponse {
    pub message: String,
    #[serde(default)]
    pub successful_invites: Vec<String>,
    #[serde(default)]
    pub failed_invites: Vec<String>,
}

//=========================================================================================
// Videos and Compilations
//=========================================================================================

/// One user's uploaded answer to a group's prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSubmission {
    pub id: i64,
    pub user_id: i64,
    pub group_id: i64,
    pub s3_key: String,
    pub duration: f64,
    #[serde(alias = "submitted_at", with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub prompt_id: Option<i64>,
}

/// Lifecycle of a compilation job. Only the server advances it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompilationStatus {
    #[default]
    Processing,
    Completed,
    Failed,
}

impl CompilationStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, CompilationStatus::Processing)
    }
}

impl std::fmt::Display for CompilationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CompilationStatus::Processing => "processing",
            CompilationStatus::Completed => "completed",
            CompilationStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A compiled "weave" video covering one week of a group's submissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyCompilation {
    pub id: i64,
    pub group_id: i64,
    #[serde(with = "timestamp")]
    pub week_start: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub week_end: DateTime<Utc>,
    #[serde(default)]
    pub status: CompilationStatus,
    #[serde(default)]
    pub s3_key: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilationJob {
    pub message: String,
    pub compilation_id: i64,
    pub status: CompilationStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilationStatusReport {
    pub status: CompilationStatus,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicTrack {
    pub id: i64,
    #[serde(alias = "title")]
    pub name: String,
    #[serde(default)]
    pub s3_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadUrl {
    pub download_url: String,
}

//=========================================================================================
// Misc Responses
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

/// Serde helpers for the backend's timestamps.
///
/// The server emits RFC 3339 strings, but naive ISO timestamps without an
/// offset also show up; those are read as UTC.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", raw)))
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(dt) => serializer.serialize_some(&dt.to_rfc3339()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            let raw: Option<String> = Option::deserialize(deserializer)?;
            match raw {
                None => Ok(None),
                Some(raw) => super::parse(&raw)
                    .map(Some)
                    .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", raw))),
            }
        }
    }

    /// Optional timestamps that never fail the enclosing record. Anything
    /// that is not a parseable string is logged and read as `None`.
    pub mod lenient {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};
        use serde_json::Value;
        use tracing::warn;

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            super::option::serialize(value, serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Value::deserialize(deserializer)? {
                Value::Null => Ok(None),
                Value::String(raw) => {
                    let parsed = super::parse(&raw);
                    if parsed.is_none() {
                        warn!("Ignoring unparseable timestamp '{}'", raw);
                    }
                    Ok(parsed)
                }
                other => {
                    warn!("Ignoring non-string timestamp {}", other);
                    Ok(None)
                }
            }
        }
    }
}
