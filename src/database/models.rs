use crate::database::error::{DbError, DbResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum Pole {
    Dev,
    Ia,
    Infra,
}

impl Pole {
    pub const ALL: [Pole; 3] = [Pole::Dev, Pole::Ia, Pole::Infra];

    pub fn as_str(&self) -> &'static str {
        match self {
            Pole::Dev => "DEV",
            Pole::Ia => "IA",
            Pole::Infra => "INFRA",
        }
    }
}

impl fmt::Display for Pole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Pole {
    type Err = DbError;

    fn from_str(s: &str) -> DbResult<Self> {
        match s.trim().to_uppercase().as_str() {
            "DEV" => Ok(Pole::Dev),
            "IA" => Ok(Pole::Ia),
            "INFRA" => Ok(Pole::Infra),
            other => Err(DbError::InvalidTargetRoles(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum MemberStatus {
    #[default]
    Active,
    Inactive,
    Suspended,
}

impl MemberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberStatus::Active => "active",
            MemberStatus::Inactive => "inactive",
            MemberStatus::Suspended => "suspended",
        }
    }

    /// Label shown to server members.
    pub fn label(&self) -> &'static str {
        match self {
            MemberStatus::Active => "actif",
            MemberStatus::Inactive => "inactif",
            MemberStatus::Suspended => "suspendu",
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Member {
    pub id: i64,
    pub discord_id: String,
    pub username: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub pole: Option<Pole>,
    pub specialization: Option<String>,
    pub status: MemberStatus,
    pub joined_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl Member {
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.username)
    }

    pub fn is_active(&self) -> bool {
        self.status == MemberStatus::Active
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewMember {
    pub discord_id: String,
    pub username: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub pole: Option<Pole>,
    pub specialization: Option<String>,
    pub status: MemberStatus,
}

/// Partial update: `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct MemberUpdate {
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub pole: Option<Pole>,
    pub specialization: Option<String>,
    pub status: Option<MemberStatus>,
    /// Explicit edit of the activity timestamp; may move it backwards.
    pub last_active: Option<DateTime<Utc>>,
}

impl MemberUpdate {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.full_name.is_none()
            && self.email.is_none()
            && self.pole.is_none()
            && self.specialization.is_none()
            && self.status.is_none()
            && self.last_active.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemberFilter {
    pub status: Option<MemberStatus>,
    pub pole: Option<Pole>,
}

/// Audience selector of a meeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "Vec<String>", try_from = "Vec<String>")]
pub enum TargetRoles {
    All,
    Poles(BTreeSet<Pole>),
}

impl TargetRoles {
    pub const ALL_SENTINEL: &'static str = "ALL";

    /// Role names are matched case-insensitively; `ALL` anywhere wins.
    pub fn parse<S: AsRef<str>>(roles: &[S]) -> DbResult<Self> {
        let mut poles = BTreeSet::new();
        let mut all = false;

        for role in roles {
            let role = role.as_ref().trim();
            if role.is_empty() {
                continue;
            }
            if role.eq_ignore_ascii_case(Self::ALL_SENTINEL) {
                all = true;
                continue;
            }
            poles.insert(role.parse::<Pole>()?);
        }

        if all {
            Ok(TargetRoles::All)
        } else if poles.is_empty() {
            Err(DbError::InvalidTargetRoles("empty role list".to_string()))
        } else {
            Ok(TargetRoles::Poles(poles))
        }
    }

    /// Parses the comma separated form typed in commands, e.g. `DEV,IA`.
    pub fn parse_list(raw: &str) -> DbResult<Self> {
        let roles: Vec<&str> = raw.split(',').collect();
        Self::parse(&roles)
    }

    /// Whether a member with this pole belongs to the audience.
    pub fn includes(&self, pole: Option<Pole>) -> bool {
        match self {
            TargetRoles::All => true,
            TargetRoles::Poles(poles) => pole.is_some_and(|pole| poles.contains(&pole)),
        }
    }

    pub fn names(&self) -> Vec<String> {
        match self {
            TargetRoles::All => vec![Self::ALL_SENTINEL.to_string()],
            TargetRoles::Poles(poles) => poles.iter().map(|pole| pole.as_str().to_string()).collect(),
        }
    }

    pub fn to_json(&self) -> DbResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Lenient read of the stored column: anything unreadable targets everyone.
    pub fn from_json(raw: Option<&str>) -> Self {
        match raw {
            Some(raw) => match serde_json::from_str::<TargetRoles>(raw) {
                Ok(roles) => roles,
                Err(e) => {
                    tracing::warn!("Unreadable target_roles {:?}, falling back to ALL: {}", raw, e);
                    TargetRoles::All
                }
            },
            None => TargetRoles::All,
        }
    }
}

impl From<TargetRoles> for Vec<String> {
    fn from(roles: TargetRoles) -> Self {
        roles.names()
    }
}

impl TryFrom<Vec<String>> for TargetRoles {
    type Error = DbError;

    fn try_from(roles: Vec<String>) -> DbResult<Self> {
        TargetRoles::parse(&roles)
    }
}

impl fmt::Display for TargetRoles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.names().join(", "))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub created_by: String,
    pub organizer_id: Option<i64>,
    pub target_roles: TargetRoles,
    pub is_completed: bool,
    pub attendance_validated: bool,
    pub validated_at: Option<DateTime<Utc>>,
    pub validated_by: Option<String>,
}

impl Meeting {
    /// Completed and validated: the only meetings statistics count.
    pub fn is_finalized(&self) -> bool {
        self.is_completed && self.attendance_validated
    }
}

#[derive(Debug, Clone)]
pub struct NewMeeting {
    pub title: String,
    pub date: DateTime<Utc>,
    pub description: Option<String>,
    pub created_by: String,
    pub organizer_id: Option<i64>,
    pub target_roles: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MeetingUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub organizer_id: Option<i64>,
    pub target_roles: Option<Vec<String>>,
}

impl MeetingUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.date.is_none()
            && self.organizer_id.is_none()
            && self.target_roles.is_none()
    }
}

/// Meetings can be addressed by id or by a fragment of their title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeetingRef {
    Id(i64),
    Name(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Excused,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Excused => "excused",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "present" | "présent" => Some(AttendanceStatus::Present),
            "absent" => Some(AttendanceStatus::Absent),
            "excused" | "excusé" | "excuse" => Some(AttendanceStatus::Excused),
            _ => None,
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Attendance {
    pub id: i64,
    pub meeting_id: i64,
    pub member_id: i64,
    pub status: AttendanceStatus,
    pub timestamp: DateTime<Utc>,
    pub recorded_by: Option<String>,
    pub modified_by: Option<String>,
    pub modified_at: Option<DateTime<Utc>>,
}
