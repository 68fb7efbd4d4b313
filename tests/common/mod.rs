//! Shared setup for the storage-backed tests.
//!
//! Every test gets its own in-memory SQLite database with the schema applied.

#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;

use lcsp_bot::database::{self, attendance, meetings, members};
use lcsp_bot::database::models::{
    AttendanceStatus, Meeting, Member, MemberStatus, NewMeeting, NewMember, Pole,
};

pub const ADMIN_ID: &str = "900000000000000001";

pub async fn setup_pool() -> SqlitePool {
    database::create_in_memory()
        .await
        .expect("Failed to create in-memory database")
}

pub async fn add_member(pool: &SqlitePool, discord_id: &str, name: &str, pole: Option<Pole>) -> Member {
    members::add_member(
        pool,
        NewMember {
            discord_id: discord_id.to_string(),
            username: name.to_lowercase(),
            full_name: Some(name.to_string()),
            pole,
            ..Default::default()
        },
    )
    .await
    .expect("Failed to add member")
}

pub async fn add_member_with_status(
    pool: &SqlitePool,
    discord_id: &str,
    name: &str,
    pole: Option<Pole>,
    status: MemberStatus,
) -> Member {
    members::add_member(
        pool,
        NewMember {
            discord_id: discord_id.to_string(),
            username: name.to_lowercase(),
            full_name: Some(name.to_string()),
            pole,
            status,
            ..Default::default()
        },
    )
    .await
    .expect("Failed to add member")
}

/// Adds `count` active members of `pole` with discord ids `<prefix>-<n>`.
pub async fn add_members(pool: &SqlitePool, prefix: &str, count: usize, pole: Pole) -> Vec<Member> {
    let mut added = Vec::with_capacity(count);
    for n in 0..count {
        added.push(add_member(pool, &format!("{prefix}-{n}"), &format!("{prefix} {n:02}"), Some(pole)).await);
    }
    added
}

pub async fn add_meeting_at(pool: &SqlitePool, title: &str, date: DateTime<Utc>, roles: &[&str]) -> Meeting {
    meetings::create_meeting(
        pool,
        NewMeeting {
            title: title.to_string(),
            date,
            description: None,
            created_by: ADMIN_ID.to_string(),
            organizer_id: None,
            target_roles: roles.iter().map(|role| role.to_string()).collect(),
        },
    )
    .await
    .expect("Failed to create meeting")
}

pub async fn add_past_meeting(pool: &SqlitePool, title: &str, days_ago: i64, roles: &[&str]) -> Meeting {
    add_meeting_at(pool, title, Utc::now() - Duration::days(days_ago), roles).await
}

pub async fn add_future_meeting(pool: &SqlitePool, title: &str, days_ahead: i64, roles: &[&str]) -> Meeting {
    add_meeting_at(pool, title, Utc::now() + Duration::days(days_ahead), roles).await
}

pub async fn mark(pool: &SqlitePool, meeting: &Meeting, member: &Member, status: AttendanceStatus) {
    attendance::record_attendance(pool, meeting.id, member.id, status, Some(ADMIN_ID))
        .await
        .expect("Failed to record attendance");
}

pub async fn validate(pool: &SqlitePool, meeting: &Meeting) {
    let validated = attendance::validate_attendance(pool, meeting.id, ADMIN_ID)
        .await
        .expect("Failed to validate attendance");
    assert!(validated);
}
