pub mod engine;

pub use engine::{
    GlobalStats, MeetingStats, MemberRanking, MemberStats, ParticipationTier, PoleStats, Snapshot,
};

use crate::database::attendance::fetch_attendances_since;
use crate::database::error::DbResult;
use crate::database::meetings::{fetch_meeting, fetch_meetings_since};
use crate::database::members::fetch_members;
use crate::database::models::{Attendance, Member, MemberFilter, Pole};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

/// Reads members, meetings dated after the window start and their attendance
/// rows in a single transaction.
pub async fn load_snapshot(
    pool: &SqlitePool,
    window_days: i64,
    now: DateTime<Utc>,
) -> DbResult<Snapshot> {
    let since = engine::window_start(now, window_days);

    let mut tx = pool.begin().await?;
    let members = fetch_members(&mut *tx, &MemberFilter::default()).await?;
    let meetings = fetch_meetings_since(&mut *tx, since).await?;
    let attendances = fetch_attendances_since(&mut *tx, since).await?;
    tx.commit().await?;

    tracing::debug!(
        "Loaded stats snapshot: members={}, meetings={}, attendances={}",
        members.len(),
        meetings.len(),
        attendances.len()
    );

    Ok(Snapshot::new(members, meetings, attendances, now))
}

/// Snapshot holding a single meeting, whatever its date.
async fn load_meeting_snapshot(pool: &SqlitePool, meeting_id: i64) -> DbResult<Option<Snapshot>> {
    let mut tx = pool.begin().await?;

    let Some(meeting) = fetch_meeting(&mut *tx, meeting_id).await? else {
        return Ok(None);
    };
    let members = fetch_members(&mut *tx, &MemberFilter::default()).await?;
    let attendances = sqlx::query_as::<_, Attendance>(
        "SELECT id, meeting_id, member_id, status, timestamp, recorded_by, modified_by, modified_at
         FROM attendances WHERE meeting_id = ? ORDER BY id ASC",
    )
    .bind(meeting_id)
    .fetch_all(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(Some(Snapshot::new(members, vec![meeting], attendances, Utc::now())))
}

pub async fn member_stats(pool: &SqlitePool, member_id: i64, window_days: i64) -> DbResult<MemberStats> {
    let snapshot = load_snapshot(pool, window_days, Utc::now()).await?;
    Ok(snapshot.member_stats(member_id, window_days))
}

pub async fn pole_stats(pool: &SqlitePool, pole: Pole, window_days: i64) -> DbResult<PoleStats> {
    let snapshot = load_snapshot(pool, window_days, Utc::now()).await?;
    Ok(snapshot.pole_stats(pole, window_days))
}

pub async fn global_stats(pool: &SqlitePool, window_days: i64) -> DbResult<GlobalStats> {
    let snapshot = load_snapshot(pool, window_days, Utc::now()).await?;
    Ok(snapshot.global_stats(window_days))
}

/// `None` when the meeting does not exist.
pub async fn meeting_stats(pool: &SqlitePool, meeting_id: i64) -> DbResult<Option<MeetingStats>> {
    let snapshot = load_meeting_snapshot(pool, meeting_id).await?;
    Ok(snapshot.and_then(|snapshot| snapshot.meeting_stats(meeting_id)))
}

/// Active members expected at the meeting, in registry order.
pub async fn expected_audience(pool: &SqlitePool, meeting_id: i64) -> DbResult<Option<Vec<Member>>> {
    let Some(snapshot) = load_meeting_snapshot(pool, meeting_id).await? else {
        return Ok(None);
    };

    Ok(snapshot.meetings.first().map(|meeting| {
        engine::expected_audience(meeting, &snapshot.members)
            .into_iter()
            .cloned()
            .collect()
    }))
}

pub async fn leaderboard(
    pool: &SqlitePool,
    window_days: i64,
    limit: usize,
) -> DbResult<Vec<MemberRanking>> {
    let snapshot = load_snapshot(pool, window_days, Utc::now()).await?;
    let mut rankings = snapshot.leaderboard(window_days);
    rankings.truncate(limit);
    Ok(rankings)
}

pub async fn at_risk_members(pool: &SqlitePool, window_days: i64) -> DbResult<Vec<MemberRanking>> {
    let snapshot = load_snapshot(pool, window_days, Utc::now()).await?;
    Ok(snapshot.at_risk_members(window_days))
}

pub async fn inactive_members(pool: &SqlitePool, since_days: i64) -> DbResult<Vec<Member>> {
    let members = fetch_members(pool, &MemberFilter::default()).await?;
    let snapshot = Snapshot::new(members, Vec::new(), Vec::new(), Utc::now());
    Ok(snapshot.inactive_members(since_days).into_iter().cloned().collect())
}
