use crate::database::error::{DbError, DbResult};
use crate::database::meetings::fetch_meeting;
use crate::database::models::{Attendance, AttendanceStatus, Member};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, QueryBuilder, Row, Sqlite, SqlitePool};

macro_rules! select_attendance {
    ($tail:literal) => {
        concat!(
            "SELECT id, meeting_id, member_id, status, timestamp, recorded_by, modified_by, modified_at ",
            "FROM attendances ",
            $tail
        )
    };
}

/// Upserts the status of a member for a meeting.
///
/// `modified_by`/`modified_at` are only stamped when an actor other than the
/// one who first recorded the row changes it.
pub async fn record_attendance(
    pool: &SqlitePool,
    meeting_id: i64,
    member_id: i64,
    status: AttendanceStatus,
    actor: Option<&str>,
) -> DbResult<Attendance> {
    let mut tx = pool.begin().await?;

    if fetch_meeting(&mut *tx, meeting_id).await?.is_none() {
        return Err(DbError::NotFound(format!("meeting #{meeting_id}")));
    }

    let existing = sqlx::query_as::<_, Attendance>(select_attendance!(
        "WHERE meeting_id = ? AND member_id = ?"
    ))
    .bind(meeting_id)
    .bind(member_id)
    .fetch_optional(&mut *tx)
    .await?;

    let now = Utc::now();

    let attendance = match existing {
        None => {
            let result = sqlx::query(
                "INSERT INTO attendances (meeting_id, member_id, status, timestamp, recorded_by)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(meeting_id)
            .bind(member_id)
            .bind(status)
            .bind(now)
            .bind(actor)
            .execute(&mut *tx)
            .await?;

            Attendance {
                id: result.last_insert_rowid(),
                meeting_id,
                member_id,
                status,
                timestamp: now,
                recorded_by: actor.map(str::to_string),
                modified_by: None,
                modified_at: None,
            }
        }
        Some(mut attendance) => {
            attendance.status = status;
            attendance.timestamp = now;

            let is_correction = match (actor, attendance.recorded_by.as_deref()) {
                (Some(actor), Some(recorder)) => actor != recorder,
                (Some(_), None) => true,
                (None, _) => false,
            };
            if is_correction {
                attendance.modified_by = actor.map(str::to_string);
                attendance.modified_at = Some(now);
            }

            sqlx::query(
                "UPDATE attendances SET status = ?, timestamp = ?, modified_by = ?, modified_at = ?
                 WHERE id = ?",
            )
            .bind(attendance.status)
            .bind(attendance.timestamp)
            .bind(&attendance.modified_by)
            .bind(attendance.modified_at)
            .bind(attendance.id)
            .execute(&mut *tx)
            .await?;

            attendance
        }
    };

    tx.commit().await?;

    tracing::info!(
        "Attendance recorded: meeting_id={}, member_id={}, status={}, actor={:?}",
        meeting_id,
        member_id,
        status,
        actor
    );
    Ok(attendance)
}

/// Finalizes the attendance of a meeting.
///
/// Returns `false` for an unknown meeting and `true` without side effects when
/// the meeting is already validated. Otherwise the meeting becomes completed and
/// every member recorded present gets their activity timestamp refreshed.
pub async fn validate_attendance(
    pool: &SqlitePool,
    meeting_id: i64,
    validated_by: &str,
) -> DbResult<bool> {
    let mut tx = pool.begin().await?;

    let Some(meeting) = fetch_meeting(&mut *tx, meeting_id).await? else {
        tracing::warn!("Validation requested for unknown meeting_id={}", meeting_id);
        return Ok(false);
    };

    if meeting.attendance_validated {
        return Ok(true);
    }

    let now = Utc::now();

    sqlx::query(
        "UPDATE meetings
         SET attendance_validated = TRUE, is_completed = TRUE, validated_at = ?, validated_by = ?
         WHERE id = ?",
    )
    .bind(now)
    .bind(validated_by)
    .bind(meeting_id)
    .execute(&mut *tx)
    .await?;

    let touched = sqlx::query(
        "UPDATE members SET last_active = ?1
         WHERE last_active < ?1
           AND id IN (SELECT member_id FROM attendances WHERE meeting_id = ?2 AND status = 'present')",
    )
    .bind(now)
    .bind(meeting_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    tx.commit().await?;

    tracing::info!(
        "Attendance validated: meeting_id={}, validated_by={}, members_touched={}",
        meeting_id,
        validated_by,
        touched
    );
    Ok(true)
}

/// Rows of a meeting joined with their member, by member display name.
/// Rows pointing at removed members are skipped.
pub async fn get_meeting_attendance(
    pool: &SqlitePool,
    meeting_id: i64,
) -> DbResult<Vec<(Attendance, Member)>> {
    let rows = sqlx::query(
        "SELECT a.id AS attendance_id, a.meeting_id, a.member_id, a.status AS attendance_status,
                a.timestamp, a.recorded_by, a.modified_by, a.modified_at,
                m.id, m.discord_id, m.username, m.full_name, m.email, m.pole, m.specialization,
                m.status, m.joined_at, m.last_active
         FROM attendances a
         JOIN members m ON m.id = a.member_id
         WHERE a.meeting_id = ?
         ORDER BY COALESCE(NULLIF(TRIM(m.full_name), ''), m.username) COLLATE NOCASE ASC, m.id ASC",
    )
    .bind(meeting_id)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| -> DbResult<(Attendance, Member)> {
            let attendance = Attendance {
                id: row.try_get("attendance_id")?,
                meeting_id: row.try_get("meeting_id")?,
                member_id: row.try_get("member_id")?,
                status: row.try_get("attendance_status")?,
                timestamp: row.try_get("timestamp")?,
                recorded_by: row.try_get("recorded_by")?,
                modified_by: row.try_get("modified_by")?,
                modified_at: row.try_get("modified_at")?,
            };
            let member = <Member as FromRow<'_, SqliteRow>>::from_row(row)?;
            Ok((attendance, member))
        })
        .collect()
}

/// Rows of one member restricted to the given meetings.
pub async fn get_member_attendance(
    pool: &SqlitePool,
    member_id: i64,
    meeting_ids: &[i64],
) -> DbResult<Vec<Attendance>> {
    if meeting_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(select_attendance!("WHERE member_id = "));
    builder.push_bind(member_id);
    builder.push(" AND meeting_id IN (");
    let mut separated = builder.separated(", ");
    for meeting_id in meeting_ids {
        separated.push_bind(*meeting_id);
    }
    separated.push_unseparated(") ORDER BY meeting_id ASC");

    let attendances = builder
        .build_query_as::<Attendance>()
        .fetch_all(pool)
        .await?;

    Ok(attendances)
}

/// Every row belonging to a meeting dated at or after `since`.
pub(crate) async fn fetch_attendances_since<'e, E>(
    executor: E,
    since: chrono::DateTime<Utc>,
) -> DbResult<Vec<Attendance>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let attendances = sqlx::query_as::<_, Attendance>(
        "SELECT a.id, a.meeting_id, a.member_id, a.status, a.timestamp, a.recorded_by, a.modified_by, a.modified_at
         FROM attendances a
         JOIN meetings mt ON mt.id = a.meeting_id
         WHERE mt.date >= ?
         ORDER BY a.meeting_id ASC, a.id ASC",
    )
    .bind(since)
    .fetch_all(executor)
    .await?;

    Ok(attendances)
}
