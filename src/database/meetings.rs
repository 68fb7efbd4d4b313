use crate::database::error::{DbError, DbResult};
use crate::database::models::{Meeting, MeetingRef, MeetingUpdate, NewMeeting, Pole, TargetRoles};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool};

macro_rules! select_meeting {
    ($tail:literal) => {
        concat!(
            "SELECT id, title, description, date, created_by, organizer_id, target_roles, ",
            "is_completed, attendance_validated, validated_at, validated_by FROM meetings ",
            $tail
        )
    };
}

pub(crate) fn meeting_from_row(row: &SqliteRow) -> DbResult<Meeting> {
    let target_roles: Option<String> = row.try_get("target_roles")?;

    Ok(Meeting {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        date: row.try_get("date")?,
        created_by: row.try_get("created_by")?,
        organizer_id: row.try_get("organizer_id")?,
        target_roles: TargetRoles::from_json(target_roles.as_deref()),
        is_completed: row.try_get("is_completed")?,
        attendance_validated: row.try_get("attendance_validated")?,
        validated_at: row.try_get("validated_at")?,
        validated_by: row.try_get("validated_by")?,
    })
}

fn meetings_from_rows(rows: Vec<SqliteRow>) -> DbResult<Vec<Meeting>> {
    rows.iter().map(meeting_from_row).collect()
}

pub async fn create_meeting(pool: &SqlitePool, new_meeting: NewMeeting) -> DbResult<Meeting> {
    let target_roles = TargetRoles::parse(&new_meeting.target_roles)?;
    let target_roles_json = target_roles.to_json()?;

    let result = sqlx::query(
        "INSERT INTO meetings (title, description, date, created_by, organizer_id, target_roles)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&new_meeting.title)
    .bind(&new_meeting.description)
    .bind(new_meeting.date)
    .bind(&new_meeting.created_by)
    .bind(new_meeting.organizer_id)
    .bind(&target_roles_json)
    .execute(pool)
    .await?;

    let meeting = Meeting {
        id: result.last_insert_rowid(),
        title: new_meeting.title,
        description: new_meeting.description,
        date: new_meeting.date,
        created_by: new_meeting.created_by,
        organizer_id: new_meeting.organizer_id,
        target_roles,
        is_completed: false,
        attendance_validated: false,
        validated_at: None,
        validated_by: None,
    };

    tracing::info!(
        "Meeting created: id={}, title={:?}, target_roles={}",
        meeting.id,
        meeting.title,
        meeting.target_roles
    );
    Ok(meeting)
}

pub async fn get_meeting(pool: &SqlitePool, meeting_id: i64) -> DbResult<Option<Meeting>> {
    fetch_meeting(pool, meeting_id).await
}

pub(crate) async fn fetch_meeting<'e, E>(executor: E, meeting_id: i64) -> DbResult<Option<Meeting>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(select_meeting!("WHERE id = ?"))
        .bind(meeting_id)
        .fetch_optional(executor)
        .await?;

    row.as_ref().map(meeting_from_row).transpose()
}

/// Incomplete meetings whose title contains `name`, case-insensitively, by date.
///
/// Completed meetings are only reachable by id.
pub async fn search_meetings_by_name(pool: &SqlitePool, name: &str) -> DbResult<Vec<Meeting>> {
    search_open_by_name(pool, name).await
}

async fn search_open_by_name<'e, E>(executor: E, name: &str) -> DbResult<Vec<Meeting>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let needle = name.trim().to_lowercase();

    let rows = sqlx::query(select_meeting!("WHERE is_completed = FALSE ORDER BY date ASC, id ASC"))
        .fetch_all(executor)
        .await?;

    Ok(meetings_from_rows(rows)?
        .into_iter()
        .filter(|meeting| meeting.title.to_lowercase().contains(&needle))
        .collect())
}

/// Resolves a reference to a single meeting id inside the given transaction.
async fn resolve_ref(
    conn: &mut sqlx::SqliteConnection,
    meeting_ref: &MeetingRef,
) -> DbResult<Option<i64>> {
    match meeting_ref {
        MeetingRef::Id(id) => Ok(fetch_meeting(&mut *conn, *id).await?.map(|meeting| meeting.id)),
        MeetingRef::Name(name) => {
            let matches = search_open_by_name(&mut *conn, name).await?;
            match matches.as_slice() {
                [] => Ok(None),
                [meeting] => Ok(Some(meeting.id)),
                several => Err(DbError::AmbiguousMeeting {
                    candidates: several.iter().map(|meeting| meeting.id).collect(),
                }),
            }
        }
    }
}

pub async fn update_meeting(
    pool: &SqlitePool,
    meeting_ref: &MeetingRef,
    update: MeetingUpdate,
) -> DbResult<bool> {
    let mut tx = pool.begin().await?;

    let Some(meeting_id) = resolve_ref(&mut tx, meeting_ref).await? else {
        return Ok(false);
    };
    let Some(mut meeting) = fetch_meeting(&mut *tx, meeting_id).await? else {
        return Ok(false);
    };

    if update.is_empty() {
        return Ok(true);
    }

    if let Some(title) = update.title {
        meeting.title = title;
    }
    if let Some(description) = update.description {
        meeting.description = Some(description);
    }
    if let Some(date) = update.date {
        meeting.date = date;
    }
    if let Some(organizer_id) = update.organizer_id {
        meeting.organizer_id = Some(organizer_id);
    }
    if let Some(roles) = update.target_roles {
        meeting.target_roles = TargetRoles::parse(&roles)?;
    }

    sqlx::query(
        "UPDATE meetings SET title = ?, description = ?, date = ?, organizer_id = ?, target_roles = ?
         WHERE id = ?",
    )
    .bind(&meeting.title)
    .bind(&meeting.description)
    .bind(meeting.date)
    .bind(meeting.organizer_id)
    .bind(meeting.target_roles.to_json()?)
    .bind(meeting.id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!("Meeting updated: id={}", meeting.id);
    Ok(true)
}

/// Deletes the meeting and, through the foreign key, its attendance rows.
pub async fn delete_meeting(pool: &SqlitePool, meeting_ref: &MeetingRef) -> DbResult<bool> {
    let mut tx = pool.begin().await?;

    let Some(meeting_id) = resolve_ref(&mut tx, meeting_ref).await? else {
        return Ok(false);
    };

    let result = sqlx::query("DELETE FROM meetings WHERE id = ?")
        .bind(meeting_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    let deleted = result.rows_affected() > 0;
    if deleted {
        tracing::info!("Meeting deleted: id={}", meeting_id);
    }
    Ok(deleted)
}

/// Meetings dated at or after `now`, optionally restricted to those a pole attends.
pub async fn list_upcoming_meetings(
    pool: &SqlitePool,
    now: DateTime<Utc>,
    limit: usize,
    pole: Option<Pole>,
) -> DbResult<Vec<Meeting>> {
    let rows = sqlx::query(select_meeting!("WHERE date >= ? ORDER BY date ASC, id ASC"))
        .bind(now)
        .fetch_all(pool)
        .await?;

    Ok(meetings_from_rows(rows)?
        .into_iter()
        .filter(|meeting| pole.is_none() || meeting.target_roles.includes(pole))
        .take(limit)
        .collect())
}

/// Every meeting dated at or after `since`, used to build statistics snapshots.
pub(crate) async fn fetch_meetings_since<'e, E>(executor: E, since: DateTime<Utc>) -> DbResult<Vec<Meeting>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(select_meeting!("WHERE date >= ? ORDER BY date ASC, id ASC"))
        .bind(since)
        .fetch_all(executor)
        .await?;

    meetings_from_rows(rows)
}
