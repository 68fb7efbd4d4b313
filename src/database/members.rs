use crate::database::error::{DbError, DbResult};
use crate::database::models::{Member, MemberFilter, MemberUpdate, NewMember};
use chrono::Utc;
use sqlx::{Sqlite, SqlitePool};

macro_rules! select_member {
    ($tail:literal) => {
        concat!(
            "SELECT id, discord_id, username, full_name, email, pole, specialization, ",
            "status, joined_at, last_active FROM members ",
            $tail
        )
    };
}

// Registry listing order: display name, then insertion order for ties.
macro_rules! order_by_name {
    () => {
        "ORDER BY COALESCE(NULLIF(TRIM(full_name), ''), username) COLLATE NOCASE ASC, id ASC"
    };
}

pub async fn get_member(pool: &SqlitePool, discord_id: &str) -> DbResult<Option<Member>> {
    let member = sqlx::query_as::<_, Member>(select_member!("WHERE discord_id = ?"))
        .bind(discord_id)
        .fetch_optional(pool)
        .await?;

    Ok(member)
}

pub async fn get_member_by_id(pool: &SqlitePool, member_id: i64) -> DbResult<Option<Member>> {
    let member = sqlx::query_as::<_, Member>(select_member!("WHERE id = ?"))
        .bind(member_id)
        .fetch_optional(pool)
        .await?;

    Ok(member)
}

pub async fn add_member(pool: &SqlitePool, new_member: NewMember) -> DbResult<Member> {
    let now = Utc::now();

    let result = sqlx::query(
        "INSERT INTO members (discord_id, username, full_name, email, pole, specialization, status, joined_at, last_active)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&new_member.discord_id)
    .bind(&new_member.username)
    .bind(&new_member.full_name)
    .bind(&new_member.email)
    .bind(new_member.pole)
    .bind(&new_member.specialization)
    .bind(new_member.status)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await;

    let result = match result {
        Ok(result) => result,
        Err(e) if DbError::is_unique_violation(&e) => {
            return Err(DbError::DuplicateMember(new_member.discord_id));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(
        "Member registered: discord_id={}, pole={:?}",
        new_member.discord_id,
        new_member.pole
    );

    Ok(Member {
        id: result.last_insert_rowid(),
        discord_id: new_member.discord_id,
        username: new_member.username,
        full_name: new_member.full_name,
        email: new_member.email,
        pole: new_member.pole,
        specialization: new_member.specialization,
        status: new_member.status,
        joined_at: now,
        last_active: now,
    })
}

/// Merges the given fields into the member. Returns `None` when the member is unknown.
pub async fn update_member(
    pool: &SqlitePool,
    discord_id: &str,
    update: MemberUpdate,
) -> DbResult<Option<Member>> {
    let mut tx = pool.begin().await?;

    let current = sqlx::query_as::<_, Member>(select_member!("WHERE discord_id = ?"))
        .bind(discord_id)
        .fetch_optional(&mut *tx)
        .await?;

    let Some(mut member) = current else {
        return Ok(None);
    };

    if update.is_empty() {
        return Ok(Some(member));
    }

    let now = Utc::now();
    member.last_active = match update.last_active {
        Some(explicit) => explicit,
        None => member.last_active.max(now),
    };
    if let Some(username) = update.username {
        member.username = username;
    }
    if let Some(full_name) = update.full_name {
        member.full_name = Some(full_name);
    }
    if let Some(email) = update.email {
        member.email = Some(email);
    }
    if let Some(pole) = update.pole {
        member.pole = Some(pole);
    }
    if let Some(specialization) = update.specialization {
        member.specialization = Some(specialization);
    }
    if let Some(status) = update.status {
        member.status = status;
    }

    sqlx::query(
        "UPDATE members
         SET username = ?, full_name = ?, email = ?, pole = ?, specialization = ?, status = ?, last_active = ?
         WHERE id = ?",
    )
    .bind(&member.username)
    .bind(&member.full_name)
    .bind(&member.email)
    .bind(member.pole)
    .bind(&member.specialization)
    .bind(member.status)
    .bind(member.last_active)
    .bind(member.id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!("Member updated: discord_id={}", discord_id);
    Ok(Some(member))
}

/// Permanent removal. Attendance rows of the member are left in place.
pub async fn delete_member(pool: &SqlitePool, discord_id: &str) -> DbResult<bool> {
    let result = sqlx::query("DELETE FROM members WHERE discord_id = ?")
        .bind(discord_id)
        .execute(pool)
        .await?;

    let deleted = result.rows_affected() > 0;
    if deleted {
        tracing::info!("Member deleted: discord_id={}", discord_id);
    }
    Ok(deleted)
}

pub async fn list_members(pool: &SqlitePool, filter: &MemberFilter) -> DbResult<Vec<Member>> {
    fetch_members(pool, filter).await
}

pub(crate) async fn fetch_members<'e, E>(executor: E, filter: &MemberFilter) -> DbResult<Vec<Member>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let members = sqlx::query_as::<_, Member>(concat!(
        select_member!("WHERE (?1 IS NULL OR status = ?1) AND (?2 IS NULL OR pole = ?2) "),
        order_by_name!()
    ))
    .bind(filter.status)
    .bind(filter.pole)
    .fetch_all(executor)
    .await?;

    Ok(members)
}

/// Case-insensitive match on full name, username or email.
pub async fn search_members(pool: &SqlitePool, query: &str) -> DbResult<Vec<Member>> {
    let needle = query.trim().to_lowercase();
    let members = fetch_members(pool, &MemberFilter::default()).await?;

    Ok(members
        .into_iter()
        .filter(|member| {
            member.username.to_lowercase().contains(&needle)
                || member
                    .full_name
                    .as_deref()
                    .is_some_and(|name| name.to_lowercase().contains(&needle))
                || member
                    .email
                    .as_deref()
                    .is_some_and(|email| email.to_lowercase().contains(&needle))
        })
        .collect())
}
