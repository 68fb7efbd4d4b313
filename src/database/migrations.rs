use anyhow::Result;
use sqlx::SqlitePool;
use tracing::info;

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("Running database migrations...");

    create_members_table(pool).await?;
    create_meetings_table(pool).await?;
    create_attendances_table(pool).await?;

    info!("Database migrations completed successfully");
    Ok(())
}

async fn create_members_table(pool: &SqlitePool) -> Result<()> {
    // AUTOINCREMENT: a deleted member's id is never handed out again.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS members (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            discord_id TEXT UNIQUE NOT NULL,
            username TEXT NOT NULL,
            full_name TEXT,
            email TEXT,
            pole TEXT CHECK (pole IN ('DEV', 'IA', 'INFRA')),
            specialization TEXT,
            status TEXT NOT NULL DEFAULT 'active'
                CHECK (status IN ('active', 'inactive', 'suspended')),
            joined_at DATETIME NOT NULL,
            last_active DATETIME NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_meetings_table(pool: &SqlitePool) -> Result<()> {
    // organizer_id is a plain reference: members are deleted without cascade.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS meetings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            description TEXT,
            date DATETIME NOT NULL,
            created_by TEXT NOT NULL,
            organizer_id INTEGER,
            target_roles TEXT NOT NULL DEFAULT '["ALL"]',
            is_completed BOOLEAN NOT NULL DEFAULT FALSE,
            attendance_validated BOOLEAN NOT NULL DEFAULT FALSE,
            validated_at DATETIME,
            validated_by TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_meetings_date ON meetings (date)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_attendances_table(pool: &SqlitePool) -> Result<()> {
    // No foreign key on member_id: rows of removed members stay as orphans.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS attendances (
            id INTEGER PRIMARY KEY,
            meeting_id INTEGER NOT NULL,
            member_id INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'present'
                CHECK (status IN ('present', 'absent', 'excused')),
            timestamp DATETIME NOT NULL,
            recorded_by TEXT,
            modified_by TEXT,
            modified_at DATETIME,
            FOREIGN KEY (meeting_id) REFERENCES meetings (id) ON DELETE CASCADE,
            UNIQUE (meeting_id, member_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_attendances_member ON attendances (member_id)")
        .execute(pool)
        .await?;

    Ok(())
}
