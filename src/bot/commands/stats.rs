use crate::bot::commands::{find_meeting, reply_embed, reply_error, PoleChoice};
use crate::bot::{Context, Error};
use crate::database::meetings::list_upcoming_meetings;
use crate::database::models::{MeetingRef, Pole};
use crate::stats::{self, engine::TOP_MEMBERS_LIMIT};
use crate::utils::format::{
    create_activity_report_embed, create_global_stats_embed, create_meeting_stats_embed,
    create_pole_stats_embed,
};
use crate::utils::validation::validate_window_days;
use chrono::Utc;

/// Members without activity for this long are listed in the report.
const INACTIVITY_DAYS: i64 = 14;
const POLE_NEXT_MEETINGS: usize = 5;

/// Window requested by the user, or the configured default.
async fn window_days(ctx: Context<'_>, jours: Option<i64>) -> Result<Option<i64>, Error> {
    match validate_window_days(jours.unwrap_or(ctx.data().config.stats_window_days)) {
        Ok(days) => Ok(Some(days)),
        Err(e) => {
            reply_error(ctx, &e.to_string()).await?;
            Ok(None)
        }
    }
}

async fn show_meeting_stats(ctx: Context<'_>, meeting_ref: MeetingRef) -> Result<(), Error> {
    let Some(meeting) = find_meeting(ctx, &meeting_ref, "meeting_stats_id").await? else {
        return Ok(());
    };

    let Some(meeting_stats) = stats::meeting_stats(&ctx.data().pool, meeting.id).await? else {
        return reply_error(ctx, "Réunion introuvable").await;
    };

    reply_embed(
        ctx,
        create_meeting_stats_embed(&meeting, &meeting_stats, &ctx.data().config.utc_offset),
    )
    .await
}

/// Voir les statistiques d'une réunion (nom partiel)
#[poise::command(slash_command)]
pub async fn meeting_stats(
    ctx: Context<'_>,
    #[description = "Nom ou partie du nom de la réunion"] reunion: String,
) -> Result<(), Error> {
    show_meeting_stats(ctx, MeetingRef::Name(reunion)).await
}

/// Voir les statistiques d'une réunion par son ID
#[poise::command(slash_command)]
pub async fn meeting_stats_id(
    ctx: Context<'_>,
    #[description = "ID de la réunion"] meeting_id: i64,
) -> Result<(), Error> {
    show_meeting_stats(ctx, MeetingRef::Id(meeting_id)).await
}

/// Statistiques générales du laboratoire
#[poise::command(slash_command)]
pub async fn stats(
    ctx: Context<'_>,
    #[description = "Période en jours"] jours: Option<i64>,
) -> Result<(), Error> {
    let Some(days) = window_days(ctx, jours).await? else {
        return Ok(());
    };
    ctx.defer().await?;

    let snapshot = stats::load_snapshot(&ctx.data().pool, days, Utc::now()).await?;
    let global = snapshot.global_stats(days);
    let poles: Vec<_> = Pole::ALL
        .iter()
        .map(|pole| snapshot.pole_stats(*pole, days))
        .collect();
    let mut top = snapshot.leaderboard(days);
    top.truncate(TOP_MEMBERS_LIMIT);
    let at_risk = snapshot.at_risk_members(days);

    reply_embed(ctx, create_global_stats_embed(&global, &poles, &top, &at_risk, days)).await
}

/// Statistiques détaillées d'un pôle
#[poise::command(slash_command)]
pub async fn stats_pole(
    ctx: Context<'_>,
    #[description = "Pôle"] pole: PoleChoice,
    #[description = "Période en jours"] jours: Option<i64>,
) -> Result<(), Error> {
    let Some(days) = window_days(ctx, jours).await? else {
        return Ok(());
    };
    let pole: Pole = pole.into();
    let pool = &ctx.data().pool;

    let pole_stats = stats::pole_stats(pool, pole, days).await?;
    let upcoming = list_upcoming_meetings(pool, Utc::now(), POLE_NEXT_MEETINGS, Some(pole)).await?;

    reply_embed(
        ctx,
        create_pole_stats_embed(&pole_stats, days, &upcoming, &ctx.data().config.utc_offset),
    )
    .await
}

/// Rapport d'activité du laboratoire
#[poise::command(slash_command)]
pub async fn rapport(
    ctx: Context<'_>,
    #[description = "Période en jours"] jours: Option<i64>,
) -> Result<(), Error> {
    let Some(days) = window_days(ctx, jours).await? else {
        return Ok(());
    };
    ctx.defer().await?;

    let snapshot = stats::load_snapshot(&ctx.data().pool, days, Utc::now()).await?;
    let global = snapshot.global_stats(days);
    let poles: Vec<_> = Pole::ALL
        .iter()
        .map(|pole| snapshot.pole_stats(*pole, days))
        .collect();
    let inactive: Vec<_> = snapshot
        .inactive_members(INACTIVITY_DAYS)
        .into_iter()
        .cloned()
        .collect();

    tracing::info!(
        "Activity report over {} days requested by {}",
        days,
        ctx.author().name
    );

    reply_embed(
        ctx,
        create_activity_report_embed(&global, &poles, &inactive, INACTIVITY_DAYS, days),
    )
    .await
}
