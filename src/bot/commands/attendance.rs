use crate::bot::checks::admin_check;
use crate::bot::commands::{find_meeting, reply_error, PresenceChoice};
use crate::bot::interactions::roll_call;
use crate::bot::{Context, Error};
use crate::database::attendance::record_attendance;
use crate::database::members::get_member;
use crate::database::models::{AttendanceStatus, MeetingRef};
use crate::utils::format::format_success_message;
use poise::serenity_prelude as serenity;

async fn start_roll_call(ctx: Context<'_>, meeting_ref: MeetingRef) -> Result<(), Error> {
    let Some(meeting) = find_meeting(ctx, &meeting_ref, "appel_id").await? else {
        return Ok(());
    };

    if meeting.attendance_validated {
        return reply_error(
            ctx,
            "L'appel a déjà été validé pour cette réunion. Utilisez /modifier_presence pour corriger une présence.",
        )
        .await;
    }

    let (embed, components) =
        roll_call::render(&ctx.data().pool, &meeting, 0, &ctx.data().config.utc_offset).await?;
    ctx.send(poise::CreateReply::default().embed(embed).components(components))
        .await?;

    tracing::info!("Roll-call of meeting {} opened by {}", meeting.id, ctx.author().name);
    Ok(())
}

async fn amend_presence(
    ctx: Context<'_>,
    meeting_ref: MeetingRef,
    membre: serenity::User,
    statut: PresenceChoice,
) -> Result<(), Error> {
    let Some(meeting) = find_meeting(ctx, &meeting_ref, "modifier_presence_id").await? else {
        return Ok(());
    };

    if !meeting.attendance_validated {
        return reply_error(ctx, "L'appel n'a pas encore été validé pour cette réunion").await;
    }

    let pool = &ctx.data().pool;
    let Some(member) = get_member(pool, &membre.id.to_string()).await? else {
        return reply_error(ctx, "Membre non enregistré").await;
    };

    let status: AttendanceStatus = statut.into();
    let author_id = ctx.author().id.to_string();
    record_attendance(pool, meeting.id, member.id, status, Some(author_id.as_str())).await?;

    tracing::info!(
        "Presence amended by {} for meeting {}: member {} -> {}",
        ctx.author().name,
        meeting.id,
        member.id,
        status
    );
    ctx.send(
        poise::CreateReply::default()
            .content(format_success_message(&format!(
                "Présence modifiée: <@{}> → {}",
                member.discord_id, status
            )))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Faire l'appel d'une réunion (nom partiel)
#[poise::command(slash_command, check = "admin_check")]
pub async fn appel(
    ctx: Context<'_>,
    #[description = "Nom ou partie du nom de la réunion"] reunion: String,
) -> Result<(), Error> {
    start_roll_call(ctx, MeetingRef::Name(reunion)).await
}

/// Faire l'appel d'une réunion par son ID
#[poise::command(slash_command, check = "admin_check")]
pub async fn appel_id(
    ctx: Context<'_>,
    #[description = "ID de la réunion"] meeting_id: i64,
) -> Result<(), Error> {
    start_roll_call(ctx, MeetingRef::Id(meeting_id)).await
}

/// Modifier la présence d'un membre après validation
#[poise::command(slash_command, check = "admin_check")]
pub async fn modifier_presence(
    ctx: Context<'_>,
    #[description = "Nom ou partie du nom de la réunion"] reunion: String,
    #[description = "Membre Discord"] membre: serenity::User,
    #[description = "Nouveau statut"] statut: PresenceChoice,
) -> Result<(), Error> {
    amend_presence(ctx, MeetingRef::Name(reunion), membre, statut).await
}

/// Modifier la présence d'un membre par ID de réunion
#[poise::command(slash_command, check = "admin_check")]
pub async fn modifier_presence_id(
    ctx: Context<'_>,
    #[description = "ID de la réunion"] meeting_id: i64,
    #[description = "Membre Discord"] membre: serenity::User,
    #[description = "Nouveau statut"] statut: PresenceChoice,
) -> Result<(), Error> {
    amend_presence(ctx, MeetingRef::Id(meeting_id), membre, statut).await
}
