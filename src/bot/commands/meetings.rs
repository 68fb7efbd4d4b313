use crate::bot::checks::admin_check;
use crate::bot::commands::{load_candidates, reply_ambiguous, reply_embed, reply_error, PoleChoice};
use crate::bot::{Context, Error};
use crate::database::meetings;
use crate::database::members::get_member;
use crate::database::models::{MeetingRef, MeetingUpdate, NewMeeting, Pole};
use crate::database::DbError;
use crate::utils::format::{create_info_embed, create_meeting_embed, create_meetings_embed, create_success_embed};
use crate::utils::time::parse_local_datetime;
use crate::utils::validation::{pole_names, validate_future_date};
use chrono::Utc;

const DEFAULT_LIST_LIMIT: u32 = 10;
const MAX_LIST_LIMIT: u32 = 25;

fn split_roles(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|role| role.trim().to_string())
        .filter(|role| !role.is_empty())
        .collect()
}

fn invalid_roles_message(role: &str) -> String {
    format!("Rôle invalide: {}\nRôles valides: ALL, {}", role, pole_names())
}

/// Créer une nouvelle réunion
#[poise::command(slash_command, check = "admin_check")]
pub async fn meeting_create(
    ctx: Context<'_>,
    #[description = "Titre de la réunion"] titre: String,
    #[description = "Date (JJ/MM/AAAA)"] date: String,
    #[description = "Heure (HH:MM)"] heure: String,
    #[description = "Description"] description: Option<String>,
    #[description = "Pôles concernés: ALL ou DEV,IA,INFRA"] roles: Option<String>,
) -> Result<(), Error> {
    let pool = &ctx.data().pool;
    let offset = ctx.data().config.utc_offset;

    let meeting_date = match parse_local_datetime(&date, &heure, &offset) {
        Ok(meeting_date) => meeting_date,
        Err(e) => return reply_error(ctx, &e.to_string()).await,
    };
    if let Err(e) = validate_future_date(meeting_date, Utc::now()) {
        return reply_error(ctx, &e.to_string()).await;
    }

    let author_id = ctx.author().id.to_string();
    let organizer_id = get_member(pool, &author_id).await?.map(|member| member.id);

    let new_meeting = NewMeeting {
        title: titre,
        date: meeting_date,
        description,
        created_by: author_id,
        organizer_id,
        target_roles: split_roles(roles.as_deref().unwrap_or("ALL")),
    };

    match meetings::create_meeting(pool, new_meeting).await {
        Ok(meeting) => {
            tracing::info!(
                "Meeting {} '{}' created by {} for {}",
                meeting.id,
                meeting.title,
                ctx.author().name,
                meeting.target_roles
            );
            reply_embed(ctx, create_meeting_embed("✅ Réunion créée", &meeting, &offset)).await
        }
        Err(DbError::InvalidTargetRoles(role)) => reply_error(ctx, &invalid_roles_message(&role)).await,
        Err(e) => Err(e.into()),
    }
}

/// Afficher les prochaines réunions
#[poise::command(slash_command)]
pub async fn meetings(
    ctx: Context<'_>,
    #[description = "Filtrer par pôle"] pole: Option<PoleChoice>,
    #[description = "Nombre maximum de réunions"] limite: Option<u32>,
) -> Result<(), Error> {
    let pole: Option<Pole> = pole.map(Into::into);
    let limit = limite.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT) as usize;

    let upcoming = meetings::list_upcoming_meetings(&ctx.data().pool, Utc::now(), limit, pole).await?;

    let title = match pole {
        Some(pole) => format!("📅 Prochaines réunions - Pôle {}", pole),
        None => "📅 Prochaines réunions".to_string(),
    };

    if upcoming.is_empty() {
        return reply_embed(ctx, create_info_embed(&title, "Aucune réunion prévue")).await;
    }

    reply_embed(
        ctx,
        create_meetings_embed(&title, &upcoming, &ctx.data().config.utc_offset),
    )
    .await
}

#[allow(clippy::too_many_arguments)]
async fn apply_update(
    ctx: Context<'_>,
    meeting_ref: MeetingRef,
    titre: Option<String>,
    date: Option<String>,
    heure: Option<String>,
    description: Option<String>,
    roles: Option<String>,
    id_command: &str,
) -> Result<(), Error> {
    let offset = ctx.data().config.utc_offset;

    let date = match (date, heure) {
        (Some(date), Some(heure)) => match parse_local_datetime(&date, &heure, &offset) {
            Ok(date) => Some(date),
            Err(e) => return reply_error(ctx, &e.to_string()).await,
        },
        (None, None) => None,
        _ => return reply_error(ctx, "Précisez à la fois la date et l'heure").await,
    };

    let update = MeetingUpdate {
        title: titre,
        description,
        date,
        organizer_id: None,
        target_roles: roles.as_deref().map(split_roles),
    };

    if update.is_empty() {
        return reply_error(ctx, "Aucune modification spécifiée").await;
    }

    match meetings::update_meeting(&ctx.data().pool, &meeting_ref, update).await {
        Ok(true) => {
            tracing::info!("Meeting {:?} updated by {}", meeting_ref, ctx.author().name);
            reply_embed(
                ctx,
                create_success_embed("✅ Réunion mise à jour", "Les modifications ont été enregistrées"),
            )
            .await
        }
        Ok(false) => reply_error(ctx, "Réunion introuvable").await,
        Err(DbError::AmbiguousMeeting { candidates }) => {
            let candidates = load_candidates(ctx, &candidates).await?;
            reply_ambiguous(ctx, &candidates, id_command).await
        }
        Err(DbError::InvalidTargetRoles(role)) => reply_error(ctx, &invalid_roles_message(&role)).await,
        Err(e) => Err(e.into()),
    }
}

async fn apply_delete(ctx: Context<'_>, meeting_ref: MeetingRef, id_command: &str) -> Result<(), Error> {
    match meetings::delete_meeting(&ctx.data().pool, &meeting_ref).await {
        Ok(true) => {
            tracing::info!("Meeting {:?} deleted by {}", meeting_ref, ctx.author().name);
            reply_embed(
                ctx,
                create_success_embed("🗑️ Réunion supprimée", "La réunion et ses présences ont été supprimées"),
            )
            .await
        }
        Ok(false) => reply_error(ctx, "Réunion introuvable").await,
        Err(DbError::AmbiguousMeeting { candidates }) => {
            let candidates = load_candidates(ctx, &candidates).await?;
            reply_ambiguous(ctx, &candidates, id_command).await
        }
        Err(e) => Err(e.into()),
    }
}

/// Modifier une réunion (nom partiel)
#[poise::command(slash_command, check = "admin_check")]
pub async fn meeting_update(
    ctx: Context<'_>,
    #[description = "Nom ou partie du nom de la réunion"] reunion: String,
    #[description = "Nouveau titre"] titre: Option<String>,
    #[description = "Nouvelle date (JJ/MM/AAAA)"] date: Option<String>,
    #[description = "Nouvelle heure (HH:MM)"] heure: Option<String>,
    #[description = "Nouvelle description"] description: Option<String>,
    #[description = "Nouveaux pôles: ALL ou DEV,IA,INFRA"] roles: Option<String>,
) -> Result<(), Error> {
    apply_update(
        ctx,
        MeetingRef::Name(reunion),
        titre,
        date,
        heure,
        description,
        roles,
        "meeting_update_id",
    )
    .await
}

/// Modifier une réunion par son ID
#[poise::command(slash_command, check = "admin_check")]
pub async fn meeting_update_id(
    ctx: Context<'_>,
    #[description = "ID de la réunion"] meeting_id: i64,
    #[description = "Nouveau titre"] titre: Option<String>,
    #[description = "Nouvelle date (JJ/MM/AAAA)"] date: Option<String>,
    #[description = "Nouvelle heure (HH:MM)"] heure: Option<String>,
    #[description = "Nouvelle description"] description: Option<String>,
    #[description = "Nouveaux pôles: ALL ou DEV,IA,INFRA"] roles: Option<String>,
) -> Result<(), Error> {
    apply_update(
        ctx,
        MeetingRef::Id(meeting_id),
        titre,
        date,
        heure,
        description,
        roles,
        "meeting_update_id",
    )
    .await
}

/// Supprimer une réunion (nom partiel)
#[poise::command(slash_command, check = "admin_check")]
pub async fn meeting_delete(
    ctx: Context<'_>,
    #[description = "Nom ou partie du nom de la réunion"] reunion: String,
) -> Result<(), Error> {
    apply_delete(ctx, MeetingRef::Name(reunion), "meeting_delete_id").await
}

/// Supprimer une réunion par son ID
#[poise::command(slash_command, check = "admin_check")]
pub async fn meeting_delete_id(
    ctx: Context<'_>,
    #[description = "ID de la réunion"] meeting_id: i64,
) -> Result<(), Error> {
    apply_delete(ctx, MeetingRef::Id(meeting_id), "meeting_delete_id").await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_are_split_on_commas() {
        assert_eq!(split_roles("DEV, ia ,"), vec!["DEV", "ia"]);
        assert!(split_roles(" , ").is_empty());
    }
}
