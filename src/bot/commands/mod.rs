pub mod attendance;
pub mod meetings;
pub mod members;
pub mod stats;

use crate::bot::{Context, Error};
use crate::database::meetings::{get_meeting, search_meetings_by_name};
use crate::database::models::{AttendanceStatus, Meeting, MeetingRef, MemberStatus, Pole};
use crate::utils::format::{create_ambiguous_meetings_embed, create_error_embed};
use poise::serenity_prelude as serenity;

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum PoleChoice {
    #[name = "DEV"]
    Dev,
    #[name = "IA"]
    Ia,
    #[name = "INFRA"]
    Infra,
}

impl From<PoleChoice> for Pole {
    fn from(choice: PoleChoice) -> Self {
        match choice {
            PoleChoice::Dev => Pole::Dev,
            PoleChoice::Ia => Pole::Ia,
            PoleChoice::Infra => Pole::Infra,
        }
    }
}

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum StatusChoice {
    #[name = "actif"]
    Active,
    #[name = "inactif"]
    Inactive,
    #[name = "suspendu"]
    Suspended,
}

impl From<StatusChoice> for MemberStatus {
    fn from(choice: StatusChoice) -> Self {
        match choice {
            StatusChoice::Active => MemberStatus::Active,
            StatusChoice::Inactive => MemberStatus::Inactive,
            StatusChoice::Suspended => MemberStatus::Suspended,
        }
    }
}

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum PresenceChoice {
    #[name = "present"]
    Present,
    #[name = "absent"]
    Absent,
    #[name = "excused"]
    Excused,
}

impl From<PresenceChoice> for AttendanceStatus {
    fn from(choice: PresenceChoice) -> Self {
        match choice {
            PresenceChoice::Present => AttendanceStatus::Present,
            PresenceChoice::Absent => AttendanceStatus::Absent,
            PresenceChoice::Excused => AttendanceStatus::Excused,
        }
    }
}

pub(crate) async fn reply_embed(ctx: Context<'_>, embed: serenity::CreateEmbed) -> Result<(), Error> {
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

pub(crate) async fn reply_error(ctx: Context<'_>, message: &str) -> Result<(), Error> {
    let embed = create_error_embed("❌ Erreur", message);
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Lists the meetings behind an ambiguous name so the user can retry by id.
pub(crate) async fn reply_ambiguous(
    ctx: Context<'_>,
    meetings: &[Meeting],
    id_command: &str,
) -> Result<(), Error> {
    let embed = create_ambiguous_meetings_embed(meetings, id_command, &ctx.data().config.utc_offset);
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Resolves a meeting reference for a command. Misses and ambiguous names are
/// answered here and yield `None`.
pub(crate) async fn find_meeting(
    ctx: Context<'_>,
    meeting_ref: &MeetingRef,
    id_command: &str,
) -> Result<Option<Meeting>, Error> {
    let pool = &ctx.data().pool;

    match meeting_ref {
        MeetingRef::Id(id) => {
            let meeting = get_meeting(pool, *id).await?;
            if meeting.is_none() {
                reply_error(ctx, &format!("Réunion #{} introuvable", id)).await?;
            }
            Ok(meeting)
        }
        MeetingRef::Name(name) => {
            let mut meetings = search_meetings_by_name(pool, name).await?;
            match meetings.len() {
                0 => {
                    reply_error(ctx, &format!("Aucune réunion trouvée avec le nom '{}'", name)).await?;
                    Ok(None)
                }
                1 => Ok(meetings.pop()),
                _ => {
                    reply_ambiguous(ctx, &meetings, id_command).await?;
                    Ok(None)
                }
            }
        }
    }
}

/// Fetches the candidates of an `AmbiguousMeeting` error for display.
pub(crate) async fn load_candidates(ctx: Context<'_>, candidates: &[i64]) -> Result<Vec<Meeting>, Error> {
    let mut meetings = Vec::with_capacity(candidates.len());
    for id in candidates.iter().take(5) {
        if let Some(meeting) = get_meeting(&ctx.data().pool, *id).await? {
            meetings.push(meeting);
        }
    }
    Ok(meetings)
}
