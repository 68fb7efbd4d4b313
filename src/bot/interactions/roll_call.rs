//! Roll-call message for a meeting.
//!
//! The view keeps no state of its own: the meeting id, the action and the page
//! travel in each component's `custom_id` and the marks live in the ledger.

use crate::bot::checks::actor_from_member;
use crate::bot::{Data, Error};
use crate::database::attendance::{get_meeting_attendance, record_attendance, validate_attendance};
use crate::database::meetings::get_meeting;
use crate::database::models::{AttendanceStatus, Meeting, Member};
use crate::stats;
use crate::utils::format::{
    create_meeting_stats_embed, format_error_message, pole_label, roles_label, COLOR_BLUE,
};
use crate::utils::time::format_datetime_local;
use chrono::FixedOffset;
use poise::serenity_prelude as serenity;
use sqlx::SqlitePool;
use std::collections::HashMap;

pub const CUSTOM_ID_PREFIX: &str = "rollcall";
/// Discord caps select menus at 25 options.
pub const PAGE_SIZE: usize = 25;
const LABEL_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollCallAction {
    Mark(AttendanceStatus),
    Page,
    Validate,
}

impl RollCallAction {
    fn as_str(&self) -> &'static str {
        match self {
            RollCallAction::Mark(status) => status.as_str(),
            RollCallAction::Page => "page",
            RollCallAction::Validate => "validate",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "page" => Some(RollCallAction::Page),
            "validate" => Some(RollCallAction::Validate),
            other => AttendanceStatus::parse(other).map(RollCallAction::Mark),
        }
    }
}

/// `rollcall:<action>:<meeting_id>:<page>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollCallId {
    pub action: RollCallAction,
    pub meeting_id: i64,
    pub page: usize,
}

impl RollCallId {
    pub fn new(action: RollCallAction, meeting_id: i64, page: usize) -> Self {
        Self {
            action,
            meeting_id,
            page,
        }
    }

    pub fn encode(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            CUSTOM_ID_PREFIX,
            self.action.as_str(),
            self.meeting_id,
            self.page
        )
    }

    pub fn parse(custom_id: &str) -> Option<Self> {
        let mut parts = custom_id.split(':');
        if parts.next()? != CUSTOM_ID_PREFIX {
            return None;
        }
        let action = RollCallAction::parse(parts.next()?)?;
        let meeting_id = parts.next()?.parse().ok()?;
        let page = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(action, meeting_id, page))
    }
}

pub fn page_count(audience: usize) -> usize {
    audience.div_ceil(PAGE_SIZE).max(1)
}

/// Members shown on `page`, clamped to the last page.
pub fn page_slice(members: &[Member], page: usize) -> (usize, &[Member]) {
    let page = page.min(page_count(members.len()) - 1);
    let start = (page * PAGE_SIZE).min(members.len());
    let end = (start + PAGE_SIZE).min(members.len());
    (page, &members[start..end])
}

/// Expected members without any row yet.
pub fn unmarked<'a>(audience: &'a [Member], marks: &HashMap<i64, AttendanceStatus>) -> Vec<&'a Member> {
    audience
        .iter()
        .filter(|member| !marks.contains_key(&member.id))
        .collect()
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct MarkCounts {
    pub present: usize,
    pub absent: usize,
    pub excused: usize,
    pub unmarked: usize,
}

pub fn count_marks(audience: &[Member], marks: &HashMap<i64, AttendanceStatus>) -> MarkCounts {
    let mut counts = MarkCounts::default();
    for member in audience {
        match marks.get(&member.id) {
            Some(AttendanceStatus::Present) => counts.present += 1,
            Some(AttendanceStatus::Absent) => counts.absent += 1,
            Some(AttendanceStatus::Excused) => counts.excused += 1,
            None => counts.unmarked += 1,
        }
    }
    counts
}

fn truncate_label(text: &str) -> String {
    text.chars().take(LABEL_LIMIT).collect()
}

struct RollCallState {
    audience: Vec<Member>,
    marks: HashMap<i64, AttendanceStatus>,
}

async fn load_state(pool: &SqlitePool, meeting_id: i64) -> Result<RollCallState, Error> {
    let audience = stats::expected_audience(pool, meeting_id).await?.unwrap_or_default();
    let marks = get_meeting_attendance(pool, meeting_id)
        .await?
        .into_iter()
        .map(|(attendance, _)| (attendance.member_id, attendance.status))
        .collect();
    Ok(RollCallState { audience, marks })
}

fn status_menu(
    meeting_id: i64,
    page: usize,
    status: AttendanceStatus,
    placeholder: &str,
    members: &[Member],
    marks: &HashMap<i64, AttendanceStatus>,
) -> serenity::CreateSelectMenu {
    let options: Vec<serenity::CreateSelectMenuOption> = members
        .iter()
        .map(|member| {
            serenity::CreateSelectMenuOption::new(
                truncate_label(member.display_name()),
                member.id.to_string(),
            )
            .description(pole_label(member.pole))
            .default_selection(marks.get(&member.id) == Some(&status))
        })
        .collect();
    let max_values = options.len() as u8;

    serenity::CreateSelectMenu::new(
        RollCallId::new(RollCallAction::Mark(status), meeting_id, page).encode(),
        serenity::CreateSelectMenuKind::String { options },
    )
    .placeholder(placeholder)
    .min_values(1)
    .max_values(max_values)
}

/// Embed and components of the roll-call message at `page`.
pub async fn render(
    pool: &SqlitePool,
    meeting: &Meeting,
    page: usize,
    offset: &FixedOffset,
) -> Result<(serenity::CreateEmbed, Vec<serenity::CreateActionRow>), Error> {
    let state = load_state(pool, meeting.id).await?;
    let pages = page_count(state.audience.len());
    let (page, members) = page_slice(&state.audience, page);
    let counts = count_marks(&state.audience, &state.marks);

    let embed = serenity::CreateEmbed::new()
        .title(format!("📋 Appel - {}", meeting.title))
        .description(format!(
            "📅 {}\n👥 Pôles: {}\n\nSélectionnez les membres dans les menus puis validez l'appel.\nLes membres non marqués seront comptés absents.",
            format_datetime_local(meeting.date, offset),
            roles_label(&meeting.target_roles)
        ))
        .color(COLOR_BLUE)
        .field("✅ Présents", counts.present.to_string(), true)
        .field("❌ Absents", counts.absent.to_string(), true)
        .field("🏥 Excusés", counts.excused.to_string(), true)
        .field("⏳ Non marqués", counts.unmarked.to_string(), true)
        .footer(serenity::CreateEmbedFooter::new(format!(
            "Réunion #{} - Page {}/{} - {} membre(s) attendu(s)",
            meeting.id,
            page + 1,
            pages,
            state.audience.len()
        )));

    let mut components = Vec::new();
    if !members.is_empty() {
        for (status, placeholder) in [
            (AttendanceStatus::Present, "✅ Marquer présents"),
            (AttendanceStatus::Absent, "❌ Marquer absents"),
            (AttendanceStatus::Excused, "🏥 Marquer excusés"),
        ] {
            components.push(serenity::CreateActionRow::SelectMenu(status_menu(
                meeting.id,
                page,
                status,
                placeholder,
                members,
                &state.marks,
            )));
        }
    }

    components.push(serenity::CreateActionRow::Buttons(vec![
        serenity::CreateButton::new(
            RollCallId::new(RollCallAction::Page, meeting.id, page.saturating_sub(1)).encode(),
        )
        .label("◀️ Précédent")
        .style(serenity::ButtonStyle::Secondary)
        .disabled(page == 0),
        serenity::CreateButton::new(RollCallId::new(RollCallAction::Page, meeting.id, page + 1).encode())
            .label("Suivant ▶️")
            .style(serenity::ButtonStyle::Secondary)
            .disabled(page + 1 >= pages),
        serenity::CreateButton::new(RollCallId::new(RollCallAction::Validate, meeting.id, page).encode())
            .label("✔️ Valider l'appel")
            .style(serenity::ButtonStyle::Success),
    ]));

    Ok((embed, components))
}

async fn respond_ephemeral(
    ctx: &serenity::Context,
    interaction: &serenity::ComponentInteraction,
    content: String,
) -> Result<(), Error> {
    interaction
        .create_response(
            &ctx.http,
            serenity::CreateInteractionResponse::Message(
                serenity::CreateInteractionResponseMessage::new()
                    .content(content)
                    .ephemeral(true),
            ),
        )
        .await?;
    Ok(())
}

async fn update_message(
    ctx: &serenity::Context,
    interaction: &serenity::ComponentInteraction,
    embed: serenity::CreateEmbed,
    components: Vec<serenity::CreateActionRow>,
) -> Result<(), Error> {
    interaction
        .create_response(
            &ctx.http,
            serenity::CreateInteractionResponse::UpdateMessage(
                serenity::CreateInteractionResponseMessage::new()
                    .embed(embed)
                    .components(components),
            ),
        )
        .await?;
    Ok(())
}

async fn show_summary(
    ctx: &serenity::Context,
    interaction: &serenity::ComponentInteraction,
    data: &Data,
    meeting: &Meeting,
) -> Result<(), Error> {
    let meeting_stats = stats::meeting_stats(&data.pool, meeting.id)
        .await?
        .unwrap_or_default();
    let embed = create_meeting_stats_embed(meeting, &meeting_stats, &data.config.utc_offset)
        .title(format!("✅ Appel validé - {}", meeting.title));
    update_message(ctx, interaction, embed, Vec::new()).await
}

pub async fn handle_component(
    ctx: &serenity::Context,
    interaction: &serenity::ComponentInteraction,
    data: &Data,
) -> Result<(), Error> {
    let Some(id) = RollCallId::parse(&interaction.data.custom_id) else {
        return respond_ephemeral(ctx, interaction, format_error_message("Interaction inconnue")).await;
    };

    let actor = actor_from_member(&ctx.cache, &interaction.user, interaction.member.as_ref());
    if !data.authorizer.is_admin(&actor) {
        return respond_ephemeral(
            ctx,
            interaction,
            format_error_message("Vous devez être administrateur pour faire l'appel."),
        )
        .await;
    }

    let pool = &data.pool;
    let Some(meeting) = get_meeting(pool, id.meeting_id).await? else {
        return respond_ephemeral(ctx, interaction, format_error_message("Réunion introuvable")).await;
    };

    if meeting.attendance_validated {
        return show_summary(ctx, interaction, data, &meeting).await;
    }

    match id.action {
        RollCallAction::Mark(status) => {
            let values = match &interaction.data.kind {
                serenity::ComponentInteractionDataKind::StringSelect { values } => values.clone(),
                _ => Vec::new(),
            };

            for value in &values {
                match value.parse::<i64>() {
                    Ok(member_id) => {
                        record_attendance(
                            pool,
                            meeting.id,
                            member_id,
                            status,
                            Some(actor.user_id.as_str()),
                        )
                        .await?;
                    }
                    Err(_) => tracing::warn!("Ignoring roll-call value {:?}", value),
                }
            }
            tracing::info!(
                "Roll-call of meeting {}: {} member(s) marked {} by {}",
                meeting.id,
                values.len(),
                status,
                actor.user_id
            );

            let (embed, components) = render(pool, &meeting, id.page, &data.config.utc_offset).await?;
            update_message(ctx, interaction, embed, components).await
        }
        RollCallAction::Page => {
            let (embed, components) = render(pool, &meeting, id.page, &data.config.utc_offset).await?;
            update_message(ctx, interaction, embed, components).await
        }
        RollCallAction::Validate => {
            let state = load_state(pool, meeting.id).await?;
            let missing = unmarked(&state.audience, &state.marks);
            for member in &missing {
                record_attendance(
                    pool,
                    meeting.id,
                    member.id,
                    AttendanceStatus::Absent,
                    Some(actor.user_id.as_str()),
                )
                .await?;
            }

            validate_attendance(pool, meeting.id, &actor.user_id).await?;
            tracing::info!(
                "Roll-call of meeting {} validated by {} ({} unmarked recorded absent)",
                meeting.id,
                actor.user_id,
                missing.len()
            );

            show_summary(ctx, interaction, data, &meeting).await
        }
    }
}
