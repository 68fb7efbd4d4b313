use crate::database::models::{Meeting, Member, Pole, TargetRoles};
use crate::stats::{GlobalStats, MeetingStats, MemberRanking, MemberStats, ParticipationTier, PoleStats};
use crate::utils::time::{format_date_local, format_datetime_local, format_short_local};
use chrono::FixedOffset;
use poise::serenity_prelude as serenity;

pub const COLOR_BLUE: u32 = 0x3498db;
pub const COLOR_GREEN: u32 = 0x2ecc71;
pub const COLOR_RED: u32 = 0xe74c3c;
pub const COLOR_ORANGE: u32 = 0xe67e22;
pub const COLOR_PURPLE: u32 = 0x9b59b6;

const FOOTER: &str = "Laboratoire de Cybersécurité SUPINFO Paris";
// Discord rejects embed field values above 1024 characters.
const FIELD_LIMIT: usize = 1024;
const BAR_WIDTH: usize = 20;
const MEDALS: [&str; 5] = ["🥇", "🥈", "🥉", "4️⃣", "5️⃣"];

pub fn format_error_message(error: &str) -> String {
    format!("❌ {}", error)
}

pub fn format_success_message(message: &str) -> String {
    format!("✅ {}", message)
}

pub fn format_rate(rate: f64) -> String {
    format!("{:.1}%", rate)
}

/// Twenty-cell text gauge, one cell per 5%.
pub fn participation_bar(rate: f64) -> String {
    let filled = ((rate.clamp(0.0, 100.0) / 5.0) as usize).min(BAR_WIDTH);
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

pub fn tier_icon(rate: f64) -> &'static str {
    match ParticipationTier::from_rate(rate) {
        ParticipationTier::Good => "✅",
        ParticipationTier::Fair => "⚠️",
        ParticipationTier::Poor => "❌",
    }
}

pub fn trend_icon(rate: f64) -> &'static str {
    match ParticipationTier::from_rate(rate) {
        ParticipationTier::Good => "📈",
        ParticipationTier::Fair => "📊",
        ParticipationTier::Poor => "📉",
    }
}

pub fn pole_icon(pole: Pole) -> &'static str {
    match pole {
        Pole::Dev => "💻",
        Pole::Ia => "🤖",
        Pole::Infra => "🛠️",
    }
}

fn pole_color(pole: Pole) -> u32 {
    match pole {
        Pole::Dev => COLOR_BLUE,
        Pole::Ia => COLOR_PURPLE,
        Pole::Infra => COLOR_GREEN,
    }
}

pub fn roles_label(roles: &TargetRoles) -> String {
    match roles {
        TargetRoles::All => "Tous".to_string(),
        TargetRoles::Poles(_) => roles.to_string(),
    }
}

pub fn pole_label(pole: Option<Pole>) -> &'static str {
    pole.map(|pole| pole.as_str()).unwrap_or("Non défini")
}

fn medal(index: usize) -> String {
    MEDALS
        .get(index)
        .map(|medal| medal.to_string())
        .unwrap_or_else(|| format!("{}.", index + 1))
}

/// Cuts a field value on a line boundary so it fits in an embed field.
pub fn truncate_field(text: &str) -> String {
    if text.chars().count() <= FIELD_LIMIT {
        return text.to_string();
    }

    let mut out = String::new();
    for line in text.lines() {
        if out.chars().count() + line.chars().count() + 2 > FIELD_LIMIT {
            out.push('…');
            break;
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

pub fn format_top_members(rankings: &[MemberRanking], with_pole: bool) -> String {
    let mut text = String::new();
    for (i, ranking) in rankings.iter().enumerate() {
        if with_pole {
            text.push_str(&format!(
                "{} **{}** ({})\n",
                medal(i),
                ranking.name,
                pole_label(ranking.pole)
            ));
        } else {
            text.push_str(&format!("{} **{}**\n", medal(i), ranking.name));
        }
        text.push_str(&format!(
            "   → {:.0}% ({}/{} réunions)\n",
            ranking.stats.rate, ranking.stats.attended, ranking.stats.total
        ));
    }
    truncate_field(&text)
}

const AT_RISK_SHOWN: usize = 5;

/// Lists the first at-risk members, lowest rate first as given.
pub fn format_at_risk_members(at_risk: &[MemberRanking]) -> String {
    let mut lines: Vec<String> = at_risk
        .iter()
        .take(AT_RISK_SHOWN)
        .map(|ranking| format!("⚠️ **{}** - {:.0}%", ranking.name, ranking.stats.rate))
        .collect();
    if at_risk.len() > AT_RISK_SHOWN {
        lines.push(format!("… et {} autres", at_risk.len() - AT_RISK_SHOWN));
    }
    truncate_field(&lines.join("\n"))
}

pub fn recommendations(global_rate: f64, inactive_count: usize) -> Vec<String> {
    let mut recommendations = vec![match ParticipationTier::from_rate(global_rate) {
        ParticipationTier::Poor => "🔴 Taux de participation critique - Action urgente requise".to_string(),
        ParticipationTier::Fair => "🟡 Taux de participation à améliorer".to_string(),
        ParticipationTier::Good => "🟢 Bon taux de participation - À maintenir".to_string(),
    }];

    if inactive_count > 0 {
        recommendations.push(format!("📧 Contacter les {} membres inactifs", inactive_count));
    }

    recommendations
}

// Embed utility functions
pub fn create_success_embed(title: &str, description: &str) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(title)
        .description(description)
        .color(COLOR_GREEN)
        .timestamp(serenity::Timestamp::now())
}

pub fn create_error_embed(title: &str, description: &str) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(title)
        .description(description)
        .color(COLOR_RED)
        .timestamp(serenity::Timestamp::now())
}

pub fn create_info_embed(title: &str, description: &str) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(title)
        .description(description)
        .color(COLOR_BLUE)
        .timestamp(serenity::Timestamp::now())
}

pub fn create_member_embed(
    member: &Member,
    stats: &MemberStats,
    window_days: i64,
    upcoming: &[Meeting],
    offset: &FixedOffset,
) -> serenity::CreateEmbed {
    let mut embed = serenity::CreateEmbed::new()
        .title("👤 Fiche membre LCSP")
        .color(COLOR_BLUE)
        .field(
            "📋 Identité",
            format!(
                "**Nom:** {}\n**Discord:** <@{}>\n**Username:** {}",
                member.full_name.as_deref().unwrap_or("Non renseigné"),
                member.discord_id,
                member.username
            ),
            false,
        )
        .field(
            "💼 Professionnel",
            format!(
                "**Pôle:** {}\n**Spécialisation:** {}\n**Email:** {}",
                pole_label(member.pole),
                member.specialization.as_deref().unwrap_or("Non renseignée"),
                member.email.as_deref().unwrap_or("Non renseigné")
            ),
            false,
        )
        .field(
            format!("📊 Statistiques ({} derniers jours)", window_days),
            format!(
                "**Statut:** {}\n**Membre depuis:** {}\n**Dernière activité:** {}\n**Présence:** {} ({}/{} réunions)\n**Réunions à venir:** {}",
                member.status.label(),
                format_date_local(member.joined_at, offset),
                format_date_local(member.last_active, offset),
                format_rate(stats.rate),
                stats.attended,
                stats.total,
                stats.upcoming
            ),
            false,
        )
        .footer(serenity::CreateEmbedFooter::new(format!("ID Membre: {}", member.id)));

    if !upcoming.is_empty() {
        let text = upcoming
            .iter()
            .enumerate()
            .map(|(i, meeting)| {
                format!(
                    "{}. **{}**\n   📅 {}",
                    i + 1,
                    meeting.title,
                    format_datetime_local(meeting.date, offset)
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        embed = embed.field("📅 Prochaines réunions", truncate_field(&text), false);
    }

    embed
}

pub fn create_member_list_embed(title: &str, members: &[Member]) -> serenity::CreateEmbed {
    let mut embed = serenity::CreateEmbed::new()
        .title(title)
        .description(format!("{} membre(s)", members.len()))
        .color(COLOR_BLUE)
        .timestamp(serenity::Timestamp::now());

    for pole in Pole::ALL.iter().copied().map(Some).chain(std::iter::once(None)) {
        let lines: Vec<String> = members
            .iter()
            .filter(|member| member.pole == pole)
            .map(|member| format!("• {} ({})", member.display_name(), member.status.label()))
            .collect();
        if lines.is_empty() {
            continue;
        }
        let name = match pole {
            Some(pole) => format!("{} {}", pole_icon(pole), pole),
            None => "❔ Sans pôle".to_string(),
        };
        embed = embed.field(name, truncate_field(&lines.join("\n")), false);
    }

    embed
}

pub fn create_member_search_embed(query: &str, members: &[Member]) -> serenity::CreateEmbed {
    let mut embed = serenity::CreateEmbed::new()
        .title("🔍 Résultats de recherche")
        .description(format!("Recherche: **{}**\n{} résultat(s)", query, members.len()))
        .color(COLOR_BLUE);

    for member in members.iter().take(10) {
        embed = embed.field(
            member.display_name(),
            format!(
                "Discord: <@{}>\nPôle: {}\nStatut: {}",
                member.discord_id,
                pole_label(member.pole),
                member.status.label()
            ),
            true,
        );
    }

    if members.len() > 10 {
        embed = embed.footer(serenity::CreateEmbedFooter::new(format!(
            "... et {} autres résultats",
            members.len() - 10
        )));
    }

    embed
}

pub fn create_meeting_embed(title: &str, meeting: &Meeting, offset: &FixedOffset) -> serenity::CreateEmbed {
    let mut embed = serenity::CreateEmbed::new()
        .title(title)
        .color(COLOR_GREEN)
        .field("📝 Titre", &meeting.title, false)
        .field("📅 Date", format_datetime_local(meeting.date, offset), true)
        .field("👥 Pôles concernés", roles_label(&meeting.target_roles), true)
        .footer(serenity::CreateEmbedFooter::new(format!("Réunion #{}", meeting.id)));

    if let Some(description) = &meeting.description {
        embed = embed.field("📋 Description", description, false);
    }

    embed
}

pub fn create_meetings_embed(title: &str, meetings: &[Meeting], offset: &FixedOffset) -> serenity::CreateEmbed {
    let mut embed = serenity::CreateEmbed::new()
        .title(title)
        .color(COLOR_BLUE)
        .timestamp(serenity::Timestamp::now());

    for meeting in meetings {
        let mut value = format!(
            "📅 {}\n👥 Pôles: {}\n",
            format_datetime_local(meeting.date, offset),
            roles_label(&meeting.target_roles)
        );
        if let Some(description) = &meeting.description {
            let short: String = description.chars().take(100).collect();
            value.push_str(&format!("📝 {}", short));
            if description.chars().count() > 100 {
                value.push_str("...");
            }
        }
        embed = embed.field(format!("#{} - {}", meeting.id, meeting.title), value, false);
    }

    embed
}

/// Lists name matches so the user can retry with an id.
pub fn create_ambiguous_meetings_embed(
    meetings: &[Meeting],
    id_command: &str,
    offset: &FixedOffset,
) -> serenity::CreateEmbed {
    let mut embed = serenity::CreateEmbed::new()
        .title("⚠️ Plusieurs réunions trouvées")
        .description("Veuillez préciser en utilisant l'ID:")
        .color(COLOR_ORANGE)
        .footer(serenity::CreateEmbedFooter::new(format!("Utilisez: /{} [id]", id_command)));

    for meeting in meetings.iter().take(5) {
        embed = embed.field(
            format!("#{} - {}", meeting.id, meeting.title),
            format!(
                "Date: {}\nOrganisateur: <@{}>",
                format_datetime_local(meeting.date, offset),
                meeting.created_by
            ),
            false,
        );
    }

    embed
}

pub fn create_meeting_stats_embed(
    meeting: &Meeting,
    stats: &MeetingStats,
    offset: &FixedOffset,
) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(format!("📊 Statistiques - {}", meeting.title))
        .description(format!(
            "Date: {}\nPôles: {}",
            format_datetime_local(meeting.date, offset),
            roles_label(&meeting.target_roles)
        ))
        .color(COLOR_BLUE)
        .field("✅ Présents", stats.present.to_string(), true)
        .field("❌ Absents", stats.absent.to_string(), true)
        .field("🏥 Excusés", stats.excused.to_string(), true)
        .field("🎯 Attendus", stats.expected.to_string(), true)
        .field("📈 Taux de participation", format_rate(stats.rate), true)
        .timestamp(serenity::Timestamp::now())
}

pub fn create_pole_stats_embed(
    stats: &PoleStats,
    window_days: i64,
    upcoming: &[Meeting],
    offset: &FixedOffset,
) -> serenity::CreateEmbed {
    let mut embed = serenity::CreateEmbed::new()
        .title(format!("{} Statistiques Pôle {}", pole_icon(stats.pole), stats.pole))
        .description(format!("Période: {} derniers jours", window_days))
        .color(pole_color(stats.pole))
        .timestamp(serenity::Timestamp::now())
        .field(
            "📊 Vue d'ensemble",
            format!(
                "**Membres actifs:** {}\n**Réunions complétées:** {}\n**Réunions à venir:** {}\n**Taux de participation moyen:** {}",
                stats.members_count,
                stats.total_meetings,
                stats.upcoming_meetings,
                format_rate(stats.average_member_engagement)
            ),
            false,
        );

    if stats.average_member_engagement > 0.0 {
        embed = embed.field(
            "📈 Taux de participation",
            format!(
                "`{}` {:.0}%",
                participation_bar(stats.average_member_engagement),
                stats.average_member_engagement
            ),
            false,
        );
    }

    if !stats.top_members.is_empty() {
        embed = embed.field(
            "🏆 Top membres du pôle",
            format_top_members(&stats.top_members, false),
            false,
        );
    }

    let lines: Vec<String> = stats
        .members
        .iter()
        .map(|ranking| format!("{} {}", tier_icon(ranking.stats.rate), ranking.name))
        .collect();
    if lines.len() > 10 {
        let mid = lines.len() / 2;
        embed = embed
            .field("👥 Membres (1/2)", truncate_field(&lines[..mid].join("\n")), true)
            .field("👥 Membres (2/2)", truncate_field(&lines[mid..].join("\n")), true);
    } else if !lines.is_empty() {
        embed = embed.field("👥 Tous les membres", lines.join("\n"), false);
    }

    if !upcoming.is_empty() {
        let text = upcoming
            .iter()
            .map(|meeting| format!("📅 **{}**\n   {}", meeting.title, format_short_local(meeting.date, offset)))
            .collect::<Vec<_>>()
            .join("\n");
        embed = embed.field("📅 Prochaines réunions", truncate_field(&text), false);
    }

    embed.footer(serenity::CreateEmbedFooter::new(format!("LCSP - Pôle {}", stats.pole)))
}

pub fn create_global_stats_embed(
    global: &GlobalStats,
    poles: &[PoleStats],
    top: &[MemberRanking],
    at_risk: &[MemberRanking],
    window_days: i64,
) -> serenity::CreateEmbed {
    let mut embed = serenity::CreateEmbed::new()
        .title(format!("📊 Statistiques LCSP - {} derniers jours", window_days))
        .color(COLOR_BLUE)
        .timestamp(serenity::Timestamp::now())
        .field(
            "🏛️ Vue d'ensemble",
            format!(
                "**Membres actifs:** {}\n**Réunions complétées:** {}\n**Réunions à venir:** {}\n**Taux de participation global:** {}",
                global.active_members,
                global.total_meetings,
                global.upcoming_meetings,
                format_rate(global.pooled_attendance_rate)
            ),
            false,
        );

    for stats in poles {
        embed = embed.field(
            format!("{} Pôle {}", pole_icon(stats.pole), stats.pole),
            format!(
                "**Membres:** {}\n**Taux moyen:** {}\n**Complétées:** {}\n**À venir:** {}",
                stats.members_count,
                format_rate(stats.average_member_engagement),
                stats.total_meetings,
                stats.upcoming_meetings
            ),
            true,
        );
    }

    if !top.is_empty() {
        embed = embed.field(
            "🏆 Top 5 - Meilleure assiduité",
            format_top_members(top, true),
            false,
        );
    }

    if !at_risk.is_empty() {
        embed = embed.field("⚠️ Attention requise", format_at_risk_members(at_risk), false);
    }

    embed.footer(serenity::CreateEmbedFooter::new(FOOTER))
}

pub fn create_activity_report_embed(
    global: &GlobalStats,
    poles: &[PoleStats],
    inactive: &[Member],
    inactivity_days: i64,
    window_days: i64,
) -> serenity::CreateEmbed {
    let mut embed = serenity::CreateEmbed::new()
        .title(format!("📋 Rapport d'activité LCSP - {} jours", window_days))
        .color(COLOR_BLUE)
        .timestamp(serenity::Timestamp::now())
        .field(
            "📈 Résumé exécutif",
            format!(
                "**Période analysée:** {} jours\n**Membres actifs:** {}\n**Réunions complétées:** {}\n**Réunions à venir:** {}\n**Taux participation global:** {}",
                window_days,
                global.active_members,
                global.total_meetings,
                global.upcoming_meetings,
                format_rate(global.pooled_attendance_rate)
            ),
            false,
        );

    let poles_analysis = poles
        .iter()
        .filter(|stats| stats.members_count > 0)
        .map(|stats| {
            format!(
                "{} **{}:** {:.0}% ({} membres)",
                trend_icon(stats.average_member_engagement),
                stats.pole,
                stats.average_member_engagement,
                stats.members_count
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    embed = embed.field(
        "🏛️ Performance par pôle",
        if poles_analysis.is_empty() {
            "Aucune donnée".to_string()
        } else {
            poles_analysis
        },
        false,
    );

    if !inactive.is_empty() {
        let text = inactive
            .iter()
            .take(5)
            .map(|member| format!("{} ({})", member.display_name(), pole_label(member.pole)))
            .collect::<Vec<_>>()
            .join("\n");
        embed = embed.field(
            format!("⚠️ Membres inactifs (+{} jours)", inactivity_days),
            text,
            false,
        );
        if inactive.len() > 5 {
            embed = embed.footer(serenity::CreateEmbedFooter::new(format!(
                "... et {} autres membres inactifs",
                inactive.len() - 5
            )));
        }
    }

    embed.field(
        "💡 Recommandations",
        recommendations(global.pooled_attendance_rate, inactive.len()).join("\n"),
        false,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::TargetRoles;

    #[test]
    fn bar_has_one_cell_per_five_percent() {
        assert_eq!(participation_bar(0.0), "░".repeat(20));
        assert_eq!(participation_bar(100.0), "█".repeat(20));
        assert_eq!(participation_bar(62.0), format!("{}{}", "█".repeat(12), "░".repeat(8)));
        assert_eq!(participation_bar(140.0), "█".repeat(20));
    }

    #[test]
    fn icons_follow_tiers() {
        assert_eq!(tier_icon(75.0), "✅");
        assert_eq!(tier_icon(55.0), "⚠️");
        assert_eq!(tier_icon(10.0), "❌");
        assert_eq!(trend_icon(49.9), "📉");
    }

    #[test]
    fn roles_label_reads_all_as_everyone() {
        assert_eq!(roles_label(&TargetRoles::All), "Tous");
        assert_eq!(roles_label(&TargetRoles::parse_list("IA,DEV").unwrap()), "DEV, IA");
    }

    #[test]
    fn zero_rate_renders_as_zero_percent() {
        assert_eq!(format_rate(0.0), "0.0%");
        assert_eq!(format_rate(66.666), "66.7%");
    }

    #[test]
    fn top_members_use_medals_then_numbers() {
        let ranking = |id: i64, rate: f64| MemberRanking {
            member_id: id,
            discord_id: id.to_string(),
            name: format!("M{id}"),
            pole: Some(Pole::Dev),
            stats: MemberStats {
                total: 4,
                attended: 2,
                rate,
                upcoming: 0,
            },
        };
        let rankings: Vec<MemberRanking> = (1..=6).map(|id| ranking(id, 50.0)).collect();

        let text = format_top_members(&rankings, true);
        assert!(text.starts_with("🥇 **M1** (DEV)\n"));
        assert!(text.contains("6. **M6**"));
        assert!(text.contains("→ 50% (2/4 réunions)"));
    }

    #[test]
    fn at_risk_list_stays_within_field_limit() {
        let at_risk: Vec<MemberRanking> = (1..=40)
            .map(|id| MemberRanking {
                member_id: id,
                discord_id: id.to_string(),
                name: format!("Membre avec un nom complet assez long numéro {id}"),
                pole: Some(Pole::Ia),
                stats: MemberStats {
                    total: 10,
                    attended: 3,
                    rate: 30.0,
                    upcoming: 1,
                },
            })
            .collect();

        let text = format_at_risk_members(&at_risk);
        assert!(text.chars().count() <= FIELD_LIMIT);
        assert_eq!(text.lines().count(), AT_RISK_SHOWN + 1);
        assert!(text.ends_with("… et 35 autres"));

        let long_names: Vec<MemberRanking> = at_risk
            .into_iter()
            .map(|mut ranking| {
                ranking.name = "x".repeat(400);
                ranking
            })
            .collect();
        assert!(format_top_members(&long_names, true).chars().count() <= FIELD_LIMIT);
    }

    #[test]
    fn recommendations_depend_on_rate_and_inactivity() {
        assert_eq!(recommendations(80.0, 0), vec!["🟢 Bon taux de participation - À maintenir"]);
        let low = recommendations(30.0, 3);
        assert!(low[0].starts_with("🔴"));
        assert_eq!(low[1], "📧 Contacter les 3 membres inactifs");
    }

    #[test]
    fn long_fields_are_truncated_on_line_boundaries() {
        let text = (0..200).map(|i| format!("ligne {i}")).collect::<Vec<_>>().join("\n");
        let truncated = truncate_field(&text);
        assert!(truncated.chars().count() <= FIELD_LIMIT);
        assert!(truncated.ends_with('…'));
        assert!(truncated.starts_with("ligne 0\n"));
    }
}
