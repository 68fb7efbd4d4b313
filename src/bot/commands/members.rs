use crate::bot::checks::admin_check;
use crate::bot::commands::{reply_embed, reply_error, PoleChoice, StatusChoice};
use crate::bot::{Context, Error};
use crate::database::meetings::list_upcoming_meetings;
use crate::database::members;
use crate::database::models::{MemberFilter, MemberUpdate, NewMember};
use crate::database::DbError;
use crate::stats;
use crate::utils::format::{
    create_info_embed, create_member_embed, create_member_list_embed, create_member_search_embed,
    create_success_embed, pole_label,
};
use chrono::Utc;
use poise::serenity_prelude as serenity;

const NEXT_MEETINGS_SHOWN: usize = 3;

/// Ajouter un nouveau membre au laboratoire
#[poise::command(slash_command, check = "admin_check")]
pub async fn membre_add(
    ctx: Context<'_>,
    #[description = "Membre Discord"] membre: serenity::User,
    #[description = "Pôle du membre"] pole: PoleChoice,
    #[description = "Nom complet"] nom: Option<String>,
    #[description = "Adresse email"] email: Option<String>,
    #[description = "Spécialisation"] specialisation: Option<String>,
) -> Result<(), Error> {
    let new_member = NewMember {
        discord_id: membre.id.to_string(),
        username: membre.name.clone(),
        full_name: nom,
        email,
        pole: Some(pole.into()),
        specialization: specialisation,
        ..Default::default()
    };

    match members::add_member(&ctx.data().pool, new_member).await {
        Ok(member) => {
            tracing::info!(
                "Member {} added by {} (pole={})",
                member.discord_id,
                ctx.author().name,
                pole_label(member.pole)
            );
            let embed = create_success_embed(
                "✅ Membre ajouté",
                &format!(
                    "<@{}> a été ajouté au pôle **{}**",
                    member.discord_id,
                    pole_label(member.pole)
                ),
            );
            reply_embed(ctx, embed).await
        }
        Err(DbError::DuplicateMember(_)) => {
            reply_error(ctx, &format!("{} est déjà enregistré", membre.name)).await
        }
        Err(e) => Err(e.into()),
    }
}

/// Afficher la fiche d'un membre
#[poise::command(slash_command)]
pub async fn membre_info(
    ctx: Context<'_>,
    #[description = "Membre Discord (vous par défaut)"] membre: Option<serenity::User>,
) -> Result<(), Error> {
    let user = membre.as_ref().unwrap_or_else(|| ctx.author());
    let pool = &ctx.data().pool;
    let config = &ctx.data().config;

    let Some(member) = members::get_member(pool, &user.id.to_string()).await? else {
        return reply_error(ctx, "Membre non trouvé dans la base de données").await;
    };

    let member_stats = stats::member_stats(pool, member.id, config.stats_window_days).await?;
    let upcoming: Vec<_> = list_upcoming_meetings(pool, Utc::now(), NEXT_MEETINGS_SHOWN * 4, member.pole)
        .await?
        .into_iter()
        .filter(|meeting| !meeting.is_completed && meeting.target_roles.includes(member.pole))
        .take(NEXT_MEETINGS_SHOWN)
        .collect();

    let embed = create_member_embed(
        &member,
        &member_stats,
        config.stats_window_days,
        &upcoming,
        &config.utc_offset,
    );
    reply_embed(ctx, embed).await
}

/// Mettre à jour les informations d'un membre
#[poise::command(slash_command, check = "admin_check")]
pub async fn membre_update(
    ctx: Context<'_>,
    #[description = "Membre Discord"] membre: serenity::User,
    #[description = "Nouveau nom complet"] nom: Option<String>,
    #[description = "Nouvelle adresse email"] email: Option<String>,
    #[description = "Nouveau pôle"] pole: Option<PoleChoice>,
    #[description = "Nouvelle spécialisation"] specialisation: Option<String>,
    #[description = "Nouveau statut"] statut: Option<StatusChoice>,
) -> Result<(), Error> {
    let update = MemberUpdate {
        full_name: nom,
        email,
        pole: pole.map(Into::into),
        specialization: specialisation,
        status: statut.map(Into::into),
        ..Default::default()
    };

    if update.is_empty() {
        return reply_error(ctx, "Aucune modification spécifiée").await;
    }

    let Some(member) = members::update_member(&ctx.data().pool, &membre.id.to_string(), update).await? else {
        return reply_error(ctx, "Membre non trouvé dans la base de données").await;
    };

    tracing::info!("Member {} updated by {}", member.discord_id, ctx.author().name);
    let embed = create_success_embed(
        "✅ Membre mis à jour",
        &format!(
            "Les informations de <@{}> ont été mises à jour\n**Pôle:** {}\n**Statut:** {}",
            member.discord_id,
            pole_label(member.pole),
            member.status.label()
        ),
    );
    reply_embed(ctx, embed).await
}

/// Supprimer un membre du registre
#[poise::command(slash_command, check = "admin_check")]
pub async fn membre_delete(
    ctx: Context<'_>,
    #[description = "Membre Discord"] membre: serenity::User,
) -> Result<(), Error> {
    if !members::delete_member(&ctx.data().pool, &membre.id.to_string()).await? {
        return reply_error(ctx, "Membre non trouvé dans la base de données").await;
    }

    tracing::info!("Member {} deleted by {}", membre.id, ctx.author().name);
    let embed = create_success_embed(
        "🗑️ Membre supprimé",
        &format!("<@{}> a été retiré du registre", membre.id),
    );
    reply_embed(ctx, embed).await
}

/// Lister les membres du laboratoire
#[poise::command(slash_command)]
pub async fn membre_list(
    ctx: Context<'_>,
    #[description = "Filtrer par pôle"] pole: Option<PoleChoice>,
    #[description = "Filtrer par statut"] statut: Option<StatusChoice>,
) -> Result<(), Error> {
    let filter = MemberFilter {
        status: statut.map(Into::into),
        pole: pole.map(Into::into),
    };
    let members = members::list_members(&ctx.data().pool, &filter).await?;

    if members.is_empty() {
        return reply_embed(ctx, create_info_embed("👥 Membres", "Aucun membre trouvé")).await;
    }

    let title = match filter.pole {
        Some(pole) => format!("👥 Membres du pôle {}", pole),
        None => "👥 Membres du LCSP".to_string(),
    };
    reply_embed(ctx, create_member_list_embed(&title, &members)).await
}

/// Rechercher un membre par nom, pseudo ou email
#[poise::command(slash_command)]
pub async fn membre_search(
    ctx: Context<'_>,
    #[description = "Texte recherché"] recherche: String,
) -> Result<(), Error> {
    let query = recherche.trim();
    if query.is_empty() {
        return reply_error(ctx, "La recherche ne peut pas être vide").await;
    }

    let members = members::search_members(&ctx.data().pool, query).await?;
    if members.is_empty() {
        return reply_error(ctx, &format!("Aucun membre trouvé pour: {}", query)).await;
    }

    reply_embed(ctx, create_member_search_embed(query, &members)).await
}
