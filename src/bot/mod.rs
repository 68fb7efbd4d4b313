pub mod checks;
pub mod commands;
pub mod handlers;
pub mod interactions;

use crate::auth::{Authorizer, RoleAuthorizer};
use crate::config::Config;
use crate::database;
use crate::utils::format::create_error_embed;
use anyhow::Result;
use poise::serenity_prelude as serenity;
use sqlx::SqlitePool;
use std::sync::Arc;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

#[derive(Clone)]
pub struct Data {
    pub pool: SqlitePool,
    pub config: Config,
    pub authorizer: Arc<dyn Authorizer>,
}

pub fn all_commands() -> Vec<poise::Command<Data, Error>> {
    vec![
        commands::members::membre_add(),
        commands::members::membre_info(),
        commands::members::membre_update(),
        commands::members::membre_delete(),
        commands::members::membre_list(),
        commands::members::membre_search(),
        commands::meetings::meeting_create(),
        commands::meetings::meetings(),
        commands::meetings::meeting_update(),
        commands::meetings::meeting_update_id(),
        commands::meetings::meeting_delete(),
        commands::meetings::meeting_delete_id(),
        commands::attendance::appel(),
        commands::attendance::appel_id(),
        commands::attendance::modifier_presence(),
        commands::attendance::modifier_presence_id(),
        commands::stats::meeting_stats(),
        commands::stats::meeting_stats_id(),
        commands::stats::stats(),
        commands::stats::stats_pole(),
        commands::stats::rapport(),
    ]
}

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            tracing::error!("Command /{} failed: {}", ctx.command().name, error);
            let embed = create_error_embed("❌ Erreur", &error.to_string());
            if let Err(e) = ctx
                .send(poise::CreateReply::default().embed(embed).ephemeral(true))
                .await
            {
                tracing::error!("Failed to report command error: {:?}", e);
            }
        }
        poise::FrameworkError::CommandCheckFailed { error, ctx, .. } => {
            if let Some(error) = error {
                tracing::error!("Check for /{} failed: {}", ctx.command().name, error);
            }
            let embed = create_error_embed(
                "❌ Accès refusé",
                "Vous devez être administrateur pour utiliser cette commande.",
            );
            if let Err(e) = ctx
                .send(poise::CreateReply::default().embed(embed).ephemeral(true))
                .await
            {
                tracing::error!("Failed to report refused check: {:?}", e);
            }
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                tracing::error!("Error while handling error: {:?}", e);
            }
        }
    }
}

pub async fn create_bot(config: Config) -> Result<serenity::Client> {
    let pool = database::create_connection(&config.database_url).await?;

    let data = Data {
        pool,
        config: config.clone(),
        authorizer: Arc::new(RoleAuthorizer::new(&config.admin_roles)),
    };

    let intents = serenity::GatewayIntents::non_privileged();
    let guild_id = config.guild_id;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: all_commands(),
            on_error: |error| Box::pin(on_error(error)),
            pre_command: |ctx| {
                Box::pin(async move {
                    tracing::info!("/{} invoked by {}", ctx.command().name, ctx.author().name);
                })
            },
            event_handler: |ctx, event, framework, data| {
                Box::pin(handlers::event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                match guild_id {
                    Some(guild_id) => {
                        poise::builtins::register_in_guild(
                            ctx,
                            &framework.options().commands,
                            serenity::GuildId::new(guild_id),
                        )
                        .await?;
                        tracing::info!("Commands registered in guild {}", guild_id);
                    }
                    None => {
                        poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                        tracing::info!("Commands registered globally");
                    }
                }
                Ok(data)
            })
        })
        .build();

    let client = serenity::ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .await?;

    Ok(client)
}
