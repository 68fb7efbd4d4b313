use crate::bot::interactions::roll_call;
use crate::bot::{Data, Error};
use poise::serenity_prelude as serenity;

pub async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Ready { data_about_bot } => {
            tracing::info!("Bot logged in as {}", data_about_bot.user.name);
        }
        serenity::FullEvent::InteractionCreate {
            interaction: serenity::Interaction::Component(component_interaction),
        } => {
            if component_interaction
                .data
                .custom_id
                .starts_with(roll_call::CUSTOM_ID_PREFIX)
            {
                if let Err(e) = roll_call::handle_component(ctx, component_interaction, data).await {
                    tracing::error!("Error handling roll-call interaction: {:?}", e);
                }
            } else {
                tracing::debug!(
                    "Ignoring component interaction {}",
                    component_interaction.data.custom_id
                );
            }
        }
        _ => {}
    }
    Ok(())
}
