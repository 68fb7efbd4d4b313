use crate::auth::Actor;
use crate::bot::{Context, Error};
use poise::serenity_prelude as serenity;

/// Builds the permission view of a guild member. Role names come from the
/// guild cache when it has the guild.
pub fn actor_from_member(
    cache: &serenity::Cache,
    user: &serenity::User,
    member: Option<&serenity::Member>,
) -> Actor {
    let Some(member) = member else {
        return Actor {
            user_id: user.id.to_string(),
            ..Default::default()
        };
    };

    let role_names = cache
        .guild(member.guild_id)
        .map(|guild| {
            member
                .roles
                .iter()
                .filter_map(|role_id| guild.roles.get(role_id).map(|role| role.name.clone()))
                .collect()
        })
        .unwrap_or_default();

    Actor {
        user_id: user.id.to_string(),
        role_ids: member.roles.iter().map(|role_id| role_id.to_string()).collect(),
        role_names,
    }
}

pub async fn admin_check(ctx: Context<'_>) -> Result<bool, Error> {
    let member = ctx.author_member().await;
    let actor = actor_from_member(ctx.cache(), ctx.author(), member.as_deref());
    Ok(ctx.data().authorizer.is_admin(&actor))
}
