// Uses
use poise::{FrameworkContext, FrameworkError};
use serenity::all::{Context as SerenityContext, FullEvent, Interaction, Ready};
use tracing::{error, info, warn};

use crate::{components, DataArc, Error};

/// The event handler for all gateway events the framework passes through.
pub async fn event_handler(
	ctx: &SerenityContext,
	event: &FullEvent,
	_framework: FrameworkContext<'_, DataArc, Error>,
	data: &DataArc,
) -> Result<(), Error> {
	match event {
		FullEvent::Ready { data_about_bot } => on_ready(ctx, data, data_about_bot).await,
		FullEvent::InteractionCreate {
			interaction: Interaction::Component(interaction),
		} => components::handle_interaction(ctx, data, interaction).await,
		_ => (),
	}
	Ok(())
}

/// Log who we are and where we are. Runs on every (re)connect.
async fn on_ready(ctx: &SerenityContext, data: &DataArc, ready: &Ready) {
	info!("{} is connected!", ready.user.name);
	if ready.guilds.is_empty() {
		warn!("No connected guilds.");
		return;
	}
	info!("Connected guilds:");
	for guild in &ready.guilds {
		data.rate_limiter.acquire().await;
		match guild.id.to_partial_guild(&ctx.http).await {
			Ok(guild_data) => info!("{} - {}", guild.id, guild_data.name),
			Err(e) => warn!("{} - unable to fetch the guild: {}", guild.id, e),
		}
	}
}

/// Log every framework error, then let poise report it the usual way.
pub async fn on_error(error: FrameworkError<'_, DataArc, Error>) {
	match &error {
		FrameworkError::Setup { error, .. } => {
			error!("Failed to start the bot: {:#}", error);
		}
		FrameworkError::Command { error, ctx, .. } => {
			error!(
				"Command /{} failed for user {}: {:#}",
				ctx.command().qualified_name,
				ctx.author().id,
				error
			);
		}
		other => warn!("Framework error: {}", other),
	}

	if let Err(e) = poise::builtins::on_error(error).await {
		error!("Error while handling error: {}", e);
	}
}
