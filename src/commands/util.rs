// Uses
use poise::{builtins::HelpConfiguration, command};
use serenity::all::{CreateEmbed, CreateEmbedFooter};

use crate::{
	constants::PROGRAM_VERSION,
	util::reply_embed,
	Error,
	PoiseContext,
};

/// Information about available commands.
#[command(slash_command)]
pub async fn help(
	ctx: PoiseContext<'_>,
	#[description = "A specific command to show help about."] command: Option<String>,
) -> Result<(), Error> {
	ctx.data().rate_limiter.acquire().await;
	poise::builtins::help(
		ctx,
		command.as_deref(),
		HelpConfiguration {
			extra_text_at_bottom: "Post a prompt with /rollbutton, then everyone gets one roll.",
			ephemeral: true,
			..HelpConfiguration::default()
		},
	)
	.await?;
	Ok(())
}

/// Check that the bot is up, and how busy it is.
#[command(slash_command)]
pub async fn ping(ctx: PoiseContext<'_>) -> Result<(), Error> {
	let usage = ctx.data().rate_limiter.usage_stats().await;
	reply_embed(
		ctx,
		CreateEmbed::new()
			.description("Pong!")
			.field(
				"Current Window",
				format!("{}/{}", usage.current_window_count, usage.max_per_window),
				true,
			)
			.field("Since Startup", usage.total_since_start.to_string(), true)
			.footer(CreateEmbedFooter::new(format!("v{}", PROGRAM_VERSION))),
	)
	.await
}
