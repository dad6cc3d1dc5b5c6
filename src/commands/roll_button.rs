// Uses
use anyhow::Context;
use poise::{command, CreateReply};
use tracing::{info, warn};

use crate::{
	components::RollPanel,
	constants::{PROMPT_SETUP_FAILED, PROMPT_TEXT},
	Error,
	PoiseContext,
};

/// Post a roll button.
///
/// Everyone in the channel gets one roll on it. The results are shown on the
/// message itself.
#[command(slash_command, rename = "rollbutton")]
pub async fn roll_button(ctx: PoiseContext<'_>) -> Result<(), Error> {
	let data = ctx.data();
	let panel = RollPanel::new();

	data.rate_limiter.acquire().await;
	let handle = ctx
		.send(
			CreateReply::default()
				.content(PROMPT_TEXT)
				.components(panel.components()),
		)
		.await
		.with_context(|| "Failed to post the roll prompt")?;

	// Fetching the original response is another request
	data.rate_limiter.acquire().await;
	let saved = match handle.message().await {
		Ok(message) => {
			let channel_id = message.channel_id;
			data.store
				.save_button(
					panel.button_id(),
					channel_id.get() as i64,
					message.id.get() as i64,
				)
				.map(|()| channel_id)
				.with_context(|| format!("Failed to save button {}", panel.button_id()))
		}
		Err(e) => Err(Error::from(e).context("Failed to fetch the posted roll prompt")),
	};

	let channel_id = match saved {
		Ok(channel_id) => channel_id,
		Err(e) => {
			// An unsaved prompt can't take rolls or survive a restart, so take
			// its buttons away
			data.rate_limiter.acquire().await;
			if let Err(edit_error) = handle
				.edit(
					ctx,
					CreateReply::default()
						.content(PROMPT_SETUP_FAILED)
						.components(Vec::new()),
				)
				.await
			{
				warn!(
					"Couldn't withdraw the unsaved button {}: {}",
					panel.button_id(),
					edit_error
				);
			}
			return Err(e);
		}
	};

	info!(
		"{} posted button {} in channel {}",
		ctx.author().id,
		panel.button_id(),
		channel_id
	);

	Ok(())
}
