// Uses
use anyhow::Context;
use chrono::{NaiveDateTime, TimeZone};
use poise::CreateReply;
use serenity::all::{CreateEmbed, UserId};

use crate::{
	constants::{DISPLAY_TIMEZONE, MAIN_COLOUR, TIME_FORMAT},
	PoiseContext,
};

/// Reply with an embed, throttled like every other outbound call.
pub async fn reply_embed(ctx: PoiseContext<'_>, embed: CreateEmbed) -> Result<(), anyhow::Error> {
	ctx.data().rate_limiter.acquire().await;
	ctx.send(CreateReply::default().embed(embed.colour(MAIN_COLOUR)))
		.await
		.with_context(|| "Failed to send message")?;
	Ok(())
}

/// Render a stored UTC timestamp in the display timezone.
pub fn display_time(timestamp: NaiveDateTime) -> String {
	DISPLAY_TIMEZONE
		.from_utc_datetime(&timestamp)
		.format(TIME_FORMAT)
		.to_string()
}

/// Stored ids are signed; Discord snowflakes fit in 63 bits.
pub fn user_id_to_db(user_id: UserId) -> i64 {
	user_id.get() as i64
}
