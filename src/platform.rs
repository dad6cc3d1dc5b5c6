// Uses
use std::{future::Future, sync::Arc, time::Duration};

use serenity::{
	all::{ChannelId, EditMessage, Http, HttpError, MessageId},
	async_trait,
};
use thiserror::Error;
use tokio::time::sleep;
use tracing::warn;

use crate::{
	components::RollPanel,
	constants::{PLATFORM_ATTEMPTS, PLATFORM_RETRY_FALLBACK_SECS},
	db::models::ButtonMessage,
	rate_limiter::RateLimiter,
};

#[derive(Debug, Error)]
pub enum PlatformError {
	#[error("the channel or message no longer exists")]
	NotFound,
	#[error("missing access to the channel or message")]
	Forbidden,
	#[error("rate limited by Discord, retry after {retry_after:?}")]
	RateLimited { retry_after: Duration },
	#[error(transparent)]
	Other(serenity::Error),
}

impl From<serenity::Error> for PlatformError {
	fn from(e: serenity::Error) -> Self {
		if let serenity::Error::Http(HttpError::UnsuccessfulRequest(response)) = &e {
			match response.status_code.as_u16() {
				403 => return Self::Forbidden,
				404 => return Self::NotFound,
				// Serenity's error response doesn't carry Discord's retry_after,
				// so a fixed wait stands in for it
				429 => {
					return Self::RateLimited {
						retry_after: Duration::from_secs(PLATFORM_RETRY_FALLBACK_SECS),
					}
				}
				_ => (),
			}
		}
		Self::Other(e)
	}
}

/// A message that was just fetched from Discord.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRef {
	pub channel_id: ChannelId,
	pub message_id: MessageId,
}

/// What to put on a roll prompt message. Content is left alone when `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageUpdate {
	pub content: Option<String>,
	pub panel: RollPanel,
}

/// The handful of Discord operations the roll prompts need outside of an
/// interaction response.
#[async_trait]
pub trait MessageGateway: Send + Sync {
	async fn resolve_channel(&self, channel_id: ChannelId) -> Result<ChannelId, PlatformError>;

	async fn fetch_message(
		&self,
		channel_id: ChannelId,
		message_id: MessageId,
	) -> Result<MessageRef, PlatformError>;

	async fn edit_message(&self, target: MessageRef, update: MessageUpdate)
		-> Result<(), PlatformError>;
}

/// [`MessageGateway`] over Serenity's HTTP client.
#[derive(Clone)]
pub struct SerenityGateway {
	http: Arc<Http>,
}

impl SerenityGateway {
	pub fn new(http: Arc<Http>) -> Self {
		Self { http }
	}
}

#[async_trait]
impl MessageGateway for SerenityGateway {
	async fn resolve_channel(&self, channel_id: ChannelId) -> Result<ChannelId, PlatformError> {
		let channel = channel_id.to_channel(&self.http).await?;
		Ok(channel.id())
	}

	async fn fetch_message(
		&self,
		channel_id: ChannelId,
		message_id: MessageId,
	) -> Result<MessageRef, PlatformError> {
		let message = channel_id.message(&self.http, message_id).await?;
		Ok(MessageRef {
			channel_id: message.channel_id,
			message_id: message.id,
		})
	}

	async fn edit_message(
		&self,
		target: MessageRef,
		update: MessageUpdate,
	) -> Result<(), PlatformError> {
		let mut builder = EditMessage::new().components(update.panel.components());
		if let Some(content) = update.content {
			builder = builder.content(content);
		}
		target
			.channel_id
			.edit_message(&self.http, target.message_id, builder)
			.await?;
		Ok(())
	}
}

/// Run one outbound call through the rate limiter.
///
/// If Discord itself rate limits the call, wait out `retry_after` and try
/// again, up to [`PLATFORM_ATTEMPTS`] in total. Every other error is returned
/// as-is.
pub async fn throttled<T, F, Fut>(limiter: &RateLimiter, mut call: F) -> Result<T, PlatformError>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T, PlatformError>>,
{
	let mut attempt = 1;
	loop {
		limiter.acquire().await;
		match call().await {
			Err(PlatformError::RateLimited { retry_after }) if attempt < PLATFORM_ATTEMPTS => {
				warn!(
					"Rate limited by Discord. Waiting {:.2} seconds",
					retry_after.as_secs_f32()
				);
				sleep(retry_after).await;
				attempt += 1;
			}
			result => return result,
		}
	}
}

/// Find the stored message again and put a fresh roll panel on it.
pub async fn reattach(
	gateway: &dyn MessageGateway,
	limiter: &RateLimiter,
	location: &ButtonMessage,
	update: MessageUpdate,
) -> Result<MessageRef, PlatformError> {
	// Discord never hands out a zero snowflake, so treat one as a missing message
	if location.channel_id <= 0 || location.message_id <= 0 {
		return Err(PlatformError::NotFound);
	}
	let channel_id = ChannelId::new(location.channel_id as u64);
	let message_id = MessageId::new(location.message_id as u64);

	let channel_id = throttled(limiter, move || gateway.resolve_channel(channel_id)).await?;
	let message = throttled(limiter, move || gateway.fetch_message(channel_id, message_id)).await?;
	let update = &update;
	throttled(limiter, move || gateway.edit_message(message, update.clone())).await?;

	Ok(message)
}

#[cfg(test)]
pub mod testing {
	use std::{
		collections::HashSet,
		sync::{
			atomic::{AtomicU32, Ordering},
			Mutex,
		},
	};

	use super::*;

	/// A gateway double that records edits and fails on request.
	#[derive(Default)]
	pub struct FakeGateway {
		pub missing_channels: HashSet<u64>,
		pub forbidden_messages: HashSet<u64>,
		pub rate_limited_edits: AtomicU32,
		pub edits: Mutex<Vec<(MessageRef, MessageUpdate)>>,
	}

	impl FakeGateway {
		pub fn edits(&self) -> Vec<(MessageRef, MessageUpdate)> {
			self.edits.lock().unwrap().clone()
		}
	}

	#[async_trait]
	impl MessageGateway for FakeGateway {
		async fn resolve_channel(&self, channel_id: ChannelId) -> Result<ChannelId, PlatformError> {
			if self.missing_channels.contains(&channel_id.get()) {
				return Err(PlatformError::NotFound);
			}
			Ok(channel_id)
		}

		async fn fetch_message(
			&self,
			channel_id: ChannelId,
			message_id: MessageId,
		) -> Result<MessageRef, PlatformError> {
			if self.forbidden_messages.contains(&message_id.get()) {
				return Err(PlatformError::Forbidden);
			}
			Ok(MessageRef {
				channel_id,
				message_id,
			})
		}

		async fn edit_message(
			&self,
			target: MessageRef,
			update: MessageUpdate,
		) -> Result<(), PlatformError> {
			let pending = self.rate_limited_edits.load(Ordering::SeqCst);
			if pending > 0 {
				self.rate_limited_edits.store(pending - 1, Ordering::SeqCst);
				return Err(PlatformError::RateLimited {
					retry_after: Duration::from_secs(2),
				});
			}
			self.edits.lock().unwrap().push((target, update));
			Ok(())
		}
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::Ordering;

	use tokio::time::Instant;

	use super::{testing::FakeGateway, *};

	fn location(channel_id: i64, message_id: i64) -> ButtonMessage {
		ButtonMessage {
			button_id: "b1".to_owned(),
			channel_id,
			message_id,
		}
	}

	fn update() -> MessageUpdate {
		MessageUpdate {
			content: Some("new content".to_owned()),
			panel: RollPanel::restore("b1"),
		}
	}

	#[tokio::test(start_paused = true)]
	async fn reattach_goes_through_the_limiter() {
		let gateway = FakeGateway::default();
		let limiter = RateLimiter::new(45, Duration::from_secs(1));

		let message = reattach(&gateway, &limiter, &location(10, 20), update())
			.await
			.unwrap();

		assert_eq!(message.message_id, MessageId::new(20));
		assert_eq!(gateway.edits(), vec![(message, update())]);
		// Channel, message and edit
		assert_eq!(limiter.usage_stats().await.total_since_start, 3);
	}

	#[tokio::test(start_paused = true)]
	async fn platform_rate_limit_is_waited_out() {
		let gateway = FakeGateway::default();
		gateway.rate_limited_edits.store(1, Ordering::SeqCst);
		let limiter = RateLimiter::new(45, Duration::from_secs(1));

		let start = Instant::now();
		reattach(&gateway, &limiter, &location(10, 20), update())
			.await
			.unwrap();

		assert!(start.elapsed() >= Duration::from_secs(2));
		assert_eq!(gateway.edits().len(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn persistent_rate_limit_gives_up() {
		let gateway = FakeGateway::default();
		gateway.rate_limited_edits.store(10, Ordering::SeqCst);
		let limiter = RateLimiter::new(45, Duration::from_secs(1));

		let result = reattach(&gateway, &limiter, &location(10, 20), update()).await;

		assert!(matches!(result, Err(PlatformError::RateLimited { .. })));
		assert_eq!(gateway.rate_limited_edits.load(Ordering::SeqCst), 7);
	}

	#[tokio::test]
	async fn not_found_is_not_retried() {
		let gateway = FakeGateway {
			missing_channels: [10].into_iter().collect(),
			..FakeGateway::default()
		};
		let limiter = RateLimiter::new(45, Duration::from_secs(1));

		let result = reattach(&gateway, &limiter, &location(10, 20), update()).await;

		assert!(matches!(result, Err(PlatformError::NotFound)));
		assert_eq!(limiter.usage_stats().await.total_since_start, 1);
		assert!(gateway.edits().is_empty());
	}

	#[tokio::test]
	async fn zero_ids_count_as_missing() {
		let gateway = FakeGateway::default();
		let limiter = RateLimiter::new(45, Duration::from_secs(1));
		let result = reattach(&gateway, &limiter, &location(0, 20), update()).await;
		assert!(matches!(result, Err(PlatformError::NotFound)));
	}
}
