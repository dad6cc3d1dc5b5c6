// Uses
use tracing::{info, warn};

use crate::{
	components::RollPanel,
	db::{RollStore, StoreError},
	platform::{reattach, MessageGateway, MessageUpdate},
	rate_limiter::RateLimiter,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreSummary {
	pub restored: usize,
	pub skipped: usize,
}

/// Put a live roll panel back on every prompt posted before the restart.
///
/// Prompts whose channel or message can't be reached are skipped with a
/// warning. Only failing to read the stored prompts is an error.
pub async fn restore_panels(
	store: &dyn RollStore,
	gateway: &dyn MessageGateway,
	limiter: &RateLimiter,
) -> Result<RestoreSummary, StoreError> {
	let locations = store.get_button_messages()?;
	info!("Restoring {} roll prompts", locations.len());

	let mut summary = RestoreSummary::default();
	for location in &locations {
		let update = MessageUpdate {
			content: None,
			panel: RollPanel::restore(location.button_id.as_str()),
		};
		match reattach(gateway, limiter, location, update).await {
			Ok(_) => summary.restored += 1,
			Err(e) => {
				warn!(
					"Couldn't restore button {} (channel {}, message {}): {}",
					location.button_id, location.channel_id, location.message_id, e
				);
				summary.skipped += 1;
			}
		}
	}

	info!(
		"Restored {} roll prompts, skipped {}",
		summary.restored, summary.skipped
	);
	Ok(summary)
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use serenity::all::MessageId;

	use super::*;
	use crate::{
		db::{test_pool, DbStore},
		platform::testing::FakeGateway,
	};

	#[tokio::test]
	async fn one_missing_channel_does_not_stop_the_rest() {
		let store = DbStore::new(test_pool());
		store.save_button("first", 10, 100).unwrap();
		store.save_button("second", 20, 200).unwrap();
		store.save_button("third", 30, 300).unwrap();
		let gateway = FakeGateway {
			missing_channels: [20].into_iter().collect(),
			..FakeGateway::default()
		};
		let limiter = RateLimiter::new(45, Duration::from_secs(1));

		let summary = restore_panels(&store, &gateway, &limiter).await.unwrap();

		assert_eq!(
			summary,
			RestoreSummary {
				restored: 2,
				skipped: 1
			}
		);
		let mut edited = gateway
			.edits()
			.into_iter()
			.map(|(target, update)| (target.message_id, update.panel.button_id().to_owned()))
			.collect::<Vec<_>>();
		edited.sort();
		assert_eq!(
			edited,
			[
				(MessageId::new(100), "first".to_owned()),
				(MessageId::new(300), "third".to_owned())
			]
		);
	}

	#[tokio::test]
	async fn restore_leaves_the_content_alone() {
		let store = DbStore::new(test_pool());
		store.save_button("only", 10, 100).unwrap();
		store.save_roll("only", 1, "Ada", 55).unwrap();
		let gateway = FakeGateway::default();
		let limiter = RateLimiter::new(45, Duration::from_secs(1));

		restore_panels(&store, &gateway, &limiter).await.unwrap();

		let edits = gateway.edits();
		assert_eq!(edits.len(), 1);
		assert_eq!(edits[0].1.content, None);
		assert_eq!(edits[0].1.panel, RollPanel::restore("only"));
	}

	#[tokio::test]
	async fn nothing_stored_nothing_restored() {
		let store = DbStore::new(test_pool());
		let gateway = FakeGateway::default();
		let limiter = RateLimiter::new(45, Duration::from_secs(1));

		let summary = restore_panels(&store, &gateway, &limiter).await.unwrap();

		assert_eq!(summary, RestoreSummary::default());
		assert_eq!(limiter.usage_stats().await.total_since_start, 0);
	}
}
