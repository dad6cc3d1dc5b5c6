// Uses
use std::{sync::Arc, time::Duration};

use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::{
	constants::SECONDS_PER_MINUTE,
	db::RollStore,
	rate_limiter::{RateLimiter, UsageStats},
};

// Constants
const RATE_MONITOR_PERIOD: Duration = Duration::from_secs(15);
/// Usage is logged on every this-many monitor ticks, roughly once a minute.
const RATE_MONITOR_REPORT_EVERY: u64 = 4;
const STORE_CHECK_PERIOD: Duration = Duration::from_secs(5 * SECONDS_PER_MINUTE);

/// What one monitor tick should say about limiter usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct UsageAssessment {
	report: bool,
	high: bool,
}

fn assess_usage(stats: UsageStats, tick: u64) -> UsageAssessment {
	if stats.total_since_start == 0 {
		return UsageAssessment::default();
	}
	UsageAssessment {
		report: tick % RATE_MONITOR_REPORT_EVERY == 0,
		// At least 90% of the ceiling
		high: u64::from(stats.current_window_count) * 10 >= u64::from(stats.max_per_window) * 9,
	}
}

/// Start the background health loops. They run for the life of the process.
pub fn spawn_health_loops(limiter: Arc<RateLimiter>, store: Arc<dyn RollStore>) {
	tokio::spawn(monitor_rate_limits(limiter));
	tokio::spawn(check_store(store));
}

async fn monitor_rate_limits(limiter: Arc<RateLimiter>) {
	let mut ticker = interval(RATE_MONITOR_PERIOD);
	ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
	let mut tick = 0_u64;
	loop {
		ticker.tick().await;
		let stats = limiter.usage_stats().await;
		let assessment = assess_usage(stats, tick);
		if assessment.report {
			info!(
				"API usage: {}/{} requests in current window, {} total since startup",
				stats.current_window_count, stats.max_per_window, stats.total_since_start
			);
		}
		if assessment.high {
			warn!(
				"High API usage detected: {}/{} ({:.1}%)",
				stats.current_window_count,
				stats.max_per_window,
				f64::from(stats.current_window_count) / f64::from(stats.max_per_window) * 100.0
			);
		}
		tick = tick.wrapping_add(1);
	}
}

async fn check_store(store: Arc<dyn RollStore>) {
	let mut ticker = interval(STORE_CHECK_PERIOD);
	ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
	loop {
		ticker.tick().await;
		match store.check_connection() {
			Ok(()) => info!("Database connection check: OK"),
			Err(e) => error!("Database connection check failed: {}", e),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn stats(current: u32, max: u32, total: u64) -> UsageStats {
		UsageStats {
			current_window_count: current,
			max_per_window: max,
			total_since_start: total,
		}
	}

	#[test]
	fn idle_limiter_says_nothing() {
		assert_eq!(assess_usage(stats(0, 45, 0), 0), UsageAssessment::default());
	}

	#[test]
	fn usage_is_reported_every_fourth_tick() {
		let reported = (0..8)
			.filter(|tick| assess_usage(stats(1, 45, 10), *tick).report)
			.collect::<Vec<_>>();
		assert_eq!(reported, [0, 4]);
	}

	#[test]
	fn high_usage_starts_at_ninety_percent() {
		assert!(!assess_usage(stats(40, 45, 100), 1).high);
		assert!(assess_usage(stats(41, 45, 100), 1).high);
		assert!(assess_usage(stats(9, 10, 100), 1).high);
		assert!(!assess_usage(stats(8, 10, 100), 1).high);
	}
}
