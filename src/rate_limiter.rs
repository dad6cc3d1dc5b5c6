// Uses
use std::time::Duration;

use tokio::{
	sync::Mutex,
	time::{sleep, Instant},
};
use tracing::warn;

/// Process-wide gate on outbound Discord calls: at most `max_operations`
/// per fixed window of `period`.
///
/// One instance is built at startup and shared by everything that talks to
/// Discord. [`RateLimiter::acquire`] never fails, it only delays.
#[derive(Debug)]
pub struct RateLimiter {
	max_operations: u32,
	period: Duration,
	window: Mutex<RateWindow>,
}

#[derive(Debug)]
struct RateWindow {
	count: u32,
	start: Instant,
	total: u64,
}

/// A snapshot of limiter usage for monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageStats {
	pub current_window_count: u32,
	pub max_per_window: u32,
	pub total_since_start: u64,
}

impl RateLimiter {
	pub fn new(max_operations: u32, period: Duration) -> Self {
		Self {
			max_operations,
			period,
			window: Mutex::new(RateWindow {
				count: 0,
				start: Instant::now(),
				total: 0,
			}),
		}
	}

	/// Wait until one more operation fits in the current window, then claim it.
	pub async fn acquire(&self) {
		loop {
			let wait = {
				let mut window = self.window.lock().await;
				let now = Instant::now();
				if now.duration_since(window.start) >= self.period {
					window.count = 0;
					window.start = now;
				}

				if window.count < self.max_operations {
					window.count += 1;
					window.total += 1;
					return;
				}

				self.period.saturating_sub(now.duration_since(window.start))
			};

			// The lock is released here so other work proceeds while we sleep.
			// Re-check afterwards; the sleep may undershoot or others may win.
			warn!(
				"Rate limit throttling. Waiting {:.2} seconds",
				wait.as_secs_f32()
			);
			sleep(wait).await;
		}
	}

	pub async fn usage_stats(&self) -> UsageStats {
		let window = self.window.lock().await;
		UsageStats {
			current_window_count: window.count,
			max_per_window: self.max_operations,
			total_since_start: window.total,
		}
	}
}
