// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Exponential backoff retry for backing-store operations.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry schedule: `attempts` tries total, delays doubling from
/// `initial` up to `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
	pub initial: Duration,
	pub max: Duration,
	pub attempts: u32,
}

impl Default for Backoff {
	fn default() -> Self {
		Self {
			initial: Duration::from_millis(100),
			max: Duration::from_secs(2),
			attempts: 4,
		}
	}
}

/// Run `operation` until it succeeds or the schedule is exhausted,
/// returning the last error.
pub async fn retry_with_backoff<T, E, F, Fut>(
	name: &str,
	backoff: &Backoff,
	mut operation: F,
) -> Result<T, E>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T, E>>,
	E: std::fmt::Display,
{
	let mut delay = backoff.initial;
	let mut attempt = 0u32;

	loop {
		match operation().await {
			Ok(value) => return Ok(value),
			Err(error) => {
				attempt += 1;
				if attempt >= backoff.attempts.max(1) {
					return Err(error);
				}
				warn!(
					operation = name,
					attempt,
					error = %error,
					retry_in_ms = delay.as_millis() as u64,
					"backing store operation failed, retrying"
				);
				tokio::time::sleep(delay).await;
				delay = (delay * 2).min(backoff.max);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicU32, Ordering};
	use std::sync::Arc;

	fn fast_backoff(attempts: u32) -> Backoff {
		Backoff {
			initial: Duration::from_millis(1),
			max: Duration::from_millis(2),
			attempts,
		}
	}

	#[tokio::test]
	async fn succeeds_first_try_without_sleeping() {
		let result: Result<u32, String> =
			retry_with_backoff("op", &fast_backoff(3), || async { Ok(7) }).await;
		assert_eq!(result.unwrap(), 7);
	}

	#[tokio::test]
	async fn retries_until_success() {
		let calls = Arc::new(AtomicU32::new(0));
		let calls_clone = Arc::clone(&calls);

		let result: Result<u32, String> = retry_with_backoff("op", &fast_backoff(5), move || {
			let calls = Arc::clone(&calls_clone);
			async move {
				if calls.fetch_add(1, Ordering::SeqCst) < 2 {
					Err("transient".to_string())
				} else {
					Ok(42)
				}
			}
		})
		.await;

		assert_eq!(result.unwrap(), 42);
		assert_eq!(calls.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn returns_last_error_on_exhaustion() {
		let calls = Arc::new(AtomicU32::new(0));
		let calls_clone = Arc::clone(&calls);

		let result: Result<u32, String> = retry_with_backoff("op", &fast_backoff(3), move || {
			let calls = Arc::clone(&calls_clone);
			async move {
				calls.fetch_add(1, Ordering::SeqCst);
				Err("down".to_string())
			}
		})
		.await;

		assert_eq!(result.unwrap_err(), "down");
		assert_eq!(calls.load(Ordering::SeqCst), 3);
	}
}
