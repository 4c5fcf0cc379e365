//! Bounded retries with exponential backoff and jitter for external service calls.

use std::{future::Future, time::Duration};

use rand::Rng;

use crate::ProviderResult;

#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
	pub max_attempts: u32,
	pub base_backoff: Duration,
	pub max_backoff: Duration,
}
impl From<&agora_config::Retry> for RetryPolicy {
	fn from(cfg: &agora_config::Retry) -> Self {
		Self {
			max_attempts: cfg.max_attempts.max(1),
			base_backoff: Duration::from_millis(cfg.base_backoff_ms),
			max_backoff: Duration::from_millis(cfg.max_backoff_ms),
		}
	}
}

/// Delay before retry number `attempt` (1-based): the base doubled per attempt, capped, plus up
/// to half of that again as jitter.
pub fn backoff_delay<R>(policy: &RetryPolicy, attempt: u32, rng: &mut R) -> Duration
where
	R: Rng,
{
	let exp = attempt.max(1).saturating_sub(1).min(16);
	let capped = policy.base_backoff.saturating_mul(1 << exp).min(policy.max_backoff);
	let jitter_cap = capped.as_millis() as u64 / 2;
	let jitter = if jitter_cap == 0 { 0 } else { rng.gen_range(0..=jitter_cap) };

	capped + Duration::from_millis(jitter)
}

/// Runs `op` until it succeeds, fails with a permanent error, or exhausts `max_attempts`.
pub async fn with_retry<T, F, Fut>(
	policy: &RetryPolicy,
	op_name: &str,
	mut op: F,
) -> ProviderResult<T>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = ProviderResult<T>>,
{
	let mut attempt = 1;

	loop {
		match op().await {
			Ok(value) => return Ok(value),
			Err(err) if err.is_transient() && attempt < policy.max_attempts => {
				let delay = backoff_delay(policy, attempt, &mut rand::thread_rng());

				tracing::warn!(
					op = op_name,
					attempt,
					delay_ms = delay.as_millis() as u64,
					error = %err,
					"Transient provider failure; retrying."
				);
				tokio::time::sleep(delay).await;

				attempt += 1;
			},
			Err(err) => return Err(err),
		}
	}
}
