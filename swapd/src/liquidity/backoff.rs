// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

//! Per-target failure back-off, recomputed from the swap history each tick.

use std::time::{Duration, SystemTime};

use crate::client::types::{ExistingSwap, Target};
use crate::liquidity::is_autoloop_label;

/// The earliest time the target may be retried, derived from the most recent
/// failure of any autoloop swap whose target overlaps it. `None` when the
/// target has no failure on record. Successes and in-flight swaps never
/// push the retry time out.
pub(crate) fn retry_at(
	target: &Target, swaps: &[ExistingSwap], backoff: Duration,
) -> Option<SystemTime> {
	let mut last_failure: Option<SystemTime> = None;

	for swap in swaps {
		if !is_autoloop_label(&swap.label) {
			continue;
		}
		if !swap.target.conflicts_with(target) {
			continue;
		}
		if let Some(failed_at) = swap.last_failure() {
			if last_failure.map_or(true, |current| failed_at > current) {
				last_failure = Some(failed_at);
			}
		}
	}

	last_failure.map(|failed_at| failed_at + backoff)
}

pub(crate) fn eligible(
	target: &Target, swaps: &[ExistingSwap], now: SystemTime, backoff: Duration,
) -> bool {
	retry_at(target, swaps, backoff).map_or(true, |at| now >= at)
}
