// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

//! Threshold rules deciding when a target's liquidity needs shifting.

use serde::{Deserialize, Serialize};

use crate::client::types::SwapType;

/// Minimum percentages of capacity that must be available as inbound and
/// outbound liquidity. When a side drops below its threshold, a swap is
/// recommended that restores it to the midpoint of the healthy range.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdRule {
	pub min_incoming_pct: u8,
	pub min_outgoing_pct: u8,
}

impl ThresholdRule {
	pub fn new(min_incoming_pct: u8, min_outgoing_pct: u8) -> Self {
		Self { min_incoming_pct, min_outgoing_pct }
	}

	pub fn validate(&self) -> Result<(), String> {
		if self.min_incoming_pct > 100 {
			return Err(format!(
				"minimum incoming: {}% must be <= 100%",
				self.min_incoming_pct
			));
		}

		if self.min_outgoing_pct > 100 {
			return Err(format!(
				"minimum outgoing: {}% must be <= 100%",
				self.min_outgoing_pct
			));
		}

		let sum = u16::from(self.min_incoming_pct) + u16::from(self.min_outgoing_pct);
		if sum > 100 {
			return Err(format!("minimum incoming + minimum outgoing: {}% must be <= 100%", sum));
		}

		Ok(())
	}

	/// Recommends a swap for the given aggregated balances, or `None` when
	/// both thresholds are satisfied. `capacity_sat` is the sum of local and
	/// remote balance over the target's channels.
	pub(crate) fn suggest(&self, local_sat: u64, capacity_sat: u64) -> Option<(SwapType, u64)> {
		if capacity_sat == 0 {
			return None;
		}

		let remote_sat = capacity_sat.saturating_sub(local_sat);
		let local_pct = local_sat * 100 / capacity_sat;
		let remote_pct = remote_sat * 100 / capacity_sat;

		let min_incoming = u64::from(self.min_incoming_pct);
		let min_outgoing = u64::from(self.min_outgoing_pct);

		// Inbound deficit first: shift local balance on-chain until the
		// remote side sits at the midpoint of its allowed range.
		if remote_pct < min_incoming {
			let target_pct = (min_incoming + (100 - min_outgoing)) / 2;
			let target_sat = capacity_sat * target_pct / 100;
			let amount_sat = target_sat.saturating_sub(remote_sat);
			if amount_sat == 0 {
				return None;
			}
			return Some((SwapType::Out, amount_sat));
		}

		if local_pct < min_outgoing {
			let target_pct = (min_outgoing + (100 - min_incoming)) / 2;
			let target_sat = capacity_sat * target_pct / 100;
			let amount_sat = target_sat.saturating_sub(local_sat);
			if amount_sat == 0 {
				return None;
			}
			return Some((SwapType::In, amount_sat));
		}

		None
	}
}

/// A threshold rule bound to a swap direction. The rule only ever triggers
/// swaps of its declared type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRule {
	pub threshold: ThresholdRule,
	pub swap_type: SwapType,
}

impl SwapRule {
	pub fn validate(&self) -> Result<(), String> {
		self.threshold.validate()
	}

	pub(crate) fn suggest(&self, local_sat: u64, capacity_sat: u64) -> Option<(SwapType, u64)> {
		let (swap_type, amount_sat) = self.threshold.suggest(local_sat, capacity_sat)?;
		if swap_type != self.swap_type {
			return None;
		}
		Some((swap_type, amount_sat))
	}
}
