// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

//! The validated autoloop configuration record.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::client::types::{NodeId, ShortChannelId};
use crate::liquidity::fees::FeeLimit;
use crate::liquidity::rule::SwapRule;

/// The default wait after a failed swap before its target is retried.
pub(crate) const DEFAULT_FAILURE_BACKOFF: Duration = Duration::from_secs(24 * 60 * 60);

/// The default confirmation target for sweeping loop out on-chain outputs.
pub(crate) const DEFAULT_SWEEP_CONF_TARGET: u32 = 100;

/// The default confirmation target for loop in htlc publication.
pub(crate) const DEFAULT_HTLC_CONF_TARGET: u32 = 3;

/// The default deadline for each remote call made during a tick.
pub(crate) const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Confirmation targets below this cannot be fee-estimated.
const MIN_CONF_TARGET: u32 = 2;

/// Rejection of an operator-supplied parameter set, naming the offending
/// field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ParamValidationError {
	pub field: String,
	pub reason: String,
}

impl ParamValidationError {
	pub(crate) fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
		Self { field: field.into(), reason: reason.into() }
	}
}

impl fmt::Display for ParamValidationError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "invalid {}: {}", self.field, self.reason)
	}
}

impl std::error::Error for ParamValidationError {}

/// The full autoloop configuration. Mutated only through a validated replace;
/// every tick operates on an immutable snapshot.
///
/// A channel rule and a peer rule may both cover channels of the same peer:
/// the channel rule takes precedence for its channel and the peer rule
/// applies to the peer's remaining channels.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Parameters {
	/// When false, suggestions are computed and published but never
	/// dispatched.
	pub autoloop: bool,
	/// Absolute cap on autoloop fees over the budget window.
	pub auto_fee_budget_sat: u64,
	/// Left edge of the budget window.
	pub auto_fee_start_date: SystemTime,
	/// Hard cap on concurrently in-flight autoloop swaps.
	pub max_auto_in_flight: usize,
	/// Minimum wait after a failure before the target is retried.
	pub failure_backoff: Duration,
	pub fee_limit: FeeLimit,
	pub channel_rules: BTreeMap<ShortChannelId, SwapRule>,
	pub peer_rules: BTreeMap<NodeId, SwapRule>,
	pub sweep_conf_target: u32,
	pub htlc_conf_target: u32,
	/// Deadline applied to every remote call made during a tick.
	pub client_timeout: Duration,
}

impl Default for Parameters {
	fn default() -> Self {
		Self {
			autoloop: false,
			auto_fee_budget_sat: 0,
			auto_fee_start_date: UNIX_EPOCH,
			max_auto_in_flight: 1,
			failure_backoff: DEFAULT_FAILURE_BACKOFF,
			fee_limit: FeeLimit::default(),
			channel_rules: BTreeMap::new(),
			peer_rules: BTreeMap::new(),
			sweep_conf_target: DEFAULT_SWEEP_CONF_TARGET,
			htlc_conf_target: DEFAULT_HTLC_CONF_TARGET,
			client_timeout: DEFAULT_CLIENT_TIMEOUT,
		}
	}
}

impl Parameters {
	pub(crate) fn validate(&self, now: SystemTime) -> Result<(), ParamValidationError> {
		if self.auto_fee_start_date > now {
			return Err(ParamValidationError::new(
				"auto_fee_start_date",
				"must not be in the future",
			));
		}

		if self.autoloop && self.max_auto_in_flight == 0 {
			return Err(ParamValidationError::new(
				"max_auto_in_flight",
				"must be at least 1 when autoloop is enabled",
			));
		}

		if self.sweep_conf_target < MIN_CONF_TARGET {
			return Err(ParamValidationError::new(
				"sweep_conf_target",
				format!("must be at least {}", MIN_CONF_TARGET),
			));
		}

		if self.htlc_conf_target < MIN_CONF_TARGET {
			return Err(ParamValidationError::new(
				"htlc_conf_target",
				format!("must be at least {}", MIN_CONF_TARGET),
			));
		}

		if self.client_timeout.is_zero() {
			return Err(ParamValidationError::new("client_timeout", "must be non-zero"));
		}

		self.fee_limit
			.validate()
			.map_err(|reason| ParamValidationError::new("fee_limit", reason))?;

		for (channel, rule) in &self.channel_rules {
			rule.validate().map_err(|reason| {
				ParamValidationError::new(format!("channel_rules[{}]", channel), reason)
			})?;
		}

		for (peer, rule) in &self.peer_rules {
			rule.validate().map_err(|reason| {
				ParamValidationError::new(format!("peer_rules[{}]", peer), reason)
			})?;
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use super::*;
	use crate::client::types::SwapType;
	use crate::liquidity::rule::ThresholdRule;

	fn now() -> SystemTime {
		UNIX_EPOCH + Duration::from_secs(1_700_000_000)
	}

	#[test]
	fn test_default_parameters_validate() {
		assert!(Parameters::default().validate(now()).is_ok());
	}

	#[test]
	fn test_validate_rejections() {
		let mut params = Parameters { auto_fee_start_date: now(), ..Default::default() };
		assert!(params.validate(now()).is_ok());
		params.auto_fee_start_date = now() + Duration::from_secs(1);
		assert_eq!(params.validate(now()).unwrap_err().field, "auto_fee_start_date");

		let params =
			Parameters { autoloop: true, max_auto_in_flight: 0, ..Default::default() };
		assert_eq!(params.validate(now()).unwrap_err().field, "max_auto_in_flight");
		// Zero in-flight slots are tolerated while autoloop is disabled.
		let params = Parameters { max_auto_in_flight: 0, ..Default::default() };
		assert!(params.validate(now()).is_ok());

		let params = Parameters { sweep_conf_target: 1, ..Default::default() };
		assert_eq!(params.validate(now()).unwrap_err().field, "sweep_conf_target");

		let params = Parameters { client_timeout: Duration::ZERO, ..Default::default() };
		assert_eq!(params.validate(now()).unwrap_err().field, "client_timeout");
	}

	#[test]
	fn test_validate_names_offending_rule() {
		let mut params = Parameters::default();
		params.channel_rules.insert(
			ShortChannelId(7),
			SwapRule { threshold: ThresholdRule::new(80, 40), swap_type: SwapType::Out },
		);

		let err = params.validate(now()).unwrap_err();
		assert_eq!(err.field, "channel_rules[7]");
	}
}
