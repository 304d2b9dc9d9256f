// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

//! JSON models for the operator surface and the configuration file, with
//! fallible conversions to and from the validated domain parameters.

use std::time::{Duration, SystemTime};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::client::types::{NodeId, ShortChannelId, SwapType, TargetId};
use crate::liquidity::fees::FeeLimit;
use crate::liquidity::params::{ParamValidationError, Parameters};
use crate::liquidity::rule::{SwapRule, ThresholdRule};
use crate::liquidity::suggest::{Reason, SwapIntent};

/// The wire form of [`Parameters`]. Fields left out fall back to the domain
/// defaults, so a partial update only needs to name what changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct LiquidityParams {
	pub autoloop: bool,
	pub auto_fee_budget_sat: u64,
	/// RFC 3339 timestamp marking the left edge of the budget window.
	pub auto_fee_start_date: String,
	pub max_auto_in_flight: usize,
	pub failure_backoff_secs: u64,
	pub fee_limit: FeeLimit,
	pub channel_rules: Vec<ChannelRule>,
	pub peer_rules: Vec<PeerRule>,
	pub sweep_conf_target: u32,
	pub htlc_conf_target: u32,
	pub client_timeout_secs: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct ChannelRule {
	pub channel_id: ShortChannelId,
	pub swap_type: SwapType,
	pub min_incoming_pct: u8,
	pub min_outgoing_pct: u8,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct PeerRule {
	pub node_id: NodeId,
	pub swap_type: SwapType,
	pub min_incoming_pct: u8,
	pub min_outgoing_pct: u8,
}

impl Default for LiquidityParams {
	fn default() -> Self {
		LiquidityParams::from(&Parameters::default())
	}
}

impl From<&Parameters> for LiquidityParams {
	fn from(params: &Parameters) -> Self {
		let channel_rules = params
			.channel_rules
			.iter()
			.map(|(&channel_id, rule)| ChannelRule {
				channel_id,
				swap_type: rule.swap_type,
				min_incoming_pct: rule.threshold.min_incoming_pct,
				min_outgoing_pct: rule.threshold.min_outgoing_pct,
			})
			.collect();

		let peer_rules = params
			.peer_rules
			.iter()
			.map(|(&node_id, rule)| PeerRule {
				node_id,
				swap_type: rule.swap_type,
				min_incoming_pct: rule.threshold.min_incoming_pct,
				min_outgoing_pct: rule.threshold.min_outgoing_pct,
			})
			.collect();

		Self {
			autoloop: params.autoloop,
			auto_fee_budget_sat: params.auto_fee_budget_sat,
			auto_fee_start_date: format_start_date(params.auto_fee_start_date),
			max_auto_in_flight: params.max_auto_in_flight,
			failure_backoff_secs: params.failure_backoff.as_secs(),
			fee_limit: params.fee_limit,
			channel_rules,
			peer_rules,
			sweep_conf_target: params.sweep_conf_target,
			htlc_conf_target: params.htlc_conf_target,
			client_timeout_secs: params.client_timeout.as_secs(),
		}
	}
}

impl TryFrom<LiquidityParams> for Parameters {
	type Error = ParamValidationError;

	fn try_from(dto: LiquidityParams) -> Result<Self, Self::Error> {
		let auto_fee_start_date = parse_start_date(&dto.auto_fee_start_date)?;

		let mut channel_rules = std::collections::BTreeMap::new();
		for rule in dto.channel_rules {
			let swap_rule = SwapRule {
				threshold: ThresholdRule::new(rule.min_incoming_pct, rule.min_outgoing_pct),
				swap_type: rule.swap_type,
			};
			if channel_rules.insert(rule.channel_id, swap_rule).is_some() {
				return Err(ParamValidationError::new(
					"channel_rules",
					format!("duplicate rule for channel {}", rule.channel_id),
				));
			}
		}

		let mut peer_rules = std::collections::BTreeMap::new();
		for rule in dto.peer_rules {
			let swap_rule = SwapRule {
				threshold: ThresholdRule::new(rule.min_incoming_pct, rule.min_outgoing_pct),
				swap_type: rule.swap_type,
			};
			if peer_rules.insert(rule.node_id, swap_rule).is_some() {
				return Err(ParamValidationError::new(
					"peer_rules",
					format!("duplicate rule for peer {}", rule.node_id),
				));
			}
		}

		Ok(Parameters {
			autoloop: dto.autoloop,
			auto_fee_budget_sat: dto.auto_fee_budget_sat,
			auto_fee_start_date,
			max_auto_in_flight: dto.max_auto_in_flight,
			failure_backoff: Duration::from_secs(dto.failure_backoff_secs),
			fee_limit: dto.fee_limit,
			channel_rules,
			peer_rules,
			sweep_conf_target: dto.sweep_conf_target,
			htlc_conf_target: dto.htlc_conf_target,
			client_timeout: Duration::from_secs(dto.client_timeout_secs),
		})
	}
}

fn format_start_date(time: SystemTime) -> String {
	DateTime::<Utc>::from(time).to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_start_date(value: &str) -> Result<SystemTime, ParamValidationError> {
	let parsed = DateTime::parse_from_rfc3339(value).map_err(|e| {
		ParamValidationError::new(
			"auto_fee_start_date",
			format!("'{}' is not a valid RFC 3339 timestamp: {}", value, e),
		)
	})?;
	Ok(SystemTime::from(parsed))
}

#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct GetLiquidityParamsRequest {}

#[derive(Clone, Debug, Serialize)]
pub(crate) struct GetLiquidityParamsResponse {
	pub parameters: LiquidityParams,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct SetLiquidityParamsRequest {
	pub parameters: LiquidityParams,
}

#[derive(Clone, Debug, Serialize)]
pub(crate) struct SetLiquidityParamsResponse {}

#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct SuggestSwapsRequest {}

#[derive(Clone, Debug, Serialize)]
pub(crate) struct SuggestSwapsResponse {
	pub suggestions: Vec<SwapIntent>,
	pub disqualified: Vec<Disqualified>,
}

#[derive(Clone, Debug, Serialize)]
pub(crate) struct Disqualified {
	pub target: TargetId,
	pub reason: Reason,
}

#[cfg(test)]
mod tests {
	use std::time::UNIX_EPOCH;

	use super::*;
	use crate::liquidity::fees::{FeePortion, DEFAULT_FEE_PPM};

	#[test]
	fn test_parameters_roundtrip() {
		let mut params = Parameters {
			autoloop: true,
			auto_fee_budget_sat: 50_000,
			auto_fee_start_date: UNIX_EPOCH + Duration::from_secs(1_700_000_000),
			..Default::default()
		};
		params.channel_rules.insert(
			ShortChannelId(7),
			SwapRule { threshold: ThresholdRule::new(10, 20), swap_type: SwapType::Out },
		);
		params.peer_rules.insert(
			NodeId::new([0x02; 33]),
			SwapRule { threshold: ThresholdRule::new(30, 0), swap_type: SwapType::In },
		);

		let dto = LiquidityParams::from(&params);
		assert_eq!(dto.auto_fee_start_date, "2023-11-14T22:13:20Z");
		let restored = Parameters::try_from(dto).unwrap();
		assert_eq!(restored, params);
	}

	#[test]
	fn test_partial_json_uses_defaults() {
		let dto: LiquidityParams =
			serde_json::from_str(r#"{"autoloop": true, "auto_fee_budget_sat": 1000}"#).unwrap();
		assert!(dto.autoloop);
		assert_eq!(dto.auto_fee_budget_sat, 1_000);
		assert_eq!(
			dto.fee_limit,
			FeeLimit::Portion(FeePortion { fee_portion_ppm: DEFAULT_FEE_PPM })
		);
		assert_eq!(dto.failure_backoff_secs, 24 * 60 * 60);
	}

	#[test]
	fn test_fee_limit_variants_deserialize() {
		let dto: LiquidityParams =
			serde_json::from_str(r#"{"fee_limit": {"fee_portion_ppm": 5000}}"#).unwrap();
		assert_eq!(dto.fee_limit, FeeLimit::Portion(FeePortion { fee_portion_ppm: 5_000 }));

		let dto: LiquidityParams = serde_json::from_str(
			r#"{"fee_limit": {
				"max_swap_fee_ppm": 10000,
				"max_routing_fee_ppm": 10000,
				"max_prepay_routing_fee_ppm": 5000,
				"max_miner_fee_sat": 15000,
				"max_prepay_sat": 30000,
				"max_total_fee_sat": 60000
			}}"#,
		)
		.unwrap();
		assert!(matches!(dto.fee_limit, FeeLimit::Categories(_)));
	}

	#[test]
	fn test_invalid_start_date_names_field() {
		let dto = LiquidityParams {
			auto_fee_start_date: "not-a-date".to_string(),
			..Default::default()
		};
		let err = Parameters::try_from(dto).unwrap_err();
		assert_eq!(err.field, "auto_fee_start_date");
	}

	#[test]
	fn test_duplicate_rules_rejected() {
		let rule = ChannelRule {
			channel_id: ShortChannelId(1),
			swap_type: SwapType::Out,
			min_incoming_pct: 10,
			min_outgoing_pct: 10,
		};
		let dto = LiquidityParams {
			channel_rules: vec![rule.clone(), rule],
			..Default::default()
		};
		let err = Parameters::try_from(dto).unwrap_err();
		assert_eq!(err.field, "channel_rules");
	}
}
