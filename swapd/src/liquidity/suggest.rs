// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

//! The per-tick suggestion pipeline: classify channels into targets, evaluate
//! rules, filter, order, quote, and admit within the fee budget.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use log::{debug, warn};
use serde::Serialize;

use crate::client::types::{
	ChannelInfo, LoopInQuoteRequest, LoopInRequest, LoopOutQuoteRequest, NodeId, OutRequest,
	SwapType, Target, TargetId,
};
use crate::client::ClientError;
use crate::liquidity::fees::{AmountReject, QuoteReject};
use crate::liquidity::params::Parameters;
use crate::liquidity::{
	backoff, budget, is_autoloop_label, LiquidityManager, AUTOLOOP_INITIATOR, AUTOLOOP_IN_LABEL,
	AUTOLOOP_OUT_LABEL,
};

/// How far in the future the server may publish the loop out swap. Longer
/// deadlines let the server batch, which quotes cheaper.
const SWAP_PUBLICATION_DEADLINE: Duration = Duration::from_secs(30 * 60);

/// Why a target whose rule was evaluated is not being suggested this tick.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Reason {
	/// Both liquidity thresholds are satisfied.
	RuleSatisfied,
	/// The target has an in-flight swap of the same type, or all in-flight
	/// slots are taken.
	InFlight,
	/// A recent failure holds the target back.
	FailureBackoff,
	AmountBelowMin,
	AmountAboveMax,
	SwapFeeTooHigh,
	MinerFeeTooHigh,
	PrepayTooHigh,
	BudgetInsufficient,
}

impl fmt::Display for Reason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let text = match self {
			Reason::RuleSatisfied => "liquidity thresholds satisfied",
			Reason::InFlight => "in-flight swap conflict",
			Reason::FailureBackoff => "in failure backoff",
			Reason::AmountBelowMin => "amount below minimum",
			Reason::AmountAboveMax => "amount above maximum",
			Reason::SwapFeeTooHigh => "swap fee too high",
			Reason::MinerFeeTooHigh => "miner fee too high",
			Reason::PrepayTooHigh => "prepay too high",
			Reason::BudgetInsufficient => "budget insufficient",
		};
		write!(f, "{}", text)
	}
}

impl From<QuoteReject> for Reason {
	fn from(reject: QuoteReject) -> Self {
		match reject {
			QuoteReject::SwapFeeTooHigh => Reason::SwapFeeTooHigh,
			QuoteReject::MinerFeeTooHigh => Reason::MinerFeeTooHigh,
			QuoteReject::PrepayTooHigh => Reason::PrepayTooHigh,
		}
	}
}

impl From<AmountReject> for Reason {
	fn from(reject: AmountReject) -> Self {
		match reject {
			AmountReject::TooSmall => Reason::AmountBelowMin,
			AmountReject::TooLarge => Reason::AmountAboveMax,
		}
	}
}

/// A fully-parameterized swap the pipeline admitted, ready for dispatch.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum SwapIntent {
	Out(OutRequest),
	In(LoopInRequest),
}

impl SwapIntent {
	pub(crate) fn swap_type(&self) -> SwapType {
		match self {
			SwapIntent::Out(_) => SwapType::Out,
			SwapIntent::In(_) => SwapType::In,
		}
	}

	pub(crate) fn amount_sat(&self) -> u64 {
		match self {
			SwapIntent::Out(request) => request.amount_sat,
			SwapIntent::In(request) => request.amount_sat,
		}
	}

	/// The worst-case fee total the intent reserves against the budget.
	pub(crate) fn reserved_fee_sat(&self) -> u64 {
		match self {
			SwapIntent::Out(request) => request
				.max_swap_fee_sat
				.saturating_add(request.max_miner_fee_sat)
				.saturating_add(request.max_swap_routing_fee_sat)
				.saturating_add(request.max_prepay_routing_fee_sat),
			SwapIntent::In(request) => {
				request.max_swap_fee_sat.saturating_add(request.max_miner_fee_sat)
			},
		}
	}
}

/// The outcome of one suggestion pass: the ordered dispatch list and, for
/// every other target considered, why it did not qualify.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Suggestions {
	pub suggestions: Vec<SwapIntent>,
	pub disqualified: BTreeMap<TargetId, Reason>,
}

/// Failure to take the tick's snapshots. Per-candidate quote failures are
/// absorbed; only snapshot failures surface here and abort the tick.
#[derive(Debug)]
pub(crate) enum SuggestError {
	Client(ClientError),
}

impl fmt::Display for SuggestError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SuggestError::Client(error) => write!(f, "snapshot call failed: {}", error),
		}
	}
}

impl std::error::Error for SuggestError {}

impl From<ClientError> for SuggestError {
	fn from(error: ClientError) -> Self {
		SuggestError::Client(error)
	}
}

/// A target with a pending recommendation, before quoting.
struct Candidate {
	target: Target,
	swap_type: SwapType,
	amount_sat: u64,
	/// The peer owning the target's channels; the last hop for loop in.
	peer: NodeId,
}

impl LiquidityManager {
	/// Runs the suggestion pipeline on fresh snapshots with the current
	/// parameters. Dispatch is left to the caller.
	pub(crate) async fn suggest_swaps(&self) -> Result<Suggestions, SuggestError> {
		let params = self.parameters();
		self.suggest_with_params(&params).await
	}

	/// The pipeline proper. Deterministic: identical snapshots, parameters
	/// and clock yield identical output.
	pub(crate) async fn suggest_with_params(
		&self, params: &Parameters,
	) -> Result<Suggestions, SuggestError> {
		let now = self.clock().now();

		if params.channel_rules.is_empty() && params.peer_rules.is_empty() {
			return Ok(Suggestions::default());
		}

		let timeout = params.client_timeout;
		let restrictions = with_timeout(timeout, self.client().restrictions()).await?;
		let channels = with_timeout(timeout, self.client().list_channels()).await?;
		let mut swaps = with_timeout(timeout, self.client().list_loop_out()).await?;
		swaps.extend(with_timeout(timeout, self.client().list_loop_in()).await?);

		let mut disqualified = BTreeMap::new();
		let mut candidates = Vec::new();

		// Channel rules first; each claims its channel outright.
		for (&channel_id, rule) in &params.channel_rules {
			let Some(channel) = channels.iter().find(|c| c.channel_id == channel_id) else {
				debug!("channel {} has a rule but is not in the snapshot", channel_id);
				continue;
			};

			let target = Target::Channel(channel_id);
			let capacity_sat =
				channel.local_balance_sat.saturating_add(channel.remote_balance_sat);
			match rule.suggest(channel.local_balance_sat, capacity_sat) {
				Some((swap_type, amount_sat)) => candidates.push(Candidate {
					target,
					swap_type,
					amount_sat,
					peer: channel.node_id,
				}),
				None => {
					disqualified.insert(target.id(), Reason::RuleSatisfied);
				},
			}
		}

		// Peer rules aggregate the peer's channels that no channel rule
		// already claimed.
		for (&node_id, rule) in &params.peer_rules {
			let members: Vec<&ChannelInfo> = channels
				.iter()
				.filter(|c| {
					c.node_id == node_id && !params.channel_rules.contains_key(&c.channel_id)
				})
				.collect();
			if members.is_empty() {
				continue;
			}

			let local_sat: u64 = members.iter().map(|c| c.local_balance_sat).sum();
			let remote_sat: u64 = members.iter().map(|c| c.remote_balance_sat).sum();
			let target = Target::Peer {
				node_id,
				channels: members.iter().map(|c| c.channel_id).collect(),
			};

			match rule.suggest(local_sat, local_sat.saturating_add(remote_sat)) {
				Some((swap_type, amount_sat)) => {
					candidates.push(Candidate { target, swap_type, amount_sat, peer: node_id })
				},
				None => {
					disqualified.insert(target.id(), Reason::RuleSatisfied);
				},
			}
		}

		// Fixed order: loop out ahead of loop in, then by target identity.
		// This order governs slot allocation and budget admission.
		candidates
			.sort_by(|a, b| (a.swap_type, a.target.id()).cmp(&(b.swap_type, b.target.id())));

		let mut eligible = Vec::new();
		for mut candidate in candidates {
			let target_id = candidate.target.id();

			let conflict = swaps.iter().any(|s| {
				s.is_in_flight()
					&& s.swap_type == candidate.swap_type
					&& s.target.conflicts_with(&candidate.target)
			});
			if conflict {
				disqualified.insert(target_id, Reason::InFlight);
				continue;
			}

			if !backoff::eligible(&candidate.target, &swaps, now, params.failure_backoff) {
				disqualified.insert(target_id, Reason::FailureBackoff);
				continue;
			}

			if candidate.amount_sat < restrictions.min_swap_amount_sat {
				disqualified.insert(target_id, Reason::AmountBelowMin);
				continue;
			}
			candidate.amount_sat = candidate.amount_sat.min(restrictions.max_swap_amount_sat);

			if let Err(reject) = params.fee_limit.check_amount(candidate.amount_sat) {
				disqualified.insert(target_id, reject.into());
				continue;
			}

			eligible.push(candidate);
		}

		// Admission control: only as many new swaps as there are free
		// in-flight slots; surplus candidates are not replaced.
		let in_flight =
			swaps.iter().filter(|s| is_autoloop_label(&s.label) && s.is_in_flight()).count();
		let slots = params.max_auto_in_flight.saturating_sub(in_flight);
		if eligible.len() > slots {
			for candidate in eligible.split_off(slots) {
				disqualified.insert(candidate.target.id(), Reason::InFlight);
			}
		}

		let mut intents: Vec<(TargetId, SwapIntent)> = Vec::new();
		for candidate in eligible {
			let target_id = candidate.target.id();
			match self.quote_candidate(params, &candidate, now, timeout).await {
				Ok(intent) => intents.push((target_id, intent)),
				Err(QuoteOutcome::Rejected(reason)) => {
					disqualified.insert(target_id, reason);
				},
				Err(QuoteOutcome::Failed(error)) => {
					// Transient; the candidate is skipped for this tick
					// without entering back-off.
					warn!("failed to quote {} for {}: {}", candidate.swap_type, target_id, error);
				},
			}
		}

		// Budget admission in pipeline order. A too-large intent is dropped;
		// later, smaller ones may still fit.
		let mut remaining_sat = budget::remaining_budget_sat(params, &swaps);
		let mut suggestions = Vec::new();
		for (target_id, intent) in intents {
			let reserved_sat = intent.reserved_fee_sat();
			if reserved_sat <= remaining_sat {
				remaining_sat -= reserved_sat;
				suggestions.push(intent);
			} else {
				disqualified.insert(target_id, Reason::BudgetInsufficient);
			}
		}

		Ok(Suggestions { suggestions, disqualified })
	}

	async fn quote_candidate(
		&self, params: &Parameters, candidate: &Candidate, now: std::time::SystemTime,
		timeout: Duration,
	) -> Result<SwapIntent, QuoteOutcome> {
		match candidate.swap_type {
			SwapType::Out => {
				let request = LoopOutQuoteRequest {
					amount_sat: candidate.amount_sat,
					sweep_conf_target: params.sweep_conf_target,
					swap_publication_deadline: now + SWAP_PUBLICATION_DEADLINE,
				};
				let quote = with_timeout(timeout, self.client().loop_out_quote(request))
					.await
					.map_err(QuoteOutcome::Failed)?;

				let fees = params
					.fee_limit
					.loop_out_fees(candidate.amount_sat, &quote)
					.map_err(|reject| QuoteOutcome::Rejected(reject.into()))?;

				let outgoing_chan_set = match &candidate.target {
					Target::Channel(id) => vec![*id],
					Target::Peer { channels, .. } => channels.clone(),
				};

				Ok(SwapIntent::Out(OutRequest {
					amount_sat: candidate.amount_sat,
					outgoing_chan_set,
					max_swap_fee_sat: fees.max_swap_fee_sat,
					max_prepay_amount_sat: fees.max_prepay_amount_sat,
					max_miner_fee_sat: fees.max_miner_fee_sat,
					max_swap_routing_fee_sat: fees.max_swap_routing_fee_sat,
					max_prepay_routing_fee_sat: fees.max_prepay_routing_fee_sat,
					sweep_conf_target: params.sweep_conf_target,
					label: AUTOLOOP_OUT_LABEL.to_string(),
					initiator: AUTOLOOP_INITIATOR.to_string(),
				}))
			},
			SwapType::In => {
				let request = LoopInQuoteRequest {
					amount_sat: candidate.amount_sat,
					htlc_conf_target: params.htlc_conf_target,
					last_hop: Some(candidate.peer),
				};
				let quote = with_timeout(timeout, self.client().loop_in_quote(request))
					.await
					.map_err(QuoteOutcome::Failed)?;

				let fees = params
					.fee_limit
					.loop_in_fees(candidate.amount_sat, &quote)
					.map_err(|reject| QuoteOutcome::Rejected(reject.into()))?;

				Ok(SwapIntent::In(LoopInRequest {
					amount_sat: candidate.amount_sat,
					last_hop: Some(candidate.peer),
					max_swap_fee_sat: fees.max_swap_fee_sat,
					max_miner_fee_sat: fees.max_miner_fee_sat,
					htlc_conf_target: params.htlc_conf_target,
					label: AUTOLOOP_IN_LABEL.to_string(),
					initiator: AUTOLOOP_INITIATOR.to_string(),
				}))
			},
		}
	}
}

enum QuoteOutcome {
	Rejected(Reason),
	Failed(ClientError),
}

pub(crate) async fn with_timeout<T, F>(timeout: Duration, future: F) -> Result<T, ClientError>
where
	F: Future<Output = Result<T, ClientError>>,
{
	match tokio::time::timeout(timeout, future).await {
		Ok(result) => result,
		Err(_) => Err(ClientError::Timeout),
	}
}
