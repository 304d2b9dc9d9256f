// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

//! Fee limits deciding whether a quoted swap is affordable, and deriving the
//! worst-case per-component fees a dispatched swap may spend.

use serde::{Deserialize, Serialize};

use crate::client::types::{LoopInQuote, LoopOutQuote};

pub(crate) const PPM_DENOMINATOR: u64 = 1_000_000;

/// The default total fee allowance: 2% of the swap amount.
pub(crate) const DEFAULT_FEE_PPM: u64 = 20_000;

/// Converts a parts-per-million rate into satoshis of the given amount,
/// flooring to a whole satoshi.
pub(crate) fn ppm_to_sat(amount_sat: u64, ppm: u64) -> u64 {
	let fee = u128::from(amount_sat) * u128::from(ppm) / u128::from(PPM_DENOMINATOR);
	u64::try_from(fee).unwrap_or(u64::MAX)
}

/// Rejection of a candidate amount before a quote is requested.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum AmountReject {
	/// The amount is too small for the limit to allot any fees to it.
	TooSmall,
	/// The amount is so large that its ppm-derived fee caps cannot fit under
	/// the limit's absolute total.
	TooLarge,
}

/// Rejection of a quote, attributed to the fee component that exceeded its
/// allowance.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum QuoteReject {
	SwapFeeTooHigh,
	MinerFeeTooHigh,
	PrepayTooHigh,
}

/// The worst-case fees a loop out may be dispatched with.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct OutFees {
	pub max_swap_fee_sat: u64,
	pub max_prepay_amount_sat: u64,
	pub max_miner_fee_sat: u64,
	pub max_swap_routing_fee_sat: u64,
	pub max_prepay_routing_fee_sat: u64,
}

/// The worst-case fees a loop in may be dispatched with.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct InFees {
	pub max_swap_fee_sat: u64,
	pub max_miner_fee_sat: u64,
}

/// Absolute per-category fee caps.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeCategoryLimit {
	pub max_swap_fee_ppm: u64,
	pub max_routing_fee_ppm: u64,
	pub max_prepay_routing_fee_ppm: u64,
	pub max_miner_fee_sat: u64,
	pub max_prepay_sat: u64,
	pub max_total_fee_sat: u64,
}

/// A single total allowance, allocated across components by the proportions
/// the quote reports.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeePortion {
	pub fee_portion_ppm: u64,
}

/// How much an automatically dispatched swap may spend. Closed set of
/// policies; every call site dispatches exhaustively.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeeLimit {
	Categories(FeeCategoryLimit),
	Portion(FeePortion),
}

impl Default for FeeLimit {
	fn default() -> Self {
		FeeLimit::Portion(FeePortion { fee_portion_ppm: DEFAULT_FEE_PPM })
	}
}

impl FeeLimit {
	pub fn validate(&self) -> Result<(), String> {
		match self {
			FeeLimit::Categories(limit) => {
				validate_ppm("max_swap_fee_ppm", limit.max_swap_fee_ppm)?;
				validate_ppm("max_routing_fee_ppm", limit.max_routing_fee_ppm)?;
				validate_ppm("max_prepay_routing_fee_ppm", limit.max_prepay_routing_fee_ppm)?;
				if limit.max_miner_fee_sat == 0 {
					return Err("max_miner_fee_sat must be non-zero".to_string());
				}
				if limit.max_prepay_sat == 0 {
					return Err("max_prepay_sat must be non-zero".to_string());
				}
				if limit.max_total_fee_sat == 0 {
					return Err("max_total_fee_sat must be non-zero".to_string());
				}
				Ok(())
			},
			FeeLimit::Portion(portion) => {
				validate_ppm("fee_portion_ppm", portion.fee_portion_ppm)
			},
		}
	}

	/// Gates a candidate amount before a quote is requested: the amount must
	/// be large enough for the limit to allot fees to it, and small enough
	/// that its derived caps can fit under any absolute total.
	pub(crate) fn check_amount(&self, amount_sat: u64) -> Result<(), AmountReject> {
		match self {
			FeeLimit::Categories(limit) => {
				if amount_sat == 0 {
					return Err(AmountReject::TooSmall);
				}
				// Worst-case caps before quoting; the prepay routing bound
				// uses the prepay cap since no quote exists yet.
				let worst_case = ppm_to_sat(amount_sat, limit.max_swap_fee_ppm)
					.saturating_add(ppm_to_sat(amount_sat, limit.max_routing_fee_ppm))
					.saturating_add(ppm_to_sat(
						limit.max_prepay_sat,
						limit.max_prepay_routing_fee_ppm,
					))
					.saturating_add(limit.max_miner_fee_sat);
				if worst_case > limit.max_total_fee_sat {
					return Err(AmountReject::TooLarge);
				}
				Ok(())
			},
			FeeLimit::Portion(portion) => {
				if ppm_to_sat(amount_sat, portion.fee_portion_ppm) == 0 {
					return Err(AmountReject::TooSmall);
				}
				Ok(())
			},
		}
	}

	/// Tests a loop out quote against the limit and derives dispatch fees.
	pub(crate) fn loop_out_fees(
		&self, amount_sat: u64, quote: &LoopOutQuote,
	) -> Result<OutFees, QuoteReject> {
		match self {
			FeeLimit::Categories(limit) => limit.loop_out_fees(amount_sat, quote),
			FeeLimit::Portion(portion) => portion.loop_out_fees(amount_sat, quote),
		}
	}

	/// Tests a loop in quote against the limit and derives dispatch fees.
	pub(crate) fn loop_in_fees(
		&self, amount_sat: u64, quote: &LoopInQuote,
	) -> Result<InFees, QuoteReject> {
		match self {
			FeeLimit::Categories(limit) => limit.loop_in_fees(amount_sat, quote),
			FeeLimit::Portion(portion) => portion.loop_in_fees(amount_sat, quote),
		}
	}
}

impl FeeCategoryLimit {
	fn loop_out_fees(
		&self, amount_sat: u64, quote: &LoopOutQuote,
	) -> Result<OutFees, QuoteReject> {
		let max_swap_fee_sat = ppm_to_sat(amount_sat, self.max_swap_fee_ppm);
		if quote.swap_fee_sat > max_swap_fee_sat {
			return Err(QuoteReject::SwapFeeTooHigh);
		}

		if quote.prepay_amount_sat > self.max_prepay_sat {
			return Err(QuoteReject::PrepayTooHigh);
		}

		if quote.miner_fee_sat > self.max_miner_fee_sat {
			return Err(QuoteReject::MinerFeeTooHigh);
		}

		let max_swap_routing_fee_sat = ppm_to_sat(amount_sat, self.max_routing_fee_ppm);
		let max_prepay_routing_fee_sat =
			ppm_to_sat(quote.prepay_amount_sat, self.max_prepay_routing_fee_ppm);

		// Worst-case fee total, excluding the prepay principal which is
		// returned when the swap settles. Breaches are attributed to the
		// swap fee, the dominant component.
		let total = max_swap_fee_sat
			.saturating_add(self.max_miner_fee_sat)
			.saturating_add(max_swap_routing_fee_sat)
			.saturating_add(max_prepay_routing_fee_sat);
		if total > self.max_total_fee_sat {
			return Err(QuoteReject::SwapFeeTooHigh);
		}

		// Dispatch with the configured caps rather than the quote values to
		// leave room for fee drift between quote and broadcast.
		Ok(OutFees {
			max_swap_fee_sat,
			max_prepay_amount_sat: self.max_prepay_sat,
			max_miner_fee_sat: self.max_miner_fee_sat,
			max_swap_routing_fee_sat,
			max_prepay_routing_fee_sat,
		})
	}

	fn loop_in_fees(&self, amount_sat: u64, quote: &LoopInQuote) -> Result<InFees, QuoteReject> {
		let max_swap_fee_sat = ppm_to_sat(amount_sat, self.max_swap_fee_ppm);
		if quote.swap_fee_sat > max_swap_fee_sat {
			return Err(QuoteReject::SwapFeeTooHigh);
		}

		if quote.miner_fee_sat > self.max_miner_fee_sat {
			return Err(QuoteReject::MinerFeeTooHigh);
		}

		let total = max_swap_fee_sat.saturating_add(self.max_miner_fee_sat);
		if total > self.max_total_fee_sat {
			return Err(QuoteReject::SwapFeeTooHigh);
		}

		Ok(InFees { max_swap_fee_sat, max_miner_fee_sat: self.max_miner_fee_sat })
	}
}

impl FeePortion {
	fn loop_out_fees(
		&self, amount_sat: u64, quote: &LoopOutQuote,
	) -> Result<OutFees, QuoteReject> {
		let limit_sat = ppm_to_sat(amount_sat, self.fee_portion_ppm);

		// Walk the quote components in order; the one that exhausts the
		// allowance names the rejection. Routing must be left strictly
		// positive room, so each step uses >=.
		let swap_fee_sat = quote.swap_fee_sat;
		if swap_fee_sat >= limit_sat {
			return Err(QuoteReject::SwapFeeTooHigh);
		}

		let with_miner = swap_fee_sat.saturating_add(quote.miner_fee_sat);
		if with_miner >= limit_sat {
			return Err(QuoteReject::MinerFeeTooHigh);
		}

		let with_prepay = with_miner.saturating_add(quote.prepay_amount_sat);
		if with_prepay >= limit_sat {
			return Err(QuoteReject::PrepayTooHigh);
		}

		// Split the remaining allowance across the two off-chain routing
		// budgets in proportion to the amounts being routed.
		let available = limit_sat - with_prepay;
		let (max_prepay_routing_fee_sat, max_swap_routing_fee_sat) =
			split_off_chain(available, quote.prepay_amount_sat, amount_sat);

		Ok(OutFees {
			max_swap_fee_sat: quote.swap_fee_sat,
			max_prepay_amount_sat: quote.prepay_amount_sat,
			max_miner_fee_sat: quote.miner_fee_sat,
			max_swap_routing_fee_sat,
			max_prepay_routing_fee_sat,
		})
	}

	fn loop_in_fees(&self, amount_sat: u64, quote: &LoopInQuote) -> Result<InFees, QuoteReject> {
		let limit_sat = ppm_to_sat(amount_sat, self.fee_portion_ppm);

		if quote.swap_fee_sat.saturating_add(quote.miner_fee_sat) > limit_sat {
			if quote.swap_fee_sat > limit_sat {
				return Err(QuoteReject::SwapFeeTooHigh);
			}
			return Err(QuoteReject::MinerFeeTooHigh);
		}

		// Loop in has no off-chain routing; the unallocated remainder backs
		// the on-chain htlc against fee drift.
		Ok(InFees {
			max_swap_fee_sat: quote.swap_fee_sat,
			max_miner_fee_sat: limit_sat - quote.swap_fee_sat,
		})
	}
}

fn split_off_chain(available_sat: u64, prepay_amount_sat: u64, swap_amount_sat: u64) -> (u64, u64) {
	let total = u128::from(prepay_amount_sat) + u128::from(swap_amount_sat);
	if total == 0 {
		return (0, available_sat);
	}

	let prepay_share =
		u128::from(available_sat) * u128::from(prepay_amount_sat) / total;
	// unwrap safety: the share is bounded by available_sat.
	let max_prepay_routing_fee_sat = u64::try_from(prepay_share).unwrap();
	(max_prepay_routing_fee_sat, available_sat - max_prepay_routing_fee_sat)
}

fn validate_ppm(field: &str, ppm: u64) -> Result<(), String> {
	if ppm == 0 || ppm > PPM_DENOMINATOR {
		return Err(format!("{}: {} must be in (0, {}]", field, ppm, PPM_DENOMINATOR));
	}
	Ok(())
}
