// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

//! Accounting of the autoloop fee budget over its configured window.

use crate::client::types::ExistingSwap;
use crate::liquidity::is_autoloop_label;
use crate::liquidity::params::Parameters;

/// The budget left for new dispatches. Recomputed from the swap history on
/// every tick; holds no state.
///
/// Autoloop swaps initiated inside the window contribute their realized cost
/// once terminal, and their declared worst-case fees while in-flight. The
/// result saturates at zero.
pub(crate) fn remaining_budget_sat(params: &Parameters, swaps: &[ExistingSwap]) -> u64 {
	let mut spent_and_reserved: u64 = 0;

	for swap in swaps {
		if !is_autoloop_label(&swap.label) {
			continue;
		}
		if swap.initiation_time < params.auto_fee_start_date {
			continue;
		}

		let contribution_sat = if swap.is_in_flight() {
			swap.max_fees.total_sat()
		} else {
			swap.realized_cost_sat()
		};
		spent_and_reserved = spent_and_reserved.saturating_add(contribution_sat);
	}

	params.auto_fee_budget_sat.saturating_sub(spent_and_reserved)
}
