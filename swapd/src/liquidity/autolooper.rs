// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

//! The ticker-driven dispatch loop. Each tick runs the suggestion pipeline on
//! a fresh parameter snapshot and, when autoloop is enabled, dispatches the
//! emitted intents in order.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::liquidity::params::Parameters;
use crate::liquidity::suggest::{with_timeout, SwapIntent};
use crate::liquidity::LiquidityManager;

/// The default wait between autoloop ticks.
pub(crate) const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Runs the autolooper until `shutdown` flips to true or its sender is
/// dropped. Ticks are strictly serialized on this task; a ticker fire during
/// an in-progress tick is skipped, not queued. Shutdown aborts any remote
/// call the current tick is waiting on.
pub(crate) async fn run(
	manager: Arc<LiquidityManager>, tick_interval: Duration, mut shutdown: watch::Receiver<bool>,
) {
	info!("autolooper running, ticking every {}s", tick_interval.as_secs());

	let mut ticker = tokio::time::interval(tick_interval);
	ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
	// The interval's first tick completes immediately; consume it so the
	// first real tick lands one full interval after startup.
	ticker.tick().await;

	loop {
		tokio::select! {
			_ = ticker.tick() => {
				tokio::select! {
					_ = manager.tick() => {},
					_ = wait_shutdown(&mut shutdown) => break,
				}
			},
			_ = wait_shutdown(&mut shutdown) => break,
		}
	}

	info!("autolooper stopped");
}

async fn wait_shutdown(shutdown: &mut watch::Receiver<bool>) {
	loop {
		if *shutdown.borrow() {
			return;
		}
		// A dropped sender also means the daemon is going down.
		if shutdown.changed().await.is_err() {
			return;
		}
	}
}

impl LiquidityManager {
	/// One tick: snapshot the parameters, run the suggester, and dispatch
	/// the result when autoloop is enabled. Per-tick errors are logged and
	/// absorbed; the loop always returns to the ticker.
	pub(crate) async fn tick(&self) {
		let params = self.parameters();

		let suggestions = match self.suggest_with_params(&params).await {
			Ok(suggestions) => suggestions,
			Err(error) => {
				warn!("autoloop tick aborted: {}", error);
				return;
			},
		};

		for (target, reason) in &suggestions.disqualified {
			debug!("autoloop: {} disqualified: {}", target, reason);
		}

		if !params.autoloop {
			// Suggest-only mode: publish the outcome to the log; the
			// operator surface serves the same pipeline on demand.
			if !suggestions.suggestions.is_empty() {
				info!(
					"autoloop disabled: {} swap(s) suggested but not dispatched",
					suggestions.suggestions.len()
				);
			}
			return;
		}

		for intent in suggestions.suggestions {
			self.dispatch(&params, intent).await;
		}
	}

	/// Fire-and-forget dispatch; the external swap state machine takes over
	/// once the call returns. A failed dispatch does not affect the other
	/// intents of the tick.
	async fn dispatch(&self, params: &Parameters, intent: SwapIntent) {
		let swap_type = intent.swap_type();
		let amount_sat = intent.amount_sat();

		let result = match intent {
			SwapIntent::Out(request) => {
				with_timeout(params.client_timeout, self.client().loop_out(request)).await
			},
			SwapIntent::In(request) => {
				with_timeout(params.client_timeout, self.client().loop_in(request)).await
			},
		};

		match result {
			Ok(swap) => {
				info!("autoloop dispatched {} of {} sat: {}", swap_type, amount_sat, swap.swap_hash)
			},
			Err(error) => {
				error!("autoloop failed to dispatch {} of {} sat: {}", swap_type, amount_sat, error)
			},
		}
	}
}
