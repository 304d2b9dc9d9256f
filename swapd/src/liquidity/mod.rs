//! The autonomous liquidity manager. On every tick it inspects channel
//! balances against operator rules, requests quotes for the swaps that would
//! restore the configured thresholds, filters them through fee limits, a
//! global fee budget and per-target failure back-off, and dispatches the
//! survivors.

pub(crate) mod autolooper;
pub(crate) mod backoff;
pub(crate) mod budget;
pub(crate) mod fees;
pub(crate) mod params;
pub(crate) mod rule;
pub(crate) mod suggest;
#[cfg(test)]
pub(crate) mod test_utils;

use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use crate::client::SwapClient;
use crate::liquidity::params::{ParamValidationError, Parameters};

/// Label attached to automatically dispatched loop outs.
pub(crate) const AUTOLOOP_OUT_LABEL: &str = "autoloop-out";

/// Label attached to automatically dispatched loop ins.
pub(crate) const AUTOLOOP_IN_LABEL: &str = "autoloop-in";

/// Initiator recorded on automatically dispatched swaps.
pub(crate) const AUTOLOOP_INITIATOR: &str = "autoloop";

/// Whether a stored swap was dispatched by the autolooper. Operator-initiated
/// swaps never count against the autoloop budget or in-flight slots.
pub(crate) fn is_autoloop_label(label: &str) -> bool {
	label == AUTOLOOP_OUT_LABEL || label == AUTOLOOP_IN_LABEL
}

/// Injected time source. All wall-clock reads go through this so tests can
/// drive the manager deterministically.
pub(crate) trait Clock: Send + Sync {
	fn now(&self) -> SystemTime;
}

pub(crate) struct SystemClock;

impl Clock for SystemClock {
	fn now(&self) -> SystemTime {
		SystemTime::now()
	}
}

/// Owns the autoloop parameters and runs the per-tick decision pipeline.
///
/// Readers take a parameter snapshot at tick start; [`set_parameters`]
/// validates and replaces the record atomically, so a tick in progress keeps
/// the snapshot it started with.
///
/// [`set_parameters`]: LiquidityManager::set_parameters
pub(crate) struct LiquidityManager {
	client: Arc<dyn SwapClient>,
	clock: Arc<dyn Clock>,
	params: Mutex<Parameters>,
}

impl LiquidityManager {
	pub(crate) fn new(
		client: Arc<dyn SwapClient>, clock: Arc<dyn Clock>, params: Parameters,
	) -> Result<Self, ParamValidationError> {
		params.validate(clock.now())?;
		Ok(Self { client, clock, params: Mutex::new(params) })
	}

	pub(crate) fn parameters(&self) -> Parameters {
		self.params.lock().unwrap().clone()
	}

	pub(crate) fn set_parameters(&self, params: Parameters) -> Result<(), ParamValidationError> {
		params.validate(self.clock.now())?;
		*self.params.lock().unwrap() = params;
		Ok(())
	}

	pub(crate) fn client(&self) -> &Arc<dyn SwapClient> {
		&self.client
	}

	pub(crate) fn clock(&self) -> &Arc<dyn Clock> {
		&self.clock
	}
}
