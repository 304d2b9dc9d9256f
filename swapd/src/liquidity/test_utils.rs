//! In-memory test doubles: a mock swap client and a manually advanced clock.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

use crate::client::types::{
	ChannelInfo, DispatchedFees, ExistingSwap, LoopInQuote, LoopInQuoteRequest, LoopInRequest,
	LoopOutQuote, LoopOutQuoteRequest, NodeId, OutRequest, Restrictions, ShortChannelId, SwapCost,
	SwapEvent, SwapHash, SwapInfo, SwapState, SwapType, Target,
};
use crate::client::{ClientError, SwapClient};
use crate::liquidity::params::Parameters;
use crate::liquidity::{Clock, LiquidityManager, AUTOLOOP_IN_LABEL, AUTOLOOP_OUT_LABEL};

/// A fixed instant all tests start from.
pub(crate) fn test_now() -> SystemTime {
	UNIX_EPOCH + Duration::from_secs(1_700_000_000)
}

pub(crate) struct ManualClock {
	now: Mutex<SystemTime>,
}

impl ManualClock {
	pub(crate) fn new(start: SystemTime) -> Self {
		Self { now: Mutex::new(start) }
	}

	pub(crate) fn advance(&self, delta: Duration) {
		let mut now = self.now.lock().unwrap();
		*now += delta;
	}
}

impl Clock for ManualClock {
	fn now(&self) -> SystemTime {
		*self.now.lock().unwrap()
	}
}

pub(crate) fn node(fill: u8) -> NodeId {
	NodeId::new([fill; 33])
}

pub(crate) fn channel(id: u64, node_fill: u8, local_sat: u64, remote_sat: u64) -> ChannelInfo {
	ChannelInfo {
		channel_id: ShortChannelId(id),
		node_id: node(node_fill),
		capacity_sat: local_sat + remote_sat,
		local_balance_sat: local_sat,
		remote_balance_sat: remote_sat,
	}
}

pub(crate) fn out_rule(min_incoming_pct: u8, min_outgoing_pct: u8) -> crate::liquidity::rule::SwapRule {
	crate::liquidity::rule::SwapRule {
		threshold: crate::liquidity::rule::ThresholdRule::new(min_incoming_pct, min_outgoing_pct),
		swap_type: SwapType::Out,
	}
}

pub(crate) fn in_rule(min_incoming_pct: u8, min_outgoing_pct: u8) -> crate::liquidity::rule::SwapRule {
	crate::liquidity::rule::SwapRule {
		threshold: crate::liquidity::rule::ThresholdRule::new(min_incoming_pct, min_outgoing_pct),
		swap_type: SwapType::In,
	}
}

/// An in-flight autoloop swap reserving `reserved_sat` against the budget.
pub(crate) fn in_flight_swap(target: Target, swap_type: SwapType, reserved_sat: u64) -> ExistingSwap {
	let label = match swap_type {
		SwapType::Out => AUTOLOOP_OUT_LABEL,
		SwapType::In => AUTOLOOP_IN_LABEL,
	};
	ExistingSwap {
		target,
		swap_type,
		amount_sat: 100_000,
		max_fees: DispatchedFees { max_swap_fee_sat: reserved_sat, ..Default::default() },
		initiation_time: test_now(),
		label: label.to_string(),
		events: Vec::new(),
	}
}

/// An in-memory [`SwapClient`]. Quotes are served from per-direction queues
/// and fall back to a cheap default; dispatches are recorded and entered
/// into the in-memory store as in-flight swaps, mimicking the swap daemon.
pub(crate) struct MockClient {
	channels: Mutex<Vec<ChannelInfo>>,
	loop_outs: Mutex<Vec<ExistingSwap>>,
	loop_ins: Mutex<Vec<ExistingSwap>>,
	restrictions: Mutex<Restrictions>,
	out_quotes: Mutex<VecDeque<Result<LoopOutQuote, ClientError>>>,
	in_quotes: Mutex<VecDeque<Result<LoopInQuote, ClientError>>>,
	dispatched_outs: Mutex<Vec<OutRequest>>,
	dispatched_ins: Mutex<Vec<LoopInRequest>>,
	list_channels_fails: Mutex<bool>,
	loop_out_fails: Mutex<bool>,
	clock: Mutex<SystemTime>,
}

impl MockClient {
	pub(crate) fn new() -> Self {
		Self {
			channels: Mutex::new(Vec::new()),
			loop_outs: Mutex::new(Vec::new()),
			loop_ins: Mutex::new(Vec::new()),
			restrictions: Mutex::new(Restrictions {
				min_swap_amount_sat: 1,
				max_swap_amount_sat: 10_000_000,
			}),
			out_quotes: Mutex::new(VecDeque::new()),
			in_quotes: Mutex::new(VecDeque::new()),
			dispatched_outs: Mutex::new(Vec::new()),
			dispatched_ins: Mutex::new(Vec::new()),
			list_channels_fails: Mutex::new(false),
			loop_out_fails: Mutex::new(false),
			clock: Mutex::new(test_now()),
		}
	}

	pub(crate) fn set_channels(&self, channels: Vec<ChannelInfo>) {
		*self.channels.lock().unwrap() = channels;
	}

	pub(crate) fn set_restrictions(&self, restrictions: Restrictions) {
		*self.restrictions.lock().unwrap() = restrictions;
	}

	pub(crate) fn push_loop_out(&self, swap: ExistingSwap) {
		self.loop_outs.lock().unwrap().push(swap);
	}

	pub(crate) fn push_out_quote(&self, quote: LoopOutQuote) {
		self.out_quotes.lock().unwrap().push_back(Ok(quote));
	}

	pub(crate) fn push_out_quote_error(&self, error: ClientError) {
		self.out_quotes.lock().unwrap().push_back(Err(error));
	}

	pub(crate) fn push_in_quote(&self, quote: LoopInQuote) {
		self.in_quotes.lock().unwrap().push_back(Ok(quote));
	}

	pub(crate) fn fail_list_channels(&self) {
		*self.list_channels_fails.lock().unwrap() = true;
	}

	/// Makes subsequent loop out dispatches fail; loop in keeps working.
	pub(crate) fn fail_loop_out(&self) {
		*self.loop_out_fails.lock().unwrap() = true;
	}

	pub(crate) fn dispatched_outs(&self) -> Vec<OutRequest> {
		self.dispatched_outs.lock().unwrap().clone()
	}

	pub(crate) fn dispatched_ins(&self) -> Vec<LoopInRequest> {
		self.dispatched_ins.lock().unwrap().clone()
	}

	pub(crate) fn dispatch_count(&self) -> usize {
		self.dispatched_outs.lock().unwrap().len() + self.dispatched_ins.lock().unwrap().len()
	}

	/// Appends a terminal event to the `index`th stored loop out.
	pub(crate) fn complete_loop_out(
		&self, index: usize, state: SwapState, timestamp: SystemTime, cost_sat: u64,
	) {
		let mut loop_outs = self.loop_outs.lock().unwrap();
		loop_outs[index].events.push(SwapEvent {
			timestamp,
			state,
			cost: Some(SwapCost { server_sat: cost_sat, onchain_sat: 0, offchain_sat: 0 }),
		});
	}

	fn target_for_out(&self, request: &OutRequest) -> Target {
		if request.outgoing_chan_set.len() == 1 {
			return Target::Channel(request.outgoing_chan_set[0]);
		}
		let channels = self.channels.lock().unwrap();
		let node_id = channels
			.iter()
			.find(|c| c.channel_id == request.outgoing_chan_set[0])
			.map(|c| c.node_id)
			.unwrap_or_else(|| node(0));
		Target::Peer { node_id, channels: request.outgoing_chan_set.clone() }
	}

	fn target_for_in(&self, request: &LoopInRequest) -> Target {
		let node_id = request.last_hop.unwrap_or_else(|| node(0));
		let channels = self.channels.lock().unwrap();
		let peer_channels: Vec<ShortChannelId> = channels
			.iter()
			.filter(|c| c.node_id == node_id)
			.map(|c| c.channel_id)
			.collect();
		Target::Peer { node_id, channels: peer_channels }
	}
}

#[async_trait]
impl SwapClient for MockClient {
	async fn loop_out_quote(
		&self, _request: LoopOutQuoteRequest,
	) -> Result<LoopOutQuote, ClientError> {
		self.out_quotes.lock().unwrap().pop_front().unwrap_or(Ok(LoopOutQuote {
			swap_fee_sat: 10,
			prepay_amount_sat: 10,
			miner_fee_sat: 10,
		}))
	}

	async fn loop_in_quote(
		&self, _request: LoopInQuoteRequest,
	) -> Result<LoopInQuote, ClientError> {
		self.in_quotes
			.lock()
			.unwrap()
			.pop_front()
			.unwrap_or(Ok(LoopInQuote { swap_fee_sat: 10, miner_fee_sat: 10 }))
	}

	async fn loop_out(&self, request: OutRequest) -> Result<SwapInfo, ClientError> {
		if *self.loop_out_fails.lock().unwrap() {
			return Err(ClientError::Remote("dispatch refused".to_string()));
		}

		let target = self.target_for_out(&request);
		let now = *self.clock.lock().unwrap();
		let mut dispatched = self.dispatched_outs.lock().unwrap();
		dispatched.push(request.clone());
		let hash = SwapHash([dispatched.len() as u8; 32]);

		self.loop_outs.lock().unwrap().push(ExistingSwap {
			target,
			swap_type: SwapType::Out,
			amount_sat: request.amount_sat,
			max_fees: DispatchedFees {
				max_swap_fee_sat: request.max_swap_fee_sat,
				max_miner_fee_sat: request.max_miner_fee_sat,
				max_swap_routing_fee_sat: request.max_swap_routing_fee_sat,
				max_prepay_routing_fee_sat: request.max_prepay_routing_fee_sat,
			},
			initiation_time: now,
			label: request.label.clone(),
			events: Vec::new(),
		});

		Ok(SwapInfo { swap_hash: hash })
	}

	async fn loop_in(&self, request: LoopInRequest) -> Result<SwapInfo, ClientError> {
		let target = self.target_for_in(&request);
		let now = *self.clock.lock().unwrap();
		let mut dispatched = self.dispatched_ins.lock().unwrap();
		dispatched.push(request.clone());
		let hash = SwapHash([0x80 | dispatched.len() as u8; 32]);

		self.loop_ins.lock().unwrap().push(ExistingSwap {
			target,
			swap_type: SwapType::In,
			amount_sat: request.amount_sat,
			max_fees: DispatchedFees {
				max_swap_fee_sat: request.max_swap_fee_sat,
				max_miner_fee_sat: request.max_miner_fee_sat,
				max_swap_routing_fee_sat: 0,
				max_prepay_routing_fee_sat: 0,
			},
			initiation_time: now,
			label: request.label.clone(),
			events: Vec::new(),
		});

		Ok(SwapInfo { swap_hash: hash })
	}

	async fn restrictions(&self) -> Result<Restrictions, ClientError> {
		Ok(*self.restrictions.lock().unwrap())
	}

	async fn list_channels(&self) -> Result<Vec<ChannelInfo>, ClientError> {
		if *self.list_channels_fails.lock().unwrap() {
			return Err(ClientError::Transport("connection reset".to_string()));
		}
		Ok(self.channels.lock().unwrap().clone())
	}

	async fn list_loop_out(&self) -> Result<Vec<ExistingSwap>, ClientError> {
		Ok(self.loop_outs.lock().unwrap().clone())
	}

	async fn list_loop_in(&self) -> Result<Vec<ExistingSwap>, ClientError> {
		Ok(self.loop_ins.lock().unwrap().clone())
	}
}

pub(crate) fn manager_with(
	params: Parameters, mock: MockClient,
) -> (LiquidityManager, Arc<MockClient>) {
	let clock = Arc::new(ManualClock::new(test_now()));
	manager_with_clock(params, mock, clock)
}

pub(crate) fn manager_with_clock(
	params: Parameters, mock: MockClient, clock: Arc<ManualClock>,
) -> (LiquidityManager, Arc<MockClient>) {
	let mock = Arc::new(mock);
	let manager = LiquidityManager::new(
		Arc::clone(&mock) as Arc<dyn SwapClient>,
		clock as Arc<dyn Clock>,
		params,
	)
	.unwrap();
	(manager, mock)
}
