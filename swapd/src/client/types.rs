// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

//! Types shared between the liquidity manager and the swap client.

use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

use hex::{DisplayHex, FromHex};
use serde::{Deserialize, Serialize};

/// An opaque 64-bit channel identifier.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShortChannelId(pub u64);

impl fmt::Display for ShortChannelId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for ShortChannelId {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let id = s.parse::<u64>().map_err(|e| format!("invalid channel id '{}': {}", s, e))?;
		Ok(ShortChannelId(id))
	}
}

/// A peer's node public key.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId([u8; 33]);

impl NodeId {
	pub fn new(bytes: [u8; 33]) -> Self {
		NodeId(bytes)
	}
}

impl fmt::Display for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0.to_lower_hex_string())
	}
}

impl fmt::Debug for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "NodeId({})", self.0.to_lower_hex_string())
	}
}

impl FromStr for NodeId {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let bytes = <[u8; 33]>::from_hex(s).map_err(|e| format!("invalid node id '{}': {}", s, e))?;
		Ok(NodeId(bytes))
	}
}

impl Serialize for NodeId {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

impl<'de> Deserialize<'de> for NodeId {
	fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let s = String::deserialize(deserializer)?;
		s.parse().map_err(serde::de::Error::custom)
	}
}

/// The payment hash identifying a dispatched swap.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct SwapHash(pub [u8; 32]);

impl fmt::Display for SwapHash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0.to_lower_hex_string())
	}
}

impl fmt::Debug for SwapHash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "SwapHash({})", self.0.to_lower_hex_string())
	}
}

impl FromStr for SwapHash {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let bytes =
			<[u8; 32]>::from_hex(s).map_err(|e| format!("invalid swap hash '{}': {}", s, e))?;
		Ok(SwapHash(bytes))
	}
}

impl Serialize for SwapHash {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

impl<'de> Deserialize<'de> for SwapHash {
	fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let s = String::deserialize(deserializer)?;
		s.parse().map_err(serde::de::Error::custom)
	}
}

/// The direction of a swap. `Out` moves off-chain balance on-chain, freeing
/// inbound capacity; `In` is the reverse.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapType {
	Out,
	In,
}

impl fmt::Display for SwapType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SwapType::Out => write!(f, "loop out"),
			SwapType::In => write!(f, "loop in"),
		}
	}
}

/// The set of channels a swap rule acts on: a single channel, or all of a
/// peer's channels that are not already covered by a channel rule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
	Channel(ShortChannelId),
	Peer { node_id: NodeId, channels: Vec<ShortChannelId> },
}

impl Target {
	pub fn id(&self) -> TargetId {
		match self {
			Target::Channel(id) => TargetId::Channel(*id),
			Target::Peer { node_id, .. } => TargetId::Peer(*node_id),
		}
	}

	/// Whether two targets act on overlapping liquidity. A channel target
	/// conflicts with any peer target that aggregates it, and two peer
	/// targets conflict when they share the peer or any channel.
	pub fn conflicts_with(&self, other: &Target) -> bool {
		match (self, other) {
			(Target::Channel(a), Target::Channel(b)) => a == b,
			(Target::Channel(id), Target::Peer { channels, .. })
			| (Target::Peer { channels, .. }, Target::Channel(id)) => channels.contains(id),
			(
				Target::Peer { node_id: a, channels: chans_a },
				Target::Peer { node_id: b, channels: chans_b },
			) => a == b || chans_a.iter().any(|c| chans_b.contains(c)),
		}
	}
}

/// The identity of a target, without the aggregated channel set. Used to key
/// per-target reporting deterministically.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetId {
	Channel(ShortChannelId),
	Peer(NodeId),
}

impl fmt::Display for TargetId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TargetId::Channel(id) => write!(f, "channel {}", id),
			TargetId::Peer(node_id) => write!(f, "peer {}", node_id),
		}
	}
}

/// The state a swap was in as of an event. A swap with no events yet is
/// in-flight.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapState {
	InFlight,
	Success,
	FailOffchain,
	FailOnchain,
	FailTimeout,
}

impl SwapState {
	pub fn is_terminal(&self) -> bool {
		!matches!(self, SwapState::InFlight)
	}

	pub fn is_failure(&self) -> bool {
		matches!(self, SwapState::FailOffchain | SwapState::FailOnchain | SwapState::FailTimeout)
	}
}

/// The realized cost of a terminal swap, split by where the funds went.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapCost {
	pub server_sat: u64,
	pub onchain_sat: u64,
	pub offchain_sat: u64,
}

impl SwapCost {
	pub fn total_sat(&self) -> u64 {
		self.server_sat.saturating_add(self.onchain_sat).saturating_add(self.offchain_sat)
	}
}

/// A state transition recorded against a swap.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapEvent {
	#[serde(with = "unix_seconds")]
	pub timestamp: SystemTime,
	pub state: SwapState,
	pub cost: Option<SwapCost>,
}

/// The worst-case fees a swap was dispatched with. For loop in the routing
/// components are zero.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchedFees {
	pub max_swap_fee_sat: u64,
	pub max_miner_fee_sat: u64,
	pub max_swap_routing_fee_sat: u64,
	pub max_prepay_routing_fee_sat: u64,
}

impl DispatchedFees {
	pub fn total_sat(&self) -> u64 {
		self.max_swap_fee_sat
			.saturating_add(self.max_miner_fee_sat)
			.saturating_add(self.max_swap_routing_fee_sat)
			.saturating_add(self.max_prepay_routing_fee_sat)
	}
}

/// A swap contract as reported by the swap store, with its ordered event
/// history. The latest event defines the current state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingSwap {
	pub target: Target,
	pub swap_type: SwapType,
	pub amount_sat: u64,
	pub max_fees: DispatchedFees,
	#[serde(with = "unix_seconds")]
	pub initiation_time: SystemTime,
	pub label: String,
	pub events: Vec<SwapEvent>,
}

impl ExistingSwap {
	pub fn state(&self) -> SwapState {
		self.events.last().map(|event| event.state).unwrap_or(SwapState::InFlight)
	}

	pub fn is_in_flight(&self) -> bool {
		!self.state().is_terminal()
	}

	/// The timestamp of the most recent failure event, if any.
	pub fn last_failure(&self) -> Option<SystemTime> {
		self.events.iter().rev().find(|event| event.state.is_failure()).map(|event| event.timestamp)
	}

	/// The realized cost of the swap. Zero while the swap is in-flight or
	/// when the terminal event carries no cost breakdown.
	pub fn realized_cost_sat(&self) -> u64 {
		match self.events.last() {
			Some(event) if event.state.is_terminal() => {
				event.cost.map(|cost| cost.total_sat()).unwrap_or(0)
			},
			_ => 0,
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopOutQuoteRequest {
	pub amount_sat: u64,
	pub sweep_conf_target: u32,
	#[serde(with = "unix_seconds")]
	pub swap_publication_deadline: SystemTime,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopOutQuote {
	pub swap_fee_sat: u64,
	pub prepay_amount_sat: u64,
	pub miner_fee_sat: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopInQuoteRequest {
	pub amount_sat: u64,
	pub htlc_conf_target: u32,
	pub last_hop: Option<NodeId>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopInQuote {
	pub swap_fee_sat: u64,
	pub miner_fee_sat: u64,
}

/// Server-side bounds on dispatchable swap amounts.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restrictions {
	pub min_swap_amount_sat: u64,
	pub max_swap_amount_sat: u64,
}

/// A channel snapshot entry as reported by the lightning node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
	pub channel_id: ShortChannelId,
	pub node_id: NodeId,
	pub capacity_sat: u64,
	pub local_balance_sat: u64,
	pub remote_balance_sat: u64,
}

/// A fully-specified loop out dispatch request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutRequest {
	pub amount_sat: u64,
	pub outgoing_chan_set: Vec<ShortChannelId>,
	pub max_swap_fee_sat: u64,
	pub max_prepay_amount_sat: u64,
	pub max_miner_fee_sat: u64,
	pub max_swap_routing_fee_sat: u64,
	pub max_prepay_routing_fee_sat: u64,
	pub sweep_conf_target: u32,
	pub label: String,
	pub initiator: String,
}

/// A fully-specified loop in dispatch request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopInRequest {
	pub amount_sat: u64,
	pub last_hop: Option<NodeId>,
	pub max_swap_fee_sat: u64,
	pub max_miner_fee_sat: u64,
	pub htlc_conf_target: u32,
	pub label: String,
	pub initiator: String,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapInfo {
	pub swap_hash: SwapHash,
}

/// Serializes a `SystemTime` as whole seconds since the unix epoch.
pub(crate) mod unix_seconds {
	use std::time::{Duration, SystemTime, UNIX_EPOCH};

	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error> {
		let secs = time
			.duration_since(UNIX_EPOCH)
			.map_err(|_| serde::ser::Error::custom("timestamp before unix epoch"))?
			.as_secs();
		serializer.serialize_u64(secs)
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SystemTime, D::Error> {
		let secs = u64::deserialize(deserializer)?;
		Ok(UNIX_EPOCH + Duration::from_secs(secs))
	}
}
