//! The narrow interface the liquidity manager consumes: quotes, dispatch,
//! server restrictions, the channel snapshot and the swap store snapshot.

pub(crate) mod http;
pub(crate) mod types;

use std::fmt;

use async_trait::async_trait;

use crate::client::types::{
	ChannelInfo, ExistingSwap, LoopInQuote, LoopInQuoteRequest, LoopInRequest, LoopOutQuote,
	LoopOutQuoteRequest, OutRequest, Restrictions, SwapInfo,
};

/// The capability surface of the swap daemon backend. Production uses the
/// HTTP client in [`http`]; tests substitute an in-memory mock.
#[async_trait]
pub(crate) trait SwapClient: Send + Sync {
	async fn loop_out_quote(
		&self, request: LoopOutQuoteRequest,
	) -> Result<LoopOutQuote, ClientError>;

	async fn loop_in_quote(&self, request: LoopInQuoteRequest)
		-> Result<LoopInQuote, ClientError>;

	async fn loop_out(&self, request: OutRequest) -> Result<SwapInfo, ClientError>;

	async fn loop_in(&self, request: LoopInRequest) -> Result<SwapInfo, ClientError>;

	async fn restrictions(&self) -> Result<Restrictions, ClientError>;

	async fn list_channels(&self) -> Result<Vec<ChannelInfo>, ClientError>;

	async fn list_loop_out(&self) -> Result<Vec<ExistingSwap>, ClientError>;

	async fn list_loop_in(&self) -> Result<Vec<ExistingSwap>, ClientError>;
}

/// Failure of a remote call. All variants are treated as transient by the
/// liquidity manager; they never abort the daemon.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ClientError {
	/// The call did not complete within the configured client timeout.
	Timeout,
	/// The request could not be delivered or the response not read.
	Transport(String),
	/// The remote end answered with an error.
	Remote(String),
}

impl fmt::Display for ClientError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ClientError::Timeout => write!(f, "remote call timed out"),
			ClientError::Transport(msg) => write!(f, "transport error: {}", msg),
			ClientError::Remote(msg) => write!(f, "remote error: {}", msg),
		}
	}
}

impl std::error::Error for ClientError {}
