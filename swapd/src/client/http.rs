// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

//! A [`SwapClient`] speaking JSON over HTTP to the swap daemon backend.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::client::types::{
	ChannelInfo, ExistingSwap, LoopInQuote, LoopInQuoteRequest, LoopInRequest, LoopOutQuote,
	LoopOutQuoteRequest, OutRequest, Restrictions, SwapInfo,
};
use crate::client::{ClientError, SwapClient};

const LOOP_OUT_QUOTE_PATH: &str = "/v1/loop/out/quote";
const LOOP_IN_QUOTE_PATH: &str = "/v1/loop/in/quote";
const LOOP_OUT_PATH: &str = "/v1/loop/out";
const LOOP_IN_PATH: &str = "/v1/loop/in";
const RESTRICTIONS_PATH: &str = "/v1/restrictions";
const LIST_CHANNELS_PATH: &str = "/v1/channels";
const LIST_LOOP_OUT_PATH: &str = "/v1/swaps/out";
const LIST_LOOP_IN_PATH: &str = "/v1/swaps/in";

pub(crate) struct HttpSwapClient {
	base_url: String,
	client: reqwest::Client,
}

impl HttpSwapClient {
	pub(crate) fn new(base_url: &str) -> Result<Self, ClientError> {
		let client = reqwest::Client::builder().build().map_err(to_client_error)?;
		Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), client })
	}

	async fn post<T: Serialize, R: DeserializeOwned>(
		&self, path: &str, body: &T,
	) -> Result<R, ClientError> {
		let url = format!("{}{}", self.base_url, path);
		let response =
			self.client.post(&url).json(body).send().await.map_err(to_client_error)?;
		decode_response(response).await
	}

	async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, ClientError> {
		let url = format!("{}{}", self.base_url, path);
		let response = self.client.get(&url).send().await.map_err(to_client_error)?;
		decode_response(response).await
	}
}

async fn decode_response<R: DeserializeOwned>(
	response: reqwest::Response,
) -> Result<R, ClientError> {
	let status = response.status();
	if !status.is_success() {
		let body = response.text().await.unwrap_or_default();
		return Err(ClientError::Remote(format!("status {}: {}", status, body)));
	}
	response.json().await.map_err(to_client_error)
}

fn to_client_error(error: reqwest::Error) -> ClientError {
	if error.is_timeout() {
		ClientError::Timeout
	} else {
		ClientError::Transport(error.to_string())
	}
}

#[async_trait]
impl SwapClient for HttpSwapClient {
	async fn loop_out_quote(
		&self, request: LoopOutQuoteRequest,
	) -> Result<LoopOutQuote, ClientError> {
		self.post(LOOP_OUT_QUOTE_PATH, &request).await
	}

	async fn loop_in_quote(
		&self, request: LoopInQuoteRequest,
	) -> Result<LoopInQuote, ClientError> {
		self.post(LOOP_IN_QUOTE_PATH, &request).await
	}

	async fn loop_out(&self, request: OutRequest) -> Result<SwapInfo, ClientError> {
		self.post(LOOP_OUT_PATH, &request).await
	}

	async fn loop_in(&self, request: LoopInRequest) -> Result<SwapInfo, ClientError> {
		self.post(LOOP_IN_PATH, &request).await
	}

	async fn restrictions(&self) -> Result<Restrictions, ClientError> {
		self.get(RESTRICTIONS_PATH).await
	}

	async fn list_channels(&self) -> Result<Vec<ChannelInfo>, ClientError> {
		self.get(LIST_CHANNELS_PATH).await
	}

	async fn list_loop_out(&self) -> Result<Vec<ExistingSwap>, ClientError> {
		self.get(LIST_LOOP_OUT_PATH).await
	}

	async fn list_loop_in(&self) -> Result<Vec<ExistingSwap>, ClientError> {
		self.get(LIST_LOOP_IN_PATH).await
	}
}
