// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

use crate::api::error::ServerError;
use crate::api::error::ServerErrorCode::UnavailableError;
use crate::api::types::{Disqualified, SuggestSwapsRequest, SuggestSwapsResponse};
use crate::service::Context;

pub(crate) const SUGGEST_SWAPS_PATH: &str = "SuggestSwaps";

/// Runs the suggestion pipeline with dispatch disabled, reporting for every
/// considered target either an intent or the reason it was disqualified.
pub(crate) async fn handle_suggest_swaps_request(
	context: Context, _request: SuggestSwapsRequest,
) -> Result<SuggestSwapsResponse, ServerError> {
	let outcome = context
		.manager
		.suggest_swaps()
		.await
		.map_err(|e| ServerError::new(UnavailableError, e.to_string()))?;

	let disqualified = outcome
		.disqualified
		.into_iter()
		.map(|(target, reason)| Disqualified { target, reason })
		.collect();

	Ok(SuggestSwapsResponse { suggestions: outcome.suggestions, disqualified })
}
