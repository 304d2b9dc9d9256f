// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

use crate::api::error::ServerError;
use crate::api::error::ServerErrorCode::InvalidRequestError;
use crate::api::types::{SetLiquidityParamsRequest, SetLiquidityParamsResponse};
use crate::liquidity::params::Parameters;
use crate::service::Context;

pub(crate) const SET_LIQUIDITY_PARAMS_PATH: &str = "SetLiquidityParams";

pub(crate) async fn handle_set_liquidity_params_request(
	context: Context, request: SetLiquidityParamsRequest,
) -> Result<SetLiquidityParamsResponse, ServerError> {
	let params = Parameters::try_from(request.parameters)
		.map_err(|e| ServerError::new(InvalidRequestError, e.to_string()))?;

	context
		.manager
		.set_parameters(params)
		.map_err(|e| ServerError::new(InvalidRequestError, e.to_string()))?;

	Ok(SetLiquidityParamsResponse {})
}
