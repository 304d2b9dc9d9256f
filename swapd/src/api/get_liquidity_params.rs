use crate::api::error::ServerError;
use crate::api::types::{GetLiquidityParamsRequest, GetLiquidityParamsResponse, LiquidityParams};
use crate::service::Context;

pub(crate) const GET_LIQUIDITY_PARAMS_PATH: &str = "GetLiquidityParams";

pub(crate) async fn handle_get_liquidity_params_request(
	context: Context, _request: GetLiquidityParamsRequest,
) -> Result<GetLiquidityParamsResponse, ServerError> {
	let parameters = LiquidityParams::from(&context.manager.parameters());
	Ok(GetLiquidityParamsResponse { parameters })
}
