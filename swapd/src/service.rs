use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::header::CONTENT_TYPE;
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::api::error::ServerErrorCode::InvalidRequestError;
use crate::api::error::{to_error_response, ServerError};
use crate::api::get_liquidity_params::{
	handle_get_liquidity_params_request, GET_LIQUIDITY_PARAMS_PATH,
};
use crate::api::set_liquidity_params::{
	handle_set_liquidity_params_request, SET_LIQUIDITY_PARAMS_PATH,
};
use crate::api::suggest_swaps::{handle_suggest_swaps_request, SUGGEST_SWAPS_PATH};
use crate::liquidity::LiquidityManager;

#[derive(Clone)]
pub(crate) struct LiquidityService {
	manager: Arc<LiquidityManager>,
}

impl LiquidityService {
	pub(crate) fn new(manager: Arc<LiquidityManager>) -> Self {
		Self { manager }
	}
}

pub(crate) struct Context {
	pub(crate) manager: Arc<LiquidityManager>,
}

impl Service<Request<Incoming>> for LiquidityService {
	type Response = Response<Full<Bytes>>;
	type Error = hyper::Error;
	type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

	fn call(&self, req: Request<Incoming>) -> Self::Future {
		let context = Context { manager: Arc::clone(&self.manager) };
		// Exclude '/' from path pattern matching.
		match &req.uri().path()[1..] {
			GET_LIQUIDITY_PARAMS_PATH => {
				Box::pin(handle_request(context, req, handle_get_liquidity_params_request))
			},
			SET_LIQUIDITY_PARAMS_PATH => {
				Box::pin(handle_request(context, req, handle_set_liquidity_params_request))
			},
			SUGGEST_SWAPS_PATH => {
				Box::pin(handle_request(context, req, handle_suggest_swaps_request))
			},
			path => {
				let error = format!("Unknown request: {}", path).into_bytes();
				Box::pin(async {
					Ok(Response::builder()
						.status(StatusCode::BAD_REQUEST)
						.body(Full::new(Bytes::from(error)))
						// unwrap safety: body only errors when previous chained calls failed.
						.unwrap())
				})
			},
		}
	}
}

async fn handle_request<T, R, F, Fut>(
	context: Context, request: Request<Incoming>, handler: F,
) -> Result<<LiquidityService as Service<Request<Incoming>>>::Response, hyper::Error>
where
	T: DeserializeOwned + Default,
	R: Serialize,
	F: FnOnce(Context, T) -> Fut,
	Fut: Future<Output = Result<R, ServerError>>,
{
	// TODO: we should bound the amount of data we read to avoid allocating too much memory.
	let bytes = request.into_body().collect().await?.to_bytes();

	// An empty body selects the request type's defaults.
	let decoded: Result<T, _> =
		if bytes.is_empty() { Ok(T::default()) } else { serde_json::from_slice(&bytes) };

	match decoded {
		Ok(request) => match handler(context, request).await {
			Ok(response) => Ok(json_response(StatusCode::OK, &response)),
			Err(error) => {
				let (body, status) = to_error_response(error);
				Ok(json_response(status, &body))
			},
		},
		Err(_) => {
			let (body, status) =
				to_error_response(ServerError::new(InvalidRequestError, "Malformed request."));
			Ok(json_response(status, &body))
		},
	}
}

fn json_response<R: Serialize>(status: StatusCode, body: &R) -> Response<Full<Bytes>> {
	// unwrap safety: response models serialize infallibly.
	let bytes = serde_json::to_vec(body).unwrap();
	Response::builder()
		.status(status)
		.header(CONTENT_TYPE, "application/json")
		.body(Full::new(Bytes::from(bytes)))
		// unwrap safety: body only errors when previous chained calls failed.
		.unwrap()
}
