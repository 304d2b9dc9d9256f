use hyper::StatusCode;
use serde::Serialize;

pub(crate) struct ServerError {
	// The error message containing a generic description of the error condition in English.
	// It is intended for a human audience only and should not be parsed to extract any information
	// programmatically. Client-side code may use it for logging only.
	pub(crate) message: String,

	// The error code uniquely identifying an error condition.
	// It is meant to be read and understood programmatically by code that detects/handles errors by
	// type.
	pub(crate) code: ServerErrorCode,
}

impl ServerError {
	pub(crate) fn new(code: ServerErrorCode, message: impl Into<String>) -> Self {
		Self { code, message: message.into() }
	}
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum ServerErrorCode {
	/// The request was malformed or failed validation.
	InvalidRequestError,

	/// A backend the request depends on could not be reached.
	UnavailableError,

	/// An unexpected internal failure.
	InternalServerError,
}

/// The JSON body returned for any failed request.
#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
	pub(crate) code: &'static str,
	pub(crate) message: String,
}

pub(crate) fn to_error_response(error: ServerError) -> (ErrorResponse, StatusCode) {
	let (code, status) = match error.code {
		ServerErrorCode::InvalidRequestError => ("invalid_request", StatusCode::BAD_REQUEST),
		ServerErrorCode::UnavailableError => ("unavailable", StatusCode::SERVICE_UNAVAILABLE),
		ServerErrorCode::InternalServerError => {
			("internal", StatusCode::INTERNAL_SERVER_ERROR)
		},
	};
	(ErrorResponse { code, message: error.message }, status)
}
