// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Centralized response serialization and error mapping.
//!
//! Policy and identity failures are 401; input failures 400; absence
//! 404; name collisions 409; pattern compile failures 422; everything
//! else is a generic 500 that leaks nothing. Unknown routes and actions
//! share one 404 JSON fallback.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use spike_common_core::error::ErrorEnvelope;
use spike_common_core::ApiError;

/// Map an [`ApiError`] onto its status code and `{"err": …}` body.
pub fn error_response(err: ApiError) -> Response {
	let status = match err {
		ApiError::BadInput | ApiError::ReadFailure | ApiError::ParseFailure => {
			StatusCode::BAD_REQUEST
		}
		ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
		ApiError::NotFound => StatusCode::NOT_FOUND,
		ApiError::AlreadyExists => StatusCode::CONFLICT,
		ApiError::Invalid => StatusCode::UNPROCESSABLE_ENTITY,
		ApiError::MarshalFailure | ApiError::Timeout | ApiError::Internal => {
			StatusCode::INTERNAL_SERVER_ERROR
		}
	};
	(status, Json(ErrorEnvelope::from(err))).into_response()
}

/// 200 with a JSON body.
pub fn ok_json<T: Serialize>(body: &T) -> Response {
	Json(body).into_response()
}

/// The 404 JSON fallback for unknown paths and actions.
pub fn fallback() -> Response {
	error_response(ApiError::NotFound)
}

/// The gate response while the service is not Healthy: everything but
/// the restore endpoint is refused without detail.
pub fn not_ready() -> Response {
	(
		StatusCode::SERVICE_UNAVAILABLE,
		Json(ErrorEnvelope::from(ApiError::Internal)),
	)
		.into_response()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn status_mapping() {
		assert_eq!(
			error_response(ApiError::BadInput).status(),
			StatusCode::BAD_REQUEST
		);
		assert_eq!(
			error_response(ApiError::Unauthorized).status(),
			StatusCode::UNAUTHORIZED
		);
		assert_eq!(
			error_response(ApiError::NotFound).status(),
			StatusCode::NOT_FOUND
		);
		assert_eq!(
			error_response(ApiError::AlreadyExists).status(),
			StatusCode::CONFLICT
		);
		assert_eq!(
			error_response(ApiError::Invalid).status(),
			StatusCode::UNPROCESSABLE_ENTITY
		);
		assert_eq!(
			error_response(ApiError::Internal).status(),
			StatusCode::INTERNAL_SERVER_ERROR
		);
		assert_eq!(
			error_response(ApiError::Timeout).status(),
			StatusCode::INTERNAL_SERVER_ERROR
		);
	}

	#[test]
	fn not_ready_is_503() {
		assert_eq!(not_ready().status(), StatusCode::SERVICE_UNAVAILABLE);
	}
}
