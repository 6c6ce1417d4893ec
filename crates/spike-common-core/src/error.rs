// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The error taxonomy shared by every service and the CLI.
//!
//! One variant per failure mode, independent of transport encoding. The
//! HTTP layer maps these onto status codes; the `err` field of every JSON
//! response carries the snake_case wire code from [`ApiError::wire_code`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure modes of the API, independent of how they travel on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ApiError {
	/// Malformed JSON, wrong-length shard, invalid path, invalid version list.
	#[error("bad input")]
	BadInput,

	/// Missing identity, non-validating identity, or policy denial.
	#[error("unauthorized")]
	Unauthorized,

	/// Secret, version, or policy absent; keeper holds no shard.
	#[error("not found")]
	NotFound,

	/// Policy name collision.
	#[error("already exists")]
	AlreadyExists,

	/// Policy regex compile failure.
	#[error("invalid")]
	Invalid,

	/// Request body could not be read.
	#[error("read failure")]
	ReadFailure,

	/// Request body could not be parsed.
	#[error("parse failure")]
	ParseFailure,

	/// Response body could not be serialized.
	#[error("marshal failure")]
	MarshalFailure,

	/// Deadline exceeded on a backend or peer call.
	#[error("timeout")]
	Timeout,

	/// Reconstruction tripwire, unreachable router state, locked backend.
	#[error("internal error")]
	Internal,
}

impl ApiError {
	/// The snake_case code carried in the `err` field of JSON responses.
	pub fn wire_code(&self) -> &'static str {
		match self {
			ApiError::BadInput => "bad_input",
			ApiError::Unauthorized => "unauthorized",
			ApiError::NotFound => "not_found",
			ApiError::AlreadyExists => "already_exists",
			ApiError::Invalid => "invalid",
			ApiError::ReadFailure => "read_failure",
			ApiError::ParseFailure => "parse_failure",
			ApiError::MarshalFailure => "marshal_failure",
			ApiError::Timeout => "timeout",
			ApiError::Internal => "internal",
		}
	}
}

/// The shared error envelope: `{"err": "<wire code>"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
	pub err: String,
}

impl From<ApiError> for ErrorEnvelope {
	fn from(err: ApiError) -> Self {
		Self {
			err: err.wire_code().to_string(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn wire_codes_are_snake_case() {
		assert_eq!(ApiError::BadInput.wire_code(), "bad_input");
		assert_eq!(ApiError::Unauthorized.wire_code(), "unauthorized");
		assert_eq!(ApiError::NotFound.wire_code(), "not_found");
		assert_eq!(ApiError::AlreadyExists.wire_code(), "already_exists");
		assert_eq!(ApiError::Invalid.wire_code(), "invalid");
		assert_eq!(ApiError::Timeout.wire_code(), "timeout");
		assert_eq!(ApiError::Internal.wire_code(), "internal");
	}

	#[test]
	fn envelope_serializes_to_err_field() {
		let envelope = ErrorEnvelope::from(ApiError::Unauthorized);
		let json = serde_json::to_string(&envelope).unwrap();
		assert_eq!(json, r#"{"err":"unauthorized"}"#);
	}
}
