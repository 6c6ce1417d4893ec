// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Handlers, one module per endpoint family.
//!
//! Every handler follows the same sequence: extract identity, record
//! exactly one audit entry, parse, guard, touch state, write behind,
//! respond through the centralized mapping.

pub mod operator;
pub mod policy;
pub mod secret;

use axum::body::Bytes;
use axum::response::Response;
use serde::de::DeserializeOwned;

use spike_common_core::ApiError;

use crate::http::response::error_response;

/// Parse a JSON request body; malformed input is a 400 before any state
/// is touched.
pub(crate) fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, Response> {
	serde_json::from_slice(body).map_err(|_| error_response(ApiError::BadInput))
}
