// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The identity gate.
//!
//! The caller identity comes exclusively from the validated peer
//! certificate URI SAN. The external mTLS wrapper inserts it as a
//! [`PeerIdentity`] request extension; nothing here ever looks at a
//! header. A request without the extension never reaches a handler body.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::Response;

use spike_common_core::spiffe::SpiffeId;
use spike_common_core::ApiError;

pub use spike_common_core::spiffe::PeerIdentity;

use crate::http::response::error_response;

/// Extractor: the caller's identity, or a 401 before the handler runs.
pub struct RequirePeer(pub SpiffeId);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RequirePeer {
	type Rejection = Response;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		match parts.extensions.get::<PeerIdentity>() {
			Some(peer) => Ok(RequirePeer(peer.0.clone())),
			None => Err(error_response(ApiError::Unauthorized)),
		}
	}
}
