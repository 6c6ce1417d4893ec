// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The keeper's single endpoint: `/v1/keep`.
//!
//! `contribute` (default action) overwrites the stored shard; `read`
//! returns it or 404 when the cell is empty. Both require the peer to be
//! the nexus. Each request is audited with a structured record.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Extension, Json, Router};
use std::collections::HashMap;
use tracing::info;

use spike_common_core::api::{ApiAction, QUERY_ACTION, URL_KEEP};
use spike_common_core::audit::{AuditAction, AuditEntry};
use spike_common_core::error::ErrorEnvelope;
use spike_common_core::reqres::{
	Shard32, ShardContributeRequest, ShardContributeResponse, ShardReadResponse,
};
use spike_common_core::spiffe::{PeerIdentity, SpiffeId};
use spike_common_core::ApiError;

use crate::AppState;

pub fn create_router(state: AppState) -> Router {
	let mut router = Router::new().route(URL_KEEP, post(dispatch)).fallback(fallback);

	if let Some(dev_peer) = state.config.dev_peer_id.clone() {
		router = router.layer(Extension(PeerIdentity(dev_peer)));
	}

	router.with_state(state)
}

fn error_response(err: ApiError) -> Response {
	let status = match err {
		ApiError::BadInput => StatusCode::BAD_REQUEST,
		ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
		ApiError::NotFound => StatusCode::NOT_FOUND,
		_ => StatusCode::INTERNAL_SERVER_ERROR,
	};
	(status, Json(ErrorEnvelope::from(err))).into_response()
}

fn audit(request_name: &str, caller: &SpiffeId, action: AuditAction) {
	let entry = AuditEntry::new(request_name, "POST", URL_KEEP, caller, action);
	info!(
		target: "spike::audit",
		request = %entry.request_name,
		method = %entry.method,
		path = %entry.path,
		caller = %entry.caller_id,
		action = %entry.action,
		"audit"
	);
}

async fn dispatch(
	State(state): State<AppState>,
	peer: Option<Extension<PeerIdentity>>,
	Query(params): Query<HashMap<String, String>>,
	body: Bytes,
) -> Response {
	let Some(Extension(peer)) = peer else {
		return error_response(ApiError::Unauthorized);
	};
	let caller = peer.0;
	if !state.config.trust_roots.is_nexus(&caller) {
		return error_response(ApiError::Unauthorized);
	}

	match ApiAction::from_query(params.get(QUERY_ACTION).map(String::as_str)) {
		Some(ApiAction::Default) => contribute(state, caller, body).await,
		Some(ApiAction::Read) => read(state, caller).await,
		_ => error_response(ApiError::NotFound),
	}
}

async fn contribute(state: AppState, caller: SpiffeId, body: Bytes) -> Response {
	audit("keeper-shard-contribute", &caller, AuditAction::Create);

	let request: ShardContributeRequest = match serde_json::from_slice(&body) {
		Ok(request) => request,
		Err(_) => return error_response(ApiError::BadInput),
	};
	if request.keeper_id == 0 {
		return error_response(ApiError::BadInput);
	}

	state.shard.set(request.shard.as_bytes());
	// `request` drops here and zeroes its shard copy.
	Json(ShardContributeResponse::default()).into_response()
}

async fn read(state: AppState, caller: SpiffeId) -> Response {
	audit("keeper-shard-read", &caller, AuditAction::Read);

	match state.shard.read() {
		Some(shard) => {
			// Shard32 zeroes itself once the response body is written.
			let response = ShardReadResponse {
				shard: Some(Shard32(*shard)),
				err: None,
			};
			Json(&response).into_response()
		}
		None => error_response(ApiError::NotFound),
	}
}

async fn fallback() -> Response {
	error_response(ApiError::NotFound)
}
