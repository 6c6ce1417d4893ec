// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Operator flows: `recover` exports the two pilot shards while the
//! service is healthy; `restore` feeds them back into a fresh instance.
//!
//! `recover` requires the pilot `recover` role; `restore` the pilot
//! `restore` role. The pilot shards are, by convention, the shares at
//! the two lowest evaluation points (1 and 2), which is what a restore
//! expects to receive back.

use axum::body::Bytes;
use axum::extract::State;
use axum::response::Response;
use std::collections::BTreeMap;

use spike_common_core::api::{URL_OPERATOR_RECOVER, URL_OPERATOR_RESTORE};
use spike_common_core::audit::AuditAction;
use spike_common_core::reqres::{RecoverRequest, RecoverResponse, RestoreRequest, RestoreResponse};
use spike_common_core::{ApiError, Shard32};
use spike_common_crypto::shamir;

use crate::http::identity::RequirePeer;
use crate::http::response::{error_response, ok_json};
use crate::http::routes::parse_body;
use crate::state::RestoreOutcome;
use crate::AppState;

/// The evaluation points of the shards handed to the operator.
const PILOT_SHARD_IDS: [u8; 2] = [1, 2];

pub async fn recover(
	State(state): State<AppState>,
	RequirePeer(caller): RequirePeer,
	body: Bytes,
) -> Response {
	state.audit.request(
		"nexus-operator-recover",
		"POST",
		URL_OPERATOR_RECOVER,
		&caller,
		AuditAction::Create,
	);

	if !state.config.trust_roots.is_pilot_recover(&caller) {
		return error_response(ApiError::Unauthorized);
	}

	let _request: RecoverRequest = match parse_body(&body) {
		Ok(request) => request,
		Err(response) => return response,
	};

	let root = state.root_key.load();
	if root.is_zero() {
		return error_response(ApiError::NotFound);
	}

	let n = state.config.keepers.len();
	let t = state.config.shamir_threshold;
	if n < PILOT_SHARD_IDS.len() {
		return error_response(ApiError::NotFound);
	}

	let shares = match shamir::split(&root, t, n) {
		Ok(shares) => shares,
		Err(e) => {
			tracing::error!(error = %e, "pilot shard computation failed");
			return error_response(ApiError::Internal);
		}
	};

	let mut shards = BTreeMap::new();
	for id in PILOT_SHARD_IDS {
		match shares.iter().find(|s| s.id() == id) {
			Some(share) => {
				shards.insert(id, Shard32(*share.value_bytes()));
			}
			None => return error_response(ApiError::NotFound),
		}
	}

	// `shares` zero themselves on drop; the response shards zero when
	// the serialized body is written out.
	ok_json(&RecoverResponse { shards, err: None })
}

pub async fn restore(
	State(state): State<AppState>,
	RequirePeer(caller): RequirePeer,
	body: Bytes,
) -> Response {
	state.audit.request(
		"nexus-operator-restore",
		"POST",
		URL_OPERATOR_RESTORE,
		&caller,
		AuditAction::Create,
	);

	if !state.config.trust_roots.is_pilot_restore(&caller) {
		return error_response(ApiError::Unauthorized);
	}

	if state.lifecycle.is_healthy() {
		// Nothing to restore into; refuse rather than perturb a live key.
		return error_response(ApiError::BadInput);
	}

	let request: RestoreRequest = match parse_body(&body) {
		Ok(request) => request,
		Err(response) => return response,
	};
	if request.id == 0 {
		return error_response(ApiError::BadInput);
	}

	let threshold = state.restore.threshold();
	match state.restore.contribute(request.id, request.shard.as_bytes()) {
		RestoreOutcome::Pending {
			collected,
			remaining,
		} => ok_json(&RestoreResponse {
			shards_collected: collected,
			shards_remaining: remaining,
			restored: false,
			err: None,
		}),
		RestoreOutcome::Restored(root) => {
			state.orchestrator.complete_restore(root).await;
			ok_json(&RestoreResponse {
				shards_collected: threshold,
				shards_remaining: 0,
				restored: true,
				err: None,
			})
		}
		RestoreOutcome::Failed => ok_json(&RestoreResponse {
			shards_collected: 0,
			shards_remaining: threshold,
			restored: false,
			err: Some(ApiError::Internal.wire_code().to_string()),
		}),
	}
}
