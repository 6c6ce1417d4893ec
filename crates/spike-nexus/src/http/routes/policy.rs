// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Policy CRUD handlers.
//!
//! Policy management is itself policy-gated: unless the caller is a
//! pilot, a policy must grant it the relevant permission on the system
//! ACL resource path.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::response::Response;
use std::collections::HashMap;

use spike_common_core::api::{ApiAction, ACL_RESOURCE_PATH, QUERY_ACTION, URL_POLICIES};
use spike_common_core::audit::AuditAction;
use spike_common_core::policy::{PolicyError, PolicyPermission};
use spike_common_core::reqres::{
	PolicyCreateRequest, PolicyCreateResponse, PolicyDeleteRequest, PolicyDeleteResponse,
	PolicyGetRequest, PolicyGetResponse, PolicyListRequest, PolicyListResponse,
};
use spike_common_core::spiffe::SpiffeId;
use spike_common_core::{validation, ApiError};

use crate::http::identity::RequirePeer;
use crate::http::response::{error_response, fallback, ok_json};
use crate::http::routes::parse_body;
use crate::AppState;

pub async fn dispatch(
	State(state): State<AppState>,
	RequirePeer(caller): RequirePeer,
	Query(params): Query<HashMap<String, String>>,
	body: Bytes,
) -> Response {
	match ApiAction::from_query(params.get(QUERY_ACTION).map(String::as_str)) {
		Some(ApiAction::Default) => create(state, caller, body).await,
		Some(ApiAction::Get) => get(state, caller, body).await,
		Some(ApiAction::Delete) => delete(state, caller, body).await,
		Some(ApiAction::List) => list(state, caller, body).await,
		_ => fallback(),
	}
}

fn guard(state: &AppState, caller: &SpiffeId, wants: &[PolicyPermission]) -> Result<(), Response> {
	if !state
		.policies
		.check(&state.config.trust_roots, caller, ACL_RESOURCE_PATH, wants)
	{
		return Err(error_response(ApiError::Unauthorized));
	}
	Ok(())
}

fn map_policy_error(err: PolicyError) -> Response {
	match err {
		PolicyError::NotFound => error_response(ApiError::NotFound),
		PolicyError::AlreadyExists => error_response(ApiError::AlreadyExists),
		PolicyError::Invalid(_) => error_response(ApiError::Invalid),
	}
}

async fn create(state: AppState, caller: SpiffeId, body: Bytes) -> Response {
	state.audit.request(
		"nexus-policy-create",
		"POST",
		URL_POLICIES,
		&caller,
		AuditAction::Create,
	);

	let request: PolicyCreateRequest = match parse_body(&body) {
		Ok(request) => request,
		Err(response) => return response,
	};
	if let Err(err) = validation::validate_policy_name(&request.name) {
		return error_response(err);
	}
	if let Err(response) = guard(&state, &caller, &[PolicyPermission::Write]) {
		return response;
	}

	match state.policies.create(
		&request.name,
		&request.spiffe_id_pattern,
		&request.path_pattern,
		request.permissions,
	) {
		Ok(policy) => {
			state.persist.store_policy_behind(policy.clone());
			ok_json(&PolicyCreateResponse {
				policy: Some(policy),
				err: None,
			})
		}
		Err(err) => map_policy_error(err),
	}
}

async fn get(state: AppState, caller: SpiffeId, body: Bytes) -> Response {
	state.audit.request(
		"nexus-policy-get",
		"POST",
		URL_POLICIES,
		&caller,
		AuditAction::Read,
	);

	let request: PolicyGetRequest = match parse_body(&body) {
		Ok(request) => request,
		Err(response) => return response,
	};
	if let Err(response) = guard(&state, &caller, &[PolicyPermission::Read]) {
		return response;
	}

	let policy = match state.policies.get(&request.id) {
		Some(policy) => Some(policy),
		// In-memory miss: fall back to the backing mirror and warm the
		// cache.
		None => match state.persist.load_policy(&request.id).await {
			Some(loaded) => {
				state.policies.insert(loaded.clone());
				Some(loaded)
			}
			None => None,
		},
	};

	match policy {
		Some(policy) => ok_json(&PolicyGetResponse {
			policy: Some(policy),
			err: None,
		}),
		None => error_response(ApiError::NotFound),
	}
}

async fn delete(state: AppState, caller: SpiffeId, body: Bytes) -> Response {
	state.audit.request(
		"nexus-policy-delete",
		"POST",
		URL_POLICIES,
		&caller,
		AuditAction::Delete,
	);

	let request: PolicyDeleteRequest = match parse_body(&body) {
		Ok(request) => request,
		Err(response) => return response,
	};
	if let Err(response) = guard(&state, &caller, &[PolicyPermission::Write]) {
		return response;
	}

	match state.policies.delete(&request.id) {
		Ok(()) => {
			state.persist.delete_policy_behind(request.id);
			ok_json(&PolicyDeleteResponse::default())
		}
		Err(err) => map_policy_error(err),
	}
}

async fn list(state: AppState, caller: SpiffeId, body: Bytes) -> Response {
	state.audit.request(
		"nexus-policy-list",
		"POST",
		URL_POLICIES,
		&caller,
		AuditAction::Read,
	);

	let _request: PolicyListRequest = match parse_body(&body) {
		Ok(request) => request,
		Err(response) => return response,
	};
	if let Err(response) = guard(&state, &caller, &[PolicyPermission::List]) {
		return response;
	}

	ok_json(&PolicyListResponse {
		policies: state.policies.list(),
		err: None,
	})
}
