// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Secret store handlers: put, get, delete, undelete, list, metadata.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::response::Response;
use std::collections::HashMap;

use spike_common_core::api::{ApiAction, QUERY_ACTION, URL_SECRETS, URL_SECRETS_METADATA};
use spike_common_core::audit::AuditAction;
use spike_common_core::policy::PolicyPermission;
use spike_common_core::reqres::{
	SecretDeleteRequest, SecretDeleteResponse, SecretGetRequest, SecretGetResponse,
	SecretListRequest, SecretListResponse, SecretMetadataRequest, SecretMetadataResponse,
	SecretPutRequest, SecretPutResponse, SecretUndeleteRequest, SecretUndeleteResponse,
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
		Some(ApiAction::Default) => put(state, caller, body).await,
		Some(ApiAction::Get) => get(state, caller, body).await,
		Some(ApiAction::Delete) => delete(state, caller, body).await,
		Some(ApiAction::Undelete) => undelete(state, caller, body).await,
		Some(ApiAction::List) => list(state, caller, body).await,
		_ => fallback(),
	}
}

pub async fn dispatch_metadata(
	State(state): State<AppState>,
	RequirePeer(caller): RequirePeer,
	Query(params): Query<HashMap<String, String>>,
	body: Bytes,
) -> Response {
	match ApiAction::from_query(params.get(QUERY_ACTION).map(String::as_str)) {
		Some(ApiAction::Get) => metadata(state, caller, body).await,
		_ => fallback(),
	}
}

fn guard(
	state: &AppState,
	caller: &SpiffeId,
	path: &str,
	wants: &[PolicyPermission],
) -> Result<(), Response> {
	if let Err(err) = validation::validate_secret_path(path) {
		return Err(error_response(err));
	}
	if !state
		.policies
		.check(&state.config.trust_roots, caller, path, wants)
	{
		return Err(error_response(ApiError::Unauthorized));
	}
	Ok(())
}

async fn put(state: AppState, caller: SpiffeId, body: Bytes) -> Response {
	state.audit.request(
		"nexus-secret-put",
		"POST",
		URL_SECRETS,
		&caller,
		AuditAction::Create,
	);

	let request: SecretPutRequest = match parse_body(&body) {
		Ok(request) => request,
		Err(response) => return response,
	};
	if let Err(response) = guard(&state, &caller, &request.path, &[PolicyPermission::Write]) {
		return response;
	}

	let snapshot = state.secrets.put(&request.path, request.data);
	state.persist.store_secret_behind(request.path, snapshot);
	ok_json(&SecretPutResponse::default())
}

async fn get(state: AppState, caller: SpiffeId, body: Bytes) -> Response {
	state.audit.request(
		"nexus-secret-get",
		"POST",
		URL_SECRETS,
		&caller,
		AuditAction::Read,
	);

	let request: SecretGetRequest = match parse_body(&body) {
		Ok(request) => request,
		Err(response) => return response,
	};
	if let Err(response) = guard(&state, &caller, &request.path, &[PolicyPermission::Read]) {
		return response;
	}

	let version = request.version.unwrap_or(0);
	let found = match state.secrets.get(&request.path, version) {
		Ok(found) => Ok(found),
		Err(ApiError::NotFound) => {
			// Cold-start cache warm: the backing store may still hold it.
			match state.persist.load_secret(&request.path).await {
				Some(loaded) => {
					state.secrets.insert_loaded(&request.path, loaded);
					state.secrets.get(&request.path, version)
				}
				None => Err(ApiError::NotFound),
			}
		}
		Err(other) => Err(other),
	};

	match found {
		Ok(entry) => ok_json(&SecretGetResponse {
			version: Some(entry.version),
			data: Some(entry.data),
			err: None,
		}),
		Err(err) => error_response(err),
	}
}

async fn delete(state: AppState, caller: SpiffeId, body: Bytes) -> Response {
	state.audit.request(
		"nexus-secret-delete",
		"POST",
		URL_SECRETS,
		&caller,
		AuditAction::Delete,
	);

	let request: SecretDeleteRequest = match parse_body(&body) {
		Ok(request) => request,
		Err(response) => return response,
	};
	if let Err(err) = validation::validate_version_list(&request.versions) {
		return error_response(err);
	}
	if let Err(response) = guard(&state, &caller, &request.path, &[PolicyPermission::Write]) {
		return response;
	}

	match state.secrets.delete(&request.path, &request.versions) {
		Ok(snapshot) => {
			state.persist.store_secret_behind(request.path, snapshot);
			ok_json(&SecretDeleteResponse::default())
		}
		Err(err) => error_response(err),
	}
}

async fn undelete(state: AppState, caller: SpiffeId, body: Bytes) -> Response {
	state.audit.request(
		"nexus-secret-undelete",
		"POST",
		URL_SECRETS,
		&caller,
		AuditAction::Update,
	);

	let request: SecretUndeleteRequest = match parse_body(&body) {
		Ok(request) => request,
		Err(response) => return response,
	};
	if let Err(err) = validation::validate_version_list(&request.versions) {
		return error_response(err);
	}
	if let Err(response) = guard(&state, &caller, &request.path, &[PolicyPermission::Write]) {
		return response;
	}

	match state.secrets.undelete(&request.path, &request.versions) {
		Ok(snapshot) => {
			state.persist.store_secret_behind(request.path, snapshot);
			ok_json(&SecretUndeleteResponse::default())
		}
		Err(err) => error_response(err),
	}
}

async fn list(state: AppState, caller: SpiffeId, body: Bytes) -> Response {
	state.audit.request(
		"nexus-secret-list",
		"POST",
		URL_SECRETS,
		&caller,
		AuditAction::Read,
	);

	let _request: SecretListRequest = match parse_body(&body) {
		Ok(request) => request,
		Err(response) => return response,
	};
	// Listing is not path-scoped; a policy must cover the whole store.
	if !state.policies.check(
		&state.config.trust_roots,
		&caller,
		"*",
		&[PolicyPermission::List],
	) {
		return error_response(ApiError::Unauthorized);
	}

	ok_json(&SecretListResponse {
		paths: state.secrets.list_paths(),
		err: None,
	})
}

async fn metadata(state: AppState, caller: SpiffeId, body: Bytes) -> Response {
	state.audit.request(
		"nexus-secret-metadata-get",
		"POST",
		URL_SECRETS_METADATA,
		&caller,
		AuditAction::Read,
	);

	let request: SecretMetadataRequest = match parse_body(&body) {
		Ok(request) => request,
		Err(response) => return response,
	};
	if let Err(response) = guard(&state, &caller, &request.path, &[PolicyPermission::Read]) {
		return response;
	}

	match state.secrets.metadata(&request.path) {
		Ok(versions) => ok_json(&SecretMetadataResponse {
			versions,
			err: None,
		}),
		Err(err) => error_response(err),
	}
}
