// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Route assembly: `(method, path, action)` dispatch.
//!
//! Each fixed path gets one POST dispatcher that switches on the
//! `action` query parameter; unknown paths and unknown actions share the
//! JSON 404 fallback. Every route except `/v1/operator/restore` is
//! gated on the Healthy lifecycle state; while the service awaits a
//! restore, restore is the only surface it exposes.

use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::post;
use axum::{Extension, Router};

use spike_common_core::api::{
	URL_OPERATOR_RECOVER, URL_OPERATOR_RESTORE, URL_POLICIES, URL_SECRETS, URL_SECRETS_METADATA,
};

use crate::http::identity::PeerIdentity;
use crate::http::response;
use crate::http::routes;
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
	let gated = Router::new()
		.route(URL_SECRETS, post(routes::secret::dispatch))
		.route(URL_SECRETS_METADATA, post(routes::secret::dispatch_metadata))
		.route(URL_POLICIES, post(routes::policy::dispatch))
		.route(URL_OPERATOR_RECOVER, post(routes::operator::recover))
		.route_layer(middleware::from_fn_with_state(
			state.clone(),
			require_healthy,
		));

	let mut router = Router::new()
		.merge(gated)
		.route(URL_OPERATOR_RESTORE, post(routes::operator::restore))
		.fallback(fallback);

	if let Some(dev_peer) = state.config.dev_peer_id.clone() {
		router = router.layer(Extension(PeerIdentity(dev_peer)));
	}

	router.with_state(state)
}

async fn require_healthy(State(state): State<AppState>, request: Request, next: Next) -> Response {
	if !state.lifecycle.is_healthy() {
		return response::not_ready();
	}
	next.run(request).await
}

async fn fallback() -> Response {
	response::fallback()
}
