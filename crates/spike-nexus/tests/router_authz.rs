// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Router-level authorization and dispatch tests, run against the real
//! router with identities injected the way the transport wrapper would.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::Router;
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;
use zeroize::Zeroizing;

use spike_common_core::spiffe::{SpiffeId, TrustRoots};
use spike_nexus::config::NexusConfig;
use spike_nexus::http::identity::PeerIdentity;
use spike_nexus::persist::MemoryBackend;
use spike_nexus::recovery::{ShardTransport, TransportError};
use spike_nexus::state::LifecycleState;
use spike_nexus::{create_app_state, create_router, AppState};

const PILOT: &str = "spiffe://spike.ist/spike/pilot/role/superuser";
const WORKLOAD: &str = "spiffe://x/app";

struct NullTransport;

#[async_trait]
impl ShardTransport for NullTransport {
	async fn fetch_shard(
		&self,
		_api_root: &str,
	) -> Result<Option<Zeroizing<[u8; 32]>>, TransportError> {
		Ok(None)
	}

	async fn send_shard(
		&self,
		_api_root: &str,
		_keeper_id: u8,
		_shard: &[u8; 32],
	) -> Result<(), TransportError> {
		Ok(())
	}
}

fn test_config(max_secret_versions: usize) -> NexusConfig {
	NexusConfig {
		host: "127.0.0.1".to_string(),
		port: 0,
		max_secret_versions,
		shamir_threshold: 2,
		keepers: BTreeMap::from([
			(1, "https://keeper-1:8443".to_string()),
			(2, "https://keeper-2:8443".to_string()),
			(3, "https://keeper-3:8443".to_string()),
		]),
		database_operation_timeout: Duration::from_millis(500),
		keeper_update_interval: Duration::from_secs(300),
		bootstrap_generate: true,
		trust_roots: TrustRoots::single("spike.ist"),
		dev_peer_id: None,
	}
}

async fn healthy_state(max_secret_versions: usize) -> (AppState, Router) {
	let state = create_app_state(
		test_config(max_secret_versions),
		Arc::new(MemoryBackend::new()),
		Arc::new(NullTransport),
	);
	assert_eq!(
		state.orchestrator.bootstrap().await,
		LifecycleState::Healthy
	);
	let router = create_router(state.clone());
	(state, router)
}

fn post(path_and_query: &str, peer: Option<&str>, body: serde_json::Value) -> Request<Body> {
	let mut builder = Request::builder()
		.method("POST")
		.uri(path_and_query)
		.header("content-type", "application/json");
	if let Some(peer) = peer {
		builder = builder.extension(PeerIdentity(SpiffeId::parse(peer).unwrap()));
	}
	builder.body(Body::from(body.to_string())).unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
	let bytes = response.into_body().collect().await.unwrap().to_bytes();
	serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn missing_identity_is_unauthorized() {
	let (_, router) = healthy_state(10).await;
	let response = router
		.oneshot(post(
			"/v1/store/secrets?action=get",
			None,
			serde_json::json!({"path": "/foo"}),
		))
		.await
		.unwrap();

	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
	assert_eq!(json_body(response).await, serde_json::json!({"err": "unauthorized"}));
}

#[tokio::test]
async fn policy_denial_returns_401_envelope() {
	let (_, router) = healthy_state(10).await;
	let response = router
		.oneshot(post(
			"/v1/store/secrets?action=get",
			Some(WORKLOAD),
			serde_json::json!({"path": "/foo"}),
		))
		.await
		.unwrap();

	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
	assert_eq!(json_body(response).await, serde_json::json!({"err": "unauthorized"}));
}

#[tokio::test]
async fn pilot_put_then_get_roundtrip() {
	let (_, router) = healthy_state(10).await;

	let put = router
		.clone()
		.oneshot(post(
			"/v1/store/secrets",
			Some(PILOT),
			serde_json::json!({
				"path": "/tenants/demo/db/creds",
				"data": {"username": "SPIKE", "password": "SPIKE_Rocks"}
			}),
		))
		.await
		.unwrap();
	assert_eq!(put.status(), StatusCode::OK);

	let get = router
		.clone()
		.oneshot(post(
			"/v1/store/secrets?action=get",
			Some(PILOT),
			serde_json::json!({"path": "/tenants/demo/db/creds", "version": 0}),
		))
		.await
		.unwrap();
	assert_eq!(get.status(), StatusCode::OK);
	let body = json_body(get).await;
	assert_eq!(body["data"]["username"], "SPIKE");
	assert_eq!(body["data"]["password"], "SPIKE_Rocks");
	assert_eq!(body["version"], 1);

	let metadata = router
		.oneshot(post(
			"/v1/store/secrets/metadata?action=get",
			Some(PILOT),
			serde_json::json!({"path": "/tenants/demo/db/creds"}),
		))
		.await
		.unwrap();
	assert_eq!(metadata.status(), StatusCode::OK);
	assert_eq!(json_body(metadata).await["versions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn policies_grant_scoped_access_to_workloads() {
	let (_, router) = healthy_state(10).await;

	let create = router
		.clone()
		.oneshot(post(
			"/v1/store/policies",
			Some(PILOT),
			serde_json::json!({
				"name": "app-reads-db",
				"spiffeIdPattern": "spiffe://x/app",
				"pathPattern": "db/creds",
				"permissions": ["read"]
			}),
		))
		.await
		.unwrap();
	assert_eq!(create.status(), StatusCode::OK);

	router
		.clone()
		.oneshot(post(
			"/v1/store/secrets",
			Some(PILOT),
			serde_json::json!({"path": "db/creds", "data": {"k": "v"}}),
		))
		.await
		.unwrap();

	// Granted: read on the matching path.
	let allowed = router
		.clone()
		.oneshot(post(
			"/v1/store/secrets?action=get",
			Some(WORKLOAD),
			serde_json::json!({"path": "db/creds"}),
		))
		.await
		.unwrap();
	assert_eq!(allowed.status(), StatusCode::OK);

	// Denied: write was never granted.
	let write = router
		.clone()
		.oneshot(post(
			"/v1/store/secrets",
			Some(WORKLOAD),
			serde_json::json!({"path": "db/creds", "data": {"k": "v2"}}),
		))
		.await
		.unwrap();
	assert_eq!(write.status(), StatusCode::UNAUTHORIZED);

	// Denied: the pattern is anchored, a sibling path does not match.
	let sibling = router
		.oneshot(post(
			"/v1/store/secrets?action=get",
			Some(WORKLOAD),
			serde_json::json!({"path": "db/creds2"}),
		))
		.await
		.unwrap();
	assert_eq!(sibling.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn version_cap_evicts_oldest_versions() {
	let (_, router) = healthy_state(3).await;

	for i in 1..=5 {
		let put = router
			.clone()
			.oneshot(post(
				"/v1/store/secrets",
				Some(PILOT),
				serde_json::json!({"path": "p", "data": {"v": i.to_string()}}),
			))
			.await
			.unwrap();
		assert_eq!(put.status(), StatusCode::OK);
	}

	let metadata = router
		.clone()
		.oneshot(post(
			"/v1/store/secrets/metadata?action=get",
			Some(PILOT),
			serde_json::json!({"path": "p"}),
		))
		.await
		.unwrap();
	let versions = json_body(metadata).await["versions"]
		.as_array()
		.unwrap()
		.iter()
		.map(|v| v["version"].as_u64().unwrap())
		.collect::<Vec<_>>();
	assert_eq!(versions, vec![3, 4, 5]);

	let evicted = router
		.oneshot(post(
			"/v1/store/secrets?action=get",
			Some(PILOT),
			serde_json::json!({"path": "p", "version": 1}),
		))
		.await
		.unwrap();
	assert_eq!(evicted.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_undelete_roundtrip() {
	let (_, router) = healthy_state(10).await;

	for value in ["one", "two"] {
		router
			.clone()
			.oneshot(post(
				"/v1/store/secrets",
				Some(PILOT),
				serde_json::json!({"path": "p", "data": {"v": value}}),
			))
			.await
			.unwrap();
	}

	let delete = router
		.clone()
		.oneshot(post(
			"/v1/store/secrets?action=delete",
			Some(PILOT),
			serde_json::json!({"path": "p", "versions": [0]}),
		))
		.await
		.unwrap();
	assert_eq!(delete.status(), StatusCode::OK);

	let current = router
		.clone()
		.oneshot(post(
			"/v1/store/secrets?action=get",
			Some(PILOT),
			serde_json::json!({"path": "p"}),
		))
		.await
		.unwrap();
	// Version 2 is soft-deleted; current resolves to version 1.
	assert_eq!(json_body(current).await["version"], 1);

	let undelete = router
		.clone()
		.oneshot(post(
			"/v1/store/secrets?action=undelete",
			Some(PILOT),
			serde_json::json!({"path": "p", "versions": [0]}),
		))
		.await
		.unwrap();
	assert_eq!(undelete.status(), StatusCode::OK);

	let restored = router
		.oneshot(post(
			"/v1/store/secrets?action=get",
			Some(PILOT),
			serde_json::json!({"path": "p"}),
		))
		.await
		.unwrap();
	assert_eq!(json_body(restored).await["version"], 2);
}

#[tokio::test]
async fn duplicate_policy_name_conflicts() {
	let (_, router) = healthy_state(10).await;
	let request = serde_json::json!({
		"name": "p1",
		"spiffeIdPattern": "*",
		"pathPattern": "*",
		"permissions": ["read"]
	});

	let first = router
		.clone()
		.oneshot(post("/v1/store/policies", Some(PILOT), request.clone()))
		.await
		.unwrap();
	assert_eq!(first.status(), StatusCode::OK);

	let second = router
		.oneshot(post("/v1/store/policies", Some(PILOT), request))
		.await
		.unwrap();
	assert_eq!(second.status(), StatusCode::CONFLICT);
	assert_eq!(
		json_body(second).await,
		serde_json::json!({"err": "already_exists"})
	);
}

#[tokio::test]
async fn invalid_policy_regex_is_unprocessable() {
	let (_, router) = healthy_state(10).await;
	let response = router
		.oneshot(post(
			"/v1/store/policies",
			Some(PILOT),
			serde_json::json!({
				"name": "broken",
				"spiffeIdPattern": "[unclosed",
				"pathPattern": "*",
				"permissions": ["read"]
			}),
		))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn unknown_action_and_path_fall_back_to_404() {
	let (_, router) = healthy_state(10).await;

	let bad_action = router
		.clone()
		.oneshot(post(
			"/v1/store/secrets?action=explode",
			Some(PILOT),
			serde_json::json!({}),
		))
		.await
		.unwrap();
	assert_eq!(bad_action.status(), StatusCode::NOT_FOUND);

	let bad_path = router
		.oneshot(post("/v1/unknown", Some(PILOT), serde_json::json!({})))
		.await
		.unwrap();
	assert_eq!(bad_path.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_json_is_bad_input() {
	let (_, router) = healthy_state(10).await;
	let request = Request::builder()
		.method("POST")
		.uri("/v1/store/secrets")
		.header("content-type", "application/json")
		.extension(PeerIdentity(SpiffeId::parse(PILOT).unwrap()))
		.body(Body::from("{not json"))
		.unwrap();
	let response = router.oneshot(request).await.unwrap();
	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	assert_eq!(json_body(response).await, serde_json::json!({"err": "bad_input"}));
}

#[tokio::test]
async fn recover_requires_the_recover_role() {
	let (_, router) = healthy_state(10).await;

	// Even the pilot superuser lacks the dedicated recover role.
	let as_pilot = router
		.clone()
		.oneshot(post("/v1/operator/recover", Some(PILOT), serde_json::json!({})))
		.await
		.unwrap();
	assert_eq!(as_pilot.status(), StatusCode::UNAUTHORIZED);

	let as_recover = router
		.oneshot(post(
			"/v1/operator/recover",
			Some("spiffe://spike.ist/spike/pilot/role/recover"),
			serde_json::json!({}),
		))
		.await
		.unwrap();
	assert_eq!(as_recover.status(), StatusCode::OK);
	let body = json_body(as_recover).await;
	assert_eq!(body["shards"].as_object().unwrap().len(), 2);
}

#[tokio::test]
async fn locked_service_exposes_only_restore() {
	let state = create_app_state(
		NexusConfig {
			bootstrap_generate: false,
			..test_config(10)
		},
		Arc::new(MemoryBackend::new()),
		Arc::new(NullTransport),
	);
	assert_eq!(
		state.orchestrator.bootstrap().await,
		LifecycleState::AwaitingRestore
	);
	let router = create_router(state);

	let secrets = router
		.clone()
		.oneshot(post(
			"/v1/store/secrets?action=get",
			Some(PILOT),
			serde_json::json!({"path": "p"}),
		))
		.await
		.unwrap();
	assert_eq!(secrets.status(), StatusCode::SERVICE_UNAVAILABLE);

	let recover = router
		.clone()
		.oneshot(post(
			"/v1/operator/recover",
			Some("spiffe://spike.ist/spike/pilot/role/recover"),
			serde_json::json!({}),
		))
		.await
		.unwrap();
	assert_eq!(recover.status(), StatusCode::SERVICE_UNAVAILABLE);

	// Restore stays reachable (and enforces its own role).
	let restore = router
		.oneshot(post(
			"/v1/operator/restore",
			Some(PILOT),
			serde_json::json!({"id": 1, "shard": "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA="}),
		))
		.await
		.unwrap();
	assert_eq!(restore.status(), StatusCode::UNAUTHORIZED);
}
