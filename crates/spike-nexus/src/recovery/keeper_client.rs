// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Outbound shard traffic to keepers.
//!
//! Keepers are reached over mTLS; the identity-verifying client is built
//! by the external transport wrapper and handed in, or a plain client
//! with a deadline is constructed for development. A keeper answering
//! 404 on read means "holds no shard", which is a normal cold-start
//! condition, not an error. Shard buffers are zeroed as soon as the
//! response is consumed.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use zeroize::Zeroizing;

use spike_common_core::api::{QUERY_ACTION, URL_KEEP};
use spike_common_core::reqres::{
	Shard32, ShardContributeRequest, ShardContributeResponse, ShardReadRequest, ShardReadResponse,
};

#[derive(Debug, Error)]
pub enum TransportError {
	#[error("keeper request failed: {0}")]
	Http(String),

	#[error("keeper answered status {0}")]
	Status(u16),

	#[error("keeper answered an error envelope: {0}")]
	Envelope(String),
}

/// The orchestrator's view of the keeper fleet.
#[async_trait]
pub trait ShardTransport: Send + Sync + 'static {
	/// Ask a keeper for its shard. `Ok(None)` means the keeper is alive
	/// but holds nothing.
	async fn fetch_shard(
		&self,
		api_root: &str,
	) -> Result<Option<Zeroizing<[u8; 32]>>, TransportError>;

	/// Hand a keeper its shard.
	async fn send_shard(
		&self,
		api_root: &str,
		keeper_id: u8,
		shard: &[u8; 32],
	) -> Result<(), TransportError>;
}

/// HTTP implementation of [`ShardTransport`].
pub struct KeeperClient {
	http: reqwest::Client,
}

impl KeeperClient {
	/// A plain client with a per-request deadline. For anything beyond
	/// development, use [`KeeperClient::with_client`] and hand in the
	/// mTLS-configured client from the identity plane.
	pub fn new(timeout: Duration) -> Self {
		Self {
			http: reqwest::Client::builder()
				.timeout(timeout)
				.build()
				.expect("failed to build HTTP client"),
		}
	}

	/// Wrap a preconfigured (mTLS, keeper-role-verifying) client.
	pub fn with_client(http: reqwest::Client) -> Self {
		Self { http }
	}
}

fn keep_url(api_root: &str, action: Option<&str>) -> String {
	let base = api_root.trim_end_matches('/');
	match action {
		Some(action) => format!("{base}{URL_KEEP}?{QUERY_ACTION}={action}"),
		None => format!("{base}{URL_KEEP}"),
	}
}

#[async_trait]
impl ShardTransport for KeeperClient {
	async fn fetch_shard(
		&self,
		api_root: &str,
	) -> Result<Option<Zeroizing<[u8; 32]>>, TransportError> {
		let response = self
			.http
			.post(keep_url(api_root, Some("read")))
			.json(&ShardReadRequest {})
			.send()
			.await
			.map_err(|e| TransportError::Http(e.to_string()))?;

		if response.status() == reqwest::StatusCode::NOT_FOUND {
			return Ok(None);
		}
		if !response.status().is_success() {
			return Err(TransportError::Status(response.status().as_u16()));
		}

		let body: ShardReadResponse = response
			.json()
			.await
			.map_err(|e| TransportError::Http(e.to_string()))?;

		if let Some(err) = body.err {
			return Err(TransportError::Envelope(err));
		}

		// Copy out and let the response's Shard32 zero itself on drop.
		Ok(body.shard.map(|shard| Zeroizing::new(*shard.as_bytes())))
	}

	async fn send_shard(
		&self,
		api_root: &str,
		keeper_id: u8,
		shard: &[u8; 32],
	) -> Result<(), TransportError> {
		let request = ShardContributeRequest {
			keeper_id,
			shard: Shard32(*shard),
		};

		let response = self
			.http
			.post(keep_url(api_root, None))
			.json(&request)
			.send()
			.await
			.map_err(|e| TransportError::Http(e.to_string()))?;
		drop(request); // zeroes the shard copy

		if !response.status().is_success() {
			return Err(TransportError::Status(response.status().as_u16()));
		}

		let body: ShardContributeResponse = response
			.json()
			.await
			.map_err(|e| TransportError::Http(e.to_string()))?;
		if let Some(err) = body.err {
			return Err(TransportError::Envelope(err));
		}
		Ok(())
	}
}
