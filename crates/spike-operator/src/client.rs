// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Thin JSON client for the nexus API.
//!
//! Sends action-parameterized POSTs and decodes either the typed
//! response or the shared error envelope. The mTLS identity is carried
//! by the external wrapper; for direct use a plain client with a
//! deadline is built here.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use uuid::Uuid;

use spike_common_core::api::{
	URL_OPERATOR_RECOVER, URL_OPERATOR_RESTORE, URL_POLICIES, URL_SECRETS, URL_SECRETS_METADATA,
};
use spike_common_core::error::ErrorEnvelope;
use spike_common_core::policy::{Policy, PolicyPermission};
use spike_common_core::reqres::{
	PolicyCreateRequest, PolicyCreateResponse, PolicyDeleteRequest, PolicyDeleteResponse,
	PolicyGetRequest, PolicyGetResponse, PolicyListRequest, PolicyListResponse, RecoverRequest,
	RecoverResponse, RestoreRequest, RestoreResponse, SecretDeleteRequest, SecretDeleteResponse,
	SecretGetRequest, SecretGetResponse, SecretListRequest, SecretListResponse,
	SecretMetadataRequest, SecretMetadataResponse, SecretPutRequest, SecretPutResponse,
	SecretVersionInfo, Shard32,
};

use crate::error::{CliError, Result};

pub struct NexusClient {
	http: reqwest::Client,
	base_url: String,
}

impl NexusClient {
	pub fn new(base_url: &str) -> Result<Self> {
		let http = reqwest::Client::builder()
			.timeout(Duration::from_secs(10))
			.build()?;
		Ok(Self {
			http,
			base_url: base_url.trim_end_matches('/').to_string(),
		})
	}

	async fn post<Req: Serialize, Res: DeserializeOwned>(
		&self,
		path: &str,
		action: Option<&str>,
		request: &Req,
	) -> Result<Res> {
		let url = match action {
			Some(action) => format!("{}{}?action={}", self.base_url, path, action),
			None => format!("{}{}", self.base_url, path),
		};

		let response = self.http.post(url).json(request).send().await?;
		let status = response.status();
		let bytes = response.bytes().await?;

		if !status.is_success() {
			let err = serde_json::from_slice::<ErrorEnvelope>(&bytes)
				.map(|envelope| envelope.err)
				.unwrap_or_else(|_| format!("status {status}"));
			return Err(CliError::Api(err));
		}

		serde_json::from_slice(&bytes)
			.map_err(|e| CliError::Api(format!("unreadable response: {e}")))
	}

	// -------------------------------------------------------------------------
	// Secrets
	// -------------------------------------------------------------------------

	pub async fn secret_put(&self, path: &str, data: HashMap<String, String>) -> Result<()> {
		let response: SecretPutResponse = self
			.post(
				URL_SECRETS,
				None,
				&SecretPutRequest {
					path: path.to_string(),
					data,
				},
			)
			.await?;
		check_envelope(response.err)
	}

	pub async fn secret_get(
		&self,
		path: &str,
		version: u64,
	) -> Result<(u64, HashMap<String, String>)> {
		let response: SecretGetResponse = self
			.post(
				URL_SECRETS,
				Some("get"),
				&SecretGetRequest {
					path: path.to_string(),
					version: Some(version),
				},
			)
			.await?;
		check_envelope(response.err)?;
		match (response.version, response.data) {
			(Some(version), Some(data)) => Ok((version, data)),
			_ => Err(CliError::Api("response carried no secret".to_string())),
		}
	}

	pub async fn secret_delete(&self, path: &str, versions: Vec<u64>) -> Result<()> {
		let response: SecretDeleteResponse = self
			.post(
				URL_SECRETS,
				Some("delete"),
				&SecretDeleteRequest {
					path: path.to_string(),
					versions,
				},
			)
			.await?;
		check_envelope(response.err)
	}

	pub async fn secret_undelete(&self, path: &str, versions: Vec<u64>) -> Result<()> {
		let response: SecretDeleteResponse = self
			.post(
				URL_SECRETS,
				Some("undelete"),
				&SecretDeleteRequest {
					path: path.to_string(),
					versions,
				},
			)
			.await?;
		check_envelope(response.err)
	}

	pub async fn secret_list(&self) -> Result<Vec<String>> {
		let response: SecretListResponse = self
			.post(URL_SECRETS, Some("list"), &SecretListRequest {})
			.await?;
		check_envelope(response.err)?;
		Ok(response.paths)
	}

	pub async fn secret_metadata(&self, path: &str) -> Result<Vec<SecretVersionInfo>> {
		let response: SecretMetadataResponse = self
			.post(
				URL_SECRETS_METADATA,
				Some("get"),
				&SecretMetadataRequest {
					path: path.to_string(),
				},
			)
			.await?;
		check_envelope(response.err)?;
		Ok(response.versions)
	}

	// -------------------------------------------------------------------------
	// Policies
	// -------------------------------------------------------------------------

	pub async fn policy_create(
		&self,
		name: &str,
		spiffe_id_pattern: &str,
		path_pattern: &str,
		permissions: Vec<PolicyPermission>,
	) -> Result<Policy> {
		let response: PolicyCreateResponse = self
			.post(
				URL_POLICIES,
				None,
				&PolicyCreateRequest {
					name: name.to_string(),
					spiffe_id_pattern: spiffe_id_pattern.to_string(),
					path_pattern: path_pattern.to_string(),
					permissions,
				},
			)
			.await?;
		check_envelope(response.err)?;
		response
			.policy
			.ok_or_else(|| CliError::Api("response carried no policy".to_string()))
	}

	pub async fn policy_get(&self, id: Uuid) -> Result<Policy> {
		let response: PolicyGetResponse =
			self.post(URL_POLICIES, Some("get"), &PolicyGetRequest { id }).await?;
		check_envelope(response.err)?;
		response
			.policy
			.ok_or_else(|| CliError::Api("response carried no policy".to_string()))
	}

	pub async fn policy_delete(&self, id: Uuid) -> Result<()> {
		let response: PolicyDeleteResponse = self
			.post(URL_POLICIES, Some("delete"), &PolicyDeleteRequest { id })
			.await?;
		check_envelope(response.err)
	}

	pub async fn policy_list(&self) -> Result<Vec<Policy>> {
		let response: PolicyListResponse = self
			.post(URL_POLICIES, Some("list"), &PolicyListRequest {})
			.await?;
		check_envelope(response.err)?;
		Ok(response.policies)
	}

	// -------------------------------------------------------------------------
	// Operator
	// -------------------------------------------------------------------------

	pub async fn recover(&self) -> Result<BTreeMap<u8, Shard32>> {
		let response: RecoverResponse = self
			.post(URL_OPERATOR_RECOVER, None, &RecoverRequest {})
			.await?;
		check_envelope(response.err)?;
		Ok(response.shards)
	}

	pub async fn restore(&self, id: u8, shard: Shard32) -> Result<RestoreResponse> {
		let response: RestoreResponse = self
			.post(URL_OPERATOR_RESTORE, None, &RestoreRequest { id, shard })
			.await?;
		if let Some(ref err) = response.err {
			return Err(CliError::Api(err.clone()));
		}
		Ok(response)
	}
}

fn check_envelope(err: Option<String>) -> Result<()> {
	match err {
		Some(err) => Err(CliError::Api(err)),
		None => Ok(()),
	}
}
