// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Request and response bodies for every endpoint.
//!
//! All bodies are JSON with camelCase field names. 32-byte binary fields
//! travel as standard base64 strings via [`Shard32`], which zeroes its
//! contents on drop so decoded shard material never outlives its use.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;
use zeroize::Zeroize;

use crate::policy::{Policy, PolicyPermission};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

/// A 32-byte shard carried on the wire as a standard base64 string.
///
/// Deserialization rejects anything that does not decode to exactly 32
/// bytes. The buffer is zeroed when the value is dropped.
#[derive(Clone, PartialEq, Eq)]
pub struct Shard32(pub [u8; 32]);

impl Shard32 {
	pub fn as_bytes(&self) -> &[u8; 32] {
		&self.0
	}

	pub fn is_zero(&self) -> bool {
		self.0.iter().all(|b| *b == 0)
	}
}

impl Drop for Shard32 {
	fn drop(&mut self) {
		self.0.zeroize();
	}
}

impl std::fmt::Debug for Shard32 {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str("Shard32([REDACTED])")
	}
}

impl Serialize for Shard32 {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let mut encoded = BASE64.encode(self.0);
		let result = serializer.serialize_str(&encoded);
		encoded.zeroize();
		result
	}
}

impl<'de> Deserialize<'de> for Shard32 {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let mut encoded = String::deserialize(deserializer)?;
		let decoded = BASE64.decode(encoded.as_bytes());
		encoded.zeroize();
		let mut decoded = decoded.map_err(|e| D::Error::custom(format!("invalid base64: {e}")))?;
		if decoded.len() != 32 {
			decoded.zeroize();
			return Err(D::Error::custom(format!(
				"shard must decode to 32 bytes, got {}",
				decoded.len()
			)));
		}
		let mut bytes = [0u8; 32];
		bytes.copy_from_slice(&decoded);
		decoded.zeroize();
		Ok(Shard32(bytes))
	}
}

// =============================================================================
// Secrets
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretPutRequest {
	pub path: String,
	pub data: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretPutResponse {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub err: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretGetRequest {
	pub path: String,
	#[serde(default)]
	pub version: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretGetResponse {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<HashMap<String, String>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub version: Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub err: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretDeleteRequest {
	pub path: String,
	pub versions: Vec<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretDeleteResponse {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub err: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretUndeleteRequest {
	pub path: String,
	pub versions: Vec<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretUndeleteResponse {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub err: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretListRequest {}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretListResponse {
	#[serde(default)]
	pub paths: Vec<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub err: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretMetadataRequest {
	pub path: String,
}

/// One version entry in a metadata listing; carries no secret data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretVersionInfo {
	pub version: u64,
	pub created_at: chrono::DateTime<chrono::Utc>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub deleted_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretMetadataResponse {
	#[serde(default)]
	pub versions: Vec<SecretVersionInfo>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub err: Option<String>,
}

// =============================================================================
// Policies
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyCreateRequest {
	pub name: String,
	pub spiffe_id_pattern: String,
	pub path_pattern: String,
	pub permissions: Vec<PolicyPermission>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyCreateResponse {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub policy: Option<Policy>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub err: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyGetRequest {
	pub id: Uuid,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyGetResponse {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub policy: Option<Policy>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub err: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDeleteRequest {
	pub id: Uuid,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDeleteResponse {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub err: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyListRequest {}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyListResponse {
	#[serde(default)]
	pub policies: Vec<Policy>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub err: Option<String>,
}

// =============================================================================
// Operator
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoverRequest {}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoverResponse {
	/// Pilot shards keyed by their Shamir evaluation point.
	#[serde(default)]
	pub shards: BTreeMap<u8, Shard32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub err: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreRequest {
	pub id: u8,
	pub shard: Shard32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreResponse {
	pub shards_collected: usize,
	pub shards_remaining: usize,
	pub restored: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub err: Option<String>,
}

// =============================================================================
// Keeper
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShardReadRequest {}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShardReadResponse {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub shard: Option<Shard32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub err: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShardContributeRequest {
	pub keeper_id: u8,
	pub shard: Shard32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShardContributeResponse {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub err: Option<String>,
}
