// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Endpoint paths and `action` query values shared by servers and clients.

/// Versioned secret store endpoint.
pub const URL_SECRETS: &str = "/v1/store/secrets";
/// Secret metadata endpoint (versions and timestamps, no data).
pub const URL_SECRETS_METADATA: &str = "/v1/store/secrets/metadata";
/// Policy CRUD endpoint.
pub const URL_POLICIES: &str = "/v1/store/policies";
/// Operator export of the pilot shards.
pub const URL_OPERATOR_RECOVER: &str = "/v1/operator/recover";
/// Operator ingest of pilot shards into a fresh nexus.
pub const URL_OPERATOR_RESTORE: &str = "/v1/operator/restore";
/// Keeper shard endpoint (contribute and read).
pub const URL_KEEP: &str = "/v1/keep";

/// Name of the action query parameter.
pub const QUERY_ACTION: &str = "action";

/// The resource path guarding policy CRUD itself.
pub const ACL_RESOURCE_PATH: &str = "spike/system/acl";

/// Actions selectable via the `action` query parameter.
///
/// An absent or empty parameter is [`ApiAction::Default`], which means
/// "put" on the secrets endpoint, "create" on the policies endpoint, and
/// "contribute" on the keeper endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiAction {
	Default,
	Get,
	Delete,
	Undelete,
	List,
	Read,
}

impl ApiAction {
	/// Resolve the raw query value; unknown values yield `None` so the
	/// router can fall through to its 404 handler.
	pub fn from_query(value: Option<&str>) -> Option<Self> {
		match value.unwrap_or("") {
			"" => Some(ApiAction::Default),
			"get" => Some(ApiAction::Get),
			"delete" => Some(ApiAction::Delete),
			"undelete" => Some(ApiAction::Undelete),
			"list" => Some(ApiAction::List),
			"read" => Some(ApiAction::Read),
			_ => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn absent_and_empty_map_to_default() {
		assert_eq!(ApiAction::from_query(None), Some(ApiAction::Default));
		assert_eq!(ApiAction::from_query(Some("")), Some(ApiAction::Default));
	}

	#[test]
	fn known_actions_resolve() {
		assert_eq!(ApiAction::from_query(Some("get")), Some(ApiAction::Get));
		assert_eq!(ApiAction::from_query(Some("list")), Some(ApiAction::List));
		assert_eq!(ApiAction::from_query(Some("read")), Some(ApiAction::Read));
		assert_eq!(
			ApiAction::from_query(Some("undelete")),
			Some(ApiAction::Undelete)
		);
	}

	#[test]
	fn unknown_action_is_none() {
		assert_eq!(ApiAction::from_query(Some("explode")), None);
	}
}
