// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Audit record types.
//!
//! Every request handler records exactly one entry at entry. Entries are
//! append-only; how they are drained (a background trail on the nexus, a
//! direct structured log line on keepers) is up to the service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::spiffe::SpiffeId;

/// The CRUD class of an audited request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
	Create,
	Read,
	Update,
	Delete,
}

impl fmt::Display for AuditAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			AuditAction::Create => "create",
			AuditAction::Read => "read",
			AuditAction::Update => "update",
			AuditAction::Delete => "delete",
		};
		f.write_str(s)
	}
}

/// One append-only audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
	/// Stable handler name, e.g. `nexus-secret-put`.
	pub request_name: String,
	pub method: String,
	pub path: String,
	pub caller_id: String,
	pub action: AuditAction,
	pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
	pub fn new(
		request_name: impl Into<String>,
		method: impl Into<String>,
		path: impl Into<String>,
		caller: &SpiffeId,
		action: AuditAction,
	) -> Self {
		Self {
			request_name: request_name.into(),
			method: method.into(),
			path: path.into(),
			caller_id: caller.to_string(),
			action,
			timestamp: Utc::now(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn action_display_is_snake_case() {
		assert_eq!(AuditAction::Create.to_string(), "create");
		assert_eq!(AuditAction::Delete.to_string(), "delete");
	}

	#[test]
	fn entry_captures_caller_and_timestamps() {
		let caller = SpiffeId::parse("spiffe://spike.ist/workload/app").unwrap();
		let before = Utc::now();
		let entry = AuditEntry::new("nexus-secret-get", "POST", "/v1/store/secrets", &caller, AuditAction::Read);
		assert_eq!(entry.caller_id, "spiffe://spike.ist/workload/app");
		assert_eq!(entry.action, AuditAction::Read);
		assert!(entry.timestamp >= before);
	}
}
