// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Input validation applied before any state is touched.

use crate::error::ApiError;

/// Longest accepted secret path, in bytes.
const MAX_PATH_LEN: usize = 512;
/// Longest accepted policy name, in bytes.
const MAX_NAME_LEN: usize = 256;

/// Validate a secret resource path.
///
/// Paths are opaque hierarchical names like `tenants/demo/db/creds`.
/// Rejected: empty, oversized, whitespace or control characters, and
/// relative traversal segments.
pub fn validate_secret_path(path: &str) -> Result<(), ApiError> {
	if path.is_empty() || path.len() > MAX_PATH_LEN {
		return Err(ApiError::BadInput);
	}
	if path
		.chars()
		.any(|c| c.is_whitespace() || c.is_control())
	{
		return Err(ApiError::BadInput);
	}
	if path.split('/').any(|segment| segment == "..") {
		return Err(ApiError::BadInput);
	}
	Ok(())
}

/// Validate a policy name.
pub fn validate_policy_name(name: &str) -> Result<(), ApiError> {
	if name.is_empty() || name.len() > MAX_NAME_LEN {
		return Err(ApiError::BadInput);
	}
	if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
		return Err(ApiError::BadInput);
	}
	Ok(())
}

/// Validate a version list for delete/undelete requests.
///
/// An empty list is rejected; `0` entries are allowed (they denote the
/// current version).
pub fn validate_version_list(versions: &[u64]) -> Result<(), ApiError> {
	if versions.is_empty() {
		return Err(ApiError::BadInput);
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn accepts_typical_paths() {
		assert!(validate_secret_path("tenants/demo/db/creds").is_ok());
		assert!(validate_secret_path("/foo").is_ok());
		assert!(validate_secret_path("a").is_ok());
	}

	#[test]
	fn rejects_empty_oversized_and_traversal() {
		assert_eq!(validate_secret_path(""), Err(ApiError::BadInput));
		assert_eq!(
			validate_secret_path(&"a".repeat(MAX_PATH_LEN + 1)),
			Err(ApiError::BadInput)
		);
		assert_eq!(validate_secret_path("a/../b"), Err(ApiError::BadInput));
		assert_eq!(validate_secret_path("has space"), Err(ApiError::BadInput));
	}

	#[test]
	fn policy_names() {
		assert!(validate_policy_name("workloads-can-read").is_ok());
		assert_eq!(validate_policy_name(""), Err(ApiError::BadInput));
		assert_eq!(validate_policy_name("bad name"), Err(ApiError::BadInput));
	}

	#[test]
	fn version_lists() {
		assert!(validate_version_list(&[0]).is_ok());
		assert!(validate_version_list(&[1, 2, 3]).is_ok());
		assert_eq!(validate_version_list(&[]), Err(ApiError::BadInput));
	}
}
