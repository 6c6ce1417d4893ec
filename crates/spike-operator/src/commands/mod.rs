// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! CLI command handlers.

pub mod operator;
pub mod policy;
pub mod secret;

use crate::error::{CliError, Result};

/// Parse a `--versions` flag: `"0"` or `"1,2,3"`.
pub(crate) fn parse_versions(raw: &str) -> Result<Vec<u64>> {
	raw.split(',')
		.map(str::trim)
		.filter(|part| !part.is_empty())
		.map(|part| {
			part.parse::<u64>()
				.map_err(|_| CliError::Input(format!("{part:?} is not a version number")))
		})
		.collect::<Result<Vec<u64>>>()
		.and_then(|versions| {
			if versions.is_empty() {
				Err(CliError::Input("no versions given".to_string()))
			} else {
				Ok(versions)
			}
		})
}

/// Parse `key=value` pairs from positional arguments.
pub(crate) fn parse_pairs(pairs: &[String]) -> Result<std::collections::HashMap<String, String>> {
	let mut data = std::collections::HashMap::new();
	for pair in pairs {
		let (key, value) = pair
			.split_once('=')
			.ok_or_else(|| CliError::Input(format!("expected key=value, got {pair:?}")))?;
		if key.is_empty() {
			return Err(CliError::Input(format!("empty key in {pair:?}")));
		}
		data.insert(key.to_string(), value.to_string());
	}
	if data.is_empty() {
		return Err(CliError::Input("no key=value pairs given".to_string()));
	}
	Ok(data)
}
