// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The operator shard text format.
//!
//! Exported pilot shards are written to `spike.recovery.<i>.txt` files
//! (mode 0600) whose contents are exactly `spike:<id>:<base64-32-bytes>`,
//! no trailing newline required. The same line shape is what an operator
//! pastes back during restore.

use zeroize::{Zeroize, Zeroizing};

use crate::error::ApiError;
use crate::reqres::Shard32;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

/// Leading token of every shard line.
pub const SHARD_LINE_PREFIX: &str = "spike";
/// File-name prefix of exported shard files.
pub const RECOVERY_FILE_PREFIX: &str = "spike.recovery";

/// File name for the exported shard at evaluation point `id`.
pub fn recovery_file_name(id: u8) -> String {
	format!("{RECOVERY_FILE_PREFIX}.{id}.txt")
}

/// Whether `name` looks like a previously exported shard file.
///
/// Used by cleanup before a fresh export; anything else in the recovery
/// folder is left alone.
pub fn is_recovery_file_name(name: &str) -> bool {
	name.starts_with(RECOVERY_FILE_PREFIX) && name.ends_with(".txt")
}

/// Render a shard line. The returned string zeroes itself on drop.
pub fn format_shard_line(id: u8, shard: &[u8; 32]) -> Zeroizing<String> {
	let mut encoded = BASE64.encode(shard);
	let line = Zeroizing::new(format!("{SHARD_LINE_PREFIX}:{id}:{encoded}"));
	encoded.zeroize();
	line
}

/// Parse a `spike:<id>:<base64>` shard line.
///
/// The decoded payload must be exactly 32 bytes. All intermediate buffers
/// are zeroed on every exit path.
pub fn parse_shard_line(line: &str) -> Result<(u8, Shard32), ApiError> {
	let mut parts = line.trim_end_matches(['\r', '\n']).splitn(3, ':');

	let prefix = parts.next().unwrap_or("");
	let id_part = parts.next().ok_or(ApiError::BadInput)?;
	let encoded = parts.next().ok_or(ApiError::BadInput)?;

	if prefix != SHARD_LINE_PREFIX {
		return Err(ApiError::BadInput);
	}

	let id: u8 = id_part.parse().map_err(|_| ApiError::BadInput)?;
	if id == 0 {
		return Err(ApiError::BadInput);
	}

	let mut decoded = BASE64.decode(encoded).map_err(|_| ApiError::BadInput)?;
	if decoded.len() != 32 {
		decoded.zeroize();
		return Err(ApiError::BadInput);
	}

	let mut bytes = [0u8; 32];
	bytes.copy_from_slice(&decoded);
	decoded.zeroize();

	Ok((id, Shard32(bytes)))
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn file_names() {
		assert_eq!(recovery_file_name(1), "spike.recovery.1.txt");
		assert!(is_recovery_file_name("spike.recovery.2.txt"));
		assert!(!is_recovery_file_name("spike.recovery.2.bak"));
		assert!(!is_recovery_file_name("notes.txt"));
	}

	#[test]
	fn line_roundtrip() {
		let shard = [0x5A; 32];
		let line = format_shard_line(2, &shard);
		let (id, parsed) = parse_shard_line(&line).unwrap();
		assert_eq!(id, 2);
		assert_eq!(parsed.as_bytes(), &shard);
	}

	#[test]
	fn trailing_newline_is_tolerated() {
		let line = format!("{}\n", &*format_shard_line(1, &[1u8; 32]));
		assert!(parse_shard_line(&line).is_ok());
	}

	#[test]
	fn rejects_malformed_lines() {
		assert_eq!(parse_shard_line(""), Err(ApiError::BadInput));
		assert_eq!(parse_shard_line("spike:1"), Err(ApiError::BadInput));
		assert_eq!(parse_shard_line("vault:1:AAAA"), Err(ApiError::BadInput));
		assert_eq!(parse_shard_line("spike:zero:AAAA"), Err(ApiError::BadInput));
		assert_eq!(parse_shard_line("spike:1:!!!"), Err(ApiError::BadInput));
	}

	#[test]
	fn rejects_zero_id_and_short_payload() {
		let short = BASE64.encode([1u8; 16]);
		assert_eq!(
			parse_shard_line(&format!("spike:1:{short}")),
			Err(ApiError::BadInput)
		);
		let full = BASE64.encode([1u8; 32]);
		assert_eq!(
			parse_shard_line(&format!("spike:0:{full}")),
			Err(ApiError::BadInput)
		);
	}

	proptest! {
		#[test]
		fn roundtrip_any_shard(id in 1u8..=255, bytes in proptest::array::uniform32(any::<u8>())) {
			let line = format_shard_line(id, &bytes);
			let (parsed_id, parsed) = parse_shard_line(&line).unwrap();
			prop_assert_eq!(parsed_id, id);
			prop_assert_eq!(parsed.as_bytes(), &bytes);
		}
	}
}
