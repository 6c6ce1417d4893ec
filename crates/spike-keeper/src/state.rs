// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The one piece of keeper state: a single 32-byte shard cell.
//!
//! All-zero means "holds nothing". The cell zeroes itself on drop, and
//! reads hand out independent zeroizing copies so no caller ever aliases
//! the stored buffer.

use std::sync::Mutex;
use zeroize::Zeroizing;

pub struct ShardCell {
	shard: Mutex<Zeroizing<[u8; 32]>>,
}

impl ShardCell {
	pub fn new() -> Self {
		Self {
			shard: Mutex::new(Zeroizing::new([0u8; 32])),
		}
	}

	/// Overwrite the stored shard.
	pub fn set(&self, shard: &[u8; 32]) {
		let mut guard = self.shard.lock().expect("shard lock poisoned");
		guard.copy_from_slice(shard);
	}

	/// A copy of the stored shard, or `None` when the cell is empty
	/// (all-zero).
	pub fn read(&self) -> Option<Zeroizing<[u8; 32]>> {
		let guard = self.shard.lock().expect("shard lock poisoned");
		if guard.iter().all(|b| *b == 0) {
			return None;
		}
		Some(Zeroizing::new(**guard))
	}
}

impl Default for ShardCell {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn starts_empty() {
		assert!(ShardCell::new().read().is_none());
	}

	#[test]
	fn set_then_read_roundtrip() {
		let cell = ShardCell::new();
		cell.set(&[7u8; 32]);
		assert_eq!(*cell.read().unwrap(), [7u8; 32]);
	}

	#[test]
	fn contribute_overwrites_previous_shard() {
		let cell = ShardCell::new();
		cell.set(&[1u8; 32]);
		cell.set(&[2u8; 32]);
		assert_eq!(*cell.read().unwrap(), [2u8; 32]);
	}

	#[test]
	fn all_zero_contribution_empties_the_cell() {
		let cell = ShardCell::new();
		cell.set(&[1u8; 32]);
		cell.set(&[0u8; 32]);
		assert!(cell.read().is_none());
	}

	#[test]
	fn read_returns_an_independent_copy() {
		let cell = ShardCell::new();
		cell.set(&[9u8; 32]);
		let copy = cell.read().unwrap();
		cell.set(&[1u8; 32]);
		assert_eq!(*copy, [9u8; 32]);
	}
}
