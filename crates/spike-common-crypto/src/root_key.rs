// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The root key: 32 bytes owned exclusively by nexus process memory.
//!
//! Created once at bootstrap from a cryptographically strong random
//! source, or reconstructed from a quorum of shards. The all-zero value
//! is the "locked" sentinel: while the root key is zero, every path that
//! needs decryption must fail closed.

use p256::elliptic_curve::ff::{Field, PrimeField};
use p256::Scalar;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

/// Size of the root key in bytes.
pub const ROOT_KEY_SIZE: usize = 32;

/// The 32-byte master key. Zeroed on drop; `Debug` never prints bytes.
#[derive(Clone, PartialEq)]
pub struct RootKey(Zeroizing<[u8; ROOT_KEY_SIZE]>);

impl RootKey {
	/// Generate a fresh root key from the OS CSPRNG.
	///
	/// The key is sampled as a P-256 scalar so that its big-endian
	/// serialization is always a canonical field element; threshold
	/// sharing can then treat it as a scalar without reduction.
	pub fn generate() -> Self {
		let mut scalar = Scalar::random(&mut OsRng);
		let bytes: [u8; ROOT_KEY_SIZE] = scalar.to_repr().into();
		crate::shamir::zeroize_scalar(&mut scalar);
		Self(Zeroizing::new(bytes))
	}

	/// The locked sentinel.
	pub fn zero() -> Self {
		Self(Zeroizing::new([0u8; ROOT_KEY_SIZE]))
	}

	/// Wrap raw bytes. The caller's copy should be zeroed after this.
	pub fn from_bytes(bytes: [u8; ROOT_KEY_SIZE]) -> Self {
		Self(Zeroizing::new(bytes))
	}

	/// Whether this is the locked sentinel.
	pub fn is_zero(&self) -> bool {
		self.0.iter().all(|b| *b == 0)
	}

	pub fn expose(&self) -> &[u8; ROOT_KEY_SIZE] {
		&self.0
	}
}

impl std::fmt::Debug for RootKey {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_tuple("RootKey").field(&"[REDACTED]").finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn generated_keys_are_nonzero_and_unique() {
		let a = RootKey::generate();
		let b = RootKey::generate();
		assert!(!a.is_zero());
		assert!(!b.is_zero());
		assert_ne!(a.expose(), b.expose());
	}

	#[test]
	fn zero_sentinel_is_detected() {
		assert!(RootKey::zero().is_zero());
		assert!(!RootKey::from_bytes([1u8; 32]).is_zero());
	}

	#[test]
	fn debug_does_not_leak_bytes() {
		let key = RootKey::from_bytes([0xCD; 32]);
		let rendered = format!("{key:?}");
		assert!(rendered.contains("REDACTED"));
		assert!(!rendered.contains("cd"));
		assert!(!rendered.contains("205"));
	}

	#[test]
	fn clone_is_an_independent_snapshot() {
		let key = RootKey::generate();
		let snapshot = key.clone();
		assert_eq!(key.expose(), snapshot.expose());
		drop(key);
		assert!(!snapshot.is_zero());
	}
}
