// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! AEAD sealing for everything the nexus hands to its backing store.
//!
//! Uses AES-256-GCM. The data key is not the root key itself but an
//! HKDF-SHA256 derivation of it, so the root key never touches a cipher
//! context directly. A zero root key means the service is locked, and
//! building a cipher from it fails closed.

use aes_gcm::{
	aead::{Aead, KeyInit, OsRng},
	Aes256Gcm, Key, Nonce,
};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::root_key::RootKey;

/// Size of the derived AEAD key in bytes.
pub const KEY_SIZE: usize = 32;
/// Size of the AES-GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;

/// Domain separator for the at-rest data key derivation.
const DATA_KEY_INFO: &[u8] = b"spike backing store aead key v1";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CipherError {
	/// The root key is the zero sentinel; decryption-dependent paths
	/// must not proceed.
	#[error("root key is locked")]
	LockedRootKey,

	#[error("encryption failed: {0}")]
	Encryption(String),

	#[error("decryption failed: {0}")]
	Decryption(String),

	#[error("sealed blob is malformed")]
	MalformedBlob,
}

/// Ciphertext with its nonce, as stored in the backing KV.
#[derive(Debug, Clone)]
pub struct SealedBlob {
	pub nonce: [u8; NONCE_SIZE],
	pub ciphertext: Vec<u8>,
}

impl SealedBlob {
	/// Flatten to `nonce || ciphertext` for storage.
	pub fn to_bytes(&self) -> Vec<u8> {
		let mut out = Vec::with_capacity(NONCE_SIZE + self.ciphertext.len());
		out.extend_from_slice(&self.nonce);
		out.extend_from_slice(&self.ciphertext);
		out
	}

	/// Parse a stored `nonce || ciphertext` buffer.
	pub fn from_bytes(bytes: &[u8]) -> Result<Self, CipherError> {
		if bytes.len() < NONCE_SIZE {
			return Err(CipherError::MalformedBlob);
		}
		let mut nonce = [0u8; NONCE_SIZE];
		nonce.copy_from_slice(&bytes[..NONCE_SIZE]);
		Ok(Self {
			nonce,
			ciphertext: bytes[NONCE_SIZE..].to_vec(),
		})
	}
}

/// An AEAD context derived from the current root key.
///
/// Cheap to construct; callers build one per operation from a root-key
/// snapshot rather than caching it across key replacement.
pub struct RootCipher {
	key: Zeroizing<[u8; KEY_SIZE]>,
}

impl RootCipher {
	/// Derive the data key from `root`. Fails closed on the zero key.
	pub fn new(root: &RootKey) -> Result<Self, CipherError> {
		if root.is_zero() {
			return Err(CipherError::LockedRootKey);
		}
		let hk = Hkdf::<Sha256>::new(None, root.expose());
		let mut key = Zeroizing::new([0u8; KEY_SIZE]);
		hk.expand(DATA_KEY_INFO, key.as_mut())
			.expect("32-byte HKDF expand is always valid");
		Ok(Self { key })
	}

	/// Encrypt `plaintext` under a fresh random nonce.
	pub fn seal(&self, plaintext: &[u8]) -> Result<SealedBlob, CipherError> {
		let key = Key::<Aes256Gcm>::from_slice(self.key.as_ref());
		let cipher = Aes256Gcm::new(key);

		let mut nonce_bytes = [0u8; NONCE_SIZE];
		OsRng.fill_bytes(&mut nonce_bytes);
		let nonce = Nonce::from_slice(&nonce_bytes);

		let ciphertext = cipher
			.encrypt(nonce, plaintext)
			.map_err(|e| CipherError::Encryption(e.to_string()))?;

		Ok(SealedBlob {
			nonce: nonce_bytes,
			ciphertext,
		})
	}

	/// Decrypt and authenticate a sealed blob.
	pub fn open(&self, blob: &SealedBlob) -> Result<Zeroizing<Vec<u8>>, CipherError> {
		let key = Key::<Aes256Gcm>::from_slice(self.key.as_ref());
		let cipher = Aes256Gcm::new(key);
		let nonce = Nonce::from_slice(&blob.nonce);

		let plaintext = cipher
			.decrypt(nonce, blob.ciphertext.as_slice())
			.map_err(|e| CipherError::Decryption(e.to_string()))?;

		Ok(Zeroizing::new(plaintext))
	}
}

impl std::fmt::Debug for RootCipher {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RootCipher")
			.field("key", &"[REDACTED]")
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn cipher() -> RootCipher {
		RootCipher::new(&RootKey::generate()).unwrap()
	}

	#[test]
	fn seal_open_roundtrip() {
		let cipher = cipher();
		let sealed = cipher.seal(b"tenant credentials").unwrap();
		let opened = cipher.open(&sealed).unwrap();
		assert_eq!(opened.as_slice(), b"tenant credentials");
	}

	#[test]
	fn zero_root_key_fails_closed() {
		let result = RootCipher::new(&RootKey::zero());
		assert_eq!(result.err(), Some(CipherError::LockedRootKey));
	}

	#[test]
	fn tampered_ciphertext_is_rejected() {
		let cipher = cipher();
		let mut sealed = cipher.seal(b"payload").unwrap();
		sealed.ciphertext[0] ^= 0xFF;
		assert!(matches!(
			cipher.open(&sealed),
			Err(CipherError::Decryption(_))
		));
	}

	#[test]
	fn wrong_root_key_is_rejected() {
		let sealed = cipher().seal(b"payload").unwrap();
		assert!(cipher().open(&sealed).is_err());
	}

	#[test]
	fn same_root_key_yields_the_same_data_key() {
		let root = RootKey::generate();
		let sealed = RootCipher::new(&root).unwrap().seal(b"payload").unwrap();
		let opened = RootCipher::new(&root).unwrap().open(&sealed).unwrap();
		assert_eq!(opened.as_slice(), b"payload");
	}

	#[test]
	fn blob_bytes_roundtrip_and_truncation() {
		let cipher = cipher();
		let sealed = cipher.seal(b"x").unwrap();
		let bytes = sealed.to_bytes();
		let parsed = SealedBlob::from_bytes(&bytes).unwrap();
		assert_eq!(parsed.nonce, sealed.nonce);
		assert_eq!(parsed.ciphertext, sealed.ciphertext);

		assert_eq!(
			SealedBlob::from_bytes(&bytes[..NONCE_SIZE - 1]).err(),
			Some(CipherError::MalformedBlob)
		);
	}

	#[test]
	fn debug_does_not_leak_key() {
		assert!(format!("{:?}", cipher()).contains("REDACTED"));
	}

	proptest! {
		#![proptest_config(ProptestConfig::with_cases(32))]

		#[test]
		fn roundtrip_arbitrary_payloads(payload in proptest::collection::vec(any::<u8>(), 0..4096)) {
			let cipher = cipher();
			let sealed = cipher.seal(&payload).unwrap();
			let opened = cipher.open(&sealed).unwrap();
			prop_assert_eq!(opened.as_slice(), payload.as_slice());
		}

		#[test]
		fn nonces_never_repeat_across_seals(payload in proptest::collection::vec(any::<u8>(), 1..256)) {
			let cipher = cipher();
			let first = cipher.seal(&payload).unwrap();
			let second = cipher.seal(&payload).unwrap();
			prop_assert_ne!(first.nonce, second.nonce);
			prop_assert_ne!(first.ciphertext, second.ciphertext);
		}
	}
}
