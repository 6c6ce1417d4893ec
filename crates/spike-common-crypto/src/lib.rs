// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Key material lifecycle primitives for SPIKE.
//!
//! - [`RootKey`]: the 32-byte master key; zeroed on drop, never logged
//! - [`shamir`]: deterministic `(t, n)` threshold sharing over the P-256
//!   scalar field
//! - [`cipher`]: AES-256-GCM sealing for everything the nexus persists,
//!   keyed by a derivation of the root key
//!
//! Every buffer in this crate that ever holds key, share, or shard bytes
//! is zeroed on all exit paths. That is a correctness requirement of the
//! custodian protocol, not an optimization.

pub mod cipher;
pub mod root_key;
pub mod shamir;

pub use cipher::{CipherError, RootCipher, SealedBlob};
pub use root_key::{RootKey, ROOT_KEY_SIZE};
pub use shamir::{Share, ShamirError, SHARE_SIZE};
