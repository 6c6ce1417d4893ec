// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `(t, n)` threshold sharing of the root key over the P-256 scalar field.
//!
//! [`split`] builds a degree-`t-1` polynomial whose constant term is the
//! root key interpreted as a scalar, and evaluates it at the points
//! `1..=n`. The non-constant coefficients are sampled from a ChaCha20
//! stream seeded via HKDF-SHA256 from the root key itself, so `split` is
//! a **pure function of the root key**: the nexus recomputes identical
//! shares on every redistribution tick without persisting them anywhere.
//!
//! [`reconstruct`] is Lagrange interpolation at zero. Inside `split`, a
//! reconstruction self-check guards against arithmetic regressions; a
//! mismatch there panics, which is the only permitted abort path in the
//! workspace: it means the field arithmetic itself is broken and no
//! share may leave the process.

use hkdf::Hkdf;
use p256::elliptic_curve::ff::{Field, PrimeField};
use p256::{FieldBytes, Scalar};
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha20Rng;
use sha2::Sha256;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::root_key::RootKey;

/// Size of a serialized share value in bytes.
pub const SHARE_SIZE: usize = 32;

/// Domain separator for the deterministic coefficient sampler.
const COEFFICIENT_SEED_INFO: &[u8] = b"spike shamir coefficients v1";

/// Errors from splitting and reconstruction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShamirError {
	#[error("threshold must satisfy 1 <= t <= n <= 255, got t={t} n={n}")]
	InvalidThreshold { t: usize, n: usize },

	#[error("need at least {needed} distinct shares, got {got}")]
	InsufficientShares { needed: usize, got: usize },

	#[error("duplicate share id {0}")]
	DuplicateShareId(u8),

	#[error("share id must be nonzero")]
	ZeroShareId,

	#[error("bytes are not a canonical field scalar")]
	NonCanonicalScalar,
}

/// One share: a nonzero evaluation point and the polynomial value there.
///
/// The scalar value is zeroed when the share is dropped.
#[derive(Clone, PartialEq)]
pub struct Share {
	id: u8,
	value: Scalar,
}

impl Share {
	/// Rebuild a share from its wire form.
	pub fn new(id: u8, value_bytes: &[u8; SHARE_SIZE]) -> Result<Self, ShamirError> {
		if id == 0 {
			return Err(ShamirError::ZeroShareId);
		}
		let value = scalar_from_bytes(value_bytes)?;
		Ok(Self { id, value })
	}

	pub fn id(&self) -> u8 {
		self.id
	}

	/// The fixed 32-byte big-endian serialization of the share value.
	pub fn value_bytes(&self) -> Zeroizing<[u8; SHARE_SIZE]> {
		Zeroizing::new(self.value.to_repr().into())
	}
}

impl Drop for Share {
	fn drop(&mut self) {
		zeroize_scalar(&mut self.value);
	}
}

impl std::fmt::Debug for Share {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Share")
			.field("id", &self.id)
			.field("value", &"[REDACTED]")
			.finish()
	}
}

/// Overwrite a scalar with zero. Scalars are plain stack values, so this
/// is how share and coefficient temporaries are retired.
pub(crate) fn zeroize_scalar(scalar: &mut Scalar) {
	*scalar = Scalar::ZERO;
}

fn scalar_from_bytes(bytes: &[u8; 32]) -> Result<Scalar, ShamirError> {
	let repr = FieldBytes::from(*bytes);
	Option::<Scalar>::from(Scalar::from_repr(repr)).ok_or(ShamirError::NonCanonicalScalar)
}

/// Split `root` into `n` shares with reconstruction threshold `t`.
///
/// Deterministic: the same root key always yields the same shares. The
/// share at evaluation point `k` belongs to the keeper whose configured
/// id is `k`.
///
/// # Panics
///
/// Panics if reconstructing the freshly generated shares does not yield
/// `root` bit-for-bit. That indicates broken field arithmetic, and
/// distributing such shares would strand every future restore.
pub fn split(root: &RootKey, t: usize, n: usize) -> Result<Vec<Share>, ShamirError> {
	if t < 1 || t > n || n > 255 {
		return Err(ShamirError::InvalidThreshold { t, n });
	}

	let mut constant = scalar_from_bytes(root.expose())?;

	let mut rng = coefficient_rng(root);
	let mut coefficients: Vec<Scalar> = (0..t - 1).map(|_| Scalar::random(&mut rng)).collect();

	let shares: Vec<Share> = (1..=n as u8)
		.map(|id| {
			let x = Scalar::from(id as u64);
			// Horner evaluation, highest coefficient first.
			let mut acc = Scalar::ZERO;
			for coefficient in coefficients.iter().rev() {
				acc = acc * x + *coefficient;
			}
			let value = acc * x + constant;
			Share { id, value }
		})
		.collect();

	for coefficient in coefficients.iter_mut() {
		zeroize_scalar(coefficient);
	}
	zeroize_scalar(&mut constant);

	let recovered = reconstruct(&shares[..t], t)
		.unwrap_or_else(|e| panic!("share self-check reconstruction failed: {e}"));
	if recovered.expose() != root.expose() {
		panic!("reconstructed root key does not match input; refusing to hand out shares");
	}

	Ok(shares)
}

/// Reconstruct the root key from at least `threshold` distinct shares.
///
/// Lagrange interpolation at zero; the result is serialized 32-byte
/// big-endian. Fails on duplicate or zero evaluation points and on an
/// undersized share set.
pub fn reconstruct(shares: &[Share], threshold: usize) -> Result<RootKey, ShamirError> {
	let mut seen = [false; 256];
	for share in shares {
		if share.id == 0 {
			return Err(ShamirError::ZeroShareId);
		}
		if seen[share.id as usize] {
			return Err(ShamirError::DuplicateShareId(share.id));
		}
		seen[share.id as usize] = true;
	}
	if shares.len() < threshold || shares.is_empty() {
		return Err(ShamirError::InsufficientShares {
			needed: threshold,
			got: shares.len(),
		});
	}

	let mut secret = Scalar::ZERO;
	for (i, share) in shares.iter().enumerate() {
		let xi = Scalar::from(share.id as u64);
		let mut numerator = Scalar::ONE;
		let mut denominator = Scalar::ONE;
		for (j, other) in shares.iter().enumerate() {
			if i == j {
				continue;
			}
			let xj = Scalar::from(other.id as u64);
			numerator *= xj;
			denominator *= xj - xi;
		}
		// Distinct nonzero ids make the denominator nonzero.
		let inverse = Option::<Scalar>::from(denominator.invert())
			.ok_or(ShamirError::NonCanonicalScalar)?;
		secret += share.value * numerator * inverse;
	}

	let bytes: [u8; 32] = secret.to_repr().into();
	zeroize_scalar(&mut secret);
	Ok(RootKey::from_bytes(bytes))
}

/// The coefficient sampler: ChaCha20 seeded by HKDF-SHA256 of the root
/// key under a fixed domain separator.
fn coefficient_rng(root: &RootKey) -> ChaCha20Rng {
	let hk = Hkdf::<Sha256>::new(None, root.expose());
	let mut seed = Zeroizing::new([0u8; 32]);
	hk.expand(COEFFICIENT_SEED_INFO, seed.as_mut())
		.expect("32-byte HKDF expand is always valid");
	ChaCha20Rng::from_seed(*seed)
}
