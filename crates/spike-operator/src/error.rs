// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! CLI error type. Every variant is fatal: `main` prints it to stderr
//! and exits 1.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
	#[error("configuration error: {0}")]
	Config(String),

	#[error("you need the {0} role to use this command")]
	MissingRole(&'static str),

	#[error("transport error: {0}")]
	Transport(#[from] reqwest::Error),

	#[error("nexus answered: {0}")]
	Api(String),

	#[error("invalid input: {0}")]
	Input(String),

	#[error(transparent)]
	Io(#[from] std::io::Error),
}
