// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SPIKE operator CLI.
//!
//! Exit code 0 on success, 1 on any fatal error (missing role, decode
//! failure, transport failure). Errors go to stderr.

mod client;
mod commands;
mod config;
mod error;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commands::operator::OperatorCommands;
use commands::policy::PolicyCommands;
use commands::secret::SecretCommands;
use config::OperatorConfig;

/// SPIKE - manage secrets, policies, and disaster recovery.
#[derive(Parser, Debug)]
#[command(name = "spike", about = "SPIKE operator CLI", version)]
struct Cli {
	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
	/// Manage secrets
	#[command(subcommand)]
	Secret(SecretCommands),
	/// Manage access policies
	#[command(subcommand)]
	Policy(PolicyCommands),
	/// Disaster recovery flows
	#[command(subcommand)]
	Operator(OperatorCommands),
}

#[tokio::main]
async fn main() {
	dotenvy::dotenv().ok();

	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| "warn".into()),
		)
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.init();

	let cli = Cli::parse();

	let result = async {
		let config = OperatorConfig::from_env()?;
		match cli.command {
			Commands::Secret(command) => commands::secret::handle(&config, command).await,
			Commands::Policy(command) => commands::policy::handle(&config, command).await,
			Commands::Operator(command) => commands::operator::handle(&config, command).await,
		}
	}
	.await;

	if let Err(error) = result {
		eprintln!("Error: {error}");
		std::process::exit(1);
	}
}
