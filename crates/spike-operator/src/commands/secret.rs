// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `spike secret` subcommands.

use clap::{Args, Subcommand};

use crate::client::NexusClient;
use crate::commands::{parse_pairs, parse_versions};
use crate::config::OperatorConfig;
use crate::error::Result;

#[derive(Subcommand, Debug)]
pub enum SecretCommands {
	/// Store a new secret version at a path
	Put(PutArgs),
	/// Read a secret
	Get(GetArgs),
	/// Soft-delete secret versions
	Delete(VersionsArgs),
	/// Restore soft-deleted secret versions
	Undelete(VersionsArgs),
	/// List all secret paths
	List,
	/// Show version metadata for a path
	Metadata(PathArg),
}

#[derive(Args, Debug)]
pub struct PutArgs {
	/// Secret path, e.g. tenants/demo/db/creds
	pub path: String,
	/// key=value pairs
	#[arg(required = true)]
	pub pairs: Vec<String>,
}

#[derive(Args, Debug)]
pub struct GetArgs {
	pub path: String,
	/// Specific version to retrieve (0 means current)
	#[arg(short, long, default_value_t = 0)]
	pub version: u64,
}

#[derive(Args, Debug)]
pub struct VersionsArgs {
	pub path: String,
	/// Comma-separated version numbers (0 means current)
	#[arg(short, long, default_value = "0")]
	pub versions: String,
}

#[derive(Args, Debug)]
pub struct PathArg {
	pub path: String,
}

pub async fn handle(config: &OperatorConfig, command: SecretCommands) -> Result<()> {
	let client = NexusClient::new(&config.api_url)?;

	match command {
		SecretCommands::Put(args) => {
			let data = parse_pairs(&args.pairs)?;
			client.secret_put(&args.path, data).await?;
			println!("OK");
		}
		SecretCommands::Get(args) => {
			let (_, data) = client.secret_get(&args.path, args.version).await?;
			let mut keys: Vec<&String> = data.keys().collect();
			keys.sort();
			for key in keys {
				println!("{key}: {}", data[key]);
			}
		}
		SecretCommands::Delete(args) => {
			let versions = parse_versions(&args.versions)?;
			client.secret_delete(&args.path, versions).await?;
			println!("OK");
		}
		SecretCommands::Undelete(args) => {
			let versions = parse_versions(&args.versions)?;
			client.secret_undelete(&args.path, versions).await?;
			println!("OK");
		}
		SecretCommands::List => {
			for path in client.secret_list().await? {
				println!("{path}");
			}
		}
		SecretCommands::Metadata(args) => {
			for info in client.secret_metadata(&args.path).await? {
				match info.deleted_at {
					Some(deleted_at) => println!(
						"version {}  created {}  deleted {}",
						info.version,
						info.created_at.to_rfc3339(),
						deleted_at.to_rfc3339()
					),
					None => println!(
						"version {}  created {}",
						info.version,
						info.created_at.to_rfc3339()
					),
				}
			}
		}
	}

	Ok(())
}
