// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `spike policy` subcommands.

use clap::{Args, Subcommand};
use uuid::Uuid;

use spike_common_core::policy::PolicyPermission;

use crate::client::NexusClient;
use crate::config::OperatorConfig;
use crate::error::{CliError, Result};

#[derive(Subcommand, Debug)]
pub enum PolicyCommands {
	/// Create an access policy
	Create(CreateArgs),
	/// Show one policy
	Get(IdArg),
	/// Delete a policy
	Delete(IdArg),
	/// List all policies
	List,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
	/// Unique policy name
	pub name: String,
	/// Identity pattern: * or an anchored regex
	#[arg(long = "spiffe-id-pattern")]
	pub spiffe_id_pattern: String,
	/// Path pattern: * or an anchored regex
	#[arg(long = "path-pattern")]
	pub path_pattern: String,
	/// Comma-separated permissions: read,write,list,super
	#[arg(long)]
	pub permissions: String,
}

#[derive(Args, Debug)]
pub struct IdArg {
	pub id: Uuid,
}

fn parse_permissions(raw: &str) -> Result<Vec<PolicyPermission>> {
	raw.split(',')
		.map(str::trim)
		.filter(|part| !part.is_empty())
		.map(|part| match part {
			"read" => Ok(PolicyPermission::Read),
			"write" => Ok(PolicyPermission::Write),
			"list" => Ok(PolicyPermission::List),
			"super" => Ok(PolicyPermission::Super),
			other => Err(CliError::Input(format!("unknown permission {other:?}"))),
		})
		.collect()
}

fn print_policy(policy: &spike_common_core::policy::Policy) {
	let permissions: Vec<String> = policy
		.permissions
		.iter()
		.map(|p| format!("{p:?}").to_lowercase())
		.collect();
	println!(
		"{}  {}  id={}  path={}  permissions={}",
		policy.id,
		policy.name,
		policy.spiffe_id_pattern,
		policy.path_pattern,
		permissions.join(",")
	);
}

pub async fn handle(config: &OperatorConfig, command: PolicyCommands) -> Result<()> {
	let client = NexusClient::new(&config.api_url)?;

	match command {
		PolicyCommands::Create(args) => {
			let permissions = parse_permissions(&args.permissions)?;
			let policy = client
				.policy_create(
					&args.name,
					&args.spiffe_id_pattern,
					&args.path_pattern,
					permissions,
				)
				.await?;
			println!("created policy {}", policy.id);
		}
		PolicyCommands::Get(args) => {
			let policy = client.policy_get(args.id).await?;
			print_policy(&policy);
		}
		PolicyCommands::Delete(args) => {
			client.policy_delete(args.id).await?;
			println!("OK");
		}
		PolicyCommands::List => {
			for policy in client.policy_list().await? {
				print_policy(&policy);
			}
		}
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn permissions_parse() {
		assert_eq!(
			parse_permissions("read,write").unwrap(),
			vec![PolicyPermission::Read, PolicyPermission::Write]
		);
		assert_eq!(
			parse_permissions("super").unwrap(),
			vec![PolicyPermission::Super]
		);
	}

	#[test]
	fn unknown_permission_is_rejected() {
		assert!(parse_permissions("read,admin").is_err());
	}
}
