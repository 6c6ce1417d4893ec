// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `spike operator` subcommands: the disaster-recovery pair.
//!
//! `recover` runs against a healthy nexus and writes the two pilot
//! shards to 0600 text files in the recovery folder, after clearing any
//! stale export. `restore` reads one `spike:<id>:<base64>` line from
//! stdin and feeds it to a replacement nexus; run it once per shard.
//! Every buffer that carries shard material is zeroed on every exit
//! path.

use clap::Subcommand;
use std::fs;
use std::io::BufRead;
use std::path::Path;
use zeroize::Zeroize;

use spike_common_core::recovery::{
	format_shard_line, is_recovery_file_name, parse_shard_line, recovery_file_name,
};

use crate::client::NexusClient;
use crate::config::OperatorConfig;
use crate::error::{CliError, Result};

#[derive(Subcommand, Debug)]
pub enum OperatorCommands {
	/// Export pilot shards (do this while the nexus is healthy)
	Recover,
	/// Feed one pilot shard back into a replacement nexus
	Restore,
}

pub async fn handle(config: &OperatorConfig, command: OperatorCommands) -> Result<()> {
	match command {
		OperatorCommands::Recover => recover(config).await,
		OperatorCommands::Restore => restore(config).await,
	}
}

async fn recover(config: &OperatorConfig) -> Result<()> {
	if !config.trust_roots.is_pilot_recover(&config.spiffe_id) {
		return Err(CliError::MissingRole("recover"));
	}

	let client = NexusClient::new(&config.api_url)?;
	let shards = client.recover().await?;
	if shards.is_empty() {
		return Err(CliError::Api("no shards returned".to_string()));
	}

	fs::create_dir_all(&config.recovery_dir)?;
	clean_previous_export(&config.recovery_dir)?;

	for (id, shard) in &shards {
		let mut line = format_shard_line(*id, shard.as_bytes());
		let file_path = config.recovery_dir.join(recovery_file_name(*id));
		let written = write_restricted(&file_path, line.as_bytes());
		line.zeroize();
		written?;
	}
	drop(shards);

	println!();
	println!("  Recovery shards saved to {}", config.recovery_dir.display());
	println!();
	println!("  Please make sure that:");
	println!("    1. You encrypt these shards and keep them safe.");
	println!("    2. You securely erase them from the recovery folder");
	println!("       after moving them to that safe location.");
	println!();
	println!("  Without these shards you cannot recover the service after");
	println!("  a total loss of the nexus and its keepers.");
	println!();
	Ok(())
}

/// Delete leftovers of a previous export. Only `spike.recovery*.txt`
/// names are touched; anything else in the folder is ignored.
fn clean_previous_export(dir: &Path) -> Result<()> {
	for entry in fs::read_dir(dir)? {
		let entry = entry?;
		let name = entry.file_name();
		let Some(name) = name.to_str() else { continue };
		if is_recovery_file_name(name) {
			fs::remove_file(entry.path())?;
		}
	}
	Ok(())
}

/// Write a shard file with owner-only permissions.
fn write_restricted(path: &Path, contents: &[u8]) -> Result<()> {
	#[cfg(unix)]
	{
		use std::io::Write;
		use std::os::unix::fs::OpenOptionsExt;
		let mut file = fs::OpenOptions::new()
			.write(true)
			.create(true)
			.truncate(true)
			.mode(0o600)
			.open(path)?;
		file.write_all(contents)?;
		Ok(())
	}
	#[cfg(not(unix))]
	{
		fs::write(path, contents)?;
		Ok(())
	}
}

async fn restore(config: &OperatorConfig) -> Result<()> {
	if !config.trust_roots.is_pilot_restore(&config.spiffe_id) {
		return Err(CliError::MissingRole("restore"));
	}

	println!("Paste one recovery shard line (spike:<id>:<base64>):");
	let mut line = String::new();
	let read = std::io::stdin().lock().read_line(&mut line);
	if let Err(e) = read {
		line.zeroize();
		return Err(e.into());
	}

	let parsed = parse_shard_line(line.trim());
	line.zeroize();
	let (id, shard) = parsed.map_err(|_| {
		CliError::Input("invalid shard line; expected spike:<id>:<base64-32-bytes>".to_string())
	})?;

	let client = NexusClient::new(&config.api_url)?;
	let status = client.restore(id, shard).await?;

	if status.restored {
		println!();
		println!("  The nexus is restored and ready to use.");
		println!();
	} else {
		println!();
		println!("  Shards collected: {}", status.shards_collected);
		println!("  Shards remaining: {}", status.shards_remaining);
		println!("  Run `spike operator restore` again to provide the next shard.");
		println!();
	}
	Ok(())
}
