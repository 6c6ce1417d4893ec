// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SPIKE Nexus server binary.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spike_nexus::config::NexusConfig;
use spike_nexus::persist::MemoryBackend;
use spike_nexus::recovery::KeeperClient;
use spike_nexus::state::LifecycleState;
use spike_nexus::{create_app_state, create_router};

/// SPIKE Nexus - the central secrets service.
#[derive(Parser, Debug)]
#[command(name = "spike-nexus", about = "SPIKE secrets management service", version)]
struct Args {
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Show version information
	Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	if let Some(Command::Version) = args.command {
		println!("spike-nexus {}", env!("CARGO_PKG_VERSION"));
		return Ok(());
	}

	dotenvy::dotenv().ok();

	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| "info".into()),
		)
		.with(tracing_subscriber::fmt::layer())
		.init();

	let config = NexusConfig::from_env()?;
	let addr = config.socket_addr();
	let keeper_timeout = config.database_operation_timeout;

	// The in-tree backend keeps sealed state in memory; deployments plug
	// their encrypted at-rest driver in at this seam.
	let state = create_app_state(
		config,
		Arc::new(MemoryBackend::new()),
		Arc::new(KeeperClient::new(keeper_timeout)),
	);

	let lifecycle = state.orchestrator.bootstrap().await;
	match lifecycle {
		LifecycleState::Healthy => tracing::info!("nexus is healthy"),
		LifecycleState::AwaitingRestore => {
			tracing::warn!("nexus is awaiting an operator restore; only /v1/operator/restore is exposed")
		}
		LifecycleState::Bootstrapping => unreachable!("bootstrap always resolves the lifecycle"),
	}

	let redistribution = Arc::clone(&state.orchestrator).spawn_redistribution();

	let app = create_router(state).layer(TraceLayer::new_for_http());

	tracing::info!(%addr, "listening");
	let listener = tokio::net::TcpListener::bind(&addr).await?;

	tokio::select! {
		result = axum::serve(listener, app) => {
			if let Err(e) = result {
				tracing::error!(error = %e, "server error");
			}
		}
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("received shutdown signal");
		}
	}

	redistribution.abort();
	tracing::info!("server shutdown complete");
	Ok(())
}
