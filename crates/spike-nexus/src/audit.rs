// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The audit trail: a bounded queue drained by a background task.
//!
//! Handlers record entries synchronously; the trail emits them as
//! structured `spike::audit` log records off the request path. A full
//! queue drops the entry with a warning rather than stalling a request.

use tokio::sync::mpsc;
use tracing::{info, warn};

use spike_common_core::audit::{AuditAction, AuditEntry};
use spike_common_core::spiffe::SpiffeId;

pub struct AuditTrail {
	tx: mpsc::Sender<AuditEntry>,
}

impl AuditTrail {
	pub fn new(queue_capacity: usize) -> Self {
		let (tx, rx) = mpsc::channel(queue_capacity);
		tokio::spawn(Self::background_task(rx));
		Self { tx }
	}

	async fn background_task(mut rx: mpsc::Receiver<AuditEntry>) {
		while let Some(entry) = rx.recv().await {
			info!(
				target: "spike::audit",
				request = %entry.request_name,
				method = %entry.method,
				path = %entry.path,
				caller = %entry.caller_id,
				action = %entry.action,
				timestamp = %entry.timestamp.to_rfc3339(),
				"audit"
			);
		}
	}

	/// Record one entry. Returns `false` if the queue was full and the
	/// entry was dropped.
	pub fn record(&self, entry: AuditEntry) -> bool {
		let dropped = self.tx.try_send(entry).is_err();
		if dropped {
			warn!(target: "spike::audit", "audit queue full, entry dropped");
		}
		!dropped
	}

	/// Convenience for the one-entry-per-handler rule.
	pub fn request(
		&self,
		request_name: &str,
		method: &str,
		path: &str,
		caller: &SpiffeId,
		action: AuditAction,
	) {
		self.record(AuditEntry::new(request_name, method, path, caller, action));
	}
}
