// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Grace Period Expiry Poller
//!
//! Background task that periodically runs the expiry sweep, so grace-period
//! escalation happens even when the external scheduler misses a firing.
//!
//! ## Strategy
//!
//! Every `poll_interval` (default 300 s) the poller runs
//! `api::expiry::run_expiry_sweep`, the same routine behind the
//! `/internal/recovery/scan` endpoint. The sweep's conditional
//! status-flip-then-notify ordering makes overlapping runs safe: a locker
//! is escalated and its delegate notified at most once.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::state::AppState;

/// Default interval between expiry sweeps.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(300);

/// Background poller that escalates expired grace periods.
pub struct ExpiryPoller {
    state: AppState,
    poll_interval: Duration,
}

impl ExpiryPoller {
    /// Create a new poller over the shared application state.
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override the sweep interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Run the poller loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(poller.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.poll_interval.as_secs(),
            "Expiry poller starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Expiry poller shutting down");
                return;
            }

            let summary = crate::api::expiry::run_expiry_sweep(&self.state).await;
            if summary.processed > 0 {
                info!(
                    processed = summary.processed,
                    notified = summary.notified,
                    "Expiry poller: escalated lockers"
                );
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Expiry poller shutting down");
                    return;
                }
            }
        }
    }
}
