// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Usage accounting for streamed responses.
//!
//! A metered stream writes exactly one usage row: when the vendor finishes,
//! when the stream fails, or, through [`UsageGuard`]'s `Drop`, when the
//! caller stops consuming it early.

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use ghl_core::types::{ChatStream, StreamEventType, TokenUsage};
use ghl_cost::{UsageEntry, UsageRecorder};
use tracing::{debug, error, warn};

/// Error message recorded for streams abandoned by the caller.
pub const CANCELLED_BY_CALLER: &str = "stream cancelled by caller";

/// Pending usage row for one open stream.
pub struct UsageGuard {
    recorder: Arc<UsageRecorder>,
    entry: UsageEntry,
    started: Instant,
    usage: Option<TokenUsage>,
    finished: bool,
}

impl UsageGuard {
    /// `started` is when the attempt began, so the row covers the time spent
    /// opening the stream too.
    pub fn new(recorder: Arc<UsageRecorder>, entry: UsageEntry, started: Instant) -> Self {
        Self {
            recorder,
            entry,
            started,
            usage: None,
            finished: false,
        }
    }

    /// Usage snapshots are cumulative; the latest wins.
    pub fn observe(&mut self, usage: TokenUsage) {
        self.usage = Some(usage);
    }

    fn take_entry(&mut self, error: Option<String>) -> UsageEntry {
        self.finished = true;
        let mut entry = std::mem::take(&mut self.entry)
            .with_usage(self.usage)
            .with_duration(self.started.elapsed());
        entry.error = error;
        entry
    }

    /// Writes the row now. Later calls and the drop are no-ops.
    pub async fn complete(&mut self, error: Option<String>) {
        if self.finished {
            return;
        }
        let entry = self.take_entry(error);
        if let Err(e) = self.recorder.record(entry).await {
            error!(error = %e, "failed to record stream usage");
        }
    }
}

impl Drop for UsageGuard {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let entry = self.take_entry(Some(CANCELLED_BY_CALLER.to_string()));
        debug!(client_id = %entry.client_id, provider = ?entry.provider_type, "stream dropped before completion");
        let recorder = self.recorder.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = recorder.record(entry).await {
                        error!(error = %e, "failed to record cancelled stream usage");
                    }
                });
            }
            Err(_) => warn!("no async runtime available; cancelled stream usage not recorded"),
        }
    }
}

/// Wraps `inner` so that `guard` records its usage exactly once.
///
/// The row is written before the terminal item reaches the caller. Dropping
/// the returned stream drops `inner`, which closes the upstream connection.
pub fn meter(inner: ChatStream, guard: UsageGuard) -> ChatStream {
    Box::pin(stream::unfold(Some((inner, guard)), |state| async move {
        let (mut inner, mut guard) = state?;
        match inner.next().await {
            Some(Ok(chunk)) => {
                if let Some(usage) = chunk.usage {
                    guard.observe(usage);
                }
                if chunk.event_type == StreamEventType::Stop {
                    drop(inner);
                    guard.complete(None).await;
                    return Some((Ok(chunk), None));
                }
                Some((Ok(chunk), Some((inner, guard))))
            }
            Some(Err(e)) => {
                drop(inner);
                guard.complete(Some(e.to_string())).await;
                Some((Err(e), None))
            }
            None => {
                guard.complete(None).await;
                None
            }
        }
    }))
}
