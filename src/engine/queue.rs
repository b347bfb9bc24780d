// src/engine/queue.rs

use tokio::sync::mpsc;
use tracing::debug;

use super::RebuildRequest;

/// Create the rebuild-request channel.
///
/// Semantics:
/// - The channel holds at most one pending request.
/// - Requesting a rebuild while one is already pending is a no-op: the new
///   request is dropped, not queued. The pending request already covers
///   every change made so far, because the build loop always rebuilds the
///   whole project.
/// - Together with the build loop only taking a request when it is idle, this
///   means a burst of changes during a long build yields exactly one
///   follow-up build.
pub fn rebuild_channel() -> (RebuildTrigger, RebuildReceiver) {
    let (tx, rx) = mpsc::channel(1);
    (RebuildTrigger { tx }, RebuildReceiver { rx })
}

/// What happened to a rebuild request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// The request is now pending.
    Queued,
    /// A request was already pending; this one was folded into it.
    Coalesced,
    /// The build loop is gone.
    Closed,
}

/// Sending half of the rebuild channel. Never blocks.
#[derive(Debug, Clone)]
pub struct RebuildTrigger {
    tx: mpsc::Sender<RebuildRequest>,
}

impl RebuildTrigger {
    pub fn request(&self, request: RebuildRequest) -> TriggerOutcome {
        match self.tx.try_send(request) {
            Ok(()) => TriggerOutcome::Queued,
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                debug!(?dropped, "rebuild already pending; coalescing request");
                TriggerOutcome::Coalesced
            }
            Err(mpsc::error::TrySendError::Closed(_)) => TriggerOutcome::Closed,
        }
    }

    /// Send the start-up request.
    pub fn prime(&self) -> TriggerOutcome {
        self.request(RebuildRequest::Prime)
    }
}

/// Receiving half of the rebuild channel, owned by the build loop.
#[derive(Debug)]
pub struct RebuildReceiver {
    rx: mpsc::Receiver<RebuildRequest>,
}

impl RebuildReceiver {
    /// Wait for the next request. `None` once every trigger is dropped.
    pub async fn recv(&mut self) -> Option<RebuildRequest> {
        self.rx.recv().await
    }

    /// Whether a request is waiting to be taken.
    pub fn is_pending(&self) -> bool {
        !self.rx.is_empty()
    }
}
