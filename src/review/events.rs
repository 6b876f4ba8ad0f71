// src/review/events.rs

use crossbeam::channel::{unbounded, Receiver, Sender};

/// Change notifications for the embedding UI. No payload beyond "something
/// changed, re-query": consumers read the session, not the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewEvent {
    ReviewModeChanged,
    ApprovalCountChanged,
    BadgeStateChanged,
}

/// Explicit event channel the orchestrating component drains
/// deterministically, instead of fire-and-forget multicast.
pub(crate) struct EventBus {
    tx: Sender<ReviewEvent>,
    rx: Receiver<ReviewEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn emit(&self, event: ReviewEvent) {
        // The receiver half is owned alongside the sender, so this cannot
        // fail; keep the send infallible for callers.
        let _ = self.tx.send(event);
    }

    pub fn receiver(&self) -> &Receiver<ReviewEvent> {
        &self.rx
    }
}
