//! Intake: host-facing event plumbing and the single pending-request slot.
//!
//! The slot is the only state shared between the host's message callback and
//! the frame loop. It holds at most one request: storing overwrites any
//! unconsumed predecessor (last-write-wins, no queue, no backpressure) and
//! the loop consumes it with a single take-and-clear per frame.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::{HostMessage, ScreenshotRequest, Viewport};

/// Single-slot swap cell for the pending screenshot request.
#[derive(Clone, Default)]
pub struct PendingSlot {
    inner: Arc<Mutex<Option<ScreenshotRequest>>>,
}

impl PendingSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<ScreenshotRequest>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Store a request, unconditionally replacing any unconsumed one.
    pub fn store(&self, request: ScreenshotRequest) {
        *self.lock() = Some(request);
    }

    /// Take-and-clear: after this returns, no other path can observe or
    /// re-consume the same request.
    pub fn take(&self) -> Option<ScreenshotRequest> {
        self.lock().take()
    }
}

/// Events the host can deliver to a running overlay.
#[derive(Debug)]
pub enum HostEvent {
    /// A generic inbound message carrying a screenshot request
    Message(ScreenshotRequest),
    /// The viewport changed; the surface must be rebuilt before the next frame
    Resize(Viewport),
    /// Stop the frame loop and drain outstanding uploads
    Shutdown,
}

/// Cloneable handle the host uses to talk to a running [`Overlay`].
///
/// [`Overlay`]: crate::Overlay
#[derive(Clone)]
pub struct OverlayHandle {
    events: mpsc::UnboundedSender<HostEvent>,
}

impl OverlayHandle {
    pub(crate) fn new(events: mpsc::UnboundedSender<HostEvent>) -> Self {
        Self { events }
    }

    fn send(&self, event: HostEvent) -> Result<()> {
        self.events
            .send(event)
            .map_err(|_| Error::Other("overlay is no longer running".into()))
    }

    /// Deliver a raw host message (`{"request": {...}}` JSON).
    ///
    /// Malformed JSON is rejected here with [`Error::InvalidRequest`] instead
    /// of surfacing as an undefined-field failure downstream.
    pub fn post_message(&self, json: &str) -> Result<()> {
        let msg: HostMessage = serde_json::from_str(json)?;
        self.post_request(msg.request)
    }

    /// Deliver an already-deserialized request.
    pub fn post_request(&self, request: ScreenshotRequest) -> Result<()> {
        self.send(HostEvent::Message(request))
    }

    /// Notify the overlay of new viewport dimensions.
    pub fn resize(&self, viewport: Viewport) -> Result<()> {
        self.send(HostEvent::Resize(viewport))
    }

    /// Ask the frame loop to stop. Outstanding uploads are still awaited.
    pub fn shutdown(&self) {
        let _ = self.send(HostEvent::Shutdown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(correlation: &str) -> ScreenshotRequest {
        ScreenshotRequest {
            correlation: correlation.into(),
            target_url: "http://up.example/x".into(),
            ..Default::default()
        }
    }

    #[test]
    fn slot_starts_empty() {
        let slot = PendingSlot::new();
        assert!(slot.take().is_none());
    }

    #[test]
    fn second_store_replaces_first() {
        let slot = PendingSlot::new();
        slot.store(req("first"));
        slot.store(req("second"));

        let taken = slot.take().unwrap();
        assert_eq!(taken.correlation, "second");
        // The first request is gone entirely
        assert!(slot.take().is_none());
    }

    #[test]
    fn take_clears_the_slot() {
        let slot = PendingSlot::new();
        slot.store(req("only"));
        assert!(slot.take().is_some());
        assert!(slot.take().is_none());
    }
}
