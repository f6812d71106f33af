//! The frame loop tying intake, surface, capture, and delivery together.
//!
//! One cooperative loop stands in for the host's display-refresh callback:
//! every tick drains host events (resizes land before the frame renders),
//! clears and redraws the offscreen target, then consumes the pending
//! request if one is waiting. Capture and encode happen synchronously inside
//! the tick; the network part is spawned as an independent task the loop
//! never waits on.
//!
//! Per-request failures are logged with the correlation identifier and never
//! stop the loop.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use reqwest::Client;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

use crate::error::{Error, Result};
use crate::intake::{HostEvent, OverlayHandle, PendingSlot};
use crate::surface::RenderSurface;
use crate::{capture, delivery};
use crate::{FrameSource, OverlayConfig, ScreenshotRequest, Viewport};

/// The screenshot overlay.
///
/// Owns the offscreen surface, the pending-request slot, the HTTP client,
/// and the set of in-flight uploads. Constructed once per process and driven
/// either by [`run`](Overlay::run) or, in tests, tick by tick via
/// [`step`](Overlay::step).
pub struct Overlay {
    config: OverlayConfig,
    surface: RenderSurface,
    slot: PendingSlot,
    client: Client,
    events: mpsc::UnboundedReceiver<HostEvent>,
    handle: OverlayHandle,
    uploads: JoinSet<()>,
}

impl Overlay {
    pub fn new(config: OverlayConfig, source: Arc<dyn FrameSource>) -> Result<Self> {
        // Deliberately no request timeout: uploads are fire-and-forget and
        // the caller never observes them.
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::InitializationError(format!("HTTP client: {}", e)))?;

        let (tx, rx) = mpsc::unbounded_channel();

        Ok(Self {
            surface: RenderSurface::new(config.viewport, source),
            slot: PendingSlot::new(),
            client,
            events: rx,
            handle: OverlayHandle::new(tx),
            uploads: JoinSet::new(),
            config,
        })
    }

    /// A cloneable handle for delivering host events.
    pub fn handle(&self) -> OverlayHandle {
        self.handle.clone()
    }

    /// Current viewport dimensions the surface is sized to.
    pub fn viewport(&self) -> Viewport {
        self.surface.viewport()
    }

    /// Number of uploads currently in flight (unbounded by design).
    pub fn in_flight(&self) -> usize {
        self.uploads.len()
    }

    /// Drain all queued host events. Returns `false` once a shutdown event
    /// is seen.
    fn drain_events(&mut self) -> bool {
        loop {
            match self.events.try_recv() {
                Ok(HostEvent::Message(request)) => {
                    debug!(
                        "request received: correlation={} encoding={:?}",
                        request.correlation, request.encoding
                    );
                    self.slot.store(request);
                }
                Ok(HostEvent::Resize(viewport)) => {
                    debug!("resize to {}x{}", viewport.width, viewport.height);
                    self.surface.resize(viewport);
                }
                Ok(HostEvent::Shutdown) => return false,
                // The overlay holds a sender itself, so this is always Empty
                Err(_) => return true,
            }
        }
    }

    /// One frame: render into the offscreen target, then consume the pending
    /// request if one is waiting.
    ///
    /// The capture reflects the frame rendered in this same invocation, so a
    /// request is always exactly one frame fresh relative to its trigger.
    pub fn step(&mut self) {
        self.surface.render();

        if let Some(request) = self.slot.take() {
            self.process(request);
        }
    }

    fn process(&mut self, request: ScreenshotRequest) {
        if let Err(e) = request.validate() {
            warn!("rejected (correlation={}): {}", request.correlation, e);
            return;
        }

        let viewport = self.surface.viewport();
        let pixels = self.surface.read_pixels();
        let data_uri = match capture::encode_frame(
            &pixels,
            viewport.width,
            viewport.height,
            request.encoding,
            request.effective_quality(),
        ) {
            Ok(uri) => uri,
            Err(e) => {
                warn!("capture failed (correlation={}): {}", request.correlation, e);
                return;
            }
        };

        // Fire-and-continue: the loop resumes rendering while this runs.
        let client = self.client.clone();
        self.uploads.spawn(async move {
            if let Err(e) = delivery::deliver(&client, &request, &data_uri).await {
                warn!("delivery failed (correlation={}): {}", request.correlation, e);
            }
        });
    }

    /// Await completion of every in-flight upload.
    pub async fn drain(&mut self) {
        while self.uploads.join_next().await.is_some() {}
    }

    /// Drive the frame loop at the configured refresh rate until the host
    /// sends a shutdown event, then drain outstanding uploads.
    pub async fn run(&mut self) {
        let period = Duration::from_secs_f64(1.0 / self.config.refresh_rate_hz.max(1) as f64);
        let mut ticker = tokio::time::interval(period);
        // A slow frame skips ticks instead of bursting to catch up; frames
        // never overlap.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if !self.drain_events() {
                break;
            }
            self.step();
        }

        self.drain().await;
    }
}
