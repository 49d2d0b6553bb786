//! # Publisher Module
//!
//! Fixed-rate publishing of the latest control snapshot.
//!
//! This module handles:
//! - Wrapping the axis values in the [`JoystickMessage`] envelope
//! - Publishing at a fixed rate (100Hz by default), fire-and-forget
//! - Periodic human readable status lines
//! - Stopping once the polling loop has gone away

pub mod sink;

use serde::Serialize;
use tokio::sync::watch;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::PublisherConfig;
use crate::controller::ControlSnapshot;
use crate::error::Result;
use sink::MessageSink;

/// Envelope published on every tick.
///
/// `axes` follows the active input source's axis order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoystickMessage {
    pub valid: bool,
    pub axes: Vec<f32>,
}

impl JoystickMessage {
    /// Builds a valid message from a snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: &ControlSnapshot) -> Self {
        Self {
            valid: true,
            axes: snapshot.axes.values(),
        }
    }

    /// JSON encoding of the message.
    ///
    /// # Errors
    ///
    /// Returns `Encode` if serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Counters reported when the publisher stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PublishStats {
    pub frames: u64,
    pub published: u64,
    pub failed: u64,
}

/// Fixed-rate publisher loop.
pub struct Publisher<S: MessageSink> {
    sink: S,
    snapshots: watch::Receiver<ControlSnapshot>,
    topic: String,
    rate_hz: u32,
    log_every_frames: u64,
    stats: PublishStats,
}

impl<S: MessageSink> Publisher<S> {
    /// Creates a publisher reading snapshots from `snapshots`.
    pub fn new(
        sink: S,
        snapshots: watch::Receiver<ControlSnapshot>,
        config: &PublisherConfig,
    ) -> Self {
        Self {
            sink,
            snapshots,
            topic: config.topic.clone(),
            rate_hz: config.rate_hz.max(1),
            log_every_frames: config.log_every_frames.max(1),
            stats: PublishStats::default(),
        }
    }

    #[must_use]
    pub fn stats(&self) -> PublishStats {
        self.stats
    }

    /// Publishes the current snapshot once.
    ///
    /// Publish failures are logged and counted, never returned.
    ///
    /// # Errors
    ///
    /// Returns `Encode` if the message cannot be serialized.
    pub fn tick(&mut self) -> Result<()> {
        let snapshot = self.snapshots.borrow().clone();

        if self.stats.frames % self.log_every_frames == 0 {
            info!("{}", snapshot.axes);
        }

        let payload = JoystickMessage::from_snapshot(&snapshot).encode()?;
        match self.sink.publish(&self.topic, payload) {
            Ok(()) => self.stats.published += 1,
            Err(e) => {
                debug!("Failed to publish: {}", e);
                self.stats.failed += 1;
            }
        }

        self.stats.frames += 1;
        Ok(())
    }

    /// Runs until the snapshot sender is dropped.
    ///
    /// # Errors
    ///
    /// Returns `Encode` if a message cannot be serialized.
    pub async fn run(mut self) -> Result<PublishStats> {
        let period = Duration::from_secs_f64(1.0 / f64::from(self.rate_hz));
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Publishing on '{}' at {}Hz", self.topic, self.rate_hz);

        loop {
            ticker.tick().await;

            // Sender dropped: the polling loop has stopped
            if self.snapshots.has_changed().is_err() {
                info!("Input source stopped, publisher exiting");
                break;
            }

            self.tick()?;
        }

        Ok(self.stats)
    }
}
