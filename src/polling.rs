//! # Polling Module
//!
//! Runs the blocking input source on its own thread.
//!
//! Input adapters block inside [`InputSource::update`] until the device
//! produces something, so they cannot share the async runtime. The polling
//! thread builds the adapter, reports its axis order once, then publishes a
//! [`ControlSnapshot`] after every update. The publisher only ever sees whole
//! snapshots, so axes and cancel always come from the same update.
//!
//! Dropping the snapshot sender (thread exit) tells the publisher to stop.

use std::thread::{self, JoinHandle};

use tokio::sync::{oneshot, watch};
use tracing::{debug, error, info};

use crate::controller::{ControlSnapshot, InputSource};
use crate::error::{JoystickControlError, Result};

/// Builds the input source on the polling thread.
pub type SourceFactory = Box<dyn FnOnce() -> Result<Box<dyn InputSource>> + Send>;

/// Starts the polling thread.
///
/// `ready` receives the source's axis order once it is constructed, or the
/// construction error. The thread's result is the error that ended the
/// source, if any.
///
/// # Errors
///
/// Returns `Io` error if the thread cannot be spawned.
pub fn spawn(
    factory: SourceFactory,
    snapshots: watch::Sender<ControlSnapshot>,
    ready: oneshot::Sender<Result<Vec<&'static str>>>,
) -> Result<JoinHandle<Result<()>>> {
    let handle = thread::Builder::new()
        .name("input-poll".to_string())
        .spawn(move || {
            let mut source = match factory() {
                Ok(source) => source,
                Err(e) => {
                    // Reported through `ready`
                    let _ = ready.send(Err(e));
                    return Ok(());
                }
            };

            snapshots.send_replace(source.snapshot());
            if ready.send(Ok(source.axes_order())).is_err() {
                debug!("Nobody waiting for the input source, stopping");
                return Ok(());
            }

            run(source.as_mut(), &snapshots).map_err(|e| {
                error!("Input source failed: {}", e);
                e
            })
        })?;

    Ok(handle)
}

/// Polls `source` until it reports an error or nobody is listening.
///
/// A user interrupt is a normal stop and returns `Ok`.
///
/// # Errors
///
/// Returns the error that ended the source.
pub fn run(source: &mut dyn InputSource, snapshots: &watch::Sender<ControlSnapshot>) -> Result<()> {
    loop {
        match source.update() {
            Ok(_) => {}
            Err(JoystickControlError::Interrupted) => {
                info!("Input stopped by user");
                return Ok(());
            }
            Err(e) => return Err(e),
        }

        snapshots.send_replace(source.snapshot());

        if snapshots.is_closed() {
            debug!("Publisher gone, stopping input polling");
            return Ok(());
        }
    }
}
