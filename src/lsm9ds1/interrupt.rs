// Copyright (c) 2022, Zachary D. Olkin.
// This code is provided under the MIT license.

//! Data-ready edge collaborator traits.
//!
//! The hardware routes the accelerometer data-ready signal to a GPIO line
//! (INT2 of the accelerometer/gyroscope peripheral). The acquisition thread
//! subscribes to its rising edge and blocks in a bounded wait; the timeout
//! exists only so the thread can periodically re-check its stop flag, it is
//! not an application-visible deadline.

use std::error;
use std::time::Duration;

/// Outcome of one bounded wait on the edge stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeWait {
    /// A rising edge was observed.
    Edge,
    /// The wait timed out without an edge.
    TimedOut,
}

/// A GPIO line that can be subscribed to rising-edge events.
///
/// Subscribing consumes the source; the subscription is owned by the
/// acquisition thread and released on drop, which guarantees it outlives
/// any pending callback.
pub trait EdgeSource {
    /// Subscription error type.
    type Error: error::Error + Send + Sync + 'static;
    /// The subscribed event stream handed to the acquisition thread.
    type Events: EdgeEvents + Send + 'static;

    /// Subscribe to rising edges on the data-ready line.
    fn subscribe(self) -> Result<Self::Events, Self::Error>;
}

/// A stream of rising-edge events with a bounded blocking wait.
pub trait EdgeEvents {
    /// Wait error type.
    type Error: error::Error + Send + Sync + 'static;

    /// Block until the next rising edge or until `timeout` elapses. An
    /// observed edge must also consume/clear the underlying event so the
    /// primitive cannot saturate.
    fn wait(&mut self, timeout: Duration) -> Result<EdgeWait, Self::Error>;
}
