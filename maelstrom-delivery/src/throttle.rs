//! Fixed-window admission for outbound sends
//!
//! Each admitted send takes one of `capacity` slots and gives it back after a
//! fixed window, whether or not the send has finished by then. This bounds
//! how many sends start per window, not how many are in flight.
//!
//! ```text
//! capacity: 5, window: 1s
//! - 5 sends admitted at t=0
//! - a 6th at t=0.5 is refused
//! - at t=1 all 5 slots are back
//! ```

use std::{sync::Arc, time::Duration};

use serde::Serialize;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};

#[derive(Debug, Clone)]
pub struct Throttle {
    slots: Arc<Semaphore>,
    capacity: usize,
    window: Duration,
}

impl Throttle {
    /// Create a throttle admitting `capacity` sends per `window`
    #[must_use]
    pub fn new(capacity: usize, window: Duration) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
            window,
        }
    }

    /// Take a slot if one is free.
    ///
    /// Never waits. On success the slot is released automatically once the
    /// window has elapsed; there is no way to hand it back early.
    pub fn try_acquire(&self) -> bool {
        match Arc::clone(&self.slots).try_acquire_owned() {
            Ok(permit) => {
                self.release_later(permit);
                true
            }
            Err(TryAcquireError::NoPermits) => {
                tracing::debug!(
                    capacity = self.capacity,
                    window_ms = self.window.as_millis(),
                    "Throttle limit reached"
                );
                false
            }
            Err(TryAcquireError::Closed) => false,
        }
    }

    fn release_later(&self, permit: OwnedSemaphorePermit) {
        let window = self.window;

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let deadline = tokio::time::Instant::now() + window;
            handle.spawn(async move {
                tokio::time::sleep_until(deadline).await;
                drop(permit);
            });
        } else {
            std::thread::spawn(move || {
                std::thread::sleep(window);
                drop(permit);
            });
        }
    }

    /// Slots currently held by admitted sends
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.capacity
            .saturating_sub(self.slots.available_permits())
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn stats(&self) -> ThrottleStats {
        ThrottleStats {
            outstanding: self.outstanding(),
            capacity: self.capacity,
            window_millis: u64::try_from(self.window.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Point-in-time view of a [`Throttle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThrottleStats {
    pub outstanding: usize,
    pub capacity: usize,
    pub window_millis: u64,
}
