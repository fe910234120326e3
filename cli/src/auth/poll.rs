//! Pacing and deadline for device-flow polling.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{HubError, Result};

/// Shortest wait between polls, whatever the server asks for.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Poll every `interval` until `deadline`.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    interval: Duration,
    deadline: Instant,
}

impl PollPolicy {
    /// Policy for an authorization that started at `started` and is valid for `expires_in`.
    ///
    /// `interval` is raised to [`MIN_POLL_INTERVAL`].
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Schema`] if the deadline is not representable.
    pub fn new(started: Instant, interval: Duration, expires_in: Duration) -> Result<Self> {
        let deadline = started.checked_add(expires_in).ok_or_else(|| {
            HubError::Schema(format!("expires_in of {}s is out of range", expires_in.as_secs()))
        })?;

        Ok(Self {
            interval: interval.max(MIN_POLL_INTERVAL),
            deadline,
        })
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    #[must_use]
    pub const fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Sleeps one interval, then checks the deadline.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Cancelled`] if `cancel` fires during the sleep and
    /// [`HubError::Timeout`] once the deadline has passed.
    pub async fn wait(&self, cancel: &CancellationToken) -> Result<()> {
        tokio::select! {
            () = tokio::time::sleep(self.interval) => {},
            () = cancel.cancelled() => return Err(HubError::Cancelled),
        }

        if Instant::now() > self.deadline {
            return Err(HubError::Timeout(
                "Device authorization request timed out".to_string(),
            ));
        }
        Ok(())
    }
}
