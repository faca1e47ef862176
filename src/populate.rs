//! Device discovery with a pluggable retry policy.
//!
//! Enumerating devices talks to the hardware and can fail transiently. When it
//! does, an [`ErrorHandler`] decides whether to try again or give up.

use anyhow::Error;
use log::{debug, warn};

use layoutcheck_api::error::{DeviceDiscoveryError, LayoutCheckError, ReportError};

/// What to do after a failed population attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Give up and return the error.
    Raise,
    /// Try again.
    Retry,
}

/// Decides how to react to a failed population attempt.
pub trait ErrorHandler {
    fn on_error(&mut self, error: &Error) -> ErrorAction;
}

impl<F> ErrorHandler for F
where
    F: FnMut(&Error) -> ErrorAction,
{
    fn on_error(&mut self, error: &Error) -> ErrorAction {
        self(error)
    }
}

/// Retries up to a fixed number of times, then raises.
#[derive(Debug, Clone)]
pub struct RetryLimit {
    retries: usize,
    failures: usize,
}

impl RetryLimit {
    pub fn new(retries: usize) -> Self {
        Self {
            retries,
            failures: 0,
        }
    }
}

impl ErrorHandler for RetryLimit {
    fn on_error(&mut self, error: &Error) -> ErrorAction {
        self.failures += 1;
        if self.failures > self.retries {
            return ErrorAction::Raise;
        }

        warn!(
            "Device discovery failed (attempt {} of {}): {error:#}",
            self.failures,
            self.retries + 1
        );
        ErrorAction::Retry
    }
}

/// Calls `populate` until it succeeds or `handler` chooses to give up.
pub fn try_populate<T>(
    mut populate: impl FnMut() -> Result<T, Error>,
    mut handler: impl ErrorHandler,
) -> Result<T, LayoutCheckError> {
    let mut attempts = 0;
    loop {
        attempts += 1;
        let error = match populate() {
            Ok(populated) => {
                debug!("Device discovery succeeded after {attempts} attempt(s)");
                return Ok(populated);
            }
            Err(e) => e,
        };

        match handler.on_error(&error) {
            ErrorAction::Retry => continue,
            ErrorAction::Raise => {
                return Err(error).structured(DeviceDiscoveryError::PopulateAborted { attempts })
            }
        }
    }
}
