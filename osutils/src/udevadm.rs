use std::process::Command;

use anyhow::{Context, Error};

use crate::exe::RunAndCheck;

/// Waits for the udev event queue to drain, so that device nodes and their
/// properties reflect the hardware.
pub fn settle() -> Result<(), Error> {
    Command::new("udevadm")
        .arg("settle")
        .arg("--timeout=120")
        .run_and_check()
        .context("Failed to settle udev")
}
