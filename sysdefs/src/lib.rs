//! sysdefs (System Definitions) is a small crate meant exclusively to contain
//! definitions for simple, basic, or axiomatic storage and platform concepts:
//! format types, disk label types, firmware kinds and architectures.
//!
//! As the name implies, the crate mainly provides definitions, and should
//! contain minimal or no behavior at all.
//!

pub mod arch;
pub mod disklabel;
pub mod filesystems;
pub mod firmware;
