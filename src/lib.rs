pub mod autopart;
pub mod cache;
pub mod cli;
pub mod populate;
pub mod resolver;
pub mod sanity;
pub mod snapshot;

pub use resolver::SpecResolver;
pub use sanity::SanityChecker;
pub use snapshot::StorageSnapshot;

/// Layout checker version as provided by cargo.
pub const LAYOUTCHECK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// How a run of the checker ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    Done,
    /// The checked layout has at least one error-level finding.
    Blocked,
}
