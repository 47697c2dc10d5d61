//! jobwatch core contracts and value types.
//!
//! This crate exposes the data structures exchanged between the job-type futures and their
//! callers: the inbound log event, the job-type discriminator table, the terminal outcome and
//! three-way resolution, the raw-state mapper, and the shared error taxonomy.
pub mod errors;
pub mod event;
pub mod job;
pub mod outcome;
pub mod status;

pub use errors::*;
pub use event::*;
pub use job::*;
pub use outcome::*;
pub use status::*;

/// Returns the semantic version advertised by this crate.
///
/// ```
/// assert_eq!(jobwatch_core::version(), "0.1.0");
/// ```
pub fn version() -> &'static str {
    "0.1.0"
}
