//! Introspection: what the server is working on
//!
//! The server tracks its concurrent work units ("tasklets") through a series
//! of timestamped lifecycle events:
//!
//! ```text
//! scheduled ─> running ─> [before co_await ─> after co_await]* ─> finished
//! ```
//!
//! An introspection status query returns a [`Snapshot`] of those tasklets.
//! Grouping by pool and timeline rendering are derived on demand and never
//! stored.

mod error;
mod snapshot;
mod tasklet;
pub mod time;

pub use error::{DecodeError, Result};
pub use snapshot::Snapshot;
pub use tasklet::{
    Progress, Tasklet, TaskletEvent, TimelineEntry, FINISHED, RUNNING_EVENTS, SCHEDULED,
};
