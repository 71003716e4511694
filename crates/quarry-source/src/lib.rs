//! Source file selection and snapshotting.
//!
//! A target's `sources` list is turned into a [`Filespec`] of include and
//! exclude globs anchored at the target's directory, expanded against the
//! build root into a [`Fileset`], and optionally captured as a
//! content-addressed [`Snapshot`] that can be materialized elsewhere (for
//! example into a process sandbox).

pub mod error;
pub mod filespec;
pub mod snapshot;

pub use error::SourceError;
pub use filespec::{Fileset, Filespec};
pub use snapshot::Snapshot;
