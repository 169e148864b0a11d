//! # Syndex Versioner
//!
//! External file versioner for synced folders. `archive` moves a file
//! that is about to be replaced or deleted into a mirrored versions
//! tree under a timestamped name; `clean` expires old versions on a
//! staggered schedule that keeps recent history dense and older
//! history sparse.
//!
//! The sync daemon invokes the archive command with the folder root and
//! the item's relative path each time it overwrites or deletes a file.
//! Cleaning is designed for cron: each pass is independent, and a pass
//! that finds nothing to do is free.

pub mod archive;
pub mod clean;
pub mod error;

pub use archive::archive;
pub use clean::{CleanStats, INTERVALS, Interval, MAX_AGE_SECS, clean};
pub use error::{Result, VersionerError};
