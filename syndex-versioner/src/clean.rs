//! Expiring old versions on a staggered schedule.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use filetime::FileTime;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::Result;

/// One band of the spacing schedule: versions younger than `end`
/// seconds need at least `step` seconds between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    /// Minimum spacing between kept versions, in seconds.
    pub step: i64,
    /// Upper bound of the age band, in seconds.
    pub end: i64,
}

/// Versions whose archive time is older than this are always removed.
pub const MAX_AGE_SECS: i64 = 365 * 86_400;

/// The spacing schedule, densest first: every 30 s within the first
/// hour, hourly within the first day, daily within the first week,
/// weekly out to the maximum age.
pub const INTERVALS: [Interval; 4] = [
    Interval { step: 30, end: 3_600 },
    Interval { step: 3_600, end: 86_400 },
    Interval { step: 86_400, end: 592_000 },
    Interval { step: 604_800, end: MAX_AGE_SECS },
];

/// What one cleaning pass removed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanStats {
    /// Version files deleted.
    pub removed_versions: usize,
    /// Empty directories deleted.
    pub removed_dirs: usize,
}

/// Walk the versions tree, expire versions that crowd their band of the
/// schedule or exceed the maximum age, and remove directories that were
/// already empty when the walk started.
///
/// Directory occupancy is counted during the walk, before any removal,
/// so a directory emptied by this pass is only deleted by the next one.
/// The versions root itself is never removed. A missing versions
/// directory is created and the pass ends with nothing to do.
pub fn clean(versions_dir: &Path) -> Result<CleanStats> {
    if !versions_dir.exists() {
        debug!(path = %versions_dir.display(), "creating versions directory");
        std::fs::create_dir_all(versions_dir)?;
        return Ok(CleanStats::default());
    }

    let mut versions_per_file: HashMap<PathBuf, Vec<PathBuf>> = HashMap::new();
    let mut files_per_dir: HashMap<PathBuf, usize> = HashMap::new();

    // Sorted traversal: zero-padded version suffixes make lexical order
    // chronological, so each group comes out oldest first.
    for entry in WalkDir::new(versions_dir).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path().to_path_buf();
        if entry.file_type().is_dir() {
            files_per_dir.entry(path.clone()).or_insert(0);
            if path.as_path() != versions_dir
                && let Some(parent) = path.parent()
            {
                *files_per_dir.entry(parent.to_path_buf()).or_insert(0) += 1;
            }
        } else {
            if let Some(parent) = path.parent() {
                *files_per_dir.entry(parent.to_path_buf()).or_insert(0) += 1;
            }
            versions_per_file
                .entry(strip_version_suffix(&path))
                .or_default()
                .push(path);
        }
    }

    let mut stats = CleanStats::default();
    for versions in versions_per_file.values() {
        stats.removed_versions += expire(versions);
    }

    for (path, count) in &files_per_dir {
        if *count > 0 || path.as_path() == versions_dir {
            continue;
        }
        match std::fs::remove_dir(path) {
            Ok(()) => stats.removed_dirs += 1,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "cannot remove empty directory");
            }
        }
    }

    Ok(stats)
}

/// Walk one version group, oldest first, deleting versions that sit
/// closer to their predecessor than their age band allows. The oldest
/// version is always kept until it passes the maximum age.
fn expire(versions: &[PathBuf]) -> usize {
    let now = Utc::now().timestamp();
    let mut removed = 0;
    let mut prev_age: i64 = 0;
    let mut first_file = true;

    for file in versions {
        let metadata = match std::fs::symlink_metadata(file) {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!(path = %file.display(), error = %err, "cannot stat version");
                continue;
            }
        };

        if metadata.is_dir() {
            warn!(path = %file.display(), "non-file is named like a file version");
            continue;
        }

        // The mtime is the archive moment, not the content's age; it
        // bounds how long a version lives regardless of its suffix.
        let archive_age = now - FileTime::from_last_modification_time(&metadata).unix_seconds();
        if archive_age > MAX_AGE_SECS {
            debug!(path = %file.display(), "removing version over the maximum age");
            removed += remove_version(file);
            continue;
        }

        let Some(version_time) = version_time_from_name(file) else {
            debug!(path = %file.display(), "not named like a version, skipping");
            continue;
        };
        let age = now - version_time;

        if first_file {
            prev_age = age;
            first_file = false;
            continue;
        }

        if prev_age - age < interval_for(age).step {
            debug!(path = %file.display(), "removing version too close to its predecessor");
            removed += remove_version(file);
            continue;
        }

        prev_age = age;
    }

    removed
}

fn remove_version(path: &Path) -> usize {
    match std::fs::remove_file(path) {
        Ok(()) => 1,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "cannot remove version");
            0
        }
    }
}

/// Group key for a version file: the path with its final `.v<unix>`
/// extension stripped, so all versions of one file land together.
fn strip_version_suffix(path: &Path) -> PathBuf {
    path.with_extension("")
}

/// Decode the archive timestamp from a `.v<unix>` suffix, if the file
/// carries one.
fn version_time_from_name(path: &Path) -> Option<i64> {
    let extension = path.extension()?.to_str()?;
    extension.strip_prefix('v')?.parse().ok()
}

/// The schedule band a version of this age falls into. Ages beyond the
/// last band keep the last band's spacing.
fn interval_for(age: i64) -> Interval {
    INTERVALS
        .iter()
        .copied()
        .find(|interval| age < interval.end)
        .unwrap_or(INTERVALS[INTERVALS.len() - 1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_time_is_read_from_the_suffix() {
        let time = version_time_from_name(Path::new("docs/notes.txt.v0001700000"));
        assert_eq!(time, Some(1_700_000));
    }

    #[test]
    fn ordinary_extensions_are_not_version_suffixes() {
        assert_eq!(version_time_from_name(Path::new("README.md")), None);
        assert_eq!(version_time_from_name(Path::new("notes.txt")), None);
        assert_eq!(version_time_from_name(Path::new("plain")), None);
        assert_eq!(version_time_from_name(Path::new("odd.vnot-a-number")), None);
    }

    #[test]
    fn group_key_strips_one_extension() {
        assert_eq!(
            strip_version_suffix(Path::new("a/notes.txt.v0000001000")),
            PathBuf::from("a/notes.txt")
        );
        assert_eq!(
            strip_version_suffix(Path::new("README.v0000001000")),
            PathBuf::from("README")
        );
    }

    #[test]
    fn ages_map_to_schedule_bands() {
        assert_eq!(interval_for(100).step, 30);
        assert_eq!(interval_for(3_599).step, 30);
        assert_eq!(interval_for(3_600).step, 3_600);
        assert_eq!(interval_for(90_000).step, 86_400);
        assert_eq!(interval_for(600_000).step, 604_800);
        assert_eq!(interval_for(MAX_AGE_SECS * 2).step, 604_800);
    }
}
