//! Moving replaced files into the versions tree.

use std::path::{Path, PathBuf};

use filetime::FileTime;
use tracing::info;

use crate::error::{Result, VersionerError};

/// Move `item` (relative to `folder`) into the versions tree, mirroring
/// its directory layout and tagging the file name with the content's
/// modification time as a zero-padded `.v<unix>` suffix so that lexical
/// order equals chronological order.
///
/// The archived copy's own mtime is then set to the archive moment. The
/// cleaner reads the name suffix for version spacing and the file mtime
/// for absolute age, so an old file archived a minute ago is not swept
/// away by the next cleaning pass.
///
/// A missing source is not an error: the sync daemon announces deletions
/// for items that never made it to disk. Returns the archive path when a
/// file was actually moved.
pub fn archive(folder: &Path, item: &str, versions_dir: &Path) -> Result<Option<PathBuf>> {
    let source = folder.join(item);
    let metadata = match std::fs::metadata(&source) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %source.display(), "not archiving nonexistent file");
            return Ok(None);
        }
        Err(err) => return Err(err.into()),
    };

    let Some(file_name) = source.file_name() else {
        return Err(VersionerError::BadItem(item.to_string()));
    };

    let mirror = source
        .parent()
        .and_then(|parent| parent.strip_prefix(folder).ok())
        .unwrap_or_else(|| Path::new(""));
    let target_dir = versions_dir.join(mirror);
    std::fs::create_dir_all(&target_dir)?;

    let mtime = FileTime::from_last_modification_time(&metadata);
    let mut version_name = file_name.to_os_string();
    version_name.push(format!(".v{:010}", mtime.unix_seconds()));
    let target = target_dir.join(&version_name);

    info!(from = %source.display(), to = %target.display(), "archiving");
    std::fs::rename(&source, &target)?;

    let now = FileTime::now();
    filetime::set_file_times(&target, now, now)?;

    Ok(Some(target))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_suffix_is_zero_padded() {
        let name = format!(".v{:010}", 1_000_i64);
        assert_eq!(name, ".v0000001000");
    }

    #[test]
    fn item_without_a_file_name_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("sub")).unwrap();
        let err = archive(dir.path(), "sub/..", dir.path()).unwrap_err();
        assert!(matches!(err, VersionerError::BadItem(_)));
    }
}
