use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{BridgeError, Result};

/// Where one synced folder lands in the indexer's namespace.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MappingEntry {
    /// Indexer account owning the files.
    pub owner: String,
    /// Destination folder under the owner's files root.
    pub dest: String,
}

/// Static folder-id to indexer-path table, loaded once at startup and
/// never mutated while the bridge runs. Events for folders not present
/// here are ignored.
#[derive(Debug, Clone, Default)]
pub struct FolderMap {
    entries: HashMap<String, MappingEntry>,
}

#[derive(Debug, Deserialize)]
struct MappingFile {
    folders: HashMap<String, MappingEntry>,
}

impl FolderMap {
    /// Parse a TOML mapping table:
    ///
    /// ```toml
    /// [folders.cloud]
    /// owner = "alice"
    /// dest  = "Docs"
    /// ```
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: MappingFile = toml::from_str(text)
            .map_err(|e| BridgeError::Config(format!("bad mapping table: {e}")))?;
        Ok(Self {
            entries: file.folders,
        })
    }

    pub fn insert(&mut self, folder: String, entry: MappingEntry) {
        self.entries.insert(folder, entry);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Map a relative path inside a synced folder to the indexer path the
    /// scanner should be pointed at: `owner/files/dest[/rel]`. The folder
    /// root itself maps to `owner/files/dest`. Unknown folders are
    /// `None`.
    ///
    /// Indexer paths live in the indexer's virtual namespace, not on the
    /// local filesystem, so this is plain string assembly.
    pub fn resolve(&self, folder: &str, rel: &str) -> Option<String> {
        let entry = self.entries.get(folder)?;
        let rel = rel.trim_matches('/');
        let root = format!("{}/files/{}", entry.owner, entry.dest);
        if rel.is_empty() {
            Some(root)
        } else {
            Some(format!("{root}/{rel}"))
        }
    }
}

/// Parent of a '/'-separated path. The root (`""`) is its own parent, so
/// a change at a folder root degenerates to rescanning the root.
pub fn parent_of(path: &str) -> &str {
    let path = path.trim_matches('/');
    match path.rsplit_once('/') {
        Some((parent, _)) => parent,
        None => "",
    }
}

/// Parse an inline `FOLDER=OWNER:DEST` mapping argument.
pub fn parse_map_spec(spec: &str) -> Result<(String, MappingEntry)> {
    let (folder, target) = spec
        .split_once('=')
        .ok_or_else(|| BridgeError::Config(format!("mapping '{spec}' is missing '='")))?;
    let (owner, dest) = target.split_once(':').ok_or_else(|| {
        BridgeError::Config(format!(
            "mapping '{spec}' is missing ':' between owner and destination"
        ))
    })?;
    if folder.is_empty() || owner.is_empty() || dest.is_empty() {
        return Err(BridgeError::Config(format!(
            "mapping '{spec}' has an empty component"
        )));
    }
    Ok((
        folder.to_string(),
        MappingEntry {
            owner: owner.to_string(),
            dest: dest.to_string(),
        },
    ))
}
