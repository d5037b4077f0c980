// store.rs — On-disk trust store.
//
// The whole store is one JSON document: a versioned envelope with an
// updated timestamp and a map from agent id to AgentTrust. Agents are kept
// in a BTreeMap so serialisation is deterministic and a save/load cycle is
// byte-stable.
//
// Writes go to a temp file in the same directory followed by a rename, so
// a crash mid-write never leaves a half-written store behind. A store that
// fails to parse is preserved under a `.corrupt-<ts>` suffix and the
// manager starts empty rather than guessing at its contents.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TrustError;
use crate::model::AgentTrust;

/// Current on-disk format version.
pub const STORE_VERSION: u32 = 1;

/// The persisted envelope: `{ version, updated, agents }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustStore {
    pub version: u32,
    pub updated: DateTime<Utc>,
    pub agents: BTreeMap<String, AgentTrust>,
}

impl TrustStore {
    pub fn empty() -> Self {
        Self {
            version: STORE_VERSION,
            updated: Utc::now(),
            agents: BTreeMap::new(),
        }
    }

    /// Load a store from disk.
    ///
    /// A missing file yields an empty store. A file that exists but does
    /// not parse is renamed aside with a `.corrupt-<ts>` suffix and an
    /// empty store is returned — corrupt data is preserved, not destroyed.
    pub fn load(path: &Path) -> Result<Self, TrustError> {
        if !path.exists() {
            return Ok(Self::empty());
        }
        let raw = fs::read_to_string(path).map_err(|source| TrustError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match serde_json::from_str::<TrustStore>(&raw) {
            Ok(store) => Ok(store),
            Err(err) => {
                let quarantine = corrupt_path(path);
                tracing::warn!(
                    path = %path.display(),
                    quarantine = %quarantine.display(),
                    %err,
                    "trust store failed to parse; preserving corrupt file and starting empty"
                );
                fs::rename(path, &quarantine).map_err(|source| TrustError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Ok(Self::empty())
            }
        }
    }

    /// Persist the store atomically: write a sibling temp file, then rename.
    pub fn save(&self, path: &Path) -> Result<(), TrustError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| TrustError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|source| TrustError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, path).map_err(|source| TrustError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }
}

fn corrupt_path(path: &Path) -> std::path::PathBuf {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("trust.json");
    path.with_file_name(format!("{}.corrupt-{}", name, Utc::now().timestamp()))
}
