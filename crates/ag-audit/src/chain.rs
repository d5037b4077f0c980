// chain.rs — Persistent chain head.
//
// The head is the only state the chain needs across restarts: the last
// sequence number and hash. It lives in a small sidecar JSON file next to
// the segments and is rewritten atomically after every flush.

use std::fs;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::AuditError;
use crate::record::GENESIS_HASH;

/// Head of the audit chain: `{ seq, lastHash, lastTimestamp, recordCount }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainHead {
    /// Sequence number of the most recent record; 0 before any record.
    pub seq: u64,
    pub last_hash: String,
    /// Wall-clock milliseconds of the most recent record; 0 at genesis.
    pub last_timestamp: i64,
    pub record_count: u64,
}

impl ChainHead {
    /// The head of an empty chain.
    pub fn genesis() -> Self {
        Self {
            seq: 0,
            last_hash: GENESIS_HASH.to_string(),
            last_timestamp: 0,
            record_count: 0,
        }
    }

    /// Load the head from disk; missing yields genesis, corrupt is
    /// preserved aside and yields genesis.
    pub fn load(path: &Path) -> Result<Self, AuditError> {
        if !path.exists() {
            return Ok(Self::genesis());
        }
        let raw = fs::read_to_string(path).map_err(|source| AuditError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match serde_json::from_str::<ChainHead>(&raw) {
            Ok(head) => Ok(head),
            Err(err) => {
                let quarantine = path.with_file_name(format!(
                    "chain-state.json.corrupt-{}",
                    Utc::now().timestamp()
                ));
                tracing::warn!(
                    path = %path.display(),
                    %err,
                    "chain state failed to parse; preserving corrupt file and starting at genesis"
                );
                fs::rename(path, &quarantine).map_err(|source| AuditError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Ok(Self::genesis())
            }
        }
    }

    /// Persist the head atomically (temp file + rename).
    pub fn save(&self, path: &Path) -> Result<(), AuditError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| AuditError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|source| AuditError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, path).map_err(|source| AuditError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn genesis_head() {
        let head = ChainHead::genesis();
        assert_eq!(head.seq, 0);
        assert_eq!(head.last_hash, GENESIS_HASH);
        assert_eq!(head.record_count, 0);
    }

    #[test]
    fn missing_file_yields_genesis() {
        let dir = tempdir().unwrap();
        let head = ChainHead::load(&dir.path().join("chain-state.json")).unwrap();
        assert_eq!(head, ChainHead::genesis());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chain-state.json");
        let head = ChainHead {
            seq: 41,
            last_hash: "ab".repeat(32),
            last_timestamp: 1_750_000_000_000,
            record_count: 41,
        };
        head.save(&path).unwrap();
        assert_eq!(ChainHead::load(&path).unwrap(), head);
    }

    #[test]
    fn persisted_keys_are_camel_case() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chain-state.json");
        ChainHead::genesis().save(&path).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"lastHash\""));
        assert!(raw.contains("\"recordCount\""));
    }

    #[test]
    fn corrupt_head_is_preserved() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chain-state.json");
        std::fs::write(&path, "][").unwrap();

        let head = ChainHead::load(&path).unwrap();
        assert_eq!(head, ChainHead::genesis());
        let preserved = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .any(|e| {
                e.file_name()
                    .to_string_lossy()
                    .starts_with("chain-state.json.corrupt-")
            });
        assert!(preserved);
    }
}
