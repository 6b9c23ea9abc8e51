//! File backed response cache, one JSON record per key

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheRecord<T> {
    pub data: T,
    pub key: String,
    /// 0 means the record never expires
    pub timeout_seconds: u64,
    pub write_timestamp: i64,
}

impl<T> CacheRecord<T> {
    pub fn is_valid(&self, now: i64) -> bool {
        if self.timeout_seconds == 0 {
            return true;
        }
        // a deadline past i64::MAX is never reached
        i64::try_from(self.timeout_seconds)
            .ok()
            .and_then(|timeout| self.write_timestamp.checked_add(timeout))
            .map_or(true, |deadline| deadline > now)
    }
}

/// Concurrent writers racing on a key may both miss and refetch, records are idempotent so
/// the last write simply wins.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: Option<PathBuf>,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    /// A cache that never hits and drops every write
    pub const fn disabled() -> Self {
        Self { dir: None }
    }

    fn path_for(dir: &Path, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| match c {
                'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
                _ => '_',
            })
            .collect();
        dir.join(format!("{file}.cache"))
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str, now: i64) -> Option<T> {
        let dir = self.dir.as_ref()?;
        let raw = match fs::read_to_string(Self::path_for(dir, key)) {
            Ok(raw) => raw,
            Err(e) => {
                debug!("Cache miss {key}: {e}");
                return None;
            }
        };
        let record: CacheRecord<T> = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                warn!("Ignoring unreadable cache record {key}: {e}");
                return None;
            }
        };
        if record.is_valid(now) {
            debug!("Cache hit {key}");
            Some(record.data)
        } else {
            debug!("Cache expired {key}");
            None
        }
    }

    /// Write failures are logged and otherwise ignored
    pub fn set<T: Serialize>(&self, key: &str, data: &T, timeout_seconds: u64, now: i64) {
        let Some(dir) = self.dir.as_ref() else {
            return;
        };
        let record = CacheRecord {
            data,
            key: key.to_string(),
            timeout_seconds,
            write_timestamp: now,
        };
        let result = fs::create_dir_all(dir)
            .and_then(|_| serde_json::to_vec(&record).map_err(std::io::Error::other))
            .and_then(|bytes| fs::write(Self::path_for(dir, key), bytes));
        if let Err(e) = result {
            warn!("Failed to write cache record {key}: {e}");
        }
    }
}
