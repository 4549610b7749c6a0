use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::store::MemoryStore;

/// One durable mutation, stored as a single JSON line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum WalRecord {
    Set {
        key: String,
        value: String,
        ttl: Option<u64>,
    },
    Del {
        key: String,
    },
}

/// Append-only write-ahead log. Replayed on boot, rewritten by compaction.
pub struct Wal {
    log_path: PathBuf,
}

impl Wal {
    pub async fn open(log_path: impl Into<PathBuf>) -> Result<Self> {
        let log_path = log_path.into();
        if let Some(parent) = log_path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create wal dir {}", parent.display()))?;
        }
        if !fs::try_exists(&log_path).await? {
            fs::write(&log_path, b"").await?;
        }

        Ok(Self { log_path })
    }

    pub fn path(&self) -> &Path {
        &self.log_path
    }

    pub async fn append_set(&self, key: &str, value: &str, ttl: Option<u64>) -> Result<()> {
        self.append(&WalRecord::Set {
            key: key.to_string(),
            value: value.to_string(),
            ttl,
        })
        .await
    }

    pub async fn append_delete(&self, key: &str) -> Result<()> {
        self.append(&WalRecord::Del {
            key: key.to_string(),
        })
        .await
    }

    async fn append(&self, record: &WalRecord) -> Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut file = fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.log_path)
            .await
            .with_context(|| format!("failed to open wal {}", self.log_path.display()))?;
        file.write_all(&line).await?;
        file.flush().await?;

        Ok(())
    }

    pub async fn size(&self) -> Result<u64> {
        Ok(fs::metadata(&self.log_path).await?.len())
    }

    /// Replays the log into `store` in append order. Unparsable lines (for
    /// instance a torn final append) are skipped, not fatal. Returns how many
    /// records were applied.
    pub async fn recover(&self, store: &mut MemoryStore) -> Result<usize> {
        if !fs::try_exists(&self.log_path).await? {
            return Ok(0);
        }

        let payload = fs::read_to_string(&self.log_path)
            .await
            .with_context(|| format!("failed to read wal {}", self.log_path.display()))?;

        let mut applied = 0usize;
        for line in payload.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Ok(record) = serde_json::from_str::<WalRecord>(line) else {
                continue;
            };

            match record {
                WalRecord::Set { key, value, ttl } => store.set(key, value, ttl),
                WalRecord::Del { key } => {
                    store.delete(&key);
                }
            }
            applied += 1;
        }

        Ok(applied)
    }

    /// Rewrites the log to one `set` per live key, atomically. Expired
    /// entries are dropped; surviving TTLs are written as their remaining
    /// seconds.
    pub async fn compact(&self, store: &MemoryStore) -> Result<()> {
        let mut payload = Vec::new();

        for key in store.keys() {
            let Some(value) = store.peek(&key) else {
                continue;
            };
            let record = WalRecord::Set {
                key: key.clone(),
                value: value.to_string(),
                ttl: store.ttl_remaining(&key),
            };
            payload.extend_from_slice(&serde_json::to_vec(&record)?);
            payload.push(b'\n');
        }

        write_atomic(&self.log_path, &payload).await
    }
}

async fn write_atomic(path: &Path, payload: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("path has no parent: {}", path.display()))?;
    fs::create_dir_all(parent).await?;

    let tmp = path.with_extension(format!(
        "tmp-{}-{}",
        std::process::id(),
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0)
    ));

    fs::write(&tmp, payload).await?;
    fs::rename(&tmp, path)
        .await
        .with_context(|| format!("failed to move {} -> {}", tmp.display(), path.display()))?;

    Ok(())
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod wal_tests;
