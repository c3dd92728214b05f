//! Durable per-entity discussion storage.
//!
//! Grounded on `sa_sessions::store::SessionStore`'s shape (a `RwLock`-guarded
//! in-memory index backed by JSON on disk, loaded once at startup) but
//! generalized to one file per entity rather than a single flat file, with
//! atomic write-to-temp-then-rename and backup rotation, as required.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use parking_lot::RwLock;

use discuss_domain::error::{Error, Result};
use discuss_domain::model::{Discussion, DiscussionStatus, IndexEntry};

use crate::metadata::Metadata;

pub struct DiscussionStore {
    discussions_dir: PathBuf,
    backups_dir: PathBuf,
    index_path: PathBuf,
    metadata_path: PathBuf,
    index: RwLock<HashMap<String, IndexEntry>>,
    metadata: RwLock<Metadata>,
    backup_retention: usize,
}

impl DiscussionStore {
    /// Open (or initialize) the store rooted at `root`, then perform crash
    /// recovery: any index entry left in `running` or `summarizing` is
    /// rewritten to `stopped` (spec §4.3 "do not auto-resume").
    pub fn open(root: &Path, backup_retention: usize) -> Result<Self> {
        let discussions_dir = root.join("discussions");
        let backups_dir = root.join("backups");
        std::fs::create_dir_all(&discussions_dir).map_err(Error::Io)?;
        std::fs::create_dir_all(&backups_dir).map_err(Error::Io)?;

        let index_path = discussions_dir.join("index.json");
        let metadata_path = root.join("metadata.json");

        let index = load_index(&index_path)?;
        let metadata = load_metadata(&metadata_path)?;

        let store = Self {
            discussions_dir,
            backups_dir,
            index_path,
            metadata_path,
            index: RwLock::new(index),
            metadata: RwLock::new(metadata),
            backup_retention,
        };

        store.recover_crashed()?;

        tracing::info!(
            discussions = store.index.read().len(),
            root = %root.display(),
            "discussion store opened"
        );

        Ok(store)
    }

    fn discussion_path(&self, id: &str) -> PathBuf {
        self.discussions_dir.join(format!("{id}.json"))
    }

    /// Rewrite any discussion left `running`/`summarizing` by an unclean
    /// shutdown to `stopped`, both on disk and in the index.
    fn recover_crashed(&self) -> Result<()> {
        let stale_ids: Vec<String> = self
            .index
            .read()
            .values()
            .filter(|e| matches!(e.status, DiscussionStatus::Running | DiscussionStatus::Summarizing))
            .map(|e| e.id.clone())
            .collect();

        for id in stale_ids {
            let Some(mut discussion) = self.load(&id)? else { continue };
            tracing::warn!(discussion_id = %id, previous_status = ?discussion.status, "recovering crashed discussion as stopped");
            discussion.status = DiscussionStatus::Stopped;
            discussion.touch();
            self.save(&discussion)?;
        }
        Ok(())
    }

    /// Serialize and write atomically (temp file + rename), then refresh
    /// the index entry. Per spec §4.3, callers are expected to log and
    /// swallow the error rather than abort the turn loop.
    pub fn save(&self, discussion: &Discussion) -> Result<()> {
        write_json_atomic(&self.discussion_path(&discussion.id), discussion)?;

        let mut counters_touch = None;
        {
            let mut index = self.index.write();
            let entry = discussion.to_index_entry();
            if !index.contains_key(&entry.id) {
                counters_touch = Some(discussion.status);
            }
            index.insert(entry.id.clone(), entry);
        }
        self.persist_index()?;

        if let Some(status) = counters_touch {
            if status == DiscussionStatus::Created {
                let mut metadata = self.metadata.write();
                metadata.counters.created += 1;
            }
        }
        Ok(())
    }

    /// Parse the per-id file, defaulting a missing `messages` array to
    /// empty via `#[serde(default)]` on `Discussion::messages`.
    pub fn load(&self, id: &str) -> Result<Option<Discussion>> {
        let path = self.discussion_path(id);
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path).map_err(Error::Io)?;
        let discussion: Discussion = serde_json::from_str(&raw)?;
        Ok(Some(discussion))
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        let path = self.discussion_path(id);
        if path.exists() {
            std::fs::remove_file(&path).map_err(Error::Io)?;
        }
        let removed = self.index.write().remove(id).is_some();
        if removed {
            self.persist_index()?;
            self.metadata.write().counters.deleted += 1;
        }
        Ok(())
    }

    pub fn list(&self) -> Vec<IndexEntry> {
        let mut entries: Vec<IndexEntry> = self.index.read().values().cloned().collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.read().contains_key(id)
    }

    /// Save every discussion in `active`, logging (not propagating) any
    /// individual failure, matching spec §4.3 `AutoSave`.
    pub fn autosave(&self, active: &[Discussion]) {
        for discussion in active {
            if let Err(e) = self.save(discussion) {
                tracing::warn!(discussion_id = %discussion.id, error = %e, "autosave failed");
            }
        }
    }

    /// Snapshot all discussion files, the index, and metadata into a new
    /// timestamped backup directory, then enforce retention.
    pub fn backup(&self) -> Result<PathBuf> {
        let stamp = Utc::now().format("%Y%m%dT%H%M%SZ");
        let dest = self.backups_dir.join(format!("backup-{stamp}"));
        std::fs::create_dir_all(&dest).map_err(Error::Io)?;

        for entry in std::fs::read_dir(&self.discussions_dir).map_err(Error::Io)? {
            let entry = entry.map_err(Error::Io)?;
            if entry.path().extension().and_then(|e| e.to_str()) == Some("json") {
                let file_name = entry.file_name();
                std::fs::copy(entry.path(), dest.join(&file_name)).map_err(Error::Io)?;
            }
        }
        if self.metadata_path.exists() {
            std::fs::copy(&self.metadata_path, dest.join("metadata.json")).map_err(Error::Io)?;
        }

        self.metadata.write().last_backup_at = Some(Utc::now());
        self.persist_metadata()?;

        self.enforce_backup_retention()?;
        Ok(dest)
    }

    fn enforce_backup_retention(&self) -> Result<()> {
        let mut names: Vec<String> = std::fs::read_dir(&self.backups_dir)
            .map_err(Error::Io)?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .filter_map(|e| e.file_name().into_string().ok())
            .collect();
        names.sort();
        names.reverse();

        for stale in names.into_iter().skip(self.backup_retention) {
            let path = self.backups_dir.join(stale);
            let _ = std::fs::remove_dir_all(path);
        }
        Ok(())
    }

    /// Remove discussion files present on disk but absent from the index.
    pub fn cleanup(&self) -> Result<usize> {
        let mut removed = 0;
        let index = self.index.read();
        for entry in std::fs::read_dir(&self.discussions_dir).map_err(Error::Io)? {
            let entry = entry.map_err(Error::Io)?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else { continue };
            if stem == "index" || index.contains_key(stem) {
                continue;
            }
            tracing::info!(discussion_id = stem, "removing orphaned discussion file");
            let _ = std::fs::remove_file(&path);
            removed += 1;
        }
        Ok(removed)
    }

    fn persist_index(&self) -> Result<()> {
        let index = self.index.read();
        write_json_atomic(&self.index_path, &*index)
    }

    fn persist_metadata(&self) -> Result<()> {
        let metadata = self.metadata.read();
        write_json_atomic(&self.metadata_path, &*metadata)
    }

    pub fn metadata(&self) -> Metadata {
        self.metadata.read().clone()
    }
}

fn load_index(path: &Path) -> Result<HashMap<String, IndexEntry>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let raw = std::fs::read_to_string(path).map_err(Error::Io)?;
    Ok(serde_json::from_str(&raw).unwrap_or_default())
}

fn load_metadata(path: &Path) -> Result<Metadata> {
    if !path.exists() {
        return Ok(Metadata::default());
    }
    let raw = std::fs::read_to_string(path).map_err(Error::Io)?;
    Ok(serde_json::from_str(&raw).unwrap_or_default())
}

/// Write-to-temp-then-rename so readers never observe a partially written
/// file (spec §4.3 "atomically").
fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(Error::Io)?;
    std::fs::rename(&tmp, path).map_err(Error::Io)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use discuss_domain::model::CreateDiscussionRequest;

    fn sample() -> Discussion {
        Discussion::create(CreateDiscussionRequest {
            topic: "topic".into(),
            models: vec!["a".into(), "b".into()],
            summary_model: "a".into(),
            max_rounds: 3,
        })
        .unwrap()
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiscussionStore::open(dir.path(), 10).unwrap();
        let d = sample();
        store.save(&d).unwrap();
        let loaded = store.load(&d.id).unwrap().unwrap();
        assert_eq!(loaded.id, d.id);
        assert_eq!(loaded.topic, d.topic);
    }

    #[test]
    fn delete_removes_file_and_index_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiscussionStore::open(dir.path(), 10).unwrap();
        let d = sample();
        store.save(&d).unwrap();
        store.delete(&d.id).unwrap();
        assert!(store.load(&d.id).unwrap().is_none());
        assert!(!store.contains(&d.id));
    }

    #[test]
    fn crash_recovery_rewrites_running_to_stopped() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = DiscussionStore::open(dir.path(), 10).unwrap();
            let mut d = sample();
            d.status = DiscussionStatus::Running;
            store.save(&d).unwrap();
        }
        let store = DiscussionStore::open(dir.path(), 10).unwrap();
        let entries = store.list();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, DiscussionStatus::Stopped);
    }

    #[test]
    fn cleanup_removes_orphaned_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiscussionStore::open(dir.path(), 10).unwrap();
        let d = sample();
        store.save(&d).unwrap();
        // simulate an orphan: index entry removed, file left behind.
        store.index.write().remove(&d.id);
        let removed = store.cleanup().unwrap();
        assert_eq!(removed, 1);
        assert!(store.load(&d.id).unwrap().is_none());
    }

    #[test]
    fn backup_creates_directory_and_enforces_retention() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiscussionStore::open(dir.path(), 2).unwrap();
        let d = sample();
        store.save(&d).unwrap();

        for _ in 0..4 {
            store.backup().unwrap();
            std::thread::sleep(std::time::Duration::from_millis(1100));
        }

        let backups: Vec<_> = std::fs::read_dir(dir.path().join("backups")).unwrap().collect();
        assert!(backups.len() <= 2);
    }
}
