//! Disk layout: `{root}/{tenantId}/{safe-name}.json`, written atomically
//! (temp file + rename) the way `ManualSpeakerConfig::save` does it, with
//! a `.backup` snapshot of the prior content kept alongside and a
//! `.deleted` rename standing in for an actual unlink.
//!
//! Disk operations for a given tenant are serialized through a keyed
//! mutex so two concurrent writers never interleave a temp-file
//! write/rename pair; different tenants never contend with each other.

use crate::error::{PlaylistError, Result};
use crate::model::Playlist;
use aural_util::safe_playlist_name;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex as AsyncMutex;

pub struct PlaylistStore {
    root: PathBuf,
    tenant_locks: StdMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl PlaylistStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), tenant_locks: StdMutex::new(HashMap::new()) }
    }

    fn tenant_lock(&self, tenant_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.tenant_locks.lock().unwrap();
        locks.entry(tenant_id.to_string()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
    }

    fn tenant_dir(&self, tenant_id: &str) -> PathBuf {
        self.root.join(tenant_id)
    }

    fn entry_path(&self, tenant_id: &str, name: &str) -> Result<PathBuf> {
        let stem = safe_playlist_name(name)?;
        Ok(self.tenant_dir(tenant_id).join(format!("{stem}.json")))
    }

    /// Writes `playlist` atomically: serialize, write to a sibling
    /// `.tmp` and fsync it, back up any existing file's content to
    /// `.backup`, then rename the temp file into place. The fsync
    /// before the rename is what makes the rename a safe commit point —
    /// without it a crash can leave a renamed-but-still-empty file on
    /// some filesystems.
    pub async fn save(&self, tenant_id: &str, playlist: &Playlist) -> Result<()> {
        let lock = self.tenant_lock(tenant_id);
        let _guard = lock.lock().await;

        let dir = self.tenant_dir(tenant_id);
        fs::create_dir_all(&dir).await?;

        let path = self.entry_path(tenant_id, &playlist.name)?;
        let tmp_path = path.with_extension("json.tmp");
        let backup_path = path.with_extension("json.backup");

        let contents = serde_json::to_vec_pretty(playlist)?;
        let mut tmp_file =
            fs::OpenOptions::new().write(true).create(true).truncate(true).open(&tmp_path).await?;
        tmp_file.write_all(&contents).await?;
        tmp_file.sync_all().await?;
        drop(tmp_file);

        if fs::try_exists(&path).await.unwrap_or(false) {
            let existing = fs::read(&path).await?;
            fs::write(&backup_path, existing).await?;
        }

        fs::rename(&tmp_path, &path).await?;
        Ok(())
    }

    /// Returns `None` rather than an error when no file exists yet.
    pub async fn load(&self, tenant_id: &str, name: &str) -> Result<Option<Playlist>> {
        let path = self.entry_path(tenant_id, name)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Soft-deletes by renaming to a `.deleted` sidecar rather than
    /// unlinking, so a mistaken delete can still be recovered by hand.
    pub async fn delete(&self, tenant_id: &str, name: &str) -> Result<()> {
        let lock = self.tenant_lock(tenant_id);
        let _guard = lock.lock().await;

        let path = self.entry_path(tenant_id, name)?;
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(PlaylistError::NotFound(name.to_string()));
        }
        let deleted_path = path.with_extension("json.deleted");
        fs::rename(&path, &deleted_path).await?;
        Ok(())
    }

    pub async fn exists(&self, tenant_id: &str, name: &str) -> Result<bool> {
        let path = self.entry_path(tenant_id, name)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    /// Lists playlist names for a tenant, excluding sidecar files.
    pub async fn list(&self, tenant_id: &str) -> Result<Vec<String>> {
        let dir = self.tenant_dir(tenant_id);
        let mut names = Vec::new();
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if is_live_playlist_file(&path) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Atomically renames a playlist to a new name, rejecting a
    /// collision with an existing destination.
    pub async fn rename(&self, tenant_id: &str, old_name: &str, new_name: &str) -> Result<()> {
        let lock = self.tenant_lock(tenant_id);
        let _guard = lock.lock().await;

        let old_path = self.entry_path(tenant_id, old_name)?;
        let new_path = self.entry_path(tenant_id, new_name)?;

        if !fs::try_exists(&old_path).await.unwrap_or(false) {
            return Err(PlaylistError::NotFound(old_name.to_string()));
        }
        if fs::try_exists(&new_path).await.unwrap_or(false) {
            return Err(PlaylistError::AlreadyExists(new_name.to_string()));
        }
        fs::rename(&old_path, &new_path).await?;
        Ok(())
    }
}

fn is_live_playlist_file(path: &Path) -> bool {
    let Some(full_name) = path.file_name().and_then(|s| s.to_str()) else {
        return false;
    };
    full_name.ends_with(".json")
        && !full_name.ends_with(".json.backup")
        && !full_name.ends_with(".json.deleted")
        && !full_name.ends_with(".json.tmp")
}
