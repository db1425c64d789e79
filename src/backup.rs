//! Backups of the sled data directory: gzipped tar archives with SHA-256
//! checksums, plus a JSON manifest so archives survive a metadata wipe.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use log::{error, info};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tar::{Archive, Builder};

const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackupKind {
    Manual,
    Scheduled,
}

/// One archive's entry in the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupEntry {
    pub id: String,
    pub kind: BackupKind,
    pub created_at: DateTime<Utc>,
    pub size_bytes: u64,
    /// SHA-256 of the finished archive, hex encoded.
    pub checksum: String,
    /// Archive filename, relative to the backup directory.
    pub filename: String,
}

/// Creates, verifies, and restores archives of the data directory.
pub struct BackupManager {
    data_dir: PathBuf,
    backup_dir: PathBuf,
    /// Scheduled backups beyond this count are pruned, oldest first. Manual
    /// backups are never pruned.
    keep_scheduled: usize,
    entries: HashMap<String, BackupEntry>,
}

impl BackupManager {
    pub fn new(
        data_dir: impl Into<PathBuf>,
        backup_dir: impl Into<PathBuf>,
        keep_scheduled: usize,
    ) -> io::Result<Self> {
        let backup_dir = backup_dir.into();
        fs::create_dir_all(&backup_dir)?;
        let mut manager = Self {
            data_dir: data_dir.into(),
            backup_dir,
            keep_scheduled: keep_scheduled.max(1),
            entries: HashMap::new(),
        };
        manager.load_manifest()?;
        Ok(manager)
    }

    fn load_manifest(&mut self) -> io::Result<()> {
        let path = self.backup_dir.join(MANIFEST_FILE);
        if path.exists() {
            let contents = fs::read_to_string(&path)?;
            self.entries = serde_json::from_str(&contents)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        }
        Ok(())
    }

    fn save_manifest(&self) -> io::Result<()> {
        let contents = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(self.backup_dir.join(MANIFEST_FILE), contents)
    }

    /// Archive the data directory. The checksum is taken only after the
    /// encoder has been finished, so it covers the complete file.
    pub fn create(&mut self, kind: BackupKind) -> io::Result<BackupEntry> {
        let created_at = Utc::now();
        // Timestamps only resolve to the millisecond, so two rapid backups
        // can land on the same stamp. Bump a suffix until the id is free.
        let stamp = format!("mallpoints_{}", created_at.format("%Y%m%d_%H%M%S_%3f"));
        let mut id = stamp.clone();
        let mut seq = 1u32;
        while self.entries.contains_key(&id)
            || self.backup_dir.join(format!("{}.tar.gz", id)).exists()
        {
            id = format!("{}_{}", stamp, seq);
            seq += 1;
        }
        let filename = format!("{}.tar.gz", id);
        let archive_path = self.backup_dir.join(&filename);

        let file = File::create(&archive_path)?;
        let encoder = GzEncoder::new(file, Compression::default());
        let mut tar = Builder::new(encoder);
        tar.append_dir_all("data", &self.data_dir)?;
        tar.into_inner()?.finish()?;

        let checksum = file_checksum(&archive_path)?;
        let size_bytes = fs::metadata(&archive_path)?.len();

        let entry = BackupEntry {
            id: id.clone(),
            kind,
            created_at,
            size_bytes,
            checksum,
            filename,
        };
        self.entries.insert(id.clone(), entry.clone());
        self.save_manifest()?;
        info!("backup {} written ({} bytes)", id, size_bytes);
        Ok(entry)
    }

    /// Re-hash an archive against its recorded checksum.
    pub fn verify(&self, id: &str) -> io::Result<bool> {
        let entry = self
            .entries
            .get(id)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "unknown backup id"))?;
        let path = self.backup_dir.join(&entry.filename);
        let ok = file_checksum(&path)? == entry.checksum;
        if !ok {
            error!("backup {} failed checksum verification", id);
        }
        Ok(ok)
    }

    /// Unpack an archive into `target`. Refuses a corrupt archive.
    pub fn restore(&self, id: &str, target: &Path) -> io::Result<()> {
        let entry = self
            .entries
            .get(id)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "unknown backup id"))?;
        if !self.verify(id)? {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "backup checksum mismatch",
            ));
        }
        fs::create_dir_all(target)?;
        let file = File::open(self.backup_dir.join(&entry.filename))?;
        let mut archive = Archive::new(GzDecoder::new(file));
        archive.unpack(target)?;
        info!("backup {} restored to {}", id, target.display());
        Ok(())
    }

    /// Drop scheduled backups beyond the retention count, oldest first.
    /// Returns the ids removed.
    pub fn prune(&mut self) -> io::Result<Vec<String>> {
        let mut scheduled: Vec<&BackupEntry> = self
            .entries
            .values()
            .filter(|e| e.kind == BackupKind::Scheduled)
            .collect();
        scheduled.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let stale: Vec<String> = scheduled
            .iter()
            .skip(self.keep_scheduled)
            .map(|e| e.id.clone())
            .collect();

        for id in &stale {
            if let Some(entry) = self.entries.remove(id) {
                let path = self.backup_dir.join(&entry.filename);
                if path.exists() {
                    fs::remove_file(&path)?;
                }
                info!("pruned backup {}", id);
            }
        }
        if !stale.is_empty() {
            self.save_manifest()?;
        }
        Ok(stale)
    }

    /// Manifest entries, newest first.
    pub fn list(&self) -> Vec<BackupEntry> {
        let mut entries: Vec<BackupEntry> = self.entries.values().cloned().collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries
    }
}

fn file_checksum(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];
    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn seed_data_dir(path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)?;
        fs::write(path.join("db"), b"sled bytes")?;
        fs::write(path.join("conf"), b"segment_size: 524288")?;
        Ok(())
    }

    #[test]
    fn create_verify_restore_round_trip() {
        let temp = TempDir::new().unwrap();
        let data = temp.path().join("data");
        seed_data_dir(&data).unwrap();

        let mut manager = BackupManager::new(&data, temp.path().join("backups"), 3).unwrap();
        let entry = manager.create(BackupKind::Manual).unwrap();
        assert!(entry.size_bytes > 0);
        assert!(manager.verify(&entry.id).unwrap());

        let restore = temp.path().join("restore");
        manager.restore(&entry.id, &restore).unwrap();
        assert_eq!(fs::read(restore.join("data/db")).unwrap(), b"sled bytes");
    }

    #[test]
    fn tampered_archive_fails_verification() {
        let temp = TempDir::new().unwrap();
        let data = temp.path().join("data");
        seed_data_dir(&data).unwrap();

        let backups = temp.path().join("backups");
        let mut manager = BackupManager::new(&data, &backups, 3).unwrap();
        let entry = manager.create(BackupKind::Manual).unwrap();

        fs::write(backups.join(&entry.filename), b"garbage").unwrap();
        assert!(!manager.verify(&entry.id).unwrap());
        assert!(manager.restore(&entry.id, &temp.path().join("restore")).is_err());
    }

    #[test]
    fn prune_keeps_recent_scheduled_and_all_manual() {
        let temp = TempDir::new().unwrap();
        let data = temp.path().join("data");
        seed_data_dir(&data).unwrap();

        let mut manager = BackupManager::new(&data, temp.path().join("backups"), 2).unwrap();
        manager.create(BackupKind::Manual).unwrap();
        for _ in 0..4 {
            manager.create(BackupKind::Scheduled).unwrap();
            std::thread::sleep(std::time::Duration::from_millis(5));
        }

        let removed = manager.prune().unwrap();
        assert_eq!(removed.len(), 2);

        let remaining = manager.list();
        assert_eq!(remaining.len(), 3);
        assert_eq!(
            remaining
                .iter()
                .filter(|e| e.kind == BackupKind::Manual)
                .count(),
            1
        );
    }

    #[test]
    fn rapid_backups_keep_distinct_ids() {
        let temp = TempDir::new().unwrap();
        let data = temp.path().join("data");
        seed_data_dir(&data).unwrap();

        let mut manager = BackupManager::new(&data, temp.path().join("backups"), 3).unwrap();
        let first = manager.create(BackupKind::Manual).unwrap();
        let second = manager.create(BackupKind::Scheduled).unwrap();

        assert_ne!(first.id, second.id);
        assert_ne!(first.filename, second.filename);
        assert_eq!(manager.list().len(), 2);
        assert!(manager.verify(&first.id).unwrap());
        assert!(manager.verify(&second.id).unwrap());
    }

    #[test]
    fn manifest_survives_reload() {
        let temp = TempDir::new().unwrap();
        let data = temp.path().join("data");
        seed_data_dir(&data).unwrap();
        let backups = temp.path().join("backups");

        let entry = {
            let mut manager = BackupManager::new(&data, &backups, 3).unwrap();
            manager.create(BackupKind::Manual).unwrap()
        };

        let manager = BackupManager::new(&data, &backups, 3).unwrap();
        assert!(manager.list().iter().any(|e| e.id == entry.id));
    }
}
