// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Filesystem vault.
//!
//! ## Layout
//!
//! ```text
//! {root}/secrets/{secret_id}/        container
//! {root}/secrets/{secret_id}/1.bin   version 1
//! {root}/secrets/{secret_id}/2.bin   version 2
//! ```
//!
//! Versions are written to a temporary file and hard-linked into place.
//! Linking fails if the target exists, so a version file is never
//! overwritten even when two processes append concurrently.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::{validate_secret_id, SecretLookup, SecretVault, SecretVersion, VaultError};

const VERSION_EXT: &str = "bin";

impl From<io::Error> for VaultError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => VaultError::NotFound(e.to_string()),
            io::ErrorKind::AlreadyExists => VaultError::AlreadyExists(e.to_string()),
            io::ErrorKind::PermissionDenied => VaultError::PermissionDenied(e.to_string()),
            _ => VaultError::Transport(e.to_string()),
        }
    }
}

/// Temporary version file, removed on drop.
struct TempVersion {
    path: PathBuf,
}

impl TempVersion {
    fn write(dir: &Path, data: &[u8]) -> io::Result<Self> {
        let temp = Self {
            path: dir.join(format!(".{}.tmp", uuid::Uuid::new_v4())),
        };
        let mut file = fs::File::create(&temp.path)?;
        file.write_all(data)?;
        file.sync_all()?;
        Ok(temp)
    }
}

impl Drop for TempVersion {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "Failed to remove temp version file")
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct FsVault {
    root: PathBuf,
}

impl FsVault {
    /// Open (and create if needed) a vault rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, VaultError> {
        let vault = Self {
            root: root.as_ref().to_path_buf(),
        };
        fs::create_dir_all(vault.secrets_dir())?;
        Ok(vault)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn secrets_dir(&self) -> PathBuf {
        self.root.join("secrets")
    }

    fn secret_dir(&self, secret_id: &str) -> PathBuf {
        self.secrets_dir().join(secret_id)
    }

    fn version_path(&self, secret_id: &str, version: u64) -> PathBuf {
        self.secret_dir(secret_id)
            .join(format!("{version}.{VERSION_EXT}"))
    }

    /// Version numbers present in a container, unordered.
    fn versions(dir: &Path) -> io::Result<Vec<u64>> {
        let mut out = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(VERSION_EXT) {
                continue;
            }
            if let Some(n) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<u64>().ok())
            {
                out.push(n);
            }
        }
        Ok(out)
    }

    fn create_blocking(&self, secret_id: &str) -> Result<(), VaultError> {
        match fs::create_dir(self.secret_dir(secret_id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(VaultError::AlreadyExists(secret_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn read_latest_blocking(&self, secret_id: &str) -> Result<SecretLookup, VaultError> {
        let dir = self.secret_dir(secret_id);
        let versions = match Self::versions(&dir) {
            Ok(v) => v,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(SecretLookup::NotFound),
            Err(e) => return Err(e.into()),
        };

        let Some(latest) = versions.into_iter().max() else {
            return Ok(SecretLookup::Empty);
        };

        let data = fs::read(self.version_path(secret_id, latest))?;
        Ok(SecretLookup::Found(SecretVersion {
            secret_id: secret_id.to_string(),
            version: latest,
            data,
        }))
    }

    fn append_blocking(&self, secret_id: &str, data: &[u8]) -> Result<u64, VaultError> {
        let dir = self.secret_dir(secret_id);
        let existing = match Self::versions(&dir) {
            Ok(v) => v,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(VaultError::NotFound(secret_id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let temp = TempVersion::write(&dir, data)?;

        let mut version = existing.into_iter().max().unwrap_or(0) + 1;
        loop {
            match fs::hard_link(&temp.path, self.version_path(secret_id, version)) {
                Ok(()) => return Ok(version),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => version += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T, VaultError>
    where
        T: Send + 'static,
        F: FnOnce(FsVault) -> Result<T, VaultError> + Send + 'static,
    {
        let vault = self.clone();
        tokio::task::spawn_blocking(move || op(vault))
            .await
            .map_err(|e| VaultError::Transport(format!("vault task failed: {e}")))?
    }
}

#[async_trait]
impl SecretVault for FsVault {
    async fn create_secret(&self, secret_id: &str) -> Result<(), VaultError> {
        validate_secret_id(secret_id)?;
        let id = secret_id.to_string();
        self.blocking(move |v| v.create_blocking(&id)).await
    }

    async fn access_latest_version(&self, secret_id: &str) -> Result<SecretLookup, VaultError> {
        validate_secret_id(secret_id)?;
        let id = secret_id.to_string();
        self.blocking(move |v| v.read_latest_blocking(&id)).await
    }

    async fn add_version(&self, secret_id: &str, data: &[u8]) -> Result<u64, VaultError> {
        validate_secret_id(secret_id)?;
        let id = secret_id.to_string();
        let data = data.to_vec();
        self.blocking(move |v| v.append_blocking(&id, &data)).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn test_vault() -> (tempfile::TempDir, FsVault) {
        let dir = tempfile::tempdir().unwrap();
        let vault = FsVault::open(dir.path()).unwrap();
        (dir, vault)
    }

    #[tokio::test]
    async fn create_read_append() {
        let (_dir, vault) = test_vault();

        assert_eq!(
            vault.access_latest_version("alice-privatekey").await.unwrap(),
            SecretLookup::NotFound
        );
        vault.create_secret("alice-privatekey").await.unwrap();
        assert_eq!(
            vault.access_latest_version("alice-privatekey").await.unwrap(),
            SecretLookup::Empty
        );
        assert!(matches!(
            vault.create_secret("alice-privatekey").await,
            Err(VaultError::AlreadyExists(_))
        ));

        assert_eq!(vault.add_version("alice-privatekey", b"v1").await.unwrap(), 1);
        assert_eq!(vault.add_version("alice-privatekey", b"v2").await.unwrap(), 2);

        let SecretLookup::Found(latest) = vault.access_latest_version("alice-privatekey").await.unwrap()
        else {
            panic!("expected a version");
        };
        assert_eq!(latest.version, 2);
        assert_eq!(latest.data, b"v2");
    }

    #[tokio::test]
    async fn versions_are_append_only() {
        let (dir, vault) = test_vault();
        vault.create_secret("s").await.unwrap();
        vault.add_version("s", b"first").await.unwrap();
        vault.add_version("s", b"second").await.unwrap();

        let first = fs::read(dir.path().join("secrets/s/1.bin")).unwrap();
        assert_eq!(first, b"first");

        let leftovers: Vec<_> = fs::read_dir(dir.path().join("secrets/s"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn concurrent_appends_get_distinct_versions() {
        let (_dir, vault) = test_vault();
        let vault = Arc::new(vault);
        vault.create_secret("s").await.unwrap();

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let vault = vault.clone();
                tokio::spawn(async move { vault.add_version("s", &[i as u8]).await })
            })
            .collect();

        let mut versions = Vec::new();
        for task in tasks {
            versions.push(task.await.unwrap().unwrap());
        }
        versions.sort_unstable();
        assert_eq!(versions, (1..=8).collect::<Vec<u64>>());
    }

    fn temp_files(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.to_string_lossy().ends_with(".tmp"))
            .collect()
    }

    #[test]
    fn temp_version_is_removed_on_every_exit() {
        let dir = tempfile::tempdir().unwrap();

        let temp = TempVersion::write(dir.path(), b"payload").unwrap();
        assert_eq!(fs::read(&temp.path).unwrap(), b"payload");
        drop(temp);
        assert!(temp_files(dir.path()).is_empty());

        assert!(TempVersion::write(&dir.path().join("missing"), b"x").is_err());
        assert!(temp_files(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn contended_appends_leave_no_temp_files() {
        let (dir, vault) = test_vault();
        let vault = Arc::new(vault);
        vault.create_secret("s").await.unwrap();

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let vault = vault.clone();
                tokio::spawn(async move { vault.add_version("s", &[i as u8]).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert!(temp_files(&dir.path().join("secrets/s")).is_empty());
    }

    #[tokio::test]
    async fn append_requires_container() {
        let (_dir, vault) = test_vault();
        assert!(matches!(
            vault.add_version("missing", b"x").await,
            Err(VaultError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn traversal_ids_are_rejected() {
        let (_dir, vault) = test_vault();
        assert!(matches!(
            vault.create_secret("../escape").await,
            Err(VaultError::InvalidSecretId(_))
        ));
    }
}
