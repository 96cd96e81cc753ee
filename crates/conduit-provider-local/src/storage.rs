//! Filesystem-backed object storage
//!
//! Layout: `<root>/<bucket>/<object_name>`. Object names may contain `/`,
//! which become subdirectories; listing walks them and reports names with
//! `/` separators.

use async_trait::async_trait;
use conduit_core::config::ProviderConfig;
use conduit_core::traits::{StorageProvider, StorageProviderFactory};
use conduit_core::{Error, Result};
use std::path::{Component, Path, PathBuf};
use tokio::fs;

use crate::LOCAL_STORAGE;

/// Filesystem storage provider
#[derive(Debug, Clone)]
pub struct LocalStorageProvider {
    /// Directory holding one subdirectory per bucket
    root: PathBuf,

    /// Dry-run mode: if true, log mutations instead of performing them
    dry_run: bool,
}

impl LocalStorageProvider {
    /// Create a provider rooted at `root`
    pub fn new(root: impl Into<PathBuf>, dry_run: bool) -> Self {
        Self {
            root: root.into(),
            dry_run,
        }
    }

    /// Storage root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `bucket/object` under the root, rejecting anything that
    /// would escape it
    fn object_path(&self, bucket: &str, object_name: &str) -> Result<PathBuf> {
        let bucket = safe_relative(bucket, "bucket")?;
        let object = safe_relative(object_name, "object name")?;
        Ok(self.root.join(bucket).join(object))
    }

    fn url_for(path: &Path) -> String {
        format!("file://{}", path.display())
    }
}

fn safe_relative<'a>(name: &'a str, what: &str) -> Result<&'a Path> {
    let path = Path::new(name);
    let valid = !name.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if !valid {
        return Err(Error::permanent(
            LOCAL_STORAGE,
            format!("invalid {}: '{}'", what, name),
        ));
    }
    Ok(path)
}

fn io_error(action: &str, path: &Path, e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::NotFound {
        Error::not_found(format!("{}", path.display()))
    } else {
        Error::transient(
            LOCAL_STORAGE,
            format!("failed to {} {}: {}", action, path.display(), e),
        )
    }
}

#[async_trait]
impl StorageProvider for LocalStorageProvider {
    async fn upload(&self, file: &Path, bucket: &str, object_name: Option<&str>) -> Result<String> {
        let name = match object_name {
            Some(name) => name.to_string(),
            None => file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| Error::validation("file has no name"))?,
        };
        let target = self.object_path(bucket, &name)?;

        if !file.exists() {
            return Err(Error::not_found(format!("{}", file.display())));
        }

        if self.dry_run {
            tracing::info!("[dry-run] would copy {} to {}", file.display(), target.display());
            return Ok(Self::url_for(&target));
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error("create", parent, e))?;
        }
        fs::copy(file, &target)
            .await
            .map_err(|e| io_error("write", &target, e))?;

        tracing::debug!("Stored {} as {}", file.display(), target.display());
        Ok(Self::url_for(&target))
    }

    async fn download(
        &self,
        object_name: &str,
        bucket: &str,
        destination: &Path,
    ) -> Result<PathBuf> {
        let source = self.object_path(bucket, object_name)?;
        if !source.is_file() {
            return Err(Error::not_found(format!("object {}/{}", bucket, object_name)));
        }

        if let Some(parent) = destination.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error("create", parent, e))?;
        }
        fs::copy(&source, destination)
            .await
            .map_err(|e| io_error("copy", &source, e))?;

        Ok(destination.to_path_buf())
    }

    async fn delete(&self, object_name: &str, bucket: &str) -> Result<bool> {
        let path = self.object_path(bucket, object_name)?;
        if !path.is_file() {
            return Ok(false);
        }

        if self.dry_run {
            tracing::info!("[dry-run] would delete {}", path.display());
            return Ok(true);
        }

        fs::remove_file(&path)
            .await
            .map_err(|e| io_error("delete", &path, e))?;
        Ok(true)
    }

    async fn list(&self, bucket: &str, prefix: Option<&str>) -> Result<Vec<String>> {
        let bucket_dir = self.root.join(safe_relative(bucket, "bucket")?);
        if !bucket_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        let mut pending = vec![bucket_dir.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir)
                .await
                .map_err(|e| io_error("read", &dir, e))?;
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| io_error("read", &dir, e))?
            {
                let path = entry.path();
                if path.is_dir() {
                    pending.push(path);
                    continue;
                }
                let Ok(relative) = path.strip_prefix(&bucket_dir) else {
                    continue;
                };
                let name = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                if prefix.is_none_or(|p| name.starts_with(p)) {
                    names.push(name);
                }
            }
        }

        names.sort();
        Ok(names)
    }

    fn provider_name(&self) -> &str {
        LOCAL_STORAGE
    }
}

/// Factory for creating local storage providers
///
/// Requires `root`. `dry_run` defaults to false.
pub struct LocalStorageFactory;

#[async_trait]
impl StorageProviderFactory for LocalStorageFactory {
    async fn create(&self, config: &ProviderConfig) -> Result<Box<dyn StorageProvider>> {
        let root = config.require_str("root")?;
        let dry_run = config.get_bool("dry_run").unwrap_or(false);

        if dry_run {
            tracing::warn!("Local storage running in DRY-RUN mode - no files will be changed");
        }

        Ok(Box::new(LocalStorageProvider::new(root, dry_run)))
    }
}
