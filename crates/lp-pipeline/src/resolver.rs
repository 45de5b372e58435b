//! Lookup of legacy on-disk image references.

use std::path::{Component, Path, PathBuf};

/// Resolves a legacy `image_path` to the bytes it once pointed at.
///
/// `None` means the reference is stale: the file is gone, empty, or
/// unreadable. Resolvers never fail the caller.
pub trait LegacyResolver: Send + Sync {
    fn resolve(&self, path: &str) -> Option<Vec<u8>>;
}

/// Resolves legacy paths against a local directory.
///
/// `photo.jpg`, `/photo.jpg` and, for a root named `uploads`,
/// `/uploads/photo.jpg` all name `<root>/photo.jpg`. Paths that climb out of
/// the root are refused.
#[derive(Debug, Clone)]
pub struct FsResolver {
    root: PathBuf,
}

impl FsResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a legacy reference to a file under the root.
    fn locate(&self, legacy: &str) -> Option<PathBuf> {
        let relative = Path::new(legacy.trim().trim_start_matches(['/', '\\']));

        let mut parts = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => parts.push(part),
                Component::CurDir => {}
                _ => return None,
            }
        }

        if parts.len() > 1 && self.root.file_name() == Some(parts[0]) {
            parts.remove(0);
        }
        if parts.is_empty() {
            return None;
        }

        let mut full = self.root.clone();
        full.extend(parts);
        Some(full)
    }
}

impl LegacyResolver for FsResolver {
    fn resolve(&self, path: &str) -> Option<Vec<u8>> {
        let Some(full) = self.locate(path) else {
            tracing::warn!(legacy_path = path, "Ignoring unusable legacy path");
            return None;
        };

        match std::fs::read(&full) {
            Ok(bytes) if bytes.is_empty() => {
                tracing::debug!("Legacy file {} is empty", full.display());
                None
            }
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Legacy file {} is gone", full.display());
                None
            }
            Err(e) => {
                tracing::warn!("Failed to read legacy file {}: {e}", full.display());
                None
            }
        }
    }
}
