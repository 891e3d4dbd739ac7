use std::path::{Path, PathBuf};

use typed_path::UnixPathBuf;

/// Reserved directory under the mount root holding in-progress multipart
/// uploads. Never listed as a bucket.
pub const STAGING_DIR: &str = ".tapera";

const ETAG_ATTR: &str = "etag";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid path component")]
    Path(#[from] typed_path::CheckedPathError),
    #[error("path is not valid unicode")]
    Encoding,
}

/// Maps a bucket and key to a location under `mount`.
///
/// The bucket and key are pushed onto a virtual rooted path with
/// traversal checking, so a key like `../../etc/passwd` is rejected
/// instead of escaping the mount.
pub fn resolve(mount: &Path, bucket: &str, key: &str) -> Result<PathBuf, StoreError> {
    let mut root = UnixPathBuf::from("/");
    root.push_checked(bucket)?;
    if !key.is_empty() {
        root.push_checked(key)?;
    }
    let normalized = root.normalize();
    let relative = normalized
        .to_str()
        .ok_or(StoreError::Encoding)?
        .trim_start_matches('/');
    Ok(mount.join(relative))
}

/// Sets a `user.` extended attribute on `path`.
pub fn set_xattr(path: &Path, key: &str, value: &str) -> std::io::Result<()> {
    xattr::set(path, format!("user.{key}"), value.as_bytes())
}

/// Reads a `user.` extended attribute from `path`.
///
/// An attribute that is not set surfaces as `NotFound`.
pub fn get_xattr(path: &Path, key: &str) -> std::io::Result<String> {
    let value = xattr::get(path, format!("user.{key}"))?.ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::NotFound, "attribute not set")
    })?;
    String::from_utf8(value).map_err(|_| {
        std::io::Error::new(std::io::ErrorKind::InvalidData, "attribute is not utf-8")
    })
}

pub fn object_etag(path: &Path) -> std::io::Result<String> {
    get_xattr(path, ETAG_ATTR)
}

pub fn set_object_etag(path: &Path, etag: &str) -> std::io::Result<()> {
    set_xattr(path, ETAG_ATTR, etag)
}

/// Removes empty directories left behind between a deleted `path` and
/// `stop_root`, walking upward. `stop_root` itself is never removed.
///
/// Removal failures are ignored: a concurrent create simply keeps the
/// directory alive.
pub async fn cleanup_empty_dirs(path: &Path, stop_root: &Path) {
    let Some(start) = path.parent() else { return };
    let mut dir = start.to_path_buf();
    while dir != stop_root && dir.starts_with(stop_root) {
        if let Ok(mut entries) = tokio::fs::read_dir(&dir).await
            && entries.next_entry().await.ok().flatten().is_none()
        {
            let _ = tokio::fs::remove_dir(&dir).await;
        }
        let Some(parent) = dir.parent() else { break };
        dir = parent.to_path_buf();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_nested_keys_under_the_mount() {
        let path = resolve(Path::new("/srv/mount"), "docs", "reports/2024/q1.pdf").unwrap();
        assert_eq!(path, Path::new("/srv/mount/docs/reports/2024/q1.pdf"));
    }

    #[test]
    fn resolves_bucket_without_key() {
        let path = resolve(Path::new("/srv/mount"), "docs", "").unwrap();
        assert_eq!(path, Path::new("/srv/mount/docs"));
    }

    #[test]
    fn rejects_keys_escaping_the_mount() {
        assert!(resolve(Path::new("/srv/mount"), "docs", "../../etc/passwd").is_err());
        assert!(resolve(Path::new("/srv/mount"), "..", "key").is_err());
        assert!(resolve(Path::new("/srv/mount"), "docs", "/etc/passwd").is_err());
    }

    #[test]
    fn drops_trailing_separator_from_directory_keys() {
        let path = resolve(Path::new("/srv/mount"), "docs", "folder/").unwrap();
        assert_eq!(path, Path::new("/srv/mount/docs/folder"));
    }

    #[tokio::test]
    async fn reclaims_empty_directories_up_to_the_bucket() {
        let tmp = tempfile::tempdir().unwrap();
        let bucket = tmp.path().join("bucket");
        let leaf = bucket.join("nested/deep");
        tokio::fs::create_dir_all(&leaf).await.unwrap();

        cleanup_empty_dirs(&leaf.join("a.txt"), &bucket).await;

        assert!(!bucket.join("nested").exists());
        assert!(bucket.exists());
    }

    #[tokio::test]
    async fn keeps_directories_with_remaining_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let bucket = tmp.path().join("bucket");
        let leaf = bucket.join("nested/deep");
        tokio::fs::create_dir_all(&leaf).await.unwrap();
        tokio::fs::write(bucket.join("nested/other.txt"), b"keep")
            .await
            .unwrap();

        cleanup_empty_dirs(&leaf.join("a.txt"), &bucket).await;

        assert!(!leaf.exists());
        assert!(bucket.join("nested").exists());
    }

    #[tokio::test]
    async fn never_removes_the_stop_root() {
        let tmp = tempfile::tempdir().unwrap();
        let bucket = tmp.path().join("bucket");
        tokio::fs::create_dir_all(&bucket).await.unwrap();

        cleanup_empty_dirs(&bucket.join("a.txt"), &bucket).await;

        assert!(bucket.exists());
    }

    #[test]
    fn round_trips_the_etag_attribute() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("object");
        std::fs::write(&file, b"body").unwrap();

        if set_object_etag(&file, "841a2d689ad86bd1611447453c22c6fc").is_err() {
            eprintln!("skip: filesystem does not support user xattrs");
            return;
        }
        assert_eq!(
            object_etag(&file).unwrap(),
            "841a2d689ad86bd1611447453c22c6fc"
        );
    }

    #[test]
    fn missing_etag_attribute_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("object");
        std::fs::write(&file, b"body").unwrap();

        // Probe whether the filesystem supports user xattrs at all.
        if set_xattr(&file, "probe", "x").is_err() {
            eprintln!("skip: filesystem does not support user xattrs");
            return;
        }
        let err = object_etag(&file).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
