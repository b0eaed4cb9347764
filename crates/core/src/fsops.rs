//! Shared filesystem helpers.

use std::path::Path;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

/// Moves a file, falling back to copy+remove when the rename crosses a
/// filesystem boundary (EXDEV).
pub async fn move_file(source: &Path, destination: &Path) -> std::io::Result<()> {
    match fs::rename(source, destination).await {
        Ok(()) => Ok(()),
        Err(e)
            if e.kind() == std::io::ErrorKind::CrossesDevices || e.raw_os_error() == Some(18) =>
        {
            fs::copy(source, destination).await?;
            fs::remove_file(source).await?;
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Writes `contents` to `path` atomically: a sibling temporary file is
/// written and fsynced, then renamed over the destination. A crash mid-write
/// leaves the previous contents of `path` intact.
pub async fn atomic_write(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let tmp = tmp_path(path);

    let mut file = File::create(&tmp).await?;
    file.write_all(contents).await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(&tmp, path).await
}

/// Sibling temporary path used by [`atomic_write`].
pub fn tmp_path(path: &Path) -> std::path::PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    name.push_str(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_tmp_path() {
        assert_eq!(
            tmp_path(Path::new("/data/feed.json")),
            PathBuf::from("/data/feed.json.tmp")
        );
    }

    #[tokio::test]
    async fn test_move_file_same_fs() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.bin");
        let dst = dir.path().join("b.bin");
        fs::write(&src, b"payload").await.unwrap();

        move_file(&src, &dst).await.unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read(&dst).await.unwrap(), b"payload");
    }

    #[tokio::test]
    async fn test_atomic_write_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");

        atomic_write(&path, b"first").await.unwrap();
        atomic_write(&path, b"second").await.unwrap();

        assert_eq!(fs::read(&path).await.unwrap(), b"second");
        assert!(!tmp_path(&path).exists());
    }
}
