//! Page storage module
//!
//! Persists each page as `<data_dir>/<title>.txt`. Every load re-reads the
//! file and every save replaces it whole; nothing is cached in memory.

use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::{is_valid_title, Page};
use crate::logger;

const PAGE_EXTENSION: &str = "txt";

/// Sequence for temporary file names, unique within the process
static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Why a page could not be loaded
///
/// Callers treat every variant as "page not found"; the variants exist so the
/// cause can be logged.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("invalid page title '{0}'")]
    InvalidTitle(String),
    #[error("page file {} does not exist", .0.display())]
    Missing(PathBuf),
    #[error("permission denied reading {}", .0.display())]
    PermissionDenied(PathBuf),
    #[error("read {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

/// Why a page could not be saved
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("invalid page title '{0}'")]
    InvalidTitle(String),
    #[error("write {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

/// File-backed page store, one file per title
#[derive(Debug, Clone)]
pub struct PageStore {
    data_dir: PathBuf,
}

impl PageStore {
    /// Create a store rooted at `data_dir` without touching the filesystem
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Create a store rooted at `data_dir`, creating the directory if needed
    pub fn open(data_dir: impl Into<PathBuf>) -> io::Result<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self::new(data_dir))
    }

    /// Map a title to its page file
    ///
    /// Returns `None` for any title that is not strictly alphanumeric, so no
    /// separator, `..` or absolute path can ever reach the join.
    pub fn page_path(&self, title: &str) -> Option<PathBuf> {
        if !is_valid_title(title) {
            return None;
        }
        Some(self.data_dir.join(format!("{title}.{PAGE_EXTENSION}")))
    }

    /// Read a page from disk
    pub async fn load(&self, title: &str) -> Result<Page, LoadError> {
        let path = self
            .page_path(title)
            .ok_or_else(|| LoadError::InvalidTitle(title.to_string()))?;
        logger::log_info(&format!("[Store] Loading page '{title}'"));

        match fs::read(&path).await {
            Ok(body) => Ok(Page::new(title, body)),
            Err(e) => Err(match e.kind() {
                ErrorKind::NotFound => LoadError::Missing(path),
                ErrorKind::PermissionDenied => LoadError::PermissionDenied(path),
                _ => LoadError::Io { path, source: e },
            }),
        }
    }

    /// Write a page to disk, replacing any previous content
    ///
    /// The body is written to a hidden temporary file that is then renamed
    /// over the page file. Concurrent saves of one title are not coordinated;
    /// the last rename wins.
    pub async fn save(&self, page: &Page) -> Result<(), SaveError> {
        let path = self
            .page_path(&page.title)
            .ok_or_else(|| SaveError::InvalidTitle(page.title.clone()))?;
        logger::log_info(&format!("[Store] Writing to file '{}'", path.display()));

        let temp_path = self.temp_path(&page.title);
        if let Err(source) = write_owner_only(&temp_path, &page.body).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(SaveError::Io { path, source });
        }

        if let Err(source) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(SaveError::Io { path, source });
        }
        Ok(())
    }

    /// Temporary file next to the page file; the leading dot and trailing
    /// extension keep it out of the page namespace
    fn temp_path(&self, title: &str) -> PathBuf {
        let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
        self.data_dir.join(format!(
            ".{title}.{PAGE_EXTENSION}.{}.{seq}.tmp",
            std::process::id()
        ))
    }
}

/// Create `path` with owner-only permissions and write `data` to it
async fn write_owner_only(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    file.write_all(data).await?;
    file.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, PageStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = PageStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let (_dir, store) = temp_store();
        let page = Page::new("Test", "Hello World");
        store.save(&page).await.unwrap();

        let loaded = store.load("Test").await.unwrap();
        assert_eq!(loaded, page);
    }

    #[tokio::test]
    async fn test_save_writes_raw_body_to_title_file() {
        let (dir, store) = temp_store();
        store.save(&Page::new("Test", "Hello World")).await.unwrap();

        let on_disk = std::fs::read(dir.path().join("Test.txt")).unwrap();
        assert_eq!(on_disk, b"Hello World");
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let (_dir, store) = temp_store();
        store.save(&Page::new("Notes", "first draft")).await.unwrap();
        store.save(&Page::new("Notes", "second")).await.unwrap();

        let loaded = store.load("Notes").await.unwrap();
        assert_eq!(loaded.body, b"second");
    }

    #[tokio::test]
    async fn test_empty_body_is_saved() {
        let (_dir, store) = temp_store();
        store.save(&Page::new("Empty", "")).await.unwrap();

        let loaded = store.load("Empty").await.unwrap();
        assert!(loaded.body.is_empty());
    }

    #[tokio::test]
    async fn test_save_leaves_no_temp_files() {
        let (dir, store) = temp_store();
        store.save(&Page::new("A", "one")).await.unwrap();
        store.save(&Page::new("A", "two")).await.unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["A.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_load_missing_page() {
        let (_dir, store) = temp_store();
        let err = store.load("Missing").await.unwrap_err();
        assert!(matches!(err, LoadError::Missing(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_load_directory_is_io_error() {
        let (dir, store) = temp_store();
        std::fs::create_dir(dir.path().join("Dir.txt")).unwrap();

        let err = store.load("Dir").await.unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_load_unreadable_file_is_permission_denied() {
        use std::os::unix::fs::PermissionsExt;

        let (dir, store) = temp_store();
        let path = dir.path().join("Locked.txt");
        std::fs::write(&path, "secret").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users read through the mode bits
        if std::fs::read(&path).is_ok() {
            return;
        }
        let err = store.load("Locked").await.unwrap_err();
        assert!(matches!(err, LoadError::PermissionDenied(_)), "got {err:?}");
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_load_sees_whole_body() {
        let (_dir, store) = temp_store();
        let old = vec![b'a'; 256 * 1024];
        let new = vec![b'b'; 512 * 1024];
        store.save(&Page::new("Race", old.clone())).await.unwrap();

        let writer = {
            let store = store.clone();
            let (old, new) = (old.clone(), new.clone());
            tokio::spawn(async move {
                for i in 0..40 {
                    let body = if i % 2 == 0 { &new } else { &old };
                    store.save(&Page::new("Race", body.clone())).await.unwrap();
                }
            })
        };
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                let (old, new) = (old.clone(), new.clone());
                tokio::spawn(async move {
                    for _ in 0..40 {
                        let body = store.load("Race").await.unwrap().body;
                        assert!(
                            body == old || body == new,
                            "partial body of {} bytes",
                            body.len()
                        );
                    }
                })
            })
            .collect();

        writer.await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_traversal_titles_rejected() {
        let (dir, store) = temp_store();
        for title in ["../escape", "a/b", "..", "", "/etc/passwd", "a\\b"] {
            let err = store.save(&Page::new(title, "x")).await.unwrap_err();
            assert!(matches!(err, SaveError::InvalidTitle(_)), "title {title:?}");

            let err = store.load(title).await.unwrap_err();
            assert!(matches!(err, LoadError::InvalidTitle(_)), "title {title:?}");
        }
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_save_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = PageStore::new(dir.path().join("absent"));

        let err = store.save(&Page::new("Test", "body")).await.unwrap_err();
        assert!(matches!(err, SaveError::Io { .. }));
        assert!(err.to_string().contains("Test.txt"));
    }

    #[test]
    fn test_open_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("nested").join("data");
        let store = PageStore::open(&data_dir).unwrap();
        assert!(data_dir.is_dir());
        assert_eq!(store.page_path("A"), Some(data_dir.join("A.txt")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let (dir, store) = temp_store();
        store.save(&Page::new("Secret", "body")).await.unwrap();

        let mode = std::fs::metadata(dir.path().join("Secret.txt"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
