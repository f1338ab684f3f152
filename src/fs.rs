//! File access used by validation and the provider.
//!
//! The kernel files under `/proc` and the PID files are only reached through
//! [`FileAccess`], so the whole read-validate-write sequence can run against
//! a temporary directory or an in-memory map instead of the live kernel.

use ahash::AHashMap as HashMap;
use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Minimal file operations needed to manage an OOM adjustment.
pub trait FileAccess {
    /// Reads the first line of `path` without its line terminator.
    ///
    /// An empty file is an error (there is no first line).
    fn read_first_line(&self, path: &Path) -> io::Result<String>;

    /// Replaces the contents of an existing file. Never creates the file.
    fn overwrite(&self, path: &Path, contents: &str) -> io::Result<()>;

    /// Returns true if `path` exists.
    fn exists(&self, path: &Path) -> bool;
}

impl<T: FileAccess + ?Sized> FileAccess for &T {
    fn read_first_line(&self, path: &Path) -> io::Result<String> {
        (**self).read_first_line(path)
    }

    fn overwrite(&self, path: &Path, contents: &str) -> io::Result<()> {
        (**self).overwrite(path, contents)
    }

    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }
}

/// Strips one trailing line terminator (`\n`, `\r\n` or `\r`).
pub fn chomp(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

/// Access to the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostFs;

impl FileAccess for HostFs {
    fn read_first_line(&self, path: &Path) -> io::Result<String> {
        let file = fs::File::open(path)?;
        let mut reader = BufReader::new(file);
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("{} is empty", path.display()),
            ));
        }
        Ok(chomp(&line).to_string())
    }

    fn overwrite(&self, path: &Path, contents: &str) -> io::Result<()> {
        // /proc entries cannot be created, so a missing file must fail here.
        let mut file = OpenOptions::new().write(true).truncate(true).open(path)?;
        file.write_all(contents.as_bytes())?;
        file.flush()
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// In-memory file map for tests and dry runs.
///
/// A path "exists" if it is a stored file or a parent directory of one.
#[derive(Debug, Default)]
pub struct MemoryFs {
    files: RwLock<HashMap<PathBuf, String>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or replaces a file.
    pub fn insert(
        &self,
        path: impl Into<PathBuf>,
        contents: impl Into<String>,
    ) -> io::Result<()> {
        let mut files = self.files.write().map_err(|_| lock_poisoned())?;
        files.insert(path.into(), contents.into());
        Ok(())
    }

    pub fn remove(&self, path: &Path) -> Option<String> {
        self.files.write().ok()?.remove(path)
    }

    /// Returns the full contents of a stored file.
    pub fn contents(&self, path: &Path) -> Option<String> {
        self.files.read().ok()?.get(path).cloned()
    }
}

fn lock_poisoned() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "memory filesystem lock poisoned")
}

impl FileAccess for MemoryFs {
    fn read_first_line(&self, path: &Path) -> io::Result<String> {
        let files = self.files.read().map_err(|_| lock_poisoned())?;
        let contents = files
            .get(path)
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;
        match contents.split_inclusive('\n').next() {
            Some(line) => Ok(chomp(line).to_string()),
            None => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("{} is empty", path.display()),
            )),
        }
    }

    fn overwrite(&self, path: &Path, contents: &str) -> io::Result<()> {
        let mut files = self.files.write().map_err(|_| lock_poisoned())?;
        match files.get_mut(path) {
            Some(existing) => {
                *existing = contents.to_string();
                Ok(())
            }
            None => Err(io::Error::from(io::ErrorKind::NotFound)),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        match self.files.read() {
            Ok(files) => files.keys().any(|p| p.starts_with(path)),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_chomp() {
        assert_eq!(chomp("4821\n"), "4821");
        assert_eq!(chomp("4821\r\n"), "4821");
        assert_eq!(chomp("4821"), "4821");
        assert_eq!(chomp("4821\n\n"), "4821\n");
        assert_eq!(chomp(" -17 \n"), " -17 ");
    }

    #[test]
    fn test_host_fs_reads_first_line_only() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("app.pid");
        fs::write(&path, "4821\nstale\n").expect("Failed to write pid file");

        assert_eq!(HostFs.read_first_line(&path).unwrap(), "4821");
    }

    #[test]
    fn test_host_fs_empty_file_has_no_first_line() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("empty.pid");
        fs::write(&path, "").expect("Failed to write pid file");

        let err = HostFs.read_first_line(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_host_fs_overwrite_replaces_contents() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("oom_score_adj");
        fs::write(&path, "0\n").expect("Failed to seed file");

        HostFs.overwrite(&path, "-500").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "-500");
    }

    #[test]
    fn test_host_fs_overwrite_does_not_create() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("oom_adj");

        let err = HostFs.overwrite(&path, "-17").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(!path.exists());
    }

    #[test]
    fn test_memory_fs_behaves_like_proc() {
        let mem = MemoryFs::new();
        mem.insert("/proc/7/oom_score_adj", "0\n").unwrap();

        assert!(mem.exists(Path::new("/proc/7/oom_score_adj")));
        assert!(mem.exists(Path::new("/proc/7")));
        assert!(!mem.exists(Path::new("/proc/8")));

        assert_eq!(
            mem.read_first_line(Path::new("/proc/7/oom_score_adj")).unwrap(),
            "0"
        );

        mem.overwrite(Path::new("/proc/7/oom_score_adj"), "-1000")
            .unwrap();
        assert_eq!(
            mem.contents(Path::new("/proc/7/oom_score_adj")).as_deref(),
            Some("-1000")
        );

        let err = mem
            .overwrite(Path::new("/proc/7/oom_adj"), "-17")
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_memory_fs_insert_reports_poisoned_lock() {
        let mem = std::sync::Arc::new(MemoryFs::new());
        let held = std::sync::Arc::clone(&mem);
        let _ = std::thread::spawn(move || {
            let _guard = held.files.write().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert!(mem.insert("/proc/7/oom_adj", "0\n").is_err());
        assert!(mem.overwrite(Path::new("/proc/7/oom_adj"), "-17").is_err());
    }
}
