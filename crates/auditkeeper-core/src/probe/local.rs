/// [`FileProbe`] backed by the local filesystem.
///
/// Recursive listings use `jwalk`'s rayon-backed parallel walker so a
/// temp-results folder with many nested run directories is listed quickly.
use super::{FileProbe, FileStat, ListedFile};
use std::io;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalProbe;

impl LocalProbe {
    pub fn new() -> Self {
        Self
    }
}

impl FileProbe for LocalProbe {
    fn exists(&self, path: &Path) -> io::Result<bool> {
        path.try_exists()
    }

    fn stat(&self, path: &Path) -> io::Result<FileStat> {
        let meta = std::fs::metadata(path)?;
        Ok(FileStat {
            size: meta.len(),
            modified: meta.modified().ok(),
            is_file: meta.is_file(),
        })
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<u64> {
        std::fs::copy(from, to)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        std::fs::write(path, contents)
    }

    fn list_files(&self, dir: &Path) -> io::Result<Vec<ListedFile>> {
        if !dir.try_exists()? {
            debug!("{} does not exist; nothing to list", dir.display());
            return Ok(Vec::new());
        }
        if !dir.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a directory", dir.display()),
            ));
        }

        let walker = jwalk::WalkDir::new(dir)
            .skip_hidden(false)
            .follow_links(false)
            .sort(true)
            .parallelism(jwalk::Parallelism::RayonNewPool(num_cpus::get()));

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    // Unreadable sub-directory: skip it, keep listing the rest.
                    warn!("Skipping entry under {}: {}", dir.display(), e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            match entry.metadata() {
                Ok(meta) => files.push(ListedFile {
                    size: meta.len(),
                    modified: meta.modified().ok(),
                    path,
                }),
                Err(e) => {
                    // Vanished between readdir and stat.
                    debug!("Could not stat {}: {}", path.display(), e);
                }
            }
        }
        Ok(files)
    }
}
