//! Temp-file-and-rename writer used by [`WriteMode::Atomic`](crate::WriteMode::Atomic)

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Writes to `<path>.tmp` and renames it over `<path>` on commit.
///
/// Dropping the writer without committing removes the temporary file and
/// leaves the target untouched.
pub(crate) struct AtomicWriter {
    temp_path: PathBuf,
    final_path: PathBuf,
    file: Option<File>,
}

impl AtomicWriter {
    pub(crate) fn create(path: &Path) -> io::Result<Self> {
        let final_path = path.to_path_buf();
        let temp_path = Self::temp_path(&final_path);
        let file = File::create(&temp_path)?;

        Ok(Self {
            temp_path,
            final_path,
            file: Some(file),
        })
    }

    pub(crate) fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.write_all(data),
            None => Err(io::Error::other("atomic writer already committed")),
        }
    }

    /// Flush, sync and rename the temporary file into place
    pub(crate) fn commit(mut self) -> io::Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
            file.sync_all()?;
        }
        fs::rename(&self.temp_path, &self.final_path)
    }

    pub(crate) fn temp_path(final_path: &Path) -> PathBuf {
        let mut temp = final_path.as_os_str().to_owned();
        temp.push(".tmp");
        PathBuf::from(temp)
    }
}

impl Drop for AtomicWriter {
    fn drop(&mut self) {
        // after a successful rename the temp path no longer exists
        let _ = fs::remove_file(&self.temp_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_commit_replaces_target() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("features.properties");
        fs::write(&path, "old=1\n").unwrap();

        let mut writer = AtomicWriter::create(&path).unwrap();
        writer.write_all(b"new=").unwrap();
        writer.write_all(b"2\n").unwrap();
        writer.commit().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new=2\n");
        assert!(!AtomicWriter::temp_path(&path).exists());
    }

    #[test]
    fn test_drop_without_commit_leaves_target() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("features.properties");
        fs::write(&path, "old=1\n").unwrap();

        {
            let mut writer = AtomicWriter::create(&path).unwrap();
            writer.write_all(b"discarded=1\n").unwrap();
        }

        assert_eq!(fs::read_to_string(&path).unwrap(), "old=1\n");
        assert!(!AtomicWriter::temp_path(&path).exists());
    }

    #[test]
    fn test_temp_path_suffix() {
        let temp = AtomicWriter::temp_path(Path::new("/etc/flags/features.properties"));
        assert_eq!(temp, PathBuf::from("/etc/flags/features.properties.tmp"));
    }
}
