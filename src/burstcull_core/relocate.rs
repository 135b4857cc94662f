use crate::burstcull_core::config::QUARANTINE_DIR_NAME;
use crate::burstcull_core::error::{CullError, Result};
use serde::{Deserialize, Serialize};
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Where a quarantined file came from and where it went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuarantineRecord {
    pub original_path: PathBuf,
    pub destination_path: PathBuf,
}

/// File-move primitive used by the relocator.
pub trait FileMover {
    fn move_file(&self, from: &Path, to: &Path) -> io::Result<()>;
}

/// Moves files on the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsMover;

impl FileMover for FsMover {
    fn move_file(&self, from: &Path, to: &Path) -> io::Result<()> {
        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(rename_err) => {
                // Renames fail across filesystems; copy then remove instead
                log::debug!(
                    "Rename {} -> {} failed ({}), copying",
                    from.display(),
                    to.display(),
                    rename_err
                );
                if let Err(copy_err) = fs::copy(from, to) {
                    log::debug!("Copy failed: {}", copy_err);
                    if to.exists() {
                        if let Err(cleanup_err) = fs::remove_file(to) {
                            log::debug!("Cleanup of {} failed: {}", to.display(), cleanup_err);
                        }
                    }
                    return Err(rename_err);
                }
                fs::remove_file(from)
            }
        }
    }
}

/// Moves files into a quarantine folder and back. Never overwrites.
#[derive(Debug, Clone)]
pub struct Relocator<M: FileMover = FsMover> {
    quarantine_dir: PathBuf,
    mover: M,
}

impl Relocator<FsMover> {
    /// Relocator for the quarantine folder directly under `root`.
    pub fn for_root(root: &Path) -> Self {
        Relocator::new(quarantine_dir_for(root), FsMover)
    }
}

impl<M: FileMover> Relocator<M> {
    pub fn new(quarantine_dir: PathBuf, mover: M) -> Self {
        Relocator {
            quarantine_dir,
            mover,
        }
    }

    pub fn quarantine_dir(&self) -> &Path {
        &self.quarantine_dir
    }

    /// Move `path` into quarantine, picking `name_1.ext`, `name_2.ext`, ... when
    /// the name is taken.
    pub fn relocate(&self, path: &Path) -> Result<QuarantineRecord> {
        let file_name = path
            .file_name()
            .ok_or_else(|| CullError::Argument(format!("Not a file path: {}", path.display())))?;

        if path.symlink_metadata().is_err() {
            return Err(CullError::PathNotFound(path.to_path_buf()));
        }

        fs::create_dir_all(&self.quarantine_dir)
            .map_err(|e| CullError::access(&self.quarantine_dir, e))?;

        let destination = free_destination(&self.quarantine_dir, file_name);
        self.mover
            .move_file(path, &destination)
            .map_err(|e| CullError::access(path, e))?;

        log::info!("Quarantined {} -> {}", path.display(), destination.display());

        Ok(QuarantineRecord {
            original_path: path.to_path_buf(),
            destination_path: destination,
        })
    }

    /// Move a quarantined file back. Fails if something now sits at the
    /// original path.
    pub fn restore(&self, record: &QuarantineRecord) -> Result<()> {
        let original = &record.original_path;
        let destination = &record.destination_path;

        if original.symlink_metadata().is_ok() {
            return Err(CullError::RestoreConflict(original.clone()));
        }
        if destination.symlink_metadata().is_err() {
            return Err(CullError::PathNotFound(destination.clone()));
        }

        if let Some(parent) = original.parent() {
            fs::create_dir_all(parent).map_err(|e| CullError::access(parent, e))?;
        }

        self.mover
            .move_file(destination, original)
            .map_err(|e| CullError::access(destination, e))?;

        log::info!("Restored {} -> {}", destination.display(), original.display());
        Ok(())
    }

    /// Number of files and total bytes under the quarantine folder.
    pub fn quarantine_size(&self) -> Result<(usize, u64)> {
        if !self.quarantine_dir.exists() {
            return Ok((0, 0));
        }

        let mut files = 0;
        let mut bytes = 0;
        for entry in WalkDir::new(&self.quarantine_dir) {
            let entry = entry?;
            if entry.file_type().is_file() {
                files += 1;
                bytes += entry.metadata()?.len();
            }
        }
        Ok((files, bytes))
    }
}

pub fn quarantine_dir_for(root: &Path) -> PathBuf {
    root.join(QUARANTINE_DIR_NAME)
}

/// First unused name for `file_name` in `dir`.
pub fn free_destination(dir: &Path, file_name: &OsStr) -> PathBuf {
    let candidate = dir.join(file_name);
    if candidate.symlink_metadata().is_err() {
        return candidate;
    }

    let name = Path::new(file_name);
    let stem = name.file_stem().unwrap_or(file_name);
    let extension = name.extension();

    let mut n = 1u32;
    loop {
        let mut numbered = OsString::from(stem);
        numbered.push(format!("_{}", n));
        if let Some(ext) = extension {
            numbered.push(".");
            numbered.push(ext);
        }

        let candidate = dir.join(numbered);
        if candidate.symlink_metadata().is_err() {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    struct FailingMover;

    impl FileMover for FailingMover {
        fn move_file(&self, _from: &Path, _to: &Path) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
        }
    }

    #[test]
    fn test_relocate_creates_folder() {
        let temp = assert_fs::TempDir::new().unwrap();
        let photo = temp.child("img1.jpg");
        photo.write_str("one").unwrap();

        let relocator = Relocator::for_root(temp.path());
        let record = relocator.relocate(photo.path()).unwrap();

        assert_eq!(record.destination_path, temp.path().join("_culled").join("img1.jpg"));
        assert!(!photo.path().exists());
        assert_eq!(fs::read_to_string(&record.destination_path).unwrap(), "one");
    }

    #[test]
    fn test_collision_appends_counter() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("_culled").child("img1.jpg").write_str("old").unwrap();
        let photo = temp.child("img1.jpg");
        photo.write_str("new").unwrap();

        let relocator = Relocator::for_root(temp.path());
        let record = relocator.relocate(photo.path()).unwrap();

        assert_eq!(record.destination_path.file_name().unwrap(), "img1_1.jpg");
        assert_eq!(
            fs::read_to_string(temp.path().join("_culled").join("img1.jpg")).unwrap(),
            "old"
        );
    }

    #[test]
    fn test_same_names_from_different_folders_are_recoverable() {
        let temp = assert_fs::TempDir::new().unwrap();
        let first = temp.child("a").child("img1.jpg");
        let second = temp.child("b").child("img1.jpg");
        first.write_str("first").unwrap();
        second.write_str("second").unwrap();

        let relocator = Relocator::for_root(temp.path());
        let r1 = relocator.relocate(first.path()).unwrap();
        let r2 = relocator.relocate(second.path()).unwrap();
        assert_ne!(r1.destination_path, r2.destination_path);

        relocator.restore(&r2).unwrap();
        relocator.restore(&r1).unwrap();
        assert_eq!(fs::read_to_string(first.path()).unwrap(), "first");
        assert_eq!(fs::read_to_string(second.path()).unwrap(), "second");
    }

    #[test]
    fn test_free_destination_without_extension() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("README").touch().unwrap();
        temp.child("README_1").touch().unwrap();
        let free = free_destination(temp.path(), OsStr::new("README"));
        assert_eq!(free, temp.path().join("README_2"));
    }

    #[test]
    fn test_restore_conflict() {
        let temp = assert_fs::TempDir::new().unwrap();
        let photo = temp.child("img1.jpg");
        photo.write_str("one").unwrap();

        let relocator = Relocator::for_root(temp.path());
        let record = relocator.relocate(photo.path()).unwrap();
        photo.write_str("someone else").unwrap();

        let result = relocator.restore(&record);
        assert!(matches!(result, Err(CullError::RestoreConflict(_))));
        assert!(record.destination_path.exists());
        assert_eq!(fs::read_to_string(photo.path()).unwrap(), "someone else");
    }

    #[test]
    fn test_restore_recreates_parent() {
        let temp = assert_fs::TempDir::new().unwrap();
        let photo = temp.child("day1").child("img1.jpg");
        photo.write_str("one").unwrap();

        let relocator = Relocator::for_root(temp.path());
        let record = relocator.relocate(photo.path()).unwrap();
        fs::remove_dir(temp.path().join("day1")).unwrap();

        relocator.restore(&record).unwrap();
        assert!(photo.path().exists());
    }

    #[test]
    fn test_relocate_missing_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        let relocator = Relocator::for_root(temp.path());
        let result = relocator.relocate(&temp.path().join("gone.jpg"));
        assert!(matches!(result, Err(CullError::PathNotFound(_))));
    }

    #[test]
    fn test_move_failure_is_surfaced() {
        let temp = assert_fs::TempDir::new().unwrap();
        let photo = temp.child("img1.jpg");
        photo.touch().unwrap();

        let relocator = Relocator::new(quarantine_dir_for(temp.path()), FailingMover);
        let result = relocator.relocate(photo.path());
        assert!(matches!(result, Err(CullError::FileAccess { .. })));
        assert!(photo.path().exists());
    }

    #[test]
    fn test_failed_copy_leaves_no_partial_destination() {
        let temp = assert_fs::TempDir::new().unwrap();
        let from = temp.path().join("gone.jpg");
        let to = temp.path().join("dest.jpg");

        let result = FsMover.move_file(&from, &to);
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
        assert!(!to.exists());
    }

    #[test]
    fn test_quarantine_size() {
        let temp = assert_fs::TempDir::new().unwrap();
        let relocator = Relocator::for_root(temp.path());
        assert_eq!(relocator.quarantine_size().unwrap(), (0, 0));

        temp.child("_culled").child("a.jpg").write_str("12345").unwrap();
        temp.child("_culled").child("nested").child("b.jpg").write_str("123").unwrap();
        assert_eq!(relocator.quarantine_size().unwrap(), (2, 8));
    }
}
