//! Filesystem primitives for relocating entries into destination folders.
//!
//! Moves never overwrite: when the target name is taken, a numbered variant
//! (`name (1).ext`, `name (2).ext`, ...) is used instead. Renames that cross a
//! filesystem boundary fall back to copy-then-remove.

use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Highest numeric suffix tried before giving up on a name.
pub const MAX_NAME_SUFFIX: u32 = 9999;

/// Errors that can occur while relocating a single entry.
#[derive(Debug, thiserror::Error)]
pub enum MoveError {
    /// Failed to create a destination directory.
    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDir { path: PathBuf, source: io::Error },
    /// The rename itself failed.
    #[error("failed to move {} to {}: {source}", .from.display(), .to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
    /// The copy fallback for a cross-device move failed.
    #[error("failed to copy {} to {}: {source}", .from.display(), .to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
    /// The source path ends in `..` or is a root.
    #[error("{} has no file name component", .path.display())]
    NoFileName { path: PathBuf },
    /// Every numbered variant of the target name is taken.
    #[error("no free name for {} after {} attempts", .path.display(), MAX_NAME_SUFFIX)]
    NameSpaceExhausted { path: PathBuf },
}

/// Result type for relocation primitives.
pub type MoveResult<T> = Result<T, MoveError>;

/// True if anything, including a dangling symlink, occupies `path`.
fn occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// `stem (n).ext` next to `candidate`. Names with only a leading dot keep
/// the whole name as the stem.
fn numbered(candidate: &Path, n: u32) -> PathBuf {
    let mut name = OsString::new();
    if let Some(stem) = candidate.file_stem() {
        name.push(stem);
    }
    name.push(format!(" ({n})"));
    if let Some(ext) = candidate.extension() {
        name.push(".");
        name.push(ext);
    }
    candidate.with_file_name(name)
}

/// Relocates entries into destination directories.
pub struct FileOrganizer;

impl FileOrganizer {
    /// Creates `dir` and any missing parents.
    pub fn ensure_dir(dir: &Path) -> MoveResult<()> {
        fs::create_dir_all(dir).map_err(|source| MoveError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })
    }

    /// Returns `candidate` if it is free, otherwise the first free numbered variant.
    pub fn unique_destination(candidate: &Path) -> MoveResult<PathBuf> {
        Self::unique_destination_reserving(candidate, &HashSet::new())
    }

    /// Like [`unique_destination`](Self::unique_destination), but also treats
    /// every path in `reserved` as taken.
    pub fn unique_destination_reserving(
        candidate: &Path,
        reserved: &HashSet<PathBuf>,
    ) -> MoveResult<PathBuf> {
        let taken = |path: &Path| occupied(path) || reserved.contains(path);
        if !taken(candidate) {
            return Ok(candidate.to_path_buf());
        }
        (1..=MAX_NAME_SUFFIX)
            .map(|n| numbered(candidate, n))
            .find(|path| !taken(path))
            .ok_or_else(|| MoveError::NameSpaceExhausted {
                path: candidate.to_path_buf(),
            })
    }

    /// Computes where [`move_into`](Self::move_into) would put `item`, without touching disk.
    pub fn plan_move(item: &Path, target_dir: &Path) -> MoveResult<PathBuf> {
        Self::plan_move_reserving(item, target_dir, &HashSet::new())
    }

    /// Plans a move that must also avoid the paths in `reserved`, such as
    /// destinations already planned earlier in the same dry run.
    pub fn plan_move_reserving(
        item: &Path,
        target_dir: &Path,
        reserved: &HashSet<PathBuf>,
    ) -> MoveResult<PathBuf> {
        let file_name = item.file_name().ok_or_else(|| MoveError::NoFileName {
            path: item.to_path_buf(),
        })?;
        Self::unique_destination_reserving(&target_dir.join(file_name), reserved)
    }

    /// Moves `item` (file, symlink, or directory) into `target_dir`, creating
    /// the directory if it is missing.
    ///
    /// Returns the final path of the moved item.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use desksave::file_organizer::FileOrganizer;
    /// use std::path::Path;
    ///
    /// let dest = FileOrganizer::move_into(
    ///     Path::new("/home/me/Desktop/photo.jpg"),
    ///     Path::new("/home/me/Documents/OrganizedFiles/2024-05/Desktop/pictures"),
    /// );
    /// match dest {
    ///     Ok(path) => println!("Moved to {}", path.display()),
    ///     Err(e) => eprintln!("Move failed: {}", e),
    /// }
    /// ```
    pub fn move_into(item: &Path, target_dir: &Path) -> MoveResult<PathBuf> {
        Self::ensure_dir(target_dir)?;
        let destination = Self::plan_move(item, target_dir)?;
        Self::relocate(item, &destination)?;
        Ok(destination)
    }

    /// Renames `from` to `to`, copying across filesystems when rename cannot.
    pub fn relocate(from: &Path, to: &Path) -> MoveResult<()> {
        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                tracing::warn!(
                    from = %from.display(),
                    to = %to.display(),
                    "rename crosses devices, falling back to copy and remove"
                );
                Self::copy_then_remove(from, to).map_err(|source| MoveError::Copy {
                    from: from.to_path_buf(),
                    to: to.to_path_buf(),
                    source,
                })
            }
            Err(source) => Err(MoveError::Rename {
                from: from.to_path_buf(),
                to: to.to_path_buf(),
                source,
            }),
        }
    }

    /// Removes a directory that is expected to be empty.
    pub fn remove_empty_dir(dir: &Path) -> io::Result<()> {
        fs::remove_dir(dir)
    }

    /// Copies `from` to `to` without following links, then removes `from`.
    ///
    /// A failed copy removes whatever it created at `to`, so the name is free
    /// again and `from` is left as it was.
    fn copy_then_remove(from: &Path, to: &Path) -> io::Result<()> {
        if let Err(e) = copy_tree(from, to) {
            if occupied(to)
                && let Err(cleanup) = remove_entry(to)
            {
                tracing::warn!(
                    path = %to.display(),
                    error = %cleanup,
                    "could not remove partial copy"
                );
            }
            return Err(e);
        }
        remove_entry(from)
    }
}

/// Copies a file, symlink, or directory tree. Symlinks are recreated, never followed.
fn copy_tree(from: &Path, to: &Path) -> io::Result<()> {
    let walker = WalkDir::new(from)
        .follow_links(false)
        .follow_root_links(false)
        .sort_by_file_name();
    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry.path().strip_prefix(from).map_err(io::Error::other)?;
        let target = if relative.as_os_str().is_empty() {
            to.to_path_buf()
        } else {
            to.join(relative)
        };

        let file_type = entry.file_type();
        if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else if file_type.is_dir() {
            fs::create_dir(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Removes a file, symlink, or directory tree without following links.
fn remove_entry(path: &Path) -> io::Result<()> {
    if fs::symlink_metadata(path)?.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

#[cfg(unix)]
fn copy_symlink(link: &Path, to: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(fs::read_link(link)?, to)
}

#[cfg(windows)]
fn copy_symlink(link: &Path, to: &Path) -> io::Result<()> {
    let target = fs::read_link(link)?;
    if fs::metadata(link).is_ok_and(|m| m.is_dir()) {
        std::os::windows::fs::symlink_dir(target, to)
    } else {
        std::os::windows::fs::symlink_file(target, to)
    }
}

#[cfg(not(any(unix, windows)))]
fn copy_symlink(link: &Path, _to: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("cannot recreate symlink {}", link.display()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_move_into_creates_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();

        let file_path = base_path.join("test.txt");
        fs::write(&file_path, "test content").expect("Failed to write test file");

        let target = base_path.join("out").join("text");
        let dest = FileOrganizer::move_into(&file_path, &target).expect("Failed to move file");

        assert!(target.is_dir());
        assert_eq!(dest, target.join("test.txt"));
        assert!(!file_path.exists());
        assert_eq!(fs::read_to_string(dest).unwrap(), "test content");
    }

    #[test]
    fn test_move_into_uses_existing_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();

        let category_dir = base_path.join("pictures");
        fs::create_dir(&category_dir).expect("Failed to create category directory");
        fs::write(category_dir.join("old.png"), "old").unwrap();

        let file_path = base_path.join("test.png");
        fs::write(&file_path, "test content").expect("Failed to write test file");

        FileOrganizer::move_into(&file_path, &category_dir).expect("Failed to move file");

        assert!(!file_path.exists());
        assert!(category_dir.join("test.png").exists());
        assert!(category_dir.join("old.png").exists());
    }

    #[test]
    fn test_move_into_never_overwrites() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        let target = base_path.join("text");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("notes.txt"), "existing").unwrap();
        fs::write(target.join("notes (1).txt"), "existing too").unwrap();

        let file_path = base_path.join("notes.txt");
        fs::write(&file_path, "incoming").unwrap();

        let dest = FileOrganizer::move_into(&file_path, &target).unwrap();

        assert_eq!(dest, target.join("notes (2).txt"));
        assert_eq!(fs::read_to_string(target.join("notes.txt")).unwrap(), "existing");
        assert_eq!(fs::read_to_string(dest).unwrap(), "incoming");
    }

    #[test]
    fn test_numbered_names() {
        assert_eq!(
            numbered(Path::new("/d/archive.tar.gz"), 1),
            PathBuf::from("/d/archive.tar (1).gz")
        );
        assert_eq!(numbered(Path::new("/d/.bashrc"), 2), PathBuf::from("/d/.bashrc (2)"));
        assert_eq!(numbered(Path::new("/d/Folder"), 3), PathBuf::from("/d/Folder (3)"));
    }

    #[test]
    fn test_move_directory_into_target() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        let nested = base_path.join("src").join("nested");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("inner.txt"), "x").unwrap();

        let dest = FileOrganizer::move_into(&nested, &base_path.join("dst")).unwrap();

        assert!(dest.join("inner.txt").exists());
        assert!(!nested.exists());
    }

    #[test]
    fn test_copy_then_remove_handles_trees() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        let tree = base_path.join("tree");
        fs::create_dir_all(tree.join("a").join("b")).unwrap();
        fs::write(tree.join("top.txt"), "top").unwrap();
        fs::write(tree.join("a").join("b").join("deep.txt"), "deep").unwrap();

        let copy = base_path.join("copy");
        FileOrganizer::copy_then_remove(&tree, &copy).unwrap();

        assert!(!tree.exists());
        assert_eq!(fs::read_to_string(copy.join("top.txt")).unwrap(), "top");
        assert_eq!(
            fs::read_to_string(copy.join("a").join("b").join("deep.txt")).unwrap(),
            "deep"
        );
    }

    #[test]
    fn test_move_into_fails_when_target_is_a_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        let blocker = base_path.join("pictures");
        fs::write(&blocker, "not a directory").unwrap();
        let file_path = base_path.join("photo.jpg");
        fs::write(&file_path, "jpg").unwrap();

        let result = FileOrganizer::move_into(&file_path, &blocker);

        assert!(matches!(result, Err(MoveError::CreateDir { .. })));
        assert!(file_path.exists());
    }

    #[test]
    fn test_remove_empty_dir_refuses_non_empty() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let dir = temp_dir.path().join("full");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("left.txt"), "x").unwrap();

        assert!(FileOrganizer::remove_empty_dir(&dir).is_err());
        assert!(dir.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_then_remove_recreates_symlinks_in_trees() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        let linked = base_path.join("linked");
        fs::create_dir(&linked).unwrap();
        fs::write(linked.join("inside.txt"), "inside").unwrap();
        let tree = base_path.join("tree");
        fs::create_dir(&tree).unwrap();
        fs::write(tree.join("a.txt"), "a").unwrap();
        std::os::unix::fs::symlink(&linked, tree.join("zlink")).unwrap();

        let copy = base_path.join("copy");
        FileOrganizer::copy_then_remove(&tree, &copy).unwrap();

        assert!(!tree.exists());
        assert_eq!(fs::read_to_string(copy.join("a.txt")).unwrap(), "a");
        let link = copy.join("zlink");
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_link(&link).unwrap(), linked);
        assert!(linked.join("inside.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_then_remove_keeps_top_level_link_a_link() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        let real = base_path.join("real.txt");
        fs::write(&real, "real").unwrap();
        let link = base_path.join("link.txt");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let moved = base_path.join("moved.txt");
        FileOrganizer::copy_then_remove(&link, &moved).unwrap();

        assert!(fs::symlink_metadata(&moved).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_link(&moved).unwrap(), real);
        assert!(fs::symlink_metadata(&link).is_err());
        assert_eq!(fs::read_to_string(&real).unwrap(), "real");
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_copy_leaves_no_partial_destination() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        let tree = base_path.join("tree");
        fs::create_dir(&tree).unwrap();
        fs::write(tree.join("a.txt"), "a").unwrap();
        // sockets cannot be copied
        let _listener = std::os::unix::net::UnixListener::bind(tree.join("zz.sock")).unwrap();

        let copy = base_path.join("copy");
        assert!(FileOrganizer::copy_then_remove(&tree, &copy).is_err());

        assert!(!copy.exists());
        assert!(tree.join("a.txt").exists());
        assert_eq!(
            FileOrganizer::unique_destination(&copy).unwrap(),
            copy,
            "a retry should get the original name"
        );
    }

    #[test]
    fn test_plan_move_avoids_reserved_paths() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let target = temp_dir.path().join("pictures");
        let mut reserved = HashSet::new();
        reserved.insert(target.join("photo.jpg"));

        let planned =
            FileOrganizer::plan_move_reserving(Path::new("/src/photo.jpg"), &target, &reserved)
                .unwrap();

        assert_eq!(planned, target.join("photo (1).jpg"));
        assert_eq!(
            FileOrganizer::plan_move(Path::new("/src/photo.jpg"), &target).unwrap(),
            target.join("photo.jpg")
        );
    }
}
