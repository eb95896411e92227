//! Shared filesystem helpers built on `cap-std` and `camino`.
//!
//! Every write goes through [`replace_file`], which stages the bytes in a
//! sibling file and renames it over the target so readers never observe a
//! partially written configuration or cache entry.
#![forbid(unsafe_code)]

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use std::io::{self, Read, Write};
use std::path::Component;

/// Suffix appended to the staging file used by [`replace_file`].
const PARTIAL_SUFFIX: &str = ".partial";

/// Open a UTF-8 file path using ambient authority.
pub fn open_utf8_file(path: &Utf8Path) -> io::Result<fs_utf8::File> {
    fs_utf8::File::open_ambient(path, ambient_authority())
}

/// Resolve an ambient directory for the given path and return the directory with the file name.
pub fn open_dir_and_file(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, String)> {
    let parent = path.parent().unwrap_or_else(|| Utf8Path::new("."));
    let parent = if parent.as_str().is_empty() {
        Utf8Path::new(".")
    } else {
        parent
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::other("target should include a file name"))?
        .to_owned();
    let dir = fs_utf8::Dir::open_ambient_dir(parent, ambient_authority())?;
    Ok((dir, file_name))
}

/// Ensure the parent directory for `path` exists, handling absolute paths safely for cap-std.
pub fn ensure_parent_dir(path: &Utf8Path) -> io::Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    ensure_dir(parent)
}

/// Create `dir` and any missing ancestors.
pub fn ensure_dir(dir: &Utf8Path) -> io::Result<()> {
    if dir.as_str().is_empty() || dir == Utf8Path::new("/") {
        return Ok(());
    }
    let (base_dir, relative) = base_dir_and_relative(dir)?;
    if relative.as_str().is_empty() {
        return Ok(());
    }
    base_dir.create_dir_all(&relative)
}

/// Return whether a path exists and is a regular file using capability-based IO.
///
/// A missing parent directory or file reports `Ok(false)` rather than an error.
pub fn file_is_file(path: &Utf8Path) -> io::Result<bool> {
    let (dir, name) = match open_dir_and_file(path) {
        Ok(found) => found,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };
    match dir.metadata(name.as_str()) {
        Ok(meta) => Ok(meta.is_file()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// Read the whole file at `path`.
pub fn read_file(path: &Utf8Path) -> io::Result<Vec<u8>> {
    let (dir, name) = open_dir_and_file(path)?;
    dir.read(name.as_str())
}

/// Read at most `limit` bytes from the start of `path`.
pub fn read_prefix(path: &Utf8Path, limit: usize) -> io::Result<Vec<u8>> {
    let file = open_utf8_file(path)?;
    let mut buffer = Vec::with_capacity(limit.min(64 * 1024));
    let limit = u64::try_from(limit).unwrap_or(u64::MAX);
    file.take(limit).read_to_end(&mut buffer)?;
    Ok(buffer)
}

/// Atomically replace the contents of `path` with `contents`.
///
/// The bytes land in `<name>.partial` beside the target, are flushed to disk,
/// and are then renamed over the target. The staging file is removed when any
/// step fails, leaving the previous contents untouched.
pub fn replace_file(path: &Utf8Path, contents: &[u8]) -> io::Result<()> {
    ensure_parent_dir(path)?;
    let (dir, name) = open_dir_and_file(path)?;
    let partial = format!("{name}{PARTIAL_SUFFIX}");
    let staged = stage(&dir, &partial, contents)
        .and_then(|()| dir.rename(partial.as_str(), &dir, name.as_str()));
    if staged.is_err() {
        // Best effort: the original error is the one worth reporting.
        drop(dir.remove_file(partial.as_str()));
    }
    staged
}

fn stage(dir: &fs_utf8::Dir, partial: &str, contents: &[u8]) -> io::Result<()> {
    let mut file = dir.create(partial)?;
    file.write_all(contents)?;
    file.sync_all()
}

/// Copy `path` to a sibling named `<name><suffix>`, replacing any earlier copy.
///
/// Returns the location of the copy.
pub fn backup_file(path: &Utf8Path, suffix: &str) -> io::Result<Utf8PathBuf> {
    let (dir, name) = open_dir_and_file(path)?;
    let backup_name = format!("{name}{suffix}");
    dir.copy(name.as_str(), &dir, backup_name.as_str())?;
    Ok(path.with_file_name(backup_name))
}

/// Split an absolute or relative parent path into an ambient base directory and a relative suffix.
pub fn base_dir_and_relative(parent: &Utf8Path) -> io::Result<(fs_utf8::Dir, Utf8PathBuf)> {
    let std_parent = parent.as_std_path();

    let (base, relative) = match std_parent.components().next() {
        // Windows absolute path with a drive or UNC prefix.
        Some(Component::Prefix(prefix)) => {
            let prefix_str = prefix
                .as_os_str()
                .to_str()
                .ok_or_else(|| io::Error::other("non-UTF-8 path prefix"))?;
            let base = Utf8PathBuf::from(prefix_str).join(std::path::MAIN_SEPARATOR.to_string());
            let relative = std_parent
                .strip_prefix(base.as_std_path())
                .or_else(|_| std_parent.strip_prefix(prefix.as_os_str()))
                .map_err(|_| io::Error::other("failed to strip prefix from parent path"))?
                .to_path_buf();
            (base, relative)
        }
        Some(Component::RootDir) => {
            let base = Utf8PathBuf::from(std::path::MAIN_SEPARATOR.to_string());
            let relative = std_parent
                .strip_prefix(base.as_std_path())
                .map_err(|_| io::Error::other("failed to strip root from absolute path"))?
                .to_path_buf();
            (base, relative)
        }
        _ => (Utf8PathBuf::from("."), std_parent.to_path_buf()),
    };

    let dir = fs_utf8::Dir::open_ambient_dir(&base, ambient_authority())?;
    let relative = Utf8PathBuf::from_path_buf(relative)
        .map_err(|_| io::Error::other("non-UTF-8 parent path"))?;

    Ok((dir, relative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use std::fs;
    use tempfile::TempDir;

    #[fixture]
    fn workspace() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 tempdir");
        (dir, root)
    }

    #[rstest]
    fn replace_file_creates_missing_parents(workspace: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = workspace;
        let target = root.join("nested/deeper/cache.json");

        replace_file(&target, b"{\"version\":1}").expect("replace should succeed");

        assert_eq!(fs::read(&target).expect("read back"), b"{\"version\":1}");
        assert!(
            !root.join("nested/deeper/cache.json.partial").exists(),
            "staging file should be renamed away"
        );
    }

    #[rstest]
    fn replace_file_overwrites_previous_contents(workspace: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = workspace;
        let target = root.join("cache.json");
        replace_file(&target, b"old contents that are longer").expect("first write");

        replace_file(&target, b"new").expect("second write");

        assert_eq!(fs::read(&target).expect("read back"), b"new");
    }

    #[rstest]
    fn read_prefix_stops_at_limit(workspace: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = workspace;
        let target = root.join("big.json");
        fs::write(&target, vec![b'x'; 4096]).expect("write fixture");

        let prefix = read_prefix(&target, 100).expect("prefix read");

        assert_eq!(prefix.len(), 100);
    }

    #[rstest]
    fn backup_file_copies_beside_original(workspace: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = workspace;
        let target = root.join("config.json");
        fs::write(&target, b"not json").expect("write fixture");

        let backup = backup_file(&target, ".backup").expect("backup");

        assert_eq!(backup, root.join("config.json.backup"));
        assert_eq!(fs::read(&backup).expect("read backup"), b"not json");
        assert_eq!(fs::read(&target).expect("original kept"), b"not json");
    }

    #[rstest]
    fn file_is_file_reports_missing_paths(workspace: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = workspace;

        assert!(!file_is_file(&root.join("absent.json")).expect("probe missing file"));
        assert!(!file_is_file(&root.join("no/such/dir/file.json")).expect("probe missing dir"));
        assert!(!file_is_file(&root).expect("directories are not files"));
    }
}
