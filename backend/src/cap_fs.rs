//! Capability-safe file reads.
//!
//! The crate does not call `std::fs` directly; files named on the command
//! line or through the environment are opened relative to an ambient
//! directory handle from `cap_std`.

use std::ffi::OsString;
use std::io;
use std::path::Path;

use cap_std::{ambient_authority, fs::Dir};

/// Read the raw bytes of `path`.
///
/// # Examples
///
/// ```rust
/// use expense_tracker::cap_fs::read_file;
///
/// let dir = tempfile::tempdir()?;
/// let path = dir.path().join("secret");
/// std::fs::write(&path, b"bytes")?;
/// assert_eq!(read_file(&path)?, b"bytes");
/// # Ok::<(), std::io::Error>(())
/// ```
pub fn read_file(path: &Path) -> io::Result<Vec<u8>> {
    let (parent, file_name) = parent_and_file_name(path)?;
    let directory = Dir::open_ambient_dir(parent, ambient_authority())?;
    directory.read(Path::new(&file_name))
}

/// Read a UTF-8 text file.
pub fn read_file_to_string(path: &Path) -> io::Result<String> {
    let (parent, file_name) = parent_and_file_name(path)?;
    let directory = Dir::open_ambient_dir(parent, ambient_authority())?;
    directory.read_to_string(Path::new(&file_name))
}

fn parent_and_file_name(path: &Path) -> io::Result<(&Path, OsString)> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "path must include a file name")
    })?;
    Ok((parent, file_name.to_os_string()))
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn reads_text_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("batch.json");
        std::fs::write(&path, "{}\n").expect("write fixture");

        assert_eq!(read_file_to_string(&path).expect("read"), "{}\n");
    }

    #[rstest]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let error = read_file(&dir.path().join("absent")).expect_err("missing file");
        assert_eq!(error.kind(), io::ErrorKind::NotFound);
    }

    #[rstest]
    fn rejects_paths_without_file_name() {
        let error = read_file(Path::new("/")).expect_err("root has no file name");
        assert_eq!(error.kind(), io::ErrorKind::InvalidInput);
    }
}
