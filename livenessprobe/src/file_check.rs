use crate::error::{self, Result};
use nix::errno::Errno;
use snafu::ResultExt;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

pub(crate) trait FileExistenceChecker {
    /// Whether something exists at `path`. Absence is a normal answer, not an error.
    fn exists(&self, path: &Path) -> Result<bool>;
}

pub(crate) struct FsCheck {}

impl FileExistenceChecker for FsCheck {
    fn exists(&self, path: &Path) -> Result<bool> {
        match fs::metadata(path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            // some component of the path is a regular file
            Err(e) if e.raw_os_error() == Some(Errno::ENOTDIR as i32) => Ok(false),
            Err(e) => Err(e).context(error::FileStat { path }),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn exists() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("marker");
        assert!(!FsCheck {}.exists(&marker).unwrap());
        fs::write(&marker, "").unwrap();
        assert!(FsCheck {}.exists(&marker).unwrap());
        assert!(FsCheck {}.exists(dir.path()).unwrap());
    }

    #[test]
    fn file_in_path_is_absence() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("file");
        fs::write(&file, "").unwrap();
        assert!(!FsCheck {}.exists(&file.join("marker")).unwrap());
    }
}
