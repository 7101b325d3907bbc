use std::{
    fmt,
    fs::{self, File, Metadata},
    io,
    os::unix::fs::MetadataExt,
    path::Path,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The filesystem-assigned identity of a storage object (its inode number).
///
/// Only the inode number takes part in comparisons. Layered filesystems are allowed to report
/// a per-layer `st_dev` for non-directories, so the device number is not part of the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identity(u64);

/// The subset of `stat` the harness asserts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attributes {
    /// Identity of the storage object
    pub identity: Identity,

    /// Number of hard links referencing the object
    pub nlink: u64,

    /// Full mode including the file type bits
    pub mode: u32,

    /// Owning user
    pub uid: u32,

    /// Owning group
    pub gid: u32,

    /// Size in bytes
    pub size: u64,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Identity {
    /// Wraps a raw inode number.
    pub fn from_raw(ino: u64) -> Self {
        Self(ino)
    }

    /// Returns the raw inode number.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Attributes {
    fn from_metadata(md: &Metadata) -> Self {
        Self {
            identity: Identity(md.ino()),
            nlink: md.nlink(),
            mode: md.mode(),
            uid: md.uid(),
            gid: md.gid(),
            size: md.size(),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Resolves the identity of `path`, following a terminal symlink.
///
/// Returns `Ok(None)` when the entry does not exist. Any other failure, including
/// `EACCES`, is returned untouched so callers can tell an expected absence apart from an
/// environment restriction.
pub fn identity_of(path: &Path) -> io::Result<Option<Identity>> {
    Ok(attributes_of(path)?.map(|attrs| attrs.identity))
}

/// Resolves the identity of `path` itself, without following a terminal symlink.
pub fn identity_of_link(path: &Path) -> io::Result<Option<Identity>> {
    Ok(attributes_of_link(path)?.map(|attrs| attrs.identity))
}

/// Resolves the identity of an open descriptor. A valid descriptor always has one.
pub fn identity_of_open(file: &File) -> io::Result<Identity> {
    Ok(attributes_of_open(file)?.identity)
}

/// `stat(2)` semantics, with a missing entry mapped to `None`.
pub fn attributes_of(path: &Path) -> io::Result<Option<Attributes>> {
    not_found_as_none(fs::metadata(path))
}

/// `lstat(2)` semantics, with a missing entry mapped to `None`.
pub fn attributes_of_link(path: &Path) -> io::Result<Option<Attributes>> {
    not_found_as_none(fs::symlink_metadata(path))
}

/// `fstat(2)` semantics.
pub fn attributes_of_open(file: &File) -> io::Result<Attributes> {
    Ok(Attributes::from_metadata(&file.metadata()?))
}

fn not_found_as_none(res: io::Result<Metadata>) -> io::Result<Option<Attributes>> {
    match res {
        Ok(md) => Ok(Some(Attributes::from_metadata(&md))),
        Err(e) if e.raw_os_error() == Some(libc::ENOENT) => Ok(None),
        Err(e) => Err(e),
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ino {}", self.0)
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::os::unix::fs::symlink;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_identity_missing_entry_is_none() -> io::Result<()> {
        let dir = TempDir::new()?;
        let missing = dir.path().join("missing");

        assert_eq!(identity_of(&missing)?, None);
        assert_eq!(identity_of_link(&missing)?, None);

        Ok(())
    }

    #[test]
    fn test_identity_path_and_descriptor_agree() -> io::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("file1");
        fs::write(&path, b"data")?;

        let by_path = identity_of(&path)?.expect("file1 exists");
        let by_fd = identity_of_open(&File::open(&path)?)?;
        assert_eq!(by_path, by_fd);

        // Re-querying an untouched path yields the same value
        assert_eq!(identity_of(&path)?, Some(by_path));

        Ok(())
    }

    #[test]
    fn test_identity_link_does_not_follow_symlink() -> io::Result<()> {
        let dir = TempDir::new()?;
        let target = dir.path().join("target");
        let link = dir.path().join("link");
        fs::write(&target, b"data")?;
        symlink(&target, &link)?;

        let followed = identity_of(&link)?.expect("target exists");
        let not_followed = identity_of_link(&link)?.expect("link exists");
        assert_eq!(Some(followed), identity_of(&target)?);
        assert_ne!(followed, not_followed);

        Ok(())
    }

    #[test]
    fn test_identity_dangling_symlink() -> io::Result<()> {
        let dir = TempDir::new()?;
        let link = dir.path().join("dangling");
        symlink(dir.path().join("nowhere"), &link)?;

        assert_eq!(identity_of(&link)?, None);
        assert!(identity_of_link(&link)?.is_some());

        Ok(())
    }

    #[test]
    fn test_attributes_report_link_count() -> io::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("file1");
        fs::write(&path, b"data")?;
        fs::hard_link(&path, dir.path().join("file2"))?;

        let attrs = attributes_of(&path)?.expect("file1 exists");
        assert_eq!(attrs.nlink, 2);
        assert_eq!(attrs.size, 4);
        assert_eq!(attrs.mode & libc::S_IFMT, libc::S_IFREG);

        Ok(())
    }
}
