//! OS boundary used by the probes and the mapped-file lifecycle
//!
//! Every resource a backend hands out is released through the same backend,
//! so callers always know which release failed and can keep going.

#[cfg(test)]
pub(crate) mod mock;
#[cfg(windows)]
mod nt;
#[cfg(windows)]
mod ntapi;
mod std_fs;

#[cfg(windows)]
pub use nt::{NtFile, NtFileApi, NtRootDirectory, NtSection, NtView};
pub use std_fs::{StdFile, StdFileApi, StdSection};

use crate::error::OsError;
use crate::path::PathBuffer;

/// Access requested when opening an existing object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Enough to enumerate a directory (FILE_LIST_DIRECTORY)
    ListDirectory,
    /// Read the contents (GENERIC_READ)
    Read,
}

/// What other openers of the same object are still allowed to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShareAccess {
    pub read: bool,
    pub write: bool,
}

impl ShareAccess {
    pub const READ: Self = Self {
        read: true,
        write: false,
    };
    pub const READ_WRITE: Self = Self {
        read: true,
        write: true,
    };
}

/// Constraint on the kind of object being opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Directory,
    NonDirectory,
}

/// Parameters of an `open_existing` call.
///
/// Names are always matched case-insensitively and I/O is synchronous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenRequest {
    pub access: Access,
    pub share: ShareAccess,
    pub kind: ObjectKind,
}

impl OpenRequest {
    /// Directory probe: list access, shared for read and write
    pub const PROBE_DIRECTORY: Self = Self {
        access: Access::ListDirectory,
        share: ShareAccess::READ_WRITE,
        kind: ObjectKind::Directory,
    };

    /// File probe: read access, shared for read and write
    pub const PROBE_FILE: Self = Self {
        access: Access::Read,
        share: ShareAccess::READ_WRITE,
        kind: ObjectKind::NonDirectory,
    };

    /// File to be mapped: read access, shared for read only
    pub const MAP_FILE: Self = Self {
        access: Access::Read,
        share: ShareAccess::READ,
        kind: ObjectKind::NonDirectory,
    };
}

/// File and section primitives of the host OS
pub trait FileApi {
    /// Directory that relative names are resolved against
    type Root;
    /// Open file handle
    type File;
    /// Read-only mapping (section) object backed by a file
    type Section;
    /// Mapped view of a section
    type View: AsRef<[u8]>;

    /// Open an existing object named `name`, relative to `root` if given
    fn open_existing(
        &self,
        root: Option<&Self::Root>,
        name: &PathBuffer,
        request: OpenRequest,
    ) -> Result<Self::File, OsError>;

    fn close_file(&self, file: Self::File) -> Result<(), OsError>;

    /// Length of the file in bytes (end of file position)
    fn query_file_length(&self, file: &Self::File) -> Result<u64, OsError>;

    /// Create a read-only, committed section covering the whole file
    fn create_read_only_mapping(&self, file: &Self::File) -> Result<Self::Section, OsError>;

    fn close_section(&self, section: Self::Section) -> Result<(), OsError>;

    /// Map the whole section read-only into the current process
    fn map_view(&self, section: &Self::Section) -> Result<Self::View, OsError>;

    fn unmap_view(&self, view: Self::View) -> Result<(), OsError>;

    /// Open a directory that later calls can use as their root
    fn open_root_directory(
        &self,
        root: Option<&Self::Root>,
        name: &PathBuffer,
    ) -> Result<Self::Root, OsError>;
}

/// Backend talking to the host OS directly
#[cfg(windows)]
pub type NativeFileApi = NtFileApi;
#[cfg(not(windows))]
pub type NativeFileApi = StdFileApi;

/// Create the backend for the host OS
pub fn native() -> crate::Result<NativeFileApi> {
    #[cfg(windows)]
    {
        NtFileApi::new()
    }
    #[cfg(not(windows))]
    {
        Ok(StdFileApi::new())
    }
}
