//! Read-only memory-mapped files
//!
//! A [`MappedFile`] owns the three resources behind a mapping: the open file,
//! the section built on it and the view mapped into this process. They are
//! acquired in that order and released in the opposite one. If any step of
//! [`MappedFile::open`] fails, the partially built value is dropped and
//! releases what it already holds.

use std::fmt;

use tracing::{trace, warn};

use crate::api::{FileApi, OpenRequest};
use crate::error::{FsError, Result};
use crate::path::full_name;

/// Largest length a mapped file can report through a 32-bit size field
pub const MAX_MAPPED_FILE_SIZE: u64 = u32::MAX as u64;

/// Length of a mapped file as reported by the file system
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FileSize(u64);

impl FileSize {
    pub fn new(length: u64) -> Self {
        Self(length)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    /// The length does not fit in 32 bits
    pub fn is_too_large(self) -> bool {
        self.0 > MAX_MAPPED_FILE_SIZE
    }

    /// The length as a 32-bit value, `None` if it is too large
    pub fn to_u32(self) -> Option<u32> {
        u32::try_from(self.0).ok()
    }
}

impl fmt::Display for FileSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bytes", self.0)
    }
}

/// A file mapped read-only into the current process
pub struct MappedFile<'a, A: FileApi> {
    api: &'a A,
    path: String,
    file: Option<A::File>,
    section: Option<A::Section>,
    view: Option<A::View>,
    size: Option<FileSize>,
}

impl<'a, A: FileApi> MappedFile<'a, A> {
    /// Open `dir_path\file_name` relative to `root` and map it read-only.
    ///
    /// With `want_size` the file length is queried first and made available
    /// through [`size`](Self::size). A file too large for a 32-bit size is
    /// still mapped; only a warning is logged.
    pub fn open(
        api: &'a A,
        root: Option<&A::Root>,
        dir_path: Option<&str>,
        file_name: &str,
        want_size: bool,
    ) -> Result<Self> {
        let name = full_name(dir_path, file_name)?;

        let mut mapped = Self {
            api,
            path: name.to_string_lossy(),
            file: None,
            section: None,
            view: None,
            size: None,
        };

        let file = match api.open_existing(root, &name, OpenRequest::MAP_FILE) {
            Ok(file) => mapped.file.insert(file),
            Err(source) => {
                return Err(FsError::OpenFailed {
                    path: mapped.path.clone(),
                    source,
                });
            }
        };
        trace!("Opened '{}'", mapped.path);

        if want_size {
            let length = match api.query_file_length(file) {
                Ok(length) => length,
                Err(source) => {
                    return Err(FsError::SizeQueryFailed {
                        path: mapped.path.clone(),
                        source,
                    });
                }
            };
            let size = FileSize::new(length);
            if size.is_too_large() {
                warn!("WARNING!! The file '{}' is too large!", mapped.path);
            }
            mapped.size = Some(size);
        }

        let section = match api.create_read_only_mapping(file) {
            Ok(section) => mapped.section.insert(section),
            Err(source) => {
                return Err(FsError::MappingFailed {
                    path: mapped.path.clone(),
                    source,
                });
            }
        };

        match api.map_view(section) {
            Ok(view) => mapped.view = Some(view),
            Err(source) => {
                return Err(FsError::MapViewFailed {
                    path: mapped.path.clone(),
                    source,
                });
            }
        }
        trace!("Mapped '{}' ({} bytes)", mapped.path, mapped.view_len());

        Ok(mapped)
    }

    /// Unmap the view, then close the section and the file.
    ///
    /// Every release is attempted even if an earlier one failed. Returns
    /// `false` if any of them failed.
    pub fn close(mut self) -> bool {
        self.release()
    }

    /// Contents of the mapped view
    pub fn as_bytes(&self) -> &[u8] {
        match &self.view {
            Some(view) => view.as_ref(),
            None => &[],
        }
    }

    pub fn base_address(&self) -> *const u8 {
        self.as_bytes().as_ptr()
    }

    /// Length of the mapped view; at least the file length, rounded up by
    /// some backends
    pub fn view_len(&self) -> usize {
        self.as_bytes().len()
    }

    /// File length, if it was requested at open time
    pub fn size(&self) -> Option<FileSize> {
        self.size
    }

    /// File length as a 32-bit value, if it was requested at open time
    pub fn size_u32(&self) -> Result<Option<u32>> {
        match self.size {
            None => Ok(None),
            Some(size) => size
                .to_u32()
                .map(Some)
                .ok_or_else(|| FsError::SizeTooLarge {
                    path: self.path.clone(),
                    length: size.get(),
                }),
        }
    }

    /// Full name the file was opened with
    pub fn path(&self) -> &str {
        &self.path
    }

    fn release(&mut self) -> bool {
        let mut ok = true;

        if let Some(view) = self.view.take() {
            if let Err(e) = self.api.unmap_view(view) {
                warn!("Failed to unmap view of '{}': {}", self.path, e);
                ok = false;
            }
        }
        if let Some(section) = self.section.take() {
            if let Err(e) = self.api.close_section(section) {
                warn!("Failed to close section of '{}': {}", self.path, e);
                ok = false;
            }
        }
        if let Some(file) = self.file.take() {
            if let Err(e) = self.api.close_file(file) {
                warn!("Failed to close '{}': {}", self.path, e);
                ok = false;
            }
        }

        ok
    }
}

impl<A: FileApi> Drop for MappedFile<'_, A> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<A: FileApi> fmt::Debug for MappedFile<'_, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedFile")
            .field("path", &self.path)
            .field("base_address", &self.base_address())
            .field("view_len", &self.view_len())
            .field("size", &self.size)
            .finish()
    }
}
