//! Portable backend built on `std::fs` and `memmap2`
//!
//! NT object names use `\` as the only separator; they are translated to host
//! paths here. Case-insensitive lookup is emulated by scanning each directory
//! level when the exact name does not exist.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Component, Path, PathBuf};

use memmap2::{Mmap, MmapOptions};

use super::{FileApi, ObjectKind, OpenRequest};
use crate::error::{NtStatus, OsError};
use crate::path::{PathBuffer, SEPARATOR};

/// [`FileApi`] implementation for any host with `std::fs`
#[derive(Debug, Default, Clone, Copy)]
pub struct StdFileApi {
    _private: (),
}

/// Open file together with the host path it was resolved to
#[derive(Debug)]
pub struct StdFile {
    file: File,
    path: PathBuf,
}

impl StdFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Section object: a second handle on the file, only usable for mapping
#[derive(Debug)]
pub struct StdSection {
    file: File,
    len: u64,
}

impl StdSection {
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl StdFileApi {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FileApi for StdFileApi {
    type Root = PathBuf;
    type File = StdFile;
    type Section = StdSection;
    type View = Mmap;

    fn open_existing(
        &self,
        root: Option<&PathBuf>,
        name: &PathBuffer,
        request: OpenRequest,
    ) -> Result<StdFile, OsError> {
        let name = name.to_string_lossy();
        // The object manager does not resolve parent references
        if name.split(SEPARATOR).any(|component| component == "..") {
            return Err(NtStatus::OBJECT_NAME_INVALID.into());
        }
        let path = host_path(root.map(PathBuf::as_path), &name);

        let (file, path) = match open_with(&path, request) {
            Ok(file) => (file, path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let resolved = resolve_case_insensitive(&path).ok_or(e)?;
                (open_with(&resolved, request)?, resolved)
            }
            Err(e) => return Err(e.into()),
        };

        let is_dir = file.metadata()?.is_dir();
        match request.kind {
            ObjectKind::Directory if !is_dir => Err(NtStatus::NOT_A_DIRECTORY.into()),
            ObjectKind::NonDirectory if is_dir => Err(NtStatus::FILE_IS_A_DIRECTORY.into()),
            _ => Ok(StdFile { file, path }),
        }
    }

    fn close_file(&self, file: StdFile) -> Result<(), OsError> {
        drop(file);
        Ok(())
    }

    fn query_file_length(&self, file: &StdFile) -> Result<u64, OsError> {
        Ok(file.file.metadata()?.len())
    }

    fn create_read_only_mapping(&self, file: &StdFile) -> Result<StdSection, OsError> {
        let len = file.file.metadata()?.len();
        // Sections cannot be created over empty files
        if len == 0 {
            return Err(NtStatus::MAPPED_FILE_SIZE_ZERO.into());
        }
        Ok(StdSection {
            file: file.file.try_clone()?,
            len,
        })
    }

    fn close_section(&self, section: StdSection) -> Result<(), OsError> {
        drop(section);
        Ok(())
    }

    fn map_view(&self, section: &StdSection) -> Result<Mmap, OsError> {
        // SAFETY: the view is read-only and is unmapped before the section and
        // file handles are released; callers must not truncate the file while
        // it is mapped.
        let view = unsafe { MmapOptions::new().map(&section.file)? };
        Ok(view)
    }

    fn unmap_view(&self, view: Mmap) -> Result<(), OsError> {
        drop(view);
        Ok(())
    }

    fn open_root_directory(
        &self,
        root: Option<&PathBuf>,
        name: &PathBuffer,
    ) -> Result<PathBuf, OsError> {
        let dir = self.open_existing(root, name, OpenRequest::PROBE_DIRECTORY)?;
        Ok(dir.path)
    }
}

fn open_with(path: &Path, request: OpenRequest) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.read(true);

    #[cfg(windows)]
    {
        use std::os::windows::fs::OpenOptionsExt;

        const FILE_SHARE_READ: u32 = 0x0000_0001;
        const FILE_SHARE_WRITE: u32 = 0x0000_0002;
        const FILE_FLAG_BACKUP_SEMANTICS: u32 = 0x0200_0000;

        let mut share = 0;
        if request.share.read {
            share |= FILE_SHARE_READ;
        }
        if request.share.write {
            share |= FILE_SHARE_WRITE;
        }
        options.share_mode(share);
        // Required to open directories
        options.custom_flags(FILE_FLAG_BACKUP_SEMANTICS);
    }
    #[cfg(not(windows))]
    let _ = request;

    options.open(path)
}

/// Translate an NT-style name into a host path
fn host_path(root: Option<&Path>, name: &str) -> PathBuf {
    let components = name.split(SEPARATOR).filter(|c| !c.is_empty());
    match root {
        Some(root) => {
            let mut path = root.to_path_buf();
            path.extend(components);
            path
        }
        None if cfg!(windows) => PathBuf::from(name),
        None => {
            let mut path = if name.starts_with(SEPARATOR) {
                PathBuf::from("/")
            } else {
                PathBuf::new()
            };
            path.extend(components);
            path
        }
    }
}

/// Find an existing path whose components match `path` ignoring case
fn resolve_case_insensitive(path: &Path) -> Option<PathBuf> {
    let mut resolved = PathBuf::new();

    for component in path.components() {
        let Component::Normal(name) = component else {
            resolved.push(component.as_os_str());
            continue;
        };

        let exact = resolved.join(name);
        if exact.exists() {
            resolved = exact;
            continue;
        }

        let dir = if resolved.as_os_str().is_empty() {
            Path::new(".")
        } else {
            resolved.as_path()
        };
        let wanted = name.to_string_lossy().to_lowercase();
        let found = fs::read_dir(dir)
            .ok()?
            .filter_map(|entry| entry.ok())
            .find(|entry| entry.file_name().to_string_lossy().to_lowercase() == wanted)?;
        resolved.push(found.file_name());
    }

    Some(resolved)
}
