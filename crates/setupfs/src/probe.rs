//! Existence probes for directories and files
//!
//! A probe opens the object with the narrowest access that proves it exists
//! and releases the handle right away. The `probe_*` functions report why an
//! object was not found; `path_exists` and `file_exists` only answer yes or no.

use tracing::{debug, trace, warn};

use crate::api::{FileApi, OpenRequest};
use crate::error::{FsError, Result};
use crate::path::{PathBuffer, full_name};

/// Check that `full_path` names an existing directory
pub fn probe_directory<A: FileApi>(
    api: &A,
    root: Option<&A::Root>,
    full_path: &str,
) -> Result<()> {
    let name = PathBuffer::with_content(full_path.encode_utf16().count() + 1, full_path)?;
    open_and_release(api, root, &name, OpenRequest::PROBE_DIRECTORY)
}

/// Check that `dir_path\file_name` names an existing non-directory file
pub fn probe_file<A: FileApi>(
    api: &A,
    root: Option<&A::Root>,
    dir_path: Option<&str>,
    file_name: &str,
) -> Result<()> {
    let name = full_name(dir_path, file_name)?;
    open_and_release(api, root, &name, OpenRequest::PROBE_FILE)
}

/// Whether `full_path` names an existing directory
pub fn path_exists<A: FileApi>(api: &A, root: Option<&A::Root>, full_path: &str) -> bool {
    match probe_directory(api, root, full_path) {
        Ok(()) => true,
        Err(e) => {
            debug!("path_exists: {}", e);
            false
        }
    }
}

/// Whether `dir_path\file_name` names an existing non-directory file
pub fn file_exists<A: FileApi>(
    api: &A,
    root: Option<&A::Root>,
    dir_path: Option<&str>,
    file_name: &str,
) -> bool {
    match probe_file(api, root, dir_path, file_name) {
        Ok(()) => true,
        Err(e) => {
            debug!("file_exists: {}", e);
            false
        }
    }
}

fn open_and_release<A: FileApi>(
    api: &A,
    root: Option<&A::Root>,
    name: &PathBuffer,
    request: OpenRequest,
) -> Result<()> {
    let handle = api
        .open_existing(root, name, request)
        .map_err(|source| FsError::NotFound {
            path: name.to_string_lossy(),
            source,
        })?;
    trace!("Found '{}'", name);

    // The object exists whether or not the handle closes cleanly
    if let Err(e) = api.close_file(handle) {
        warn!("Failed to close probe handle for '{}': {}", name, e);
    }
    Ok(())
}
