//! setupfs - filesystem primitives for operating system setup tools
//!
//! Provides separator-aware joining into fixed-capacity NT path buffers,
//! directory and file existence probes, parsing of
//! `\Device\HarddiskN\PartitionM` device names, and read-only memory mapping of
//! whole files with guaranteed release of every acquired resource.
//!
//! All OS access goes through a [`FileApi`] backend: [`NtFileApi`] talks to
//! ntdll on Windows, [`StdFileApi`] works on any host with `std::fs`.

pub mod api;
pub mod device;
pub mod error;
pub mod mapped;
pub mod path;
pub mod probe;

#[cfg(windows)]
pub use api::NtFileApi;
pub use api::{
    Access, FileApi, NativeFileApi, ObjectKind, OpenRequest, ShareAccess, StdFileApi, native,
};
pub use device::{DeviceLocator, parse as parse_device_path};
pub use error::{FsError, NtStatus, OsError, Result};
pub use mapped::{FileSize, MAX_MAPPED_FILE_SIZE, MappedFile};
pub use path::{MAX_PATH, PathBuffer, SEPARATOR};
pub use probe::{file_exists, path_exists, probe_directory, probe_file};
