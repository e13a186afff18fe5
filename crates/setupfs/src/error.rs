//! Error types shared by every setupfs operation

use std::fmt;

use thiserror::Error;

/// Raw NTSTATUS code as returned by ntdll (or synthesized by the std backend)
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NtStatus(pub i32);

impl NtStatus {
    pub const SUCCESS: Self = Self(0);
    pub const INVALID_HANDLE: Self = Self(0xC0000008_u32 as i32);
    pub const ACCESS_DENIED: Self = Self(0xC0000022_u32 as i32);
    pub const OBJECT_NAME_INVALID: Self = Self(0xC0000033_u32 as i32);
    pub const OBJECT_NAME_NOT_FOUND: Self = Self(0xC0000034_u32 as i32);
    pub const OBJECT_PATH_NOT_FOUND: Self = Self(0xC000003A_u32 as i32);
    pub const SHARING_VIOLATION: Self = Self(0xC0000043_u32 as i32);
    pub const FILE_IS_A_DIRECTORY: Self = Self(0xC00000BA_u32 as i32);
    pub const NOT_A_DIRECTORY: Self = Self(0xC0000103_u32 as i32);
    pub const NAME_TOO_LONG: Self = Self(0xC0000106_u32 as i32);
    pub const MAPPED_FILE_SIZE_ZERO: Self = Self(0xC000011E_u32 as i32);

    /// Success and informational codes are non-negative
    pub fn is_success(self) -> bool {
        self.0 >= 0
    }

    /// Human readable name for the codes this crate produces or inspects
    pub fn name(self) -> Option<&'static str> {
        Some(match self {
            Self::SUCCESS => "STATUS_SUCCESS",
            Self::INVALID_HANDLE => "STATUS_INVALID_HANDLE",
            Self::ACCESS_DENIED => "STATUS_ACCESS_DENIED",
            Self::OBJECT_NAME_INVALID => "STATUS_OBJECT_NAME_INVALID",
            Self::OBJECT_NAME_NOT_FOUND => "STATUS_OBJECT_NAME_NOT_FOUND",
            Self::OBJECT_PATH_NOT_FOUND => "STATUS_OBJECT_PATH_NOT_FOUND",
            Self::SHARING_VIOLATION => "STATUS_SHARING_VIOLATION",
            Self::FILE_IS_A_DIRECTORY => "STATUS_FILE_IS_A_DIRECTORY",
            Self::NOT_A_DIRECTORY => "STATUS_NOT_A_DIRECTORY",
            Self::NAME_TOO_LONG => "STATUS_NAME_TOO_LONG",
            Self::MAPPED_FILE_SIZE_ZERO => "STATUS_MAPPED_FILE_SIZE_ZERO",
            _ => return None,
        })
    }
}

impl fmt::Debug for NtStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NtStatus({:#010x})", self.0 as u32)
    }
}

impl fmt::Display for NtStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({:#010x})", name, self.0 as u32),
            None => write!(f, "status {:#010x}", self.0 as u32),
        }
    }
}

/// Failure reported by a [`FileApi`](crate::FileApi) backend
#[derive(Debug, Error)]
pub enum OsError {
    #[error("{0}")]
    Status(NtStatus),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<NtStatus> for OsError {
    fn from(status: NtStatus) -> Self {
        OsError::Status(status)
    }
}

/// Error type for setupfs operations
#[derive(Debug, Error)]
pub enum FsError {
    /// A probed directory or file could not be opened
    #[error("'{path}' not found: {source}")]
    NotFound {
        path: String,
        #[source]
        source: OsError,
    },

    /// The file to be mapped could not be opened
    #[error("Failed to open file '{path}': {source}")]
    OpenFailed {
        path: String,
        #[source]
        source: OsError,
    },

    /// A join or copy would not fit in the destination buffer
    #[error("Path buffer too small: {required} characters needed, capacity is {capacity}")]
    BufferTooSmall { capacity: usize, required: usize },

    /// The file length does not fit the 32-bit size field
    #[error("The file '{path}' is too large ({length} bytes)")]
    SizeTooLarge { path: String, length: u64 },

    #[error("Failed to query the size of '{path}': {source}")]
    SizeQueryFailed {
        path: String,
        #[source]
        source: OsError,
    },

    #[error("Failed to create a memory section for file '{path}': {source}")]
    MappingFailed {
        path: String,
        #[source]
        source: OsError,
    },

    #[error("Failed to map a view for file '{path}': {source}")]
    MapViewFailed {
        path: String,
        #[source]
        source: OsError,
    },

    /// The input is not a hard disk device path
    #[error("'{input}' is not a hard disk device path")]
    NotMatched { input: String },

    /// An ntdll export needed by the NT backend is missing
    #[error("Failed to find function: {0}")]
    ApiUnavailable(&'static str),
}

/// Result alias used across the crate
pub type Result<T, E = FsError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display_known_code() {
        assert_eq!(
            NtStatus::OBJECT_NAME_NOT_FOUND.to_string(),
            "STATUS_OBJECT_NAME_NOT_FOUND (0xc0000034)"
        );
    }

    #[test]
    fn test_status_display_unknown_code() {
        assert_eq!(NtStatus(0x40000000).to_string(), "status 0x40000000");
        assert!(NtStatus(0x40000000).is_success());
        assert!(!NtStatus::ACCESS_DENIED.is_success());
    }

    #[test]
    fn test_error_message_names_path() {
        let err = FsError::MappingFailed {
            path: "\\SystemRoot\\txtsetup.sif".to_string(),
            source: NtStatus::MAPPED_FILE_SIZE_ZERO.into(),
        };
        let text = err.to_string();
        assert!(text.contains("\\SystemRoot\\txtsetup.sif"));
        assert!(text.contains("STATUS_MAPPED_FILE_SIZE_ZERO"));
    }
}
