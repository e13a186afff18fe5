//! ntdll signatures, structures and constants used by the NT backend
//!
//! These are native API definitions that the `windows` crate does not expose
//! as callable functions.

#![allow(non_snake_case)]

use std::ffi::c_void;

use windows::Win32::Foundation::{HANDLE, NTSTATUS, UNICODE_STRING};

// =============================================================================
// Function Signatures
// =============================================================================

/// NtOpenFile - Opens an existing file or directory
pub type NtOpenFileFn = unsafe extern "system" fn(
    FileHandle: *mut HANDLE,
    DesiredAccess: u32,
    ObjectAttributes: *mut ObjectAttributes,
    IoStatusBlock: *mut IoStatusBlock,
    ShareAccess: u32,
    OpenOptions: u32,
) -> NTSTATUS;

/// NtClose - Closes any object handle
pub type NtCloseFn = unsafe extern "system" fn(Handle: HANDLE) -> NTSTATUS;

/// NtQueryInformationFile - Queries file metadata by information class
pub type NtQueryInformationFileFn = unsafe extern "system" fn(
    FileHandle: HANDLE,
    IoStatusBlock: *mut IoStatusBlock,
    FileInformation: *mut c_void,
    Length: u32,
    FileInformationClass: u32,
) -> NTSTATUS;

/// NtCreateSection - Creates a section object (memory-mapped file)
pub type NtCreateSectionFn = unsafe extern "system" fn(
    SectionHandle: *mut HANDLE,
    DesiredAccess: u32,
    ObjectAttributes: *mut ObjectAttributes,
    MaximumSize: *mut i64,
    SectionPageProtection: u32,
    AllocationAttributes: u32,
    FileHandle: HANDLE,
) -> NTSTATUS;

/// NtMapViewOfSection - Maps a view of a section into a process
pub type NtMapViewOfSectionFn = unsafe extern "system" fn(
    SectionHandle: HANDLE,
    ProcessHandle: HANDLE,
    BaseAddress: *mut *mut c_void,
    ZeroBits: usize,
    CommitSize: usize,
    SectionOffset: *mut i64,
    ViewSize: *mut usize,
    InheritDisposition: u32,
    AllocationType: u32,
    Win32Protect: u32,
) -> NTSTATUS;

/// NtUnmapViewOfSection - Unmaps a previously mapped view
pub type NtUnmapViewOfSectionFn =
    unsafe extern "system" fn(ProcessHandle: HANDLE, BaseAddress: *mut c_void) -> NTSTATUS;

// =============================================================================
// Structures
// =============================================================================

/// OBJECT_ATTRIBUTES - Specifies attributes for object creation/opening
#[repr(C)]
pub struct ObjectAttributes {
    pub length: u32,
    pub root_directory: HANDLE,
    pub object_name: *mut UNICODE_STRING,
    pub attributes: u32,
    pub security_descriptor: *mut c_void,
    pub security_quality_of_service: *mut c_void,
}

impl ObjectAttributes {
    /// InitializeObjectAttributes with no security descriptor
    pub fn new(name: &mut UNICODE_STRING, attributes: u32, root: Option<HANDLE>) -> Self {
        Self {
            length: std::mem::size_of::<Self>() as u32,
            root_directory: root.unwrap_or_default(),
            object_name: name as *mut _,
            attributes,
            security_descriptor: std::ptr::null_mut(),
            security_quality_of_service: std::ptr::null_mut(),
        }
    }
}

/// IO_STATUS_BLOCK - Completion status of an I/O request
#[repr(C)]
#[derive(Default)]
pub struct IoStatusBlock {
    /// Status or Pointer union
    pub status: usize,
    pub information: usize,
}

/// FILE_STANDARD_INFORMATION - FileInformationClass = 5
#[repr(C)]
#[derive(Default)]
pub struct FileStandardInformation {
    pub allocation_size: i64,
    pub end_of_file: i64,
    pub number_of_links: u32,
    pub delete_pending: u8,
    pub directory: u8,
}

pub const FILE_STANDARD_INFORMATION: u32 = 5;

// =============================================================================
// Constants
// =============================================================================

// Access masks
pub const FILE_LIST_DIRECTORY: u32 = 0x0000_0001;
pub const SYNCHRONIZE: u32 = 0x0010_0000;
pub const GENERIC_READ: u32 = 0x8000_0000;
pub const SECTION_MAP_READ: u32 = 0x0000_0004;

// Share access
pub const FILE_SHARE_READ: u32 = 0x0000_0001;
pub const FILE_SHARE_WRITE: u32 = 0x0000_0002;

// Open options
pub const FILE_DIRECTORY_FILE: u32 = 0x0000_0001;
pub const FILE_SYNCHRONOUS_IO_NONALERT: u32 = 0x0000_0020;
pub const FILE_NON_DIRECTORY_FILE: u32 = 0x0000_0040;

// Object attributes
pub const OBJ_CASE_INSENSITIVE: u32 = 0x0000_0040;

// Section creation and mapping
pub const PAGE_READONLY: u32 = 0x02;
pub const SEC_COMMIT: u32 = 0x0800_0000;
/// SECTION_INHERIT::ViewShare
pub const VIEW_SHARE: u32 = 1;

/// NtCurrentProcess() pseudo handle
pub fn current_process() -> HANDLE {
    HANDLE(-1isize as *mut c_void)
}
