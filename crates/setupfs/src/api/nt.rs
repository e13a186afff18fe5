//! Native backend calling ntdll directly
//!
//! Function pointers are resolved once from the already loaded `ntdll.dll`.
//! Handles handed out by this backend are plain values; releasing them is the
//! caller's job through [`FileApi`], except for [`NtRootDirectory`] which
//! closes itself on drop.

use std::ffi::c_void;

use tracing::warn;
use windows::Win32::Foundation::{HANDLE, HMODULE, NTSTATUS, UNICODE_STRING};
use windows::Win32::System::LibraryLoader::{GetModuleHandleW, GetProcAddress};
use windows::core::{PCSTR, PWSTR, s, w};

use super::ntapi::*;
use super::{Access, FileApi, ObjectKind, OpenRequest};
use crate::error::{FsError, NtStatus, OsError};
use crate::path::PathBuffer;

/// Resolved ntdll entry points
#[derive(Clone, Copy)]
struct NtFunctions {
    open_file: NtOpenFileFn,
    close: NtCloseFn,
    query_information_file: NtQueryInformationFileFn,
    create_section: NtCreateSectionFn,
    map_view_of_section: NtMapViewOfSectionFn,
    unmap_view_of_section: NtUnmapViewOfSectionFn,
}

/// [`FileApi`] implementation over the NT native API
#[derive(Clone, Copy)]
pub struct NtFileApi {
    functions: NtFunctions,
}

/// Open file handle
#[derive(Debug)]
pub struct NtFile(HANDLE);

/// Section handle
#[derive(Debug)]
pub struct NtSection(HANDLE);

/// View mapped into the current process
#[derive(Debug)]
pub struct NtView {
    base: *mut c_void,
    size: usize,
}

impl NtView {
    pub fn base(&self) -> *const u8 {
        self.base as *const u8
    }
}

impl AsRef<[u8]> for NtView {
    fn as_ref(&self) -> &[u8] {
        // SAFETY: the view stays mapped, read-only, for the lifetime of `self`;
        // it is only unmapped by `unmap_view`, which consumes it.
        unsafe { std::slice::from_raw_parts(self.base as *const u8, self.size) }
    }
}

/// Directory handle usable as the root of relative names; closed on drop
pub struct NtRootDirectory {
    handle: HANDLE,
    close: NtCloseFn,
}

impl NtRootDirectory {
    pub fn handle(&self) -> HANDLE {
        self.handle
    }
}

impl Drop for NtRootDirectory {
    fn drop(&mut self) {
        if let Err(e) = check(unsafe { (self.close)(self.handle) }) {
            warn!("Failed to close root directory handle {:?}: {}", self.handle, e);
        }
    }
}

impl NtFileApi {
    /// Resolve the ntdll exports used by this backend
    pub fn new() -> crate::Result<Self> {
        unsafe {
            let ntdll = GetModuleHandleW(w!("ntdll.dll"))
                .map_err(|_| FsError::ApiUnavailable("ntdll.dll"))?;

            let functions = NtFunctions {
                open_file: std::mem::transmute::<_, NtOpenFileFn>(resolve(
                    ntdll,
                    s!("NtOpenFile"),
                    "NtOpenFile",
                )?),
                close: std::mem::transmute::<_, NtCloseFn>(resolve(
                    ntdll,
                    s!("NtClose"),
                    "NtClose",
                )?),
                query_information_file: std::mem::transmute::<_, NtQueryInformationFileFn>(
                    resolve(ntdll, s!("NtQueryInformationFile"), "NtQueryInformationFile")?,
                ),
                create_section: std::mem::transmute::<_, NtCreateSectionFn>(resolve(
                    ntdll,
                    s!("NtCreateSection"),
                    "NtCreateSection",
                )?),
                map_view_of_section: std::mem::transmute::<_, NtMapViewOfSectionFn>(resolve(
                    ntdll,
                    s!("NtMapViewOfSection"),
                    "NtMapViewOfSection",
                )?),
                unmap_view_of_section: std::mem::transmute::<_, NtUnmapViewOfSectionFn>(
                    resolve(ntdll, s!("NtUnmapViewOfSection"), "NtUnmapViewOfSection")?,
                ),
            };

            Ok(Self { functions })
        }
    }

    fn open_handle(
        &self,
        root: Option<HANDLE>,
        name: &PathBuffer,
        request: OpenRequest,
    ) -> Result<HANDLE, OsError> {
        let mut object_name = unicode_string(name)?;
        let mut attributes = ObjectAttributes::new(&mut object_name, OBJ_CASE_INSENSITIVE, root);
        let mut io_status = IoStatusBlock::default();
        let mut handle = HANDLE::default();

        let desired_access = match request.access {
            Access::ListDirectory => FILE_LIST_DIRECTORY,
            Access::Read => GENERIC_READ,
        } | SYNCHRONIZE;

        let mut share_access = 0;
        if request.share.read {
            share_access |= FILE_SHARE_READ;
        }
        if request.share.write {
            share_access |= FILE_SHARE_WRITE;
        }

        let open_options = FILE_SYNCHRONOUS_IO_NONALERT
            | match request.kind {
                ObjectKind::Directory => FILE_DIRECTORY_FILE,
                ObjectKind::NonDirectory => FILE_NON_DIRECTORY_FILE,
            };

        let status = unsafe {
            (self.functions.open_file)(
                &mut handle,
                desired_access,
                &mut attributes,
                &mut io_status,
                share_access,
                open_options,
            )
        };
        check(status)?;
        Ok(handle)
    }

    fn close_handle(&self, handle: HANDLE) -> Result<(), OsError> {
        check(unsafe { (self.functions.close)(handle) })
    }
}

impl FileApi for NtFileApi {
    type Root = NtRootDirectory;
    type File = NtFile;
    type Section = NtSection;
    type View = NtView;

    fn open_existing(
        &self,
        root: Option<&NtRootDirectory>,
        name: &PathBuffer,
        request: OpenRequest,
    ) -> Result<NtFile, OsError> {
        self.open_handle(root.map(|r| r.handle), name, request)
            .map(NtFile)
    }

    fn close_file(&self, file: NtFile) -> Result<(), OsError> {
        self.close_handle(file.0)
    }

    fn query_file_length(&self, file: &NtFile) -> Result<u64, OsError> {
        let mut io_status = IoStatusBlock::default();
        let mut info = FileStandardInformation::default();
        let status = unsafe {
            (self.functions.query_information_file)(
                file.0,
                &mut io_status,
                &mut info as *mut _ as *mut c_void,
                std::mem::size_of::<FileStandardInformation>() as u32,
                FILE_STANDARD_INFORMATION,
            )
        };
        check(status)?;
        Ok(info.end_of_file as u64)
    }

    fn create_read_only_mapping(&self, file: &NtFile) -> Result<NtSection, OsError> {
        let mut section = HANDLE::default();
        let status = unsafe {
            (self.functions.create_section)(
                &mut section,
                SECTION_MAP_READ,
                std::ptr::null_mut(),
                std::ptr::null_mut(),
                PAGE_READONLY,
                SEC_COMMIT,
                file.0,
            )
        };
        check(status)?;
        Ok(NtSection(section))
    }

    fn close_section(&self, section: NtSection) -> Result<(), OsError> {
        self.close_handle(section.0)
    }

    fn map_view(&self, section: &NtSection) -> Result<NtView, OsError> {
        let mut base: *mut c_void = std::ptr::null_mut();
        // 0 maps the whole section
        let mut size: usize = 0;
        let status = unsafe {
            (self.functions.map_view_of_section)(
                section.0,
                current_process(),
                &mut base,
                0,
                0,
                std::ptr::null_mut(),
                &mut size,
                VIEW_SHARE,
                0,
                PAGE_READONLY,
            )
        };
        check(status)?;
        Ok(NtView { base, size })
    }

    fn unmap_view(&self, view: NtView) -> Result<(), OsError> {
        check(unsafe { (self.functions.unmap_view_of_section)(current_process(), view.base) })
    }

    fn open_root_directory(
        &self,
        root: Option<&NtRootDirectory>,
        name: &PathBuffer,
    ) -> Result<NtRootDirectory, OsError> {
        let handle =
            self.open_handle(root.map(|r| r.handle), name, OpenRequest::PROBE_DIRECTORY)?;
        Ok(NtRootDirectory {
            handle,
            close: self.functions.close,
        })
    }
}

unsafe fn resolve(
    ntdll: HMODULE,
    name: PCSTR,
    label: &'static str,
) -> crate::Result<unsafe extern "system" fn() -> isize> {
    unsafe { GetProcAddress(ntdll, name) }.ok_or(FsError::ApiUnavailable(label))
}

/// Counted string over the buffer's content; borrows `name`
fn unicode_string(name: &PathBuffer) -> Result<UNICODE_STRING, OsError> {
    let byte_len = name.len() * 2;
    if byte_len + 2 > u16::MAX as usize {
        return Err(NtStatus::NAME_TOO_LONG.into());
    }
    Ok(UNICODE_STRING {
        Length: byte_len as u16,
        MaximumLength: (byte_len + 2) as u16,
        Buffer: PWSTR(name.as_wide_with_nul().as_ptr() as *mut u16),
    })
}

fn check(status: NTSTATUS) -> Result<(), OsError> {
    let status = NtStatus(status.0);
    if status.is_success() {
        Ok(())
    } else {
        Err(status.into())
    }
}
