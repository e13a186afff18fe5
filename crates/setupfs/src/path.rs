//! Fixed-capacity path buffers and separator-aware joining
//!
//! Names are kept as UTF-16 code units so that they can be handed to the NT
//! object manager without re-encoding. The capacity counts code units
//! including the terminating NUL, exactly like a `WCHAR name[cch]` array.

use std::fmt;

use crate::error::{FsError, Result};

/// The only path separator recognized by setupfs
pub const SEPARATOR: char = '\\';

/// Capacity used when a full name is built internally
pub const MAX_PATH: usize = 260;

const SEP: u16 = SEPARATOR as u16;

/// A NUL-terminated UTF-16 path whose capacity never changes after construction
#[derive(Clone, PartialEq, Eq)]
pub struct PathBuffer {
    units: Box<[u16]>,
    len: usize,
}

impl PathBuffer {
    /// Create an empty buffer holding at most `capacity - 1` characters.
    ///
    /// A capacity of 0 is rounded up to 1 so the terminator always fits.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            units: vec![0u16; capacity.max(1)].into_boxed_slice(),
            len: 0,
        }
    }

    /// Create an empty `MAX_PATH` buffer
    pub fn max_path() -> Self {
        Self::with_capacity(MAX_PATH)
    }

    /// Create a buffer initialized with `content`, failing if it does not fit
    pub fn with_content(capacity: usize, content: &str) -> Result<Self> {
        let mut buffer = Self::with_capacity(capacity);
        buffer.push_units(content.encode_utf16())?;
        Ok(buffer)
    }

    /// Number of code units before the terminator
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total capacity in code units, terminator included
    pub fn capacity(&self) -> usize {
        self.units.len()
    }

    /// Content without the terminator
    pub fn as_wide(&self) -> &[u16] {
        &self.units[..self.len]
    }

    /// Content including the terminator
    pub fn as_wide_with_nul(&self) -> &[u16] {
        &self.units[..=self.len]
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf16_lossy(self.as_wide())
    }

    pub fn clear(&mut self) {
        self.len = 0;
        self.units[0] = 0;
    }

    /// Append `suffix`, keeping exactly one separator at the seam.
    ///
    /// - `None` or a buffer with no room for any character: no-op.
    /// - Neither side has a separator: one is inserted (unless the buffer is
    ///   empty), so an empty `suffix` leaves a trailing separator.
    /// - Both sides have one: all leading separators of `suffix` are skipped.
    /// - Exactly one side has one: `suffix` is appended unchanged.
    ///
    /// On [`FsError::BufferTooSmall`] the buffer holds a truncated, still
    /// terminated prefix and must not be trusted.
    pub fn join(&mut self, suffix: Option<&str>) -> Result<()> {
        let Some(suffix) = suffix else {
            return Ok(());
        };
        if self.capacity() <= 1 {
            return Ok(());
        }

        let base_ends_with_sep = self.as_wide().last() == Some(&SEP);
        let suffix_starts_with_sep = suffix.starts_with(SEPARATOR);

        let suffix = if !base_ends_with_sep && !suffix_starts_with_sep {
            if !self.is_empty() {
                self.push_units(std::iter::once(SEP))?;
            }
            suffix
        } else if base_ends_with_sep && suffix_starts_with_sep {
            suffix.trim_start_matches(SEPARATOR)
        } else {
            suffix
        };

        self.push_units(suffix.encode_utf16())
    }

    /// Bounded concatenation: copies what fits and always re-terminates
    fn push_units<I: Iterator<Item = u16>>(&mut self, mut units: I) -> Result<()> {
        let limit = self.capacity() - 1;
        while self.len < limit {
            match units.next() {
                Some(unit) => {
                    self.units[self.len] = unit;
                    self.len += 1;
                }
                None => {
                    self.units[self.len] = 0;
                    return Ok(());
                }
            }
        }
        self.units[self.len] = 0;

        let overflow = units.count();
        if overflow == 0 {
            Ok(())
        } else {
            Err(FsError::BufferTooSmall {
                capacity: self.capacity(),
                required: self.len + overflow + 1,
            })
        }
    }
}

impl fmt::Display for PathBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in char::decode_utf16(self.as_wide().iter().copied()) {
            write!(f, "{}", c.unwrap_or(char::REPLACEMENT_CHARACTER))?;
        }
        Ok(())
    }
}

impl fmt::Debug for PathBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathBuffer")
            .field("path", &self.to_string_lossy())
            .field("capacity", &self.capacity())
            .finish()
    }
}

/// Build `dir_path` + `file_name` into a fresh `MAX_PATH` buffer
pub(crate) fn full_name(dir_path: Option<&str>, file_name: &str) -> Result<PathBuffer> {
    let mut name = PathBuffer::with_content(MAX_PATH, dir_path.unwrap_or(""))?;
    name.join(Some(file_name))?;
    Ok(name)
}
