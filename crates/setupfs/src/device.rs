//! Hard disk device path parsing
//!
//! Decodes NT names of the form
//!
//! ```text
//! \Device\HarddiskXXX\PartitionYYY[\path]
//! ```
//!
//! into the disk number, the partition number and the unparsed remainder.
//! Matching is ASCII case-insensitive and leading whitespace is not accepted.
//!
//! Only a missing `\Device\Harddisk` prefix, a missing disk number, or a disk
//! number followed by something other than a separator is rejected. Anything
//! after a valid disk number that is not a well-formed `\PartitionYYY`
//! component is accepted as "whole disk" and left in the remainder, starting at
//! the separator that follows the disk number.

use std::fmt;

use tracing::{debug, trace};

use crate::error::{FsError, Result};
use crate::path::SEPARATOR;

const HARDDISK_PREFIX: &str = "\\Device\\Harddisk";
const PARTITION_PREFIX: &str = "\\Partition";

/// Disk and partition identifiers decoded from a device path.
///
/// Borrows the remainder from the parsed input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceLocator<'a> {
    disk_number: u32,
    partition: Option<u32>,
    remainder: &'a str,
}

impl<'a> DeviceLocator<'a> {
    pub fn disk_number(&self) -> u32 {
        self.disk_number
    }

    /// Partition number, 0 when the path names the whole disk
    pub fn partition_number(&self) -> u32 {
        self.partition.unwrap_or(0)
    }

    /// Partition number if a `\PartitionYYY` component was parsed
    pub fn partition(&self) -> Option<u32> {
        self.partition
    }

    pub fn has_partition(&self) -> bool {
        self.partition.is_some()
    }

    /// Unparsed tail of the input; empty or starting with a separator
    pub fn remainder(&self) -> &'a str {
        self.remainder
    }

    /// Byte offset of the remainder inside `input`, if it was parsed from `input`
    pub fn remainder_offset(&self, input: &str) -> Option<usize> {
        let offset = (self.remainder.as_ptr() as usize).checked_sub(input.as_ptr() as usize)?;
        (offset + self.remainder.len() <= input.len()).then_some(offset)
    }
}

impl fmt::Display for DeviceLocator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", HARDDISK_PREFIX, self.disk_number)?;
        if let Some(partition) = self.partition {
            write!(f, "{}{}", PARTITION_PREFIX, partition)?;
        }
        f.write_str(self.remainder)
    }
}

/// Parse `nt_path` into its disk, partition and remainder parts
pub fn parse(nt_path: &str) -> Result<DeviceLocator<'_>> {
    let not_matched = || FsError::NotMatched {
        input: nt_path.to_string(),
    };

    let Some(rest) = strip_prefix_ignore_case(nt_path, HARDDISK_PREFIX) else {
        debug!("'{}' : Not a possible hard disk device.", nt_path);
        return Err(not_matched());
    };

    let Some((disk_number, rest)) = take_number(rest) else {
        debug!("'{}' : expected a disk number", nt_path);
        return Err(not_matched());
    };

    if !at_component_end(rest) {
        debug!("'{}' : expected a path separator after the disk number", nt_path);
        return Err(not_matched());
    }

    let whole_disk = DeviceLocator {
        disk_number,
        partition: None,
        remainder: rest,
    };

    if rest.is_empty() {
        trace!("'{}' : whole disk {}", nt_path, disk_number);
        return Ok(whole_disk);
    }

    let Some(after) = strip_prefix_ignore_case(rest, PARTITION_PREFIX) else {
        debug!("'{}' : no partition component", nt_path);
        return Ok(whole_disk);
    };

    match take_number(after) {
        Some((partition, tail)) if at_component_end(tail) => {
            trace!("'{}' : disk {} partition {}", nt_path, disk_number, partition);
            Ok(DeviceLocator {
                disk_number,
                partition: Some(partition),
                remainder: tail,
            })
        }
        _ => {
            debug!("'{}' : malformed partition component", nt_path);
            Ok(whole_disk)
        }
    }
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &s[prefix.len()..])
}

/// Maximal run of ASCII digits, saturating like `wcstoul`
fn take_number(s: &str) -> Option<(u32, &str)> {
    let digits = s.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let value = s.as_bytes()[..digits].iter().fold(0u32, |acc, &b| {
        acc.saturating_mul(10).saturating_add(u32::from(b - b'0'))
    });
    Some((value, &s[digits..]))
}

fn at_component_end(s: &str) -> bool {
    s.is_empty() || s.starts_with(SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_disk() {
        let loc = parse("\\Device\\Harddisk0").unwrap();
        assert_eq!(loc.disk_number(), 0);
        assert_eq!(loc.partition_number(), 0);
        assert!(!loc.has_partition());
        assert_eq!(loc.remainder(), "");
    }

    #[test]
    fn test_partition_with_path() {
        let input = "\\Device\\Harddisk2\\Partition1\\boot\\ntldr";
        let loc = parse(input).unwrap();
        assert_eq!(loc.disk_number(), 2);
        assert_eq!(loc.partition_number(), 1);
        assert_eq!(loc.remainder(), "\\boot\\ntldr");
        assert_eq!(loc.remainder_offset(input), Some(input.len() - "\\boot\\ntldr".len()));
    }

    #[test]
    fn test_partition_without_path() {
        let loc = parse("\\Device\\Harddisk3\\Partition12").unwrap();
        assert_eq!(loc.disk_number(), 3);
        assert_eq!(loc.partition(), Some(12));
        assert_eq!(loc.remainder(), "");
    }

    #[test]
    fn test_non_partition_tail_is_soft_accept() {
        let loc = parse("\\Device\\Harddisk1\\DR1").unwrap();
        assert_eq!(loc.disk_number(), 1);
        assert_eq!(loc.partition_number(), 0);
        assert_eq!(loc.remainder(), "\\DR1");
    }

    #[test]
    fn test_wrong_prefix_is_rejected() {
        assert!(matches!(
            parse("\\Device\\CdRom0"),
            Err(FsError::NotMatched { .. })
        ));
        assert!(parse("").is_err());
        assert!(parse(" \\Device\\Harddisk0").is_err());
        assert!(parse("\\Device\\Hard").is_err());
    }

    #[test]
    fn test_missing_disk_number_is_rejected() {
        assert!(parse("\\Device\\Harddisk").is_err());
        assert!(parse("\\Device\\Harddisk\\Partition1").is_err());
        assert!(parse("\\Device\\HarddiskVolume3\\Windows").is_err());
    }

    #[test]
    fn test_garbage_after_disk_number_is_rejected() {
        assert!(parse("\\Device\\Harddisk0x").is_err());
        assert!(parse("\\Device\\Harddisk0/Partition1").is_err());
    }

    #[test]
    fn test_prefix_is_case_insensitive() {
        let loc = parse("\\DEVICE\\hardDISK4\\pArTiTiOn2\\ReactOS").unwrap();
        assert_eq!(loc.disk_number(), 4);
        assert_eq!(loc.partition_number(), 2);
        assert_eq!(loc.remainder(), "\\ReactOS");
    }

    #[test]
    fn test_partition_without_number_rewinds() {
        let loc = parse("\\Device\\Harddisk0\\Partition\\foo").unwrap();
        assert_eq!(loc.partition(), None);
        assert_eq!(loc.remainder(), "\\Partition\\foo");
    }

    #[test]
    fn test_partition_with_trailing_garbage_rewinds() {
        let loc = parse("\\Device\\Harddisk0\\Partition1x\\foo").unwrap();
        assert_eq!(loc.disk_number(), 0);
        assert_eq!(loc.partition(), None);
        assert_eq!(loc.remainder(), "\\Partition1x\\foo");
    }

    #[test]
    fn test_partition_zero_is_a_partition() {
        let loc = parse("\\Device\\Harddisk0\\Partition0").unwrap();
        assert_eq!(loc.partition(), Some(0));
        assert_eq!(loc.partition_number(), 0);
    }

    #[test]
    fn test_disk_number_saturates() {
        let loc = parse("\\Device\\Harddisk99999999999").unwrap();
        assert_eq!(loc.disk_number(), u32::MAX);
    }

    #[test]
    fn test_non_ascii_input() {
        assert!(parse("\\Device\\Harddisk٣").is_err());
        let loc = parse("\\Device\\Harddisk0\\Pärtition1").unwrap();
        assert_eq!(loc.remainder(), "\\Pärtition1");
    }

    #[test]
    fn test_display_canonical_form() {
        let loc = parse("\\device\\harddisk2\\partition1\\boot").unwrap();
        assert_eq!(loc.to_string(), "\\Device\\Harddisk2\\Partition1\\boot");
        let loc = parse("\\Device\\Harddisk1\\DR1").unwrap();
        assert_eq!(loc.to_string(), "\\Device\\Harddisk1\\DR1");
    }
}
