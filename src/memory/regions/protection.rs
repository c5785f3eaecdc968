//! Page protection and region state vocabulary
//!
//! Region descriptors use the Windows constants on every platform; the Linux
//! backend translates `/proc/<pid>/maps` permissions into them.

use std::fmt;

/// Region is backed by physical storage
pub const MEM_COMMIT: u32 = 0x1000;
/// Region is reserved but not committed
pub const MEM_RESERVE: u32 = 0x2000;
/// Region is unallocated
pub const MEM_FREE: u32 = 0x10000;

/// Page protection flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProtectionFlags {
    value: u32,
}

impl ProtectionFlags {
    pub const PAGE_NOACCESS: u32 = 0x01;
    pub const PAGE_READONLY: u32 = 0x02;
    pub const PAGE_READWRITE: u32 = 0x04;
    pub const PAGE_WRITECOPY: u32 = 0x08;
    pub const PAGE_EXECUTE: u32 = 0x10;
    pub const PAGE_EXECUTE_READ: u32 = 0x20;
    pub const PAGE_EXECUTE_READWRITE: u32 = 0x40;
    pub const PAGE_EXECUTE_WRITECOPY: u32 = 0x80;
    pub const PAGE_GUARD: u32 = 0x100;
    pub const PAGE_NOCACHE: u32 = 0x200;
    pub const PAGE_WRITECOMBINE: u32 = 0x400;

    /// Base protections a scan is allowed to read
    pub const READABLE: [u32; 6] = [
        Self::PAGE_READONLY,
        Self::PAGE_READWRITE,
        Self::PAGE_WRITECOPY,
        Self::PAGE_EXECUTE_READ,
        Self::PAGE_EXECUTE_READWRITE,
        Self::PAGE_EXECUTE_WRITECOPY,
    ];

    /// Create new protection flags
    pub const fn new(value: u32) -> Self {
        ProtectionFlags { value }
    }

    /// Translates `rwxp`/`rwxs` permission text from a maps line
    pub fn from_permissions(perms: &str) -> Self {
        let bytes = perms.as_bytes();
        let flag = |i: usize, c: u8| bytes.get(i) == Some(&c);
        let (r, w, x) = (flag(0, b'r'), flag(1, b'w'), flag(2, b'x'));
        let private = flag(3, b'p');

        let value = match (r, w, x) {
            (false, _, false) => Self::PAGE_NOACCESS,
            (false, _, true) => Self::PAGE_EXECUTE,
            (true, false, false) => Self::PAGE_READONLY,
            (true, true, false) if private => Self::PAGE_WRITECOPY,
            (true, true, false) => Self::PAGE_READWRITE,
            (true, false, true) => Self::PAGE_EXECUTE_READ,
            (true, true, true) if private => Self::PAGE_EXECUTE_WRITECOPY,
            (true, true, true) => Self::PAGE_EXECUTE_READWRITE,
        };
        ProtectionFlags::new(value)
    }

    /// Get the raw protection value
    pub const fn raw(&self) -> u32 {
        self.value
    }

    /// Base protection with the modifier bits (guard, nocache, writecombine) removed
    pub const fn base(&self) -> u32 {
        self.value & 0xFF
    }

    /// Exactly one of the readable protections, with no modifier bits
    pub fn is_readable(&self) -> bool {
        Self::READABLE.contains(&self.value)
    }

    pub fn is_writable(&self) -> bool {
        (self.value
            & (Self::PAGE_READWRITE
                | Self::PAGE_WRITECOPY
                | Self::PAGE_EXECUTE_READWRITE
                | Self::PAGE_EXECUTE_WRITECOPY))
            != 0
    }

    pub fn is_executable(&self) -> bool {
        (self.value
            & (Self::PAGE_EXECUTE
                | Self::PAGE_EXECUTE_READ
                | Self::PAGE_EXECUTE_READWRITE
                | Self::PAGE_EXECUTE_WRITECOPY))
            != 0
    }

    /// Check if guard page flag is set
    pub const fn is_guard(&self) -> bool {
        (self.value & Self::PAGE_GUARD) != 0
    }

    /// Add guard page flag
    pub const fn with_guard(mut self) -> Self {
        self.value |= Self::PAGE_GUARD;
        self
    }

    fn format_string(&self) -> String {
        let base = match self.base() {
            Self::PAGE_NOACCESS => "NOACCESS",
            Self::PAGE_READONLY => "R",
            Self::PAGE_READWRITE => "RW",
            Self::PAGE_WRITECOPY => "WC",
            Self::PAGE_EXECUTE => "X",
            Self::PAGE_EXECUTE_READ => "RX",
            Self::PAGE_EXECUTE_READWRITE => "RWX",
            Self::PAGE_EXECUTE_WRITECOPY => "WCX",
            _ => "UNKNOWN",
        };

        let mut flags = String::from(base);
        if self.is_guard() {
            flags.push_str("+G");
        }
        if self.value & Self::PAGE_NOCACHE != 0 {
            flags.push_str("+NC");
        }
        if self.value & Self::PAGE_WRITECOMBINE != 0 {
            flags.push_str("+WCB");
        }
        flags
    }
}

impl fmt::Display for ProtectionFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_string())
    }
}

/// True when a region with this state and protection may be scanned
pub fn qualifies(state: u32, protection: u32) -> bool {
    state == MEM_COMMIT && ProtectionFlags::new(protection).is_readable()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readable_set() {
        for p in ProtectionFlags::READABLE {
            assert!(ProtectionFlags::new(p).is_readable(), "0x{p:X}");
        }
        assert!(!ProtectionFlags::new(ProtectionFlags::PAGE_NOACCESS).is_readable());
        assert!(!ProtectionFlags::new(ProtectionFlags::PAGE_EXECUTE).is_readable());
        assert!(!ProtectionFlags::new(ProtectionFlags::PAGE_READWRITE)
            .with_guard()
            .is_readable());
        for modifier in [ProtectionFlags::PAGE_NOCACHE, ProtectionFlags::PAGE_WRITECOMBINE] {
            assert!(!ProtectionFlags::new(ProtectionFlags::PAGE_READWRITE | modifier).is_readable());
        }
    }

    #[test]
    fn test_qualifies_requires_commit() {
        assert!(qualifies(MEM_COMMIT, ProtectionFlags::PAGE_READONLY));
        assert!(!qualifies(MEM_RESERVE, ProtectionFlags::PAGE_READONLY));
        assert!(!qualifies(MEM_FREE, ProtectionFlags::PAGE_NOACCESS));
        assert!(!qualifies(
            MEM_COMMIT,
            ProtectionFlags::PAGE_READONLY | ProtectionFlags::PAGE_GUARD
        ));
        assert!(!qualifies(MEM_COMMIT, 0x204));
    }

    #[test]
    fn test_from_permissions() {
        let cases = [
            ("r--p", ProtectionFlags::PAGE_READONLY),
            ("rw-p", ProtectionFlags::PAGE_WRITECOPY),
            ("rw-s", ProtectionFlags::PAGE_READWRITE),
            ("r-xp", ProtectionFlags::PAGE_EXECUTE_READ),
            ("rwxp", ProtectionFlags::PAGE_EXECUTE_WRITECOPY),
            ("rwxs", ProtectionFlags::PAGE_EXECUTE_READWRITE),
            ("---p", ProtectionFlags::PAGE_NOACCESS),
            ("--xp", ProtectionFlags::PAGE_EXECUTE),
        ];
        for (perms, expected) in cases {
            assert_eq!(ProtectionFlags::from_permissions(perms).raw(), expected, "{perms}");
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(ProtectionFlags::new(0x04).to_string(), "RW");
        assert_eq!(ProtectionFlags::new(0x104).to_string(), "RW+G");
        assert_eq!(ProtectionFlags::new(0x220).to_string(), "RX+NC");
    }
}
