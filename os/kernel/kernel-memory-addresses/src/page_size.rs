use core::fmt;

/// Page granules understood by the walkers.
///
/// [`PageSize::Any`] is a lookup wildcard: it accepts whatever mapping size
/// is found and is treated as the 4 KiB granule for alignment.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PageSize {
    /// 4 KiB page, mapped by a level-3 entry.
    Size4K,
    /// 2 MiB block, mapped by a level-2 entry.
    Size2M,
    /// 1 GiB block, mapped by a level-1 entry.
    Size1G,
    /// Accept any size.
    Any,
}

/// A byte count that is not one of the supported page sizes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown page granule {0:#x}")]
pub struct UnknownGranule(pub u64);

impl PageSize {
    /// Size in bytes. [`PageSize::Any`] reports the 4 KiB granule.
    #[inline]
    #[must_use]
    pub const fn bytes(self) -> u64 {
        match self {
            Self::Size4K | Self::Any => 0x1000,
            Self::Size2M => 0x20_0000,
            Self::Size1G => 0x4000_0000,
        }
    }

    /// The table level (0 = root) whose entries map pages of this size.
    #[inline]
    #[must_use]
    pub const fn level(self) -> u8 {
        match self {
            Self::Size1G => 1,
            Self::Size2M => 2,
            Self::Size4K | Self::Any => 3,
        }
    }

    /// The size a leaf entry at `level` maps, if leaves are legal there.
    #[inline]
    #[must_use]
    pub const fn for_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(Self::Size1G),
            2 => Some(Self::Size2M),
            3 => Some(Self::Size4K),
            _ => None,
        }
    }

    /// Whether a mapping of size `found` satisfies a request for `self`.
    #[inline]
    #[must_use]
    pub const fn accepts(self, found: Self) -> bool {
        matches!(self, Self::Any) || (self.bytes() == found.bytes() && !matches!(found, Self::Any))
    }
}

impl TryFrom<u64> for PageSize {
    type Error = UnknownGranule;

    fn try_from(bytes: u64) -> Result<Self, Self::Error> {
        match bytes {
            0x1000 => Ok(Self::Size4K),
            0x20_0000 => Ok(Self::Size2M),
            0x4000_0000 => Ok(Self::Size1G),
            other => Err(UnknownGranule(other)),
        }
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Size4K => "4K",
            Self::Size2M => "2M",
            Self::Size1G => "1G",
            Self::Any => "any",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_and_sizes_agree() {
        for level in 1..=3 {
            let size = PageSize::for_level(level).unwrap();
            assert_eq!(size.level(), level);
        }
        assert_eq!(PageSize::for_level(0), None);
        assert_eq!(PageSize::Any.level(), 3);
    }

    #[test]
    fn try_from_rejects_unknown_granules() {
        assert_eq!(PageSize::try_from(0x20_0000), Ok(PageSize::Size2M));
        assert_eq!(PageSize::try_from(0x2000), Err(UnknownGranule(0x2000)));
        assert_eq!(PageSize::try_from(0), Err(UnknownGranule(0)));
    }

    #[test]
    fn any_accepts_everything() {
        assert!(PageSize::Any.accepts(PageSize::Size1G));
        assert!(PageSize::Size2M.accepts(PageSize::Size2M));
        assert!(!PageSize::Size4K.accepts(PageSize::Size2M));
        assert!(!PageSize::Size4K.accepts(PageSize::Any));
    }
}
