use bitflags::bitflags;
use kernel_memory_addresses::PageSize;

bitflags! {
    /// Architecture-neutral mapping intent.
    ///
    /// Anything not requested is denied: a mapping is read-only,
    /// non-executable, supervisor-only and ASID/PCID-local unless the
    /// matching flag is set. Valid entries are always marked present.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct MapFlags: u32 {
        const PRESENT    = 1 << 0;
        const WRITABLE   = 1 << 1;
        const EXECUTABLE = 1 << 2;
        /// Survives address-space switches.
        const GLOBAL     = 1 << 3;
        /// Accessible from user mode.
        const USER       = 1 << 4;
        /// Map a 2 MiB block.
        const HUGE_2M    = 1 << 5;
        /// Map a 1 GiB block.
        const HUGE_1G    = 1 << 6;
    }
}

impl MapFlags {
    /// Both huge-page selectors.
    pub const HUGE: Self = Self::HUGE_2M.union(Self::HUGE_1G);

    #[inline]
    #[must_use]
    pub const fn is_huge(self) -> bool {
        self.intersects(Self::HUGE)
    }

    /// The page size these flags ask for. `HUGE_1G` wins over `HUGE_2M`.
    #[inline]
    #[must_use]
    pub const fn page_size(self) -> PageSize {
        if self.contains(Self::HUGE_1G) {
            PageSize::Size1G
        } else if self.contains(Self::HUGE_2M) {
            PageSize::Size2M
        } else {
            PageSize::Size4K
        }
    }
}
