//! # Boot Memory Map
//!
//! The bootloader describes physical memory as a list of regions. The list is
//! consumed exactly once, by pageframe initialization.

/// What a physical memory region may be used for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MemoryRegionKind {
    /// General purpose RAM, free for the kernel to use.
    Usable = 0,
    /// Firmware or hardware reserved.
    Reserved = 1,
    /// ACPI tables; reclaimable once parsed.
    AcpiReclaimable = 2,
    /// ACPI non-volatile storage.
    AcpiNvs = 3,
    /// Known-bad RAM.
    BadMemory = 4,
    /// Memory in use by the bootloader.
    BootloaderReclaimable = 5,
    /// The loaded kernel image and modules.
    KernelAndModules = 6,
    /// Linear framebuffer.
    Framebuffer = 7,
}

/// A single entry of the boot memory map.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MemoryRegion {
    /// Physical base address in bytes.
    pub base: u64,
    /// Length in bytes.
    pub length: u64,
    /// Region type.
    pub kind: MemoryRegionKind,
}

impl MemoryRegion {
    #[must_use]
    pub const fn new(base: u64, length: u64, kind: MemoryRegionKind) -> Self {
        Self { base, length, kind }
    }

    #[must_use]
    pub const fn usable(base: u64, length: u64) -> Self {
        Self::new(base, length, MemoryRegionKind::Usable)
    }

    /// Whether the pageframe allocator may track this region.
    #[must_use]
    pub const fn is_usable(&self) -> bool {
        matches!(self.kind, MemoryRegionKind::Usable)
    }

    /// One past the last byte of the region.
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.base.saturating_add(self.length)
    }
}
