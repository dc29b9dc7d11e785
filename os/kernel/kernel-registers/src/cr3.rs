//! # CR3

#[cfg(all(feature = "asm", target_arch = "x86_64", target_os = "none"))]
use crate::LoadRegisterUnsafe;
use bitfield_struct::bitfield;
use kernel_memory_addresses::PhysicalAddress;

/// CR3, the x86-64 Page-Map Level-4 Base Register (PCID disabled).
///
/// Holds the physical base of the PML4 (level 0) table and the cache
/// attributes used when the walker fetches it.
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct Cr3 {
    /// Bits 0–2 — Reserved.
    #[bits(3)]
    __reserved0: u8,

    /// Bit 3 — PWT: write-through for PML4 accesses.
    pub pwt: bool,

    /// Bit 4 — PCD: cache disable for PML4 accesses.
    pub pcd: bool,

    /// Bits 5–11 — Reserved.
    #[bits(7)]
    __reserved1: u8,

    /// Bits 12–51 — PML4 physical base >> 12.
    #[bits(40)]
    pml4_base_4k: u64,

    /// Bits 52–63 — Reserved.
    #[bits(12)]
    __reserved2: u16,
}

impl Cr3 {
    /// Build a `Cr3` value for a 4 KiB-aligned PML4.
    #[must_use]
    pub const fn from_pml4_phys(pml4_phys: PhysicalAddress) -> Self {
        debug_assert!(pml4_phys.as_u64() & 0xFFF == 0, "PML4 base must be 4K-aligned");
        Self::new().with_pml4_base_4k(pml4_phys.as_u64() >> 12)
    }

    /// Physical address of the PML4 table.
    #[must_use]
    pub const fn pml4_phys(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.pml4_base_4k() << 12)
    }
}

#[cfg(all(feature = "asm", target_arch = "x86_64", target_os = "none"))]
impl LoadRegisterUnsafe for Cr3 {
    unsafe fn load_unsafe() -> Self {
        let cr3: u64;
        unsafe {
            core::arch::asm!("mov {}, cr3", out(reg) cr3, options(nomem, nostack, preserves_flags));
        }
        Self::from_bits(cr3)
    }
}
