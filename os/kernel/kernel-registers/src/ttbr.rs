//! # TTBR0_EL1 / TTBR1_EL1
//!
//! AArch64 splits the address space in two halves, each with its own
//! translation table base register. With a 48-bit VA and the 4 KiB granule:
//!
//! ```text
//! 0x0000_0000_0000_0000 ─┐
//!                        │  TTBR0_EL1 (lower half, user)
//! 0x0000_FFFF_FFFF_FFFF ─┘
//! 0xFFFF_0000_0000_0000 ─┐
//!                        │  TTBR1_EL1 (upper half, kernel)
//! 0xFFFF_FFFF_FFFF_FFFF ─┘
//! ```

#[cfg(all(feature = "asm", target_arch = "aarch64", target_os = "none"))]
use crate::LoadRegisterUnsafe;
use bitfield_struct::bitfield;
use kernel_memory_addresses::PhysicalAddress;

/// Translation Table Base Register layout (FEAT_LPA not implemented).
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct Ttbr {
    /// Bit 0 — CnP: the table is shared between PEs with the same ASID.
    pub cnp: bool,

    /// Bits 1–47 — BADDR\[47:1\]: base of the level-0 table.
    #[bits(47)]
    baddr_47_1: u64,

    /// Bits 48–63 — ASID.
    #[bits(16)]
    pub asid: u16,
}

impl Ttbr {
    /// Build a value pointing at the 4 KiB-aligned level-0 table `base`.
    #[must_use]
    pub const fn from_table_phys(base: PhysicalAddress, asid: u16) -> Self {
        debug_assert!(base.as_u64() & 0xFFF == 0, "L0 base must be 4K-aligned");
        Self::new()
            .with_baddr_47_1(base.as_u64() >> 1)
            .with_asid(asid)
    }

    /// Physical address of the level-0 table.
    ///
    /// Bits 11:1 of BADDR are ignored; the 4 KiB granule forces them to zero.
    #[must_use]
    pub const fn table_phys(&self) -> PhysicalAddress {
        PhysicalAddress::new((self.baddr_47_1() << 1) & !0xFFF)
    }
}

/// `TTBR0_EL1`, root of the lower (user) half.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(transparent)]
pub struct Ttbr0El1(pub Ttbr);

/// `TTBR1_EL1`, root of the upper (kernel) half.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(transparent)]
pub struct Ttbr1El1(pub Ttbr);

#[cfg(all(feature = "asm", target_arch = "aarch64", target_os = "none"))]
impl LoadRegisterUnsafe for Ttbr0El1 {
    unsafe fn load_unsafe() -> Self {
        let bits: u64;
        unsafe {
            core::arch::asm!("mrs {}, ttbr0_el1", out(reg) bits, options(nomem, nostack, preserves_flags));
        }
        Self(Ttbr::from_bits(bits))
    }
}

#[cfg(all(feature = "asm", target_arch = "aarch64", target_os = "none"))]
impl LoadRegisterUnsafe for Ttbr1El1 {
    unsafe fn load_unsafe() -> Self {
        let bits: u64;
        unsafe {
            core::arch::asm!("mrs {}, ttbr1_el1", out(reg) bits, options(nomem, nostack, preserves_flags));
        }
        Self(Ttbr::from_bits(bits))
    }
}
