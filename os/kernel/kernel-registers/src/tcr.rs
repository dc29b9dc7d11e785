//! # TCR_EL1 and ID_AA64MMFR0_EL1
//!
//! Translation control for both halves: region sizes, granules, table-walk
//! cacheability and the output address size the CPU supports.

#[cfg(all(feature = "asm", target_arch = "aarch64", target_os = "none"))]
use crate::{LoadRegisterUnsafe, StoreRegisterUnsafe};
use bitfield_struct::bitfield;

/// `TG0` encoding of the 4 KiB granule.
pub const TG0_4K: u8 = 0b00;
/// `TG1` encoding of the 4 KiB granule.
pub const TG1_4K: u8 = 0b10;
/// Normal memory, write-back read/write allocate (`IRGNn` / `ORGNn`).
pub const WALK_WRITE_BACK: u8 = 0b01;
/// Inner shareable (`SHn`).
pub const WALK_INNER_SHAREABLE: u8 = 0b11;
/// `TnSZ` for a 48-bit virtual address space.
pub const VA_48_BITS: u8 = 64 - 48;

/// Translation Control Register.
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct Tcr {
    /// Bits 0–5 — T0SZ: size offset of the TTBR0 region.
    #[bits(6)]
    pub t0sz: u8,
    #[bits(1)]
    __reserved0: u8,
    /// Bit 7 — EPD0: disable TTBR0 walks.
    pub epd0: bool,
    /// Bits 8–9 — IRGN0.
    #[bits(2)]
    pub irgn0: u8,
    /// Bits 10–11 — ORGN0.
    #[bits(2)]
    pub orgn0: u8,
    /// Bits 12–13 — SH0.
    #[bits(2)]
    pub sh0: u8,
    /// Bits 14–15 — TG0.
    #[bits(2)]
    pub tg0: u8,
    /// Bits 16–21 — T1SZ.
    #[bits(6)]
    pub t1sz: u8,
    /// Bit 22 — A1: the ASID comes from TTBR1.
    pub a1: bool,
    /// Bit 23 — EPD1.
    pub epd1: bool,
    /// Bits 24–25 — IRGN1.
    #[bits(2)]
    pub irgn1: u8,
    /// Bits 26–27 — ORGN1.
    #[bits(2)]
    pub orgn1: u8,
    /// Bits 28–29 — SH1.
    #[bits(2)]
    pub sh1: u8,
    /// Bits 30–31 — TG1.
    #[bits(2)]
    pub tg1: u8,
    /// Bits 32–34 — IPS: intermediate physical address size.
    #[bits(3)]
    pub ips: u8,
    #[bits(1)]
    __reserved1: u8,
    /// Bit 36 — AS: 16-bit ASIDs.
    pub asid16: bool,
    /// Bit 37 — TBI0: top byte ignored in the lower half.
    pub tbi0: bool,
    /// Bit 38 — TBI1.
    pub tbi1: bool,
    #[bits(25)]
    __reserved2: u32,
}

impl Tcr {
    /// 48-bit halves with 4 KiB granules, write-back inner shareable walks
    /// and 16-bit ASIDs. `pa_range` is `ID_AA64MMFR0_EL1.PARange`.
    #[must_use]
    pub const fn for_kernel(pa_range: u8) -> Self {
        Self::new()
            .with_t0sz(VA_48_BITS)
            .with_irgn0(WALK_WRITE_BACK)
            .with_orgn0(WALK_WRITE_BACK)
            .with_sh0(WALK_INNER_SHAREABLE)
            .with_tg0(TG0_4K)
            .with_t1sz(VA_48_BITS)
            .with_irgn1(WALK_WRITE_BACK)
            .with_orgn1(WALK_WRITE_BACK)
            .with_sh1(WALK_INNER_SHAREABLE)
            .with_tg1(TG1_4K)
            .with_ips(pa_range & 0b111)
            .with_asid16(true)
    }
}

#[cfg(all(feature = "asm", target_arch = "aarch64", target_os = "none"))]
impl StoreRegisterUnsafe for Tcr {
    unsafe fn store_unsafe(self) {
        unsafe {
            core::arch::asm!("msr tcr_el1, {}", "isb", in(reg) self.into_bits(), options(nostack, preserves_flags));
        }
    }
}

/// AArch64 Memory Model Feature Register 0 (only the fields used here).
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct IdAa64Mmfr0 {
    /// Bits 0–3 — PARange: supported physical address size.
    #[bits(4)]
    pub pa_range: u8,
    #[bits(60)]
    __rest: u64,
}

#[cfg(all(feature = "asm", target_arch = "aarch64", target_os = "none"))]
impl LoadRegisterUnsafe for IdAa64Mmfr0 {
    unsafe fn load_unsafe() -> Self {
        let bits: u64;
        unsafe {
            core::arch::asm!("mrs {}, id_aa64mmfr0_el1", out(reg) bits, options(nomem, nostack, preserves_flags));
        }
        Self::from_bits(bits)
    }
}
