//! # MAIR_EL1
//!
//! Eight memory attribute encodings. Descriptors pick one through their
//! `AttrIndx` field.

#[cfg(all(feature = "asm", target_arch = "aarch64", target_os = "none"))]
use crate::{LoadRegisterUnsafe, StoreRegisterUnsafe};
use bitfield_struct::bitfield;

/// Normal memory, inner and outer write-back, read/write allocate.
pub const NORMAL_WRITE_BACK: u8 = 0xFF;
/// Device-nGnRnE.
pub const DEVICE_NGNRNE: u8 = 0x00;
/// Device-nGnRE.
pub const DEVICE_NGNRE: u8 = 0x04;
/// Device-GRE.
pub const DEVICE_GRE: u8 = 0x0C;

/// `AttrIndx` of ordinary kernel and user memory.
pub const ATTR_NORMAL: u8 = 0;
/// `AttrIndx` of the framebuffer.
pub const ATTR_FRAMEBUFFER: u8 = 1;
/// `AttrIndx` of strongly ordered device memory.
pub const ATTR_DEVICE: u8 = 2;
/// `AttrIndx` of uncached device memory with early write acknowledgement.
pub const ATTR_UNCACHED: u8 = 3;

/// Memory Attribute Indirection Register.
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct Mair {
    pub attr0: u8,
    pub attr1: u8,
    pub attr2: u8,
    pub attr3: u8,
    pub attr4: u8,
    pub attr5: u8,
    pub attr6: u8,
    pub attr7: u8,
}

impl Mair {
    /// The kernel's attribute table.
    ///
    /// `framebuffer` is whatever firmware left in slot 1. Firmware that maps
    /// it as cacheable normal memory is overridden with Device-GRE.
    #[must_use]
    pub const fn for_kernel(framebuffer: u8) -> Self {
        let framebuffer = if framebuffer == NORMAL_WRITE_BACK {
            DEVICE_GRE
        } else {
            framebuffer
        };
        Self::new()
            .with_attr0(NORMAL_WRITE_BACK)
            .with_attr1(framebuffer)
            .with_attr2(DEVICE_NGNRNE)
            .with_attr3(DEVICE_NGNRE)
    }
}

#[cfg(all(feature = "asm", target_arch = "aarch64", target_os = "none"))]
impl LoadRegisterUnsafe for Mair {
    unsafe fn load_unsafe() -> Self {
        let bits: u64;
        unsafe {
            core::arch::asm!("mrs {}, mair_el1", out(reg) bits, options(nomem, nostack, preserves_flags));
        }
        Self::from_bits(bits)
    }
}

#[cfg(all(feature = "asm", target_arch = "aarch64", target_os = "none"))]
impl StoreRegisterUnsafe for Mair {
    unsafe fn store_unsafe(self) {
        unsafe {
            core::arch::asm!("msr mair_el1, {}", "isb", in(reg) self.into_bits(), options(nostack, preserves_flags));
        }
    }
}
