//! # Paging Control Registers
//!
//! Typed views of the registers that anchor a page-table tree, plus the
//! single-page local TLB invalidate used after an existing mapping changes.
//!
//! | Architecture | Root register(s)            | Type                          |
//! |--------------|-----------------------------|-------------------------------|
//! | x86-64       | `CR3`                       | [`Cr3`](cr3::Cr3)             |
//! | AArch64      | `TTBR0_EL1` / `TTBR1_EL1`   | [`Ttbr`](ttbr::Ttbr)          |
//!
//! AArch64 additionally needs its translation regime configured once per
//! CPU: [`Mair`](mair::Mair) and [`Tcr`](tcr::Tcr).
//!
//! Reading the live registers requires the `asm` feature and a bare-metal
//! target. Everything else is plain bit manipulation and works anywhere.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod cr3;
pub mod mair;
pub mod tcr;
pub mod tlb;
pub mod ttbr;

pub trait LoadRegisterUnsafe {
    /// # Safety
    /// The register access is privileged and must execute in kernel mode
    /// (ring 0 / EL1).
    unsafe fn load_unsafe() -> Self;
}

pub trait StoreRegisterUnsafe {
    /// # Safety
    /// The register access is privileged and must execute in kernel mode
    /// (ring 0 / EL1). Writing translation control changes how every later
    /// memory access is translated.
    unsafe fn store_unsafe(self);
}
