//! # Local TLB Maintenance
//!
//! Only the executing core is affected; no shootdown is attempted.

use kernel_memory_addresses::VirtualAddress;

/// Drop any cached translation for the page containing `va` on this core.
///
/// Needed after changing or removing a present entry, not after filling a
/// previously absent one. On hosted builds this is a no-op.
///
/// # Safety
/// Privileged instruction; must run in ring 0 / EL1.
#[inline]
#[allow(unused_variables)]
pub unsafe fn invalidate_page(va: VirtualAddress) {
    #[cfg(all(feature = "asm", target_arch = "x86_64", target_os = "none"))]
    unsafe {
        core::arch::asm!("invlpg [{}]", in(reg) va.as_u64(), options(nostack, preserves_flags));
    }

    #[cfg(all(feature = "asm", target_arch = "aarch64", target_os = "none"))]
    unsafe {
        // TLBI VAALE1 takes VA[55:12] in bits 43:0; "all ASIDs, last level".
        let operand = (va.as_u64() >> 12) & 0x0000_0FFF_FFFF_FFFF;
        core::arch::asm!(
            "dsb ishst",
            "tlbi vaale1, {}",
            "dsb nsh",
            "isb",
            in(reg) operand,
            options(nostack, preserves_flags)
        );
    }
}
