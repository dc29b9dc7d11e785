//! # HHDM-based PhysMapper
//!
//! With a higher half direct map every physical address `pa` is visible at
//! `offset + pa`. The offset is fixed for the lifetime of the kernel.

use kernel_info::memory::HHDM_BASE;
use kernel_memory_addresses::PhysicalAddress;
use kernel_pmap::PhysMapper;

/// [`PhysMapper`] for kernels with a higher half direct map.
///
/// # Safety
/// The direct map must cover every physical address passed in.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HhdmPhysMapper {
    offset: u64,
}

impl HhdmPhysMapper {
    /// A mapper for a direct map starting at `offset`, e.g. the value the
    /// bootloader reports.
    #[must_use]
    pub const fn new(offset: u64) -> Self {
        Self { offset }
    }

    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// Virtual address of `pa` inside the direct map.
    #[must_use]
    pub const fn virt(&self, pa: PhysicalAddress) -> u64 {
        self.offset.wrapping_add(pa.as_u64())
    }
}

impl Default for HhdmPhysMapper {
    fn default() -> Self {
        Self::new(HHDM_BASE)
    }
}

impl PhysMapper for HhdmPhysMapper {
    #[allow(clippy::cast_possible_truncation)]
    unsafe fn phys_to_ptr(&self, pa: PhysicalAddress) -> *mut u8 {
        core::ptr::with_exposed_provenance_mut(self.virt(pa) as usize)
    }
}
