//! # Memory Layout

/// Size of a single physical frame and of the smallest page mapping.
pub const PAGE_SIZE: u64 = 4096;

/// The smallest amount of usable RAM the kernel agrees to boot with, in MiB.
///
/// Pageframe initialization aborts below this threshold.
pub const MIN_USABLE_MEMORY_MIB: u64 = 512;

/// Watermark (and capacity) of the boot processor's translation cache.
pub const DCACHE_WATERMARK: usize = 8;

/// Smallest accepted translation cache capacity.
pub const DCACHE_MIN_CAPACITY: usize = 8;

/// Largest accepted translation cache capacity.
pub const DCACHE_MAX_CAPACITY: usize = 32;

/// A simple Higher Half Direct Map (HHDM) base.
/// Anything you map at [`HHDM_BASE`] + `pa` lets the kernel
/// access physical memory via a fixed offset.
pub const HHDM_BASE: u64 = 0xffff_8880_0000_0000;

const _: () = {
    assert!(PAGE_SIZE.is_power_of_two());
    assert!(DCACHE_MIN_CAPACITY.is_power_of_two());
    assert!(DCACHE_MAX_CAPACITY.is_power_of_two());
    assert!(DCACHE_MIN_CAPACITY <= DCACHE_WATERMARK);
    assert!(DCACHE_WATERMARK <= DCACHE_MAX_CAPACITY);
    assert!(HHDM_BASE & (1 << 63) != 0, "HHDM must live in the upper half");
};
