//! # Virtual and Physical Memory Address Types
//!
//! Strongly typed wrappers for raw addresses and the runtime page-size
//! vocabulary shared by the pageframe allocator, the page-table walkers and
//! the translation cache.
//!
//! | Type                | Meaning                                                     |
//! |---------------------|-------------------------------------------------------------|
//! | [`PhysicalAddress`] | A physical (RAM / MMIO) byte address.                        |
//! | [`VirtualAddress`]  | A virtual, page-table translated byte address.               |
//! | [`PageSize`]        | 4 KiB, 2 MiB, 1 GiB or the "any" wildcard used by lookups.   |
//!
//! Both address types are `#[repr(transparent)]` over `u64`, so they are free
//! to pass around and can be stored directly in page-table words and cache
//! slots.
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! let va = VirtualAddress::new(0xFFFF_8000_0020_1234);
//! assert_eq!(va.align_down(PageSize::Size2M).as_u64(), 0xFFFF_8000_0020_0000);
//! assert_eq!(va.align_up(PageSize::Size4K).as_u64(), 0xFFFF_8000_0020_2000);
//! assert_eq!(va.page_offset(), 0x234);
//!
//! let pa = PhysicalAddress::from_page_number(0x42);
//! assert_eq!(pa.as_u64(), 0x42_000);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

mod page_size;
mod physical_address;
mod virtual_address;

pub use page_size::{PageSize, UnknownGranule};
pub use physical_address::PhysicalAddress;
pub use virtual_address::VirtualAddress;

/// `log2` of the base granule.
pub const PAGE_SHIFT: u32 = 12;

/// Align `x` down to the nearest multiple of `a`.
///
/// ### Preconditions
/// - `a` must be **non-zero** and a **power of two**.
///
/// ### Examples
/// ```rust
/// # use kernel_memory_addresses::align_down;
/// assert_eq!(align_down(0x12345, 0x1000), 0x12000);
/// assert_eq!(align_down(0x2000, 0x1000), 0x2000);
/// ```
#[inline]
#[must_use]
pub const fn align_down(x: u64, a: u64) -> u64 {
    debug_assert!(a.is_power_of_two());
    x & !(a - 1)
}

/// Align `x` up to the nearest multiple of `a`.
///
/// The addition wraps, so aligning a value inside the last `a` bytes of the
/// 64-bit range yields `0`.
///
/// ### Examples
/// ```rust
/// # use kernel_memory_addresses::align_up;
/// assert_eq!(align_up(0x12345, 0x1000), 0x13000);
/// assert_eq!(align_up(0x2000, 0x1000), 0x2000);
/// assert_eq!(align_up(u64::MAX, 0x1000), 0);
/// ```
#[inline]
#[must_use]
pub const fn align_up(x: u64, a: u64) -> u64 {
    debug_assert!(a.is_power_of_two());
    x.wrapping_add(a - 1) & !(a - 1)
}
