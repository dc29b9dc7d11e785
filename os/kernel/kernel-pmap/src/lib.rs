//! # Architecture Page-Table Walkers
//!
//! One contract, [`PageTableWalker`], with an implementation per supported
//! MMU:
//!
//! - [`X86_64Walker`](x86_64::X86_64Walker): 4-level paging rooted in `CR3`.
//! - [`Aarch64Walker`](aarch64::Aarch64Walker): 4-level, 4 KiB granule
//!   translation rooted in `TTBR0_EL1` (lower half) and `TTBR1_EL1` (upper half).
//!
//! Both trees have the same shape. A 48-bit virtual address splits into four
//! 9-bit table indices and a 12-bit page offset:
//!
//! ```text
//! | 47‒39 | 38‒30 | 29‒21 | 20‒12 | 11‒0   |
//! |  L0   |  L1   |  L2   |  L3   | Offset |
//! ```
//!
//! | Level | x86-64 name | AArch64 name | Leaf maps        |
//! |:------|:------------|:-------------|:-----------------|
//! | 0     | PML4        | L0           | never            |
//! | 1     | PDPT        | L1           | 1 GiB (`PS` / block) |
//! | 2     | PD          | L2           | 2 MiB (`PS` / block) |
//! | 3     | PT          | L3           | 4 KiB            |
//!
//! What differs is the entry encoding: x86-64 marks a huge leaf with the `PS`
//! bit, AArch64 marks a *table* with descriptor bit 1 and a block by its
//! absence. Permission polarity differs too (`RW` vs. `AP[2]` read-only). Those
//! details live in the per-architecture modules; the walk itself is shared.
//!
//! ## Walk result
//!
//! A walk returns a [`TranslationTable`]: the physical address of the table
//! whose entry maps the address, the page size that entry maps and its level.
//! Missing intermediate tables are either reported ([`PmapError::NoLevel`])
//! or allocated from a [`FrameAlloc`], zeroed and linked in.
//!
//! ## Physical memory access
//!
//! Tables are physical frames. The walker reaches them through a
//! [`PhysMapper`], which is the only place physical addresses turn into
//! pointers.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

#[cfg(any(test, feature = "test-support"))]
extern crate alloc;

pub mod aarch64;
mod descriptor;
mod error;
mod flags;
mod phys;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
mod walk;
pub mod x86_64;

pub use descriptor::TranslationTable;
pub use error::PmapError;
pub use flags::MapFlags;
pub use kernel_memory_addresses::{PageSize, PhysicalAddress, VirtualAddress};
pub use phys::{ENTRIES_PER_TABLE, FrameAlloc, PhysMapper, RawTable};

use core::fmt;

/// Deepest level of the radix tree (the 4 KiB page tables).
pub const LEAF_LEVEL: u8 = 3;

/// Index into the table at `level` (0 = root) selected by `va`.
///
/// ```rust
/// # use kernel_pmap::{table_index, VirtualAddress};
/// let va = VirtualAddress::new(0xFFFF_8000_4020_3000);
/// assert_eq!(table_index(0, va), 256);
/// assert_eq!(table_index(1, va), 1);
/// assert_eq!(table_index(2, va), 1);
/// assert_eq!(table_index(3, va), 3);
/// ```
#[inline]
#[must_use]
pub const fn table_index(level: u8, va: VirtualAddress) -> usize {
    debug_assert!(level <= LEAF_LEVEL);
    let shift = 12 + 9 * (LEAF_LEVEL - level) as u32;
    ((va.as_u64() >> shift) & 0x1FF) as usize
}

/// The architecture-neutral page-table walk contract.
///
/// Walkers are stateless apart from the borrowed physical mapper and frame
/// source. They do not lock: callers serialize concurrent mappers of one
/// address space.
pub trait PageTableWalker {
    /// The root register value(s) identifying an address space.
    type Root: Copy + fmt::Debug;

    /// Walk (or, with `allocate`, build) the tree down to the table that
    /// maps `va` at `size`.
    ///
    /// `va` is rounded up to the granule of `size` first.
    ///
    /// # Errors
    /// - [`PmapError::NoLevel`] if a table is missing and `allocate` is false.
    /// - [`PmapError::OutOfMemory`] if a missing table could not be allocated.
    /// - [`PmapError::UnmatchedSize`] if a mapping of a different size is in
    ///   the way; the payload is the size found.
    /// - [`PmapError::UnimplementedSize`] for a leaf in the root table.
    fn walk(
        &self,
        root: &Self::Root,
        va: VirtualAddress,
        size: PageSize,
        allocate: bool,
    ) -> Result<TranslationTable, PmapError>;

    /// Encode generic mapping intent as raw leaf entry bits.
    fn pte_flags(flags: MapFlags) -> u64;

    /// Table index of `va` at `level`.
    #[inline]
    fn table_index(level: u8, va: VirtualAddress) -> usize {
        table_index(level, va)
    }

    /// Allocate an empty root for a new address space.
    ///
    /// # Errors
    /// [`PmapError::OutOfMemory`] if no frame is available.
    fn new_root(&self) -> Result<Self::Root, PmapError>;

    /// Write a leaf for `pa` into the entry of `table` selected by `va`.
    ///
    /// Returns `true` if a present mapping was overwritten, in which case the
    /// caller owes a TLB invalidation.
    fn set_leaf(
        &self,
        table: &TranslationTable,
        va: VirtualAddress,
        pa: PhysicalAddress,
        flags: MapFlags,
    ) -> bool;

    /// Physical base of the page mapped by the entry of `table` selected by
    /// `va`, if that entry is a present leaf.
    fn leaf_address(&self, table: &TranslationTable, va: VirtualAddress)
    -> Option<PhysicalAddress>;

    /// One-time MMU configuration on the calling CPU, run before any root
    /// from this walker is loaded. Formats without such a step do nothing.
    ///
    /// # Safety
    /// Must run in kernel mode, before the CPU translates through tables
    /// built by this walker.
    #[inline]
    unsafe fn init_translation_regime() {}

    /// Drop the local TLB entry for `va`.
    #[inline]
    fn invalidate_page(va: VirtualAddress) {
        // Safety: walkers run in kernel mode; on hosted builds this is a no-op.
        unsafe { kernel_registers::tlb::invalidate_page(va) }
    }
}
