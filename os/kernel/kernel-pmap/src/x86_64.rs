//! # x86-64 4-Level Paging
//!
//! ```text
//!  CR3 → PML4 → PDPT → PD → PT → 4 KiB page
//!                │      │
//!                │      └─ PS=1 → 2 MiB page
//!                └──────── PS=1 → 1 GiB page
//! ```
//!
//! Huge leaves are flagged with `PS` (bit 7). In a PT entry that bit is the
//! PAT selector, so PT entries are always leaves regardless of its value.

mod entry;

pub use entry::{ADDRESS_MASK, PageEntryBits};

use crate::walk::{self, EntryKind, PagingFormat};
use crate::{FrameAlloc, MapFlags, PageTableWalker, PhysMapper, PmapError, TranslationTable};
use kernel_memory_addresses::{PageSize, PhysicalAddress, VirtualAddress};
use kernel_registers::cr3::Cr3;

/// Read the live `CR3`.
///
/// # Safety
/// Must run in ring 0.
#[cfg(all(feature = "asm", target_arch = "x86_64", target_os = "none"))]
#[must_use]
pub unsafe fn current_root() -> Cr3 {
    use kernel_registers::LoadRegisterUnsafe;
    unsafe { Cr3::load_unsafe() }
}

struct X86_64;

impl PagingFormat for X86_64 {
    const NAME: &'static str = "x86_64";

    fn classify(raw: u64, level: u8) -> EntryKind {
        let entry = PageEntryBits::from_bits(raw);
        if !entry.present() {
            return EntryKind::Absent;
        }
        if level == crate::LEAF_LEVEL {
            return EntryKind::Leaf(entry.physical_address());
        }
        if entry.large_page() {
            // Bit 12 of a huge leaf is PAT; the base is aligned to the leaf size.
            let size = PageSize::for_level(level).unwrap_or(PageSize::Size4K);
            EntryKind::Leaf(entry.physical_address().align_down(size))
        } else {
            EntryKind::Table(entry.physical_address())
        }
    }

    fn table_entry(next: PhysicalAddress) -> u64 {
        PageEntryBits::next_table(next).into_bits()
    }
}

/// Page-table walker for x86-64 4-level paging.
pub struct X86_64Walker<'a, M: ?Sized, A: ?Sized> {
    mapper: &'a M,
    frames: &'a A,
}

impl<'a, M: PhysMapper + ?Sized, A: FrameAlloc + ?Sized> X86_64Walker<'a, M, A> {
    pub const fn new(mapper: &'a M, frames: &'a A) -> Self {
        Self { mapper, frames }
    }
}

impl<M: PhysMapper + ?Sized, A: FrameAlloc + ?Sized> PageTableWalker for X86_64Walker<'_, M, A> {
    type Root = Cr3;

    fn walk(
        &self,
        root: &Cr3,
        va: VirtualAddress,
        size: PageSize,
        allocate: bool,
    ) -> Result<TranslationTable, PmapError> {
        walk::walk::<X86_64, _, _>(self.mapper, self.frames, root.pml4_phys(), va, size, allocate)
    }

    fn pte_flags(flags: MapFlags) -> u64 {
        PageEntryBits::new()
            .with_present(true)
            .with_accessed(true)
            .with_writable(flags.contains(MapFlags::WRITABLE))
            .with_no_execute(!flags.contains(MapFlags::EXECUTABLE))
            .with_global_translation(flags.contains(MapFlags::GLOBAL))
            .with_user_access(flags.contains(MapFlags::USER))
            .with_large_page(flags.is_huge())
            .into_bits()
    }

    fn new_root(&self) -> Result<Cr3, PmapError> {
        walk::new_table(self.mapper, self.frames).map(Cr3::from_pml4_phys)
    }

    fn set_leaf(
        &self,
        table: &TranslationTable,
        va: VirtualAddress,
        pa: PhysicalAddress,
        flags: MapFlags,
    ) -> bool {
        let raw = (pa.as_u64() & ADDRESS_MASK) | Self::pte_flags(flags);
        walk::write_leaf::<X86_64, _>(self.mapper, table, va, raw)
    }

    fn leaf_address(&self, table: &TranslationTable, va: VirtualAddress) -> Option<PhysicalAddress> {
        walk::read_leaf::<X86_64, _>(self.mapper, table, va)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{TestFrames, TestPhys};

    const PS: u64 = 1 << 7;

    fn setup(frames: usize) -> (TestPhys, TestFrames) {
        let phys = TestPhys::new(0x10_0000, frames);
        let alloc = TestFrames::new(phys.base(), phys.end());
        (phys, alloc)
    }

    /// Installs a raw entry at (`table`, `index`).
    fn poke(phys: &TestPhys, table: PhysicalAddress, index: usize, raw: u64) {
        unsafe { phys.phys_to_mut::<crate::RawTable>(table) }.set(index, raw);
    }

    #[test]
    fn allocating_walk_builds_three_tables() {
        let (phys, frames) = setup(16);
        let walker = X86_64Walker::new(&phys, &frames);
        let root = walker.new_root().unwrap();

        let va = VirtualAddress::new(0xFFFF_8000_0000_1000);
        let tt = walker.walk(&root, va, PageSize::Size4K, true).unwrap();
        assert_eq!(tt.size, PageSize::Size4K);
        assert_eq!(tt.level, 3);
        assert_eq!(frames.allocated(), 4);

        let pml4e = PageEntryBits::from_bits(phys.read_u64(root.pml4_phys(), 256));
        assert!(pml4e.present() && pml4e.writable() && pml4e.user_access());
    }

    #[test]
    fn missing_level_without_allocation() {
        let (phys, frames) = setup(4);
        let walker = X86_64Walker::new(&phys, &frames);
        let root = walker.new_root().unwrap();
        let err = walker
            .walk(&root, VirtualAddress::new(0x4000_0000), PageSize::Size4K, false)
            .unwrap_err();
        assert_eq!(err, PmapError::NoLevel { level: 0 });
    }

    #[test]
    fn out_of_memory_is_reported_at_the_first_level() {
        let (phys, frames) = setup(1);
        let walker = X86_64Walker::new(&phys, &frames);
        let root = walker.new_root().unwrap();
        let err = walker
            .walk(&root, VirtualAddress::new(0x1000), PageSize::Size4K, true)
            .unwrap_err();
        assert_eq!(err, PmapError::OutOfMemory);
    }

    #[test]
    fn two_mib_leaf_mismatches_a_4k_request() {
        let (phys, frames) = setup(8);
        let walker = X86_64Walker::new(&phys, &frames);
        let root = walker.new_root().unwrap();
        let va = VirtualAddress::new(0x4000_0000);

        let pd = walker.walk(&root, va, PageSize::Size2M, true).unwrap();
        assert_eq!((pd.size, pd.level), (PageSize::Size2M, 2));
        poke(&phys, pd.pa, pd.index_of(va), 0x20_0000 | PS | 1);

        assert_eq!(
            walker.walk(&root, va, PageSize::Size4K, false),
            Err(PmapError::UnmatchedSize(PageSize::Size2M))
        );
        assert_eq!(
            walker.walk(&root, va, PageSize::Size4K, true),
            Err(PmapError::UnmatchedSize(PageSize::Size2M))
        );
        assert_eq!(walker.walk(&root, va, PageSize::Any, false), Ok(pd));
        assert_eq!(walker.walk(&root, va, PageSize::Size2M, false), Ok(pd));
    }

    #[test]
    fn one_gib_leaf_follows_the_same_rules() {
        let (phys, frames) = setup(8);
        let walker = X86_64Walker::new(&phys, &frames);
        let root = walker.new_root().unwrap();
        let va = VirtualAddress::new(0x8000_0000);

        let pdpt = walker.walk(&root, va, PageSize::Size1G, true).unwrap();
        assert_eq!((pdpt.size, pdpt.level), (PageSize::Size1G, 1));
        poke(&phys, pdpt.pa, pdpt.index_of(va), 0x4000_0000 | PS | 1);

        assert_eq!(
            walker.walk(&root, va, PageSize::Size2M, false),
            Err(PmapError::UnmatchedSize(PageSize::Size1G))
        );
        assert_eq!(walker.walk(&root, va, PageSize::Any, false), Ok(pdpt));
        assert_eq!(
            walker.leaf_address(&pdpt, va),
            Some(PhysicalAddress::new(0x4000_0000))
        );
    }

    #[test]
    fn huge_request_over_existing_table_is_a_mismatch() {
        let (phys, frames) = setup(8);
        let walker = X86_64Walker::new(&phys, &frames);
        let root = walker.new_root().unwrap();
        let va = VirtualAddress::new(0x60_0000);

        walker.walk(&root, va, PageSize::Size4K, true).unwrap();
        assert_eq!(
            walker.walk(&root, va, PageSize::Size2M, false),
            Err(PmapError::UnmatchedSize(PageSize::Size4K))
        );
    }

    #[test]
    fn leaf_in_pml4_is_unimplemented() {
        let (phys, frames) = setup(2);
        let walker = X86_64Walker::new(&phys, &frames);
        let root = walker.new_root().unwrap();
        poke(&phys, root.pml4_phys(), 0, PS | 1);
        assert_eq!(
            walker.walk(&root, VirtualAddress::new(0x1000), PageSize::Any, false),
            Err(PmapError::UnimplementedSize)
        );
    }

    #[test]
    fn address_is_rounded_up_to_the_granule() {
        let (phys, frames) = setup(8);
        let walker = X86_64Walker::new(&phys, &frames);
        let root = walker.new_root().unwrap();

        // 0x3FFF_F001 rounds up into the next GiB, i.e. the next PD.
        let tt = walker
            .walk(&root, VirtualAddress::new(0x3FFF_F001), PageSize::Size4K, true)
            .unwrap();
        assert_eq!(
            walker.walk(&root, VirtualAddress::new(0x4000_0000), PageSize::Size4K, false),
            Ok(tt)
        );
        assert_eq!(
            walker.walk(&root, VirtualAddress::new(0x3FFF_E000), PageSize::Size4K, false),
            Err(PmapError::NoLevel { level: 1 })
        );
    }

    #[test]
    fn repeated_walks_are_idempotent() {
        let (phys, frames) = setup(8);
        let walker = X86_64Walker::new(&phys, &frames);
        let root = walker.new_root().unwrap();
        let va = VirtualAddress::new(0x7FFF_FFFF_F000);

        let built = walker.walk(&root, va, PageSize::Size4K, true).unwrap();
        let used = frames.allocated();
        let first = walker.walk(&root, va, PageSize::Size4K, false).unwrap();
        let second = walker.walk(&root, va, PageSize::Size4K, false).unwrap();
        assert_eq!(built, first);
        assert_eq!(first, second);
        assert_eq!(frames.allocated(), used);
    }

    #[test]
    fn pte_flags_default_to_read_only_no_execute() {
        let raw = X86_64Walker::<TestPhys, TestFrames>::pte_flags(MapFlags::PRESENT);
        let e = PageEntryBits::from_bits(raw);
        assert!(e.present() && e.accessed() && e.no_execute());
        assert!(!e.writable() && !e.user_access() && !e.global_translation() && !e.large_page());
    }

    #[test]
    fn pte_flags_encode_every_request() {
        let flags = MapFlags::WRITABLE
            | MapFlags::EXECUTABLE
            | MapFlags::GLOBAL
            | MapFlags::USER
            | MapFlags::HUGE_2M;
        let raw = X86_64Walker::<TestPhys, TestFrames>::pte_flags(flags);
        assert_eq!(raw, 0b1_1010_0111);
    }

    #[test]
    fn set_leaf_reports_replacement() {
        let (phys, frames) = setup(8);
        let walker = X86_64Walker::new(&phys, &frames);
        let root = walker.new_root().unwrap();
        let va = VirtualAddress::new(0x40_3000);
        let tt = walker.walk(&root, va, PageSize::Size4K, true).unwrap();

        assert!(!walker.set_leaf(&tt, va, PhysicalAddress::new(0x9000), MapFlags::WRITABLE));
        assert_eq!(walker.leaf_address(&tt, va), Some(PhysicalAddress::new(0x9000)));
        assert!(walker.set_leaf(&tt, va, PhysicalAddress::new(0xA000), MapFlags::empty()));
        assert_eq!(walker.leaf_address(&tt, va), Some(PhysicalAddress::new(0xA000)));
    }
}
