//! # AArch64 4-Level Translation (4 KiB granule)
//!
//! Two roots split the address space: `TTBR0_EL1` translates the lower half,
//! `TTBR1_EL1` the upper half. Bit 63 of the virtual address picks the root.
//!
//! ```text
//!  TTBRx → L0 → L1 → L2 → L3 → 4 KiB page
//!               │     │
//!               │     └─ block → 2 MiB
//!               └─────── block → 1 GiB
//! ```
//!
//! L0 blocks (512 GiB) do not exist with this granule and are reported as
//! [`PmapError::UnimplementedSize`].

mod descriptor;

pub use descriptor::{ADDRESS_MASK, Descriptor, SHAREABILITY_INNER};

use crate::walk::{self, EntryKind, PagingFormat};
use crate::{FrameAlloc, LEAF_LEVEL, MapFlags, PageTableWalker, PhysMapper, PmapError, TranslationTable};
use kernel_memory_addresses::{PageSize, PhysicalAddress, VirtualAddress};
use kernel_registers::mair::ATTR_NORMAL;
use kernel_registers::ttbr::Ttbr;

/// Root registers of one AArch64 address space.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TtbrPair {
    /// `TTBR0_EL1`, lower half (user).
    pub lower: Ttbr,
    /// `TTBR1_EL1`, upper half (kernel).
    pub upper: Ttbr,
}

impl TtbrPair {
    /// The root that translates `va`.
    #[must_use]
    pub const fn select(&self, va: VirtualAddress) -> &Ttbr {
        if va.is_upper_half() { &self.upper } else { &self.lower }
    }

    /// Read the live `TTBR0_EL1` / `TTBR1_EL1`.
    ///
    /// # Safety
    /// Must run at EL1.
    #[cfg(all(feature = "asm", target_arch = "aarch64", target_os = "none"))]
    #[must_use]
    pub unsafe fn current() -> Self {
        use kernel_registers::LoadRegisterUnsafe;
        use kernel_registers::ttbr::{Ttbr0El1, Ttbr1El1};
        unsafe {
            Self {
                lower: Ttbr0El1::load_unsafe().0,
                upper: Ttbr1El1::load_unsafe().0,
            }
        }
    }
}

struct Aarch64;

impl PagingFormat for Aarch64 {
    const NAME: &'static str = "aarch64";

    fn classify(raw: u64, level: u8) -> EntryKind {
        let d = Descriptor::from_bits(raw);
        if !d.valid() {
            return EntryKind::Absent;
        }
        match (level, d.table_or_page()) {
            (LEAF_LEVEL, true) => EntryKind::Leaf(d.output_address()),
            // Reserved encoding at L3; the MMU treats it as a fault.
            (LEAF_LEVEL, false) => EntryKind::Absent,
            (_, true) => EntryKind::Table(d.output_address()),
            (_, false) => {
                let size = PageSize::for_level(level).unwrap_or(PageSize::Size4K);
                EntryKind::Leaf(d.output_address().align_down(size))
            }
        }
    }

    fn table_entry(next: PhysicalAddress) -> u64 {
        Descriptor::next_table(next).into_bits()
    }
}

/// Page-table walker for AArch64 with the 4 KiB granule.
pub struct Aarch64Walker<'a, M: ?Sized, A: ?Sized> {
    mapper: &'a M,
    frames: &'a A,
}

impl<'a, M: PhysMapper + ?Sized, A: FrameAlloc + ?Sized> Aarch64Walker<'a, M, A> {
    pub const fn new(mapper: &'a M, frames: &'a A) -> Self {
        Self { mapper, frames }
    }
}

impl<M: PhysMapper + ?Sized, A: FrameAlloc + ?Sized> PageTableWalker for Aarch64Walker<'_, M, A> {
    type Root = TtbrPair;

    fn walk(
        &self,
        root: &TtbrPair,
        va: VirtualAddress,
        size: PageSize,
        allocate: bool,
    ) -> Result<TranslationTable, PmapError> {
        // The walk rounds `va` up; pick the half the rounded address is in.
        let base = root.select(va.align_up(size)).table_phys();
        walk::walk::<Aarch64, _, _>(self.mapper, self.frames, base, va, size, allocate)
    }

    fn pte_flags(flags: MapFlags) -> u64 {
        Descriptor::new()
            .with_valid(true)
            .with_attr_index(ATTR_NORMAL)
            .with_access_flag(true)
            .with_shareability(SHAREABILITY_INNER)
            .with_table_or_page(!flags.is_huge())
            .with_ap_read_only(!flags.contains(MapFlags::WRITABLE))
            .with_privileged_execute_never(!flags.contains(MapFlags::EXECUTABLE))
            .with_user_execute_never(!flags.contains(MapFlags::EXECUTABLE))
            .with_not_global(!flags.contains(MapFlags::GLOBAL))
            .with_ap_user(flags.contains(MapFlags::USER))
            .into_bits()
    }

    /// Allocates both L0 tables. If the second allocation fails the first
    /// frame is handed back.
    fn new_root(&self) -> Result<TtbrPair, PmapError> {
        let lower = walk::new_table(self.mapper, self.frames)?;
        let upper = walk::new_table(self.mapper, self.frames).inspect_err(|_| {
            self.frames.free_4k(lower);
        })?;
        Ok(TtbrPair {
            lower: Ttbr::from_table_phys(lower, 0),
            upper: Ttbr::from_table_phys(upper, 0),
        })
    }

    fn set_leaf(
        &self,
        table: &TranslationTable,
        va: VirtualAddress,
        pa: PhysicalAddress,
        flags: MapFlags,
    ) -> bool {
        let raw = (pa.as_u64() & ADDRESS_MASK) | Self::pte_flags(flags);
        walk::write_leaf::<Aarch64, _>(self.mapper, table, va, raw)
    }

    fn leaf_address(&self, table: &TranslationTable, va: VirtualAddress) -> Option<PhysicalAddress> {
        walk::read_leaf::<Aarch64, _>(self.mapper, table, va)
    }

    unsafe fn init_translation_regime() {
        #[cfg(all(feature = "asm", target_arch = "aarch64", target_os = "none"))]
        unsafe {
            program_translation_regime();
        }
    }
}

/// Load the kernel's `MAIR_EL1` and `TCR_EL1`.
///
/// The framebuffer attribute firmware configured is carried over and the
/// output address size follows what the CPU reports.
///
/// # Safety
/// Must run at EL1 before the first `TTBRx_EL1` built by this crate is used.
#[cfg(all(feature = "asm", target_arch = "aarch64", target_os = "none"))]
pub unsafe fn program_translation_regime() {
    use kernel_registers::mair::Mair;
    use kernel_registers::tcr::{IdAa64Mmfr0, Tcr};
    use kernel_registers::{LoadRegisterUnsafe, StoreRegisterUnsafe};
    unsafe {
        let firmware = Mair::load_unsafe();
        let pa_range = IdAa64Mmfr0::load_unsafe().pa_range();
        Mair::for_kernel(firmware.attr1()).store_unsafe();
        Tcr::for_kernel(pa_range).store_unsafe();
    }
}
