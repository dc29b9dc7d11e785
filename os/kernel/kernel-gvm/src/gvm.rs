use crate::GvmError;
use crate::dcache::DcacheError;
use crate::pagemap::Pagemap;
use kernel_info::memory::DCACHE_WATERMARK;
use kernel_memory_addresses::{PageSize, PhysicalAddress, VirtualAddress};
use kernel_pmap::{LEAF_LEVEL, MapFlags, PageTableWalker, PmapError, TranslationTable};
use log::{info, trace, warn};

/// Architecture-neutral virtual memory front end.
///
/// Routes every request through the translation cache of the target
/// [`Pagemap`] before falling back to the page-table walk of `W`.
pub struct Gvm<W> {
    walker: W,
}

impl<W: PageTableWalker> Gvm<W> {
    #[must_use]
    pub const fn new(walker: W) -> Self {
        Self { walker }
    }

    #[inline]
    #[must_use]
    pub const fn walker(&self) -> &W {
        &self.walker
    }

    /// Adopt `root` as the boot processor's address space and configure the
    /// MMU for it where the architecture needs that.
    ///
    /// # Errors
    /// Propagates dcache initialization failures.
    ///
    /// # Safety
    /// Must run once, on the boot processor in kernel mode, before `root` is
    /// loaded.
    pub unsafe fn init_bsp(&self, root: W::Root) -> Result<Pagemap<W::Root>, GvmError> {
        let pagemap = Pagemap::with_dcache(root, DCACHE_WATERMARK)?;
        unsafe { W::init_translation_regime() };
        info!("GVM page system is up");
        Ok(pagemap)
    }

    /// A fresh, empty address space.
    ///
    /// # Errors
    /// [`PmapError::OutOfMemory`] if the root table(s) cannot be allocated.
    pub fn new_pagemap(&self) -> Result<Pagemap<W::Root>, GvmError> {
        let root = self.walker.new_root()?;
        Ok(Pagemap::with_dcache(root, DCACHE_WATERMARK)?)
    }

    /// Locate the table that maps `va` at `size` in `pagemap`.
    ///
    /// 4 KiB and unspecified-size requests consult the dcache first; a hit
    /// is answered without touching the tables. Fresh 4 KiB results are
    /// cached. Huge-page results never are. A result the cache cannot take
    /// is still returned.
    ///
    /// # Errors
    /// Walk failures as [`GvmError::Pmap`]; an uninitialized dcache as
    /// [`GvmError::Dcache`].
    pub fn get_translation(
        &self,
        pagemap: &Pagemap<W::Root>,
        va: VirtualAddress,
        size: PageSize,
        allocate: bool,
    ) -> Result<TranslationTable, GvmError> {
        let key = va.align_up(PageSize::Size4K);
        let cacheable = matches!(size, PageSize::Size4K | PageSize::Any) && key.page_number() != 0;

        if cacheable && let Some(table) = pagemap.dcache().lookup(key)? {
            trace!("gvm: dcache hit {key} → {table}");
            return Ok(TranslationTable::new(table, PageSize::Size4K, LEAF_LEVEL));
        }

        let tt = self.walker.walk(&pagemap.root(), va, size, allocate)?;
        if cacheable && tt.size == PageSize::Size4K {
            match pagemap.dcache().insert(key, tt.pa) {
                Ok(()) => {}
                Err(err @ (DcacheError::OutOfMemory | DcacheError::Rejected)) => {
                    warn!("gvm: could not cache {key} → {}: {err}", tt.pa);
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(tt)
    }

    /// Map the page at `va` to `pa`.
    ///
    /// The page size follows the huge flags in `flags`. Missing tables are
    /// allocated. Replacing a present mapping invalidates its TLB entry.
    ///
    /// # Errors
    /// - [`GvmError::MisalignedPhysical`] if `pa` is not aligned to the size.
    /// - Walk failures as in [`get_translation`](Self::get_translation).
    pub fn map_page(
        &self,
        pagemap: &Pagemap<W::Root>,
        va: VirtualAddress,
        pa: PhysicalAddress,
        flags: MapFlags,
    ) -> Result<TranslationTable, GvmError> {
        let size = flags.page_size();
        if !pa.is_aligned(size) {
            return Err(GvmError::MisalignedPhysical(pa, size));
        }
        let va = va.align_up(size);
        let tt = self.get_translation(pagemap, va, size, true)?;
        if self.walker.set_leaf(&tt, va, pa, flags) {
            W::invalidate_page(va);
        }
        trace!("gvm: mapped {va} → {pa} ({size})");
        Ok(tt)
    }

    /// Physical address backing `va`, if it is mapped.
    ///
    /// # Errors
    /// Walk failures other than a missing table.
    pub fn translate(
        &self,
        pagemap: &Pagemap<W::Root>,
        va: VirtualAddress,
    ) -> Result<Option<PhysicalAddress>, GvmError> {
        let page = va.align_down(PageSize::Size4K);
        let tt = match self.get_translation(pagemap, page, PageSize::Any, false) {
            Ok(tt) => tt,
            Err(GvmError::Pmap(PmapError::NoLevel { .. })) => return Ok(None),
            Err(err) => return Err(err),
        };
        let offset = va.as_u64() & (tt.size.bytes() - 1);
        Ok(self
            .walker
            .leaf_address(&tt, page)
            .map(|base| base + offset))
    }

    /// Raw leaf bits `W` would write for `flags`.
    #[inline]
    #[must_use]
    pub fn pte_flags(flags: MapFlags) -> u64 {
        W::pte_flags(flags)
    }
}
