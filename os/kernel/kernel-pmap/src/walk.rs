//! Shared radix-tree walk. The architectures plug in their entry encoding
//! through [`PagingFormat`].

use crate::{FrameAlloc, LEAF_LEVEL, PhysMapper, PmapError, RawTable, TranslationTable, table_index};
use kernel_memory_addresses::{PageSize, PhysicalAddress, VirtualAddress};
use log::{debug, trace};

/// What a raw entry means at a given level.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EntryKind {
    Absent,
    /// Points at the next-level table.
    Table(PhysicalAddress),
    /// Maps memory directly; carries the mapped base address.
    Leaf(PhysicalAddress),
}

/// Entry encoding of one MMU.
pub trait PagingFormat {
    const NAME: &'static str;

    fn classify(raw: u64, level: u8) -> EntryKind;

    /// Raw entry linking to the (zeroed) table at `next`.
    fn table_entry(next: PhysicalAddress) -> u64;
}

/// Walk from `root` towards the table that maps `va` at `size`.
pub fn walk<F, M, A>(
    mapper: &M,
    frames: &A,
    root: PhysicalAddress,
    va: VirtualAddress,
    size: PageSize,
    allocate: bool,
) -> Result<TranslationTable, PmapError>
where
    F: PagingFormat,
    M: PhysMapper + ?Sized,
    A: FrameAlloc + ?Sized,
{
    let va = va.align_up(size);
    let target = size.level();
    trace!("{} walk {va} for {size} page (allocate: {allocate})", F::NAME);

    let mut table = root;
    let mut level = 0;
    loop {
        let index = table_index(level, va);
        // Safety: `table` is the root or was read from a present table entry,
        // so it names a translation table frame backed by the mapper.
        let entries = unsafe { mapper.phys_to_mut::<RawTable>(table) };
        let kind = F::classify(entries.get(index), level);

        if level == target {
            return match kind {
                // A finer-grained table sits where the caller wants a block.
                EntryKind::Table(_) => Err(PmapError::UnmatchedSize(
                    PageSize::for_level(level + 1).unwrap_or(PageSize::Size4K),
                )),
                EntryKind::Absent | EntryKind::Leaf(_) => Ok(TranslationTable::new(
                    table,
                    PageSize::for_level(level).unwrap_or(PageSize::Size4K),
                    level,
                )),
            };
        }

        table = match kind {
            EntryKind::Table(next) => next,
            EntryKind::Leaf(_) => {
                let Some(found) = PageSize::for_level(level) else {
                    return Err(PmapError::UnimplementedSize);
                };
                return if size.accepts(found) {
                    Ok(TranslationTable::new(table, found, level))
                } else {
                    Err(PmapError::UnmatchedSize(found))
                };
            }
            EntryKind::Absent if !allocate => return Err(PmapError::NoLevel { level }),
            EntryKind::Absent => {
                let next = frames.alloc_4k().ok_or(PmapError::OutOfMemory)?;
                // Safety: a freshly allocated frame is exclusively ours.
                unsafe { mapper.phys_to_mut::<RawTable>(next) }.zero();
                entries.set(index, F::table_entry(next));
                debug!("{}: new level {} table at {next} for {va}", F::NAME, level + 1);
                next
            }
        };
        level += 1;
        debug_assert!(level <= LEAF_LEVEL);
    }
}

/// Store `raw` in the entry of `table` selected by `va`; reports whether a
/// present entry was replaced.
pub fn write_leaf<F, M>(mapper: &M, table: &TranslationTable, va: VirtualAddress, raw: u64) -> bool
where
    F: PagingFormat,
    M: PhysMapper + ?Sized,
{
    // Safety: descriptors only ever name translation tables.
    let entries = unsafe { mapper.phys_to_mut::<RawTable>(table.pa) };
    let previous = entries.replace(table.index_of(va), raw);
    F::classify(previous, table.level) != EntryKind::Absent
}

/// Base address of the leaf in `table` selected by `va`.
pub fn read_leaf<F, M>(mapper: &M, table: &TranslationTable, va: VirtualAddress) -> Option<PhysicalAddress>
where
    F: PagingFormat,
    M: PhysMapper + ?Sized,
{
    // Safety: descriptors only ever name translation tables.
    let entries = unsafe { mapper.phys_to_mut::<RawTable>(table.pa) };
    match F::classify(entries.get(table.index_of(va)), table.level) {
        EntryKind::Leaf(pa) => Some(pa),
        EntryKind::Absent | EntryKind::Table(_) => None,
    }
}

/// Allocate and clear a root table.
pub fn new_table<M, A>(mapper: &M, frames: &A) -> Result<PhysicalAddress, PmapError>
where
    M: PhysMapper + ?Sized,
    A: FrameAlloc + ?Sized,
{
    let pa = frames.alloc_4k().ok_or(PmapError::OutOfMemory)?;
    // Safety: a freshly allocated frame is exclusively ours.
    unsafe { mapper.phys_to_mut::<RawTable>(pa) }.zero();
    Ok(pa)
}
