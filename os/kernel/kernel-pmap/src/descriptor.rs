use crate::table_index;
use kernel_memory_addresses::{PageSize, PhysicalAddress, VirtualAddress};

/// Result of a successful walk.
///
/// `pa` is the physical base of the table holding the entry that maps the
/// walked address; `size` is the page size that entry maps and `level` the
/// table's depth (0 = root).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TranslationTable {
    pub pa: PhysicalAddress,
    pub size: PageSize,
    pub level: u8,
}

impl TranslationTable {
    #[must_use]
    pub const fn new(pa: PhysicalAddress, size: PageSize, level: u8) -> Self {
        Self { pa, size, level }
    }

    /// Index of the entry that maps `va` in this table.
    #[inline]
    #[must_use]
    pub const fn index_of(&self, va: VirtualAddress) -> usize {
        table_index(self.level, va)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_follows_the_table_level() {
        let tt = TranslationTable::new(PhysicalAddress::new(0x5000), PageSize::Size2M, 2);
        let va = VirtualAddress::new(0x0060_0000);
        assert_eq!(tt.index_of(va), 3);
        let pt = TranslationTable::new(PhysicalAddress::new(0x6000), PageSize::Size4K, 3);
        assert_eq!(pt.index_of(va + 0x5000), 5);
    }
}
