use bitfield_struct::bitfield;
use kernel_memory_addresses::PhysicalAddress;

/// Bits 51:12 of an entry hold the physical frame.
pub const ADDRESS_MASK: u64 = 0x000F_FFFF_FFFF_F000;

/// A single 64-bit x86-64 page table entry, as the common superset of
/// PML4E, PDPTE, PDE and PTE.
///
/// | Bits  | Name | Meaning                                   |
/// |-------|------|-------------------------------------------|
/// | 0     | P    | Present                                   |
/// | 1     | RW   | Writable                                  |
/// | 2     | US   | User accessible                           |
/// | 3     | PWT  | Write-through                             |
/// | 4     | PCD  | Cache disable                             |
/// | 5     | A    | Accessed                                  |
/// | 6     | D    | Dirty (leaf only)                         |
/// | 7     | PS   | Huge leaf in PDPTE/PDE; PAT in a PTE      |
/// | 8     | G    | Global (leaf only)                        |
/// | 12–51 | addr | Physical frame; huge leaves drop low bits |
/// | 63    | NX   | Execute disable                           |
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct PageEntryBits {
    /// Present (P, bit 0).
    pub present: bool,
    /// Writable (RW, bit 1).
    pub writable: bool,
    /// User/Supervisor (US, bit 2).
    pub user_access: bool,
    /// Page Write-Through (PWT, bit 3).
    pub write_through: bool,
    /// Page Cache Disable (PCD, bit 4).
    pub cache_disabled: bool,
    /// Accessed (A, bit 5). Set by the CPU.
    pub accessed: bool,
    /// Dirty (D, bit 6). Set by the CPU on first write to a leaf.
    pub dirty: bool,
    /// Page Size (PS, bit 7).
    pub large_page: bool,
    /// Global (G, bit 8).
    pub global_translation: bool,
    #[bits(3)]
    pub os_available_low: u8,
    #[bits(40)]
    phys_51_12: u64,
    #[bits(7)]
    pub os_available_high: u8,
    #[bits(4)]
    pub protection_key: u8,
    /// Execute Disable (NX, bit 63).
    pub no_execute: bool,
}

impl PageEntryBits {
    /// Intermediate entries are permissive; the leaf decides access.
    #[must_use]
    pub const fn next_table(table: PhysicalAddress) -> Self {
        Self::new()
            .with_present(true)
            .with_writable(true)
            .with_user_access(true)
            .with_phys_51_12(table.as_u64() >> 12)
    }

    /// Physical address held in bits 51:12.
    #[must_use]
    pub const fn physical_address(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.into_bits() & ADDRESS_MASK)
    }
}
