use bitfield_struct::bitfield;
use kernel_memory_addresses::PhysicalAddress;

/// Bits 47:12 of a descriptor hold the output address.
pub const ADDRESS_MASK: u64 = 0x0000_FFFF_FFFF_F000;

/// Inner Shareable encoding of `SH[1:0]`.
pub const SHAREABILITY_INNER: u8 = 0b11;

/// VMSAv8-64 stage 1 descriptor, 4 KiB granule, 48-bit output address.
///
/// Bit 1 has two meanings depending on the level:
///
/// | Level | bit 1 = 1        | bit 1 = 0          |
/// |-------|------------------|--------------------|
/// | 0..=2 | table descriptor | block (L1/L2 only) |
/// | 3     | page descriptor  | reserved (invalid) |
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct Descriptor {
    /// Bit 0 — valid.
    pub valid: bool,
    /// Bit 1 — table (levels 0–2) or page (level 3).
    pub table_or_page: bool,
    /// Bits 2–4 — AttrIndx into `MAIR_EL1`.
    #[bits(3)]
    pub attr_index: u8,
    /// Bit 5 — NS.
    pub non_secure: bool,
    /// Bit 6 — AP\[1\]: accessible from EL0.
    pub ap_user: bool,
    /// Bit 7 — AP\[2\]: read-only.
    pub ap_read_only: bool,
    /// Bits 8–9 — SH.
    #[bits(2)]
    pub shareability: u8,
    /// Bit 10 — AF. A clear flag faults on first access.
    pub access_flag: bool,
    /// Bit 11 — nG: translation is tagged with the current ASID.
    pub not_global: bool,
    #[bits(36)]
    output_47_12: u64,
    #[bits(3)]
    __reserved: u8,
    /// Bit 51 — DBM.
    pub dirty_bit_modifier: bool,
    /// Bit 52 — contiguous hint.
    pub contiguous: bool,
    /// Bit 53 — PXN.
    pub privileged_execute_never: bool,
    /// Bit 54 — UXN.
    pub user_execute_never: bool,
    #[bits(4)]
    pub software: u8,
    #[bits(5)]
    __upper_ignored: u8,
}

impl Descriptor {
    #[must_use]
    pub const fn next_table(table: PhysicalAddress) -> Self {
        Self::new()
            .with_valid(true)
            .with_table_or_page(true)
            .with_output_47_12(table.as_u64() >> 12)
    }

    #[must_use]
    pub const fn output_address(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.into_bits() & ADDRESS_MASK)
    }
}
