use crate::dcache::DcacheError;
use kernel_memory_addresses::{PageSize, PhysicalAddress};
use kernel_pmap::PmapError;

/// Errors surfaced by the address-space façade.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GvmError {
    #[error(transparent)]
    Pmap(#[from] PmapError),
    #[error(transparent)]
    Dcache(#[from] DcacheError),
    #[error("physical address {0} is not aligned to a {1} page")]
    MisalignedPhysical(PhysicalAddress, PageSize),
}
