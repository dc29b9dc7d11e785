use crate::dcache::{Dcache, DcacheError};

/// One address space: its root register value(s) and its translation cache.
#[derive(Debug)]
pub struct Pagemap<R> {
    root: R,
    dcache: Dcache,
}

impl<R: Copy> Pagemap<R> {
    /// A page map whose dcache still needs [`Dcache::init`].
    #[must_use]
    pub const fn new(root: R) -> Self {
        Self {
            root,
            dcache: Dcache::new(),
        }
    }

    /// A page map with a dcache sized for `capacity_hint`.
    ///
    /// # Errors
    /// See [`Dcache::init`].
    pub fn with_dcache(root: R, capacity_hint: usize) -> Result<Self, DcacheError> {
        Ok(Self {
            root,
            dcache: Dcache::with_capacity(capacity_hint)?,
        })
    }

    #[inline]
    #[must_use]
    pub const fn root(&self) -> R {
        self.root
    }

    #[inline]
    #[must_use]
    pub const fn dcache(&self) -> &Dcache {
        &self.dcache
    }
}

#[cfg(all(feature = "asm", target_arch = "x86_64", target_os = "none"))]
impl Pagemap<kernel_registers::cr3::Cr3> {
    /// Page map for the address space currently loaded in `CR3`.
    ///
    /// # Safety
    /// Must run in ring 0.
    pub unsafe fn from_current(capacity_hint: usize) -> Result<Self, DcacheError> {
        Self::with_dcache(unsafe { kernel_pmap::x86_64::current_root() }, capacity_hint)
    }
}

#[cfg(all(feature = "asm", target_arch = "aarch64", target_os = "none"))]
impl Pagemap<kernel_pmap::aarch64::TtbrPair> {
    /// Page map for the address space currently loaded in `TTBR0/1_EL1`.
    ///
    /// # Safety
    /// Must run at EL1.
    pub unsafe fn from_current(capacity_hint: usize) -> Result<Self, DcacheError> {
        Self::with_dcache(unsafe { kernel_pmap::aarch64::TtbrPair::current() }, capacity_hint)
    }
}
