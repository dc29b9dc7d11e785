use kernel_memory_addresses::PhysicalAddress;

/// Number of 8-byte entries in every translation table.
pub const ENTRIES_PER_TABLE: usize = 512;

/// A physical frame source for new translation tables.
pub trait FrameAlloc {
    /// Hand out one 4 KiB frame. Returns `None` on out-of-memory.
    fn alloc_4k(&self) -> Option<PhysicalAddress>;

    /// Take back a frame from [`alloc_4k`](Self::alloc_4k) that was never
    /// linked into a table.
    fn free_4k(&self, pa: PhysicalAddress);
}

/// Turns a physical address into something the CPU can dereference.
///
/// The kernel implements this with its higher half direct map; tests back it
/// with an in-memory arena.
pub trait PhysMapper {
    /// Pointer to the byte at physical address `pa`.
    ///
    /// # Safety
    /// `pa` must be backed by this mapper.
    unsafe fn phys_to_ptr(&self, pa: PhysicalAddress) -> *mut u8;

    /// Reinterpret the memory at `pa` as a `T`.
    ///
    /// # Safety
    /// `pa` must be backed by this mapper and suitably aligned for `T`. The
    /// memory must hold a valid `T` and must not be aliased for `'a`.
    #[inline]
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T {
        unsafe { &mut *self.phys_to_ptr(pa).cast::<T>() }
    }

    /// Reinterpret `len` consecutive `T`s starting at `pa` as a slice.
    ///
    /// # Safety
    /// The whole range must be backed by this mapper, physically contiguous
    /// and otherwise as for [`phys_to_mut`](Self::phys_to_mut).
    #[inline]
    unsafe fn phys_to_slice_mut<'a, T>(&self, pa: PhysicalAddress, len: usize) -> &'a mut [T] {
        unsafe { core::slice::from_raw_parts_mut(self.phys_to_ptr(pa).cast::<T>(), len) }
    }
}

/// One 4 KiB translation table viewed as raw words.
///
/// The per-architecture modules give meaning to the words.
#[repr(C, align(4096))]
pub struct RawTable {
    entries: [u64; ENTRIES_PER_TABLE],
}

impl RawTable {
    #[inline]
    #[must_use]
    pub const fn get(&self, index: usize) -> u64 {
        self.entries[index]
    }

    #[inline]
    pub const fn set(&mut self, index: usize, raw: u64) {
        self.entries[index] = raw;
    }

    /// Replace an entry and return the old one.
    #[inline]
    pub const fn replace(&mut self, index: usize, raw: u64) -> u64 {
        core::mem::replace(&mut self.entries[index], raw)
    }

    #[inline]
    pub fn zero(&mut self) {
        self.entries.fill(0);
    }
}

const _: () = {
    assert!(size_of::<RawTable>() == 4096);
    assert!(align_of::<RawTable>() == 4096);
};
