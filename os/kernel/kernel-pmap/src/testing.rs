//! Host-side stand-ins for physical memory and a frame source.

use crate::{FrameAlloc, PhysMapper, RawTable};
use alloc::vec::Vec;
use core::cell::{Cell, UnsafeCell};
use kernel_memory_addresses::PhysicalAddress;

#[repr(C, align(4096))]
struct Frame(UnsafeCell<[u8; 4096]>);

/// A contiguous run of simulated RAM starting at physical address `base`.
///
/// # Panics
/// Mapping an address outside the arena panics.
pub struct TestPhys {
    base: u64,
    frames: Vec<Frame>,
}

impl TestPhys {
    #[must_use]
    pub fn new(base: u64, frames: usize) -> Self {
        assert_eq!(base & 0xFFF, 0, "arena base must be page aligned");
        let frames = (0..frames)
            .map(|_| Frame(UnsafeCell::new([0; 4096])))
            .collect();
        Self { base, frames }
    }

    #[must_use]
    pub const fn base(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.base)
    }

    /// One past the last backed byte.
    #[must_use]
    pub fn end(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.base + (self.frames.len() as u64) * 4096)
    }

    /// Whether `[pa, pa + len)` lies entirely inside the arena.
    #[must_use]
    pub fn covers(&self, pa: PhysicalAddress, len: usize) -> bool {
        pa.as_u64() >= self.base
            && (len as u64)
                .checked_add(pa.as_u64())
                .is_some_and(|end| end <= self.end().as_u64())
    }

    /// Read entry `index` of the table at `table`.
    #[must_use]
    pub fn read_u64(&self, table: PhysicalAddress, index: usize) -> u64 {
        // Safety: bounds are checked by `phys_to_ptr`.
        unsafe { self.phys_to_mut::<RawTable>(table) }.get(index)
    }
}

impl PhysMapper for TestPhys {
    unsafe fn phys_to_ptr(&self, pa: PhysicalAddress) -> *mut u8 {
        let offset = pa
            .as_u64()
            .checked_sub(self.base)
            .unwrap_or_else(|| panic!("{pa} below arena base {:#x}", self.base));
        let frame = usize::try_from(offset >> 12).unwrap();
        let within = usize::try_from(offset & 0xFFF).unwrap();
        let slot = self
            .frames
            .get(frame)
            .unwrap_or_else(|| panic!("{pa} beyond arena end"));
        unsafe { slot.0.get().cast::<u8>().add(within) }
    }

    unsafe fn phys_to_slice_mut<'a, T>(&self, pa: PhysicalAddress, len: usize) -> &'a mut [T] {
        let bytes = len * size_of::<T>();
        assert!(self.covers(pa, bytes), "{pa}+{bytes:#x} beyond arena end");
        // Frames are stored back to back, so the arena is one contiguous run.
        unsafe { core::slice::from_raw_parts_mut(self.phys_to_ptr(pa).cast::<T>(), len) }
    }
}

/// Bump allocator over `[start, end)`.
pub struct TestFrames {
    next: Cell<u64>,
    end: u64,
    handed_out: Cell<usize>,
    returned: Cell<usize>,
}

impl TestFrames {
    #[must_use]
    pub const fn new(start: PhysicalAddress, end: PhysicalAddress) -> Self {
        Self {
            next: Cell::new(start.as_u64()),
            end: end.as_u64(),
            handed_out: Cell::new(0),
            returned: Cell::new(0),
        }
    }

    /// Frames handed out so far.
    #[must_use]
    pub fn allocated(&self) -> usize {
        self.handed_out.get()
    }

    /// Frames given back through [`FrameAlloc::free_4k`]. They are not reused.
    #[must_use]
    pub fn returned(&self) -> usize {
        self.returned.get()
    }
}

impl FrameAlloc for TestFrames {
    fn alloc_4k(&self) -> Option<PhysicalAddress> {
        let pa = self.next.get();
        if pa + 4096 > self.end {
            return None;
        }
        self.next.set(pa + 4096);
        self.handed_out.set(self.handed_out.get() + 1);
        Some(PhysicalAddress::new(pa))
    }

    fn free_4k(&self, _pa: PhysicalAddress) {
        self.returned.set(self.returned.get() + 1);
    }
}
