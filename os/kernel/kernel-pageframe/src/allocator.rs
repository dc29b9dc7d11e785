use crate::bitmap::FrameBitmap;
use core::ops::Range;
use kernel_info::boot::MemoryRegion;
use kernel_info::memory::{MIN_USABLE_MEMORY_MIB, PAGE_SIZE};
use kernel_memory_addresses::{PhysicalAddress, align_down, align_up};
use kernel_pmap::{FrameAlloc, PhysMapper};
use kernel_sync::SpinLock;
use log::{debug, info};

const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * MIB;

/// Why the boot memory map cannot back an allocator.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageframeInitError {
    #[error("boot memory map has no usable regions")]
    EmptyMemoryMap,
    #[error("only {mib} MiB of usable memory, at least {min} MiB required", mib = .usable_bytes / MIB, min = MIN_USABLE_MEMORY_MIB)]
    InsufficientMemory { usable_bytes: u64 },
    #[error("no usable region can hold the {bitmap_bytes} byte frame bitmap")]
    NoBitmapRegion { bitmap_bytes: u64 },
}

/// Physical frame allocator for contiguous runs of 4 KiB frames.
///
/// All operations take the internal lock; `alloc` and `free` are mutually
/// exclusive.
pub struct PageframeAllocator<'a> {
    bitmap: SpinLock<FrameBitmap<'a>>,
    usable_bytes: u64,
    bitmap_base: PhysicalAddress,
}

/// Page-aligned frame index range of a usable region.
fn usable_frames(region: &MemoryRegion) -> Range<usize> {
    let start = align_up(region.base, PAGE_SIZE) / PAGE_SIZE;
    let end = align_down(region.end(), PAGE_SIZE) / PAGE_SIZE;
    frame_index(start)..frame_index(end.max(start))
}

#[inline]
#[allow(clippy::cast_possible_truncation)]
const fn frame_index(pfn: u64) -> usize {
    pfn as usize
}

impl<'a> PageframeAllocator<'a> {
    /// Build the allocator from the boot memory map.
    ///
    /// # Panics
    /// When the map cannot back an allocator, most notably with less than
    /// [`MIN_USABLE_MEMORY_MIB`] of usable memory. The kernel cannot run in
    /// that state.
    ///
    /// # Safety
    /// See [`try_init`](Self::try_init).
    pub unsafe fn init<M: PhysMapper + ?Sized>(map: &[MemoryRegion], mapper: &'a M) -> Self {
        match unsafe { Self::try_init(map, mapper) } {
            Ok(allocator) => allocator,
            Err(err) => panic!("pageframe: {err}"),
        }
    }

    /// Build the allocator from the boot memory map, reporting failures.
    ///
    /// # Errors
    /// See [`PageframeInitError`].
    ///
    /// # Safety
    /// Every usable region must be RAM that nothing else uses, and `mapper`
    /// must map it for `'a`.
    pub unsafe fn try_init<M: PhysMapper + ?Sized>(
        map: &[MemoryRegion],
        mapper: &'a M,
    ) -> Result<Self, PageframeInitError> {
        let usable = || {
            map.iter()
                .filter(|r| r.is_usable())
                .map(|r| (r, usable_frames(r)))
                .filter(|(_, frames)| !frames.is_empty())
        };

        let highest = usable()
            .map(|(_, frames)| frames.end)
            .max()
            .ok_or(PageframeInitError::EmptyMemoryMap)?;
        let usable_bytes: u64 = usable().map(|(_, f)| f.len() as u64 * PAGE_SIZE).sum();

        if usable_bytes >= GIB {
            info!("System has {} GiB of memory", usable_bytes / GIB);
        } else {
            info!("System has {} MiB of memory", usable_bytes / MIB);
        }
        if usable_bytes / MIB < MIN_USABLE_MEMORY_MIB {
            return Err(PageframeInitError::InsufficientMemory { usable_bytes });
        }

        let words = highest.div_ceil(u64::BITS as usize);
        let bitmap_bytes = align_up((words * 8) as u64, PAGE_SIZE);
        let bitmap_frames = frame_index(bitmap_bytes / PAGE_SIZE);
        let (carved, _) = usable()
            .find(|(_, frames)| frames.len() >= bitmap_frames)
            .ok_or(PageframeInitError::NoBitmapRegion { bitmap_bytes })?;
        let carved_frames = usable_frames(carved);
        let bitmap_base = PhysicalAddress::from_page_number(carved_frames.start as u64);

        // Safety: the region is unused RAM mapped by `mapper` (caller contract)
        // and large enough for `words` entries; page alignment satisfies u64.
        let storage = unsafe { mapper.phys_to_slice_mut::<u64>(bitmap_base, words) };

        let first = usable()
            .map(|(_, frames)| frames.start)
            .min()
            .unwrap_or(1)
            .max(1);
        let mut bitmap = FrameBitmap::new(storage, first..highest);
        for (_, frames) in usable() {
            bitmap.release(frames.start.max(first)..frames.end);
        }
        bitmap.reserve(carved_frames.start..carved_frames.start + bitmap_frames);

        debug!(
            "pageframe bitmap at {bitmap_base} ({} KiB), tracking frames {first}..{highest}, {} free",
            bitmap_bytes / 1024,
            bitmap.free_frames()
        );

        Ok(Self {
            bitmap: SpinLock::new(bitmap),
            usable_bytes,
            bitmap_base,
        })
    }

    /// Reserve `count` contiguous frames. Returns `None` if `count` is zero
    /// or no run is long enough.
    pub fn alloc(&self, count: usize) -> Option<PhysicalAddress> {
        let index = self.bitmap.lock().alloc(count)?;
        Some(PhysicalAddress::from_page_number(index as u64))
    }

    /// Return `count` frames starting at `base`.
    ///
    /// The frames are not checked against earlier allocations.
    pub fn free(&self, base: PhysicalAddress, count: usize) {
        let start = frame_index(base.page_number());
        self.bitmap.lock().release(start..start + count);
    }

    #[must_use]
    pub fn free_frames(&self) -> usize {
        self.bitmap.lock().free_frames()
    }

    /// Size of the trackable frame index range.
    #[must_use]
    pub fn total_frames(&self) -> usize {
        self.bitmap.lock().span().len()
    }

    /// Usable memory reported by the boot memory map, bitmap included.
    #[must_use]
    pub const fn usable_bytes(&self) -> u64 {
        self.usable_bytes
    }

    /// Where the bitmap was carved out.
    #[must_use]
    pub const fn bitmap_base(&self) -> PhysicalAddress {
        self.bitmap_base
    }

    /// Run `f` against the locked bitmap.
    pub fn with_bitmap<R>(&self, f: impl FnOnce(&FrameBitmap<'a>) -> R) -> R {
        self.bitmap.with_lock(|bitmap| f(bitmap))
    }
}

impl FrameAlloc for PageframeAllocator<'_> {
    fn alloc_4k(&self) -> Option<PhysicalAddress> {
        self.alloc(1)
    }

    fn free_4k(&self, pa: PhysicalAddress) {
        self.free(pa, 1);
    }
}
