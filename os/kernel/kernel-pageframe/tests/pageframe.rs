use kernel_info::boot::{MemoryRegion, MemoryRegionKind};
use kernel_memory_addresses::PhysicalAddress;
use kernel_pageframe::PageframeAllocator;
use kernel_pmap::FrameAlloc;
use kernel_pmap::testing::TestPhys;
use std::thread;

const MIB: u64 = 1024 * 1024;
const BASE: u64 = 0x10_0000;

/// Small deterministic generator for randomized checks.
struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }

    fn below(&mut self, n: u64) -> usize {
        (self.next() % n) as usize
    }
}

fn boot_map() -> Vec<MemoryRegion> {
    vec![
        MemoryRegion::new(0, 0x9_F000, MemoryRegionKind::Reserved),
        MemoryRegion::new(0x9_F000, 0x6_1000, MemoryRegionKind::Reserved),
        MemoryRegion::usable(BASE, 512 * MIB),
    ]
}

fn with_allocator(f: impl FnOnce(&PageframeAllocator<'_>)) {
    let phys = TestPhys::new(BASE, 8);
    let map = boot_map();
    let alloc = unsafe { PageframeAllocator::init(&map, &phys) };
    f(&alloc);
}

#[test]
fn fresh_512m_allocator_hands_out_everything_once() {
    with_allocator(|alloc| {
        let base = alloc.alloc(3).expect("three frames");
        assert_ne!(base.as_u64(), 0);
        assert_eq!(base.as_u64() % 4096, 0);

        let remaining = alloc.free_frames();
        let rest = alloc.alloc(remaining).expect("remaining capacity");
        assert!(rest.as_u64() >= base.as_u64() + 3 * 4096);
        assert_eq!(alloc.free_frames(), 0);

        assert_eq!(alloc.alloc(1), None);
        assert_eq!(alloc.alloc_4k(), None);
    });
}

#[test]
fn free_of_alloc_restores_the_bitmap() {
    with_allocator(|alloc| {
        let mut rng = XorShift(0x9E37_79B9_7F4A_7C15);
        // Fragment the bitmap a little first.
        let mut held = Vec::new();
        for _ in 0..32 {
            let count = 1 + rng.below(64);
            held.push((alloc.alloc(count).unwrap(), count));
        }
        for (base, count) in held.iter().step_by(2) {
            alloc.free(*base, *count);
        }

        for _ in 0..64 {
            let before = alloc.with_bitmap(|bm| bm.words().to_vec());
            let count = 1 + rng.below(300);
            let base = alloc.alloc(count).unwrap();
            alloc.free(base, count);
            let after = alloc.with_bitmap(|bm| bm.words().to_vec());
            assert_eq!(before, after, "alloc/free of {count} frames changed the bitmap");
        }
    });
}

#[test]
fn live_allocations_never_overlap() {
    with_allocator(|alloc| {
        let mut rng = XorShift(0xDEAD_BEEF_CAFE_F00D);
        let mut live: Vec<(u64, u64)> = Vec::new();

        for _ in 0..2_000 {
            if !live.is_empty() && rng.below(3) == 0 {
                let (start, end) = live.swap_remove(rng.below(live.len() as u64));
                alloc.free(PhysicalAddress::new(start), ((end - start) / 4096) as usize);
                continue;
            }
            let count = 1 + rng.below(16) as u64;
            let start = alloc.alloc(count as usize).unwrap().as_u64();
            let end = start + count * 4096;
            for &(s, e) in &live {
                assert!(end <= s || start >= e, "[{start:#x}, {end:#x}) overlaps [{s:#x}, {e:#x})");
            }
            live.push((start, end));
        }
    });
}

#[test]
fn concurrent_allocations_are_disjoint() {
    with_allocator(|alloc| {
        let free_before = alloc.free_frames();
        let frames: Vec<Vec<u64>> = thread::scope(|s| {
            let workers: Vec<_> = (0..8)
                .map(|_| {
                    s.spawn(|| {
                        (0..500)
                            .map(|_| alloc.alloc_4k().unwrap().as_u64())
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });

        let mut all: Vec<u64> = frames.into_iter().flatten().collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 8 * 500);
        assert_eq!(alloc.free_frames(), free_before - 8 * 500);

        for pa in all {
            alloc.free(PhysicalAddress::new(pa), 1);
        }
        assert_eq!(alloc.free_frames(), free_before);
    });
}

#[test]
fn reserved_regions_are_never_returned() {
    let phys = TestPhys::new(BASE, 8);
    let map = [
        MemoryRegion::usable(BASE, 256 * MIB),
        MemoryRegion::new(BASE + 256 * MIB, 16 * MIB, MemoryRegionKind::KernelAndModules),
        MemoryRegion::usable(BASE + 272 * MIB, 256 * MIB),
    ];
    let alloc = unsafe { PageframeAllocator::init(&map, &phys) };
    let hole = (BASE + 256 * MIB)..(BASE + 272 * MIB);

    for run in [64, 1] {
        while let Some(pa) = alloc.alloc(run) {
            let end = pa.as_u64() + run as u64 * 4096;
            assert!(
                end <= hole.start || pa.as_u64() >= hole.end,
                "{pa} (+{run} frames) reaches into the kernel image"
            );
        }
    }
    assert_eq!(alloc.free_frames(), 0);
}
