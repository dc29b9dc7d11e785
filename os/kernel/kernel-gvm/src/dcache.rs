//! # Translation Cache (dcache)
//!
//! Memoizes `virtual page → physical page` for one address space so hot
//! addresses skip the page-table walk.
//!
//! ```text
//!            index = vpn & (capacity - 1)
//!                        │
//!   slot 0   slot 1   slot 2 ... slot n-1
//!  ┌──────┐ ┌──────┐ ┌──────┐   ┌──────┐
//!  │ prim │ │ prim │ │  --  │   │ prim │     primary entry per slot
//!  └──────┘ └──┬───┘ └──────┘   └──────┘
//!              ▼
//!          [chain…]                          colliding keys
//!     ▲
//!     └── hand: CLOCK sweep position
//! ```
//!
//! Eviction is second chance: a slot whose entries were touched since the
//! hand last passed gets its protection cleared and is skipped once; the
//! first unprotected occupied slot loses its primary entry and its whole
//! chain.

use alloc::vec::Vec;
use kernel_info::memory::{DCACHE_MAX_CAPACITY, DCACHE_MIN_CAPACITY};
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};
use kernel_sync::SpinLock;
use log::{debug, error};

/// Translation cache failures.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DcacheError {
    #[error("capacity hint {0} does not round into [8, 32]")]
    InvalidCapacity(usize),
    #[error("page 0 is not a valid cache key or value")]
    Rejected,
    #[error("translation cache used before init")]
    Uninitialized,
    #[error("out of memory (dcache chain)")]
    OutOfMemory,
}

#[derive(Debug, Copy, Clone)]
struct Entry {
    vpn: u64,
    pa: PhysicalAddress,
    protected: bool,
}

#[derive(Debug, Default)]
struct Slot {
    primary: Option<Entry>,
    chain: Vec<Entry>,
}

impl Slot {
    fn find_mut(&mut self, vpn: u64) -> Option<&mut Entry> {
        self.primary
            .iter_mut()
            .chain(self.chain.iter_mut())
            .find(|e| e.vpn == vpn)
    }

    fn find(&self, vpn: u64) -> Option<&Entry> {
        self.primary.iter().chain(self.chain.iter()).find(|e| e.vpn == vpn)
    }

    fn is_protected(&self) -> bool {
        self.primary.iter().chain(self.chain.iter()).any(|e| e.protected)
    }

    fn unprotect(&mut self) {
        for e in self.primary.iter_mut().chain(self.chain.iter_mut()) {
            e.protected = false;
        }
    }

    /// Empty the slot, returning how many entries it held.
    fn evict(&mut self) -> usize {
        let removed = usize::from(self.primary.take().is_some()) + self.chain.len();
        self.chain.clear();
        removed
    }
}

#[derive(Debug)]
struct State {
    slots: Vec<Slot>,
    live: usize,
    hand: usize,
}

impl State {
    fn index(&self, vpn: u64) -> usize {
        #[allow(clippy::cast_possible_truncation)]
        let low = vpn as usize;
        low & (self.slots.len() - 1)
    }

    fn watermark(&self) -> usize {
        self.slots.len()
    }

    /// One CLOCK pass. Returns the number of entries evicted.
    fn sweep(&mut self) -> usize {
        let slots = self.slots.len();
        // Two rounds suffice: the first clears every protection.
        for _ in 0..2 * slots {
            let at = self.hand;
            self.hand = (self.hand + 1) % slots;
            let slot = &mut self.slots[at];
            if slot.is_protected() {
                slot.unprotect();
                continue;
            }
            if slot.primary.is_some() {
                let removed = slot.evict();
                self.live -= removed;
                debug!("dcache: evicted slot {at} ({removed} entries), {} live", self.live);
                return removed;
            }
        }
        0
    }
}

/// Per-address-space virtual → physical translation cache.
///
/// A single lock guards lookups, inserts and eviction. Must be initialized
/// with [`Dcache::init`] before use.
#[derive(Debug)]
pub struct Dcache {
    state: SpinLock<Option<State>>,
}

impl Default for Dcache {
    fn default() -> Self {
        Self::new()
    }
}

impl Dcache {
    /// An uninitialized cache.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: SpinLock::new(None),
        }
    }

    /// A cache initialized for `capacity_hint`.
    ///
    /// # Errors
    /// See [`Dcache::init`].
    pub fn with_capacity(capacity_hint: usize) -> Result<Self, DcacheError> {
        let cache = Self::new();
        cache.init(capacity_hint)?;
        Ok(cache)
    }

    /// Size the cache. The hint is rounded up to a power of two; the
    /// watermark equals the resulting capacity. Re-initializing drops every
    /// entry.
    ///
    /// # Errors
    /// - [`DcacheError::InvalidCapacity`] if the rounded hint falls outside
    ///   `[DCACHE_MIN_CAPACITY, DCACHE_MAX_CAPACITY]`.
    /// - [`DcacheError::OutOfMemory`] if the slot array cannot be allocated.
    pub fn init(&self, capacity_hint: usize) -> Result<(), DcacheError> {
        let capacity = capacity_hint
            .checked_next_power_of_two()
            .filter(|c| (DCACHE_MIN_CAPACITY..=DCACHE_MAX_CAPACITY).contains(c))
            .ok_or(DcacheError::InvalidCapacity(capacity_hint))?;

        let mut slots = Vec::new();
        slots
            .try_reserve_exact(capacity)
            .map_err(|_| DcacheError::OutOfMemory)?;
        slots.resize_with(capacity, Slot::default);

        *self.state.lock() = Some(State {
            slots,
            live: 0,
            hand: 0,
        });
        debug!("dcache: {capacity} slots");
        Ok(())
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut State) -> R) -> Result<R, DcacheError> {
        let mut guard = self.state.lock();
        guard.as_mut().map(f).ok_or_else(|| {
            error!("dcache: used before init");
            DcacheError::Uninitialized
        })
    }

    /// Cache `va → pa`. An existing key is updated in place.
    ///
    /// Runs one eviction pass first if the cache is at its watermark.
    ///
    /// # Errors
    /// - [`DcacheError::Rejected`] if either page number is zero.
    /// - [`DcacheError::OutOfMemory`] if a collision chain cannot grow; the
    ///   cache is left untouched.
    /// - [`DcacheError::Uninitialized`].
    pub fn insert(&self, va: VirtualAddress, pa: PhysicalAddress) -> Result<(), DcacheError> {
        self.with_state(|state| {
            let vpn = va.page_number();
            if vpn == 0 || pa.page_number() == 0 {
                return Err(DcacheError::Rejected);
            }
            let pa = PhysicalAddress::from_page_number(pa.page_number());

            let index = state.index(vpn);
            if let Some(entry) = state.slots[index].find_mut(vpn) {
                entry.pa = pa;
                entry.protected = true;
                return Ok(());
            }

            // Reserve before sweeping so a failed insert evicts nothing.
            if state.slots[index].primary.is_some() {
                state.slots[index]
                    .chain
                    .try_reserve(1)
                    .map_err(|_| DcacheError::OutOfMemory)?;
            }

            if state.live >= state.watermark() {
                state.sweep();
            }

            let entry = Entry {
                vpn,
                pa,
                protected: true,
            };
            let slot = &mut state.slots[index];
            if slot.primary.is_none() {
                slot.primary = Some(entry);
            } else {
                slot.chain.push(entry);
            }
            state.live += 1;
            Ok(())
        })?
    }

    /// Cached physical page for `va`. A hit protects the entry from the next
    /// sweep.
    ///
    /// # Errors
    /// [`DcacheError::Uninitialized`].
    pub fn lookup(&self, va: VirtualAddress) -> Result<Option<PhysicalAddress>, DcacheError> {
        self.with_state(|state| {
            let vpn = va.page_number();
            let index = state.index(vpn);
            state.slots[index].find_mut(vpn).map(|entry| {
                entry.protected = true;
                entry.pa
            })
        })
    }

    /// Like [`lookup`](Self::lookup) but does not count as a use.
    ///
    /// # Errors
    /// [`DcacheError::Uninitialized`].
    pub fn peek(&self, va: VirtualAddress) -> Result<Option<PhysicalAddress>, DcacheError> {
        self.with_state(|state| {
            let vpn = va.page_number();
            state.slots[state.index(vpn)].find(vpn).map(|e| e.pa)
        })
    }

    /// Number of cached translations.
    ///
    /// # Errors
    /// [`DcacheError::Uninitialized`].
    pub fn len(&self) -> Result<usize, DcacheError> {
        self.with_state(|state| state.live)
    }

    /// # Errors
    /// [`DcacheError::Uninitialized`].
    pub fn is_empty(&self) -> Result<bool, DcacheError> {
        self.len().map(|n| n == 0)
    }

    /// Slot count, which is also the watermark.
    ///
    /// # Errors
    /// [`DcacheError::Uninitialized`].
    pub fn capacity(&self) -> Result<usize, DcacheError> {
        self.with_state(|state| state.slots.len())
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state.lock().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn va(vpn: u64) -> VirtualAddress {
        VirtualAddress::from_page_number(vpn)
    }

    fn pa(pfn: u64) -> PhysicalAddress {
        PhysicalAddress::from_page_number(pfn)
    }

    #[test]
    fn capacity_rounds_up_within_bounds() {
        assert_eq!(Dcache::with_capacity(8).unwrap().capacity(), Ok(8));
        assert_eq!(Dcache::with_capacity(9).unwrap().capacity(), Ok(16));
        assert_eq!(Dcache::with_capacity(30).unwrap().capacity(), Ok(32));
        assert_eq!(Dcache::with_capacity(32).unwrap().capacity(), Ok(32));
    }

    #[test]
    fn small_hints_round_up_to_the_minimum() {
        assert_eq!(Dcache::with_capacity(5).unwrap().capacity(), Ok(8));
        assert_eq!(Dcache::with_capacity(7).unwrap().capacity(), Ok(8));
    }

    #[test]
    fn out_of_range_hints_are_rejected() {
        for hint in [0, 1, 4, 33, 64, usize::MAX] {
            assert_eq!(
                Dcache::with_capacity(hint).err(),
                Some(DcacheError::InvalidCapacity(hint))
            );
        }
    }

    #[test]
    fn uninitialized_cache_is_a_hard_error() {
        let cache = Dcache::new();
        assert!(!cache.is_initialized());
        assert_eq!(cache.insert(va(1), pa(2)), Err(DcacheError::Uninitialized));
        assert_eq!(cache.lookup(va(1)), Err(DcacheError::Uninitialized));
        assert_eq!(cache.len(), Err(DcacheError::Uninitialized));
    }

    #[test]
    fn zero_pages_are_rejected() {
        let cache = Dcache::with_capacity(8).unwrap();
        assert_eq!(cache.insert(va(0), pa(2)), Err(DcacheError::Rejected));
        assert_eq!(cache.insert(VirtualAddress::new(0xFFF), pa(2)), Err(DcacheError::Rejected));
        assert_eq!(cache.insert(va(1), pa(0)), Err(DcacheError::Rejected));
        assert_eq!(cache.len(), Ok(0));
        assert_eq!(cache.lookup(va(0)), Ok(None));
    }

    #[test]
    fn scenario_hit_then_sweep_removes_oldest_untouched() {
        let cache = Dcache::with_capacity(8).unwrap();
        cache.insert(VirtualAddress::new(0x1000), PhysicalAddress::new(0x2000)).unwrap();
        assert_eq!(
            cache.lookup(VirtualAddress::new(0x1000)),
            Ok(Some(PhysicalAddress::new(0x2000)))
        );

        for vpn in 8..16 {
            cache.insert(va(vpn), pa(0x100 + vpn)).unwrap();
            assert!(cache.len().unwrap() <= 8);
        }

        assert_eq!(cache.len(), Ok(8));
        assert_eq!(cache.peek(va(8)), Ok(None), "oldest never-hit entry is evicted");
        assert_eq!(cache.peek(va(1)), Ok(Some(pa(2))));
        for vpn in 9..16 {
            assert_eq!(cache.peek(va(vpn)), Ok(Some(pa(0x100 + vpn))));
        }
    }

    #[test]
    fn hit_since_last_sweep_survives_the_next_one() {
        let cache = Dcache::with_capacity(8).unwrap();
        cache.insert(va(1), pa(2)).unwrap();
        for vpn in 8..16 {
            cache.insert(va(vpn), pa(vpn)).unwrap();
        }
        // The sweep that evicted vpn 8 cleared every protection; hand is at 1.
        cache.lookup(va(1)).unwrap();
        cache.insert(va(16), pa(16)).unwrap();

        assert_eq!(cache.peek(va(1)), Ok(Some(pa(2))));
        assert_eq!(cache.peek(va(10)), Ok(None));
        assert_eq!(cache.len(), Ok(8));
    }

    #[test]
    fn colliding_keys_share_a_slot_and_leave_together() {
        let cache = Dcache::with_capacity(8).unwrap();
        // 3, 11, 19 all map to slot 3.
        for vpn in [3, 11, 19] {
            cache.insert(va(vpn), pa(vpn + 1)).unwrap();
        }
        assert_eq!(cache.len(), Ok(3));
        for vpn in [3, 11, 19] {
            assert_eq!(cache.lookup(va(vpn)), Ok(Some(pa(vpn + 1))));
        }

        // Fill up and force sweeps until slot 3 is chosen.
        for vpn in [1, 2, 4, 5, 6] {
            cache.insert(va(vpn), pa(vpn + 1)).unwrap();
        }
        assert_eq!(cache.len(), Ok(8));
        cache.insert(va(0x20), pa(0x21)).unwrap();
        // Slot 0 was empty, so the sweep picked slot 1 after clearing everything.
        assert_eq!(cache.peek(va(1)), Ok(None));
        cache.insert(va(0x28), pa(0x29)).unwrap();
        cache.insert(va(0x30), pa(0x31)).unwrap();
        // Slot 2 then slot 3 with its chain of three.
        assert_eq!(cache.peek(va(2)), Ok(None));
        for vpn in [3, 11, 19] {
            assert_eq!(cache.peek(va(vpn)), Ok(None));
        }
        assert!(cache.len().unwrap() <= 8);
    }

    #[test]
    fn reinsert_updates_in_place() {
        let cache = Dcache::with_capacity(8).unwrap();
        cache.insert(va(5), pa(6)).unwrap();
        cache.insert(va(13), pa(14)).unwrap();
        cache.insert(va(13), pa(15)).unwrap();
        assert_eq!(cache.len(), Ok(2));
        assert_eq!(cache.lookup(va(13)), Ok(Some(pa(15))));
    }

    #[test]
    fn values_are_page_aligned() {
        let cache = Dcache::with_capacity(8).unwrap();
        cache.insert(VirtualAddress::new(0x1234), PhysicalAddress::new(0x5678)).unwrap();
        assert_eq!(
            cache.lookup(VirtualAddress::new(0x1FFF)),
            Ok(Some(PhysicalAddress::new(0x5000)))
        );
    }

    #[test]
    fn live_count_matches_resident_keys_under_random_traffic() {
        let mut seed = 0x9E37_79B9_7F4A_7C15_u64;
        let mut next = move || {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            seed
        };

        for capacity in [8, 16, 32] {
            let cache = Dcache::with_capacity(capacity).unwrap();
            for _ in 0..2_000 {
                let vpn = 1 + next() % 96;
                if next() % 3 == 0 {
                    if let Some(found) = cache.lookup(va(vpn)).unwrap() {
                        assert_eq!(found, pa(vpn * 7));
                    }
                } else {
                    cache.insert(va(vpn), pa(vpn * 7)).unwrap();
                    assert_eq!(cache.peek(va(vpn)), Ok(Some(pa(vpn * 7))));
                }

                let live = cache.len().unwrap();
                assert!(live <= capacity);
                let resident = (1..=96).filter(|&v| cache.peek(va(v)).unwrap().is_some()).count();
                assert_eq!(live, resident);
            }
        }
    }

    #[test]
    fn shared_cache_under_concurrent_traffic() {
        const THREADS: u64 = 8;
        const KEYS: u64 = 48;

        let cache = Dcache::with_capacity(16).unwrap();
        std::thread::scope(|s| {
            for t in 0..THREADS {
                let cache = &cache;
                s.spawn(move || {
                    let mut seed = 0x2545_F491_4F6C_DD1D_u64 ^ (t + 1);
                    for _ in 0..2_000 {
                        seed ^= seed << 13;
                        seed ^= seed >> 7;
                        seed ^= seed << 17;
                        let vpn = 1 + seed % KEYS;
                        if (seed >> 40) & 1 == 0 {
                            cache.insert(va(vpn), pa(vpn * 5)).unwrap();
                        } else if let Some(found) = cache.lookup(va(vpn)).unwrap() {
                            assert_eq!(found, pa(vpn * 5));
                        }
                        assert!(cache.len().unwrap() <= 16);
                    }
                });
            }
        });

        let live = cache.len().unwrap();
        assert!(live <= 16);
        let resident = (1..=KEYS)
            .filter(|&v| cache.peek(va(v)).unwrap().is_some())
            .count();
        assert_eq!(live, resident);
    }

    #[test]
    fn reinit_drops_entries() {
        let cache = Dcache::with_capacity(8).unwrap();
        cache.insert(va(1), pa(1)).unwrap();
        cache.init(16).unwrap();
        assert_eq!(cache.len(), Ok(0));
        assert_eq!(cache.capacity(), Ok(16));
    }
}
