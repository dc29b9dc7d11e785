use kernel_sync::SpinLock;
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::{panic, thread};

#[test]
fn guard_releases_on_drop() {
    let l = SpinLock::new(0_u64);

    {
        let mut g = l.lock();
        *g = 0x1000;
        assert!(l.is_locked());
    }
    assert!(!l.is_locked());

    let mut g = l.lock();
    *g += 0x1000;
    assert_eq!(*g, 0x2000);
}

#[test]
fn try_lock_fails_while_held() {
    let l = SpinLock::new(7u8);

    let held = l.try_lock().expect("uncontended try_lock");
    assert_eq!(*held, 7);
    assert!(l.try_lock().is_none());

    drop(held);
    assert!(l.try_lock().is_some());
}

#[test]
fn with_lock_returns_closure_result() {
    let l = SpinLock::new(vec![0x1000_u64, 0x2000]);
    let popped = l.with_lock(Vec::pop);
    assert_eq!(popped, Some(0x2000));
    assert_eq!(l.with_lock(|v| v.len()), 1);
}

#[test]
fn exclusive_access_without_locking() {
    let mut l = SpinLock::new(vec![1, 2, 3]);
    l.get_mut().push(4);
    assert_eq!(l.into_inner(), vec![1, 2, 3, 4]);
}

#[test]
fn contended_pops_hand_out_each_item_once() {
    const THREADS: usize = 8;
    const ITEMS: u64 = 8 * 2_000;

    let pool = Arc::new(SpinLock::new((1..=ITEMS).collect::<Vec<_>>()));
    let start = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let pool = Arc::clone(&pool);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                let mut taken = Vec::new();
                while let Some(item) = pool.with_lock(Vec::pop) {
                    taken.push(item);
                    thread::yield_now();
                }
                taken
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for h in handles {
        for item in h.join().unwrap() {
            assert!(seen.insert(item), "item {item} handed out twice");
        }
    }
    assert_eq!(seen.len() as u64, ITEMS);
}

#[test]
fn panicking_critical_section_unlocks() {
    let l = SpinLock::new(0u32);

    let res = panic::catch_unwind(panic::AssertUnwindSafe(|| {
        l.with_lock(|v| {
            *v = 123;
            panic!("boom");
        });
    }));
    assert!(res.is_err());

    assert!(!l.is_locked());
    assert_eq!(l.with_lock(|v| *v), 123);
}

#[test]
fn debug_does_not_block_when_held() {
    let l = SpinLock::new(5u8);
    assert_eq!(format!("{l:?}"), "SpinLock { value: 5 }");
    let _g = l.lock();
    assert_eq!(format!("{l:?}"), "SpinLock { <locked> }");
}

#[test]
fn spinlock_is_sync_for_send_t() {
    fn takes_sync<S: Sync>(_s: &S) {}
    let l = SpinLock::new(0u8);
    takes_sync(&l);
}
