//! # Kernel synchronization primitives
//!
//! The memory core holds exactly one lock at a time: the pageframe
//! allocator lock or the lock of a single translation cache. Both are short,
//! bounded critical sections, so a busy-waiting [`SpinLock`] is all that is
//! needed.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod spin_lock;

pub use spin_lock::{SpinLock, SpinLockGuard};
