//! # Pageframe Allocator
//!
//! Owns every physical 4 KiB frame the boot memory map declares usable and
//! hands out physically contiguous runs of them.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              PageframeAllocator                     │
//! │    • alloc(count) / free(base, count)               │
//! │    • one SpinLock around the bitmap                 │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │                 FrameBitmap                         │
//! │    • bit i = 1 ⇔ frame i is free                    │
//! │    • first-fit scan, skips fully used words         │
//! └─────────────────┬───────────────────────────────────┘
//!                   │ lives in
//! ┌─────────────────▼───────────────────────────────────┐
//! │   the first usable region large enough to hold it   │
//! │   (reached through a PhysMapper, e.g. the HHDM)     │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Lifecycle
//!
//! 1. [`PageframeAllocator::init`] consumes the boot memory map once. It sums
//!    up usable memory, refuses to continue below
//!    [`MIN_USABLE_MEMORY_MIB`](kernel_info::memory::MIN_USABLE_MEMORY_MIB),
//!    carves out the bitmap and marks every usable frame free.
//! 2. Frames move free → allocated → free. Reserved frames (firmware, kernel
//!    image, the bitmap itself) are never tracked.
//!
//! Frame 0 is never handed out, so a successful allocation is never the
//! null physical address.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod allocator;
mod bitmap;
pub mod phys_mapper;

pub use allocator::{PageframeAllocator, PageframeInitError};
pub use bitmap::FrameBitmap;
