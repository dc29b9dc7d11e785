//! # Virtual Memory Configuration and Boot Memory Map
//!
//! This crate holds the compile-time knobs of the virtual-memory core and the
//! shape of the memory map that the bootloader hands to the kernel once at
//! start-up. Every other memory crate reads its constants from here, so a
//! layout change happens in exactly one place.
//!
//! ## Modules
//!
//! ### Memory Layout ([`memory`])
//! * **Granule**: the 4 KiB frame size used by the pageframe allocator and
//!   both page-table walkers.
//! * **Boot Threshold**: the minimum amount of usable RAM the kernel will
//!   accept before it refuses to boot.
//! * **Translation Cache**: capacity bounds and the boot processor's
//!   watermark for the per-address-space dcache.
//! * **Direct Map**: the higher half direct map (HHDM) offset through which
//!   physical memory is reached.
//!
//! ### Boot Memory Map ([`boot`])
//! An ordered list of `{base, length, kind}` regions. Only
//! [`MemoryRegionKind::Usable`](boot::MemoryRegionKind::Usable) regions are
//! handed to the pageframe allocator; everything else is reserved and never
//! tracked.
//!
//! ```text
//! Physical memory as seen by the allocator:
//!
//! 0x0000_0000 ┌──────────────────────────┐
//!             │ Reserved (firmware, BIOS)│  never tracked
//!             ├──────────────────────────┤
//!             │ Kernel image             │  never tracked
//!             ├──────────────────────────┤
//!             │ Usable: frame bitmap     │  carved out at init
//!             │ Usable: free frames      │  alloc / free
//!             ├──────────────────────────┤
//!             │ Reserved (ACPI, MMIO)    │  never tracked
//!             └──────────────────────────┘
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod boot;
pub mod memory;
