//! # Generic Virtual Memory (GVM)
//!
//! The architecture-neutral half of the virtual memory system:
//!
//! ```text
//!   Gvm<W: PageTableWalker>
//!     │  get_translation / map_page / translate
//!     ▼
//!   Pagemap ──► Dcache (vpn → table, CLOCK eviction)
//!     │              │ miss
//!     ▼              ▼
//!   root(s) ──► W::walk (x86-64 or AArch64)
//! ```
//!
//! A [`Pagemap`] is one address space. Its [`Dcache`] answers 4 KiB lookups
//! without walking; everything else goes to the walker, which may allocate
//! intermediate tables from its frame source.
//!
//! The façade holds no lock of its own. The dcache locks internally; callers
//! serialize concurrent writers of the same page tables.

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

pub mod dcache;
mod error;
mod gvm;
mod pagemap;

pub use dcache::{Dcache, DcacheError};
pub use error::GvmError;
pub use gvm::Gvm;
pub use pagemap::Pagemap;
