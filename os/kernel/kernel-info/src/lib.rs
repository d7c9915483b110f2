//! # Kernel Configuration
//!
//! This crate is the single source of truth for the kernel's virtual memory
//! layout. Subsystems that need to know where a region begins (the page-table
//! dump, the allocators, the linker configuration) read the constants in
//! [`memory`] instead of repeating magic numbers.
//!
//! ## Virtual Memory Architecture
//!
//! The kernel runs with the AArch64 48-bit, 4 KiB granule translation regime.
//! `TTBR1_EL1` translates the upper half of the address space:
//!
//! ```text
//! VMALLOC_START  0xffff_0000_0000_0000 ┌──────────────────────────────┐
//!                                      │   vmalloc() area             │
//! VMALLOC_END    0xffff_7dff_bfff_0000 ├──────────────────────────────┤
//!                                      │   guard (64 KiB)             │
//! VMEMMAP_START  0xffff_7dff_c000_0000 ├──────────────────────────────┤
//!                                      │   vmemmap (2 TiB)            │
//! VMEMMAP_END    0xffff_7fff_c000_0000 ├──────────────────────────────┤
//!                                      │   unused                     │
//! PCI_IO_START   0xffff_7fff_fae0_0000 ├──────────────────────────────┤
//!                                      │   PCI I/O window (16 MiB)    │
//! PCI_IO_END     0xffff_7fff_fbe0_0000 ├──────────────────────────────┤
//!                                      │   guard (2 MiB)              │
//! MODULES_VADDR  0xffff_7fff_fc00_0000 ├──────────────────────────────┤
//!                                      │   modules (64 MiB)           │
//! PAGE_OFFSET    0xffff_8000_0000_0000 ├──────────────────────────────┤
//!                                      │   linear map of RAM          │
//!                0xffff_ffff_ffff_ffff └──────────────────────────────┘
//! ```
//!
//! All layout constants are `const` values; compile-time assertions in
//! [`memory`] reject overlapping or misordered regions.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod memory;
