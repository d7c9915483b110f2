//! # Kernel Page Table Dump
//!
//! Read-only inspection of an AArch64 stage-1 translation hierarchy
//! (4 KiB granule, 48-bit VA, four levels). The dump walks every descriptor,
//! merges runs of entries with identical protection into ranges and prints
//! them grouped by named kernel regions:
//!
//! ```text
//! ---[ vmalloc() Area ]---
//! 0xffff000008000000-0xffff000008010000          64K     RW      ISHD AF nG PXN UXN
//! ---[ vmalloc() End ]---
//! ---[ vmemmap Area(2TB) ]---
//! ...
//! ---[ Kernel Mapping ]---
//! 0xffff800000000000-0xffff800000200000           2M     RW SHD AF    PXN UXN
//! ```
//!
//! ## What you get
//! - [`Descriptor`] / [`TranslationTable`]: the raw descriptor format.
//! - [`Level`] with its per-level [`prot_bits`] decoding rules.
//! - [`DumpState`]: the range accumulator, and [`Walker`]: the descent feeding it.
//! - [`PageTableDump`]: a hierarchy + layout, renderable on demand.
//! - [`debugfs`] and [`ptdump_init`]: exposure as the `kernel_page_tables` file.
//!
//! ## Concurrency
//!
//! The walk takes no locks. If the hierarchy can change while it is being
//! dumped, the report may mix old and new entries; callers needing a
//! consistent view must keep the tables stable for the duration of a read.

#![cfg_attr(not(test), no_std)]
#![allow(unsafe_code)]

extern crate alloc;

mod addresses;
pub mod debugfs;
mod descriptor;
mod level;
pub mod markers;
pub mod prot_bits;
mod size;
mod state;
mod walk;

pub use crate::addresses::{PhysicalAddress, VirtualAddress};
use crate::debugfs::{DebugFs, DebugFsError, FileMode, SeqFile, SeqShow};
pub use crate::descriptor::*;
pub use crate::level::{ENTRIES_PER_TABLE, Level};
use crate::markers::{AddressMarker, KERNEL_MARKERS};
pub use crate::size::{HumanSize, SizeUnit};
pub use crate::state::{DumpState, DumpStats};
pub use crate::walk::Walker;
use alloc::boxed::Box;
use core::fmt::{self, Write};
use kernel_info::memory::{USER_PGTABLES_CEILING, VMALLOC_START};
use log::{debug, info, warn};

/// Name of the registry file exposing the kernel tables.
pub const PTDUMP_FILE_NAME: &str = "kernel_page_tables";

/// Mode of [`PTDUMP_FILE_NAME`]: readable by the owner only.
pub const PTDUMP_FILE_MODE: FileMode = FileMode::OWNER_READ;

/// Resolves physical table addresses to readable references.
///
/// In the kernel this goes through the linear map (`PAGE_OFFSET + pa`);
/// tests back it with ordinary heap frames.
pub trait PhysMapper {
    /// Convert a *physical* address to a shared reference in the current address space.
    ///
    /// # Safety
    /// - `pa` must be mapped and hold a valid, properly aligned `T`.
    /// - The memory must not be mutated while the reference lives.
    unsafe fn phys_to_ref<'a, T>(&self, pa: PhysicalAddress) -> &'a T;
}

/// Map a physical translation table frame and return a reference to it.
///
/// # Safety
/// `pa` must point to a live 4 KiB translation table.
#[inline]
unsafe fn get_table<'a, M: PhysMapper + ?Sized>(m: &M, pa: PhysicalAddress) -> &'a TranslationTable {
    unsafe { m.phys_to_ref::<TranslationTable>(pa) }
}

/// Which part of a hierarchy is dumped and how it is labelled.
#[derive(Copy, Clone, Debug)]
pub struct DumpLayout {
    /// Virtual address covered by root slot 0.
    pub base: VirtualAddress,
    /// Entries starting below this address are not reported.
    pub ceiling: VirtualAddress,
    /// Named regions, strictly ascending.
    pub markers: &'static [AddressMarker],
}

impl DumpLayout {
    /// The kernel half as translated by `TTBR1_EL1`.
    #[must_use]
    pub const fn kernel() -> Self {
        Self {
            base: VirtualAddress::new(VMALLOC_START),
            ceiling: VirtualAddress::new(USER_PGTABLES_CEILING),
            markers: &KERNEL_MARKERS,
        }
    }
}

impl Default for DumpLayout {
    fn default() -> Self {
        Self::kernel()
    }
}

/// A translation hierarchy that can be dumped any number of times.
pub struct PageTableDump<M: PhysMapper> {
    mapper: M,
    root: PhysicalAddress,
    layout: DumpLayout,
}

impl<M: PhysMapper> PageTableDump<M> {
    /// Dump the hierarchy whose root table lives at `root`.
    ///
    /// # Safety
    /// - `root` and every table descriptor reachable from it must reference
    ///   a live translation table that `mapper` can resolve.
    /// - This must stay true for as long as the returned value is used.
    #[must_use]
    pub const unsafe fn new(mapper: M, root: PhysicalAddress, layout: DumpLayout) -> Self {
        Self {
            mapper,
            root,
            layout,
        }
    }

    /// Dump the tables currently installed in `TTBR1_EL1` with the kernel layout.
    ///
    /// # Safety
    /// Same requirements as [`PageTableDump::new`]; must run at EL1 with the MMU on.
    #[cfg(target_arch = "aarch64")]
    #[must_use]
    pub unsafe fn from_current(mapper: M) -> Self {
        let root = unsafe { read_ttbr1_phys() };
        unsafe { Self::new(mapper, root, DumpLayout::kernel()) }
    }

    #[must_use]
    pub const fn root(&self) -> PhysicalAddress {
        self.root
    }

    #[must_use]
    pub const fn layout(&self) -> &DumpLayout {
        &self.layout
    }

    /// Walk the hierarchy and write the report into `out`.
    ///
    /// # Errors
    /// Propagates write errors of `out`.
    pub fn dump<W: Write + ?Sized>(&self, out: &mut W) -> Result<DumpStats, fmt::Error> {
        // SAFETY: guaranteed by the contract of `PageTableDump::new`.
        let root = unsafe { get_table(&self.mapper, self.root) };
        let stats = Walker::new(&self.mapper, &self.layout).walk(root, out)?;
        debug!(
            "page table dump: {} entries, {} ranges, {} regions",
            stats.entries, stats.ranges, stats.headers
        );
        Ok(stats)
    }
}

impl<M: PhysMapper + Send + Sync> SeqShow for PageTableDump<M> {
    fn show(&self, seq: &mut SeqFile) -> fmt::Result {
        self.dump(seq).map(|_| ())
    }
}

/// Base address of the table installed in `TTBR1_EL1` (ASID and CnP stripped).
///
/// # Safety
/// Must run at EL1 or higher.
#[cfg(target_arch = "aarch64")]
#[inline]
#[must_use]
pub unsafe fn read_ttbr1_phys() -> PhysicalAddress {
    const TTBR_BADDR_MASK: u64 = 0x0000_ffff_ffff_fffe;
    let ttbr1: u64;
    unsafe {
        core::arch::asm!("mrs {}, ttbr1_el1", out(reg) ttbr1, options(nomem, nostack, preserves_flags));
    }
    PhysicalAddress::new(ttbr1 & TTBR_BADDR_MASK)
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PtDumpError {
    #[error("failed to register kernel_page_tables: {0}")]
    Register(#[from] DebugFsError),
}

/// One-time setup: expose `dump` as [`PTDUMP_FILE_NAME`] in `fs`.
///
/// Each read of the file performs a fresh walk.
///
/// # Errors
/// Returns [`PtDumpError::Register`] if the file cannot be created; the rest
/// of the system is unaffected.
pub fn ptdump_init<M>(fs: &mut DebugFs, dump: PageTableDump<M>) -> Result<(), PtDumpError>
where
    M: PhysMapper + Send + Sync + 'static,
{
    let root = dump.root();
    if let Err(e) = fs.create_file(PTDUMP_FILE_NAME, PTDUMP_FILE_MODE, Box::new(dump)) {
        warn!("ptdump: cannot expose {PTDUMP_FILE_NAME}: {e}");
        return Err(e.into());
    }
    info!("ptdump: exposing tables rooted at {root} as {PTDUMP_FILE_NAME}");
    Ok(())
}
