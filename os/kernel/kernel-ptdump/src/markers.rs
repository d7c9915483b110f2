//! # Address markers
//!
//! Named boundaries of the kernel address space. The dump prints a
//! `---[ name ]---` header whenever the walk enters the region that starts at
//! a marker, and never merges a range across one.

use kernel_info::memory::{
    MODULES_VADDR, PAGE_OFFSET, PCI_IO_END, PCI_IO_START, VMALLOC_END, VMALLOC_START,
    VMEMMAP_END, VMEMMAP_START,
};

/// Start of a named region.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct AddressMarker {
    pub start_address: u64,
    pub name: &'static str,
}

impl AddressMarker {
    #[must_use]
    pub const fn new(start_address: u64, name: &'static str) -> Self {
        Self {
            start_address,
            name,
        }
    }
}

/// Regions of the kernel half, ascending.
pub const KERNEL_MARKERS: [AddressMarker; 8] = [
    AddressMarker::new(VMALLOC_START, "vmalloc() Area"),
    AddressMarker::new(VMALLOC_END, "vmalloc() End"),
    AddressMarker::new(VMEMMAP_START, "vmemmap Area(2TB)"),
    AddressMarker::new(VMEMMAP_END, "vmemmap End"),
    AddressMarker::new(PCI_IO_START, "PCI I/O space start"),
    AddressMarker::new(PCI_IO_END, "PCI I/O space end"),
    AddressMarker::new(MODULES_VADDR, "Modules"),
    AddressMarker::new(PAGE_OFFSET, "Kernel Mapping"),
];

/// Whether `markers` is strictly increasing by start address.
#[must_use]
pub const fn is_strictly_ascending(markers: &[AddressMarker]) -> bool {
    let mut i = 1;
    while i < markers.len() {
        if markers[i - 1].start_address >= markers[i].start_address {
            return false;
        }
        i += 1;
    }
    true
}

const _: () = assert!(is_strictly_ascending(&KERNEL_MARKERS));

/// Position of a walk within a marker list.
///
/// The cursor starts at the first marker. There is no sentinel entry: past the
/// last marker, [`next_start`](Self::next_start) reports `u64::MAX`, which no
/// address handed to the dump can reach.
#[derive(Clone, Debug)]
pub struct MarkerCursor<'a> {
    markers: &'a [AddressMarker],
    index: usize,
}

impl<'a> MarkerCursor<'a> {
    #[must_use]
    pub const fn new(markers: &'a [AddressMarker]) -> Self {
        Self { markers, index: 0 }
    }

    /// The marker whose region the walk is currently in.
    #[must_use]
    pub fn current(&self) -> Option<&'a AddressMarker> {
        self.markers.get(self.index)
    }

    /// Start of the following region, or `u64::MAX` if there is none.
    #[must_use]
    pub fn next_start(&self) -> u64 {
        self.markers
            .get(self.index + 1)
            .map_or(u64::MAX, |m| m.start_address)
    }

    /// Whether `addr` lies at or beyond the following region's start.
    #[inline]
    #[must_use]
    pub fn reached_next(&self, addr: u64) -> bool {
        self.index + 1 < self.markers.len() && addr >= self.next_start()
    }

    /// Move into the following region and return its marker.
    pub fn advance(&mut self) -> Option<&'a AddressMarker> {
        if self.index + 1 < self.markers.len() {
            self.index += 1;
            self.current()
        } else {
            None
        }
    }
}
