//! # Memory Layout

/// Number of virtual address bits translated by `TTBR1_EL1`.
pub const VA_BITS: u32 = 48;

/// Base translation granule.
pub const PAGE_SIZE: u64 = 4096;

/// First address of the kernel half; also the start of the vmalloc area.
pub const VA_START: u64 = !((1u64 << VA_BITS) - 1);

/// Start of the `vmalloc()` area.
pub const VMALLOC_START: u64 = VA_START;

/// End of the `vmalloc()` area (exclusive), followed by a 64 KiB guard.
pub const VMALLOC_END: u64 = VMEMMAP_START - 0x1_0000;

/// Size of the `struct page` array covering the linear map.
pub const VMEMMAP_SIZE: u64 = 2 << 40; // 2 TiB

/// Start of the virtual memory map (`struct page` array).
pub const VMEMMAP_START: u64 = 0xffff_7dff_c000_0000;

/// End of the virtual memory map (exclusive).
pub const VMEMMAP_END: u64 = VMEMMAP_START + VMEMMAP_SIZE;

/// Start of the PCI I/O port window.
pub const PCI_IO_START: u64 = PCI_IO_END - 0x100_0000; // 16 MiB

/// End of the PCI I/O port window (exclusive), followed by a 2 MiB guard.
pub const PCI_IO_END: u64 = MODULES_VADDR - 0x20_0000;

/// Start of the loadable modules area.
pub const MODULES_VADDR: u64 = MODULES_END - 0x400_0000; // 64 MiB

/// End of the loadable modules area (exclusive).
pub const MODULES_END: u64 = PAGE_OFFSET;

/// Start of the linear map of physical memory.
pub const PAGE_OFFSET: u64 = 0xffff_8000_0000_0000;

/// Addresses below this value belong to user page tables and are never
/// reported by kernel page-table inspection.
///
/// With split `TTBR0`/`TTBR1` translation the user half lives in an entirely
/// separate table, so the kernel tables start reporting at [`VA_START`].
pub const USER_PGTABLES_CEILING: u64 = VA_START;

const _: () = {
    assert!(VA_START == 0xffff_0000_0000_0000);
    assert!(VMALLOC_START < VMALLOC_END);
    assert!(VMALLOC_END < VMEMMAP_START);
    assert!(VMEMMAP_END < PCI_IO_START);
    assert!(PCI_IO_END < MODULES_VADDR);
    assert!(MODULES_END == PAGE_OFFSET);
    assert!(PAGE_OFFSET.is_multiple_of(PAGE_SIZE));
    assert!(USER_PGTABLES_CEILING <= VMALLOC_START);
};
