//! # AArch64 stage-1 descriptors
//!
//! - [`Descriptor`]: one 64-bit entry, in its raw bitfield form.
//! - [`DescriptorKind`]: what a descriptor means at a given [`Level`].
//! - [`TranslationTable`]: a 4 KiB-aligned array of 512 descriptors.
//!
//! ## Bit layout (4 KiB granule, 48-bit output addresses)
//!
//! | Bits   | Name      | Meaning |
//! |--------|-----------|---------|
//! | 0      | valid     | Entry is in use |
//! | 1      | table     | L0–L2: next-level table; L3: page (must be 1) |
//! | 2–4    | AttrIndx  | Index into `MAIR_EL1` |
//! | 5      | NS        | Non-secure output address |
//! | 6      | AP\[1\]   | Accessible from EL0 |
//! | 7      | AP\[2\]   | Read-only |
//! | 8–9    | SH        | Shareability (`0b10` outer, `0b11` inner) |
//! | 10     | AF        | Access flag |
//! | 11     | nG        | Not global (ASID tagged) |
//! | 12–47  | OA        | Output address \[47:12\] |
//! | 52     | CONT      | Contiguous hint |
//! | 53     | PXN       | Privileged execute-never |
//! | 54     | UXN       | Unprivileged execute-never |
//! | 55–58  | SW        | Reserved for software |
//!
//! The attribute bits (2..11, 52..54) have the same positions in block and
//! page descriptors; table descriptors ignore them.

use crate::addresses::PhysicalAddress;
use crate::level::{ENTRIES_PER_TABLE, Level};
use bitfield_struct::bitfield;

/// AP\[1\]: accessible from EL0.
pub const PTE_USER: u64 = 1 << 6;
/// AP\[2\]: read-only.
pub const PTE_RDONLY: u64 = 1 << 7;
/// SH\[1:0\] field.
pub const PTE_SHARED: u64 = 3 << 8;
/// SH value for outer shareable.
pub const PTE_SHARED_OUTER: u64 = 2 << 8;
/// SH value for inner shareable.
pub const PTE_SHARED_INNER: u64 = 3 << 8;
/// Access flag.
pub const PTE_AF: u64 = 1 << 10;
/// Not global.
pub const PTE_NG: u64 = 1 << 11;
/// Contiguous hint.
pub const PTE_CONT: u64 = 1 << 52;
/// Privileged execute-never.
pub const PTE_PXN: u64 = 1 << 53;
/// Unprivileged execute-never.
pub const PTE_UXN: u64 = 1 << 54;

/// Section (block) attribute bits; same positions as for pages.
pub const PMD_SECT_USER: u64 = PTE_USER;
pub const PMD_SECT_RDONLY: u64 = PTE_RDONLY;
pub const PMD_SECT_S: u64 = PTE_SHARED_INNER;
pub const PMD_SECT_AF: u64 = PTE_AF;
pub const PMD_SECT_NG: u64 = PTE_NG;
pub const PMD_SECT_PXN: u64 = PTE_PXN;
pub const PMD_SECT_UXN: u64 = PTE_UXN;

/// A single translation table descriptor.
///
/// The same layout is used at every level; [`Descriptor::kind`] interprets
/// it for a concrete [`Level`]. Only read accessors matter for inspection,
/// the `with_*` builders exist to assemble tables in tests and boot code.
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct Descriptor {
    /// **Valid** (bit 0).
    pub valid: bool,

    /// **Table / page** (bit 1).
    ///
    /// At L0–L2 a set bit means the entry points to a next-level table,
    /// a clear bit means block. At L3 it must be set for a valid page.
    pub table: bool,

    /// **AttrIndx** (bits 2..4): memory attribute index into `MAIR_EL1`.
    #[bits(3)]
    pub attr_index: u8,

    /// **NS** (bit 5).
    pub non_secure: bool,

    /// **AP\[1\]** (bit 6): EL0 access.
    pub user: bool,

    /// **AP\[2\]** (bit 7): read-only.
    pub read_only: bool,

    /// **SH** (bits 8..9).
    #[bits(2)]
    pub shareability: u8,

    /// **AF** (bit 10).
    pub accessed: bool,

    /// **nG** (bit 11).
    pub not_global: bool,

    /// Output address bits 47..12.
    #[bits(36)]
    output_address_47_12: u64,

    #[bits(4)]
    __res0: u8,

    /// **Contiguous** hint (bit 52).
    pub contiguous: bool,

    /// **PXN** (bit 53).
    pub privileged_execute_never: bool,

    /// **UXN** (bit 54).
    pub user_execute_never: bool,

    /// Software-defined bits 55..58.
    #[bits(4)]
    pub software: u8,

    #[bits(5)]
    __ignored: u8,
}

/// Interpretation of a [`Descriptor`] at a particular [`Level`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DescriptorKind {
    /// Not valid (or a reserved encoding); maps nothing.
    Invalid,
    /// Points to the next-level table at this physical address.
    Table(PhysicalAddress),
    /// Maps a whole L1/L2 span starting at this physical address.
    Block(PhysicalAddress),
    /// Maps one 4 KiB page at this physical address.
    Page(PhysicalAddress),
}

impl Descriptor {
    /// An empty (invalid) descriptor.
    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self::new()
    }

    /// Physical output address (next table, block or page base).
    #[inline]
    #[must_use]
    pub const fn output_address(self) -> PhysicalAddress {
        PhysicalAddress::new(self.output_address_47_12() << 12)
    }

    /// Replace the output address; the low 12 bits of `pa` are dropped.
    #[inline]
    #[must_use]
    pub const fn with_output_address(self, pa: PhysicalAddress) -> Self {
        self.with_output_address_47_12(pa.as_u64() >> 12)
    }

    /// A valid table descriptor pointing at `next`.
    #[inline]
    #[must_use]
    pub const fn table_at(next: PhysicalAddress) -> Self {
        Self::new()
            .with_valid(true)
            .with_table(true)
            .with_output_address(next)
    }

    /// A valid L1/L2 block descriptor for `pa`, carrying the attribute bits of `attrs`.
    #[inline]
    #[must_use]
    pub const fn block_at(pa: PhysicalAddress, attrs: u64) -> Self {
        Self::from_bits(attrs)
            .with_valid(true)
            .with_table(false)
            .with_output_address(pa)
    }

    /// A valid L3 page descriptor for `pa`, carrying the attribute bits of `attrs`.
    #[inline]
    #[must_use]
    pub const fn page_at(pa: PhysicalAddress, attrs: u64) -> Self {
        Self::from_bits(attrs)
            .with_valid(true)
            .with_table(true)
            .with_output_address(pa)
    }

    /// Decode this descriptor as found in a table at `level`.
    #[must_use]
    pub const fn kind(self, level: Level) -> DescriptorKind {
        if !self.valid() {
            return DescriptorKind::Invalid;
        }
        let pa = self.output_address();
        match (level, self.table()) {
            (Level::Leaf, true) => DescriptorKind::Page(pa),
            (Level::Leaf, false) => DescriptorKind::Invalid,
            (_, true) => DescriptorKind::Table(pa),
            (level, false) if level.allows_block() => DescriptorKind::Block(pa),
            (_, false) => DescriptorKind::Invalid,
        }
    }
}

/// One translation table: 512 descriptors, 4 KiB aligned.
#[repr(C, align(4096))]
pub struct TranslationTable {
    entries: [Descriptor; ENTRIES_PER_TABLE],
}

impl TranslationTable {
    /// A table with every slot invalid.
    #[inline]
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            entries: [Descriptor::zero(); ENTRIES_PER_TABLE],
        }
    }

    /// Read the descriptor at `index`.
    ///
    /// # Panics
    /// If `index >= 512`.
    #[inline]
    #[must_use]
    pub const fn get(&self, index: usize) -> Descriptor {
        self.entries[index]
    }

    /// Overwrite the descriptor at `index`.
    ///
    /// # Panics
    /// If `index >= 512`.
    #[inline]
    pub fn set(&mut self, index: usize, entry: Descriptor) {
        self.entries[index] = entry;
    }

    /// All descriptors in index order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = Descriptor> + '_ {
        self.entries.iter().copied()
    }
}

const _: () = {
    assert!(core::mem::size_of::<Descriptor>() == 8);
    assert!(core::mem::size_of::<TranslationTable>() == 4096);
};
