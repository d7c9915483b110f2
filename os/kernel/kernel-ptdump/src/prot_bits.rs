//! # Protection bit decoding
//!
//! Every [`Level`] owns an ordered list of [`ProtBits`] rules. A rule renders
//! its `set` label when `(entry & mask) == value` and its `clear` label (if
//! any) otherwise. Rule order is column order in the dump.
//!
//! The OR of all masks of a level ([`LevelBits::mask`]) selects the bits that
//! make up an entry's *protection snapshot*; two entries with equal snapshots
//! render identically and can be merged into one range.

use crate::descriptor::{
    PMD_SECT_AF, PMD_SECT_NG, PMD_SECT_PXN, PMD_SECT_RDONLY, PMD_SECT_S, PMD_SECT_USER,
    PMD_SECT_UXN, PTE_AF, PTE_CONT, PTE_NG, PTE_PXN, PTE_RDONLY, PTE_SHARED, PTE_SHARED_INNER,
    PTE_SHARED_OUTER, PTE_UXN, PTE_USER,
};
use crate::level::Level;

/// One decoding rule.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ProtBits {
    pub mask: u64,
    pub value: u64,
    pub set: &'static str,
    pub clear: Option<&'static str>,
}

impl ProtBits {
    /// Rule that renders nothing when the bits don't match.
    #[must_use]
    pub const fn flag(mask: u64, value: u64, set: &'static str) -> Self {
        Self {
            mask,
            value,
            set,
            clear: None,
        }
    }

    /// Rule that renders `clear` when the bits don't match.
    #[must_use]
    pub const fn column(mask: u64, value: u64, set: &'static str, clear: &'static str) -> Self {
        Self {
            mask,
            value,
            set,
            clear: Some(clear),
        }
    }

    /// The label for `prot`, if this rule renders one.
    #[inline]
    #[must_use]
    pub const fn label(&self, prot: u64) -> Option<&'static str> {
        if prot & self.mask == self.value {
            Some(self.set)
        } else {
            self.clear
        }
    }
}

/// The decoding rules of one level and their combined mask.
#[derive(Debug)]
pub struct LevelBits {
    bits: &'static [ProtBits],
    mask: u64,
}

impl LevelBits {
    #[must_use]
    pub const fn new(bits: &'static [ProtBits]) -> Self {
        let mut mask = 0;
        let mut i = 0;
        while i < bits.len() {
            mask |= bits[i].mask;
            i += 1;
        }
        Self { bits, mask }
    }

    /// Rules in column order.
    #[inline]
    #[must_use]
    pub const fn bits(&self) -> &'static [ProtBits] {
        self.bits
    }

    /// OR of all rule masks; `0` for levels without rules.
    #[inline]
    #[must_use]
    pub const fn mask(&self) -> u64 {
        self.mask
    }

    /// Labels for `prot`, in column order.
    pub fn decode(&self, prot: u64) -> impl Iterator<Item = &'static str> {
        self.bits.iter().filter_map(move |rule| rule.label(prot))
    }
}

/// L3 page descriptor rules.
const PTE_BITS: [ProtBits; 9] = [
    ProtBits::column(PTE_USER, PTE_USER, "USR", "   "),
    ProtBits::column(PTE_RDONLY, PTE_RDONLY, "ro", "RW"),
    ProtBits::column(PTE_SHARED, PTE_SHARED_OUTER, "OSHD", "    "),
    ProtBits::column(PTE_SHARED, PTE_SHARED_INNER, "ISHD", "    "),
    ProtBits::flag(PTE_AF, PTE_AF, "AF"),
    ProtBits::flag(PTE_NG, PTE_NG, "nG"),
    ProtBits::flag(PTE_CONT, PTE_CONT, "CONT"),
    ProtBits::flag(PTE_PXN, PTE_PXN, "PXN"),
    ProtBits::flag(PTE_UXN, PTE_UXN, "UXN"),
];

/// L2 section (block) descriptor rules.
const SECTION_BITS: [ProtBits; 7] = [
    ProtBits::column(PMD_SECT_USER, PMD_SECT_USER, "USR", "   "),
    ProtBits::column(PMD_SECT_RDONLY, PMD_SECT_RDONLY, "ro", "RW"),
    ProtBits::column(PMD_SECT_S, PMD_SECT_S, "SHD", "   "),
    ProtBits::column(PMD_SECT_AF, PMD_SECT_AF, "AF", "  "),
    ProtBits::column(PMD_SECT_NG, PMD_SECT_NG, "nG", "  "),
    ProtBits::column(PMD_SECT_PXN, PMD_SECT_PXN, "PXN", "   "),
    ProtBits::column(PMD_SECT_UXN, PMD_SECT_UXN, "UXN", "   "),
];

const ROOT_LEVEL: LevelBits = LevelBits::new(&[]);
const UPPER_LEVEL: LevelBits = LevelBits::new(&[]);
const MIDDLE_LEVEL: LevelBits = LevelBits::new(&SECTION_BITS);
const LEAF_LEVEL: LevelBits = LevelBits::new(&PTE_BITS);

impl Level {
    /// Decoding rules for entries that terminate the walk at this level.
    #[inline]
    #[must_use]
    pub const fn prot_bits(self) -> &'static LevelBits {
        match self {
            Self::Root => &ROOT_LEVEL,
            Self::Upper => &UPPER_LEVEL,
            Self::Middle => &MIDDLE_LEVEL,
            Self::Leaf => &LEAF_LEVEL,
        }
    }

    /// The protection snapshot of a raw entry value at this level.
    #[inline]
    #[must_use]
    pub const fn snapshot(self, value: u64) -> u64 {
        value & self.prot_bits().mask()
    }
}

/// Labels for `value` decoded with the rules of `level`, in column order.
pub fn decode(level: Level, value: u64) -> impl Iterator<Item = &'static str> {
    level.prot_bits().decode(value)
}
