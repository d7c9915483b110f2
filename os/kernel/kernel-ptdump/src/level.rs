//! # Translation levels
//!
//! The 48-bit, 4 KiB granule regime resolves a virtual address in four steps:
//!
//! ```text
//! | 47‒39 | 38‒30 | 29‒21 | 20‒12 | 11‒0   |
//! |  Root | Upper | Middle|  Leaf | Offset |
//! |  (L0) |  (L1) |  (L2) |  (L3) |        |
//! ```
//!
//! Each level is a table of [`ENTRIES_PER_TABLE`] 64-bit descriptors.

/// Number of descriptors in every translation table.
pub const ENTRIES_PER_TABLE: usize = 512;

/// One level of the translation hierarchy, from the root down.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Level {
    /// L0: each entry covers 512 GiB. Only table descriptors are valid.
    Root,
    /// L1: each entry covers 1 GiB; may hold a 1 GiB block.
    Upper,
    /// L2: each entry covers 2 MiB; may hold a 2 MiB block (section).
    Middle,
    /// L3: each entry maps one 4 KiB page.
    Leaf,
}

impl Level {
    /// All levels in walk order.
    pub const ALL: [Self; 4] = [Self::Root, Self::Upper, Self::Middle, Self::Leaf];

    /// Bit position of the lowest virtual-address bit indexing this level.
    #[inline]
    #[must_use]
    pub const fn shift(self) -> u32 {
        match self {
            Self::Root => 39,
            Self::Upper => 30,
            Self::Middle => 21,
            Self::Leaf => 12,
        }
    }

    /// Bytes of address space covered by a single entry at this level.
    #[inline]
    #[must_use]
    pub const fn span(self) -> u64 {
        1 << self.shift()
    }

    /// The level below, or `None` for [`Level::Leaf`].
    #[inline]
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Root => Some(Self::Upper),
            Self::Upper => Some(Self::Middle),
            Self::Middle => Some(Self::Leaf),
            Self::Leaf => None,
        }
    }

    /// Whether a valid non-table descriptor may map memory directly here.
    #[inline]
    #[must_use]
    pub const fn allows_block(self) -> bool {
        matches!(self, Self::Upper | Self::Middle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spans_nest() {
        for level in Level::ALL {
            if let Some(next) = level.next() {
                assert_eq!(level.span(), next.span() * ENTRIES_PER_TABLE as u64);
            }
        }
        assert_eq!(Level::Leaf.span(), 4096);
        assert_eq!(Level::Middle.span(), 2 << 20);
        assert_eq!(Level::Upper.span(), 1 << 30);
    }

    #[test]
    fn walk_order() {
        assert!(Level::Root < Level::Leaf);
        assert_eq!(Level::Leaf.next(), None);
        assert!(!Level::Root.allows_block());
        assert!(!Level::Leaf.allows_block());
    }
}
