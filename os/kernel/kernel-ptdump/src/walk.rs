//! # Hierarchy walk
//!
//! Depth-first descent over the four translation levels. Table descriptors
//! recurse; every other slot (block, page, invalid) is a terminal entry fed to
//! the [`DumpState`] together with the virtual address its span starts at.
//!
//! Slots whose span lies entirely below the layout's ceiling are skipped
//! without descending; terminal entries starting below it are not reported.

use crate::addresses::VirtualAddress;
use crate::descriptor::{DescriptorKind, TranslationTable};
use crate::level::{ENTRIES_PER_TABLE, Level};
use crate::state::{DumpState, DumpStats};
use crate::{DumpLayout, PhysMapper, get_table};
use core::fmt::{self, Write};
use log::trace;

/// Walks one translation hierarchy.
pub struct Walker<'a, M: PhysMapper> {
    mapper: &'a M,
    layout: &'a DumpLayout,
}

impl<'a, M: PhysMapper> Walker<'a, M> {
    #[must_use]
    pub const fn new(mapper: &'a M, layout: &'a DumpLayout) -> Self {
        Self { mapper, layout }
    }

    /// First address past the space covered by a root table based at the layout's base.
    #[must_use]
    pub const fn end(&self) -> VirtualAddress {
        self.layout
            .base
            .wrapping_add(ENTRIES_PER_TABLE as u64 * Level::Root.span())
    }

    /// Dump the hierarchy rooted at `root` into `out`.
    ///
    /// # Errors
    /// Propagates write errors of `out`.
    pub fn walk<W: Write + ?Sized>(
        &self,
        root: &TranslationTable,
        out: &mut W,
    ) -> Result<DumpStats, fmt::Error> {
        let mut st = DumpState::new(out, self.layout.markers);
        self.walk_table(&mut st, root, Level::Root, self.layout.base)?;
        st.finish(self.end())
    }

    fn walk_table<W: Write + ?Sized>(
        &self,
        st: &mut DumpState<'_, '_, W>,
        table: &TranslationTable,
        level: Level,
        base: VirtualAddress,
    ) -> fmt::Result {
        let ceiling = self.layout.ceiling.as_u64();
        let span = level.span();

        for (index, entry) in table.iter().enumerate() {
            let addr = base.wrapping_add(index as u64 * span);
            if addr.as_u64().checked_add(span).is_some_and(|end| end <= ceiling) {
                continue;
            }

            match (entry.kind(level), level.next()) {
                (DescriptorKind::Table(next), Some(next_level)) => {
                    trace!("descending into {next_level:?} table at {next} for {addr}");
                    // SAFETY: `PageTableDump::new` requires every table descriptor
                    // reachable from the root to reference a live table.
                    let next_table = unsafe { get_table(self.mapper, next) };
                    self.walk_table(st, next_table, next_level, addr)?;
                }
                _ if addr.as_u64() < ceiling => {}
                _ => st.note_page(addr, level, entry.into_bits())?,
            }
        }
        Ok(())
    }
}
