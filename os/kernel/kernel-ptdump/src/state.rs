//! # Range accumulation
//!
//! [`DumpState`] turns the stream of terminal entries produced by the walk
//! into report lines. It keeps exactly one *open* range (start, level,
//! protection snapshot) and extends it for as long as the incoming entries
//! look the same. Anything else closes the range:
//!
//! - a different protection snapshot,
//! - a different level (a 2 MiB block next to 4 KiB pages),
//! - reaching the start of the next [`AddressMarker`] region.
//!
//! Closing prints one line unless the snapshot was zero, so long unmapped
//! stretches stay silent while region headers are still emitted.
//!
//! ```text
//! ---[ Modules ]---
//! 0xffff7ffffc000000-0xffff7ffffc010000          64K     RW      ISHD AF UXN
//! ```

use crate::addresses::VirtualAddress;
use crate::level::Level;
use crate::markers::{AddressMarker, MarkerCursor};
use crate::size::HumanSize;
use core::fmt::{self, Write};

/// The range currently being accumulated.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct OpenRange {
    start: VirtualAddress,
    level: Level,
    prot: u64,
}

/// Line counters of a finished dump.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct DumpStats {
    /// Terminal entries fed to the accumulator.
    pub entries: usize,
    /// Range lines printed.
    pub ranges: usize,
    /// Region header lines printed.
    pub headers: usize,
}

/// Accumulator state of one dump.
///
/// Owned by a single walk and handed down the recursion by `&mut`. The
/// state is closed until the first entry arrives and after [`finish`](Self::finish).
pub struct DumpState<'w, 'm, W: Write + ?Sized> {
    out: &'w mut W,
    markers: MarkerCursor<'m>,
    open: Option<OpenRange>,
    stats: DumpStats,
}

impl<'w, 'm, W: Write + ?Sized> DumpState<'w, 'm, W> {
    pub fn new(out: &'w mut W, markers: &'m [AddressMarker]) -> Self {
        Self {
            out,
            markers: MarkerCursor::new(markers),
            open: None,
            stats: DumpStats::default(),
        }
    }

    /// Feed one terminal entry: `value` is the raw descriptor found at `level`
    /// for the range starting at `addr`.
    ///
    /// Entries must arrive in strictly ascending address order.
    ///
    /// # Errors
    /// Propagates write errors of the output sink.
    pub fn note_page(&mut self, addr: VirtualAddress, level: Level, value: u64) -> fmt::Result {
        let prot = level.snapshot(value);
        self.stats.entries += 1;

        let Some(open) = self.open else {
            self.open = Some(OpenRange {
                start: addr,
                level,
                prot,
            });
            if let Some(marker) = self.markers.current() {
                self.print_header(marker)?;
            }
            return self.cross_markers(addr);
        };

        if prot == open.prot && level == open.level && !self.markers.reached_next(addr.as_u64()) {
            return Ok(());
        }

        self.flush(open, addr)?;
        self.cross_markers(addr)?;
        self.open = Some(OpenRange {
            start: addr,
            level,
            prot,
        });
        Ok(())
    }

    /// Close the open range at `end` and return the counters.
    ///
    /// `end` is the first address past the walked space; for a walk reaching
    /// the top of the 64-bit space it is `0`.
    ///
    /// # Errors
    /// Propagates write errors of the output sink.
    pub fn finish(mut self, end: VirtualAddress) -> Result<DumpStats, fmt::Error> {
        if let Some(open) = self.open.take() {
            self.flush(open, end)?;
        }
        Ok(self.stats)
    }

    /// Print the line for `range` ending at `end`, unless nothing is mapped.
    fn flush(&mut self, range: OpenRange, end: VirtualAddress) -> fmt::Result {
        if range.prot == 0 {
            return Ok(());
        }

        let size = HumanSize::from_bytes(end.wrapping_distance_from(range.start));
        write!(self.out, "0x{:016x}-0x{:016x}   {size:>9}", range.start, end)?;
        for label in range.level.prot_bits().decode(range.prot) {
            write!(self.out, " {label}")?;
        }
        self.out.write_char('\n')?;
        self.stats.ranges += 1;
        Ok(())
    }

    /// Enter every region whose start `addr` has reached.
    fn cross_markers(&mut self, addr: VirtualAddress) -> fmt::Result {
        while self.markers.reached_next(addr.as_u64()) {
            if let Some(marker) = self.markers.advance() {
                self.print_header(marker)?;
            }
        }
        Ok(())
    }

    fn print_header(&mut self, marker: &AddressMarker) -> fmt::Result {
        self.stats.headers += 1;
        writeln!(self.out, "---[ {} ]---", marker.name)
    }
}
