use kernel_info::memory::{MODULES_VADDR, PAGE_OFFSET, VMALLOC_START};
use kernel_ptdump::debugfs::{Caller, DebugFs, DebugFsError};
use kernel_ptdump::markers::{AddressMarker, KERNEL_MARKERS};
use kernel_ptdump::{
    Descriptor, DescriptorKind, DumpLayout, Level, PMD_SECT_AF, PMD_SECT_PXN, PMD_SECT_S,
    PMD_SECT_UXN, PTDUMP_FILE_NAME, PTE_AF, PTE_PXN, PTE_RDONLY, PTE_SHARED_INNER, PTE_USER,
    PTE_UXN, PageTableDump, PhysMapper, PhysicalAddress, TranslationTable, VirtualAddress,
    ptdump_init,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

const PAGE: u64 = 4096;

/// Physical address of frame 0 of the test "RAM".
const FRAME_BASE: u64 = 0x4000_0000;

/// Output address used for every mapping; the dump never looks at it.
const TARGET: PhysicalAddress = PhysicalAddress::new(0x8000_0000);

/// Translation tables backed by heap frames. Frame `i` lives at `FRAME_BASE + i * 4096`.
struct TestPhys {
    frames: Vec<Box<TranslationTable>>,
    lookups: AtomicUsize,
}

impl TestPhys {
    fn new() -> Self {
        Self {
            frames: vec![Box::new(TranslationTable::zeroed())],
            lookups: AtomicUsize::new(0),
        }
    }

    fn root(&self) -> PhysicalAddress {
        PhysicalAddress::new(FRAME_BASE)
    }

    fn frame_index(pa: PhysicalAddress) -> usize {
        ((pa.as_u64() - FRAME_BASE) / PAGE) as usize
    }

    fn slot(va: u64, level: Level) -> usize {
        ((va >> level.shift()) & 0x1ff) as usize
    }

    fn alloc(&mut self) -> PhysicalAddress {
        self.frames.push(Box::new(TranslationTable::zeroed()));
        PhysicalAddress::new(FRAME_BASE + (self.frames.len() as u64 - 1) * PAGE)
    }

    /// Frame index of the table at `target` covering `va`, creating missing tables.
    fn table_for(&mut self, va: u64, target: Level) -> usize {
        let mut idx = 0;
        let mut level = Level::Root;
        while level != target {
            let slot = Self::slot(va, level);
            idx = match self.frames[idx].get(slot).kind(level) {
                DescriptorKind::Table(pa) => Self::frame_index(pa),
                _ => {
                    let pa = self.alloc();
                    self.frames[idx].set(slot, Descriptor::table_at(pa));
                    Self::frame_index(pa)
                }
            };
            level = level.next().expect("target level below root");
        }
        idx
    }

    fn map_pages(&mut self, va: u64, count: u64, attrs: u64) {
        for i in 0..count {
            let va = va + i * PAGE;
            let t = self.table_for(va, Level::Leaf);
            self.frames[t].set(Self::slot(va, Level::Leaf), Descriptor::page_at(TARGET, attrs));
        }
    }

    fn map_block(&mut self, va: u64, level: Level, attrs: u64) {
        let t = self.table_for(va, level);
        self.frames[t].set(Self::slot(va, level), Descriptor::block_at(TARGET, attrs));
    }

    fn into_dump(self, layout: DumpLayout) -> PageTableDump<Self> {
        let root = self.root();
        // SAFETY: every table descriptor was created by `table_for` and points into `frames`.
        unsafe { PageTableDump::new(self, root, layout) }
    }
}

impl PhysMapper for TestPhys {
    unsafe fn phys_to_ref<'a, T>(&self, pa: PhysicalAddress) -> &'a T {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        let table: *const TranslationTable = &*self.frames[Self::frame_index(pa)];
        // SAFETY: the frame is owned by `self`; callers only request `TranslationTable`.
        unsafe { &*table.cast::<T>() }
    }
}

/// Shares one `TestPhys` between a registered dump and the test body.
struct SharedPhys(Arc<TestPhys>);

impl PhysMapper for SharedPhys {
    unsafe fn phys_to_ref<'a, T>(&self, pa: PhysicalAddress) -> &'a T {
        unsafe { self.0.phys_to_ref(pa) }
    }
}

fn report(dump: &PageTableDump<TestPhys>) -> String {
    let mut out = String::new();
    dump.dump(&mut out).unwrap();
    out
}

fn range_lines(report: &str) -> Vec<&str> {
    report.lines().filter(|l| l.starts_with("0x")).collect()
}

fn parse_range(line: &str) -> (u64, u64) {
    let start = u64::from_str_radix(&line[2..18], 16).unwrap();
    let end = u64::from_str_radix(&line[21..37], 16).unwrap();
    (start, end)
}

fn headers(report: &str) -> Vec<&str> {
    report.lines().filter(|l| l.starts_with("---[")).collect()
}

#[test]
fn empty_tables_print_only_region_headers() {
    let dump = TestPhys::new().into_dump(DumpLayout::kernel());
    let out = report(&dump);
    assert_eq!(
        out.lines().collect::<Vec<_>>(),
        [
            "---[ vmalloc() Area ]---",
            "---[ vmalloc() End ]---",
            "---[ vmemmap Area(2TB) ]---",
            "---[ vmemmap End ]---",
            "---[ PCI I/O space start ]---",
            "---[ PCI I/O space end ]---",
            "---[ Modules ]---",
            "---[ Kernel Mapping ]---",
        ]
    );
}

#[test]
fn four_identical_pages_collapse_into_one_line() {
    let a = VMALLOC_START + 0x800_0000;
    let mut phys = TestPhys::new();
    phys.map_pages(a, 4, PTE_USER | PTE_RDONLY);
    let out = report(&phys.into_dump(DumpLayout::kernel()));

    let ranges = range_lines(&out);
    assert_eq!(ranges.len(), 1);
    assert_eq!(
        ranges[0].trim_end(),
        "0xffff000008000000-0xffff000008004000          16K USR ro"
    );
    assert_eq!(headers(&out).len(), KERNEL_MARKERS.len());
}

#[test]
fn sections_merge_and_render_section_columns() {
    let attrs = PMD_SECT_S | PMD_SECT_AF | PMD_SECT_PXN | PMD_SECT_UXN;
    let mut phys = TestPhys::new();
    phys.map_block(PAGE_OFFSET, Level::Middle, attrs);
    phys.map_block(PAGE_OFFSET + (2 << 20), Level::Middle, attrs);
    let out = report(&phys.into_dump(DumpLayout::kernel()));

    let ranges = range_lines(&out);
    assert_eq!(ranges.len(), 1);
    assert!(ranges[0].starts_with("0xffff800000000000-0xffff800000400000           4M"));
    assert!(ranges[0].ends_with(" RW SHD AF    PXN UXN"));

    let lines: Vec<_> = out.lines().collect();
    let pos = lines.iter().position(|l| *l == ranges[0]).unwrap();
    assert_eq!(lines[pos - 1], "---[ Kernel Mapping ]---");
}

#[test]
fn sections_and_pages_with_equal_bits_stay_apart() {
    let mut phys = TestPhys::new();
    phys.map_block(PAGE_OFFSET, Level::Middle, PMD_SECT_AF);
    phys.map_pages(PAGE_OFFSET + (2 << 20), 2, PTE_AF);
    let out = report(&phys.into_dump(DumpLayout::kernel()));

    let ranges = range_lines(&out);
    assert_eq!(ranges.len(), 2);
    assert!(ranges[0].starts_with("0xffff800000000000-0xffff800000200000           2M"));
    assert!(ranges[1].starts_with("0xffff800000200000-0xffff800000202000           8K"));
}

#[test]
fn upper_level_blocks_carry_no_decodable_bits() {
    let mut phys = TestPhys::new();
    phys.map_block(PAGE_OFFSET, Level::Upper, PTE_AF | PTE_UXN);
    let out = report(&phys.into_dump(DumpLayout::kernel()));
    assert!(range_lines(&out).is_empty());
}

#[test]
fn ranges_never_merge_across_a_marker() {
    let start = MODULES_VADDR - 2 * PAGE;
    let mut phys = TestPhys::new();
    phys.map_pages(start, 4, PTE_AF | PTE_SHARED_INNER | PTE_UXN);
    let out = report(&phys.into_dump(DumpLayout::kernel()));

    let lines: Vec<_> = out.lines().collect();
    let modules = lines.iter().position(|l| *l == "---[ Modules ]---").unwrap();
    assert!(lines[modules - 1].starts_with("0xffff7ffffbffe000-0xffff7ffffc000000           8K"));
    assert!(lines[modules + 1].starts_with("0xffff7ffffc000000-0xffff7ffffc002000           8K"));
}

#[test]
fn ranges_are_ordered_and_disjoint() {
    let mut phys = TestPhys::new();
    phys.map_pages(VMALLOC_START + 0x1000_0000, 3, PTE_AF | PTE_UXN);
    phys.map_pages(VMALLOC_START + 0x1000_3000, 1, PTE_AF | PTE_RDONLY | PTE_UXN);
    phys.map_pages(VMALLOC_START + 0x1000_5000, 2, PTE_AF | PTE_UXN);
    phys.map_pages(MODULES_VADDR, 16, PTE_AF | PTE_PXN);
    phys.map_block(PAGE_OFFSET + (4 << 20), Level::Middle, PMD_SECT_AF | PMD_SECT_UXN);
    phys.map_pages(PAGE_OFFSET + (6 << 20), 1, PTE_AF | PTE_USER);
    let out = report(&phys.into_dump(DumpLayout::kernel()));

    let ranges: Vec<_> = range_lines(&out).into_iter().map(parse_range).collect();
    assert_eq!(ranges.len(), 6);
    for (start, end) in &ranges {
        assert!(start < end);
    }
    for pair in ranges.windows(2) {
        assert!(pair[0].1 <= pair[1].0, "{pair:x?} overlap or are out of order");
    }
}

#[test]
fn every_marker_header_appears_once_before_its_ranges() {
    let mut phys = TestPhys::new();
    phys.map_pages(VMALLOC_START + 0x1000_0000, 1, PTE_AF);
    phys.map_pages(MODULES_VADDR + 0x10_0000, 1, PTE_AF);
    phys.map_pages(PAGE_OFFSET + 0x10_0000, 1, PTE_AF);
    let out = report(&phys.into_dump(DumpLayout::kernel()));
    let markers: &[AddressMarker] = &KERNEL_MARKERS;

    let mut current = None;
    for line in out.lines() {
        if let Some(name) = line.strip_prefix("---[ ").and_then(|l| l.strip_suffix(" ]---")) {
            current = markers.iter().find(|m| m.name == name);
            assert!(current.is_some(), "unknown header {line}");
        } else {
            let (start, _) = parse_range(line);
            let marker = current.expect("range before first header");
            assert!(start >= marker.start_address);
        }
    }
    for marker in markers {
        let header = format!("---[ {} ]---", marker.name);
        assert_eq!(out.lines().filter(|l| *l == header).count(), 1);
    }
}

#[test]
fn nothing_below_the_ceiling_is_reported() {
    let ceiling = VMALLOC_START + (1 << 30);
    let mut phys = TestPhys::new();
    phys.map_pages(VMALLOC_START + PAGE, 1, PTE_AF);
    phys.map_pages(ceiling - PAGE, 1, PTE_AF);
    phys.map_pages(ceiling + PAGE, 1, PTE_AF);
    let layout = DumpLayout {
        ceiling: VirtualAddress::new(ceiling),
        ..DumpLayout::kernel()
    };
    let out = report(&phys.into_dump(layout));

    let ranges: Vec<_> = range_lines(&out).into_iter().map(parse_range).collect();
    assert_eq!(ranges, [(ceiling + PAGE, ceiling + 2 * PAGE)]);
    assert!(ranges.iter().all(|(start, _)| *start >= ceiling));
}

#[test]
fn last_page_of_the_address_space_ends_at_zero() {
    let mut phys = TestPhys::new();
    phys.map_pages(u64::MAX - PAGE + 1, 1, PTE_AF | PTE_UXN);
    let out = report(&phys.into_dump(DumpLayout::kernel()));
    let ranges = range_lines(&out);
    assert_eq!(ranges.len(), 1);
    assert!(ranges[0].starts_with("0xfffffffffffff000-0x0000000000000000           4K"));
}

#[test]
fn repeated_dumps_are_identical() {
    let mut phys = TestPhys::new();
    phys.map_pages(VMALLOC_START + 0x20_0000, 8, PTE_AF | PTE_UXN);
    phys.map_block(PAGE_OFFSET, Level::Middle, PMD_SECT_AF);
    let dump = phys.into_dump(DumpLayout::kernel());
    assert_eq!(report(&dump), report(&dump));
}

#[test]
fn registered_file_walks_on_every_read() {
    let mut phys = TestPhys::new();
    phys.map_pages(PAGE_OFFSET, 1, PTE_AF | PTE_UXN);
    let root = phys.root();
    let phys = Arc::new(phys);

    let mut fs = DebugFs::new();
    // SAFETY: `phys` owns every table reachable from `root` and is never mutated.
    let dump = unsafe { PageTableDump::new(SharedPhys(Arc::clone(&phys)), root, DumpLayout::kernel()) };
    ptdump_init(&mut fs, dump).unwrap();

    let first = fs.read(PTDUMP_FILE_NAME, Caller::ROOT).unwrap();
    let after_first = phys.lookups.load(Ordering::Relaxed);
    let second = fs.read(PTDUMP_FILE_NAME, Caller::ROOT).unwrap();
    let after_second = phys.lookups.load(Ordering::Relaxed);

    assert_eq!(first, second);
    assert!(after_first > 0);
    assert_eq!(after_second, 2 * after_first);
    assert_eq!(range_lines(&first).len(), 1);

    assert_eq!(
        fs.read(PTDUMP_FILE_NAME, Caller::new(1000, 1000)),
        Err(DebugFsError::PermissionDenied)
    );
}
