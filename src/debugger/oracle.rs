//! The "debug info oracle": a read-only ELF+DWARF query layer. Everything
//! is parsed once in [`Oracle::load`]; every query afterwards is a pure
//! lookup over that parsed state plus a small interior-mutable cache for
//! per-symbol derived facts (a symbol's filepath and source position),
//! following the "cache keyed by symbol identity, not a borrowed pointer"
//! strategy from the design notes.
//!
//! The crate is single-threaded end to end (see the concurrency model), so
//! the DWARF reader type is [`gimli::EndianRcSlice`] rather than the
//! `Arc`-based equivalent — there is never a second thread to share it
//! with.

use crate::debugger::address::{DbgAddr, LoadBias, RealAddr};
use crate::debugger::error::Error;
use crate::debugger::eval::{self, LocPiece, LocRange, Loclist, VarLocation};
use crate::debugger::register::{Register, RegisterSnapshot};
use fallible_iterator::FallibleIterator;
use gimli::{
    AttributeValue, ColumnType, Dwarf, LineProgramHeader, Range, Reader, RunTimeEndian, Unit,
    DW_AT_frame_base, DW_AT_high_pc, DW_AT_location, DW_AT_low_pc, DW_AT_name, DW_TAG_formal_parameter,
    DW_TAG_lexical_block, DW_TAG_subprogram, DW_TAG_variable,
};
use nix::unistd::Pid;
use object::{Object, ObjectSection, ObjectSymbol};
use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::num::NonZeroU64;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// The reader type this crate's whole DWARF layer is built on.
pub type EndianArcSlice = gimli::EndianRcSlice<RunTimeEndian>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Function,
    Object,
    Other,
}

/// A resolved source position; `is_exact` means the query matched without
/// approximating to a nearby line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: u64,
    pub column: u64,
    pub is_exact: bool,
}

/// A row of a compilation unit's line-number program.
#[derive(Debug, Clone)]
pub struct LineEntry {
    pub addr: DbgAddr,
    pub line: u64,
    pub column: u64,
    pub is_new_statement: bool,
    pub is_prologue_end: bool,
    pub filepath: PathBuf,
    pub is_exact: bool,
}

/// A symbol-table entry. Cheap to copy around by reference; filepath and
/// position are memoised on the owning [`Oracle`], keyed by `id`.
#[derive(Debug, Clone)]
pub struct DebugSymbol {
    id: usize,
    name: String,
    specific: Option<DbgAddr>,
    start: DbgAddr,
    end: DbgAddr,
    kind: SymbolKind,
}

impl DebugSymbol {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SymbolKind {
        self.kind
    }

    pub fn addr(&self) -> DbgAddr {
        self.specific.unwrap_or(self.start)
    }

    pub fn start_addr(&self) -> DbgAddr {
        self.start
    }

    pub fn end_addr(&self) -> DbgAddr {
        self.end
    }
}

#[derive(Debug, Default, Clone)]
struct Cached {
    filepath: Option<PathBuf>,
    position: Option<Position>,
}

struct LineRow {
    address: u64,
    file_index: u64,
    line: u64,
    column: u64,
    is_stmt: bool,
    prologue_end: bool,
}

struct Die {
    tag: gimli::DwTag,
    name: Option<String>,
    low_pc: Option<u64>,
    high_pc: Option<u64>,
    depth: u32,
    frame_base: Option<gimli::Attribute<EndianArcSlice>>,
    location: Option<gimli::Attribute<EndianArcSlice>>,
}

struct DieRange {
    begin: u64,
    end: u64,
    die_idx: usize,
}

struct ParsedUnit {
    unit: Unit<EndianArcSlice>,
    files: Vec<PathBuf>,
    lines: Vec<LineRow>,
    ranges: Vec<Range>,
    dies: Vec<Die>,
    die_ranges: Vec<DieRange>,
}

/// The parsed ELF+DWARF view of a single debuggee binary.
pub struct Oracle {
    dwarf: Dwarf<EndianArcSlice>,
    units: Vec<ParsedUnit>,
    symbols: Vec<DebugSymbol>,
    is_dyn: bool,
    cache: RefCell<HashMap<usize, Cached>>,
}

impl Oracle {
    /// Loads and parses `path`. Rejects anything that isn't a 64-bit
    /// little-endian x86-64 ELF object with a distinct error kind, per the
    /// external-interfaces contract.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let file = fs::File::open(path)?;
        // SAFETY: the mapping is read-only and the file is not expected to
        // be modified out from under the debugger for the session's
        // lifetime; this is the same trust boundary every mmap-based ELF
        // reader operates under.
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        let obj = object::File::parse(&*mmap).map_err(|e| Error::Invalid(e.to_string()))?;

        if obj.architecture() != object::Architecture::X86_64 {
            return Err(Error::Unsupported(format!(
                "unsupported architecture: {:?}",
                obj.architecture()
            )));
        }
        let endian = if obj.is_little_endian() {
            RunTimeEndian::Little
        } else {
            return Err(Error::Unsupported("big-endian object".to_string()));
        };
        let is_dyn = obj.kind() == object::ObjectKind::Dynamic;

        let dwarf =
            Dwarf::load(|id| load_section(id, &obj, endian)).map_err(Error::OracleParse)?;

        let symbols = obj
            .symbols()
            .enumerate()
            .filter_map(|(id, sym)| {
                let name = sym.name().ok()?;
                if name.is_empty() {
                    return None;
                }
                let kind = match sym.kind() {
                    object::SymbolKind::Text => SymbolKind::Function,
                    object::SymbolKind::Data => SymbolKind::Object,
                    _ => SymbolKind::Other,
                };
                let start = DbgAddr(sym.address() as usize);
                let end = DbgAddr((sym.address() + sym.size().max(1)) as usize);
                Some(DebugSymbol {
                    id,
                    name: name.to_string(),
                    specific: None,
                    start,
                    end,
                    kind,
                })
            })
            .collect();

        let units = Self::parse_units(&dwarf)?;

        Ok(Self {
            dwarf,
            units,
            symbols,
            is_dyn,
            cache: RefCell::new(HashMap::new()),
        })
    }

    pub fn is_dyn_exec(&self) -> bool {
        self.is_dyn
    }

    pub fn sym_by_name(&self, name: &str) -> Option<&DebugSymbol> {
        self.symbols
            .iter()
            .filter(|s| s.name == name)
            .min_by_key(|s| s.start)
    }

    pub fn sym_by_addr(&self, addr: DbgAddr) -> Option<&DebugSymbol> {
        self.symbols
            .iter()
            .filter(|s| addr.in_range(s.start, s.end))
            .min_by(|a, b| {
                let ra = a.end.0.saturating_sub(a.start.0);
                let rb = b.end.0.saturating_sub(b.start.0);
                ra.cmp(&rb).then(a.start.cmp(&b.start))
            })
    }

    pub fn sym_start_addr(&self, sym: &DebugSymbol) -> DbgAddr {
        sym.start_addr()
    }

    pub fn sym_end_addr(&self, sym: &DebugSymbol) -> DbgAddr {
        sym.end_addr()
    }

    pub fn sym_addr(&self, sym: &DebugSymbol) -> DbgAddr {
        sym.addr()
    }

    pub fn sym_filepath(&self, sym: &DebugSymbol) -> Option<PathBuf> {
        self.ensure_cached(sym);
        self.cache.borrow().get(&sym.id).and_then(|c| c.filepath.clone())
    }

    pub fn sym_position(&self, sym: &DebugSymbol) -> Option<Position> {
        self.ensure_cached(sym);
        self.cache.borrow().get(&sym.id).and_then(|c| c.position)
    }

    fn ensure_cached(&self, sym: &DebugSymbol) {
        if self.cache.borrow().contains_key(&sym.id) {
            return;
        }
        let entry = self.line_entry_from_pc(sym.addr());
        let cached = Cached {
            filepath: entry.as_ref().map(|e| e.filepath.clone()),
            position: entry.map(|e| Position {
                line: e.line,
                column: e.column,
                is_exact: e.addr == sym.addr(),
            }),
        };
        self.cache.borrow_mut().insert(sym.id, cached);
    }

    /// The function's effective start, past the standard prologue: the
    /// first line entry flagged `prologue_end`, or failing that the first
    /// statement after the declaration line.
    pub fn function_start_addr(&self, sym: &DebugSymbol) -> Result<DbgAddr, Error> {
        let unit = self
            .find_unit(sym.start.0 as u64)
            .ok_or_else(|| Error::OracleMiss(sym.name.clone()))?;
        let in_range: Vec<&LineRow> = unit
            .lines
            .iter()
            .filter(|l| l.address >= sym.start.0 as u64 && l.address < sym.end.0 as u64)
            .collect();
        if let Some(pe) = in_range.iter().find(|l| l.prologue_end) {
            return Ok(DbgAddr(pe.address as usize));
        }
        let decl_line = in_range.first().map(|l| l.line);
        let next = in_range.iter().find(|l| Some(l.line) != decl_line);
        next.or_else(|| in_range.first())
            .map(|l| DbgAddr(l.address as usize))
            .ok_or_else(|| Error::OracleMiss(sym.name.clone()))
    }

    pub fn line_entry_from_pc(&self, addr: DbgAddr) -> Option<LineEntry> {
        let unit = self.find_unit(addr.0 as u64)?;
        let pc = addr.0 as u64;
        let pos = match unit.lines.binary_search_by_key(&pc, |l| l.address) {
            Ok(p) => p,
            Err(0) => return None,
            Err(p) => p - 1,
        };
        let row = unit.lines.get(pos)?;
        Some(LineEntry {
            addr: DbgAddr(row.address as usize),
            line: row.line,
            column: row.column,
            is_new_statement: row.is_stmt,
            is_prologue_end: row.prologue_end,
            filepath: unit
                .files
                .get(row.file_index as usize)
                .cloned()
                .unwrap_or_default(),
            is_exact: row.address == pc,
        })
    }

    pub fn line_entry_at(&self, filepath: &str, line: u64) -> Option<LineEntry> {
        let canon = canonicalize(filepath);
        let mut best: Option<(&ParsedUnit, &LineRow)> = None;
        for unit in &self.units {
            for row in &unit.lines {
                let Some(fp) = unit.files.get(row.file_index as usize) else {
                    continue;
                };
                if !paths_match(fp, &canon) {
                    continue;
                }
                if row.line < line {
                    continue;
                }
                if best.map(|(_, b)| row.line < b.line).unwrap_or(true) {
                    best = Some((unit, row));
                }
            }
        }
        let (unit, row) = best?;
        Some(LineEntry {
            addr: DbgAddr(row.address as usize),
            line: row.line,
            column: row.column,
            is_new_statement: row.is_stmt,
            is_prologue_end: row.prologue_end,
            filepath: unit
                .files
                .get(row.file_index as usize)
                .cloned()
                .unwrap_or_default(),
            is_exact: false,
        })
    }

    pub fn for_each_line_in_subprog(
        &self,
        name: &str,
        filepath: &str,
        mut callback: impl FnMut(&LineEntry) -> Result<(), Error>,
    ) -> Result<(), Error> {
        let canon = canonicalize(filepath);
        for unit in &self.units {
            if !unit.files.iter().any(|f| paths_match(f, &canon)) {
                continue;
            }
            for die in unit.dies.iter() {
                if die.tag != DW_TAG_subprogram || die.name.as_deref() != Some(name) {
                    continue;
                }
                let (Some(low), Some(high)) = (die.low_pc, die.high_pc) else {
                    continue;
                };
                for row in unit
                    .lines
                    .iter()
                    .filter(|r| r.address >= low && r.address < high && r.is_stmt)
                {
                    let entry = LineEntry {
                        addr: DbgAddr(row.address as usize),
                        line: row.line,
                        column: row.column,
                        is_new_statement: row.is_stmt,
                        is_prologue_end: row.prologue_end,
                        filepath: unit
                            .files
                            .get(row.file_index as usize)
                            .cloned()
                            .unwrap_or_default(),
                        is_exact: false,
                    };
                    callback(&entry)?;
                }
                return Ok(());
            }
        }
        Err(Error::OracleMiss(format!("{name} in {filepath}")))
    }

    pub fn filepath_from_pc(&self, addr: DbgAddr) -> Option<PathBuf> {
        self.line_entry_from_pc(addr).map(|e| e.filepath)
    }

    pub fn addr_name(&self, addr: DbgAddr) -> Option<String> {
        self.sym_by_addr(addr).map(|s| s.name.clone())
    }

    pub fn addr_position(&self, addr: DbgAddr) -> Option<Position> {
        let e = self.line_entry_from_pc(addr)?;
        Some(Position {
            line: e.line,
            column: e.column,
            is_exact: e.addr == addr,
        })
    }

    pub fn addr_filepath(&self, addr: DbgAddr) -> Option<PathBuf> {
        self.filepath_from_pc(addr)
    }

    pub fn addr_at(&self, filepath: &str, line: u64) -> Result<DbgAddr, Error> {
        self.line_entry_at(filepath, line)
            .map(|e| e.addr)
            .ok_or_else(|| Error::OracleMiss(format!("{filepath}:{line}")))
    }

    /// Resolves `name`'s location list at `pc`, walking the scope tree from
    /// the enclosing subprogram down to the innermost lexical block that
    /// contains `pc`. Inner scopes shadow outer ones of the same name.
    pub fn loclist_for_var(&self, pc: DbgAddr, name: &str) -> Result<Loclist<EndianArcSlice>, Error> {
        let parsed = self
            .find_unit(pc.0 as u64)
            .ok_or_else(|| Error::OracleMiss(name.to_string()))?;
        let pcv = pc.0 as u64;

        let mut best: Option<(u32, &gimli::Attribute<EndianArcSlice>)> = None;
        for (idx, die) in parsed.dies.iter().enumerate() {
            if !matches!(die.tag, DW_TAG_variable | DW_TAG_formal_parameter) {
                continue;
            }
            if die.name.as_deref() != Some(name) {
                continue;
            }
            let Some(loc) = die.location.as_ref() else {
                continue;
            };
            if !scope_chain_contains(parsed, idx, pcv) {
                continue;
            }
            if best.map(|(d, _)| die.depth >= d).unwrap_or(true) {
                best = Some((die.depth, loc));
            }
        }

        let (_, attr) = best.ok_or_else(|| Error::OracleMiss(name.to_string()))?;
        let loclist = self.loclist_from_attr(&parsed.unit, attr)?;
        Ok(Loclist {
            pieces: loclist
                .pieces
                .into_iter()
                .filter(|p| p.range.contains(pc))
                .collect(),
        })
    }

    /// Resolves the current frame base for the subprogram containing `pc`
    /// by evaluating its `DW_AT_frame_base` expression; falls back to the
    /// standard `rbp + 16` CFA approximation when the attribute is absent
    /// (true whenever the function follows the canonical `push rbp; mov
    /// rbp, rsp` prologue).
    pub fn frame_base(
        &self,
        pid: Pid,
        pc: DbgAddr,
        regs: &RegisterSnapshot,
        bias: LoadBias,
    ) -> Result<RealAddr, Error> {
        let default = RealAddr((regs.value(Register::Rbp) as i64 + 16) as usize);
        let Some(parsed) = self.find_unit(pc.0 as u64) else {
            return Ok(default);
        };
        let Some(die) = find_subprogram_die(parsed, pc.0 as u64) else {
            return Ok(default);
        };
        let Some(attr) = die.frame_base.as_ref() else {
            return Ok(default);
        };
        let Some(expr) = attr.exprloc_value() else {
            return Ok(default);
        };
        match eval::evaluate(&expr, parsed.unit.encoding(), pid, regs, RealAddr(0), bias)? {
            VarLocation::Register(r) => Ok(RealAddr(regs.value(r) as usize)),
            VarLocation::MemAddr(a) => Ok(a),
        }
    }

    fn loclist_from_attr(
        &self,
        unit: &Unit<EndianArcSlice>,
        attr: &gimli::Attribute<EndianArcSlice>,
    ) -> Result<Loclist<EndianArcSlice>, Error> {
        if let Some(expr) = attr.exprloc_value() {
            return Ok(Loclist {
                pieces: vec![LocPiece {
                    range: LocRange::everywhere(),
                    expr,
                }],
            });
        }

        let offset = match attr.value() {
            AttributeValue::LocationListsRef(offset) => offset,
            AttributeValue::DebugLocListsIndex(index) => self
                .dwarf
                .locations
                .get_offset(unit.encoding(), unit.loclists_base, index)
                .map_err(Error::from)?,
            _ => {
                return Err(Error::UnsupportedOpcode(
                    "location attribute is neither exprloc nor a location list".to_string(),
                ))
            }
        };

        let mut iter = self
            .dwarf
            .locations
            .locations(
                offset,
                unit.encoding(),
                unit.low_pc,
                &self.dwarf.debug_addr,
                unit.addr_base,
            )
            .map_err(Error::from)?;

        let mut pieces = Vec::new();
        while let Some(entry) = iter.next().map_err(Error::from)? {
            pieces.push(LocPiece {
                range: LocRange {
                    low: DbgAddr(entry.range.begin as usize),
                    high: DbgAddr(entry.range.end as usize),
                    meaningful: true,
                },
                expr: entry.data,
            });
        }
        Ok(Loclist { pieces })
    }

    /// The DWARF encoding (address size, format, version) of the
    /// compilation unit containing `pc`, for evaluating that unit's own
    /// location expressions. Falls back to the conventional 64-bit
    /// little-endian, 32-bit-format, DWARF4 encoding when `pc` doesn't
    /// resolve to any parsed unit.
    pub fn encoding_for_pc(&self, pc: DbgAddr) -> gimli::Encoding {
        self.find_unit(pc.0 as u64)
            .map(|u| u.unit.encoding())
            .unwrap_or(gimli::Encoding {
                address_size: 8,
                format: gimli::Format::Dwarf32,
                version: 4,
            })
    }

    fn find_unit(&self, pc: u64) -> Option<&ParsedUnit> {
        self.units.iter().find(|u| {
            match u.ranges.binary_search_by_key(&pc, |r| r.begin) {
                Ok(_) => true,
                Err(pos) => u.ranges[..pos]
                    .iter()
                    .rev()
                    .any(|r| r.begin <= pc && pc < r.end),
            }
        })
    }

    fn parse_units(dwarf: &Dwarf<EndianArcSlice>) -> Result<Vec<ParsedUnit>, Error> {
        let mut headers = dwarf.units();
        let mut units = Vec::new();
        while let Some(header) = headers.next().map_err(Error::from)? {
            let unit = dwarf.unit(header).map_err(Error::from)?;

            let mut lines = Vec::new();
            let mut files = Vec::new();
            if let Some(ref lp) = unit.line_program {
                files = parse_files(dwarf, &unit, lp.header())?;
                let mut rows = lp.clone().rows();
                while let Some((_, row)) = rows.next_row().map_err(Error::from)? {
                    let column = match row.column() {
                        ColumnType::LeftEdge => 0,
                        ColumnType::Column(c) => c.get(),
                    };
                    lines.push(LineRow {
                        address: row.address(),
                        file_index: row.file_index(),
                        line: row.line().map(NonZeroU64::get).unwrap_or(0),
                        column,
                        is_stmt: row.is_stmt(),
                        prologue_end: row.prologue_end(),
                    });
                }
            }
            lines.sort_by_key(|l| l.address);

            let mut ranges = dwarf.unit_ranges(&unit).map_err(Error::from)?.collect::<Vec<_>>().map_err(Error::from)?;
            ranges.sort_by_key(|r| r.begin);

            let mut dies = Vec::new();
            let mut die_ranges = Vec::new();
            let mut cursor = unit.entries();
            let mut depth: i64 = 0;
            while let Some((delta, entry)) = cursor.next_dfs().map_err(Error::from)? {
                depth += delta;

                let low_pc = match entry.attr_value(DW_AT_low_pc).map_err(Error::from)? {
                    Some(AttributeValue::Addr(v)) => Some(v),
                    Some(AttributeValue::DebugAddrIndex(i)) => {
                        Some(dwarf.address(&unit, i).map_err(Error::from)?)
                    }
                    _ => None,
                };
                let high_pc = match entry.attr_value(DW_AT_high_pc).map_err(Error::from)? {
                    Some(AttributeValue::Addr(v)) => Some(v),
                    Some(AttributeValue::DebugAddrIndex(i)) => {
                        Some(dwarf.address(&unit, i).map_err(Error::from)?)
                    }
                    Some(AttributeValue::Udata(v)) => Some(low_pc.unwrap_or(0) + v),
                    _ => None,
                };
                let name = match entry.attr(DW_AT_name).map_err(Error::from)? {
                    Some(attr) => {
                        let s = dwarf.attr_string(&unit, attr.value()).map_err(Error::from)?;
                        Some(s.to_string_lossy().map_err(Error::from)?.into_owned())
                    }
                    None => None,
                };
                let frame_base = entry.attr(DW_AT_frame_base).map_err(Error::from)?;
                let location = entry.attr(DW_AT_location).map_err(Error::from)?;

                dies.push(Die {
                    tag: entry.tag(),
                    name,
                    low_pc,
                    high_pc,
                    depth: depth.max(0) as u32,
                    frame_base,
                    location,
                });

                if let (Some(lo), Some(hi)) = (low_pc, high_pc) {
                    if matches!(entry.tag(), DW_TAG_subprogram | DW_TAG_lexical_block) {
                        die_ranges.push(DieRange {
                            begin: lo,
                            end: hi,
                            die_idx: dies.len() - 1,
                        });
                    }
                }
            }
            die_ranges.sort_by_key(|dr| dr.begin);

            units.push(ParsedUnit {
                unit,
                files,
                lines,
                ranges,
                dies,
                die_ranges,
            });
        }
        Ok(units)
    }
}

fn find_subprogram_die(parsed: &ParsedUnit, pc: u64) -> Option<&Die> {
    let find_pos = match parsed.die_ranges.binary_search_by_key(&pc, |dr| dr.begin) {
        Ok(p) => p + 1,
        Err(p) => p,
    };
    parsed.die_ranges[..find_pos]
        .iter()
        .rev()
        .find(|dr| {
            parsed.dies[dr.die_idx].tag == DW_TAG_subprogram && dr.begin <= pc && pc < dr.end
        })
        .map(|dr| &parsed.dies[dr.die_idx])
}

/// Whether every subprogram/lexical-block ancestor of `die_idx` (as
/// reconstructed from DFS pre-order depth, without a separately stored
/// tree) contains `pc`. The CU root is always considered active.
fn scope_chain_contains(parsed: &ParsedUnit, die_idx: usize, pc: u64) -> bool {
    let mut want_depth = parsed.dies[die_idx].depth;
    let mut i = die_idx;
    loop {
        if want_depth == 0 {
            return true;
        }
        let parent_idx = (0..i).rev().find(|&j| parsed.dies[j].depth == want_depth - 1);
        let Some(parent_idx) = parent_idx else {
            return false;
        };
        let parent = &parsed.dies[parent_idx];
        if matches!(parent.tag, DW_TAG_subprogram | DW_TAG_lexical_block) {
            match (parent.low_pc, parent.high_pc) {
                (Some(lo), Some(hi)) if pc >= lo && pc < hi => {}
                _ => return false,
            }
        }
        i = parent_idx;
        want_depth = parent.depth;
    }
}

fn load_section(
    id: gimli::SectionId,
    obj: &object::File,
    endian: RunTimeEndian,
) -> gimli::read::Result<EndianArcSlice> {
    let data = obj
        .section_by_name(id.name())
        .and_then(|s| s.uncompressed_data().ok())
        .unwrap_or(Cow::Borrowed(&[]));
    Ok(gimli::EndianRcSlice::new(Rc::from(&*data), endian))
}

fn parse_files(
    dwarf: &Dwarf<EndianArcSlice>,
    unit: &Unit<EndianArcSlice>,
    header: &LineProgramHeader<EndianArcSlice>,
) -> Result<Vec<PathBuf>, Error> {
    let mut files = Vec::new();
    let mut index = 0;
    while let Some(file) = header.file(index) {
        files.push(PathBuf::from(render_file_path(dwarf, unit, &file, header)?));
        index += 1;
    }
    Ok(files)
}

fn render_file_path(
    dwarf: &Dwarf<EndianArcSlice>,
    unit: &Unit<EndianArcSlice>,
    file: &gimli::FileEntry<EndianArcSlice>,
    header: &LineProgramHeader<EndianArcSlice>,
) -> Result<String, Error> {
    let mut path = if let Some(ref comp_dir) = unit.comp_dir {
        comp_dir.to_string_lossy().map_err(Error::from)?.into_owned()
    } else {
        String::new()
    };

    if file.directory_index() != 0 {
        if let Some(directory) = file.directory(header) {
            path_push(
                &mut path,
                dwarf
                    .attr_string(unit, directory)
                    .map_err(Error::from)?
                    .to_string_lossy()
                    .map_err(Error::from)?
                    .as_ref(),
            );
        }
    }

    path_push(
        &mut path,
        dwarf
            .attr_string(unit, file.path_name())
            .map_err(Error::from)?
            .to_string_lossy()
            .map_err(Error::from)?
            .as_ref(),
    );

    Ok(path)
}

fn path_push(path: &mut String, p: &str) {
    if p.starts_with('/') {
        *path = p.to_string();
        return;
    }
    if !path.is_empty() && !path.ends_with('/') {
        path.push('/');
    }
    *path += p;
}

fn canonicalize(filepath: &str) -> PathBuf {
    fs::canonicalize(filepath).unwrap_or_else(|_| PathBuf::from(filepath))
}

fn paths_match(recorded: &Path, canon: &Path) -> bool {
    if let Ok(recorded_canon) = fs::canonicalize(recorded) {
        if recorded_canon == canon {
            return true;
        }
    }
    recorded.file_name().is_some() && recorded.file_name() == canon.file_name()
}
