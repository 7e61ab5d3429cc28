//! Module resolution and a process-wide parse cache.
//!
//! Modules are looked up by name against a naming convention: a module
//! named `foo` is expected to live in a file called `foo.sv` somewhere
//! under one of the resolver's search directories. A module named with the
//! `rom_` prefix is additionally checked against a one-input/one-output,
//! no-logic shape and, if it matches, resolved as a [`RomPrimitive`] backed
//! by a data file rather than parsed as ordinary SystemVerilog.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gatesim_diagnostics::DiagnosticSink;
use gatesim_parser::ast::{Direction, ModuleDecl, ModuleItem};
use gatesim_source::SourceDb;

use crate::error::EvalError;

/// A resolved module: either ordinary SystemVerilog or a ROM primitive.
#[derive(Debug)]
pub enum ResolvedModule {
    /// A module parsed from source.
    Source(Arc<ModuleDecl>),
    /// A ROM primitive resolved by naming convention.
    Rom(Arc<RomPrimitive>),
}

/// A ROM: a combinational lookup table from an address port to a data
/// port, backed by a data file rather than synthesizable logic.
#[derive(Debug)]
pub struct RomPrimitive {
    /// The module name (e.g. `rom_deadbeef`).
    pub name: String,
    /// Every port name, in declaration order, for resolving positional
    /// (unnamed) instance connections.
    pub port_order: Vec<String>,
    /// The address (input) port name.
    pub addr_port: String,
    /// The address port's width in bits.
    pub addr_width: u32,
    /// The data (output) port name.
    pub data_port: String,
    /// The data port's width in bits.
    pub data_width: u32,
    /// The lookup table, keyed by address. An address absent from this map
    /// reads as zero, per gatesim's out-of-range memory rule — the data
    /// file format allows sparse layouts via an explicit `addr:value` line.
    pub data: HashMap<u64, u64>,
}

/// Resolves module names to parsed ASTs or ROM primitives, memoizing by
/// name so a module instantiated from multiple places is parsed once.
pub struct ModuleCache {
    search_dirs: Vec<PathBuf>,
    modules: HashMap<String, Arc<ResolvedModule>>,
    source_db: SourceDb,
}

impl ModuleCache {
    /// Creates a cache that looks for `<name>.sv` files under `search_dirs`,
    /// in order.
    pub fn new(search_dirs: Vec<PathBuf>) -> Self {
        Self {
            search_dirs,
            modules: HashMap::new(),
            source_db: SourceDb::new(),
        }
    }

    /// The accumulated source database for every file this cache has
    /// parsed, used to render diagnostic spans back to source locations.
    pub fn source_db(&self) -> &SourceDb {
        &self.source_db
    }

    /// Drops every cached module, forcing the next `resolve` call for each
    /// name to re-read and re-parse its source file.
    pub fn clear(&mut self) {
        self.modules.clear();
    }

    /// Resolves `name`, parsing and caching it on first use.
    pub fn resolve(
        &mut self,
        name: &str,
        sink: &DiagnosticSink,
    ) -> Result<Arc<ResolvedModule>, EvalError> {
        if let Some(cached) = self.modules.get(name) {
            return Ok(cached.clone());
        }
        let resolved = Arc::new(self.resolve_uncached(name, sink)?);
        self.modules.insert(name.to_string(), resolved.clone());
        Ok(resolved)
    }

    fn resolve_uncached(
        &mut self,
        name: &str,
        sink: &DiagnosticSink,
    ) -> Result<ResolvedModule, EvalError> {
        let source_path = self.find_source_file(name)?;
        let source = fs::read_to_string(&source_path)
            .map_err(|_| EvalError::ModuleNotFound(name.to_string()))?;

        let file_id = self
            .source_db
            .add_source(source_path.clone(), source.clone());
        let file = gatesim_parser::parse_file(&source, file_id, sink);

        let decl = file
            .modules
            .into_iter()
            .find(|m| m.name == name)
            .ok_or_else(|| EvalError::ModuleNotFound(name.to_string()))?;

        if sink.has_errors() {
            return Err(EvalError::ParseFailed(name.to_string()));
        }

        if is_rom_name(name) {
            return Ok(ResolvedModule::Rom(Arc::new(self.build_rom(
                &decl,
                &source_path,
            )?)));
        }

        Ok(ResolvedModule::Source(Arc::new(decl)))
    }

    fn find_source_file(&self, name: &str) -> Result<PathBuf, EvalError> {
        let file_name = format!("{name}.sv");
        for dir in &self.search_dirs {
            let candidate = dir.join(&file_name);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
        Err(EvalError::ModuleNotFound(name.to_string()))
    }

    /// Builds a [`RomPrimitive`] from a one-input/one-output, logic-free
    /// module declaration, locating its data file via a fixed three-step
    /// search:
    ///
    /// 1. `<name-without-rom_-prefix>.txt` next to the module's own source
    ///    file.
    /// 2. `roms/<name-without-rom_-prefix>.txt` next to the module's own
    ///    source file.
    /// 3. `roms/<name-without-rom_-prefix>.txt` relative to the current
    ///    working directory.
    fn build_rom(&self, decl: &ModuleDecl, source_path: &Path) -> Result<RomPrimitive, EvalError> {
        let has_logic = decl
            .items
            .iter()
            .any(|item| matches!(item, ModuleItem::Assign(_) | ModuleItem::Process(_)));
        let inputs: Vec<_> = decl
            .ports
            .iter()
            .filter(|p| p.direction == Direction::Input)
            .collect();
        let outputs: Vec<_> = decl
            .ports
            .iter()
            .filter(|p| p.direction == Direction::Output)
            .collect();

        if has_logic || inputs.len() != 1 || outputs.len() != 1 {
            return Err(EvalError::RomPortShape {
                module: decl.name.clone(),
                reason: format!(
                    "it has {} input port(s), {} output port(s), and {} must have no assignments or procedural blocks",
                    inputs.len(),
                    outputs.len(),
                    if has_logic { "does" } else { "does not" }
                ),
            });
        }

        let addr_port = inputs[0];
        let data_port = outputs[0];
        let addr_width = addr_port.width.map_or(1, |w| w.width() as u32);
        let data_width = data_port.width.map_or(1, |w| w.width() as u32);

        let data_path = self.find_rom_data_file(&decl.name, source_path)?;
        let contents = fs::read_to_string(&data_path)
            .map_err(|_| EvalError::RomDataNotFound(decl.name.clone()))?;
        let data = parse_rom_data(&contents, data_width).map_err(|reason| {
            EvalError::RomDataInvalid {
                module: decl.name.clone(),
                reason,
            }
        })?;

        Ok(RomPrimitive {
            name: decl.name.clone(),
            port_order: decl.ports.iter().map(|p| p.name.clone()).collect(),
            addr_port: addr_port.name.clone(),
            addr_width,
            data_port: data_port.name.clone(),
            data_width,
            data,
        })
    }

    fn find_rom_data_file(&self, name: &str, source_path: &Path) -> Result<PathBuf, EvalError> {
        let stem = name.strip_prefix("rom_").unwrap_or(name);
        let file_name = format!("{stem}.txt");

        if let Some(dir) = source_path.parent() {
            let candidate = dir.join(&file_name);
            if candidate.is_file() {
                return Ok(candidate);
            }
            let candidate = dir.join("roms").join(&file_name);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
        let cwd_candidate = std::env::current_dir()
            .unwrap_or_default()
            .join("roms")
            .join(&file_name);
        if cwd_candidate.is_file() {
            return Ok(cwd_candidate);
        }
        Err(EvalError::RomDataNotFound(name.to_string()))
    }
}

/// A module name looking like `rom_*` is treated as a ROM primitive rather
/// than elaborated as ordinary logic.
fn is_rom_name(name: &str) -> bool {
    name.starts_with("rom_")
}

/// Parses one value per non-comment, non-blank line: either a binary
/// literal exactly `data_width` bits wide, assigning sequential addresses
/// starting at 0, or `addr:binary_literal` for sparse layouts. `#` and `//`
/// start a comment.
pub(crate) fn parse_rom_data(contents: &str, data_width: u32) -> Result<HashMap<u64, u64>, String> {
    let mask = if data_width >= 64 {
        u64::MAX
    } else {
        (1u64 << data_width) - 1
    };
    let mut data = HashMap::new();
    let mut next_addr = 0u64;

    for (line_no, raw_line) in contents.lines().enumerate() {
        let line = strip_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let (addr, literal) = match line.split_once(':') {
            Some((addr_str, value_str)) => {
                let addr = addr_str
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| format!("line {}: invalid address '{addr_str}'", line_no + 1))?;
                (addr, value_str.trim())
            }
            None => {
                let addr = next_addr;
                (addr, line)
            }
        };

        let value = u64::from_str_radix(literal, 2).map_err(|_| {
            format!("line {}: '{literal}' is not a binary literal", line_no + 1)
        })?;
        data.insert(addr, value & mask);
        next_addr = addr + 1;
    }
    Ok(data)
}

/// Strips a trailing `#` or `//` comment from a line.
fn strip_comment(line: &str) -> &str {
    let hash = line.find('#');
    let slashes = line.find("//");
    match (hash, slashes) {
        (Some(h), Some(s)) => &line[..h.min(s)],
        (Some(h), None) => &line[..h],
        (None, Some(s)) => &line[..s],
        (None, None) => line,
    }
}
