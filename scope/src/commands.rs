//! Subcommand implementations, kept free of argument parsing so they can be
//! driven from tests and from the REPL.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use lexp::image::DEFAULT_CELLS;
use lexp::{HeapImage, Inspector, Snapshot, SnapshotHost, SymbolTable, read};

/// The symbol file that sits next to an image: `cell.bin` -> `cell.sym`.
pub fn default_symbols_path(image: &Path) -> PathBuf {
    image.with_extension("sym")
}

/// Load a heap image and its symbol table into a host.
///
/// Without an explicit symbol file, a `.sym` file beside the image is used if
/// one exists; otherwise only cell references and literals can be evaluated.
pub fn load_host(image: &Path, symbols: Option<&Path>) -> Result<SnapshotHost, String> {
    let bytes = fs::read(image)
        .map_err(|e| format!("Failed to read image '{}': {e}", image.display()))?;
    let sym_path = match symbols {
        Some(p) => Some(p.to_path_buf()),
        None => Some(default_symbols_path(image)).filter(|p| p.exists()),
    };
    let table = match sym_path {
        Some(p) => {
            let text = fs::read_to_string(&p)
                .map_err(|e| format!("Failed to read symbols '{}': {e}", p.display()))?;
            SymbolTable::parse(&text)?
        }
        None => SymbolTable::new(),
    };
    log::debug!(
        "loaded {} bytes of cell heap and {} symbols",
        bytes.len(),
        table.len()
    );
    Ok(SnapshotHost::new(Snapshot::from_bytes(bytes), table))
}

pub fn run_render<W: Write>(
    inspector: &Inspector<SnapshotHost>,
    expr: &str,
    out: &mut W,
) -> Result<(), String> {
    let text = inspector.render(expr)?;
    writeln!(out, "{text}").map_err(|e| e.to_string())
}

pub fn run_dump<W: Write>(
    inspector: &Inspector<SnapshotHost>,
    expr: &str,
    indent: usize,
    out: &mut W,
) -> Result<(), String> {
    inspector.dump(expr, indent, out)?;
    Ok(())
}

pub fn run_print<W: Write>(
    inspector: &Inspector<SnapshotHost>,
    expr: &str,
    out: &mut W,
) -> Result<(), String> {
    let text = inspector.print(expr)?;
    writeln!(out, "{text}").map_err(|e| e.to_string())
}

/// Split `name=expr` into its parts.
pub fn parse_definition(def: &str) -> Result<(&str, &str), String> {
    match def.split_once('=') {
        Some((name, src)) if !name.trim().is_empty() => Ok((name.trim(), src.trim())),
        _ => Err(format!("Definition '{def}' is not of the form name=expr")),
    }
}

/// Boot a heap image, apply definitions, and return it with its roots.
pub fn build_image(cells: Option<usize>, definitions: &[String]) -> Result<(HeapImage, SymbolTable), String> {
    let mut image = HeapImage::boot(cells.unwrap_or(DEFAULT_CELLS))?;
    let mut named = Vec::new();
    for def in definitions {
        let (name, src) = parse_definition(def)?;
        let value = read(&mut image, src)?;
        image.define(name, value)?;
        named.push((name.to_string(), value));
    }
    let mut roots = image.roots();
    for (name, value) in named {
        roots.insert(name, value);
    }
    Ok((image, roots))
}

/// Write a booted image and its symbol table.
pub fn run_build(
    cells: Option<usize>,
    definitions: &[String],
    out: &Path,
    symbols_out: Option<&Path>,
) -> Result<(), String> {
    let (image, roots) = build_image(cells, definitions)?;
    fs::write(out, image.snapshot().as_bytes())
        .map_err(|e| format!("Failed to write image '{}': {e}", out.display()))?;
    let sym_path = symbols_out
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_symbols_path(out));
    fs::write(&sym_path, roots.to_text())
        .map_err(|e| format!("Failed to write symbols '{}': {e}", sym_path.display()))?;
    log::info!(
        "wrote {} ({} free cells) and {}",
        out.display(),
        image.free_cells(),
        sym_path.display()
    );
    Ok(())
}

#[cfg(test)]
pub(crate) fn inspector_for(image: &HeapImage, roots: SymbolTable, config: lexp::InspectConfig) -> Inspector<SnapshotHost> {
    Inspector::new(SnapshotHost::new(image.snapshot(), roots), config)
}
