//! The inspection host: whatever can evaluate reference expressions against
//! the stopped target (a debugger, a core file reader, a snapshot).
//!
//! The heap is never addressed by pointer arithmetic here. Every read is
//! phrased as the same textual reference a user would type at the host,
//! `cell[0x39f]` for a word or `((char*)cell) + 0x5f` for bytes, and handed to
//! [`Host`]. That keeps traversal logic independent of how the host resolves
//! addresses.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{InspectError, Result};
use crate::heap::{CellHeap, Snapshot, WORD_SIZE, word_range};
use crate::symbols::SymbolTable;
use crate::tag::Lexp;

// ============================================================================
// Host Interface
// ============================================================================

/// Expression evaluation against the target.
pub trait Host {
    /// Evaluate an expression naming a value word.
    fn evaluate(&self, expr: &str) -> Result<Lexp>;

    /// Read up to `len` bytes at the address an expression evaluates to.
    fn read_memory(&self, expr: &str, len: usize) -> Result<Vec<u8>>;

    /// Size of the cell heap in bytes.
    fn cell_extent(&self) -> Result<usize>;
}

impl<H: Host + ?Sized> Host for &H {
    fn evaluate(&self, expr: &str) -> Result<Lexp> {
        (**self).evaluate(expr)
    }

    fn read_memory(&self, expr: &str, len: usize) -> Result<Vec<u8>> {
        (**self).read_memory(expr, len)
    }

    fn cell_extent(&self) -> Result<usize> {
        (**self).cell_extent()
    }
}

/// Reference expression for the word at `ordinal`.
pub fn cell_ref(ordinal: u64) -> String {
    format!("cell[{ordinal:#x}]")
}

/// Reference expression for the bytes at `offset`.
pub fn byte_ref(offset: u64) -> String {
    format!("((char*)cell) + {offset:#x}")
}

/// A [`CellHeap`] whose reads are reference expressions sent to a host.
pub struct HostHeap<'a, H: Host + ?Sized> {
    host: &'a H,
    extent: usize,
}

impl<'a, H: Host + ?Sized> HostHeap<'a, H> {
    pub fn new(host: &'a H) -> Result<Self> {
        let extent = host.cell_extent()?;
        Ok(HostHeap { host, extent })
    }
}

impl<H: Host + ?Sized> CellHeap for HostHeap<'_, H> {
    fn extent(&self) -> usize {
        self.extent
    }

    fn read_bytes(&self, offset: u64, max_len: usize) -> Result<Vec<u8>> {
        let start = usize::try_from(offset)
            .ok()
            .filter(|&s| s < self.extent)
            .ok_or_else(|| InspectError::out_of_range(offset, self.extent))?;
        let len = max_len.min(self.extent - start);
        let bytes = self.host.read_memory(&byte_ref(offset), len)?;
        if bytes.len() > len {
            return Err(InspectError::host(format!(
                "host returned {} bytes for a {len}-byte read",
                bytes.len()
            )));
        }
        Ok(bytes)
    }

    fn read_word(&self, ordinal: u64) -> Result<Lexp> {
        word_range(ordinal, self.extent)?;
        self.host.evaluate(&cell_ref(ordinal))
    }
}

// ============================================================================
// Snapshot Host
// ============================================================================

static CELL_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^cell\s*\[\s*(0[xX][0-9a-fA-F]+|\d+)\s*(?:\+\s*(0[xX][0-9a-fA-F]+|\d+)\s*)?\]$")
        .expect("valid cell reference pattern")
});

static CELL_BYTES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\(?\s*\(\s*char\s*\*\s*\)\s*cell\s*\)?\s*(?:\+\s*(0[xX][0-9a-fA-F]+|\d+))?$")
        .expect("valid byte reference pattern")
});

static WORD_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0[xX]([0-9a-fA-F]{1,16})$").expect("valid word literal pattern"));

static IDENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier pattern"));

fn parse_index(text: &str) -> Result<u64> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse::<u64>(),
    };
    parsed.map_err(|e| InspectError::syntax(format!("bad index `{text}`: {e}")))
}

/// Evaluates reference expressions against a heap snapshot and symbol table.
///
/// Understands `cell[N]`, `cell[N + M]`, `0xWORD` literals, decimal numbers,
/// symbol names, and `((char*)cell) + N` for byte reads.
#[derive(Clone, Debug, Default)]
pub struct SnapshotHost {
    snapshot: Snapshot,
    symbols: SymbolTable,
}

impl SnapshotHost {
    pub fn new(snapshot: Snapshot, symbols: SymbolTable) -> Self {
        SnapshotHost { snapshot, symbols }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }
}

impl Host for SnapshotHost {
    fn evaluate(&self, expr: &str) -> Result<Lexp> {
        let expr = expr.trim();
        if let Some(caps) = CELL_WORD.captures(expr) {
            let base = parse_index(&caps[1])?;
            let offset = match caps.get(2) {
                Some(m) => parse_index(m.as_str())?,
                None => 0,
            };
            let ordinal = base
                .checked_add(offset)
                .ok_or_else(|| InspectError::syntax(format!("index overflow in `{expr}`")))?;
            return self.snapshot.read_word(ordinal);
        }
        if let Some(caps) = WORD_LITERAL.captures(expr) {
            let bits = u64::from_str_radix(&caps[1], 16)
                .map_err(|e| InspectError::syntax(format!("bad word literal `{expr}`: {e}")))?;
            return Ok(Lexp::from_bits(bits));
        }
        if IDENT.is_match(expr) {
            return self
                .symbols
                .get(expr)
                .ok_or_else(|| InspectError::host(format!("No symbol \"{expr}\" in current context.")));
        }
        if let Ok(n) = expr.parse::<f64>() {
            return Ok(Lexp::from_f64(n));
        }
        Err(InspectError::syntax(format!("cannot evaluate `{expr}`")))
    }

    fn read_memory(&self, expr: &str, len: usize) -> Result<Vec<u8>> {
        let expr = expr.trim();
        let offset = if let Some(caps) = CELL_BYTES.captures(expr) {
            match caps.get(1) {
                Some(m) => parse_index(m.as_str())?,
                None => 0,
            }
        } else if let Some(caps) = expr.strip_prefix('&').and_then(|e| CELL_WORD.captures(e.trim())) {
            let base = parse_index(&caps[1])?;
            let extra = match caps.get(2) {
                Some(m) => parse_index(m.as_str())?,
                None => 0,
            };
            base.checked_add(extra)
                .and_then(|o| o.checked_mul(WORD_SIZE as u64))
                .ok_or_else(|| InspectError::syntax(format!("address overflow in `{expr}`")))?
        } else {
            return Err(InspectError::syntax(format!("not a cell address: `{expr}`")));
        };
        self.snapshot.read_bytes(offset, len)
    }

    fn cell_extent(&self) -> Result<usize> {
        Ok(self.snapshot.extent())
    }
}
