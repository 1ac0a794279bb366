//! One-line rendering of a value word.
//!
//! Numbers render as their decimal value. References render as the raw word
//! in hex, the tag name and either the resolved name (`cell[0x5f]="a"`) or the
//! ordinal (`@0x39e`).

use rustc_hash::FxHashMap;

use crate::config::{InspectConfig, StrPolicy};
use crate::error::Result;
use crate::heap::{CachedHeap, CellHeap};
use crate::tag::{Decoded, Lexp, Tag};

/// Renders single words against a cell heap.
pub struct Renderer<'a, H: CellHeap + ?Sized> {
    heap: &'a H,
    config: &'a InspectConfig,
}

impl<'a, H: CellHeap + ?Sized> Renderer<'a, H> {
    pub fn new(heap: &'a H, config: &'a InspectConfig) -> Self {
        Renderer { heap, config }
    }

    pub fn render(&self, word: Lexp) -> Result<String> {
        match word.decode()? {
            Decoded::Number(n) => Ok(format_number(n)),
            Decoded::Tagged(Tag::Atom, ord) => self.render_named(word, Tag::Atom, ord),
            Decoded::Tagged(Tag::Str, ord) if self.config.str_policy == StrPolicy::Contents => {
                self.render_named(word, Tag::Str, ord)
            }
            Decoded::Tagged(tag, ord) => Ok(format!("{word} {tag} @{ord:#x}")),
        }
    }

    fn render_named(&self, word: Lexp, tag: Tag, ord: u32) -> Result<String> {
        let name = self
            .heap
            .read_cstring(u64::from(ord), self.config.max_string_len)
            .map_err(|e| e.with_word(word))?;
        Ok(format!(
            "{word} {tag} cell[{ord:#x}]=\"{}\"",
            name.escape_debug()
        ))
    }
}

/// Shortest round-trip decimal text for `n`, switching to `1e+300` style
/// exponents below `1e-4` or from `1e17` up, where gdb does.
pub fn format_number(n: f64) -> String {
    if !n.is_finite() || n == 0.0 {
        return format!("{n}");
    }
    let sci = format!("{n:e}");
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => return format!("{n}"),
    };
    if (-4..17).contains(&exp) {
        format!("{n}")
    } else {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exp.abs())
    }
}

/// Render one word with its own read cache.
pub fn render<H: CellHeap + ?Sized>(word: Lexp, heap: &H, config: &InspectConfig) -> Result<String> {
    let cached = CachedHeap::new(heap, config.cache_reads);
    Renderer::new(&cached, config).render(word)
}

// ============================================================================
// Formatter Registry
// ============================================================================

/// A display formatter a host can attach to one of its value types.
pub trait ValueFormatter {
    fn format(&self, word: Lexp, heap: &dyn CellHeap) -> Result<String>;
}

/// The formatter for the runtime's tagged-value type.
#[derive(Clone, Debug, Default)]
pub struct LexpFormatter {
    pub config: InspectConfig,
}

impl ValueFormatter for LexpFormatter {
    fn format(&self, word: Lexp, heap: &dyn CellHeap) -> Result<String> {
        render(word, heap, &self.config)
    }
}

/// Type-name keyed formatter table, owned by whoever drives the inspection.
#[derive(Default)]
pub struct FormatterRegistry {
    formatters: FxHashMap<String, Box<dyn ValueFormatter>>,
}

impl FormatterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with `LexpFormatter` bound to the `lexp` type.
    pub fn with_lexp(config: InspectConfig) -> Self {
        let mut registry = Self::new();
        registry.register("lexp", LexpFormatter { config });
        registry
    }

    pub fn register(&mut self, type_name: impl Into<String>, formatter: impl ValueFormatter + 'static) {
        self.formatters.insert(type_name.into(), Box::new(formatter));
    }

    pub fn lookup(&self, type_name: &str) -> Option<&dyn ValueFormatter> {
        self.formatters.get(type_name).map(|f| f.as_ref())
    }

    /// Format `word` if a formatter is registered for `type_name`.
    pub fn format(&self, type_name: &str, word: Lexp, heap: &dyn CellHeap) -> Option<Result<String>> {
        self.lookup(type_name).map(|f| f.format(word, heap))
    }
}
