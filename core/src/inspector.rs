//! Top-level inspection entry points over a [`Host`].
//!
//! An `Inspector` owns its host, its settings and its formatter table; nothing
//! is registered globally. Each call builds a fresh read cache that is dropped
//! when the call returns.

use std::io::Write;

use crate::config::InspectConfig;
use crate::error::{InspectError, Result};
use crate::host::{Host, HostHeap};
use crate::printer::print;
use crate::render::{FormatterRegistry, render};
use crate::tag::Lexp;
use crate::walk::{Walk, walk};

pub struct Inspector<H: Host> {
    host: H,
    config: InspectConfig,
    formatters: FormatterRegistry,
}

impl<H: Host> Inspector<H> {
    /// An inspector with the `lexp` formatter registered.
    pub fn new(host: H, config: InspectConfig) -> Self {
        let formatters = FormatterRegistry::with_lexp(config.clone());
        Inspector {
            host,
            config,
            formatters,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn config(&self) -> &InspectConfig {
        &self.config
    }

    pub fn formatters_mut(&mut self) -> &mut FormatterRegistry {
        &mut self.formatters
    }

    pub fn evaluate(&self, expr: &str) -> Result<Lexp> {
        self.host.evaluate(expr)
    }

    /// Format `word` with whatever is registered for `type_name`.
    pub fn format_value(&self, type_name: &str, word: Lexp) -> Option<Result<String>> {
        let heap = match HostHeap::new(&self.host) {
            Ok(heap) => heap,
            Err(e) => return Some(Err(e)),
        };
        self.formatters.format(type_name, word, &heap)
    }

    /// One-line rendering of the value `expr` names.
    pub fn render(&self, expr: &str) -> Result<String> {
        let word = self.evaluate(expr)?;
        let heap = HostHeap::new(&self.host)?;
        render(word, &heap, &self.config)
    }

    /// Structure walk of the value `expr` names.
    pub fn walk(&self, expr: &str, indent: usize) -> Result<Walk> {
        let word = self.evaluate(expr)?;
        let heap = HostHeap::new(&self.host)?;
        walk(word, indent, &heap, &self.config)
    }

    /// The dump command: write the walk of `expr` to `out`, one line per node.
    ///
    /// Nodes that failed are written as labeled `<...>` lines in place, and
    /// the first such failure is returned once the whole walk is written.
    pub fn dump<W: Write>(&self, expr: &str, indent: usize, out: &mut W) -> Result<usize> {
        let result = self.walk(expr, indent)?;
        for line in &result.lines {
            writeln!(out, "{line}").map_err(|e| InspectError::host(format!("write failed: {e}")))?;
        }
        let count = result.lines.len();
        result.into_result()?;
        Ok(count)
    }

    /// Lisp-notation print of the value `expr` names.
    pub fn print(&self, expr: &str) -> Result<String> {
        let word = self.evaluate(expr)?;
        let heap = HostHeap::new(&self.host)?;
        print(word, &heap, &self.config)
    }
}
