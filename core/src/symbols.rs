//! Named roots of a heap snapshot (`env`, `nil`, ...).
//!
//! Stored one per line as `name = 0xWORD`; `#` starts a comment.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{InspectError, Result};
use crate::tag::Lexp;

static SYMBOL_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([^\s=#]+)\s*=\s*0[xX]([0-9a-fA-F]{1,16})$").expect("valid symbol line pattern")
});

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SymbolTable {
    entries: BTreeMap<String, Lexp>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, word: Lexp) {
        self.entries.insert(name.into(), word);
    }

    pub fn get(&self, name: &str) -> Option<Lexp> {
        self.entries.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Lexp)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut table = SymbolTable::new();
        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let caps = SYMBOL_LINE.captures(line).ok_or_else(|| {
                InspectError::syntax(format!("symbol file line {}: expected `name = 0xWORD`", lineno + 1))
            })?;
            let bits = u64::from_str_radix(&caps[2], 16)
                .map_err(|e| InspectError::syntax(format!("symbol file line {}: {e}", lineno + 1)))?;
            table.insert(&caps[1], Lexp::from_bits(bits));
        }
        Ok(table)
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for (name, word) in self.iter() {
            out.push_str(&format!("{name} = {word:#018x}\n"));
        }
        out
    }
}
