//! Inspection settings shared by the renderer, walker and printer.

/// What the walker does with the `NIL` that ends a proper list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NilPolicy {
    /// Emit it like any other node.
    #[default]
    Show,
    /// Drop a `NIL` reached as the tail of a cons cell.
    SuppressTerminal,
}

/// How `STR` references are rendered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StrPolicy {
    /// Read the NUL-terminated contents at the ordinal, like `ATOM`.
    #[default]
    Contents,
    /// Show only the ordinal, like `CONS`.
    Ordinal,
}

/// Configuration for one inspection.
#[derive(Clone, Debug)]
pub struct InspectConfig {
    /// Longest atom or string read before giving up without a NUL
    pub max_string_len: usize,
    /// Deepest nesting a walk or print may reach, counted from where it starts
    pub max_depth: Option<usize>,
    /// Most nodes one walk or print may visit
    pub max_nodes: Option<usize>,
    /// Fail a branch that reaches a cons cell from inside itself
    pub detect_cycles: bool,
    pub nil_policy: NilPolicy,
    pub str_policy: StrPolicy,
    /// Cache heap reads for the duration of one top-level call
    pub cache_reads: bool,
}

impl Default for InspectConfig {
    fn default() -> Self {
        InspectConfig {
            max_string_len: 4096,
            max_depth: Some(256),
            max_nodes: Some(100_000),
            detect_cycles: true,
            nil_policy: NilPolicy::Show,
            str_policy: StrPolicy::Contents,
            cache_reads: true,
        }
    }
}

impl InspectConfig {
    /// No caps and no cycle guard, matching the raw runtime tooling.
    pub fn unbounded() -> Self {
        InspectConfig {
            max_depth: None,
            max_nodes: None,
            detect_cycles: false,
            ..Self::default()
        }
    }
}
