//! Depth-first dump of cons structure.
//!
//! Every visited node becomes one line. A cons cell's head (`cell[ord + 1]`)
//! is emitted one indent deeper, its tail (`cell[ord]`) at the same indent,
//! so a list reads as a column of cells with their elements nested beneath.
//!
//! ```text
//! 0x7ffa00000000039e CONS @0x39e
//!     0x7ff800000000005f ATOM cell[0x5f]="a"
//! 0x7ffc000000000000 NIL @0x0
//! ```

use std::fmt;

use rustc_hash::FxHashSet;

use crate::config::{InspectConfig, NilPolicy};
use crate::error::{InspectError, Result};
use crate::heap::{CachedHeap, CellHeap};
use crate::render::Renderer;
use crate::tag::{Classified, Lexp, Tag};

// ============================================================================
// Output
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Value(String),
    /// The node at this position could not be read or rendered; its branch stops here.
    Error(InspectError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub indent: usize,
    pub entry: Entry,
}

impl Line {
    pub fn text(&self) -> Option<&str> {
        match &self.entry {
            Entry::Value(s) => Some(s),
            Entry::Error(_) => None,
        }
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in 0..self.indent {
            f.write_str("\t")?;
        }
        match &self.entry {
            Entry::Value(s) => f.write_str(s),
            Entry::Error(e) => write!(f, "<{e}>"),
        }
    }
}

/// The lines of one walk, in visiting order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Walk {
    pub lines: Vec<Line>,
}

impl Walk {
    pub fn errors(&self) -> impl Iterator<Item = &InspectError> {
        self.lines.iter().filter_map(|l| match &l.entry {
            Entry::Error(e) => Some(e),
            Entry::Value(_) => None,
        })
    }

    pub fn is_clean(&self) -> bool {
        self.errors().next().is_none()
    }

    /// All lines if every node rendered, otherwise the first error.
    pub fn into_result(self) -> Result<Vec<Line>> {
        if let Some(e) = self.errors().next().cloned() {
            return Err(e);
        }
        Ok(self.lines)
    }
}

impl fmt::Display for Walk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

// ============================================================================
// Walker
// ============================================================================

struct Frame {
    word: Result<Lexp>,
    indent: usize,
    /// Number of cons ancestors on the recursion path.
    level: usize,
    from_tail: bool,
}

pub struct Walker<'a, H: CellHeap + ?Sized> {
    heap: &'a H,
    config: &'a InspectConfig,
}

impl<'a, H: CellHeap + ?Sized> Walker<'a, H> {
    pub fn new(heap: &'a H, config: &'a InspectConfig) -> Self {
        Walker { heap, config }
    }

    /// Walk from `root`, starting at `indent`.
    ///
    /// Per-node failures are recorded as error lines and end only their own
    /// branch. Running past `max_depth` levels below `indent`, or past
    /// `max_nodes`, fails the whole walk.
    pub fn walk(&self, root: Lexp, indent: usize) -> Result<Walk> {
        let renderer = Renderer::new(self.heap, self.config);
        let mut out = Walk::default();
        let mut stack = vec![Frame {
            word: Ok(root),
            indent,
            level: 0,
            from_tail: false,
        }];
        let mut path: Vec<u32> = Vec::new();
        let mut on_path: FxHashSet<u32> = FxHashSet::default();
        let mut visited = 0usize;

        while let Some(frame) = stack.pop() {
            while path.len() > frame.level {
                if let Some(ord) = path.pop() {
                    on_path.remove(&ord);
                }
            }

            let word = match frame.word {
                Ok(w) => w,
                Err(e) => {
                    out.lines.push(error_line(frame.indent, e));
                    continue;
                }
            };

            if frame.from_tail
                && self.config.nil_policy == NilPolicy::SuppressTerminal
                && word.is(Tag::Nil)
            {
                continue;
            }

            visited += 1;
            if let Some(max) = self.config.max_nodes {
                if visited > max {
                    return Err(InspectError::limit(format!("walk visited more than {max} nodes")));
                }
            }
            if let Some(max) = self.config.max_depth {
                if frame.indent - indent > max {
                    return Err(InspectError::limit(format!("walk nested deeper than {max} levels"))
                        .with_word(word));
                }
            }

            let cons = match word.classify() {
                Classified::Tagged(Tag::Cons, ord) => Some(ord),
                _ => None,
            };

            if let Some(ord) = cons {
                if self.config.detect_cycles && on_path.contains(&ord) {
                    out.lines
                        .push(error_line(frame.indent, InspectError::cycle(ord).with_word(word)));
                    continue;
                }
            }

            match renderer.render(word) {
                Ok(text) => {
                    log::trace!("walk {}{}", "  ".repeat(frame.indent), text);
                    out.lines.push(Line {
                        indent: frame.indent,
                        entry: Entry::Value(text),
                    });
                }
                Err(e) => {
                    out.lines.push(error_line(frame.indent, e));
                    continue;
                }
            }

            if let Some(ord) = cons {
                path.push(ord);
                on_path.insert(ord);
                let head = self.heap.read_word(u64::from(ord) + 1);
                let tail = self.heap.read_word(u64::from(ord));
                stack.push(Frame {
                    word: tail,
                    indent: frame.indent,
                    level: frame.level + 1,
                    from_tail: true,
                });
                stack.push(Frame {
                    word: head,
                    indent: frame.indent + 1,
                    level: frame.level + 1,
                    from_tail: false,
                });
            }
        }

        log::debug!(
            "walked {root}: {} lines, {} errors",
            out.lines.len(),
            out.errors().count()
        );
        Ok(out)
    }
}

fn error_line(indent: usize, error: InspectError) -> Line {
    Line {
        indent,
        entry: Entry::Error(error),
    }
}

/// Walk `root` with a fresh per-call read cache.
pub fn walk<H: CellHeap + ?Sized>(
    root: Lexp,
    indent: usize,
    heap: &H,
    config: &InspectConfig,
) -> Result<Walk> {
    let cached = CachedHeap::new(heap, config.cache_reads);
    Walker::new(&cached, config).walk(root, indent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InspectErrorKind;
    use crate::heap::Snapshot;

    /// cell[0x10] = tail, cell[0x11] = head, atom "a" at byte 0.
    fn one_element_list() -> (Snapshot, Lexp) {
        let mut words = vec![Lexp::nil(); 0x20];
        words[0] = Lexp::from_bits(u64::from_le_bytes(*b"a\0\0\0\0\0\0\0"));
        words[0x11] = Lexp::boxed(Tag::Atom, 0);
        words[0x10] = Lexp::nil();
        (Snapshot::from_words(&words), Lexp::boxed(Tag::Cons, 0x10))
    }

    fn texts(w: &Walk) -> Vec<(usize, String)> {
        w.lines.iter().map(|l| (l.indent, l.to_string())).collect()
    }

    #[test]
    fn test_walk_single_element_list() {
        let (heap, root) = one_element_list();
        let out = walk(root, 0, &heap, &InspectConfig::default()).unwrap();
        assert!(out.is_clean());
        let lines = texts(&out);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], (0, "0x7ffa000000000010 CONS @0x10".to_string()));
        assert_eq!(
            lines[1],
            (1, "\t0x7ff8000000000000 ATOM cell[0x0]=\"a\"".to_string())
        );
        assert_eq!(lines[2], (0, "0x7ffc000000000000 NIL @0x0".to_string()));
    }

    #[test]
    fn test_walk_starting_indent() {
        let (heap, root) = one_element_list();
        let out = walk(root, 2, &heap, &InspectConfig::default()).unwrap();
        let indents: Vec<usize> = out.lines.iter().map(|l| l.indent).collect();
        assert_eq!(indents, vec![2, 3, 2]);
    }

    #[test]
    fn test_walk_non_cons_root_is_one_line() {
        let (heap, _) = one_element_list();
        let out = walk(Lexp::from_f64(42.0), 0, &heap, &InspectConfig::default()).unwrap();
        assert_eq!(out.to_string(), "42\n");
    }

    #[test]
    fn test_suppress_terminal_nil() {
        let (heap, root) = one_element_list();
        let config = InspectConfig {
            nil_policy: NilPolicy::SuppressTerminal,
            ..InspectConfig::default()
        };
        let out = walk(root, 0, &heap, &config).unwrap();
        assert_eq!(out.lines.len(), 2);
        // a bare NIL root is still shown
        let out = walk(Lexp::nil(), 0, &heap, &config).unwrap();
        assert_eq!(out.lines.len(), 1);
    }

    #[test]
    fn test_cycle_is_reported_not_followed() {
        let mut words = vec![Lexp::nil(); 8];
        // cell[2] = tail -> itself, cell[3] = head 1.0
        words[2] = Lexp::boxed(Tag::Cons, 2);
        words[3] = Lexp::from_f64(1.0);
        let heap = Snapshot::from_words(&words);
        let out = walk(Lexp::boxed(Tag::Cons, 2), 0, &heap, &InspectConfig::default()).unwrap();
        assert_eq!(out.lines.len(), 3);
        let err = out.errors().next().unwrap();
        assert_eq!(err.kind, InspectErrorKind::CycleDetected);
        assert_eq!(out.lines[2].indent, 0);
    }

    #[test]
    fn test_shared_structure_is_not_a_cycle() {
        let mut words = vec![Lexp::nil(); 8];
        // (x . x) where x = (1.0) at ordinal 2
        words[2] = Lexp::nil();
        words[3] = Lexp::from_f64(1.0);
        words[4] = Lexp::boxed(Tag::Cons, 2);
        words[5] = Lexp::boxed(Tag::Cons, 2);
        let heap = Snapshot::from_words(&words);
        let out = walk(Lexp::boxed(Tag::Cons, 4), 0, &heap, &InspectConfig::default()).unwrap();
        assert!(out.is_clean());
        assert_eq!(out.lines.len(), 7);
    }

    #[test]
    fn test_node_limit_fails_walk() {
        let mut words = vec![Lexp::nil(); 8];
        words[2] = Lexp::boxed(Tag::Cons, 2);
        words[3] = Lexp::from_f64(1.0);
        let heap = Snapshot::from_words(&words);
        let config = InspectConfig {
            detect_cycles: false,
            max_nodes: Some(50),
            ..InspectConfig::default()
        };
        let err = walk(Lexp::boxed(Tag::Cons, 2), 0, &heap, &config).unwrap_err();
        assert_eq!(err.kind, InspectErrorKind::LimitExceeded);
    }

    #[test]
    fn test_depth_limit_fails_walk() {
        let mut words = vec![Lexp::nil(); 8];
        // head points back to the same cell: infinitely nested
        words[2] = Lexp::nil();
        words[3] = Lexp::boxed(Tag::Cons, 2);
        let heap = Snapshot::from_words(&words);
        let config = InspectConfig {
            detect_cycles: false,
            max_depth: Some(5),
            ..InspectConfig::default()
        };
        let err = walk(Lexp::boxed(Tag::Cons, 2), 0, &heap, &config).unwrap_err();
        assert_eq!(err.kind, InspectErrorKind::LimitExceeded);
    }

    #[test]
    fn test_depth_limit_is_relative_to_start_indent() {
        let (heap, root) = one_element_list();
        let out = walk(Lexp::nil(), 300, &heap, &InspectConfig::default()).unwrap();
        assert_eq!(out.lines[0].indent, 300);

        let capped = |max| InspectConfig {
            max_depth: Some(max),
            ..InspectConfig::default()
        };
        let out = walk(root, 3, &heap, &capped(3)).unwrap();
        let indents: Vec<usize> = out.lines.iter().map(|l| l.indent).collect();
        assert_eq!(indents, vec![3, 4, 3]);
        let out = walk(root, 5, &heap, &capped(1)).unwrap();
        assert_eq!(out.lines.len(), 3);
        let err = walk(root, 5, &heap, &capped(0)).unwrap_err();
        assert_eq!(err.kind, InspectErrorKind::LimitExceeded);
    }

    #[test]
    fn test_bad_head_does_not_stop_tail() {
        let mut words = vec![Lexp::nil(); 8];
        words[2] = Lexp::nil();
        words[3] = Lexp::from_bits(0x7ffe_0000_0000_0000);
        let heap = Snapshot::from_words(&words);
        let out = walk(Lexp::boxed(Tag::Cons, 2), 0, &heap, &InspectConfig::default()).unwrap();
        assert_eq!(out.lines.len(), 3);
        assert!(matches!(out.lines[1].entry, Entry::Error(ref e) if e.kind == InspectErrorKind::Decode));
        assert_eq!(out.lines[2].text(), Some("0x7ffc000000000000 NIL @0x0"));
        assert!(out.into_result().is_err());
    }

    #[test]
    fn test_cons_past_heap_end() {
        let heap = Snapshot::from_words(&[Lexp::nil(); 4]);
        let out = walk(Lexp::boxed(Tag::Cons, 3), 0, &heap, &InspectConfig::default()).unwrap();
        // root line, failed head read, tail read of cell[3] succeeds
        assert_eq!(out.lines.len(), 3);
        assert!(matches!(out.lines[1].entry, Entry::Error(ref e) if e.kind == InspectErrorKind::HeapAccess));
        assert_eq!(out.lines[1].indent, 1);
    }
}
