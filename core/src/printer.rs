//! Lisp-notation printing, matching the runtime's own `print`.
//!
//! `()` for NIL, bare atom names, `<name>` for primitives, `{ord}` for
//! closures, `(a b . c)` for lists and `%.10lg` for numbers.

use rustc_hash::FxHashSet;

use crate::config::{InspectConfig, StrPolicy};
use crate::error::{InspectError, Result};
use crate::heap::{CachedHeap, CellHeap};
use crate::image::PRIMITIVES;
use crate::tag::{Decoded, Lexp, Tag};

/// Format a number like C's `%.{precision}g`.
pub fn format_g(n: f64, precision: usize) -> String {
    if n.is_infinite() {
        return if n > 0.0 { "inf".into() } else { "-inf".into() };
    }
    if n.is_nan() {
        return "nan".into();
    }
    if n == 0.0 {
        return if n.is_sign_negative() { "-0".into() } else { "0".into() };
    }
    let p = precision.max(1);
    let sci = format!("{:.*e}", p - 1, n);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m.to_string(), e.parse::<i32>().unwrap_or(0)),
        None => (sci.clone(), 0),
    };
    if exp < -4 || exp >= p as i32 {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", strip_zeros(&mantissa), exp.abs())
    } else {
        let decimals = (p as i32 - 1 - exp).max(0) as usize;
        strip_zeros(&format!("{n:.decimals$}")).to_string()
    }
}

fn strip_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

pub struct Printer<'a, H: CellHeap + ?Sized> {
    heap: &'a H,
    config: &'a InspectConfig,
    prim_names: &'a [&'a str],
}

/// Pending printer work. Nesting is kept here, not on the call stack.
enum Task {
    Value { word: Lexp, depth: usize },
    /// Print the car of the cons at `ord`, then continue with its cdr.
    Item { ord: u32, depth: usize },
    /// The car of `ord` is done; read its cdr and keep the list going.
    Tail { ord: u32, depth: usize },
    /// Close the innermost open list.
    Close,
}

struct State {
    path: FxHashSet<u32>,
    /// Cons ordinals of each open list, innermost last.
    open: Vec<Vec<u32>>,
    nodes: usize,
}

impl<'a, H: CellHeap + ?Sized> Printer<'a, H> {
    pub fn new(heap: &'a H, config: &'a InspectConfig) -> Self {
        Printer {
            heap,
            config,
            prim_names: &PRIMITIVES,
        }
    }

    /// Use a different primitive table for `<name>` resolution.
    pub fn with_prim_names(mut self, names: &'a [&'a str]) -> Self {
        self.prim_names = names;
        self
    }

    pub fn print(&self, word: Lexp) -> Result<String> {
        let mut out = String::new();
        let mut state = State {
            path: FxHashSet::default(),
            open: Vec::new(),
            nodes: 0,
        };
        let mut stack = vec![Task::Value { word, depth: 0 }];

        while let Some(task) = stack.pop() {
            match task {
                Task::Value { word, depth } => {
                    self.count(&mut state)?;
                    if let Some(ord) = self.print_atomic(word, &mut out)? {
                        if let Some(max) = self.config.max_depth {
                            if depth >= max {
                                return Err(InspectError::limit(format!(
                                    "print nested deeper than {max} levels"
                                )));
                            }
                        }
                        out.push('(');
                        state.open.push(Vec::new());
                        stack.push(Task::Close);
                        stack.push(Task::Item { ord, depth });
                    }
                }
                Task::Item { ord, depth } => {
                    if self.config.detect_cycles && !state.path.insert(ord) {
                        return Err(InspectError::cycle(ord));
                    }
                    if let Some(chain) = state.open.last_mut() {
                        chain.push(ord);
                    }
                    let car = self.heap.read_word(u64::from(ord) + 1)?;
                    stack.push(Task::Tail { ord, depth });
                    stack.push(Task::Value {
                        word: car,
                        depth: depth + 1,
                    });
                }
                Task::Tail { ord, depth } => {
                    let cdr = self.heap.read_word(u64::from(ord))?;
                    match cdr.decode()? {
                        Decoded::Tagged(Tag::Nil, _) => {}
                        Decoded::Tagged(Tag::Cons, next) => {
                            self.count(&mut state)?;
                            out.push(' ');
                            stack.push(Task::Item { ord: next, depth });
                        }
                        _ => {
                            out.push_str(" . ");
                            stack.push(Task::Value {
                                word: cdr,
                                depth: depth + 1,
                            });
                        }
                    }
                }
                Task::Close => {
                    for ord in state.open.pop().unwrap_or_default() {
                        state.path.remove(&ord);
                    }
                    out.push(')');
                }
            }
        }
        Ok(out)
    }

    fn count(&self, state: &mut State) -> Result<()> {
        state.nodes += 1;
        match self.config.max_nodes {
            Some(max) if state.nodes > max => {
                Err(InspectError::limit(format!("print visited more than {max} nodes")))
            }
            _ => Ok(()),
        }
    }

    /// Print a non-cons word. A cons is left to the caller and its ordinal returned.
    fn print_atomic(&self, word: Lexp, out: &mut String) -> Result<Option<u32>> {
        match word.decode()? {
            Decoded::Number(n) => out.push_str(&format_g(n, 10)),
            Decoded::Tagged(Tag::Nil, _) => out.push_str("()"),
            Decoded::Tagged(Tag::Atom, ord) => {
                let name = self.heap.read_cstring(u64::from(ord), self.config.max_string_len)?;
                out.push_str(&name);
            }
            Decoded::Tagged(Tag::Str, ord) => match self.config.str_policy {
                StrPolicy::Contents => {
                    let s = self.heap.read_cstring(u64::from(ord), self.config.max_string_len)?;
                    out.push_str(&format!("\"{}\"", s.escape_debug()));
                }
                StrPolicy::Ordinal => out.push_str(&format!("#<STR @{ord:#x}>")),
            },
            Decoded::Tagged(Tag::Prim, ord) => match self.prim_names.get(ord as usize) {
                Some(name) => out.push_str(&format!("<{name}>")),
                None => out.push_str(&format!("<#{ord}>")),
            },
            Decoded::Tagged(Tag::Clos, ord) => out.push_str(&format!("{{{ord}}}")),
            Decoded::Tagged(Tag::Cons, ord) => return Ok(Some(ord)),
        }
        Ok(None)
    }
}

/// Print `word` in Lisp notation with a fresh per-call read cache.
pub fn print<H: CellHeap + ?Sized>(word: Lexp, heap: &H, config: &InspectConfig) -> Result<String> {
    let cached = CachedHeap::new(heap, config.cache_reads);
    Printer::new(&cached, config).print(word)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InspectErrorKind;
    use crate::heap::Snapshot;
    use crate::image::HeapImage;
    use crate::reader::read;

    fn show(src: &str) -> String {
        let mut image = HeapImage::new(256);
        let w = read(&mut image, src).unwrap();
        print(w, &image.snapshot(), &InspectConfig::default()).unwrap()
    }

    #[test]
    fn test_format_g() {
        assert_eq!(format_g(256.0, 10), "256");
        assert_eq!(format_g(0.5, 10), "0.5");
        assert_eq!(format_g(1.0 / 3.0, 10), "0.3333333333");
        assert_eq!(format_g(1e16, 10), "1e+16");
        assert_eq!(format_g(1234567890.0, 10), "1234567890");
        assert_eq!(format_g(12345678901.0, 10), "1.23456789e+10");
        assert_eq!(format_g(0.0001, 10), "0.0001");
        assert_eq!(format_g(0.00001, 10), "1e-05");
        assert_eq!(format_g(-2.5, 10), "-2.5");
        assert_eq!(format_g(f64::INFINITY, 10), "inf");
    }

    #[test]
    fn test_print_lists() {
        assert_eq!(show("(a b c)"), "(a b c)");
        assert_eq!(show("(a . b)"), "(a . b)");
        assert_eq!(show("(1 (2 3) . 4)"), "(1 (2 3) . 4)");
        assert_eq!(show("'x"), "(quote x)");
        assert_eq!(show("()"), "()");
    }

    #[test]
    fn test_print_prims_and_closures() {
        let mut image = HeapImage::boot(crate::image::DEFAULT_CELLS).unwrap();
        let snap_cfg = InspectConfig::default();
        let first = image.car(image.env()).unwrap();
        let x = image.atom("x").unwrap();
        let c = image.closure(x, x, Lexp::nil()).unwrap();
        let snap = image.snapshot();
        assert_eq!(print(first, &snap, &snap_cfg).unwrap(), "(define . <define>)");
        assert_eq!(print(Lexp::boxed(Tag::Prim, 99), &snap, &snap_cfg).unwrap(), "<#99>");
        assert_eq!(print(c, &snap, &snap_cfg).unwrap(), format!("{{{}}}", c.ordinal()));
        let renamed = Printer::new(&snap, &snap_cfg).with_prim_names(&["first"]);
        assert_eq!(renamed.print(Lexp::boxed(Tag::Prim, 0)).unwrap(), "<first>");
    }

    #[test]
    fn test_print_cycle() {
        let mut image = HeapImage::new(16);
        let p = image.cons(Lexp::from_f64(1.0), Lexp::nil()).unwrap();
        image.poke(p.ordinal() as usize, p).unwrap();
        let err = print(p, &image.snapshot(), &InspectConfig::default()).unwrap_err();
        assert_eq!(err.kind, InspectErrorKind::CycleDetected);
    }

    /// `levels` cons cells, each holding the next one as its car; the last holds 1.
    fn nested_through_heads(levels: usize) -> (Snapshot, Lexp) {
        let mut words = vec![Lexp::nil(); 2 * levels];
        for k in 0..levels {
            words[2 * k + 1] = if k + 1 == levels {
                Lexp::from_f64(1.0)
            } else {
                Lexp::boxed(Tag::Cons, (2 * k + 2) as u32)
            };
        }
        (Snapshot::from_words(&words), Lexp::boxed(Tag::Cons, 0))
    }

    #[test]
    fn test_print_deep_head_nesting_without_caps() {
        let levels = 200_000;
        let (heap, root) = nested_through_heads(levels);
        let config = InspectConfig {
            max_depth: None,
            max_nodes: None,
            ..InspectConfig::default()
        };
        let out = print(root, &heap, &config).unwrap();
        assert_eq!(out.len(), 2 * levels + 1);
        assert!(out.starts_with("(((("));
        assert!(out.ends_with("1))))"));
    }

    #[test]
    fn test_print_deep_head_nesting_hits_limits() {
        let (heap, root) = nested_through_heads(200_000);
        let err = print(root, &heap, &InspectConfig::default()).unwrap_err();
        assert_eq!(err.kind, InspectErrorKind::LimitExceeded);
        let no_depth_cap = InspectConfig {
            max_depth: None,
            ..InspectConfig::default()
        };
        let err = print(root, &heap, &no_depth_cap).unwrap_err();
        assert_eq!(err.kind, InspectErrorKind::LimitExceeded);
        assert!(err.message.contains("nodes"));
    }

    #[test]
    fn test_print_shared_tail_is_fine() {
        let mut image = HeapImage::new(32);
        let shared = image.list(&[Lexp::from_f64(1.0)]).unwrap();
        let outer = image.list(&[shared, shared]).unwrap();
        assert_eq!(
            print(outer, &image.snapshot(), &InspectConfig::default()).unwrap(),
            "((1) (1))"
        );
    }
}
