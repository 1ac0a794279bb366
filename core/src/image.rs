//! Heap images laid out exactly as the target runtime lays out its memory.
//!
//! The runtime keeps one array `cell[N]` shared by two regions: atom names
//! grow up from byte 0 (`hp`, in bytes) and cons cells grow down from the top
//! (`sp`, in words). A cons pushes its car then its cdr, so for a cell at
//! ordinal `i` the cdr lives at `cell[i]` and the car at `cell[i + 1]`.
//! Memory is exhausted when `hp > sp * 8`.

use crate::error::{InspectError, Result};
use crate::heap::{Snapshot, WORD_SIZE};
use crate::symbols::SymbolTable;
use crate::tag::{Lexp, Tag};

/// Cell count of the stock runtime build.
pub const DEFAULT_CELLS: usize = 1024;

/// The runtime's primitive table, in binding order.
pub const PRIMITIVES: [&str; 20] = [
    "eval", "quote", "cons", "car", "cdr", "+", "-", "*", "/", "int", "<", "eq?", "or", "and",
    "not", "cond", "if", "let*", "lambda", "define",
];

/// A mutable heap image with the runtime's allocation discipline.
#[derive(Clone, Debug)]
pub struct HeapImage {
    cells: Vec<Lexp>,
    /// Atom heap pointer, bytes from the bottom
    hp: usize,
    /// Stack pointer, words from the bottom
    sp: usize,
    env: Lexp,
    tru: Lexp,
    err: Lexp,
}

impl Default for HeapImage {
    fn default() -> Self {
        Self::new(DEFAULT_CELLS)
    }
}

impl HeapImage {
    /// An empty image of `cells` words with no atoms and an empty environment.
    pub fn new(cells: usize) -> Self {
        HeapImage {
            cells: vec![Lexp::from_bits(0); cells],
            hp: 0,
            sp: cells,
            env: Lexp::nil(),
            tru: Lexp::nil(),
            err: Lexp::nil(),
        }
    }

    /// The runtime's state right after start-up: `ERR` and `#t` interned,
    /// `env` holding `(#t . #t)` and one binding per primitive.
    pub fn boot(cells: usize) -> Result<Self> {
        let mut image = HeapImage::new(cells);
        image.err = image.atom("ERR")?;
        image.tru = image.atom("#t")?;
        image.env = image.pair(image.tru, image.tru, Lexp::nil())?;
        for (i, name) in PRIMITIVES.iter().enumerate() {
            let sym = image.atom(name)?;
            let prim = Lexp::boxed(Tag::Prim, i as u32);
            image.env = image.pair(sym, prim, image.env)?;
        }
        Ok(image)
    }

    pub fn nil(&self) -> Lexp {
        Lexp::nil()
    }

    pub fn tru(&self) -> Lexp {
        self.tru
    }

    pub fn err(&self) -> Lexp {
        self.err
    }

    pub fn env(&self) -> Lexp {
        self.env
    }

    pub fn num(&self, n: f64) -> Lexp {
        Lexp::from_f64(n)
    }

    pub fn prim(&self, index: u32) -> Lexp {
        Lexp::boxed(Tag::Prim, index)
    }

    /// Cells still free between the atom heap and the stack.
    pub fn free_cells(&self) -> usize {
        self.sp - self.hp / WORD_SIZE
    }

    fn check_memory(&self) -> Result<()> {
        if self.hp > self.sp * WORD_SIZE {
            return Err(InspectError::heap(format!(
                "out of memory: atom heap at {:#x} meets stack at cell[{:#x}]",
                self.hp, self.sp
            )));
        }
        Ok(())
    }

    fn name_at(&self, offset: usize) -> Vec<u8> {
        let mut out = Vec::new();
        let mut pos = offset;
        while pos < self.hp {
            let b = self.byte(pos);
            if b == 0 {
                break;
            }
            out.push(b);
            pos += 1;
        }
        out
    }

    fn byte(&self, offset: usize) -> u8 {
        self.cells[offset / WORD_SIZE].bits().to_le_bytes()[offset % WORD_SIZE]
    }

    fn set_byte(&mut self, offset: usize, value: u8) {
        let word = &mut self.cells[offset / WORD_SIZE];
        let mut bytes = word.bits().to_le_bytes();
        bytes[offset % WORD_SIZE] = value;
        *word = Lexp::from_bits(u64::from_le_bytes(bytes));
    }

    /// Intern `name`, returning the existing atom when it is already present.
    pub fn atom(&mut self, name: &str) -> Result<Lexp> {
        if name.as_bytes().contains(&0) {
            return Err(InspectError::syntax("atom name contains NUL"));
        }
        let mut i = 0;
        while i < self.hp {
            let existing = self.name_at(i);
            if existing == name.as_bytes() {
                return Ok(Lexp::boxed(Tag::Atom, i as u32));
            }
            i += existing.len() + 1;
        }
        let needed = name.len() + 1;
        if i + needed > self.sp * WORD_SIZE {
            return Err(InspectError::heap(format!(
                "out of memory interning `{name}`"
            )));
        }
        for (k, b) in name.bytes().enumerate() {
            self.set_byte(i + k, b);
        }
        self.set_byte(i + name.len(), 0);
        self.hp = i + needed;
        self.check_memory()?;
        Ok(Lexp::boxed(Tag::Atom, i as u32))
    }

    /// Allocate `(car . cdr)`.
    pub fn cons(&mut self, car: Lexp, cdr: Lexp) -> Result<Lexp> {
        if self.sp < 2 || (self.sp - 2) * WORD_SIZE < self.hp {
            return Err(InspectError::heap("out of memory allocating cons cell"));
        }
        self.sp -= 1;
        self.cells[self.sp] = car;
        self.sp -= 1;
        self.cells[self.sp] = cdr;
        self.check_memory()?;
        Ok(Lexp::boxed(Tag::Cons, self.sp as u32))
    }

    pub fn car(&self, p: Lexp) -> Option<Lexp> {
        self.pair_slot(p, 1)
    }

    pub fn cdr(&self, p: Lexp) -> Option<Lexp> {
        self.pair_slot(p, 0)
    }

    fn pair_slot(&self, p: Lexp, offset: usize) -> Option<Lexp> {
        match p.tag() {
            Some(Tag::Cons) | Some(Tag::Clos) => {
                self.cells.get(p.ordinal() as usize + offset).copied()
            }
            _ => None,
        }
    }

    /// `((v . x) . e)`
    pub fn pair(&mut self, v: Lexp, x: Lexp, e: Lexp) -> Result<Lexp> {
        let binding = self.cons(v, x)?;
        self.cons(binding, e)
    }

    /// A closure over parameters `v` and body `x`. A closure made in the
    /// global environment stores `()` in place of it.
    pub fn closure(&mut self, v: Lexp, x: Lexp, e: Lexp) -> Result<Lexp> {
        let env = if e == self.env { Lexp::nil() } else { e };
        let p = self.pair(v, x, env)?;
        Ok(Lexp::boxed(Tag::Clos, p.ordinal()))
    }

    /// A proper list of `items`.
    pub fn list(&mut self, items: &[Lexp]) -> Result<Lexp> {
        let mut tail = Lexp::nil();
        for &item in items.iter().rev() {
            tail = self.cons(item, tail)?;
        }
        Ok(tail)
    }

    /// Bind `name` to `value` in the global environment, like `(define name value)`.
    pub fn define(&mut self, name: &str, value: Lexp) -> Result<Lexp> {
        let sym = self.atom(name)?;
        self.env = self.pair(sym, value, self.env)?;
        Ok(sym)
    }

    /// Write a raw word, for building deliberately broken heaps.
    pub fn poke(&mut self, ordinal: usize, word: Lexp) -> Result<()> {
        let len = self.cells.len();
        let slot = self
            .cells
            .get_mut(ordinal)
            .ok_or_else(|| InspectError::out_of_range((ordinal * WORD_SIZE) as u64, len * WORD_SIZE))?;
        *slot = word;
        Ok(())
    }

    /// Freeze the image.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::from_words(&self.cells)
    }

    /// The runtime's global roots.
    pub fn roots(&self) -> SymbolTable {
        let mut table = SymbolTable::new();
        table.insert("env", self.env);
        table.insert("nil", Lexp::nil());
        table.insert("tru", self.tru);
        table.insert("err", self.err);
        table
    }
}
