//! Inspection core for NaN-boxed Lisp values
//!
//! Decodes 64-bit value words, reads atom names and cons cells out of the
//! target's cell heap, and renders single values or whole cons structures.
//! Process control and expression evaluation belong to the [`host::Host`]
//! the caller supplies.

pub mod config;
pub mod error;
pub mod heap;
pub mod host;
pub mod image;
pub mod inspector;
pub mod printer;
pub mod reader;
pub mod render;
pub mod symbols;
pub mod tag;
pub mod walk;

// Re-export commonly used items for convenience
pub use config::{InspectConfig, NilPolicy, StrPolicy};
pub use error::{InspectError, InspectErrorKind, Result};
pub use heap::{CachedHeap, CellHeap, Snapshot};
pub use host::{Host, HostHeap, SnapshotHost};
pub use image::HeapImage;
pub use inspector::Inspector;
pub use printer::print;
pub use reader::read;
pub use render::{FormatterRegistry, LexpFormatter, ValueFormatter, render};
pub use symbols::SymbolTable;
pub use tag::{Classified, Decoded, Lexp, Tag, classify};
pub use walk::{Entry, Line, Walk, walk};
